use chrono::NaiveDate;
use learnpath_core::{
    ChangePropagator, DocumentId, DocumentStore, InMemoryDocumentStore, ProgressService,
    ReportService, StoreResult, TrackerSettings,
};
use std::cell::Cell;

/// Counts listings and topic reads while delegating to an in-memory vault.
struct CountingStore {
    inner: InMemoryDocumentStore,
    lists: Cell<usize>,
    topic_reads: Cell<usize>,
}

impl CountingStore {
    fn take_lists(&self) -> usize {
        self.lists.replace(0)
    }

    fn take_topic_reads(&self) -> usize {
        self.topic_reads.replace(0)
    }
}

impl DocumentStore for CountingStore {
    fn list(&self) -> StoreResult<Vec<DocumentId>> {
        self.lists.set(self.lists.get() + 1);
        self.inner.list()
    }

    fn read(&self, id: &DocumentId) -> StoreResult<String> {
        if id.as_str().starts_with("Topics/") {
            self.topic_reads.set(self.topic_reads.get() + 1);
        }
        self.inner.read(id)
    }

    fn write(&self, id: &DocumentId, raw: &str) -> StoreResult<()> {
        self.inner.write(id, raw)
    }

    fn exists(&self, id: &DocumentId) -> StoreResult<bool> {
        self.inner.exists(id)
    }
}

fn subtopic(parent: &str) -> String {
    format!(
        "---\ntype: subtopic\nparent: \"[[{parent}]]\"\ncompleted: false\n---\nStatus: ❌ Not completed\n"
    )
}

/// Topic `T` with eight subtopics plus one dangling entry, and topic `U`.
fn vault() -> CountingStore {
    let inner = InMemoryDocumentStore::new();
    let mut items: Vec<String> = (0..8).map(|index| format!("[[S{index}]]")).collect();
    items.push("[[Gone]]".to_string());
    inner.insert(
        "Topics/T.md",
        format!(
            "---\ntype: topic\nsubtopics: [{}]\nprogress: 0.00\ncompleted_subtopics: 0\ntotal_subtopics: 0\n---\n# T\n",
            items.join(", ")
        ),
    );
    inner.insert(
        "Topics/U.md",
        "---\ntype: topic\nsubtopics: [[[S0]]]\n---\n# U\n",
    );
    for index in 0..8 {
        inner.insert(format!("Subtopics/S{index}.md"), subtopic("T"));
    }
    CountingStore {
        inner,
        lists: Cell::new(0),
        topic_reads: Cell::new(0),
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

#[test]
fn refresh_lists_the_store_once() {
    let store = vault();
    let settings = TrackerSettings::default();
    let progress = ProgressService::new(&store, &settings);

    let refresh = progress
        .refresh_topic(&DocumentId::new("Topics/T.md"))
        .unwrap()
        .unwrap();
    assert_eq!(refresh.state.total_count, 9);
    assert_eq!(store.take_lists(), 1);

    progress.snapshot(&DocumentId::new("Topics/T.md")).unwrap();
    assert_eq!(store.take_lists(), 1);
}

#[test]
fn notifications_and_rescans_list_a_bounded_number_of_times() {
    let store = vault();
    let settings = TrackerSettings::default();
    let propagator = ChangePropagator::new(&store, &settings);

    propagator
        .toggle_completion(&DocumentId::new("Subtopics/S0.md"), day())
        .unwrap();
    assert_eq!(store.take_lists(), 1);

    propagator
        .on_changed(&DocumentId::new("Topics/T.md"))
        .unwrap();
    assert_eq!(store.take_lists(), 1);

    let summary = propagator.rescan_all().unwrap();
    assert_eq!(summary.failures, Vec::new());
    assert_eq!(store.take_lists(), 2);

    let rows = ReportService::new(&store, &settings)
        .topics_with_progress()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(store.take_lists(), 2);
}

#[test]
fn stored_progress_matches_rendered_percent_on_ties() {
    let store = vault();
    store.inner.insert(
        "Topics/T.md",
        "---\ntype: topic\nsubtopics: [[[S0]], [[S1]], [[S2]], [[S3]], [[S4]], [[S5]], [[S6]], [[S7]]]\nprogress: 0.00\ncompleted_subtopics: 0\ntotal_subtopics: 8\n---\n# T\n\n## Progress\n\n0% complete\n",
    );
    let settings = TrackerSettings::default();
    let propagator = ChangePropagator::new(&store, &settings);

    propagator
        .toggle_completion(&DocumentId::new("Subtopics/S0.md"), day())
        .unwrap();
    let text = store.read(&DocumentId::new("Topics/T.md")).unwrap();
    assert!(text.contains("progress: 0.13\n"), "{text}");
    assert!(text.contains("completed_subtopics: 1\n"), "{text}");
    assert!(text.contains("13% complete"), "{text}");

    for index in 1..5 {
        propagator
            .toggle_completion(&DocumentId::new(format!("Subtopics/S{index}.md")), day())
            .unwrap();
    }
    let text = store.read(&DocumentId::new("Topics/T.md")).unwrap();
    assert!(text.contains("progress: 0.63\n"), "{text}");
    assert!(text.contains("63% complete"), "{text}");
}

#[test]
fn topic_listing_reads_each_topic_once() {
    let store = vault();
    let settings = TrackerSettings::default();

    let rows = ReportService::new(&store, &settings)
        .topics_with_progress()
        .unwrap();
    assert_eq!(rows[0].name, "T");
    assert_eq!(rows[0].total_count, 9);
    assert_eq!(rows[1].name, "U");
    assert_eq!(rows[1].total_count, 1);
    assert_eq!(store.take_topic_reads(), 2);
}
