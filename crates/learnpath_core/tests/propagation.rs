use chrono::NaiveDate;
use learnpath_core::{
    ChangePropagator, DocumentId, IgnoreReason, InMemoryDocumentStore, PropagationStep,
    StoreError, TrackerError, TrackerSettings,
};

const AWS: &str = "---\ntype: topic\nsubtopics: [[[S3]], [[EC2]]]\nprogress: 0.00\ncompleted_subtopics: 0\ntotal_subtopics: 2\n---\n# AWS\n\n## Progress\n\n0% complete\n\n## Subtopics\n\n- [[S3]] ❌\n- [[EC2]] ❌\n";

fn subtopic(parent: &str, completed: bool) -> String {
    let status = if completed {
        "✅ Completed"
    } else {
        "❌ Not completed"
    };
    format!(
        "---\ntype: subtopic\nparent: \"[[{parent}]]\"\ncompleted: {completed}\n---\n# Unit\n\nStatus: {status}\n"
    )
}

fn seeded_store() -> (InMemoryDocumentStore, DocumentId, DocumentId) {
    let store = InMemoryDocumentStore::new();
    let aws = store.insert("Topics/AWS.md", AWS);
    let s3 = store.insert("Subtopics/S3.md", subtopic("AWS", false));
    store.insert("Subtopics/EC2.md", subtopic("AWS", false));
    (store, aws, s3)
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

#[test]
fn toggle_updates_subtopic_then_parent() {
    let (store, aws, s3) = seeded_store();
    let settings = TrackerSettings::default();
    let propagator = ChangePropagator::new(&store, &settings);

    let outcome = propagator.toggle_completion(&s3, day()).unwrap();
    assert!(outcome.completed);
    let parent = outcome.parent.unwrap();
    assert_eq!(parent.topic, aws);
    assert!(parent.changed);
    assert_eq!(parent.state.completed_count, 1);
    assert_eq!(parent.state.total_count, 2);

    assert_eq!(
        store.get(&s3).unwrap(),
        "---\ntype: subtopic\nparent: \"[[AWS]]\"\ncompleted: true\ncompletion_date: 2024-01-15\n---\n# Unit\n\nStatus: ✅ Completed\n"
    );
    assert_eq!(
        store.get(&aws).unwrap(),
        "---\ntype: topic\nsubtopics: [[[S3]], [[EC2]]]\nprogress: 0.50\ncompleted_subtopics: 1\ntotal_subtopics: 2\n---\n# AWS\n\n## Progress\n\n50% complete\n\n## Subtopics\n\n- [[S3]] ✅\n- [[EC2]] ❌\n"
    );
    assert_eq!(store.take_changes(), vec![s3, aws]);
}

#[test]
fn replayed_change_notifications_settle_without_writes() {
    let (store, _aws, s3) = seeded_store();
    let settings = TrackerSettings::default();
    let propagator = ChangePropagator::new(&store, &settings);

    propagator.toggle_completion(&s3, day()).unwrap();
    let changes = store.take_changes();
    assert_eq!(changes.len(), 2);

    for id in &changes {
        let refresh = propagator.on_changed(id).unwrap().unwrap();
        assert!(!refresh.changed);
    }
    assert!(store.take_changes().is_empty());
}

#[test]
fn reopening_recomputes_parent() {
    let (store, aws, s3) = seeded_store();
    let settings = TrackerSettings::default();
    let propagator = ChangePropagator::new(&store, &settings);

    propagator.toggle_completion(&s3, day()).unwrap();
    let outcome = propagator.toggle_completion(&s3, day()).unwrap();
    assert!(!outcome.completed);

    let topic = store.get(&aws).unwrap();
    assert!(topic.contains("progress: 0.00\n"));
    assert!(topic.contains("completed_subtopics: 0\n"));
    assert!(topic.contains("\n0% complete\n"));
    assert!(topic.contains("- [[S3]] ❌\n"));
    assert!(store.get(&s3).unwrap().contains("completion_date: 2024-01-15\n"));
}

#[test]
fn dangling_subtopic_counts_toward_total_only() {
    let store = InMemoryDocumentStore::new();
    let topic = store.insert(
        "Topics/Cloud.md",
        "---\ntype: topic\nsubtopics:\n  - \"[[S3]]\"\n  - \"[[Networking]]\"\nprogress: 0.00\ncompleted_subtopics: 0\ntotal_subtopics: 0\n---\n## Progress\n\n## Subtopics\n",
    );
    store.insert("Subtopics/S3.md", subtopic("Cloud", true));
    let settings = TrackerSettings::default();
    let propagator = ChangePropagator::new(&store, &settings);

    let refresh = propagator.on_changed(&topic).unwrap().unwrap();
    assert_eq!(refresh.state.completed_count, 1);
    assert_eq!(refresh.state.total_count, 2);

    let text = store.get(&topic).unwrap();
    assert!(text.contains("progress: 0.50\n"));
    assert!(text.contains("total_subtopics: 2\n"));
    assert!(text.contains("- [[S3]] ✅\n- ❓ [[Networking]] (Missing)\n"));
    assert!(text.contains("## Progress\n\n50% complete\n\n## Subtopics"));
}

#[test]
fn classify_ignores_untracked_changes() {
    let store = InMemoryDocumentStore::new();
    let plain = store.insert("Notes/plain.md", "# No metadata\n");
    let untyped = store.insert("Notes/untyped.md", "---\ntags: [x]\n---\n");
    let orphan = store.insert("Subtopics/Orphan.md", subtopic("Ghost", false));
    let parentless = store.insert("Subtopics/Loose.md", "---\ntype: subtopic\n---\n");
    let settings = TrackerSettings::default();
    let propagator = ChangePropagator::new(&store, &settings);

    let reason = |id: &DocumentId| match propagator.classify(id).unwrap() {
        PropagationStep::Ignore(reason) => reason,
        other => panic!("expected ignore, got {other:?}"),
    };
    assert_eq!(reason(&plain), IgnoreReason::MissingMetadata);
    assert_eq!(reason(&untyped), IgnoreReason::Untracked);
    assert_eq!(reason(&orphan), IgnoreReason::DanglingParent("Ghost".to_string()));
    assert_eq!(reason(&parentless), IgnoreReason::NoParent);
    assert_eq!(
        reason(&DocumentId::new("Subtopics/Gone.md")),
        IgnoreReason::DocumentMissing
    );
    assert_eq!(propagator.on_changed(&orphan).unwrap(), None);
}

#[test]
fn classify_routes_topics_and_subtopics() {
    let (store, aws, s3) = seeded_store();
    let settings = TrackerSettings::default();
    let propagator = ChangePropagator::new(&store, &settings);

    assert_eq!(
        propagator.classify(&aws).unwrap(),
        PropagationStep::UpdateSelf(aws.clone())
    );
    assert_eq!(
        propagator.classify(&s3).unwrap(),
        PropagationStep::UpdateParent {
            subtopic: s3.clone(),
            parent: aws
        }
    );
}

#[test]
fn failed_parent_write_leaves_parent_stale_until_rescan() {
    let (store, aws, s3) = seeded_store();
    let settings = TrackerSettings::default();
    let propagator = ChangePropagator::new(&store, &settings);
    store.reject_writes_to(&aws);

    let err = propagator.toggle_completion(&s3, day()).unwrap_err();
    assert!(matches!(
        err,
        TrackerError::Store(StoreError::WriteRejected(ref id)) if *id == aws
    ));
    assert!(store.get(&s3).unwrap().contains("completed: true\n"));
    assert_eq!(store.get(&aws).unwrap(), AWS);

    store.accept_writes_to(&aws);
    let summary = propagator.rescan_all().unwrap();
    assert_eq!(summary.updated, vec![aws.clone()]);
    assert_eq!(summary.unchanged, 0);
    assert!(summary.failures.is_empty());
    assert!(store.get(&aws).unwrap().contains("progress: 0.50\n"));
}

#[test]
fn rescan_continues_past_failing_topics() {
    let (store, aws, _s3) = seeded_store();
    let stale = store.insert(
        "Topics/Empty.md",
        "---\ntype: topic\nsubtopics: []\nprogress: 0.40\n---\n",
    );
    let settings = TrackerSettings::default();
    let propagator = ChangePropagator::new(&store, &settings);
    store.reject_writes_to(&stale);

    let summary = propagator.rescan_all().unwrap();
    assert!(summary.updated.is_empty());
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, stale);
    assert_eq!(store.get(&aws).unwrap(), AWS);
}

#[test]
fn toggle_rejects_non_subtopics() {
    let (store, aws, _s3) = seeded_store();
    let settings = TrackerSettings::default();
    let propagator = ChangePropagator::new(&store, &settings);

    let err = propagator.toggle_completion(&aws, day()).unwrap_err();
    assert!(matches!(err, TrackerError::NotSubtopic(_)));
    assert!(store.take_changes().is_empty());
}

#[test]
fn clearing_policy_empties_date_on_reopen() {
    let (store, _aws, s3) = seeded_store();
    let settings = TrackerSettings {
        clear_completion_date_on_reopen: true,
        ..TrackerSettings::default()
    };
    let propagator = ChangePropagator::new(&store, &settings);

    propagator.toggle_completion(&s3, day()).unwrap();
    propagator.toggle_completion(&s3, day()).unwrap();
    let text = store.get(&s3).unwrap();
    assert!(text.contains("completed: false\ncompletion_date:\n"));
}
