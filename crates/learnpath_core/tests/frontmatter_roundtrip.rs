use chrono::NaiveDate;
use learnpath_core::frontmatter::{
    append_to_list_field, get_field, upsert_field, FieldShape, FieldValue, ParsedDocument,
};
use learnpath_core::{extract_name, Document, DocumentId, DocumentKind};

const SAMPLES: [&str; 5] = [
    "---\ntype: topic\nsubtopics: [[[S3]], [[EC2]]]\n---\n# AWS\n",
    "\u{feff}---\r\ntype: subtopic\r\nparent: \"[[AWS]]\"\r\n---\r\nStatus: ❌ Not completed\r\n",
    "---\n# comment: kept\ntags:\n    - 'a'\n    - b\n---",
    "---\n---\nempty block\n",
    "---\ntitle: x\n---   \n\n\n",
];

#[test]
fn parse_then_serialize_is_identity() {
    for sample in SAMPLES {
        let parsed = ParsedDocument::parse(sample).unwrap();
        assert_eq!(parsed.serialize(), sample);
    }
}

#[test]
fn missing_or_unterminated_blocks_are_not_metadata() {
    for raw in [
        "# Title\n---\ntype: topic\n---\n",
        "---\ntype: topic\nno closing marker\n",
        "---",
        "",
    ] {
        assert_eq!(ParsedDocument::parse(raw), None, "{raw:?}");
        let document = Document::new(DocumentId::new("x.md"), raw);
        assert_eq!(document.kind(), DocumentKind::Other);
    }
}

#[test]
fn upsert_is_idempotent_per_shape() {
    let block = "type: topic\nflag: false\nday: 2023-12-31\ntags: [a, b]\nitems:\n  - x\n";
    let values = [
        ("flag", FieldValue::Bool(true)),
        (
            "day",
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
        ),
        (
            "tags",
            FieldValue::List(vec!["a".to_string(), "c".to_string()]),
        ),
        (
            "items",
            FieldValue::List(vec!["x".to_string(), "y".to_string()]),
        ),
        ("fresh", FieldValue::Text("value".to_string())),
    ];
    for (name, value) in values {
        let once = upsert_field(block, name, &value);
        assert_ne!(once, block, "{name}");
        assert_eq!(upsert_field(&once, name, &value), once, "{name}");
    }
}

#[test]
fn upsert_keeps_each_layout() {
    let block = "tags: [a, b]\nitems:\n    - x\nflag: false\n";
    let updated = upsert_field(
        block,
        "tags",
        &FieldValue::List(vec!["a".to_string(), "c".to_string()]),
    );
    assert_eq!(updated, "tags: [a, c]\nitems:\n    - x\nflag: false\n");

    let updated = upsert_field(
        &updated,
        "items",
        &FieldValue::List(vec!["x".to_string(), "y".to_string()]),
    );
    assert_eq!(updated, "tags: [a, c]\nitems:\n    - x\n    - y\nflag: false\n");

    let field = get_field(&updated, "items").unwrap();
    assert_eq!(field.shape, FieldShape::BlockList);
    assert_eq!(field.as_list(), vec!["x", "y"]);
}

#[test]
fn append_skips_exact_duplicates() {
    let block = "subtopics:\n  - \"[[S3]]\"\ntype: topic\n";
    assert_eq!(append_to_list_field(block, "subtopics", "[[S3]]"), block);
    assert_eq!(
        append_to_list_field(block, "subtopics", "[[EC2]]"),
        "subtopics:\n  - \"[[S3]]\"\n  - \"[[EC2]]\"\ntype: topic\n"
    );
}

#[test]
fn reference_names_are_extracted() {
    assert_eq!(extract_name("[[S3 Buckets]]"), "S3 Buckets");
    assert_eq!(extract_name("S3 Buckets"), "S3 Buckets");
}
