use search_cli::{build_server, load_documents, InputDoc};
use search_core::DocumentStatus;
use std::fs;
use tempfile::tempdir;

#[test]
fn loads_jsonl_and_json_from_a_directory() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("a.jsonl"),
        "{\"id\": 1, \"text\": \"cat in the city\", \"ratings\": [1, 2, 3]}\n\n{\"id\": 2, \"text\": \"dog in the city\", \"status\": \"BANNED\"}\n",
    )
    .unwrap();
    fs::write(dir.path().join("b.json"), r#"[{"id": 3, "text": "bird on a wire"}]"#).unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let docs = load_documents(dir.path()).unwrap();
    assert_eq!(docs.len(), 3);
    assert_eq!(
        docs[0],
        InputDoc { id: 1, text: "cat in the city".into(), status: DocumentStatus::Actual, ratings: vec![1, 2, 3] }
    );
    assert_eq!(docs[1].status, DocumentStatus::Banned);
    assert!(docs[2].ratings.is_empty());

    let server = build_server("in the", &docs).unwrap();
    assert_eq!(server.document_count(), 3);
    let hits = server.find_top_documents("city").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 1);
    assert_eq!(hits[0].rating, 2);
}

#[test]
fn single_object_file_is_accepted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("one.json");
    fs::write(&path, r#"{"id": 9, "text": "lonely doc", "status": "IRRELEVANT"}"#).unwrap();
    let docs = load_documents(&path).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].status, DocumentStatus::Irrelevant);
}

#[test]
fn malformed_line_reports_location() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.jsonl");
    fs::write(&path, "{\"id\": 1, \"text\": \"ok\"}\n{\"id\": \"x\"}\n").unwrap();
    let err = load_documents(&path).unwrap_err();
    assert!(format!("{err:#}").contains("bad.jsonl:2"));
}

#[test]
fn duplicate_ids_fail_the_build() {
    let docs = vec![
        InputDoc { id: 1, text: "a".into(), status: DocumentStatus::Actual, ratings: vec![] },
        InputDoc { id: 1, text: "b".into(), status: DocumentStatus::Actual, ratings: vec![] },
    ];
    let err = build_server("", &docs).unwrap_err();
    assert!(format!("{err:#}").contains("adding document 1"));
}
