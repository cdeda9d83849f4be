use dontpad_common::types::{Version, VersionIndex};

fn load_fixture() -> String {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/metadata.json");
    std::fs::read_to_string(path).expect("fixture should be readable")
}

#[test]
fn parses_index_written_by_the_web_server() {
    let index: VersionIndex =
        serde_json::from_str(&load_fixture()).expect("fixture should match VersionIndex");
    assert_eq!(index.versions.len(), 2);

    let root = &index.versions[0];
    assert_eq!(root.subdocument_name, None);
    assert_eq!(root.label.as_deref(), Some("Antes da limpeza"));
    assert_eq!(root.created_by, None);

    let sub = &index.versions[1];
    assert_eq!(sub.subdocument_name.as_deref(), Some("bolos"));
    assert_eq!(sub.created_by.as_deref(), Some("ana"));
    assert_eq!(sub.size, 512);
}

#[test]
fn reserializing_keeps_the_same_json() {
    let raw = load_fixture();
    let index: VersionIndex = serde_json::from_str(&raw).expect("fixture should parse");
    let expected: serde_json::Value = serde_json::from_str(&raw).expect("fixture is json");
    assert_eq!(serde_json::to_value(&index).expect("index should serialize"), expected);
}

#[test]
fn version_ids_start_with_their_timestamp() {
    let index: VersionIndex = serde_json::from_str(&load_fixture()).expect("fixture should parse");
    for Version { id, timestamp, .. } in &index.versions {
        assert!(id.starts_with(&format!("{timestamp}-")), "{id} should start with {timestamp}");
    }
}
