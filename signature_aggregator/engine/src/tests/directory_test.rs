use std::io::Write;

use crate::directory::{NodeDirectory, StaticNodeDirectory};
use crate::error::AggregatorError;
use crate::types::{NodeId, NodeIdentity};

#[test]
fn test_loads_node_list_from_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{"id": "1", "host": "10.0.0.1", "port": 5001}},
            {{"id": "2", "host": "signer-2.internal", "port": 5002}}
        ]"#
    )
    .unwrap();

    let directory = StaticNodeDirectory::from_json_file(file.path()).unwrap();

    assert_eq!(directory.len(), 2);
    let node = directory.lookup(&NodeId::from("2")).unwrap();
    assert_eq!(node.host, "signer-2.internal");
    assert_eq!(node.endpoint("http", "/v1/sign"), "http://signer-2.internal:5002/v1/sign");
}

#[test]
fn test_unknown_id_is_reported() {
    let directory = StaticNodeDirectory::new().with_node("1", "localhost", 5001);

    match directory.lookup(&NodeId::from("7")) {
        Err(AggregatorError::UnknownNode(id)) => assert_eq!(id, NodeId::from("7")),
        other => panic!("expected UnknownNode, got {other:?}"),
    }
}

#[test]
fn test_duplicate_ids_are_rejected() {
    let node = |port| NodeIdentity { id: NodeId::from("1"), host: "localhost".into(), port };
    let result = StaticNodeDirectory::from_nodes([node(5001), node(5002)]);
    assert!(matches!(result, Err(AggregatorError::DirectoryError(_))));
}

#[test]
fn test_missing_or_malformed_file() {
    let missing = StaticNodeDirectory::from_json_file("/nonexistent/nodes.json");
    assert!(matches!(missing, Err(AggregatorError::DirectoryError(_))));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"id": "1"}}"#).unwrap();
    let malformed = StaticNodeDirectory::from_json_file(file.path());
    assert!(matches!(malformed, Err(AggregatorError::SerdeError(_))));
}
