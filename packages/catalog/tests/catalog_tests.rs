//! Catalog-level tests: registration, metadata, and dispatch wiring.

use std::collections::HashSet;

use opswarm::OpRegistry;
use serde_json::json;

const EXPECTED_OPS: &[&str] = &[
    "echo",
    "fibonacci",
    "map_classify_tpu",
    "map_summarize",
    "map_tokenize",
    "prime_factor",
    "read_csv_shard",
    "risk_accumulate",
    "sat_verify",
    "subset_sum",
];

#[test]
fn catalog_contains_every_op_exactly_once() {
    let catalog = opswarm_catalog::get_catalog();
    let mut names: Vec<String> = catalog.iter().map(|op| op.get_op().name.clone()).collect();
    names.sort();

    for expected in EXPECTED_OPS {
        assert_eq!(
            names.iter().filter(|n| n.as_str() == *expected).count(),
            1,
            "op {expected} should be registered exactly once"
        );
    }
}

#[test]
fn every_op_has_description_and_category() {
    for op in opswarm_catalog::get_catalog() {
        let meta = op.get_op();
        assert!(!meta.name.is_empty());
        assert!(!meta.description.is_empty());
        assert!(!meta.category.is_empty());
    }
}

#[test]
fn registry_restriction_matches_enabled_set() {
    let enabled: HashSet<String> = ["echo".to_string(), "fibonacci".to_string()].into();
    let registry = OpRegistry::from_ops(opswarm_catalog::get_catalog()).restrict(Some(&enabled));
    assert_eq!(registry.names(), vec!["echo", "fibonacci"]);
}

#[tokio::test]
async fn dispatch_through_registry() {
    let registry = OpRegistry::from_ops(opswarm_catalog::get_catalog()).restrict(None);
    let echo = registry.get("echo").expect("echo registered");
    let out = echo.run(&json!({"ping": 1})).await.unwrap();
    assert_eq!(out["echo"], json!({"ping": 1}));

    assert!(registry.get("no_such_op").is_none());
}
