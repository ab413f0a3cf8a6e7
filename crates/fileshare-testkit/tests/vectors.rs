//! Authorization decision vectors.

use fileshare_testkit::vectors::{all_vectors, evaluate, Expected};

#[test]
fn test_all_vectors() {
    for vector in all_vectors() {
        let decision = evaluate(&vector);
        match vector.expected {
            Expected::Allow(tier) => {
                assert_eq!(decision.tier(), Some(tier), "vector '{}'", vector.name);
                assert_eq!(
                    decision.record_link_access().is_some(),
                    vector.records_access,
                    "vector '{}' link accounting",
                    vector.name
                );
            }
            Expected::Deny(reason) => {
                assert_eq!(decision.reason(), Some(reason), "vector '{}'", vector.name);
                assert!(decision.record_link_access().is_none());
            }
        }
    }
}

#[test]
fn test_vectors_are_deterministic() {
    for vector in all_vectors() {
        assert_eq!(
            evaluate(&vector).tier(),
            evaluate(&vector).tier(),
            "vector '{}'",
            vector.name
        );
    }
}
