//! Property-based tests using proptest
//!
//! These tests verify object-name stripping and bucket pattern queries
//! using randomized keys and patterns.

use cloudscan::model::{object_file_name, JobId, NewResource};
use cloudscan::query::QueryFacade;
use cloudscan::store::{MemoryJobStatusStore, MemoryResourceStore, ResourceStore};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Object keys with zero or more path segments
fn arb_object_key() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-z0-9]{1,8}", 0..4),
        "[a-zA-Z0-9_.-]{0,12}",
    )
        .prop_map(|(dirs, file)| {
            let mut key = dirs.join("/");
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(&file);
            key
        })
}

/// Buckets and their object keys
fn arb_inventory() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(
        (prop_oneof!["data", "logs", "backups"], arb_object_key()),
        0..60,
    )
}

fn load(inventory: &[(String, String)]) -> QueryFacade {
    let resources = Arc::new(MemoryResourceStore::new());
    let job = JobId::new();
    for (bucket, key) in inventory {
        let record = NewResource::bucket_object(job, bucket.as_str(), object_file_name(key))
            .expect("bucket names are never empty");
        resources.insert(record).expect("memory insert cannot fail");
    }
    QueryFacade::new(resources, Arc::new(MemoryJobStatusStore::new()))
}

fn counts(details: Vec<String>) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for d in details {
        *map.entry(d).or_insert(0) += 1;
    }
    map
}

proptest! {
    /// The file name is whatever follows the last separator
    #[test]
    fn file_name_follows_last_separator(key in arb_object_key()) {
        let name = object_file_name(&key);
        prop_assert!(!name.contains('/'));
        prop_assert!(key.ends_with(name));
        match key.rfind('/') {
            Some(idx) => prop_assert_eq!(name, &key[idx + 1..]),
            None => prop_assert_eq!(name, key.as_str()),
        }
    }

    /// Same query, no writes in between: same multiset of results
    #[test]
    fn pattern_query_is_idempotent(
        inventory in arb_inventory(),
        pattern in "[a-z0-9.]{0,4}"
    ) {
        let queries = load(&inventory);
        let first = counts(queries.bucket_objects_matching("data", &pattern));
        let second = counts(queries.bucket_objects_matching("data", &pattern));
        prop_assert_eq!(first, second);
    }

    /// The empty pattern matches everything in the bucket
    #[test]
    fn empty_pattern_matches_count(inventory in arb_inventory()) {
        let queries = load(&inventory);
        for bucket in ["data", "logs", "backups", "missing"] {
            prop_assert_eq!(
                queries.bucket_object_count(bucket),
                queries.bucket_objects_matching(bucket, "").len()
            );
        }
    }

    /// Every match contains the pattern and belongs to the bucket
    #[test]
    fn matches_contain_pattern(
        inventory in arb_inventory(),
        pattern in "[a-z0-9.]{1,3}"
    ) {
        let queries = load(&inventory);
        let matches = queries.bucket_objects_matching("logs", &pattern);
        for details in &matches {
            prop_assert!(details.contains(pattern.as_str()));
        }

        let expected = inventory
            .iter()
            .filter(|(bucket, key)| {
                bucket == "logs" && object_file_name(key).contains(pattern.as_str())
            })
            .count();
        prop_assert_eq!(matches.len(), expected);
    }
}
