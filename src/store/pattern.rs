//! Bucket-scoped detail matching
//!
//! Despite the "pattern" name used at the API surface, matching is literal
//! case-sensitive substring containment. No glob or regex syntax is
//! interpreted, so `*.csv` only matches details containing that exact text.

use crate::model::Resource;

/// Matches records of one bucket whose details contain a literal needle
#[derive(Debug, Clone, Copy)]
pub struct BucketPattern<'a> {
    bucket_name: &'a str,
    needle: &'a str,
}

impl<'a> BucketPattern<'a> {
    pub fn new(bucket_name: &'a str, needle: &'a str) -> Self {
        Self {
            bucket_name,
            needle,
        }
    }

    /// An empty needle matches every record of the bucket
    pub fn matches(&self, resource: &Resource) -> bool {
        resource.bucket_name.as_deref() == Some(self.bucket_name)
            && resource.details.contains(self.needle)
    }
}
