//! Concurrent aggregation of canonical domains.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::normalizer::is_canonical;

/// Set of unique domains collected during one merge run.
///
/// Shared by reference (usually behind an `Arc`) between fetch tasks for the
/// lifetime of a single run. [`DomainSet::add`] may be called concurrently;
/// [`DomainSet::snapshot`] is meant to be called once every producer is done.
#[derive(Debug, Default)]
pub struct DomainSet {
    domains: Mutex<HashSet<String>>,
}

impl DomainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a domain. Duplicates are no-ops.
    pub fn add(&self, domain: String) {
        self.lock().insert(domain);
    }

    /// Add every domain from an iterator under a single lock acquisition.
    pub fn extend<I: IntoIterator<Item = String>>(&self, domains: I) {
        self.lock().extend(domains);
    }

    /// Number of unique domains collected so far
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sorted, duplicate-free view of the set.
    ///
    /// Entries that are not canonical (empty, leading dot, comment markers)
    /// are dropped here as a last line of defense.
    pub fn snapshot(&self) -> Vec<String> {
        let mut domains: Vec<String> = self
            .lock()
            .iter()
            .filter(|d| is_canonical(d))
            .cloned()
            .collect();
        domains.sort_unstable();
        domains
    }

    // A panic in one producer must not discard what the others collected.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.domains.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
