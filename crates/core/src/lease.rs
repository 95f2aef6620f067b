use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::fragment::QName;

/// Raised when a second live lease is requested for the same
/// (resource, fragment occurrence) pair.
#[derive(Debug, Clone, Error)]
#[error("output resource '{resource}' of fragment <{fragment}> is already claimed by another visitor")]
pub struct LeaseConflict {
    pub resource: Arc<str>,
    pub fragment: QName,
}

/// Exclusivity record for one output resource of one fragment occurrence.
///
/// A lease is not a RAII guard: visitors may release it early through
/// [`VisitContext::release`](crate::VisitContext::release), and whatever is
/// still held when the current phase callback returns is reclaimed by the
/// dispatch driver, error exits included.
#[derive(Debug)]
pub struct Lease {
    resource: Arc<str>,
    occurrence: u64,
}

impl Lease {
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn occurrence(&self) -> u64 {
        self.occurrence
    }
}

/// Tracks the live leases of one document traversal.
///
/// Owned by the per-document driver; at most one live lease exists per
/// (resource identity, fragment occurrence) pair at any instant.
#[derive(Debug, Default)]
pub struct LeaseTable {
    live: HashSet<(Arc<str>, u64)>,
    scope: Vec<(Arc<str>, u64)>,
}

impl LeaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(
        &mut self,
        resource: &str,
        occurrence: u64,
        fragment: &QName,
    ) -> Result<Lease, LeaseConflict> {
        let resource: Arc<str> = Arc::from(resource);
        let key = (Arc::clone(&resource), occurrence);
        if self.live.contains(&key) {
            return Err(LeaseConflict { resource, fragment: fragment.clone() });
        }
        self.live.insert(key.clone());
        self.scope.push(key);
        Ok(Lease { resource, occurrence })
    }

    pub fn release(&mut self, lease: Lease) {
        let key = (lease.resource, lease.occurrence);
        self.live.remove(&key);
        if let Some(pos) = self.scope.iter().rposition(|held| *held == key) {
            self.scope.remove(pos);
        }
    }

    pub fn is_live(&self, resource: &str, occurrence: u64) -> bool {
        self.live.contains(&(Arc::from(resource), occurrence))
    }

    /// Marks the start of one phase callback; pass the returned marker to
    /// [`end_scope`](Self::end_scope) once the callback has returned.
    pub fn begin_scope(&mut self) -> usize {
        self.scope.len()
    }

    /// Reclaims every lease acquired since the matching [`begin_scope`](Self::begin_scope).
    pub fn end_scope(&mut self, marker: usize) {
        for key in self.scope.drain(marker..) {
            self.live.remove(&key);
        }
    }
}
