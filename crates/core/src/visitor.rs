use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

use crate::fragment::{Fragment, QName};
use crate::lease::{Lease, LeaseConflict, LeaseTable};

bitflags! {
    /// Phase capabilities a binding declares at registration time.
    ///
    /// Only callbacks whose phase is present in the declared set are ever
    /// delivered; a visitor interested in aggregate content typically
    /// declares `AFTER` alone.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PhaseSet: u8 {
        const BEFORE = 1 << 0;
        const CHILD_TEXT = 1 << 1;
        const CHILD_ELEMENT = 1 << 2;
        const AFTER = 1 << 3;
    }
}

/// One dispatch phase of a fragment occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Before,
    ChildText,
    ChildElement,
    After,
}

impl Phase {
    pub fn as_set(self) -> PhaseSet {
        match self {
            Self::Before => PhaseSet::BEFORE,
            Self::ChildText => PhaseSet::CHILD_TEXT,
            Self::ChildElement => PhaseSet::CHILD_ELEMENT,
            Self::After => PhaseSet::AFTER,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Before => "before",
            Self::ChildText => "child-text",
            Self::ChildElement => "child-element",
            Self::After => "after",
        };
        f.write_str(name)
    }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by a visitor callback.
///
/// Dispatch of the current document stops at the first visitor error; the
/// driver wraps it with the selector, phase and fragment it was raised for.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct VisitError(#[from] BoxError);

impl VisitError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into().into())
    }

    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

impl From<LeaseConflict> for VisitError {
    fn from(conflict: LeaseConflict) -> Self {
        Self(Box::new(conflict))
    }
}

pub type VisitResult = Result<(), VisitError>;

/// Per-callback view of the document's mutable dispatch state.
///
/// Constructed by the driver for every delivered callback; the occurrence id
/// identifies the fragment occurrence leases are scoped to.
pub struct VisitContext<'a> {
    leases: &'a mut LeaseTable,
    occurrence: u64,
    fragment: QName,
}

impl<'a> VisitContext<'a> {
    pub fn new(leases: &'a mut LeaseTable, occurrence: u64, fragment: QName) -> Self {
        Self { leases, occurrence, fragment }
    }

    /// Claims exclusive access to an output resource of the current fragment.
    pub fn acquire(&mut self, resource: &str) -> Result<Lease, LeaseConflict> {
        self.leases.acquire(resource, self.occurrence, &self.fragment)
    }

    /// Releases a lease before the current callback returns.
    pub fn release(&mut self, lease: Lease) {
        self.leases.release(lease);
    }

    pub fn occurrence(&self) -> u64 {
        self.occurrence
    }

    /// Name of the fragment the current callback was dispatched for.
    pub fn fragment(&self) -> &QName {
        &self.fragment
    }
}

impl fmt::Debug for VisitContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisitContext")
            .field("occurrence", &self.occurrence)
            .field("fragment", &self.fragment)
            .finish_non_exhaustive()
    }
}

/// Handler invoked for fragments its selector matches.
///
/// All callbacks default to no-ops so implementations only override the
/// phases they declared. Implementations shared across concurrently processed
/// documents must not keep per-document mutable state; obtain one instance
/// per execution context from a pooling collaborator instead.
pub trait ContentVisitor: Send + Sync {
    /// Called when a matched fragment is entered, before any of its children
    /// have been streamed.
    fn visit_before(&self, _fragment: &dyn Fragment, _ctx: &mut VisitContext<'_>) -> VisitResult {
        Ok(())
    }

    /// Called for every text run directly under the matched fragment.
    fn visit_child_text(
        &self,
        _text: &str,
        _fragment: &dyn Fragment,
        _ctx: &mut VisitContext<'_>,
    ) -> VisitResult {
        Ok(())
    }

    /// Called for every child element directly under the matched fragment,
    /// before that child is itself entered.
    fn visit_child_element(
        &self,
        _child: &dyn Fragment,
        _fragment: &dyn Fragment,
        _ctx: &mut VisitContext<'_>,
    ) -> VisitResult {
        Ok(())
    }

    /// Called when the matched fragment is left, after all children have
    /// been streamed.
    fn visit_after(&self, _fragment: &dyn Fragment, _ctx: &mut VisitContext<'_>) -> VisitResult {
        Ok(())
    }
}
