//! Core contracts shared by the trellis selector and runtime crates.
//!
//! This crate defines the three seams everything else is written against:
//!
//! - [`Fragment`]: a borrowed, read-only view of one document node at the
//!   moment it is visited, including its ancestor-name chain. Materialized
//!   trees and streaming open-element stacks both implement it, so the
//!   matcher and the dispatch driver never branch on the tree kind.
//! - [`ContentVisitor`]: the handler contract with one callback per dispatch
//!   phase. Which callbacks are actually delivered is controlled by the
//!   [`PhaseSet`] a binding declares at registration time, not by reflection.
//! - [`LeaseTable`] / [`VisitContext`]: exclusive write access to a shared
//!   output resource for one fragment occurrence at a time.

pub mod fragment;
pub mod lease;
pub mod visitor;

pub use fragment::{Fragment, QName};
pub use lease::{Lease, LeaseConflict, LeaseTable};
pub use visitor::{BoxError, ContentVisitor, Phase, PhaseSet, VisitContext, VisitError, VisitResult};
