//! Routing runtime: binding index, dependency ordering and dispatch.
//!
//! An [`Engine`] is assembled once from (selector, visitor, capabilities)
//! registrations and is immutable afterwards; per document, a
//! [`DocumentDriver`] consumes open/close events from the producing
//! collaborator and invokes the matched visitors phase by phase.
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::{ContentVisitor, Fragment, VisitContext, VisitResult};
//! use trellis_runtime::{BindingConfig, Engine};
//! use trellis_runtime::tree::elem;
//!
//! struct PriceTotaler;
//! impl ContentVisitor for PriceTotaler {
//!     fn visit_after(&self, _f: &dyn Fragment, _ctx: &mut VisitContext<'_>) -> VisitResult {
//!         Ok(())
//!     }
//! }
//!
//! let mut builder = Engine::builder();
//! builder
//!     .register("order/**/price", Arc::new(PriceTotaler), BindingConfig::new())
//!     .unwrap();
//! let engine = builder.build().unwrap();
//!
//! let doc = elem("order").child(elem("items").child(elem("price").text("9.50"))).build();
//! engine.traverse(&doc).unwrap();
//! ```

pub mod binding;
pub mod driver;
pub mod engine;
pub mod index;
pub mod order;
pub mod tree;

pub use binding::{BindingConfig, BindingId, VisitorBinding};
pub use driver::{DispatchError, DocumentDriver, FragmentState};
pub use engine::{ConfigError, Engine, EngineBuilder};
pub use index::BindingIndex;
pub use order::CycleError;
pub use tree::{Content, Element, ElementBuilder, elem};
