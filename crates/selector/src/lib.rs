//! Selector expression compiler and fragment matcher.
//!
//! A selector is a `/`-separated list of steps with glob-style wildcards,
//! optionally rooted and optionally targeting an attribute of the final
//! element:
//!
//! ```text
//! order/items/item          unrooted literal path
//! /order/**/price           rooted, deep wildcard absorbs any run
//! item/*/@id                single-level wildcard, attribute target
//! #document/order           explicit document-root anchor
//! ```
//!
//! [`compile`] turns the text into a [`SelectorPath`]; [`matches`] decides
//! whether a compiled path applies to a concrete
//! [`Fragment`](trellis_core::Fragment).

pub mod compiler;
pub mod matcher;
pub mod parser;
pub mod path;

pub use compiler::{CompileError, DOCUMENT_ROOT_TOKEN, compile};
pub use matcher::{matches, matches_element};
pub use path::{SelectorPath, Step};
