//! Engine assembly: registration, validation and the immutable snapshot.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use trellis_core::ContentVisitor;
use trellis_selector::{CompileError, compile};

use crate::binding::{BindingConfig, BindingId, VisitorBinding};
use crate::driver::{DispatchError, DocumentDriver};
use crate::index::BindingIndex;
use crate::order::{self, CycleError};
use crate::tree::{Content, Element};

/// Fatal error during engine construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

/// Collects bindings, then compiles the immutable engine snapshot.
#[derive(Debug, Default)]
pub struct EngineBuilder {
    bindings: Vec<VisitorBinding>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and registers one binding. Malformed selectors fail here,
    /// before any engine exists.
    pub fn register(
        &mut self,
        selector: &str,
        visitor: Arc<dyn ContentVisitor>,
        config: BindingConfig,
    ) -> Result<BindingId, CompileError> {
        let selector = compile(selector)?;
        let id = self.bindings.len();
        debug!(selector = %selector, id, "binding registered");
        self.bindings.push(VisitorBinding { id, selector, visitor, config });
        Ok(id)
    }

    /// Builds the immutable snapshot: dependency ranks first (a cycle among
    /// co-targeted bindings aborts construction), then the leaf-name index.
    pub fn build(self) -> Result<Engine, ConfigError> {
        let rank = order::dispatch_ranks(&self.bindings)?;
        let index = BindingIndex::build(&self.bindings);
        debug!(
            bindings = self.bindings.len(),
            buckets = index.bucket_count(),
            catch_all = index.catch_all_len(),
            "engine built"
        );
        Ok(Engine { bindings: self.bindings, index, rank })
    }
}

/// Immutable routing configuration: compiled selectors, the binding index
/// and the precomputed dispatch order.
///
/// Share one engine across threads via `Arc` and create one
/// [`DocumentDriver`] per document; the engine itself is never mutated
/// after build, so the matching hot path takes no locks.
#[derive(Debug)]
pub struct Engine {
    bindings: Vec<VisitorBinding>,
    index: BindingIndex,
    rank: Vec<usize>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Starts dispatch for one document.
    pub fn document(&self) -> DocumentDriver<'_> {
        DocumentDriver::new(self)
    }

    pub fn bindings(&self) -> &[VisitorBinding] {
        &self.bindings
    }

    pub(crate) fn index(&self) -> &BindingIndex {
        &self.index
    }

    pub(crate) fn rank(&self) -> &[usize] {
        &self.rank
    }

    /// Replays a materialized tree through the streaming protocol in
    /// document order.
    pub fn traverse(&self, root: &Element) -> Result<(), DispatchError> {
        let mut driver = self.document();
        walk(&mut driver, root, true)?;
        driver.finish()
    }
}

fn walk(driver: &mut DocumentDriver<'_>, element: &Element, is_root: bool) -> Result<(), DispatchError> {
    if !is_root {
        driver.child_element(element)?;
    }
    driver.enter_fragment(element)?;
    for child in element.children() {
        match child {
            Content::Text(text) => driver.child_text(&text)?,
            Content::Element(inner) => walk(driver, &inner, false)?,
        }
    }
    driver.leave_fragment(element)
}
