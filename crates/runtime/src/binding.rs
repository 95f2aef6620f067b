use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use trellis_core::{ContentVisitor, PhaseSet};
use trellis_selector::SelectorPath;

/// Registration-order identifier of a binding within one engine.
pub type BindingId = usize;

/// Declared capabilities of one registration: produced/consumed data tokens,
/// phase capabilities and an optional depth limit.
///
/// Everything the dependency orderer and the driver need is declared up
/// front as plain data; there is no runtime inspection of the visitor.
#[derive(Debug, Clone)]
pub struct BindingConfig {
    pub(crate) name: Option<Arc<str>>,
    pub(crate) produces: BTreeSet<Arc<str>>,
    pub(crate) consumes: BTreeSet<Arc<str>>,
    pub(crate) phases: PhaseSet,
    pub(crate) max_depth: Option<usize>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            name: None,
            produces: BTreeSet::new(),
            consumes: BTreeSet::new(),
            phases: PhaseSet::all(),
            max_depth: None,
        }
    }
}

impl BindingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Human-readable name used in error and log output.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Tokens this visitor creates or supplies for co-targeted visitors.
    pub fn produces<I, T>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arc<str>>,
    {
        self.produces.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Tokens this visitor requires to already exist when it runs.
    pub fn consumes<I, T>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arc<str>>,
    {
        self.consumes.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Restricts which phase callbacks are delivered. Defaults to all.
    pub fn phases(mut self, phases: PhaseSet) -> Self {
        self.phases = phases;
        self
    }

    /// Skips this visitor for fragments more than `limit` levels below its
    /// shallowest live matched root.
    pub fn max_depth(mut self, limit: usize) -> Self {
        self.max_depth = Some(limit);
        self
    }
}

/// Immutable association of a compiled selector with a visitor and its
/// declared capabilities. Created at configuration time; never mutated once
/// the engine is built.
#[derive(Clone)]
pub struct VisitorBinding {
    pub(crate) id: BindingId,
    pub(crate) selector: SelectorPath,
    pub(crate) visitor: Arc<dyn ContentVisitor>,
    pub(crate) config: BindingConfig,
}

impl VisitorBinding {
    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn selector(&self) -> &SelectorPath {
        &self.selector
    }

    pub fn visitor(&self) -> &dyn ContentVisitor {
        self.visitor.as_ref()
    }

    pub fn produces(&self) -> &BTreeSet<Arc<str>> {
        &self.config.produces
    }

    pub fn consumes(&self) -> &BTreeSet<Arc<str>> {
        &self.config.consumes
    }

    pub fn phases(&self) -> PhaseSet {
        self.config.phases
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.config.max_depth
    }

    /// Diagnostic label: the configured name, or the selector text.
    pub fn label(&self) -> &str {
        self.config.name.as_deref().unwrap_or_else(|| self.selector.source())
    }
}

impl fmt::Debug for VisitorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisitorBinding")
            .field("id", &self.id)
            .field("selector", &self.selector.source())
            .field("produces", &self.config.produces)
            .field("consumes", &self.config.consumes)
            .field("phases", &self.config.phases)
            .field("max_depth", &self.config.max_depth)
            .finish_non_exhaustive()
    }
}
