//! Per-document dispatch driver.
//!
//! One driver exists per document traversal and is strictly sequential: the
//! producing collaborator feeds it open/close events in nesting order, and
//! the driver invokes the matched visitors at the correct phase, in the
//! engine's precomputed dependency order, with lease scoping around every
//! callback.
//!
//! Traversal protocol, per element: announce the element to its open parent
//! with [`child_element`](DocumentDriver::child_element) (skipped for the
//! root), then [`enter_fragment`](DocumentDriver::enter_fragment), then any
//! number of [`child_text`](DocumentDriver::child_text) /
//! child-element/enter/leave groups for its content, then
//! [`leave_fragment`](DocumentDriver::leave_fragment).

use std::sync::Arc;

use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, trace};

use trellis_core::{Fragment, LeaseTable, Phase, QName, VisitContext, VisitError};
use trellis_selector::matcher;

use crate::binding::BindingId;
use crate::engine::Engine;

/// Lifecycle of one fragment occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentState {
    /// Pushed, before-phase callbacks running or about to run.
    Entering,
    /// Children are being streamed under it.
    ChildStreaming,
    /// After-phase callbacks running; popped when they return.
    Leaving,
}

/// Error raised while driving one document's dispatch. Any error poisons the
/// driver: further events are rejected, other documents are unaffected.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("visitor '{binding}' failed during {phase} of <{fragment}>: {source}")]
    Visitor {
        binding: String,
        phase: Phase,
        fragment: QName,
        #[source]
        source: VisitError,
    },
    #[error("traversal protocol violation: {0}")]
    Protocol(String),
    #[error("document dispatch already aborted by an earlier error")]
    Poisoned,
}

#[derive(Debug)]
struct OpenFragment {
    name: QName,
    attributes: Vec<(QName, Arc<str>)>,
    /// Every binding the matcher confirmed for this occurrence.
    matched: SmallVec<[BindingId; 4]>,
    /// The matched subset that passed depth gating, in dispatch rank order.
    bucket: SmallVec<[BindingId; 4]>,
    occurrence: u64,
    state: FragmentState,
}

/// Fragment view over the driver's open-element stack. The ancestor chain is
/// exactly the elements below `index`, so streaming dispatch matches against
/// the same shape of data as materialized trees.
struct StackFragment<'a> {
    stack: &'a [OpenFragment],
    index: usize,
}

impl Fragment for StackFragment<'_> {
    fn qname(&self) -> QName {
        self.stack[self.index].name.clone()
    }

    fn ancestors(&self) -> Box<dyn Iterator<Item = QName> + '_> {
        Box::new(self.stack[..self.index].iter().rev().map(|open| open.name.clone()))
    }

    fn attribute(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.stack[self.index]
            .attributes
            .iter()
            .find(|(qn, _)| qn.local() == name && qn.namespace() == namespace)
            .map(|(_, value)| &**value)
    }

    fn attributes(&self) -> Vec<(QName, Arc<str>)> {
        self.stack[self.index].attributes.clone()
    }
}

#[derive(Clone, Copy)]
enum PhasePayload<'x> {
    Event,
    Text(&'x str),
    Child(&'x dyn Fragment),
}

/// Drives dispatch for one document. Create via [`Engine::document`].
pub struct DocumentDriver<'e> {
    engine: &'e Engine,
    stack: Vec<OpenFragment>,
    leases: LeaseTable,
    /// Per binding: depths of its currently open matched fragments; the
    /// first entry is the shallowest live matched root for depth gating.
    matched_roots: Vec<SmallVec<[usize; 2]>>,
    next_occurrence: u64,
    poisoned: bool,
}

impl<'e> DocumentDriver<'e> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            stack: Vec::new(),
            leases: LeaseTable::new(),
            matched_roots: vec![SmallVec::new(); engine.bindings().len()],
            next_occurrence: 0,
            poisoned: false,
        }
    }

    /// Nesting depth of the currently open fragment (root element is 1).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// State of the innermost open fragment, if any.
    pub fn state(&self) -> Option<FragmentState> {
        self.stack.last().map(|open| open.state)
    }

    fn guard(&self) -> Result<(), DispatchError> {
        if self.poisoned { Err(DispatchError::Poisoned) } else { Ok(()) }
    }

    /// Opens a fragment: matches bindings against the new stack top and runs
    /// the before phase in dependency order.
    pub fn enter_fragment(&mut self, view: &dyn Fragment) -> Result<(), DispatchError> {
        self.guard()?;
        let occurrence = self.next_occurrence;
        self.next_occurrence += 1;
        let name = view.qname();
        self.stack.push(OpenFragment {
            name: name.clone(),
            attributes: view.attributes(),
            matched: SmallVec::new(),
            bucket: SmallVec::new(),
            occurrence,
            state: FragmentState::Entering,
        });
        let top = self.stack.len() - 1;
        let depth = self.stack.len();

        let engine = self.engine;
        let mut matched: SmallVec<[BindingId; 4]> = {
            let fragment = StackFragment { stack: &self.stack, index: top };
            engine
                .index()
                .candidates_for(name.local())
                .filter(|id| matcher::matches(engine.bindings()[*id].selector(), &fragment))
                .collect()
        };
        matched.sort_unstable_by_key(|id| engine.rank()[*id]);

        let mut bucket: SmallVec<[BindingId; 4]> = SmallVec::new();
        for &id in &matched {
            let roots = &mut self.matched_roots[id];
            let within = match (engine.bindings()[id].max_depth(), roots.first()) {
                (Some(limit), Some(&root)) => depth - root <= limit,
                _ => true,
            };
            roots.push(depth);
            if within {
                bucket.push(id);
            } else {
                trace!(binding = engine.bindings()[id].label(), depth, "skipped by max depth");
            }
        }
        debug!(fragment = %name, occurrence, matched = bucket.len(), "fragment entered");
        self.stack[top].matched = matched;
        self.stack[top].bucket = bucket;

        self.run_phase(top, Phase::Before, PhasePayload::Event)?;
        self.stack[top].state = FragmentState::ChildStreaming;
        Ok(())
    }

    /// Delivers a text run to the open fragment's active visitors.
    pub fn child_text(&mut self, text: &str) -> Result<(), DispatchError> {
        self.guard()?;
        let Some(top) = self.stack.len().checked_sub(1) else {
            return Err(DispatchError::Protocol("text outside any open fragment".into()));
        };
        self.stack[top].state = FragmentState::ChildStreaming;
        self.run_phase(top, Phase::ChildText, PhasePayload::Text(text))
    }

    /// Announces a direct child element to the open fragment's active
    /// visitors; the child itself is entered separately.
    pub fn child_element(&mut self, child: &dyn Fragment) -> Result<(), DispatchError> {
        self.guard()?;
        let Some(top) = self.stack.len().checked_sub(1) else {
            return Err(DispatchError::Protocol(
                "child element announced with no open fragment".into(),
            ));
        };
        self.stack[top].state = FragmentState::ChildStreaming;
        self.run_phase(top, Phase::ChildElement, PhasePayload::Child(child))
    }

    /// Closes the open fragment: runs the after phase in dependency order,
    /// then pops it.
    pub fn leave_fragment(&mut self, view: &dyn Fragment) -> Result<(), DispatchError> {
        self.guard()?;
        let Some(top) = self.stack.len().checked_sub(1) else {
            return Err(DispatchError::Protocol("leave without a matching enter".into()));
        };
        let name = view.qname();
        if self.stack[top].name != name {
            return Err(DispatchError::Protocol(format!(
                "leave of <{name}> does not match open <{}>",
                self.stack[top].name
            )));
        }
        self.stack[top].state = FragmentState::Leaving;
        let result = self.run_phase(top, Phase::After, PhasePayload::Event);

        let depth = self.stack.len();
        if let Some(closed) = self.stack.pop() {
            for id in &closed.matched {
                let roots = &mut self.matched_roots[*id];
                if roots.last() == Some(&depth) {
                    roots.pop();
                }
            }
            trace!(fragment = %closed.name, occurrence = closed.occurrence, "fragment closed");
        }
        result
    }

    /// Ends the traversal; fails if fragments are still open.
    pub fn finish(self) -> Result<(), DispatchError> {
        self.guard()?;
        if let Some(open) = self.stack.last() {
            return Err(DispatchError::Protocol(format!(
                "document finished with <{}> still open",
                open.name
            )));
        }
        Ok(())
    }

    fn run_phase(
        &mut self,
        index: usize,
        phase: Phase,
        payload: PhasePayload<'_>,
    ) -> Result<(), DispatchError> {
        let engine = self.engine;
        let occurrence = self.stack[index].occurrence;
        let name = self.stack[index].name.clone();
        let bucket = self.stack[index].bucket.clone();
        for id in bucket {
            let binding = &engine.bindings()[id];
            if !binding.phases().contains(phase.as_set()) {
                continue;
            }
            trace!(binding = binding.label(), %phase, fragment = %name, "dispatch");
            let marker = self.leases.begin_scope();
            let fragment = StackFragment { stack: &self.stack, index };
            let result = {
                let mut ctx = VisitContext::new(&mut self.leases, occurrence, name.clone());
                match payload {
                    PhasePayload::Event if phase == Phase::Before => {
                        binding.visitor().visit_before(&fragment, &mut ctx)
                    }
                    PhasePayload::Event => binding.visitor().visit_after(&fragment, &mut ctx),
                    PhasePayload::Text(text) => {
                        binding.visitor().visit_child_text(text, &fragment, &mut ctx)
                    }
                    PhasePayload::Child(child) => {
                        binding.visitor().visit_child_element(child, &fragment, &mut ctx)
                    }
                }
            };
            // Reclaims anything the callback still held, error exits included.
            self.leases.end_scope(marker);
            if let Err(source) = result {
                self.poisoned = true;
                return Err(DispatchError::Visitor {
                    binding: binding.label().to_owned(),
                    phase,
                    fragment: name,
                    source,
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for DocumentDriver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentDriver")
            .field("depth", &self.stack.len())
            .field("next_occurrence", &self.next_occurrence)
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}
