use std::collections::HashMap;
use std::sync::Arc;

use trellis_selector::Step;

use crate::binding::{BindingId, VisitorBinding};

/// Leaf-name buckets over the full binding set.
///
/// Bindings whose selector ends in a literal name are bucketed under that
/// local name; wildcard leaves go into a catch-all bucket consulted for
/// every fragment. Candidates are returned unfiltered by full path
/// correctness — the matcher performs the exact check — which keeps per-node
/// cost proportional to the number of plausible bindings rather than the
/// total configured count.
///
/// The index is built once from the full binding set and read-only
/// thereafter; configuration changes rebuild the engine wholesale.
#[derive(Debug, Default)]
pub struct BindingIndex {
    by_leaf: HashMap<Arc<str>, Vec<BindingId>>,
    catch_all: Vec<BindingId>,
}

impl BindingIndex {
    pub(crate) fn build(bindings: &[VisitorBinding]) -> Self {
        let mut by_leaf: HashMap<Arc<str>, Vec<BindingId>> = HashMap::new();
        let mut catch_all = Vec::new();
        for binding in bindings {
            match binding.selector().leaf() {
                Some(Step::Named(name)) => {
                    by_leaf.entry(name.local_arc()).or_default().push(binding.id());
                }
                Some(Step::Wildcard | Step::DeepWildcard) => catch_all.push(binding.id()),
                // A bare document-root selector targets no element fragment.
                Some(Step::DocumentRoot) | None => {}
            }
        }
        Self { by_leaf, catch_all }
    }

    /// Union of the name-specific bucket and the catch-all bucket.
    pub fn candidates_for<'a>(&'a self, local_name: &str) -> impl Iterator<Item = BindingId> + 'a {
        let named = self.by_leaf.get(local_name).map_or(&[][..], Vec::as_slice);
        named.iter().copied().chain(self.catch_all.iter().copied())
    }

    pub fn bucket_count(&self) -> usize {
        self.by_leaf.len()
    }

    pub fn catch_all_len(&self) -> usize {
        self.catch_all.len()
    }
}
