//! Alignment of compiled selectors against concrete fragments.
//!
//! The fragment's root-to-leaf name chain is rebuilt per call from its
//! ancestor accessor, so materialized trees and streaming open-element
//! stacks go through the same code. Alignment is memoized backtracking over
//! (step position, path position): `*` consumes exactly one element, `**`
//! consumes a run of zero or more. Where several `**` absorption counts
//! would satisfy the remaining steps, the leftmost-shortest one is taken;
//! the boolean outcome is unaffected, but this is the canonical behavior.

use smallvec::SmallVec;

use trellis_core::{Fragment, QName};

use crate::path::{SelectorPath, Step};

type NameChain = SmallVec<[QName; 12]>;

/// Full match decision: element alignment plus, if the selector carries an
/// attribute target, presence of that attribute on the fragment.
pub fn matches(path: &SelectorPath, fragment: &dyn Fragment) -> bool {
    if !matches_element(path, fragment) {
        return false;
    }
    match path.attribute() {
        None => true,
        Some(attr) => fragment.attribute(attr.namespace(), attr.local()).is_some(),
    }
}

/// Element-level match decision, ignoring any attribute target.
///
/// The final step must always align with the fragment itself; a selector
/// never matches an ancestor alone. Rooted selectors must consume the whole
/// chain from the document root, unrooted ones may align at any suffix.
pub fn matches_element(path: &SelectorPath, fragment: &dyn Fragment) -> bool {
    let (steps, rooted) = path.element_steps();
    if steps.is_empty() {
        return false;
    }

    let mut chain: NameChain = fragment.ancestors().collect();
    chain.reverse();
    chain.push(fragment.qname());

    let mut memo = Memo::new(steps.len(), chain.len());
    if rooted {
        align(steps, &chain, 0, 0, &mut memo)
    } else {
        (0..chain.len()).any(|start| align(steps, &chain, 0, start, &mut memo))
    }
}

fn align(steps: &[Step], chain: &[QName], si: usize, pi: usize, memo: &mut Memo) -> bool {
    if si == steps.len() {
        return pi == chain.len();
    }
    if let Some(hit) = memo.get(si, pi) {
        return hit;
    }
    let decided = match &steps[si] {
        Step::Named(name) => {
            pi < chain.len()
                && step_matches(name, &chain[pi])
                && align(steps, chain, si + 1, pi + 1, memo)
        }
        Step::Wildcard => pi < chain.len() && align(steps, chain, si + 1, pi + 1, memo),
        // Shortest absorption first; stop at the first cut that satisfies
        // the remaining steps.
        Step::DeepWildcard => (pi..=chain.len()).any(|cut| align(steps, chain, si + 1, cut, memo)),
        // Stripped by SelectorPath::element_steps; a non-leading occurrence
        // is a compile error, so nothing ever aligns here.
        Step::DocumentRoot => false,
    };
    memo.set(si, pi, decided);
    decided
}

fn step_matches(step: &QName, element: &QName) -> bool {
    step.local() == element.local()
        && match step.namespace() {
            None => true,
            Some(ns) => element.namespace() == Some(ns),
        }
}

struct Memo {
    width: usize,
    cells: SmallVec<[u8; 64]>,
}

impl Memo {
    fn new(steps: usize, chain: usize) -> Self {
        let width = chain + 1;
        Self { width, cells: SmallVec::from_elem(0, (steps + 1) * width) }
    }

    fn get(&self, si: usize, pi: usize) -> Option<bool> {
        match self.cells[si * self.width + pi] {
            0 => None,
            1 => Some(true),
            _ => Some(false),
        }
    }

    fn set(&mut self, si: usize, pi: usize, value: bool) {
        self.cells[si * self.width + pi] = if value { 1 } else { 2 };
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;
    use trellis_core::Fragment;

    use super::*;
    use crate::compiler::compile;

    /// Fragment stub backed by an explicit root-to-leaf name list.
    struct PathFragment {
        names: Vec<QName>,
        attrs: Vec<(QName, Arc<str>)>,
    }

    impl PathFragment {
        fn new(path: &str) -> Self {
            let names = path.split('/').map(QName::from).collect();
            Self { names, attrs: Vec::new() }
        }

        fn with_attr(mut self, name: &str, value: &str) -> Self {
            self.attrs.push((QName::from(name), Arc::from(value)));
            self
        }
    }

    impl Fragment for PathFragment {
        fn qname(&self) -> QName {
            self.names.last().expect("non-empty path").clone()
        }

        fn ancestors(&self) -> Box<dyn Iterator<Item = QName> + '_> {
            let leaf = self.names.len() - 1;
            Box::new(self.names[..leaf].iter().rev().cloned())
        }

        fn attribute(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
            self.attrs
                .iter()
                .find(|(qn, _)| qn.local() == name && qn.namespace() == namespace)
                .map(|(_, value)| &**value)
        }

        fn attributes(&self) -> Vec<(QName, Arc<str>)> {
            self.attrs.clone()
        }
    }

    fn check(selector: &str, path: &str) -> bool {
        matches(&compile(selector).unwrap(), &PathFragment::new(path))
    }

    #[rstest]
    // single unrooted name matches the leaf wherever it sits
    #[case("e", "a/b/c/d/e", true)]
    // selector longer than the available path can never match
    #[case("xx/a/b/c/d/e", "a/b/c/d/e", false)]
    // deep wildcard absorbs the b,c,d run
    #[case("a/**/e", "a/b/c/d/e", true)]
    // required leading literal never appears
    #[case("h/**", "a/b/c/d/e", false)]
    // leaf alignment is unconditional
    #[case("a/b", "a/b/c", false)]
    #[case("b/c", "a/b/c", true)]
    fn unrooted_scenarios(#[case] selector: &str, #[case] path: &str, #[case] expected: bool) {
        assert_eq!(check(selector, path), expected, "{selector} vs {path}");
    }

    #[rstest]
    // the repeated `a` forces real backtracking decisions
    #[case("/a/b/c/a/d/e", "a/b/c/a/d/e", true)]
    #[case("/a/d/e", "a/b/c/a/d/e", false)]
    // the gap between b and d is two elements, `*` only consumes one
    #[case("/a/b/*/d/e", "a/b/c/a/d/e", false)]
    #[case("/a/b/**/d/e", "a/b/c/a/d/e", true)]
    // rooted selectors never match at an offset
    #[case("/b/c", "a/b/c", false)]
    #[case("/a/b/c", "a/b/c", true)]
    #[case("#document/a/b/c", "a/b/c", true)]
    #[case("#document/b/c", "a/b/c", false)]
    fn rooted_scenarios(#[case] selector: &str, #[case] path: &str, #[case] expected: bool) {
        assert_eq!(check(selector, path), expected, "{selector} vs {path}");
    }

    #[rstest]
    // a greedy scan would hand `**` the first run up to the last `b` and
    // miss the shorter absorption that lets the tail literals align
    #[case("a/**/b/c", "a/b/x/b/c", true)]
    #[case("**/a", "a", true)]
    #[case("a/**", "a", true)]
    #[case("/**/e", "a/b/c/d/e", true)]
    #[case("/**", "a/b", true)]
    #[case("*/*", "a/b", true)]
    #[case("/*/*/*", "a/b", false)]
    fn wildcard_backtracking(#[case] selector: &str, #[case] path: &str, #[case] expected: bool) {
        assert_eq!(check(selector, path), expected, "{selector} vs {path}");
    }

    #[rstest]
    fn attribute_target_requires_presence() {
        let path = compile("a/b/@myAttribute").unwrap();
        let with = PathFragment::new("a/b").with_attr("myAttribute", "x");
        let without = PathFragment::new("a/b");
        assert!(matches(&path, &with));
        assert!(!matches(&path, &without));
        // element-level decision is unaffected by the attribute
        assert!(matches_element(&path, &without));
    }

    #[rstest]
    fn namespaced_steps_compare_the_discriminator() {
        assert!(check("ord:b", "a/ord:b"));
        assert!(!check("ord:b", "a/b"));
        // an unqualified step matches any namespace
        assert!(check("b", "a/ord:b"));
    }

    #[rstest]
    fn matching_is_deterministic_for_repeated_evaluation() {
        let path = compile("a/**/b/c").unwrap();
        let fragment = PathFragment::new("a/b/x/b/c");
        for _ in 0..3 {
            assert!(matches(&path, &fragment));
        }
    }
}
