use std::fmt;
use std::sync::Arc;

use trellis_core::QName;

/// One segment of a compiled selector, ordered root-to-leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    /// Literal name, optionally namespace-qualified. Matches exactly one
    /// path element with an equal local name (and namespace, if given).
    Named(QName),
    /// `*`: matches exactly one path element of any name.
    Wildcard,
    /// `**`: matches a contiguous run of zero or more path elements.
    DeepWildcard,
    /// `#document`: the document root itself; only ever the first step.
    DocumentRoot,
}

/// Compiled form of a selector expression.
///
/// Compilation is pure and deterministic: identical input text always yields
/// a structurally equal value, so indexes may intern and dedupe paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorPath {
    pub(crate) source: Arc<str>,
    pub(crate) steps: Vec<Step>,
    pub(crate) rooted: bool,
    pub(crate) attribute: Option<QName>,
}

impl SelectorPath {
    /// The original expression text, verbatim.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Steps root-to-leaf. A leading [`Step::DocumentRoot`] is retained here;
    /// use [`element_steps`](Self::element_steps) for matching.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Whether the expression was anchored to the document root, either by a
    /// leading `/` or by a leading `#document` segment.
    pub fn rooted(&self) -> bool {
        self.rooted || matches!(self.steps.first(), Some(Step::DocumentRoot))
    }

    /// Attribute target, if the expression ended in an `@name` step.
    pub fn attribute(&self) -> Option<&QName> {
        self.attribute.as_ref()
    }

    /// The final element step; this is what the binding index buckets on.
    pub fn leaf(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Steps with any leading [`Step::DocumentRoot`] stripped, paired with
    /// the effective rootedness. This is the form the matcher aligns.
    pub fn element_steps(&self) -> (&[Step], bool) {
        match self.steps.split_first() {
            Some((Step::DocumentRoot, rest)) => (rest, true),
            _ => (&self.steps, self.rooted),
        }
    }
}

impl fmt::Display for SelectorPath {
    /// Renders the canonical form of the expression (a rooted selector is
    /// always shown with a leading `/` unless it starts with `#document`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rooted && !matches!(self.steps.first(), Some(Step::DocumentRoot)) {
            f.write_str("/")?;
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match step {
                Step::Named(name) => write!(f, "{name}")?,
                Step::Wildcard => f.write_str("*")?,
                Step::DeepWildcard => f.write_str("**")?,
                Step::DocumentRoot => f.write_str(crate::compiler::DOCUMENT_ROOT_TOKEN)?,
            }
        }
        if let Some(attr) = &self.attribute {
            write!(f, "/@{attr}")?;
        }
        Ok(())
    }
}
