use std::fmt;
use std::sync::Arc;

/// Qualified name of an element or attribute.
///
/// The namespace component is an opaque discriminator string supplied by the
/// producing collaborator (for selector text it is the literal prefix).
/// Resolving prefixes to URIs, if the embedding format has such a concept, is
/// the collaborator's concern; trellis only compares the strings verbatim.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QName {
    local: Arc<str>,
    namespace: Option<Arc<str>>,
}

impl QName {
    pub fn new(local: impl Into<Arc<str>>) -> Self {
        Self { local: local.into(), namespace: None }
    }

    pub fn with_namespace(local: impl Into<Arc<str>>, namespace: impl Into<Arc<str>>) -> Self {
        Self { local: local.into(), namespace: Some(namespace.into()) }
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Clone of the interned local-name string, for use as an index key.
    pub fn local_arc(&self) -> Arc<str> {
        Arc::clone(&self.local)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{ns}:{}", self.local)
        } else {
            f.write_str(&self.local)
        }
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QName({self})")
    }
}

impl From<&str> for QName {
    fn from(value: &str) -> Self {
        match value.split_once(':') {
            Some((ns, local)) => Self::with_namespace(local, ns),
            None => Self::new(value),
        }
    }
}

/// Read-only view of one document node at the moment it is visited.
///
/// Fragments are borrowed views owned by the producing collaborator (a parser
/// feeding a stream, or a materialized tree being walked); the engine never
/// retains one beyond the current dispatch call.
///
/// The ancestor accessor is the only structural requirement: it yields the
/// qualified names from the immediate parent up toward the document root. For
/// a streaming view this is exactly the currently open element stack, so a
/// matcher written against this trait needs no notion of which tree kind it
/// is looking at.
pub trait Fragment: Send + Sync {
    /// Qualified name of this fragment.
    fn qname(&self) -> QName;

    /// Ancestor names, immediate parent first, document root last.
    fn ancestors(&self) -> Box<dyn Iterator<Item = QName> + '_>;

    /// Attribute lookup. A `None` namespace only matches attributes that
    /// carry no namespace themselves.
    fn attribute(&self, namespace: Option<&str>, name: &str) -> Option<&str>;

    /// All attributes of this fragment, in document order.
    fn attributes(&self) -> Vec<(QName, Arc<str>)>;

    /// Depth of this fragment, counting the root element as 1.
    fn depth(&self) -> usize {
        self.ancestors().count() + 1
    }
}
