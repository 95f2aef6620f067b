//! Simple Arc-backed materialized tree.
//!
//! Used by [`Engine::traverse`](crate::Engine::traverse) to replay an
//! already-built document through the streaming dispatch protocol, and as
//! the stock tree for tests and quick prototypes.
//!
//! ```
//! use trellis_runtime::tree::elem;
//!
//! // <order id="o1"><items><item/></items>note</order>
//! let order = elem("order")
//!     .attr("id", "o1")
//!     .child(elem("items").child(elem("item")))
//!     .text("note")
//!     .build();
//! assert_eq!(order.children().len(), 2);
//! ```

use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use trellis_core::{Fragment, QName};

#[derive(Debug)]
struct ElementData {
    name: QName,
    attributes: Vec<(QName, Arc<str>)>,
    parent: RwLock<Option<Weak<ElementData>>>,
    children: RwLock<Vec<Content>>,
}

/// One element node; clones share the underlying node.
#[derive(Clone)]
pub struct Element(Arc<ElementData>);

/// Child content of an element, in document order.
#[derive(Debug, Clone)]
pub enum Content {
    Element(Element),
    Text(Arc<str>),
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.0.name)
            .field("attributes", &self.0.attributes)
            .finish_non_exhaustive()
    }
}

impl Element {
    pub fn name(&self) -> &QName {
        &self.0.name
    }

    pub fn parent(&self) -> Option<Element> {
        self.0.parent.read().ok()?.as_ref().and_then(Weak::upgrade).map(Element)
    }

    pub fn children(&self) -> Vec<Content> {
        self.0.children.read().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Fragment for Element {
    fn qname(&self) -> QName {
        self.0.name.clone()
    }

    fn ancestors(&self) -> Box<dyn Iterator<Item = QName> + '_> {
        Box::new(std::iter::successors(self.parent(), Element::parent).map(|el| el.qname()))
    }

    fn attribute(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.0
            .attributes
            .iter()
            .find(|(qn, _)| qn.local() == name && qn.namespace() == namespace)
            .map(|(_, value)| &**value)
    }

    fn attributes(&self) -> Vec<(QName, Arc<str>)> {
        self.0.attributes.clone()
    }
}

enum NodeBuilder {
    Element(ElementBuilder),
    Text(Arc<str>),
}

/// Ergonomic top-down builder; parent links are wired at [`build`](ElementBuilder::build).
pub struct ElementBuilder {
    name: QName,
    attributes: Vec<(QName, Arc<str>)>,
    children: Vec<NodeBuilder>,
}

/// Starts an element; `name` may be namespace-prefixed (`ns:item`).
pub fn elem(name: &str) -> ElementBuilder {
    ElementBuilder { name: QName::from(name), attributes: Vec::new(), children: Vec::new() }
}

impl ElementBuilder {
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((QName::from(name), Arc::from(value)));
        self
    }

    pub fn child(mut self, child: ElementBuilder) -> Self {
        self.children.push(NodeBuilder::Element(child));
        self
    }

    pub fn text(mut self, value: &str) -> Self {
        self.children.push(NodeBuilder::Text(Arc::from(value)));
        self
    }

    pub fn build(self) -> Element {
        let element = Element(Arc::new(ElementData {
            name: self.name,
            attributes: self.attributes,
            parent: RwLock::new(None),
            children: RwLock::new(Vec::new()),
        }));
        let children: Vec<Content> = self
            .children
            .into_iter()
            .map(|child| match child {
                NodeBuilder::Text(value) => Content::Text(value),
                NodeBuilder::Element(builder) => {
                    let built = builder.build();
                    if let Ok(mut parent) = built.0.parent.write() {
                        *parent = Some(Arc::downgrade(&element.0));
                    }
                    Content::Element(built)
                }
            })
            .collect();
        if let Ok(mut slot) = element.0.children.write() {
            *slot = children;
        }
        element
    }
}
