#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use trellis_core::{ContentVisitor, Fragment, QName, VisitContext, VisitResult};

/// Shared event log for asserting callback order across visitors.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Visitor that appends `<name>:<phase>:<fragment>` to a shared log.
pub struct Recorder {
    pub name: &'static str,
    pub log: EventLog,
}

impl Recorder {
    pub fn new(name: &'static str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self { name, log: Arc::clone(log) })
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl ContentVisitor for Recorder {
    fn visit_before(&self, fragment: &dyn Fragment, _ctx: &mut VisitContext<'_>) -> VisitResult {
        self.push(format!("{}:before:{}", self.name, fragment.qname()));
        Ok(())
    }

    fn visit_child_text(
        &self,
        text: &str,
        fragment: &dyn Fragment,
        _ctx: &mut VisitContext<'_>,
    ) -> VisitResult {
        self.push(format!("{}:text:{}:{}", self.name, fragment.qname(), text));
        Ok(())
    }

    fn visit_child_element(
        &self,
        child: &dyn Fragment,
        fragment: &dyn Fragment,
        _ctx: &mut VisitContext<'_>,
    ) -> VisitResult {
        self.push(format!("{}:child:{}:{}", self.name, fragment.qname(), child.qname()));
        Ok(())
    }

    fn visit_after(&self, fragment: &dyn Fragment, _ctx: &mut VisitContext<'_>) -> VisitResult {
        self.push(format!("{}:after:{}", self.name, fragment.qname()));
        Ok(())
    }
}

/// Collaborator-side element view for driving the streaming protocol by
/// hand. Carries no ancestors of its own; the driver's open-element stack
/// supplies the chain.
pub struct StartElement {
    name: QName,
    attrs: Vec<(QName, Arc<str>)>,
}

impl StartElement {
    pub fn new(name: &str) -> Self {
        Self { name: QName::from(name), attrs: Vec::new() }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((QName::from(name), Arc::from(value)));
        self
    }
}

impl Fragment for StartElement {
    fn qname(&self) -> QName {
        self.name.clone()
    }

    fn ancestors(&self) -> Box<dyn Iterator<Item = QName> + '_> {
        Box::new(std::iter::empty())
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
