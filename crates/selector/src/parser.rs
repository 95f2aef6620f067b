//! pest front end for the selector expression language.
//!
//! Parsing produces a flat list of raw segments; all structural validation
//! (document-root placement, attribute position) lives in the compiler so
//! that the error messages can name the offending token and the full
//! original expression.

use pest::Parser;
use pest::iterators::Pair;

use trellis_core::QName;

#[derive(pest_derive::Parser)]
#[grammar = "selector.pest"]
pub struct SelectorParser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawSegment {
    Named(QName),
    Wildcard,
    DeepWildcard,
    Attribute(QName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawSelector {
    pub rooted: bool,
    pub segments: Vec<RawSegment>,
}

pub(crate) fn parse(text: &str) -> Result<RawSelector, Box<pest::error::Error<Rule>>> {
    let mut pairs = SelectorParser::parse(Rule::selector, text)?;
    let selector = pairs.next().expect("grammar yields exactly one selector");
    debug_assert_eq!(selector.as_rule(), Rule::selector);

    let mut rooted = false;
    let mut segments = Vec::new();
    for pair in selector.into_inner() {
        match pair.as_rule() {
            Rule::root_mark => rooted = true,
            Rule::step => segments.push(build_segment(&pair)),
            Rule::EOI => {}
            other => unreachable!("unexpected rule in selector: {other:?}"),
        }
    }
    Ok(RawSelector { rooted, segments })
}

fn build_segment(step: &Pair<'_, Rule>) -> RawSegment {
    let inner = step.clone().into_inner().next().expect("step has one alternative");
    match inner.as_rule() {
        Rule::deep_wildcard => RawSegment::DeepWildcard,
        Rule::wildcard => RawSegment::Wildcard,
        Rule::attribute_step => RawSegment::Attribute(QName::from(&inner.as_str()[1..])),
        Rule::named_step => RawSegment::Named(QName::from(inner.as_str())),
        other => unreachable!("unexpected step alternative: {other:?}"),
    }
}
