//! Structural validation of parsed selectors.

use thiserror::Error;

use trellis_core::QName;

use crate::parser::{self, RawSegment, Rule};
use crate::path::{SelectorPath, Step};

/// Pseudo-segment naming the document root; legal only as the very first
/// segment of an expression.
pub const DOCUMENT_ROOT_TOKEN: &str = "#document";

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid selector '{selector}': {source}")]
    Syntax {
        selector: String,
        #[source]
        source: Box<pest::error::Error<Rule>>,
    },
    #[error("Invalid selector '{selector}'. '{DOCUMENT_ROOT_TOKEN}' can only exist at the start of the selector.")]
    MisplacedDocumentRoot { selector: String },
    #[error("invalid selector '{selector}': attribute step '@{attribute}' must be the final step")]
    AttributeNotLast { selector: String, attribute: QName },
    #[error("invalid selector '{selector}': attribute step '@{attribute}' requires a preceding element step")]
    AttributeWithoutElement { selector: String, attribute: QName },
}

impl CompileError {
    /// The offending expression text, for diagnostics.
    pub fn selector(&self) -> &str {
        match self {
            Self::Syntax { selector, .. }
            | Self::MisplacedDocumentRoot { selector }
            | Self::AttributeNotLast { selector, .. }
            | Self::AttributeWithoutElement { selector, .. } => selector,
        }
    }
}

/// Compiles a selector expression into its structural form.
pub fn compile(text: &str) -> Result<SelectorPath, CompileError> {
    let raw = parser::parse(text)
        .map_err(|source| CompileError::Syntax { selector: text.to_owned(), source })?;

    let mut steps = Vec::with_capacity(raw.segments.len());
    let mut attribute = None;
    let last = raw.segments.len().saturating_sub(1);
    for (i, segment) in raw.segments.into_iter().enumerate() {
        match segment {
            RawSegment::Named(name)
                if name.namespace().is_none() && name.local() == DOCUMENT_ROOT_TOKEN =>
            {
                if i != 0 {
                    return Err(CompileError::MisplacedDocumentRoot { selector: text.to_owned() });
                }
                steps.push(Step::DocumentRoot);
            }
            RawSegment::Named(name) => steps.push(Step::Named(name)),
            RawSegment::Wildcard => steps.push(Step::Wildcard),
            RawSegment::DeepWildcard => steps.push(Step::DeepWildcard),
            RawSegment::Attribute(name) => {
                if i != last {
                    return Err(CompileError::AttributeNotLast {
                        selector: text.to_owned(),
                        attribute: name,
                    });
                }
                if steps.is_empty() || steps == [Step::DocumentRoot] {
                    return Err(CompileError::AttributeWithoutElement {
                        selector: text.to_owned(),
                        attribute: name,
                    });
                }
                attribute = Some(name);
            }
        }
    }

    Ok(SelectorPath { source: text.into(), steps, rooted: raw.rooted, attribute })
}
