use thiserror::Error;

use crate::parse::ParseError;

/// Unified error type for loading rules and reading events.
///
/// Returned by [`RuleSet::from_file()`](crate::RuleSet::from_file),
/// [`RuleSet::from_source()`](crate::RuleSet::from_source) and
/// [`UeventChannel::pump()`](crate::UeventChannel::pump). Malformed
/// directives are not errors at this level; they are logged and skipped.
#[derive(Debug, Error)]
pub enum Dev9Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
