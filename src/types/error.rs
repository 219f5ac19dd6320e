use thiserror::Error;

use super::Opcode;

/// Why a rule form was dropped during compilation.
///
/// Rejection never aborts a load: the form is skipped and the rules compiled
/// so far stay linked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("rule form is not a list")]
    NotAList,

    #[error("unknown directive '{name}'")]
    UnknownOpcode { name: String },

    #[error("'{opcode}' is missing its payload")]
    MissingPayload { opcode: Opcode },

    #[error("'when' {branch} compiled to nothing")]
    EmptyWhenBranch { branch: &'static str },
}
