use std::fmt;
use std::sync::Arc;

/// Index of a compiled rule node inside a [`RuleSet`](super::RuleSet) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(pub(crate) usize);

impl RuleId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// The directive a rule node carries out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Match,
    When,
    Mknod,
    SetUser,
    SetGroup,
    SetBlockDevice,
    SetMode,
}

impl Opcode {
    /// The head symbol selecting this opcode in rule source.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Match => "match",
            Opcode::When => "when",
            Opcode::Mknod => "mknod",
            Opcode::SetUser => "set-user",
            Opcode::SetGroup => "set-group",
            Opcode::SetBlockDevice => "set-attribute",
            Opcode::SetMode => "set-mode",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One `(KEY . "pattern")` test of a `match` directive. `pattern` is the
/// key of its [`PatternCache`](super::PatternCache) entry.
#[derive(Debug, Clone)]
pub(crate) struct MatchClause {
    pub(crate) key: Arc<str>,
    pub(crate) pattern: Arc<str>,
}

/// One element of a `mknod` path template.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    /// Bare symbol: replaced by the attribute of that name when the event
    /// has one as a string, otherwise used literally.
    Attribute(Arc<str>),
    /// String literal, used verbatim.
    Literal(Arc<str>),
}

#[derive(Debug, Clone)]
pub(crate) enum Op {
    Match(Vec<MatchClause>),
    When { condition: RuleId, body: RuleId },
    Mknod(Vec<Segment>),
    SetUser(Arc<str>),
    SetGroup(Arc<str>),
    SetBlockDevice,
    SetMode(u32),
}

impl Op {
    pub(crate) fn opcode(&self) -> Opcode {
        match self {
            Op::Match(_) => Opcode::Match,
            Op::When { .. } => Opcode::When,
            Op::Mknod(_) => Opcode::Mknod,
            Op::SetUser(_) => Opcode::SetUser,
            Op::SetGroup(_) => Opcode::SetGroup,
            Op::SetBlockDevice => Opcode::SetBlockDevice,
            Op::SetMode(_) => Opcode::SetMode,
        }
    }
}

/// A compiled directive plus the link to its next sibling.
#[derive(Debug, Clone)]
pub(crate) struct RuleNode {
    pub(crate) op: Op,
    pub(crate) next: Option<RuleId>,
}
