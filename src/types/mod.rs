mod apply_report;
mod attributes;
mod error;
mod interner;
mod pattern_cache;
mod rule;
mod ruleset;
mod sexpr;
mod state;
mod uevent;

pub use apply_report::ApplyReport;
pub use attributes::AttributeSet;
pub use error::CompileError;
pub use pattern_cache::PatternCache;
pub(crate) use rule::{MatchClause, Op, Segment};
pub use rule::{Opcode, RuleId};
pub use ruleset::RuleSet;
pub use sexpr::{ListIter, Pair, Sexpr};
pub use state::{CreationState, DeviceKind};
pub use uevent::Uevent;
