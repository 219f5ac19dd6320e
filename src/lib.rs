mod channel;
mod compile;
mod config;
mod decode;
mod error;
mod evaluate;
pub mod parse;
pub mod tree;
mod types;

pub use channel::{Framing, PumpStatus, UeventChannel, NETLINK_RCVBUF};
pub use config::{Config, DEFAULT_RULES_PATH};
pub use decode::FrameDecoder;
pub use error::Dev9Error;
pub use tree::{DeviceTree, Entry, EntryKind, MemTree, NodeId};
pub use types::{
    ApplyReport, AttributeSet, CompileError, CreationState, DeviceKind, ListIter, Opcode, Pair,
    PatternCache, RuleId, RuleSet, Sexpr, Uevent,
};
