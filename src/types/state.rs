use std::fmt;
use std::sync::Arc;

/// Whether a device node is a block or a character device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Block,
    Char,
}

impl DeviceKind {
    /// The `st_mode` file-type bits for this kind.
    #[must_use]
    pub fn type_bits(self) -> u32 {
        match self {
            DeviceKind::Block => 0o060_000,
            DeviceKind::Char => 0o020_000,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Block => f.write_str("block"),
            DeviceKind::Char => f.write_str("char"),
        }
    }
}

/// Ownership, permissions and device numbers accumulated while the rule
/// forest runs over one event. `set-*` directives write it, `mknod` reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationState {
    pub block_device: bool,
    pub user: Arc<str>,
    pub group: Arc<str>,
    /// Permission bits only.
    pub mode: u32,
    pub major: u32,
    pub minor: u32,
}

impl CreationState {
    pub(crate) fn new(user: Arc<str>, group: Arc<str>, mode: u32) -> Self {
        Self {
            block_device: false,
            user,
            group,
            mode,
            major: 0,
            minor: 0,
        }
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        if self.block_device {
            DeviceKind::Block
        } else {
            DeviceKind::Char
        }
    }

    /// True when the event carries no usable device number.
    #[must_use]
    pub fn is_unaddressable(&self) -> bool {
        self.major == 0 && self.minor == 0
    }
}
