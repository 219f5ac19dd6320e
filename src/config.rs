/// Rule file read when none is given on the command line.
pub const DEFAULT_RULES_PATH: &str = "/etc/dev9/rules.sx";

/// Creation defaults applied to every event before any rule runs.
///
/// A `SUBSYSTEM` attribute on the event overrides [`group`](Self::group).
/// The owner is never taken from the event, unlike the classic dev9 daemon,
/// which set both owner and group to the subsystem name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    user: String,
    group: String,
    mode: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: "root".to_owned(),
            group: "root".to_owned(),
            mode: 0o660,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user(mut self, user: &str) -> Self {
        self.user = user.to_owned();
        self
    }

    #[must_use]
    pub fn group(mut self, group: &str) -> Self {
        self.group = group.to_owned();
        self
    }

    /// Permission bits; anything above `0o7777` is masked off.
    #[must_use]
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode & 0o7777;
        self
    }

    #[must_use]
    pub fn default_user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn default_group(&self) -> &str {
        &self.group
    }

    #[must_use]
    pub fn default_mode(&self) -> u32 {
        self.mode
    }
}
