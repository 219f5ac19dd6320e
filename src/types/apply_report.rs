use std::fmt;

/// What happened when one event ran through the rule forest.
///
/// Returned by [`RuleSet::apply()`](crate::RuleSet::apply).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct ApplyReport {
    suppressed: bool,
    results: Vec<bool>,
    devices: Vec<String>,
}

impl ApplyReport {
    pub(crate) fn suppressed() -> Self {
        Self {
            suppressed: true,
            ..Self::default()
        }
    }

    pub(crate) fn record_result(&mut self, result: bool) {
        self.results.push(result);
    }

    pub(crate) fn record_device(&mut self, path: String) {
        self.devices.push(path);
    }

    /// True when the event had no device number and no rule ran.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Result of each top-level rule, in forest order.
    #[must_use]
    pub fn results(&self) -> &[bool] {
        &self.results
    }

    /// Paths of device nodes created or updated, in the order it happened.
    #[must_use]
    pub fn devices(&self) -> &[String] {
        &self.devices
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.suppressed {
            return write!(f, "suppressed: no device number");
        }
        let passed = self.results.iter().filter(|r| **r).count();
        write!(f, "rules: {passed}/{} true", self.results.len())?;
        write!(f, ", devices: [{}]", self.devices.join(", "))
    }
}
