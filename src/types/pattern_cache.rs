use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

/// Maps literal pattern text to its compiled regular expression.
///
/// Populated while rules are compiled; every `match` clause naming the same
/// pattern text shares one entry. Read-only once loading is done.
#[derive(Debug, Clone, Default)]
pub struct PatternCache {
    compiled: HashMap<Arc<str>, Regex>,
}

impl PatternCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern` unless an entry for the same text already exists.
    /// Returns the shared key for the entry.
    pub(crate) fn register(&mut self, pattern: &str) -> Result<Arc<str>, regex::Error> {
        if let Some((key, _)) = self.compiled.get_key_value(pattern) {
            return Ok(Arc::clone(key));
        }
        let regex = Regex::new(pattern)?;
        let key: Arc<str> = Arc::from(pattern);
        self.compiled.insert(Arc::clone(&key), regex);
        Ok(key)
    }

    /// The compiled expression for `pattern`, if one was registered.
    #[must_use]
    pub fn get(&self, pattern: &str) -> Option<&Regex> {
        self.compiled.get(pattern)
    }

    /// Whether `text` matches `pattern`. An unregistered pattern never matches.
    #[must_use]
    pub fn is_match(&self, pattern: &str, text: &str) -> bool {
        self.get(pattern).is_some_and(|rx| rx.is_match(text))
    }

    #[must_use]
    pub fn contains(&self, pattern: &str) -> bool {
        self.compiled.contains_key(pattern)
    }

    /// The number of distinct compiled patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}
