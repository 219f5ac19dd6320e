use std::collections::HashSet;
use std::sync::Arc;

/// Deduplicates owner and group names used by `set-user` and `set-group`.
///
/// Every rule naming the same string holds the same `Arc`, so the creation
/// state can switch between them with a pointer copy.
#[derive(Debug, Clone, Default)]
pub(crate) struct Interner {
    strings: HashSet<Arc<str>>,
}

impl Interner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning the existing handle if it was seen before.
    pub(crate) fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            return Arc::clone(existing);
        }
        let handle: Arc<str> = Arc::from(s);
        self.strings.insert(Arc::clone(&handle));
        handle
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.strings.len()
    }
}
