use super::Sexpr;

static NOT_FOUND: Sexpr = Sexpr::NotFound;

/// Key/value attributes of one event, stored as an association list of
/// `(KEY . "value")` pairs.
///
/// New entries are pushed onto the front and lookups return the first match,
/// so a later duplicate key shadows an earlier one. The underlying list is
/// persistent: cloning an `AttributeSet` and pushing onto the clone leaves the
/// source set untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    list: Sexpr,
}

impl AttributeSet {
    /// Create an empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a string attribute (builder version).
    #[must_use]
    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.insert(key, Sexpr::string(value));
        self
    }

    /// Push an attribute with an arbitrary value.
    pub fn insert(&mut self, key: &str, value: Sexpr) {
        let entry = Sexpr::cons(Sexpr::symbol(key), value);
        let rest = std::mem::take(&mut self.list);
        self.list = Sexpr::cons(entry, rest);
    }

    /// Look up `key`, returning [`Sexpr::NotFound`] when absent.
    #[must_use]
    pub fn lookup(&self, key: &str) -> &Sexpr {
        self.list
            .iter()
            .filter_map(|entry| match (entry.head(), entry.tail()) {
                (Some(k), Some(v)) if k.is_symbol(key) => Some(v),
                _ => None,
            })
            .next()
            .unwrap_or(&NOT_FOUND)
    }

    /// Look up `key` and return its value if it is a string.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lookup(key).as_string()
    }

    /// Iterate over `(key, value)` entries, newest first. Shadowed entries are
    /// included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Sexpr)> {
        self.list
            .iter()
            .filter_map(|entry| Some((entry.head()?.as_symbol()?, entry.tail()?)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.list.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_nil()
    }

    /// The association list itself.
    #[must_use]
    pub fn as_sexpr(&self) -> &Sexpr {
        &self.list
    }
}
