use std::fmt;
use std::sync::Arc;

/// Immutable, reference-counted symbolic value.
///
/// Rule source and decoded event attributes share this representation. Lists
/// are right-nested chains of [`Sexpr::Pair`] terminated by [`Sexpr::Nil`].
/// Cloning is cheap: atoms and pairs are behind `Arc`.
#[derive(Debug, Clone, Default)]
pub enum Sexpr {
    /// The empty list.
    #[default]
    Nil,
    /// Sentinel returned by lookups that found nothing.
    NotFound,
    Symbol(Arc<str>),
    String(Arc<str>),
    Integer(i64),
    Pair(Arc<Pair>),
}

/// A cons cell. Never mutated after construction.
///
/// Drop, equality and formatting walk the tail in a loop, so an event with
/// any number of attributes is safe to compare, print and free.
pub struct Pair {
    head: Sexpr,
    tail: Sexpr,
}

impl Drop for Pair {
    fn drop(&mut self) {
        let mut tail = std::mem::take(&mut self.tail);
        while let Sexpr::Pair(pair) = tail {
            match Arc::try_unwrap(pair) {
                Ok(mut pair) => tail = std::mem::take(&mut pair.tail),
                // Still shared; whoever holds the other reference frees it.
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        list.entry(&self.head);
        let mut cursor = &self.tail;
        while let Sexpr::Pair(p) = cursor {
            list.entry(&p.head);
            cursor = &p.tail;
        }
        if !cursor.is_nil() {
            list.entry(&format_args!(". {cursor:?}"));
        }
        list.finish()
    }
}

impl Sexpr {
    #[must_use]
    pub fn symbol(name: &str) -> Self {
        Sexpr::Symbol(Arc::from(name))
    }

    #[must_use]
    pub fn string(text: &str) -> Self {
        Sexpr::String(Arc::from(text))
    }

    #[must_use]
    pub fn cons(head: Sexpr, tail: Sexpr) -> Self {
        Sexpr::Pair(Arc::new(Pair { head, tail }))
    }

    /// Build a proper list from the given elements.
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Sexpr>) -> Self {
        Self::list_with_tail(items, Sexpr::Nil)
    }

    /// Build a list whose last pair ends in `tail` instead of `Nil`.
    /// `list_with_tail([a], b)` is the dotted pair `(a . b)`.
    #[must_use]
    pub fn list_with_tail(items: impl IntoIterator<Item = Sexpr>, tail: Sexpr) -> Self {
        let items: Vec<Sexpr> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Sexpr::cons(item, acc))
    }

    #[must_use]
    pub fn head(&self) -> Option<&Sexpr> {
        match self {
            Sexpr::Pair(p) => Some(&p.head),
            _ => None,
        }
    }

    #[must_use]
    pub fn tail(&self) -> Option<&Sexpr> {
        match self {
            Sexpr::Pair(p) => Some(&p.tail),
            _ => None,
        }
    }

    /// Iterate over list elements. Stops at the first non-pair tail, so the
    /// final tail of a dotted list is not yielded.
    #[must_use]
    pub fn iter(&self) -> ListIter<'_> {
        ListIter { cursor: self }
    }

    /// The `n`th element of a list, if present.
    #[must_use]
    pub fn nth(&self, n: usize) -> Option<&Sexpr> {
        self.iter().nth(n)
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Sexpr::Nil)
    }

    #[must_use]
    pub fn is_pair(&self) -> bool {
        matches!(self, Sexpr::Pair(_))
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        !matches!(self, Sexpr::NotFound)
    }

    #[must_use]
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Sexpr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Sexpr::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Sexpr::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// True when this is the symbol `name`.
    #[must_use]
    pub fn is_symbol(&self, name: &str) -> bool {
        self.as_symbol() == Some(name)
    }
}

impl PartialEq for Sexpr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Sexpr::Nil, Sexpr::Nil) | (Sexpr::NotFound, Sexpr::NotFound) => true,
            (Sexpr::Symbol(a), Sexpr::Symbol(b)) | (Sexpr::String(a), Sexpr::String(b)) => a == b,
            (Sexpr::Integer(a), Sexpr::Integer(b)) => a == b,
            (Sexpr::Pair(_), Sexpr::Pair(_)) => {
                let (mut a, mut b) = (self, other);
                loop {
                    match (a, b) {
                        (Sexpr::Pair(x), Sexpr::Pair(y)) => {
                            if Arc::ptr_eq(x, y) {
                                return true;
                            }
                            if x.head != y.head {
                                return false;
                            }
                            a = &x.tail;
                            b = &y.tail;
                        }
                        _ => return a == b,
                    }
                }
            }
            _ => false,
        }
    }
}

impl Eq for Sexpr {}

impl From<i64> for Sexpr {
    fn from(v: i64) -> Self {
        Sexpr::Integer(v)
    }
}

impl From<&str> for Sexpr {
    fn from(v: &str) -> Self {
        Sexpr::string(v)
    }
}

impl From<String> for Sexpr {
    fn from(v: String) -> Self {
        Sexpr::String(Arc::from(v))
    }
}

/// Iterator over the elements of a list. See [`Sexpr::iter`].
#[derive(Debug, Clone)]
pub struct ListIter<'a> {
    cursor: &'a Sexpr,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Sexpr;

    fn next(&mut self) -> Option<&'a Sexpr> {
        match self.cursor {
            Sexpr::Pair(p) => {
                self.cursor = &p.tail;
                Some(&p.head)
            }
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a Sexpr {
    type Item = &'a Sexpr;
    type IntoIter = ListIter<'a>;

    fn into_iter(self) -> ListIter<'a> {
        self.iter()
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexpr::Nil => f.write_str("()"),
            Sexpr::NotFound => f.write_str("#nonexistent"),
            Sexpr::Symbol(s) => f.write_str(s),
            Sexpr::String(s) => write_string(f, s),
            Sexpr::Integer(n) => write!(f, "{n}"),
            Sexpr::Pair(_) => {
                f.write_str("(")?;
                let mut cursor = self;
                let mut first = true;
                while let Sexpr::Pair(p) = cursor {
                    if !first {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", p.head)?;
                    first = false;
                    cursor = &p.tail;
                }
                if !cursor.is_nil() {
                    write!(f, " . {cursor}")?;
                }
                f.write_str(")")
            }
        }
    }
}
