use std::fmt;
use std::sync::Arc;

use super::{AttributeSet, Sexpr};

/// One decoded kernel notification: the free-form header token followed by
/// its `KEY=VALUE` attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Uevent {
    header: Arc<str>,
    attributes: AttributeSet,
}

impl Uevent {
    #[must_use]
    pub fn new(header: &str) -> Self {
        Self::with_attributes(header, AttributeSet::new())
    }

    #[must_use]
    pub fn with_attributes(header: &str, attributes: AttributeSet) -> Self {
        Self {
            header: Arc::from(header),
            attributes,
        }
    }

    /// Push a string attribute (builder version).
    #[must_use]
    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.attributes = self.attributes.set(key, value);
        self
    }

    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    #[must_use]
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    /// The event as a symbolic value: `(header . attributes)`.
    #[must_use]
    pub fn to_sexpr(&self) -> Sexpr {
        Sexpr::cons(Sexpr::symbol(&self.header), self.attributes.as_sexpr().clone())
    }

    /// Encode the event in the NUL-separated wire format, attributes in
    /// arrival order.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.header.as_bytes());
        out.push(0);
        let mut entries: Vec<(&str, &Sexpr)> = self.attributes.iter().collect();
        entries.reverse();
        for (key, value) in entries {
            out.extend_from_slice(key.as_bytes());
            out.push(b'=');
            if let Some(s) = value.as_string() {
                out.extend_from_slice(s.as_bytes());
            }
            out.push(0);
        }
        out
    }
}

impl fmt::Display for Uevent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;
        let mut entries: Vec<(&str, &Sexpr)> = self.attributes.iter().collect();
        entries.reverse();
        for (key, value) in entries {
            match value.as_string() {
                Some(s) => write!(f, " {key}={s}")?,
                None => write!(f, " {key}={value}")?,
            }
        }
        Ok(())
    }
}
