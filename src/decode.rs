//! Reassembles NUL-separated uevent tokens into [`Uevent`] records.

use log::{debug, trace};

use crate::{AttributeSet, Sexpr, Uevent};

/// The event whose header has been seen but which is not yet known to be
/// complete.
#[derive(Debug)]
struct Pending {
    header: String,
    attributes: AttributeSet,
}

impl Pending {
    fn new(header: &str) -> Self {
        Self {
            header: header.to_owned(),
            attributes: AttributeSet::new(),
        }
    }

    fn into_event(self) -> Uevent {
        Uevent::with_attributes(&self.header, self.attributes)
    }
}

/// Resumable framing over a byte stream of the form
/// `HEADER\0KEY=VALUE\0...\0HEADER\0...`.
///
/// Bytes after the last NUL are held until a later call completes the
/// token. An event is only known to be complete once the next header
/// arrives, so every call returns the events closed by that call.
///
/// ```
/// use dev9::FrameDecoder;
///
/// let mut decoder = FrameDecoder::new();
/// assert!(decoder.feed(b"add@/devices/tty1\0MAJ").is_empty());
/// assert!(decoder.feed(b"OR=4\0MINOR=1\0").is_empty());
///
/// let event = decoder.finish().unwrap();
/// assert_eq!(event.header(), "add@/devices/tty1");
/// assert_eq!(event.attributes().get("MAJOR"), Some("4"));
/// ```
#[derive(Debug, Default)]
pub struct FrameDecoder {
    partial: Vec<u8>,
    pending: Option<Pending>,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk of a stream. Returns every event that a header
    /// in this chunk closed, in arrival order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Uevent> {
        let mut events = Vec::new();
        let mut rest = bytes;
        while let Some(end) = rest.iter().position(|&b| b == 0) {
            if self.partial.is_empty() {
                self.token(&rest[..end], &mut events);
            } else {
                self.partial.extend_from_slice(&rest[..end]);
                let token = std::mem::take(&mut self.partial);
                self.token(&token, &mut events);
            }
            rest = &rest[end + 1..];
        }
        self.partial.extend_from_slice(rest);
        events
    }

    /// Decode one read from a message-oriented source. Like
    /// [`feed`](Self::feed), but when the bytes end in a NUL the pending
    /// event is taken to be complete and is returned as well.
    pub fn feed_datagram(&mut self, bytes: &[u8]) -> Vec<Uevent> {
        let mut events = self.feed(bytes);
        if bytes.last() == Some(&0) {
            events.extend(self.finish());
        }
        events
    }

    /// End of input: return the event under assembly, if any. An
    /// unterminated trailing token is dropped.
    pub fn finish(&mut self) -> Option<Uevent> {
        if !self.partial.is_empty() {
            debug!("dropping {} bytes of unterminated token", self.partial.len());
            self.partial.clear();
        }
        self.pending.take().map(Pending::into_event)
    }

    /// Bytes held back waiting for their closing NUL.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.partial.len()
    }

    /// A token without `=` is a header, the empty token included.
    fn token(&mut self, token: &[u8], events: &mut Vec<Uevent>) {
        let text = String::from_utf8_lossy(token);
        match text.split_once('=') {
            Some((key, value)) => {
                trace!("attribute {key}={value}");
                self.pending
                    .get_or_insert_with(|| Pending::new(""))
                    .attributes
                    .insert(key, Sexpr::string(value));
            }
            None => {
                trace!("header {text}");
                if let Some(done) = self.pending.replace(Pending::new(&text)) {
                    events.push(done.into_event());
                }
            }
        }
    }
}
