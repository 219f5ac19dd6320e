//! Pumps bytes from an event source through the decoder and the rules.

use std::io::{ErrorKind, Read};

use log::{debug, info};

use crate::tree::DeviceTree;
use crate::{Dev9Error, FrameDecoder, RuleSet, Uevent};

/// Receive buffer size requested for the kernel notification socket.
pub const NETLINK_RCVBUF: usize = 16 * 1024 * 1024;

const READ_BUFFER: usize = 64 * 1024;

/// How reads from the source line up with event boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Every read returns whole messages, as from a netlink socket.
    Datagram,
    /// Reads split the data anywhere, as from a pipe or a dump file.
    Stream,
}

/// Outcome of one [`UeventChannel::pump`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStatus {
    /// Events applied during this pump, suppressed ones included.
    pub events: usize,
    /// The source reached end of file.
    pub closed: bool,
}

/// A byte source feeding a [`FrameDecoder`].
///
/// Each call to [`pump`](Self::pump) drains whatever the source has ready,
/// so a non-blocking reader can be pumped once per readiness notification.
#[derive(Debug)]
pub struct UeventChannel<R> {
    reader: R,
    framing: Framing,
    buffer: Box<[u8]>,
    decoder: FrameDecoder,
}

impl<R: Read> UeventChannel<R> {
    #[must_use]
    pub fn new(reader: R, framing: Framing) -> Self {
        Self::with_capacity(reader, framing, READ_BUFFER)
    }

    /// Use a read buffer of `capacity` bytes (at least one).
    #[must_use]
    pub fn with_capacity(reader: R, framing: Framing, capacity: usize) -> Self {
        Self {
            reader,
            framing,
            buffer: vec![0; capacity.max(1)].into_boxed_slice(),
            decoder: FrameDecoder::new(),
        }
    }

    #[must_use]
    pub fn framing(&self) -> Framing {
        self.framing
    }

    #[must_use]
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read until the source would block or is exhausted, applying every
    /// complete event to `tree`.
    ///
    /// # Errors
    ///
    /// Returns [`Dev9Error::Io`] on any read error other than
    /// `WouldBlock` or `Interrupted`. Events decoded before the error have
    /// already been applied.
    pub fn pump<T: DeviceTree>(
        &mut self,
        rules: &RuleSet,
        tree: &mut T,
    ) -> Result<PumpStatus, Dev9Error> {
        let mut status = PumpStatus::default();
        loop {
            let n = match self.reader.read(&mut self.buffer) {
                Ok(0) => {
                    if let Some(event) = self.decoder.finish() {
                        dispatch(rules, tree, &event, &mut status);
                    }
                    info!("event source closed after {} events", status.events);
                    status.closed = true;
                    return Ok(status);
                }
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(status),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            let chunk = &self.buffer[..n];
            let events = match self.framing {
                Framing::Datagram => self.decoder.feed_datagram(chunk),
                Framing::Stream => self.decoder.feed(chunk),
            };
            for event in &events {
                dispatch(rules, tree, event, &mut status);
            }
        }
    }
}

fn dispatch<T: DeviceTree>(rules: &RuleSet, tree: &mut T, event: &Uevent, status: &mut PumpStatus) {
    let report = rules.apply(event, tree);
    debug!("{event} => {report}");
    status.events += 1;
}
