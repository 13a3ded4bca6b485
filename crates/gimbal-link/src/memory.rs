//! In-memory channel backend.
//!
//! [`MemoryConnector`] hands out channels backed by a shared [`MemoryPort`].
//! The port plays the controller side: tests and demos push inbound chunks,
//! inspect what was written, inject failures and slow operations down to
//! widen critical sections.
//!
//! ```rust
//! use gimbal_link::{LinkConfig, MemoryConnector, MemoryPort, SerialLink};
//! use std::time::Duration;
//!
//! let port = MemoryPort::new();
//! let link = SerialLink::with_connector(MemoryConnector::new(port.clone()));
//! link.open(LinkConfig::new("mem0", 115200)).unwrap();
//!
//! port.push_inbound(&[0x3E, 0x05, 0x02, 0x07, 0xAA, 0xBB]);
//! let frame = link.read_frame(Duration::from_millis(10)).unwrap();
//! assert!(frame.validate().is_valid());
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::channel::{Channel, Connector};
use crate::config::{BaudRate, LinkConfig};
use crate::error::OpenError;

#[derive(Debug, Default)]
struct PortState {
    inbound: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    drains: usize,
    releases: usize,
    connects: usize,
    last_config: Option<LinkConfig>,
    max_write: Option<usize>,
    fail_reads: bool,
    fail_writes: bool,
    fail_drains: bool,
    fail_release: bool,
    op_delay: Duration,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<PortState>,
    readable: Condvar,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Tracks one channel operation for overlap detection.
struct OpGuard<'a>(&'a Shared);

impl<'a> OpGuard<'a> {
    fn enter(shared: &'a Shared) -> Self {
        let now = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        shared.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = shared.state.lock().op_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        OpGuard(shared)
    }
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The controller side of an in-memory link.
#[derive(Debug, Clone, Default)]
pub struct MemoryPort {
    shared: Arc<Shared>,
}

impl MemoryPort {
    /// Create an idle port.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk of input. Each chunk is returned by at most one read.
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.shared.state.lock().inbound.push_back(bytes.to_vec());
        self.shared.readable.notify_all();
    }

    /// Number of inbound chunks not yet read.
    pub fn pending_inbound(&self) -> usize {
        self.shared.state.lock().inbound.len()
    }

    /// Every write call's bytes, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().writes.clone()
    }

    /// Number of completed drains.
    pub fn drains(&self) -> usize {
        self.shared.state.lock().drains
    }

    /// Number of channel releases.
    pub fn releases(&self) -> usize {
        self.shared.state.lock().releases
    }

    /// Number of successful connects.
    pub fn connects(&self) -> usize {
        self.shared.state.lock().connects
    }

    /// Configuration passed to the most recent connect.
    pub fn last_config(&self) -> Option<LinkConfig> {
        self.shared.state.lock().last_config.clone()
    }

    /// Cap the number of bytes a single write accepts.
    pub fn set_max_write(&self, max: Option<usize>) {
        self.shared.state.lock().max_write = max;
    }

    /// Make reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.shared.state.lock().fail_reads = fail;
    }

    /// Make writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.state.lock().fail_writes = fail;
    }

    /// Make drains fail.
    pub fn fail_drains(&self, fail: bool) {
        self.shared.state.lock().fail_drains = fail;
    }

    /// Make channel release report an error.
    pub fn fail_release(&self, fail: bool) {
        self.shared.state.lock().fail_release = fail;
    }

    /// Sleep this long at the start of every read and write.
    pub fn set_op_delay(&self, delay: Duration) {
        self.shared.state.lock().op_delay = delay;
    }

    /// Highest number of read/write operations ever observed running at once.
    pub fn max_concurrent_ops(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Connector producing channels on a [`MemoryPort`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    port: MemoryPort,
    refuse: Option<OpenError>,
}

impl MemoryConnector {
    /// Connector that always succeeds.
    pub fn new(port: MemoryPort) -> Self {
        MemoryConnector { port, refuse: None }
    }

    /// Connector that fails every connect with `err`.
    pub fn refusing(port: MemoryPort, err: OpenError) -> Self {
        MemoryConnector {
            port,
            refuse: Some(err),
        }
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, config: &LinkConfig, _baud_rate: BaudRate) -> Result<Box<dyn Channel>, OpenError> {
        if let Some(err) = &self.refuse {
            return Err(err.clone());
        }
        let mut state = self.port.shared.state.lock();
        state.connects += 1;
        state.last_config = Some(config.clone());
        Ok(Box::new(MemoryChannel {
            shared: self.port.shared.clone(),
        }))
    }
}

/// Channel end handed to the link.
struct MemoryChannel {
    shared: Arc<Shared>,
}

impl Channel for MemoryChannel {
    fn read_within(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        let _op = OpGuard::enter(&self.shared);
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        if state.fail_reads {
            return Err(io::Error::other("injected read failure"));
        }
        while state.inbound.is_empty() {
            if self.shared.readable.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }

        let Some(mut chunk) = state.inbound.pop_front() else {
            return Ok(None);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            state.inbound.push_front(chunk.split_off(n));
        }
        Ok(Some(n))
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let _op = OpGuard::enter(&self.shared);
        let mut state = self.shared.state.lock();
        if state.fail_writes {
            return Err(io::Error::other("injected write failure"));
        }
        let n = state.max_write.map_or(bytes.len(), |max| max.min(bytes.len()));
        state.writes.push(bytes[..n].to_vec());
        Ok(n)
    }

    fn drain(&mut self) -> io::Result<()> {
        let mut state = self.shared.state.lock();
        if state.fail_drains {
            return Err(io::Error::other("injected drain failure"));
        }
        state.drains += 1;
        Ok(())
    }

    fn release(self: Box<Self>) -> io::Result<()> {
        let mut state = self.shared.state.lock();
        state.releases += 1;
        if state.fail_release {
            return Err(io::Error::other("injected release failure"));
        }
        Ok(())
    }
}
