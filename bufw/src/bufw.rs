//! Synchronized byte buffer implementation.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::Config;
use crate::duration::{format_duration, parse_duration};
use crate::error::{Error, Result};

thread_local! {
    /// Set while this thread is emitting one of bufw's own log events.
    static OWN_EVENT: Cell<bool> = const { Cell::new(false) };
}

/// Runs `f` with the own-event flag set. A subscriber writing into a
/// synchronized buffer gets the line appended without a rendezvous, so
/// logging from bufw can't block on a wait that never comes.
fn own_event(f: impl FnOnce()) {
    let prev = OWN_EVENT.replace(true);
    f();
    OWN_EVENT.set(prev);
}

/// Default wait timeout for synchronized buffers.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A thread-safe, append-only byte sink.
///
/// Every write is whitespace-trimmed and appended to an internal buffer.
/// Reads drain the buffer: each chunk is returned exactly once.
///
/// When built with synchronization enabled, every write also hands one
/// token to a waiter through an unbuffered rendezvous, so an observer can
/// block in [`wait`](Bufw::wait) until another thread has written.
///
/// # Semantics
///
/// - **Write**: Appends under the lock; in sync mode, then blocks until a
///   waiter consumes the token. The lock is not held while blocking.
/// - **Bytes / String**: Destructive read of everything written so far
/// - **Wait**: Blocks until one write lands or the timeout elapses
///
/// A synchronized writer has no timeout of its own. Writers and waiters
/// must run on different threads.
///
/// Cloning a `Bufw` yields another handle to the same buffer.
///
/// # Example
///
/// ```
/// use giztoy_bufw::Bufw;
/// use std::thread;
///
/// let buf = Bufw::new(true);
/// buf.sync_timeout("1s").unwrap();
///
/// let writer = buf.clone();
/// let producer = thread::spawn(move || {
///     for _ in 0..3 {
///         writer.write(b" hello ").unwrap();
///     }
/// });
///
/// let (n, res) = buf.wait_n(3);
/// assert!(res.is_ok());
/// assert_eq!(n, 3);
/// assert_eq!(buf.string(), "hellohellohello");
/// producer.join().unwrap();
/// ```
pub struct Bufw {
    inner: Arc<BufwInner>,
}

struct BufwInner {
    buf: Mutex<BytesMut>,
    mode: Mode,
}

enum Mode {
    Unsynchronized,
    Synchronized(Signal),
}

/// Write rendezvous. The sender and receiver live together, so the
/// channel never disconnects while the buffer is alive.
struct Signal {
    tx: SyncSender<()>,
    rx: Mutex<Receiver<()>>,
    timeout: Mutex<Duration>,
}

impl Signal {
    fn new(timeout: Duration) -> Self {
        let (tx, rx) = mpsc::sync_channel(0);
        Signal {
            tx,
            rx: Mutex::new(rx),
            timeout: Mutex::new(timeout),
        }
    }

    fn wait(&self, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        let Some(deadline) = start.checked_add(timeout) else {
            // Too far out to represent; wait for the write.
            return self.rx.lock().recv().map_err(|_| Error::Timeout(timeout));
        };

        // Concurrent waiters take turns on the receiver, within the same deadline.
        let Some(rx) = self.rx.try_lock_until(deadline) else {
            own_event(|| {
                trace!(timeout = %format_duration(timeout), "bufw: wait timed out queued behind another waiter")
            });
            return Err(Error::Timeout(timeout));
        };

        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(()) => Ok(()),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                own_event(|| trace!(timeout = %format_duration(timeout), "bufw: wait timed out"));
                Err(Error::Timeout(timeout))
            }
        }
    }
}

impl Clone for Bufw {
    fn clone(&self) -> Self {
        Bufw {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for Bufw {
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Debug for Bufw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bufw")
            .field("len", &self.len())
            .field("timeout", &self.timeout())
            .finish()
    }
}

impl Bufw {
    /// Creates an empty buffer.
    ///
    /// If `enable_sync` is true, writes rendezvous with [`wait`](Bufw::wait)
    /// and the wait timeout defaults to [`DEFAULT_TIMEOUT`].
    pub fn new(enable_sync: bool) -> Self {
        Self::with_config(&Config {
            sync: enable_sync,
            ..Config::default()
        })
    }

    /// Creates an empty buffer from a [`Config`].
    pub fn with_config(config: &Config) -> Self {
        let mode = if config.sync {
            Mode::Synchronized(Signal::new(config.timeout))
        } else {
            Mode::Unsynchronized
        };
        Bufw {
            inner: Arc::new(BufwInner {
                buf: Mutex::new(BytesMut::new()),
                mode,
            }),
        }
    }

    /// Returns true if writes rendezvous with waiters.
    pub fn is_sync(&self) -> bool {
        matches!(self.inner.mode, Mode::Synchronized(_))
    }

    /// Returns the wait timeout, or `None` for an unsynchronized buffer.
    pub fn timeout(&self) -> Option<Duration> {
        match &self.inner.mode {
            Mode::Synchronized(signal) => Some(*signal.timeout.lock()),
            Mode::Unsynchronized => None,
        }
    }

    /// Returns the number of undrained bytes.
    pub fn len(&self) -> usize {
        self.inner.buf.lock().len()
    }

    /// Returns true if there is nothing to drain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the whitespace-trimmed `data` to the buffer.
    ///
    /// Returns the untrimmed length of `data`. In sync mode this blocks
    /// until a waiter consumes the write, even for empty input. Lines from
    /// bufw's own log events are appended without blocking.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.inner.buf.lock().extend_from_slice(trim_space(data));

        if let Mode::Synchronized(signal) = &self.inner.mode {
            if OWN_EVENT.get() {
                return Ok(data.len());
            }
            // Only fails once the receiver is gone, which outlives every handle.
            let _ = signal.tx.send(());
        }
        Ok(data.len())
    }

    /// Drains the buffer, returning everything written since the last drain.
    pub fn bytes(&self) -> Bytes {
        self.inner.buf.lock().split().freeze()
    }

    /// Drains the buffer as text with surrounding whitespace removed.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD.
    pub fn string(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).trim().to_string()
    }

    /// Blocks until a write lands or the configured timeout elapses.
    ///
    /// Each successful wait consumes exactly one write. A write arriving
    /// after a timeout stays in the buffer and pairs with a later wait.
    pub fn wait(&self) -> Result<()> {
        let signal = self.signal()?;
        let timeout = *signal.timeout.lock();
        signal.wait(timeout)
    }

    /// Like [`wait`](Bufw::wait) with a one-off timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        self.signal()?.wait(timeout)
    }

    /// Waits for `n` writes, one [`wait`](Bufw::wait) at a time.
    ///
    /// Stops at the first failure and returns how many waits succeeded
    /// along with the error. An unsynchronized buffer fails even for `n == 0`.
    pub fn wait_n(&self, n: usize) -> (usize, Result<()>) {
        if let Err(e) = self.signal() {
            return (0, Err(e));
        }
        for i in 0..n {
            if let Err(e) = self.wait() {
                return (i, Err(e));
            }
        }
        (n, Ok(()))
    }

    /// Like [`wait_n`](Bufw::wait_n) with a one-off timeout per wait.
    pub fn wait_n_timeout(&self, n: usize, timeout: Duration) -> (usize, Result<()>) {
        let signal = match self.signal() {
            Ok(signal) => signal,
            Err(e) => return (0, Err(e)),
        };
        for i in 0..n {
            if let Err(e) = signal.wait(timeout) {
                return (i, Err(e));
            }
        }
        (n, Ok(()))
    }

    /// Parses `ttl` (e.g. "100ms", "10s") and makes it the wait timeout.
    ///
    /// On a parse error the previous timeout is kept.
    pub fn sync_timeout(&self, ttl: &str) -> Result<()> {
        let timeout = parse_duration(ttl).inspect_err(|e| {
            own_event(|| debug!(ttl, error = %e, "bufw: keeping previous timeout"));
        })?;
        self.set_timeout(timeout);
        Ok(())
    }

    /// Sets the wait timeout for subsequent waits.
    ///
    /// Has no effect on an unsynchronized buffer.
    pub fn set_timeout(&self, timeout: Duration) {
        match &self.inner.mode {
            Mode::Synchronized(signal) => {
                *signal.timeout.lock() = timeout;
                own_event(|| debug!(timeout = %format_duration(timeout), "bufw: sync timeout set"));
            }
            Mode::Unsynchronized => {
                own_event(|| debug!("bufw: timeout ignored on unsynchronized buffer"));
            }
        }
    }

    fn signal(&self) -> Result<&Signal> {
        match &self.inner.mode {
            Mode::Synchronized(signal) => Ok(signal),
            Mode::Unsynchronized => Err(Error::UnsynchronizedWait),
        }
    }
}

/// Strips leading and trailing whitespace, one char at a time from each
/// end. Trimming stops at the first non-space char or invalid UTF-8 byte.
fn trim_space(data: &[u8]) -> &[u8] {
    let mut start = 0;
    while let Some(c) = first_char(&data[start..]) {
        if !c.is_whitespace() {
            break;
        }
        start += c.len_utf8();
    }

    let mut end = data.len();
    while end > start {
        match last_char(&data[start..end]) {
            Some(c) if c.is_whitespace() => end -= c.len_utf8(),
            _ => break,
        }
    }
    &data[start..end]
}

/// Decodes the char at the start of `b`, if it is valid UTF-8.
fn first_char(b: &[u8]) -> Option<char> {
    let head = &b[..b.len().min(4)];
    let valid = match std::str::from_utf8(head) {
        Ok(s) => s,
        Err(e) => std::str::from_utf8(&head[..e.valid_up_to()]).ok()?,
    };
    valid.chars().next()
}

/// Decodes the char at the end of `b`, if it is valid UTF-8.
fn last_char(b: &[u8]) -> Option<char> {
    (1..=b.len().min(4))
        .find_map(|n| std::str::from_utf8(&b[b.len() - n..]).ok())
        .and_then(|s| s.chars().next_back())
}
