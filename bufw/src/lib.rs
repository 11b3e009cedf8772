//! Concurrency-safe in-memory byte sink with a write rendezvous.
//!
//! [`Bufw`] collects whitespace-trimmed writes from any number of threads.
//! Tests use it as the output of a logger or client under test and then
//! read back what was written, without polling or sleeping:
//!
//! - [`Bufw::write`]: Append a trimmed chunk (also via [`std::io::Write`])
//! - [`Bufw::bytes`] / [`Bufw::string`]: Drain everything written so far
//! - [`Bufw::wait`] / [`Bufw::wait_n`]: Block until one or `n` writes land
//! - [`Bufw::sync_timeout`]: Bound waits with a duration like "100ms"
//!
//! # Synchronization
//!
//! A buffer built with `Bufw::new(true)` pairs every write with exactly one
//! wait through an unbuffered rendezvous: the writer blocks until a waiter
//! takes its token, and a waiter blocks until a write arrives or its
//! timeout (10s by default) elapses. Waiting on a buffer built with
//! `Bufw::new(false)` fails immediately with [`Error::UnsynchronizedWait`].
//!
//! ```
//! use giztoy_bufw::{Bufw, Error};
//! use std::thread;
//! use std::time::Duration;
//!
//! let buf = Bufw::new(true);
//!
//! // Nothing written yet.
//! let res = buf.wait_timeout(Duration::from_millis(100));
//! assert!(matches!(res, Err(Error::Timeout(_))));
//!
//! let writer = buf.clone();
//! let producer = thread::spawn(move || writer.write(b"hello\n").unwrap());
//!
//! buf.wait().unwrap();
//! assert_eq!(&buf.bytes()[..], b"hello");
//! assert_eq!(producer.join().unwrap(), 6);
//! ```
//!
//! # Logging into a buffer
//!
//! `Bufw` implements `tracing_subscriber`'s `MakeWriter`, so a fmt
//! subscriber can write its lines straight into it:
//!
//! ```
//! use giztoy_bufw::Bufw;
//!
//! let buf = Bufw::new(false);
//! let subscriber = tracing_subscriber::fmt()
//!     .with_writer(buf.clone())
//!     .with_ansi(false)
//!     .finish();
//! tracing::subscriber::with_default(subscriber, || tracing::info!("ready"));
//! assert!(buf.string().ends_with("ready"));
//! ```
//!
//! This crate's own log events may land in the buffer they describe. In a
//! synchronized buffer those lines are appended without a rendezvous, so
//! they never block and never count toward [`Bufw::wait`].

mod bufw;
mod config;
mod duration;
mod error;
mod writer;

pub use bufw::{Bufw, DEFAULT_TIMEOUT};
pub use config::Config;
pub use duration::{format_duration, parse_duration};
pub use error::{Error, Result};
