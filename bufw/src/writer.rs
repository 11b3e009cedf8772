//! Byte sink adapters.
//!
//! [`Bufw`] implements [`io::Write`] so it can stand in for any writer, and
//! [`MakeWriter`] so a `tracing` fmt subscriber can log into it.

use std::io;

use tracing_subscriber::fmt::MakeWriter;

use crate::bufw::Bufw;

impl io::Write for Bufw {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Bufw::write(self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for &Bufw {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Bufw::write(self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Bufw {
    type Writer = &'a Bufw;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use tracing::Level;

    fn subscriber(buf: Bufw) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(buf)
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .finish()
    }

    #[test]
    fn test_io_write() {
        let mut buf = Bufw::new(false);
        write!(buf, "  hello ").unwrap();
        buf.write_all(b"world\n").unwrap();
        buf.flush().unwrap();
        assert_eq!(buf.string(), "helloworld");
    }

    #[test]
    fn test_io_write_by_ref() {
        let buf = Bufw::new(false);
        let mut w = &buf;
        w.write_all(b" ref ").unwrap();
        assert_eq!(buf.string(), "ref");
    }

    #[test]
    fn test_io_copy() {
        let mut buf = Bufw::new(false);
        let mut src: &[u8] = b"  copied  ";
        let n = io::copy(&mut src, &mut buf).unwrap();
        assert_eq!(n, 10);
        assert_eq!(buf.string(), "copied");
    }

    #[test]
    fn test_tracing_into_buffer() {
        let buf = Bufw::new(false);
        tracing::subscriber::with_default(subscriber(buf.clone()), || {
            tracing::info!("hello from the logger");
        });

        let out = buf.string();
        assert!(out.contains("INFO"), "got {:?}", out);
        assert!(out.ends_with("hello from the logger"), "got {:?}", out);
    }

    #[test]
    fn test_tracing_wait_for_log_lines() {
        let buf = Bufw::new(true);
        buf.sync_timeout("5s").unwrap();

        let logger = buf.clone();
        let producer = thread::spawn(move || {
            tracing::subscriber::with_default(subscriber(logger), || {
                tracing::warn!("first");
                tracing::warn!("second");
            });
        });

        let (n, res) = buf.wait_n(2);
        assert!(res.is_ok());
        assert_eq!(n, 2);
        producer.join().unwrap();

        let out = buf.string();
        assert!(out.contains("first"), "got {:?}", out);
        assert!(out.ends_with("second"), "got {:?}", out);
    }

    #[test]
    fn test_own_events_into_synchronized_buffer() {
        let buf = Bufw::new(true);
        let sink = buf.clone();
        let (done_tx, done_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            let subscriber = tracing_subscriber::fmt()
                .with_writer(sink.clone())
                .with_max_level(Level::TRACE)
                .with_ansi(false)
                .finish();
            tracing::subscriber::with_default(subscriber, || {
                sink.sync_timeout("1s").unwrap();
                assert!(sink.sync_timeout("later").is_err());
                let res = sink.wait_timeout(Duration::from_millis(20));
                assert!(res.unwrap_err().is_timeout());
            });
            done_tx.send(()).unwrap();
        });

        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("logging into a synchronized buffer blocked");
        worker.join().unwrap();

        assert_eq!(buf.timeout(), Some(Duration::from_secs(1)));
        let out = buf.string();
        assert!(out.contains("sync timeout set"), "got {:?}", out);
        assert!(out.contains("keeping previous timeout"), "got {:?}", out);
        assert!(out.contains("wait timed out"), "got {:?}", out);
    }
}
