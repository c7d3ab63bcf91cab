use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const DEFAULT_DELAY: Duration = Duration::from_millis(100);

/// Busy indicator drawn on its own row while a request is in flight.
pub(crate) struct Spinner<W: Write + Send + 'static = Stdout> {
    out: Arc<Mutex<W>>,
    message: String,
    delay: Duration,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Spinner<Stdout> {
    pub(crate) fn stdout(message: impl Into<String>) -> Self {
        Self::new(io::stdout(), message)
    }
}

impl<W: Write + Send + 'static> Spinner<W> {
    pub(crate) fn new(out: W, message: impl Into<String>) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
            message: message.into(),
            delay: DEFAULT_DELAY,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Move to a fresh row and start animating. Starting twice is a no-op.
    pub(crate) fn start(&mut self) -> io::Result<()> {
        if self.is_running() {
            return Ok(());
        }
        {
            let mut out = lock(&self.out);
            out.write_all(b"\r\n")?;
            out.flush()?;
        }
        self.running.store(true, Ordering::SeqCst);
        let out = Arc::clone(&self.out);
        let running = Arc::clone(&self.running);
        let message = self.message.clone();
        let delay = self.delay;
        let worker = thread::Builder::new()
            .name("spinner".to_string())
            .spawn(move || spin(out, running, message, delay))?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Stop animating and erase the spinner row. The worker is joined first,
    /// so no frame can land after the erase.
    pub(crate) fn stop(&mut self) -> io::Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.running.store(false, Ordering::SeqCst);
        if worker.join().is_err() {
            tracing::warn!("spinner thread panicked");
        }
        let mut out = lock(&self.out);
        queue!(
            out,
            MoveUp(1),
            MoveToColumn(0),
            Clear(ClearType::FromCursorDown)
        )?;
        out.flush()
    }
}

impl<W: Write + Send + 'static> Drop for Spinner<W> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::debug!(%err, "spinner cleanup failed");
        }
    }
}

fn lock<W>(out: &Mutex<W>) -> std::sync::MutexGuard<'_, W> {
    match out.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn spin<W: Write>(out: Arc<Mutex<W>>, running: Arc<AtomicBool>, message: String, delay: Duration) {
    let separator = if message.is_empty() { "" } else { " " };
    for frame in FRAMES.iter().cycle() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        {
            let mut out = lock(&out);
            let drawn = write!(out, "\r{message}{separator}{frame}").and_then(|_| out.flush());
            if drawn.is_err() {
                break;
            }
        }
        thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            lock(&self.0).extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&lock(&self.0)).into_owned()
        }
    }

    fn erase_sequence() -> String {
        let mut tail = Vec::new();
        queue!(
            tail,
            MoveUp(1),
            MoveToColumn(0),
            Clear(ClearType::FromCursorDown)
        )
        .expect("write");
        String::from_utf8(tail).expect("utf8")
    }

    #[test]
    fn stop_erases_after_the_last_frame() {
        let buffer = SharedBuffer::default();
        let mut spinner =
            Spinner::new(buffer.clone(), "Thinking").with_delay(Duration::from_millis(5));
        spinner.start().expect("start");
        assert!(spinner.is_running());
        thread::sleep(Duration::from_millis(30));
        spinner.stop().expect("stop");
        assert!(!spinner.is_running());

        let written = buffer.contents();
        assert!(written.starts_with("\r\n\rThinking |"));
        assert!(written.ends_with(&erase_sequence()));
        let after_stop = written.len();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(buffer.contents().len(), after_stop);
    }

    #[test]
    fn stop_without_start_writes_nothing() {
        let buffer = SharedBuffer::default();
        let mut spinner = Spinner::new(buffer.clone(), "");
        spinner.stop().expect("stop");
        drop(spinner);
        assert!(buffer.contents().is_empty());
    }
}
