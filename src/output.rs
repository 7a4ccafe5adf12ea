//! Output destinations and their resolution from configuration.

use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing_subscriber::fmt::MakeWriter;

use crate::{Error, Result};

/// A file-backed log resource with an explicit close.
pub trait FileWriter: Write + Send {
    /// Flush buffered data and release the underlying file.
    fn close(&mut self) -> io::Result<()>;
}

/// Opens a file writer for a configured destination string.
pub type FileWriterFactory = Arc<dyn Fn(&str) -> Result<Box<dyn FileWriter>> + Send + Sync>;

type Slot = Arc<Mutex<Option<Box<dyn FileWriter>>>>;

/// Shared handle to a file destination.
///
/// Clones share the same writer. After [`OwnedFile::close`] every handle
/// silently drops further writes.
#[derive(Clone)]
pub struct OwnedFile {
    path: Arc<str>,
    slot: Slot,
}

impl OwnedFile {
    pub fn new(path: &str, writer: Box<dyn FileWriter>) -> Self {
        Self {
            path: Arc::from(path),
            slot: Arc::new(Mutex::new(Some(writer))),
        }
    }

    /// Destination as configured.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Close the writer. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let writer = self.lock().take();
        match writer {
            Some(mut writer) => writer.close().map_err(|source| Error::Close {
                path: self.path.to_string(),
                source,
            }),
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn FileWriter>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        match self.lock().as_mut() {
            Some(writer) => writer.write_all(buf),
            None => Ok(()),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self.lock().as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for OwnedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedFile")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A resolved output target.
#[derive(Debug, Clone)]
pub enum Destination {
    Stdout,
    Stderr,
    File(OwnedFile),
}

impl Destination {
    /// Match the built-in streams, ignoring ASCII case.
    pub fn builtin(name: &str) -> Option<Destination> {
        if name.eq_ignore_ascii_case("stdout") {
            Some(Destination::Stdout)
        } else if name.eq_ignore_ascii_case("stderr") {
            Some(Destination::Stderr)
        } else {
            None
        }
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        match self {
            Destination::Stdout => io::stdout().lock().write_all(buf),
            Destination::Stderr => io::stderr().lock().write_all(buf),
            Destination::File(file) => file.write_all(buf),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self {
            Destination::Stdout => io::stdout().flush(),
            Destination::Stderr => io::stderr().flush(),
            Destination::File(file) => file.flush(),
        }
    }
}

/// Writes every line to all of its destinations.
#[derive(Debug, Clone)]
pub struct FanOut {
    targets: Vec<Destination>,
}

impl FanOut {
    pub fn new(targets: Vec<Destination>) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &[Destination] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Write to every destination; a failing one does not starve the rest.
    pub fn write_line(&self, buf: &[u8]) -> io::Result<()> {
        let mut result = Ok(());
        for target in &self.targets {
            if let Err(e) = target.write_all(buf) {
                result = Err(e);
            }
        }
        result
    }

    pub fn flush(&self) -> io::Result<()> {
        let mut result = Ok(());
        for target in &self.targets {
            if let Err(e) = target.flush() {
                result = Err(e);
            }
        }
        result
    }

    /// Close every file target, draining buffered writers first.
    pub fn close_files(&self) -> Result<()> {
        let files: Vec<OwnedFile> = self
            .targets
            .iter()
            .filter_map(|target| match target {
                Destination::File(file) => Some(file.clone()),
                _ => None,
            })
            .collect();
        close_all(&files)
    }
}

impl<'a> MakeWriter<'a> for FanOut {
    type Writer = FanOutWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        FanOutWriter(self)
    }
}

/// Writer handed out per event by a [`FanOut`].
#[derive(Debug)]
pub struct FanOutWriter<'a>(&'a FanOut);

impl Write for FanOutWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write_line(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// Outcome of resolving the configured outputs.
#[derive(Debug, Default)]
pub struct Resolved {
    /// Every destination in first-occurrence order.
    pub writers: Vec<Destination>,
    /// The file-backed subset, to be closed on teardown.
    pub owned: Vec<OwnedFile>,
}

/// Resolve configured outputs into destinations.
///
/// Duplicates are dropped (first occurrence wins), empty entries are skipped,
/// `stdout`/`stderr` map to the process streams and anything else is opened
/// through `factory`. The first factory error aborts resolution after closing
/// every file opened by this call.
pub fn resolve(outputs: &[String], factory: &FileWriterFactory) -> Result<Resolved> {
    let mut seen = HashSet::with_capacity(outputs.len());
    let mut resolved = Resolved::default();

    for output in outputs {
        if !seen.insert(output.as_str()) || output.is_empty() {
            continue;
        }
        if let Some(builtin) = Destination::builtin(output) {
            resolved.writers.push(builtin);
            continue;
        }
        match factory(output) {
            Ok(writer) => {
                let file = OwnedFile::new(output, writer);
                resolved.writers.push(Destination::File(file.clone()));
                resolved.owned.push(file);
            }
            Err(e) => {
                for file in &resolved.owned {
                    if let Err(close_err) = file.close() {
                        tracing::warn!(path = file.path(), error = %close_err, "close after failed open");
                    }
                }
                return Err(e);
            }
        }
    }

    Ok(resolved)
}

/// The factory used when none is supplied: daily-rotated files written
/// through a background worker.
#[cfg(feature = "file")]
pub fn default_factory() -> FileWriterFactory {
    Arc::new(crate::writer::open_rotating)
}

/// Without the `file` feature only `stdout` and `stderr` are available.
#[cfg(not(feature = "file"))]
pub fn default_factory() -> FileWriterFactory {
    Arc::new(|path: &str| -> Result<Box<dyn FileWriter>> {
        Err(Error::Config(format!(
            "file output {path} requires the `file` feature"
        )))
    })
}

/// Close every file, returning the last error.
pub fn close_all(files: &[OwnedFile]) -> Result<()> {
    let mut result = Ok(());
    for file in files {
        if let Err(e) = file.close() {
            result = Err(e);
        }
    }
    result
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        closed: AtomicUsize,
        written: Mutex<Vec<u8>>,
    }

    struct CountingWriter {
        counters: Arc<Counters>,
        fail_close: bool,
    }

    impl Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.counters.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl FileWriter for CountingWriter {
        fn close(&mut self) -> io::Result<()> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(io::Error::other("close failed"))
            } else {
                Ok(())
            }
        }
    }

    fn counting_factory(counters: Arc<Counters>, bad: &'static str) -> FileWriterFactory {
        Arc::new(move |path: &str| {
            if path == bad {
                return Err(Error::Open {
                    path: path.to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "no such dir"),
                });
            }
            counters.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingWriter {
                counters: Arc::clone(&counters),
                fail_close: path.ends_with(".broken"),
            }) as Box<dyn FileWriter>)
        })
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn describe(resolved: &Resolved) -> Vec<String> {
        resolved
            .writers
            .iter()
            .map(|d| match d {
                Destination::Stdout => "stdout".to_string(),
                Destination::Stderr => "stderr".to_string(),
                Destination::File(f) => f.path().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_builtin_matching() {
        assert!(matches!(Destination::builtin("stdout"), Some(Destination::Stdout)));
        assert!(matches!(Destination::builtin("STDOUT"), Some(Destination::Stdout)));
        assert!(matches!(Destination::builtin("StdErr"), Some(Destination::Stderr)));
        assert!(Destination::builtin("").is_none());
        assert!(Destination::builtin("stdout.log").is_none());
    }

    #[test]
    fn test_resolve_dedup_preserves_first_occurrence() {
        let counters = Arc::new(Counters::default());
        let factory = counting_factory(Arc::clone(&counters), "");
        let with_dups = strings(&["a.log", "stdout", "a.log", "stderr", "stdout", "b.log"]);
        let manual = strings(&["a.log", "stdout", "stderr", "b.log"]);

        let left = resolve(&with_dups, &factory).unwrap();
        let right = resolve(&manual, &factory).unwrap();

        assert_eq!(describe(&left), describe(&right));
        assert_eq!(describe(&left), manual);
        assert_eq!(left.owned.len(), 2);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_resolve_dedup_is_exact_match() {
        let factory = counting_factory(Arc::new(Counters::default()), "");
        // Case variants of a built-in are distinct entries.
        let resolved = resolve(&strings(&["stdout", "STDOUT"]), &factory).unwrap();
        assert_eq!(resolved.writers.len(), 2);
        assert!(resolved.owned.is_empty());
    }

    #[test]
    fn test_resolve_skips_empty() {
        let counters = Arc::new(Counters::default());
        let factory = counting_factory(Arc::clone(&counters), "");
        let resolved = resolve(&strings(&["", "stderr", ""]), &factory).unwrap();
        assert_eq!(describe(&resolved), vec!["stderr"]);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolve_fail_fast_closes_opened() {
        let counters = Arc::new(Counters::default());
        let factory = counting_factory(Arc::clone(&counters), "badpath");
        let outputs = strings(&["stdout", "first.log", "badpath", "never.log"]);

        let err = resolve(&outputs, &factory).unwrap_err();
        assert!(matches!(err, Error::Open { ref path, .. } if path == "badpath"));
        // never.log was not attempted, first.log was closed.
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolve_same_error_with_duplicates() {
        let factory = counting_factory(Arc::new(Counters::default()), "badpath");
        let a = resolve(&strings(&["stdout", "badpath", "stdout"]), &factory).unwrap_err();
        let b = resolve(&strings(&["stdout", "badpath"]), &factory).unwrap_err();
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_fan_out_writes_every_file() {
        let counters = Arc::new(Counters::default());
        let factory = counting_factory(Arc::clone(&counters), "");
        let resolved = resolve(&strings(&["one.log", "two.log"]), &factory).unwrap();
        let fan_out = FanOut::new(resolved.writers);
        fan_out.write_line(b"hello\n").unwrap();
        fan_out.flush().unwrap();
        assert_eq!(&*counters.written.lock().unwrap(), b"hello\nhello\n");
    }

    #[test]
    fn test_closed_file_drops_writes() {
        let counters = Arc::new(Counters::default());
        let factory = counting_factory(Arc::clone(&counters), "");
        let resolved = resolve(&strings(&["one.log"]), &factory).unwrap();
        let fan_out = FanOut::new(resolved.writers);

        close_all(&resolved.owned).unwrap();
        assert!(resolved.owned[0].is_closed());
        fan_out.write_line(b"late\n").unwrap();
        assert!(counters.written.lock().unwrap().is_empty());

        // A second close is a no-op.
        resolved.owned[0].close().unwrap();
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_all_continues_and_keeps_last_error() {
        let counters = Arc::new(Counters::default());
        let factory = counting_factory(Arc::clone(&counters), "");
        let resolved = resolve(
            &strings(&["a.broken", "b.log", "c.broken", "d.log"]),
            &factory,
        )
        .unwrap();

        let err = close_all(&resolved.owned).unwrap_err();
        assert!(matches!(err, Error::Close { ref path, .. } if path == "c.broken"));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_close_files_skips_streams() {
        let counters = Arc::new(Counters::default());
        let factory = counting_factory(Arc::clone(&counters), "");
        let resolved = resolve(&strings(&["stderr", "a.log", "b.log"]), &factory).unwrap();
        let fan_out = FanOut::new(resolved.writers);

        fan_out.close_files().unwrap();
        assert_eq!(counters.closed.load(Ordering::SeqCst), 2);
        assert!(resolved.owned.iter().all(OwnedFile::is_closed));
    }

    #[test]
    fn test_make_writer_fans_out() {
        let counters = Arc::new(Counters::default());
        let factory = counting_factory(Arc::clone(&counters), "");
        let resolved = resolve(&strings(&["a.log", "b.log"]), &factory).unwrap();
        let fan_out = FanOut::new(resolved.writers);

        fan_out.make_writer().write_all(b"line\n").unwrap();
        assert_eq!(counters.written.lock().unwrap().as_slice(), b"line\nline\n");
    }
}
