use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use flate2::Compression;
use flate2::write::GzEncoder;
use time::OffsetDateTime;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};

use crate::output::FileWriter;
use crate::rotation::RotationPolicy;
use crate::{Error, Result};

type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// A buffered file that rolls over by period and size.
///
/// The live file always sits at the configured path. On rollover it is
/// renamed to `<path>.<period key>` (with `.1`, `.2`, ... appended if that
/// name is taken) and, when compression is on, gzipped to `<archive>.gz`
/// on a background thread.
pub struct RotatingFile {
    path: PathBuf,
    policy: RotationPolicy,
    file: BufWriter<File>,
    /// Bytes in the live file.
    size: u64,
    /// Period key of the data in the live file.
    period_key: String,
    clock: Clock,
    archivers: Vec<JoinHandle<()>>,
}

impl RotatingFile {
    /// Open or create the log file at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>, policy: RotationPolicy) -> io::Result<Self> {
        Self::open_with_clock(path.as_ref(), policy, Arc::new(now))
    }

    pub(crate) fn open_with_clock(
        path: &Path,
        policy: RotationPolicy,
        clock: Clock,
    ) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let metadata = file.metadata()?;
        // An existing file belongs to the period it was last written in.
        let current = clock();
        let last_write = metadata
            .modified()
            .map(|t| OffsetDateTime::from(t).to_offset(current.offset()))
            .unwrap_or(current);
        let period_key = policy.period.key(last_write);

        Ok(Self {
            path: path.to_path_buf(),
            policy,
            file: BufWriter::new(file),
            size: metadata.len(),
            period_key,
            clock,
            archivers: Vec::new(),
        })
    }

    fn roll(&mut self, now_key: String) -> io::Result<()> {
        self.file.flush()?;

        let archive = self.archive_path();
        fs::rename(&self.path, &archive)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.file = BufWriter::new(file);
        self.size = 0;
        self.period_key = now_key;

        self.archivers.retain(|handle| !handle.is_finished());
        if self.policy.compress {
            self.archivers.push(std::thread::spawn(move || {
                if let Err(e) = compress(&archive) {
                    tracing::warn!(archive = %archive.display(), error = %e, "log archive not compressed");
                }
            }));
        }
        if self.policy.max_files > 0 {
            self.prune()?;
        }
        Ok(())
    }

    /// First free `<path>.<key>[.<n>]` name for the file being rolled.
    fn archive_path(&self) -> PathBuf {
        let base = if self.period_key.is_empty() {
            self.path.display().to_string()
        } else {
            format!("{}.{}", self.path.display(), self.period_key)
        };
        let taken = |p: &str| Path::new(p).exists() || Path::new(&format!("{}.gz", p)).exists();

        if !self.period_key.is_empty() && !taken(base.as_str()) {
            return PathBuf::from(base);
        }
        (1..)
            .map(|n| format!("{}.{}", base, n))
            .find(|candidate| !taken(candidate.as_str()))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(base))
    }

    /// Delete the oldest archives beyond `max_files`.
    fn prune(&self) -> io::Result<()> {
        let Some(dir) = self.path.parent() else {
            return Ok(());
        };
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        let prefix = match self.path.file_name() {
            Some(name) => format!("{}.", name.to_string_lossy()),
            None => return Ok(()),
        };

        let mut archives = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // Uncompressed archives may still be in flight to an archiver.
            if name.starts_with(&prefix) && (!self.policy.compress || name.ends_with(".gz")) {
                let modified = entry.metadata()?.modified()?;
                archives.push((modified, entry.path()));
            }
        }
        if archives.len() <= self.policy.max_files {
            return Ok(());
        }
        archives.sort();
        let excess = archives.len() - self.policy.max_files;
        for (_, path) in archives.into_iter().take(excess) {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Wait for background compression to finish.
    pub fn join_archivers(&mut self) {
        for handle in self.archivers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Flush the live file and wait for the archivers. The flush error, if
    /// any, is returned after the archivers are done.
    pub fn finish(&mut self) -> io::Result<()> {
        let flushed = self.file.flush();
        self.join_archivers();
        flushed
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let now_key = self.policy.period.key((self.clock)());
        if self
            .policy
            .needs_roll(&self.period_key, &now_key, self.size, buf.len())
        {
            self.roll(now_key)?;
        }
        let written = self.file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for RotatingFile {
    fn drop(&mut self) {
        let _ = self.file.flush();
        self.join_archivers();
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Gzip `path` to `<path>.gz` and remove the original.
fn compress(path: &Path) -> io::Result<()> {
    let target = PathBuf::from(format!("{}.gz", path.display()));
    let mut input = File::open(path)?;
    let mut encoder = GzEncoder::new(File::create(&target)?, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.sync_all()?;
    fs::remove_file(path)
}

/// A [`RotatingFile`] behind a `tracing-appender` worker thread.
///
/// Writes only enqueue. Closing drops the worker guard, which drains the
/// queue into the file, then flushes the file and waits for its archivers.
pub struct BufferedFile {
    writer: NonBlocking,
    guard: Option<WorkerGuard>,
    file: SharedFile,
}

impl BufferedFile {
    pub fn new(file: RotatingFile) -> Self {
        let file = SharedFile(Arc::new(Mutex::new(file)));
        let (writer, guard) = NonBlockingBuilder::default()
            .lossy(false)
            .finish(file.clone());
        Self {
            writer,
            guard: Some(guard),
            file,
        }
    }
}

impl Write for BufferedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl FileWriter for BufferedFile {
    fn close(&mut self) -> io::Result<()> {
        let Some(guard) = self.guard.take() else {
            return Ok(());
        };
        drop(guard);
        self.file.lock().finish()
    }
}

/// The rotating file, shared between the worker thread and its owner.
#[derive(Clone)]
struct SharedFile(Arc<Mutex<RotatingFile>>);

impl SharedFile {
    fn lock(&self) -> MutexGuard<'_, RotatingFile> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

/// Default file factory: daily rotation, gzip archives, buffered writes.
pub fn open_rotating(path: &str) -> Result<Box<dyn FileWriter>> {
    let file = RotatingFile::open(path, RotationPolicy::daily()).map_err(|source| Error::Open {
        path: path.to_string(),
        source,
    })?;
    Ok(Box::new(BufferedFile::new(file)))
}
