use crate::error::Result;
use crate::format::Formatter;
use crate::handler::LogHandler;
use crate::record::{Level, LogRecord};
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// When to roll the active file over to a fresh one.
///
/// Both triggers are checked on every write; either one firing causes
/// exactly one rollover. A `max_bytes` of zero disables the size
/// trigger, a zero `interval` disables the time trigger. The interval
/// is anchored at handler construction (and re-anchored at each
/// rollover), not at local midnight.
#[derive(Clone, Debug)]
pub struct RotationPolicy {
    /// Size threshold in bytes. Rollover happens before a write that
    /// would push the file strictly past this.
    pub max_bytes: u64,
    /// Wall-clock interval between scheduled rollovers.
    pub interval: Duration,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 20 * 1024 * 1024,
            interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

struct FileState {
    /// Active file handle. `None` only transiently, after a rollover
    /// that could not reopen the path; the next write reopens it.
    file: Option<File>,
    /// Bytes written to the active file so far.
    size: u64,
    /// Next scheduled time-based rollover, if the time trigger is on.
    rollover_at: Option<DateTime<Utc>>,
    /// Sequence number of the most recent archive.
    seq: u64,
}

/// File handler that rolls the active log file over when either the
/// size or the time threshold is exceeded, gzip-compressing the
/// archived file.
///
/// One mutex spans the whole decide-rotate-write critical section, so
/// concurrent writers never interleave a rollover with an in-flight
/// write and never produce two rollovers for the same trigger. Write
/// and rollover failures are reported on stderr and never propagate
/// into the caller; each write independently re-evaluates whether a
/// rollover is needed, so there is no retry loop to manage.
pub struct RotatingFileHandler {
    path: PathBuf,
    policy: RotationPolicy,
    formatter: Box<dyn Formatter>,
    level: Level,
    state: Mutex<FileState>,
    /// Records dropped because the file could not be written.
    dropped: AtomicU64,
}

impl RotatingFileHandler {
    /// Open (or create) the log file at `path` and build a handler
    /// around it.
    ///
    /// **Parameters**
    /// - `path`: the active log file; parent directories are created.
    /// - `policy`: size/time rotation thresholds.
    /// - `formatter`: renders each record into one line.
    /// - `level`: minimum level this handler accepts.
    ///
    /// The archive sequence counter resumes past the highest
    /// `<file>.<n>[.gz]` already present next to the active file, so a
    /// restart never overwrites an existing archive.
    pub fn new(
        path: impl Into<PathBuf>,
        policy: RotationPolicy,
        formatter: Box<dyn Formatter>,
        level: Level,
    ) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);
        let seq = scan_archive_seq(&path);
        let rollover_at = next_deadline(policy.interval);

        Ok(RotatingFileHandler {
            path,
            policy,
            formatter,
            level,
            state: Mutex::new(FileState {
                file: Some(file),
                size,
                rollover_at,
                seq,
            }),
            dropped: AtomicU64::new(0),
        })
    }

    /// Whether writing `pending_len` more bytes would trigger a
    /// rollover.
    ///
    /// Pure check: no counters advance, repeated calls without an
    /// intervening write return the same answer (modulo the clock for
    /// the time trigger).
    pub fn should_rollover(&self, pending_len: u64) -> bool {
        let state = self.state.lock();
        self.should_rollover_locked(&state, pending_len)
    }

    /// Number of records dropped because of write failures.
    pub fn dropped_records(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn should_rollover_locked(&self, state: &FileState, pending_len: u64) -> bool {
        if self.policy.max_bytes > 0 && state.size + pending_len > self.policy.max_bytes {
            return true;
        }
        if let Some(at) = state.rollover_at {
            if Utc::now() >= at {
                return true;
            }
        }
        false
    }

    fn write_locked(&self, state: &mut FileState, line: &[u8]) -> io::Result<()> {
        let pending = line.len() as u64 + 1;
        if self.should_rollover_locked(state, pending) {
            if let Err(e) = self.rotate_locked(state) {
                // Non-fatal: keep appending to whatever file we have.
                eprintln!("log rotation failed for {}: {e}", self.path.display());
            }
        }

        if state.file.is_none() {
            let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            state.size = file.metadata().map(|m| m.len()).unwrap_or(0);
            state.file = Some(file);
        }

        match state.file.as_mut() {
            Some(file) => {
                file.write_all(line)?;
                file.write_all(b"\n")?;
                state.size += pending;
                Ok(())
            }
            None => Err(io::Error::new(io::ErrorKind::Other, "no active log file")),
        }
    }

    /// Close the active file, move it aside under the next sequence
    /// number, reopen a fresh file at the original path, then compress
    /// the archive.
    ///
    /// The fresh file is opened before compression runs: a failed
    /// compression keeps the uncompressed archive and is only
    /// reported, while the rollover of the active file has already
    /// completed.
    fn rotate_locked(&self, state: &mut FileState) -> io::Result<()> {
        // Scoped take: the handle is released here even if any later
        // step fails.
        drop(state.file.take());

        let seq = state.seq + 1;
        let archive = archive_path(&self.path, seq);
        if let Err(e) = fs::rename(&self.path, &archive) {
            // Could not move the file aside; reattach to it so the
            // handler still has a usable active file.
            let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            state.size = file.metadata().map(|m| m.len()).unwrap_or(0);
            state.file = Some(file);
            return Err(e);
        }
        state.seq = seq;

        let fresh = OpenOptions::new().create(true).append(true).open(&self.path)?;
        state.file = Some(fresh);
        state.size = 0;
        state.rollover_at = next_deadline(self.policy.interval);

        match compress_archive(&archive) {
            Ok(()) => {
                if let Err(e) = fs::remove_file(&archive) {
                    eprintln!(
                        "failed to remove uncompressed archive {}: {e}",
                        archive.display()
                    );
                }
            }
            Err(e) => {
                // Keep the uncompressed archive rather than lose it.
                eprintln!("failed to compress {}: {e}", archive.display());
            }
        }

        Ok(())
    }
}

impl LogHandler for RotatingFileHandler {
    fn emit(&self, record: &LogRecord) {
        if record.level < self.level {
            return;
        }
        let line = self.formatter.format(record);
        let mut state = self.state.lock();
        if let Err(e) = self.write_locked(&mut state, line.as_bytes()) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            eprintln!("log file write failed for {}: {e}", self.path.display());
        }
    }

    fn flush(&self) {
        let mut state = self.state.lock();
        if let Some(file) = state.file.as_mut() {
            let _ = file.flush();
        }
    }
}

fn next_deadline(interval: Duration) -> Option<DateTime<Utc>> {
    if interval.is_zero() {
        return None;
    }
    chrono::Duration::from_std(interval)
        .ok()
        .map(|d| Utc::now() + d)
}

fn archive_path(path: &Path, seq: u64) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{seq}"));
    PathBuf::from(name)
}

/// Gzip `archive` into `<archive>.gz`.
fn compress_archive(archive: &Path) -> io::Result<()> {
    let mut input = File::open(archive)?;
    let mut gz_path = archive.as_os_str().to_os_string();
    gz_path.push(".gz");
    let output = File::create(PathBuf::from(gz_path))?;

    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}

/// Highest archive sequence number already present next to `path`.
fn scan_archive_seq(path: &Path) -> u64 {
    let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return 0;
    };
    let Some(parent) = path.parent() else {
        return 0;
    };
    let Ok(entries) = fs::read_dir(parent) else {
        return 0;
    };

    let prefix = format!("{file_name}.");
    entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            let rest = name.strip_prefix(&prefix)?;
            let rest = rest.strip_suffix(".gz").unwrap_or(rest);
            rest.parse::<u64>().ok()
        })
        .max()
        .unwrap_or(0)
}
