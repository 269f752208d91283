//! Journal tailing.
//!
//! Opens a journal positioned at end-of-file and yields each line appended
//! afterwards. When no complete line is available the tailer sleeps for the
//! poll interval and retries, so [`Tailer::next_line`] only returns once a
//! line arrives or the journal becomes unavailable.
//!
//! Partial lines are buffered until their terminator is written. A journal
//! that shrinks below the read position is treated as truncated and re-read
//! from the start. A journal that disappears is fatal.
//!
//! # Example
//!
//! ```no_run
//! use afk_monitor::tailer::{latest_journal, Tailer};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), afk_monitor::tailer::TailerError> {
//! let journal = latest_journal(Path::new("/journals")).await?;
//! let mut tailer = Tailer::open(journal).await?;
//! loop {
//!     let line = tailer.next_line().await?;
//!     println!("{line}");
//! }
//! # }
//! ```

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tracing::{debug, info};

/// Default sleep between polls when no new data is available.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Journal files are named `Journal.<timestamp>.<part>.log`.
const JOURNAL_PREFIX: &str = "Journal";

/// Errors raised while locating or reading the journal.
#[derive(Error, Debug)]
pub enum TailerError {
    /// The journal folder does not exist.
    #[error("journal folder not found: {}", .path.display())]
    FolderNotFound { path: PathBuf },

    /// The journal folder contains no journal files.
    #[error("no journal files found in {}", .path.display())]
    NoJournal { path: PathBuf },

    /// The journal could not be opened, read or inspected.
    #[error("journal {} is unavailable: {source}", .path.display())]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Follows one journal file from its end.
#[derive(Debug)]
pub struct Tailer {
    path: PathBuf,
    reader: BufReader<File>,
    position: u64,
    pending: Vec<u8>,
    poll_interval: Duration,
}

impl Tailer {
    /// Opens `path` and seeks to its end; existing content is never yielded.
    ///
    /// # Errors
    ///
    /// Returns [`TailerError::FileUnavailable`] if the file cannot be opened.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, TailerError> {
        let path = path.into();
        let mut file = File::open(&path)
            .await
            .map_err(|source| unavailable(&path, source))?;
        let position = file
            .seek(SeekFrom::End(0))
            .await
            .map_err(|source| unavailable(&path, source))?;

        info!(path = %path.display(), position, "Opened journal");

        Ok(Self {
            path,
            reader: BufReader::new(file),
            position,
            pending: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Sets the sleep between polls.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Path of the journal being followed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset up to which the journal has been read.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Waits for the next complete line and returns it without its
    /// terminator.
    ///
    /// # Errors
    ///
    /// Returns [`TailerError::FileUnavailable`] if the journal is removed or
    /// can no longer be read.
    pub async fn next_line(&mut self) -> Result<String, TailerError> {
        loop {
            if let Some(line) = self.try_read_line().await? {
                return Ok(line);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Returns the next complete line if one is available without waiting.
    ///
    /// Blank lines are skipped and invalid UTF-8 is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`TailerError::FileUnavailable`] if the journal is removed or
    /// can no longer be read.
    pub async fn try_read_line(&mut self) -> Result<Option<String>, TailerError> {
        loop {
            let read = self
                .reader
                .read_until(b'\n', &mut self.pending)
                .await
                .map_err(|source| unavailable(&self.path, source))?;

            if read == 0 {
                self.check_source().await?;
                return Ok(None);
            }
            self.position += read as u64;

            // Keep a partial line until its terminator arrives.
            if self.pending.last() != Some(&b'\n') {
                return Ok(None);
            }

            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&raw)
                .trim_end_matches(&['\n', '\r'][..])
                .to_string();

            if !line.is_empty() {
                return Ok(Some(line));
            }
        }
    }

    /// Confirms the journal still exists and rewinds if it was truncated.
    async fn check_source(&mut self) -> Result<(), TailerError> {
        let metadata = fs::metadata(&self.path)
            .await
            .map_err(|source| unavailable(&self.path, source))?;

        if metadata.len() < self.position {
            info!(
                path = %self.path.display(),
                old_pos = self.position,
                new_size = metadata.len(),
                "Journal truncated, resetting position to 0"
            );
            self.reader
                .seek(SeekFrom::Start(0))
                .await
                .map_err(|source| unavailable(&self.path, source))?;
            self.position = 0;
            self.pending.clear();
        }

        Ok(())
    }
}

/// Finds the most recent journal in `dir`.
///
/// Journal names embed their creation time, so the lexicographically greatest
/// `Journal*` file is the newest.
///
/// # Errors
///
/// Returns [`TailerError::FolderNotFound`] if `dir` is not a readable
/// directory and [`TailerError::NoJournal`] if it holds no journal files.
pub async fn latest_journal(dir: &Path) -> Result<PathBuf, TailerError> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|_| TailerError::FolderNotFound {
            path: dir.to_path_buf(),
        })?;

    let mut latest: Option<PathBuf> = None;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| unavailable(dir, source))?
    {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        let name = entry.file_name();
        if !is_file || !name.to_string_lossy().starts_with(JOURNAL_PREFIX) {
            continue;
        }

        let path = entry.path();
        if latest.as_ref().map_or(true, |current| path.file_name() > current.file_name()) {
            latest = Some(path);
        }
    }

    let journal = latest.ok_or_else(|| TailerError::NoJournal {
        path: dir.to_path_buf(),
    })?;
    debug!(journal = %journal.display(), "Selected latest journal");
    Ok(journal)
}

fn unavailable(path: &Path, source: std::io::Error) -> TailerError {
    TailerError::FileUnavailable {
        path: path.to_path_buf(),
        source,
    }
}
