//! Log Tail - follows an append-only JSONL file from its end
//!
//! The tail never replays bytes that existed when the processor started; a
//! log that only appears later is read from its first byte. A line is only
//! parsed once its terminating newline has been written; a partial trailing
//! line stays in `carry` until the writer finishes it.

use std::fs::{self, File, Metadata};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use super::{ReadOutcome, RecordSource, SourceError};
use crate::constants::SOURCE_RETRY_INITIAL_MS;
use crate::logic::record::Record;

pub struct LogTail {
    path: PathBuf,
    reader: BufReader<File>,
    /// Byte offset of the first unconsumed line (start of `carry`)
    offset: u64,
    /// Bytes of an unterminated trailing line
    carry: Vec<u8>,
}

impl LogTail {
    /// Open `path` positioned at its current end
    pub fn open_at_end(path: &Path) -> io::Result<Self> {
        Self::open_from(path, SeekFrom::End(0))
    }

    /// Open `path` positioned at its first byte
    pub fn open_at_start(path: &Path) -> io::Result<Self> {
        Self::open_from(path, SeekFrom::Start(0))
    }

    fn open_from(path: &Path, from: SeekFrom) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let offset = file.seek(from)?;

        log::info!("Tailing {} from byte {}", path.display(), offset);

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            offset,
            carry: Vec::new(),
        })
    }

    /// Block until `path` can be opened, backing off up to `max_backoff`.
    ///
    /// A log that already exists is tailed from its end. A log that shows up
    /// while waiting was created after startup, so it is read from byte 0.
    /// Returns `Ok(None)` if `should_stop` turns true while waiting.
    pub fn wait_for<F>(path: &Path, max_backoff: Duration, should_stop: F) -> io::Result<Option<Self>>
    where
        F: Fn() -> bool,
    {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut backoff = Duration::from_millis(SOURCE_RETRY_INITIAL_MS).min(max_backoff);
        let mut missing = false;

        loop {
            if should_stop() {
                return Ok(None);
            }

            let opened = if missing {
                Self::open_at_start(path)
            } else {
                Self::open_at_end(path)
            };

            match opened {
                Ok(tail) => return Ok(Some(tail)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    if !missing {
                        log::info!("Waiting for {} to appear...", path.display());
                        missing = true;
                    }
                }
                Err(e) => {
                    log::warn!("Cannot open {} yet: {}", path.display(), e);
                }
            }

            thread::sleep(backoff);
            backoff = (backoff * 2).min(max_backoff);
        }
    }

    /// Byte offset of the next line to be parsed
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Restart from the beginning if the log was truncated in place or
    /// replaced by a new file at the same path (rename-and-recreate rotation)
    fn detect_rotation(&mut self) -> io::Result<bool> {
        let open = self.reader.get_ref().metadata()?;
        let position = self.offset + self.carry.len() as u64;

        if open.len() < position {
            log::warn!(
                "{} shrank from {} to {} bytes, restarting from the beginning",
                self.path.display(),
                position,
                open.len()
            );
            self.reader.seek(SeekFrom::Start(0))?;
            self.restart();
            return Ok(true);
        }

        // Rotated away and not recreated yet: keep draining the old handle
        let current = match fs::metadata(&self.path) {
            Ok(current) => current,
            Err(_) => return Ok(false),
        };
        if same_file(&open, &current) {
            return Ok(false);
        }

        log::warn!(
            "{} was replaced, following the new file from the beginning",
            self.path.display()
        );
        if !self.carry.is_empty() {
            log::warn!("Dropping {} bytes of an unterminated line from the old file", self.carry.len());
        }
        self.reader = BufReader::new(File::open(&self.path)?);
        self.restart();
        Ok(true)
    }

    fn restart(&mut self) {
        self.offset = 0;
        self.carry.clear();
    }
}

#[cfg(unix)]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

// No portable file identity: only in-place truncation is detected
#[cfg(not(unix))]
fn same_file(_: &Metadata, _: &Metadata) -> bool {
    true
}

impl RecordSource for LogTail {
    fn next_record(&mut self) -> Result<ReadOutcome, SourceError> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.carry)?;

            if read == 0 {
                if self.detect_rotation()? {
                    continue;
                }
                return Ok(ReadOutcome::EndOfStream);
            }

            if self.carry.last() != Some(&b'\n') {
                // Writer is mid-line
                return Ok(ReadOutcome::EndOfStream);
            }

            let line_offset = self.offset;
            let line = std::mem::take(&mut self.carry);
            self.offset += line.len() as u64;

            let text = String::from_utf8(line).map_err(|e| SourceError::Malformed {
                offset: line_offset,
                reason: e.to_string(),
            })?;

            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Record::from_json_line(trimmed)
                .map(ReadOutcome::Record)
                .map_err(|e| SourceError::Malformed {
                    offset: line_offset,
                    reason: e.to_string(),
                });
        }
    }
}
