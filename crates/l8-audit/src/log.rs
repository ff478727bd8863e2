// log.rs — Append-only JSONL audit log.
//
// One JSON object per line. Each event's `previous_hash` is the SHA-256 of
// the raw JSON text of the line before it, so inserting, deleting or
// editing any line except the last breaks the chain.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::AuditError;
use crate::event::AuditEvent;
use crate::hasher;

/// An append-only audit log backed by a JSONL file.
pub struct AuditLog {
    writer: BufWriter<File>,
    path: PathBuf,
    /// Hash of the last line written, used as the next event's `previous_hash`.
    last_hash: Option<String>,
}

impl AuditLog {
    /// Open (or create) an audit log, creating parent directories as needed.
    ///
    /// If the file already has events, the chain continues from its last line.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let open_failed = |source| AuditError::OpenFailed {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(open_failed)?;
        }

        let last_hash = if path.exists() {
            Self::read_lines(&path)?
                .last()
                .map(|line| hasher::hash_str(line))
        } else {
            None
        };

        // Append mode: existing lines are never rewritten.
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_failed)?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            last_hash,
        })
    }

    /// Append an event, linking it to the previous one. Flushes after writing.
    pub fn append(&mut self, event: &mut AuditEvent) -> Result<(), AuditError> {
        event.previous_hash = self.last_hash.clone();
        let json = serde_json::to_string(event)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        self.last_hash = Some(hasher::hash_str(&json));
        tracing::debug!(event_id = %event.event_id, action = ?event.action, "audit event appended");
        Ok(())
    }

    /// Read all events, oldest first. Blank lines are skipped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AuditEvent>, AuditError> {
        Self::read_lines(path.as_ref())?
            .iter()
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }

    /// The last `n` events, oldest first.
    pub fn tail(path: impl AsRef<Path>, n: usize) -> Result<Vec<AuditEvent>, AuditError> {
        let mut events = Self::read_all(path)?;
        let start = events.len().saturating_sub(n);
        Ok(events.split_off(start))
    }

    /// Verify the hash chain and return the number of events checked.
    ///
    /// Fails with `IntegrityViolation` at the first line whose
    /// `previous_hash` does not match the hash of the line before it.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<usize, AuditError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let mut previous_hash: Option<String> = None;
        let mut count = 0;

        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: AuditEvent = serde_json::from_str(&line)?;
            if event.previous_hash != previous_hash {
                return Err(AuditError::IntegrityViolation {
                    line: line_num + 1,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: event.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }
            // Hash the raw line, not a re-serialization, so field order
            // and formatting are part of what is protected.
            previous_hash = Some(hasher::hash_str(&line));
            count += 1;
        }

        Ok(count)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_lines(path: &Path) -> Result<Vec<String>, AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }
}
