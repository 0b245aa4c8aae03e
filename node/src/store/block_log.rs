// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable half of the Block Store.
//!
//! - Records are written one JSON line each, unbuffered
//! - Every append is fsync'd before returning
//! - A failed append is cut back to the length the file had before it

use super::{Result, StoreError};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tickledger_kernel::block::BlockRecord;

/// The file operations an append needs, so a failing disk can be stood in for.
pub(crate) trait LogFile: Write {
    fn len(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&self) -> io::Result<()>;
}

impl LogFile for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Writes `line` and syncs it. On any error the file is cut back to its
/// previous length, so a later append never lands after a partial line.
pub(crate) fn append_line<F: LogFile>(file: &mut F, line: &[u8]) -> io::Result<()> {
    let before = file.len()?;
    let written = file.write_all(line).and_then(|_| file.flush()).and_then(|_| file.sync());
    if let Err(e) = written {
        if let Err(cut) = file.truncate(before) {
            tracing::error!("Block log rollback to {} bytes failed: {}", before, cut);
        }
        return Err(e);
    }
    Ok(())
}

pub struct BlockLog {
    path: PathBuf,
    file: File,
}

impl BlockLog {
    /// Opens the log for appending, creating an empty file if none exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Reads every record in file order. Blank lines are skipped; any other
    /// unparsable line fails the whole read with its 1-based line number.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<BlockRecord>> {
        let file = match File::open(path.as_ref()) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line)
                .map_err(|source| StoreError::Parse { line: i + 1, source })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Appends one record. Only returns Ok after the line is on disk; on
    /// error the file holds exactly what it held before the call.
    pub fn append(&mut self, record: &BlockRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        append_line(&mut self.file, &line)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
