//! File exchange contract for backup export/import.
//!
//! # Responsibility
//! - Move whole backup documents (as bytes) to and from named files.
//! - Recognize backup files by the export naming convention.
//!
//! # Invariants
//! - File names are bare names; path separators and `..` are rejected.
//! - A failed export leaves no partially written file behind.

use chrono::NaiveDate;
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Prefix of every exported backup file name.
pub const BACKUP_FILE_PREFIX: &str = "lesson_planner_backup_";

static BACKUP_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^lesson_planner_backup_(\d{4}-\d{2}-\d{2})\.json$").expect("valid backup regex")
});

pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Errors from file exchange backends.
#[derive(Debug)]
pub enum ExchangeError {
    /// File-system failure.
    Io(io::Error),
    /// Requested file does not exist.
    NotFound(String),
    /// File name is empty or contains path components.
    InvalidFileName(String),
}

impl Display for ExchangeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::NotFound(name) => write!(f, "file not found: {name}"),
            Self::InvalidFileName(name) => write!(f, "invalid file name: `{name}`"),
        }
    }
}

impl Error for ExchangeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ExchangeError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Destination/source of exported backup documents.
pub trait FileExchange {
    /// Writes `bytes` to a file called `file_name`, replacing any previous one.
    fn export_bytes(&mut self, file_name: &str, bytes: &[u8]) -> ExchangeResult<()>;
    /// Reads the whole content of `file_name`.
    fn import_bytes(&self, file_name: &str) -> ExchangeResult<Vec<u8>>;
}

/// Backup file recognized by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub file_name: String,
    /// Export date encoded in the file name.
    pub date: NaiveDate,
}

/// Parses a backup file name, returning its export date.
pub fn parse_backup_file_name(file_name: &str) -> Option<NaiveDate> {
    let captures = BACKUP_FILE_RE.captures(file_name)?;
    crate::dates::parse_date_key(captures.get(1)?.as_str())
}

fn validate_file_name(file_name: &str) -> ExchangeResult<()> {
    let invalid = file_name.trim().is_empty()
        || file_name.contains(['/', '\\'])
        || file_name == "."
        || file_name == "..";
    if invalid {
        return Err(ExchangeError::InvalidFileName(file_name.to_string()));
    }
    Ok(())
}

/// File exchange rooted at one directory on disk.
pub struct DirectoryFileExchange {
    dir: PathBuf,
}

impl DirectoryFileExchange {
    /// Creates an exchange rooted at `dir`. The directory is created on first
    /// export if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Lists backup files in the directory, newest export date first.
    pub fn list_backups(&self) -> ExchangeResult<Vec<BackupFile>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if let Some(date) = parse_backup_file_name(&file_name) {
                backups.push(BackupFile { file_name, date });
            }
        }
        backups.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.file_name.cmp(&b.file_name)));
        Ok(backups)
    }
}

impl FileExchange for DirectoryFileExchange {
    fn export_bytes(&mut self, file_name: &str, bytes: &[u8]) -> ExchangeResult<()> {
        validate_file_name(file_name)?;
        fs::create_dir_all(&self.dir)?;

        let target = self.dir.join(file_name);
        let staging = self.dir.join(format!(".{file_name}.partial"));
        let written = fs::write(&staging, bytes).and_then(|()| fs::rename(&staging, &target));
        if let Err(err) = written {
            let _ = fs::remove_file(&staging);
            error!(
                "event=file_export module=exchange status=error bytes={} error={}",
                bytes.len(),
                err
            );
            return Err(err.into());
        }

        info!(
            "event=file_export module=exchange status=ok bytes={}",
            bytes.len()
        );
        Ok(())
    }

    fn import_bytes(&self, file_name: &str) -> ExchangeResult<Vec<u8>> {
        validate_file_name(file_name)?;
        match fs::read(self.dir.join(file_name)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(ExchangeError::NotFound(file_name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory file exchange for tests and embedding hosts that hand bytes
/// over directly.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileExchange {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryFileExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a file as if the user had picked it for import.
    pub fn insert(&mut self, file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(file_name.into(), bytes.into());
    }

    pub fn get(&self, file_name: &str) -> Option<&[u8]> {
        self.files.get(file_name).map(Vec::as_slice)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl FileExchange for MemoryFileExchange {
    fn export_bytes(&mut self, file_name: &str, bytes: &[u8]) -> ExchangeResult<()> {
        validate_file_name(file_name)?;
        self.files.insert(file_name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn import_bytes(&self, file_name: &str) -> ExchangeResult<Vec<u8>> {
        validate_file_name(file_name)?;
        self.files
            .get(file_name)
            .cloned()
            .ok_or_else(|| ExchangeError::NotFound(file_name.to_string()))
    }
}
