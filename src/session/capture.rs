//! Numbered on-disk capture of response bodies for diagnosing scrape failures.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::SessionError;

const CAPTURE_PREFIX: &str = "response.";
const CAPTURE_SUFFIX: &str = ".html";

/// Writes each captured body to `response.<n>.html`, counting from 1.
#[derive(Debug)]
pub struct ResponseCapture {
    dir: PathBuf,
    next: usize,
}

impl ResponseCapture {
    /// Prepares `dir` for a new capture run, deleting captures from earlier runs.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when the directory cannot be created or listed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SessionError::io(&dir, e))?;

        let entries = fs::read_dir(&dir).map_err(|e| SessionError::io(&dir, e))?;
        let mut removed = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            if is_capture_file(&path) {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                    Err(error) => return Err(SessionError::io(&path, error)),
                }
            }
        }
        debug!(dir = %dir.display(), removed, "prepared response capture directory");

        Ok(Self { dir, next: 1 })
    }

    /// Writes `body` to the next numbered file and returns its path.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when the file cannot be written.
    pub fn record(&mut self, url: &str, status: u16, body: &str) -> Result<PathBuf, SessionError> {
        let path = self
            .dir
            .join(format!("{CAPTURE_PREFIX}{}{CAPTURE_SUFFIX}", self.next));
        fs::write(&path, body).map_err(|e| SessionError::io(&path, e))?;
        self.next += 1;

        info!(url, status, path = %path.display(), "captured response body");
        Ok(path)
    }

    /// Directory holding the captures.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn is_capture_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix(CAPTURE_PREFIX))
        .and_then(|rest| rest.strip_suffix(CAPTURE_SUFFIX))
        .is_some_and(|number| !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()))
}
