use crate::config::MarkerConfig;
use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Last-track value meaning nothing has been announced yet.
pub const NO_TRACK: &str = "None";

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_DOWN: &str = "down";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Unknown,
    Online,
    Down,
}

impl StreamState {
    pub fn from_marker(marker: Option<&str>) -> Self {
        match marker.map(str::trim) {
            Some(STATUS_RUNNING) => StreamState::Online,
            Some(STATUS_DOWN) => StreamState::Down,
            Some(other) => {
                tracing::warn!("ignoring unrecognized status marker {:?}", other);
                StreamState::Unknown
            }
            None => StreamState::Unknown,
        }
    }

    pub fn marker(&self) -> Option<&'static str> {
        match self {
            StreamState::Online => Some(STATUS_RUNNING),
            StreamState::Down => Some(STATUS_DOWN),
            StreamState::Unknown => None,
        }
    }
}

/// Two single-value marker files. No locking: only one bot may use them.
#[derive(Debug, Clone)]
pub struct MarkerStore {
    last_track: PathBuf,
    status: PathBuf,
}

impl MarkerStore {
    pub fn new(markers: &MarkerConfig) -> Self {
        Self {
            last_track: markers.last_track.clone(),
            status: markers.status.clone(),
        }
    }

    pub fn read_last_track(&self) -> Result<String> {
        Ok(read_marker(&self.last_track)?.unwrap_or_else(|| NO_TRACK.to_string()))
    }

    pub fn write_last_track(&self, track: &str) -> Result<()> {
        write_marker(&self.last_track, track)
    }

    pub fn read_status(&self) -> Result<Option<String>> {
        read_marker(&self.status)
    }

    pub fn write_status(&self, status: &str) -> Result<()> {
        write_marker(&self.status, status)
    }

    pub fn clear_status(&self) -> Result<()> {
        match fs::remove_file(&self.status) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("remove {}", self.status.display()))
            }
        }
    }
}

fn read_marker(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("read {}", path.display())),
    }
}

fn write_marker(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
