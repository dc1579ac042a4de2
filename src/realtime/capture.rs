//! Camera frame sources
//!
//! A frame source yields JPEG snapshots encoded as data URLs, the format the
//! scoring service expects in `frame` messages.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

pub const CAMERA_DENIED: &str = "Camera access denied. Please allow camera access.";

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Frame source unavailable at {path:?}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Something that can produce camera frames
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<(), CaptureError>;

    /// Capture one frame, or `None` when nothing is available right now
    fn capture(&mut self) -> Option<String>;

    fn release(&mut self);

    fn is_open(&self) -> bool;
}

/// Encode JPEG bytes as a `data:image/jpeg;base64,...` URL
pub fn encode_data_url(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg))
}

/// JPEG start-of-image marker
fn looks_like_jpeg(bytes: &[u8]) -> bool {
    bytes.len() > 2 && bytes[0] == 0xFF && bytes[1] == 0xD8
}

/// Reads the latest snapshot from a file kept current by an external grabber
#[derive(Debug)]
pub struct FileFrameSource {
    path: PathBuf,
    open: bool,
}

impl FileFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            open: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for FileFrameSource {
    fn open(&mut self) -> Result<(), CaptureError> {
        std::fs::metadata(&self.path).map_err(|source| CaptureError::Unavailable {
            path: self.path.clone(),
            source,
        })?;
        self.open = true;
        tracing::info!("Frame source opened: {:?}", self.path);
        Ok(())
    }

    fn capture(&mut self) -> Option<String> {
        if !self.open {
            return None;
        }

        match std::fs::read(&self.path) {
            // A partially written snapshot is skipped, the next tick retries
            Ok(bytes) if looks_like_jpeg(&bytes) => Some(encode_data_url(&bytes)),
            Ok(_) => None,
            Err(e) => {
                tracing::trace!("Frame read failed: {}", e);
                None
            }
        }
    }

    fn release(&mut self) {
        if self.open {
            tracing::info!("Frame source released");
        }
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
