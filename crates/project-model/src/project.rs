//! Project summary written alongside exported clips.
//!
//! The summary is deliberately small: it records how many frames the
//! sequence had, in which order they were assembled, and how the clip was
//! encoded. It is not a full project file that can be reopened for editing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::store::FrameStore;

/// Top-level summary document (`project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Number of frames in the sequence.
    pub count: usize,

    /// Source labels in animation order.
    #[serde(default)]
    pub frames: Vec<String>,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// How the clip was encoded, if an export happened.
    #[serde(default)]
    pub export: Option<ExportSummary>,
}

/// Encoding details of an exported clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Container/codec name reported by the encoder.
    pub format: String,

    /// Frames per second of the clip.
    pub fps: u32,

    /// Clip resolution in pixels.
    pub width: u32,
    pub height: u32,

    /// Encoded size in bytes.
    pub bytes: usize,
}

impl ProjectSummary {
    /// Summarize the current contents of a frame store.
    pub fn from_store(name: impl Into<String>, store: &FrameStore) -> Self {
        Self {
            version: "1.0".to_string(),
            name: name.into(),
            count: store.len(),
            frames: store
                .frames()
                .iter()
                .map(|f| f.source().label().to_string())
                .collect(),
            created_at: chrono::Utc::now().to_rfc3339(),
            export: None,
        }
    }

    /// Attach export details.
    pub fn with_export(mut self, export: ExportSummary) -> Self {
        self.export = Some(export);
        self
    }

    /// Write the summary as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ProjectError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Read a summary back from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let summary: Self =
            serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        if summary.frames.len() > summary.count {
            return Err(ProjectError::ValidationError {
                message: format!(
                    "summary lists {} frames but count is {}",
                    summary.frames.len(),
                    summary.count
                ),
            });
        }
        Ok(summary)
    }
}

/// Errors that can occur when reading or writing project summaries.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}
