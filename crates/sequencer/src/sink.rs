//! Persisting exported clips together with a project summary.

use std::path::PathBuf;

use stopmo_common::error::{StopmoError, StopmoResult};
use stopmo_project_model::{ExportSummary, ProjectSummary};
use stopmo_render_engine::encoder::EncodedClip;

/// Receives a finished clip and the summary of the sequence it came from.
pub trait ArtifactSink: Send {
    /// Persist the clip, returning where it was written.
    fn save(&mut self, clip: &EncodedClip, summary: &ProjectSummary) -> StopmoResult<PathBuf>;
}

/// Writes `<stem>.<ext>` and `project.json` into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    stem: String,
    summary_path: Option<PathBuf>,
}

impl DirectorySink {
    pub const SUMMARY_FILE: &'static str = "project.json";

    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
            summary_path: None,
        }
    }

    /// Write the summary here instead of `<dir>/project.json`.
    pub fn with_summary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary_path = Some(path.into());
        self
    }

    fn summary_path(&self) -> PathBuf {
        self.summary_path
            .clone()
            .unwrap_or_else(|| self.dir.join(Self::SUMMARY_FILE))
    }
}

impl ArtifactSink for DirectorySink {
    fn save(&mut self, clip: &EncodedClip, summary: &ProjectSummary) -> StopmoResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let clip_path = self
            .dir
            .join(format!("{}.{}", self.stem, clip.format.extension()));
        std::fs::write(&clip_path, &clip.bytes)?;

        let summary = summary.clone().with_export(ExportSummary {
            format: clip.format.to_string(),
            fps: clip.fps,
            width: clip.width,
            height: clip.height,
            bytes: clip.bytes.len(),
        });
        summary
            .save(self.summary_path())
            .map_err(|e| StopmoError::Other(e.into()))?;

        tracing::info!(
            path = %clip_path.display(),
            bytes = clip.bytes.len(),
            frames = clip.frames,
            "Export saved"
        );
        Ok(clip_path)
    }
}
