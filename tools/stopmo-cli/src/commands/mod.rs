pub mod check;
pub mod export;
pub mod info;
pub mod preview;

use std::path::PathBuf;
use std::sync::Arc;

use stopmo_common::config::{AppConfig, SurfaceConfig};
use stopmo_sequencer::{
    DecodingLoader, ImageSource, Session, SessionHandle, SessionNotice, SessionRunner,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// Surface size from the config, with command-line overrides.
pub fn surface_config(config: &AppConfig, width: Option<u32>, height: Option<u32>) -> SurfaceConfig {
    SurfaceConfig {
        width: width.unwrap_or(config.surface.width),
        height: height.unwrap_or(config.surface.height),
    }
}

/// Build an empty session runner that decodes with the `image` crate.
pub fn new_runner(
    name: &str,
    surface: SurfaceConfig,
) -> (SessionRunner, SessionHandle, UnboundedReceiver<SessionNotice>) {
    SessionRunner::new(Session::new(name, surface), Arc::new(DecodingLoader))
}

/// Import `images` and wait until every one was decoded or skipped.
/// Fails if none of them could be decoded.
pub async fn import_all(
    handle: &SessionHandle,
    notices: &mut UnboundedReceiver<SessionNotice>,
    images: Vec<PathBuf>,
) -> anyhow::Result<usize> {
    let sources = images.into_iter().map(ImageSource::Path).collect();
    if !handle.import(sources) {
        anyhow::bail!("session stopped before import");
    }

    loop {
        match notices.recv().await {
            Some(SessionNotice::DecodeFailed { label, error }) => {
                eprintln!("  [SKIP] {label}: {error}");
            }
            Some(SessionNotice::ImportFinished { imported, failed, .. }) => {
                if imported == 0 {
                    anyhow::bail!("No frames could be decoded ({failed} failed)");
                }
                return Ok(imported);
            }
            Some(_) => {}
            None => anyhow::bail!("session stopped during import"),
        }
    }
}
