//! Export a sequence to an animated clip.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use stopmo_common::config::AppConfig;
use stopmo_render_engine::encoder::{encoder_for, ClipFormat};
use stopmo_sequencer::{DirectorySink, DropSide, ReorderGesture, SessionNotice};

use super::{import_all, new_runner, surface_config};

/// A `--move FROM:TO[:after]` argument: drop frame FROM on frame TO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveSpec {
    pub from: usize,
    pub to: usize,
    pub side: DropSide,
}

impl MoveSpec {
    pub fn gesture(&self) -> ReorderGesture {
        ReorderGesture::new(self.from, self.to, self.side)
    }
}

impl FromStr for MoveSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let index = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| format!("'{part}' is not a frame index"))
        };
        let side = match parts.get(2).map(|p| p.trim().to_ascii_lowercase()) {
            None => DropSide::Before,
            Some(p) if p == "before" => DropSide::Before,
            Some(p) if p == "after" => DropSide::After,
            Some(p) => return Err(format!("unknown side '{p}', use 'before' or 'after'")),
        };
        match parts.as_slice() {
            [from, to] | [from, to, _] => Ok(Self {
                from: index(from)?,
                to: index(to)?,
                side,
            }),
            _ => Err(format!("expected FROM:TO[:after], got '{s}'")),
        }
    }
}

/// Pick the clip format: explicit flag, then output extension, then config.
fn resolve_format(
    explicit: Option<&str>,
    output: Option<&Path>,
    default: &str,
) -> anyhow::Result<ClipFormat> {
    if let Some(name) = explicit {
        return Ok(name.parse()?);
    }
    if let Some(format) = output
        .and_then(|p| p.extension())
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse::<ClipFormat>().ok())
    {
        return Ok(format);
    }
    Ok(default.parse()?)
}

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config: &AppConfig,
    images: Vec<PathBuf>,
    output: Option<PathBuf>,
    format: Option<String>,
    moves: Vec<MoveSpec>,
    width: Option<u32>,
    height: Option<u32>,
    summary: Option<PathBuf>,
) -> anyhow::Result<()> {
    let format = resolve_format(format.as_deref(), output.as_deref(), &config.export.format)?;
    let output = output.unwrap_or_else(|| {
        config
            .exports_dir
            .join(format!("{}.{}", config.export.file_stem, format.extension()))
    });
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&config.export.file_stem)
        .to_string();

    let encoder = encoder_for(format);
    if !encoder.is_available() {
        anyhow::bail!(
            "The {} encoder is not available for {format}. Run `stopmo check`.",
            encoder.name()
        );
    }

    let surface = surface_config(config, width, height);
    println!("Exporting {} images", images.len());
    println!("  Format: {format} ({})", encoder.name());
    println!("  Surface: {}x{}", surface.width, surface.height);

    let mut sink = DirectorySink::new(&dir, &stem);
    if let Some(ref path) = summary {
        sink = sink.with_summary_path(path);
    }
    let (runner, handle, mut notices) = new_runner(&stem, surface);
    let task = tokio::spawn(runner.with_sink(sink).run());

    let imported = import_all(&handle, &mut notices, images).await?;
    for spec in &moves {
        tracing::debug!(?spec, "Applying move");
        handle.reorder(spec.gesture());
    }
    handle.export(encoder);

    let result = loop {
        match notices.recv().await {
            Some(SessionNotice::ExportStarted { frames }) => println!("  Frames: {frames}"),
            Some(SessionNotice::ExportFrameCaptured { index }) => {
                print!("\r  Progress: {}/{} frames  ", index + 1, imported);
            }
            Some(SessionNotice::ExportFinished(clip)) => {
                println!("\n  Encoded {} bytes", clip.bytes.len());
            }
            Some(SessionNotice::ArtifactSaved { path }) => break Ok(path),
            Some(SessionNotice::Rejected { action: "reorder" }) => {
                eprintln!("  [WARN] A --move had no effect");
            }
            Some(SessionNotice::Rejected { action }) => {
                break Err(anyhow::anyhow!("{action} was rejected"))
            }
            Some(SessionNotice::ExportFailed { error })
            | Some(SessionNotice::EncoderUnavailable { error })
            | Some(SessionNotice::CommandFailed { error }) => break Err(anyhow::anyhow!(error)),
            Some(_) => {}
            None => break Err(anyhow::anyhow!("session stopped before the export finished")),
        }
    };

    handle.shutdown();
    task.await?;

    match result {
        Ok(path) => {
            println!("Export complete: {}", path.display());
            let summary_path = summary.unwrap_or_else(|| dir.join(DirectorySink::SUMMARY_FILE));
            println!("  Summary: {}", summary_path.display());
            Ok(())
        }
        Err(e) => {
            println!("\nExport failed: {e}");
            Err(e)
        }
    }
}
