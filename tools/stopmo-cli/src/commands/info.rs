//! Show decoded frame information.

use std::path::PathBuf;
use std::sync::Arc;

use stopmo_common::config::AppConfig;
use stopmo_sequencer::loader::load_batch;
use stopmo_sequencer::{CarouselWindow, DecodingLoader, ImageSource};

use super::{import_all, new_runner, surface_config};

pub async fn run(config: &AppConfig, images: Vec<PathBuf>, at: usize, json: bool) -> anyhow::Result<()> {
    if json {
        return print_snapshot(config, images, at).await;
    }

    let sources: Vec<ImageSource> = images.into_iter().map(ImageSource::Path).collect();
    let results = load_batch(Arc::new(DecodingLoader), sources).await;

    println!("Frames:");
    let mut decoded = 0;
    for (number, (source, result)) in results.iter().enumerate() {
        match result {
            Ok(frame) => {
                decoded += 1;
                println!(
                    "  {:>3}. {} ({}x{})",
                    number + 1,
                    source.label(),
                    frame.width(),
                    frame.height()
                );
            }
            Err(e) => println!("  {:>3}. {} [ERROR] {e}", number + 1, source.label()),
        }
    }
    println!();
    println!("Decoded: {decoded}/{}", results.len());

    if decoded > 0 {
        let window = CarouselWindow::around(decoded, Some(at.min(decoded - 1)));
        println!("Carousel: {window}");
    }
    Ok(())
}

async fn print_snapshot(config: &AppConfig, images: Vec<PathBuf>, at: usize) -> anyhow::Result<()> {
    let (runner, handle, mut notices) = new_runner("info", surface_config(config, None, None));
    let task = tokio::spawn(runner.run());

    let imported = import_all(&handle, &mut notices, images).await?;
    handle.select(at.min(imported - 1));
    let snapshot = handle
        .snapshot()
        .await
        .ok_or_else(|| anyhow::anyhow!("session stopped unexpectedly"))?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    handle.shutdown();
    task.await?;
    Ok(())
}
