//! Play a sequence back and print each frame as it is shown.

use std::path::PathBuf;

use stopmo_common::clock::{Cadence, PLAYBACK_TICK};
use stopmo_common::config::AppConfig;
use stopmo_project_model::DriverState;
use stopmo_sequencer::SessionNotice;

use super::{import_all, new_runner, surface_config};

pub async fn run(config: &AppConfig, images: Vec<PathBuf>, from: usize) -> anyhow::Result<()> {
    let (runner, handle, mut notices) = new_runner("preview", surface_config(config, None, None));
    let task = tokio::spawn(runner.run());

    let imported = import_all(&handle, &mut notices, images).await?;
    if from >= imported {
        handle.shutdown();
        task.await?;
        anyhow::bail!("--from {from} is out of range for {imported} frames");
    }

    let cadence = Cadence::from_period(PLAYBACK_TICK);
    println!("Previewing {imported} frames at {}ms per frame", cadence.period_ms());

    handle.select(from);
    handle.play();
    let mut shown = 0;
    println!("  {:>6}ms  frame {}", cadence.frame_time(shown).as_millis(), from + 1);

    loop {
        match notices.recv().await {
            Some(SessionNotice::PlaybackAdvanced { index }) => {
                shown += 1;
                println!("  {:>6}ms  frame {}", cadence.frame_time(shown).as_millis(), index + 1);
            }
            Some(SessionNotice::DriverChanged {
                to: DriverState::Idle,
                ..
            }) => break,
            Some(SessionNotice::Rejected { action }) => {
                anyhow::bail!("{action} was rejected")
            }
            Some(_) => {}
            None => break,
        }
    }

    println!("Playback finished after {} frames", shown + 1);
    handle.shutdown();
    task.await?;
    Ok(())
}
