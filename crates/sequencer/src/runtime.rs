//! Event-dispatch runtime for a [`Session`].
//!
//! The runner owns the session and serializes every mutation through one
//! loop: user commands, decode completions, encoder finalization and the
//! active driver's tick all arrive there, one at a time. Slow work (image
//! decoding, clip finalization) runs on the blocking pool and reports back
//! as events.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use stopmo_common::clock::{EXPORT_TICK, PLAYBACK_TICK};
use stopmo_common::error::{StopmoError, StopmoResult};
use stopmo_project_model::{DisplayMode, DriverState, Frame, ProjectSummary};
use stopmo_render_engine::encoder::{EncodedClip, StreamEncoder};
use tokio::runtime::RuntimeFlavor;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::export::{ExportTick, PendingExport};
use crate::loader::{load_batch, ImageLoader, ImageSource};
use crate::playback::PlaybackTick;
use crate::reorder::ReorderGesture;
use crate::session::Session;
use crate::sink::ArtifactSink;

/// User actions accepted by the runner.
pub enum SessionCommand {
    Import(Vec<ImageSource>),
    Select(usize),
    BeginDrag(usize),
    CancelDrag,
    DropOn {
        target: usize,
        pointer_x: f64,
        target_left: f64,
        target_width: f64,
    },
    Reorder(ReorderGesture),
    Remove(usize),
    Play,
    StopPlayback,
    Export(Box<dyn StreamEncoder>),
    CancelExport,
    Resize { width: u32, height: u32 },
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub name: String,
    pub frames: Vec<String>,
    pub cursor: Option<usize>,
    pub mode: DisplayMode,
    pub driver: DriverState,
    pub surface: (u32, u32),
    pub redraws: u64,
}

impl SessionSnapshot {
    fn of(session: &Session) -> Self {
        Self {
            name: session.name().to_string(),
            frames: session
                .store()
                .frames()
                .iter()
                .map(|f| f.source().label().to_string())
                .collect(),
            cursor: session.cursor(),
            mode: session.mode(),
            driver: session.driver_state(),
            surface: session.surface().size(),
            redraws: session.redraw_count(),
        }
    }
}

/// Things the runner reports back to its owner.
#[derive(Debug, Clone)]
pub enum SessionNotice {
    FrameImported { index: usize, label: String },
    DecodeFailed { label: String, error: String },
    ImportFinished { batch: u64, imported: usize, failed: usize },
    DriverChanged { from: DriverState, to: DriverState },
    PlaybackAdvanced { index: usize },
    ExportStarted { frames: usize },
    ExportFrameCaptured { index: usize },
    ExportCaptureStopped { frames: usize },
    ExportFinished(EncodedClip),
    ArtifactSaved { path: PathBuf },
    ExportFailed { error: String },
    EncoderUnavailable { error: String },
    Rejected { action: &'static str },
    CommandFailed { error: String },
}

enum SessionEvent {
    Command(SessionCommand),
    Decoded {
        batch: u64,
        label: String,
        result: StopmoResult<Frame>,
    },
    ImportDone {
        batch: u64,
        imported: usize,
        failed: usize,
    },
    Finalized {
        clip: StopmoResult<EncodedClip>,
        saved: Option<StopmoResult<PathBuf>>,
    },
}

enum Step {
    Event(Option<SessionEvent>),
    Tick,
}

type SharedSink = Arc<Mutex<Box<dyn ArtifactSink>>>;

/// Owns a session and drives it from commands and timers.
pub struct SessionRunner {
    session: Session,
    loader: Arc<dyn ImageLoader>,
    sink: Option<SharedSink>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    events_tx: mpsc::WeakUnboundedSender<SessionEvent>,
    notices: mpsc::UnboundedSender<SessionNotice>,
    ticker: Option<Interval>,
    ticking: DriverState,
    next_batch: u64,
}

impl SessionRunner {
    pub fn new(
        session: Session,
        loader: Arc<dyn ImageLoader>,
    ) -> (Self, SessionHandle, mpsc::UnboundedReceiver<SessionNotice>) {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (notices, notices_rx) = mpsc::unbounded_channel();
        let ticking = session.driver_state();
        let runner = Self {
            session,
            loader,
            sink: None,
            events,
            events_tx: events_tx.downgrade(),
            notices,
            ticker: None,
            ticking,
            next_batch: 0,
        };
        (runner, SessionHandle { tx: events_tx }, notices_rx)
    }

    /// Persist finished clips through `sink`.
    pub fn with_sink(mut self, sink: impl ArtifactSink + 'static) -> Self {
        self.sink = Some(Arc::new(Mutex::new(Box::new(sink))));
        self
    }

    /// Run until shutdown or until every handle is dropped and in-flight
    /// work has reported back. Returns the session.
    pub async fn run(mut self) -> Session {
        tracing::info!(session = %self.session.name(), "Session runner started");
        loop {
            let step = tokio::select! {
                event = self.events.recv() => Step::Event(event),
                _ = next_tick(&mut self.ticker) => Step::Tick,
            };

            let keep_running = match step {
                Step::Event(Some(event)) => self.handle_event(event),
                Step::Event(None) => false,
                Step::Tick => {
                    self.handle_tick();
                    true
                }
            };
            self.sync_ticker();
            if !keep_running {
                break;
            }
        }
        tracing::info!(session = %self.session.name(), frames = self.session.store().len(), "Session runner stopped");
        self.session
    }

    fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Command(SessionCommand::Shutdown) => {
                self.session.cancel_export();
                self.session.stop_playback();
                return false;
            }
            SessionEvent::Command(command) => self.handle_command(command),
            SessionEvent::Decoded {
                batch,
                label,
                result,
            } => match result {
                Ok(frame) => {
                    let index = self.session.import(frame);
                    self.notify(SessionNotice::FrameImported { index, label });
                }
                Err(e) => {
                    tracing::warn!(batch, source = %label, error = %e, "Frame skipped");
                    self.notify(SessionNotice::DecodeFailed {
                        label,
                        error: e.to_string(),
                    });
                }
            },
            SessionEvent::ImportDone {
                batch,
                imported,
                failed,
            } => {
                tracing::info!(batch, imported, failed, "Import batch finished");
                self.notify(SessionNotice::ImportFinished {
                    batch,
                    imported,
                    failed,
                });
            }
            SessionEvent::Finalized { clip, saved } => match clip {
                Ok(clip) => {
                    self.notify(SessionNotice::ExportFinished(clip));
                    match saved {
                        Some(Ok(path)) => self.notify(SessionNotice::ArtifactSaved { path }),
                        Some(Err(e)) => {
                            tracing::error!(error = %e, "Failed to save export");
                            self.notify(SessionNotice::ExportFailed {
                                error: e.to_string(),
                            });
                        }
                        None => {}
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Export finalization failed");
                    self.notify(SessionNotice::ExportFailed {
                        error: e.to_string(),
                    });
                }
            },
        }
        true
    }

    fn handle_command(&mut self, command: SessionCommand) {
        let outcome: StopmoResult<Option<&'static str>> = match command {
            SessionCommand::Import(sources) => {
                self.spawn_import(sources);
                Ok(None)
            }
            SessionCommand::Select(index) => self
                .session
                .select(index)
                .map(|done| rejected_unless(done, "select")),
            SessionCommand::BeginDrag(index) => self
                .session
                .begin_drag(index)
                .map(|done| rejected_unless(done, "drag")),
            SessionCommand::CancelDrag => {
                self.session.cancel_drag();
                Ok(None)
            }
            SessionCommand::DropOn {
                target,
                pointer_x,
                target_left,
                target_width,
            } => self
                .session
                .drop_on(target, pointer_x, target_left, target_width)
                .map(|done| rejected_unless(done, "reorder")),
            SessionCommand::Reorder(gesture) => self
                .session
                .reorder(gesture)
                .map(|done| rejected_unless(done, "reorder")),
            SessionCommand::Remove(index) => self.session.remove(index).map(|removed| {
                match removed {
                    Some(frame) => {
                        let source = frame.release();
                        tracing::debug!(id = source.id(), source = %source, "Source released");
                        None
                    }
                    None => Some("remove"),
                }
            }),
            SessionCommand::Play => Ok(rejected_unless(self.session.start_playback(), "play")),
            SessionCommand::StopPlayback => {
                self.session.stop_playback();
                Ok(None)
            }
            SessionCommand::Export(encoder) => match self.session.start_export(encoder) {
                Ok(true) => {
                    let frames = self.session.store().len();
                    self.notify(SessionNotice::ExportStarted { frames });
                    Ok(None)
                }
                Ok(false) => Ok(Some("export")),
                Err(e @ StopmoError::EncoderUnavailable { .. }) => {
                    self.notify(SessionNotice::EncoderUnavailable {
                        error: e.to_string(),
                    });
                    Ok(None)
                }
                Err(e) => Err(e),
            },
            SessionCommand::CancelExport => {
                self.session.cancel_export();
                Ok(None)
            }
            SessionCommand::Resize { width, height } => {
                self.session.resize(width, height);
                Ok(None)
            }
            SessionCommand::Snapshot(reply) => {
                if reply.send(SessionSnapshot::of(&self.session)).is_err() {
                    tracing::debug!("Snapshot requester went away");
                }
                Ok(None)
            }
            SessionCommand::Shutdown => Ok(None),
        };

        match outcome {
            Ok(None) => {}
            Ok(Some(action)) => self.notify(SessionNotice::Rejected { action }),
            Err(e) => {
                tracing::warn!(error = %e, "Command failed");
                self.notify(SessionNotice::CommandFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    fn handle_tick(&mut self) {
        match self.session.driver_state() {
            DriverState::Previewing => {
                if let PlaybackTick::Advanced(index) = self.session.playback_tick() {
                    self.notify(SessionNotice::PlaybackAdvanced { index });
                }
            }
            DriverState::Exporting => match self.export_tick() {
                ExportTick::Emitted(index) => {
                    self.notify(SessionNotice::ExportFrameCaptured { index })
                }
                ExportTick::Completed(pending) => {
                    self.notify(SessionNotice::ExportCaptureStopped {
                        frames: pending.frames(),
                    });
                    self.spawn_finalize(pending);
                }
                ExportTick::Failed(e) => self.notify(SessionNotice::ExportFailed {
                    error: e.to_string(),
                }),
                ExportTick::Inactive => {}
            },
            DriverState::Idle => {}
        }
    }

    /// Run an export tick. Capturing may block on an encoder pipe, so on a
    /// multi-threaded runtime the worker is handed over for the duration.
    fn export_tick(&mut self) -> ExportTick {
        let multi_thread = matches!(
            tokio::runtime::Handle::current().runtime_flavor(),
            RuntimeFlavor::MultiThread
        );
        if multi_thread {
            tokio::task::block_in_place(|| self.session.export_tick())
        } else {
            self.session.export_tick()
        }
    }

    /// Keep exactly one interval alive for the active driver.
    fn sync_ticker(&mut self) {
        let state = self.session.driver_state();
        if state == self.ticking {
            return;
        }
        self.ticker = match state {
            DriverState::Idle => None,
            DriverState::Previewing => Some(ticker(PLAYBACK_TICK)),
            DriverState::Exporting => Some(ticker(EXPORT_TICK)),
        };
        tracing::debug!(from = ?self.ticking, to = ?state, "Driver changed");
        self.notify(SessionNotice::DriverChanged {
            from: self.ticking,
            to: state,
        });
        self.ticking = state;
    }

    fn spawn_import(&mut self, sources: Vec<ImageSource>) {
        self.next_batch += 1;
        let batch = self.next_batch;
        let Some(tx) = self.events_tx.upgrade() else {
            tracing::warn!(batch, "Session closing, import dropped");
            return;
        };
        tracing::info!(batch, count = sources.len(), "Import batch queued");

        let loader = self.loader.clone();
        tokio::spawn(async move {
            let (mut imported, mut failed) = (0, 0);
            for (source, result) in load_batch(loader, sources).await {
                if result.is_ok() {
                    imported += 1;
                } else {
                    failed += 1;
                }
                let event = SessionEvent::Decoded {
                    batch,
                    label: source.label(),
                    result,
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
            let _ = tx.send(SessionEvent::ImportDone {
                batch,
                imported,
                failed,
            });
        });
    }

    fn spawn_finalize(&self, pending: PendingExport) {
        let Some(tx) = self.events_tx.upgrade() else {
            tracing::warn!("Session closing, discarding finished capture");
            return;
        };
        let summary = self.session.summary();
        let sink = self.sink.clone();
        tracing::debug!(encoder = pending.encoder_name(), frames = pending.frames(), "Finalizing export");

        tokio::task::spawn_blocking(move || {
            let event = match pending.finish() {
                Ok(clip) => {
                    let saved = sink.map(|sink| save_clip(&sink, &clip, &summary));
                    SessionEvent::Finalized {
                        clip: Ok(clip),
                        saved,
                    }
                }
                Err(e) => SessionEvent::Finalized {
                    clip: Err(e),
                    saved: None,
                },
            };
            let _ = tx.send(event);
        });
    }

    fn notify(&self, notice: SessionNotice) {
        if self.notices.send(notice).is_err() {
            tracing::trace!("Notice receiver dropped");
        }
    }
}

fn save_clip(
    sink: &SharedSink,
    clip: &EncodedClip,
    summary: &ProjectSummary,
) -> StopmoResult<PathBuf> {
    let mut sink = sink
        .lock()
        .map_err(|_| StopmoError::Other(anyhow::anyhow!("artifact sink lock poisoned")))?;
    sink.save(clip, summary)
}

fn rejected_unless(done: bool, action: &'static str) -> Option<&'static str> {
    if done {
        None
    } else {
        Some(action)
    }
}

fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Cloneable handle for sending commands to a running [`SessionRunner`].
///
/// Every method returns `false` once the runner has stopped.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    pub fn send(&self, command: SessionCommand) -> bool {
        self.tx.send(SessionEvent::Command(command)).is_ok()
    }

    pub fn import(&self, sources: Vec<ImageSource>) -> bool {
        self.send(SessionCommand::Import(sources))
    }

    pub fn select(&self, index: usize) -> bool {
        self.send(SessionCommand::Select(index))
    }

    pub fn begin_drag(&self, index: usize) -> bool {
        self.send(SessionCommand::BeginDrag(index))
    }

    pub fn cancel_drag(&self) -> bool {
        self.send(SessionCommand::CancelDrag)
    }

    pub fn drop_on(&self, target: usize, pointer_x: f64, target_left: f64, target_width: f64) -> bool {
        self.send(SessionCommand::DropOn {
            target,
            pointer_x,
            target_left,
            target_width,
        })
    }

    pub fn reorder(&self, gesture: ReorderGesture) -> bool {
        self.send(SessionCommand::Reorder(gesture))
    }

    pub fn remove(&self, index: usize) -> bool {
        self.send(SessionCommand::Remove(index))
    }

    pub fn play(&self) -> bool {
        self.send(SessionCommand::Play)
    }

    pub fn stop_playback(&self) -> bool {
        self.send(SessionCommand::StopPlayback)
    }

    pub fn export(&self, encoder: Box<dyn StreamEncoder>) -> bool {
        self.send(SessionCommand::Export(encoder))
    }

    pub fn cancel_export(&self) -> bool {
        self.send(SessionCommand::CancelExport)
    }

    pub fn resize(&self, width: u32, height: u32) -> bool {
        self.send(SessionCommand::Resize { width, height })
    }

    pub fn shutdown(&self) -> bool {
        self.send(SessionCommand::Shutdown)
    }

    /// Ask the runner for a snapshot. `None` if it has stopped.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        if !self.send(SessionCommand::Snapshot(reply)) {
            return None;
        }
        rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{empty_session, EncoderEvent, RecordingEncoder, SolidLoader};

    const TIMEOUT: Duration = Duration::from_secs(60);

    fn start() -> (
        SessionHandle,
        mpsc::UnboundedReceiver<SessionNotice>,
        tokio::task::JoinHandle<Session>,
    ) {
        let (runner, handle, notices) = SessionRunner::new(empty_session(), Arc::new(SolidLoader));
        (handle, notices, tokio::spawn(runner.run()))
    }

    /// Collect notices up to and including the first one matching `done`.
    async fn collect_until(
        notices: &mut mpsc::UnboundedReceiver<SessionNotice>,
        done: impl Fn(&SessionNotice) -> bool,
    ) -> Vec<SessionNotice> {
        let mut seen = Vec::new();
        tokio::time::timeout(TIMEOUT, async {
            while let Some(notice) = notices.recv().await {
                let stop = done(&notice);
                seen.push(notice);
                if stop {
                    break;
                }
            }
        })
        .await
        .expect("timed out waiting for notice");
        seen
    }

    async fn import_rgb(handle: &SessionHandle, notices: &mut mpsc::UnboundedReceiver<SessionNotice>) {
        handle.import(vec![
            SolidLoader::source("r", [255, 0, 0, 255]),
            SolidLoader::source("g", [0, 255, 0, 255]),
            SolidLoader::source("b", [0, 0, 255, 255]),
        ]);
        collect_until(notices, |n| matches!(n, SessionNotice::ImportFinished { .. })).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_import_batch_keeps_order_and_reports_failures() {
        let (handle, mut notices, task) = start();
        handle.import(vec![
            SolidLoader::source("a", [1, 0, 0, 255]),
            ImageSource::bytes("broken", vec![0u8; 3]),
            SolidLoader::source("c", [3, 0, 0, 255]),
        ]);

        let seen = collect_until(&mut notices, |n| matches!(n, SessionNotice::ImportFinished { .. })).await;

        assert!(seen.iter().any(|n| matches!(n, SessionNotice::DecodeFailed { label, .. } if label == "broken")));
        assert!(matches!(
            seen.last(),
            Some(SessionNotice::ImportFinished { imported: 2, failed: 1, .. })
        ));
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.frames, vec!["a", "c"]);
        assert_eq!(snapshot.cursor, Some(0));

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_ticks_every_500ms_then_stops() {
        let (handle, mut notices, task) = start();
        import_rgb(&handle, &mut notices).await;

        let started = Instant::now();
        handle.play();
        let seen = collect_until(&mut notices, |n| {
            matches!(n, SessionNotice::DriverChanged { to: DriverState::Idle, .. })
        })
        .await;
        let elapsed = started.elapsed();

        let advanced: Vec<usize> = seen
            .iter()
            .filter_map(|n| match n {
                SessionNotice::PlaybackAdvanced { index } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(advanced, vec![1, 2]);
        // Two advancing ticks, then the tick that finds the end.
        assert!(elapsed >= Duration::from_millis(1500));
        assert!(elapsed < Duration::from_millis(2000));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.mode, DisplayMode::Compare);
        assert_eq!(snapshot.driver, DriverState::Idle);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_captures_each_frame_once() {
        let (handle, mut notices, task) = start();
        import_rgb(&handle, &mut notices).await;

        let (encoder, events) = RecordingEncoder::new();
        handle.export(Box::new(encoder));
        let seen = collect_until(&mut notices, |n| {
            matches!(n, SessionNotice::ExportFinished(_) | SessionNotice::ExportFailed { .. })
        })
        .await;

        let captured: Vec<usize> = seen
            .iter()
            .filter_map(|n| match n {
                SessionNotice::ExportFrameCaptured { index } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(captured, vec![0, 1, 2]);
        assert!(matches!(seen.first(), Some(SessionNotice::ExportStarted { frames: 3 })));
        let Some(SessionNotice::ExportFinished(clip)) = seen.last() else {
            panic!("export did not finish: {seen:?}");
        };
        assert_eq!(clip.frames, 3);

        let log = events.lock().unwrap().clone();
        assert_eq!(log.iter().filter(|e| matches!(e, EncoderEvent::Capture(_))).count(), 3);
        assert_eq!(log.last(), Some(&EncoderEvent::Finish));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.driver, DriverState::Idle);
        assert_eq!(snapshot.mode, DisplayMode::Compare);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_encoder_is_reported() {
        let (handle, mut notices, task) = start();
        import_rgb(&handle, &mut notices).await;

        let (encoder, _) = RecordingEncoder::unavailable();
        handle.export(Box::new(encoder));
        let seen = collect_until(&mut notices, |n| {
            matches!(n, SessionNotice::EncoderUnavailable { .. })
        })
        .await;
        assert!(!seen
            .iter()
            .any(|n| matches!(n, SessionNotice::DriverChanged { .. })));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.driver, DriverState::Idle);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_are_reported() {
        let (handle, mut notices, task) = start();
        handle.play();
        let seen = collect_until(&mut notices, |n| matches!(n, SessionNotice::Rejected { .. })).await;
        assert!(matches!(seen.last(), Some(SessionNotice::Rejected { action: "play" })));

        handle.select(4);
        let seen = collect_until(&mut notices, |n| matches!(n, SessionNotice::CommandFailed { .. })).await;
        assert_eq!(seen.len(), 1);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_commands() {
        let (handle, mut notices, task) = start();
        import_rgb(&handle, &mut notices).await;

        handle.begin_drag(0);
        handle.cancel_drag();
        handle.drop_on(2, 100.0, 0.0, 10.0);
        let seen = collect_until(&mut notices, |n| matches!(n, SessionNotice::Rejected { .. })).await;
        assert!(matches!(seen.last(), Some(SessionNotice::Rejected { action: "reorder" })));
        assert_eq!(handle.snapshot().await.unwrap().frames, vec!["r", "g", "b"]);

        handle.begin_drag(0);
        handle.drop_on(2, 100.0, 0.0, 10.0);
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.frames, vec!["g", "b", "r"]);
        assert_eq!(snapshot.cursor, Some(2));

        handle.begin_drag(5);
        let seen = collect_until(&mut notices, |n| matches!(n, SessionNotice::CommandFailed { .. })).await;
        assert_eq!(seen.len(), 1);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_during_export_is_rejected() {
        let (handle, mut notices, task) = start();
        import_rgb(&handle, &mut notices).await;

        let (encoder, _) = RecordingEncoder::new();
        handle.export(Box::new(encoder));
        handle.begin_drag(0);
        handle.drop_on(2, 100.0, 0.0, 10.0);
        let seen = collect_until(&mut notices, |n| matches!(n, SessionNotice::ExportFinished(_))).await;

        let rejected: Vec<&str> = seen
            .iter()
            .filter_map(|n| match n {
                SessionNotice::Rejected { action } => Some(*action),
                _ => None,
            })
            .collect();
        assert_eq!(rejected, vec!["drag", "reorder"]);
        assert_eq!(handle.snapshot().await.unwrap().frames, vec!["r", "g", "b"]);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_export_on_multi_thread_runtime() {
        let (handle, mut notices, task) = start();
        import_rgb(&handle, &mut notices).await;

        let (encoder, events) = RecordingEncoder::new();
        handle.export(Box::new(encoder));
        let seen = collect_until(&mut notices, |n| {
            matches!(n, SessionNotice::ExportFinished(_) | SessionNotice::ExportFailed { .. })
        })
        .await;
        assert!(matches!(seen.last(), Some(SessionNotice::ExportFinished(clip)) if clip.frames == 3));
        let captures = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, EncoderEvent::Capture(_)))
            .count();
        assert_eq!(captures, 3);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_returns_session() {
        let (handle, mut notices, task) = start();
        import_rgb(&handle, &mut notices).await;
        handle.play();
        handle.shutdown();

        let session = task.await.unwrap();
        assert_eq!(session.store().len(), 3);
        assert_eq!(session.driver_state(), DriverState::Idle);
        assert!(!handle.play());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_serializes_states() {
        let (handle, _notices, task) = start();
        let snapshot = handle.snapshot().await.unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["driver"], "idle");
        assert_eq!(json["mode"], "compare");

        drop(handle);
        task.await.unwrap();
    }
}
