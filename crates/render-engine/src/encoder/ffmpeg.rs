//! WebM/MP4 encoder that streams raw surface frames into a system `ffmpeg`.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use stopmo_common::error::{StopmoError, StopmoResult};

use super::{CaptureSpec, ClipFormat, EncodedClip, StreamEncoder};
use crate::surface::Surface;

static NEXT_OUTPUT_ID: AtomicU64 = AtomicU64::new(0);

/// Background used to flatten transparent surface pixels.
const BACKGROUND: [u8; 3] = [0, 0, 0];

/// Streams frames to `ffmpeg` over stdin and reads the clip back on finish.
pub struct FfmpegStreamEncoder {
    format: ClipFormat,
    spec: Option<CaptureSpec>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<String>>,
    output_path: PathBuf,
    scratch: Vec<u8>,
    frames: usize,
}

impl FfmpegStreamEncoder {
    /// Create an encoder for `ClipFormat::Webm` or `ClipFormat::Mp4`.
    /// Other formats fall back to WebM.
    pub fn new(format: ClipFormat) -> Self {
        let format = match format {
            ClipFormat::Mp4 => ClipFormat::Mp4,
            _ => ClipFormat::Webm,
        };
        let output_path = std::env::temp_dir().join(format!(
            "stopmo-{}-{}.{}",
            std::process::id(),
            NEXT_OUTPUT_ID.fetch_add(1, Ordering::Relaxed),
            format.extension()
        ));
        Self {
            format,
            spec: None,
            child: None,
            stdin: None,
            stderr_drain: None,
            output_path,
            scratch: Vec::new(),
            frames: 0,
        }
    }

    fn ffmpeg_args(&self, spec: &CaptureSpec) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push("-s".to_string());
        args.push(format!("{}x{}", spec.width, spec.height));
        args.push("-r".to_string());
        args.push(spec.fps.to_string());
        args.extend(["-i", "pipe:0", "-an"].iter().map(|s| s.to_string()));

        // yuv420p needs even dimensions.
        args.push("-vf".to_string());
        args.push("pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string());

        let codec_args: &[&str] = match self.format {
            ClipFormat::Mp4 => &[
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ],
            _ => &[
                "-c:v",
                "libvpx-vp9",
                "-pix_fmt",
                "yuv420p",
                "-b:v",
                "0",
                "-crf",
                "32",
            ],
        };
        args.extend(codec_args.iter().map(|s| s.to_string()));
        args.push(self.output_path.to_string_lossy().into_owned());
        args
    }

    fn cleanup_output(&self) {
        if self.output_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.output_path) {
                tracing::warn!(path = %self.output_path.display(), error = %e, "Failed to remove ffmpeg output");
            }
        }
    }
}

impl StreamEncoder for FfmpegStreamEncoder {
    fn start_capture(&mut self, width: u32, height: u32, fps: u32) -> StopmoResult<()> {
        let spec = CaptureSpec::new(width, height, fps)?;
        if !self.is_available() {
            return Err(StopmoError::encoder_unavailable(
                "ffmpeg is required for WebM/MP4 export, but was not found on PATH",
            ));
        }

        let args = self.ffmpeg_args(&spec);
        tracing::debug!(?args, "Running ffmpeg");
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StopmoError::encoder_unavailable(format!("Failed to start ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StopmoError::encoder_unavailable("Failed to open ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| StopmoError::encoder_unavailable("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full pipe.
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr = stderr;
            let mut output = String::new();
            match stderr.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::info!(pid = child.id(), format = %self.format, width, height, fps, "ffmpeg capture started");

        self.scratch = vec![0u8; spec.frame_len()];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.spec = Some(spec);
        self.frames = 0;
        Ok(())
    }

    fn capture(&mut self, surface: &Surface) -> StopmoResult<()> {
        let spec = self
            .spec
            .ok_or_else(|| StopmoError::encoder("ffmpeg encoder not started"))?;
        spec.check(surface)?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| StopmoError::encoder("ffmpeg stdin already closed"))?;

        for (dst, src) in self
            .scratch
            .chunks_exact_mut(4)
            .zip(surface.as_bytes().chunks_exact(4))
        {
            let alpha = src[3] as u32;
            for i in 0..3 {
                let fg = src[i] as u32 * alpha;
                let bg = BACKGROUND[i] as u32 * (255 - alpha);
                dst[i] = ((fg + bg + 127) / 255) as u8;
            }
            dst[3] = 255;
        }

        stdin
            .write_all(&self.scratch)
            .map_err(|e| StopmoError::encoder(format!("Failed to write frame to ffmpeg: {e}")))?;
        self.frames += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> StopmoResult<EncodedClip> {
        let spec = self
            .spec
            .ok_or_else(|| StopmoError::encoder("ffmpeg encoder not started"))?;

        // Closing stdin signals end of stream.
        drop(self.stdin.take());

        let status = match self.child.take() {
            Some(mut child) => child
                .wait()
                .map_err(|e| StopmoError::encoder(format!("Failed to wait on ffmpeg: {e}")))?,
            None => return Err(StopmoError::encoder("ffmpeg process missing")),
        };

        let stderr_output = self
            .stderr_drain
            .take()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default();

        if !status.success() {
            self.cleanup_output();
            return Err(StopmoError::encoder(format!(
                "ffmpeg export failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        let bytes = std::fs::read(&self.output_path);
        self.cleanup_output();
        let bytes = bytes?;

        tracing::info!(frames = self.frames, bytes = bytes.len(), "ffmpeg clip finalized");
        Ok(EncodedClip {
            format: self.format,
            width: spec.width,
            height: spec.height,
            fps: spec.fps,
            frames: self.frames,
            bytes,
        })
    }

    fn abort(mut self: Box<Self>) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                tracing::debug!(error = %e, "ffmpeg already exited");
            }
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
        self.cleanup_output();
        tracing::info!(frames = self.frames, "ffmpeg capture discarded");
    }

    fn frames_captured(&self) -> usize {
        self.frames
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg")
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

impl Drop for FfmpegStreamEncoder {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Whether `binary` resolves on the current PATH.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
