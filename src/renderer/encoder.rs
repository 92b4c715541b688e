use crate::error::{EngineError, EngineResult};
use anyhow::Context;
use std::path::Path;
use std::process::Command;

/// Handles the final mux using an external FFmpeg process
pub struct VideoEncoder;

impl VideoEncoder {
    /// Check if FFmpeg is available
    pub fn is_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Join the silent video stream and the audio track into one file.
    pub fn mux(
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        video_codec: &str,
        audio_codec: &str,
    ) -> EngineResult<()> {
        if !Self::is_available() {
            return Err(EngineError::encode(
                "FFmpeg not found. Please install ffmpeg to enable video encoding.",
            ));
        }

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }

        tracing::info!(output = %output_path.display(), "muxing video and audio");

        let output = Command::new("ffmpeg")
            .args(Self::mux_args(
                video_path,
                audio_path,
                output_path,
                video_codec,
                audio_codec,
            ))
            .output()
            .context("Failed to execute ffmpeg")?;

        if !output.status.success() {
            return Err(EngineError::encode(format!(
                "FFmpeg mux failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }

    /// Command line for [`VideoEncoder::mux`].
    pub fn mux_args(
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        video_codec: &str,
        audio_codec: &str,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into(), "-loglevel".into(), "error".into()];
        args.push("-i".into());
        args.push(video_path.display().to_string());
        args.push("-i".into());
        args.push(audio_path.display().to_string());
        args.extend(["-c:v".into(), video_codec.to_string()]);
        if video_codec == "libx264" {
            args.extend(["-pix_fmt".into(), "yuv420p".into()]);
        }
        args.extend([
            "-c:a".into(),
            audio_codec.to_string(),
            "-strict".into(),
            "experimental".into(),
        ]);
        args.push(output_path.display().to_string());
        args
    }
}
