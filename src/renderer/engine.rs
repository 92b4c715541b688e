use crate::assets::{AssetCache, AssetStats};
use crate::audio::{AudioSequencer, SoundBank};
use crate::config::AppConfig;
use crate::error::{EngineError, EngineResult};
use crate::renderer::sink::{FfmpegWriter, FrameWriter, PpmSequenceWriter, VideoSink};
use crate::renderer::timeline::{Timeline, TimelineBuilder};
use crate::renderer::VideoEncoder;
use crate::script::Script;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Output channels of the mixed soundtrack.
const AUDIO_CHANNELS: u16 = 2;

/// What a finished render produced.
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub frames: usize,
    pub duration_secs: f32,
    pub cues: usize,
    pub assets: AssetStats,
    pub job_dir: PathBuf,
    /// Intermediate silent video, or the frame directory when ffmpeg is missing.
    pub video: PathBuf,
    pub audio: PathBuf,
    /// Final muxed file. `None` when ffmpeg is unavailable.
    pub output: Option<PathBuf>,
}

/// Drives a whole job: plan, compose, sequence audio, mux.
pub struct RenderEngine {
    config: AppConfig,
}

impl RenderEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Working directory of `script`: `<cache_dir>/<first 16 hex digits of its sha256>`.
    pub fn job_dir(&self, script: &Script) -> EngineResult<PathBuf> {
        let json = serde_json::to_string(script)
            .map_err(|e| EngineError::invalid_script(format!("script is not serializable: {}", e)))?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        Ok(self.config.paths.cache_dir.join(&digest[..16]))
    }

    /// Plan `script` against the configured asset root without compositing.
    pub fn plan(&self, script: &Script) -> EngineResult<(Timeline, AssetStats)> {
        let mut cache = AssetCache::new(&self.config.paths.assets_root);
        let timeline = self.plan_with(&mut cache, script)?;
        Ok((timeline, cache.stats()))
    }

    pub fn plan_with(&self, cache: &mut AssetCache, script: &Script) -> EngineResult<Timeline> {
        TimelineBuilder::new(cache, self.config.timeline_settings()).build(script)
    }

    /// Render `script` into the configured output file.
    pub fn render(&self, script: &Script) -> EngineResult<RenderReport> {
        self.config.validate()?;
        let (timeline, assets) = self.plan(script)?;
        let cues = timeline.cues();
        tracing::info!(
            frames = timeline.total_frames(),
            cues = cues.len(),
            seconds = timeline.duration_secs(),
            "timeline planned"
        );

        let job_dir = self.job_dir(script)?;
        std::fs::create_dir_all(&job_dir)?;
        tracing::info!(job = %job_dir.display(), "render job started");

        let assets_root = &self.config.paths.assets_root;
        let sample_rate = self.config.encode.sample_rate;
        let bank = SoundBank::load(assets_root, &cues, sample_rate, AUDIO_CHANNELS)?;

        let ffmpeg = VideoEncoder::is_available();
        let (video, frames) = if ffmpeg {
            let path = job_dir.join(format!("video.{}", self.config.encode.cache_video_extension));
            let writer = FfmpegWriter::new(&path, &self.config.encode.cache_video_codec);
            let (_, frames) = self.render_frames(&timeline, writer)?;
            (path, frames)
        } else {
            tracing::warn!("ffmpeg not found, writing frames as PPM images");
            let dir = job_dir.join("frames");
            let (_, frames) = self.render_frames(&timeline, PpmSequenceWriter::new(&dir))?;
            (dir, frames)
        };

        let audio = job_dir.join("audio.wav");
        self.render_audio(&timeline, &bank, &audio)?;

        let output = if ffmpeg {
            let output = self.config.paths.output.clone();
            VideoEncoder::mux(
                &video,
                &audio,
                &output,
                &self.config.encode.video_codec,
                &self.config.encode.audio_codec,
            )?;
            Some(output)
        } else {
            None
        };

        Ok(RenderReport {
            frames,
            duration_secs: timeline.duration_secs(),
            cues: cues.len(),
            assets,
            job_dir,
            video,
            audio,
            output,
        })
    }

    /// Compose every sub-scene in timeline order into `writer`.
    pub fn render_frames<W: FrameWriter>(&self, timeline: &Timeline, writer: W) -> EngineResult<(W, usize)> {
        let mut sink = VideoSink::new(writer, timeline.fps());
        let total = timeline.total_frames();

        for (index, sub_scene) in timeline.sub_scenes().enumerate() {
            let frames = sub_scene.compose()?;
            sink.extend(&frames)?;
            tracing::debug!(
                sub_scene = index,
                frames = frames.len(),
                written = sink.frame_count(),
                total,
                "sub-scene composed"
            );
        }

        let (writer, frames) = sink.finish()?;
        if frames != total {
            return Err(EngineError::composition(format!(
                "wrote {} frames but the timeline has {}",
                frames, total
            )));
        }
        Ok((writer, frames))
    }

    /// Sequence the cue list and write it as a WAV file. Returns the sample frame count.
    pub fn render_audio(&self, timeline: &Timeline, bank: &SoundBank, path: &Path) -> EngineResult<usize> {
        let sequencer = AudioSequencer::new(timeline.fps(), bank.sample_rate(), bank.channels())?;
        let samples = sequencer.sequence(&timeline.cues(), bank)?;
        sequencer.export(path, &samples)?;

        let sample_frames = samples.len() / bank.channels().max(1) as usize;
        tracing::info!(path = %path.display(), sample_frames, "audio exported");
        Ok(sample_frames)
    }
}
