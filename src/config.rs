use crate::error::{EngineError, EngineResult};
use crate::renderer::timeline::TimelineSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    pub render: RenderConfig,
    pub dialogue: DialogueConfig,
    pub paths: PathsConfig,
    pub encode: EncodeConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RenderConfig {
    pub fps: u32,
    pub lag_frames: usize,
    pub wrap_width: usize,
    /// Relative to the asset root. Empty means block glyphs.
    pub font: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DialogueConfig {
    pub chunk_width: usize,
    pub max_chunk_len: usize,
    pub min_music_scenes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PathsConfig {
    pub assets_root: PathBuf,
    pub cache_dir: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EncodeConfig {
    pub video_codec: String,
    pub audio_codec: String,
    /// Codec of the intermediate silent video.
    pub cache_video_codec: String,
    pub cache_video_extension: String,
    pub sample_rate: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            render: RenderConfig {
                fps: 18,
                lag_frames: 25,
                wrap_width: 34,
                font: "igiari/Igiari.ttf".to_string(),
            },
            dialogue: DialogueConfig {
                chunk_width: 85,
                max_chunk_len: 90,
                min_music_scenes: 3,
            },
            paths: PathsConfig {
                assets_root: PathBuf::from("assets"),
                cache_dir: PathBuf::from("cache"),
                output: PathBuf::from("output.mp4"),
            },
            encode: EncodeConfig {
                video_codec: "libx264".to_string(),
                audio_codec: "aac".to_string(),
                cache_video_codec: "mpeg4".to_string(),
                cache_video_extension: "avi".to_string(),
                sample_rate: 44100,
            },
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings: Self = Self::builder()?.build()?.try_deserialize()?;
        settings
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(settings)
    }

    /// Reject settings no render can use.
    pub fn validate(&self) -> EngineResult<()> {
        if self.render.fps == 0 {
            return Err(EngineError::config("render.fps must be at least 1"));
        }
        if self.encode.sample_rate == 0 {
            return Err(EngineError::config("encode.sample_rate must be at least 1"));
        }
        Ok(())
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("render.fps", 18)?
            .set_default("render.lag_frames", 25)?
            .set_default("render.wrap_width", 34)?
            .set_default("render.font", "igiari/Igiari.ttf")?
            .set_default("dialogue.chunk_width", 85)?
            .set_default("dialogue.max_chunk_len", 90)?
            .set_default("dialogue.min_music_scenes", 3)?
            .set_default("paths.assets_root", "assets")?
            .set_default("paths.cache_dir", "cache")?
            .set_default("paths.output", "output.mp4")?
            .set_default("encode.video_codec", "libx264")?
            .set_default("encode.audio_codec", "aac")?
            .set_default("encode.cache_video_codec", "mpeg4")?
            .set_default("encode.cache_video_extension", "avi")?
            .set_default("encode.sample_rate", 44100)?
            // Load from file if exists
            .add_source(config::File::with_name("objection").required(false))
            // Allow env var overrides (e.g. OBJECTION_RENDER__FPS=24)
            .add_source(config::Environment::with_prefix("OBJECTION").separator("__"));

        Ok(builder)
    }

    pub fn timeline_settings(&self) -> TimelineSettings {
        let font = self.render.font.trim();
        TimelineSettings {
            fps: self.render.fps,
            lag_frames: self.render.lag_frames,
            wrap_width: self.render.wrap_width,
            font: (!font.is_empty()).then(|| PathBuf::from(font)),
        }
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
