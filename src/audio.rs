use crate::error::{EngineError, EngineResult};
use crate::renderer::timeline::AudioCue;
use crate::script::Character;
use anyhow::Context;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

const BLIP_ASSET: &str = "sfx general/sfx-blipmale.wav";
const BLINK_ASSET: &str = "sfx general/sfx-blink.wav";
const SHOCK_ASSET: &str = "sfx general/sfx-fwashing.wav";
const BLIP_GAP_MS: f64 = 50.0;
const BLIP_REPEATS: usize = 100;
const SFX_GAIN_DB: f32 = -10.0;

/// Interleaved f32 samples with their format.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn silence(frames: usize, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        Self::new(vec![0.0; frames * channels as usize], sample_rate, channels)
    }

    pub fn silence_ms(ms: f64, sample_rate: u32, channels: u16) -> Self {
        let frames = (ms / 1000.0 * sample_rate as f64).round() as usize;
        Self::silence(frames, sample_rate, channels)
    }

    /// Length in sample frames (one sample per channel).
    pub fn len_frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_ms(&self) -> f64 {
        self.len_frames() as f64 * 1000.0 / self.sample_rate as f64
    }

    /// Nearest-neighbour conversion to another rate and channel count.
    /// Mono input is copied to every output channel.
    pub fn resampled(&self, sample_rate: u32, channels: u16) -> AudioClip {
        let channels = channels.max(1);
        if sample_rate == self.sample_rate && channels == self.channels {
            return self.clone();
        }

        let rate_ratio = self.sample_rate as f64 / sample_rate as f64;
        let out_frames = (self.len_frames() as f64 / rate_ratio).floor() as usize;
        let in_channels = self.channels as usize;
        let mut samples = Vec::with_capacity(out_frames * channels as usize);

        for frame_index in 0..out_frames {
            let input_frame = ((frame_index as f64 * rate_ratio) as usize).min(self.len_frames() - 1);
            for channel_index in 0..channels as usize {
                let input_channel = if in_channels == 1 {
                    0
                } else {
                    channel_index % in_channels
                };
                samples.push(self.samples[input_frame * in_channels + input_channel]);
            }
        }

        AudioClip::new(samples, sample_rate, channels)
    }

    pub fn with_gain_db(mut self, db: f32) -> AudioClip {
        let gain = 10f32.powf(db / 20.0);
        for sample in &mut self.samples {
            *sample *= gain;
        }
        self
    }

    /// `self` followed by `other`, converted to this clip's format.
    pub fn concat(&self, other: &AudioClip) -> AudioClip {
        let other = other.resampled(self.sample_rate, self.channels);
        let mut samples = Vec::with_capacity(self.samples.len() + other.samples.len());
        samples.extend_from_slice(&self.samples);
        samples.extend_from_slice(&other.samples);
        AudioClip::new(samples, self.sample_rate, self.channels)
    }

    pub fn repeat(&self, times: usize) -> AudioClip {
        AudioClip::new(self.samples.repeat(times), self.sample_rate, self.channels)
    }

    /// Trim or pad with silence to exactly `frames` sample frames.
    pub fn fitted(mut self, frames: usize) -> AudioClip {
        self.samples.resize(frames * self.channels as usize, 0.0);
        self
    }

    /// Loop the clip until it fills `frames` sample frames, then trim.
    pub fn looped(&self, frames: usize) -> AudioClip {
        if self.samples.is_empty() {
            return AudioClip::silence(frames, self.sample_rate, self.channels);
        }
        let wanted = frames * self.channels as usize;
        let samples = self.samples.iter().copied().cycle().take(wanted).collect();
        AudioClip::new(samples, self.sample_rate, self.channels)
    }
}

/// Decodes audio files into raw samples (f32, interleaved)
pub struct AudioDecoder;

impl AudioDecoder {
    /// Decode an audio file to a clip in its native format
    pub fn decode(path: &Path) -> EngineResult<AudioClip> {
        if !path.is_file() {
            return Err(EngineError::asset_not_found(path));
        }

        let src = File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(src), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &fmt_opts, &meta_opts)
            .map_err(|e| EngineError::decode(path, format!("unsupported audio format: {}", e)))?;

        let mut format = probed.format;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| EngineError::decode(path, "no supported audio track found"))?;

        let dec_opts: DecoderOptions = Default::default();
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &dec_opts)
            .map_err(|e| EngineError::decode(path, format!("unsupported codec: {}", e)))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(0);

        let mut all_samples = Vec::new();

        while let Ok(packet) = format.next_packet() {
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count() as u16;
                    let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    sample_buf.copy_interleaved_ref(decoded);
                    all_samples.extend_from_slice(sample_buf.samples());
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "stopped decoding at bad packet");
                    break;
                }
            }
        }

        Ok(AudioClip::new(all_samples, sample_rate, channels))
    }
}

/// Which objection shout a character uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sting {
    Phoenix,
    Edgeworth,
    Default,
}

impl Sting {
    pub fn for_character(character: Character) -> Sting {
        match character {
            Character::Phoenix => Sting::Phoenix,
            Character::Edgeworth => Sting::Edgeworth,
            _ => Sting::Default,
        }
    }

    pub fn asset(&self) -> &'static str {
        match self {
            Sting::Phoenix => "Phoenix - objection.mp3",
            Sting::Edgeworth => "Edgeworth - (English) objection.mp3",
            Sting::Default => "Payne - Objection.mp3",
        }
    }
}

/// Decoded sound effects and music, already in the output format.
#[derive(Debug, Clone)]
pub struct SoundBank {
    sample_rate: u32,
    channels: u16,
    blink: Option<AudioClip>,
    blip_loop: Option<AudioClip>,
    shock: Option<AudioClip>,
    stings: HashMap<Sting, AudioClip>,
    tracks: HashMap<String, AudioClip>,
}

impl SoundBank {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            blink: None,
            blip_loop: None,
            shock: None,
            stings: HashMap::new(),
            tracks: HashMap::new(),
        }
    }

    /// Decode every clip `cues` needs from `assets_root`.
    pub fn load(
        assets_root: &Path,
        cues: &[AudioCue],
        sample_rate: u32,
        channels: u16,
    ) -> EngineResult<Self> {
        let mut bank = Self::new(sample_rate, channels);
        let decode = |rel: &str| -> EngineResult<AudioClip> {
            let path: PathBuf = assets_root.join(rel);
            Ok(AudioDecoder::decode(&path)?.resampled(sample_rate, channels))
        };

        for cue in cues {
            match cue {
                AudioCue::Blip { .. } if bank.blip_loop.is_none() => {
                    let blink = decode(BLINK_ASSET)?;
                    let blip = decode(BLIP_ASSET)?;
                    bank = bank.with_blips(blink, blip);
                }
                AudioCue::Shock { .. } if bank.shock.is_none() => {
                    bank.shock = Some(decode(SHOCK_ASSET)?);
                }
                AudioCue::Objection { character, .. } => {
                    let sting = Sting::for_character(*character);
                    if !bank.stings.contains_key(&sting) {
                        let clip = decode(sting.asset())?;
                        bank.stings.insert(sting, clip);
                    }
                }
                AudioCue::BackgroundTrack { track_id } if !bank.tracks.contains_key(track_id) => {
                    let clip = decode(&format!("{}.mp3", track_id))?;
                    bank.tracks.insert(track_id.clone(), clip);
                }
                _ => {}
            }
        }

        tracing::info!(
            stings = bank.stings.len(),
            tracks = bank.tracks.len(),
            "sound bank loaded"
        );
        Ok(bank)
    }

    /// Typewriter sounds: the blink plays once, then the blip repeats with a short gap.
    pub fn with_blips(mut self, blink: AudioClip, blip: AudioClip) -> Self {
        let blip = blip.resampled(self.sample_rate, self.channels);
        let gap = AudioClip::silence_ms(BLIP_GAP_MS, self.sample_rate, self.channels);
        self.blip_loop = Some(blip.concat(&gap).repeat(BLIP_REPEATS).with_gain_db(SFX_GAIN_DB));
        self.blink = Some(
            blink
                .resampled(self.sample_rate, self.channels)
                .with_gain_db(SFX_GAIN_DB),
        );
        self
    }

    pub fn with_shock(mut self, shock: AudioClip) -> Self {
        self.shock = Some(shock.resampled(self.sample_rate, self.channels));
        self
    }

    pub fn with_sting(mut self, sting: Sting, clip: AudioClip) -> Self {
        self.stings
            .insert(sting, clip.resampled(self.sample_rate, self.channels));
        self
    }

    pub fn with_track(mut self, track_id: impl Into<String>, clip: AudioClip) -> Self {
        self.tracks
            .insert(track_id.into(), clip.resampled(self.sample_rate, self.channels));
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn track(&self, track_id: &str) -> EngineResult<&AudioClip> {
        self.tracks
            .get(track_id)
            .ok_or_else(|| EngineError::audio(format!("background track '{}' not loaded", track_id)))
    }

    /// Foreground audio for one cue, exactly `frames` sample frames long.
    pub fn render_cue(&self, cue: &AudioCue, frames: usize) -> EngineResult<AudioClip> {
        let missing = |what: &str| EngineError::audio(format!("{} sound not loaded", what));
        let clip = match cue {
            AudioCue::Silence { .. } | AudioCue::BackgroundTrack { .. } => {
                AudioClip::silence(frames, self.sample_rate, self.channels)
            }
            AudioCue::Blip { .. } => {
                let blink = self.blink.as_ref().ok_or_else(|| missing("blink"))?;
                let blips = self.blip_loop.as_ref().ok_or_else(|| missing("blip"))?;
                blink.concat(blips)
            }
            AudioCue::Shock { .. } => self.shock.clone().ok_or_else(|| missing("shock"))?,
            AudioCue::Objection { character, .. } => self
                .stings
                .get(&Sting::for_character(*character))
                .cloned()
                .ok_or_else(|| missing("objection"))?,
        };
        Ok(clip.fitted(frames))
    }
}

/// A background track and the frames it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundSpan {
    pub track_id: String,
    pub start_frame: usize,
    pub frames: usize,
}

/// Each `BackgroundTrack` cue opens a span that lasts until the next one.
pub fn background_spans(cues: &[AudioCue]) -> Vec<BackgroundSpan> {
    let mut spans: Vec<BackgroundSpan> = Vec::new();
    let mut cursor = 0;

    for cue in cues {
        match cue {
            AudioCue::BackgroundTrack { track_id } => spans.push(BackgroundSpan {
                track_id: track_id.clone(),
                start_frame: cursor,
                frames: 0,
            }),
            other => {
                let frames = other.frames();
                if let Some(span) = spans.last_mut() {
                    span.frames += frames;
                }
                cursor += frames;
            }
        }
    }

    spans
}

/// Duration of `frames` video frames in milliseconds.
pub fn frames_to_ms(frames: usize, fps: u32) -> f64 {
    frames as f64 * (1000.0 / fps as f64)
}

/// Lays cue audio end to end, frame-exact with the video, and mixes the
/// background music underneath.
pub struct AudioSequencer {
    fps: u32,
    sample_rate: u32,
    channels: u16,
}

impl AudioSequencer {
    pub fn new(fps: u32, sample_rate: u32, channels: u16) -> EngineResult<Self> {
        if fps == 0 {
            return Err(EngineError::config("fps must be at least 1"));
        }
        if sample_rate == 0 {
            return Err(EngineError::config("sample rate must be at least 1 Hz"));
        }
        Ok(Self {
            fps,
            sample_rate,
            channels: channels.max(1),
        })
    }

    /// First sample frame of video frame `frame`.
    pub fn sample_at(&self, frame: usize) -> usize {
        (frame as u64 * self.sample_rate as u64 / self.fps as u64) as usize
    }

    /// The sound-effect track: one fitted clip per cue, back to back.
    pub fn foreground(&self, cues: &[AudioCue], bank: &SoundBank) -> EngineResult<Vec<f32>> {
        let mut out = Vec::new();
        let mut frame = 0;

        for cue in cues.iter().filter(|c| !c.is_background()) {
            let start = self.sample_at(frame);
            frame += cue.frames();
            let len = self.sample_at(frame) - start;
            out.extend(bank.render_cue(cue, len)?.samples);
        }

        Ok(out)
    }

    /// The music track: each span's track placed at its start, looped and trimmed to its length.
    pub fn background(&self, cues: &[AudioCue], bank: &SoundBank) -> EngineResult<Vec<f32>> {
        let total_frames: usize = cues.iter().map(AudioCue::frames).sum();
        let channels = self.channels as usize;
        let mut out = vec![0.0; self.sample_at(total_frames) * channels];

        for span in background_spans(cues) {
            let start = self.sample_at(span.start_frame);
            let len = self.sample_at(span.start_frame + span.frames) - start;
            let music = bank.track(&span.track_id)?.looped(len);
            tracing::debug!(
                track = %span.track_id,
                ms = frames_to_ms(span.frames, self.fps),
                "background span"
            );

            for (dst, src) in out[start * channels..].iter_mut().zip(&music.samples) {
                *dst += *src;
            }
        }

        Ok(out)
    }

    /// Overlay music under the effects, soft-clipped.
    pub fn sequence(&self, cues: &[AudioCue], bank: &SoundBank) -> EngineResult<Vec<f32>> {
        let mut mixed = self.foreground(cues, bank)?;
        let music = self.background(cues, bank)?;

        if mixed.len() != music.len() {
            return Err(EngineError::audio(format!(
                "foreground has {} samples, background {}",
                mixed.len(),
                music.len()
            )));
        }

        for (sample, bg) in mixed.iter_mut().zip(&music) {
            *sample += *bg;
        }

        // Hard clipping prevention (tanh soft clipping)
        for sample in &mut mixed {
            *sample = sample.tanh();
        }

        Ok(mixed)
    }

    /// Export mixed audio to WAV file
    pub fn export(&self, path: &Path, samples: &[f32]) -> EngineResult<()> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };

        let mut writer =
            hound::WavWriter::create(path, spec).context("Failed to create WAV writer")?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample")?;
        }

        writer.finalize().context("Failed to finalize WAV file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RATE: u32 = 1800;

    fn tone(frames: usize, value: f32) -> AudioClip {
        AudioClip::new(vec![value; frames * 2], RATE, 2)
    }

    fn bank() -> SoundBank {
        SoundBank::new(RATE, 2)
            .with_blips(tone(10, 0.1), tone(5, 0.2))
            .with_shock(tone(1000, 0.3))
            .with_sting(Sting::Phoenix, tone(1000, 0.4))
            .with_sting(Sting::Default, tone(1000, 0.5))
            .with_track("03 - Turnabout Courtroom - Trial", tone(700, 0.05))
    }

    #[test]
    fn test_frames_to_ms() {
        assert_eq!(frames_to_ms(18, 18), 1000.0);
        assert!((frames_to_ms(25, 18) - 1388.888).abs() < 0.01);
    }

    #[test]
    fn test_background_spans() {
        let cues = vec![
            AudioCue::Silence { frames: 4 },
            AudioCue::BackgroundTrack {
                track_id: "a".into(),
            },
            AudioCue::Silence { frames: 10 },
            AudioCue::Blip { frames: 20 },
            AudioCue::BackgroundTrack {
                track_id: "b".into(),
            },
            AudioCue::Shock { frames: 5 },
        ];
        assert_eq!(
            background_spans(&cues),
            vec![
                BackgroundSpan {
                    track_id: "a".into(),
                    start_frame: 4,
                    frames: 30
                },
                BackgroundSpan {
                    track_id: "b".into(),
                    start_frame: 34,
                    frames: 5
                },
            ]
        );
    }

    #[test]
    fn test_foreground_is_frame_exact() {
        let seq = AudioSequencer::new(18, RATE, 2).unwrap();
        let cues = vec![
            AudioCue::Blip { frames: 39 },
            AudioCue::Silence { frames: 25 },
            AudioCue::Objection {
                character: Character::Phoenix,
                frames: 22,
            },
            AudioCue::Shock { frames: 25 },
        ];
        let samples = seq.foreground(&cues, &bank()).unwrap();
        // 100 samples per video frame, two channels
        assert_eq!(samples.len(), (39 + 25 + 22 + 25) * 100 * 2);

        // Blink first, then blips, then silence
        assert!((samples[0] - 0.1 * 10f32.powf(-0.5)).abs() < 1e-4);
        assert!(samples[39 * 200..64 * 200].iter().all(|s| *s == 0.0));
        assert_eq!(samples[64 * 200], 0.4);
        assert_eq!(samples[86 * 200], 0.3);
    }

    #[test]
    fn test_zero_fps_is_rejected() {
        match AudioSequencer::new(0, RATE, 2) {
            Err(EngineError::Config(msg)) => assert!(msg.contains("fps")),
            other => panic!("expected a config error, got ok={}", other.is_ok()),
        }
        assert!(AudioSequencer::new(18, 0, 2).is_err());
    }

    #[test]
    fn test_objection_falls_back_to_default_sting() {
        let cue = AudioCue::Objection {
            character: Character::Godot,
            frames: 22,
        };
        let clip = bank().render_cue(&cue, 10).unwrap();
        assert_eq!(clip.samples[0], 0.5);
    }

    #[test]
    fn test_background_trimmed_to_span() {
        let seq = AudioSequencer::new(18, RATE, 2).unwrap();
        let cues = vec![
            AudioCue::BackgroundTrack {
                track_id: "03 - Turnabout Courtroom - Trial".into(),
            },
            AudioCue::Silence { frames: 10 },
            AudioCue::Silence { frames: 20 },
            AudioCue::Silence { frames: 5 },
        ];
        let music = seq.background(&cues, &bank()).unwrap();
        // 35 frames at 18 fps, looped from a shorter clip
        assert_eq!(music.len(), 3500 * 2);
        assert!(music.iter().all(|s| *s == 0.05));
    }

    #[test]
    fn test_missing_track_is_error() {
        let seq = AudioSequencer::new(18, RATE, 2).unwrap();
        let cues = vec![
            AudioCue::BackgroundTrack {
                track_id: "unknown".into(),
            },
            AudioCue::Silence { frames: 1 },
        ];
        assert!(matches!(
            seq.sequence(&cues, &bank()),
            Err(EngineError::Audio(_))
        ));
    }

    #[test]
    fn test_sequence_soft_clips() {
        let seq = AudioSequencer::new(18, RATE, 2).unwrap();
        let loud = SoundBank::new(RATE, 2).with_shock(tone(1000, 5.0));
        let mixed = seq.sequence(&[AudioCue::Shock { frames: 2 }], &loud).unwrap();
        assert!(mixed.iter().all(|s| *s < 1.0));
    }

    #[test]
    fn test_resample_mono_to_stereo() {
        let mono = AudioClip::new(vec![0.1, 0.2, 0.3, 0.4], 4, 1);
        let stereo = mono.resampled(2, 2);
        assert_eq!(stereo.samples, vec![0.1, 0.1, 0.3, 0.3]);
        assert_eq!(stereo.len_frames(), 2);
    }

    #[test]
    fn test_fitted_and_looped() {
        let clip = AudioClip::new(vec![1.0, 2.0], 10, 1);
        assert_eq!(clip.clone().fitted(4).samples, vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(clip.clone().fitted(1).samples, vec![1.0]);
        assert_eq!(clip.looped(5).samples, vec![1.0, 2.0, 1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_load_decodes_only_needed_clips() {
        let temp_dir = TempDir::new().unwrap();
        let sfx = temp_dir.path().join("sfx general");
        std::fs::create_dir_all(&sfx).unwrap();
        for name in ["sfx-blipmale.wav", "sfx-blink.wav"] {
            write_wav(&sfx.join(name), 100);
        }

        let cues = vec![AudioCue::Blip { frames: 3 }, AudioCue::Silence { frames: 2 }];
        let bank = SoundBank::load(temp_dir.path(), &cues, RATE, 2).unwrap();
        assert!(bank.render_cue(&cues[0], 10).is_ok());

        let shock = vec![AudioCue::Shock { frames: 3 }];
        let err = SoundBank::load(temp_dir.path(), &shock, RATE, 2).unwrap_err();
        assert!(matches!(err, EngineError::AssetNotFound { .. }));
    }

    #[test]
    fn test_export_and_decode_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mix.wav");
        let seq = AudioSequencer::new(18, RATE, 2).unwrap();
        seq.export(&path, &[0.0, 0.5, -0.5, 0.25]).unwrap();

        let clip = AudioDecoder::decode(&path).unwrap();
        assert_eq!(clip.sample_rate, RATE);
        assert_eq!(clip.channels, 2);
        assert_eq!(clip.samples, vec![0.0, 0.5, -0.5, 0.25]);
    }

    fn write_wav(path: &Path, frames: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample(((i % 20) as i16 - 10) * 500).unwrap();
        }
        writer.finalize().unwrap();
    }
}
