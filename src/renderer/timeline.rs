use crate::assets::AssetCache;
use crate::error::{EngineError, EngineResult};
use crate::parser::ScriptParser;
use crate::renderer::compositor::SceneComposer;
use crate::renderer::element::{Label, LabelSpec, Layer, Sprite, SpriteSpec};
use crate::renderer::FrameBuffer;
use crate::script::{Action, Character, Color, Location, Script, ScriptAction, ScriptScene};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Length of each half of an objection.
pub const OBJECTION_FRAMES: usize = 11;

const TEXTBOX_ASSET: &str = "textbox4.png";
const ARROW_ASSET: &str = "arrow.png";
const OBJECTION_ASSET: &str = "objection.gif";
const DEFAULT_POSE: &str = "normal";

const ARROW_POSITION: (i32, i32) = (235, 170);
const ARROW_SIZE: u32 = 15;
const ARROW_KEY_X: u32 = 5;
const NAME_POSITION: (i32, i32) = (4, 113);
const NAME_FONT_SIZE: u32 = 12;
const DIALOGUE_POSITION: (i32, i32) = (5, 130);
const DIALOGUE_FONT_SIZE: u32 = 15;

/// One audio instruction, in lock-step with the frames it accompanies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AudioCue {
    Silence { frames: usize },
    /// Typewriter blips.
    Blip { frames: usize },
    Shock { frames: usize },
    Objection { character: Character, frames: usize },
    /// Starts a new background music span; occupies no frames itself.
    BackgroundTrack { track_id: String },
}

impl AudioCue {
    pub fn frames(&self) -> usize {
        match self {
            AudioCue::Silence { frames }
            | AudioCue::Blip { frames }
            | AudioCue::Shock { frames }
            | AudioCue::Objection { frames, .. } => *frames,
            AudioCue::BackgroundTrack { .. } => 0,
        }
    }

    pub fn is_background(&self) -> bool {
        matches!(self, AudioCue::BackgroundTrack { .. })
    }
}

/// A frame-producing cue whose length is not yet known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    Silence,
    Blip,
    Shock,
    Objection(Character),
}

impl CueKind {
    pub fn with_frames(self, frames: usize) -> AudioCue {
        match self {
            CueKind::Silence => AudioCue::Silence { frames },
            CueKind::Blip => AudioCue::Blip { frames },
            CueKind::Shock => AudioCue::Shock { frames },
            CueKind::Objection(character) => AudioCue::Objection { character, frames },
        }
    }
}

/// A contiguous run of frames sharing one layer set.
#[derive(Debug, Clone)]
pub struct SubScene {
    pub layers: Vec<Layer>,
    pub length: usize,
    /// Frame index the sprites start animating from.
    pub start_frame: usize,
}

impl SubScene {
    pub fn new(layers: Vec<Layer>, length: usize, start_frame: usize) -> Self {
        Self {
            layers,
            length,
            start_frame,
        }
    }

    pub fn compose(&self) -> EngineResult<Vec<FrameBuffer>> {
        SceneComposer::compose(&self.layers, self.length, self.start_frame)
    }
}

/// Sub-scenes paired with the single cue that covers them.
#[derive(Debug, Clone)]
pub struct Segment {
    sub_scenes: Vec<SubScene>,
    cue: AudioCue,
}

impl Segment {
    /// The cue length is the total length of the sub-scenes.
    pub fn paired(sub_scenes: Vec<SubScene>, kind: CueKind) -> Self {
        let frames = sub_scenes.iter().map(|s| s.length).sum();
        Self {
            sub_scenes,
            cue: kind.with_frames(frames),
        }
    }

    pub fn background(track_id: impl Into<String>) -> Self {
        Self {
            sub_scenes: Vec::new(),
            cue: AudioCue::BackgroundTrack {
                track_id: track_id.into(),
            },
        }
    }

    pub fn sub_scenes(&self) -> &[SubScene] {
        &self.sub_scenes
    }

    pub fn cue(&self) -> &AudioCue {
        &self.cue
    }

    pub fn frame_count(&self) -> usize {
        self.sub_scenes.iter().map(|s| s.length).sum()
    }
}

/// The planned render: every sub-scene and cue in output order.
#[derive(Debug, Clone)]
pub struct Timeline {
    fps: u32,
    segments: Vec<Segment>,
}

impl Timeline {
    pub(crate) fn new(fps: u32, segments: Vec<Segment>) -> Self {
        Self { fps, segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn sub_scenes(&self) -> impl Iterator<Item = &SubScene> {
        self.segments.iter().flat_map(|s| s.sub_scenes.iter())
    }

    pub fn cues(&self) -> Vec<AudioCue> {
        self.segments.iter().map(|s| s.cue.clone()).collect()
    }

    /// Get total frame count
    pub fn total_frames(&self) -> usize {
        self.segments.iter().map(Segment::frame_count).sum()
    }

    /// Get FPS
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Convert frame number to time in seconds
    pub fn frame_to_time(&self, frame: usize) -> f32 {
        frame as f32 / self.fps as f32
    }

    pub fn duration_secs(&self) -> f32 {
        self.frame_to_time(self.total_frames())
    }
}

/// Tunables for planning a timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSettings {
    pub fps: u32,
    /// Settle time after a line finishes, and the default idle length.
    pub lag_frames: usize,
    pub wrap_width: usize,
    /// Font for names and dialogue, relative to the asset root.
    pub font: Option<PathBuf>,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            fps: 18,
            lag_frames: 25,
            wrap_width: 34,
            font: Some(PathBuf::from("igiari/Igiari.ttf")),
        }
    }
}

/// Greedy word wrap.
///
/// A word moves to a new line when appending it would bring the line to
/// `width - 1` characters or more. Words are separated by single spaces and
/// lines by `\n`, so a single-spaced input keeps its length.
pub fn wrap_text(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.graphemes(true).count();
        if line_len > 0 && line_len + 1 + word_len + 1 >= width {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line.push_str(word);
        line_len += word_len;
    }
    if !line.is_empty() {
        lines.push(line);
    }

    lines.join("\n")
}

/// Idle and talking sprites of the current speaker.
struct Speaker {
    character: Character,
    name: Arc<Label>,
    idle: Arc<Sprite>,
    talking: Arc<Sprite>,
}

/// Labels of the most recent line, reused by a following shake.
struct LastLine {
    name: Arc<Label>,
    text: Arc<Label>,
}

/// Fixed art of one scene.
struct Stage {
    background: Arc<Sprite>,
    bench: Option<Arc<Sprite>>,
}

impl Stage {
    /// Background, actor and bench, in that order.
    fn base_layers(&self, actor: Option<&Arc<Sprite>>, shake: bool, repeat: Option<bool>) -> Vec<Layer> {
        let mut layers = vec![Layer::sprite(Arc::clone(&self.background)).shaking(shake)];
        if let Some(actor) = actor {
            layers.push(
                Layer::sprite(Arc::clone(actor))
                    .shaking(shake)
                    .with_repeat(repeat),
            );
        }
        if let Some(bench) = &self.bench {
            layers.push(Layer::sprite(Arc::clone(bench)).shaking(shake));
        }
        layers
    }
}

/// Walks a script and plans every sub-scene and cue, resolving all assets
/// up front. Nothing is composited here.
pub struct TimelineBuilder<'a> {
    cache: &'a mut AssetCache,
    settings: TimelineSettings,
}

impl<'a> TimelineBuilder<'a> {
    pub fn new(cache: &'a mut AssetCache, settings: TimelineSettings) -> Self {
        Self { cache, settings }
    }

    pub fn settings(&self) -> &TimelineSettings {
        &self.settings
    }

    pub fn build(&mut self, script: &Script) -> EngineResult<Timeline> {
        if self.settings.fps == 0 {
            return Err(EngineError::config("fps must be at least 1"));
        }
        ScriptParser::validate_script(script)?;

        let mut segments = Vec::new();
        for (index, scene) in script.scenes.iter().enumerate() {
            let before = segments.len();
            self.build_scene(scene, &mut segments)?;
            let frames: usize = segments[before..].iter().map(Segment::frame_count).sum();
            tracing::info!(
                scene = index + 1,
                location = ?scene.location,
                frames,
                "scene planned"
            );
        }

        let timeline = Timeline::new(self.settings.fps, segments);
        if timeline.total_frames() == 0 {
            return Err(EngineError::invalid_script("script produces no frames"));
        }
        Ok(timeline)
    }

    fn build_scene(&mut self, scene: &ScriptScene, segments: &mut Vec<Segment>) -> EngineResult<()> {
        let stage = self.stage(scene.location)?;

        if let Some(track) = &scene.audio {
            segments.push(Segment::background(track.clone()));
        }

        let mut speaker: Option<Speaker> = None;
        let mut last_line: Option<LastLine> = None;
        let mut cursor = 0usize;

        for action in &scene.actions {
            if let Some(character) = action.character {
                let pose = action.emotion.as_deref().unwrap_or(DEFAULT_POSE);
                speaker = Some(self.speaker(character, pose)?);
            } else if let Some(pose) = &action.emotion {
                let character = speaker
                    .as_ref()
                    .map(|s| s.character)
                    .ok_or_else(|| EngineError::invalid_script("emotion given before any character"))?;
                speaker = Some(self.speaker(character, pose)?);
            }

            let lag = self.settings.lag_frames;
            let segment_start = segments.len();
            match action.action {
                Action::Text | Action::TextWithShake => {
                    let current = speaker
                        .as_ref()
                        .ok_or_else(|| EngineError::invalid_script("dialogue without a speaker"))?;
                    let line = self.line_labels(action, current)?;
                    let shake = action.action == Action::TextWithShake;
                    let textbox = self.textbox(&stage)?;
                    let arrow = self.cache.sprite(&arrow_spec())?;

                    let wrapped_len = line.text.char_count();
                    let speaking = if wrapped_len <= 1 {
                        tracing::warn!(
                            text = line.text.text(),
                            "dialogue too short to animate, holding one frame"
                        );
                        1
                    } else {
                        wrapped_len - 1
                    };

                    let mut talking = stage.base_layers(Some(&current.talking), shake, None);
                    talking.push(Layer::sprite(Arc::clone(&textbox)).shaking(shake));
                    talking.push(Layer::label(Arc::clone(&line.name)));
                    talking.push(Layer::label(Arc::clone(&line.text)).revealing(true));
                    segments.push(Segment::paired(
                        vec![SubScene::new(talking, speaking, cursor)],
                        CueKind::Blip,
                    ));

                    let mut settled = stage.base_layers(Some(&current.idle), false, None);
                    settled.push(Layer::sprite(textbox));
                    settled.push(Layer::label(Arc::clone(&line.name)));
                    settled.push(Layer::label(Arc::clone(&line.text)).revealing(false));
                    settled.push(Layer::sprite(arrow));
                    segments.push(Segment::paired(
                        vec![SubScene::new(settled, lag, speaking)],
                        CueKind::Silence,
                    ));

                    last_line = Some(line);
                    cursor += speaking + lag;
                }
                Action::Shake => {
                    let actor = speaker.as_ref().map(|s| &s.idle);
                    let mut layers = stage.base_layers(actor, true, None);
                    if let Some(line) = &last_line {
                        let textbox = self.textbox(&stage)?;
                        layers.push(Layer::sprite(textbox).shaking(true));
                        layers.push(Layer::label(Arc::clone(&line.name)));
                        layers.push(Layer::label(Arc::clone(&line.text)).revealing(false));
                        layers.push(Layer::sprite(self.cache.sprite(&arrow_spec())?));
                    }
                    segments.push(Segment::paired(
                        vec![SubScene::new(layers, lag, cursor)],
                        CueKind::Shock,
                    ));
                    cursor += lag;
                }
                Action::Objection => {
                    let current = speaker
                        .as_ref()
                        .ok_or_else(|| EngineError::invalid_script("objection without a speaker"))?;
                    let overlay = self.cache.sprite(&SpriteSpec::new(OBJECTION_ASSET))?;

                    let mut flash = stage.base_layers(Some(&current.idle), false, None);
                    flash.push(Layer::sprite(overlay).shaking(true));
                    let after = stage.base_layers(Some(&current.idle), false, None);

                    segments.push(Segment::paired(
                        vec![
                            SubScene::new(flash, OBJECTION_FRAMES, cursor),
                            SubScene::new(after, OBJECTION_FRAMES, cursor),
                        ],
                        CueKind::Objection(current.character),
                    ));
                    cursor += OBJECTION_FRAMES;
                }
                Action::Idle => {
                    let length = action.length.unwrap_or(lag);
                    let actor = speaker.as_ref().map(|s| &s.idle);
                    let layers = stage.base_layers(actor, false, action.repeat);
                    segments.push(Segment::paired(
                        vec![SubScene::new(layers, length, cursor)],
                        CueKind::Silence,
                    ));
                    cursor += length;
                }
            }

            for segment in &segments[segment_start..] {
                tracing::debug!(
                    action = ?action.action,
                    sub_scenes = segment.sub_scenes().len(),
                    cue = ?segment.cue(),
                    cursor,
                    "segment planned"
                );
            }
        }

        Ok(())
    }

    fn stage(&mut self, location: Location) -> EngineResult<Stage> {
        let background = self.cache.sprite(&SpriteSpec::new(location.background_asset()))?;

        let bench = match location.bench() {
            None => None,
            Some(bench) if bench.anchored_to_bottom() => {
                let spec = SpriteSpec::new(bench.asset()).resized(Some(background.width()), None);
                let sized = self.cache.sprite(&spec)?;
                let y = background.height() as i32 - sized.height() as i32;
                Some(self.cache.sprite(&spec.at(0, y))?)
            }
            Some(bench) => Some(self.cache.sprite(&SpriteSpec::new(bench.asset()))?),
        };

        Ok(Stage { background, bench })
    }

    fn textbox(&mut self, stage: &Stage) -> EngineResult<Arc<Sprite>> {
        let spec = SpriteSpec::new(TEXTBOX_ASSET).resized(Some(stage.background.width()), None);
        self.cache.sprite(&spec)
    }

    /// Resolve `<dir>/<stem>-<pose>(a).gif`, falling back to `<dir>/<stem>-<pose>.gif`.
    fn speaker(&mut self, character: Character, pose: &str) -> EngineResult<Speaker> {
        let dir = Path::new(character.sprite_directory());
        let stem = character.file_stem();

        let animated = dir.join(format!("{}-{}(a).gif", stem, pose));
        let (idle_path, talking_path) = if self.cache.exists(&animated) {
            (animated, dir.join(format!("{}-{}(b).gif", stem, pose)))
        } else {
            let still = dir.join(format!("{}-{}.gif", stem, pose));
            if !self.cache.exists(&still) {
                return Err(EngineError::asset_not_found(self.cache.resolve_path(&still)));
            }
            (still.clone(), still)
        };

        let idle = self.cache.sprite(&SpriteSpec::new(idle_path).half_speed())?;
        let talking = self.cache.sprite(&SpriteSpec::new(talking_path).half_speed())?;
        let name_spec = self.name_spec(&character.display_name());
        let name = self.cache.label(&name_spec)?;

        tracing::debug!(character = %character, pose, "speaker resolved");

        Ok(Speaker {
            character,
            name,
            idle,
            talking,
        })
    }

    fn line_labels(&mut self, action: &ScriptAction, speaker: &Speaker) -> EngineResult<LastLine> {
        let text = action.text.as_deref().unwrap_or_default();
        let color = action
            .colour
            .as_deref()
            .and_then(Color::from_hex)
            .unwrap_or_default();

        let spec = LabelSpec::new(wrap_text(text, self.settings.wrap_width))
            .at(DIALOGUE_POSITION.0, DIALOGUE_POSITION.1)
            .font(self.settings.font.clone(), DIALOGUE_FONT_SIZE)
            .color(color)
            .reveal(true);

        let name = match &action.name {
            Some(name) => {
                let name_spec = self.name_spec(name);
                self.cache.label(&name_spec)?
            }
            None => Arc::clone(&speaker.name),
        };

        Ok(LastLine {
            name,
            text: self.cache.label(&spec)?,
        })
    }

    fn name_spec(&self, name: &str) -> LabelSpec {
        LabelSpec::new(name)
            .at(NAME_POSITION.0, NAME_POSITION.1)
            .font(self.settings.font.clone(), NAME_FONT_SIZE)
    }
}

fn arrow_spec() -> SpriteSpec {
    SpriteSpec::new(ARROW_ASSET)
        .at(ARROW_POSITION.0, ARROW_POSITION.1)
        .resized(Some(ARROW_SIZE), Some(ARROW_SIZE))
        .key_x(ARROW_KEY_X, true)
}
