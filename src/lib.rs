pub mod assets;
pub mod audio;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod parser;
pub mod renderer;
pub mod script;
pub mod templates;

pub use assets::{AssetCache, AssetStats, MemorySource};
pub use audio::{AudioClip, AudioDecoder, AudioSequencer, SoundBank};
pub use config::AppConfig;
pub use dialogue::{DialogueDirector, DialogueTurn};
pub use error::{EngineError, EngineResult};
pub use parser::ScriptParser;
pub use renderer::{FrameBuffer, RenderEngine, SceneComposer, Timeline, TimelineBuilder};
pub use script::{Action, Character, EmotionClass, Location, Script, ScriptAction, ScriptScene};
