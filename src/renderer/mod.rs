pub mod compositor;
pub mod element;
pub mod encoder;
pub mod engine;
pub mod frame_buffer;
pub mod sink;
pub mod timeline;

pub use compositor::SceneComposer;
pub use element::{Label, LabelSpec, Layer, RenderOptions, Sprite, SpriteSpec, VisualElement};
pub use encoder::VideoEncoder;
pub use engine::{RenderEngine, RenderReport};
pub use frame_buffer::FrameBuffer;
pub use sink::{FfmpegWriter, FrameWriter, MemoryWriter, PpmSequenceWriter, VideoSink};
pub use timeline::{AudioCue, Segment, SubScene, Timeline, TimelineBuilder, TimelineSettings};
