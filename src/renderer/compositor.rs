use crate::error::{EngineError, EngineResult};
use crate::renderer::element::{Layer, VisualElement};
use crate::renderer::FrameBuffer;
use rayon::prelude::*;

/// Layer compositor
pub struct SceneComposer;

impl SceneComposer {
    /// Composite `frame_count` canvases for scene frames
    /// `start_frame..start_frame + frame_count`.
    ///
    /// Sprites see the scene frame index; labels see a local counter that
    /// starts at 0 for the sub-scene. Frames are independent, so they are
    /// rendered in parallel and returned in order.
    pub fn compose(
        layers: &[Layer],
        frame_count: usize,
        start_frame: usize,
    ) -> EngineResult<Vec<FrameBuffer>> {
        Self::check_layers(layers)?;

        (0..frame_count)
            .into_par_iter()
            .map(|offset| Self::compose_frame(layers, start_frame + offset, offset))
            .collect()
    }

    /// Render one canvas, back to front.
    pub fn compose_frame(
        layers: &[Layer],
        scene_frame: usize,
        label_frame: usize,
    ) -> EngineResult<FrameBuffer> {
        let mut canvas: Option<FrameBuffer> = None;
        for layer in layers {
            let local = if layer.element.is_label() {
                label_frame
            } else {
                scene_frame
            };
            canvas = Some(layer.element.render(canvas, local, &layer.options)?);
        }
        canvas.ok_or_else(|| EngineError::composition("sub-scene has no layers"))
    }

    fn check_layers(layers: &[Layer]) -> EngineResult<()> {
        match layers.first() {
            None => Err(EngineError::composition("sub-scene has no layers")),
            Some(Layer {
                element: VisualElement::Label(label),
                ..
            }) => Err(EngineError::composition(format!(
                "first layer must be a background sprite, found label '{}'",
                label.text()
            ))),
            Some(_) => Ok(()),
        }
    }
}
