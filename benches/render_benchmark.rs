use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgba, RgbaImage};
use objection_engine::renderer::{LabelSpec, Layer, SceneComposer, SpriteSpec};
use objection_engine::{AssetCache, MemorySource};

/// Background, speaker, bench, textbox and a revealing label at courtroom size.
fn dialogue_layers() -> Vec<Layer> {
    let frame = |color: [u8; 4]| RgbaImage::from_pixel(256, 192, Rgba(color));
    let mut cache = AssetCache::in_memory(
        MemorySource::new()
            .with_image("bg.png", frame([30, 30, 60, 255]))
            .with_frames(
                "speaker.gif",
                (0..6).map(|i| frame([i * 40, 120, 80, 200])).collect(),
            )
            .with_image("bench.png", frame([90, 60, 30, 128]))
            .with_image(
                "textbox.png",
                RgbaImage::from_pixel(256, 80, Rgba([0, 0, 0, 180])),
            ),
    );

    let sprite = |cache: &mut AssetCache, spec: SpriteSpec| cache.sprite(&spec).unwrap();
    let label = cache
        .label(&LabelSpec::new("The witness is lying!\nLook at this evidence.").at(5, 130))
        .unwrap();

    vec![
        Layer::sprite(sprite(&mut cache, SpriteSpec::new("bg.png"))),
        Layer::sprite(sprite(&mut cache, SpriteSpec::new("speaker.gif").half_speed())),
        Layer::sprite(sprite(&mut cache, SpriteSpec::new("bench.png"))),
        Layer::sprite(sprite(&mut cache, SpriteSpec::new("textbox.png").at(0, 112))),
        Layer::label(label).revealing(true),
    ]
}

fn bench_compose_sub_scene(c: &mut Criterion) {
    let layers = dialogue_layers();

    c.bench_function("compose_frame_256x192", |b| {
        b.iter(|| SceneComposer::compose_frame(black_box(&layers), black_box(7), black_box(7)).unwrap())
    });

    c.bench_function("compose_sub_scene_40_frames", |b| {
        b.iter(|| SceneComposer::compose(black_box(&layers), 40, 0).unwrap())
    });
}

criterion_group!(benches, bench_compose_sub_scene);
criterion_main!(benches);
