use crate::error::{EngineError, EngineResult};
use crate::renderer::element::{Label, LabelSpec, Sprite, SpriteSpec};
use anyhow::Context;
use fontdue::{Font, FontSettings};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, RgbaImage};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where decoded pixels and raw bytes come from.
pub trait AssetSource {
    fn exists(&self, path: &Path) -> bool;

    /// Decode an image into its frames. Still images yield one frame.
    fn decode_frames(&self, path: &Path) -> EngineResult<Vec<RgbaImage>>;

    fn read_bytes(&self, path: &Path) -> EngineResult<Vec<u8>>;
}

/// Reads assets from disk with the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl AssetSource for FsSource {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn decode_frames(&self, path: &Path) -> EngineResult<Vec<RgbaImage>> {
        if !path.is_file() {
            return Err(EngineError::asset_not_found(path));
        }

        let is_gif = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gif"));

        if is_gif {
            let file = File::open(path)
                .with_context(|| format!("Failed to open image: {}", path.display()))?;
            let decoder =
                GifDecoder::new(BufReader::new(file)).map_err(|e| EngineError::decode(path, e))?;
            let frames = decoder
                .into_frames()
                .collect_frames()
                .map_err(|e| EngineError::decode(path, e))?;
            if !frames.is_empty() {
                return Ok(frames.into_iter().map(|f| f.into_buffer()).collect());
            }
        }

        let image = image::open(path).map_err(|e| EngineError::decode(path, e))?;
        Ok(vec![image.to_rgba8()])
    }

    fn read_bytes(&self, path: &Path) -> EngineResult<Vec<u8>> {
        if !path.is_file() {
            return Err(EngineError::asset_not_found(path));
        }
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read asset: {}", path.display()))?;
        Ok(data)
    }
}

/// Preloaded assets keyed by path. Used for tests and benchmarks.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    images: HashMap<PathBuf, Vec<RgbaImage>>,
    blobs: HashMap<PathBuf, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_frames(&mut self, path: impl Into<PathBuf>, frames: Vec<RgbaImage>) {
        self.images.insert(path.into(), frames);
    }

    pub fn insert_bytes(&mut self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.blobs.insert(path.into(), data);
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>, image: RgbaImage) -> Self {
        self.insert_frames(path, vec![image]);
        self
    }

    pub fn with_frames(mut self, path: impl Into<PathBuf>, frames: Vec<RgbaImage>) -> Self {
        self.insert_frames(path, frames);
        self
    }
}

impl AssetSource for MemorySource {
    fn exists(&self, path: &Path) -> bool {
        self.images.contains_key(path) || self.blobs.contains_key(path)
    }

    fn decode_frames(&self, path: &Path) -> EngineResult<Vec<RgbaImage>> {
        self.images
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::asset_not_found(path))
    }

    fn read_bytes(&self, path: &Path) -> EngineResult<Vec<u8>> {
        self.blobs
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::asset_not_found(path))
    }
}

/// Per-job memo of decoded images, sprites, labels and fonts.
///
/// Identical construction parameters always return the same `Arc`, and each
/// file is decoded at most once for the lifetime of the cache.
pub struct AssetCache {
    source: Box<dyn AssetSource>,
    base_path: PathBuf,
    images: HashMap<PathBuf, Arc<Vec<RgbaImage>>>,
    sprites: HashMap<SpriteSpec, Arc<Sprite>>,
    labels: HashMap<LabelSpec, Arc<Label>>,
    fonts: HashMap<PathBuf, Arc<Font>>,
}

impl AssetCache {
    /// Cache reading from disk, resolving relative paths against `base_path`.
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self::with_source(base_path, FsSource)
    }

    pub fn with_source(base_path: impl AsRef<Path>, source: impl AssetSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            base_path: base_path.as_ref().to_path_buf(),
            images: HashMap::new(),
            sprites: HashMap::new(),
            labels: HashMap::new(),
            fonts: HashMap::new(),
        }
    }

    /// Cache over preloaded assets whose keys are used as-is.
    pub fn in_memory(source: MemorySource) -> Self {
        Self::with_source("", source)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.source.exists(&self.resolve_path(path))
    }

    pub fn sprite(&mut self, spec: &SpriteSpec) -> EngineResult<Arc<Sprite>> {
        if let Some(sprite) = self.sprites.get(spec) {
            return Ok(Arc::clone(sprite));
        }

        let frames = self.frames(&spec.path)?;
        let sprite = Arc::new(Sprite::from_frames(spec.clone(), &frames)?);
        tracing::debug!(
            path = %spec.path.display(),
            frames = sprite.frame_count(),
            "sprite built"
        );
        self.sprites.insert(spec.clone(), Arc::clone(&sprite));
        Ok(sprite)
    }

    pub fn label(&mut self, spec: &LabelSpec) -> EngineResult<Arc<Label>> {
        if let Some(label) = self.labels.get(spec) {
            return Ok(Arc::clone(label));
        }

        let font = match &spec.font {
            Some(path) => Some(self.font(path)?),
            None => None,
        };
        let label = Arc::new(Label::new(spec.clone(), font));
        self.labels.insert(spec.clone(), Arc::clone(&label));
        Ok(label)
    }

    pub fn font(&mut self, path: &Path) -> EngineResult<Arc<Font>> {
        let full_path = self.resolve_path(path);
        if let Some(font) = self.fonts.get(&full_path) {
            return Ok(Arc::clone(font));
        }

        let data = self.source.read_bytes(&full_path)?;
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|e| EngineError::decode(&full_path, e))?;
        let font = Arc::new(font);
        self.fonts.insert(full_path, Arc::clone(&font));
        Ok(font)
    }

    /// Decoded frames shared by every sprite built from `path`.
    fn frames(&mut self, path: &Path) -> EngineResult<Arc<Vec<RgbaImage>>> {
        let full_path = self.resolve_path(path);
        if let Some(frames) = self.images.get(&full_path) {
            return Ok(Arc::clone(frames));
        }

        let frames = Arc::new(self.source.decode_frames(&full_path)?);
        self.images.insert(full_path, Arc::clone(&frames));
        Ok(frames)
    }

    /// Resolve a path relative to the base path
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Get statistics about loaded assets
    pub fn stats(&self) -> AssetStats {
        AssetStats {
            images: self.images.len(),
            sprites: self.sprites.len(),
            labels: self.labels.len(),
            fonts: self.fonts.len(),
        }
    }

    /// Clear all loaded assets from memory
    pub fn clear(&mut self) {
        self.images.clear();
        self.sprites.clear();
        self.labels.clear();
        self.fonts.clear();
    }
}

/// Statistics about loaded assets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetStats {
    pub images: usize,
    pub sprites: usize,
    pub labels: usize,
    pub fonts: usize,
}

impl AssetStats {
    pub fn total(&self) -> usize {
        self.images + self.sprites + self.labels + self.fonts
    }
}

impl std::fmt::Display for AssetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Images: {}, Sprites: {}, Labels: {}, Fonts: {}",
            self.images, self.sprites, self.labels, self.fonts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    fn pixel(color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba(color))
    }

    #[test]
    fn test_same_spec_returns_same_sprite() {
        let source = MemorySource::new().with_image("bg.png", pixel([1, 2, 3, 255]));
        let mut cache = AssetCache::in_memory(source);

        let spec = SpriteSpec::new("bg.png");
        let a = cache.sprite(&spec).unwrap();
        let b = cache.sprite(&spec).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats().sprites, 1);
    }

    #[test]
    fn test_frames_shared_across_placements() {
        let source = MemorySource::new().with_image("arrow.png", pixel([0, 0, 0, 255]));
        let mut cache = AssetCache::in_memory(source);

        cache.sprite(&SpriteSpec::new("arrow.png")).unwrap();
        cache.sprite(&SpriteSpec::new("arrow.png").at(10, 10)).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.images, 1);
        assert_eq!(stats.sprites, 2);
    }

    #[test]
    fn test_missing_sprite_is_asset_not_found() {
        let mut cache = AssetCache::in_memory(MemorySource::new());
        let err = cache.sprite(&SpriteSpec::new("nope.gif")).unwrap_err();
        assert!(matches!(err, EngineError::AssetNotFound { ref path } if path.ends_with("nope.gif")));
    }

    #[test]
    fn test_label_without_font() {
        let mut cache = AssetCache::in_memory(MemorySource::new());
        let spec = LabelSpec::new("Phoenix").at(4, 113);
        let a = cache.label(&spec).unwrap();
        let b = cache.label(&spec).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats().fonts, 0);
    }

    #[test]
    fn test_missing_font_is_asset_not_found() {
        let mut cache = AssetCache::in_memory(MemorySource::new());
        let spec = LabelSpec::new("Hi").font(Some("igiari/Igiari.ttf".into()), 15);
        assert!(matches!(
            cache.label(&spec),
            Err(EngineError::AssetNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_font_bytes_is_decode_error() {
        let mut source = MemorySource::new();
        source.insert_bytes("bad.ttf", b"not a font".to_vec());
        let mut cache = AssetCache::in_memory(source);
        let err = cache.font(Path::new("bad.ttf")).unwrap_err();
        assert!(matches!(err, EngineError::Decode { .. }));
    }

    #[test]
    fn test_fs_source_decodes_png() {
        let temp_dir = TempDir::new().unwrap();
        pixel([10, 20, 30, 255])
            .save(temp_dir.path().join("bg.png"))
            .unwrap();

        let mut cache = AssetCache::new(temp_dir.path());
        assert!(cache.exists(Path::new("bg.png")));
        let sprite = cache.sprite(&SpriteSpec::new("bg.png")).unwrap();
        assert_eq!(sprite.frame_count(), 1);
        assert_eq!((sprite.width(), sprite.height()), (4, 4));
    }

    #[test]
    fn test_fs_source_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = AssetCache::new(temp_dir.path());
        assert!(!cache.exists(Path::new("missing.png")));
        assert!(matches!(
            cache.sprite(&SpriteSpec::new("missing.png")),
            Err(EngineError::AssetNotFound { .. })
        ));
    }

    #[test]
    fn test_fs_source_garbage_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("broken.png"), b"fake image data").unwrap();
        let mut cache = AssetCache::new(temp_dir.path());
        assert!(matches!(
            cache.sprite(&SpriteSpec::new("broken.png")),
            Err(EngineError::Decode { .. })
        ));
    }

    #[test]
    fn test_resolve_path_absolute() {
        let cache = AssetCache::new("/base");
        let abs_path = PathBuf::from("/absolute/path.png");
        assert_eq!(cache.resolve_path(&abs_path), abs_path);
    }

    #[test]
    fn test_resolve_path_relative() {
        let cache = AssetCache::new("/base");
        let resolved = cache.resolve_path(Path::new("relative/path.png"));
        assert_eq!(resolved, PathBuf::from("/base/relative/path.png"));
    }

    #[test]
    fn test_clear_assets() {
        let source = MemorySource::new().with_image("bg.png", pixel([0, 0, 0, 255]));
        let mut cache = AssetCache::in_memory(source);
        cache.sprite(&SpriteSpec::new("bg.png")).unwrap();
        assert_eq!(cache.stats().total(), 2);

        cache.clear();
        assert_eq!(cache.stats().total(), 0);
    }

    #[test]
    fn test_asset_stats_display() {
        let stats = AssetStats {
            images: 5,
            sprites: 7,
            labels: 3,
            fonts: 1,
        };
        let display = format!("{}", stats);
        assert!(display.contains("Images: 5"));
        assert!(display.contains("Sprites: 7"));
        assert!(display.contains("Labels: 3"));
        assert!(display.contains("Fonts: 1"));
        assert_eq!(stats.total(), 16);
    }
}
