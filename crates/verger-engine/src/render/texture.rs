use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Weak};

use thiserror::Error;

use crate::coords::Vec2;

/// Identity of a decoded texture.
///
/// Ids are never reused by a cache, so a texture reloaded after its final
/// release is distinguishable from the evicted one.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureId(u64);

impl TextureId {
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

struct TextureData {
    id: TextureId,
    name: String,
    width: u32,
    height: u32,
    /// Tightly packed RGBA8 rows, top row first. Empty for invalid textures.
    pixels: Vec<u8>,
}

/// Shared handle to decoded texture pixels.
///
/// Cloning is cheap. Equality is by [`TextureId`].
#[derive(Clone)]
pub struct Texture(Arc<TextureData>);

impl Texture {
    fn from_rgba(id: TextureId, name: String, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self(Arc::new(TextureData { id, name, width, height, pixels }))
    }

    fn invalid(id: TextureId, name: String) -> Self {
        Self::from_rgba(id, name, 0, 0, Vec::new())
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.0.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.0.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.0.height
    }

    /// Dimensions in pixels as a vector.
    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.0.width as f32, self.0.height as f32)
    }

    /// False for textures whose source could not be loaded; drawing them is a no-op.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0.width > 0 && self.0.height > 0 && !self.0.pixels.is_empty()
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.0.pixels
    }

    /// Non-owning reference, used by GPU caches to notice when the last handle is gone.
    pub(crate) fn downgrade(&self) -> WeakTexture {
        WeakTexture(Arc::downgrade(&self.0))
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Texture {}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("width", &self.0.width)
            .field("height", &self.0.height)
            .finish()
    }
}

#[derive(Clone)]
pub(crate) struct WeakTexture(Weak<TextureData>);

impl WeakTexture {
    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureError {
    #[error("texture {name:?}: expected {expected} bytes of RGBA8 pixels, got {actual}")]
    PixelLength {
        name: String,
        expected: usize,
        actual: usize,
    },
}

struct CacheEntry {
    texture: Texture,
    refs: usize,
}

/// Reference-counted texture cache keyed by file path (or procedural name).
///
/// Every `load_or_get` / `insert_rgba` must be balanced by a `release`; the
/// entry is dropped when its count reaches zero. Handles held elsewhere stay
/// usable after eviction because the pixels are shared.
#[derive(Default)]
pub struct TextureCache {
    entries: HashMap<String, CacheEntry>,
    next_id: u64,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached texture for `path`, decoding it on first use.
    ///
    /// A file that cannot be opened or decoded yields an invalid texture and a
    /// warning; the entry is still cached so repeated lookups stay cheap.
    pub fn load_or_get(&mut self, path: impl AsRef<Path>) -> Texture {
        let path = path.as_ref();
        let key = path.to_string_lossy().into_owned();

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.refs += 1;
            return entry.texture.clone();
        }

        let id = self.allocate_id();
        let texture = match image::open(path) {
            Ok(decoded) => {
                let rgba = decoded.to_rgba8();
                let (width, height) = rgba.dimensions();
                log::debug!("loaded texture {key:?} ({width}x{height})");
                Texture::from_rgba(id, key.clone(), width, height, rgba.into_raw())
            }
            Err(err) => {
                log::warn!("failed to load texture {key:?}: {err}; sprites using it will not draw");
                Texture::invalid(id, key.clone())
            }
        };

        self.entries.insert(key, CacheEntry { texture: texture.clone(), refs: 1 });
        texture
    }

    /// Registers procedurally generated RGBA8 pixels under `name`.
    ///
    /// If `name` is already cached, the existing texture is returned (and its
    /// count bumped) and `pixels` is ignored.
    pub fn insert_rgba(
        &mut self,
        name: impl Into<String>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Texture, TextureError> {
        let name = name.into();

        if let Some(entry) = self.entries.get_mut(&name) {
            entry.refs += 1;
            return Ok(entry.texture.clone());
        }

        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .unwrap_or(usize::MAX);
        if pixels.len() != expected {
            return Err(TextureError::PixelLength {
                name,
                expected,
                actual: pixels.len(),
            });
        }

        let id = self.allocate_id();
        let texture = Texture::from_rgba(id, name.clone(), width, height, pixels);
        self.entries.insert(name, CacheEntry { texture: texture.clone(), refs: 1 });
        Ok(texture)
    }

    /// Cached texture by key, without touching the reference count.
    pub fn get(&self, name: &str) -> Option<Texture> {
        self.entries.get(name).map(|e| e.texture.clone())
    }

    pub fn ref_count(&self, name: &str) -> usize {
        self.entries.get(name).map_or(0, |e| e.refs)
    }

    /// Drops one reference. Returns true when this evicted the entry.
    ///
    /// Releasing a texture that is no longer cached (or was replaced by a
    /// reload with a new id) is ignored.
    pub fn release(&mut self, texture: &Texture) -> bool {
        let Some(entry) = self.entries.get_mut(texture.name()) else {
            return false;
        };
        if entry.texture.id() != texture.id() {
            return false;
        }

        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs > 0 {
            return false;
        }

        self.entries.remove(texture.name());
        log::debug!("evicted texture {:?}", texture.name());
        true
    }

    fn allocate_id(&mut self) -> TextureId {
        let id = TextureId(self.next_id);
        self.next_id += 1;
        id
    }
}
