use crate::coords::{Rect, Vec2};
use crate::paint::Color;
use crate::render::Texture;

use super::NodeId;

/// Membership changes a [`SpriteBatch`](crate::render::SpriteBatch) must react to.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub(crate) struct SpriteChanges {
    /// The texture handle changed: the sprite moves to another group.
    pub texture: bool,
    /// The layer changed: the sprite's group must be re-sorted.
    pub layer: bool,
}

/// A textured quad.
///
/// The quad is `size` wide and centered on its transform origin, shifted by
/// `size * -anchor`. `source` selects the pixel region of the texture that is
/// mapped onto it (or tiled, when `repeats` is set).
#[derive(Debug, Clone)]
pub struct Sprite {
    texture: Option<Texture>,
    size: Vec2,
    anchor: Vec2,
    source: Rect,
    tint: Color,
    repeats: bool,
    layer: u32,
    transform: Option<NodeId>,

    is_dirty: bool,
    changes: SpriteChanges,
}

impl Sprite {
    /// Quad centered on the transform origin.
    pub const ANCHOR_CENTER: Vec2 = Vec2::new(0.0, 0.0);
    /// Transform origin sits on the quad's bottom-left corner.
    pub const ANCHOR_BOTTOM_LEFT: Vec2 = Vec2::new(-0.5, -0.5);
    /// Transform origin sits on the quad's top-left corner.
    pub const ANCHOR_TOP_LEFT: Vec2 = Vec2::new(-0.5, 0.5);

    pub fn new() -> Self {
        Self {
            texture: None,
            size: Vec2::ZERO,
            anchor: Self::ANCHOR_CENTER,
            source: Rect::ZERO,
            tint: Color::WHITE,
            repeats: false,
            layer: 0,
            transform: None,
            is_dirty: true,
            changes: SpriteChanges::default(),
        }
    }

    /// Sprite covering the whole texture at its pixel size.
    pub fn from_texture(texture: Texture) -> Self {
        let mut sprite = Self::new();
        sprite.set_texture(Some(texture));
        sprite
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.set_layer(layer);
        self
    }

    pub fn with_transform(mut self, node: NodeId) -> Self {
        self.set_transform(Some(node));
        self
    }

    pub fn with_size(mut self, size: Vec2) -> Self {
        self.set_size(size);
        self
    }

    pub fn with_anchor(mut self, anchor: Vec2) -> Self {
        self.set_anchor(anchor);
        self
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.set_tint(tint);
        self
    }

    // ── accessors ──────────────────────────────────────────────────────────

    #[inline]
    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    #[inline]
    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    #[inline]
    pub fn source(&self) -> Rect {
        self.source
    }

    #[inline]
    pub fn tint(&self) -> Color {
        self.tint
    }

    #[inline]
    pub fn repeats(&self) -> bool {
        self.repeats
    }

    #[inline]
    pub fn layer(&self) -> u32 {
        self.layer
    }

    #[inline]
    pub fn transform(&self) -> Option<NodeId> {
        self.transform
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    // ── mutators ───────────────────────────────────────────────────────────

    /// Assigns the texture. The first assignment seeds an empty `size` and
    /// `source` from the texture dimensions.
    pub fn set_texture(&mut self, texture: Option<Texture>) {
        if self.texture.as_ref().map(Texture::id) == texture.as_ref().map(Texture::id) {
            return;
        }

        if let Some(t) = &texture {
            if self.size.is_degenerate() {
                self.size = t.size();
            }
            if self.source.is_empty() {
                self.source = Rect::from_size(t.size());
            }
        }

        self.texture = texture;
        self.is_dirty = true;
        self.changes.texture = true;
    }

    pub fn set_size(&mut self, size: Vec2) {
        if self.size != size {
            self.size = size;
            self.is_dirty = true;
        }
    }

    pub fn set_anchor(&mut self, anchor: Vec2) {
        if self.anchor != anchor {
            self.anchor = anchor;
            self.is_dirty = true;
        }
    }

    pub fn set_source(&mut self, source: Rect) {
        if self.source != source {
            self.source = source;
            self.is_dirty = true;
        }
    }

    pub fn set_tint(&mut self, tint: Color) {
        if self.tint != tint {
            self.tint = tint;
            self.is_dirty = true;
        }
    }

    pub fn set_repeats(&mut self, repeats: bool) {
        if self.repeats != repeats {
            self.repeats = repeats;
            self.is_dirty = true;
        }
    }

    pub fn set_layer(&mut self, layer: u32) {
        if self.layer != layer {
            self.layer = layer;
            self.is_dirty = true;
            self.changes.layer = true;
        }
    }

    pub fn set_transform(&mut self, node: Option<NodeId>) {
        if self.transform != node {
            self.transform = node;
            self.is_dirty = true;
        }
    }

    pub(crate) fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub(crate) fn take_changes(&mut self) -> SpriteChanges {
        std::mem::take(&mut self.changes)
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self::new()
    }
}
