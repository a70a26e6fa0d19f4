//! Texture-batched sprite rendering.
//!
//! Responsibilities:
//! - group sprites by texture; one vertex array + GPU buffer per group
//! - rebuild only the vertex slots of sprites that changed
//! - issue one draw per texture group
//!
//! Ordering policy: within a group sprites are laid out by layer (stable by
//! insertion). Across groups, the layer is encoded in vertex `z` so the depth
//! test keeps higher layers in front regardless of group draw order. Groups
//! are still submitted by lowest layer first so translucent edges blend over
//! what is behind them in the common case.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

use crate::coords::{Mat4, Vec2};
use crate::scene::{DrawOrder, MAX_LAYER, NodeId, RenderState, Sprite, TransformTree};

use super::{Camera, DrawCtx, Renderable, SpriteVertex, Texture, TextureId, VertexBuffer};

new_key_type! {
    /// Handle to a sprite owned by a [`SpriteBatch`].
    pub struct SpriteId;
}

pub const VERTICES_PER_SPRITE: usize = 6;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("sprite has no texture; batched sprites need one to be grouped")]
    MissingTexture,
}

/// Work done by one [`SpriteBatch::build`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub sprites_rebuilt: usize,
    pub groups_rebuilt: usize,
}

struct Entry {
    sprite: Sprite,
    /// `None` while the sprite has no texture (parked, not drawn).
    group: Option<TextureId>,
    /// Insertion order, the tie-breaker for equal layers.
    seq: u64,
    /// Index of the sprite's six vertices inside its group, valid after a rebuild.
    slot: usize,
    /// World matrix the current vertices were written with.
    world: Mat4,
}

struct TextureGroup {
    texture: Texture,
    sprites: Vec<SpriteId>,
    vertices: Vec<SpriteVertex>,
    buffer: Option<VertexBuffer>,
    seq: u64,
    min_layer: u32,
    needs_rebuild: bool,
    needs_upload: bool,
}

impl TextureGroup {
    fn new(texture: Texture, seq: u64) -> Self {
        Self {
            texture,
            sprites: Vec::new(),
            vertices: Vec::new(),
            buffer: None,
            seq,
            min_layer: 0,
            needs_rebuild: true,
            needs_upload: true,
        }
    }
}

/// Owns sprites and draws them with one call per texture.
pub struct SpriteBatch {
    order: DrawOrder,
    hidden: bool,
    sprites: SlotMap<SpriteId, Entry>,
    groups: HashMap<TextureId, TextureGroup>,
    next_seq: u64,
    last_view: Option<Mat4>,
}

impl SpriteBatch {
    pub fn new() -> Self {
        Self {
            order: DrawOrder::new(Some(RenderState::Sprite)),
            hidden: false,
            sprites: SlotMap::with_key(),
            groups: HashMap::new(),
            next_seq: 0,
            last_view: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn contains(&self, id: SpriteId) -> bool {
        self.sprites.contains_key(id)
    }

    pub fn draw_order_mut(&mut self) -> &mut DrawOrder {
        &mut self.order
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// Adds a sprite. Sprites without a texture are rejected and the batch is unchanged.
    pub fn add(&mut self, mut sprite: Sprite) -> Result<SpriteId, BatchError> {
        let Some(texture) = sprite.texture().cloned() else {
            return Err(BatchError::MissingTexture);
        };
        sprite.take_changes();

        let seq = self.bump_seq();
        let id = self.sprites.insert(Entry {
            sprite,
            group: Some(texture.id()),
            seq,
            slot: 0,
            world: Mat4::IDENTITY,
        });
        self.attach(id, texture);
        Ok(id)
    }

    /// Removes a sprite and returns it. Emptied groups are dropped with their buffer.
    pub fn remove(&mut self, id: SpriteId) -> Option<Sprite> {
        let entry = self.sprites.remove(id)?;
        if let Some(group) = entry.group {
            self.detach(id, group);
        }
        Some(entry.sprite)
    }

    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.get(id).map(|e| &e.sprite)
    }

    /// Mutable access. Texture and layer changes are applied when the guard drops.
    pub fn sprite_mut(&mut self, id: SpriteId) -> Option<SpriteMut<'_>> {
        if !self.sprites.contains_key(id) {
            return None;
        }
        Some(SpriteMut { batch: self, id })
    }

    pub fn ids(&self) -> impl Iterator<Item = SpriteId> + '_ {
        self.sprites.keys()
    }

    /// Current vertices of a group, in draw order.
    pub fn group_vertices(&self, texture: TextureId) -> Option<&[SpriteVertex]> {
        self.groups.get(&texture).map(|g| g.vertices.as_slice())
    }

    /// The six vertices of `id` as of the last build.
    pub fn sprite_vertices(&self, id: SpriteId) -> Option<&[SpriteVertex]> {
        let entry = self.sprites.get(id)?;
        let group = self.groups.get(&entry.group?)?;
        if group.needs_rebuild {
            return None;
        }
        let start = entry.slot * VERTICES_PER_SPRITE;
        group.vertices.get(start..start + VERTICES_PER_SPRITE)
    }

    /// Brings every group's vertices up to date with its sprites, the
    /// transform tree (resolved for this pass) and the camera view.
    ///
    /// A sprite is rewritten whenever its world matrix differs from the one
    /// its vertices were built with, so moves made while the batch was hidden
    /// or not rendered, and removed nodes, are still picked up.
    pub fn build(&mut self, camera: &dyn Camera, transforms: &TransformTree) -> BuildStats {
        let view = camera.view();
        let view_changed = self.last_view != Some(view);
        self.last_view = Some(view);

        let mut stats = BuildStats::default();
        let Self { sprites, groups, .. } = self;

        for group in groups.values_mut() {
            if group.needs_rebuild {
                group.sprites.sort_by_key(|id| {
                    let e = &sprites[*id];
                    (e.sprite.layer(), e.seq)
                });
                group.min_layer = group
                    .sprites
                    .first()
                    .map_or(0, |id| sprites[*id].sprite.layer());
                group
                    .vertices
                    .resize(group.sprites.len() * VERTICES_PER_SPRITE, SpriteVertex::default());

                for (slot, id) in group.sprites.iter().enumerate() {
                    let entry = &mut sprites[*id];
                    entry.slot = slot;
                    entry.world = world_of(&entry.sprite, transforms);
                    write_quad(slot_mut(&mut group.vertices, slot), &entry.sprite, entry.world, view);
                    entry.sprite.mark_clean();
                }

                stats.sprites_rebuilt += group.sprites.len();
                stats.groups_rebuilt += 1;
                group.needs_rebuild = false;
                group.needs_upload = true;
                continue;
            }

            for id in &group.sprites {
                let entry = &mut sprites[*id];
                let world = world_of(&entry.sprite, transforms);
                if !(view_changed || world != entry.world || entry.sprite.is_dirty()) {
                    continue;
                }
                entry.world = world;
                write_quad(slot_mut(&mut group.vertices, entry.slot), &entry.sprite, world, view);
                entry.sprite.mark_clean();
                stats.sprites_rebuilt += 1;
                group.needs_upload = true;
            }
        }

        if stats.sprites_rebuilt > 0 {
            log::trace!(
                "sprite batch: rebuilt {} sprites ({} full groups)",
                stats.sprites_rebuilt,
                stats.groups_rebuilt
            );
        }
        stats
    }

    // ── membership ────────────────────────────────────────────────────────

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn attach(&mut self, id: SpriteId, texture: Texture) {
        let seq = self.bump_seq();
        let group = self
            .groups
            .entry(texture.id())
            .or_insert_with(|| TextureGroup::new(texture, seq));
        group.sprites.push(id);
        group.needs_rebuild = true;
    }

    fn detach(&mut self, id: SpriteId, texture: TextureId) {
        let Some(group) = self.groups.get_mut(&texture) else {
            return;
        };
        group.sprites.retain(|s| *s != id);
        group.needs_rebuild = true;
        if group.sprites.is_empty() {
            self.groups.remove(&texture);
            log::trace!("sprite batch: dropped empty group for {texture:?}");
        }
    }

    fn apply_changes(&mut self, id: SpriteId) {
        let Some(entry) = self.sprites.get_mut(id) else {
            return;
        };
        let changes = entry.sprite.take_changes();
        let current = entry.group;
        let texture = entry.sprite.texture().cloned();

        if changes.texture && current != texture.as_ref().map(Texture::id) {
            entry.group = texture.as_ref().map(Texture::id);
            if let Some(previous) = current {
                self.detach(id, previous);
            }
            match texture {
                Some(texture) => self.attach(id, texture),
                None => log::debug!("sprite {id:?} lost its texture; not drawn until one is set"),
            }
            return;
        }

        if changes.layer {
            if let Some(group) = current.and_then(|g| self.groups.get_mut(&g)) {
                group.needs_rebuild = true;
            }
        }
    }
}

impl Default for SpriteBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderable for SpriteBatch {
    fn draw_order(&self) -> &DrawOrder {
        &self.order
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn render(&mut self, ctx: &mut DrawCtx<'_>) {
        self.build(ctx.camera, ctx.transforms);

        let mut groups: Vec<&mut TextureGroup> = self.groups.values_mut().collect();
        groups.sort_by_key(|g| (g.min_layer, g.seq));

        for group in groups {
            if group.sprites.is_empty() || !group.texture.is_valid() {
                continue;
            }

            let len = group.vertices.len();
            if group.buffer.as_ref().is_none_or(|b| b.capacity() != len) {
                group.buffer = Some(ctx.backend.create_vertex_buffer("verger sprite group vbo", len));
                group.needs_upload = true;
            }
            let Some(buffer) = group.buffer.as_ref() else {
                continue;
            };

            if group.needs_upload {
                ctx.backend.upload_vertices(buffer, &group.vertices);
                group.needs_upload = false;
            }
            ctx.backend.draw(buffer, &group.texture, 0..len as u32);
        }
    }
}

/// Guard returned by [`SpriteBatch::sprite_mut`].
pub struct SpriteMut<'a> {
    batch: &'a mut SpriteBatch,
    id: SpriteId,
}

impl Deref for SpriteMut<'_> {
    type Target = Sprite;

    fn deref(&self) -> &Sprite {
        &self.batch.sprites[self.id].sprite
    }
}

impl DerefMut for SpriteMut<'_> {
    fn deref_mut(&mut self) -> &mut Sprite {
        &mut self.batch.sprites[self.id].sprite
    }
}

impl Drop for SpriteMut<'_> {
    fn drop(&mut self) {
        self.batch.apply_changes(self.id);
    }
}

// ── vertex generation ─────────────────────────────────────────────────────

fn slot_mut(vertices: &mut [SpriteVertex], slot: usize) -> &mut [SpriteVertex] {
    let start = slot * VERTICES_PER_SPRITE;
    &mut vertices[start..start + VERTICES_PER_SPRITE]
}

/// Maps a sprite layer to a depth in `[0, 1)`, higher layers nearer the camera.
fn layer_z(layer: u32) -> f32 {
    layer.min(MAX_LAYER) as f32 / (MAX_LAYER + 1) as f32
}

fn world_of(sprite: &Sprite, transforms: &TransformTree) -> Mat4 {
    sprite.transform().map_or(Mat4::IDENTITY, |n| transforms.world(n))
}

/// Writes two clockwise triangles: tl, br, bl, tl, tr, br.
fn write_quad(out: &mut [SpriteVertex], sprite: &Sprite, world: Mat4, view: Mat4) {
    let model_view = view * world;

    let size = sprite.size();
    let half = size * 0.5;
    let offset = size.mul_elem(-sprite.anchor());
    let z = layer_z(sprite.layer());

    let corner = |x: f32, y: f32| model_view.transform_point3([offset.x + x, offset.y + y, z]);
    let tl = corner(-half.x, half.y);
    let tr = corner(half.x, half.y);
    let bl = corner(-half.x, -half.y);
    let br = corner(half.x, -half.y);

    let [uv_tl, uv_br, uv_bl, uv_tr] = texture_coords(sprite);
    let color = sprite.tint().to_array();

    let quad = [(tl, uv_tl), (br, uv_br), (bl, uv_bl), (tl, uv_tl), (tr, uv_tr), (br, uv_br)];
    for (v, (position, uv)) in out.iter_mut().zip(quad) {
        *v = SpriteVertex { position, color, uv };
    }
}

/// Texture coordinates `[tl, br, bl, tr]` sampling texel centers of the
/// source region, scaled for tiling when the sprite repeats.
fn texture_coords(sprite: &Sprite) -> [[f32; 2]; 4] {
    let Some(texture) = sprite.texture().filter(|t| t.is_valid()) else {
        return [[0.0; 2]; 4];
    };

    let source = sprite.source();
    let tex_w = 2.0 * texture.width() as f32;
    let tex_h = 2.0 * texture.height() as f32;

    let repeat = if sprite.repeats() && !source.is_empty() {
        Vec2::new(sprite.size().x / source.size.x, sprite.size().y / source.size.y)
    } else {
        Vec2::ONE
    };

    let u0 = (2.0 * source.origin.x + 1.0) / tex_w * repeat.x;
    let v0 = (2.0 * source.origin.y + 1.0) / tex_h * repeat.y;
    let u1 = (2.0 * source.origin.x + 1.0 + 2.0 * source.size.x - 2.0) / tex_w * repeat.x;
    let v1 = (2.0 * source.origin.y + 1.0 + 2.0 * source.size.y - 2.0) / tex_h * repeat.y;

    [[u0, v0], [u1, v1], [u0, v1], [u1, v0]]
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::coords::Rect;
    use crate::paint::Color;
    use crate::render::OrthographicCamera;
    use crate::render::test_support::{missing, solid};
    use crate::render::testing::{Call, RecordingBackend};
    use crate::scene::TransformNode;

    fn camera() -> OrthographicCamera {
        OrthographicCamera::new(800.0, 600.0)
    }

    fn render(batch: &mut SpriteBatch, transforms: &TransformTree, backend: &mut RecordingBackend) {
        let camera = camera();
        let mut ctx = DrawCtx { backend, camera: &camera, transforms };
        batch.render(&mut ctx);
    }

    fn snapshot(batch: &SpriteBatch, ids: &[SpriteId]) -> Vec<Vec<SpriteVertex>> {
        ids.iter().map(|id| batch.sprite_vertices(*id).unwrap().to_vec()).collect()
    }

    // ── membership ───────────────────────────────────────────────────────

    #[test]
    fn add_without_texture_leaves_batch_untouched() {
        let mut batch = SpriteBatch::new();
        assert_eq!(batch.add(Sprite::new()), Err(BatchError::MissingTexture));
        assert!(batch.is_empty());
        assert_eq!(batch.group_count(), 0);
    }

    #[test]
    fn vertex_count_tracks_membership() {
        let (a, b) = (solid(1, 8, 8), solid(2, 8, 8));
        let mut batch = SpriteBatch::new();
        let transforms = TransformTree::new();
        let ids: Vec<SpriteId> = (0..3).map(|_| batch.add(Sprite::from_texture(a.clone())).unwrap()).collect();
        batch.add(Sprite::from_texture(b.clone())).unwrap();

        batch.build(&camera(), &transforms);
        assert_eq!(batch.group_vertices(a.id()).unwrap().len(), 18);
        assert_eq!(batch.group_vertices(b.id()).unwrap().len(), 6);

        batch.remove(ids[1]);
        batch.build(&camera(), &transforms);
        assert_eq!(batch.group_vertices(a.id()).unwrap().len(), 12);
        assert!(batch.sprite_vertices(ids[2]).is_some());
    }

    #[test]
    fn texture_reassignment_moves_sprite_between_groups() {
        let (a, b) = (solid(1, 8, 8), solid(2, 8, 8));
        let mut batch = SpriteBatch::new();
        let transforms = TransformTree::new();
        let mut backend = RecordingBackend::default();
        let keep = batch.add(Sprite::from_texture(a.clone())).unwrap();
        let mover = batch.add(Sprite::from_texture(a.clone())).unwrap();
        render(&mut batch, &transforms, &mut backend);
        backend.clear_log();

        batch.sprite_mut(mover).unwrap().set_texture(Some(b.clone()));
        render(&mut batch, &transforms, &mut backend);

        assert_eq!(batch.group_count(), 2);
        assert_eq!(batch.group_vertices(a.id()).unwrap().len(), 6);
        assert_eq!(batch.group_vertices(b.id()).unwrap().len(), 6);
        assert_eq!(backend.count(|c| matches!(c, Call::CreateBuffer { .. })), 2);
        assert!(batch.sprite_vertices(keep).is_some());
    }

    #[test]
    fn removing_last_sprite_drops_group() {
        let a = solid(1, 4, 4);
        let mut batch = SpriteBatch::new();
        let id = batch.add(Sprite::from_texture(a.clone())).unwrap();
        assert!(batch.remove(id).is_some());
        assert_eq!(batch.group_count(), 0);
        assert!(batch.remove(id).is_none());
    }

    #[test]
    fn clearing_texture_parks_sprite() {
        let a = solid(1, 4, 4);
        let mut batch = SpriteBatch::new();
        let id = batch.add(Sprite::from_texture(a.clone())).unwrap();

        batch.sprite_mut(id).unwrap().set_texture(None);
        assert_eq!(batch.group_count(), 0);
        assert!(batch.contains(id));

        batch.sprite_mut(id).unwrap().set_texture(Some(a.clone()));
        assert_eq!(batch.group_count(), 1);
    }

    // ── rebuild locality ─────────────────────────────────────────────────

    #[test]
    fn only_dirty_sprites_are_rebuilt() {
        let a = solid(1, 8, 8);
        let mut batch = SpriteBatch::new();
        let transforms = TransformTree::new();
        let ids: Vec<SpriteId> = (0..5).map(|_| batch.add(Sprite::from_texture(a.clone())).unwrap()).collect();
        let first = batch.build(&camera(), &transforms);
        assert_eq!(first, BuildStats { sprites_rebuilt: 5, groups_rebuilt: 1 });
        let before = snapshot(&batch, &ids);

        batch.sprite_mut(ids[1]).unwrap().set_tint(Color::BLACK);
        batch.sprite_mut(ids[3]).unwrap().set_tint(Color::BLACK);
        let stats = batch.build(&camera(), &transforms);
        assert_eq!(stats, BuildStats { sprites_rebuilt: 2, groups_rebuilt: 0 });

        let after = snapshot(&batch, &ids);
        let changed: Vec<usize> = (0..5).filter(|i| before[*i] != after[*i]).collect();
        assert_eq!(changed, [1, 3]);
    }

    #[test]
    fn invalidated_transform_rebuilds_its_sprite() {
        let a = solid(1, 8, 8);
        let mut transforms = TransformTree::new();
        let moving = transforms.insert(TransformNode::new());
        let still = transforms.insert(TransformNode::new());
        let mut batch = SpriteBatch::new();
        let m = batch.add(Sprite::from_texture(a.clone()).with_transform(moving)).unwrap();
        batch.add(Sprite::from_texture(a.clone()).with_transform(still)).unwrap();
        transforms.resolve_all();
        batch.build(&camera(), &transforms);

        transforms.get_mut(moving).unwrap().set_position(Vec2::new(10.0, 0.0));
        transforms.resolve_all();
        let stats = batch.build(&camera(), &transforms);

        assert_eq!(stats.sprites_rebuilt, 1);
        assert_relative_eq!(batch.sprite_vertices(m).unwrap()[0].position[0], 6.0);
    }

    #[test]
    fn move_while_hidden_is_picked_up_on_next_build() {
        let a = solid(1, 8, 8);
        let mut transforms = TransformTree::new();
        let node = transforms.insert(TransformNode::new());
        let mut batch = SpriteBatch::new();
        let id = batch.add(Sprite::from_texture(a).with_transform(node)).unwrap();
        transforms.resolve_all();
        batch.build(&camera(), &transforms);
        assert_relative_eq!(batch.sprite_vertices(id).unwrap()[0].position[0], -4.0);

        // Frame where the batch is skipped: the node moves and resolves without a build.
        transforms.get_mut(node).unwrap().set_position(Vec2::new(100.0, 0.0));
        transforms.resolve_all();

        transforms.resolve_all();
        assert!(!transforms.was_invalidated(node));
        let stats = batch.build(&camera(), &transforms);
        assert_eq!(stats.sprites_rebuilt, 1);
        assert_relative_eq!(batch.sprite_vertices(id).unwrap()[0].position[0], 96.0);
    }

    #[test]
    fn removed_node_falls_back_to_identity() {
        let a = solid(1, 8, 8);
        let mut transforms = TransformTree::new();
        let node = transforms.insert(TransformNode::new().with_position(Vec2::new(50.0, 0.0)));
        let mut batch = SpriteBatch::new();
        let id = batch.add(Sprite::from_texture(a).with_transform(node)).unwrap();
        transforms.resolve_all();
        batch.build(&camera(), &transforms);
        assert_relative_eq!(batch.sprite_vertices(id).unwrap()[0].position[0], 46.0);

        transforms.remove(node);
        transforms.resolve_all();
        assert_eq!(batch.build(&camera(), &transforms).sprites_rebuilt, 1);
        assert_relative_eq!(batch.sprite_vertices(id).unwrap()[0].position[0], -4.0);
    }

    #[test]
    fn camera_pan_rebuilds_everything() {
        let a = solid(1, 8, 8);
        let mut batch = SpriteBatch::new();
        let transforms = TransformTree::new();
        for _ in 0..3 {
            batch.add(Sprite::from_texture(a.clone())).unwrap();
        }
        let mut cam = camera();
        batch.build(&cam, &transforms);
        assert_eq!(batch.build(&cam, &transforms).sprites_rebuilt, 0);

        cam.set_position(Vec2::new(5.0, 5.0));
        assert_eq!(batch.build(&cam, &transforms).sprites_rebuilt, 3);
    }

    // ── geometry ─────────────────────────────────────────────────────────

    #[test]
    fn quad_is_centered_and_clockwise() {
        let a = solid(1, 4, 4);
        let mut batch = SpriteBatch::new();
        let id = batch.add(Sprite::from_texture(a).with_size(Vec2::new(10.0, 20.0))).unwrap();
        batch.build(&camera(), &TransformTree::new());

        let xy: Vec<[f32; 2]> = batch
            .sprite_vertices(id)
            .unwrap()
            .iter()
            .map(|v| [v.position[0], v.position[1]])
            .collect();
        assert_eq!(
            xy,
            [[-5.0, 10.0], [5.0, -10.0], [-5.0, -10.0], [-5.0, 10.0], [5.0, 10.0], [5.0, -10.0]]
        );
    }

    #[test]
    fn bottom_left_anchor_puts_origin_on_corner() {
        let a = solid(1, 4, 4);
        let mut batch = SpriteBatch::new();
        let sprite = Sprite::from_texture(a)
            .with_size(Vec2::new(10.0, 20.0))
            .with_anchor(Sprite::ANCHOR_BOTTOM_LEFT);
        let id = batch.add(sprite).unwrap();
        batch.build(&camera(), &TransformTree::new());

        let bl = batch.sprite_vertices(id).unwrap()[2].position;
        let tr = batch.sprite_vertices(id).unwrap()[4].position;
        assert_eq!([bl[0], bl[1]], [0.0, 0.0]);
        assert_eq!([tr[0], tr[1]], [10.0, 20.0]);
    }

    #[test]
    fn uvs_sample_texel_centers() {
        let a = solid(1, 4, 4);
        let mut batch = SpriteBatch::new();
        let id = batch.add(Sprite::from_texture(a)).unwrap();
        batch.build(&camera(), &TransformTree::new());

        let v = batch.sprite_vertices(id).unwrap();
        assert_eq!(v[0].uv, [0.125, 0.125]);
        assert_eq!(v[1].uv, [0.875, 0.875]);
        assert_eq!(v[4].uv, [0.875, 0.125]);
    }

    #[test]
    fn repeating_sprite_scales_uvs_by_tile_count() {
        let a = solid(1, 4, 4);
        let mut batch = SpriteBatch::new();
        let mut sprite = Sprite::from_texture(a).with_size(Vec2::new(12.0, 8.0));
        sprite.set_source(Rect::new(0.0, 0.0, 4.0, 4.0));
        sprite.set_repeats(true);
        let id = batch.add(sprite).unwrap();
        batch.build(&camera(), &TransformTree::new());

        let br = batch.sprite_vertices(id).unwrap()[1].uv;
        assert_relative_eq!(br[0], 0.875 * 3.0);
        assert_relative_eq!(br[1], 0.875 * 2.0);
    }

    #[test]
    fn layers_order_group_and_depth() {
        let a = solid(1, 4, 4);
        let mut batch = SpriteBatch::new();
        let high = batch.add(Sprite::from_texture(a.clone()).with_layer(2)).unwrap();
        let low = batch.add(Sprite::from_texture(a.clone()).with_layer(1)).unwrap();
        batch.build(&camera(), &TransformTree::new());

        let group = batch.group_vertices(a.id()).unwrap();
        assert_eq!(group[0].position[2], layer_z(1));
        assert_eq!(group[6].position[2], layer_z(2));
        assert!(layer_z(2) > layer_z(1));

        batch.sprite_mut(low).unwrap().set_layer(3);
        batch.build(&camera(), &TransformTree::new());
        assert_eq!(batch.sprite_vertices(high).unwrap()[0].position[2], layer_z(2));
        assert_eq!(batch.group_vertices(a.id()).unwrap()[6].position[2], layer_z(3));
    }

    // ── drawing ──────────────────────────────────────────────────────────

    #[test]
    fn one_draw_per_texture_group() {
        let (a, b) = (solid(1, 4, 4), solid(2, 4, 4));
        let mut batch = SpriteBatch::new();
        let transforms = TransformTree::new();
        for i in 0..6 {
            let texture = if i % 2 == 0 { a.clone() } else { b.clone() };
            batch.add(Sprite::from_texture(texture)).unwrap();
        }

        let mut backend = RecordingBackend::default();
        render(&mut batch, &transforms, &mut backend);
        assert_eq!(backend.draws(), [(a.id(), 0..18), (b.id(), 0..18)]);
        assert_eq!(backend.count(|c| matches!(c, Call::Upload { .. })), 2);

        backend.clear_log();
        render(&mut batch, &transforms, &mut backend);
        assert_eq!(backend.draws().len(), 2);
        assert_eq!(backend.count(|c| matches!(c, Call::Upload { .. })), 0);
        assert_eq!(backend.count(|c| matches!(c, Call::CreateBuffer { .. })), 0);
    }

    #[test]
    fn groups_draw_lowest_layer_first() {
        let (a, b) = (solid(1, 4, 4), solid(2, 4, 4));
        let mut batch = SpriteBatch::new();
        batch.add(Sprite::from_texture(a.clone()).with_layer(5)).unwrap();
        batch.add(Sprite::from_texture(b.clone()).with_layer(1)).unwrap();

        let mut backend = RecordingBackend::default();
        render(&mut batch, &TransformTree::new(), &mut backend);
        let order: Vec<TextureId> = backend.draws().into_iter().map(|(t, _)| t).collect();
        assert_eq!(order, [b.id(), a.id()]);
    }

    #[test]
    fn invalid_texture_group_is_skipped() {
        let mut batch = SpriteBatch::new();
        batch.add(Sprite::from_texture(missing(9))).unwrap();
        batch.add(Sprite::from_texture(solid(1, 4, 4))).unwrap();

        let mut backend = RecordingBackend::default();
        render(&mut batch, &TransformTree::new(), &mut backend);
        assert_eq!(backend.draws().len(), 1);
    }
}
