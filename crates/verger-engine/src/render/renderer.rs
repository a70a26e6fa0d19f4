use std::sync::Arc;

use parking_lot::Mutex;

use crate::scene::{DrawOrder, DrawOrderKey, RenderState, TransformTree};

use super::{Camera, RenderBackend};

/// Everything a renderable may touch while drawing.
pub struct DrawCtx<'a> {
    pub backend: &'a mut dyn RenderBackend,
    pub camera: &'a dyn Camera,
    pub transforms: &'a TransformTree,
}

/// Something the [`Renderer`] can sort and draw.
pub trait Renderable {
    fn draw_order(&self) -> &DrawOrder;

    fn is_hidden(&self) -> bool {
        false
    }

    fn render(&mut self, ctx: &mut DrawCtx<'_>);
}

/// Shared handle the renderer tracks. Identity is the allocation.
pub type SharedRenderable = Arc<Mutex<dyn Renderable + Send>>;

/// Per-pass counters.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RenderStats {
    pub rendered: usize,
    pub hidden: usize,
    pub state_changes: usize,
}

/// Draws tracked renderables in [`DrawOrderKey`] order, switching render
/// state only when consecutive items need different states.
#[derive(Default)]
pub struct Renderer {
    live: Mutex<Vec<SharedRenderable>>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.lock().is_empty()
    }

    pub fn contains(&self, item: &SharedRenderable) -> bool {
        self.live.lock().iter().any(|i| Arc::ptr_eq(i, item))
    }

    /// Adds `item` to the live set. Returns false if it was already tracked.
    pub fn track(&self, item: SharedRenderable) -> bool {
        let mut live = self.live.lock();
        if live.iter().any(|i| Arc::ptr_eq(i, &item)) {
            return false;
        }
        live.push(item);
        true
    }

    /// Removes `item` from the live set. Returns false if it was not tracked.
    pub fn untrack(&self, item: &SharedRenderable) -> bool {
        let mut live = self.live.lock();
        let before = live.len();
        live.retain(|i| !Arc::ptr_eq(i, item));
        live.len() != before
    }

    /// Runs one pass: sort, clear, draw visible items, restore state.
    ///
    /// The live set is locked only while sorting and copying it; items tracked
    /// or untracked by a render step take effect on the next pass.
    pub fn render(
        &self,
        camera: &dyn Camera,
        backend: &mut dyn RenderBackend,
        transforms: &TransformTree,
    ) -> RenderStats {
        let snapshot = {
            let mut live = self.live.lock();
            sort_by_draw_order(&mut live);
            live.clone()
        };

        camera.clear(backend);
        backend.set_projection(camera.projection());

        let mut stats = RenderStats::default();
        let mut active: Option<RenderState> = None;
        let mut ctx = DrawCtx { backend, camera, transforms };

        for item in &snapshot {
            let mut item = item.lock();
            if item.is_hidden() {
                stats.hidden += 1;
                continue;
            }

            if let Some(wanted) = item.draw_order().render_state() {
                if active != Some(wanted) {
                    if let Some(previous) = active.take() {
                        ctx.backend.deactivate(previous);
                    }
                    ctx.backend.activate(wanted);
                    active = Some(wanted);
                    stats.state_changes += 1;
                }
            }

            item.render(&mut ctx);
            stats.rendered += 1;
        }

        if let Some(previous) = active {
            ctx.backend.deactivate(previous);
        }

        log::trace!(
            "render pass: {} drawn, {} hidden, {} state changes",
            stats.rendered,
            stats.hidden,
            stats.state_changes
        );
        stats
    }
}

/// Stable sort on keys read once per item.
fn sort_by_draw_order(items: &mut Vec<SharedRenderable>) {
    let mut keyed: Vec<(DrawOrderKey, SharedRenderable)> = items
        .drain(..)
        .map(|item| {
            let key = item.lock().draw_order().key();
            (key, item)
        })
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    items.extend(keyed.into_iter().map(|(_, item)| item));
}
