use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::render::{
    Camera, OrthographicCamera, RenderBackend, RenderStats, Renderer, SharedRenderable, TextureCache,
};
use crate::scene::{NodeId, TransformTree};
use crate::time::{SharedAdvance, TaskManager, Timeline, TimelineSettings};

/// A capability an entity hands to the [`GameContext`].
///
/// Entities are plain bags of components; the context routes each one to the
/// system that handles its capability.
#[derive(Clone)]
pub enum Component {
    Renderable(SharedRenderable),
    Transform(NodeId),
    TimeDriven(SharedAdvance),
}

/// Owns the per-game systems and runs them in frame order:
/// advance the timeline, resolve transforms, render.
pub struct GameContext<C: Camera = OrthographicCamera> {
    renderer: Renderer,
    transforms: TransformTree,
    timeline: Timeline,
    textures: TextureCache,
    tasks: TaskManager,
    camera: C,
}

impl GameContext<OrthographicCamera> {
    /// Context with an orthographic camera covering `width x height` world units.
    pub fn orthographic(width: f32, height: f32) -> Self {
        Self::new(OrthographicCamera::new(width, height), TimelineSettings::default())
    }
}

impl<C: Camera> GameContext<C> {
    pub fn new(camera: C, timeline: TimelineSettings) -> Self {
        let tasks = TaskManager::new();
        let mut timeline = Timeline::new(timeline);
        timeline.track(Arc::new(Mutex::new(tasks.clone())));

        Self {
            renderer: Renderer::new(),
            transforms: TransformTree::new(),
            timeline,
            textures: TextureCache::new(),
            tasks,
            camera,
        }
    }

    // ── systems ────────────────────────────────────────────────────────────

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn transforms(&self) -> &TransformTree {
        &self.transforms
    }

    pub fn transforms_mut(&mut self) -> &mut TransformTree {
        &mut self.transforms
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn textures_mut(&mut self) -> &mut TextureCache {
        &mut self.textures
    }

    /// Task manager stepped by this context's timeline. Clone it to start
    /// tasks from inside task actions.
    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    // ── entity lifecycle ───────────────────────────────────────────────────

    /// Registers an entity's components with the matching systems. Idempotent.
    pub fn entered(&mut self, components: &[Component]) {
        for component in components {
            match component {
                Component::Renderable(item) => {
                    self.renderer.track(item.clone());
                }
                Component::Transform(node) => {
                    if !self.transforms.contains(*node) {
                        log::debug!("entered transform {node:?} is not in this context's tree");
                    }
                }
                Component::TimeDriven(participant) => {
                    self.timeline.track(participant.clone());
                }
            }
        }
    }

    /// Unregisters an entity's components. Transform nodes are removed from
    /// the tree, detaching any children. Idempotent.
    pub fn removed(&mut self, components: &[Component]) {
        for component in components {
            match component {
                Component::Renderable(item) => {
                    self.renderer.untrack(item);
                }
                Component::Transform(node) => {
                    self.transforms.remove(*node);
                }
                Component::TimeDriven(participant) => {
                    self.timeline.untrack(participant);
                }
            }
        }
    }

    // ── frame ──────────────────────────────────────────────────────────────

    pub fn resize(&mut self, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.camera.resize(width, height);
    }

    /// Runs one frame: timeline, transforms, then the render pass.
    pub fn frame(&mut self, dt: Duration, backend: &mut dyn RenderBackend) -> RenderStats {
        self.timeline.advance(dt);
        self.transforms.resolve_all();
        self.renderer.render(&self.camera, backend, &self.transforms)
    }
}
