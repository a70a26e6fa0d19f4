use std::f32::consts::TAU;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use winit::dpi::PhysicalSize;
use winit::window::WindowId;

use verger_engine::coords::Vec2;
use verger_engine::core::{App, AppControl, Component, FrameCtx, GameContext};
use verger_engine::device::GpuInit;
use verger_engine::logging::{LoggingConfig, init_logging};
use verger_engine::paint::Color;
use verger_engine::render::{SpriteBatch, SpriteResources, Texture, TextureCache};
use verger_engine::scene::{NodeId, Sprite, SpriteGrid, SpriteGridSettings, TransformNode};
use verger_engine::window::{Runtime, RuntimeConfig};

const TILE: u32 = 16;
const SPIN_SPEED: f32 = 0.8;

// Top row first; 0 = empty, 1 = grass, 2 = stone.
const LEVEL: &str = concat!(
    "0000000000", //
    "0002222000", //
    "0000000000", //
    "1111111111", //
);

/// Two-color checkerboard, 4x4 texel squares.
fn checker(cache: &mut TextureCache, name: &str, a: [u8; 4], b: [u8; 4]) -> Result<Texture> {
    let mut pixels = Vec::with_capacity((TILE * TILE * 4) as usize);
    for y in 0..TILE {
        for x in 0..TILE {
            let texel = if (x / 4 + y / 4) % 2 == 0 { a } else { b };
            pixels.extend_from_slice(&texel);
        }
    }
    Ok(cache.insert_rgba(name, TILE, TILE, pixels)?)
}

struct Sandbox {
    game: GameContext,
    resources: SpriteResources,
    spinner: NodeId,
    _grid: SpriteGrid,
}

impl Sandbox {
    fn new() -> Result<Self> {
        let mut game = GameContext::orthographic(1280.0, 720.0);
        game.camera_mut().set_background(Color::rgb(0.1, 0.12, 0.16));

        let textures = game.textures_mut();
        let grass = checker(textures, "grass", [70, 160, 60, 255], [50, 130, 45, 255])?;
        let stone = checker(textures, "stone", [140, 140, 150, 255], [110, 110, 120, 255])?;
        let glow = checker(textures, "glow", [255, 220, 90, 255], [255, 220, 90, 0])?;
        // Not shipped: exercises the missing-file path (logged, never drawn).
        let missing = textures.load_or_get("assets/crate.png");

        let batch = Arc::new(Mutex::new(SpriteBatch::new()));

        let mut grid = SpriteGrid::mapped(
            SpriteGridSettings {
                columns: 10,
                rows: 4,
                layer: 0,
                texture: None,
                cell_size: Some(Vec2::splat(64.0)),
            },
            LEVEL,
            vec![grass, stone],
        );
        grid.build(&mut batch.lock(), game.transforms_mut())?;
        if let Some(root) = grid.root().and_then(|root| game.transforms_mut().get_mut(root)) {
            root.set_position(Vec2::new(-288.0, -300.0));
        }

        let spinner = game
            .transforms_mut()
            .insert(TransformNode::new().with_position(Vec2::new(0.0, 120.0)));
        let mut orbiters = Vec::new();
        {
            let mut batch = batch.lock();
            for i in 0..6 {
                let angle = i as f32 * TAU / 6.0;
                let node = game.transforms_mut().insert(
                    TransformNode::new()
                        .with_position(Vec2::new(angle.cos(), angle.sin()) * 140.0)
                        .with_scale(Vec2::splat(2.0)),
                );
                game.transforms_mut().set_parent(node, Some(spinner));

                let sprite = Sprite::from_texture(glow.clone())
                    .with_layer(2)
                    .with_transform(node)
                    .with_size(Vec2::splat(24.0));
                orbiters.push(batch.add(sprite)?);
            }

            let crate_node = game.transforms_mut().insert(TransformNode::new());
            batch.add(Sprite::from_texture(missing).with_transform(crate_node).with_layer(1))?;
        }

        // Two seconds in, tint the orbiters one after another.
        let tinted = batch.clone();
        let tasks = game.tasks().clone();
        let mut steps = tasks.wait_for(2.0);
        for id in orbiters {
            let batch = tinted.clone();
            steps
                .then(move || {
                    let mut batch = batch.lock();
                    if let Some(mut sprite) = batch.sprite_mut(id) {
                        sprite.set_tint(Color::rgb(0.4, 0.8, 1.0));
                    }
                })
                .then_wait_for(0.25);
        }
        drop(steps);

        game.entered(&[Component::Renderable(batch), Component::Transform(spinner)]);

        Ok(Self {
            game,
            resources: SpriteResources::new(),
            spinner,
            _grid: grid,
        })
    }
}

impl App for Sandbox {
    fn on_resize(&mut self, _window_id: WindowId, size: PhysicalSize<u32>) {
        self.game.resize(size.width as f32, size.height as f32);
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let dt = ctx.time.dt;
        let frame = ctx.time.frame_index;
        if let Some(node) = self.game.transforms_mut().get_mut(self.spinner) {
            let rotation = (node.rotation() + SPIN_SPEED * ctx.time.dt_secs()) % TAU;
            node.set_rotation(rotation);
        }

        let game = &mut self.game;
        ctx.render(&mut self.resources, |backend| {
            let stats = game.frame(dt, backend);
            log::trace!(
                "frame {}: {} rendered, {} state changes",
                frame,
                stats.rendered,
                stats.state_changes
            );
        })
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let sandbox = Sandbox::new()?;
    Runtime::run(
        RuntimeConfig {
            title: "verger sandbox".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        sandbox,
    )
}
