use crate::coords::{Mat4, Vec2};
use crate::paint::Color;

use super::RenderBackend;

/// View and projection used for one render pass.
pub trait Camera {
    /// World → view matrix.
    fn view(&self) -> Mat4;

    /// View → clip matrix.
    fn projection(&self) -> Mat4;

    fn background(&self) -> Color;

    /// Adapts the projection to a new drawable size.
    fn resize(&mut self, width: f32, height: f32);

    /// Clears the frame before anything is drawn.
    fn clear(&self, backend: &mut dyn RenderBackend) {
        backend.clear(self.background());
    }
}

/// Zoom is clamped to this range.
pub const ZOOM_RANGE: (f32, f32) = (0.05, 32.0);

/// Camera looking down -Z at a `bounds * zoom` region centered on `position`.
///
/// Sprite depth (`z` in `[-1, 1]`) maps to `[0, 1]`, higher z nearer.
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    bounds: Vec2,
    zoom: f32,
    position: Vec2,
    rotation: f32,
    background: Color,

    view: Mat4,
    projection: Mat4,
}

impl OrthographicCamera {
    pub fn new(width: f32, height: f32) -> Self {
        let mut camera = Self {
            bounds: Vec2::new(width, height),
            zoom: 1.0,
            position: Vec2::ZERO,
            rotation: 0.0,
            background: Color::CORNFLOWER_BLUE,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.rebuild_projection();
        camera.rebuild_view();
        camera
    }

    #[inline]
    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    #[inline]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_bounds(&mut self, width: f32, height: f32) {
        self.bounds = Vec2::new(width, height);
        self.rebuild_projection();
    }

    /// Values above 1 show more of the world.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(ZOOM_RANGE.0, ZOOM_RANGE.1);
        self.rebuild_projection();
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.rebuild_view();
    }

    pub fn set_rotation(&mut self, radians: f32) {
        self.rotation = radians;
        self.rebuild_view();
    }

    pub fn set_background(&mut self, background: Color) {
        self.background = background;
    }

    fn rebuild_projection(&mut self) {
        let half = self.bounds * (self.zoom * 0.5);
        self.projection = Mat4::orthographic_rh(-half.x, half.x, -half.y, half.y, -1.0, 1.0);
    }

    fn rebuild_view(&mut self) {
        // Inverse of T(position) * R(rotation).
        self.view = Mat4::rotation_z(-self.rotation)
            * Mat4::translation(-self.position.x, -self.position.y, 0.0);
    }
}

impl Camera for OrthographicCamera {
    fn view(&self) -> Mat4 {
        self.view
    }

    fn projection(&self) -> Mat4 {
        self.projection
    }

    fn background(&self) -> Color {
        self.background
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.set_bounds(width, height);
    }
}

/// Perspective camera placed `distance` units in front of the XY plane.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
    eye: Vec2,
    distance: f32,
    background: Color,
}

impl PerspectiveCamera {
    /// `fov_y` in radians.
    pub fn new(fov_y: f32, width: f32, height: f32, distance: f32) -> Self {
        Self {
            fov_y,
            aspect: aspect_of(width, height),
            near: 0.1,
            far: 10_000.0,
            eye: Vec2::ZERO,
            distance,
            background: Color::CORNFLOWER_BLUE,
        }
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    pub fn set_eye(&mut self, eye: Vec2) {
        self.eye = eye;
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance;
    }

    pub fn set_background(&mut self, background: Color) {
        self.background = background;
    }
}

impl Camera for PerspectiveCamera {
    fn view(&self) -> Mat4 {
        Mat4::translation(-self.eye.x, -self.eye.y, -self.distance)
    }

    fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    fn background(&self) -> Color {
        self.background
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.aspect = aspect_of(width, height);
    }
}

fn aspect_of(width: f32, height: f32) -> f32 {
    width.max(1.0) / height.max(1.0)
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;
    use crate::render::testing::{Call, RecordingBackend};

    #[test]
    fn ortho_resize_rebuilds_projection_only() {
        let mut camera = OrthographicCamera::new(800.0, 600.0);
        let before = camera.projection();
        assert_eq!(camera.view(), Mat4::IDENTITY);

        camera.resize(640.0, 480.0);
        assert_ne!(camera.projection(), before);
        assert_eq!(camera.view(), Mat4::IDENTITY);
        assert_relative_eq!(camera.projection().cols[0][0], 2.0 / 640.0);
        assert_relative_eq!(camera.projection().cols[1][1], 2.0 / 480.0);
    }

    #[test]
    fn ortho_zoom_scales_visible_region_and_clamps() {
        let mut camera = OrthographicCamera::new(800.0, 600.0);
        camera.set_zoom(2.0);
        assert_relative_eq!(camera.projection().cols[0][0], 2.0 / 1600.0);

        camera.set_zoom(1000.0);
        assert_eq!(camera.zoom(), ZOOM_RANGE.1);
    }

    #[test]
    fn ortho_view_undoes_pan() {
        let mut camera = OrthographicCamera::new(800.0, 600.0);
        camera.set_position(Vec2::new(100.0, 50.0));
        let p = camera.view().transform_point(Vec2::new(100.0, 50.0));
        assert_abs_diff_eq!(p.x, 0.0);
        assert_abs_diff_eq!(p.y, 0.0);
    }

    #[test]
    fn perspective_resize_updates_aspect() {
        let mut camera = PerspectiveCamera::new(1.0, 800.0, 400.0, 10.0);
        assert_relative_eq!(camera.aspect(), 2.0);
        camera.resize(300.0, 300.0);
        assert_relative_eq!(camera.aspect(), 1.0);
        assert_eq!(camera.projection().cols[2][3], -1.0);
        assert_eq!(camera.view().transform_point3([0.0, 0.0, 0.0])[2], -10.0);
    }

    #[test]
    fn clear_uses_background() {
        let mut camera = OrthographicCamera::new(10.0, 10.0);
        camera.set_background(Color::BLACK);
        let mut backend = RecordingBackend::default();
        camera.clear(&mut backend);
        assert_eq!(backend.calls, vec![Call::Clear(Color::BLACK)]);
    }
}
