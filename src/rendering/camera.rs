use glam::{Mat4, Vec2, Vec3};

pub const FOV_Y_DEGREES: f32 = 75.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 1000.0;

pub const MIN_DISTANCE: f32 = 5.0;
pub const MAX_DISTANCE: f32 = 20.0;
pub const DEFAULT_DISTANCE: f32 = 12.0;

/// Radians of orbit per pixel of drag.
pub const ROTATE_SPEED: f32 = 0.005;
/// Distance units per unit of wheel delta.
pub const ZOOM_SPEED: f32 = 0.01;

/// Primary perspective camera. Right-handed system; looks down -Z.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3, aspect: f32) -> Self {
        let fov_y = FOV_Y_DEGREES.to_radians();
        let forward = (target - position).normalize_or_zero();
        let world_up = Vec3::Y;
        let right = forward.cross(world_up).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        Self {
            position,
            forward,
            up,
            right,
            fov_y,
            aspect,
            near: NEAR,
            far: FAR,
        }
    }

    /// Camera on the +Z axis looking back at the origin.
    pub fn on_view_axis(distance: f32, aspect: f32) -> Self {
        Self::new(Vec3::new(0.0, 0.0, distance), Vec3::ZERO, aspect)
    }

    #[inline]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward, self.up)
    }
    #[inline]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect.max(1e-6), self.near, self.far)
    }
    #[inline]
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Slide along the view axis so the camera sits `distance` from the origin.
    pub fn set_distance(&mut self, distance: f32) {
        self.position = -self.forward * distance;
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }
}

/// Orbit and zoom state written by the pointer controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: DEFAULT_DISTANCE,
        }
    }
}

/// Host-independent pointer input, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
    Wheel { delta_y: f32 },
}

/// What the host should do with an event after the controller saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Handled,
    /// Handled, and the host's default action (page scroll) must not run.
    PreventDefault,
    Ignored,
}

/// Drag-to-orbit, wheel-to-zoom.
///
/// Handlers only mutate state; the next frame reads it. Non-finite
/// coordinates or deltas are ignored and leave the state untouched.
#[derive(Debug, Clone, Default)]
pub struct CameraController {
    state: CameraState,
    dragging: bool,
    last_pointer: Vec2,
}

impl CameraController {
    pub fn new(state: CameraState) -> Self {
        Self {
            state,
            dragging: false,
            last_pointer: Vec2::ZERO,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn handle(&mut self, event: PointerEvent) -> EventDisposition {
        match event {
            PointerEvent::Down { x, y } => self.on_pointer_down(x, y),
            PointerEvent::Move { x, y } => self.on_pointer_move(x, y),
            PointerEvent::Up => self.on_pointer_up(),
            PointerEvent::Wheel { delta_y } => self.on_wheel(delta_y),
        }
    }

    pub fn on_pointer_down(&mut self, x: f32, y: f32) -> EventDisposition {
        if !(x.is_finite() && y.is_finite()) {
            return EventDisposition::Ignored;
        }
        self.dragging = true;
        self.last_pointer = Vec2::new(x, y);
        EventDisposition::Handled
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32) -> EventDisposition {
        if !self.dragging || !(x.is_finite() && y.is_finite()) {
            return EventDisposition::Ignored;
        }
        let pointer = Vec2::new(x, y);
        let delta = pointer - self.last_pointer;
        self.state.yaw += delta.x * ROTATE_SPEED;
        self.state.pitch += delta.y * ROTATE_SPEED;
        self.last_pointer = pointer;
        EventDisposition::Handled
    }

    pub fn on_pointer_up(&mut self) -> EventDisposition {
        self.dragging = false;
        EventDisposition::Handled
    }

    pub fn on_wheel(&mut self, delta_y: f32) -> EventDisposition {
        if !delta_y.is_finite() {
            return EventDisposition::Ignored;
        }
        let distance = self.state.distance + delta_y * ZOOM_SPEED;
        self.state.distance = distance.clamp(MIN_DISTANCE, MAX_DISTANCE);
        EventDisposition::PreventDefault
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_updates_yaw_only() {
        let mut c = CameraController::default();
        c.on_pointer_down(10.0, 10.0);
        c.on_pointer_move(110.0, 10.0);
        let s = c.state();
        assert!((s.yaw - 0.5).abs() < 1e-6);
        assert_eq!(s.pitch, 0.0);
        assert_eq!(s.distance, DEFAULT_DISTANCE);
    }

    #[test]
    fn test_drag_accumulates_from_last_position() {
        let mut c = CameraController::default();
        c.on_pointer_down(0.0, 0.0);
        c.on_pointer_move(0.0, 40.0);
        c.on_pointer_move(0.0, 100.0);
        assert!((c.state().pitch - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_no_residual_drag_after_release() {
        let mut c = CameraController::default();
        c.on_pointer_down(0.0, 0.0);
        c.on_pointer_move(100.0, 0.0);
        c.on_pointer_up();
        let before = c.state();
        assert_eq!(c.on_pointer_move(500.0, 300.0), EventDisposition::Ignored);
        assert_eq!(c.state(), before);
        assert!(!c.is_dragging());
    }

    #[test]
    fn test_move_without_press_is_ignored() {
        let mut c = CameraController::default();
        assert_eq!(
            c.handle(PointerEvent::Move { x: 50.0, y: 50.0 }),
            EventDisposition::Ignored
        );
        assert_eq!(c.state(), CameraState::default());
    }

    #[test]
    fn test_wheel_clamps_distance() {
        let mut c = CameraController::default();
        for _ in 0..100 {
            c.on_wheel(100.0);
        }
        assert_eq!(c.state().distance, MAX_DISTANCE);
        assert_eq!(
            c.handle(PointerEvent::Wheel { delta_y: 10_000.0 }),
            EventDisposition::PreventDefault
        );
        assert_eq!(c.state().distance, MAX_DISTANCE);
        c.on_wheel(-10_000.0);
        assert_eq!(c.state().distance, MIN_DISTANCE);
        c.on_wheel(150.0);
        assert!((c.state().distance - 6.5).abs() < 1e-5);
    }

    #[test]
    fn test_non_finite_input_leaves_state_untouched() {
        let mut c = CameraController::default();
        assert_eq!(c.on_wheel(f32::NAN), EventDisposition::Ignored);
        assert_eq!(c.on_wheel(f32::INFINITY), EventDisposition::Ignored);
        assert_eq!(c.state(), CameraState::default());
        c.on_wheel(100.0);
        assert!((c.state().distance - 13.0).abs() < 1e-5);

        assert_eq!(c.on_pointer_down(f32::NAN, 0.0), EventDisposition::Ignored);
        assert!(!c.is_dragging());
        c.on_pointer_down(0.0, 0.0);
        assert_eq!(
            c.handle(PointerEvent::Move {
                x: f32::NAN,
                y: 10.0
            }),
            EventDisposition::Ignored
        );
        c.on_pointer_move(100.0, 0.0);
        let s = c.state();
        assert!((s.yaw - 0.5).abs() < 1e-6);
        assert_eq!(s.pitch, 0.0);
        assert!((MIN_DISTANCE..=MAX_DISTANCE).contains(&s.distance));
    }

    #[test]
    fn test_camera_distance_along_view_axis() {
        let mut cam = Camera::on_view_axis(DEFAULT_DISTANCE, 16.0 / 9.0);
        cam.set_distance(7.0);
        assert!((cam.position - Vec3::new(0.0, 0.0, 7.0)).length() < 1e-6);
        cam.set_distance(MAX_DISTANCE);
        assert!((cam.position.z - MAX_DISTANCE).abs() < 1e-6);
        assert!((cam.right - Vec3::X).length() < 1e-6);
        assert!((cam.up - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_origin_projects_to_screen_center() {
        let cam = Camera::on_view_axis(12.0, 1.0);
        let clip = cam.view_projection() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
