use super::host::{FrameHost, FrameRequest};
use super::FpsSampler;
use crate::rendering::CameraState;
use glam::Vec3;
use std::f64::consts::TAU;

/// Clock advance per presented frame.
pub const FRAME_STEP: f64 = 0.01;
/// Idle yaw of the core sphere per clock unit.
pub const IDLE_SPIN_RATE: f64 = 0.1;
pub const PULSE_FREQUENCY: f64 = 2.0;
pub const PULSE_AMPLITUDE: f32 = 0.1;
pub const PULSE_DEPTH: f32 = 0.3;
/// Node self-rotation added every frame.
pub const NODE_SPIN_STEP: f32 = 0.002;

/// Animation time, kept in f64 so long sessions keep advancing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameClock {
    time: f64,
    frames: u64,
}

impl FrameClock {
    pub fn starting_at(time: f64) -> Self {
        Self { time, frames: 0 }
    }

    pub fn tick(&mut self, dt: f64) -> f64 {
        self.time += dt;
        self.frames += 1;
        self.time
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Everything one frame changes in the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransforms {
    pub time: f64,
    pub core_rotation: Vec3,
    pub node_scale: f32,
    pub node_spin_step: f32,
    pub camera_distance: f32,
}

pub fn pulse_scale(time: f64) -> f32 {
    let pulse = (time * PULSE_FREQUENCY).sin() as f32 * PULSE_AMPLITUDE;
    1.0 + pulse * PULSE_DEPTH
}

/// Advance the clock by `dt` and derive the frame's transforms.
///
/// Camera input composes additively with idle spin: the core sphere's yaw is
/// the user's yaw plus the clock-driven drift.
pub fn advance_frame(clock: &mut FrameClock, dt: f64, camera: &CameraState) -> FrameTransforms {
    let time = clock.tick(dt);
    let drift = (time * IDLE_SPIN_RATE).rem_euclid(TAU) as f32;
    FrameTransforms {
        time,
        core_rotation: Vec3::new(camera.pitch, camera.yaw + drift, 0.0),
        node_scale: pulse_scale(time),
        node_spin_step: NODE_SPIN_STEP,
        camera_distance: camera.distance,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Dragging,
}

/// Self-rescheduling frame loop over a [`FrameHost`].
///
/// At most one request is outstanding; a callback is only accepted if it
/// carries that request's token.
#[derive(Debug, Default)]
pub struct RenderScheduler {
    state: Option<SchedulerState>,
    clock: FrameClock,
    pending: Option<FrameRequest>,
    fps: FpsSampler,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        self.state.unwrap_or(SchedulerState::Idle)
    }

    pub fn clock(&self) -> FrameClock {
        self.clock
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        let next = if dragging {
            SchedulerState::Dragging
        } else {
            SchedulerState::Idle
        };
        if self.state() != next {
            log::debug!("scheduler {:?} -> {:?}", self.state(), next);
        }
        self.state = Some(next);
    }

    pub fn start(&mut self, host: &mut dyn FrameHost) {
        if self.pending.is_none() {
            self.pending = Some(host.request_frame());
        }
    }

    /// Claim a fired callback. Stale or foreign tokens are rejected.
    pub fn accept(&mut self, request: FrameRequest) -> bool {
        if self.pending == Some(request) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn schedule_next(&mut self, host: &mut dyn FrameHost) {
        self.start(host);
    }

    pub fn step(&mut self, camera: &CameraState) -> FrameTransforms {
        let frame = advance_frame(&mut self.clock, FRAME_STEP, camera);
        if let Some(fps) = self.fps.frame() {
            log::debug!("FPS: {:.1}", fps);
        }
        frame
    }

    /// Cancel the outstanding request. Safe to call repeatedly.
    pub fn stop(&mut self, host: &mut dyn FrameHost) {
        if let Some(request) = self.pending.take() {
            host.cancel_frame(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::ManualHost;

    #[test]
    fn test_clock_steps_fixed_amount() {
        let mut clock = FrameClock::default();
        let cam = CameraState::default();
        for _ in 0..100 {
            advance_frame(&mut clock, FRAME_STEP, &cam);
        }
        assert!((clock.time() - 1.0).abs() < 1e-4);
        assert_eq!(clock.frames(), 100);
    }

    #[test]
    fn test_frame_math_at_known_time() {
        let mut clock = FrameClock::default();
        let cam = CameraState {
            yaw: 0.5,
            pitch: -0.25,
            distance: 9.0,
        };
        let frame = advance_frame(&mut clock, 0.75, &cam);
        assert!((frame.core_rotation.y - (0.5 + 0.075)).abs() < 1e-6);
        assert_eq!(frame.core_rotation.x, -0.25);
        let expected = 1.0 + (1.5f32).sin() * 0.1 * 0.3;
        assert!((frame.node_scale - expected).abs() < 1e-6);
        assert_eq!(frame.node_spin_step, NODE_SPIN_STEP);
        assert_eq!(frame.camera_distance, 9.0);
    }

    #[test]
    fn test_pulse_stays_within_three_percent() {
        for i in 0..1000 {
            let s = pulse_scale(i as f64 * 0.013);
            assert!((0.97 - 1e-6..=1.03 + 1e-6).contains(&s));
        }
    }

    #[test]
    fn test_clock_keeps_advancing_after_long_runs() {
        let cam = CameraState::default();
        let start = 262_144.0;
        let mut clock = FrameClock::starting_at(start);
        let mut last = None;
        for _ in 0..1000 {
            last = Some(advance_frame(&mut clock, FRAME_STEP, &cam));
        }
        assert!((clock.time() - (start + 10.0)).abs() < 1e-6);
        let frame = last.unwrap();
        assert!((0.0..std::f32::consts::TAU).contains(&frame.core_rotation.y));
        let expected = ((start + 10.0) * IDLE_SPIN_RATE).rem_euclid(TAU) as f32;
        assert!((frame.core_rotation.y - expected).abs() < 1e-5);
        let pulse = 1.0 + ((start + 10.0) * 2.0).sin() as f32 * 0.1 * 0.3;
        assert!((frame.node_scale - pulse).abs() < 1e-6);
    }

    #[test]
    fn test_scheduler_keeps_one_request_outstanding() {
        let mut host = ManualHost::new();
        let mut sched = RenderScheduler::new();
        sched.start(&mut host);
        sched.start(&mut host);
        assert_eq!(host.pending_frames(), 1);
        let req = host.next_frame().unwrap();
        assert!(sched.accept(req));
        assert!(!sched.accept(req));
        sched.schedule_next(&mut host);
        assert_eq!(host.pending_frames(), 1);
        sched.stop(&mut host);
        sched.stop(&mut host);
        assert_eq!(host.pending_frames(), 0);
        assert!(sched.pending().is_none());
    }

    #[test]
    fn test_drag_state_tracking() {
        let mut sched = RenderScheduler::new();
        assert_eq!(sched.state(), SchedulerState::Idle);
        sched.set_dragging(true);
        assert_eq!(sched.state(), SchedulerState::Dragging);
        sched.set_dragging(false);
        assert_eq!(sched.state(), SchedulerState::Idle);
    }
}
