//! Simulation module for scene management and animation
//!
//! This module ties the static topology to the graphics backend: it builds
//! the scene, binds activity snapshots to node glow, advances idle motion
//! once per presented frame, and owns the mount/unmount lifecycle.

pub mod activity;
pub mod host;
pub mod scene;
pub mod scheduler;
pub mod visualization;

pub use activity::{map_activity, ActivityMap, ActivitySnapshot, SignalRecord};
pub use host::{FrameHost, FrameRequest, ListenerId, ListenerKind, ManualHost};
pub use scene::{build_scene, Edge, Node, Renderable, SceneHandle};
pub use scheduler::{advance_frame, FrameClock, FrameTransforms, RenderScheduler, SchedulerState};
pub use visualization::Visualization;

use crate::rendering::RenderError;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to acquire {what}: {source}")]
    Acquire {
        what: String,
        #[source]
        source: RenderError,
    },
    #[error("visualization is already mounted")]
    AlreadyMounted,
}

/// Frames-per-second sampling for logs. Never drives frame cadence.
#[derive(Debug, Clone)]
pub struct FpsSampler {
    frame_count: u64,
    last_sample: Instant,
}

impl Default for FpsSampler {
    fn default() -> Self {
        Self {
            frame_count: 0,
            last_sample: Instant::now(),
        }
    }
}

impl FpsSampler {
    pub fn frame(&mut self) -> Option<f32> {
        self.frame_count += 1;
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_sample).as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frame_count as f32 / elapsed;
            self.frame_count = 0;
            self.last_sample = now;
            Some(fps)
        } else {
            None
        }
    }
}
