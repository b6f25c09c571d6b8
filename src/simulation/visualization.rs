//! Mount/unmount lifecycle of the brain view.

use super::activity::{map_activity, ActivityMap, ActivitySnapshot};
use super::host::{FrameHost, FrameRequest, ListenerId, ListenerKind};
use super::scene::{build_scene, SceneHandle, BACKGROUND};
use super::scheduler::{FrameClock, RenderScheduler, SchedulerState};
use super::SceneError;
use crate::rendering::{
    Camera, CameraController, CameraState, EventDisposition, FrameView, GraphicsBackend, Lighting,
    PointerEvent, RenderResult,
};
use crate::topology::{compute_layout, Topology};

struct Mounted {
    scene: SceneHandle,
    scheduler: RenderScheduler,
    controller: CameraController,
    camera: Camera,
    listeners: Vec<ListenerId>,
}

/// The embeddable view: one scene, one frame loop, one set of listeners.
///
/// Host and backend are borrowed per call; the visualization never keeps
/// them past the call that uses them.
pub struct Visualization {
    topology: Topology,
    lighting: Lighting,
    mounted: Option<Mounted>,
    activity: Option<ActivityMap>,
}

impl Default for Visualization {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualization {
    pub fn new() -> Self {
        Self {
            topology: Topology::standard(),
            lighting: Lighting::default(),
            mounted: None,
            activity: None,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// Build the scene, register input listeners and request the first frame.
    pub fn mount(
        &mut self,
        host: &mut dyn FrameHost,
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
    ) -> Result<(), SceneError> {
        if self.mounted.is_some() {
            return Err(SceneError::AlreadyMounted);
        }
        let layout = compute_layout(&self.topology);
        let mut scene = build_scene(backend, &self.topology, &layout)?;
        if let Some(activity) = &self.activity {
            if let Err(e) = scene.apply_activity(backend, activity) {
                log::warn!("could not apply pending activity: {}", e);
            }
        }

        let listeners = ListenerKind::ALL
            .iter()
            .map(|kind| host.add_listener(*kind))
            .collect();
        let controller = CameraController::default();
        let mut camera = Camera::on_view_axis(controller.state().distance, 1.0);
        camera.set_aspect(width, height);
        let mut scheduler = RenderScheduler::new();
        scheduler.start(host);

        self.mounted = Some(Mounted {
            scene,
            scheduler,
            controller,
            camera,
            listeners,
        });
        log::info!("mounted at {}x{}", width, height);
        Ok(())
    }

    /// Cancel the pending frame, drop listeners and release the scene.
    /// Calling it again, or before any mount, does nothing.
    pub fn unmount(
        &mut self,
        host: &mut dyn FrameHost,
        backend: &mut dyn GraphicsBackend,
    ) -> RenderResult<()> {
        let Some(mut mounted) = self.mounted.take() else {
            log::debug!("unmount: nothing mounted");
            return Ok(());
        };
        mounted.scheduler.stop(host);
        for id in mounted.listeners.drain(..) {
            host.remove_listener(id);
        }
        let result = mounted.scene.teardown(backend);
        log::info!(
            "unmounted after {} frames",
            mounted.scheduler.clock().frames()
        );
        result
    }

    /// Frame callback. Returns whether a frame was drawn: callbacks that
    /// arrive after unmount or carry a stale token are dropped.
    pub fn on_frame(
        &mut self,
        host: &mut dyn FrameHost,
        backend: &mut dyn GraphicsBackend,
        request: FrameRequest,
    ) -> RenderResult<bool> {
        let Some(m) = self.mounted.as_mut() else {
            log::trace!("frame {:?} after unmount", request);
            return Ok(false);
        };
        if !m.scheduler.accept(request) {
            log::trace!("stale frame {:?}", request);
            return Ok(false);
        }
        m.scheduler.schedule_next(host);
        m.scheduler.set_dragging(m.controller.is_dragging());

        let frame = m.scheduler.step(&m.controller.state());
        m.scene.apply_frame(&frame);
        m.camera.set_distance(frame.camera_distance);

        let view = FrameView::from_camera(&m.camera, BACKGROUND, self.lighting);
        backend.render(&view, &m.scene.draw_commands())?;
        Ok(true)
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> EventDisposition {
        match self.mounted.as_mut() {
            Some(m) => m.controller.handle(event),
            None => EventDisposition::Ignored,
        }
    }

    /// Map a snapshot and apply it. Before mount the result is held and
    /// applied when the scene is built.
    pub fn push_snapshot(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        snapshot: &ActivitySnapshot,
    ) -> RenderResult<()> {
        let activity = map_activity(snapshot);
        let result = match self.mounted.as_mut() {
            Some(m) => m.scene.apply_activity(backend, &activity),
            None => Ok(()),
        };
        self.activity = Some(activity);
        result
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(m) = self.mounted.as_mut() {
            m.camera.set_aspect(width, height);
        }
    }

    pub fn camera_state(&self) -> Option<CameraState> {
        self.mounted.as_ref().map(|m| m.controller.state())
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.mounted.as_ref().map(|m| &m.camera)
    }

    pub fn scheduler_state(&self) -> Option<SchedulerState> {
        self.mounted.as_ref().map(|m| m.scheduler.state())
    }

    pub fn clock(&self) -> Option<FrameClock> {
        self.mounted.as_ref().map(|m| m.scheduler.clock())
    }

    pub fn scene(&self) -> Option<&SceneHandle> {
        self.mounted.as_ref().map(|m| &m.scene)
    }
}
