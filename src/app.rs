use anyhow::Context;
use brain_scene::rendering::{EventDisposition, GraphicsBackend, HeadlessBackend, PointerEvent, WgpuBackend};
use brain_scene::simulation::{FrameHost, FrameRequest, ListenerId, ListenerKind, ManualHost};
use brain_scene::{ActivitySnapshot, Visualization, VizConfig};
use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::Arc;
use winit::{
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{EventLoopBuilder, EventLoopProxy},
    window::{Window, WindowBuilder},
};

/// Pixels per wheel line, matching browser line-mode scrolling.
const LINE_HEIGHT: f32 = 100.0;

#[derive(Debug)]
pub enum AppEvent {
    Snapshot(ActivitySnapshot),
}

/// Frame host over a winit window: a frame request is a redraw request.
struct WindowHost {
    window: Arc<Window>,
    next_id: u64,
    pending: Option<FrameRequest>,
    listeners: BTreeMap<ListenerId, ListenerKind>,
}

impl WindowHost {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next_id: 0,
            pending: None,
            listeners: BTreeMap::new(),
        }
    }

    fn take_pending(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }

    fn is_listening(&self, kind: ListenerKind) -> bool {
        self.listeners.values().any(|k| *k == kind)
    }
}

impl FrameHost for WindowHost {
    fn request_frame(&mut self) -> FrameRequest {
        self.next_id += 1;
        let request = FrameRequest(self.next_id);
        self.pending = Some(request);
        self.window.request_redraw();
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
    }

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.insert(id, kind);
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }
}

/// Deliver pointer input only while the matching listener is registered.
fn pointer(
    host: &WindowHost,
    viz: &mut Visualization,
    kind: ListenerKind,
    event: PointerEvent,
) -> EventDisposition {
    if host.is_listening(kind) {
        viz.handle_pointer(event)
    } else {
        EventDisposition::Ignored
    }
}

fn initial_snapshot(config: &VizConfig) -> anyhow::Result<Option<ActivitySnapshot>> {
    let Some(path) = &config.snapshot_path else {
        return Ok(None);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    ActivitySnapshot::from_json(&text)
        .with_context(|| format!("parsing snapshot {}", path.display()))
}

/// Forward one JSON snapshot per stdin line until stdin closes or the event
/// loop goes away. Malformed lines are logged and skipped.
fn spawn_stdin_feed(proxy: EventLoopProxy<AppEvent>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("snapshot-feed".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::warn!("stdin read failed: {e}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match ActivitySnapshot::from_json(&line) {
                    Ok(Some(snapshot)) => {
                        if proxy.send_event(AppEvent::Snapshot(snapshot)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => log::debug!("snapshot without consciousness data"),
                    Err(e) => log::warn!("skipping malformed snapshot: {e}"),
                }
            }
            log::debug!("snapshot feed closed");
        })?;
    Ok(())
}

pub fn run_headless(config: &VizConfig, frames: u32) -> anyhow::Result<()> {
    let mut host = ManualHost::new();
    let mut backend = HeadlessBackend::new();
    let mut viz = Visualization::new();

    if let Some(snapshot) = initial_snapshot(config)? {
        viz.push_snapshot(&mut backend, &snapshot)?;
    }
    viz.mount(&mut host, &mut backend, config.width, config.height)?;
    for _ in 0..frames {
        let Some(request) = host.next_frame() else {
            break;
        };
        viz.on_frame(&mut host, &mut backend, request)?;
    }
    let time = viz.clock().map(|c| c.time()).unwrap_or_default();
    log::info!(
        "headless run: {} frames, clock {:.2}, {} draws per frame, {} live resources",
        backend.frames(),
        time,
        backend.last_draw_count(),
        backend.live_resources()
    );
    viz.unmount(&mut host, &mut backend)?;
    anyhow::ensure!(
        backend.live_resources() == 0,
        "{} resources leaked after unmount",
        backend.live_resources()
    );
    Ok(())
}

pub fn run_windowed(config: &VizConfig) -> anyhow::Result<()> {
    let event_loop = EventLoopBuilder::<AppEvent>::with_user_event().build()?;
    let window = WindowBuilder::new()
        .with_title(&config.title)
        .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height))
        .build(&event_loop)?;
    let window = Arc::new(window);

    let mut backend = pollster::block_on(WgpuBackend::new(window.clone()))?;
    let mut host = WindowHost::new(window.clone());
    let mut viz = Visualization::new();

    if let Some(snapshot) = initial_snapshot(config)? {
        viz.push_snapshot(&mut backend, &snapshot)?;
    }
    let (width, height) = backend.size();
    viz.mount(&mut host, &mut backend, width, height)?;

    if config.stdin_feed {
        spawn_stdin_feed(event_loop.create_proxy())?;
    }

    log::info!("{} started: drag to orbit, wheel to zoom", config.title);

    let win_id = window.id();
    let mut cursor = (0.0f32, 0.0f32);
    event_loop.run(move |event, target| {
        match event {
            Event::UserEvent(AppEvent::Snapshot(snapshot)) => {
                if let Err(e) = viz.push_snapshot(&mut backend, &snapshot) {
                    log::error!("applying snapshot: {e}");
                }
            }
            Event::WindowEvent { event, window_id } if window_id == win_id => match event {
                WindowEvent::CloseRequested => {
                    if let Err(e) = viz.unmount(&mut host, &mut backend) {
                        log::error!("teardown: {e}");
                    }
                    target.exit();
                }
                WindowEvent::Resized(size) => {
                    backend.resize(size.width, size.height);
                    viz.resize(size.width, size.height);
                }
                WindowEvent::RedrawRequested => {
                    if let Some(request) = host.take_pending() {
                        if let Err(e) = viz.on_frame(&mut host, &mut backend, request) {
                            log::error!("Render error: {e}");
                        }
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    cursor = (position.x as f32, position.y as f32);
                    let (x, y) = cursor;
                    let event = PointerEvent::Move { x, y };
                    pointer(&host, &mut viz, ListenerKind::PointerMove, event);
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => {
                    let (x, y) = cursor;
                    let (kind, event) = match state {
                        ElementState::Pressed => {
                            (ListenerKind::PointerDown, PointerEvent::Down { x, y })
                        }
                        ElementState::Released => (ListenerKind::PointerUp, PointerEvent::Up),
                    };
                    pointer(&host, &mut viz, kind, event);
                }
                WindowEvent::Focused(false) => {
                    pointer(&host, &mut viz, ListenerKind::PointerUp, PointerEvent::Up);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let delta_y = match delta {
                        MouseScrollDelta::LineDelta(_, y) => -y * LINE_HEIGHT,
                        MouseScrollDelta::PixelDelta(pos) => -pos.y as f32,
                    };
                    let event = PointerEvent::Wheel { delta_y };
                    if pointer(&host, &mut viz, ListenerKind::Wheel, event)
                        == EventDisposition::PreventDefault
                    {
                        log::trace!("zoom -> {:?}", viz.camera_state().map(|s| s.distance));
                    }
                }
                _ => {}
            },
            _ => {}
        }
    })?;
    Ok(())
}
