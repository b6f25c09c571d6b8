use super::activity::{emissive_strength, ActivityMap, DEFAULT_INTENSITY};
use super::scheduler::FrameTransforms;
use super::SceneError;
use crate::rendering::{
    Color, DrawCommand, Geometry, GraphicsBackend, Material, RenderResult, ResourceId, Transform,
};
use crate::topology::{EdgeCategory, Layout, NodeId, Ring, Topology};
use glam::{Vec2, Vec3};
use rand::Rng;
use std::f32::consts::TAU;

pub const BACKGROUND: Color = Color(0x0a0a0f);

pub const NODE_RADIUS: f32 = 0.8;
pub const NODE_SEGMENTS: u32 = 32;
pub const NODE_OPACITY: f32 = 0.7;
pub const INITIAL_EMISSIVE: f32 = 0.3;

pub const GLOW_RADIUS: f32 = 1.0;
pub const GLOW_OPACITY: f32 = 0.15;

pub const LABEL_OFFSET: f32 = 1.2;
pub const LABEL_SCALE: Vec2 = Vec2::new(2.0, 0.5);

pub const CORE_RADIUS: f32 = 2.0;
pub const CORE_SEGMENTS: u32 = 64;
pub const CORE_COLOR: Color = Color(0x1e293b);
pub const CORE_OPACITY: f32 = 0.1;

pub const STAR_COUNT: usize = 200;
/// Stars fill the cube [-STAR_EXTENT, STAR_EXTENT]^3.
pub const STAR_EXTENT: f32 = 25.0;
pub const STAR_SIZE: f32 = 0.1;

/// A backend resource plus where it sits in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderable {
    pub resource: ResourceId,
    pub transform: Transform,
}

impl Renderable {
    fn draw(&self) -> DrawCommand {
        DrawCommand {
            resource: self.resource,
            model: self.transform.matrix(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: &'static str,
    pub ring: Ring,
    pub color: Color,
    pub position: Vec3,
    /// Last applied activity, clamped to [0, 1].
    pub intensity: f32,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub category: EdgeCategory,
    pub line: Renderable,
}

#[derive(Debug, Clone)]
struct NodeVisual {
    node: Node,
    material: Material,
    sphere: Renderable,
    glow: Renderable,
    label: Renderable,
}

/// Everything the scene owns on the backend.
///
/// Tear down exactly once with [`SceneHandle::teardown`]; later calls do
/// nothing.
#[derive(Debug)]
pub struct SceneHandle {
    nodes: Vec<NodeVisual>,
    edges: Vec<Edge>,
    core: Renderable,
    stars: Renderable,
    released: bool,
}

/// Tracks acquisitions so a failed build can hand everything back.
struct Acquisitions<'a> {
    backend: &'a mut dyn GraphicsBackend,
    acquired: Vec<ResourceId>,
}

impl<'a> Acquisitions<'a> {
    fn acquire(
        &mut self,
        what: impl Into<String>,
        geometry: Geometry,
        material: &Material,
        transform: Transform,
    ) -> Result<Renderable, SceneError> {
        let resource = self
            .backend
            .acquire(&geometry, material)
            .map_err(|source| SceneError::Acquire {
                what: what.into(),
                source,
            })?;
        self.acquired.push(resource);
        Ok(Renderable {
            resource,
            transform,
        })
    }

    fn rollback(self) {
        for id in self.acquired.into_iter().rev() {
            if let Err(e) = self.backend.release(id) {
                log::warn!("rollback: failed to release {}: {}", id, e);
            }
        }
    }
}

/// Build the scene with a thread-local star field.
pub fn build_scene(
    backend: &mut dyn GraphicsBackend,
    topology: &Topology,
    layout: &Layout,
) -> Result<SceneHandle, SceneError> {
    build_scene_with_rng(backend, topology, layout, &mut rand::thread_rng())
}

/// Acquire every resource of the scene. On failure, everything acquired so
/// far is released before the error is returned.
pub fn build_scene_with_rng<R: Rng + ?Sized>(
    backend: &mut dyn GraphicsBackend,
    topology: &Topology,
    layout: &Layout,
    rng: &mut R,
) -> Result<SceneHandle, SceneError> {
    let mut acq = Acquisitions {
        backend,
        acquired: Vec::new(),
    };
    match populate(&mut acq, topology, layout, rng) {
        Ok(scene) => {
            log::info!(
                "scene built: {} nodes, {} edges, {} resources",
                scene.nodes.len(),
                scene.edges.len(),
                acq.acquired.len()
            );
            Ok(scene)
        }
        Err(e) => {
            log::error!("scene build failed, releasing {} resources: {}", acq.acquired.len(), e);
            acq.rollback();
            Err(e)
        }
    }
}

fn populate<R: Rng + ?Sized>(
    acq: &mut Acquisitions<'_>,
    topology: &Topology,
    layout: &Layout,
    rng: &mut R,
) -> Result<SceneHandle, SceneError> {
    let mut nodes = Vec::with_capacity(topology.nodes().len());
    for spec in topology.nodes() {
        let position = layout.position(spec.id);
        let material = Material::standard(spec.color, INITIAL_EMISSIVE, NODE_OPACITY);
        let sphere = acq.acquire(
            format!("{} sphere", spec.id),
            Geometry::Sphere {
                radius: NODE_RADIUS,
                segments: NODE_SEGMENTS,
            },
            &material,
            Transform::at(position),
        )?;
        let glow = acq.acquire(
            format!("{} glow", spec.id),
            Geometry::Sphere {
                radius: GLOW_RADIUS,
                segments: NODE_SEGMENTS,
            },
            &Material::basic(spec.color, GLOW_OPACITY).back_side(),
            Transform::at(position),
        )?;
        let label = acq.acquire(
            format!("{} label", spec.id),
            Geometry::Label {
                text: spec.id.as_str().to_string(),
                scale: LABEL_SCALE,
            },
            &Material::basic(Color::WHITE, 1.0),
            Transform::at(position + Vec3::Y * LABEL_OFFSET),
        )?;
        nodes.push(NodeVisual {
            node: Node {
                id: spec.id,
                name: spec.name,
                ring: spec.ring,
                color: spec.color,
                position,
                intensity: DEFAULT_INTENSITY,
            },
            material,
            sphere,
            glow,
            label,
        });
    }

    let mut edges = Vec::with_capacity(topology.edges().len());
    for spec in topology.edges() {
        let (from, to) = layout.endpoints(spec);
        let line = acq.acquire(
            format!("edge {}->{}", spec.source, spec.target),
            Geometry::Lines {
                points: vec![from, to],
            },
            &Material::basic(spec.color, spec.opacity),
            Transform::default(),
        )?;
        edges.push(Edge {
            source: spec.source,
            target: spec.target,
            category: spec.category,
            line,
        });
    }

    let core = acq.acquire(
        "core sphere",
        Geometry::Sphere {
            radius: CORE_RADIUS,
            segments: CORE_SEGMENTS,
        },
        &Material::basic(CORE_COLOR, CORE_OPACITY).wireframe(),
        Transform::default(),
    )?;

    let positions = (0..STAR_COUNT)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-STAR_EXTENT..=STAR_EXTENT),
                rng.gen_range(-STAR_EXTENT..=STAR_EXTENT),
                rng.gen_range(-STAR_EXTENT..=STAR_EXTENT),
            )
        })
        .collect();
    let stars = acq.acquire(
        "star field",
        Geometry::Points {
            positions,
            size: STAR_SIZE,
        },
        &Material::basic(Color::WHITE, 1.0),
        Transform::default(),
    )?;

    Ok(SceneHandle {
        nodes,
        edges,
        core,
        stars,
        released: false,
    })
}

impl SceneHandle {
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().map(|v| &v.node)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.visual(id).map(|v| &v.node)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_transform(&self, id: NodeId) -> Option<Transform> {
        self.visual(id).map(|v| v.sphere.transform)
    }

    pub fn node_resource(&self, id: NodeId) -> Option<ResourceId> {
        self.visual(id).map(|v| v.sphere.resource)
    }

    pub fn node_material(&self, id: NodeId) -> Option<Material> {
        self.visual(id).map(|v| v.material)
    }

    pub fn core_transform(&self) -> Transform {
        self.core.transform
    }

    pub fn resource_ids(&self) -> Vec<ResourceId> {
        let mut ids = Vec::with_capacity(self.resource_count());
        for v in &self.nodes {
            ids.extend([v.sphere.resource, v.glow.resource, v.label.resource]);
        }
        ids.extend(self.edges.iter().map(|e| e.line.resource));
        ids.push(self.core.resource);
        ids.push(self.stars.resource);
        ids
    }

    pub fn resource_count(&self) -> usize {
        self.nodes.len() * 3 + self.edges.len() + 2
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn visual(&self, id: NodeId) -> Option<&NodeVisual> {
        self.nodes.iter().find(|v| v.node.id == id)
    }

    /// Set one node's glow. Intensity is clamped to [0, 1] before use.
    pub fn set_intensity(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        id: NodeId,
        intensity: f32,
    ) -> RenderResult<()> {
        if self.released {
            return Ok(());
        }
        let Some(visual) = self.nodes.iter_mut().find(|v| v.node.id == id) else {
            return Ok(());
        };
        let clamped = if intensity.is_nan() {
            DEFAULT_INTENSITY
        } else {
            intensity.clamp(0.0, 1.0)
        };
        visual.node.intensity = clamped;
        visual.material = visual
            .material
            .with_emissive_intensity(emissive_strength(clamped));
        backend.update_material(visual.sphere.resource, &visual.material)
    }

    /// Write a whole activity map. Nodes missing from the map keep their glow.
    pub fn apply_activity(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        activity: &ActivityMap,
    ) -> RenderResult<()> {
        for (id, intensity) in activity {
            self.set_intensity(backend, *id, *intensity)?;
        }
        Ok(())
    }

    pub fn apply_frame(&mut self, frame: &FrameTransforms) {
        self.core.transform.rotation = frame.core_rotation;
        for v in &mut self.nodes {
            v.sphere.transform.scale = Vec3::splat(frame.node_scale);
            let spin = v.sphere.transform.rotation.y + frame.node_spin_step;
            v.sphere.transform.rotation.y = spin.rem_euclid(TAU);
        }
    }

    /// Draw list, back to front: stars, core, edges, glows, nodes, labels.
    pub fn draw_commands(&self) -> Vec<DrawCommand> {
        let mut commands = Vec::with_capacity(self.resource_count());
        commands.push(self.stars.draw());
        commands.push(self.core.draw());
        commands.extend(self.edges.iter().map(|e| e.line.draw()));
        commands.extend(self.nodes.iter().map(|v| v.glow.draw()));
        commands.extend(self.nodes.iter().map(|v| v.sphere.draw()));
        commands.extend(self.nodes.iter().map(|v| v.label.draw()));
        commands
    }

    /// Release every resource. Keeps going past failures and reports the
    /// first one.
    pub fn teardown(&mut self, backend: &mut dyn GraphicsBackend) -> RenderResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let mut first_error = None;
        for id in self.resource_ids() {
            if let Err(e) = backend.release(id) {
                log::warn!("failed to release {}: {}", id, e);
                first_error.get_or_insert(e);
            }
        }
        log::info!("scene released");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
