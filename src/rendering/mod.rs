//! Rendering module for the brain model
//!
//! Everything the scene needs from a graphics surface goes through the
//! [`GraphicsBackend`] capability: acquire a resource for a geometry and
//! material, update its material, release it, and draw a frame. The wgpu
//! backend draws to a window; the headless backend keeps an in-memory
//! resource table.

pub mod camera;
pub mod headless;
pub mod meshes;
pub mod renderer;
pub mod shaders;

pub use camera::{Camera, CameraController, CameraState, EventDisposition, PointerEvent};
pub use headless::HeadlessBackend;
pub use renderer::WgpuBackend;

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

/// Packed 0xRRGGBB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Color = Color(0xffffff);

    pub fn rgb(self) -> [f32; 3] {
        let r = ((self.0 >> 16) & 0xff) as f32 / 255.0;
        let g = ((self.0 >> 8) & 0xff) as f32 / 255.0;
        let b = (self.0 & 0xff) as f32 / 255.0;
        [r, g, b]
    }

    pub fn rgba(self, alpha: f32) -> [f32; 4] {
        let [r, g, b] = self.rgb();
        [r, g, b, alpha]
    }
}

/// Common vertex type for 3D rendering
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coords,
        }
    }

    /// Get the vertex buffer layout for wgpu
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Texture coordinates
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Shape of a renderable resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Sphere { radius: f32, segments: u32 },
    /// Pairs of endpoints, one segment per pair.
    Lines { points: Vec<Vec3> },
    /// Camera-facing square sprites, `size` world units across.
    Points { positions: Vec<Vec3>, size: f32 },
    /// Camera-facing text quad of `scale` world units.
    Label { text: String, scale: Vec2 },
}

impl Geometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Sphere { .. } => "sphere",
            Geometry::Lines { .. } => "lines",
            Geometry::Points { .. } => "points",
            Geometry::Label { .. } => "label",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Back,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emissive {
    pub color: Color,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Color,
    pub opacity: f32,
    /// Lit materials receive ambient and point lights; unlit ones draw flat.
    pub lit: bool,
    pub emissive: Option<Emissive>,
    pub side: Side,
    pub wireframe: bool,
}

impl Material {
    /// Flat-colored material, unaffected by lights.
    pub fn basic(color: Color, opacity: f32) -> Self {
        Self {
            color,
            opacity,
            lit: false,
            emissive: None,
            side: Side::Front,
            wireframe: false,
        }
    }

    /// Lit material glowing in its own color.
    pub fn standard(color: Color, emissive_intensity: f32, opacity: f32) -> Self {
        Self {
            color,
            opacity,
            lit: true,
            emissive: Some(Emissive {
                color,
                intensity: emissive_intensity,
            }),
            side: Side::Front,
            wireframe: false,
        }
    }

    pub fn back_side(mut self) -> Self {
        self.side = Side::Back;
        self
    }

    pub fn wireframe(mut self) -> Self {
        self.wireframe = true;
        self
    }

    pub fn emissive_intensity(&self) -> f32 {
        self.emissive.map(|e| e.intensity).unwrap_or(0.0)
    }

    pub fn with_emissive_intensity(mut self, intensity: f32) -> Self {
        if let Some(e) = self.emissive.as_mut() {
            e.intensity = intensity;
        }
        self
    }
}

/// Position, Euler rotation (XYZ, radians) and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// Opaque handle to a backend resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub resource: ResourceId,
    pub model: Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Color,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient: Color,
    pub ambient_intensity: f32,
    pub points: [PointLight; 2],
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: Color::WHITE,
            ambient_intensity: 0.5,
            points: [
                PointLight {
                    position: Vec3::new(10.0, 10.0, 10.0),
                    color: Color::WHITE,
                    intensity: 1.0,
                },
                PointLight {
                    position: Vec3::new(-10.0, -10.0, -10.0),
                    color: Color(0x00d4ff),
                    intensity: 0.5,
                },
            ],
        }
    }
}

/// Everything a backend needs about the viewer for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameView {
    pub view_proj: Mat4,
    pub camera_position: Vec3,
    pub camera_right: Vec3,
    pub camera_up: Vec3,
    pub background: Color,
    pub lighting: Lighting,
}

impl FrameView {
    pub fn from_camera(camera: &Camera, background: Color, lighting: Lighting) -> Self {
        Self {
            view_proj: camera.view_projection(),
            camera_position: camera.position,
            camera_right: camera.right,
            camera_up: camera.up,
            background,
            lighting,
        }
    }
}

/// Uniform data shared by every draw in a frame
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Globals {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub camera_right: [f32; 4],
    pub camera_up: [f32; 4],
    pub ambient: [f32; 4],
    pub light0_pos: [f32; 4],
    pub light0_color: [f32; 4],
    pub light1_pos: [f32; 4],
    pub light1_color: [f32; 4],
}

impl Globals {
    pub fn from_view(view: &FrameView) -> Self {
        let scaled = |c: Color, k: f32| {
            let [r, g, b] = c.rgb();
            [r * k, g * k, b * k, 1.0]
        };
        let [l0, l1] = view.lighting.points;
        Self {
            view_proj: view.view_proj.to_cols_array_2d(),
            camera_pos: view.camera_position.extend(1.0).to_array(),
            camera_right: view.camera_right.extend(0.0).to_array(),
            camera_up: view.camera_up.extend(0.0).to_array(),
            ambient: scaled(view.lighting.ambient, view.lighting.ambient_intensity),
            light0_pos: l0.position.extend(1.0).to_array(),
            light0_color: scaled(l0.color, l0.intensity),
            light1_pos: l1.position.extend(1.0).to_array(),
            light1_color: scaled(l1.color, l1.intensity),
        }
    }
}

/// Rendering error types
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no suitable graphics adapter")]
    NoAdapter,
    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface creation failed: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("Resource creation error: {0}")]
    Resource(String),
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// The capability a scene is built against.
pub trait GraphicsBackend {
    fn acquire(&mut self, geometry: &Geometry, material: &Material) -> RenderResult<ResourceId>;

    fn update_material(&mut self, id: ResourceId, material: &Material) -> RenderResult<()>;

    fn release(&mut self, id: ResourceId) -> RenderResult<()>;

    /// Draw `commands` in order as one render pass.
    fn render(&mut self, view: &FrameView, commands: &[DrawCommand]) -> RenderResult<()>;

    fn live_resources(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_unpacks_channels() {
        assert_eq!(Color(0xff0000).rgb(), [1.0, 0.0, 0.0]);
        assert_eq!(Color(0x00ff00).rgba(0.5), [0.0, 1.0, 0.0, 0.5]);
        let [r, g, b] = Color(0x0a0a0f).rgb();
        assert!((r - 10.0 / 255.0).abs() < 1e-6);
        assert_eq!(r, g);
        assert!((b - 15.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_transform_matrix_places_origin() {
        let mut t = Transform::at(Vec3::new(1.0, 2.0, 3.0));
        t.scale = Vec3::splat(2.0);
        t.rotation.y = 0.7;
        let origin = t.matrix().transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
        let unit = t.matrix().transform_vector3(Vec3::Y);
        assert!((unit.length() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_material_emissive_update() {
        let m = Material::standard(Color(0x3b82f6), 0.3, 0.7);
        assert_eq!(m.emissive_intensity(), 0.3);
        assert_eq!(m.with_emissive_intensity(0.25).emissive_intensity(), 0.25);
        let flat = Material::basic(Color::WHITE, 1.0).with_emissive_intensity(0.9);
        assert_eq!(flat.emissive_intensity(), 0.0);
    }

    #[test]
    fn test_globals_scale_light_colors() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 12.0), Vec3::ZERO, 1.5);
        let view = FrameView::from_camera(&camera, Color(0x0a0a0f), Lighting::default());
        let g = Globals::from_view(&view);
        assert_eq!(g.ambient, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(g.light1_color[0], 0.0);
        assert!((g.light1_color[2] - 0.5).abs() < 1e-6);
        assert_eq!(g.camera_pos, [0.0, 0.0, 12.0, 1.0]);
    }
}
