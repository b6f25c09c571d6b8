//! In-memory graphics backend.
//!
//! Tessellates geometry exactly as the GPU backend would and keeps the
//! results in a resource table, but never touches a device. Used for smoke
//! runs without a display and for exercising scene lifecycles.

use super::meshes;
use super::{
    DrawCommand, FrameView, Geometry, GraphicsBackend, Material, RenderError, RenderResult,
    ResourceId,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct HeadlessResource {
    pub kind: &'static str,
    pub vertices: usize,
    pub indices: usize,
    pub material: Material,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    resources: BTreeMap<ResourceId, HeadlessResource>,
    next_id: u64,
    budget: Option<usize>,
    acquired_total: u64,
    released_total: u64,
    frames: u64,
    last_draw_count: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that refuses acquisitions once `max_live` resources are live.
    pub fn with_budget(max_live: usize) -> Self {
        Self {
            budget: Some(max_live),
            ..Self::default()
        }
    }

    pub fn resource(&self, id: ResourceId) -> Option<&HeadlessResource> {
        self.resources.get(&id)
    }

    pub fn acquired_total(&self) -> u64 {
        self.acquired_total
    }

    pub fn released_total(&self) -> u64 {
        self.released_total
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_draw_count(&self) -> usize {
        self.last_draw_count
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn acquire(&mut self, geometry: &Geometry, material: &Material) -> RenderResult<ResourceId> {
        if let Some(max) = self.budget {
            if self.resources.len() >= max {
                return Err(RenderError::Resource(format!(
                    "resource budget of {max} exhausted"
                )));
            }
        }
        let (vertices, indices) = match geometry {
            Geometry::Sphere { radius, segments } if material.wireframe => {
                (meshes::sphere_wireframe(*radius, *segments).len(), 0)
            }
            Geometry::Sphere { radius, segments } => {
                let mesh = meshes::sphere(*radius, *segments);
                (mesh.vertices.len(), mesh.indices.len())
            }
            Geometry::Lines { points } => (meshes::line_list(points).len(), 0),
            Geometry::Points { positions, .. } => (meshes::point_sprites(positions).len(), 0),
            Geometry::Label { text, .. } => {
                let bitmap = meshes::rasterize_label(text);
                debug_assert_eq!(bitmap.pixels.len(), (bitmap.width * bitmap.height * 4) as usize);
                (meshes::quad().len(), 0)
            }
        };
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        self.acquired_total += 1;
        self.resources.insert(
            id,
            HeadlessResource {
                kind: geometry.kind(),
                vertices,
                indices,
                material: *material,
            },
        );
        log::trace!("headless acquire {id} ({})", geometry.kind());
        Ok(id)
    }

    fn update_material(&mut self, id: ResourceId, material: &Material) -> RenderResult<()> {
        let res = self
            .resources
            .get_mut(&id)
            .ok_or(RenderError::UnknownResource(id))?;
        res.material = *material;
        Ok(())
    }

    fn release(&mut self, id: ResourceId) -> RenderResult<()> {
        self.resources
            .remove(&id)
            .ok_or(RenderError::UnknownResource(id))?;
        self.released_total += 1;
        Ok(())
    }

    fn render(&mut self, _view: &FrameView, commands: &[DrawCommand]) -> RenderResult<()> {
        if let Some(cmd) = commands
            .iter()
            .find(|c| !self.resources.contains_key(&c.resource))
        {
            return Err(RenderError::UnknownResource(cmd.resource));
        }
        self.frames += 1;
        self.last_draw_count = commands.len();
        Ok(())
    }

    fn live_resources(&self) -> usize {
        self.resources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::{Camera, Color, Lighting};
    use glam::{Mat4, Vec3};

    fn view() -> FrameView {
        FrameView::from_camera(
            &Camera::on_view_axis(12.0, 1.0),
            Color(0x0a0a0f),
            Lighting::default(),
        )
    }

    #[test]
    fn test_acquire_release_balance() {
        let mut b = HeadlessBackend::new();
        let id = b
            .acquire(
                &Geometry::Sphere {
                    radius: 0.8,
                    segments: 32,
                },
                &Material::standard(Color(0xfbbf24), 0.3, 0.7),
            )
            .unwrap();
        assert_eq!(b.live_resources(), 1);
        assert_eq!(b.resource(id).unwrap().kind, "sphere");
        assert!(b.resource(id).unwrap().indices > 0);
        b.release(id).unwrap();
        assert_eq!(b.live_resources(), 0);
        assert!(matches!(b.release(id), Err(RenderError::UnknownResource(_))));
        assert_eq!(b.released_total(), 1);
    }

    #[test]
    fn test_points_tessellate_to_sprites() {
        let mut b = HeadlessBackend::new();
        let id = b
            .acquire(
                &Geometry::Points {
                    positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                    size: 0.1,
                },
                &Material::basic(Color::WHITE, 0.8),
            )
            .unwrap();
        let res = b.resource(id).unwrap();
        assert_eq!(res.vertices, 18);
        assert_eq!(res.indices, 0);
    }

    #[test]
    fn test_budget_refuses_extra_resources() {
        let mut b = HeadlessBackend::with_budget(1);
        let geom = Geometry::Points {
            positions: vec![Vec3::ZERO],
            size: 0.1,
        };
        let mat = Material::basic(Color::WHITE, 1.0);
        b.acquire(&geom, &mat).unwrap();
        assert!(matches!(b.acquire(&geom, &mat), Err(RenderError::Resource(_))));
    }

    #[test]
    fn test_render_rejects_released_resource() {
        let mut b = HeadlessBackend::new();
        let id = b
            .acquire(
                &Geometry::Lines {
                    points: vec![Vec3::ZERO, Vec3::X],
                },
                &Material::basic(Color(0x00d4ff), 0.6),
            )
            .unwrap();
        let cmd = DrawCommand {
            resource: id,
            model: Mat4::IDENTITY,
        };
        b.render(&view(), &[cmd]).unwrap();
        assert_eq!(b.frames(), 1);
        assert_eq!(b.last_draw_count(), 1);
        b.release(id).unwrap();
        assert!(b.render(&view(), &[cmd]).is_err());
        assert_eq!(b.frames(), 1);
    }
}
