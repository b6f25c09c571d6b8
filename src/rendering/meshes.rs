//! CPU-side geometry: tessellated spheres, line lists, point sprites and
//! label bitmaps. Backends turn these into buffers and textures.

use super::Vertex;
use font8x8::legacy::BASIC_LEGACY;
use glam::Vec3;
use std::f32::consts::PI;

pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// UV sphere with `segments` slices and `segments / 2` stacks.
pub fn sphere(radius: f32, segments: u32) -> MeshData {
    let slices = segments.max(3);
    let stacks = (segments / 2).max(2);
    let mut vertices = Vec::with_capacity(((slices + 1) * (stacks + 1)) as usize);
    for stack in 0..=stacks {
        let v = stack as f32 / stacks as f32;
        let theta = v * PI;
        for slice in 0..=slices {
            let u = slice as f32 / slices as f32;
            let phi = u * 2.0 * PI;
            let normal = Vec3::new(-phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin());
            vertices.push(Vertex::new(
                (normal * radius).to_array(),
                normal.to_array(),
                [u, v],
            ));
        }
    }
    let row = slices + 1;
    let mut indices = Vec::with_capacity((slices * stacks * 6) as usize);
    for stack in 0..stacks {
        for slice in 0..slices {
            let a = stack * row + slice;
            let b = a + row;
            // Skip the degenerate triangles at the poles.
            if stack != 0 {
                indices.extend_from_slice(&[a, b, a + 1]);
            }
            if stack != stacks - 1 {
                indices.extend_from_slice(&[a + 1, b, b + 1]);
            }
        }
    }
    MeshData { vertices, indices }
}

/// Latitude and longitude lines of a sphere as a line list.
pub fn sphere_wireframe(radius: f32, segments: u32) -> Vec<Vertex> {
    let mesh = sphere(radius, segments);
    let slices = segments.max(3);
    let stacks = (segments / 2).max(2);
    let row = slices + 1;
    let mut lines = Vec::new();
    for stack in 0..=stacks {
        for slice in 0..slices {
            let a = (stack * row + slice) as usize;
            if stack != 0 && stack != stacks {
                lines.push(mesh.vertices[a]);
                lines.push(mesh.vertices[a + 1]);
            }
            if stack != stacks {
                lines.push(mesh.vertices[a]);
                lines.push(mesh.vertices[a + row as usize]);
            }
        }
    }
    lines
}

pub fn line_list(points: &[Vec3]) -> Vec<Vertex> {
    points
        .chunks_exact(2)
        .flatten()
        .map(|p| Vertex::new(p.to_array(), [0.0, 0.0, 1.0], [0.0, 0.0]))
        .collect()
}

const QUAD_CORNERS: [[f32; 2]; 6] = [
    [-0.5, -0.5],
    [0.5, -0.5],
    [0.5, 0.5],
    [-0.5, -0.5],
    [0.5, 0.5],
    [-0.5, 0.5],
];

/// Two triangles per point. Every vertex sits on the point itself and `uv`
/// holds its corner offset, which the vertex shader spreads along the
/// camera's right and up axes.
pub fn point_sprites(positions: &[Vec3]) -> Vec<Vertex> {
    positions
        .iter()
        .flat_map(|p| {
            QUAD_CORNERS
                .iter()
                .map(move |c| Vertex::new(p.to_array(), [0.0, 0.0, 1.0], *c))
        })
        .collect()
}

/// Unit quad centered on the origin, two triangles.
pub fn quad() -> Vec<Vertex> {
    QUAD_CORNERS
        .iter()
        .map(|&[x, y]| Vertex::new([x, y, 0.0], [0.0, 0.0, 1.0], [x + 0.5, 0.5 - y]))
        .collect()
}

pub const LABEL_WIDTH: u32 = 256;
pub const LABEL_HEIGHT: u32 = 64;
const GLYPH_SIZE: u32 = 8;
const GLYPH_SCALE: u32 = 4;

/// RGBA8 text image, white glyphs on transparent.
pub struct LabelBitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

fn glyph(ch: char) -> [u8; 8] {
    let index = ch as usize;
    if index < BASIC_LEGACY.len() {
        BASIC_LEGACY[index]
    } else {
        BASIC_LEGACY[b'?' as usize]
    }
}

/// Rasterize `text` centered in a 256x64 canvas.
pub fn rasterize_label(text: &str) -> LabelBitmap {
    let width = LABEL_WIDTH;
    let height = LABEL_HEIGHT;
    let mut pixels = vec![0u8; (width * height * 4) as usize];
    let advance = GLYPH_SIZE * GLYPH_SCALE;
    let max_chars = (width / advance) as usize;
    let chars: Vec<char> = text.chars().take(max_chars).collect();
    let text_width = chars.len() as u32 * advance;
    let x0 = (width - text_width) / 2;
    let y0 = (height - GLYPH_SIZE * GLYPH_SCALE) / 2;
    for (n, ch) in chars.into_iter().enumerate() {
        let gx = x0 + n as u32 * advance;
        for (row, bits) in glyph(ch).iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                for sy in 0..GLYPH_SCALE {
                    for sx in 0..GLYPH_SCALE {
                        let px = gx + col * GLYPH_SCALE + sx;
                        let py = y0 + row as u32 * GLYPH_SCALE + sy;
                        let idx = ((py * width + px) * 4) as usize;
                        pixels[idx..idx + 4].copy_from_slice(&[0xff, 0xff, 0xff, 0xff]);
                    }
                }
            }
        }
    }
    LabelBitmap {
        width,
        height,
        pixels,
    }
}
