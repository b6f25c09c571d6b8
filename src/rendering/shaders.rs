use std::collections::HashMap;

pub const MESH_SHADER: &str = "mesh";
pub const SPRITE_SHADER: &str = "sprite";

const COMMON_WGSL: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    camera_right: vec4<f32>,
    camera_up: vec4<f32>,
    ambient: vec4<f32>,
    light0_pos: vec4<f32>,
    light0_color: vec4<f32>,
    light1_pos: vec4<f32>,
    light1_color: vec4<f32>,
};

struct Object {
    model: mat4x4<f32>,
    color: vec4<f32>,
    emissive: vec4<f32>,
    // x: lit flag, yz: sprite scale
    params: vec4<f32>,
};

@group(0) @binding(0) var<uniform> globals: Globals;
@group(1) @binding(0) var<uniform> obj: Object;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};
"#;

const MESH_WGSL: &str = r#"
struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

@vertex
fn vs_main(v: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = obj.model * vec4<f32>(v.position, 1.0);
    out.clip = globals.view_proj * world;
    out.world_pos = world.xyz;
    out.normal = (obj.model * vec4<f32>(v.normal, 0.0)).xyz;
    return out;
}

// Point sprites: uv is the corner offset around the vertex position.
@vertex
fn vs_points(v: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let center = (obj.model * vec4<f32>(v.position, 1.0)).xyz;
    let world = center
        + globals.camera_right.xyz * v.uv.x * obj.params.y
        + globals.camera_up.xyz * v.uv.y * obj.params.z;
    out.clip = globals.view_proj * vec4<f32>(world, 1.0);
    out.world_pos = world;
    out.normal = globals.camera_pos.xyz - world;
    return out;
}

fn point_light(pos: vec4<f32>, color: vec4<f32>, world_pos: vec3<f32>, n: vec3<f32>) -> vec3<f32> {
    let l = normalize(pos.xyz - world_pos);
    return color.rgb * max(dot(n, l), 0.0);
}

@fragment
fn fs_main(f: VertexOutput, @builtin(front_facing) front: bool) -> @location(0) vec4<f32> {
    var rgb = obj.color.rgb;
    if (obj.params.x > 0.5) {
        var n = normalize(f.normal);
        if (!front) {
            n = -n;
        }
        let light = globals.ambient.rgb
            + point_light(globals.light0_pos, globals.light0_color, f.world_pos, n)
            + point_light(globals.light1_pos, globals.light1_color, f.world_pos, n);
        rgb = obj.color.rgb * light + obj.emissive.rgb * obj.emissive.w;
    }
    return vec4<f32>(rgb, obj.color.a);
}
"#;

const SPRITE_WGSL: &str = r#"
@group(2) @binding(0) var label_tex: texture_2d<f32>;
@group(2) @binding(1) var label_sampler: sampler;

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(v: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let center = (obj.model * vec4<f32>(0.0, 0.0, 0.0, 1.0)).xyz;
    let world = center
        + globals.camera_right.xyz * v.position.x * obj.params.y
        + globals.camera_up.xyz * v.position.y * obj.params.z;
    out.clip = globals.view_proj * vec4<f32>(world, 1.0);
    out.uv = v.uv;
    return out;
}

@fragment
fn fs_main(f: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(label_tex, label_sampler, f.uv);
    return vec4<f32>(texel.rgb * obj.color.rgb, texel.a * obj.color.a);
}
"#;

pub fn mesh_source() -> String {
    format!("{COMMON_WGSL}{MESH_WGSL}")
}

pub fn sprite_source() -> String {
    format!("{COMMON_WGSL}{SPRITE_WGSL}")
}

pub struct ShaderManager {
    shader_modules: HashMap<String, wgpu::ShaderModule>,
}

impl ShaderManager {
    pub fn new() -> Self {
        Self {
            shader_modules: HashMap::new(),
        }
    }

    /// Compile the built-in mesh and sprite shaders.
    pub fn with_builtin(device: &wgpu::Device) -> Self {
        let mut sm = Self::new();
        sm.load_wgsl_str(device, MESH_SHADER, &mesh_source());
        sm.load_wgsl_str(device, SPRITE_SHADER, &sprite_source());
        sm
    }

    pub fn load_wgsl_str(&mut self, device: &wgpu::Device, name: &str, source: &str) {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.to_owned().into()),
        });
        self.shader_modules.insert(name.to_string(), module);
    }

    pub fn get(&self, name: &str) -> Option<&wgpu::ShaderModule> {
        self.shader_modules.get(name)
    }
}

impl Default for ShaderManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_share_bindings() {
        for src in [mesh_source(), sprite_source()] {
            assert!(src.contains("@group(0) @binding(0) var<uniform> globals"));
            assert!(src.contains("fn vs_main"));
            assert!(src.contains("fn fs_main"));
        }
        assert!(sprite_source().contains("texture_2d"));
        assert!(mesh_source().contains("fn vs_points"));
    }
}
