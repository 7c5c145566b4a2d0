/// Programmable stages of the pipeline.
///
/// Kept separate from the rasterizer so lighting models can evolve
/// independently of coverage and depth handling.
use super::framebuffer::Rgba;
use super::texture::{sample_spherical_map, LinearSampler, Texture};
use crate::camera::Camera;
use crate::scene::{Light, Model, Triangle};
use glam::{Mat3, Mat4, Vec2, Vec3};
use std::sync::Arc;

/// Vertex and fragment stages shared by every worker of a render call.
pub trait Shader: Sync {
    /// Fill `clip` for every corner and move attributes to world space.
    fn vertex(&self, triangle: &Triangle) -> Triangle;

    /// Color for one covered pixel from interpolated world attributes.
    fn fragment(&self, position: Vec3, normal: Vec3, uv: Vec2) -> Rgba;
}

/// Ambient plus directional Lambert lighting.
#[derive(Copy, Clone, Debug)]
pub struct ShadingConfig {
    /// Direction the light comes from (world space, normalized).
    pub light_dir: Vec3,
    pub ambient: f32,
    pub diffuse: f32,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            light_dir: Vec3::new(0.4, 1.0, 0.3).normalize(),
            ambient: 0.25,
            diffuse: 0.65,
        }
    }
}

/// Textured diffuse shading with one directional light and up to
/// [`LambertShader::MAX_LIGHTS`] point lights (inverse-square falloff).
pub struct LambertShader {
    model: Mat4,
    mvp: Mat4,
    albedo: Arc<Texture<Vec3>>,
    shading: ShadingConfig,
    lights: Vec<Light>,
}

impl LambertShader {
    pub const MAX_LIGHTS: usize = 4;

    pub fn new(model: &Model, camera: &Camera, lights: &[Light], shading: ShadingConfig) -> Self {
        Self {
            model: model.transform,
            mvp: camera.view_projection_matrix() * model.transform,
            albedo: Arc::clone(&model.albedo),
            shading,
            lights: lights.iter().take(Self::MAX_LIGHTS).copied().collect(),
        }
    }

    fn irradiance(&self, position: Vec3, normal: Vec3) -> Vec3 {
        let lambert = normal.dot(self.shading.light_dir).max(0.0);
        let base = Vec3::splat(self.shading.ambient + self.shading.diffuse * lambert);
        self.lights.iter().fold(base, |acc, light| {
            let to_light = light.position - position;
            let d2 = to_light.length_squared().max(1e-4);
            acc + light.radiance * (normal.dot(to_light / d2.sqrt()).max(0.0) / d2)
        })
    }
}

impl Shader for LambertShader {
    fn vertex(&self, triangle: &Triangle) -> Triangle {
        let mut out = *triangle;
        for v in &mut out.vertices {
            v.clip = self.mvp * v.position.extend(1.0);
            v.position = self.model.transform_point3(v.position);
            v.normal = self.model.transform_vector3(v.normal);
        }
        out
    }

    fn fragment(&self, position: Vec3, normal: Vec3, uv: Vec2) -> Rgba {
        let albedo = LinearSampler::sample(&self.albedo, uv.x, uv.y);
        let n = normal.normalize_or_zero();
        Rgba::from_unit_vec3(albedo * self.irradiance(position, n))
    }
}

/// Sky depth: a few ulps inside the far plane so interpolation rounding
/// cannot push it out of `[0, 1]`.
pub const SKY_DEPTH: f32 = 1.0 - 1e-6;

/// Environment sphere around the camera.
///
/// The view translation is dropped and depth is forced to the far plane,
/// so the sky only fills pixels nothing else has covered.
pub struct SkyShader {
    model: Mat4,
    rotation_vp: Mat4,
    environment: Arc<Texture<Vec3>>,
}

impl SkyShader {
    pub fn new(sky: &Model, camera: &Camera) -> Self {
        let rotation_only = Mat4::from_mat3(Mat3::from_mat4(camera.view_matrix()));
        Self {
            model: sky.transform,
            rotation_vp: camera.projection_matrix() * rotation_only,
            environment: Arc::clone(&sky.albedo),
        }
    }
}

impl Shader for SkyShader {
    fn vertex(&self, triangle: &Triangle) -> Triangle {
        let mut out = *triangle;
        for v in &mut out.vertices {
            let clip = self.rotation_vp * self.model * v.position.extend(1.0);
            v.clip = glam::Vec4::new(clip.x, clip.y, clip.w * SKY_DEPTH, clip.w);
            v.position = self.model.transform_point3(v.position);
            v.normal = self.model.transform_vector3(v.normal);
        }
        out
    }

    fn fragment(&self, position: Vec3, _normal: Vec3, _uv: Vec2) -> Rgba {
        let uv = sample_spherical_map(position.normalize_or_zero());
        Rgba::from_unit_vec3(LinearSampler::sample(&self.environment, uv.x, uv.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Mesh, ModelTransform, Vertex};

    fn flat_model(color: Vec3) -> Model {
        Model::new(Arc::new(Mesh::cube()), Arc::new(Texture::filled(1, 1, color)))
    }

    #[test]
    fn lambert_vertex_moves_to_world_and_clip() {
        let model = flat_model(Vec3::ONE).with_transform(ModelTransform::at(Vec3::new(0.0, 0.0, -2.0)));
        let camera = Camera::default_view(1.0);
        let shader = LambertShader::new(&model, &camera, &[], ShadingConfig::default());

        let v = Vertex::new(Vec3::ZERO, Vec3::Y, Vec2::ZERO);
        let out = shader.vertex(&Triangle::new(v, v, v));
        assert!(out.vertices[0].position.abs_diff_eq(Vec3::new(0.0, 0.0, -2.0), 1e-6));
        assert!((out.vertices[0].clip.w - 10.0).abs() < 1e-4, "w is view distance");
        assert_eq!(out.vertices[0].normal, Vec3::Y);
    }

    #[test]
    fn lambert_faces_toward_light_are_brighter() {
        let model = flat_model(Vec3::ONE);
        let shading = ShadingConfig {
            light_dir: Vec3::Y,
            ambient: 0.1,
            diffuse: 0.8,
        };
        let shader = LambertShader::new(&model, &Camera::default_view(1.0), &[], shading);
        let lit = shader.fragment(Vec3::ZERO, Vec3::Y, Vec2::ZERO);
        let unlit = shader.fragment(Vec3::ZERO, Vec3::NEG_Y, Vec2::ZERO);
        assert_eq!(lit, Rgba::from_unit_vec3(Vec3::splat(0.9)));
        assert_eq!(unlit, Rgba::from_unit_vec3(Vec3::splat(0.1)));
    }

    #[test]
    fn point_lights_add_falloff() {
        let model = flat_model(Vec3::ONE);
        let shading = ShadingConfig {
            light_dir: Vec3::Y,
            ambient: 0.0,
            diffuse: 0.0,
        };
        let light = Light {
            position: Vec3::new(0.0, 2.0, 0.0),
            radiance: Vec3::splat(2.0),
        };
        let shader = LambertShader::new(&model, &Camera::default_view(1.0), &[light], shading);
        // 2.0 / 2² = 0.5 straight below the light.
        assert_eq!(
            shader.fragment(Vec3::ZERO, Vec3::Y, Vec2::ZERO),
            Rgba::from_unit_vec3(Vec3::splat(0.5))
        );
    }

    #[test]
    fn sky_sits_on_far_plane() {
        let sky = flat_model(Vec3::new(0.2, 0.4, 0.8));
        let camera = Camera::default_view(1.0);
        let shader = SkyShader::new(&sky, &camera);
        let v = Vertex::new(Vec3::new(0.0, 0.0, -1.0), Vec3::Z, Vec2::ZERO);
        let mut out = shader.vertex(&Triangle::new(v, v, v));
        out.homogenize();
        assert!((out.vertices[0].clip.z - 1.0).abs() < 1e-5);
        assert!(out.vertices[0].clip.z < 1.0);
        assert_eq!(
            shader.fragment(out.vertices[0].position, Vec3::ZERO, Vec2::ZERO),
            Rgba::from_unit_vec3(Vec3::new(0.2, 0.4, 0.8))
        );
    }
}
