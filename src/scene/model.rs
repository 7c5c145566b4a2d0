use super::mesh::{Aabb, Mesh};
use crate::rendering::texture::Texture;
use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Placement of a model: Euler rotation in degrees (X, then Y, then Z),
/// per-axis scale and translation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTransform {
    pub rotation: Vec3,
    pub scale: Vec3,
    pub translation: Vec3,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            translation: Vec3::ZERO,
        }
    }
}

impl ModelTransform {
    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, degrees: Vec3) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        let r = self.rotation * (std::f32::consts::PI / 180.0);
        let rotation = Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z);
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.translation)
    }
}

/// A mesh placed in the world with its surface color.
#[derive(Clone)]
pub struct Model {
    pub mesh: Arc<Mesh>,
    pub transform: Mat4,
    pub albedo: Arc<Texture<Vec3>>,
    /// Object-space bounds of `mesh`.
    pub bounds: Aabb,
}

impl Model {
    pub fn new(mesh: Arc<Mesh>, albedo: Arc<Texture<Vec3>>) -> Self {
        let bounds = mesh.bounds();
        Self {
            mesh,
            transform: Mat4::IDENTITY,
            albedo,
            bounds,
        }
    }

    pub fn apply_transform(&mut self, transform: &ModelTransform) {
        self.transform = transform.matrix();
    }

    pub fn with_transform(mut self, transform: ModelTransform) -> Self {
        self.apply_transform(&transform);
        self
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.mesh.len()
    }

    pub fn world_bounds(&self) -> Aabb {
        self.bounds.transformed(&self.transform)
    }

    pub fn world_center(&self) -> Vec3 {
        self.transform.transform_point3(self.bounds.center())
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("triangles", &self.mesh.len())
            .field("transform", &self.transform)
            .field("bounds", &self.bounds)
            .finish()
    }
}
