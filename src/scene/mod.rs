/// Scene description: models, lights, camera and an optional sky.
pub mod mesh;
pub mod model;

pub use mesh::{Aabb, Mesh, Triangle, Vertex};
pub use model::{Model, ModelTransform};

use crate::camera::Camera;
use crate::rendering::texture::{checkerboard, gradient_sky, Texture};
use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Point light.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    pub radiance: Vec3,
}

pub struct Scene {
    pub models: Vec<Model>,
    pub lights: Vec<Light>,
    pub camera: Camera,
    pub sky: Option<Model>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            models: Vec::new(),
            lights: Vec::new(),
            camera,
            sky: None,
        }
    }

    pub fn add_model(&mut self, model: Model) {
        self.models.push(model);
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// Use `environment` (equirectangular) on an inward-facing sphere.
    pub fn set_sky(&mut self, environment: Arc<Texture<Vec3>>) {
        let sphere = Arc::new(Mesh::uv_sphere(64, 32).inverted());
        self.sky = Some(Model::new(sphere, environment));
    }

    pub fn triangle_count(&self) -> usize {
        self.models.iter().map(Model::triangle_count).sum()
    }

    /// Models whose world bounds touch the view frustum, nearest first.
    pub fn visible_models(&self) -> Vec<&Model> {
        let frustum = self.camera.frustum();
        let eye = self.camera.position;

        let mut visible: Vec<(f32, &Model)> = self
            .models
            .par_iter()
            .filter_map(|model| {
                let bounds = model.world_bounds();
                frustum
                    .intersects_aabb(bounds.min, bounds.max)
                    .then(|| (model.world_center().distance(eye), model))
            })
            .collect();

        visible.sort_by(|a, b| a.0.total_cmp(&b.0));
        visible.into_iter().map(|(_, model)| model).collect()
    }

    /// Built-in scene: spheres and cubes on a checkered floor, two lights
    /// and a gradient sky, viewed from the default camera.
    pub fn demo(aspect_ratio: f32) -> Self {
        let mut camera = Camera::new(Vec3::new(0.0, 2.5, 9.0), aspect_ratio).with_fov_degrees(45.0);
        camera.look_at(Vec3::new(0.0, 0.5, 0.0));
        let mut scene = Scene::new(camera);

        let sphere = Arc::new(Mesh::uv_sphere(48, 24));
        let cube = Arc::new(Mesh::cube());
        let floor = Arc::new(Mesh::plane(12.0, 8));

        let warm = Arc::new(checkerboard(64, 8, Vec3::new(0.9, 0.45, 0.2), Vec3::new(0.95, 0.8, 0.4)));
        let cool = Arc::new(checkerboard(64, 4, Vec3::new(0.2, 0.4, 0.9), Vec3::new(0.6, 0.8, 1.0)));
        let tiles = Arc::new(checkerboard(128, 16, Vec3::splat(0.85), Vec3::splat(0.35)));

        scene.add_model(Model::new(floor, tiles).with_transform(ModelTransform::at(Vec3::new(0.0, -1.0, 0.0))));
        scene.add_model(Model::new(Arc::clone(&sphere), Arc::clone(&warm)));
        scene.add_model(
            Model::new(Arc::clone(&sphere), Arc::clone(&cool))
                .with_transform(ModelTransform::at(Vec3::new(-2.6, -0.4, 1.2)).with_scale(Vec3::splat(0.6))),
        );
        scene.add_model(
            Model::new(Arc::clone(&cube), Arc::clone(&cool)).with_transform(
                ModelTransform::at(Vec3::new(2.5, -0.3, 0.5))
                    .with_scale(Vec3::splat(0.7))
                    .with_rotation(Vec3::new(0.0, 35.0, 0.0)),
            ),
        );
        scene.add_model(
            Model::new(cube, warm).with_transform(
                ModelTransform::at(Vec3::new(0.8, -0.6, -3.0))
                    .with_scale(Vec3::new(1.6, 0.4, 0.4))
                    .with_rotation(Vec3::new(0.0, -20.0, 0.0)),
            ),
        );

        scene.add_light(Light {
            position: Vec3::new(3.0, 4.0, 4.0),
            radiance: Vec3::splat(6.0),
        });
        scene.add_light(Light {
            position: Vec3::new(-4.0, 2.0, -1.0),
            radiance: Vec3::new(2.0, 2.5, 4.0),
        });

        scene.set_sky(Arc::new(gradient_sky(
            256,
            128,
            Vec3::new(0.15, 0.3, 0.7),
            Vec3::new(0.75, 0.85, 0.95),
            Vec3::new(0.25, 0.22, 0.2),
        )));
        scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_model(at: Vec3) -> Model {
        Model::new(Arc::new(Mesh::cube()), Arc::new(Texture::filled(1, 1, Vec3::ONE)))
            .with_transform(ModelTransform::at(at))
    }

    #[test]
    fn visible_models_are_frustum_tested_and_sorted() {
        let mut scene = Scene::new(Camera::default_view(1.0));
        scene.add_model(unit_model(Vec3::new(0.0, 0.0, -10.0)));
        scene.add_model(unit_model(Vec3::new(0.0, 0.0, 20.0))); // behind the camera
        scene.add_model(unit_model(Vec3::new(0.0, 0.0, 0.0)));

        let visible = scene.visible_models();
        assert_eq!(visible.len(), 2);
        assert!(visible[0].world_center().abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(visible[1].world_center().abs_diff_eq(Vec3::new(0.0, 0.0, -10.0), 1e-6));
    }

    #[test]
    fn demo_scene_is_populated() {
        let scene = Scene::demo(16.0 / 9.0);
        assert_eq!(scene.models.len(), 5);
        assert_eq!(scene.lights.len(), 2);
        assert!(scene.sky.is_some());
        assert!(scene.triangle_count() > 1000);
        assert!(!scene.visible_models().is_empty());
    }
}
