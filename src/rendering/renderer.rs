/// Frame orchestration: owns the color and depth targets and drives the
/// per-triangle pipeline over the worker pool.
///
/// One range-runner call per model; every worker pulls triangle indices and
/// runs cull → vertex shader → coarse clip → perspective divide →
/// rasterization on its own. Color and depth cells are shared by all
/// workers without locks. Overlapping triangles processed at the same time
/// may race on a pixel (test and write are not one atomic step), so the
/// winner of such a pixel is not deterministic.
use super::depth::{DepthBuffer, DepthTest};
use super::framebuffer::{ColorBuffer, Rgba};
use super::rasterizer::{raster_triangle, RasterOptions};
use super::shading::{LambertShader, ShadingConfig, Shader, SkyShader};
use crate::config::RenderConfig;
use crate::count_call;
use crate::error::{RenderError, RenderResult};
use crate::parallel::{parallel_for, TaskExecutor};
use crate::scene::{Model, Scene, Triangle};
use glam::{Mat4, Vec3};
use std::ops::AddAssign;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Back faces are culled when `forward · normal` exceeds this.
const BACK_FACE_EPSILON: f32 = 1e-4;

/// Triangle counts for one or more render calls.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub triangles: usize,
    pub culled: usize,
    pub clipped: usize,
    /// Triangles that wrote at least one pixel.
    pub rasterized: usize,
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, rhs: Self) {
        self.triangles += rhs.triangles;
        self.culled += rhs.culled;
        self.clipped += rhs.clipped;
        self.rasterized += rhs.rasterized;
    }
}

#[derive(Default)]
struct StatCounters {
    culled: AtomicUsize,
    clipped: AtomicUsize,
    rasterized: AtomicUsize,
}

pub struct SoftRenderer {
    config: RenderConfig,
    executor: Arc<TaskExecutor>,
    color: ColorBuffer,
    depth: DepthBuffer,
    clear_color: Rgba,
}

impl SoftRenderer {
    pub fn new(config: RenderConfig, executor: Arc<TaskExecutor>) -> RenderResult<Self> {
        config.validate()?;
        let (color, depth) = allocate_targets(&config, &executor, config.width, config.height)?;
        Ok(Self {
            config,
            executor,
            color,
            depth,
            clear_color: Rgba::TRANSPARENT,
        })
    }

    /// Replace both targets with fresh `width × height` ones, using the
    /// depth variant the config selects.
    pub fn create_frame_buffer(&mut self, width: usize, height: usize) -> RenderResult<()> {
        let (color, depth) = allocate_targets(&self.config, &self.executor, width, height)?;
        self.color = color;
        self.depth = depth;
        self.config.width = width;
        self.config.height = height;
        Ok(())
    }

    /// Switch depth variant; the targets are recreated at the current size.
    pub fn set_hierarchical_depth(&mut self, enabled: bool) -> RenderResult<()> {
        if self.config.hierarchical_depth == enabled {
            return Ok(());
        }
        self.config.hierarchical_depth = enabled;
        self.create_frame_buffer(self.config.width, self.config.height)
    }

    pub fn set_clear_color(&mut self, color: Rgba) {
        self.clear_color = color;
    }

    pub fn clear_frame_buffer(&self) {
        count_call!(frame_clears);
        self.color.clear(&self.executor, self.clear_color);
        self.depth.clear();
    }

    #[inline]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    #[inline]
    pub fn frame(&self) -> &ColorBuffer {
        &self.color
    }

    #[inline]
    pub fn depth(&self) -> &DepthBuffer {
        &self.depth
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.color.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.color.height()
    }

    /// Draw every triangle of `model` with `shader`.
    ///
    /// A panic inside the shader stops the call and comes back as
    /// [`RenderError::TaskPanicked`]; pixels already written stay written.
    /// A stopped executor is reported as [`RenderError::ExecutorStopped`].
    pub fn render<S>(&self, shader: &S, model: &Model, camera_forward: Vec3, clip: bool) -> RenderResult<RenderStats>
    where
        S: Shader + ?Sized,
    {
        if self.executor.is_stopped() {
            return Err(RenderError::ExecutorStopped);
        }
        let triangles = &model.mesh.triangles;
        let counters = StatCounters::default();
        let options = RasterOptions {
            gamma: self.config.gamma,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            parallel_for(&self.executor, 0..triangles.len(), None, |_, index| {
                count_call!(triangles_submitted);
                let triangle = &triangles[index];

                if is_back_facing(triangle, &model.transform, camera_forward) {
                    count_call!(triangles_culled);
                    counters.culled.fetch_add(1, Ordering::Relaxed);
                    return;
                }

                let mut primitive = shader.vertex(triangle);
                if clip && is_outside_clip_volume(&primitive) {
                    count_call!(triangles_clipped);
                    counters.clipped.fetch_add(1, Ordering::Relaxed);
                    return;
                }

                primitive.homogenize();
                if raster_triangle(primitive, shader, &self.color, &self.depth, options) {
                    count_call!(triangles_rasterized);
                    counters.rasterized.fetch_add(1, Ordering::Relaxed);
                }
            });
        }));
        outcome.map_err(|payload| RenderError::from_panic(payload.as_ref()))?;

        let stats = RenderStats {
            triangles: triangles.len(),
            culled: counters.culled.into_inner(),
            clipped: counters.clipped.into_inner(),
            rasterized: counters.rasterized.into_inner(),
        };
        tracing::debug!(
            triangles = stats.triangles,
            culled = stats.culled,
            clipped = stats.clipped,
            rasterized = stats.rasterized,
            "model rendered"
        );
        Ok(stats)
    }

    /// Visible models near to far with Lambert shading, then the sky.
    pub fn render_scene(&self, scene: &Scene, shading: ShadingConfig) -> RenderResult<RenderStats> {
        crate::perf_scope!("render_scene");
        let camera = &scene.camera;
        let forward = camera.forward();
        let mut total = RenderStats::default();

        let models = scene.visible_models();
        tracing::debug!(visible = models.len(), total = scene.models.len(), "rendering scene");
        for model in models {
            let shader = LambertShader::new(model, camera, &scene.lights, shading);
            total += self.render(&shader, model, forward, self.config.clip)?;
        }

        if let Some(sky) = &scene.sky {
            let shader = SkyShader::new(sky, camera);
            total += self.render(&shader, sky, forward, self.config.clip)?;
        }
        Ok(total)
    }
}

fn allocate_targets(
    config: &RenderConfig,
    executor: &Arc<TaskExecutor>,
    width: usize,
    height: usize,
) -> RenderResult<(ColorBuffer, DepthBuffer)> {
    let depth = DepthBuffer::new(config.depth_kind(), width, height, Arc::clone(executor))?;
    let color = ColorBuffer::new(width, height);
    depth.clear();
    tracing::info!(width, height, depth = ?depth.kind(), "frame buffer created");
    Ok((color, depth))
}

/// Face normal from the object-space winding, moved by `model` as a direction.
#[inline]
pub fn is_back_facing(triangle: &Triangle, model: &Mat4, camera_forward: Vec3) -> bool {
    let normal = model.transform_vector3(triangle.face_normal());
    camera_forward.dot(normal) > BACK_FACE_EPSILON
}

/// True only when every corner lies outside `-w ≤ x, y ≤ w`, `0 ≤ z ≤ w`.
#[inline]
pub fn is_outside_clip_volume(triangle: &Triangle) -> bool {
    triangle.vertices.iter().all(|v| {
        let c = v.clip;
        let inside = (-c.w..=c.w).contains(&c.x) && (-c.w..=c.w).contains(&c.y) && (0.0..=c.w).contains(&c.z);
        !inside
    })
}
