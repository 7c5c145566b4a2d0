/// Bounding-box triangle rasterizer with perspective-correct interpolation.
///
/// Stateless: each call works on one triangle whose corners have already
/// gone through a vertex shader and the perspective divide. Any number of
/// workers may rasterize into the same color and depth targets at once.
///
/// Pipeline per triangle:
/// 1. Doubled signed areas of the corner pairings, taken in NDC
/// 2. Viewport map to pixel space
/// 3. Clamped pixel bounding rectangle, coarse depth rejection
/// 4. Per pixel center: edge functions over `w`, inside test, depth test,
///    attribute interpolation, fragment, color and depth writes
use super::depth::{DepthTest, ScreenRect};
use super::framebuffer::{gamma_adjust, ColorBuffer};
use super::shading::Shader;
use crate::count_call;
use crate::scene::Triangle;
use std::ops::{Add, Mul};

/// Per-call rasterizer switches.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RasterOptions {
    /// Run fragment colors through the gamma lookup table.
    pub gamma: bool,
}

/// Doubled signed areas `[cc1, cc2, cc3]`: each is the edge function of the
/// edge opposite a corner, evaluated at that corner.
#[inline]
pub fn edge_areas(triangle: &Triangle) -> [f32; 3] {
    let [a, b, c] = triangle.vertices.map(|v| v.clip);
    [
        a.x * (b.y - c.y) + a.y * (c.x - b.x) + b.x * c.y - c.x * b.y,
        b.x * (c.y - a.y) + b.y * (a.x - c.x) + c.x * a.y - a.x * c.y,
        c.x * (a.y - b.y) + c.y * (b.x - a.x) + a.x * b.y - b.x * a.y,
    ]
}

/// Map NDC `x`, `y` in `[-1, 1]` to `[0.5, dim + 0.5]`.
#[inline]
pub fn viewport_transform(triangle: &mut Triangle, width: usize, height: usize) {
    let (w, h) = (width as f32, height as f32);
    for v in &mut triangle.vertices {
        v.clip.x = (v.clip.x + 1.0) * w * 0.5 + 0.5;
        v.clip.y = (v.clip.y + 1.0) * h * 0.5 + 0.5;
    }
}

/// Pixel rectangle covering the (screen-space) corners, clamped to the
/// frame. Corner coordinates are truncated. `None` when nothing is left.
pub fn bounding_rect(triangle: &Triangle, width: usize, height: usize) -> Option<ScreenRect> {
    if width == 0 || height == 0 {
        return None;
    }
    let [a, b, c] = triangle.vertices.map(|v| v.clip);
    let min_x = (a.x.min(b.x).min(c.x) as i64).max(0);
    let min_y = (a.y.min(b.y).min(c.y) as i64).max(0);
    let max_x = (a.x.max(b.x).max(c.x) as i64).min(width as i64 - 1);
    let max_y = (a.y.max(b.y).max(c.y) as i64).min(height as i64 - 1);
    if min_x > max_x || min_y > max_y {
        return None;
    }
    Some(ScreenRect::from_inclusive(
        min_x as usize,
        min_y as usize,
        max_x as usize,
        max_y as usize,
    ))
}

/// Edge functions at `(x, y)`, each divided by the `w` of its corner.
#[inline]
pub fn barycentric(x: f32, y: f32, triangle: &Triangle) -> [f32; 3] {
    let [a, b, c] = triangle.vertices.map(|v| v.clip);
    [
        (x * (b.y - c.y) + y * (c.x - b.x) + b.x * c.y - c.x * b.y) / a.w,
        (x * (c.y - a.y) + y * (a.x - c.x) + c.x * a.y - a.x * c.y) / b.w,
        (x * (a.y - b.y) + y * (b.x - a.x) + a.x * b.y - b.x * a.y) / c.w,
    ]
}

/// Inside when all three agree in sign, for either winding. Zero sits on an
/// edge and counts for both signs, so flipping the winding keeps the set.
#[inline]
pub fn inside_triangle([alpha, beta, gamma]: [f32; 3]) -> bool {
    (alpha >= 0.0 && beta >= 0.0 && gamma >= 0.0) || (alpha <= 0.0 && beta <= 0.0 && gamma <= 0.0)
}

#[inline(always)]
fn interpolate<T>(weights: [f32; 3], inv_weight: f32, a: T, b: T, c: T) -> T
where
    T: Add<Output = T> + Mul<f32, Output = T>,
{
    (a * weights[0] + b * weights[1] + c * weights[2]) * inv_weight
}

/// Rasterize one homogenized triangle. Returns whether any pixel was written.
///
/// No guard against zero-area triangles or zero `w`: such input produces
/// non-finite weights whose depth fails the depth test.
pub fn raster_triangle<S, D>(
    mut triangle: Triangle,
    shader: &S,
    color: &ColorBuffer,
    depth: &D,
    options: RasterOptions,
) -> bool
where
    S: Shader + ?Sized,
    D: DepthTest + ?Sized,
{
    let areas = edge_areas(&triangle);
    viewport_transform(&mut triangle, color.width(), color.height());

    let Some(rect) = bounding_rect(&triangle, color.width(), color.height()) else {
        return false;
    };

    let v = &triangle.vertices;
    if v.iter().all(|v| v.clip.w > 0.0) {
        let nearest = v[0].clip.z.min(v[1].clip.z).min(v[2].clip.z);
        if !depth.visible_rect(&rect, nearest) {
            count_call!(triangles_rejected_coarse);
            return false;
        }
    }

    let mut written = false;
    for y in rect.min_y..rect.max_y {
        let py = y as f32 + 0.5;
        for x in rect.min_x..rect.max_x {
            let weights = barycentric(x as f32 + 0.5, py, &triangle);
            if !inside_triangle(weights) {
                continue;
            }
            let weights = [
                weights[0] / areas[0],
                weights[1] / areas[1],
                weights[2] / areas[2],
            ];
            let inv_weight = 1.0 / (weights[0] + weights[1] + weights[2]);

            let z = interpolate(weights, inv_weight, v[0].clip.z, v[1].clip.z, v[2].clip.z);
            count_call!(fragments_tested);
            if !depth.visible(x, y, z) {
                continue;
            }

            let position = interpolate(weights, inv_weight, v[0].position, v[1].position, v[2].position);
            let normal = interpolate(weights, inv_weight, v[0].normal, v[1].normal, v[2].normal);
            let uv = interpolate(weights, inv_weight, v[0].uv, v[1].uv, v[2].uv);

            let mut pixel = shader.fragment(position, normal, uv);
            if options.gamma {
                pixel = gamma_adjust(pixel);
            }
            color.write(x, y, pixel);
            depth.update(x, y, z);
            count_call!(fragments_passed);
            written = true;
        }
    }
    written
}
