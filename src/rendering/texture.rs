/// Texel grids and sampling.
///
/// Textures are generated procedurally; there is no image loading here.
use glam::{Vec2, Vec3};
use std::f32::consts::PI;
use std::ops::{Add, Mul};

/// `width × height` grid of texels, row-major, row 0 at `v = 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture<T> {
    width: usize,
    height: usize,
    texels: Vec<T>,
}

impl<T: Copy> Texture<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            texels: vec![value; width * height],
        }
    }

    /// Build from a texel function `f(x, y)`.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut texels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                texels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            texels,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.texels[y * self.width + x]
    }
}

/// Bilinear filtering with coordinates clamped to `[0, 1]`.
pub struct LinearSampler;

impl LinearSampler {
    pub fn sample<T>(texture: &Texture<T>, u: f32, v: f32) -> T
    where
        T: Copy + Add<Output = T> + Mul<f32, Output = T>,
    {
        let max_x = texture.width().saturating_sub(1);
        let max_y = texture.height().saturating_sub(1);
        let u = u.clamp(0.0, 1.0) * max_x as f32;
        let v = v.clamp(0.0, 1.0) * max_y as f32;

        let x0 = (u as usize).min(max_x);
        let y0 = (v as usize).min(max_y);
        let x1 = (x0 + 1).min(max_x);
        let y1 = (y0 + 1).min(max_y);
        let du = u - x0 as f32;
        let dv = v - y0 as f32;

        let top = texture.get(x0, y0) * (1.0 - du) + texture.get(x1, y0) * du;
        let bottom = texture.get(x0, y1) * (1.0 - du) + texture.get(x1, y1) * du;
        top * (1.0 - dv) + bottom * dv
    }
}

/// Direction to equirectangular texture coordinates; `v = 0` is straight up.
#[inline]
pub fn sample_spherical_map(direction: Vec3) -> Vec2 {
    const INV_ATAN: Vec2 = Vec2::new(0.5 / PI, 1.0 / PI);
    let uv = Vec2::new(direction.z.atan2(direction.x), (-direction.y).asin());
    uv * INV_ATAN + 0.5
}

/// Two-color checkerboard with `cells × cells` squares.
pub fn checkerboard(size: usize, cells: usize, a: Vec3, b: Vec3) -> Texture<Vec3> {
    let cell = (size / cells.max(1)).max(1);
    Texture::from_fn(size, size, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            a
        } else {
            b
        }
    })
}

/// Equirectangular sky: `zenith` at the top row, `horizon` in the middle,
/// `ground` at the bottom row.
pub fn gradient_sky(width: usize, height: usize, zenith: Vec3, horizon: Vec3, ground: Vec3) -> Texture<Vec3> {
    let last = height.saturating_sub(1).max(1) as f32;
    Texture::from_fn(width, height, |_, y| {
        let t = y as f32 / last;
        if t < 0.5 {
            zenith.lerp(horizon, t * 2.0)
        } else {
            horizon.lerp(ground, (t - 0.5) * 2.0)
        }
    })
}
