/// Triangle soup meshes and their vertices.
use glam::{Mat4, Vec2, Vec3, Vec4};
use std::f32::consts::PI;

/// One triangle corner.
///
/// `clip` is filled by a vertex shader (clip space, later NDC after
/// [`Triangle::homogenize`], then screen space inside the rasterizer);
/// `position` and `normal` carry world-space values to the fragment stage.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vertex {
    pub clip: Vec4,
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    #[inline]
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            clip: Vec4::ZERO,
            position,
            normal,
            uv,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    #[inline]
    pub fn new(a: Vertex, b: Vertex, c: Vertex) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    /// Perspective divide of `x`, `y`, `z`; `w` is kept for interpolation.
    #[inline]
    pub fn homogenize(&mut self) {
        for v in &mut self.vertices {
            let w = v.clip.w;
            v.clip.x /= w;
            v.clip.y /= w;
            v.clip.z /= w;
        }
    }

    /// Unnormalized face normal from the winding, `(v1 - v0) × (v2 - v1)`
    /// with both edges normalized first.
    #[inline]
    pub fn face_normal(&self) -> Vec3 {
        let [a, b, c] = self.vertices.map(|v| v.position);
        (b - a).normalize().cross((c - b).normalize())
    }

    /// Same corners, opposite winding.
    #[inline]
    pub fn flipped(&self) -> Self {
        let [a, b, c] = self.vertices;
        Self::new(a, c, b)
    }
}

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |acc, p| Aabb {
            min: acc.min.min(p),
            max: acc.max.max(p),
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Box around all eight transformed corners.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::from_points(self.corners().map(|p| matrix.transform_point3(p)))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(
            self.triangles
                .iter()
                .flat_map(|t| t.vertices.iter().map(|v| v.position)),
        )
    }

    /// Reverse every triangle's winding, e.g. to view a sphere from inside.
    pub fn inverted(mut self) -> Self {
        for triangle in &mut self.triangles {
            *triangle = triangle.flipped();
        }
        self
    }

    /// Unit sphere, counter-clockwise seen from outside.
    /// Pole caps emit a single triangle per segment.
    pub fn uv_sphere(u_segments: usize, v_segments: usize) -> Self {
        let u_segments = u_segments.max(3);
        let v_segments = v_segments.max(2);
        let stride = u_segments + 1;

        let mut grid = Vec::with_capacity(stride * (v_segments + 1));
        for v in 0..=v_segments {
            let theta = v as f32 / v_segments as f32 * PI;
            for u in 0..=u_segments {
                let phi = u as f32 / u_segments as f32 * PI * 2.0;
                let p = Vec3::new(phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin());
                let uv = Vec2::new(u as f32 / u_segments as f32, v as f32 / v_segments as f32);
                grid.push(Vertex::new(p, p, uv));
            }
        }

        let mut triangles = Vec::with_capacity(u_segments * v_segments * 2);
        for y in 0..v_segments {
            for x in 0..u_segments {
                let a = grid[x + y * stride];
                let b = grid[x + (y + 1) * stride];
                let c = grid[x + 1 + y * stride];
                let d = grid[x + 1 + (y + 1) * stride];
                if y != 0 {
                    triangles.push(Triangle::new(a, c, b));
                }
                if y != v_segments - 1 {
                    triangles.push(Triangle::new(c, d, b));
                }
            }
        }
        Self { triangles }
    }

    /// Cube spanning `[-1, 1]³`, flat normals, one texture square per face.
    pub fn cube() -> Self {
        const FACES: [(Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_X, Vec3::Z),
            (Vec3::Y, Vec3::X),
            (Vec3::NEG_Y, Vec3::X),
            (Vec3::Z, Vec3::X),
            (Vec3::NEG_Z, Vec3::NEG_X),
        ];

        let mut triangles = Vec::with_capacity(12);
        for (normal, u_axis) in FACES {
            let v_axis = normal.cross(u_axis);
            let corner = |s: f32, t: f32| {
                Vertex::new(
                    normal + u_axis * s + v_axis * t,
                    normal,
                    Vec2::new((s + 1.0) * 0.5, (t + 1.0) * 0.5),
                )
            };
            let (p00, p10, p11, p01) = (
                corner(-1.0, -1.0),
                corner(1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, 1.0),
            );
            triangles.push(Triangle::new(p00, p10, p11));
            triangles.push(Triangle::new(p00, p11, p01));
        }
        Self { triangles }
    }

    /// Square in the XZ plane facing `+Y`, `size` wide, split into
    /// `subdivisions²` quads.
    pub fn plane(size: f32, subdivisions: usize) -> Self {
        let n = subdivisions.max(1);
        let step = size / n as f32;
        let half = size * 0.5;
        let vertex = |i: usize, j: usize| {
            Vertex::new(
                Vec3::new(-half + i as f32 * step, 0.0, -half + j as f32 * step),
                Vec3::Y,
                Vec2::new(i as f32 / n as f32, j as f32 / n as f32),
            )
        };

        let mut triangles = Vec::with_capacity(n * n * 2);
        for j in 0..n {
            for i in 0..n {
                let (a, b, c, d) = (vertex(i, j), vertex(i, j + 1), vertex(i + 1, j), vertex(i + 1, j + 1));
                triangles.push(Triangle::new(a, b, c));
                triangles.push(Triangle::new(c, b, d));
            }
        }
        Self { triangles }
    }
}
