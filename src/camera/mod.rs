/// Fly camera, its input state and view frustum.
///
/// Right-handed, looking down `-Z` at zero yaw/pitch. The projection maps
/// view depth to `[0, 1]` (near to far), which is the range the depth
/// buffers accept.
use glam::{Mat4, Quat, Vec3, Vec4};

const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Radians around `+Y`.
    pub yaw: f32,
    /// Radians around the camera's local `+X`.
    pub pitch: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub aspect_ratio: f32,
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
}

impl Camera {
    pub fn new(position: Vec3, aspect_ratio: f32) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            fov: 20f32.to_radians(),
            near: 0.1,
            far: 50.0,
            aspect_ratio,
            move_speed: 4.0,
            mouse_sensitivity: 0.002,
        }
    }

    /// Camera at `(0, 0, 8)` looking at the origin.
    pub fn default_view(aspect_ratio: f32) -> Self {
        Self::new(Vec3::new(0.0, 0.0, 8.0), aspect_ratio)
    }

    pub fn with_fov_degrees(mut self, degrees: f32) -> Self {
        self.fov = degrees.to_radians();
        self
    }

    #[inline]
    fn orientation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    /// Turn to face `target`.
    pub fn look_at(&mut self, target: Vec3) {
        let dir = (target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        self.yaw = (-dir.x).atan2(-dir.z);
        self.pitch = dir.y.clamp(-1.0, 1.0).asin().clamp(-MAX_PITCH, MAX_PITCH);
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.orientation() * Vec3::X
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.orientation() * Vec3::Y
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection_matrix())
    }

    /// Apply a mouse delta in pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * self.mouse_sensitivity;
        self.pitch = (self.pitch - dy * self.mouse_sensitivity).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Move along the view axes; `up` is world up.
    pub fn move_local(&mut self, forward: f32, right: f32, up: f32, dt: f32) {
        let step = self.forward() * forward + self.right() * right + Vec3::Y * up;
        self.position += step * self.move_speed * dt;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }
}

/// Six clip planes `(n, d)` with inward normals: a point `p` is inside a
/// plane when `n·p + d >= 0`.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far.
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Gribb–Hartmann extraction for a `[0, 1]` depth range.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let [r0, r1, r2, r3] = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];
        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(normalize_plane);
        Self { planes }
    }

    /// False only when the box lies entirely outside one plane.
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        self.planes.iter().all(|plane| {
            let farthest = Vec3::select(plane.truncate().cmpgt(Vec3::ZERO), max, min);
            plane.truncate().dot(farthest) + plane.w >= 0.0
        })
    }
}

#[inline]
fn normalize_plane(plane: Vec4) -> Vec4 {
    let len = plane.truncate().length();
    if len > 1e-4 {
        plane / len
    } else {
        plane
    }
}

/// Held movement keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct CameraController {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    fn axis(positive: bool, negative: bool) -> f32 {
        positive as i32 as f32 - negative as i32 as f32
    }

    pub fn update_camera(&self, camera: &mut Camera, dt: f32) {
        camera.move_local(
            Self::axis(self.forward, self.backward),
            Self::axis(self.right, self.left),
            Self::axis(self.up, self.down),
            dt,
        );
    }
}
