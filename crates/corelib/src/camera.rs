use crate::{Mat4, Vec2, Vec3};

/// Perspective projection parameters (right-handed).
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Projection {
    pub fn new(fov_y_rad: f32, z_near: f32, z_far: f32, aspect: f32) -> Self {
        Self {
            fov_y_rad,
            z_near,
            z_far,
            aspect,
        }
    }

    /// Depth range [0,1], which is what wgpu expects.
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }
}

/// Keys held this frame, as a direction in camera space:
/// x = forward, y = up, z = right.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoveInput(pub Vec3);

/// A camera driven by mouse drags and movement keys.
pub trait CameraController {
    /// Mouse drag in pixels.
    fn mouse_moved(&mut self, delta: Vec2);
    /// Wheel steps; positive zooms in.
    fn scrolled(&mut self, _steps: f32) {}
    fn update(&mut self, dt: f32, input: MoveInput);
    fn view(&self) -> Mat4;
    fn eye(&self) -> Vec3;
}

/// Rotates the scene around a fixed center. Drags accumulate into a single
/// rotation, so there is no gimbal lock.
#[derive(Clone, Copy, Debug)]
pub struct OrbitCamera {
    pub center: Vec3,
    pub distance: f32,
    pub rotation: Mat4,
    pub sensitivity: f32,
    min_distance: f32,
}

impl OrbitCamera {
    pub fn new(center: Vec3, distance: f32) -> Self {
        Self {
            center,
            distance,
            rotation: Mat4::IDENTITY,
            sensitivity: 0.005,
            min_distance: distance * 0.01,
        }
    }
}

impl CameraController for OrbitCamera {
    fn mouse_moved(&mut self, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        let axis = Vec3::new(delta.y, delta.x, 0.0).normalize();
        let angle = delta.length() * self.sensitivity;
        self.rotation = Mat4::from_axis_angle(axis, angle) * self.rotation;
    }

    fn scrolled(&mut self, steps: f32) {
        self.distance = (self.distance * 0.9f32.powf(steps)).max(self.min_distance);
    }

    fn update(&mut self, _dt: f32, _input: MoveInput) {}

    fn view(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance))
            * self.rotation
            * Mat4::from_translation(-self.center)
    }

    fn eye(&self) -> Vec3 {
        self.view().inverse().w_axis.truncate()
    }
}

/// First-person camera: yaw/pitch look, movement on the horizontal plane.
#[derive(Clone, Copy, Debug)]
pub struct FlyCamera {
    pub position: Vec3,
    /// Degrees.
    pub yaw: f32,
    /// Degrees, clamped to ±89.
    pub pitch: f32,
    /// Degrees per pixel.
    pub sensitivity: f32,
    /// Units per second.
    pub speed: f32,
}

impl FlyCamera {
    pub fn new(position: Vec3, speed: f32) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            sensitivity: 0.25,
            speed,
        }
    }

    pub fn forward(&self) -> Vec3 {
        let (theta, phi) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(-phi.cos() * theta.sin(), phi.sin(), -phi.cos() * theta.cos())
    }
}

impl CameraController for FlyCamera {
    fn mouse_moved(&mut self, delta: Vec2) {
        self.yaw -= delta.x * self.sensitivity;
        self.pitch = (self.pitch - delta.y * self.sensitivity).clamp(-89.0, 89.0);
    }

    fn update(&mut self, dt: f32, input: MoveInput) {
        let dir = input.0;
        if dir == Vec3::ZERO {
            return;
        }
        let forward = self.forward();
        let straight = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
        let right = Vec3::new(-straight.z, 0.0, straight.x);
        let dir = dir.normalize();
        let velocity = dir.x * straight + dir.y * Vec3::Y + dir.z * right;
        self.position += velocity * self.speed * dt;
    }

    fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    fn eye(&self) -> Vec3 {
        self.position
    }
}
