// src/camera.rs
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Perspective camera defined by eye, look target and up vector.
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,

    pub fovy: f32,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(eye: Vec3, target: Vec3, up: Vec3, fovy_radians: f32, znear: f32, zfar: f32) -> Self {
        Self {
            eye,
            target,
            up,
            fovy: fovy_radians,
            aspect: 1.0,
            znear,
            zfar,
        }
    }

    /// View matrix (right-handed, Y up).
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Projection matrix with wgpu's 0..1 clip depth.
    pub fn proj_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar)
    }

    /// Combined view-projection matrix.
    pub fn view_proj_matrix(&self) -> Mat4 {
        self.proj_matrix() * self.view_matrix()
    }

    /// World-space camera position, the origin for distance cutoffs.
    pub fn view_origin(&self) -> Vec3 {
        self.eye
    }

    /// Update aspect ratio (call on resize).
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }
}

/// GPU camera uniform (matches the WGSL `ViewUniform` layout).
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    /// Column-major 4x4 view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Camera position, w unused.
    pub eye: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_proj_matrix().to_cols_array_2d(),
            eye: [camera.eye.x, camera.eye.y, camera.eye.z, 1.0],
        }
    }
}

/// Bind group layout for the per-view camera uniform, shared by every
/// render pipeline (group 0 everywhere).
pub fn camera_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

/// Orbit controller for the god view: rotate / pan / zoom around a center,
/// driven by mouse drags.
pub struct OrbitController {
    pub center: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,

    rotate_speed: f32,
    pan_speed: f32,
}

impl OrbitController {
    /// Start orbiting the given eye/center pair.
    pub fn new(eye: Vec3, center: Vec3) -> Self {
        let offset = eye - center;
        let distance = offset.length().max(0.01);
        let yaw = offset.x.atan2(offset.z);
        let pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        Self {
            center,
            distance,
            yaw,
            pitch,
            rotate_speed: 0.008,
            pan_speed: 0.05,
        }
    }

    /// Rotate by a mouse delta in pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * self.rotate_speed;
        self.pitch = (self.pitch + dy * self.rotate_speed)
            .clamp(-1.5, 1.5);
    }

    /// Pan the orbit center in the camera's screen plane.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let eye = self.eye();
        let forward = (self.center - eye).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        self.center += (-right * dx + up * dy) * self.pan_speed;
    }

    /// Zoom by a scroll delta; positive moves closer.
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance - delta * 2.0).clamp(2.0, 400.0);
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.center
            + Vec3::new(
                cos_pitch * sin_yaw,
                sin_pitch,
                cos_pitch * cos_yaw,
            ) * self.distance
    }

    /// Write the orbit state back into a camera.
    pub fn apply(&self, camera: &mut Camera) {
        camera.eye = self.eye();
        camera.target = self.center;
    }
}

/// Ground-walker controller for the player view. W/S move along the facing
/// direction in the horizontal plane, A/D turn.
pub struct WalkerController {
    pub position: Vec3,
    pub yaw: f32,

    pub move_speed: f32,
    pub turn_speed: f32,

    // pressed state: forward, backward, turn left, turn right
    input: [bool; 4],
}

impl WalkerController {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            yaw: 0.0,
            move_speed: 5.0,
            turn_speed: 1.2,
            input: [false; 4],
        }
    }

    /// Record a key transition. 0:W 1:S 2:A 3:D.
    pub fn set_move_state(&mut self, direction: usize, pressed: bool) {
        if direction < 4 {
            self.input[direction] = pressed;
        }
    }

    /// Horizontal facing direction derived from yaw.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    /// Advance the walker and write eye/target into the camera. The look
    /// target sits a fixed distance ahead so turning in place works.
    pub fn update(&mut self, dt: f32, camera: &mut Camera) {
        if self.input[2] {
            self.yaw -= self.turn_speed * dt;
        }
        if self.input[3] {
            self.yaw += self.turn_speed * dt;
        }

        let forward = self.forward();
        if self.input[0] {
            self.position += forward * self.move_speed * dt;
        }
        if self.input[1] {
            self.position -= forward * self.move_speed * dt;
        }

        camera.eye = self.position;
        camera.target = self.position + forward * 10.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_round_trips_eye() {
        let eye = Vec3::new(0.0, 55.0, 50.0);
        let center = Vec3::new(0.0, 32.0, -12.0);
        let orbit = OrbitController::new(eye, center);
        let recovered = orbit.eye();
        assert!((recovered - eye).length() < 1e-3, "got {recovered:?}");
    }

    #[test]
    fn walker_moves_along_facing() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 0.8, 1.0, 150.0);
        let mut walker = WalkerController::new(Vec3::new(0.0, 10.0, 0.0));
        walker.set_move_state(0, true);
        walker.update(1.0, &mut camera);
        // yaw 0 faces -Z
        assert!(walker.position.z < -4.9);
        assert_eq!(walker.position.y, 10.0);
        assert_eq!(camera.eye, walker.position);
    }

    #[test]
    fn aspect_never_divides_by_zero() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 0.8, 0.1, 100.0);
        camera.set_aspect(0, 0);
        assert_eq!(camera.aspect, 1.0);
    }
}
