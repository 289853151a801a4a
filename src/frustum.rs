// src/frustum.rs
//! Visibility classification, host side.
//!
//! The GPU culling pass in `shaders/cull.wgsl` is one parallel executor of
//! the predicate defined here. Keeping [`classify`] as a pure function means
//! the whole visibility policy is unit-testable without a device, and the
//! shader only has to mirror it.

use glam::{Mat4, Vec3, Vec4, Vec4Swizzles};

/// Six half-space planes, `normal.dot(p) + d >= 0` meaning inside.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract planes from a combined view-projection matrix
    /// (Gribb/Hartmann). Assumes wgpu clip space: z in 0..1.
    pub fn from_view_proj(vp: Mat4) -> Self {
        let row = |i: usize| {
            Vec4::new(
                vp.x_axis[i],
                vp.y_axis[i],
                vp.z_axis[i],
                vp.w_axis[i],
            )
        };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let mut planes = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r2,      // near (z >= 0)
            r3 - r2, // far
        ];
        for plane in &mut planes {
            let len = plane.xyz().length();
            if len > 0.0 {
                *plane /= len;
            }
        }
        Self { planes }
    }

    /// Sphere-vs-frustum test on a representative point with a conservative
    /// bounding radius. `radius == 0.0` degenerates to a point test.
    pub fn contains_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.xyz().dot(center) + plane.w >= -radius)
    }
}

/// Dynamic erasure volume around the slime. The boundary is inclusive:
/// an instance at distance exactly `radius` is erased.
#[derive(Debug, Clone, Copy)]
pub struct ExclusionSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl ExclusionSphere {
    pub fn contains(&self, point: Vec3) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }

    /// A sphere that excludes nothing.
    pub fn none() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: -1.0,
        }
    }
}

/// Everything the visibility predicate depends on for one frame.
#[derive(Debug, Clone, Copy)]
pub struct CullSpec {
    pub frustum: Frustum,
    pub camera_pos: Vec3,
    /// Instances farther than this from `camera_pos` are dropped. Zero or
    /// negative disables the cutoff.
    pub max_draw_distance: f32,
    /// Conservative per-instance bounding radius for the frustum test.
    pub instance_radius: f32,
    pub exclusion: ExclusionSphere,
}

impl CullSpec {
    pub fn new(view_proj: Mat4, camera_pos: Vec3) -> Self {
        Self {
            frustum: Frustum::from_view_proj(view_proj),
            camera_pos,
            max_draw_distance: 0.0,
            instance_radius: 0.0,
            exclusion: ExclusionSphere::none(),
        }
    }
}

/// The visibility predicate. Returns true when the instance at `position`
/// should be drawn this frame. `cut` is the instance's persistent erasure
/// flag, written by gameplay and only read here.
pub fn classify(position: Vec3, cut: bool, spec: &CullSpec) -> bool {
    if cut {
        return false;
    }
    if spec.exclusion.radius >= 0.0 && spec.exclusion.contains(position) {
        return false;
    }
    if spec.max_draw_distance > 0.0
        && spec.camera_pos.distance_squared(position)
            > spec.max_draw_distance * spec.max_draw_distance
    {
        return false;
    }
    spec.frustum.contains_sphere(position, spec.instance_radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn look_down_neg_z() -> CullSpec {
        // Camera at origin looking down -Z, 60 deg fov, far 100.
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        CullSpec::new(proj * view, Vec3::ZERO)
    }

    #[test]
    fn point_ahead_is_inside() {
        let spec = look_down_neg_z();
        assert!(classify(Vec3::new(0.0, 0.0, -10.0), false, &spec));
    }

    #[test]
    fn point_behind_is_outside() {
        let spec = look_down_neg_z();
        assert!(!classify(Vec3::new(0.0, 0.0, 10.0), false, &spec));
    }

    #[test]
    fn point_past_far_plane_is_outside() {
        let spec = look_down_neg_z();
        assert!(!classify(Vec3::new(0.0, 0.0, -150.0), false, &spec));
    }

    #[test]
    fn bounding_radius_rescues_edge_point() {
        let spec = look_down_neg_z();
        // Just outside the left plane at z = -10; a generous radius keeps it.
        let point = Vec3::new(-6.0, 0.0, -10.0);
        assert!(!classify(point, false, &spec));
        let mut padded = spec;
        padded.instance_radius = 1.0;
        assert!(classify(point, false, &padded));
    }

    #[test]
    fn cut_flag_wins_over_everything() {
        let spec = look_down_neg_z();
        assert!(!classify(Vec3::new(0.0, 0.0, -10.0), true, &spec));
    }

    #[test]
    fn exclusion_sphere_is_inclusive_at_boundary() {
        let mut spec = look_down_neg_z();
        spec.exclusion = ExclusionSphere {
            center: Vec3::new(0.0, 0.0, -10.0),
            radius: 2.0,
        };
        // Exactly on the instance position.
        assert!(!classify(Vec3::new(0.0, 0.0, -10.0), false, &spec));
        // Distance exactly equal to the radius: documented as excluded.
        assert!(!classify(Vec3::new(2.0, 0.0, -10.0), false, &spec));
        // Just past the boundary: visible again.
        assert!(classify(Vec3::new(2.001, 0.0, -10.0), false, &spec));
    }

    #[test]
    fn distance_cutoff_is_independent_of_frustum() {
        let mut spec = look_down_neg_z();
        spec.max_draw_distance = 50.0;
        assert!(classify(Vec3::new(0.0, 0.0, -49.0), false, &spec));
        assert!(!classify(Vec3::new(0.0, 0.0, -51.0), false, &spec));
    }

    #[test]
    fn predicate_is_deterministic() {
        let spec = look_down_neg_z();
        let points = [
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::new(3.0, 1.0, -20.0),
            Vec3::new(-4.0, 2.0, -90.0),
            Vec3::new(0.0, 0.0, 5.0),
        ];
        let first: Vec<bool> = points
            .iter()
            .map(|p| classify(*p, false, &spec))
            .collect();
        let second: Vec<bool> = points
            .iter()
            .map(|p| classify(*p, false, &spec))
            .collect();
        assert_eq!(first, second);
    }
}
