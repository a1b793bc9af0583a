//! Frustum culling.
//!
//! Separating Axis Theorem test between an oriented bounding box (a mesh AABB
//! carried into view space) and the camera frustum. The frustum is described
//! by its near-plane half extents and the view-space near/far plane Z values
//! (both negative; view space looks down -Z). Candidate axes: the view Z
//! axis, the three OBB face normals, the four frustum side-plane normals, the
//! OBB axes crossed with view X and view Y, and the OBB axes crossed with the
//! four frustum edge directions. The box is culled iff some axis separates
//! the projection intervals.

use glam::{Mat4, Vec3};

use crate::mesh::Aabb;

/// Components of dominant-axis cross products below this on every lane are
/// numerically parallel; the axis is skipped.
const DEGENERATE_EPSILON: f32 = 1e-4;

/// View-space frustum description.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrustumParams {
    /// Half width of the near rectangle.
    pub near_right: f32,
    /// Half height of the near rectangle.
    pub near_top: f32,
    /// View-space Z of the near plane (= -near).
    pub near_plane: f32,
    /// View-space Z of the far plane (= -far).
    pub far_plane: f32,
}

/// Oriented box: center, three unit axes, and half extents along them.
struct Obb {
    center: Vec3,
    axes: [Vec3; 3],
    extents: Vec3,
}

impl Obb {
    /// Builds the OBB from four transformed AABB corners: the min corner and
    /// the three corners reached by walking one axis to its max.
    fn from_aabb(aabb: &Aabb, model_view: Mat4) -> Self {
        let (bmin, bmax) = (aabb.min, aabb.max);
        let corners = [
            bmin,
            Vec3::new(bmax.x, bmin.y, bmin.z),
            Vec3::new(bmin.x, bmax.y, bmin.z),
            Vec3::new(bmin.x, bmin.y, bmax.z),
        ]
        .map(|c| model_view.transform_point3(c));

        let mut axes = [
            corners[1] - corners[0],
            corners[2] - corners[0],
            corners[3] - corners[0],
        ];
        let center = corners[0] + (axes[0] + axes[1] + axes[2]) * 0.5;
        let mut lengths = Vec3::new(axes[0].length(), axes[1].length(), axes[2].length());
        for (axis, len) in axes.iter_mut().zip([lengths.x, lengths.y, lengths.z]) {
            if len > 1e-12 {
                *axis /= len;
            }
        }
        lengths *= 0.5;
        Self {
            center,
            axes,
            extents: lengths,
        }
    }

    /// Projection radius of the box onto `axis`.
    fn radius_on(&self, axis: Vec3) -> f32 {
        self.axes
            .iter()
            .zip([self.extents.x, self.extents.y, self.extents.z])
            .map(|(a, e)| axis.dot(*a).abs() * e)
            .sum()
    }
}

/// Returns true iff the mesh instance is entirely outside the frustum.
#[must_use]
pub fn is_culled(frustum: &FrustumParams, view: Mat4, model: Mat4, aabb: &Aabb) -> bool {
    let z_near = frustum.near_plane;
    let z_far = frustum.far_plane;
    let x_near = frustum.near_right;
    let y_near = frustum.near_top;

    let obb = Obb::from_aabb(aabb, view * model);

    // View Z axis: the frustum projects exactly to [z_far, z_near].
    {
        let center = obb.center.z;
        let radius = obb.radius_on(Vec3::Z);
        if center - radius > z_near || center + radius < z_far {
            return true;
        }
    }

    // The frustum's projection interval on a general axis is derived from the
    // near rectangle and stretched toward the far plane whenever the near
    // interval crosses zero.
    let separated = |axis: Vec3| -> bool {
        let p = x_near * axis.x.abs() + y_near * axis.y.abs();
        let mut tau_0 = z_near * axis.z - p;
        let mut tau_1 = z_near * axis.z + p;
        if tau_0 < 0.0 {
            tau_0 *= z_far / z_near;
        }
        if tau_1 > 0.0 {
            tau_1 *= z_far / z_near;
        }

        let center = axis.dot(obb.center);
        let radius = obb.radius_on(axis);
        center - radius > tau_1 || center + radius < tau_0
    };

    // Frustum side-plane normals (top, bottom, right, left).
    let side_normals = [
        Vec3::new(0.0, -z_near, y_near),
        Vec3::new(0.0, z_near, y_near),
        Vec3::new(-z_near, 0.0, x_near),
        Vec3::new(z_near, 0.0, x_near),
    ];
    for normal in side_normals {
        if separated(normal) {
            return true;
        }
    }

    // OBB face normals.
    for axis in obb.axes {
        if separated(axis) {
            return true;
        }
    }

    // OBB axes crossed with view X: (1,0,0) x a = (0, -a.z, a.y).
    for a in obb.axes {
        if separated(Vec3::new(0.0, -a.z, a.y)) {
            return true;
        }
    }

    // OBB axes crossed with view Y: (0,1,0) x a = (a.z, 0, -a.x).
    for a in obb.axes {
        if separated(Vec3::new(a.z, 0.0, -a.x)) {
            return true;
        }
    }

    // OBB axes crossed with the four frustum edge directions.
    let edges = [
        Vec3::new(-x_near, 0.0, z_near),
        Vec3::new(x_near, 0.0, z_near),
        Vec3::new(0.0, y_near, z_near),
        Vec3::new(0.0, -y_near, z_near),
    ];
    for a in obb.axes {
        for edge in edges {
            let m = edge.cross(a);
            if m.x.abs() < DEGENERATE_EPSILON
                && m.y.abs() < DEGENERATE_EPSILON
                && m.z.abs() < DEGENERATE_EPSILON
            {
                continue;
            }
            if separated(m) {
                return true;
            }
        }
    }

    false
}
