//! Eye matrices for GL-style renderers. Column-major.

use glam::{Mat4, Quat, Vec3};

use super::runtime::{EyeView, Fov};

/// World-to-eye transform: the inverse of the eye pose.
pub fn view_matrix(view: &EyeView) -> [f32; 16] {
    let rotation = Quat::from_array(view.pose.orientation).normalize();
    let translation = Vec3::from_array(view.pose.position);
    Mat4::from_rotation_translation(rotation, translation)
        .inverse()
        .to_cols_array()
}

/// Off-axis perspective projection into GL clip space (z in [-1, 1]).
pub fn projection_matrix(fov: &Fov, near: f32, far: f32) -> [f32; 16] {
    let tan_left = fov.angle_left.tan();
    let tan_right = fov.angle_right.tan();
    let tan_up = fov.angle_up.tan();
    let tan_down = fov.angle_down.tan();

    let tan_width = tan_right - tan_left;
    let tan_height = tan_up - tan_down;
    let depth = far - near;

    [
        2.0 / tan_width,
        0.0,
        0.0,
        0.0,
        //
        0.0,
        2.0 / tan_height,
        0.0,
        0.0,
        //
        (tan_right + tan_left) / tan_width,
        (tan_up + tan_down) / tan_height,
        -(far + near) / depth,
        -1.0,
        //
        0.0,
        0.0,
        -(2.0 * far * near) / depth,
        0.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::xr::runtime::Pose;
    use crate::engine::xr::policy::FALLBACK_VIEW;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn identity_pose_gives_identity_view() {
        let m = view_matrix(&FALLBACK_VIEW);
        assert_eq!(m, Mat4::IDENTITY.to_cols_array());
    }

    #[test]
    fn view_matrix_undoes_eye_translation() {
        let view = EyeView {
            pose: Pose {
                orientation: [0.0, 0.0, 0.0, 1.0],
                position: [0.032, 1.6, 0.0],
            },
            fov: Fov::DEFAULT_SYMMETRIC,
        };
        let m = Mat4::from_cols_array(&view_matrix(&view));
        let eye_in_view = m.transform_point3(Vec3::new(0.032, 1.6, 0.0));
        assert!(eye_in_view.length() < 1e-5);
    }

    #[test]
    fn symmetric_fov_has_no_skew() {
        let m = projection_matrix(&Fov::DEFAULT_SYMMETRIC, 0.1, 100.0);
        let focal = 2.0 / (2.0 * 0.5f32.tan());
        assert!(close(m[0], focal));
        assert!(close(m[5], focal));
        assert!(close(m[8], 0.0));
        assert!(close(m[9], 0.0));
        assert_eq!(m[11], -1.0);
        assert_eq!(m[15], 0.0);
    }

    #[test]
    fn asymmetric_fov_skews_toward_wider_side() {
        let fov = Fov {
            angle_left: -0.9,
            angle_right: 0.7,
            angle_up: 0.8,
            angle_down: -0.8,
        };
        let m = projection_matrix(&fov, 0.1, 100.0);
        assert!(m[8] < 0.0);
        assert!(close(m[9], 0.0));
    }

    #[test]
    fn clip_planes_map_to_ndc_bounds() {
        let m = Mat4::from_cols_array(&projection_matrix(&Fov::DEFAULT_SYMMETRIC, 0.5, 50.0));
        let near = m.project_point3(Vec3::new(0.0, 0.0, -0.5));
        let far = m.project_point3(Vec3::new(0.0, 0.0, -50.0));
        assert!(close(near.z, -1.0));
        assert!(close(far.z, 1.0));
    }
}
