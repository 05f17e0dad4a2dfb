//! 刚体变换辅助函数
//!
//! 变换统一用 glam `Mat4` 表示（仿射、列主序），与骨骼系统一致。

use glam::{EulerRot, Mat4, Quat, Vec3};

/// 去掉缩放/切变，只保留旋转和平移
pub fn orthonormalized(m: Mat4) -> Mat4 {
    let (_, rotation, translation) = m.to_scale_rotation_translation();
    Mat4::from_rotation_translation(rotation.normalize(), translation)
}

/// 变换的平移部分
pub fn origin(m: Mat4) -> Vec3 {
    m.w_axis.truncate()
}

/// 替换平移部分，基向量不变
pub fn with_origin(mut m: Mat4, origin: Vec3) -> Mat4 {
    m.w_axis = origin.extend(1.0);
    m
}

/// 只保留平移部分
pub fn translation_only(m: Mat4) -> Mat4 {
    Mat4::from_translation(origin(m))
}

/// 以 YXZ 顺序的欧拉角（弧度）替换旋转，保留缩放和平移
pub fn with_euler_rotation(m: Mat4, euler: Vec3) -> Mat4 {
    let (scale, _, translation) = m.to_scale_rotation_translation();
    let rotation = Quat::from_euler(EulerRot::YXZ, euler.y, euler.x, euler.z);
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// 旋转部分的 YXZ 欧拉角（弧度），按 (x, y, z) 返回
pub fn euler_rotation(m: Mat4) -> Vec3 {
    let (_, rotation, _) = m.to_scale_rotation_translation();
    let (y, x, z) = rotation.to_euler(EulerRot::YXZ);
    Vec3::new(x, y, z)
}

/// 两个变换是否在容差内相等
pub fn approx_eq(a: Mat4, b: Mat4, eps: f32) -> bool {
    a.abs_diff_eq(b, eps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orthonormalized_drops_scale() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 3.0, 0.5),
            Quat::from_rotation_y(0.7),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let o = orthonormalized(m);
        let (scale, rotation, translation) = o.to_scale_rotation_translation();
        assert!((scale - Vec3::ONE).length() < 1e-4);
        assert!(rotation.angle_between(Quat::from_rotation_y(0.7)) < 1e-4);
        assert!((translation - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_euler_roundtrip() {
        let euler = Vec3::new(0.3, -0.5, 1.1);
        let m = with_euler_rotation(Mat4::from_translation(Vec3::X), euler);
        let back = euler_rotation(m);
        assert!((back - euler).length() < 1e-4);
        assert!((origin(m) - Vec3::X).length() < 1e-6);
    }
}
