//! 2D位姿变换
//!
//! 椭圆、视野扇形、坐标系箭头都在局部坐标系中定义，
//! 再通过位姿 (x, y, psi) 变换到世界坐标。

use crate::math::{Matrix3, Point2};
use serde::{Deserialize, Serialize};

/// 2D仿射变换
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform2D {
    matrix: Matrix3,
}

impl Transform2D {
    /// 创建单位变换
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// 创建平移变换
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            matrix: Matrix3::new(
                1.0, 0.0, dx,
                0.0, 1.0, dy,
                0.0, 0.0, 1.0,
            ),
        }
    }

    /// 创建旋转变换（绕原点）
    pub fn rotation(angle: f64) -> Self {
        let cos = angle.cos();
        let sin = angle.sin();
        Self {
            matrix: Matrix3::new(
                cos, -sin, 0.0,
                sin, cos, 0.0,
                0.0, 0.0, 1.0,
            ),
        }
    }

    /// 位姿变换：先旋转 psi，再平移到 (x, y)
    pub fn pose(x: f64, y: f64, psi: f64) -> Self {
        Self::translation(x, y).then(&Self::rotation(psi))
    }

    /// 组合两个变换（self 在后，other 在前）
    pub fn then(&self, other: &Transform2D) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// 变换一个点
    pub fn transform_point(&self, point: &Point2) -> Point2 {
        let v = self.matrix * nalgebra::Vector3::new(point.x, point.y, 1.0);
        Point2::new(v.x, v.y)
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;

    #[test]
    fn test_translation() {
        let t = Transform2D::translation(10.0, 20.0);
        let p = Point2::new(5.0, 5.0);
        let result = t.transform_point(&p);

        assert!(approx_eq(result.x, 15.0));
        assert!(approx_eq(result.y, 25.0));
    }

    #[test]
    fn test_pose() {
        let t = Transform2D::pose(1.0, 2.0, std::f64::consts::PI / 2.0);
        let result = t.transform_point(&Point2::new(1.0, 0.0));

        assert!(approx_eq(result.x, 1.0));
        assert!(approx_eq(result.y, 3.0));
    }
}
