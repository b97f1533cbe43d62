// crates/fv_core/src/tensor.rs

//! 张量代数
//!
//! 定义有限体积求解器使用的四种值类型及其运算：
//! - [`Scalar`]: f64 标量
//! - [`Vector`]: 三分量向量（glam::DVec3）
//! - [`Tensor`]: 9 分量二阶张量
//! - [`STensor`]: 6 分量对称张量
//!
//! 所有运算均为纯函数且不会 panic：除零产生 IEEE 无穷大，
//! 由上层的残差监控负责发现数值异常。
//!
//! # FieldValue
//!
//! [`FieldValue`] 是场容器与稀疏矩阵对值类型的能力约束
//! （零元、算术、内积、分量访问），仅上述四种类型实现。

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// 标量类型
pub type Scalar = f64;

/// 三分量向量
pub type Vector = glam::DVec3;

// ============================================================================
// 值类型能力约束
// ============================================================================

/// 场值类型能力约束
///
/// 场容器 `Field<T>` 与稀疏矩阵 `MeshMatrix<T>` 的泛型边界。
/// 乘法 `Mul<Self>` 约定为逐分量乘。
pub trait FieldValue:
    Copy
    + Clone
    + Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + Mul<Scalar, Output = Self>
    + Div<Scalar, Output = Self>
    + Mul<Self, Output = Self>
    + AddAssign
    + SubAssign
{
    /// 零元
    const ZERO: Self;

    /// 分量个数
    const N_COMP: usize;

    /// 读取第 i 个分量
    fn comp(&self, i: usize) -> Scalar;

    /// 写入第 i 个分量
    fn set_comp(&mut self, i: usize, v: Scalar);

    /// 所有分量取同一标量
    fn splat(v: Scalar) -> Self;

    /// 内积（逐分量乘积之和）
    fn inner(&self, other: &Self) -> Scalar;

    /// 模
    #[inline]
    fn mag(&self) -> Scalar {
        self.inner(self).sqrt()
    }

    /// 逐分量平方根
    fn sqrt_comp(self) -> Self;

    /// 所有分量是否有限
    fn is_finite_all(&self) -> bool;
}

impl FieldValue for Scalar {
    const ZERO: Self = 0.0;
    const N_COMP: usize = 1;

    #[inline]
    fn comp(&self, _i: usize) -> Scalar {
        *self
    }

    #[inline]
    fn set_comp(&mut self, _i: usize, v: Scalar) {
        *self = v;
    }

    #[inline]
    fn splat(v: Scalar) -> Self {
        v
    }

    #[inline]
    fn inner(&self, other: &Self) -> Scalar {
        self * other
    }

    #[inline]
    fn sqrt_comp(self) -> Self {
        self.sqrt()
    }

    #[inline]
    fn is_finite_all(&self) -> bool {
        self.is_finite()
    }
}

impl FieldValue for Vector {
    const ZERO: Self = Vector::ZERO;
    const N_COMP: usize = 3;

    #[inline]
    fn comp(&self, i: usize) -> Scalar {
        self[i]
    }

    #[inline]
    fn set_comp(&mut self, i: usize, v: Scalar) {
        self[i] = v;
    }

    #[inline]
    fn splat(v: Scalar) -> Self {
        glam::DVec3::splat(v)
    }

    #[inline]
    fn inner(&self, other: &Self) -> Scalar {
        self.dot(*other)
    }

    #[inline]
    fn sqrt_comp(self) -> Self {
        Vector::new(self.x.sqrt(), self.y.sqrt(), self.z.sqrt())
    }

    #[inline]
    fn is_finite_all(&self) -> bool {
        self.is_finite()
    }
}

// ============================================================================
// 二阶张量（9 分量）
// ============================================================================

/// 二阶张量
///
/// 行主序存储，`T·v` 按通常线性代数规则。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Tensor {
    pub xx: Scalar,
    pub xy: Scalar,
    pub xz: Scalar,
    pub yx: Scalar,
    pub yy: Scalar,
    pub yz: Scalar,
    pub zx: Scalar,
    pub zy: Scalar,
    pub zz: Scalar,
}

impl Tensor {
    /// 零张量
    pub const ZERO: Self = Self {
        xx: 0.0,
        xy: 0.0,
        xz: 0.0,
        yx: 0.0,
        yy: 0.0,
        yz: 0.0,
        zx: 0.0,
        zy: 0.0,
        zz: 0.0,
    };

    /// 单位张量
    pub const IDENTITY: Self = Self {
        xx: 1.0,
        xy: 0.0,
        xz: 0.0,
        yx: 0.0,
        yy: 1.0,
        yz: 0.0,
        zx: 0.0,
        zy: 0.0,
        zz: 1.0,
    };

    /// 由三个行向量构造
    #[inline]
    pub fn from_rows(rx: Vector, ry: Vector, rz: Vector) -> Self {
        Self {
            xx: rx.x,
            xy: rx.y,
            xz: rx.z,
            yx: ry.x,
            yy: ry.y,
            yz: ry.z,
            zx: rz.x,
            zy: rz.y,
            zz: rz.z,
        }
    }

    /// 外积 a ⊗ b
    #[inline]
    pub fn outer(a: Vector, b: Vector) -> Self {
        Self::from_rows(a.x * b, a.y * b, a.z * b)
    }

    /// 第 i 行
    #[inline]
    pub fn row(&self, i: usize) -> Vector {
        match i {
            0 => Vector::new(self.xx, self.xy, self.xz),
            1 => Vector::new(self.yx, self.yy, self.yz),
            _ => Vector::new(self.zx, self.zy, self.zz),
        }
    }

    /// 转置
    #[inline]
    pub fn trn(&self) -> Self {
        Self {
            xx: self.xx,
            xy: self.yx,
            xz: self.zx,
            yx: self.xy,
            yy: self.yy,
            yz: self.zy,
            zx: self.xz,
            zy: self.yz,
            zz: self.zz,
        }
    }

    /// 迹
    #[inline]
    pub fn trace(&self) -> Scalar {
        self.xx + self.yy + self.zz
    }

    /// 对称部分（返回对称张量）
    #[inline]
    pub fn sym(&self) -> STensor {
        STensor {
            xx: self.xx,
            yy: self.yy,
            zz: self.zz,
            xy: 0.5 * (self.xy + self.yx),
            yz: 0.5 * (self.yz + self.zy),
            xz: 0.5 * (self.xz + self.zx),
        }
    }

    /// 张量-向量积 T·v
    #[inline]
    pub fn dot(&self, v: Vector) -> Vector {
        Vector::new(self.row(0).dot(v), self.row(1).dot(v), self.row(2).dot(v))
    }

    /// 双点积（全缩并）A : B
    #[inline]
    pub fn double_dot(&self, other: &Self) -> Scalar {
        self.xx * other.xx
            + self.xy * other.xy
            + self.xz * other.xz
            + self.yx * other.yx
            + self.yy * other.yy
            + self.yz * other.yz
            + self.zx * other.zx
            + self.zy * other.zy
            + self.zz * other.zz
    }
}

impl Add for Tensor {
    type Output = Self;
    #[inline]
    fn add(self, o: Self) -> Self {
        Self {
            xx: self.xx + o.xx,
            xy: self.xy + o.xy,
            xz: self.xz + o.xz,
            yx: self.yx + o.yx,
            yy: self.yy + o.yy,
            yz: self.yz + o.yz,
            zx: self.zx + o.zx,
            zy: self.zy + o.zy,
            zz: self.zz + o.zz,
        }
    }
}

impl Sub for Tensor {
    type Output = Self;
    #[inline]
    fn sub(self, o: Self) -> Self {
        Self {
            xx: self.xx - o.xx,
            xy: self.xy - o.xy,
            xz: self.xz - o.xz,
            yx: self.yx - o.yx,
            yy: self.yy - o.yy,
            yz: self.yz - o.yz,
            zx: self.zx - o.zx,
            zy: self.zy - o.zy,
            zz: self.zz - o.zz,
        }
    }
}

impl Neg for Tensor {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::ZERO - self
    }
}

impl Mul<Scalar> for Tensor {
    type Output = Self;
    #[inline]
    fn mul(self, s: Scalar) -> Self {
        Self {
            xx: self.xx * s,
            xy: self.xy * s,
            xz: self.xz * s,
            yx: self.yx * s,
            yy: self.yy * s,
            yz: self.yz * s,
            zx: self.zx * s,
            zy: self.zy * s,
            zz: self.zz * s,
        }
    }
}

impl Div<Scalar> for Tensor {
    type Output = Self;
    #[inline]
    fn div(self, s: Scalar) -> Self {
        self * (1.0 / s)
    }
}

/// 逐分量乘
impl Mul for Tensor {
    type Output = Self;
    #[inline]
    fn mul(self, o: Self) -> Self {
        Self {
            xx: self.xx * o.xx,
            xy: self.xy * o.xy,
            xz: self.xz * o.xz,
            yx: self.yx * o.yx,
            yy: self.yy * o.yy,
            yz: self.yz * o.yz,
            zx: self.zx * o.zx,
            zy: self.zy * o.zy,
            zz: self.zz * o.zz,
        }
    }
}

impl AddAssign for Tensor {
    #[inline]
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

impl SubAssign for Tensor {
    #[inline]
    fn sub_assign(&mut self, o: Self) {
        *self = *self - o;
    }
}

impl FieldValue for Tensor {
    const ZERO: Self = Tensor::ZERO;
    const N_COMP: usize = 9;

    #[inline]
    fn comp(&self, i: usize) -> Scalar {
        match i {
            0 => self.xx,
            1 => self.xy,
            2 => self.xz,
            3 => self.yx,
            4 => self.yy,
            5 => self.yz,
            6 => self.zx,
            7 => self.zy,
            _ => self.zz,
        }
    }

    #[inline]
    fn set_comp(&mut self, i: usize, v: Scalar) {
        match i {
            0 => self.xx = v,
            1 => self.xy = v,
            2 => self.xz = v,
            3 => self.yx = v,
            4 => self.yy = v,
            5 => self.yz = v,
            6 => self.zx = v,
            7 => self.zy = v,
            _ => self.zz = v,
        }
    }

    #[inline]
    fn splat(v: Scalar) -> Self {
        Self {
            xx: v,
            xy: v,
            xz: v,
            yx: v,
            yy: v,
            yz: v,
            zx: v,
            zy: v,
            zz: v,
        }
    }

    #[inline]
    fn inner(&self, other: &Self) -> Scalar {
        self.double_dot(other)
    }

    #[inline]
    fn sqrt_comp(self) -> Self {
        let mut r = self;
        for i in 0..9 {
            r.set_comp(i, r.comp(i).sqrt());
        }
        r
    }

    #[inline]
    fn is_finite_all(&self) -> bool {
        (0..9).all(|i| self.comp(i).is_finite())
    }
}

// ============================================================================
// 对称张量（6 分量）
// ============================================================================

/// 对称二阶张量
///
/// 存储顺序 xx, yy, zz, xy, yz, xz。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct STensor {
    pub xx: Scalar,
    pub yy: Scalar,
    pub zz: Scalar,
    pub xy: Scalar,
    pub yz: Scalar,
    pub xz: Scalar,
}

impl STensor {
    /// 零张量
    pub const ZERO: Self = Self {
        xx: 0.0,
        yy: 0.0,
        zz: 0.0,
        xy: 0.0,
        yz: 0.0,
        xz: 0.0,
    };

    /// 单位张量
    pub const IDENTITY: Self = Self {
        xx: 1.0,
        yy: 1.0,
        zz: 1.0,
        xy: 0.0,
        yz: 0.0,
        xz: 0.0,
    };

    /// 对称外积 a ⊗ a
    #[inline]
    pub fn outer(a: Vector) -> Self {
        Self {
            xx: a.x * a.x,
            yy: a.y * a.y,
            zz: a.z * a.z,
            xy: a.x * a.y,
            yz: a.y * a.z,
            xz: a.x * a.z,
        }
    }

    /// 迹
    #[inline]
    pub fn trace(&self) -> Scalar {
        self.xx + self.yy + self.zz
    }

    /// 展开为完整张量
    #[inline]
    pub fn full(&self) -> Tensor {
        Tensor {
            xx: self.xx,
            xy: self.xy,
            xz: self.xz,
            yx: self.xy,
            yy: self.yy,
            yz: self.yz,
            zx: self.xz,
            zy: self.yz,
            zz: self.zz,
        }
    }

    /// 张量-向量积 S·v
    #[inline]
    pub fn dot(&self, v: Vector) -> Vector {
        Vector::new(
            self.xx * v.x + self.xy * v.y + self.xz * v.z,
            self.xy * v.x + self.yy * v.y + self.yz * v.z,
            self.xz * v.x + self.yz * v.y + self.zz * v.z,
        )
    }

    /// 双点积 S : S'（考虑非对角分量出现两次）
    #[inline]
    pub fn double_dot(&self, o: &Self) -> Scalar {
        self.xx * o.xx
            + self.yy * o.yy
            + self.zz * o.zz
            + 2.0 * (self.xy * o.xy + self.yz * o.yz + self.xz * o.xz)
    }
}

impl Add for STensor {
    type Output = Self;
    #[inline]
    fn add(self, o: Self) -> Self {
        Self {
            xx: self.xx + o.xx,
            yy: self.yy + o.yy,
            zz: self.zz + o.zz,
            xy: self.xy + o.xy,
            yz: self.yz + o.yz,
            xz: self.xz + o.xz,
        }
    }
}

impl Sub for STensor {
    type Output = Self;
    #[inline]
    fn sub(self, o: Self) -> Self {
        Self {
            xx: self.xx - o.xx,
            yy: self.yy - o.yy,
            zz: self.zz - o.zz,
            xy: self.xy - o.xy,
            yz: self.yz - o.yz,
            xz: self.xz - o.xz,
        }
    }
}

impl Neg for STensor {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::ZERO - self
    }
}

impl Mul<Scalar> for STensor {
    type Output = Self;
    #[inline]
    fn mul(self, s: Scalar) -> Self {
        Self {
            xx: self.xx * s,
            yy: self.yy * s,
            zz: self.zz * s,
            xy: self.xy * s,
            yz: self.yz * s,
            xz: self.xz * s,
        }
    }
}

impl Div<Scalar> for STensor {
    type Output = Self;
    #[inline]
    fn div(self, s: Scalar) -> Self {
        self * (1.0 / s)
    }
}

/// 逐分量乘
impl Mul for STensor {
    type Output = Self;
    #[inline]
    fn mul(self, o: Self) -> Self {
        Self {
            xx: self.xx * o.xx,
            yy: self.yy * o.yy,
            zz: self.zz * o.zz,
            xy: self.xy * o.xy,
            yz: self.yz * o.yz,
            xz: self.xz * o.xz,
        }
    }
}

impl AddAssign for STensor {
    #[inline]
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

impl SubAssign for STensor {
    #[inline]
    fn sub_assign(&mut self, o: Self) {
        *self = *self - o;
    }
}

impl FieldValue for STensor {
    const ZERO: Self = STensor::ZERO;
    const N_COMP: usize = 6;

    #[inline]
    fn comp(&self, i: usize) -> Scalar {
        match i {
            0 => self.xx,
            1 => self.yy,
            2 => self.zz,
            3 => self.xy,
            4 => self.yz,
            _ => self.xz,
        }
    }

    #[inline]
    fn set_comp(&mut self, i: usize, v: Scalar) {
        match i {
            0 => self.xx = v,
            1 => self.yy = v,
            2 => self.zz = v,
            3 => self.xy = v,
            4 => self.yz = v,
            _ => self.xz = v,
        }
    }

    #[inline]
    fn splat(v: Scalar) -> Self {
        Self {
            xx: v,
            yy: v,
            zz: v,
            xy: v,
            yz: v,
            xz: v,
        }
    }

    #[inline]
    fn inner(&self, other: &Self) -> Scalar {
        self.double_dot(other)
    }

    #[inline]
    fn sqrt_comp(self) -> Self {
        Self {
            xx: self.xx.sqrt(),
            yy: self.yy.sqrt(),
            zz: self.zz.sqrt(),
            xy: self.xy.sqrt(),
            yz: self.yz.sqrt(),
            xz: self.xz.sqrt(),
        }
    }

    #[inline]
    fn is_finite_all(&self) -> bool {
        (0..6).all(|i| self.comp(i).is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_field_value() {
        let a: Scalar = 3.0;
        let b: Scalar = 4.0;
        assert!((a.inner(&b) - 12.0).abs() < 1e-14);
        assert!((Scalar::splat(2.0) - 2.0).abs() < 1e-14);
    }

    #[test]
    fn test_vector_ops() {
        let a = Vector::new(1.0, 2.0, 3.0);
        let b = Vector::new(4.0, 5.0, 6.0);
        assert!((a.inner(&b) - 32.0).abs() < 1e-14);
        // 逐分量乘
        let c = a * b;
        assert!((c.x - 4.0).abs() < 1e-14);
        assert!((c.z - 18.0).abs() < 1e-14);
        // 叉积
        let n = Vector::X.cross(Vector::Y);
        assert!((n - Vector::Z).length() < 1e-14);
    }

    #[test]
    fn test_division_by_zero_is_inf() {
        let v = Vector::new(1.0, 1.0, 1.0) / 0.0;
        assert!(v.x.is_infinite());
        // 求解器不崩溃，由残差监控发现
        assert!(!v.is_finite_all());
    }

    #[test]
    fn test_tensor_transpose() {
        let t = Tensor::outer(Vector::new(1.0, 2.0, 3.0), Vector::new(4.0, 5.0, 6.0));
        let tt = t.trn();
        assert!((t.xy - tt.yx).abs() < 1e-14);
        assert!((t.zx - tt.xz).abs() < 1e-14);
        assert!((t.trace() - tt.trace()).abs() < 1e-14);
    }

    #[test]
    fn test_tensor_vector_product() {
        // 单位张量不改变向量
        let v = Vector::new(1.0, -2.0, 3.0);
        let r = Tensor::IDENTITY.dot(v);
        assert!((r - v).length() < 1e-14);

        // 外积的性质: (a⊗b)·c = a (b·c)
        let a = Vector::new(1.0, 2.0, 3.0);
        let b = Vector::new(0.5, -1.0, 2.0);
        let c = Vector::new(2.0, 0.0, 1.0);
        let lhs = Tensor::outer(a, b).dot(c);
        let rhs = a * b.dot(c);
        assert!((lhs - rhs).length() < 1e-12);
    }

    #[test]
    fn test_tensor_sym() {
        let t = Tensor::outer(Vector::new(1.0, 2.0, 3.0), Vector::new(4.0, 5.0, 6.0));
        let s = t.sym();
        assert!((s.xy - 0.5 * (t.xy + t.yx)).abs() < 1e-14);
        assert!((s.trace() - t.trace()).abs() < 1e-14);
    }

    #[test]
    fn test_stensor_double_dot() {
        let s = STensor::outer(Vector::new(1.0, 2.0, 3.0));
        // S:S 与展开后的全张量双点积一致
        let full = s.full();
        assert!((s.double_dot(&s) - full.double_dot(&full)).abs() < 1e-12);
    }

    #[test]
    fn test_field_value_components() {
        let mut t = Tensor::ZERO;
        t.set_comp(4, 2.5);
        assert!((t.yy - 2.5).abs() < 1e-14);
        assert_eq!(Tensor::N_COMP, 9);
        assert_eq!(STensor::N_COMP, 6);
        assert_eq!(Vector::N_COMP, 3);
        assert_eq!(Scalar::N_COMP, 1);
    }

    #[test]
    fn test_mag() {
        let v = Vector::new(3.0, 4.0, 0.0);
        assert!((FieldValue::mag(&v) - 5.0).abs() < 1e-14);
        assert!((FieldValue::mag(&(-2.0_f64)) - 2.0).abs() < 1e-14);
    }
}
