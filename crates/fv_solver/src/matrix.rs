// crates/fv_solver/src/matrix.rs

//! 面式稀疏算子矩阵
//!
//! [`MeshMatrix<T>`] 是某个单元场的线性算子，按面组织非零元：
//! - `ap[i]`: 内部单元 i 的对角系数
//! - `an[0][f]` / `an[1][f]`: 面 f 的 owner 侧 / neighbor 侧系数
//!   （an[0] 在 owner 的行里乘 neighbor 的值，an[1] 反之）
//! - `sp[i]`: 隐式源（计入对角）
//! - `su[i]`: 显式源 / 右端项
//!
//! 第 i 行的值为
//! `(ap[i] + sp[i])·x[i] − Σ_{f∈faces(i)} an[side(f,i)][f]·x[opp(f,i)] + su[i]`。
//!
//! 边界面的系数耦合到幽灵单元；求解时幽灵值按当前边界条件
//! 并入右端（延迟修正），进程间幽灵参与 halo 交换后的 SpMV。
//!
//! 单元场并入源项时按体积积分（`add_source`），保证与面积
//! 积分的算子系数量纲一致。

use std::ops::{AddAssign, MulAssign, Neg, SubAssign};

use fv_core::{FieldValue, Scalar};
use fv_mesh::Mesh;

use crate::field::Field;

/// 面式稀疏矩阵
#[derive(Debug, Clone)]
pub struct MeshMatrix<'m, T: FieldValue> {
    /// 网格（只读借用）
    pub mesh: &'m Mesh,
    /// 对角系数（内部单元）
    pub ap: Vec<Scalar>,
    /// 每面两侧系数
    pub an: [Vec<Scalar>; 2],
    /// 隐式源（计入对角）
    pub sp: Vec<Scalar>,
    /// 显式源 / 右端项
    pub su: Vec<T>,
    /// 对称标记（纯扩散为真；出现对流或行固定后为假）
    pub symmetric: bool,
}

impl<'m, T: FieldValue> MeshMatrix<'m, T> {
    /// 零矩阵
    pub fn new(mesh: &'m Mesh) -> Self {
        let n = mesh.ghost_cells_start();
        Self {
            mesh,
            ap: vec![0.0; n],
            an: [vec![0.0; mesh.n_faces()], vec![0.0; mesh.n_faces()]],
            sp: vec![0.0; n],
            su: vec![T::ZERO; n],
            symmetric: true,
        }
    }

    /// 行数（内部单元数）
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.ap.len()
    }

    /// 行 i 的对角（含隐式源）
    #[inline]
    pub fn diag(&self, i: usize) -> Scalar {
        self.ap[i] + self.sp[i]
    }

    /// 算子作用 y = M·x
    ///
    /// `y[i] = (ap+sp)[i]·x[i] − Σ an[side]·x[opp] + su[i]`，
    /// x 为含幽灵值的单元场。面循环按编号升序。
    pub fn apply(&self, x: &Field<T>) -> Field<T> {
        let mesh = self.mesh;
        let n = self.n_rows();
        let mut y = Field::cells(mesh, T::ZERO);
        for i in 0..n {
            y[i] = x[i] * self.diag(i) + self.su[i];
        }
        for f in 0..mesh.n_faces() {
            let o = mesh.owner(f);
            let nb = mesh.neighbor(f);
            y[o] -= x[nb] * self.an[0][f];
            if nb < n {
                y[nb] -= x[o] * self.an[1][f];
            }
        }
        y
    }

    /// H 算子：`getRHS(M) = Su + Σ an[side]·x[opp]`
    ///
    /// PISO 中的 H(U)，即除对角项外的全部贡献（幽灵值取场的
    /// 当前边界值）。返回单元场，幽灵单元为零，调用方随后
    /// 刷新边界。
    pub fn get_rhs(&self, x: &Field<T>) -> Field<T> {
        let mesh = self.mesh;
        let n = self.n_rows();
        let mut y = Field::cells(mesh, T::ZERO);
        for i in 0..n {
            y[i] = self.su[i];
        }
        for f in 0..mesh.n_faces() {
            let o = mesh.owner(f);
            let nb = mesh.neighbor(f);
            y[o] += x[nb] * self.an[0][f];
            if nb < n {
                y[nb] += x[o] * self.an[1][f];
            }
        }
        y
    }

    /// 欠松弛：`ap /= α; Su += (1−α)/α·ap_old·x`
    pub fn relax(&mut self, alpha: Scalar, x: &Field<T>) {
        let c = (1.0 - alpha) / alpha;
        for i in 0..self.n_rows() {
            self.su[i] += x[i] * (self.ap[i] * c);
            self.ap[i] /= alpha;
        }
    }

    /// 单元场按体积积分并入源项：`Su[i] += φ[i]·cV[i]`
    ///
    /// `Solve(M += div(ρU))` 与 `Solve(M == g)` 的右端都经此进入。
    pub fn add_source(&mut self, phi: &Field<T>) {
        for i in 0..self.n_rows() {
            self.su[i] += phi[i] * self.mesh.c_v[i];
        }
    }

    /// 固定行 i 为给定值（壁面函数等）
    ///
    /// 行变为 `x[i] = value`；邻居行对 i 的耦合保持不变。
    pub fn fix_cell(&mut self, i: usize, value: T) {
        self.ap[i] = 1.0;
        self.sp[i] = 0.0;
        self.su[i] = value;
        for &f in self.mesh.faces_of(i) {
            let f = f as usize;
            let side = self.mesh.side(f, i);
            self.an[side][f] = 0.0;
        }
        self.symmetric = false;
    }
}

impl<'m, T: FieldValue> AddAssign<MeshMatrix<'m, T>> for MeshMatrix<'m, T> {
    fn add_assign(&mut self, rhs: MeshMatrix<'m, T>) {
        debug_assert_eq!(self.n_rows(), rhs.n_rows());
        for i in 0..self.n_rows() {
            self.ap[i] += rhs.ap[i];
            self.sp[i] += rhs.sp[i];
            self.su[i] += rhs.su[i];
        }
        for s in 0..2 {
            for f in 0..self.an[s].len() {
                self.an[s][f] += rhs.an[s][f];
            }
        }
        self.symmetric &= rhs.symmetric;
    }
}

impl<'m, T: FieldValue> SubAssign<MeshMatrix<'m, T>> for MeshMatrix<'m, T> {
    fn sub_assign(&mut self, rhs: MeshMatrix<'m, T>) {
        debug_assert_eq!(self.n_rows(), rhs.n_rows());
        for i in 0..self.n_rows() {
            self.ap[i] -= rhs.ap[i];
            self.sp[i] -= rhs.sp[i];
            self.su[i] -= rhs.su[i];
        }
        for s in 0..2 {
            for f in 0..self.an[s].len() {
                self.an[s][f] -= rhs.an[s][f];
            }
        }
        self.symmetric &= rhs.symmetric;
    }
}

/// 标量乘：所有系数与源项同乘
impl<'m, T: FieldValue> MulAssign<Scalar> for MeshMatrix<'m, T> {
    fn mul_assign(&mut self, s: Scalar) {
        for v in &mut self.ap {
            *v *= s;
        }
        for v in &mut self.sp {
            *v *= s;
        }
        for v in &mut self.su {
            *v = *v * s;
        }
        for side in &mut self.an {
            for v in side.iter_mut() {
                *v *= s;
            }
        }
    }
}

impl<'m, T: FieldValue> Neg for MeshMatrix<'m, T> {
    type Output = Self;
    fn neg(mut self) -> Self {
        self *= -1.0;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_core::Vector;
    use fv_mesh::generation::{structured_box, DEFAULT_PATCH_NAMES};

    fn mesh() -> Mesh {
        structured_box(
            3,
            1,
            1,
            Vector::ZERO,
            Vector::new(3.0, 1.0, 1.0),
            &DEFAULT_PATCH_NAMES,
        )
        .unwrap()
    }

    /// 手工装配 1D 三点模板: 行 = 2x_i − x_{i−1} − x_{i+1}
    fn tridiag(mesh: &Mesh) -> MeshMatrix<'_, Scalar> {
        let mut m = MeshMatrix::new(mesh);
        for f in 0..mesh.n_interior_faces() {
            m.an[0][f] = 1.0;
            m.an[1][f] = 1.0;
            m.ap[mesh.owner(f)] += 1.0;
            m.ap[mesh.neighbor(f)] += 1.0;
        }
        m
    }

    #[test]
    fn test_apply_row_semantics() {
        let mesh = mesh();
        let m = tridiag(&mesh);
        let mut x = Field::<Scalar>::cells(&mesh, 0.0);
        x[0] = 1.0;
        x[1] = 2.0;
        x[2] = 3.0;

        let y = m.apply(&x);
        // 行 0: 1*1 − 1*2 = −1（只有一个内部面）
        assert!((y[0] - (1.0 - 2.0)).abs() < 1e-14);
        // 行 1: 2*2 − 1 − 3 = 0
        assert!((y[1] - 0.0).abs() < 1e-14);
        // 行 2: 1*3 − 2 = 1
        assert!((y[2] - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_get_rhs_is_offdiag_plus_su() {
        let mesh = mesh();
        let mut m = tridiag(&mesh);
        m.su[1] = 5.0;
        let mut x = Field::<Scalar>::cells(&mesh, 0.0);
        x[0] = 1.0;
        x[2] = 3.0;

        let h = m.get_rhs(&x);
        // H[1] = su + x0 + x2 = 5 + 1 + 3
        assert!((h[1] - 9.0).abs() < 1e-14);
        // apply + get_rhs 一致性: M·x = diag·x − (H − su) + su
        let y = m.apply(&x);
        for i in 0..m.n_rows() {
            let lhs = y[i];
            let rhs = m.diag(i) * x[i] - h[i] + 2.0 * m.su[i];
            assert!((lhs - rhs).abs() < 1e-12);
        }
    }

    #[test]
    fn test_relax() {
        let mesh = mesh();
        let mut m = tridiag(&mesh);
        let mut x = Field::<Scalar>::cells(&mesh, 2.0);
        x[1] = 4.0;
        let ap_old = m.ap[1];
        m.relax(0.5, &x);
        assert!((m.ap[1] - ap_old / 0.5).abs() < 1e-14);
        // su += (1−α)/α · ap_old · x = 1.0 * 2 * 4
        assert!((m.su[1] - ap_old * 4.0).abs() < 1e-14);
    }

    #[test]
    fn test_scale_and_add() {
        let mesh = mesh();
        let mut a = tridiag(&mesh);
        let b = tridiag(&mesh);
        a += b;
        assert!((a.an[0][0] - 2.0).abs() < 1e-14);
        a *= 0.5;
        assert!((a.an[0][0] - 1.0).abs() < 1e-14);
        assert!((a.ap[1] - 2.0).abs() < 1e-14);
    }

    #[test]
    fn test_fix_cell() {
        let mesh = mesh();
        let mut m = tridiag(&mesh);
        m.fix_cell(1, 7.0);
        let mut x = Field::<Scalar>::cells(&mesh, 100.0);
        x[1] = 7.0;
        let y = m.apply(&x);
        // 固定行: y[1] = 1*7 + su(=7) = 14, 与邻居无关
        assert!((y[1] - 14.0).abs() < 1e-12);
        assert!(!m.symmetric);
    }
}
