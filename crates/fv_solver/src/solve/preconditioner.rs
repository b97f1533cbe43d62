// crates/fv_solver/src/solve/preconditioner.rs

//! 预条件器
//!
//! 三种与面式存储配合的预条件器，apply 均为 `z = M⁻¹·r`：
//!
//! - DIAG: 对角缩放
//! - DILU: 模式与矩阵相同的对角不完全 LU（先按面升序改造
//!   对角，再前代 / 回代两次面扫描）
//! - SOR: 以 `SOR_omega` 的对称逐次超松弛（前向 + 后向单元扫描）
//!
//! 预条件器作用于本 rank 的内部未知量；跨 rank 的耦合交由
//! Krylov 外层的 halo 交换。

use fv_core::{FieldValue, Scalar};
use fv_mesh::Mesh;

use fv_config::Preconditioner as PrecondKind;

/// 已构造的预条件器
///
/// 持有符号归一后的矩阵系数快照（构造后矩阵不再变化）。
pub struct Precond<'a> {
    kind: PrecondKind,
    mesh: &'a Mesh,
    /// 对角（含隐式源，已符号归一）
    diag: Vec<Scalar>,
    /// 面系数（已符号归一）
    an: [&'a [Scalar]; 2],
    /// 符号因子（负定系统翻转）
    sig: Scalar,
    /// DILU 改造对角的逆
    r_d_inv: Vec<Scalar>,
    /// SOR 松弛因子
    omega: Scalar,
}

impl<'a> Precond<'a> {
    /// 构造预条件器
    ///
    /// `diag` 为符号归一后的对角；`an` 为原始面系数（作用时
    /// 乘以 `sig`）。零对角以 1 替代，奇异行计数告警。
    pub fn build(
        kind: PrecondKind,
        mesh: &'a Mesh,
        diag: Vec<Scalar>,
        an: [&'a [Scalar]; 2],
        sig: Scalar,
        omega: Scalar,
    ) -> Self {
        let mut safe_diag = diag;
        let mut singular = 0usize;
        for d in safe_diag.iter_mut() {
            if *d == 0.0 {
                *d = 1.0;
                singular += 1;
            }
        }
        if singular > 0 {
            log::warn!("预条件器遇到 {} 个零对角行，以 1 替代", singular);
        }

        // DILU 改造对角：rD 初值为对角，按面升序消去下三角贡献
        let mut r_d_inv = Vec::new();
        if kind == PrecondKind::Dilu {
            let mut r_d = safe_diag.clone();
            for f in 0..mesh.n_interior_faces() {
                let o = mesh.owner(f);
                let nb = mesh.neighbor(f);
                let l = sig * an[1][f];
                let u = sig * an[0][f];
                if r_d[o] != 0.0 {
                    r_d[nb] -= l * u / r_d[o];
                }
            }
            r_d_inv = r_d
                .iter()
                .map(|&d| if d != 0.0 { 1.0 / d } else { 1.0 })
                .collect();
        }

        Self {
            kind,
            mesh,
            diag: safe_diag,
            an,
            sig,
            r_d_inv,
            omega,
        }
    }

    /// z = M⁻¹ · r
    pub fn apply<T: FieldValue>(&self, r: &[T], z: &mut [T]) {
        match self.kind {
            PrecondKind::Diag => {
                for i in 0..r.len() {
                    z[i] = r[i] / self.diag[i];
                }
            }
            PrecondKind::Dilu => self.apply_dilu(r, z),
            PrecondKind::Sor => self.apply_sor(r, z),
        }
    }

    /// DILU：(D* − L) D*⁻¹ (D* − U) 的前代 / 回代
    ///
    /// 面存储的下三角元为 −an[1]（行 neighbor 列 owner），
    /// 上三角元为 −an[0]；因此扫描中的符号为正。
    fn apply_dilu<T: FieldValue>(&self, r: &[T], z: &mut [T]) {
        let mesh = self.mesh;
        let n = r.len();

        // 前代 (D* − L) w = r
        for i in 0..n {
            z[i] = r[i] * self.r_d_inv[i];
        }
        for f in 0..mesh.n_interior_faces() {
            let o = mesh.owner(f);
            let nb = mesh.neighbor(f);
            let l = self.sig * self.an[1][f];
            z[nb] += z[o] * (l * self.r_d_inv[nb]);
        }

        // 回代 (D* − U) z = D* w
        for f in (0..mesh.n_interior_faces()).rev() {
            let o = mesh.owner(f);
            let nb = mesh.neighbor(f);
            let u = self.sig * self.an[0][f];
            let delta = z[nb] * (u * self.r_d_inv[o]);
            z[o] += delta;
        }
    }

    /// 对称 SOR：前向扫描 + 后向扫描
    fn apply_sor<T: FieldValue>(&self, r: &[T], z: &mut [T]) {
        let mesh = self.mesh;
        let n = r.len();
        let omega = self.omega;

        // 前向 (L + D/ω) z = r
        for i in 0..n {
            let mut sum = r[i];
            for &f in mesh.faces_of(i) {
                let f = f as usize;
                let opp = mesh.opposite(f, i);
                if opp < i {
                    let a = self.sig * self.an[mesh.side(f, i)][f];
                    sum += z[opp] * a;
                }
            }
            z[i] = sum * (omega / self.diag[i]);
        }

        // 后向 (U + D/ω) z' = D z
        for i in (0..n).rev() {
            let mut sum = z[i] * (self.diag[i] / omega);
            for &f in mesh.faces_of(i) {
                let f = f as usize;
                let opp = mesh.opposite(f, i);
                if opp > i && opp < n {
                    let a = self.sig * self.an[mesh.side(f, i)][f];
                    sum += z[opp] * a;
                }
            }
            z[i] = sum * (omega / self.diag[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_core::Vector;
    use fv_mesh::generation::{structured_box, DEFAULT_PATCH_NAMES};

    fn mesh(nx: usize) -> Mesh {
        structured_box(
            nx,
            1,
            1,
            Vector::ZERO,
            Vector::new(nx as f64, 1.0, 1.0),
            &DEFAULT_PATCH_NAMES,
        )
        .unwrap()
    }

    #[test]
    fn test_diag_apply() {
        let m = mesh(3);
        let an0 = vec![0.0; m.n_faces()];
        let an1 = vec![0.0; m.n_faces()];
        let p = Precond::build(
            PrecondKind::Diag,
            &m,
            vec![2.0, 4.0, 8.0],
            [&an0, &an1],
            1.0,
            1.0,
        );
        let r = vec![2.0, 4.0, 8.0];
        let mut z = vec![0.0; 3];
        p.apply(&r, &mut z);
        assert!((z[0] - 1.0).abs() < 1e-14);
        assert!((z[1] - 1.0).abs() < 1e-14);
        assert!((z[2] - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_zero_diagonal_replaced() {
        let m = mesh(2);
        let an0 = vec![0.0; m.n_faces()];
        let an1 = vec![0.0; m.n_faces()];
        let p = Precond::build(
            PrecondKind::Diag,
            &m,
            vec![0.0, 2.0],
            [&an0, &an1],
            1.0,
            1.0,
        );
        let r = vec![3.0, 4.0];
        let mut z = vec![0.0; 2];
        p.apply(&r, &mut z);
        assert!((z[0] - 3.0).abs() < 1e-14);
    }

    #[test]
    fn test_dilu_exact_for_tridiagonal() {
        // 1D 三对角矩阵的 DILU 即完全 LU：一次 apply 得精确解
        let m = mesh(4);
        let n = m.ghost_cells_start();
        // A: diag 2, 次对角 −1（an 存正系数，行值为 diag·x − an·x_opp）
        let mut an0 = vec![0.0; m.n_faces()];
        let mut an1 = vec![0.0; m.n_faces()];
        for f in 0..m.n_interior_faces() {
            an0[f] = 1.0;
            an1[f] = 1.0;
        }
        let diag = vec![2.0; n];
        let p = Precond::build(PrecondKind::Dilu, &m, diag.clone(), [&an0, &an1], 1.0, 1.0);

        // 已知解 x，构造 r = A x
        let x = vec![1.0, -2.0, 3.0, 0.5];
        let mut r = vec![0.0; n];
        for i in 0..n {
            r[i] = diag[i] * x[i];
        }
        for f in 0..m.n_interior_faces() {
            let o = m.owner(f);
            let nb = m.neighbor(f);
            r[o] -= an0[f] * x[nb];
            r[nb] -= an1[f] * x[o];
        }

        let mut z = vec![0.0; n];
        p.apply(&r, &mut z);
        for i in 0..n {
            assert!((z[i] - x[i]).abs() < 1e-12, "i={}: {} != {}", i, z[i], x[i]);
        }
    }
}
