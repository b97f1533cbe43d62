// crates/fv_solver/src/ops/temporal.rs

//! 时间导数算子
//!
//! `ddt(φ, ρ)` 按 `time_scheme` 装配：
//!
//! - EULER / BDF1（后向）: `ap += ρV/dt`, `Su += ρV·φⁿ/dt`
//! - BDF2: `ap += 1.5ρV/dt`, `Su += ρV(2φⁿ − 0.5φⁿ⁻¹)/dt`，
//!   首步历史不足时自动退化为后向 Euler
//! - 显式 Runge-Kutta: 每级的矩阵为 `ap = ρV/(α·dt)`，
//!   由驱动以 [`rk_coeffs`] 的级系数逐级调用 [`ddt_rk_stage`]
//!
//! 历史时间层由 [`TimeHistory`] 保存，步末 `push` 轮转。

use fv_core::{FieldValue, Scalar};
use fv_config::TimeScheme;
use fv_mesh::Mesh;

use crate::field::Field;
use crate::matrix::MeshMatrix;

/// 历史时间层（prev[0] = φⁿ，prev[1] = φⁿ⁻¹）
#[derive(Debug, Clone)]
pub struct TimeHistory<T: FieldValue> {
    levels: Vec<Field<T>>,
    capacity: usize,
}

impl<T: FieldValue> TimeHistory<T> {
    /// 以当前场初始化
    pub fn new(scheme: TimeScheme, current: &Field<T>) -> Self {
        Self {
            levels: vec![current.clone()],
            capacity: scheme.n_history(),
        }
    }

    /// 已保存的层数
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// 第 k 层（0 = 最新）
    pub fn level(&self, k: usize) -> &Field<T> {
        &self.levels[k]
    }

    /// 步末轮转：当前场成为 φⁿ
    pub fn push(&mut self, current: &Field<T>) {
        self.levels.insert(0, current.clone());
        self.levels.truncate(self.capacity);
    }
}

/// 时间导数矩阵
pub fn ddt<'m, T: FieldValue>(
    mesh: &'m Mesh,
    history: &TimeHistory<T>,
    rho: Scalar,
    dt: Scalar,
    scheme: TimeScheme,
) -> MeshMatrix<'m, T> {
    let mut m = MeshMatrix::new(mesh);
    let rdt = rho / dt;

    match scheme {
        TimeScheme::Bdf2 if history.len() >= 2 => {
            let phi_n = history.level(0);
            let phi_nm1 = history.level(1);
            for i in 0..m.n_rows() {
                let v = mesh.c_v[i];
                m.ap[i] += 1.5 * rdt * v;
                m.su[i] += (phi_n[i] * 2.0 - phi_nm1[i] * 0.5) * (rdt * v);
            }
        }
        _ => {
            // EULER / BDF1，以及历史不足的 BDF2 首步
            let phi_n = history.level(0);
            for i in 0..m.n_rows() {
                let v = mesh.c_v[i];
                m.ap[i] += rdt * v;
                m.su[i] += phi_n[i] * (rdt * v);
            }
        }
    }
    m
}

/// 显式 Runge-Kutta 级系数 α（低存储格式，末级 α = 1）
pub fn rk_coeffs(order: usize) -> &'static [Scalar] {
    match order {
        0 | 1 => &[1.0],
        2 => &[0.5, 1.0],
        3 => &[1.0 / 3.0, 0.5, 1.0],
        _ => &[0.25, 1.0 / 3.0, 0.5, 1.0],
    }
}

/// RK 单级矩阵：`ap = ρV/(α·dt)`, `Su = ρV·φ⁰/(α·dt)`
///
/// `phi0` 为本时间步起始值（各级共用）。
pub fn ddt_rk_stage<'m, T: FieldValue>(
    mesh: &'m Mesh,
    phi0: &Field<T>,
    rho: Scalar,
    dt: Scalar,
    alpha: Scalar,
) -> MeshMatrix<'m, T> {
    let mut m = MeshMatrix::new(mesh);
    let c = rho / (alpha * dt);
    for i in 0..m.n_rows() {
        let v = mesh.c_v[i];
        m.ap[i] += c * v;
        m.su[i] += phi0[i] * (c * v);
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_core::Vector;
    use fv_mesh::generation::{structured_box, DEFAULT_PATCH_NAMES};

    fn mesh() -> fv_mesh::Mesh {
        structured_box(
            2,
            1,
            1,
            Vector::ZERO,
            Vector::new(2.0, 1.0, 1.0),
            &DEFAULT_PATCH_NAMES,
        )
        .unwrap()
    }

    #[test]
    fn test_euler_coefficients() {
        let m = mesh();
        let phi = Field::<Scalar>::cells(&m, 3.0);
        let hist = TimeHistory::new(TimeScheme::Euler, &phi);
        let mat = ddt(&m, &hist, 2.0, 0.1, TimeScheme::Euler);
        // ρV/dt = 2*1/0.1 = 20
        assert!((mat.ap[0] - 20.0).abs() < 1e-12);
        assert!((mat.su[0] - 60.0).abs() < 1e-12);
        assert!(mat.symmetric);
    }

    #[test]
    fn test_bdf2_falls_back_on_first_step() {
        let m = mesh();
        let phi = Field::<Scalar>::cells(&m, 1.0);
        let hist = TimeHistory::new(TimeScheme::Bdf2, &phi);
        let mat = ddt(&m, &hist, 1.0, 1.0, TimeScheme::Bdf2);
        // 只有一层历史：退化为 Euler 系数
        assert!((mat.ap[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bdf2_coefficients() {
        let m = mesh();
        let phi0 = Field::<Scalar>::cells(&m, 1.0);
        let mut hist = TimeHistory::new(TimeScheme::Bdf2, &phi0);
        let phi1 = Field::<Scalar>::cells(&m, 2.0);
        hist.push(&phi1);
        assert_eq!(hist.len(), 2);

        let mat = ddt(&m, &hist, 1.0, 0.5, TimeScheme::Bdf2);
        // ap = 1.5/0.5 = 3; su = (2*2 − 0.5*1)/0.5 = 7
        assert!((mat.ap[0] - 3.0).abs() < 1e-12);
        assert!((mat.su[0] - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_history_rotation() {
        let m = mesh();
        let a = Field::<Scalar>::cells(&m, 1.0);
        let mut hist = TimeHistory::new(TimeScheme::Bdf2, &a);
        let b = Field::<Scalar>::cells(&m, 2.0);
        let c = Field::<Scalar>::cells(&m, 3.0);
        hist.push(&b);
        hist.push(&c);
        // 容量 2：最旧层被丢弃
        assert_eq!(hist.len(), 2);
        assert!((hist.level(0)[0] - 3.0).abs() < 1e-14);
        assert!((hist.level(1)[0] - 2.0).abs() < 1e-14);
    }

    #[test]
    fn test_rk_stage() {
        let m = mesh();
        let phi0 = Field::<Scalar>::cells(&m, 1.0);
        let coeffs = rk_coeffs(4);
        assert_eq!(coeffs.len(), 4);
        assert!((coeffs[3] - 1.0).abs() < 1e-15);

        let mat = ddt_rk_stage(&m, &phi0, 1.0, 0.1, coeffs[0]);
        // ap = 1/(0.25*0.1) = 40
        assert!((mat.ap[0] - 40.0).abs() < 1e-12);
    }
}
