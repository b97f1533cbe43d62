// crates/fv_solver/src/solve/krylov.rs

//! Krylov 迭代核心
//!
//! - [`pcg`]: 预条件共轭梯度法，对称正定系统
//!   （压力、壁面距离、纯扩散）
//! - [`bicgstab`]: 双共轭梯度稳定法，非对称系统
//!   （动量、输运）
//!
//! 矩阵乘积与预条件以闭包注入；内积闭包完成全局归约，
//! 因此核心对单进程与多进程一视同仁。停滞与 breakdown
//! 提前返回而不是除零。

use fv_core::{FieldValue, Scalar};

use super::vector_ops::{axpy, copy};

/// 停滞判据
const STAG_TOL: Scalar = 1e-300;
/// 发散判据（相对初始残差）
const DIV_FACTOR: Scalar = 1e6;

/// 求解状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// 收敛
    Converged,
    /// 达到最大迭代次数（软超时，报告后继续外层循环）
    MaxIterationsReached,
    /// 发散
    Diverged,
    /// 停滞
    Stagnated,
}

/// 求解结果
#[derive(Debug, Clone)]
pub struct SolverResult {
    /// 求解状态
    pub status: SolverStatus,
    /// 迭代次数
    pub iterations: usize,
    /// 最终残差范数
    pub residual_norm: Scalar,
    /// 初始残差范数
    pub initial_residual_norm: Scalar,
    /// 相对残差 ‖r‖/‖b‖
    pub relative_residual: Scalar,
    /// 每次迭代后的残差范数
    pub residual_history: Vec<Scalar>,
}

impl SolverResult {
    /// 是否收敛
    pub fn is_converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }

    fn finish(
        status: SolverStatus,
        iterations: usize,
        res: Scalar,
        init: Scalar,
        b_norm: Scalar,
        history: Vec<Scalar>,
    ) -> Self {
        Self {
            status,
            iterations,
            residual_norm: res,
            initial_residual_norm: init,
            relative_residual: if b_norm > 0.0 { res / b_norm } else { 0.0 },
            residual_history: history,
        }
    }
}

/// 预条件共轭梯度法
///
/// `spmv(v, y)` 计算 `y = A·v`；`precond(r, z)` 计算 `z = M⁻¹·r`；
/// `dot` 含全局归约。收敛判据 `‖r‖/‖b‖ < rtol`。
pub fn pcg<T, S, P, D>(
    b: &[T],
    x: &mut [T],
    spmv: &mut S,
    precond: P,
    dot: D,
    rtol: Scalar,
    max_iter: usize,
) -> SolverResult
where
    T: FieldValue,
    S: FnMut(&[T], &mut [T]),
    P: Fn(&[T], &mut [T]),
    D: Fn(&[T], &[T]) -> Scalar,
{
    let n = b.len();
    let mut r = vec![T::ZERO; n];
    let mut z = vec![T::ZERO; n];
    let mut p = vec![T::ZERO; n];
    let mut ap = vec![T::ZERO; n];
    let mut history = Vec::new();

    let b_norm = dot(b, b).sqrt();

    // r = b − A·x
    spmv(x, &mut r);
    for i in 0..n {
        r[i] = b[i] - r[i];
    }

    let initial_norm = dot(&r, &r).sqrt();
    let tol = rtol * if b_norm > 0.0 { b_norm } else { 1.0 };
    if initial_norm <= tol {
        return SolverResult::finish(
            SolverStatus::Converged,
            0,
            initial_norm,
            initial_norm,
            b_norm,
            history,
        );
    }

    // z = M⁻¹·r; p = z
    precond(&r, &mut z);
    copy(&z, &mut p);
    let mut rz = dot(&r, &z);

    for iter in 0..max_iter {
        spmv(&p, &mut ap);
        let pap = dot(&p, &ap);
        if pap.abs() < STAG_TOL {
            let res = dot(&r, &r).sqrt();
            return SolverResult::finish(
                SolverStatus::Stagnated,
                iter,
                res,
                initial_norm,
                b_norm,
                history,
            );
        }

        let alpha = rz / pap;
        axpy(alpha, &p, x);
        axpy(-alpha, &ap, &mut r);

        let res_norm = dot(&r, &r).sqrt();
        history.push(res_norm);
        log::trace!("PCG iter {}: residual = {:.6e}", iter + 1, res_norm);

        if res_norm <= tol {
            return SolverResult::finish(
                SolverStatus::Converged,
                iter + 1,
                res_norm,
                initial_norm,
                b_norm,
                history,
            );
        }

        precond(&r, &mut z);
        let rz_new = dot(&r, &z);
        let beta = rz_new / rz;
        rz = rz_new;

        for i in 0..n {
            p[i] = z[i] + p[i] * beta;
        }
    }

    let res = dot(&r, &r).sqrt();
    SolverResult::finish(
        SolverStatus::MaxIterationsReached,
        max_iter,
        res,
        initial_norm,
        b_norm,
        history,
    )
}

/// 双共轭梯度稳定法（右预条件）
pub fn bicgstab<T, S, P, D>(
    b: &[T],
    x: &mut [T],
    spmv: &mut S,
    precond: P,
    dot: D,
    rtol: Scalar,
    max_iter: usize,
) -> SolverResult
where
    T: FieldValue,
    S: FnMut(&[T], &mut [T]),
    P: Fn(&[T], &mut [T]),
    D: Fn(&[T], &[T]) -> Scalar,
{
    let n = b.len();
    let mut r = vec![T::ZERO; n];
    let mut r0 = vec![T::ZERO; n];
    let mut p = vec![T::ZERO; n];
    let mut v = vec![T::ZERO; n];
    let mut s = vec![T::ZERO; n];
    let mut t = vec![T::ZERO; n];
    let mut p_hat = vec![T::ZERO; n];
    let mut s_hat = vec![T::ZERO; n];
    let mut history = Vec::new();

    let b_norm = dot(b, b).sqrt();

    // r = b − A·x；影子残差 r0 固定为初始残差
    spmv(x, &mut r);
    for i in 0..n {
        r[i] = b[i] - r[i];
    }
    let initial_norm = dot(&r, &r).sqrt();
    let tol = rtol * if b_norm > 0.0 { b_norm } else { 1.0 };
    if initial_norm <= tol {
        return SolverResult::finish(
            SolverStatus::Converged,
            0,
            initial_norm,
            initial_norm,
            b_norm,
            history,
        );
    }
    copy(&r, &mut r0);

    let mut rho_old: Scalar = 1.0;
    let mut alpha: Scalar = 1.0;
    let mut omega: Scalar = 1.0;

    for iter in 0..max_iter {
        let rho = dot(&r0, &r);
        if rho.abs() < STAG_TOL {
            let res = dot(&r, &r).sqrt();
            return SolverResult::finish(
                SolverStatus::Stagnated,
                iter,
                res,
                initial_norm,
                b_norm,
                history,
            );
        }

        let beta = if iter == 0 {
            0.0
        } else {
            (rho / rho_old) * (alpha / omega)
        };
        rho_old = rho;

        // p = r + beta (p − omega v)
        for i in 0..n {
            p[i] = r[i] + (p[i] - v[i] * omega) * beta;
        }

        precond(&p, &mut p_hat);
        spmv(&p_hat, &mut v);

        let r0v = dot(&r0, &v);
        if r0v.abs() < STAG_TOL {
            let res = dot(&r, &r).sqrt();
            return SolverResult::finish(
                SolverStatus::Stagnated,
                iter,
                res,
                initial_norm,
                b_norm,
                history,
            );
        }
        alpha = rho / r0v;

        // s = r − alpha v
        for i in 0..n {
            s[i] = r[i] - v[i] * alpha;
        }

        let s_norm = dot(&s, &s).sqrt();
        if s_norm <= tol {
            axpy(alpha, &p_hat, x);
            history.push(s_norm);
            return SolverResult::finish(
                SolverStatus::Converged,
                iter + 1,
                s_norm,
                initial_norm,
                b_norm,
                history,
            );
        }

        precond(&s, &mut s_hat);
        spmv(&s_hat, &mut t);

        let tt = dot(&t, &t);
        omega = if tt.abs() < STAG_TOL {
            1.0
        } else {
            dot(&t, &s) / tt
        };
        if omega.abs() < STAG_TOL {
            axpy(alpha, &p_hat, x);
            let res = dot(&s, &s).sqrt();
            return SolverResult::finish(
                SolverStatus::Stagnated,
                iter + 1,
                res,
                initial_norm,
                b_norm,
                history,
            );
        }

        axpy(alpha, &p_hat, x);
        axpy(omega, &s_hat, x);

        // r = s − omega t
        for i in 0..n {
            r[i] = s[i] - t[i] * omega;
        }

        let res_norm = dot(&r, &r).sqrt();
        history.push(res_norm);
        log::trace!("BiCGStab iter {}: residual = {:.6e}", iter + 1, res_norm);

        if res_norm <= tol {
            return SolverResult::finish(
                SolverStatus::Converged,
                iter + 1,
                res_norm,
                initial_norm,
                b_norm,
                history,
            );
        }
        if res_norm > initial_norm * DIV_FACTOR {
            return SolverResult::finish(
                SolverStatus::Diverged,
                iter + 1,
                res_norm,
                initial_norm,
                b_norm,
                history,
            );
        }
    }

    let res = dot(&r, &r).sqrt();
    SolverResult::finish(
        SolverStatus::MaxIterationsReached,
        max_iter,
        res,
        initial_norm,
        b_norm,
        history,
    )
}
