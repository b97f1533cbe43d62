// crates/fv_solver/src/solve/mod.rs

//! 线性求解入口
//!
//! `Solve(M)`（右端在 Su）与 `Solve(M == rhs)`（附加单元场
//! 右端，按体积积分）。方法选择：对称矩阵按 `method` 偏好
//! （默认 PCG），非对称一律 BiCGStab。
//!
//! # 边界折叠
//!
//! 未知量是本 rank 的内部单元。进入 Krylov 前按未知场的
//! 边界条件把边界面系数折入行内：
//!
//! - DIRICHLET: `b[o] += an₀·value`（系数固定边界面通量）
//! - NEUMANN: 对角净贡献为零（`diag[o] −= an₀`），
//!   `b[o] += an₀·slope·|d|`
//! - ROBIN: 按混合因子同时作用对角与右端
//! - SYMMETRY: 零梯度折叠 + 法向反射部分以当前值显式入右端
//! - CYCLIC: 幽灵值为配对面内部值，显式入右端（远端 owner）
//! - 壁面函数 / 未登记: 零梯度折叠 / 幽灵当前值入右端
//!
//! 进程间幽灵参与 SpMV，按 `parallel_method` 在每次乘积前
//! 同步（BLOCKED）或以上一迭代值重叠（ASYNCHRONOUS）。
//! 内积与范数经通信门面全局归约。
//!
//! # 符号归一
//!
//! `lap` 等负定装配在进入 Krylov 前整体取负（解不变，保持
//! PCG 所需的正定性）。收敛判据 `‖r‖/‖b‖ < tolerance`，达到
//! `max_iterations` 报告不收敛但不致命。

pub mod krylov;
pub mod preconditioner;
pub mod vector_ops;

use fv_core::{FieldValue, Scalar};
use fv_config::{Controls, Method, ParallelMethod};
use fv_mesh::Mesh;

use crate::boundary::{BcKind, BcRegistry, BcValue};
use crate::comm::Comm;
use crate::field::Field;
use crate::matrix::MeshMatrix;

pub use krylov::{SolverResult, SolverStatus};
use preconditioner::Precond;

/// 求解 `M·x = Su (+ rhs·V)`
///
/// `x` 的内部值为初始猜测并承接解；幽灵值在进入时应已按
/// 边界条件刷新（CYCLIC 与对称反射的显式部分取自幽灵/当前值）。
pub fn solve<T: BcValue>(
    mesh: &Mesh,
    controls: &Controls,
    comm: &dyn Comm,
    bcs: &BcRegistry,
    m: &MeshMatrix<T>,
    rhs: Option<&Field<T>>,
    x: &mut Field<T>,
) -> SolverResult {
    let n = m.n_rows();

    // ---- 符号归一（负定系统整体取负）----
    let mut trace = 0.0;
    for i in 0..n {
        trace += m.diag(i);
    }
    let sig: Scalar = if comm.global_sum(trace) < 0.0 { -1.0 } else { 1.0 };

    // ---- 右端与对角：Su (+ rhs·V)，随后折叠边界 ----
    let mut b: Vec<T> = Vec::with_capacity(n);
    for i in 0..n {
        let mut v = m.su[i];
        if let Some(r) = rhs {
            v += r[i] * mesh.c_v[i];
        }
        b.push(v * sig);
    }
    let mut diag: Vec<Scalar> = (0..n).map(|i| sig * m.diag(i)).collect();

    // 未知场的边界条件按面展开
    let n_boundary = mesh.n_boundary_faces();
    let mut face_bc: Vec<Option<&crate::boundary::BCondition<T>>> = vec![None; n_boundary];
    if let Some(name) = x.name.as_deref() {
        for bc in bcs.of::<T>(name) {
            for &f in &bc.indices {
                face_bc[f - mesh.n_interior_faces()] = Some(bc);
            }
        }
    }

    for f in mesh.n_interior_faces()..mesh.n_faces() {
        if mesh
            .patch_of(f)
            .map(|p| p.is_processor())
            .unwrap_or(false)
        {
            continue; // 进程间幽灵参与 SpMV
        }
        let o = mesh.owner(f);
        let a = sig * m.an[0][f];
        let ghost = mesh.ghost_of(f);
        let d = (mesh.c_c[ghost] - mesh.c_c[o]).length();

        match face_bc[f - mesh.n_interior_faces()].map(|bc| (bc.kind, bc)) {
            Some((BcKind::Dirichlet, bc)) => {
                b[o] += bc.value * a;
            }
            Some((BcKind::Neumann, bc)) => {
                diag[o] -= a;
                b[o] += bc.slope * (a * d);
            }
            Some((BcKind::Robin, bc)) => {
                let s = bc.shape;
                diag[o] -= a * (1.0 - s);
                b[o] += bc.value * (a * s) + bc.slope * (a * (1.0 - s) * d);
            }
            Some((BcKind::Symmetry, _)) => {
                // 零梯度折叠 + 反射余量（ghost − x_o）以当前值显式处理
                diag[o] -= a;
                b[o] += (x[ghost] - x[o]) * a;
            }
            Some((BcKind::CalcK | BcKind::CalcX, _)) => {
                diag[o] -= a;
            }
            Some((BcKind::Cyclic, _)) | None => {
                // 远端 owner / 未登记：幽灵当前值显式入右端
                b[o] += x[ghost] * a;
            }
        }
    }

    // ---- 预条件器 ----
    let precond = Precond::build(
        controls.preconditioner,
        mesh,
        diag.clone(),
        [&m.an[0], &m.an[1]],
        sig,
        controls.sor_omega,
    );

    // ---- SpMV（含进程间 halo）----
    let mut x_ext: Vec<T> = vec![T::ZERO; mesh.n_cells()];
    for f in mesh.n_interior_faces()..mesh.n_faces() {
        if mesh
            .patch_of(f)
            .map(|p| p.is_processor())
            .unwrap_or(false)
        {
            x_ext[mesh.ghost_of(f)] = x[mesh.ghost_of(f)];
        }
    }
    let blocked = controls.parallel_method == ParallelMethod::Blocked;
    let multi = comm.n_hosts() > 1;
    let n_interior_faces = mesh.n_interior_faces();
    let mut spmv = |v: &[T], y: &mut [T]| {
        x_ext[..n].copy_from_slice(v);
        if multi && blocked {
            exchange_processor_halos(mesh, comm, &mut x_ext);
        }
        for i in 0..n {
            y[i] = x_ext[i] * diag[i];
        }
        for f in 0..n_interior_faces {
            let o = mesh.owner(f);
            let nb = mesh.neighbor(f);
            y[o] -= x_ext[nb] * (sig * m.an[0][f]);
            y[nb] -= x_ext[o] * (sig * m.an[1][f]);
        }
        if multi {
            for f in n_interior_faces..mesh.n_faces() {
                if mesh
                    .patch_of(f)
                    .map(|p| p.is_processor())
                    .unwrap_or(false)
                {
                    let o = mesh.owner(f);
                    y[o] -= x_ext[mesh.ghost_of(f)] * (sig * m.an[0][f]);
                }
            }
            if !blocked {
                // 异步模式：本次用旧幽灵值，之后刷新供下次迭代
                exchange_processor_halos(mesh, comm, &mut x_ext);
            }
        }
    };

    let dot = |a: &[T], bb: &[T]| comm.global_sum(vector_ops::dot_local(a, bb));

    // ---- 方法选择 ----
    let use_pcg = m.symmetric && controls.method == Method::Pcg;
    let mut xi: Vec<T> = x.as_slice()[..n].to_vec();
    let result = if use_pcg {
        krylov::pcg(
            &b,
            &mut xi,
            &mut spmv,
            |r, z| precond.apply(r, z),
            dot,
            controls.tolerance,
            controls.max_iterations,
        )
    } else {
        krylov::bicgstab(
            &b,
            &mut xi,
            &mut spmv,
            |r, z| precond.apply(r, z),
            dot,
            controls.tolerance,
            controls.max_iterations,
        )
    };

    for i in 0..n {
        x[i] = xi[i];
    }

    match result.status {
        SolverStatus::Converged => {
            log::debug!(
                "{} 收敛: {} 次迭代, ‖r‖/‖b‖ = {:.3e}",
                if use_pcg { "PCG" } else { "BiCGStab" },
                result.iterations,
                result.relative_residual
            );
        }
        _ => {
            // 不收敛只告警：下一外层迭代可能恢复
            log::warn!(
                "{} 未收敛 ({:?}): {} 次迭代, ‖r‖/‖b‖ = {:.3e}",
                if use_pcg { "PCG" } else { "BiCGStab" },
                result.status,
                result.iterations,
                result.relative_residual
            );
        }
    }
    result
}

/// 交换扩展向量的进程间幽灵值
fn exchange_processor_halos<T: FieldValue>(mesh: &Mesh, comm: &dyn Comm, x_ext: &mut [T]) {
    for patch in mesh.patches() {
        let Some(peer) = patch.neighbor_rank else {
            continue;
        };
        let len = patch.count * T::N_COMP;
        let mut send = vec![0.0 as Scalar; len];
        let mut recv = vec![0.0 as Scalar; len];
        for (k, f) in patch.faces().enumerate() {
            let v = x_ext[mesh.owner(f)];
            for c in 0..T::N_COMP {
                send[k * T::N_COMP + c] = v.comp(c);
            }
        }
        comm.exchange(peer, &send, &mut recv);
        for (k, f) in patch.faces().enumerate() {
            let mut v = T::ZERO;
            for c in 0..T::N_COMP {
                v.set_comp(c, recv[k * T::N_COMP + c]);
            }
            x_ext[mesh.ghost_of(f)] = v;
        }
    }
}
