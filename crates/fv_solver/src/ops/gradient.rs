// crates/fv_solver/src/ops/gradient.rs

//! Green-Gauss 梯度、散度与面通量
//!
//! 体积分经散度定理化为面积分：
//! `∇φ_c = (1/V_c) Σ_f φ_f·A_f`，面值取距离加权插值
//! `φ_f = fI·φ_o + (1−fI)·φ_n`。边界面 `fI = 0`，面值即
//! 幽灵单元值（边界条件值）。

use rayon::prelude::*;

use fv_core::{FieldValue, Scalar, Tensor, Vector};
use fv_mesh::Mesh;

use crate::field::Field;

/// 逐单元归一的并行阈值（小网格走串行，避免调度开销）
const PARALLEL_THRESHOLD: usize = 8192;

/// 逐单元除以体积（顺序无关，可并行）
fn normalize_by_volume<T: FieldValue>(field: &mut Field<T>, mesh: &Mesh, n: usize) {
    if n >= PARALLEL_THRESHOLD {
        let c_v = &mesh.c_v;
        field.as_mut_slice()[..n]
            .par_iter_mut()
            .enumerate()
            .for_each(|(c, v)| {
                *v = *v / c_v[c];
            });
    } else {
        for c in 0..n {
            field[c] = field[c] / mesh.c_v[c];
        }
    }
}

/// 面插值：`φ_f = fI·φ_o + (1−fI)·φ_n`
#[inline]
pub fn face_value<T: FieldValue>(mesh: &Mesh, phi: &Field<T>, f: usize) -> T {
    let w = mesh.f_i[f];
    phi[mesh.owner(f)] * w + phi[mesh.neighbor(f)] * (1.0 - w)
}

/// 标量场梯度（Green-Gauss）
///
/// 幽灵单元梯度取 owner 值（壁面距离等后处理直接可用）。
pub fn grad(mesh: &Mesh, phi: &Field<Scalar>) -> Field<Vector> {
    let n = mesh.ghost_cells_start();
    let mut g = Field::cells(mesh, Vector::ZERO);
    for f in 0..mesh.n_faces() {
        let pf = face_value(mesh, phi, f);
        let o = mesh.owner(f);
        let nb = mesh.neighbor(f);
        let contrib = mesh.f_n[f] * pf;
        g[o] += contrib;
        if nb < n {
            g[nb] -= contrib;
        }
    }
    normalize_by_volume(&mut g, mesh, n);
    fill_boundary_values(mesh, &mut g);
    g
}

/// 压力梯度变体
///
/// 与 [`grad`] 的装配相同；边界面取幽灵单元（边界条件）压力，
/// 供 `gP = −gradv(p)` 与速度显式修正使用。
pub fn gradv(mesh: &Mesh, phi: &Field<Scalar>) -> Field<Vector> {
    grad(mesh, phi)
}

/// 向量场梯度张量 `(∇U)_ij = ∂u_i/∂x_j`
pub fn grad_vec(mesh: &Mesh, u: &Field<Vector>) -> Field<Tensor> {
    let n = mesh.ghost_cells_start();
    let mut g = Field::cells(mesh, Tensor::ZERO);
    for f in 0..mesh.n_faces() {
        let uf = face_value(mesh, u, f);
        let o = mesh.owner(f);
        let nb = mesh.neighbor(f);
        let contrib = Tensor::outer(uf, mesh.f_n[f]);
        g[o] += contrib;
        if nb < n {
            g[nb] -= contrib;
        }
    }
    normalize_by_volume(&mut g, mesh, n);
    fill_boundary_values(mesh, &mut g);
    g
}

/// 向量场散度 `(∇·U)_c = (1/V_c) Σ_f U_f·A_f`
pub fn div(mesh: &Mesh, u: &Field<Vector>) -> Field<Scalar> {
    let n = mesh.ghost_cells_start();
    let mut d = Field::cells(mesh, 0.0);
    for f in 0..mesh.n_faces() {
        let uf = face_value(mesh, u, f);
        let o = mesh.owner(f);
        let nb = mesh.neighbor(f);
        let flux = uf.dot(mesh.f_n[f]);
        d[o] += flux;
        if nb < n {
            d[nb] -= flux;
        }
    }
    normalize_by_volume(&mut d, mesh, n);
    d
}

/// 质量通量面场 `ṁ_f = (ρU)_f·A_f`
pub fn flx(mesh: &Mesh, rho_u: &Field<Vector>) -> Field<Scalar> {
    let mut flux = Field::faces(mesh, 0.0);
    for f in 0..mesh.n_faces() {
        flux[f] = face_value(mesh, rho_u, f).dot(mesh.f_n[f]);
    }
    flux
}

/// 幽灵单元取 owner 值（梯度等导出场的边界延拓）
pub fn fill_boundary_values<T: FieldValue>(mesh: &Mesh, field: &mut Field<T>) {
    for f in mesh.n_interior_faces()..mesh.n_faces() {
        field[mesh.ghost_of(f)] = field[mesh.owner(f)];
    }
}
