// crates/fv_solver/src/ops/diffusion.rs

//! 扩散算子（Laplacian）
//!
//! `lap(φ, μ)` 装配 `∇·(μ∇φ)`。面 f 的正交隐式系数为
//! `D_f = μ_f·|A_f|² / (A_f·d_f)`，`d_f = nC − oC`；
//! 网格歪斜时按 `nonortho_scheme` 把 `A − Δ` 方向的余量以
//! 当前场梯度显式并入 Su（延迟修正）：
//!
//! - MINIMUM:      Δ = d·(A·d)/|d|²
//! - ORTHOGONAL:   Δ = d·|A|/|d|
//! - OVER_RELAXED: Δ = d·|A|²/(A·d)（默认；正交网格上 Δ = A，修正消失）
//! - NONE:         Δ = A（不修正，歪斜网格上精度下降）
//!
//! 纯扩散矩阵对称（常数 μ、正交网格下与转置相等）。

use fv_core::{FieldValue, Scalar, Vector};
use fv_config::NonOrthoScheme;
use fv_mesh::Mesh;

use super::convection::component_grads;
use crate::field::Field;
use crate::matrix::MeshMatrix;

/// 面 f 的正交扩散系数 `μ|A|²/(A·d)`
#[inline]
pub fn diffusion_coeff(mesh: &Mesh, mu: Option<&Field<Scalar>>, f: usize) -> Scalar {
    let Some(mu) = mu else {
        return 0.0;
    };
    let a = mesh.f_n[f];
    let d = mesh.face_delta(f);
    mu[f] * a.length_squared() / a.dot(d)
}

/// 非正交分解 Δ
#[inline]
pub fn nonortho_delta(scheme: NonOrthoScheme, a: Vector, d: Vector) -> Vector {
    match scheme {
        NonOrthoScheme::None => a,
        NonOrthoScheme::Minimum => d * (a.dot(d) / d.length_squared()),
        NonOrthoScheme::Orthogonal => d * (a.length() / d.length()),
        NonOrthoScheme::OverRelaxed => d * (a.length_squared() / a.dot(d)),
    }
}

/// Laplacian 矩阵 `lap(φ, μ)`
///
/// `mu` 为面扩散系数场；`phi` 提供非正交延迟修正所需的当前值。
pub fn lap<'m, T: FieldValue>(
    mesh: &'m Mesh,
    phi: &Field<T>,
    mu: &Field<Scalar>,
    nonortho: NonOrthoScheme,
) -> MeshMatrix<'m, T> {
    let mut m = MeshMatrix::new(mesh);
    let n = mesh.ghost_cells_start();

    let grads = if nonortho != NonOrthoScheme::None {
        component_grads(mesh, phi)
    } else {
        Vec::new()
    };

    for f in 0..mesh.n_faces() {
        let o = mesh.owner(f);
        let nb = mesh.neighbor(f);
        let interior = nb < n;
        let dcoef = diffusion_coeff(mesh, Some(mu), f);

        // lap 行值 = Σ D(φ_n − φ_o)：an = −D，对角 −D
        m.an[0][f] = -dcoef;
        m.ap[o] -= dcoef;
        if interior {
            m.an[1][f] = -dcoef;
            m.ap[nb] -= dcoef;
        }

        // 显式非正交修正（lap 部分 ⇒ owner 行 −corr）
        if nonortho != NonOrthoScheme::None && interior {
            let a = mesh.f_n[f];
            let delta = nonortho_delta(nonortho, a, mesh.face_delta(f));
            let rem = a - delta;
            let w = mesh.f_i[f];
            let mut corr = T::ZERO;
            for k in 0..T::N_COMP {
                let gf = grads[k][o] * w + grads[k][nb] * (1.0 - w);
                corr.set_comp(k, mu[f] * rem.dot(gf));
            }
            m.su[o] -= corr;
            m.su[nb] += corr;
        }
    }

    m
}
