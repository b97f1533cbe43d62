// crates/fv_solver/src/ops/convection.rs

//! 对流算子（矩阵形式）
//!
//! `div(φ, F, μ)`：面通量 F 的对流 + 可选扩散系数 μ，
//! 即 `∇·(Fφ) − ∇·(μ∇φ)` 的装配。格式由
//! `convection_scheme` 选择：
//!
//! - UDS: 迎风，单调一阶
//! - CDS: 中心隐式，二阶但可能振荡
//! - BLENDED: 以 blend_factor 为 CDS 权重的线性组合
//! - TVD 族 (MINMOD / SUPERBEE / VANLEER / MUSCL): 隐式按 UDS，
//!   限制器修正显式进 Su（延迟修正）
//!
//! 边界面一律迎风处理，幽灵值的贡献在求解时并入右端。

use fv_core::{FieldValue, Scalar, Vector};
use fv_mesh::Mesh;
use fv_config::{Controls, ConvectionScheme};

use super::diffusion::{diffusion_coeff, nonortho_delta};
use super::gradient::{fill_boundary_values, grad};
use crate::field::Field;
use crate::matrix::MeshMatrix;

/// 对流-扩散矩阵
///
/// `flux` 为面通量场（[`super::flx`] 的结果），`mu` 为可选的
/// 面扩散系数场。TVD 与非正交修正需要当前场值 `phi`（延迟
/// 修正取自上一外层迭代）。
pub fn div_matrix<'m, T: FieldValue>(
    mesh: &'m Mesh,
    phi: &Field<T>,
    flux: &Field<Scalar>,
    mu: Option<&Field<Scalar>>,
    controls: &Controls,
) -> MeshMatrix<'m, T> {
    let mut m = MeshMatrix::new(mesh);
    m.symmetric = false;

    let scheme = controls.convection_scheme;
    let n = mesh.ghost_cells_start();

    // TVD 与非正交修正需要逐分量单元梯度
    let need_grads = scheme.is_tvd()
        || (mu.is_some() && controls.nonortho_scheme != fv_config::NonOrthoScheme::None);
    let grads = if need_grads {
        component_grads(mesh, phi)
    } else {
        Vec::new()
    };

    for f in 0..mesh.n_faces() {
        let o = mesh.owner(f);
        let nb = mesh.neighbor(f);
        let interior = nb < n;
        let ff = flux[f];
        let d = diffusion_coeff(mesh, mu, f);

        // 隐式系数
        let (an0, an1) = match scheme {
            ConvectionScheme::Cds if interior => {
                let w = mesh.f_i[f];
                (d - ff * (1.0 - w), d + ff * w)
            }
            ConvectionScheme::Blended if interior => {
                let g = controls.blend_factor;
                let w = mesh.f_i[f];
                let (c0, c1) = (d - ff * (1.0 - w), d + ff * w);
                let (u0, u1) = (d + (-ff).max(0.0), d + ff.max(0.0));
                (g * c0 + (1.0 - g) * u0, g * c1 + (1.0 - g) * u1)
            }
            // UDS 与 TVD 族的隐式核心；边界面也按迎风
            _ => (d + (-ff).max(0.0), d + ff.max(0.0)),
        };

        m.an[0][f] = an0;
        m.ap[o] += an0 + ff;
        if interior {
            m.an[1][f] = an1;
            m.ap[nb] += an1 - ff;
        }

        // TVD 限制器修正（仅内部面；延迟修正进 Su）
        if scheme.is_tvd() && interior {
            let (c, dn) = if ff >= 0.0 { (o, nb) } else { (nb, o) };
            let d_cd = mesh.c_c[dn] - mesh.c_c[c];
            let mut corr = T::ZERO;
            for k in 0..T::N_COMP {
                let dphi = phi[dn].comp(k) - phi[c].comp(k);
                if dphi.abs() < 1e-300 {
                    continue;
                }
                let r = 2.0 * grads[k][c].dot(d_cd) / dphi - 1.0;
                let psi = limiter(scheme, r);
                corr.set_comp(k, 0.5 * psi * dphi);
            }
            let corr = corr * ff;
            m.su[o] -= corr;
            m.su[nb] += corr;
        }

        // 扩散的非正交修正（−lap 部分 ⇒ owner 行 +corr）
        if let Some(mu) = mu {
            if controls.nonortho_scheme != fv_config::NonOrthoScheme::None && interior {
                let a = mesh.f_n[f];
                let delta = nonortho_delta(controls.nonortho_scheme, a, mesh.face_delta(f));
                let rem = a - delta;
                let w = mesh.f_i[f];
                let mut corr = T::ZERO;
                for k in 0..T::N_COMP {
                    let gf = grads[k][o] * w + grads[k][nb] * (1.0 - w);
                    corr.set_comp(k, mu[f] * rem.dot(gf));
                }
                m.su[o] += corr;
                m.su[nb] -= corr;
            }
        }
    }

    m
}

/// 逐分量 Green-Gauss 单元梯度
pub fn component_grads<T: FieldValue>(mesh: &Mesh, phi: &Field<T>) -> Vec<Field<Vector>> {
    (0..T::N_COMP)
        .map(|k| {
            let mut comp = Field::<Scalar>::cells(mesh, 0.0);
            for c in 0..mesh.n_cells() {
                comp[c] = phi[c].comp(k);
            }
            let mut g = grad(mesh, &comp);
            fill_boundary_values(mesh, &mut g);
            g
        })
        .collect()
}

/// TVD 限制器 ψ(r)
fn limiter(scheme: ConvectionScheme, r: Scalar) -> Scalar {
    match scheme {
        ConvectionScheme::Minmod => r.min(1.0).max(0.0),
        ConvectionScheme::Superbee => (2.0 * r).min(1.0).max(r.min(2.0)).max(0.0),
        ConvectionScheme::Vanleer => (r + r.abs()) / (1.0 + r.abs()),
        ConvectionScheme::Muscl => (2.0 * r).min((r + 1.0) * 0.5).min(2.0).max(0.0),
        _ => 0.0,
    }
}
