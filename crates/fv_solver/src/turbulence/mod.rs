// crates/fv_solver/src/turbulence/mod.rs

//! 湍流闭合
//!
//! 多态模型，能力集为 {enroll, solve, add_turbulent_stress,
//! calc_eddy_mu}：
//!
//! - NONE: 涡粘为零（分子粘性已在动量对流矩阵内）
//! - MIXING_LENGTH: 代数模型，需要壁面距离
//! - KE / RNG_KE / REALIZABLE_KE: k-ε 双方程族
//! - KW: k-ω（x 即 ω），壁面处理不同
//! - LES: Smagorinsky 亚格子模型，需要壁面距离
//!
//! 动量矩阵 `M = div(U, F, ρν)` 已含分子粘性；模型追加
//! `−lap(U, μt)` 的隐式部分与 `∇·(μt ∇Uᵀ) − ∇(2/3 ρk)`
//! 的显式部分。

pub mod algebraic;
pub mod kx;

use std::collections::HashMap;

use fv_config::{Schema, TurbulenceKind, Value};
use fv_core::{Scalar, Vector};
use fv_mesh::Mesh;

use crate::field::Field;
use crate::matrix::MeshMatrix;
use crate::ops;
use crate::world::World;
use crate::SolverError;

/// von Kármán 常数
pub const KAPPA: Scalar = 0.41;

/// 湍流闭合模型
///
/// 模型拥有自己的场（k、x、涡粘）；构造由
/// `turbulence_model` 枚举经 [`create_model`] 驱动。
pub trait TurbulenceModel {
    /// 模型种类
    fn kind(&self) -> TurbulenceKind;

    /// 是否需要壁面距离场
    fn needs_wall_dist(&self) -> bool {
        false
    }

    /// 向 piso 块登记本模型的常数键
    fn enroll(&self, schema: &mut Schema) {
        let _ = schema;
    }

    /// 由 piso 块与 turbulence 块的值配置
    fn configure(&mut self, piso: &HashMap<String, Value>, turb: &HashMap<String, Value>) {
        let _ = (piso, turb);
    }

    /// 读入模型场（k、x），登记其边界条件
    fn read_fields(&mut self, world: &mut World, step: usize) -> Result<(), SolverError> {
        let _ = (world, step);
        Ok(())
    }

    /// 写出模型场
    fn write_fields(&self, world: &World, step: usize) -> Result<(), SolverError> {
        let _ = (world, step);
        Ok(())
    }

    /// 接收壁面距离场（需要的模型保存一份）
    fn set_wall_dist(&mut self, y_wall: &Field<Scalar>) {
        let _ = y_wall;
    }

    /// 更新涡粘
    fn calc_eddy_mu(&mut self, world: &World, u: &Field<Vector>);

    /// 涡粘单元场（NONE 为 None）
    fn eddy_mu(&self) -> Option<&Field<Scalar>>;

    /// 向动量矩阵追加湍流应力
    fn add_turbulent_stress<'m>(
        &self,
        mesh: &'m Mesh,
        world: &World,
        m: &mut MeshMatrix<'m, Vector>,
        u: &Field<Vector>,
    ) {
        let Some(mu_t) = self.eddy_mu() else {
            return;
        };
        add_eddy_stress(
            mesh,
            world,
            m,
            u,
            mu_t,
            self.turbulent_ke(),
            world.controls.general.rho,
        );
    }

    /// 湍动能场（双方程模型提供，供 −∇(2/3ρk) 项）
    fn turbulent_ke(&self) -> Option<&Field<Scalar>> {
        None
    }

    /// 求解模型自己的输运方程（代数模型为空操作）
    fn solve(
        &mut self,
        world: &World,
        u: &Field<Vector>,
        flux: &Field<Scalar>,
    ) -> Result<(), SolverError> {
        let _ = (world, u, flux);
        Ok(())
    }
}

/// 按枚举构造模型
pub fn create_model(
    kind: TurbulenceKind,
    mesh: &Mesh,
    rho: Scalar,
    viscosity: Scalar,
    steady: bool,
) -> Box<dyn TurbulenceModel> {
    match kind {
        TurbulenceKind::None => Box::new(algebraic::NoneModel),
        TurbulenceKind::MixingLength => {
            Box::new(algebraic::MixingLengthModel::new(mesh, rho, viscosity))
        }
        TurbulenceKind::Les => Box::new(algebraic::LesModel::new(mesh, rho)),
        TurbulenceKind::Ke
        | TurbulenceKind::RngKe
        | TurbulenceKind::RealizableKe
        | TurbulenceKind::Kw => Box::new(kx::KxModel::new(kind, mesh, rho, viscosity, steady)),
    }
}

/// 涡粘应力的共用装配
///
/// 隐式: `M −= lap(U, μt)`；显式: `Su += Σ_f μt_f (∇U)ᵀ·A_f`，
/// 双方程模型再加 `−∇(2/3 ρk)·V`。
pub fn add_eddy_stress<'m>(
    mesh: &'m Mesh,
    world: &World,
    m: &mut MeshMatrix<'m, Vector>,
    u: &Field<Vector>,
    mu_t: &Field<Scalar>,
    k: Option<&Field<Scalar>>,
    rho: Scalar,
) {
    // 面涡粘
    let mut mu_f = Field::<Scalar>::faces(mesh, 0.0);
    for f in 0..mesh.n_faces() {
        mu_f[f] = ops::face_value(mesh, mu_t, f).max(0.0);
    }

    // 隐式扩散
    *m -= ops::lap(mesh, u, &mu_f, world.controls.nonortho_scheme);

    // 显式转置梯度项
    let g = ops::grad_vec(mesh, u);
    let n = mesh.ghost_cells_start();
    for f in 0..mesh.n_faces() {
        let o = mesh.owner(f);
        let nb = mesh.neighbor(f);
        let w = mesh.f_i[f];
        let gf = if nb < n {
            g[o] * w + g[nb] * (1.0 - w)
        } else {
            g[o]
        };
        let t = gf.trn().dot(mesh.f_n[f]) * mu_f[f];
        m.su[o] += t;
        if nb < n {
            m.su[nb] -= t;
        }
    }

    // −∇(2/3 ρk) 的体积积分
    if let Some(k) = k {
        let gk = ops::grad(mesh, k);
        for i in 0..m.n_rows() {
            m.su[i] -= gk[i] * (mesh.c_v[i] * rho * 2.0 / 3.0);
        }
    }
}

/// 应变率模 `|S| = sqrt(2 S:S)`，S 为对称应变率张量
pub fn strain_rate_mag(g: &fv_core::Tensor) -> Scalar {
    let s = g.sym();
    (2.0 * s.double_dot(&s)).sqrt()
}
