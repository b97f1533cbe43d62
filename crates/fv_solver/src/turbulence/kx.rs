// crates/fv_solver/src/turbulence/kx.rs

//! 双方程 k-x 族：KE / RNG_KE / REALIZABLE_KE / KW
//!
//! x 在 k-ε 族中是 ε，在 k-ω 中是 ω。两条输运方程共用
//! 一套装配（对流 + 扩散 + 生成/耗散源项），变体只改系数
//! 与壁面函数：
//!
//! - KE:  `μt = ρ·Cμ·k²/ε`，壁面 `ε = u*³/(κ·y)`
//! - RNG / REALIZABLE: 不同系数与生成限制器
//! - KW:  `μt = ρ·k/ω`，壁面 `ω = u*/(√Cμ·κ·y)`
//!
//! 壁面处理：`u* = Cμ^{1/4}·√k`，近壁单元的 x 以 Dirichlet
//! 固定（fix_cell），k 在壁面取零梯度。

use std::collections::HashMap;

use fv_config::{Schema, TimeScheme, TurbulenceKind, TypeTag, Value};
use fv_core::{Scalar, Vector};
use fv_mesh::Mesh;

use super::{strain_rate_mag, TurbulenceModel, KAPPA};
use crate::boundary::BcKind;
use crate::field::{Access, Field};
use crate::ops::{self, TimeHistory};
use crate::world::World;
use crate::SolverError;

/// 防除零下限
const SMALL: Scalar = 1e-10;

/// 变体系数
#[derive(Debug, Clone, Copy)]
pub struct KxCoeffs {
    /// Cμ（KW 中为 β*）
    pub cmu: Scalar,
    /// k 方程湍流 Prandtl 数
    pub sigma_k: Scalar,
    /// x 方程湍流 Prandtl 数
    pub sigma_x: Scalar,
    /// 生成系数（KE: C1；KW: α）
    pub c1: Scalar,
    /// 耗散系数（KE: C2；KW: β）
    pub c2: Scalar,
}

impl KxCoeffs {
    /// 变体默认系数
    pub fn of(kind: TurbulenceKind) -> Self {
        match kind {
            TurbulenceKind::RngKe => Self {
                cmu: 0.0845,
                sigma_k: 0.7194,
                sigma_x: 0.7194,
                c1: 1.42,
                c2: 1.68,
            },
            TurbulenceKind::RealizableKe => Self {
                cmu: 0.09,
                sigma_k: 1.0,
                sigma_x: 1.2,
                c1: 1.44,
                c2: 1.9,
            },
            TurbulenceKind::Kw => Self {
                cmu: 0.09,
                sigma_k: 2.0,
                sigma_x: 2.0,
                c1: 5.0 / 9.0,
                c2: 3.0 / 40.0,
            },
            _ => Self {
                cmu: 0.09,
                sigma_k: 1.0,
                sigma_x: 1.3,
                c1: 1.44,
                c2: 1.92,
            },
        }
    }
}

/// k-x 双方程模型
pub struct KxModel {
    kind: TurbulenceKind,
    rho: Scalar,
    viscosity: Scalar,
    steady: bool,
    coeffs: KxCoeffs,
    k_ur: Scalar,
    x_ur: Scalar,
    k: Field<Scalar>,
    x: Field<Scalar>,
    eddy_mu: Field<Scalar>,
    k_hist: Option<TimeHistory<Scalar>>,
    x_hist: Option<TimeHistory<Scalar>>,
}

impl KxModel {
    /// 创建模型（场初值为弱湍流水平）
    pub fn new(
        kind: TurbulenceKind,
        mesh: &Mesh,
        rho: Scalar,
        viscosity: Scalar,
        steady: bool,
    ) -> Self {
        let mut k = Field::named("k", Access::ReadWrite, mesh);
        let mut x = Field::named("x", Access::ReadWrite, mesh);
        k.fill(1e-4);
        x.fill(1e-3);
        Self {
            kind,
            rho,
            viscosity,
            steady,
            coeffs: KxCoeffs::of(kind),
            k_ur: 0.7,
            x_ur: 0.7,
            k,
            x,
            eddy_mu: Field::cells(mesh, 0.0),
            k_hist: None,
            x_hist: None,
        }
    }

    /// 壁面摩擦速度 `u* = Cμ^{1/4}·√k`
    #[inline]
    pub fn u_star(&self, k: Scalar) -> Scalar {
        self.coeffs.cmu.powf(0.25) * k.max(0.0).sqrt()
    }

    /// 壁面函数给出的近壁 x
    #[inline]
    pub fn calc_x(&self, ustar: Scalar, y: Scalar) -> Scalar {
        match self.kind {
            // ω = u*/(√Cμ·κ·y)
            TurbulenceKind::Kw => ustar / (self.coeffs.cmu.sqrt() * KAPPA * y.max(SMALL)),
            // ε = u*³/(κ·y)
            _ => ustar.powi(3) / (KAPPA * y.max(SMALL)),
        }
    }

    /// 缺省边界条件：WALL 片用壁面函数，其余零梯度
    ///
    /// k 的入流值规约上应由场文件给定（Dirichlet）；此处
    /// 回退零梯度并告警。
    fn default_bcs(&self, world: &mut World) {
        use crate::boundary::BcSpec;
        let mut k_specs = Vec::new();
        let mut x_specs = Vec::new();
        for patch in world.mesh.patches() {
            if patch.is_processor() {
                continue;
            }
            let wall = patch.name.to_ascii_uppercase().contains("WALL");
            let (kk, kx) = if wall {
                (BcKind::CalcK, BcKind::CalcX)
            } else {
                (BcKind::Neumann, BcKind::Neumann)
            };
            k_specs.push(BcSpec {
                patch: patch.name.clone(),
                kind: kk,
                value: 0.0,
                slope: 0.0,
                shape: 0.0,
            });
            x_specs.push(BcSpec {
                patch: patch.name.clone(),
                kind: kx,
                value: 0.0,
                slope: 0.0,
                shape: 0.0,
            });
        }
        world.bcs.enroll_field::<Scalar>("k", k_specs, &world.mesh);
        world.bcs.enroll_field::<Scalar>("x", x_specs, &world.mesh);
    }

    /// 单方程装配与求解
    #[allow(clippy::too_many_arguments)]
    fn solve_transport(
        world: &World,
        phi: &mut Field<Scalar>,
        hist: Option<&TimeHistory<Scalar>>,
        flux: &Field<Scalar>,
        mu_face: &Field<Scalar>,
        su_vol: &[Scalar],
        sp_vol: &[Scalar],
        wall_fix: &[(usize, Scalar)],
        steady: bool,
        rho: Scalar,
        ur: Scalar,
    ) -> Result<(), SolverError> {
        let mesh = &world.mesh;
        let mut m = ops::div_matrix(mesh, phi, flux, Some(mu_face), &world.controls);

        for i in 0..m.n_rows() {
            let v = mesh.c_v[i];
            m.su[i] += su_vol[i] * v;
            m.sp[i] += sp_vol[i] * v;
        }

        if steady {
            m.relax(ur, phi);
        } else if let Some(h) = hist {
            m += ops::ddt(mesh, h, rho, world.controls.dt, world.controls.time_scheme);
        }

        for &(cell, value) in wall_fix {
            m.fix_cell(cell, value);
        }

        world.solve(&m, phi);

        // 下限裁剪保持实现性
        for i in 0..mesh.ghost_cells_start() {
            if !(phi[i] > SMALL) {
                phi[i] = SMALL;
            }
        }
        Ok(())
    }
}

impl TurbulenceModel for KxModel {
    fn kind(&self) -> TurbulenceKind {
        self.kind
    }

    fn enroll(&self, schema: &mut Schema) {
        schema
            .enroll("Cmu", TypeTag::Scalar)
            .enroll("SigmaK", TypeTag::Scalar)
            .enroll("SigmaX", TypeTag::Scalar)
            .enroll("C1x", TypeTag::Scalar)
            .enroll("C2x", TypeTag::Scalar);
    }

    fn configure(&mut self, piso: &HashMap<String, Value>, turb: &HashMap<String, Value>) {
        let gets = |m: &HashMap<String, Value>, key: &str, d: Scalar| {
            m.get(key).and_then(Value::as_scalar).unwrap_or(d)
        };
        self.coeffs.cmu = gets(piso, "cmu", self.coeffs.cmu);
        self.coeffs.sigma_k = gets(piso, "sigmak", self.coeffs.sigma_k);
        self.coeffs.sigma_x = gets(piso, "sigmax", self.coeffs.sigma_x);
        self.coeffs.c1 = gets(piso, "c1x", self.coeffs.c1);
        self.coeffs.c2 = gets(piso, "c2x", self.coeffs.c2);
        self.k_ur = gets(turb, "k_ur", self.k_ur);
        self.x_ur = gets(turb, "x_ur", self.x_ur);
    }

    fn read_fields(&mut self, world: &mut World, step: usize) -> Result<(), SolverError> {
        match world.read_field(&mut self.k, step) {
            Ok(()) => {}
            Err(SolverError::FieldFileMissing(path)) => {
                log::warn!(
                    "k 场文件缺失 ({})，以均匀初值启动；入流 k 应由场文件以 DIRICHLET 给定",
                    path.display()
                );
                self.default_bcs(world);
                world.update_bcs(&mut self.k, false);
                world.update_bcs(&mut self.x, false);
                self.init_history();
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        world.read_field(&mut self.x, step)?;
        world.update_bcs(&mut self.k, false);
        world.update_bcs(&mut self.x, false);
        self.init_history();
        Ok(())
    }

    fn write_fields(&self, world: &World, step: usize) -> Result<(), SolverError> {
        world.write_field(&self.k, step)?;
        world.write_field(&self.x, step)
    }

    fn calc_eddy_mu(&mut self, world: &World, _u: &Field<Vector>) {
        let n = world.mesh.n_cells();
        for c in 0..n {
            let k = self.k[c].max(SMALL);
            let x = self.x[c].max(SMALL);
            self.eddy_mu[c] = match self.kind {
                TurbulenceKind::Kw => self.rho * k / x,
                _ => self.rho * self.coeffs.cmu * k * k / x,
            };
        }
    }

    fn eddy_mu(&self) -> Option<&Field<Scalar>> {
        Some(&self.eddy_mu)
    }

    fn turbulent_ke(&self) -> Option<&Field<Scalar>> {
        Some(&self.k)
    }

    fn solve(
        &mut self,
        world: &World,
        u: &Field<Vector>,
        flux: &Field<Scalar>,
    ) -> Result<(), SolverError> {
        let mesh = &world.mesh;
        let n = mesh.ghost_cells_start();
        let mu_mol = self.rho * self.viscosity;

        // 生成项 G = μt·(∇U + ∇Uᵀ):∇U
        let g_u = ops::grad_vec(mesh, u);
        let mut production = vec![0.0; n];
        let mut s_mag = vec![0.0; n];
        for c in 0..n {
            let g = g_u[c];
            production[c] = self.eddy_mu[c] * (g + g.trn()).double_dot(&g);
            s_mag[c] = strain_rate_mag(&g);
        }

        // 壁面函数：近壁单元的 x 固定
        let mut wall_fix = Vec::new();
        for bc in world.bcs.of::<Scalar>("x") {
            if bc.kind != BcKind::CalcX {
                continue;
            }
            for &f in &bc.indices {
                let c = mesh.owner(f);
                let y = (mesh.c_c[c] - mesh.f_c[f]).length();
                let ustar = self.u_star(self.k[c]);
                wall_fix.push((c, self.calc_x(ustar, y)));
            }
        }

        // ---- k 方程 ----
        let mut mu_k = Field::<Scalar>::faces(mesh, 0.0);
        for f in 0..mesh.n_faces() {
            mu_k[f] = mu_mol + ops::face_value(mesh, &self.eddy_mu, f).max(0.0) / self.coeffs.sigma_k;
        }
        let mut su_k = vec![0.0; n];
        let mut sp_k = vec![0.0; n];
        for c in 0..n {
            su_k[c] = production[c];
            // 耗散 ρε（KW: β*·ρ·k·ω）按 k 线性化入对角
            sp_k[c] = match self.kind {
                TurbulenceKind::Kw => self.coeffs.cmu * self.rho * self.x[c],
                _ => self.rho * self.x[c] / self.k[c].max(SMALL),
            };
        }
        Self::solve_transport(
            world,
            &mut self.k,
            self.k_hist.as_ref(),
            flux,
            &mu_k,
            &su_k,
            &sp_k,
            &[],
            self.steady,
            self.rho,
            self.k_ur,
        )?;
        world.update_bcs(&mut self.k, false);

        // ---- x 方程 ----
        let mut mu_x = Field::<Scalar>::faces(mesh, 0.0);
        for f in 0..mesh.n_faces() {
            mu_x[f] = mu_mol + ops::face_value(mesh, &self.eddy_mu, f).max(0.0) / self.coeffs.sigma_x;
        }
        let mut su_x = vec![0.0; n];
        let mut sp_x = vec![0.0; n];
        for c in 0..n {
            let k = self.k[c].max(SMALL);
            let x = self.x[c].max(SMALL);
            match self.kind {
                TurbulenceKind::Kw => {
                    // 生成 α·(ω/k)·G，耗散 β·ρ·ω²
                    su_x[c] = self.coeffs.c1 * x / k * production[c];
                    sp_x[c] = self.coeffs.c2 * self.rho * x;
                }
                TurbulenceKind::RngKe => {
                    // RNG 附加项并入有效 C2
                    let eta = s_mag[c] * k / x;
                    let eta0 = 4.38;
                    let beta = 0.012;
                    let c2_eff = self.coeffs.c2
                        + self.coeffs.cmu * eta.powi(3) * (1.0 - eta / eta0)
                            / (1.0 + beta * eta.powi(3));
                    su_x[c] = self.coeffs.c1 * production[c] * x / k;
                    sp_x[c] = c2_eff * self.rho * x / k;
                }
                TurbulenceKind::RealizableKe => {
                    // 生成限制器 C1 = max(0.43, η/(η+5))，生成项用 |S|
                    let eta = s_mag[c] * k / x;
                    let c1_eff = (eta / (eta + 5.0)).max(0.43);
                    su_x[c] = c1_eff * self.rho * s_mag[c] * x;
                    sp_x[c] = self.coeffs.c2 * self.rho * x / (k + (self.viscosity * x).sqrt());
                }
                _ => {
                    su_x[c] = self.coeffs.c1 * production[c] * x / k;
                    sp_x[c] = self.coeffs.c2 * self.rho * x / k;
                }
            }
        }
        Self::solve_transport(
            world,
            &mut self.x,
            self.x_hist.as_ref(),
            flux,
            &mu_x,
            &su_x,
            &sp_x,
            &wall_fix,
            self.steady,
            self.rho,
            self.x_ur,
        )?;
        world.update_bcs(&mut self.x, false);

        // 步末：轮转历史并更新涡粘
        if !self.steady {
            if let Some(h) = self.k_hist.as_mut() {
                h.push(&self.k);
            }
            if let Some(h) = self.x_hist.as_mut() {
                h.push(&self.x);
            }
        }
        self.calc_eddy_mu(world, u);
        Ok(())
    }
}

impl KxModel {
    fn init_history(&mut self) {
        if !self.steady {
            self.k_hist = Some(TimeHistory::new(TimeScheme::Euler, &self.k));
            self.x_hist = Some(TimeHistory::new(TimeScheme::Euler, &self.x));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::generation::{structured_box, DEFAULT_PATCH_NAMES};

    fn mesh() -> Mesh {
        structured_box(
            2,
            2,
            1,
            Vector::ZERO,
            Vector::splat(1.0),
            &DEFAULT_PATCH_NAMES,
        )
        .unwrap()
    }

    #[test]
    fn test_variant_coefficients() {
        let ke = KxCoeffs::of(TurbulenceKind::Ke);
        assert!((ke.cmu - 0.09).abs() < 1e-12);
        assert!((ke.c1 - 1.44).abs() < 1e-12);
        assert!((ke.c2 - 1.92).abs() < 1e-12);

        let rng = KxCoeffs::of(TurbulenceKind::RngKe);
        assert!((rng.cmu - 0.0845).abs() < 1e-12);

        let kw = KxCoeffs::of(TurbulenceKind::Kw);
        assert!((kw.c1 - 5.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_wall_function_relation() {
        // ε = u*³/(κ·y)，u* = Cμ^{1/4}·√k
        let m = mesh();
        let model = KxModel::new(TurbulenceKind::Ke, &m, 1.0, 1e-5, true);
        let k: Scalar = 0.04;
        let y = 0.01;
        let ustar = model.u_star(k);
        assert!((ustar - 0.09_f64.powf(0.25) * 0.2).abs() < 1e-12);
        let eps = model.calc_x(ustar, y);
        assert!((eps - ustar.powi(3) / (KAPPA * y)).abs() < 1e-10);
        // 相对误差 1% 以内（规约验收口径）
        let expect = ustar.powi(3) / (KAPPA * y);
        assert!((eps - expect).abs() / expect < 0.01);
    }

    #[test]
    fn test_kw_wall_function() {
        let m = mesh();
        let model = KxModel::new(TurbulenceKind::Kw, &m, 1.0, 1e-5, true);
        let ustar = 0.1;
        let y = 0.02;
        let omega = model.calc_x(ustar, y);
        assert!((omega - ustar / (0.09_f64.sqrt() * KAPPA * y)).abs() < 1e-10);
    }

    #[test]
    fn test_eddy_mu_formulas() {
        let m = mesh();
        use crate::comm::SerialComm;
        let world = World::new(
            m,
            fv_config::Controls::default(),
            Box::new(SerialComm),
            std::env::temp_dir(),
        );

        let mut ke = KxModel::new(TurbulenceKind::Ke, &world.mesh, 2.0, 1e-5, true);
        ke.k.fill(0.01);
        ke.x.fill(0.1);
        let u = Field::cells(&world.mesh, Vector::ZERO);
        ke.calc_eddy_mu(&world, &u);
        // ρCμk²/ε = 2*0.09*1e-4/0.1
        assert!((ke.eddy_mu[0] - 2.0 * 0.09 * 1e-4 / 0.1).abs() < 1e-12);

        let mut kw = KxModel::new(TurbulenceKind::Kw, &world.mesh, 2.0, 1e-5, true);
        kw.k.fill(0.01);
        kw.x.fill(0.5);
        kw.calc_eddy_mu(&world, &u);
        // ρk/ω = 2*0.01/0.5
        assert!((kw.eddy_mu[0] - 0.04).abs() < 1e-12);
    }
}
