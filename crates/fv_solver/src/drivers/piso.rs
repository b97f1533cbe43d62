// crates/fv_solver/src/drivers/piso.rs

//! PISO 压力-速度耦合（同位网格 Navier-Stokes）
//!
//! 分离式求解：动量预测 → 压力泊松修正 → 通量修正 →
//! 湍流输运，`n_DEFERRED + 1` 遍延迟修正外层循环。压力
//! 方程的系数经动量矩阵对角（`ρ/ap·V` 的面插值）进入，
//! 即 Rhie-Chow 式插值，避免同位网格的棋盘振荡。
//!
//! ```text
//! 预测:  M·U = −∇p·V            (隐式动量)
//! 修正:  Ua = H(U)/ap           (去掉压力梯度的速度)
//!        lap(p, ρ·V/ap) = div(ρ·Ua)
//!        U = Ua − ∇p·V/ap
//! ```
//!
//! 稳态时以 `velocity_UR` / `pressure_UR` 欠松弛，瞬态时按
//! 时间格式加 `ddt`（`implicit_factor ≠ 1` 为 Crank-Nicolson
//! 混合）。LES 统计按写出步的保存-报告-恢复方式累计，
//! 使重启能逐位复现已存统计。

use std::collections::HashMap;

use fv_config::{ControlsText, Schema, TurbulenceKind, TypeTag, Value};
use fv_core::{Scalar, Vector};

use super::{log_step, walldist, StepFields, StepObserver};
use crate::field::{Access, Field};
use crate::ops;
use crate::turbulence::{create_model, TurbulenceModel};
use crate::world::World;
use crate::SolverError;

/// `piso` 块参数
#[derive(Debug, Clone)]
pub struct PisoOptions {
    /// 湍流模型
    pub turbulence_model: TurbulenceKind,
    /// 速度欠松弛
    pub velocity_ur: Scalar,
    /// 压力欠松弛
    pub pressure_ur: Scalar,
    /// 压力修正遍数
    pub n_piso: usize,
    /// 非正交扫描遍数
    pub n_ortho: usize,
    /// 延迟修正遍数
    pub n_deferred: usize,
    /// LES 运行统计
    pub les_average: bool,
    /// 重力体积力
    pub buoyancy: bool,
}

impl Default for PisoOptions {
    fn default() -> Self {
        Self {
            turbulence_model: TurbulenceKind::None,
            velocity_ur: 0.8,
            pressure_ur: 0.5,
            n_piso: 1,
            n_ortho: 0,
            n_deferred: 0,
            les_average: false,
            buoyancy: false,
        }
    }
}

impl PisoOptions {
    /// 基础登记表（模型常数由所选模型追加）
    pub fn schema() -> Schema {
        let mut s = Schema::new();
        s.enroll("turbulence_model", TypeTag::Enum(TurbulenceKind::NAMES))
            .enroll("velocity_UR", TypeTag::Scalar)
            .enroll("pressure_UR", TypeTag::Scalar)
            .enroll("n_PISO", TypeTag::Int)
            .enroll("n_ORTHO", TypeTag::Int)
            .enroll("n_DEFERRED", TypeTag::Int)
            .enroll("les_average", TypeTag::Bool)
            .enroll("buoyancy", TypeTag::Bool);
        s
    }

    /// 从块取值
    pub fn from_values(vals: &HashMap<String, Value>) -> Self {
        let mut o = Self::default();
        if let Some(i) = vals.get("turbulence_model").and_then(Value::as_enum) {
            o.turbulence_model = TurbulenceKind::from_index(i);
        }
        if let Some(v) = vals.get("velocity_ur").and_then(Value::as_scalar) {
            o.velocity_ur = v;
        }
        if let Some(v) = vals.get("pressure_ur").and_then(Value::as_scalar) {
            o.pressure_ur = v;
        }
        if let Some(v) = vals.get("n_piso").and_then(Value::as_int) {
            o.n_piso = v.max(1) as usize;
        }
        if let Some(v) = vals.get("n_ortho").and_then(Value::as_int) {
            o.n_ortho = v.max(0) as usize;
        }
        if let Some(v) = vals.get("n_deferred").and_then(Value::as_int) {
            o.n_deferred = v.max(0) as usize;
        }
        if let Some(v) = vals.get("les_average").and_then(Value::as_bool) {
            o.les_average = v;
        }
        if let Some(v) = vals.get("buoyancy").and_then(Value::as_bool) {
            o.buoyancy = v;
        }
        o
    }
}

/// LES 运行统计累加器
struct LesStats {
    u_avg: Field<Vector>,
    u_std: Field<Vector>,
    p_avg: Field<Scalar>,
    p_std: Field<Scalar>,
}

impl LesStats {
    fn new(world: &World) -> Self {
        Self {
            u_avg: Field::named("Uavg", Access::ReadWrite, &world.mesh),
            u_std: Field::named("Ustd", Access::ReadWrite, &world.mesh),
            p_avg: Field::named("pavg", Access::ReadWrite, &world.mesh),
            p_std: Field::named("pstd", Access::ReadWrite, &world.mesh),
        }
    }

    /// 每步累加一、二阶矩
    fn accumulate(&mut self, u: &Field<Vector>, p: &Field<Scalar>) {
        self.u_avg += u;
        self.p_avg += p;
        let uu = u * u;
        let pp = p * p;
        self.u_std += &uu;
        self.p_std += &pp;
    }

    /// 写出步的非破坏性报告
    ///
    /// 保存累加器、就地换算为均值与标准差写出、再从副本恢复。
    /// 算术顺序与存量统计逐位一致，重启后可复现。
    fn write(&mut self, world: &World, io_step: usize, n: Scalar) -> Result<(), SolverError> {
        let ua = self.u_avg.clone();
        let us = self.u_std.clone();
        let pa = self.p_avg.clone();
        let ps = self.p_std.clone();

        self.u_avg = &self.u_avg / n;
        self.p_avg = &self.p_avg / n;
        let u_corr = &self.u_avg * &(&(&self.u_avg * n) - &(&ua * 2.0));
        let p_corr = &self.p_avg * &(&(&self.p_avg * n) - &(&pa * 2.0));
        self.u_std += &u_corr;
        self.p_std += &p_corr;
        self.u_std = (&self.u_std / n).sqrt_comp();
        self.p_std = (&self.p_std / n).sqrt_comp();

        world.write_field(&self.u_avg, io_step)?;
        world.write_field(&self.u_std, io_step)?;
        world.write_field(&self.p_avg, io_step)?;
        world.write_field(&self.p_std, io_step)?;

        self.u_avg = ua;
        self.u_std = us;
        self.p_avg = pa;
        self.p_std = ps;
        Ok(())
    }
}

/// 运行 PISO 求解
pub fn run(
    world: &mut World,
    text: &ControlsText,
    observer: &mut dyn StepObserver,
) -> Result<(), SolverError> {
    let rho = world.controls.general.rho;
    let viscosity = world.controls.general.viscosity;
    let steady = world.controls.steady();
    let time_factor = world.controls.implicit_factor;

    // ---- piso 块：先选模型（静默遍），再让模型追加自己的键 ----
    let base = text.extract_silent("piso", &PisoOptions::schema());
    let opts = {
        let mut o = PisoOptions::from_values(&base);
        if steady {
            o.n_deferred = 0;
        }
        o
    };
    let mut model: Box<dyn TurbulenceModel> =
        create_model(opts.turbulence_model, &world.mesh, rho, viscosity, steady);
    let piso_vals = {
        let mut schema = PisoOptions::schema();
        model.enroll(&mut schema);
        text.extract("piso", &schema)
    };
    let mut turb_schema = Schema::new();
    turb_schema
        .enroll("k_UR", TypeTag::Scalar)
        .enroll("x_UR", TypeTag::Scalar);
    let turb_vals = text.extract("turbulence", &turb_schema);
    model.configure(&piso_vals, &turb_vals);

    // ---- 场读入 ----
    let io_step = world.controls.start_io_step();
    let mut u = Field::<Vector>::named("U", Access::ReadWrite, &world.mesh);
    let mut p = Field::<Scalar>::named("p", Access::ReadWrite, &world.mesh);
    world.read_field(&mut u, io_step)?;
    world.read_field(&mut p, io_step)?;
    model.read_fields(world, io_step)?;

    // ---- 壁面距离 ----
    if model.needs_wall_dist() {
        if world.is_root() {
            log::info!("计算壁面距离");
        }
        let y_wall = walldist::calc_walldist(world, io_step)?;
        model.set_wall_dist(&y_wall);
        if world.is_root() {
            log::info!("壁面距离完成");
        }
    }

    world.update_bcs(&mut u, false);
    world.update_bcs(&mut p, false);
    model.calc_eddy_mu(world, &u);

    // ---- 初始通量与压力梯度 ----
    let mut gp = -&ops::gradv(&world.mesh, &p);
    let mut flux = ops::flx(&world.mesh, &(&u * rho));
    let mut u_hist = ops::TimeHistory::new(world.controls.time_scheme, &u);
    let mut stats = opts.les_average.then(|| LesStats::new(world));

    let mu_face = Field::<Scalar>::faces(&world.mesh, rho * viscosity);

    for step in world.controls.first_step()..=world.controls.end_step {
        if world.is_terminated() {
            break;
        }
        log_step(world, step);

        // 延迟修正外层循环
        for _ in 0..=opts.n_deferred {
            // 动量与压力求解
            {
                let mesh = &world.mesh;

                // ---- 动量预测 ----
                let mut m = ops::div_matrix(mesh, &u, &flux, Some(&mu_face), &world.controls);
                model.add_turbulent_stress(mesh, world, &mut m, &u);
                if opts.buoyancy {
                    let g = world.controls.general.gravity;
                    for i in 0..m.n_rows() {
                        m.su[i] += g * (rho * mesh.c_v[i]);
                    }
                }

                if steady {
                    m.relax(opts.velocity_ur, &u);
                } else {
                    if (time_factor - 1.0).abs() > 1e-12 {
                        // Crank-Nicolson 混合
                        let po = m.apply(&u);
                        m *= time_factor;
                        for i in 0..m.n_rows() {
                            m.su[i] -= po[i] * (1.0 - time_factor);
                        }
                    }
                    m += ops::ddt(mesh, &u_hist, rho, world.controls.dt, world.controls.time_scheme);
                }

                world.solve_eq(&m, &gp, &mut u);

                // 1/ap
                let mut api = Field::<Scalar>::cells(mesh, 0.0);
                for c in 0..mesh.ghost_cells_start() {
                    api[c] = 1.0 / m.ap[c];
                }
                ops::fill_boundary_values(mesh, &mut api);

                // ---- PISO 修正循环 ----
                for _ in 0..opts.n_piso {
                    // Ua = H(U)/ap
                    let ua = m.get_rhs(&u).scaled_by(&api);
                    u.assign(&ua);
                    world.update_bcs(&mut u, false);

                    // 压力泊松方程 lap(p, ρ·V/ap) = div(ρU)
                    let po = steady.then(|| p.clone());
                    let mut coef = Field::<Scalar>::cells(mesh, 0.0);
                    for c in 0..mesh.n_cells() {
                        coef[c] = rho * api[c] * mesh.c_v[c];
                    }
                    let mut coef_face = Field::<Scalar>::faces(mesh, 0.0);
                    for f in 0..mesh.n_faces() {
                        coef_face[f] = ops::face_value(mesh, &coef, f);
                    }
                    let rho_u = &u * rho;
                    let div_rho_u = ops::div(mesh, &rho_u);
                    for _ in 0..=opts.n_ortho {
                        let pm = ops::lap(mesh, &p, &coef_face, world.controls.nonortho_scheme);
                        world.solve_eq(&pm, &div_rho_u, &mut p);
                        world.update_bcs(&mut p, false);
                    }
                    if let Some(po) = po {
                        p.relax(&po, opts.pressure_ur);
                        world.update_bcs(&mut p, false);
                    }

                    // 速度显式修正
                    gp = -&ops::gradv(mesh, &p);
                    for c in 0..mesh.ghost_cells_start() {
                        u[c] += gp[c] * (api[c] * mesh.c_v[c]);
                    }
                    world.update_bcs(&mut u, false);
                }
            }

            // 脉动刷新与通量更新
            world.update_bcs(&mut u, true);
            flux = ops::flx(&world.mesh, &(&u * rho));

            // 湍流输运
            model.solve(world, &u, &flux)?;
        }

        if !steady {
            u_hist.push(&u);
        }

        // LES 统计累加
        if let Some(stats) = stats.as_mut() {
            stats.accumulate(&u, &p);
        }

        let mut fields = StepFields::new();
        fields.scalars.push(("p", &p));
        fields.vectors.push(("U", &u));
        observer.end_step(world, step, &fields);

        // ---- 写出 ----
        if step % world.controls.write_interval == 0 {
            let io = step / world.controls.write_interval;
            if let Some(stats) = stats.as_mut() {
                stats.write(world, io, step as Scalar)?;
            }
            world.write_field(&u, io)?;
            world.write_field(&p, io)?;
            model.write_fields(world, io)?;
            observer.write(world, io, &fields);
        }
    }
    Ok(())
}
