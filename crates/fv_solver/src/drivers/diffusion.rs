// crates/fv_solver/src/drivers/diffusion.rs

//! 扩散驱动
//!
//! 求解抛物型热方程 `ddt(T, ρ) = lap(T, ρ·DT)`：
//! 每步装配 `M = −lap(T, μ)`，稳态欠松弛、瞬态加时间项
//! （`implicit_factor ≠ 1` 时 Crank-Nicolson 混合），可选
//! 延迟修正外层循环。`runge_kutta > 1` 时走显式 RK 路径。

use std::collections::HashMap;

use fv_config::{ControlsText, Schema, TypeTag, Value};
use fv_core::Scalar;

use super::{log_step, StepFields, StepObserver};
use crate::field::{Access, Field};
use crate::ops;
use crate::world::World;
use crate::SolverError;

/// `diffusion` 块参数
#[derive(Debug, Clone)]
pub struct DiffusionOptions {
    /// 扩散系数
    pub dt_coeff: Scalar,
    /// 欠松弛因子
    pub t_ur: Scalar,
    /// 延迟修正遍数
    pub n_deferred: usize,
}

impl Default for DiffusionOptions {
    fn default() -> Self {
        Self {
            dt_coeff: 1.0,
            t_ur: 1.0,
            n_deferred: 0,
        }
    }
}

impl DiffusionOptions {
    /// 登记表
    pub fn schema() -> Schema {
        let mut s = Schema::new();
        s.enroll("DT", TypeTag::Scalar)
            .enroll("t_UR", TypeTag::Scalar)
            .enroll("n_DEFERRED", TypeTag::Int);
        s
    }

    /// 从块取值
    pub fn from_values(vals: &HashMap<String, Value>) -> Self {
        let mut o = Self::default();
        if let Some(v) = vals.get("dt").and_then(Value::as_scalar) {
            o.dt_coeff = v;
        }
        if let Some(v) = vals.get("t_ur").and_then(Value::as_scalar) {
            o.t_ur = v;
        }
        if let Some(v) = vals.get("n_deferred").and_then(Value::as_int) {
            o.n_deferred = v.max(0) as usize;
        }
        o
    }
}

/// 运行扩散求解
pub fn run(
    world: &mut World,
    text: &ControlsText,
    observer: &mut dyn StepObserver,
) -> Result<(), SolverError> {
    let opts = DiffusionOptions::from_values(&text.extract("diffusion", &DiffusionOptions::schema()));
    let rho = world.controls.general.rho;
    let steady = world.controls.steady();
    let n_deferred = if steady { 0 } else { opts.n_deferred };
    let time_factor = world.controls.implicit_factor;

    // 起始步场读入
    let io_step = world.controls.start_io_step();
    let mut t = Field::<Scalar>::named("T", Access::ReadWrite, &world.mesh);
    world.read_field(&mut t, io_step)?;
    world.update_bcs(&mut t, false);

    let mu = Field::<Scalar>::faces(&world.mesh, rho * opts.dt_coeff);
    let mut hist = ops::TimeHistory::new(world.controls.time_scheme, &t);
    let explicit_rk = world.controls.runge_kutta > 1;

    for step in world.controls.first_step()..=world.controls.end_step {
        if world.is_terminated() {
            break;
        }
        log_step(world, step);

        if explicit_rk && !steady {
            rk_step(world, &mut t, &mu, rho);
        } else {
            for _ in 0..=n_deferred {
                let mesh = &world.mesh;
                let mut m = -ops::lap(mesh, &t, &mu, world.controls.nonortho_scheme);

                if steady {
                    m.relax(opts.t_ur, &t);
                } else {
                    if (time_factor - 1.0).abs() > 1e-12 {
                        // Crank-Nicolson 混合
                        let po = m.apply(&t);
                        m *= time_factor;
                        for i in 0..m.n_rows() {
                            m.su[i] -= po[i] * (1.0 - time_factor);
                        }
                    }
                    m += ops::ddt(mesh, &hist, rho, world.controls.dt, world.controls.time_scheme);
                }

                world.solve(&m, &mut t);
                world.update_bcs(&mut t, false);
            }
        }

        if !steady {
            hist.push(&t);
        }

        let mut fields = StepFields::new();
        fields.scalars.push(("T", &t));
        observer.end_step(world, step, &fields);

        if step % world.controls.write_interval == 0 {
            let io = step / world.controls.write_interval;
            world.write_field(&t, io)?;
            observer.write(world, io, &fields);
        }
    }
    Ok(())
}

/// 显式 Runge-Kutta 步
///
/// 每级的时间矩阵 `ap = ρV/(α·dt)`，空间算子显式作用于当前级：
/// `T = (Su + lap(T)) / ap`。
fn rk_step(world: &World, t: &mut Field<Scalar>, mu: &Field<Scalar>, rho: Scalar) {
    let mesh = &world.mesh;
    let t0 = t.clone();
    for &alpha in ops::rk_coeffs(world.controls.runge_kutta) {
        let md = ops::ddt_rk_stage(mesh, &t0, rho, world.controls.dt, alpha);
        let m = ops::lap(mesh, t, mu, world.controls.nonortho_scheme);
        let lap_val = m.apply(t);
        for i in 0..mesh.ghost_cells_start() {
            t[i] = (md.su[i] + lap_val[i]) / md.ap[i];
        }
        world.update_bcs(t, false);
    }
}
