// crates/fv_solver/src/drivers/transport.rs

//! 输运驱动
//!
//! 给定流场 U 与边界标量值，求解
//! `ddt(T, ρ) + div(T, F, μ) = 0`，`F = flx(ρU)`，
//! `μ = ρ·DT`（对流矩阵自带扩散系数，因此不再单独减 lap）。

use fv_config::ControlsText;
use fv_core::{Scalar, Vector};

use super::diffusion::DiffusionOptions;
use super::{log_step, StepFields, StepObserver};
use crate::field::{Access, Field};
use crate::ops;
use crate::world::World;
use crate::SolverError;

/// 运行输运求解
///
/// `transport` 块与 `diffusion` 块同构（DT / t_UR / n_DEFERRED）。
pub fn run(
    world: &mut World,
    text: &ControlsText,
    observer: &mut dyn StepObserver,
) -> Result<(), SolverError> {
    let opts = DiffusionOptions::from_values(&text.extract("transport", &DiffusionOptions::schema()));
    let rho = world.controls.general.rho;
    let steady = world.controls.steady();
    let n_deferred = if steady { 0 } else { opts.n_deferred };
    let time_factor = world.controls.implicit_factor;

    let io_step = world.controls.start_io_step();
    let mut u = Field::<Vector>::named("U", Access::ReadWrite, &world.mesh);
    let mut t = Field::<Scalar>::named("T", Access::ReadWrite, &world.mesh);
    world.read_field(&mut u, io_step)?;
    world.read_field(&mut t, io_step)?;
    world.update_bcs(&mut u, false);
    world.update_bcs(&mut t, false);

    let mu = Field::<Scalar>::faces(&world.mesh, rho * opts.dt_coeff);
    let mut hist = ops::TimeHistory::new(world.controls.time_scheme, &t);

    for step in world.controls.first_step()..=world.controls.end_step {
        if world.is_terminated() {
            break;
        }
        log_step(world, step);

        for _ in 0..=n_deferred {
            let mesh = &world.mesh;
            let rho_u = &u * rho;
            let flux = ops::flx(mesh, &rho_u);
            let mut m = ops::div_matrix(mesh, &t, &flux, Some(&mu), &world.controls);

            if steady {
                m.relax(opts.t_ur, &t);
            } else {
                if (time_factor - 1.0).abs() > 1e-12 {
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

        if !steady {
            hist.push(&t);
        }

        let mut fields = StepFields::new();
        fields.scalars.push(("T", &t));
        fields.vectors.push(("U", &u));
        observer.end_step(world, step, &fields);

        if step % world.controls.write_interval == 0 {
            let io = step / world.controls.write_interval;
            world.write_field(&t, io)?;
            world.write_field(&u, io)?;
            observer.write(world, io, &fields);
        }
    }
    Ok(())
}
