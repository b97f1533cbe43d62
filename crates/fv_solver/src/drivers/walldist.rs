// crates/fv_solver/src/drivers/walldist.rs

//! 壁面距离
//!
//! 解泊松方程 `lap(φ, 1) = −1` 近似最近壁面距离：
//! 壁面（名称含 WALL 的边界片）上 φ = 0，其余零梯度，然后
//! 取 Spalding 闭式估计
//!
//! ```text
//! yWall = sqrt(∇φ·∇φ + 2φ) − |∇φ|
//! ```
//!
//! 结果以 WRITE 访问写出本步后恢复为 NONE。

use fv_core::Scalar;

use crate::boundary::{BcKind, BcSpec};
use crate::field::{Access, Field};
use crate::ops;
use crate::world::World;
use crate::SolverError;

/// 计算壁面距离并写出
pub fn calc_walldist(world: &mut World, step: usize) -> Result<Field<Scalar>, SolverError> {
    let mut phi = Field::<Scalar>::named("wphi", Access::None, &world.mesh);
    phi.fill(0.0);

    // 壁面 Dirichlet 0，其余零梯度
    let mut specs = Vec::new();
    for patch in world.mesh.patches() {
        if patch.is_processor() {
            continue;
        }
        let kind = if patch.name.to_ascii_uppercase().contains("WALL") {
            BcKind::Dirichlet
        } else {
            BcKind::Neumann
        };
        specs.push(BcSpec {
            patch: patch.name.clone(),
            kind,
            value: 0.0,
            slope: 0.0,
            shape: 0.0,
        });
    }
    world.bcs.enroll_field::<Scalar>("wphi", specs, &world.mesh);
    world.update_bcs(&mut phi, false);

    // 泊松方程 lap(φ,1) = −1
    let one = Field::<Scalar>::faces(&world.mesh, 1.0);
    let m = ops::lap(&world.mesh, &phi, &one, world.controls.nonortho_scheme);
    let rhs = Field::<Scalar>::cells(&world.mesh, -1.0);
    world.solve_eq(&m, &rhs, &mut phi);
    world.update_bcs(&mut phi, false);

    // Spalding 闭式估计
    let g = ops::grad(&world.mesh, &phi);
    let mut y_wall = Field::<Scalar>::named("yWall", Access::Write, &world.mesh);
    for c in 0..world.mesh.n_cells() {
        let gm2 = g[c].length_squared();
        y_wall[c] = (gm2 + 2.0 * phi[c].max(0.0)).sqrt() - gm2.sqrt();
    }

    world.write_field(&y_wall, step)?;
    y_wall.access = Access::None;
    Ok(y_wall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SerialComm;
    use fv_config::Controls;
    use fv_core::Vector;
    use fv_mesh::generation::structured_box;

    #[test]
    fn test_channel_wall_distance() {
        // 1×1×H 槽道，y=0 与 y=H 为壁面：yWall ≈ min(y, H−y)（5% 以内）
        let h = 1.0;
        let mesh = structured_box(
            1,
            16,
            1,
            Vector::ZERO,
            Vector::new(1.0, h, 1.0),
            &["xmin", "xmax", "WALL_lo", "WALL_hi", "zmin", "zmax"],
        )
        .unwrap();
        let mut world = World::new(
            mesh,
            Controls::default(),
            Box::new(SerialComm),
            std::env::temp_dir(),
        );

        let y_wall = calc_walldist(&mut world, 0).unwrap();
        for c in 0..world.mesh.ghost_cells_start() {
            let y = world.mesh.c_c[c].y;
            let exact = y.min(h - y);
            let err = (y_wall[c] - exact).abs() / exact.max(1e-6);
            assert!(
                err < 0.05,
                "cell {}: yWall = {}, exact = {}, err = {}",
                c,
                y_wall[c],
                exact,
                err
            );
        }
    }

    #[test]
    fn test_walldist_positive() {
        let mesh = structured_box(
            4,
            4,
            4,
            Vector::ZERO,
            Vector::splat(1.0),
            &["WALLa", "WALLb", "WALLc", "WALLd", "WALLe", "WALLf"],
        )
        .unwrap();
        let mut world = World::new(
            mesh,
            Controls::default(),
            Box::new(SerialComm),
            std::env::temp_dir(),
        );
        let y_wall = calc_walldist(&mut world, 0).unwrap();
        for c in 0..world.mesh.ghost_cells_start() {
            assert!(y_wall[c] > 0.0);
            // 单位立方内到壁面距离不超过 0.5
            assert!(y_wall[c] < 0.5 + 1e-6);
        }
    }
}
