// crates/fv_solver/src/turbulence/algebraic.rs

//! 代数模型：NONE / MIXING_LENGTH / LES
//!
//! 不解输运方程，涡粘由局部量直接给出。

use std::collections::HashMap;

use fv_config::{Schema, TurbulenceKind, TypeTag, Value};
use fv_core::{Scalar, Vector};
use fv_mesh::Mesh;

use super::{strain_rate_mag, TurbulenceModel, KAPPA};
use crate::field::Field;
use crate::ops;
use crate::world::World;

// ============================================================
// NONE
// ============================================================

/// 层流（无闭合）
///
/// 涡粘为零；动量方程只保留对流矩阵里的分子粘性项。
pub struct NoneModel;

impl TurbulenceModel for NoneModel {
    fn kind(&self) -> TurbulenceKind {
        TurbulenceKind::None
    }

    fn calc_eddy_mu(&mut self, _world: &World, _u: &Field<Vector>) {}

    fn eddy_mu(&self) -> Option<&Field<Scalar>> {
        None
    }
}

// ============================================================
// MIXING_LENGTH
// ============================================================

/// Prandtl 混合长度模型
///
/// `μt = ρ l² |S|`，`l = min(κ·y, l_max)`。需要壁面距离。
pub struct MixingLengthModel {
    rho: Scalar,
    /// 混合长度上限
    l_max: Scalar,
    eddy_mu: Field<Scalar>,
    y_wall: Option<Field<Scalar>>,
    _viscosity: Scalar,
}

impl MixingLengthModel {
    /// 创建模型
    pub fn new(mesh: &Mesh, rho: Scalar, viscosity: Scalar) -> Self {
        Self {
            rho,
            l_max: 1e30,
            eddy_mu: Field::cells(mesh, 0.0),
            y_wall: None,
            _viscosity: viscosity,
        }
    }
}

impl TurbulenceModel for MixingLengthModel {
    fn kind(&self) -> TurbulenceKind {
        TurbulenceKind::MixingLength
    }

    fn needs_wall_dist(&self) -> bool {
        true
    }

    fn enroll(&self, schema: &mut Schema) {
        schema.enroll("mixing_length", TypeTag::Scalar);
    }

    fn configure(&mut self, piso: &HashMap<String, Value>, _turb: &HashMap<String, Value>) {
        if let Some(l) = piso.get("mixing_length").and_then(Value::as_scalar) {
            self.l_max = l;
        }
    }

    fn set_wall_dist(&mut self, y_wall: &Field<Scalar>) {
        self.y_wall = Some(y_wall.clone());
    }

    fn calc_eddy_mu(&mut self, world: &World, u: &Field<Vector>) {
        let mesh = &world.mesh;
        let g = ops::grad_vec(mesh, u);
        for c in 0..mesh.n_cells() {
            let y = self.y_wall.as_ref().map(|w| w[c]).unwrap_or(self.l_max);
            let l = (KAPPA * y).min(self.l_max);
            self.eddy_mu[c] = self.rho * l * l * strain_rate_mag(&g[c]);
        }
    }

    fn eddy_mu(&self) -> Option<&Field<Scalar>> {
        Some(&self.eddy_mu)
    }
}

// ============================================================
// LES (Smagorinsky)
// ============================================================

/// Smagorinsky 亚格子模型
///
/// `μt = ρ (Cs·Δ)² |S|`，滤波宽度 `Δ = V^{1/3}`。
/// 需要壁面距离做近壁衰减 `l = min(Cs·Δ, κ·y)`。
pub struct LesModel {
    rho: Scalar,
    /// Smagorinsky 常数
    cs: Scalar,
    eddy_mu: Field<Scalar>,
    y_wall: Option<Field<Scalar>>,
}

impl LesModel {
    /// 创建模型
    pub fn new(mesh: &Mesh, rho: Scalar) -> Self {
        Self {
            rho,
            cs: 0.17,
            eddy_mu: Field::cells(mesh, 0.0),
            y_wall: None,
        }
    }
}

impl TurbulenceModel for LesModel {
    fn kind(&self) -> TurbulenceKind {
        TurbulenceKind::Les
    }

    fn needs_wall_dist(&self) -> bool {
        true
    }

    fn enroll(&self, schema: &mut Schema) {
        schema.enroll("Cs", TypeTag::Scalar);
    }

    fn configure(&mut self, piso: &HashMap<String, Value>, _turb: &HashMap<String, Value>) {
        if let Some(cs) = piso.get("cs").and_then(Value::as_scalar) {
            self.cs = cs;
        }
    }

    fn set_wall_dist(&mut self, y_wall: &Field<Scalar>) {
        self.y_wall = Some(y_wall.clone());
    }

    fn calc_eddy_mu(&mut self, world: &World, u: &Field<Vector>) {
        let mesh = &world.mesh;
        let g = ops::grad_vec(mesh, u);
        for c in 0..mesh.n_cells() {
            let delta = mesh.c_v[c].cbrt();
            let mut l = self.cs * delta;
            if let Some(y) = self.y_wall.as_ref() {
                l = l.min(KAPPA * y[c]);
            }
            self.eddy_mu[c] = self.rho * l * l * strain_rate_mag(&g[c]);
        }
    }

    fn eddy_mu(&self) -> Option<&Field<Scalar>> {
        Some(&self.eddy_mu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SerialComm;
    use fv_config::Controls;
    use fv_mesh::generation::{structured_box, DEFAULT_PATCH_NAMES};

    fn world() -> World {
        let mesh = structured_box(
            4,
            4,
            1,
            Vector::ZERO,
            Vector::splat(1.0),
            &DEFAULT_PATCH_NAMES,
        )
        .unwrap();
        World::new(
            mesh,
            Controls::default(),
            Box::new(SerialComm),
            std::env::temp_dir(),
        )
    }

    #[test]
    fn test_none_model_has_no_eddy_mu() {
        let mut model = NoneModel;
        let w = world();
        let u = Field::cells(&w.mesh, Vector::ZERO);
        model.calc_eddy_mu(&w, &u);
        assert!(model.eddy_mu().is_none());
    }

    #[test]
    fn test_les_eddy_mu_zero_for_uniform_flow() {
        let w = world();
        let mut model = LesModel::new(&w.mesh, 1.0);
        let mut u = Field::cells(&w.mesh, Vector::new(1.0, 0.0, 0.0));
        ops::fill_boundary_values(&w.mesh, &mut u);
        model.calc_eddy_mu(&w, &u);
        for c in 0..w.mesh.ghost_cells_start() {
            assert!(model.eddy_mu().unwrap()[c].abs() < 1e-12);
        }
    }

    #[test]
    fn test_mixing_length_scales_with_wall_distance() {
        let w = world();
        let mut model = MixingLengthModel::new(&w.mesh, 1.0, 1e-5);
        // 线性剪切 u = (y, 0, 0)
        let mut u = Field::cells(&w.mesh, Vector::ZERO);
        for c in 0..w.mesh.n_cells() {
            u[c] = Vector::new(w.mesh.c_c[c].y, 0.0, 0.0);
        }
        let mut y = Field::cells(&w.mesh, 0.0);
        for c in 0..w.mesh.n_cells() {
            y[c] = w.mesh.c_c[c].y;
        }
        model.set_wall_dist(&y);
        model.calc_eddy_mu(&w, &u);

        // μt = ρ(κy)²·|S|，|S| = 1（du/dy = 1）
        let mu = model.eddy_mu().unwrap();
        for c in 0..w.mesh.ghost_cells_start() {
            let expect = (KAPPA * w.mesh.c_c[c].y).powi(2);
            assert!(
                (mu[c] - expect).abs() < 0.05 * expect.max(1e-6),
                "cell {}: {} vs {}",
                c,
                mu[c],
                expect
            );
        }
    }
}
