// crates/fv_solver/src/drivers/potential.rs

//! 势流驱动（一次性）
//!
//! 无旋假设下初始化流场：内部 U、p 清零后解压力泊松方程
//! `lap(p, 1) = div(U)`（`n_ORTHO + 1` 遍非正交扫描），再以
//! `U −= ∇p` 修正速度使其近似无散。结果写出一次即返回。
//!
//! 对自身输出重复运行是不动点：无散场的 div 为零，压力解
//! 为零，速度不再改变。

use std::collections::HashMap;

use fv_config::{ControlsText, Schema, TypeTag, Value};
use fv_core::{Scalar, Vector};

use super::{StepFields, StepObserver};
use crate::field::{Access, Field};
use crate::ops;
use crate::world::World;
use crate::SolverError;

/// `potential` 块参数
#[derive(Debug, Clone, Default)]
pub struct PotentialOptions {
    /// 非正交扫描遍数
    pub n_ortho: usize,
}

impl PotentialOptions {
    /// 登记表
    pub fn schema() -> Schema {
        let mut s = Schema::new();
        s.enroll("n_ORTHO", TypeTag::Int);
        s
    }

    /// 从块取值
    pub fn from_values(vals: &HashMap<String, Value>) -> Self {
        let mut o = Self::default();
        if let Some(v) = vals.get("n_ortho").and_then(Value::as_int) {
            o.n_ortho = v.max(0) as usize;
        }
        o
    }
}

/// 运行势流初始化
pub fn run(
    world: &mut World,
    text: &ControlsText,
    observer: &mut dyn StepObserver,
) -> Result<(), SolverError> {
    let opts = PotentialOptions::from_values(&text.extract("potential", &PotentialOptions::schema()));

    let io_step = world.controls.start_io_step();
    let mut u = Field::<Vector>::named("U", Access::ReadWrite, &world.mesh);
    let mut p = Field::<Scalar>::named("p", Access::Read, &world.mesh);
    world.read_field(&mut u, io_step)?;
    world.read_field(&mut p, io_step)?;

    // 内部清零，边界值保留
    for c in 0..world.mesh.ghost_cells_start() {
        u[c] = Vector::ZERO;
        p[c] = 0.0;
    }
    world.update_bcs(&mut u, false);
    world.update_bcs(&mut p, false);

    // lap(p, 1) = div(U)
    let div_u = ops::div(&world.mesh, &u);
    let one = Field::<Scalar>::faces(&world.mesh, 1.0);
    for _ in 0..=opts.n_ortho {
        let m = ops::lap(&world.mesh, &p, &one, world.controls.nonortho_scheme);
        world.solve_eq(&m, &div_u, &mut p);
        world.update_bcs(&mut p, false);
    }

    // U −= ∇p
    let gp = ops::grad(&world.mesh, &p);
    for c in 0..world.mesh.ghost_cells_start() {
        u[c] -= gp[c];
    }
    world.update_bcs(&mut u, false);

    if world.is_root() {
        let residual = corrected_flux_divergence(world, &u, &p);
        let mut l2 = 0.0;
        for c in 0..world.mesh.ghost_cells_start() {
            l2 += residual[c] * residual[c];
        }
        log::info!("势流初始化完成, ‖div U‖₂ = {:.3e}", l2.sqrt());
    }

    world.write_field(&u, io_step)?;
    let mut fields = StepFields::new();
    fields.scalars.push(("p", &p));
    fields.vectors.push(("U", &u));
    observer.write(world, io_step, &fields);
    Ok(())
}

/// 压力修正后的质量通量散度
///
/// 面通量取「边界速度的插值通量 − 压力面系数修正」，即压力
/// 方程实际驱动为零的量；其散度等于该线性系统的逐行残差，
/// 量级由求解容差决定。
pub fn corrected_flux_divergence(
    world: &World,
    u: &Field<Vector>,
    p: &Field<Scalar>,
) -> Field<Scalar> {
    let mesh = &world.mesh;

    // 与驱动入口一致的起始速度：内部为零、幽灵取边界条件
    let mut u0 = u.clone();
    for c in 0..mesh.ghost_cells_start() {
        u0[c] = Vector::ZERO;
    }
    world.update_bcs(&mut u0, false);

    let f0 = ops::flx(mesh, &u0);
    let n = mesh.ghost_cells_start();
    let mut div = Field::<Scalar>::cells(mesh, 0.0);
    for f in 0..mesh.n_faces() {
        let o = mesh.owner(f);
        let nb = mesh.neighbor(f);
        let a = mesh.f_n[f];
        let d = mesh.face_delta(f);
        let dcoef = a.length_squared() / a.dot(d);
        let corrected = f0[f] - dcoef * (p[nb] - p[o]);
        div[o] += corrected;
        if nb < n {
            div[nb] -= corrected;
        }
    }
    for c in 0..n {
        div[c] /= mesh.c_v[c];
    }
    div
}
