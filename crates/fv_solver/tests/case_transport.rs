// tests/case_transport.rs

//! 阶跃输运算例
//!
//! 常速度场 U = (1,0,0)、DT = 0、UDS 格式：阶跃沿 x 以速度 1
//! 平移，N 步后前沿前进 N·dt（数值扩散使其变缓但单调、有界、
//! 保质量）。

use fv_config::{Controls, ControlsText, SolverKind, State};
use fv_core::{Scalar, Vector};
use fv_mesh::generation::structured_box;
use fv_mesh::Mesh;
use fv_solver::boundary::{BcKind, BcSpec};
use fv_solver::comm::SerialComm;
use fv_solver::drivers::{transport, NullObserver};
use fv_solver::field::{Access, Field};
use fv_solver::world::World;

fn case_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("fvflow_cases").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn bar(nx: usize) -> Mesh {
    structured_box(
        nx,
        1,
        1,
        Vector::ZERO,
        Vector::new(1.0, 0.1, 0.1),
        &["inlet", "outlet", "ymin", "ymax", "zmin", "zmax"],
    )
    .unwrap()
}

fn scalar_zero_grad(patch: &str) -> BcSpec<Scalar> {
    BcSpec {
        patch: patch.into(),
        kind: BcKind::Neumann,
        value: 0.0,
        slope: 0.0,
        shape: 0.0,
    }
}

#[test]
fn step_profile_advects_downstream() {
    let nx = 50;
    let mesh = bar(nx);
    let dir = case_dir("transport_step");

    // U = (1,0,0) 全场；入口 Dirichlet
    let mut u0 = Field::<Vector>::named("U", Access::ReadWrite, &mesh);
    u0.fill(Vector::new(1.0, 0.0, 0.0));
    let mut u_specs = vec![BcSpec {
        patch: "inlet".into(),
        kind: BcKind::Dirichlet,
        value: Vector::new(1.0, 0.0, 0.0),
        slope: Vector::ZERO,
        shape: 0.0,
    }];
    for p in ["outlet", "ymin", "ymax", "zmin", "zmax"] {
        u_specs.push(BcSpec {
            patch: p.into(),
            kind: BcKind::Neumann,
            value: Vector::ZERO,
            slope: Vector::ZERO,
            shape: 0.0,
        });
    }
    u0.write_file(&dir, 0, &mesh, &u_specs).unwrap();

    // 阶跃初值：x < 0.2 处 T = 1
    let mut t0 = Field::<Scalar>::named("T", Access::ReadWrite, &mesh);
    for c in 0..mesh.ghost_cells_start() {
        t0[c] = if mesh.c_c[c].x < 0.2 { 1.0 } else { 0.0 };
    }
    let mut t_specs = vec![BcSpec {
        patch: "inlet".into(),
        kind: BcKind::Dirichlet,
        value: 1.0,
        slope: 0.0,
        shape: 0.0,
    }];
    for p in ["outlet", "ymin", "ymax", "zmin", "zmax"] {
        t_specs.push(scalar_zero_grad(p));
    }
    t0.write_file(&dir, 0, &mesh, &t_specs).unwrap();

    let n_steps = 20;
    let dt = 0.01;
    let mut controls = Controls::default();
    controls.solver = SolverKind::Transport;
    controls.state = State::Transient;
    controls.dt = dt;
    controls.end_step = n_steps;
    controls.write_interval = n_steps;
    controls.tolerance = 1e-10;
    controls.max_iterations = 1000;

    let mut world = World::new(mesh, controls, Box::new(SerialComm), &dir);
    // DT = 0：纯对流
    let text = ControlsText::parse("transport { DT 0.0 }").unwrap();
    transport::run(&mut world, &text, &mut NullObserver).unwrap();

    let mut t = Field::<Scalar>::named("T", Access::Read, &world.mesh);
    t.read_file(&dir, 1, &world.mesh).unwrap();

    let n = world.mesh.ghost_cells_start();
    // 有界且单调递减（UDS 无振荡）
    for c in 0..n {
        assert!(
            (-1e-8..=1.0 + 1e-8).contains(&t[c]),
            "T[{}] = {}",
            c,
            t[c]
        );
    }
    for c in 1..n {
        assert!(t[c] <= t[c - 1] + 1e-8);
    }

    // 质量守恒：dM/dt = 入口通量 − 出口通量
    let cell_v = 1.0 / nx as Scalar * 0.01;
    let mass0: Scalar = (0..n).map(|c| t0[c] * cell_v).sum();
    let mass1: Scalar = (0..n).map(|c| t[c] * cell_v).sum();
    let inflow = 1.0 * 0.01 * (n_steps as Scalar * dt); // T=1 · u·A · 时间
    let outflow = 0.0; // 前沿未到出口
    assert!(
        (mass1 - (mass0 + inflow - outflow)).abs() < 1e-6,
        "mass {} -> {}, 预期 {}",
        mass0,
        mass1,
        mass0 + inflow
    );

    // 前沿位置：T 过 0.5 的位置约在 0.2 + N·dt（数值扩散容差内）
    let front = (0..n)
        .find(|&c| t[c] < 0.5)
        .map(|c| world.mesh.c_c[c].x)
        .unwrap_or(1.0);
    let expected = 0.2 + n_steps as Scalar * dt;
    assert!(
        (front - expected).abs() < 0.1,
        "front = {}, expected = {}",
        front,
        expected
    );
}
