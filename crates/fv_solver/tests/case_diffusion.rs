// tests/case_diffusion.rs

//! 1D 扩散算例（完整驱动链路）
//!
//! 单位立方 10×1×1 网格，DT = 1，x=0 处 T=0、x=1 处 T=1、
//! 其余零梯度。稳态解应为 T(x) = x（1e-6 以内）。
//! 同时覆盖场文件写后读回的往返一致性。

use fv_config::{Controls, ControlsText, SolverKind, State};
use fv_core::{Scalar, Vector};
use fv_mesh::generation::{structured_box, DEFAULT_PATCH_NAMES};
use fv_mesh::Mesh;
use fv_solver::boundary::{BcKind, BcSpec};
use fv_solver::comm::SerialComm;
use fv_solver::drivers::{diffusion, NullObserver};
use fv_solver::field::{Access, Field};
use fv_solver::world::World;

fn case_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("fvflow_cases").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn unit_bar() -> Mesh {
    structured_box(
        10,
        1,
        1,
        Vector::ZERO,
        Vector::splat(1.0),
        &DEFAULT_PATCH_NAMES,
    )
    .unwrap()
}

fn t_bc_specs() -> Vec<BcSpec<Scalar>> {
    let zero_grad = |patch: &str| BcSpec::<Scalar> {
        patch: patch.into(),
        kind: BcKind::Neumann,
        value: 0.0,
        slope: 0.0,
        shape: 0.0,
    };
    vec![
        BcSpec {
            patch: "xmin".into(),
            kind: BcKind::Dirichlet,
            value: 0.0,
            slope: 0.0,
            shape: 0.0,
        },
        BcSpec {
            patch: "xmax".into(),
            kind: BcKind::Dirichlet,
            value: 1.0,
            slope: 0.0,
            shape: 0.0,
        },
        zero_grad("ymin"),
        zero_grad("ymax"),
        zero_grad("zmin"),
        zero_grad("zmax"),
    ]
}

#[test]
fn steady_1d_diffusion_reaches_linear_profile() {
    let mesh = unit_bar();
    let dir = case_dir("diffusion_steady");

    // 初始场文件：T = 0
    let t0 = Field::<Scalar>::named("T", Access::ReadWrite, &mesh);
    t0.write_file(&dir, 0, &mesh, &t_bc_specs()).unwrap();

    let mut controls = Controls::default();
    controls.solver = SolverKind::Diffusion;
    controls.state = State::Steady;
    controls.start_step = 0;
    controls.end_step = 4;
    controls.write_interval = 4;
    controls.tolerance = 1e-10;
    controls.max_iterations = 500;

    let mut world = World::new(mesh, controls, Box::new(SerialComm), &dir);
    let text = ControlsText::parse("diffusion { DT 1.0 t_UR 1.0 }").unwrap();
    diffusion::run(&mut world, &text, &mut NullObserver).unwrap();

    // 写出步 1 的场
    let mut t = Field::<Scalar>::named("T", Access::Read, &world.mesh);
    t.read_file(&dir, 1, &world.mesh).unwrap();
    for c in 0..world.mesh.ghost_cells_start() {
        let exact = world.mesh.c_c[c].x;
        assert!(
            (t[c] - exact).abs() < 1e-6,
            "cell {}: {} != {}",
            c,
            t[c],
            exact
        );
    }
}

#[test]
fn transient_diffusion_is_bounded_and_monotone_in_time() {
    let mesh = unit_bar();
    let dir = case_dir("diffusion_transient");

    let t0 = Field::<Scalar>::named("T", Access::ReadWrite, &mesh);
    t0.write_file(&dir, 0, &mesh, &t_bc_specs()).unwrap();

    let mut controls = Controls::default();
    controls.solver = SolverKind::Diffusion;
    controls.state = State::Transient;
    controls.dt = 0.02;
    controls.end_step = 10;
    controls.write_interval = 10;
    controls.tolerance = 1e-10;

    let mut world = World::new(mesh, controls, Box::new(SerialComm), &dir);
    let text = ControlsText::parse("diffusion { DT 1.0 }").unwrap();
    diffusion::run(&mut world, &text, &mut NullObserver).unwrap();

    let mut t = Field::<Scalar>::named("T", Access::Read, &world.mesh);
    t.read_file(&dir, 1, &world.mesh).unwrap();
    // 隐式扩散保持最大值原理：0 ≤ T ≤ 1 且沿 x 单调
    let n = world.mesh.ghost_cells_start();
    for c in 0..n {
        assert!((-1e-9..=1.0 + 1e-9).contains(&t[c]), "T[{}] = {}", c, t[c]);
    }
    for c in 1..n {
        assert!(t[c] >= t[c - 1] - 1e-9);
    }
}

#[test]
fn field_file_round_trip_is_exact() {
    let mesh = unit_bar();
    let dir = case_dir("diffusion_roundtrip");

    let mut t = Field::<Scalar>::named("T", Access::ReadWrite, &mesh);
    for c in 0..mesh.ghost_cells_start() {
        t[c] = (c as Scalar).sin() * 1e-7 + 1.0 / 3.0;
    }
    t.write_file(&dir, 3, &mesh, &t_bc_specs()).unwrap();

    let mut back = Field::<Scalar>::named("T", Access::Read, &mesh);
    let bcs = back.read_file(&dir, 3, &mesh).unwrap();

    for c in 0..mesh.ghost_cells_start() {
        assert_eq!(t[c], back[c], "cell {}", c);
    }
    assert_eq!(bcs.len(), 6);
}
