// crates/fv_solver/src/drivers/mod.rs

//! 耦合驱动
//!
//! 把算子、求解器与湍流闭合组织为时间推进循环：
//!
//! - [`piso`]: 同位网格 PISO 压力-速度耦合
//! - [`diffusion`]: 扩散（抛物型热方程）
//! - [`transport`]: 给定流场的标量输运
//! - [`potential`]: 一次性势流初始化
//! - [`walldist`]: 壁面距离（Spalding 泊松估计）
//!
//! 每个驱动自己持有场，`World` 提供网格 / 控制参数 / 边界
//! 登记表 / 通信。步输出（VTK、探针）通过 [`StepObserver`]
//! 注入，驱动只负责场文件。每步开始前检查终止旗标。

pub mod diffusion;
pub mod piso;
pub mod potential;
pub mod transport;
pub mod walldist;

use fv_config::{ControlsText, SolverKind};
use fv_core::{Scalar, Vector};

use crate::field::Field;
use crate::world::World;
use crate::SolverError;

/// 一步结束时可供输出的场视图
pub struct StepFields<'a> {
    /// 标量场（名字，场）
    pub scalars: Vec<(&'a str, &'a Field<Scalar>)>,
    /// 向量场
    pub vectors: Vec<(&'a str, &'a Field<Vector>)>,
}

impl<'a> StepFields<'a> {
    /// 空视图
    pub fn new() -> Self {
        Self {
            scalars: Vec::new(),
            vectors: Vec::new(),
        }
    }
}

impl<'a> Default for StepFields<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// 步输出观察者（VTK 写出、探针记录）
pub trait StepObserver {
    /// 每个时间步结束（瞬时量记录）
    fn end_step(&mut self, world: &World, step: usize, fields: &StepFields<'_>) {
        let _ = (world, step, fields);
    }

    /// 写出步（`write_interval` 对齐的 io 步号）
    fn write(&mut self, world: &World, io_step: usize, fields: &StepFields<'_>) {
        let _ = (world, io_step, fields);
    }
}

/// 不输出
pub struct NullObserver;

impl StepObserver for NullObserver {}

/// 按 `general.solver` 分发驱动
pub fn run(
    world: &mut World,
    text: &ControlsText,
    observer: &mut dyn StepObserver,
) -> Result<(), SolverError> {
    match world.controls.solver {
        SolverKind::Piso => piso::run(world, text, observer),
        SolverKind::Diffusion => diffusion::run(world, text, observer),
        SolverKind::Transport => transport::run(world, text, observer),
        SolverKind::Potential => potential::run(world, text, observer),
    }
}

/// 步头日志（rank 0）
pub(crate) fn log_step(world: &World, step: usize) {
    if world.is_root() {
        if world.controls.steady() {
            log::info!("Step {}", step);
        } else {
            log::info!("Time {:.6}", step as Scalar * world.controls.dt);
        }
    }
}
