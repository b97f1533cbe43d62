// crates/fv_io/src/observer.rs

//! 驱动步输出观察者
//!
//! 组合探针记录与 VTK 导出：每步末追加探针瞬时值，
//! 写出步生成 `out<io_step>.vtk`。输出失败记录告警但不
//! 打断求解循环。

use fv_solver::drivers::{StepFields, StepObserver};
use fv_solver::world::World;

use crate::probe::ProbeWriter;
use crate::vtk::write_vtk;

/// 算例输出观察者
pub struct CaseObserver {
    probes: ProbeWriter,
    write_vtk: bool,
}

impl CaseObserver {
    /// 由 World 的控制参数组装
    pub fn new(world: &World) -> Self {
        Self {
            probes: ProbeWriter::new(&world.mesh, &world.controls.probe, world.mesh_dir()),
            write_vtk: true,
        }
    }

    /// 关闭 VTK 导出（测试用）
    pub fn without_vtk(mut self) -> Self {
        self.write_vtk = false;
        self
    }
}

impl StepObserver for CaseObserver {
    fn end_step(&mut self, _world: &World, step: usize, fields: &StepFields<'_>) {
        if !self.probes.is_active() {
            return;
        }
        for &(name, field) in &fields.vectors {
            if let Err(e) = self.probes.record(name, step, |c| field[c]) {
                log::warn!("探针记录失败: {}", e);
            }
        }
        for &(name, field) in &fields.scalars {
            if let Err(e) = self.probes.record(name, step, |c| field[c]) {
                log::warn!("探针记录失败: {}", e);
            }
        }
    }

    fn write(&mut self, world: &World, io_step: usize, fields: &StepFields<'_>) {
        if !self.write_vtk {
            return;
        }
        if let Err(e) = write_vtk(world, io_step, fields) {
            log::warn!("VTK 写出失败: {}", e);
        }
    }
}
