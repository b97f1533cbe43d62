// crates/fv_solver/src/world.rs

//! World 上下文
//!
//! 网格、控制参数、边界条件登记表与通信门面的显式集合，
//! 由驱动逐层传递，不设进程级全局量。网格与控制参数在
//! 时间推进循环内只读；登记表在场读入阶段填充。
//!
//! `terminated` 是驱动循环每步检查的终止旗标（信号处理器
//! 等外部钩子置位后，当前步结束即退出）。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use fv_config::Controls;
use fv_mesh::Mesh;

use crate::boundary::{update_explicit_bcs, BcRegistry, BcValue};
use crate::comm::Comm;
use crate::field::Field;
use crate::matrix::MeshMatrix;
use crate::solve::{self, SolverResult};
use crate::SolverError;

/// 进程上下文
pub struct World {
    /// 网格（加载后不可变）
    pub mesh: Mesh,
    /// 控制参数（加载后只读）
    pub controls: Controls,
    /// 边界条件登记表
    pub bcs: BcRegistry,
    /// 通信门面
    pub comm: Box<dyn Comm>,
    /// 网格目录（场文件所在）
    pub mesh_dir: PathBuf,
    /// 终止旗标
    pub terminated: AtomicBool,
}

impl World {
    /// 组装上下文
    pub fn new(
        mesh: Mesh,
        controls: Controls,
        comm: Box<dyn Comm>,
        mesh_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mesh,
            controls,
            bcs: BcRegistry::new(),
            comm,
            mesh_dir: mesh_dir.into(),
            terminated: AtomicBool::new(false),
        }
    }

    /// 是否已请求终止
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Relaxed)
    }

    /// 本进程是否 rank 0（驱动的步日志只在此打印）
    #[inline]
    pub fn is_root(&self) -> bool {
        self.comm.host_id() == 0
    }

    /// 刷新场的幽灵单元（边界条件 + halo 交换）
    pub fn update_bcs<T: BcValue>(&self, field: &mut Field<T>, do_fluctuations: bool) {
        update_explicit_bcs(
            field,
            &self.mesh,
            &self.bcs,
            self.comm.as_ref(),
            true,
            do_fluctuations,
        );
    }

    /// `Solve(M)`：右端在 Su
    pub fn solve<T: BcValue>(&self, m: &MeshMatrix<T>, x: &mut Field<T>) -> SolverResult {
        solve::solve(
            &self.mesh,
            &self.controls,
            self.comm.as_ref(),
            &self.bcs,
            m,
            None,
            x,
        )
    }

    /// `Solve(M == rhs)`：附加单元场右端
    pub fn solve_eq<T: BcValue>(
        &self,
        m: &MeshMatrix<T>,
        rhs: &Field<T>,
        x: &mut Field<T>,
    ) -> SolverResult {
        solve::solve(
            &self.mesh,
            &self.controls,
            self.comm.as_ref(),
            &self.bcs,
            m,
            Some(rhs),
            x,
        )
    }

    /// 读入场文件并登记其边界条件
    pub fn read_field<T: BcValue>(
        &mut self,
        field: &mut Field<T>,
        step: usize,
    ) -> Result<(), SolverError> {
        let specs = field.read_file(&self.mesh_dir, step, &self.mesh)?;
        let name = field.name.clone().unwrap_or_default();
        self.bcs.enroll_field::<T>(&name, specs, &self.mesh);
        Ok(())
    }

    /// 写出场文件（带上已登记的边界条件）
    pub fn write_field<T: BcValue>(
        &self,
        field: &Field<T>,
        step: usize,
    ) -> Result<(), SolverError> {
        let name = field.name.as_deref().unwrap_or_default();
        let specs: Vec<_> = self
            .bcs
            .of::<T>(name)
            .iter()
            .map(|bc| bc.to_spec())
            .collect();
        field.write_file(&self.mesh_dir, step, &self.mesh, &specs)
    }

    /// 网格目录路径
    pub fn mesh_dir(&self) -> &Path {
        &self.mesh_dir
    }
}
