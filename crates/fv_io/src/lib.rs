// crates/fv_io/src/lib.rs

//! FvFlow 输出层
//!
//! - [`vtk`]: legacy VTK 导出（非结构化网格 + 单元数据）
//! - [`probe`]: 探针点瞬时值记录（`Ui` / `pi` 文件）
//! - [`observer`]: 把二者组合为驱动的步输出观察者
//!
//! 文件每 rank 打开一次，进程退出时随 Drop 关闭。

pub mod error;
pub mod observer;
pub mod probe;
pub mod vtk;

pub use error::IoError;
pub use observer::CaseObserver;
pub use probe::ProbeWriter;
pub use vtk::write_vtk;
