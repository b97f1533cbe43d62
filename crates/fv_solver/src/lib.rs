// crates/fv_solver/src/lib.rs

//! FvFlow 求解器核心
//!
//! 同位网格有限体积离散与分离式求解：
//! - 场容器与场代数 (field)
//! - 进程间通信门面 (comm) - halo 交换与全局归约
//! - 边界条件 (boundary)
//! - 稀疏算子矩阵 (matrix) - 对角 + 每面两侧系数 + 源项
//! - 微分算子 (ops) - grad / div / flx / lap / ddt
//! - Krylov 迭代求解 (solve) - PCG / BiCGStab，DIAG / DILU / SOR 预条件
//! - 湍流闭合 (turbulence) - NONE / MIXING_LENGTH / KE 族 / KW / LES
//! - 耦合驱动 (drivers) - PISO / 扩散 / 输运 / 势流 / 壁面距离
//!
//! # 数据流
//!
//! 算子读取场与网格，装配 [`matrix::MeshMatrix`]；[`solve::solve`]
//! 迭代求解；驱动把二者组织为时间推进循环。[`world::World`]
//! 显式携带网格、控制参数、边界条件登记表与通信门面。

pub mod boundary;
pub mod comm;
pub mod drivers;
pub mod error;
pub mod field;
pub mod matrix;
pub mod ops;
pub mod solve;
pub mod turbulence;
pub mod world;

pub use boundary::{BCondition, BcKind, BcRegistry};
pub use comm::{Comm, SerialComm};
pub use error::SolverError;
pub use field::{Access, Field, FieldKind};
pub use matrix::MeshMatrix;
pub use solve::{solve, SolverResult, SolverStatus};
pub use world::World;
