// crates/fv_solver/src/boundary/mod.rs

//! 边界条件
//!
//! - [`types`]: 边界条件类型与登记表
//! - [`ghost`]: 幽灵单元赋值与 halo 交换
//!
//! 边界条件由场文件的 boundary 块建立，登记表以
//! (场名, 边界片名) 为键持有；场本身不拥有边界条件。
//! `init_indices` 之后不再修改。

pub mod ghost;
pub mod types;

pub use ghost::update_explicit_bcs;
pub use types::{BCondition, BcKind, BcRegistry, BcSpec, BcValue};
