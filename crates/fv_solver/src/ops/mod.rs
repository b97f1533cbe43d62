// crates/fv_solver/src/ops/mod.rs

//! 微分算子
//!
//! 每个算子要么返回场（grad / div / flx），要么返回装配好的
//! [`crate::matrix::MeshMatrix`]（div 矩阵形式 / lap / ddt）。
//!
//! # 装配约定
//!
//! 求解的系统为 `(ap+sp)·x − Σ an·x_opp = Su (+ 右端)`。
//! 高阶格式与非正交修正的显式部分以延迟修正方式并入 `Su`，
//! 由外层迭代收敛。装配循环一律按面编号升序，单元内按网格
//! 存储顺序访问面，保证残差序列可复现。

pub mod convection;
pub mod diffusion;
pub mod gradient;
pub mod temporal;

pub use convection::div_matrix;
pub use diffusion::lap;
pub use gradient::{div, face_value, fill_boundary_values, flx, grad, grad_vec, gradv};
pub use temporal::{ddt, ddt_rk_stage, rk_coeffs, TimeHistory};
