// crates/fv_config/src/lib.rs

//! FvFlow 配置层
//!
//! 控制文件为嵌套块文本格式：
//!
//! ```text
//! general {
//!     solver piso
//!     mesh cavity
//!     state TRANSIENT
//!     dt 0.001
//!     gravity 0 0 -9.81
//! }
//! piso {
//!     turbulence_model KE
//!     n_PISO 2
//! }
//! ```
//!
//! 解析是类型驱动的：每个块持有 键 → 类型标签 的登记表
//! ([`params::Schema`])，值的 token 数由类型决定。未知键记录
//! `UNKNOWN` 后忽略，未知枚举值回退到 0 号变体并告警，均不致命。

pub mod controls;
pub mod error;
pub mod params;

pub use controls::{
    Controls, ConvectionScheme, GeneralProps, Method, NonOrthoScheme, ParallelMethod,
    Preconditioner, SolverKind, State, TimeScheme, TurbulenceKind,
};
pub use error::ConfigError;
pub use params::{ControlsText, Schema, TypeTag, Value};
