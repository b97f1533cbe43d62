// crates/fv_core/src/lib.rs

//! FvFlow 基础层
//!
//! 提供整个项目共享的底层构件：
//! - 张量代数 (tensor)：Scalar / Vector / Tensor / STensor 值类型及其运算
//! - 强类型索引 (index)：CellIndex / FaceIndex
//! - 基础错误类型 (error)
//!
//! 本 crate 是 Layer 1，不依赖项目内任何其他 crate。

pub mod error;
pub mod index;
pub mod tensor;

pub use error::{CoreError, Result};
pub use index::{CellIndex, FaceIndex, INVALID_INDEX};
pub use tensor::{FieldValue, STensor, Scalar, Tensor, Vector};
