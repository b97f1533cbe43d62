// crates/fv_core/src/error.rs

//! 基础错误类型
//!
//! 仅包含与基础设施相关的错误（IO、解析、索引），
//! 高层错误（网格、求解器、配置）由各自 crate 定义并可转换到这里。

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型别名
pub type Result<T> = std::result::Result<T, CoreError>;

/// 基础错误
#[derive(Debug, Error)]
pub enum CoreError {
    /// IO 错误（附带路径上下文）
    #[error("IO 错误 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 数值解析错误
    #[error("解析失败: {0}")]
    Parse(String),

    /// 索引越界
    #[error("索引越界: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// 无效输入
    #[error("无效输入: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// 创建带路径上下文的 IO 错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 创建解析错误
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// 创建无效输入错误
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
