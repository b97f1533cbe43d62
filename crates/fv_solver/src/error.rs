// crates/fv_solver/src/error.rs

//! 求解器错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 求解器错误
#[derive(Debug, Error)]
pub enum SolverError {
    /// 网格错误
    #[error(transparent)]
    Mesh(#[from] fv_mesh::MeshError),

    /// 配置错误
    #[error(transparent)]
    Config(#[from] fv_config::ConfigError),

    /// 请求步的场文件缺失（致命中止）
    #[error("场文件缺失: {0}")]
    FieldFileMissing(PathBuf),

    /// 场文件格式错误
    #[error("场文件格式错误 {path}: {reason}")]
    FieldFormat { path: PathBuf, reason: String },

    /// 场写出失败
    #[error("场写出失败 {path}: {source}")]
    FieldWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 场与网格尺寸不匹配
    #[error("场尺寸不匹配: 期望 {expected}, 实际 {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// 分布式通信失败（集体中止）
    #[error("通信失败: {0}")]
    Comm(String),
}

impl SolverError {
    /// 创建场格式错误
    pub fn field_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FieldFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
