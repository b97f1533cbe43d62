// crates/fv_mesh/src/error.rs

//! 网格层错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 网格错误
#[derive(Debug, Error)]
pub enum MeshError {
    /// 网格目录不存在（启动时以退出码 1 终止）
    #[error("网格目录不存在: {0}")]
    DirectoryMissing(PathBuf),

    /// 网格文件读取失败
    #[error("网格文件读取失败 {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 网格文件格式错误
    #[error("网格文件格式错误: {0}")]
    Format(String),

    /// 拓扑不一致
    #[error("网格拓扑不一致: {0}")]
    Topology(String),
}

impl MeshError {
    /// 创建格式错误
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// 创建拓扑错误
    pub fn topology(msg: impl Into<String>) -> Self {
        Self::Topology(msg.into())
    }
}

impl From<fv_core::CoreError> for MeshError {
    fn from(e: fv_core::CoreError) -> Self {
        Self::Format(e.to_string())
    }
}
