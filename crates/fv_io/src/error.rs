// crates/fv_io/src/error.rs

//! 输出层错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 输出错误
#[derive(Debug, Error)]
pub enum IoError {
    /// 文件写出失败
    #[error("写出失败 {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IoError {
    /// 创建写出错误
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
