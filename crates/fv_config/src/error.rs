// crates/fv_config/src/error.rs

//! 配置层错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 配置错误
///
/// 仅结构性错误（文件不可读、括号不配对）是错误；
/// 未知键与未知枚举值按规约记录日志后忽略。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 控制文件读取失败
    #[error("控制文件读取失败 {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 块结构错误（括号不配对等）
    #[error("控制文件结构错误: {0}")]
    Structure(String),

    /// 值解析失败
    #[error("键 '{key}' 的值解析失败: {reason}")]
    BadValue { key: String, reason: String },
}

impl ConfigError {
    /// 创建结构错误
    pub fn structure(msg: impl Into<String>) -> Self {
        Self::Structure(msg.into())
    }

    /// 创建值错误
    pub fn bad_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
