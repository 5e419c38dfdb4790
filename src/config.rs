//! JSON 配置.
//!
//! 一份配置同时描述日志与解码器参数, 缺省字段取默认值:
//!
//! ```json
//! {
//!   "logging": { "level": "info", "directory": "logs", "file_prefix": "m4v" },
//!   "decoder": { "low_delay_default": false, "bitstream_version": 1 }
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use m4v_codec::DecoderOptions;
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// 进程级配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct M4vConfig {
    pub logging: LoggingConfig,
    pub decoder: DecoderOptions,
}

impl M4vConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("解析 JSON 配置失败")
    }

    /// 从文件读取
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("读取配置文件失败, path={}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("配置文件无效, path={}", path.display()))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("序列化配置失败")
    }
}
