//! 解码器注册表.
//!
//! 宿主按 `CodecId` 或名称取得 `Decoder` 实例, 不直接依赖具体解码器类型.

use log::debug;
use m4v_core::{M4vError, M4vResult};

use crate::codec_id::CodecId;
use crate::decoder::Decoder;

/// 解码器工厂函数
pub type DecoderFactory = fn() -> M4vResult<Box<dyn Decoder>>;

#[derive(Clone, Copy)]
struct Entry {
    codec_id: CodecId,
    name: &'static str,
    factory: DecoderFactory,
}

/// 解码器注册表
///
/// 同一 `CodecId` 可注册多个实现, 先注册的优先.
#[derive(Default)]
pub struct CodecRegistry {
    entries: Vec<Entry>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_decoder(&mut self, codec_id: CodecId, name: &'static str, factory: DecoderFactory) {
        debug!("注册解码器 {} ({})", name, codec_id);
        self.entries.push(Entry {
            codec_id,
            name,
            factory,
        });
    }

    pub fn create_decoder(&self, codec_id: CodecId) -> M4vResult<Box<dyn Decoder>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.codec_id == codec_id)
            .ok_or_else(|| M4vError::CodecNotFound(format!("未找到 {} 的解码器", codec_id)))?;
        (entry.factory)()
    }

    /// 按解码器名称创建, 例如 `"mpeg4"`
    pub fn create_decoder_by_name(&self, name: &str) -> M4vResult<Box<dyn Decoder>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| M4vError::CodecNotFound(format!("未找到名为 {} 的解码器", name)))?;
        (entry.factory)()
    }

    /// 已注册的 (标识, 名称), 按注册顺序
    pub fn list_decoders(&self) -> Vec<(CodecId, &'static str)> {
        self.entries.iter().map(|e| (e.codec_id, e.name)).collect()
    }
}
