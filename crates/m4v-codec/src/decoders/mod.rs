//! 解码器实现模块.

pub mod mpeg4;

use crate::codec_id::CodecId;
use crate::registry::CodecRegistry;

/// 注册所有内置解码器
pub fn register_all_decoders(registry: &mut CodecRegistry) {
    registry.register_decoder(CodecId::Mpeg4, "mpeg4", mpeg4::Mpeg4Decoder::create);
}
