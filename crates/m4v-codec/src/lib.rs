//! # m4v-codec
//!
//! MPEG-4 Part 2 视频解码器与解码框架, 提供 Packet/Frame 抽象、`Decoder` trait、
//! 解码器注册表、诊断事件与宿主插件边界.
//!
//! ## 使用示例
//!
//! ```rust
//! use m4v_codec::{CodecId, CodecRegistry};
//!
//! let mut reg = CodecRegistry::new();
//! m4v_codec::register_all(&mut reg);
//!
//! let decoder = reg.create_decoder(CodecId::Mpeg4).unwrap();
//! assert_eq!(decoder.name(), "mpeg4");
//! ```

pub mod codec_id;
pub mod codec_parameters;
pub mod decoder;
pub mod decoders;
pub mod diagnostics;
pub mod frame;
pub mod options;
pub mod packet;
pub mod plugin;
pub mod registry;

// 重导出常用类型
pub use codec_id::CodecId;
pub use codec_parameters::CodecParameters;
pub use decoder::Decoder;
pub use decoders::mpeg4::{DecodeOutcome, Decoded, LayerInfo, Mpeg4Decoder};
pub use diagnostics::{DiagnosticEvent, DiagnosticsSink, HeaderKind, LogSink, NoopSink, OutputDecision};
pub use frame::{Frame, PictureType, VideoFrame};
pub use options::{DecodeFlags, DecoderOptions};
pub use packet::Packet;
pub use plugin::{CapabilityTable, ProbeResult};
pub use registry::CodecRegistry;

/// 注册所有内置解码器
pub fn register_all(registry: &mut CodecRegistry) {
    decoders::register_all_decoders(registry);
}
