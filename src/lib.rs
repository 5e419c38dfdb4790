//! # m4v
//!
//! 纯 Rust 实现的 MPEG-4 Part 2 (Simple / Advanced Simple Profile) 视频解码器.
//!
//! # 快速开始
//!
//! ```rust
//! use m4v::codec::decoders::mpeg4::synth::StreamBuilder;
//! use m4v::codec::{DecodeFlags, Mpeg4Decoder};
//!
//! let mut builder = StreamBuilder::new(32, 32).low_delay(true);
//! let data = builder.vol().intra_vop(0, 100).take();
//!
//! let mut decoder = Mpeg4Decoder::new();
//! let decoded = decoder.decode(&data, DecodeFlags::empty()).unwrap();
//! let frame = decoded.outcome.picture().unwrap();
//! assert_eq!((frame.width, frame.height), (32, 32));
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `m4v-core` | 比特流读写, 错误类型, 基础数值类型 |
//! | `m4v-codec` | 解码框架与 MPEG-4 Part 2 解码器 |

/// 核心类型与工具
pub use m4v_core as core;

/// 解码框架与解码器
pub use m4v_codec as codec;

pub mod config;
pub mod logging;
pub mod tracing_sink;

pub use tracing_sink::TracingSink;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置解码器的注册表
pub fn default_codec_registry() -> m4v_codec::CodecRegistry {
    let mut registry = m4v_codec::CodecRegistry::new();
    m4v_codec::register_all(&mut registry);
    registry
}

/// 按配置创建解码器, 诊断事件转发到 `tracing`
pub fn decoder_from_config(config: &config::M4vConfig) -> m4v_core::M4vResult<m4v_codec::Mpeg4Decoder> {
    let mut decoder = m4v_codec::Mpeg4Decoder::with_options(config.decoder.clone())?;
    decoder.set_diagnostics(Box::new(TracingSink));
    Ok(decoder)
}
