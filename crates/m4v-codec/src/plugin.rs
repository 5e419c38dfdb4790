//! 插件边界.
//!
//! 宿主调度器在创建解码器之前用 [`probe`] 判断能否处理一路码流,
//! 用 [`capabilities`] 查询输出格式与缓冲需求.

use log::debug;
use m4v_core::{M4vError, PixelFormat};

use crate::codec_id::CodecId;
use crate::decoders::mpeg4::{EDGE_PADDING_CHROMA, EDGE_PADDING_LUMA, Mpeg4Decoder, PICTURE_POOL_SIZE};

/// 探测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// 可以解码
    Supported,
    /// 编解码器或码流特性不支持
    NotSupported,
    /// 编解码器匹配, 但配置数据中没有 VOL
    NeedsConfig,
}

/// 解码器能力表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityTable {
    pub output_format: PixelFormat,
    /// 亮度平面四周的填充像素
    pub edge_padding_luma: usize,
    pub edge_padding_chroma: usize,
    /// 平面宽高按该值对齐
    pub alignment: usize,
    /// B 帧需要的参考帧数
    pub min_reference_buffers: usize,
    /// 解码器内部持有的图像缓冲数
    pub pool_size: usize,
    /// 非低延迟码流的输出延迟 (帧)
    pub reorder_delay: usize,
}

/// 判断能否解码 `codec_id` 码流
///
/// `decoder_config` 为带外配置 (VOS/VO/VOL 头), 以临时解码器解析.
pub fn probe(codec_id: CodecId, decoder_config: &[u8]) -> ProbeResult {
    if codec_id != CodecId::Mpeg4 {
        return ProbeResult::NotSupported;
    }
    if decoder_config.is_empty() {
        return ProbeResult::NeedsConfig;
    }

    let mut decoder = Mpeg4Decoder::new();
    match decoder.attach(decoder_config) {
        Ok(Some(layer)) => {
            debug!("探测成功: {}x{}", layer.width, layer.height);
            ProbeResult::Supported
        }
        Ok(None) => ProbeResult::NeedsConfig,
        Err(M4vError::UnsupportedFeature(feature)) => {
            debug!("探测失败, 不支持的特性: {}", feature);
            ProbeResult::NotSupported
        }
        Err(e) => {
            debug!("探测失败: {}", e);
            ProbeResult::NotSupported
        }
    }
}

/// 查询解码器能力
pub fn capabilities() -> CapabilityTable {
    CapabilityTable {
        output_format: PixelFormat::Yuv420p,
        edge_padding_luma: EDGE_PADDING_LUMA,
        edge_padding_chroma: EDGE_PADDING_CHROMA,
        alignment: 16,
        min_reference_buffers: 2,
        pool_size: PICTURE_POOL_SIZE,
        reorder_delay: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::mpeg4::synth::StreamBuilder;

    #[test]
    fn test_探测() {
        let mut builder = StreamBuilder::new(176, 144);
        let config = builder.vol().take();

        assert_eq!(probe(CodecId::Mpeg4, &config), ProbeResult::Supported);
        assert_eq!(probe(CodecId::Mpeg4, &[]), ProbeResult::NeedsConfig);
        assert_eq!(probe(CodecId::None, &config), ProbeResult::NotSupported);
        // 只有图像头, 没有 VOL
        let vop_only = builder.intra_vop(0, 100).take();
        assert_eq!(probe(CodecId::Mpeg4, &vop_only), ProbeResult::NeedsConfig);
    }

    #[test]
    fn test_能力表() {
        let caps = capabilities();
        assert_eq!(caps.output_format, PixelFormat::Yuv420p);
        assert_eq!(caps.edge_padding_luma, 32);
        assert_eq!(caps.edge_padding_chroma, 16);
        assert_eq!(caps.pool_size, 3);
        assert!(caps.min_reference_buffers < caps.pool_size);
    }
}
