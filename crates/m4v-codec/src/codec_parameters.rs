//! 编解码器参数.
//!
//! 容器打开解码器时提供的配置: 编解码器标识、带外解码器配置
//! (MPEG-4 中为 VOS/VO/VOL 头) 以及解码器运行参数.

use crate::codec_id::CodecId;
use crate::options::DecoderOptions;

/// 编解码器参数
#[derive(Debug, Clone, Default)]
pub struct CodecParameters {
    pub codec_id: CodecId,
    /// 带外解码器配置, 可以为空 (VOL 随码流到达)
    pub extra_data: Vec<u8>,
    pub options: DecoderOptions,
}

impl CodecParameters {
    pub fn new(codec_id: CodecId, extra_data: impl Into<Vec<u8>>) -> Self {
        Self {
            codec_id,
            extra_data: extra_data.into(),
            options: DecoderOptions::default(),
        }
    }

    /// 按容器 FourCC 构造, 未识别的 FourCC 得到 `CodecId::None`
    pub fn from_fourcc(fourcc: &[u8; 4], extra_data: impl Into<Vec<u8>>) -> Self {
        Self::new(CodecId::from_fourcc(fourcc), extra_data)
    }

    pub fn with_options(mut self, options: DecoderOptions) -> Self {
        self.options = options;
        self
    }
}
