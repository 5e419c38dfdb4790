//! 解码器运行参数.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// 支持的码流/API 主版本号
pub const SUPPORTED_BITSTREAM_VERSION: u32 = 1;

/// 解码器运行参数
///
/// 可由 JSON 配置反序列化, 缺省字段取默认值.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// 宿主的 "低延迟" 通用标志, VOL 未声明 low_delay 时作为默认值
    pub low_delay_default: bool,
    /// 固定输出宽度, VOL 声明不同尺寸时报错
    pub fixed_width: Option<u32>,
    /// 固定输出高度
    pub fixed_height: Option<u32>,
    /// 调用方的码流主版本号
    pub bitstream_version: u32,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            low_delay_default: false,
            fixed_width: None,
            fixed_height: None,
            bitstream_version: SUPPORTED_BITSTREAM_VERSION,
        }
    }
}

impl DecoderOptions {
    /// 固定尺寸 (两者都给出时才生效)
    pub fn fixed_dimensions(&self) -> Option<(u32, u32)> {
        match (self.fixed_width, self.fixed_height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }
}

bitflags! {
    /// 单次提交的标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DecodeFlags: u32 {
        /// 本次调用按低延迟处理
        const LOW_DELAY = 0x1;
        /// 码流不连续, 参考帧计数清零
        const DISCONTINUITY = 0x2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_默认参数() {
        let opts = DecoderOptions::default();
        assert!(!opts.low_delay_default);
        assert_eq!(opts.bitstream_version, 1);
        assert_eq!(opts.fixed_dimensions(), None);
    }

    #[test]
    fn test_固定尺寸需要两项() {
        let opts = DecoderOptions {
            fixed_width: Some(176),
            ..Default::default()
        };
        assert_eq!(opts.fixed_dimensions(), None);
        let opts = DecoderOptions {
            fixed_width: Some(176),
            fixed_height: Some(144),
            ..Default::default()
        };
        assert_eq!(opts.fixed_dimensions(), Some((176, 144)));
    }

    #[test]
    fn test_标志组合() {
        let flags = DecodeFlags::LOW_DELAY | DecodeFlags::DISCONTINUITY;
        assert!(flags.contains(DecodeFlags::DISCONTINUITY));
        assert!(!DecodeFlags::empty().contains(DecodeFlags::LOW_DELAY));
    }
}
