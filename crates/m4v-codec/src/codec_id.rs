//! 编解码器标识.
//!
//! 解码器框架只识别 MPEG-4 Part 2 视频, 其余标识一律视为不支持.

use std::fmt;

/// 编解码器标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CodecId {
    /// 未知 / 未指定
    #[default]
    None,
    /// MPEG-4 Part 2 Visual (Simple / Advanced Simple Profile)
    Mpeg4,
}

/// 常见容器中 MPEG-4 Part 2 码流使用的 FourCC
const MPEG4_FOURCCS: &[&[u8; 4]] = &[
    b"XVID", b"xvid", b"DIVX", b"divx", b"DX50", b"dx50", b"FMP4", b"fmp4", b"MP4V", b"mp4v",
    b"3IV2", b"3iv2",
];

impl CodecId {
    /// 根据容器 FourCC 识别编解码器
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Self {
        if MPEG4_FOURCCS.iter().any(|f| *f == fourcc) {
            Self::Mpeg4
        } else {
            Self::None
        }
    }

    /// 获取编解码器的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mpeg4 => "mpeg4",
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_识别() {
        assert_eq!(CodecId::from_fourcc(b"XVID"), CodecId::Mpeg4);
        assert_eq!(CodecId::from_fourcc(b"DX50"), CodecId::Mpeg4);
        assert_eq!(CodecId::from_fourcc(b"H264"), CodecId::None);
        assert_eq!(CodecId::Mpeg4.to_string(), "mpeg4");
    }
}
