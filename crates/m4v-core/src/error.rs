//! 统一错误类型定义.
//!
//! 解码器各层共用的错误类型. 码流相关的错误分为截断、非法系数、非法运动矢量、
//! 非法头字段、未支持特性和版本不匹配六类, 其余为框架层错误.

use thiserror::Error;

/// m4v 统一错误类型
#[derive(Debug, Error)]
pub enum M4vError {
    /// 比特流在读取途中耗尽
    #[error("码流截断: 需要 {needed} 位, 剩余 {remaining} 位")]
    TruncatedStream {
        /// 本次读取需要的位数
        needed: u64,
        /// 读取前剩余的位数
        remaining: u64,
    },

    /// 系数 VLC 无法匹配, 或游程越过 8x8 块
    #[error("非法系数: {0}")]
    InvalidCoefficient(String),

    /// 运动矢量 VLC 无法匹配或超出范围
    #[error("非法运动矢量: {0}")]
    InvalidMotionVector(String),

    /// 头字段取值不合法 (如宽高为 0, 非视频对象类型)
    #[error("非法头字段: {0}")]
    InvalidHeaderField(String),

    /// 语法合法但未实现的特性 (非矩形形状, 可伸缩编码等)
    #[error("未支持的特性: {0}")]
    UnsupportedFeature(String),

    /// 调用方给出的配置与码流版本不兼容
    #[error("版本不匹配: 期望 {expected}, 实际 {found}")]
    VersionMismatch {
        /// 支持的主版本号
        expected: u32,
        /// 调用方给出的主版本号
        found: u32,
    },

    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 编解码器错误
    #[error("编解码器错误: {0}")]
    Codec(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 未找到指定的编解码器
    #[error("未找到编解码器: {0}")]
    CodecNotFound(String),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

impl M4vError {
    /// 是否可以在宏块内部就地恢复 (当前宏块按跳过处理后继续)
    pub fn is_macroblock_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TruncatedStream { .. } | Self::InvalidCoefficient(_) | Self::InvalidMotionVector(_)
        )
    }

    /// 是否必须上报给调用方 (不能静默恢复)
    pub fn is_fatal_for_stream(&self) -> bool {
        matches!(
            self,
            Self::InvalidHeaderField(_) | Self::UnsupportedFeature(_) | Self::VersionMismatch { .. }
        )
    }
}

/// m4v 统一 Result 类型
pub type M4vResult<T> = Result<T, M4vError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_宏块级可恢复分类() {
        let truncated = M4vError::TruncatedStream {
            needed: 12,
            remaining: 3,
        };
        assert!(truncated.is_macroblock_recoverable());
        assert!(M4vError::InvalidCoefficient("游程越界".into()).is_macroblock_recoverable());
        assert!(M4vError::InvalidMotionVector("vlc".into()).is_macroblock_recoverable());
        assert!(!M4vError::InvalidHeaderField("宽度为 0".into()).is_macroblock_recoverable());
        assert!(!M4vError::UnsupportedFeature("shape".into()).is_macroblock_recoverable());
    }

    #[test]
    fn test_必须上报的错误() {
        assert!(M4vError::InvalidHeaderField("h".into()).is_fatal_for_stream());
        assert!(
            M4vError::VersionMismatch {
                expected: 1,
                found: 2
            }
            .is_fatal_for_stream()
        );
        assert!(!M4vError::Eof.is_fatal_for_stream());
    }

    #[test]
    fn test_错误信息格式() {
        let err = M4vError::TruncatedStream {
            needed: 8,
            remaining: 2,
        };
        assert_eq!(err.to_string(), "码流截断: 需要 8 位, 剩余 2 位");
    }
}
