//! 压缩数据包 (Packet).
//!
//! 容器交给解码器的一段基本流数据. packed 码流中一个包可能含多个 VOP,
//! 空包表示码流结束.

use bytes::Bytes;
use m4v_core::Rational;

/// 未知时间戳
pub const NOPTS_VALUE: i64 = i64::MIN;

/// 压缩数据包
#[derive(Debug, Clone)]
pub struct Packet {
    pub data: Bytes,
    /// 显示时间戳, 单位为 `time_base`
    pub pts: i64,
    pub time_base: Rational,
    /// 与前一个包之间存在断点 (seek 或丢包), 解码器不再信任已持有的参考帧
    pub discontinuity: bool,
}

impl Packet {
    /// 刷新包
    pub fn empty() -> Self {
        Self::from_data(Bytes::new())
    }

    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pts: NOPTS_VALUE,
            time_base: Rational::UNDEFINED,
            discontinuity: false,
        }
    }

    /// 附带时间戳
    pub fn with_pts(mut self, pts: i64, time_base: Rational) -> Self {
        self.pts = pts;
        self.time_base = time_base;
        self
    }

    /// 标记断点
    pub fn with_discontinuity(mut self) -> Self {
        self.discontinuity = true;
        self
    }

    /// 是否为刷新包
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
