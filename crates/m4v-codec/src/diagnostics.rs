//! 解码诊断事件.
//!
//! 解码器实例持有一个 [`DiagnosticsSink`], 在解析头部、重同步、宏块隐藏和
//! 输出决策时发送事件. 默认实现 [`NoopSink`] 丢弃所有事件, [`LogSink`]
//! 转发到 `log` 门面.

use log::{debug, warn};

/// 头部类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    VisualObjectSequence,
    VisualObjectSequenceEnd,
    VisualObject,
    VideoObject,
    VideoObjectLayer,
    GroupOfVop,
    UserData,
    Vop,
}

/// 输出决策
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDecision {
    /// 输出刚解码的图像 (低延迟或 B 帧)
    Current,
    /// 输出上一个参考帧 (重排序)
    PreviousReference,
    /// 刷新或 packed 模式下输出持有的参考帧
    HeldReference,
    /// 无可输出
    Nothing,
}

/// 诊断事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// 解析到一个头部
    HeaderParsed(HeaderKind),
    /// 码流使用了未实现或被忽略的语法
    Unsupported(String),
    /// 在宏块 `mb_index` 处遇到重同步标记
    ResyncMarker { mb_index: usize },
    /// 宏块解码失败, 按跳过处理
    MacroblockConcealed { mb_index: usize, error: String },
    /// B 帧缺少参考或时间距离非法, 以清空图像输出
    BrokenBPicture { references: u32, time_pp: i32, time_bp: i32 },
    /// 输出决策
    Output(OutputDecision),
}

/// 诊断事件接收端
pub trait DiagnosticsSink: Send {
    fn event(&mut self, event: &DiagnosticEvent);
}

/// 丢弃所有事件
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticsSink for NoopSink {
    fn event(&mut self, _event: &DiagnosticEvent) {}
}

/// 把事件转发到 `log`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn event(&mut self, event: &DiagnosticEvent) {
        match event {
            DiagnosticEvent::Unsupported(_)
            | DiagnosticEvent::MacroblockConcealed { .. }
            | DiagnosticEvent::BrokenBPicture { .. } => warn!("诊断: {:?}", event),
            _ => debug!("诊断: {:?}", event),
        }
    }
}

/// 可共享的收集端, 解码器持有 sink 时调用方仍可读取事件
#[derive(Debug, Default, Clone)]
pub struct SharedCollector {
    inner: std::sync::Arc<std::sync::Mutex<Vec<DiagnosticEvent>>>,
}

impl SharedCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出目前收集到的全部事件
    pub fn take(&self) -> Vec<DiagnosticEvent> {
        match self.inner.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl DiagnosticsSink for SharedCollector {
    fn event(&mut self, event: &DiagnosticEvent) {
        match self.inner.lock() {
            Ok(mut guard) => guard.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_共享收集端() {
        let collector = SharedCollector::new();
        let mut sink: Box<dyn DiagnosticsSink> = Box::new(collector.clone());
        sink.event(&DiagnosticEvent::ResyncMarker { mb_index: 3 });
        sink.event(&DiagnosticEvent::Output(OutputDecision::Nothing));
        let events = collector.take();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], DiagnosticEvent::ResyncMarker { mb_index: 3 });
        assert!(collector.take().is_empty(), "take 之后应清空");
    }

    #[test]
    fn test_空接收端与日志接收端() {
        let mut noop = NoopSink;
        noop.event(&DiagnosticEvent::HeaderParsed(HeaderKind::Vop));
        let mut log_sink = LogSink;
        log_sink.event(&DiagnosticEvent::Unsupported("obmc".into()));
    }
}
