//! 把解码器诊断事件转发到 `tracing`.

use m4v_codec::diagnostics::{DiagnosticEvent, DiagnosticsSink};
use tracing::{debug, trace, warn};

/// 以结构化字段记录诊断事件
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn event(&mut self, event: &DiagnosticEvent) {
        match event {
            DiagnosticEvent::HeaderParsed(kind) => trace!(kind = ?kind, "解析头部"),
            DiagnosticEvent::Unsupported(what) => warn!(what = %what, "不支持的语法"),
            DiagnosticEvent::ResyncMarker { mb_index } => debug!(mb_index = *mb_index, "视频包重同步"),
            DiagnosticEvent::MacroblockConcealed { mb_index, error } => {
                warn!(mb_index = *mb_index, error = %error, "宏块已隐藏")
            }
            DiagnosticEvent::BrokenBPicture {
                references,
                time_pp,
                time_bp,
            } => warn!(
                references = *references,
                time_pp = *time_pp,
                time_bp = *time_bp,
                "B 帧无法解码"
            ),
            DiagnosticEvent::Output(decision) => trace!(decision = ?decision, "输出决策"),
        }
    }
}
