//! `Decoder` trait.
//!
//! 宿主调度器面向的 send/receive 接口. 非低延迟 MPEG-4 码流有一帧的重排序
//! 延迟, 因此送入一个包不一定能立刻取出一帧.

use m4v_core::M4vResult;

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::frame::Frame;
use crate::packet::Packet;

/// 解码器
///
/// 调用顺序:
/// 1. `open()` 提供带外配置 (VOL 头) 与运行参数
/// 2. `send_packet()` 按码流顺序送入数据
/// 3. `receive_frame()` 取出显示顺序的图像, 直到 `NeedMoreData`
/// 4. 码流结束时送入空包, 再取出持有的最后一个参考帧, 直到 `Eof`
pub trait Decoder: Send {
    fn codec_id(&self) -> CodecId;

    fn name(&self) -> &str;

    /// 配置解码器, 未打开时 `send_packet` 报错
    fn open(&mut self, params: &CodecParameters) -> M4vResult<()>;

    /// 送入一个包; 空包表示码流结束
    fn send_packet(&mut self, packet: &Packet) -> M4vResult<()>;

    /// 取出一帧
    ///
    /// 没有可取的帧时返回 `NeedMoreData`, 刷新后取尽返回 `Eof`.
    fn receive_frame(&mut self) -> M4vResult<Frame>;

    /// seek 后丢弃参考帧与待取帧, 保留序列参数
    fn flush(&mut self);
}
