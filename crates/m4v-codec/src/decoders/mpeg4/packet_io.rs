//! `Decoder` trait 适配
//!
//! 把 [`Mpeg4Decoder::decode`] 的 "一次调用最多一帧" 模型转换成
//! send_packet / receive_frame 模型. 一个包可能含多个 VOP (packed 码流),
//! 这里按 `consumed` 循环提交剩余数据.

use log::debug;
use m4v_core::{M4vError, M4vResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::decoder::Decoder;
use crate::diagnostics::NoopSink;
use crate::frame::Frame;
use crate::options::DecodeFlags;
use crate::packet::{NOPTS_VALUE, Packet};

use super::{DecodeOutcome, Mpeg4Decoder};

impl Mpeg4Decoder {
    /// 注册表使用的工厂函数
    pub fn create() -> M4vResult<Box<dyn Decoder>> {
        Ok(Box::new(Self::new()))
    }

    /// 提交整个包, 把输出帧放入待取队列
    fn push_packet(&mut self, packet: &Packet) -> M4vResult<()> {
        let data = &packet.data[..];
        let mut offset = 0;
        let mut flags = if packet.discontinuity {
            DecodeFlags::DISCONTINUITY
        } else {
            DecodeFlags::empty()
        };

        while offset < data.len() {
            let decoded = self.decode(&data[offset..], flags)?;
            flags.remove(DecodeFlags::DISCONTINUITY);
            if let Some(layer) = decoded.layer_change {
                debug!("图层变化: {}x{}", layer.width, layer.height);
            }
            if let DecodeOutcome::Picture(mut frame) = decoded.outcome {
                // 低延迟码流按解码顺序输出, 时间戳可直接沿用
                if frame.pts == NOPTS_VALUE && packet.pts != NOPTS_VALUE && self.parser.seq.low_delay {
                    frame.pts = match packet.time_base.rescale(packet.pts, frame.time_base) {
                        Some(pts) => pts,
                        None => {
                            frame.time_base = packet.time_base;
                            packet.pts
                        }
                    };
                }
                self.pending.push_back(frame);
            }
            if decoded.consumed == 0 {
                break;
            }
            offset += decoded.consumed;
        }
        Ok(())
    }
}

impl Decoder for Mpeg4Decoder {
    fn codec_id(&self) -> CodecId {
        CodecId::Mpeg4
    }

    fn name(&self) -> &str {
        "mpeg4"
    }

    fn open(&mut self, params: &CodecParameters) -> M4vResult<()> {
        if params.codec_id != CodecId::Mpeg4 {
            return Err(M4vError::InvalidArgument(format!(
                "MPEG4 解码器不接受 {:?}",
                params.codec_id
            )));
        }
        let mut decoder = Self::with_options(params.options.clone())?;
        decoder.diag = std::mem::replace(&mut self.diag, Box::new(NoopSink));
        *self = decoder;

        if !params.extra_data.is_empty() {
            if let Some(layer) = self.attach(&params.extra_data)? {
                debug!("打开 MPEG4 解码器: {}x{}", layer.width, layer.height);
            }
        }
        self.opened = true;
        Ok(())
    }

    fn send_packet(&mut self, packet: &Packet) -> M4vResult<()> {
        if !self.opened {
            return Err(M4vError::Codec("解码器未打开".into()));
        }
        if packet.is_empty() {
            debug!("收到刷新信号");
            if let DecodeOutcome::Picture(frame) = self.flush(DecodeFlags::empty()) {
                self.pending.push_back(frame);
            }
            self.draining = true;
            return Ok(());
        }
        self.draining = false;
        self.push_packet(packet)
    }

    fn receive_frame(&mut self) -> M4vResult<Frame> {
        match self.pending.pop_front() {
            Some(frame) => Ok(Frame::Video(frame)),
            None if self.draining => Err(M4vError::Eof),
            None => Err(M4vError::NeedMoreData),
        }
    }

    fn flush(&mut self) {
        self.reset();
    }
}
