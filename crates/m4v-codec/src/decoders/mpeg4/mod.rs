//! MPEG-4 Part 2 视频解码器
//!
//! 实现 MPEG-4 Part 2 (ISO/IEC 14496-2) Simple / Advanced Simple Profile 解码.
//!
//! 已实现:
//! - VOS/VO/VOL/GOV/VOP 头部解析, 用户数据中的 DivX/XviD 版本识别
//! - I/P/S/B-VOP 宏块解码 (B 帧支持 Direct/Forward/Backward/Interpolate)
//! - AC/DC 预测, H.263 与 MPEG 两种反量化, 整数 IDCT
//! - 半像素与四分之一像素运动补偿, GMC (S-VOP)
//! - 降分辨率 (RRV) 帧
//! - 视频包重同步与宏块级错误隐藏
//! - B 帧重排序与 packed 码流兼容输出
//!
//! ## 模块结构
//!
//! - `types`: 宏块信息, 运动向量, 序列参数, 帧头
//! - `tables`: 量化矩阵, 扫描表, VLC 表
//! - `vlc`: VLC 解码函数
//! - `header`: 头部解析状态机
//! - `block`: 8x8 块系数解码与宏块重建
//! - `predict`: AC/DC 预测, 运动向量预测
//! - `dequant` / `idct`: 反量化与反变换
//! - `interp` / `motion` / `gmc` / `rrv`: 运动补偿
//! - `picture` / `refs`: 图像缓冲与参考帧轮换
//! - `frame_decode` / `bframe`: 帧级宏块循环
//! - `packet_io`: `Decoder` trait 适配

mod bframe;
mod block;
mod dequant;
mod frame_decode;
mod gmc;
mod header;
mod idct;
mod interp;
mod motion;
mod packet_io;
mod picture;
mod predict;
mod refs;
mod rrv;
pub mod synth;
mod tables;
mod types;
mod vlc;

use std::collections::VecDeque;

use log::{debug, trace, warn};
use m4v_core::bitreader::BitReader;
use m4v_core::{M4vError, M4vResult, Rational};

use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink, NoopSink, OutputDecision};
use crate::frame::{PictureType, VideoFrame};
use crate::options::{DecodeFlags, DecoderOptions, SUPPORTED_BITSTREAM_VERSION};

use header::HeaderParser;
use refs::ReferencePool;
use types::{FrameHeader, HeaderEvent, MacroblockInfo, MbGrid};

pub use types::{CodingType, SequenceParams, SpriteMode};

/// 单字节 `0x7f` 包: VfW 封装的 XviD/DivX5 AVI 中的占位帧
const VFW_PLACEHOLDER: u8 = 0x7f;

/// 亮度平面四周的填充宽度
pub const EDGE_PADDING_LUMA: usize = picture::EDGE_LUMA;
/// 色度平面四周的填充宽度
pub const EDGE_PADDING_CHROMA: usize = picture::EDGE_CHROMA;
/// 图像缓冲数 (当前帧与两个参考帧)
pub const PICTURE_POOL_SIZE: usize = refs::POOL_SIZE;

// ============================================================================
// 解码结果
// ============================================================================

/// VOL 声明的图层信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerInfo {
    pub width: u32,
    pub height: u32,
    pub sample_aspect_ratio: Rational,
}

/// 单次解码的输出
#[derive(Debug, Clone)]
pub enum DecodeOutcome {
    /// 一帧显示顺序上的图像
    Picture(VideoFrame),
    /// 暂无可输出的图像 (缓冲中或数据不含图像)
    Nothing,
}

impl DecodeOutcome {
    pub fn picture(&self) -> Option<&VideoFrame> {
        match self {
            Self::Picture(frame) => Some(frame),
            Self::Nothing => None,
        }
    }

    pub fn into_picture(self) -> Option<VideoFrame> {
        match self {
            Self::Picture(frame) => Some(frame),
            Self::Nothing => None,
        }
    }
}

/// [`Mpeg4Decoder::decode`] 的返回值
#[derive(Debug, Clone)]
pub struct Decoded {
    pub outcome: DecodeOutcome,
    /// 已消耗的字节数, 调用方应从该位置继续提交剩余数据
    pub consumed: usize,
    /// 本次调用中 VOL 改变了图像尺寸
    pub layer_change: Option<LayerInfo>,
}

/// 输出来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputSource {
    /// 当前重建缓冲
    Current,
    /// 最新参考帧
    Reference,
}

// ============================================================================
// Mpeg4Decoder 结构体
// ============================================================================

/// MPEG-4 Part 2 视频解码器
///
/// 每次 [`decode`](Self::decode) 最多输出一帧. 非低延迟码流中 I/P 帧延后一帧
/// 输出, 码流结束时用 [`flush`](Self::flush) 取出最后一个参考帧.
pub struct Mpeg4Decoder {
    options: DecoderOptions,
    parser: HeaderParser,
    pool: Option<ReferencePool>,
    /// 当前帧的宏块信息
    mbs: Vec<MacroblockInfo>,
    /// 上一个非 B 帧的宏块信息 (B 帧直接模式的共位宏块)
    last_mbs: Vec<MacroblockInfo>,
    /// 已解码的图像数, 用于判断参考帧是否有效
    frames: u32,
    /// 最新参考帧的图片类型
    last_picture_type: PictureType,
    diag: Box<dyn DiagnosticsSink>,
    /// `Decoder` trait 的待取帧
    pending: VecDeque<VideoFrame>,
    /// 已收到刷新包
    draining: bool,
    opened: bool,
}

impl std::fmt::Debug for Mpeg4Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mpeg4Decoder")
            .field("options", &self.options)
            .field("width", &self.parser.seq.width)
            .field("height", &self.parser.seq.height)
            .field("frames", &self.frames)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Default for Mpeg4Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Mpeg4Decoder {
    /// 以默认参数创建
    pub fn new() -> Self {
        Self::build(DecoderOptions::default())
    }

    /// 以指定参数创建, 码流版本不符时报 `VersionMismatch`
    pub fn with_options(options: DecoderOptions) -> M4vResult<Self> {
        check_version(&options)?;
        Ok(Self::build(options))
    }

    fn build(options: DecoderOptions) -> Self {
        let mut decoder = Self {
            parser: HeaderParser::new(options.low_delay_default, options.fixed_dimensions()),
            options,
            pool: None,
            mbs: Vec::new(),
            last_mbs: Vec::new(),
            frames: 0,
            last_picture_type: PictureType::None,
            diag: Box::new(NoopSink),
            pending: VecDeque::new(),
            draining: false,
            opened: false,
        };
        // 固定尺寸时无需等待 VOL
        if decoder.options.fixed_dimensions().is_some() {
            decoder.allocate();
        }
        decoder
    }

    /// 替换诊断事件接收端
    pub fn set_diagnostics(&mut self, sink: Box<dyn DiagnosticsSink>) {
        self.diag = sink;
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// 当前序列参数 (VOL 之前为默认值)
    pub fn sequence(&self) -> &SequenceParams {
        &self.parser.seq
    }

    /// 已知的图像尺寸
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let seq = &self.parser.seq;
        (seq.width > 0 && seq.height > 0).then_some((seq.width, seq.height))
    }

    /// 码流是否为 DivX packed 模式
    pub fn is_packed(&self) -> bool {
        self.parser.packed_mode
    }

    fn layer_info(&self) -> LayerInfo {
        let seq = &self.parser.seq;
        LayerInfo {
            width: seq.width,
            height: seq.height,
            sample_aspect_ratio: sample_aspect(seq),
        }
    }

    /// 按当前序列尺寸分配图像缓冲与宏块信息
    fn allocate(&mut self) {
        let seq = &self.parser.seq;
        debug!(
            "分配图像缓冲: {}x{} ({}x{} 宏块)",
            seq.width, seq.height, seq.mb_width, seq.mb_height
        );
        self.pool = Some(ReferencePool::new(seq.mb_width, seq.mb_height));
        self.mbs = vec![MacroblockInfo::default(); seq.mb_count()];
        self.last_mbs = vec![MacroblockInfo::default(); seq.mb_count()];
    }

    // ========================================================================
    // 生命周期
    // ========================================================================

    /// 解析带外的解码器配置 (VOS/VO/VOL 头)
    ///
    /// 配置中的图像头只被解析, 不会解码.
    pub fn attach(&mut self, config: &[u8]) -> M4vResult<Option<LayerInfo>> {
        check_version(&self.options)?;
        let mut reader = BitReader::new(config);
        let mut layer = None;
        loop {
            match self.parser.read_headers(&mut reader, self.diag.as_mut())? {
                HeaderEvent::Nothing => break,
                HeaderEvent::LayerChange { .. } => {
                    self.allocate();
                    layer = Some(self.layer_info());
                }
                HeaderEvent::Layer => {
                    if self.pool.is_none() {
                        self.allocate();
                    }
                    layer = Some(self.layer_info());
                }
                HeaderEvent::Picture(header) => {
                    debug!("配置数据中含 {:?}-VOP 头, 忽略", header.coding_type);
                    break;
                }
            }
        }
        self.opened = true;
        Ok(layer)
    }

    /// 丢弃序列与参考帧状态, 回到刚创建时的样子
    pub fn detach(&mut self) {
        debug!("解码器分离");
        let options = self.options.clone();
        let diag = std::mem::replace(&mut self.diag, Box::new(NoopSink));
        *self = Self::build(options);
        self.diag = diag;
    }

    /// 保留序列参数, 丢弃参考帧 (seek 后使用)
    pub fn reset(&mut self) {
        debug!("解码器重置参考帧");
        if self.pool.is_some() {
            self.allocate();
        }
        self.frames = 0;
        self.last_picture_type = PictureType::None;
        self.pending.clear();
        self.draining = false;
    }

    // ========================================================================
    // 解码入口
    // ========================================================================

    /// 码流结束: 取出仍持有的参考帧
    pub fn flush(&mut self, flags: DecodeFlags) -> DecodeOutcome {
        let low_delay_default = self.low_delay_default(flags);
        if flags.contains(DecodeFlags::DISCONTINUITY) {
            self.frames = 0;
        }
        if !(low_delay_default && self.parser.packed_mode) && !self.parser.seq.low_delay && self.frames > 0 {
            if let Some(frame) = self.snapshot(OutputSource::Reference, self.last_picture_type) {
                self.frames = 0;
                self.diag.event(&DiagnosticEvent::Output(OutputDecision::HeldReference));
                return DecodeOutcome::Picture(frame);
            }
        }
        self.diag.event(&DiagnosticEvent::Output(OutputDecision::Nothing));
        DecodeOutcome::Nothing
    }

    /// 解码一段码流, 最多输出一帧
    pub fn decode(&mut self, data: &[u8], flags: DecodeFlags) -> M4vResult<Decoded> {
        check_version(&self.options)?;
        let low_delay_default = self.low_delay_default(flags);
        self.parser.low_delay_default = low_delay_default;
        if flags.contains(DecodeFlags::DISCONTINUITY) {
            debug!("码流不连续, 参考帧计数清零");
            self.frames = 0;
        }

        if low_delay_default && data.len() == 1 && data[0] == VFW_PLACEHOLDER {
            trace!("跳过 0x7f 占位包");
            return Ok(Decoded {
                outcome: DecodeOutcome::Nothing,
                consumed: 1,
                layer_change: None,
            });
        }

        let mut reader = BitReader::new(data);
        let mut layer_change = None;
        let mut output: Option<VideoFrame> = None;
        let mut retried = false;
        let mut seen_picture = false;

        loop {
            let header = match self.parser.read_headers(&mut reader, self.diag.as_mut())? {
                HeaderEvent::Nothing => {
                    if retried {
                        break;
                    }
                    return Ok(Decoded {
                        outcome: DecodeOutcome::Nothing,
                        consumed: consumed_bytes(&reader, data),
                        layer_change,
                    });
                }
                HeaderEvent::LayerChange { width, height } => {
                    debug!("图像尺寸变为 {}x{}", width, height);
                    self.allocate();
                    layer_change = Some(self.layer_info());
                    continue;
                }
                HeaderEvent::Layer => {
                    if self.pool.is_none() {
                        self.allocate();
                    }
                    continue;
                }
                HeaderEvent::Picture(header) => header,
            };

            if self.pool.is_none() {
                return Err(M4vError::InvalidHeaderField("VOP 之前没有 VOL".into()));
            }

            let (frame, reference_picture) = self.decode_picture(&mut reader, &header, low_delay_default)?;
            output = frame;
            seen_picture |= reference_picture;

            reader.align_to_byte();

            // packed 码流中 P 帧之后紧跟 B 帧, 再解析一次以取得输出
            if low_delay_default && self.parser.packed_mode && output.is_none() && !retried {
                retried = true;
                continue;
            }
            break;
        }

        if low_delay_default && output.is_none() && self.parser.packed_mode && seen_picture {
            output = self.snapshot(OutputSource::Reference, self.last_picture_type);
            if output.is_some() {
                self.diag.event(&DiagnosticEvent::Output(OutputDecision::HeldReference));
            }
        }

        let outcome = match output {
            Some(frame) => DecodeOutcome::Picture(frame),
            None => {
                self.diag.event(&DiagnosticEvent::Output(OutputDecision::Nothing));
                DecodeOutcome::Nothing
            }
        };
        Ok(Decoded {
            outcome,
            consumed: consumed_bytes(&reader, data),
            layer_change,
        })
    }

    fn low_delay_default(&self, flags: DecodeFlags) -> bool {
        self.options.low_delay_default || flags.contains(DecodeFlags::LOW_DELAY)
    }

    /// 解码一个图像并按重排序规则决定输出
    ///
    /// 返回 (输出帧, 是否解码了非 B 图像).
    fn decode_picture(
        &mut self,
        reader: &mut BitReader,
        header: &FrameHeader,
        low_delay_default: bool,
    ) -> M4vResult<(Option<VideoFrame>, bool)> {
        let packed = self.parser.packed_mode;

        match header.coding_type {
            CodingType::NotCoded if packed => {
                // packed 码流的 N-VOP 只是占位, 输出由它触发
                if low_delay_default && self.frames > 0 {
                    let frame = self.snapshot(OutputSource::Reference, self.last_picture_type);
                    self.diag.event(&DiagnosticEvent::Output(OutputDecision::HeldReference));
                    return Ok((frame, false));
                }
                trace!("packed 码流的 N-VOP, 忽略");
                Ok((None, false))
            }
            CodingType::Bidirectional => self.finish_b_picture(reader, header).map(|frame| (frame, false)),
            _ => self
                .finish_reference_picture(reader, header, low_delay_default)
                .map(|frame| (frame, true)),
        }
    }

    fn finish_reference_picture(
        &mut self,
        reader: &mut BitReader,
        header: &FrameHeader,
        low_delay_default: bool,
    ) -> M4vResult<Option<VideoFrame>> {
        if header.coding_type == CodingType::NotCoded {
            let (cur, ref0, _) = self.pool_mut()?.split()?;
            cur.copy_from(ref0);
        } else {
            self.decode_reference_picture(reader, header)?;
        }

        let seq = &self.parser.seq;
        let (width, height, bs_version) = (seq.width, seq.height, self.parser.bs_version);
        let grid = MbGrid::for_picture(seq, header.reduced_resolution);
        let pool = self
            .pool
            .as_mut()
            .ok_or_else(|| M4vError::Internal("图像缓冲未分配".into()))?;
        if header.reduced_resolution {
            rrv::deblock(pool.current_mut(), &self.mbs, grid);
        }
        pool.current_mut().set_edges(width, height, bs_version);

        let picture_type = header.coding_type.picture_type();
        let mut output = None;
        if !(low_delay_default && self.parser.packed_mode) {
            if self.parser.seq.low_delay {
                output = self.snapshot(OutputSource::Current, picture_type);
                self.diag.event(&DiagnosticEvent::Output(OutputDecision::Current));
            } else if self.frames > 0 {
                output = self.snapshot(OutputSource::Reference, self.last_picture_type);
                self.diag.event(&DiagnosticEvent::Output(OutputDecision::PreviousReference));
            }
        }

        self.pool_mut()?.rotate();
        std::mem::swap(&mut self.mbs, &mut self.last_mbs);
        self.last_picture_type = picture_type;
        self.frames += 1;
        Ok(output)
    }

    fn finish_b_picture(&mut self, reader: &mut BitReader, header: &FrameHeader) -> M4vResult<Option<VideoFrame>> {
        if self.parser.seq.low_delay {
            warn!("low_delay 码流中出现 B-VOP");
        }

        let (time_pp, time_bp) = (self.parser.time_pp, self.parser.time_bp);
        if self.frames < 2 || time_pp <= time_bp {
            warn!(
                "B-VOP 无法解码: 参考帧 {} 个, time_pp {} time_bp {}",
                self.frames, time_pp, time_bp
            );
            self.diag.event(&DiagnosticEvent::BrokenBPicture {
                references: self.frames,
                time_pp,
                time_bp,
            });
            self.pool_mut()?.current_mut().clear();
        } else {
            self.decode_b_picture(reader, header)?;
        }

        let frame = self.snapshot(OutputSource::Current, PictureType::B);
        self.diag.event(&DiagnosticEvent::Output(OutputDecision::Current));
        self.frames += 1;
        Ok(frame)
    }

    fn pool_mut(&mut self) -> M4vResult<&mut ReferencePool> {
        self.pool
            .as_mut()
            .ok_or_else(|| M4vError::Internal("图像缓冲未分配".into()))
    }

    /// 把缓冲裁剪成输出帧
    fn snapshot(&self, source: OutputSource, picture_type: PictureType) -> Option<VideoFrame> {
        let pool = self.pool.as_ref()?;
        let seq = &self.parser.seq;
        let picture = match source {
            OutputSource::Current => pool.current(),
            OutputSource::Reference => pool.newer(),
        };
        let mut frame = picture.to_video_frame(seq.width, seq.height, picture_type, sample_aspect(seq));
        frame.time_base = Rational::from_time_resolution(seq.time_inc_resolution);
        Some(frame)
    }
}

fn check_version(options: &DecoderOptions) -> M4vResult<()> {
    if options.bitstream_version != SUPPORTED_BITSTREAM_VERSION {
        return Err(M4vError::VersionMismatch {
            expected: SUPPORTED_BITSTREAM_VERSION,
            found: options.bitstream_version,
        });
    }
    Ok(())
}

fn sample_aspect(seq: &SequenceParams) -> Rational {
    let (w, h) = seq.pixel_aspect();
    Rational::new(w as i32, h as i32).reduce()
}

fn consumed_bytes(reader: &BitReader, data: &[u8]) -> usize {
    ((reader.bit_position() / 8) as usize).min(data.len())
}
