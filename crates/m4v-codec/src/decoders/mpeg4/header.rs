//! 起始码扫描与 VOS/VO/VOL/GOV/VOP/用户数据/视频包头解析
//!
//! `HeaderParser` 反复对齐到字节边界并窥视 32 位作为起始码候选, 识别后分派;
//! 无法识别的字节每次只跳过 8 位. 只有 VOP 头和 VOL 头会把控制交还给调用方.

use log::{debug, trace, warn};
use m4v_core::bitreader::BitReader;
use m4v_core::{M4vError, M4vResult};

use super::tables::{INTRA_DC_THRESHOLD_TABLE, ZIGZAG_SCAN};
use super::types::*;
use super::vlc::decode_sprite_trajectory_len;
use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink, HeaderKind};

// ============================================================================
// 起始码
// ============================================================================

pub(super) const VISOBJSEQ_START_CODE: u32 = 0x0000_01B0;
pub(super) const VISOBJSEQ_STOP_CODE: u32 = 0x0000_01B1;
pub(super) const USERDATA_START_CODE: u32 = 0x0000_01B2;
pub(super) const GRPOFVOP_START_CODE: u32 = 0x0000_01B3;
pub(super) const VISOBJ_START_CODE: u32 = 0x0000_01B5;
pub(super) const VOP_START_CODE: u32 = 0x0000_01B6;
pub(super) const VIDOBJ_START_CODE: u32 = 0x0000_0100;
pub(super) const VIDOBJLAY_START_CODE: u32 = 0x0000_0120;

const VIDOBJ_START_CODE_MASK: u32 = 0x1F;
const VIDOBJLAY_START_CODE_MASK: u32 = 0x0F;

const VISOBJ_TYPE_VIDEO: u32 = 1;
const VIDOBJLAY_AR_EXTPAR: u32 = 15;
const VIDOBJLAY_SHAPE_RECTANGULAR: u32 = 0;

/// 视频包重同步标记的基础长度 (16 个 0 加 1 个 1)
pub(super) const NUMBITS_VP_RESYNC_MARKER: u32 = 17;

/// 表示 `v` 需要的位数, `log2bin(0) == 0`
pub(super) fn log2bin(mut v: u32) -> u32 {
    let mut n = 0;
    while v != 0 {
        v >>= 1;
        n += 1;
    }
    n
}

fn read_marker(reader: &mut BitReader, what: &str) -> M4vResult<()> {
    if !reader.read_bit()? {
        trace!("marker 位为 0: {}", what);
    }
    Ok(())
}

/// 读取自定义量化矩阵 (zig-zag 顺序, 值 0 结束并以前一个值填满)
fn read_quant_matrix(reader: &mut BitReader) -> M4vResult<[u8; 64]> {
    let mut matrix = [0u8; 64];
    let mut i = 0;
    let mut last;
    let mut value = 0u8;
    loop {
        last = value;
        value = reader.read_bits(8)? as u8;
        matrix[ZIGZAG_SCAN[i]] = value;
        i += 1;
        if value == 0 || i >= 64 {
            break;
        }
    }
    // 最后读到的值若为 0, 从该位置起用前一个值填充
    if value == 0 {
        i -= 1;
    }
    while i < 64 {
        matrix[ZIGZAG_SCAN[i]] = last;
        i += 1;
    }
    Ok(matrix)
}

// ============================================================================
// 视频包头
// ============================================================================

/// 视频包头中 header_extension_code 携带的字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct HeaderExtension {
    pub intra_dc_threshold: u32,
    pub fcode_forward: Option<u32>,
    pub fcode_backward: Option<u32>,
}

/// 视频包头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct VideoPacketHeader {
    /// 包内第一个宏块的线性序号
    pub mb_number: usize,
    pub quant: u32,
    pub extension: Option<HeaderExtension>,
}

/// 检查当前位置 (跳过填充位后) 是否为视频包重同步标记
///
/// 填充位形如 `0111..`, 之后是 `16 + addbits` 个 0 与 1 个 1.
pub(super) fn check_resync_marker(reader: &BitReader, addbits: u32) -> bool {
    let nbits = reader.bits_to_byte_align();
    let code = reader.show_bits(nbits);
    if code == (1 << (nbits - 1)) - 1 {
        return reader.show_bits_from_byte_align(NUMBITS_VP_RESYNC_MARKER + addbits) == 1;
    }
    false
}

// ============================================================================
// HeaderParser
// ============================================================================

/// 头部解析器, 持有序列参数与 VOP 计时状态
#[derive(Debug, Clone)]
pub(super) struct HeaderParser {
    pub seq: SequenceParams,
    /// 是否已解析过 VOL
    pub has_layer: bool,
    pub profile: u32,
    pub video_signal: Option<VideoSignal>,
    pub gov: Option<GovInfo>,
    /// DivX packed 码流
    pub packed_mode: bool,
    /// XviD 编码器版本 (用户数据)
    pub bs_version: Option<i32>,
    pub low_delay_default: bool,
    pub fixed_dimensions: Option<(u32, u32)>,
    time_base: i32,
    last_time_base: i32,
    time: i32,
    last_non_b_time: i32,
    /// 两个参考帧之间的时间距离
    pub time_pp: i32,
    /// 后向参考到当前 B 帧的时间距离
    pub time_bp: i32,
}

impl HeaderParser {
    pub(super) fn new(low_delay_default: bool, fixed_dimensions: Option<(u32, u32)>) -> Self {
        let mut seq = SequenceParams::default();
        seq.low_delay = low_delay_default;
        if let Some((w, h)) = fixed_dimensions {
            seq.width = w;
            seq.height = h;
            seq.mb_width = (w as usize).div_ceil(16);
            seq.mb_height = (h as usize).div_ceil(16);
        }
        Self {
            seq,
            has_layer: false,
            profile: 0,
            video_signal: None,
            gov: None,
            packed_mode: false,
            bs_version: None,
            low_delay_default,
            fixed_dimensions,
            time_base: 0,
            last_time_base: 0,
            time: 0,
            last_non_b_time: 0,
            time_pp: 0,
            time_bp: 0,
        }
    }

    /// 扫描并解析头部, 直到 VOP 头、VOL 头或数据耗尽
    pub(super) fn read_headers(
        &mut self,
        reader: &mut BitReader,
        diag: &mut dyn DiagnosticsSink,
    ) -> M4vResult<HeaderEvent> {
        let len = reader.data().len();
        while reader.byte_position() < len {
            reader.align_to_byte();
            let start_code = reader.show_bits(32);

            match start_code {
                VISOBJSEQ_START_CODE => {
                    reader.consume(32)?;
                    self.profile = reader.read_bits(8)?;
                    debug!("VOS: profile_and_level_indication = {}", self.profile);
                    diag.event(&DiagnosticEvent::HeaderParsed(HeaderKind::VisualObjectSequence));
                }
                VISOBJSEQ_STOP_CODE => {
                    reader.consume(32)?;
                    debug!("VOS 结束");
                    diag.event(&DiagnosticEvent::HeaderParsed(HeaderKind::VisualObjectSequenceEnd));
                }
                VISOBJ_START_CODE => {
                    reader.consume(32)?;
                    self.read_visual_object(reader)?;
                    diag.event(&DiagnosticEvent::HeaderParsed(HeaderKind::VisualObject));
                }
                GRPOFVOP_START_CODE => {
                    reader.consume(32)?;
                    self.read_gov(reader)?;
                    diag.event(&DiagnosticEvent::HeaderParsed(HeaderKind::GroupOfVop));
                }
                VOP_START_CODE => {
                    reader.consume(32)?;
                    let header = self.read_vop(reader)?;
                    diag.event(&DiagnosticEvent::HeaderParsed(HeaderKind::Vop));
                    return Ok(HeaderEvent::Picture(header));
                }
                USERDATA_START_CODE => {
                    reader.consume(32)?;
                    self.read_user_data(reader)?;
                    diag.event(&DiagnosticEvent::HeaderParsed(HeaderKind::UserData));
                }
                _ if start_code & !VIDOBJ_START_CODE_MASK == VIDOBJ_START_CODE => {
                    debug!("VO id {}", start_code & VIDOBJ_START_CODE_MASK);
                    reader.consume(32)?;
                    diag.event(&DiagnosticEvent::HeaderParsed(HeaderKind::VideoObject));
                }
                _ if start_code & !VIDOBJLAY_START_CODE_MASK == VIDOBJLAY_START_CODE => {
                    debug!("VOL id {}", start_code & VIDOBJLAY_START_CODE_MASK);
                    reader.consume(32)?;
                    let resized = self.read_vol(reader, diag)?;
                    diag.event(&DiagnosticEvent::HeaderParsed(HeaderKind::VideoObjectLayer));
                    return Ok(if resized {
                        HeaderEvent::LayerChange {
                            width: self.seq.width,
                            height: self.seq.height,
                        }
                    } else {
                        HeaderEvent::Layer
                    });
                }
                _ => {
                    if start_code & 0xFFFF_FF00 == 0x0000_0100 {
                        trace!("未知起始码 0x{:08X}", start_code);
                    }
                    reader.consume(8)?;
                }
            }
        }
        Ok(HeaderEvent::Nothing)
    }

    fn read_visual_object(&mut self, reader: &mut BitReader) -> M4vResult<()> {
        if reader.read_bit()? {
            let ver_id = reader.read_bits(4)?;
            reader.consume(3)?; // visual_object_priority
            debug!("VO: visual_object_ver_id = {}", ver_id);
        }

        let object_type = reader.show_bits(4);
        if object_type != VISOBJ_TYPE_VIDEO {
            return Err(M4vError::InvalidHeaderField(format!(
                "visual_object_type = {}, 不是视频",
                object_type
            )));
        }
        reader.consume(4)?;

        if reader.read_bit()? {
            let mut signal = VideoSignal {
                video_format: reader.read_bits(3)?,
                full_range: reader.read_bit()?,
                ..Default::default()
            };
            if reader.read_bit()? {
                signal.colour_primaries = reader.read_bits(8)?;
                signal.transfer_characteristics = reader.read_bits(8)?;
                signal.matrix_coefficients = reader.read_bits(8)?;
            }
            debug!("VO: video_signal_type {:?}", signal);
            self.video_signal = Some(signal);
        }
        Ok(())
    }

    fn read_gov(&mut self, reader: &mut BitReader) -> M4vResult<()> {
        let hours = reader.read_bits(5)?;
        let minutes = reader.read_bits(6)?;
        read_marker(reader, "gov")?;
        let seconds = reader.read_bits(6)?;
        let closed_gov = reader.read_bit()?;
        let broken_link = reader.read_bit()?;
        debug!(
            "GOV: {:02}:{:02}:{:02} closed={} broken={}",
            hours, minutes, seconds, closed_gov, broken_link
        );
        self.gov = Some(GovInfo {
            hours,
            minutes,
            seconds,
            closed_gov,
            broken_link,
        });
        Ok(())
    }

    fn read_user_data(&mut self, reader: &mut BitReader) -> M4vResult<()> {
        let mut text = Vec::with_capacity(32);
        text.push(reader.show_bits(8) as u8);
        for _ in 1..256 {
            let c = (reader.show_bits(16) & 0xFF) as u8;
            if c == 0 {
                break;
            }
            text.push(c);
            reader.consume(8)?;
        }
        let text = String::from_utf8_lossy(&text).into_owned();
        trace!("用户数据: {:?}", text);

        if let Some(rest) = text.strip_prefix("XviD") {
            if let Some((version, _)) = scan_int(rest) {
                debug!("XviD 码流版本 {}", version);
                self.bs_version = Some(version);
            }
        }

        if let Some(rest) = text.strip_prefix("DivX") {
            let mut matched = scan_divx(rest, "Build");
            if matched.0 < 2 {
                matched = scan_divx(rest, "b");
            }
            let (count, packed) = matched;
            if count >= 2 {
                self.packed_mode = count == 3 && packed == Some('p');
                debug!("DivX 用户数据, packed = {}", self.packed_mode);
            }
        }
        Ok(())
    }

    /// 解析 VOL 头, 返回尺寸是否变化
    fn read_vol(&mut self, reader: &mut BitReader, diag: &mut dyn DiagnosticsSink) -> M4vResult<bool> {
        let mut seq = self.seq.clone();

        reader.consume(1)?; // random_accessible_vol
        reader.consume(8)?; // video_object_type_indication

        if reader.read_bit()? {
            seq.ver_id = reader.read_bits(4)?;
            reader.consume(3)?; // video_object_layer_priority
        } else {
            seq.ver_id = 1;
        }

        seq.aspect_ratio = reader.read_bits(4)?;
        if seq.aspect_ratio == VIDOBJLAY_AR_EXTPAR {
            seq.par_width = reader.read_bits(8)?;
            seq.par_height = reader.read_bits(8)?;
        }

        if reader.read_bit()? {
            reader.consume(2)?; // chroma_format
            seq.low_delay = reader.read_bit()?;
            if reader.read_bit()? {
                // vbv_parameters
                let mut bitrate = reader.read_bits(15)? << 15;
                read_marker(reader, "first_half_bit_rate")?;
                bitrate |= reader.read_bits(15)?;
                read_marker(reader, "latter_half_bit_rate")?;
                let mut buffer_size = reader.read_bits(15)? << 3;
                read_marker(reader, "first_half_vbv_buffer_size")?;
                buffer_size |= reader.read_bits(3)?;
                let mut occupancy = reader.read_bits(11)? << 15;
                read_marker(reader, "first_half_vbv_occupancy")?;
                occupancy |= reader.read_bits(15)?;
                read_marker(reader, "latter_half_vbv_occupancy")?;
                debug!(
                    "VOL: vbv bitrate={} buffer={} occupancy={}",
                    bitrate, buffer_size, occupancy
                );
            }
        } else {
            seq.low_delay = self.low_delay_default;
        }

        seq.shape = reader.read_bits(2)?;
        if seq.shape != VIDOBJLAY_SHAPE_RECTANGULAR {
            return Err(M4vError::UnsupportedFeature(format!(
                "非矩形形状 (shape = {})",
                seq.shape
            )));
        }

        read_marker(reader, "vol")?;
        seq.time_inc_resolution = reader.read_bits(16)?;
        seq.time_inc_bits = if seq.time_inc_resolution > 0 {
            log2bin(seq.time_inc_resolution - 1).max(1)
        } else {
            1
        };
        read_marker(reader, "time_inc_resolution")?;

        if reader.read_bit()? {
            reader.consume(seq.time_inc_bits)?; // fixed_vop_time_increment
        }

        read_marker(reader, "width")?;
        let width = reader.read_bits(13)?;
        read_marker(reader, "height")?;
        let height = reader.read_bits(13)?;
        read_marker(reader, "height end")?;
        if width == 0 || height == 0 {
            return Err(M4vError::InvalidHeaderField(format!(
                "VOL 尺寸非法: {}x{}",
                width, height
            )));
        }

        let mut resized = false;
        if width != seq.width || height != seq.height || !self.has_layer {
            if let Some((fw, fh)) = self.fixed_dimensions {
                if fw != width || fh != height {
                    return Err(M4vError::InvalidHeaderField(format!(
                        "VOL 尺寸 {}x{} 与固定尺寸 {}x{} 不符",
                        width, height, fw, fh
                    )));
                }
            }
            resized = width != seq.width || height != seq.height;
            seq.width = width;
            seq.height = height;
            seq.mb_width = (width as usize).div_ceil(16);
            seq.mb_height = (height as usize).div_ceil(16);
        }

        seq.interlacing = reader.read_bit()?;
        if !reader.read_bit()? {
            warn!("obmc_disable = 0, 重叠运动补偿未支持");
            diag.event(&DiagnosticEvent::Unsupported("obmc".into()));
        }

        let sprite_bits = if seq.ver_id == 1 { 1 } else { 2 };
        seq.sprite_mode = match reader.read_bits(sprite_bits)? {
            0 => SpriteMode::None,
            1 => SpriteMode::Static,
            2 => SpriteMode::Gmc,
            other => {
                return Err(M4vError::UnsupportedFeature(format!(
                    "sprite_enable = {}",
                    other
                )));
            }
        };
        if seq.sprite_mode != SpriteMode::None {
            if seq.sprite_mode == SpriteMode::Static {
                let sprite_width = reader.read_bits(13)?;
                read_marker(reader, "sprite_width")?;
                let sprite_height = reader.read_bits(13)?;
                read_marker(reader, "sprite_height")?;
                let left = reader.read_bits(13)?;
                read_marker(reader, "sprite_left")?;
                let top = reader.read_bits(13)?;
                read_marker(reader, "sprite_top")?;
                debug!(
                    "VOL: 静态 sprite {}x{} @ ({}, {})",
                    sprite_width, sprite_height, left, top
                );
                diag.event(&DiagnosticEvent::Unsupported("static sprite".into()));
            }
            seq.sprite_warping_points = reader.read_bits(6)?;
            seq.sprite_warping_accuracy = reader.read_bits(2)?;
            seq.sprite_brightness_change = reader.read_bit()?;
            if seq.sprite_mode == SpriteMode::Static {
                reader.consume(1)?; // low_latency_sprite_enable
            }
            debug!(
                "VOL: sprite {:?}, warping_points={}, accuracy={}",
                seq.sprite_mode, seq.sprite_warping_points, seq.sprite_warping_accuracy
            );
        }

        if reader.read_bit()? {
            // not_8_bit
            seq.quant_bits = reader.read_bits(4)?;
            reader.consume(4)?; // bits_per_pixel
        } else {
            seq.quant_bits = 5;
        }

        seq.quant_type = reader.read_bits(1)?;
        if seq.quant_type != 0 {
            seq.intra_matrix = if reader.read_bit()? {
                read_quant_matrix(reader)?
            } else {
                super::tables::DEFAULT_INTRA_MATRIX
            };
            seq.inter_matrix = if reader.read_bit()? {
                read_quant_matrix(reader)?
            } else {
                super::tables::DEFAULT_INTER_MATRIX
            };
        }

        seq.quarterpel = if seq.ver_id != 1 { reader.read_bit()? } else { false };

        seq.complexity_estimation_disable = reader.read_bit()?;
        seq.estimation = ComplexityEstimation::default();
        if !seq.complexity_estimation_disable {
            seq.estimation = read_vol_complexity_estimation(reader)?;
        }

        seq.resync_marker_disable = reader.read_bit()?;
        seq.data_partitioned = reader.read_bit()?;
        seq.reversible_vlc = false;
        if seq.data_partitioned {
            seq.reversible_vlc = reader.read_bit()?;
            warn!("data_partitioned 码流按普通顺序解码");
            diag.event(&DiagnosticEvent::Unsupported("data_partitioned".into()));
        }

        if seq.ver_id != 1 {
            seq.newpred_enable = reader.read_bit()?;
            if seq.newpred_enable {
                reader.consume(2)?; // requested_upstream_message_type
                reader.consume(1)?; // newpred_segment_type
            }
            seq.reduced_resolution_enable = reader.read_bit()?;
        } else {
            seq.newpred_enable = false;
            seq.reduced_resolution_enable = false;
        }

        if reader.read_bit()? {
            return Err(M4vError::UnsupportedFeature("可伸缩编码 (scalability)".into()));
        }

        debug!(
            "VOL: {}x{} ver={} low_delay={} interlacing={} quant_type={} qpel={} rrv={}",
            seq.width,
            seq.height,
            seq.ver_id,
            seq.low_delay,
            seq.interlacing,
            seq.quant_type,
            seq.quarterpel,
            seq.reduced_resolution_enable
        );

        self.seq = seq;
        self.has_layer = true;
        Ok(resized)
    }

    fn read_vop(&mut self, reader: &mut BitReader) -> M4vResult<FrameHeader> {
        let seq = &self.seq;
        let coding_type = CodingType::from_bits(reader.read_bits(2)?);

        let mut time_incr = 0;
        while reader.read_bit()? {
            time_incr += 1;
        }
        read_marker(reader, "modulo_time_base")?;
        let time_increment = reader.read_bits(seq.time_inc_bits)? as i32;

        let res = seq.time_inc_resolution as i32;
        if coding_type != CodingType::Bidirectional {
            self.last_time_base = self.time_base;
            self.time_base += time_incr;
            self.time = time_increment;
            self.time_pp = wrap_time(res, self.time - self.last_non_b_time);
            self.last_non_b_time = self.time;
        } else {
            self.time = time_increment;
            self.time_bp = wrap_time(res, self.last_non_b_time - self.time);
        }
        trace!(
            "VOP {:?}: time_base={} time={} time_pp={} time_bp={}",
            coding_type, self.time_base, self.time, self.time_pp, self.time_bp
        );

        read_marker(reader, "time_increment")?;

        if !reader.read_bit()? {
            debug!("VOP: vop_coded = 0");
            let mut header = FrameHeader::new(CodingType::NotCoded);
            header.time = self.time;
            return Ok(header);
        }

        let seq = &self.seq;
        let mut header = FrameHeader::new(coding_type);
        header.time = self.time;

        if seq.newpred_enable {
            read_newpred_ids(reader, seq.time_inc_bits)?;
        }

        if coding_type == CodingType::Predicted
            || (coding_type == CodingType::Sprite && seq.sprite_mode == SpriteMode::Gmc)
        {
            header.rounding = reader.read_bit()?;
        }

        header.reduced_resolution = if seq.reduced_resolution_enable
            && matches!(coding_type, CodingType::Predicted | CodingType::Intra)
        {
            reader.read_bit()?
        } else {
            false
        };

        if !seq.complexity_estimation_disable {
            skip_vop_complexity_estimation(reader, &seq.estimation, coding_type, seq.sprite_mode)?;
        }

        header.intra_dc_threshold = INTRA_DC_THRESHOLD_TABLE[reader.read_bits(3)? as usize];

        if seq.interlacing {
            header.top_field_first = reader.read_bit()?;
            header.alternate_vertical_scan = reader.read_bit()?;
        }

        if coding_type == CodingType::Sprite && seq.sprite_mode != SpriteMode::None {
            for i in 0..seq.sprite_warping_points as usize {
                let x = read_trajectory(reader)?;
                read_marker(reader, "sprite x")?;
                let y = read_trajectory(reader)?;
                read_marker(reader, "sprite y")?;
                if let Some(point) = header.warp.duv.get_mut(i) {
                    *point = MotionVector::new(x, y);
                }
            }
        }

        header.quant = reader.read_bits(seq.quant_bits)?.max(1);
        if coding_type != CodingType::Intra {
            header.fcode_forward = reader.read_bits(3)?;
        }
        if coding_type == CodingType::Bidirectional {
            header.fcode_backward = reader.read_bits(3)?;
        }
        if coding_type != CodingType::Intra && (header.fcode_forward == 0 || header.fcode_backward == 0) {
            return Err(M4vError::InvalidHeaderField("fcode 为 0".into()));
        }

        debug!(
            "VOP {:?}: quant={} fcode=({}, {}) rounding={} rrv={} dc_thr={}",
            coding_type,
            header.quant,
            header.fcode_forward,
            header.fcode_backward,
            header.rounding,
            header.reduced_resolution,
            header.intra_dc_threshold
        );
        Ok(header)
    }

    /// 解析视频包头 (调用方已确认重同步标记存在)
    ///
    /// `mb_count` 为当前图像的宏块总数, `want_forward`/`want_backward`
    /// 控制扩展头中是否读取对应 fcode.
    pub(super) fn read_video_packet_header(
        &self,
        reader: &mut BitReader,
        addbits: u32,
        mb_count: usize,
        want_forward: bool,
        want_backward: bool,
    ) -> M4vResult<VideoPacketHeader> {
        let seq = &self.seq;
        let startcode_bits = NUMBITS_VP_RESYNC_MARKER + addbits;
        let mbnum_bits = log2bin(mb_count.saturating_sub(1) as u32);

        reader.consume(reader.bits_to_byte_align())?;
        reader.consume(startcode_bits)?;

        let mb_number = reader.read_bits(mbnum_bits)? as usize;
        let quant = reader.read_bits(seq.quant_bits)?;
        let hec = reader.read_bit()?;

        let mut extension = None;
        if hec {
            while reader.read_bit()? {}
            read_marker(reader, "hec modulo_time_base")?;
            reader.consume(seq.time_inc_bits)?;
            read_marker(reader, "hec time_increment")?;

            let coding_type = CodingType::from_bits(reader.read_bits(2)?);
            let mut ext = HeaderExtension {
                intra_dc_threshold: INTRA_DC_THRESHOLD_TABLE[reader.read_bits(3)? as usize],
                ..Default::default()
            };
            if seq.reduced_resolution_enable
                && matches!(coding_type, CodingType::Predicted | CodingType::Intra)
            {
                reader.consume(1)?; // vop_reduced_resolution
            }
            if coding_type != CodingType::Intra && want_forward {
                ext.fcode_forward = Some(reader.read_bits(3)?);
            }
            if coding_type == CodingType::Bidirectional && want_backward {
                ext.fcode_backward = Some(reader.read_bits(3)?);
            }
            extension = Some(ext);
        }

        if seq.newpred_enable {
            read_newpred_ids(reader, seq.time_inc_bits)?;
        }

        trace!(
            "视频包: mbnum={} quant={} hec={}",
            mb_number, quant, hec
        );
        Ok(VideoPacketHeader {
            mb_number,
            quant,
            extension,
        })
    }
}

/// `(res + delta) % res`, 以无符号回绕计算
fn wrap_time(res: i32, delta: i32) -> i32 {
    if res <= 0 {
        return 0;
    }
    (res.wrapping_add(delta) as u32 % res as u32) as i32
}

fn read_newpred_ids(reader: &mut BitReader, time_inc_bits: u32) -> M4vResult<()> {
    let bits = (time_inc_bits + 3).min(15);
    let vop_id = reader.read_bits(bits)?;
    if reader.read_bit()? {
        let for_prediction = reader.read_bits(bits)?;
        trace!("newpred: vop_id={} for_prediction={}", vop_id, for_prediction);
    }
    read_marker(reader, "newpred")
}

fn read_trajectory(reader: &mut BitReader) -> M4vResult<i32> {
    let length = decode_sprite_trajectory_len(reader)?;
    if length == 0 {
        return Ok(0);
    }
    let value = reader.read_bits(length)? as i32;
    if value >> (length - 1) == 0 {
        Ok(-(value ^ ((1 << length) - 1)))
    } else {
        Ok(value)
    }
}

fn read_vol_complexity_estimation(reader: &mut BitReader) -> M4vResult<ComplexityEstimation> {
    let mut e = ComplexityEstimation {
        method: reader.read_bits(2)?,
        ..Default::default()
    };
    debug!("VOL: complexity_estimation method = {}", e.method);

    if e.method == 0 || e.method == 1 {
        if !reader.read_bit()? {
            e.opaque = reader.read_bit()?;
            e.transparent = reader.read_bit()?;
            e.intra_cae = reader.read_bit()?;
            e.inter_cae = reader.read_bit()?;
            e.no_update = reader.read_bit()?;
            e.upsampling = reader.read_bit()?;
        }
        if !reader.read_bit()? {
            e.intra_blocks = reader.read_bit()?;
            e.inter_blocks = reader.read_bit()?;
            e.inter4v_blocks = reader.read_bit()?;
            e.not_coded_blocks = reader.read_bit()?;
        }
    }

    read_marker(reader, "complexity estimation")?;

    if !reader.read_bit()? {
        e.dct_coefs = reader.read_bit()?;
        e.dct_lines = reader.read_bit()?;
        e.vlc_symbols = reader.read_bit()?;
        e.vlc_bits = reader.read_bit()?;
    }
    if !reader.read_bit()? {
        e.apm = reader.read_bit()?;
        e.npm = reader.read_bit()?;
        e.interpolate_mc_q = reader.read_bit()?;
        e.forw_back_mc_q = reader.read_bit()?;
        e.halfpel2 = reader.read_bit()?;
        e.halfpel4 = reader.read_bit()?;
    }

    read_marker(reader, "complexity estimation")?;

    if e.method == 1 && !reader.read_bit()? {
        e.sadct = reader.read_bit()?;
        e.quarterpel = reader.read_bit()?;
    }
    Ok(e)
}

fn skip_vop_complexity_estimation(
    reader: &mut BitReader,
    e: &ComplexityEstimation,
    coding_type: CodingType,
    sprite_mode: SpriteMode,
) -> M4vResult<()> {
    if e.method != 0 && e.method != 1 {
        return Ok(());
    }
    let shape = [
        e.opaque,
        e.transparent,
        e.intra_cae,
        e.inter_cae,
        e.no_update,
        e.upsampling,
    ];
    let texture = [
        e.intra_blocks,
        e.not_coded_blocks,
        e.dct_coefs,
        e.dct_lines,
        e.vlc_symbols,
        e.vlc_bits,
    ];
    let motion = [
        e.inter_blocks,
        e.inter4v_blocks,
        e.apm,
        e.npm,
        e.forw_back_mc_q,
        e.halfpel2,
        e.halfpel4,
    ];

    let mut fields: Vec<bool> = Vec::with_capacity(24);
    match coding_type {
        CodingType::Intra => {
            fields.extend_from_slice(&shape);
            fields.extend_from_slice(&texture);
            fields.push(e.sadct);
        }
        CodingType::Predicted => {
            fields.extend_from_slice(&shape);
            fields.extend_from_slice(&texture);
            fields.extend_from_slice(&motion);
            fields.push(e.sadct);
            fields.push(e.quarterpel);
        }
        CodingType::Bidirectional => {
            fields.extend_from_slice(&shape);
            fields.extend_from_slice(&texture);
            fields.extend_from_slice(&motion);
            fields.push(e.interpolate_mc_q);
            fields.push(e.sadct);
            fields.push(e.quarterpel);
        }
        CodingType::Sprite if sprite_mode == SpriteMode::Static => {
            fields.extend_from_slice(&texture);
            fields.extend_from_slice(&motion);
            fields.push(e.interpolate_mc_q);
        }
        _ => {}
    }
    for present in fields {
        if present {
            reader.consume(8)?;
        }
    }
    Ok(())
}

/// 按 `%d` 规则读取整数, 返回值与剩余文本
fn scan_int(text: &str) -> Option<(i32, &str)> {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    let value = trimmed[..end].parse::<i64>().ok()?;
    Some((value.clamp(i32::MIN as i64, i32::MAX as i64) as i32, &trimmed[end..]))
}

/// 匹配 `<version><sep><build><char>`, 返回匹配字段数与末尾字符
fn scan_divx(text: &str, sep: &str) -> (u32, Option<char>) {
    let Some((_, rest)) = scan_int(text) else {
        return (0, None);
    };
    let Some(rest) = rest.strip_prefix(sep) else {
        return (1, None);
    };
    let Some((_, rest)) = scan_int(rest) else {
        return (1, None);
    };
    match rest.chars().next() {
        Some(c) => (3, Some(c)),
        None => (2, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NoopSink;
    use m4v_core::bitwriter::BitWriter;

    /// 写一个最简 VOL: ver 1, 矩形, 指定尺寸与 low_delay
    fn write_vol(bw: &mut BitWriter, width: u32, height: u32, low_delay: Option<bool>) {
        bw.write_start_code(0x20);
        bw.write_bits(0, 1); // random_accessible_vol
        bw.write_bits(1, 8); // video_object_type_indication
        bw.write_bits(0, 1); // is_object_layer_identifier
        bw.write_bits(1, 4); // aspect_ratio_info
        match low_delay {
            Some(ld) => {
                bw.write_bits(1, 1);
                bw.write_bits(1, 2);
                bw.write_bits(ld as u32, 1);
                bw.write_bits(0, 1);
            }
            None => bw.write_bits(0, 1),
        }
        bw.write_bits(0, 2); // shape
        bw.write_marker();
        bw.write_bits(30, 16); // time_inc_resolution
        bw.write_marker();
        bw.write_bits(0, 1); // fixed_vop_rate
        bw.write_marker();
        bw.write_bits(width, 13);
        bw.write_marker();
        bw.write_bits(height, 13);
        bw.write_marker();
        bw.write_bits(0, 1); // interlacing
        bw.write_bits(1, 1); // obmc_disable
        bw.write_bits(0, 1); // sprite_enable
        bw.write_bits(0, 1); // not_8_bit
        bw.write_bits(0, 1); // quant_type
        bw.write_bits(1, 1); // complexity_estimation_disable
        bw.write_bits(1, 1); // resync_marker_disable
        bw.write_bits(0, 1); // data_partitioned
        bw.write_bits(0, 1); // scalability
    }

    #[test]
    fn test_log2bin() {
        assert_eq!(log2bin(0), 0);
        assert_eq!(log2bin(1), 1);
        assert_eq!(log2bin(29), 5);
        assert_eq!(log2bin(32), 6);
    }

    #[test]
    fn test_解析vol与尺寸变化() {
        let mut bw = BitWriter::new();
        write_vol(&mut bw, 176, 144, Some(true));
        let data = bw.finish();

        let mut parser = HeaderParser::new(false, None);
        let mut reader = BitReader::new(&data);
        let event = parser.read_headers(&mut reader, &mut NoopSink).unwrap();
        match event {
            HeaderEvent::LayerChange { width, height } => {
                assert_eq!((width, height), (176, 144));
            }
            other => panic!("期望尺寸变化, 实际 {:?}", other),
        }
        assert_eq!(parser.seq.mb_width, 11);
        assert_eq!(parser.seq.mb_height, 9);
        assert_eq!(parser.seq.time_inc_bits, 5);
        assert!(parser.seq.low_delay);

        // 同尺寸的第二个 VOL 不再报告尺寸变化
        let mut reader = BitReader::new(&data);
        let event = parser.read_headers(&mut reader, &mut NoopSink).unwrap();
        assert!(matches!(event, HeaderEvent::Layer));
    }

    #[test]
    fn test_vol_未声明low_delay时取默认值() {
        let mut bw = BitWriter::new();
        write_vol(&mut bw, 32, 32, None);
        let data = bw.finish();
        let mut parser = HeaderParser::new(true, None);
        parser
            .read_headers(&mut BitReader::new(&data), &mut NoopSink)
            .unwrap();
        assert!(parser.seq.low_delay);
    }

    #[test]
    fn test_非矩形形状报未支持() {
        let mut bw = BitWriter::new();
        bw.write_start_code(0x20);
        bw.write_bits(0, 1);
        bw.write_bits(1, 8);
        bw.write_bits(0, 1);
        bw.write_bits(1, 4);
        bw.write_bits(0, 1);
        bw.write_bits(1, 2); // binary shape
        bw.write_bits(0, 16);
        let data = bw.finish();
        let mut parser = HeaderParser::new(false, None);
        let err = parser
            .read_headers(&mut BitReader::new(&data), &mut NoopSink)
            .unwrap_err();
        assert!(matches!(err, M4vError::UnsupportedFeature(_)));
    }

    #[test]
    fn test_固定尺寸不符报错() {
        let mut bw = BitWriter::new();
        write_vol(&mut bw, 64, 48, None);
        let data = bw.finish();
        let mut parser = HeaderParser::new(false, Some((32, 32)));
        let err = parser
            .read_headers(&mut BitReader::new(&data), &mut NoopSink)
            .unwrap_err();
        assert!(matches!(err, M4vError::InvalidHeaderField(_)));
    }

    #[test]
    fn test_零尺寸报错() {
        let mut bw = BitWriter::new();
        write_vol(&mut bw, 0, 16, None);
        let data = bw.finish();
        let mut parser = HeaderParser::new(false, None);
        let err = parser
            .read_headers(&mut BitReader::new(&data), &mut NoopSink)
            .unwrap_err();
        assert!(matches!(err, M4vError::InvalidHeaderField(_)));
    }

    #[test]
    fn test_vo_类型非视频报错() {
        let mut bw = BitWriter::new();
        bw.write_start_code(0xB5);
        bw.write_bits(0, 1);
        bw.write_bits(2, 4); // still texture
        bw.write_bits(0, 3);
        let data = bw.finish();
        let mut parser = HeaderParser::new(false, None);
        let err = parser
            .read_headers(&mut BitReader::new(&data), &mut NoopSink)
            .unwrap_err();
        assert!(matches!(err, M4vError::InvalidHeaderField(_)));
    }

    #[test]
    fn test_gov与vos() {
        let mut bw = BitWriter::new();
        bw.write_start_code(0xB0);
        bw.write_bits(0xF5, 8);
        bw.write_start_code(0xB3);
        bw.write_bits(1, 5);
        bw.write_bits(2, 6);
        bw.write_marker();
        bw.write_bits(3, 6);
        bw.write_bits(1, 1);
        bw.write_bits(0, 1);
        let data = bw.finish();
        let mut parser = HeaderParser::new(false, None);
        let event = parser
            .read_headers(&mut BitReader::new(&data), &mut NoopSink)
            .unwrap();
        assert!(matches!(event, HeaderEvent::Nothing));
        assert_eq!(parser.profile, 0xF5);
        let gov = parser.gov.unwrap();
        assert_eq!((gov.hours, gov.minutes, gov.seconds), (1, 2, 3));
        assert!(gov.closed_gov);
        assert!(!gov.broken_link);
    }

    fn user_data(text: &str) -> Vec<u8> {
        let mut data = vec![0, 0, 1, 0xB2];
        data.extend_from_slice(text.as_bytes());
        data.push(0);
        data
    }

    #[test]
    fn test_用户数据识别packed() {
        let mut parser = HeaderParser::new(false, None);
        let data = user_data("DivX503b1393p");
        parser
            .read_headers(&mut BitReader::new(&data), &mut NoopSink)
            .unwrap();
        assert!(parser.packed_mode);

        let data = user_data("DivX501Build413");
        parser
            .read_headers(&mut BitReader::new(&data), &mut NoopSink)
            .unwrap();
        assert!(!parser.packed_mode, "无 p 后缀时关闭 packed");

        let data = user_data("XviD0046");
        parser
            .read_headers(&mut BitReader::new(&data), &mut NoopSink)
            .unwrap();
        assert_eq!(parser.bs_version, Some(46));
    }

    #[test]
    fn test_量化矩阵读取() {
        // 前三个值后以 0 结束, 其余用最后一个非零值填满
        let data = [16u8, 20, 24, 0];
        let mut reader = BitReader::new(&data);
        let m = read_quant_matrix(&mut reader).unwrap();
        assert_eq!(m[ZIGZAG_SCAN[0]], 16);
        assert_eq!(m[ZIGZAG_SCAN[1]], 20);
        assert_eq!(m[ZIGZAG_SCAN[2]], 24);
        assert_eq!(m[ZIGZAG_SCAN[3]], 24);
        assert_eq!(m[ZIGZAG_SCAN[63]], 24);
        assert_eq!(reader.bit_position(), 32);
    }

    #[test]
    fn test_重同步标记检测() {
        // 已读 3 位, 填充 01111, 之后 16 个 0 和 1
        let data = [0b1010_1111, 0x00, 0x00, 0x80];
        let mut reader = BitReader::new(&data);
        reader.consume(3).unwrap();
        assert!(check_resync_marker(&reader, 0));
        // addbits = 1 时需要 17 个 0
        assert!(!check_resync_marker(&reader, 1));
    }

    #[test]
    fn test_时间距离回绕() {
        assert_eq!(wrap_time(30, 5), 5);
        assert_eq!(wrap_time(30, -5), 25);
        assert_eq!(wrap_time(0, 3), 0);
    }

    #[test]
    fn test_divx字符串匹配() {
        assert_eq!(scan_divx("503b1393p", "b"), (3, Some('p')));
        assert_eq!(scan_divx("503b1393", "b"), (2, None));
        assert_eq!(scan_divx("503Build1393x", "Build"), (3, Some('x')));
        assert_eq!(scan_divx("abc", "b"), (0, None));
    }
}
