//! I/P/S-VOP 宏块层解码
//!
//! 宏块循环由 [`run_macroblocks`] 驱动: 跳过 mcbpc 填充码, 在重同步标记处读取
//! 视频包头并更新量化参数与预测边界. 宏块内的截断或非法码字只影响当前宏块:
//! 该宏块按零向量复制参考帧, 随后逐位搜索下一个重同步标记, 中间跳过的宏块
//! 同样按复制处理.

use log::{debug, trace, warn};
use m4v_core::bitreader::BitReader;
use m4v_core::{M4vError, M4vResult};

use super::Mpeg4Decoder;
use super::block::{MbContext, decode_inter_residual, decode_intra_mb};
use super::gmc::{GmcParameters, sanitize};
use super::header::{HeaderParser, VideoPacketHeader, check_resync_marker};
use super::motion::{McParams, predict_gmc_mb, predict_inter_mb, read_mv};
use super::picture::Picture;
use super::predict::predict_mv;
use super::tables::DQUANT_TABLE;
use super::types::{CodingType, FrameHeader, MacroblockInfo, MbGrid, MbMode, MotionVector};
use super::vlc::{decode_cbpy, decode_mcbpc_inter, decode_mcbpc_intra};
use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink};

/// I-VOP mcbpc 填充码 `0000 0000 1`
const INTRA_STUFFING_BITS: u32 = 9;
/// P/S-VOP 填充码 (not_coded = 0 加 mcbpc 填充)
const INTER_STUFFING_BITS: u32 = 10;

// ============================================================================
// 视频包状态
// ============================================================================

/// 随视频包头变化的参数
#[derive(Debug, Clone, Copy)]
pub(super) struct PacketState {
    pub quant: u32,
    pub fcode_forward: u32,
    pub fcode_backward: u32,
    pub intra_dc_threshold: u32,
    /// 当前视频包首个宏块序号
    pub bound: usize,
}

impl PacketState {
    pub(super) fn new(header: &FrameHeader) -> Self {
        Self {
            quant: header.quant,
            fcode_forward: header.fcode_forward,
            fcode_backward: header.fcode_backward,
            intra_dc_threshold: header.intra_dc_threshold,
            bound: 0,
        }
    }

    fn apply(&mut self, packet: &VideoPacketHeader) {
        self.quant = packet.quant.max(1);
        if let Some(ext) = packet.extension {
            self.intra_dc_threshold = ext.intra_dc_threshold;
            if let Some(f) = ext.fcode_forward {
                self.fcode_forward = f.max(1);
            }
            if let Some(f) = ext.fcode_backward {
                self.fcode_backward = f.max(1);
            }
        }
        self.bound = packet.mb_number;
    }
}

/// 宏块循环所属的 VOP 种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum VopKind {
    Intra,
    Predicted,
    Bidirectional,
}

impl VopKind {
    fn stuffing_bits(self) -> Option<u32> {
        match self {
            Self::Intra => Some(INTRA_STUFFING_BITS),
            Self::Predicted => Some(INTER_STUFFING_BITS),
            Self::Bidirectional => None,
        }
    }

    /// 重同步标记在 17 个基础位之外的附加 0 位数
    fn addbits(self, state: &PacketState) -> u32 {
        match self {
            Self::Intra => 0,
            Self::Predicted => state.fcode_forward.saturating_sub(1),
            Self::Bidirectional => state.fcode_forward.max(state.fcode_backward).saturating_sub(1),
        }
    }
}

/// 宏块循环对单个宏块的要求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MbStep {
    /// 从码流解码
    Decode(usize),
    /// 按跳过宏块隐藏
    Conceal(usize),
}

// ============================================================================
// 宏块循环
// ============================================================================

/// 从当前位置逐位向后搜索重同步标记, 找到时停在填充位起点
pub(super) fn seek_resync_marker(reader: &mut BitReader, addbits: u32) -> bool {
    let marker_bits = u64::from(17 + addbits);
    while reader.bits_remaining() > marker_bits {
        if check_resync_marker(reader, addbits) {
            return true;
        }
        if reader.consume(1).is_err() {
            return false;
        }
    }
    false
}

fn conceal_range(
    step: &mut impl FnMut(&mut BitReader, MbStep, &mut PacketState) -> M4vResult<()>,
    reader: &mut BitReader,
    state: &mut PacketState,
    range: std::ops::Range<usize>,
) -> M4vResult<()> {
    for index in range {
        step(reader, MbStep::Conceal(index), state)?;
    }
    Ok(())
}

/// 驱动一帧的宏块循环
///
/// `count` 为本帧宏块数 (RRV 时为网格大小), `mb_count` 为序列宏块数
/// (决定视频包头中宏块序号的位数).
#[allow(clippy::too_many_arguments)]
pub(super) fn run_macroblocks(
    reader: &mut BitReader,
    parser: &HeaderParser,
    diag: &mut dyn DiagnosticsSink,
    kind: VopKind,
    count: usize,
    mb_count: usize,
    state: &mut PacketState,
    mut step: impl FnMut(&mut BitReader, MbStep, &mut PacketState) -> M4vResult<()>,
) -> M4vResult<()> {
    let want_backward = kind == VopKind::Bidirectional;
    let want_forward = kind != VopKind::Intra;
    let mut index = 0;

    while index < count {
        if let Some(n) = kind.stuffing_bits() {
            while reader.show_bits(n) == 1 {
                reader.consume(n)?;
            }
        }

        let addbits = kind.addbits(state);
        if check_resync_marker(reader, addbits) {
            let packet = match parser.read_video_packet_header(reader, addbits, mb_count, want_forward, want_backward) {
                Ok(packet) => packet,
                Err(e) if e.is_macroblock_recoverable() => {
                    warn!("视频包头损坏, 隐藏剩余宏块: {}", e);
                    return conceal_range(&mut step, reader, state, index..count);
                }
                Err(e) => return Err(e),
            };
            trace!("视频包: 宏块 {} quant {}", packet.mb_number, packet.quant);
            diag.event(&DiagnosticEvent::ResyncMarker {
                mb_index: packet.mb_number,
            });
            if packet.mb_number < index || packet.mb_number >= count {
                warn!(
                    "视频包宏块序号 {} 不在 [{}, {}) 内, 隐藏剩余宏块",
                    packet.mb_number, index, count
                );
                return conceal_range(&mut step, reader, state, index..count);
            }
            conceal_range(&mut step, reader, state, index..packet.mb_number)?;
            state.apply(&packet);
            index = packet.mb_number;
        }

        match step(reader, MbStep::Decode(index), state) {
            Ok(()) => index += 1,
            Err(e) if e.is_macroblock_recoverable() => {
                debug!("宏块 {} 解码失败: {}", index, e);
                diag.event(&DiagnosticEvent::MacroblockConcealed {
                    mb_index: index,
                    error: e.to_string(),
                });
                step(reader, MbStep::Conceal(index), state)?;
                index += 1;
                if !seek_resync_marker(reader, kind.addbits(state)) {
                    return conceal_range(&mut step, reader, state, index..count);
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// 以零向量从参考帧复制宏块, 并把宏块信息置为跳过
pub(super) fn conceal_mb(
    ctx: &MbContext,
    reference: &Picture,
    cur: &mut Picture,
    mb: &mut MacroblockInfo,
    index: usize,
    quant: u32,
) {
    *mb = MacroblockInfo {
        quant,
        ..MacroblockInfo::default()
    };
    let mc = McParams {
        quarterpel: false,
        rounding: false,
        bs_version: None,
    };
    predict_inter_mb(ctx, mc, reference, cur, mb, index % ctx.grid.width, index / ctx.grid.width);
}

/// 重置宏块头字段
fn reset_mb(mb: &mut MacroblockInfo, mode: MbMode, quant: u32, cbp: u32) {
    mb.mode = mode;
    mb.quant = quant;
    mb.cbp = cbp;
    mb.field_dct = false;
    mb.field_pred = false;
    mb.field_for_top = false;
    mb.field_for_bot = false;
    mb.mcsel = false;
    mb.acpred_directions = [0; 6];
}

#[inline]
fn apply_dquant(quant: u32, delta: i32) -> u32 {
    (quant as i32 + delta).clamp(1, 31) as u32
}

// ============================================================================
// I/P/S 宏块
// ============================================================================

fn decode_i_mb(
    reader: &mut BitReader,
    ctx: &MbContext,
    mbs: &mut [MacroblockInfo],
    index: usize,
    state: &mut PacketState,
    cur: &mut Picture,
) -> M4vResult<()> {
    let mcbpc = decode_mcbpc_intra(reader)?;
    let mode = MbMode::from_mcbpc(mcbpc.mode);
    let acpred = reader.read_bit()?;
    let cbpy = decode_cbpy(reader, true)?;
    let cbp = (cbpy << 2) | mcbpc.cbpc;

    if mode == MbMode::IntraQ {
        state.quant = apply_dquant(state.quant, DQUANT_TABLE[reader.read_bits(2)? as usize]);
    }
    let mb = &mut mbs[index];
    reset_mb(mb, mode, state.quant, cbp);
    mb.set_all_mvs(MotionVector::ZERO);
    if ctx.seq.interlacing {
        mb.field_dct = reader.read_bit()?;
    }
    decode_intra_mb(reader, ctx, mbs, index, acpred, cur)
}

/// P/S-VOP 宏块所需的只读参数
struct InterParams<'a> {
    ctx: MbContext<'a>,
    mc: McParams,
    gmc: Option<&'a GmcParameters>,
}

fn gmc_average_mv(gmc: &GmcParameters, mb_x: usize, mb_y: usize, quarterpel: bool, fcode: u32) -> MotionVector {
    let amv = gmc.average_mv(mb_x, mb_y, quarterpel);
    MotionVector::new(sanitize(amv.x, fcode), sanitize(amv.y, fcode))
}

fn decode_p_mb(
    reader: &mut BitReader,
    params: &InterParams,
    mbs: &mut [MacroblockInfo],
    index: usize,
    state: &mut PacketState,
    cur: &mut Picture,
    reference: &Picture,
) -> M4vResult<()> {
    let ctx = &params.ctx;
    let width = ctx.grid.width;
    let (mb_x, mb_y) = (index % width, index / width);
    let fcode = state.fcode_forward;

    if reader.read_bit()? {
        // not_coded
        let mb = &mut mbs[index];
        if let Some(gmc) = params.gmc {
            reset_mb(mb, MbMode::NotCodedGmc, state.quant, 0);
            mb.mcsel = true;
            predict_gmc_mb(gmc, reference, cur, mb_x, mb_y, params.mc.rounding);
            let amv = gmc_average_mv(gmc, mb_x, mb_y, params.mc.quarterpel, fcode);
            mb.amv = amv;
            mb.set_all_mvs(amv);
        } else {
            reset_mb(mb, MbMode::NotCoded, state.quant, 0);
            mb.set_all_mvs(MotionVector::ZERO);
            predict_inter_mb(ctx, params.mc, reference, cur, mb, mb_x, mb_y);
        }
        return Ok(());
    }

    let mcbpc = decode_mcbpc_inter(reader)?;
    let mode = MbMode::from_mcbpc(mcbpc.mode);
    let intra = mode.is_intra();
    let single = matches!(mode, MbMode::Inter | MbMode::InterQ);
    let mut mcsel = false;
    let mut acpred = false;
    if params.gmc.is_some() && single {
        mcsel = reader.read_bit()?;
    } else if intra {
        acpred = reader.read_bit()?;
    }
    let cbpy = decode_cbpy(reader, intra)?;
    let cbp = (cbpy << 2) | mcbpc.cbpc;
    if matches!(mode, MbMode::InterQ | MbMode::IntraQ) {
        state.quant = apply_dquant(state.quant, DQUANT_TABLE[reader.read_bits(2)? as usize]);
    }

    {
        let mb = &mut mbs[index];
        reset_mb(mb, mode, state.quant, cbp);
        mb.mcsel = mcsel;
        if ctx.seq.interlacing {
            if (cbp != 0 || intra) && !mcsel {
                mb.field_dct = reader.read_bit()?;
            }
            if single && !mcsel {
                mb.field_pred = reader.read_bit()?;
                if mb.field_pred {
                    mb.field_for_top = reader.read_bit()?;
                    mb.field_for_bot = reader.read_bit()?;
                }
            }
        }
    }

    if intra {
        mbs[index].set_all_mvs(MotionVector::ZERO);
        return decode_intra_mb(reader, ctx, mbs, index, acpred, cur);
    }

    if mcsel {
        if let Some(gmc) = params.gmc {
            predict_gmc_mb(gmc, reference, cur, mb_x, mb_y, params.mc.rounding);
            let amv = gmc_average_mv(gmc, mb_x, mb_y, params.mc.quarterpel, fcode);
            mbs[index].amv = amv;
            mbs[index].set_all_mvs(amv);
        }
    } else if mode == MbMode::Inter4V {
        for k in 0..4 {
            let pmv = predict_mv(mbs, width, ctx.bound, mb_x, mb_y, k);
            mbs[index].mvs[k] = read_mv(reader, fcode, pmv)?;
        }
    } else if mbs[index].field_pred {
        // 场预测的两个向量只记录, 补偿仍按帧进行
        let pmv = predict_mv(mbs, width, ctx.bound, mb_x, mb_y, 0);
        mbs[index].mvs[0] = read_mv(reader, fcode, pmv)?;
        mbs[index].mvs[1] = read_mv(reader, fcode, pmv)?;
    } else {
        let pmv = predict_mv(mbs, width, ctx.bound, mb_x, mb_y, 0);
        let mv = read_mv(reader, fcode, pmv)?;
        mbs[index].set_all_mvs(mv);
    }

    let mb = &mbs[index];
    if !mcsel {
        predict_inter_mb(ctx, params.mc, reference, cur, mb, mb_x, mb_y);
    }
    if cbp != 0 {
        decode_inter_residual(reader, ctx, mb, mb_x, mb_y, cur)?;
    }
    Ok(())
}

// ============================================================================
// 帧级入口
// ============================================================================

impl Mpeg4Decoder {
    /// 解码一个 I/P/S-VOP 到当前帧缓冲 (不做边缘填充与轮换)
    pub(super) fn decode_reference_picture(&mut self, reader: &mut BitReader, header: &FrameHeader) -> M4vResult<()> {
        let Self {
            parser,
            pool,
            mbs,
            diag,
            ..
        } = self;
        let pool = pool
            .as_mut()
            .ok_or_else(|| M4vError::Internal("图像缓冲未分配".into()))?;
        let (cur, ref0, _) = pool.split()?;
        let seq = &parser.seq;
        let grid = MbGrid::for_picture(seq, header.reduced_resolution);
        if mbs.len() < grid.count() {
            return Err(M4vError::Internal("宏块信息数组过小".into()));
        }

        let mut ctx = MbContext {
            seq,
            grid,
            alternate_vertical_scan: header.alternate_vertical_scan,
            reduced_resolution: header.reduced_resolution,
            intra_dc_threshold: header.intra_dc_threshold,
            bound: 0,
        };
        let mut state = PacketState::new(header);
        debug!(
            "解码 {:?}-VOP: {}x{} 宏块, quant {}, fcode {}, rrv {}",
            header.coding_type, grid.width, grid.height, header.quant, header.fcode_forward, header.reduced_resolution
        );

        if header.coding_type == CodingType::Intra {
            return run_macroblocks(
                reader,
                parser,
                diag.as_mut(),
                VopKind::Intra,
                grid.count(),
                seq.mb_count(),
                &mut state,
                |reader, step, state| {
                    ctx.intra_dc_threshold = state.intra_dc_threshold;
                    ctx.bound = state.bound;
                    match step {
                        MbStep::Decode(index) => decode_i_mb(reader, &ctx, &mut mbs[..], index, state, cur),
                        MbStep::Conceal(index) => {
                            conceal_mb(&ctx, ref0, cur, &mut mbs[index], index, state.quant);
                            Ok(())
                        }
                    }
                },
            );
        }

        let gmc = if header.uses_gmc(seq) {
            Some(GmcParameters::new(
                seq.sprite_warping_points,
                seq.sprite_warping_accuracy,
                &header.warp,
                seq.width,
                seq.height,
            ))
        } else {
            None
        };
        let mc = McParams {
            quarterpel: seq.quarterpel,
            rounding: header.rounding,
            bs_version: parser.bs_version,
        };
        run_macroblocks(
            reader,
            parser,
            diag.as_mut(),
            VopKind::Predicted,
            grid.count(),
            seq.mb_count(),
            &mut state,
            |reader, step, state| {
                ctx.intra_dc_threshold = state.intra_dc_threshold;
                ctx.bound = state.bound;
                match step {
                    MbStep::Decode(index) => {
                        let params = InterParams {
                            ctx,
                            mc,
                            gmc: gmc.as_ref(),
                        };
                        decode_p_mb(reader, &params, &mut mbs[..], index, state, cur, ref0)
                    }
                    MbStep::Conceal(index) => {
                        conceal_mb(&ctx, ref0, cur, &mut mbs[index], index, state.quant);
                        Ok(())
                    }
                }
            },
        )
    }
}
