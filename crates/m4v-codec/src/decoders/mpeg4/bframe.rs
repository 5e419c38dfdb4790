//! B-VOP 宏块层解码
//!
//! 前向预测取自较早的参考帧 (ref1), 后向取自最新的参考帧 (ref0).
//! 共位宏块信息来自上一个非 B 帧; 共位宏块未编码时本宏块直接按零向量
//! 从 ref1 复制, 不读取任何位.

use log::debug;
use m4v_core::bitreader::BitReader;
use m4v_core::{M4vError, M4vResult};

use super::Mpeg4Decoder;
use super::block::{MbContext, decode_inter_residual};
use super::frame_decode::{MbStep, PacketState, VopKind, conceal_mb, run_macroblocks};
use super::motion::{McParams, direct_vectors, predict_inter_mb, predict_interpolated_mb, read_mv};
use super::picture::Picture;
use super::types::{FrameHeader, MacroblockInfo, MbGrid, MbMode, MotionVector};
use super::vlc::{decode_b_mbtype, decode_dbquant};

/// 前后向向量预测值, 每行开头与每个视频包开头清零
#[derive(Debug, Clone, Copy, Default)]
struct BPredictors {
    forward: MotionVector,
    backward: MotionVector,
}

/// B-VOP 宏块所需的只读参数
struct BParams<'a> {
    ctx: MbContext<'a>,
    mc: McParams,
    /// B 帧到前一参考帧的时间距离
    trb: i32,
    /// 两参考帧的时间距离
    trd: i32,
}

/// 参考帧: `forward` 为 ref1, `backward` 为 ref0
struct BReferences<'a> {
    forward: &'a Picture,
    backward: &'a Picture,
}

#[allow(clippy::too_many_arguments)]
fn decode_b_mb(
    reader: &mut BitReader,
    params: &BParams,
    refs: &BReferences,
    mb: &mut MacroblockInfo,
    colocated: &MacroblockInfo,
    state: &mut PacketState,
    pmv: &mut BPredictors,
    cur: &mut Picture,
    index: usize,
) -> M4vResult<()> {
    let ctx = &params.ctx;
    let (mb_x, mb_y) = (index % ctx.grid.width, index / ctx.grid.width);

    *mb = MacroblockInfo {
        quant: state.quant,
        ..MacroblockInfo::default()
    };

    if colocated.mode == MbMode::NotCoded {
        mb.mode = MbMode::Forward;
        predict_inter_mb(ctx, params.mc, refs.forward, cur, mb, mb_x, mb_y);
        return Ok(());
    }

    if !reader.read_bit()? {
        let modb2 = reader.read_bit()?;
        let mbtype = decode_b_mbtype(reader)?;
        mb.mode = MbMode::from_b_mbtype(mbtype)
            .ok_or_else(|| M4vError::InvalidCoefficient(format!("非法 B 宏块类型 {}", mbtype)))?;
        mb.cbp = if modb2 { 0 } else { reader.read_bits(6)? };
        if mb.mode != MbMode::Direct && mb.cbp != 0 {
            state.quant = (state.quant as i32 + decode_dbquant(reader)?).clamp(1, 31) as u32;
        }
        mb.quant = state.quant;

        if ctx.seq.interlacing {
            if mb.cbp != 0 {
                mb.field_dct = reader.read_bit()?;
            }
            if mb.mode != MbMode::Direct {
                mb.field_pred = reader.read_bit()?;
                if mb.field_pred {
                    mb.field_for_top = reader.read_bit()?;
                    mb.field_for_bot = reader.read_bit()?;
                }
            }
        }
    } else {
        mb.mode = MbMode::DirectNoneMv;
    }

    match mb.mode {
        MbMode::Direct | MbMode::DirectNoneMv => {
            let delta = if mb.mode == MbMode::Direct {
                read_mv(reader, 1, MotionVector::ZERO)?
            } else {
                MotionVector::ZERO
            };
            let (forward, backward) = direct_vectors(&colocated.mvs, delta, params.trb, params.trd);
            mb.mvs = forward;
            mb.b_mvs = backward;
            predict_interpolated_mb(ctx, params.mc, refs.forward, refs.backward, cur, mb, mb_x, mb_y, true);
        }
        MbMode::Interpolate => {
            let forward = read_mv(reader, state.fcode_forward, pmv.forward)?;
            pmv.forward = forward;
            mb.set_all_mvs(forward);
            let backward = read_mv(reader, state.fcode_backward, pmv.backward)?;
            pmv.backward = backward;
            mb.b_mvs = [backward; 4];
            predict_interpolated_mb(ctx, params.mc, refs.forward, refs.backward, cur, mb, mb_x, mb_y, false);
        }
        MbMode::Backward => {
            let mv = read_mv(reader, state.fcode_backward, pmv.backward)?;
            pmv.backward = mv;
            mb.set_all_mvs(mv);
            predict_inter_mb(ctx, params.mc, refs.backward, cur, mb, mb_x, mb_y);
        }
        MbMode::Forward => {
            let mv = read_mv(reader, state.fcode_forward, pmv.forward)?;
            pmv.forward = mv;
            mb.set_all_mvs(mv);
            predict_inter_mb(ctx, params.mc, refs.forward, cur, mb, mb_x, mb_y);
        }
        other => return Err(M4vError::Internal(format!("B 宏块模式 {:?} 不可能出现", other))),
    }

    if mb.cbp != 0 {
        decode_inter_residual(reader, ctx, mb, mb_x, mb_y, cur)?;
    }
    Ok(())
}

impl Mpeg4Decoder {
    /// 解码一个 B-VOP 到当前帧缓冲
    ///
    /// 调用方保证已有两个参考帧且 `time_pp > time_bp`.
    pub(super) fn decode_b_picture(&mut self, reader: &mut BitReader, header: &FrameHeader) -> M4vResult<()> {
        let Self {
            parser,
            pool,
            mbs,
            last_mbs,
            diag,
            ..
        } = self;
        let pool = pool
            .as_mut()
            .ok_or_else(|| M4vError::Internal("图像缓冲未分配".into()))?;
        let (cur, ref0, ref1) = pool.split()?;
        let seq = &parser.seq;
        let grid = MbGrid::for_picture(seq, false);
        if mbs.len() < grid.count() || last_mbs.len() < grid.count() {
            return Err(M4vError::Internal("宏块信息数组过小".into()));
        }

        let trd = parser.time_pp;
        let trb = parser.time_pp - parser.time_bp;
        let mut params = BParams {
            ctx: MbContext {
                seq,
                grid,
                alternate_vertical_scan: header.alternate_vertical_scan,
                reduced_resolution: false,
                intra_dc_threshold: header.intra_dc_threshold,
                bound: 0,
            },
            mc: McParams {
                quarterpel: seq.quarterpel,
                rounding: false,
                bs_version: parser.bs_version,
            },
            trb,
            trd,
        };
        let refs = BReferences {
            forward: ref1,
            backward: ref0,
        };
        debug!(
            "解码 B-VOP: quant {}, fcode {}/{}, trb {} trd {}",
            header.quant, header.fcode_forward, header.fcode_backward, trb, trd
        );

        let mut state = PacketState::new(header);
        let mut pmv = BPredictors::default();
        run_macroblocks(
            reader,
            parser,
            diag.as_mut(),
            VopKind::Bidirectional,
            grid.count(),
            seq.mb_count(),
            &mut state,
            |reader, step, state| {
                params.ctx.bound = state.bound;
                match step {
                    MbStep::Decode(index) => {
                        if index % grid.width == 0 || index == state.bound {
                            pmv = BPredictors::default();
                        }
                        decode_b_mb(
                            reader,
                            &params,
                            &refs,
                            &mut mbs[index],
                            &last_mbs[index],
                            state,
                            &mut pmv,
                            cur,
                            index,
                        )
                    }
                    MbStep::Conceal(index) => {
                        conceal_mb(&params.ctx, refs.backward, cur, &mut mbs[index], index, state.quant);
                        Ok(())
                    }
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::mpeg4::types::SequenceParams;
    use m4v_core::bitwriter::BitWriter;

    fn test_seq() -> SequenceParams {
        SequenceParams {
            width: 32,
            height: 16,
            mb_width: 2,
            mb_height: 1,
            ..SequenceParams::default()
        }
    }

    fn flat_picture(mb_w: usize, mb_h: usize, luma: u8) -> Picture {
        let mut pic = Picture::new(mb_w, mb_h);
        pic.clear();
        pic.y.fill(luma);
        pic
    }

    fn params(seq: &SequenceParams) -> BParams<'_> {
        BParams {
            ctx: MbContext {
                seq,
                grid: MbGrid::for_picture(seq, false),
                alternate_vertical_scan: false,
                reduced_resolution: false,
                intra_dc_threshold: 0,
                bound: 0,
            },
            mc: McParams {
                quarterpel: false,
                rounding: false,
                bs_version: None,
            },
            trb: 1,
            trd: 2,
        }
    }

    fn packet_state() -> PacketState {
        PacketState {
            quant: 4,
            fcode_forward: 1,
            fcode_backward: 1,
            intra_dc_threshold: 0,
            bound: 0,
        }
    }

    #[test]
    fn test_共位未编码时复制前向参考且不读位() {
        let seq = test_seq();
        let params = params(&seq);
        let forward = flat_picture(2, 1, 40);
        let backward = flat_picture(2, 1, 200);
        let refs = BReferences {
            forward: &forward,
            backward: &backward,
        };
        let mut cur = flat_picture(2, 1, 0);
        let mut mb = MacroblockInfo::default();
        let colocated = MacroblockInfo::default();
        let data = [0xFFu8; 2];
        let mut reader = BitReader::new(&data);
        let mut state = packet_state();
        let mut pmv = BPredictors::default();

        decode_b_mb(
            &mut reader,
            &params,
            &refs,
            &mut mb,
            &colocated,
            &mut state,
            &mut pmv,
            &mut cur,
            0,
        )
        .unwrap();
        assert_eq!(mb.mode, MbMode::Forward);
        assert_eq!(reader.bit_position(), 0);
        assert_eq!(cur.y.get(5, 5), 40);
        // 第二个宏块未触及
        assert_eq!(cur.y.get(20, 5), 0);
    }

    #[test]
    fn test_modb为1时按零修正直接模式平均() {
        let seq = test_seq();
        let params = params(&seq);
        let forward = flat_picture(2, 1, 40);
        let backward = flat_picture(2, 1, 200);
        let refs = BReferences {
            forward: &forward,
            backward: &backward,
        };
        let mut cur = flat_picture(2, 1, 0);
        let mut mb = MacroblockInfo::default();
        let colocated = MacroblockInfo {
            mode: MbMode::Inter,
            ..MacroblockInfo::default()
        };
        let mut w = BitWriter::new();
        w.write_bits(1, 1);
        let data = w.finish();
        let mut reader = BitReader::new(&data);
        let mut state = packet_state();
        let mut pmv = BPredictors::default();

        decode_b_mb(
            &mut reader,
            &params,
            &refs,
            &mut mb,
            &colocated,
            &mut state,
            &mut pmv,
            &mut cur,
            1,
        )
        .unwrap();
        assert_eq!(mb.mode, MbMode::DirectNoneMv);
        assert_eq!(mb.cbp, 0);
        assert_eq!(reader.bit_position(), 1);
        // (40 + 200) >> 1
        assert_eq!(cur.y.get(20, 5), 120);
        assert_eq!(cur.y.get(5, 5), 0);
    }

    #[test]
    fn test_前向宏块更新预测值() {
        let seq = test_seq();
        let params = params(&seq);
        let forward = flat_picture(2, 1, 40);
        let backward = flat_picture(2, 1, 200);
        let refs = BReferences {
            forward: &forward,
            backward: &backward,
        };
        let mut cur = flat_picture(2, 1, 0);
        let mut mb = MacroblockInfo::default();
        let colocated = MacroblockInfo {
            mode: MbMode::Inter,
            ..MacroblockInfo::default()
        };
        // modb = 0, modb2 = 1 (无 cbp), mb_type = 0001 (Forward),
        // mv x = 1 (码字 "1"), mv y = 1 (码字 "1")
        let mut w = BitWriter::new();
        w.write_bits(0, 1);
        w.write_bits(1, 1);
        w.write_bits(0b0001, 4);
        w.write_bits(1, 1);
        w.write_bits(1, 1);
        let data = w.finish();
        let mut reader = BitReader::new(&data);
        let mut state = packet_state();
        let mut pmv = BPredictors::default();

        decode_b_mb(
            &mut reader,
            &params,
            &refs,
            &mut mb,
            &colocated,
            &mut state,
            &mut pmv,
            &mut cur,
            0,
        )
        .unwrap();
        assert_eq!(mb.mode, MbMode::Forward);
        assert_eq!(mb.cbp, 0);
        assert_eq!(pmv.forward, MotionVector::ZERO);
        assert!(pmv.backward.is_zero());
        assert_eq!(cur.y.get(5, 5), 40);
        assert_eq!(state.quant, 4);
    }
}
