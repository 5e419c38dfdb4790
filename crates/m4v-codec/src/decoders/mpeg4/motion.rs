//! 运动向量解码与运动补偿
//!
//! 向量先按预测值还原并折回 fcode 范围, 补偿前再钳位到参考图像填充区内.
//! 色度向量由亮度向量推导, 早期 XviD 码流在四分之一像素模式下使用一种
//! 有偏差的减半方式, 这里按码流版本保持一致.

use m4v_core::bitreader::BitReader;
use m4v_core::M4vResult;

use super::block::MbContext;
use super::gmc::GmcParameters;
use super::interp::{MAX_BLOCK, average_into, predict_halfpel, predict_qpel};
use super::picture::{Picture, Plane};
use super::rrv;
use super::tables::{ROUNDTAB_76, ROUNDTAB_79};
use super::types::{MacroblockInfo, MbGrid, MotionVector};
use super::vlc::decode_mv_component;

/// 该版本及更早的 XviD 码流色度向量减半有偏差
const BUGGY_CHROMA_ROUNDING_VERSION: i32 = 1;

// ============================================================================
// 向量解码
// ============================================================================

/// 折回 `[-32·2^(f-1), 32·2^(f-1) - 1]`
#[inline]
fn wrap_component(v: i32, fcode: u32) -> i32 {
    let scale = 1i32 << (fcode.max(1) - 1);
    let low = -32 * scale;
    let high = 32 * scale - 1;
    let range = 64 * scale;
    if v < low {
        v + range
    } else if v > high {
        v - range
    } else {
        v
    }
}

/// 读取一个运动向量差分, 加上预测值后折回 fcode 范围
pub(super) fn read_mv(reader: &mut BitReader, fcode: u32, pmv: MotionVector) -> M4vResult<MotionVector> {
    let dx = decode_mv_component(reader, fcode)?;
    let dy = decode_mv_component(reader, fcode)?;
    Ok(MotionVector::new(
        wrap_component(pmv.x + dx, fcode),
        wrap_component(pmv.y + dy, fcode),
    ))
}

/// 把向量钳位到参考图像填充区内 (宏块 `(x, y)`, 网格 `grid`)
pub(super) fn validate_vector(mv: MotionVector, x: usize, y: usize, grid: MbGrid, quarterpel: bool) -> MotionVector {
    let shift = 5 + quarterpel as u32;
    let (x, y) = (x as i32, y as i32);
    let x_high = (grid.width as i32 - x) << shift;
    let x_low = (-x - 1) << shift;
    let y_high = (grid.height as i32 - y) << shift;
    let y_low = (-y - 1) << shift;
    MotionVector::new(mv.x.clamp(x_low, x_high), mv.y.clamp(y_low, y_high))
}

/// 直接模式: 由共位宏块向量按时间距离推导前后向向量
///
/// `trb` 为 B 帧到前一参考帧的距离, `trd` 为两参考帧的距离 (> 0).
pub(super) fn direct_vectors(
    colocated: &[MotionVector; 4],
    delta: MotionVector,
    trb: i32,
    trd: i32,
) -> ([MotionVector; 4], [MotionVector; 4]) {
    let mut forward = [MotionVector::ZERO; 4];
    let mut backward = [MotionVector::ZERO; 4];
    let derive = |last: i32, d: i32| {
        let f = trb * last / trd + d;
        let b = if d == 0 { (trb - trd) * last / trd } else { f - last };
        (f, b)
    };
    for i in 0..4 {
        let (fx, bx) = derive(colocated[i].x, delta.x);
        let (fy, by) = derive(colocated[i].y, delta.y);
        forward[i] = MotionVector::new(fx, fy);
        backward[i] = MotionVector::new(bx, by);
    }
    (forward, backward)
}

// ============================================================================
// 色度向量
// ============================================================================

#[inline]
fn halve_quarterpel(v: i32, bs_version: Option<i32>) -> i32 {
    match bs_version {
        Some(ver) if ver <= BUGGY_CHROMA_ROUNDING_VERSION => (v >> 1) | (v & 1),
        _ => v / 2,
    }
}

/// 单向量宏块的色度向量
pub(super) fn chroma_mv(mv: MotionVector, quarterpel: bool, bs_version: Option<i32>) -> MotionVector {
    let derive = |v: i32| {
        let v = if quarterpel { halve_quarterpel(v, bs_version) } else { v };
        (v >> 1) + ROUNDTAB_79[(v & 3) as usize]
    };
    MotionVector::new(derive(mv.x), derive(mv.y))
}

/// 四向量宏块的色度向量 (四个向量之和)
pub(super) fn chroma_mv_4(mvs: &[MotionVector; 4], quarterpel: bool, bs_version: Option<i32>) -> MotionVector {
    let sum = |f: fn(&MotionVector) -> i32| -> i32 {
        mvs.iter()
            .map(|mv| {
                let v = f(mv);
                if quarterpel { halve_quarterpel(v, bs_version) } else { v }
            })
            .sum()
    };
    let derive = |s: i32| (s >> 3) + ROUNDTAB_76[(s & 15) as usize];
    MotionVector::new(derive(sum(|mv| mv.x)), derive(sum(|mv| mv.y)))
}

// ============================================================================
// 运动补偿
// ============================================================================

/// 一帧内运动补偿共用的参数
#[derive(Debug, Clone, Copy)]
pub(super) struct McParams {
    pub quarterpel: bool,
    pub rounding: bool,
    pub bs_version: Option<i32>,
}

/// 预测 `size x size` 块到 `out` (行距 `size`)
#[allow(clippy::too_many_arguments)]
fn predict_into(
    src: &Plane,
    x: usize,
    y: usize,
    mv: MotionVector,
    size: usize,
    quarterpel: bool,
    rounding: bool,
    out: &mut [u8],
) {
    if quarterpel {
        predict_qpel(src, x as i32, y as i32, mv.x, mv.y, size, rounding, out);
    } else {
        predict_halfpel(src, x as i32, y as i32, mv.x, mv.y, size, rounding, out);
    }
}

/// 预测 `size x size` 块并写入 `dst` 的 `(x, y)`
#[allow(clippy::too_many_arguments)]
fn predict_block(
    src: &Plane,
    dst: &mut Plane,
    x: usize,
    y: usize,
    mv: MotionVector,
    size: usize,
    quarterpel: bool,
    rounding: bool,
) {
    let mut buf = [0u8; MAX_BLOCK * MAX_BLOCK];
    let out = &mut buf[..size * size];
    predict_into(src, x, y, mv, size, quarterpel, rounding, out);
    dst.put(x, y, size, size, out);
}

/// 前向预测与后向预测逐样本平均后写入
#[allow(clippy::too_many_arguments)]
fn predict_bidirectional(
    forward: &Plane,
    backward: &Plane,
    dst: &mut Plane,
    x: usize,
    y: usize,
    fmv: MotionVector,
    bmv: MotionVector,
    size: usize,
    quarterpel: bool,
) {
    let mut a = [0u8; MAX_BLOCK * MAX_BLOCK];
    let mut b = [0u8; MAX_BLOCK * MAX_BLOCK];
    let n = size * size;
    predict_into(forward, x, y, fmv, size, quarterpel, false, &mut a[..n]);
    predict_into(backward, x, y, bmv, size, quarterpel, false, &mut b[..n]);
    average_into(&mut a[..n], &b[..n]);
    dst.put(x, y, size, size, &a[..n]);
}

/// 宏块 `(mb_x, mb_y)` 的帧间预测 (不含残差)
///
/// 四向量模式下每个 8x8 亮度块使用各自的向量, 色度按四向量之和推导;
/// 其余模式只使用 `mvs[0]`. RRV 帧中尺寸加倍, 向量按 RRV 规则放大.
pub(super) fn predict_inter_mb(
    ctx: &MbContext,
    mc: McParams,
    reference: &Picture,
    cur: &mut Picture,
    mb: &MacroblockInfo,
    mb_x: usize,
    mb_y: usize,
) {
    // RRV 先放大亮度向量, 色度向量由放大后的向量推导
    let mut mvs = mb.mvs;
    for mv in mvs.iter_mut() {
        *mv = validate_vector(*mv, mb_x, mb_y, ctx.grid, mc.quarterpel);
        if ctx.reduced_resolution {
            *mv = rrv::scale_vector(*mv);
        }
    }
    let four = mb.mode.uses_four_vectors();
    let uv = if four {
        chroma_mv_4(&mvs, mc.quarterpel, mc.bs_version)
    } else {
        chroma_mv(mvs[0], mc.quarterpel, mc.bs_version)
    };

    if ctx.reduced_resolution {
        if four {
            for (k, mv) in mvs.iter().enumerate() {
                let x = mb_x * 32 + (k & 1) * 16;
                let y = mb_y * 32 + (k >> 1) * 16;
                predict_block(&reference.y, &mut cur.y, x, y, *mv, 16, false, mc.rounding);
            }
        } else {
            predict_block(&reference.y, &mut cur.y, mb_x * 32, mb_y * 32, mvs[0], 32, false, mc.rounding);
        }
        predict_block(&reference.u, &mut cur.u, mb_x * 16, mb_y * 16, uv, 16, false, mc.rounding);
        predict_block(&reference.v, &mut cur.v, mb_x * 16, mb_y * 16, uv, 16, false, mc.rounding);
        return;
    }

    if four {
        for (k, mv) in mvs.iter().enumerate() {
            let x = mb_x * 16 + (k & 1) * 8;
            let y = mb_y * 16 + (k >> 1) * 8;
            predict_block(&reference.y, &mut cur.y, x, y, *mv, 8, mc.quarterpel, mc.rounding);
        }
    } else {
        predict_block(&reference.y, &mut cur.y, mb_x * 16, mb_y * 16, mvs[0], 16, mc.quarterpel, mc.rounding);
    }
    predict_block(&reference.u, &mut cur.u, mb_x * 8, mb_y * 8, uv, 8, false, mc.rounding);
    predict_block(&reference.v, &mut cur.v, mb_x * 8, mb_y * 8, uv, 8, false, mc.rounding);
}

/// B 帧双向预测: 前向取自 `forward` (较早参考), 后向取自 `backward`
///
/// `direct` 时每个 8x8 亮度块用各自的向量对; 否则亮度按整块 `mvs[0]`/`b_mvs[0]`.
/// 双向预测不使用舍入控制.
#[allow(clippy::too_many_arguments)]
pub(super) fn predict_interpolated_mb(
    ctx: &MbContext,
    mc: McParams,
    forward: &Picture,
    backward: &Picture,
    cur: &mut Picture,
    mb: &MacroblockInfo,
    mb_x: usize,
    mb_y: usize,
    direct: bool,
) {
    let mut fmvs = mb.mvs;
    let mut bmvs = mb.b_mvs;
    for mv in fmvs.iter_mut().chain(bmvs.iter_mut()) {
        *mv = validate_vector(*mv, mb_x, mb_y, ctx.grid, mc.quarterpel);
    }
    let (fuv, buv) = if direct {
        (
            chroma_mv_4(&fmvs, mc.quarterpel, mc.bs_version),
            chroma_mv_4(&bmvs, mc.quarterpel, mc.bs_version),
        )
    } else {
        (
            chroma_mv(fmvs[0], mc.quarterpel, mc.bs_version),
            chroma_mv(bmvs[0], mc.quarterpel, mc.bs_version),
        )
    };

    if mc.quarterpel && !direct {
        predict_bidirectional(
            &forward.y,
            &backward.y,
            &mut cur.y,
            mb_x * 16,
            mb_y * 16,
            fmvs[0],
            bmvs[0],
            16,
            true,
        );
    } else {
        for k in 0..4 {
            let x = mb_x * 16 + (k & 1) * 8;
            let y = mb_y * 16 + (k >> 1) * 8;
            let (f, b) = if direct { (fmvs[k], bmvs[k]) } else { (fmvs[0], bmvs[0]) };
            predict_bidirectional(&forward.y, &backward.y, &mut cur.y, x, y, f, b, 8, mc.quarterpel);
        }
    }
    predict_bidirectional(&forward.u, &backward.u, &mut cur.u, mb_x * 8, mb_y * 8, fuv, buv, 8, false);
    predict_bidirectional(&forward.v, &backward.v, &mut cur.v, mb_x * 8, mb_y * 8, fuv, buv, 8, false);
}

/// 全局运动补偿宏块的预测
pub(super) fn predict_gmc_mb(
    gmc: &GmcParameters,
    reference: &Picture,
    cur: &mut Picture,
    mb_x: usize,
    mb_y: usize,
    rounding: bool,
) {
    let mut luma = [0u8; 256];
    gmc.predict_luma(&reference.y, mb_x, mb_y, rounding, &mut luma);
    cur.y.put(mb_x * 16, mb_y * 16, 16, 16, &luma);

    let mut u = [0u8; 64];
    let mut v = [0u8; 64];
    gmc.predict_chroma(&reference.u, &reference.v, mb_x, mb_y, rounding, &mut u, &mut v);
    cur.u.put(mb_x * 8, mb_y * 8, 8, 8, &u);
    cur.v.put(mb_x * 8, mb_y * 8, 8, 8, &v);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::mpeg4::types::{MbMode, SequenceParams};
    use m4v_core::bitwriter::BitWriter;

    #[test]
    fn test_向量折回() {
        assert_eq!(wrap_component(31, 1), 31);
        assert_eq!(wrap_component(32, 1), -32);
        assert_eq!(wrap_component(-33, 1), 31);
        assert_eq!(wrap_component(63, 2), 63);
        assert_eq!(wrap_component(64, 2), -64);
    }

    #[test]
    fn test_读取向量加预测() {
        // MVD 码字 "1" 表示 0; "010" + 符号 0 表示 +1
        let mut bw = BitWriter::new();
        bw.write_bits(0b010, 3);
        bw.write_bits(1, 1);
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mv = read_mv(&mut br, 1, MotionVector::new(31, -3)).unwrap();
        assert_eq!(mv, MotionVector::new(-32, -3));
    }

    #[test]
    fn test_向量钳位到填充区() {
        let grid = MbGrid { width: 4, height: 3 };
        let mv = validate_vector(MotionVector::new(-1000, 1000), 0, 0, grid, false);
        assert_eq!(mv, MotionVector::new(-32, 3 * 32));
        let mv = validate_vector(MotionVector::new(1000, -1000), 3, 2, grid, true);
        assert_eq!(mv, MotionVector::new(64, -3 * 64));
        let mv = validate_vector(MotionVector::new(5, -7), 1, 1, grid, false);
        assert_eq!(mv, MotionVector::new(5, -7));
    }

    #[test]
    fn test_色度向量推导() {
        // 半像素: 3 → (3 >> 1) + roundtab_79[3] = 1
        assert_eq!(chroma_mv(MotionVector::new(3, -3), false, None), MotionVector::new(1, -1));
        // 四分之一像素: 新码流 v / 2 向零取整, 旧码流 (v >> 1) | (v & 1)
        assert_eq!(chroma_mv(MotionVector::new(-3, 0), true, None).x, (-1 >> 1) + ROUNDTAB_79[3]);
        assert_eq!(chroma_mv(MotionVector::new(-3, 0), true, Some(1)).x, (-1 >> 1) + ROUNDTAB_79[3]);
        assert_eq!(chroma_mv(MotionVector::new(6, 0), true, Some(1)).x, 1 + ROUNDTAB_79[3]);
        assert_eq!(chroma_mv(MotionVector::new(6, 0), true, None).x, 1 + ROUNDTAB_79[3]);
        assert_eq!(chroma_mv(MotionVector::new(5, 0), true, Some(1)).x, 1 + ROUNDTAB_79[3]);
        assert_eq!(chroma_mv(MotionVector::new(5, 0), true, None).x, 1 + ROUNDTAB_79[2]);

        let mvs = [MotionVector::new(1, 2); 4];
        // 和为 4 / 8: (4 >> 3) + roundtab_76[4] = 1
        assert_eq!(chroma_mv_4(&mvs, false, None), MotionVector::new(1, 1));
    }

    #[test]
    fn test_直接模式向量() {
        let colocated = [MotionVector::new(8, -4); 4];
        let (f, b) = direct_vectors(&colocated, MotionVector::ZERO, 1, 3);
        assert_eq!(f[0], MotionVector::new(2, -1));
        assert_eq!(b[0], MotionVector::new(-16 / 3, 8 / 3));

        let (f, b) = direct_vectors(&colocated, MotionVector::new(1, 0), 1, 3);
        assert_eq!(f[0], MotionVector::new(3, -1));
        assert_eq!(b[0].x, 3 - 8);
        assert_eq!(b[0].y, 8 / 3);

        // 最大时间分辨率下仍以 32 位整数向零截断
        let colocated = [MotionVector::new(-2047, 2047); 4];
        let (f, b) = direct_vectors(&colocated, MotionVector::ZERO, 65534, 65535);
        assert_eq!(f[3], MotionVector::new(-2046, 2046));
        assert_eq!(b[3], MotionVector::ZERO);
    }

    fn textured_picture(mb_w: usize, mb_h: usize) -> Picture {
        let mut pic = Picture::new(mb_w, mb_h);
        for y in 0..mb_h * 16 {
            for x in 0..mb_w * 16 {
                pic.y.set(x, y, ((x * 7 + y * 13) % 251) as u8);
            }
        }
        for y in 0..mb_h * 8 {
            for x in 0..mb_w * 8 {
                pic.u.set(x, y, (x * 3 + y) as u8);
                pic.v.set(x, y, (x + y * 3) as u8);
            }
        }
        pic.set_edges((mb_w * 16) as u32, (mb_h * 16) as u32, None);
        pic
    }

    #[test]
    fn test_整像素平移() {
        let seq = SequenceParams::default();
        let ctx = MbContext {
            seq: &seq,
            grid: MbGrid { width: 2, height: 2 },
            alternate_vertical_scan: false,
            reduced_resolution: false,
            intra_dc_threshold: 32,
            bound: 0,
        };
        let reference = textured_picture(2, 2);
        let mut cur = Picture::new(2, 2);
        let mut mb = MacroblockInfo::default();
        mb.mode = MbMode::Inter;
        // 半像素 (4, 2) = 整像素 (2, 1)
        mb.set_all_mvs(MotionVector::new(4, 2));
        let mc = McParams {
            quarterpel: false,
            rounding: false,
            bs_version: None,
        };
        predict_inter_mb(&ctx, mc, &reference, &mut cur, &mb, 0, 0);
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(cur.y.get(x, y), reference.y.get(x + 2, y + 1));
            }
        }
        // 色度向量 (2, 1): x 整像素 1, y 半像素
        let expected = (u16::from(reference.u.get(1, 0)) + u16::from(reference.u.get(1, 1)) + 1) >> 1;
        assert_eq!(u16::from(cur.u.get(0, 0)), expected);
    }

    #[test]
    fn test_rrv色度向量由放大后的向量推导() {
        let seq = SequenceParams::default();
        let ctx = MbContext {
            seq: &seq,
            grid: MbGrid { width: 2, height: 1 },
            alternate_vertical_scan: false,
            reduced_resolution: true,
            intra_dc_threshold: 32,
            bound: 0,
        };
        let reference = textured_picture(4, 2);
        let mut cur = Picture::new(4, 2);
        let mut mb = MacroblockInfo::default();
        mb.mode = MbMode::Inter;
        // 亮度放大为 5, 色度 (5 >> 1) + roundtab_79[1] = 3, 即整像素 1 加半像素
        mb.set_all_mvs(MotionVector::new(3, 0));
        let mc = McParams {
            quarterpel: false,
            rounding: false,
            bs_version: None,
        };
        predict_inter_mb(&ctx, mc, &reference, &mut cur, &mb, 0, 0);

        let half = |p: &Plane, x: i32, y: i32| ((u16::from(p.get(x, y)) + u16::from(p.get(x + 1, y)) + 1) >> 1) as u8;
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(cur.u.get(x, y), half(&reference.u, x + 1, y), "u ({}, {})", x, y);
                assert_eq!(cur.v.get(x, y), half(&reference.v, x + 1, y), "v ({}, {})", x, y);
            }
        }
        // 亮度向量 5: 整像素 2 加半像素, 覆盖 32x32
        assert_eq!(cur.y.get(0, 0), half(&reference.y, 2, 0));
        assert_eq!(cur.y.get(31, 31), half(&reference.y, 33, 31));
    }

    #[test]
    fn test_双向平均() {
        let seq = SequenceParams::default();
        let ctx = MbContext {
            seq: &seq,
            grid: MbGrid { width: 1, height: 1 },
            alternate_vertical_scan: false,
            reduced_resolution: false,
            intra_dc_threshold: 32,
            bound: 0,
        };
        let mut forward = Picture::new(1, 1);
        forward.y.fill(10);
        forward.u.fill(20);
        forward.v.fill(30);
        let mut backward = Picture::new(1, 1);
        backward.y.fill(21);
        backward.u.fill(40);
        backward.v.fill(60);
        let mut cur = Picture::new(1, 1);
        let mb = MacroblockInfo::default();
        let mc = McParams {
            quarterpel: false,
            rounding: true,
            bs_version: None,
        };
        predict_interpolated_mb(&ctx, mc, &forward, &backward, &mut cur, &mb, 0, 0, false);
        assert_eq!(cur.y.get(5, 5), 15);
        assert_eq!(cur.u.get(0, 0), 30);
        assert_eq!(cur.v.get(7, 7), 45);
    }
}
