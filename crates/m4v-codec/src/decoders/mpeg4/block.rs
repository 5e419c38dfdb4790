//! 8x8 块级系数解码与宏块残差重建
//!
//! 帧内宏块: DC 差分 (或随 AC 一起编码), AC/DC 预测, 反量化, IDCT, 写入图像.
//! 帧间宏块: 先解出全部编码块, 再叠加到运动补偿预测上.
//! RRV 帧中残差块上采样到 16x16 后写入.

use m4v_core::bitreader::BitReader;
use m4v_core::{M4vError, M4vResult};

use super::dequant::{Block, dequant_inter, dequant_intra};
use super::idct::idct_8x8;
use super::picture::{Picture, Plane};
use super::predict::{add_acdc, dc_scaler, predict_acdc};
use super::rrv;
use super::tables::SCAN_TABLES;
use super::types::{MacroblockInfo, MbGrid, SequenceParams};
use super::vlc::{decode_coefficient, decode_dc_dif, decode_dc_size_chrom, decode_dc_size_lum};

/// 一帧宏块层共用的参数
///
/// `intra_dc_threshold` 与 `bound` 会被视频包头更新.
#[derive(Debug, Clone, Copy)]
pub(super) struct MbContext<'a> {
    pub seq: &'a SequenceParams,
    pub grid: MbGrid,
    pub alternate_vertical_scan: bool,
    pub reduced_resolution: bool,
    pub intra_dc_threshold: u32,
    /// 当前视频包的首个宏块序号
    pub bound: usize,
}

impl MbContext<'_> {
    fn inter_scan(&self) -> &'static [usize; 64] {
        SCAN_TABLES[if self.alternate_vertical_scan { 2 } else { 0 }]
    }
}

// ============================================================================
// 系数读取
// ============================================================================

fn read_coeffs(
    reader: &mut BitReader,
    block: &mut Block,
    scan: &[usize; 64],
    start: usize,
    intra: bool,
) -> M4vResult<()> {
    let mut pos = start;
    loop {
        let event = decode_coefficient(reader, intra)?;
        pos += event.run as usize;
        if pos > 63 {
            return Err(M4vError::InvalidCoefficient(format!(
                "系数游程越过块尾 (位置 {})",
                pos
            )));
        }
        block[scan[pos]] = event.level;
        pos += 1;
        if event.last {
            return Ok(());
        }
    }
}

/// 读取帧内块的系数, 从扫描位置 `start` 开始 (DC 已单独解码时为 1)
pub(super) fn read_intra_coeffs(
    reader: &mut BitReader,
    block: &mut Block,
    scan: &[usize; 64],
    start: usize,
) -> M4vResult<()> {
    read_coeffs(reader, block, scan, start, true)
}

/// 读取帧间块的系数
pub(super) fn read_inter_coeffs(reader: &mut BitReader, block: &mut Block, scan: &[usize; 64]) -> M4vResult<()> {
    read_coeffs(reader, block, scan, 0, false)
}

// ============================================================================
// 块放置
// ============================================================================

fn plane_mut(picture: &mut Picture, index: usize) -> &mut Plane {
    match index {
        0 => &mut picture.y,
        1 => &mut picture.u,
        _ => &mut picture.v,
    }
}

/// 第 `block` 块的放置: (平面, x, y, 行距)
///
/// 场 DCT 时亮度块 2/3 从第 1 行起, 隔行写入.
fn block_position(mb_x: usize, mb_y: usize, block: usize, field_dct: bool) -> (usize, usize, usize, usize) {
    if block < 4 {
        let (next, step) = if field_dct { (1, 2) } else { (8, 1) };
        (0, mb_x * 16 + (block & 1) * 8, mb_y * 16 + (block >> 1) * next, step)
    } else {
        (block - 3, mb_x * 8, mb_y * 8, 1)
    }
}

/// RRV 帧中第 `block` 块的 16x16 放置: (平面, x, y)
fn rrv_block_position(mb_x: usize, mb_y: usize, block: usize) -> (usize, usize, usize) {
    if block < 4 {
        (0, mb_x * 32 + (block & 1) * 16, mb_y * 32 + (block >> 1) * 16)
    } else {
        (block - 3, mb_x * 16, mb_y * 16)
    }
}

fn put_residual(
    ctx: &MbContext,
    picture: &mut Picture,
    mb: &MacroblockInfo,
    mb_x: usize,
    mb_y: usize,
    block: usize,
    data: &Block,
) {
    if ctx.reduced_resolution {
        let (plane, x, y) = rrv_block_position(mb_x, mb_y, block);
        rrv::copy_upsampled(plane_mut(picture, plane), x, y, data);
    } else {
        let (plane, x, y, step) = block_position(mb_x, mb_y, block, mb.field_dct);
        plane_mut(picture, plane).put_block(x, y, step, data);
    }
}

fn add_residual(
    ctx: &MbContext,
    picture: &mut Picture,
    mb: &MacroblockInfo,
    mb_x: usize,
    mb_y: usize,
    block: usize,
    data: &Block,
) {
    if ctx.reduced_resolution {
        let (plane, x, y) = rrv_block_position(mb_x, mb_y, block);
        rrv::add_upsampled(plane_mut(picture, plane), x, y, data);
    } else {
        let (plane, x, y, step) = block_position(mb_x, mb_y, block, mb.field_dct);
        plane_mut(picture, plane).add_block(x, y, step, data);
    }
}

// ============================================================================
// 帧内宏块
// ============================================================================

/// 解码并重建一个帧内宏块
///
/// 调用前 `mbs[index]` 的 `mode`/`quant`/`cbp`/`field_dct` 已由宏块头填好.
/// `index` 以网格宽度为行距.
pub(super) fn decode_intra_mb(
    reader: &mut BitReader,
    ctx: &MbContext,
    mbs: &mut [MacroblockInfo],
    index: usize,
    acpred: bool,
    picture: &mut Picture,
) -> M4vResult<()> {
    let mb_x = index % ctx.grid.width;
    let mb_y = index / ctx.grid.width;
    let quant = mbs[index].quant;
    let cbp = mbs[index].cbp;
    let dc_coded = quant < ctx.intra_dc_threshold;

    for i in 0..6 {
        let luma = i < 4;
        let scaler = dc_scaler(quant, luma);
        let pred = predict_acdc(mbs, ctx.grid.width, index, i, quant, scaler, ctx.bound);
        mbs[index].acpred_directions[i] = if acpred { pred.direction } else { 0 };

        let mut coeffs: Block = [0; 64];
        let mut start = 0;
        if dc_coded {
            let dc_size = if luma {
                decode_dc_size_lum(reader)?
            } else {
                decode_dc_size_chrom(reader)?
            };
            coeffs[0] = decode_dc_dif(reader, dc_size)?;
            if dc_size > 8 {
                // marker
                reader.consume(1)?;
            }
            start = 1;
        }

        if cbp & (1 << (5 - i)) != 0 {
            let direction = if ctx.alternate_vertical_scan {
                2
            } else {
                usize::from(mbs[index].acpred_directions[i])
            };
            read_intra_coeffs(reader, &mut coeffs, SCAN_TABLES[direction], start)?;
        }

        add_acdc(&mut mbs[index], i, &mut coeffs, scaler, &pred.predictors);
        let mut data = dequant_intra(ctx.seq, &coeffs, quant, scaler);
        idct_8x8(&mut data);
        put_residual(ctx, picture, &mbs[index], mb_x, mb_y, i, &data);
    }
    Ok(())
}

// ============================================================================
// 帧间残差
// ============================================================================

/// 解码 `cbp` 指示的残差块并叠加到 `(mb_x, mb_y)` 处的预测上
pub(super) fn decode_inter_residual(
    reader: &mut BitReader,
    ctx: &MbContext,
    mb: &MacroblockInfo,
    mb_x: usize,
    mb_y: usize,
    picture: &mut Picture,
) -> M4vResult<()> {
    let scan = ctx.inter_scan();
    let mut blocks = [[0i32; 64]; 6];
    for (i, data) in blocks.iter_mut().enumerate() {
        if mb.cbp & (1 << (5 - i)) == 0 {
            continue;
        }
        let mut coeffs: Block = [0; 64];
        read_inter_coeffs(reader, &mut coeffs, scan)?;
        *data = dequant_inter(ctx.seq, &coeffs, mb.quant);
        idct_8x8(data);
    }
    for (i, data) in blocks.iter().enumerate() {
        if mb.cbp & (1 << (5 - i)) != 0 {
            add_residual(ctx, picture, mb, mb_x, mb_y, i, data);
        }
    }
    Ok(())
}
