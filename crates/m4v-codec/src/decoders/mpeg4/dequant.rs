//! 反量化 (H.263 和 MPEG 两种类型)
//!
//! 输入输出均为自然顺序的 8x8 系数块. 正值饱和到 2047, 负值饱和到 -2048.

use super::types::SequenceParams;

/// 8x8 系数块 (自然顺序)
pub(super) type Block = [i32; 64];

#[inline]
fn saturate(level: i32, negative: bool) -> i32 {
    if negative {
        -(level.min(2048))
    } else {
        level.min(2047)
    }
}

#[inline]
fn scale_dc(dc: i32, dc_scaler: u32) -> i32 {
    (dc * dc_scaler as i32).clamp(-2048, 2047)
}

/// H.263 帧内反量化, DC 按 `dc_scaler` 单独缩放
pub(super) fn dequant_h263_intra(coeff: &Block, quant: u32, dc_scaler: u32) -> Block {
    let quant_m2 = (quant << 1) as i32;
    let quant_add = if quant & 1 != 0 { quant } else { quant - 1 } as i32;
    let mut data = [0i32; 64];
    data[0] = scale_dc(coeff[0], dc_scaler);
    for i in 1..64 {
        let level = coeff[i];
        if level != 0 {
            data[i] = saturate(quant_m2 * level.abs() + quant_add, level < 0);
        }
    }
    data
}

/// H.263 帧间反量化
pub(super) fn dequant_h263_inter(coeff: &Block, quant: u32) -> Block {
    let quant_m2 = (quant << 1) as i32;
    let quant_add = if quant & 1 != 0 { quant } else { quant - 1 } as i32;
    let mut data = [0i32; 64];
    for i in 0..64 {
        let level = coeff[i];
        if level != 0 {
            data[i] = saturate(quant_m2 * level.abs() + quant_add, level < 0);
        }
    }
    data
}

/// MPEG 帧内反量化 (量化矩阵为自然顺序)
pub(super) fn dequant_mpeg_intra(
    coeff: &Block,
    quant: u32,
    dc_scaler: u32,
    matrix: &[u8; 64],
) -> Block {
    let mut data = [0i32; 64];
    data[0] = scale_dc(coeff[0], dc_scaler);
    for i in 1..64 {
        let level = coeff[i];
        if level != 0 {
            let value = (level.abs() * i32::from(matrix[i]) * quant as i32) >> 3;
            data[i] = saturate(value, level < 0);
        }
    }
    data
}

/// MPEG 帧间反量化, 带失配控制
///
/// 所有输出异或和为偶数时翻转系数 63 的最低位.
pub(super) fn dequant_mpeg_inter(coeff: &Block, quant: u32, matrix: &[u8; 64]) -> Block {
    let mut data = [0i32; 64];
    let mut sum = 0i32;
    for i in 0..64 {
        let level = coeff[i];
        if level != 0 {
            let value = ((2 * level.abs() + 1) * i32::from(matrix[i]) * quant as i32) >> 4;
            data[i] = saturate(value, level < 0);
            sum ^= data[i];
        }
    }
    if sum & 1 == 0 {
        data[63] ^= 1;
    }
    data
}

/// 按序列的 quant_type 选择帧内反量化
pub(super) fn dequant_intra(seq: &SequenceParams, coeff: &Block, quant: u32, dc_scaler: u32) -> Block {
    if seq.quant_type == 0 {
        dequant_h263_intra(coeff, quant, dc_scaler)
    } else {
        dequant_mpeg_intra(coeff, quant, dc_scaler, &seq.intra_matrix)
    }
}

/// 按序列的 quant_type 选择帧间反量化
pub(super) fn dequant_inter(seq: &SequenceParams, coeff: &Block, quant: u32) -> Block {
    if seq.quant_type == 0 {
        dequant_h263_inter(coeff, quant)
    } else {
        dequant_mpeg_inter(coeff, quant, &seq.inter_matrix)
    }
}
