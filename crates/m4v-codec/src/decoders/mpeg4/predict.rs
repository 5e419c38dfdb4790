//! 帧内 AC/DC 预测与运动向量预测
//!
//! 两种预测都只使用因果邻居 (左, 上, 左上 / 右上), 并以当前视频包的
//! 起始宏块序号 `bound` 作为可用性下界: 序号小于 `bound` 的宏块属于前一个
//! 视频包, 视为不存在.

use super::dequant::Block;
use super::types::{MacroblockInfo, MotionVector};

/// 每块预测值的长度: DC, 首行 AC 1-7, 首列 AC 1-7
const PRED_SIZE: usize = 15;

/// 不可用邻居的预测值
const DEFAULT_PRED_VALUES: [i32; PRED_SIZE] = [1024, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// DC 缩放因子
pub(super) fn dc_scaler(quant: u32, luma: bool) -> u32 {
    if quant < 5 {
        return 8;
    }
    if quant < 25 && !luma {
        return (quant + 13) / 2;
    }
    if quant < 9 {
        return 2 * quant;
    }
    if quant < 25 {
        return quant + 8;
    }
    if luma { 2 * quant - 16 } else { quant - 6 }
}

/// 四舍五入 (远离零) 的整数除法
#[inline]
fn div_div(a: i32, b: i32) -> i32 {
    if a > 0 { (a + (b >> 1)) / b } else { (a - (b >> 1)) / b }
}

/// 把邻块 AC 从其量化步长换算到当前量化步长
#[inline]
fn rescale(pred_quant: u32, current_quant: u32, coeff: i32) -> i32 {
    if coeff == 0 {
        0
    } else {
        div_div(coeff * pred_quant as i32, current_quant as i32)
    }
}

// ============================================================================
// AC/DC 预测
// ============================================================================

/// 单个 8x8 块的 AC/DC 预测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct AcdcPrediction {
    /// 1 = 自上预测 (首行), 2 = 自左预测 (首列)
    pub direction: u8,
    /// [DC, AC 1-7], 已换算到当前块的量化域
    pub predictors: [i32; 8],
}

/// 计算宏块 `index` 第 `block` 块的 AC/DC 预测
///
/// 调用前当前宏块的 `mode`/`quant` 必须已更新, 且本宏块前面各块的
/// `pred_values` 已由 [`add_acdc`] 写入.
pub(super) fn predict_acdc(
    mbs: &[MacroblockInfo],
    mb_width: usize,
    index: usize,
    block: usize,
    current_quant: u32,
    dc_scaler: u32,
    bound: usize,
) -> AcdcPrediction {
    let x = index % mb_width;
    let intra_at = |i: usize| mbs.get(i).filter(|mb| mb.mode.is_intra());

    let left = if x > 0 && index >= bound + 1 {
        intra_at(index - 1)
    } else {
        None
    };
    let top = if index >= bound + mb_width {
        intra_at(index - mb_width)
    } else {
        None
    };
    let diag = if x > 0 && index >= bound + mb_width + 1 {
        intra_at(index - mb_width - 1)
    } else {
        None
    };
    let current = &mbs[index];

    let mut left_quant = left.map_or(current_quant, |mb| mb.quant);
    let mut top_quant = top.map_or(current_quant, |mb| mb.quant);
    let mut p_left = &DEFAULT_PRED_VALUES;
    let mut p_top = &DEFAULT_PRED_VALUES;
    let mut p_diag = &DEFAULT_PRED_VALUES;

    match block {
        0 => {
            if let Some(mb) = left {
                p_left = &mb.pred_values[1];
            }
            if let Some(mb) = top {
                p_top = &mb.pred_values[2];
            }
            if let Some(mb) = diag {
                p_diag = &mb.pred_values[3];
            }
        }
        1 => {
            p_left = &current.pred_values[0];
            left_quant = current_quant;
            if let Some(mb) = top {
                p_top = &mb.pred_values[3];
                p_diag = &mb.pred_values[2];
            }
        }
        2 => {
            if let Some(mb) = left {
                p_left = &mb.pred_values[3];
                p_diag = &mb.pred_values[1];
            }
            p_top = &current.pred_values[0];
            top_quant = current_quant;
        }
        3 => {
            p_left = &current.pred_values[2];
            left_quant = current_quant;
            p_top = &current.pred_values[1];
            top_quant = current_quant;
            p_diag = &current.pred_values[0];
        }
        _ => {
            if let Some(mb) = left {
                p_left = &mb.pred_values[block];
            }
            if let Some(mb) = top {
                p_top = &mb.pred_values[block];
            }
            if let Some(mb) = diag {
                p_diag = &mb.pred_values[block];
            }
        }
    }

    let scaler = dc_scaler as i32;
    let mut predictors = [0i32; 8];
    // 水平梯度严格小于垂直梯度时自上预测, 相等时自左
    if (p_left[0] - p_diag[0]).abs() < (p_diag[0] - p_top[0]).abs() {
        predictors[0] = div_div(p_top[0], scaler);
        for i in 1..8 {
            predictors[i] = rescale(top_quant, current_quant, p_top[i]);
        }
        AcdcPrediction {
            direction: 1,
            predictors,
        }
    } else {
        predictors[0] = div_div(p_left[0], scaler);
        for i in 1..8 {
            predictors[i] = rescale(left_quant, current_quant, p_left[i + 7]);
        }
        AcdcPrediction {
            direction: 2,
            predictors,
        }
    }
}

/// 把预测值加回系数, 并保存本块的 DC 与首行/首列 AC 供后续块预测
///
/// `mb.acpred_directions[block]` 为 0 时只预测 DC.
pub(super) fn add_acdc(
    mb: &mut MacroblockInfo,
    block: usize,
    coeffs: &mut Block,
    dc_scaler: u32,
    predictors: &[i32; 8],
) {
    let direction = mb.acpred_directions[block];
    let current = &mut mb.pred_values[block];

    coeffs[0] += predictors[0];
    current[0] = (coeffs[0] * dc_scaler as i32).clamp(-2048, 2047);

    match direction {
        1 => {
            for i in 1..8 {
                coeffs[i] += predictors[i];
                current[i] = coeffs[i];
                current[i + 7] = coeffs[i * 8];
            }
        }
        2 => {
            for i in 1..8 {
                coeffs[i * 8] += predictors[i];
                current[i + 7] = coeffs[i * 8];
                current[i] = coeffs[i];
            }
        }
        _ => {
            for i in 1..8 {
                current[i] = coeffs[i];
                current[i + 7] = coeffs[i * 8];
            }
        }
    }
}

// ============================================================================
// 运动向量预测
// ============================================================================

/// 第 `block` 个 8x8 块的 (左, 上, 右上) 候选: (dx, dy, 块号)
const MV_CANDIDATES: [[(i64, i64, usize); 3]; 4] = [
    [(-1, 0, 1), (0, -1, 2), (1, -1, 2)],
    [(0, 0, 0), (0, -1, 3), (1, -1, 2)],
    [(-1, 0, 3), (0, 0, 0), (0, 0, 1)],
    [(0, 0, 2), (0, 0, 0), (0, 0, 1)],
];

#[inline]
fn median(a: i32, b: i32, c: i32) -> i32 {
    a.max(b).min(b.max(c).min(a.max(c)))
}

/// 宏块 `(x, y)` 第 `block` 块的运动向量预测值
///
/// 多于一个候选可用时取分量中值 (不可用候选按零计), 否则取最后一个可用
/// 候选, 都不可用时为零向量.
pub(super) fn predict_mv(
    mbs: &[MacroblockInfo],
    mb_width: usize,
    bound: usize,
    x: usize,
    y: usize,
    block: usize,
) -> MotionVector {
    let width = mb_width as i64;
    let bound = bound as i64;
    let mut cands = [MotionVector::ZERO; 3];
    let mut count = 0;
    let mut last = 0;

    for (slot, &(dx, dy, k)) in MV_CANDIDATES[block.min(3)].iter().enumerate() {
        let cx = x as i64 + dx;
        let cy = y as i64 + dy;
        let pos = cx + cy * width;
        let inside = match slot {
            0 => cx >= 0,
            2 => cx < width,
            _ => true,
        };
        if inside && pos >= bound {
            if let Some(mb) = mbs.get(pos as usize) {
                cands[slot] = mb.mvs[k];
                count += 1;
                last = slot;
            }
        }
    }

    if count > 1 {
        MotionVector::new(
            median(cands[0].x, cands[1].x, cands[2].x),
            median(cands[0].y, cands[1].y, cands[2].y),
        )
    } else {
        cands[last]
    }
}
