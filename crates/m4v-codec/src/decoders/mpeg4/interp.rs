//! 半像素与四分之一像素运动补偿插值
//!
//! 预测结果写入调用方提供的局部缓冲 (行距等于块宽), 再由调用方放入图像.

use super::picture::Plane;

/// 单次插值的最大块宽 (RRV 亮度 32x32)
pub(super) const MAX_BLOCK: usize = 32;
const WIN: usize = MAX_BLOCK + 1;
/// 四分之一像素窗口行距
const QS: usize = 17;

// ============================================================================
// 半像素
// ============================================================================

/// 半像素预测 `size x size` 块
///
/// `(x, y)` 为块在参考平面中的整像素位置, `(dx, dy)` 为半像素向量.
#[allow(clippy::too_many_arguments)]
pub(super) fn predict_halfpel(
    src: &Plane,
    x: i32,
    y: i32,
    dx: i32,
    dy: i32,
    size: usize,
    rounding: bool,
    out: &mut [u8],
) {
    let r = rounding as i32;
    let sx = x + (dx >> 1);
    let sy = y + (dy >> 1);
    let mut win = [0u8; WIN * WIN];
    let ws = size + 1;
    src.fetch(sx, sy, ws, ws, &mut win[..ws * ws]);
    let at = |row: usize, col: usize| i32::from(win[row * ws + col]);

    match ((dx & 1) << 1) | (dy & 1) {
        0 => {
            for row in 0..size {
                for col in 0..size {
                    out[row * size + col] = win[row * ws + col];
                }
            }
        }
        1 => {
            for row in 0..size {
                for col in 0..size {
                    out[row * size + col] = ((at(row, col) + at(row + 1, col) + 1 - r) >> 1) as u8;
                }
            }
        }
        2 => {
            for row in 0..size {
                for col in 0..size {
                    out[row * size + col] = ((at(row, col) + at(row, col + 1) + 1 - r) >> 1) as u8;
                }
            }
        }
        _ => {
            for row in 0..size {
                for col in 0..size {
                    let sum = at(row, col) + at(row, col + 1) + at(row + 1, col) + at(row + 1, col + 1);
                    out[row * size + col] = ((sum + 2 - r) >> 2) as u8;
                }
            }
        }
    }
}

// ============================================================================
// 四分之一像素
// ============================================================================

const QPEL_TAPS: [i32; 8] = [-1, 3, -6, 20, 20, -6, 3, -1];

/// 8 抽头低通, 越过 `[0, n]` 的抽头按块边镜像
#[inline]
fn lowpass(sample: impl Fn(usize) -> i32, i: usize, n: usize, rounding: i32) -> u8 {
    let mut sum = 0;
    for (k, tap) in QPEL_TAPS.iter().enumerate() {
        let idx = i as i32 + k as i32 - 3;
        let idx = if idx < 0 {
            -1 - idx
        } else if idx > n as i32 {
            2 * n as i32 + 1 - idx
        } else {
            idx
        };
        sum += tap * sample(idx as usize);
    }
    ((sum + 16 - rounding) >> 5).clamp(0, 255) as u8
}

/// `n + 1` 行 x `n + 1` 列的矩阵, 行距 17
type QBuf = [u8; QS * QS];

/// 对 `rows` 行做水平低通, 每行输出 `n` 个样本
fn lowpass_h(src: &QBuf, rows: usize, n: usize, r: i32) -> QBuf {
    let mut dst = [0u8; QS * QS];
    for row in 0..rows {
        for col in 0..n {
            dst[row * QS + col] = lowpass(|i| i32::from(src[row * QS + i]), col, n, r);
        }
    }
    dst
}

/// 对 `n` 列做垂直低通 (输入 `n + 1` 行), 输出 `n` 行
fn lowpass_v(src: &QBuf, n: usize, r: i32) -> QBuf {
    let mut dst = [0u8; QS * QS];
    for col in 0..n {
        for row in 0..n {
            dst[row * QS + col] = lowpass(|i| i32::from(src[i * QS + col]), row, n, r);
        }
    }
    dst
}

/// 逐样本平均, `a` 偏移 `(ar, ac)`
fn average(a: &QBuf, ar: usize, ac: usize, b: &QBuf, rows: usize, n: usize, r: i32) -> QBuf {
    let mut dst = [0u8; QS * QS];
    for row in 0..rows {
        for col in 0..n {
            let va = i32::from(a[(row + ar) * QS + col + ac]);
            let vb = i32::from(b[row * QS + col]);
            dst[row * QS + col] = ((va + vb + 1 - r) >> 1) as u8;
        }
    }
    dst
}

/// 四分之一像素预测 `n x n` 块 (`n` 为 8 或 16, 16x16 作为整体滤波)
///
/// `(x, y)` 为块的整像素位置, `(dx, dy)` 为四分之一像素向量.
#[allow(clippy::too_many_arguments)]
pub(super) fn predict_qpel(
    src: &Plane,
    x: i32,
    y: i32,
    dx: i32,
    dy: i32,
    n: usize,
    rounding: bool,
    out: &mut [u8],
) {
    let r = rounding as i32;
    let x_ref = x * 4 + dx;
    let y_ref = y * 4 + dy;
    let quads = (dx & 3) | ((dy & 3) << 2);

    let ws = n + 1;
    let mut tmp = [0u8; QS * QS];
    src.fetch(x_ref >> 2, y_ref >> 2, ws, ws, &mut tmp[..ws * ws]);
    let mut w: QBuf = [0u8; QS * QS];
    for row in 0..ws {
        w[row * QS..row * QS + ws].copy_from_slice(&tmp[row * ws..(row + 1) * ws]);
    }

    let full = n + 1;
    let result: QBuf = match quads {
        0 => w,
        1 => average(&w, 0, 0, &lowpass_h(&w, n, n, r), n, n, r),
        2 => lowpass_h(&w, n, n, r),
        3 => average(&w, 0, 1, &lowpass_h(&w, n, n, r), n, n, r),
        4 => average(&w, 0, 0, &lowpass_v(&w, n, r), n, n, r),
        5 => {
            let t = average(&w, 0, 0, &lowpass_h(&w, full, n, r), full, n, r);
            average(&t, 0, 0, &lowpass_v(&t, n, r), n, n, r)
        }
        6 => {
            let h = lowpass_h(&w, full, n, r);
            average(&h, 0, 0, &lowpass_v(&h, n, r), n, n, r)
        }
        7 => {
            let t = average(&w, 0, 1, &lowpass_h(&w, full, n, r), full, n, r);
            average(&t, 0, 0, &lowpass_v(&t, n, r), n, n, r)
        }
        8 => lowpass_v(&w, n, r),
        9 => {
            let t = average(&w, 0, 0, &lowpass_h(&w, full, n, r), full, n, r);
            lowpass_v(&t, n, r)
        }
        10 => lowpass_v(&lowpass_h(&w, full, n, r), n, r),
        11 => {
            let t = average(&w, 0, 1, &lowpass_h(&w, full, n, r), full, n, r);
            lowpass_v(&t, n, r)
        }
        12 => average(&w, 1, 0, &lowpass_v(&w, n, r), n, n, r),
        13 => {
            let t = average(&w, 0, 0, &lowpass_h(&w, full, n, r), full, n, r);
            average(&t, 1, 0, &lowpass_v(&t, n, r), n, n, r)
        }
        14 => {
            let h = lowpass_h(&w, full, n, r);
            average(&h, 1, 0, &lowpass_v(&h, n, r), n, n, r)
        }
        _ => {
            let t = average(&w, 0, 1, &lowpass_h(&w, full, n, r), full, n, r);
            average(&t, 1, 0, &lowpass_v(&t, n, r), n, n, r)
        }
    };

    for row in 0..n {
        out[row * n..(row + 1) * n].copy_from_slice(&result[row * QS..row * QS + n]);
    }
}

// ============================================================================
// 组合
// ============================================================================

/// B 帧双向平均 `(a + b) >> 1`
pub(super) fn average_into(dst: &mut [u8], other: &[u8]) {
    for (d, &o) in dst.iter_mut().zip(other) {
        *d = ((u16::from(*d) + u16::from(o)) >> 1) as u8;
    }
}
