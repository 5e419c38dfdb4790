//! 整数 IDCT (Chen-Wang 算法)
//!
//! 先行后列的可分离 8 点变换. 行变换结果截断为 16 位, 列变换输出钳位到
//! [-512, 511]. 只有 DC 的行/列走捷径.

use super::dequant::Block;

/// 2048 * sqrt(2) * cos(k * pi / 16)
const W1: i32 = 2841;
const W2: i32 = 2676;
const W3: i32 = 2408;
const W5: i32 = 1609;
const W6: i32 = 1108;
const W7: i32 = 565;

#[inline]
fn iclp(v: i32) -> i32 {
    v.clamp(-512, 511)
}

fn idct_row(blk: &mut [i32]) {
    let x1 = blk[4] << 11;
    let x2 = blk[6];
    let x3 = blk[2];
    let x4 = blk[1];
    let x5 = blk[7];
    let x6 = blk[5];
    let x7 = blk[3];
    if x1 | x2 | x3 | x4 | x5 | x6 | x7 == 0 {
        let v = (blk[0] << 3) as i16 as i32;
        blk[..8].fill(v);
        return;
    }
    let (mut x0, mut x1, mut x2, mut x3, mut x4, mut x5, mut x6, mut x7) =
        ((blk[0] << 11) + 128, x1, x2, x3, x4, x5, x6, x7);

    // 第一级
    let mut x8 = W7 * (x4 + x5);
    x4 = x8 + (W1 - W7) * x4;
    x5 = x8 - (W1 + W7) * x5;
    x8 = W3 * (x6 + x7);
    x6 = x8 - (W3 - W5) * x6;
    x7 = x8 - (W3 + W5) * x7;

    // 第二级
    x8 = x0 + x1;
    x0 -= x1;
    x1 = W6 * (x3 + x2);
    x2 = x1 - (W2 + W6) * x2;
    x3 = x1 + (W2 - W6) * x3;
    x1 = x4 + x6;
    x4 -= x6;
    x6 = x5 + x7;
    x5 -= x7;

    // 第三级
    x7 = x8 + x3;
    x8 -= x3;
    x3 = x0 + x2;
    x0 -= x2;
    x2 = (181 * (x4 + x5) + 128) >> 8;
    x4 = (181 * (x4 - x5) + 128) >> 8;

    // 第四级
    let out = [
        (x7 + x1) >> 8,
        (x3 + x2) >> 8,
        (x0 + x4) >> 8,
        (x8 + x6) >> 8,
        (x8 - x6) >> 8,
        (x0 - x4) >> 8,
        (x3 - x2) >> 8,
        (x7 - x1) >> 8,
    ];
    for (dst, v) in blk.iter_mut().zip(out) {
        *dst = v as i16 as i32;
    }
}

fn idct_col(block: &mut Block, col: usize) {
    let at = |r: usize| block[r * 8 + col];
    let x1 = at(4) << 8;
    let x2 = at(6);
    let x3 = at(2);
    let x4 = at(1);
    let x5 = at(7);
    let x6 = at(5);
    let x7 = at(3);
    if x1 | x2 | x3 | x4 | x5 | x6 | x7 == 0 {
        let v = iclp((at(0) + 32) >> 6);
        for r in 0..8 {
            block[r * 8 + col] = v;
        }
        return;
    }
    let (mut x0, mut x1, mut x2, mut x3, mut x4, mut x5, mut x6, mut x7) =
        ((at(0) << 8) + 8192, x1, x2, x3, x4, x5, x6, x7);

    // 第一级
    let mut x8 = W7 * (x4 + x5) + 4;
    x4 = (x8 + (W1 - W7) * x4) >> 3;
    x5 = (x8 - (W1 + W7) * x5) >> 3;
    x8 = W3 * (x6 + x7) + 4;
    x6 = (x8 - (W3 - W5) * x6) >> 3;
    x7 = (x8 - (W3 + W5) * x7) >> 3;

    // 第二级
    x8 = x0 + x1;
    x0 -= x1;
    x1 = W6 * (x3 + x2) + 4;
    x2 = (x1 - (W2 + W6) * x2) >> 3;
    x3 = (x1 + (W2 - W6) * x3) >> 3;
    x1 = x4 + x6;
    x4 -= x6;
    x6 = x5 + x7;
    x5 -= x7;

    // 第三级
    x7 = x8 + x3;
    x8 -= x3;
    x3 = x0 + x2;
    x0 -= x2;
    x2 = (181 * (x4 + x5) + 128) >> 8;
    x4 = (181 * (x4 - x5) + 128) >> 8;

    // 第四级
    let out = [
        x7 + x1,
        x3 + x2,
        x0 + x4,
        x8 + x6,
        x8 - x6,
        x0 - x4,
        x3 - x2,
        x7 - x1,
    ];
    for (r, v) in out.into_iter().enumerate() {
        block[r * 8 + col] = iclp(v >> 14);
    }
}

/// 8x8 原地 IDCT, 输入为反量化后的自然顺序系数
pub(super) fn idct_8x8(block: &mut Block) {
    for row in block.chunks_exact_mut(8) {
        idct_row(row);
    }
    for col in 0..8 {
        idct_col(block, col);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 双精度正变换, 仅用于检查往返误差
    fn forward_dct(pixels: &[i32; 64]) -> Block {
        let mut out = [0i32; 64];
        for v in 0..8 {
            for u in 0..8 {
                let cu = if u == 0 { (0.5f64).sqrt() } else { 1.0 };
                let cv = if v == 0 { (0.5f64).sqrt() } else { 1.0 };
                let mut sum = 0.0;
                for y in 0..8 {
                    for x in 0..8 {
                        sum += f64::from(pixels[y * 8 + x])
                            * (((2 * x + 1) as f64) * u as f64 * std::f64::consts::PI / 16.0).cos()
                            * (((2 * y + 1) as f64) * v as f64 * std::f64::consts::PI / 16.0).cos();
                    }
                }
                out[v * 8 + u] = (0.25 * cu * cv * sum).round() as i32;
            }
        }
        out
    }

    #[test]
    fn test_仅dc() {
        let mut block = [0i32; 64];
        block[0] = 1024;
        idct_8x8(&mut block);
        assert!(block.iter().all(|&v| v == 128));

        let mut block = [0i32; 64];
        block[0] = -80;
        idct_8x8(&mut block);
        assert!(block.iter().all(|&v| v == -10));
    }

    #[test]
    fn test_全零() {
        let mut block = [0i32; 64];
        idct_8x8(&mut block);
        assert!(block.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_输出钳位() {
        let mut block = [0i32; 64];
        block[0] = 4095;
        idct_8x8(&mut block);
        assert!(block.iter().all(|&v| v == 511));
    }

    #[test]
    fn test_正反变换往返误差有界() {
        let mut pixels = [0i32; 64];
        for (i, p) in pixels.iter_mut().enumerate() {
            *p = ((i * 37 + 11) % 200) as i32 - 100;
        }
        let mut block = forward_dct(&pixels);
        idct_8x8(&mut block);
        for (a, b) in block.iter().zip(pixels.iter()) {
            assert!((a - b).abs() <= 2, "往返误差过大: {} vs {}", a, b);
        }
    }

    #[test]
    fn test_单个ac系数对称() {
        let mut block = [0i32; 64];
        block[1] = 100;
        idct_8x8(&mut block);
        // 水平余弦基: 每行相同, 左右反对称
        for r in 1..8 {
            assert_eq!(&block[r * 8..r * 8 + 8], &block[0..8]);
        }
        for c in 0..4 {
            assert_eq!(block[c], -block[7 - c]);
        }
        assert!(block[0] > 0);
    }
}
