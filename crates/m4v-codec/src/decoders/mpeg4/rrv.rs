//! 降分辨率 (RRV) 模式
//!
//! RRV 帧中一个宏块覆盖 32x32 亮度区域: 运动向量放大一倍, 8x8 残差经
//! 1-3-3-1 滤波上采样到 16x16, 整帧重建后再对编码宏块两侧的块边界做
//! 3:1 平滑.

use super::dequant::Block;
use super::picture::{Picture, Plane};
use super::types::{MacroblockInfo, MbGrid, MbMode, MotionVector};

/// 向量放大: `v > 0 → 2v - 1`, `v < 0 → 2v + 1`
#[inline]
pub(super) fn scale_mv(v: i32) -> i32 {
    match v.signum() {
        1 => 2 * v - 1,
        -1 => 2 * v + 1,
        _ => 0,
    }
}

pub(super) fn scale_vector(mv: MotionVector) -> MotionVector {
    MotionVector::new(scale_mv(mv.x), scale_mv(mv.y))
}

// ============================================================================
// 残差上采样
// ============================================================================

/// 上采样的取整方式
#[derive(Clone, Copy)]
enum Rounding {
    /// 写入: 样本非负, 右移
    Shift,
    /// 叠加: 残差可能为负, 向零截断的除法
    Divide,
}

impl Rounding {
    #[inline]
    fn apply(self, sum: i32, bias: i32, shift: u32) -> i32 {
        match self {
            Self::Shift => (sum + bias) >> shift,
            Self::Divide => (sum + bias) / (1 << shift),
        }
    }
}

#[inline]
fn filter_31(a: i32, b: i32, rounding: Rounding) -> (i32, i32) {
    (rounding.apply(3 * a + b, 2, 2), rounding.apply(a + 3 * b, 2, 2))
}

/// 8x8 → 16x16: 边缘行列用 3:1 插值, 内部用 9:3:3:1
fn upsample(src: &Block, rounding: Rounding) -> [i32; 256] {
    let s = |r: usize, c: usize| src[r * 8 + c];
    let mut out = [0i32; 256];

    let edge_row = |out: &mut [i32; 256], dst_row: usize, src_row: usize| {
        out[dst_row * 16] = s(src_row, 0);
        for x in 0..7 {
            let (a, b) = filter_31(s(src_row, x), s(src_row, x + 1), rounding);
            out[dst_row * 16 + 2 * x + 1] = a;
            out[dst_row * 16 + 2 * x + 2] = b;
        }
        out[dst_row * 16 + 15] = s(src_row, 7);
    };

    edge_row(&mut out, 0, 0);
    for y in 0..7 {
        let r1 = (2 * y + 1) * 16;
        let r2 = (2 * y + 2) * 16;
        let (a, b) = filter_31(s(y, 0), s(y + 1, 0), rounding);
        out[r1] = a;
        out[r2] = b;
        for x in 0..7 {
            let (p, q, u, v) = (s(y, x), s(y, x + 1), s(y + 1, x), s(y + 1, x + 1));
            out[r1 + 2 * x + 1] = rounding.apply(9 * p + 3 * q + 3 * u + v, 8, 4);
            out[r1 + 2 * x + 2] = rounding.apply(3 * p + 9 * q + u + 3 * v, 8, 4);
            out[r2 + 2 * x + 1] = rounding.apply(3 * p + q + 9 * u + 3 * v, 8, 4);
            out[r2 + 2 * x + 2] = rounding.apply(p + 3 * q + 3 * u + 9 * v, 8, 4);
        }
        let (a, b) = filter_31(s(y, 7), s(y + 1, 7), rounding);
        out[r1 + 15] = a;
        out[r2 + 15] = b;
    }
    edge_row(&mut out, 15, 7);
    out
}

/// 帧内残差上采样后写入 `(x, y)` 处的 16x16 区域
pub(super) fn copy_upsampled(plane: &mut Plane, x: usize, y: usize, block: &Block) {
    let up = upsample(block, Rounding::Shift);
    let mut pixels = [0u8; 256];
    for (p, v) in pixels.iter_mut().zip(up) {
        *p = v.clamp(0, 255) as u8;
    }
    plane.put(x, y, 16, 16, &pixels);
}

/// 帧间残差上采样后叠加到 `(x, y)` 处的 16x16 预测上
pub(super) fn add_upsampled(plane: &mut Plane, x: usize, y: usize, block: &Block) {
    let up = upsample(block, Rounding::Divide);
    let mut pixels = [0u8; 256];
    for row in 0..16 {
        for col in 0..16 {
            let cur = i32::from(plane.get((x + col) as i32, (y + row) as i32));
            pixels[row * 16 + col] = (cur + up[row * 16 + col]).clamp(0, 255) as u8;
        }
    }
    plane.put(x, y, 16, 16, &pixels);
}

// ============================================================================
// 去块
// ============================================================================

#[inline]
fn smooth_pair(a: u8, b: u8) -> (u8, u8) {
    let (a, b) = (i32::from(a), i32::from(b));
    (((3 * a + b + 2) >> 2) as u8, ((a + 3 * b + 2) >> 2) as u8)
}

/// 平滑第 `row - 1` 行与第 `row` 行之间的水平边界, 从 `x` 起 16 个样本
fn filter_horizontal_edge(plane: &mut Plane, x: usize, row: usize) {
    for k in 0..16 {
        let px = (x + k) as i32;
        let (a, b) = smooth_pair(plane.get(px, row as i32 - 1), plane.get(px, row as i32));
        plane.set(x + k, row - 1, a);
        plane.set(x + k, row, b);
    }
}

/// 平滑第 `col - 1` 列与第 `col` 列之间的垂直边界, 从 `y` 起 16 个样本
fn filter_vertical_edge(plane: &mut Plane, col: usize, y: usize) {
    for k in 0..16 {
        let py = (y + k) as i32;
        let (a, b) = smooth_pair(plane.get(col as i32 - 1, py), plane.get(col as i32, py));
        plane.set(col - 1, y + k, a);
        plane.set(col, y + k, b);
    }
}

/// RRV 帧的块边界平滑
///
/// 亮度以 16 像素块为单位 (每个宏块 2x2 块), 色度以宏块为单位; 边界两侧
/// 至少有一个宏块被编码时才平滑. `mbs` 以网格宽度为行距.
pub(super) fn deblock(picture: &mut Picture, mbs: &[MacroblockInfo], grid: MbGrid) {
    let coded = |mx: usize, my: usize| {
        mbs.get(my * grid.width + mx)
            .is_some_and(|mb| mb.mode != MbMode::NotCoded)
    };

    for j in 1..grid.height * 2 {
        for i in 0..grid.width * 2 {
            if coded(i / 2, (j - 1) / 2) || coded(i / 2, j / 2) {
                filter_horizontal_edge(&mut picture.y, i * 16, j * 16);
            }
        }
    }
    for j in 0..grid.height * 2 {
        for i in 1..grid.width * 2 {
            if coded((i - 1) / 2, j / 2) || coded(i / 2, j / 2) {
                filter_vertical_edge(&mut picture.y, i * 16, j * 16);
            }
        }
    }

    for j in 1..grid.height {
        for i in 0..grid.width {
            if coded(i, j - 1) || coded(i, j) {
                filter_horizontal_edge(&mut picture.u, i * 16, j * 16);
                filter_horizontal_edge(&mut picture.v, i * 16, j * 16);
            }
        }
    }
    for j in 0..grid.height {
        for i in 1..grid.width {
            if coded(i - 1, j) || coded(i, j) {
                filter_vertical_edge(&mut picture.u, i * 16, j * 16);
                filter_vertical_edge(&mut picture.v, i * 16, j * 16);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_向量放大() {
        assert_eq!(scale_mv(0), 0);
        assert_eq!(scale_mv(1), 1);
        assert_eq!(scale_mv(3), 5);
        assert_eq!(scale_mv(-1), -1);
        assert_eq!(scale_mv(-4), -7);
        assert_eq!(scale_vector(MotionVector::new(2, -2)), MotionVector::new(3, -3));
    }

    #[test]
    fn test_平坦块上采样不变() {
        let block = [77i32; 64];
        let mut plane = Plane::new(32, 32, 32);
        copy_upsampled(&mut plane, 0, 0, &block);
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(plane.get(x, y), 77);
            }
        }
    }

    #[test]
    fn test_上采样滤波权重() {
        // 首列 0, 其余 100
        let mut block = [100i32; 64];
        for r in 0..8 {
            block[r * 8] = 0;
        }
        let up = upsample(&block, Rounding::Shift);
        assert_eq!(up[0], 0);
        // 首行: (3*0 + 100 + 2) >> 2 = 25, (0 + 300 + 2) >> 2 = 75
        assert_eq!(up[1], 25);
        assert_eq!(up[2], 75);
        assert_eq!(up[15], 100);
        // 内部: (9*0 + 3*100 + 3*0 + 100 + 8) >> 4 = 25
        assert_eq!(up[16 + 1], 25);
        assert_eq!(up[16 + 2], 75);
    }

    #[test]
    fn test_叠加上采样负残差向零取整() {
        let mut plane = Plane::new(32, 32, 32);
        plane.fill(100);
        let mut block = [0i32; 64];
        block[0] = -1;
        add_upsampled(&mut plane, 0, 0, &block);
        // 角点直接叠加
        assert_eq!(plane.get(0, 0), 99);
        // (3*-1 + 0 + 2) / 4 = 0 (截断), 右移会得到 -1
        assert_eq!(plane.get(1, 0), 100);
        // 未覆盖区域不变
        assert_eq!(plane.get(20, 20), 100);
    }

    #[test]
    fn test_去块只处理编码宏块边界() {
        let mut pic = Picture::new(4, 2);
        // 左半 32 列为 0, 右半为 200
        for y in 0..32 {
            for x in 0..64 {
                pic.y.set(x, y, if x < 32 { 0 } else { 200 });
            }
        }
        let grid = MbGrid { width: 2, height: 1 };
        let mut mbs = vec![MacroblockInfo::default(); 2];
        deblock(&mut pic, &mbs, grid);
        // 全部未编码, 不变
        assert_eq!(pic.y.get(31, 0), 0);
        assert_eq!(pic.y.get(32, 0), 200);

        mbs[1].mode = MbMode::Inter;
        deblock(&mut pic, &mbs, grid);
        assert_eq!(pic.y.get(31, 0), ((200 + 2) >> 2) as u8);
        assert_eq!(pic.y.get(32, 0), ((600 + 2) >> 2) as u8);
        // 宏块内部 16 列处两侧相同, 平滑后不变
        assert_eq!(pic.y.get(15, 0), 0);
        assert_eq!(pic.y.get(16, 0), 0);
    }
}
