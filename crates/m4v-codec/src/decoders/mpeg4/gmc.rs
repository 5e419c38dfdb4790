//! GMC (全局运动补偿 / S-VOP) 支持
//!
//! 每个 S-VOP 头解析后由 warping 点生成一次 `GmcParameters`, 整帧只读.
//! - 0/1 个有效点: 平移, 偏移以 1/16 像素存储
//! - 2/3 个有效点: 仿射, 系数为 16 位定点
//!
//! 采样使用 16 级双线性权重, 超出参考图边界的坐标钳位到边界且小数部分清零.

use log::debug;

use super::header::log2bin;
use super::picture::Plane;
use super::types::{MotionVector, WarpPoints};

/// GMC 变换参数
#[derive(Debug, Clone, Default)]
pub(super) struct GmcParameters {
    /// 亮度宽高 (1/16 像素)
    sw: i32,
    sh: i32,
    /// sprite_warping_accuracy (0..=3 对应 1/2..1/16 像素)
    accuracy: u32,
    /// 约简后的有效点数
    num_points: usize,
    uo: i32,
    vo: i32,
    uco: i32,
    vco: i32,
    /// [d/dx, d/dy]
    du: [i32; 2],
    dv: [i32; 2],
}

#[inline]
fn rdiv(a: i32, b: i32) -> i32 {
    if a > 0 { (a + (b >> 1)) / b } else { (a - (b >> 1)) / b }
}

#[inline]
fn rshift(a: i32, b: u32) -> i32 {
    let half = 1 << (b - 1);
    if a > 0 {
        a.wrapping_add(half) >> b
    } else {
        (a + half - 1) >> b
    }
}

/// 平均向量钳位到 `[-(1 << (fcode + 4)), (1 << (fcode + 4)) - 1]`
pub(super) fn sanitize(value: i32, fcode: u32) -> i32 {
    let length = 1 << (fcode + 4);
    if value < -length {
        -length
    } else if value >= length {
        length - 1
    } else {
        value
    }
}

/// 16 级双线性采样
#[inline]
fn bilinear(src: &Plane, x: i32, y: i32, fx: i32, fy: i32, rounder: i32) -> u8 {
    let a = i32::from(src.get(x, y));
    let b = i32::from(src.get(x + 1, y));
    let c = i32::from(src.get(x, y + 1));
    let d = i32::from(src.get(x + 1, y + 1));
    let top = (16 - fx) * a + fx * b;
    let bottom = (16 - fx) * c + fx * d;
    (((16 - fy) * top + fy * bottom + rounder) >> 8) as u8
}

/// 平移路径: 按块钳位整块偏移, 返回 (整像素偏移, 小数)
#[inline]
fn clamp_block_origin(pos: i32, limit: i32, low: i32, fallback_low: i32) -> (i32, i32) {
    if pos >= low && pos <= limit {
        (pos >> 4, pos & 15)
    } else if pos > limit {
        (limit >> 4, 0)
    } else {
        (fallback_low, 0)
    }
}

/// 仿射路径: 按像素钳位
#[inline]
fn clamp_sample(pos: i32, limit: i32) -> (i32, i32) {
    if pos > 0 && pos <= limit {
        (pos >> 4, pos & 15)
    } else if pos > limit {
        (limit >> 4, 0)
    } else {
        (0, 0)
    }
}

impl GmcParameters {
    /// 由 warping 点生成参数, `width`/`height` 为亮度显示尺寸
    pub(super) fn new(
        points: u32,
        accuracy: u32,
        warp: &WarpPoints,
        width: u32,
        height: u32,
    ) -> Self {
        let duv = &warp.duv;
        let mut nb = points.min(3) as usize;

        // 尾部为零的点不参与插值
        if nb < 3 || duv[2].is_zero() {
            if nb < 2 || duv[1].is_zero() {
                nb = if nb < 1 || duv[0].is_zero() { 0 } else { 1 };
            } else {
                nb = 2;
            }
        }

        let width = width.max(1) as i32;
        let height = height.max(1) as i32;
        let mut gmc = Self {
            sw: width << 4,
            sh: height << 4,
            accuracy,
            num_points: nb,
            ..Default::default()
        };

        if nb <= 1 {
            if nb == 1 {
                // 轨迹以半像素为单位
                gmc.uo = duv[0].x << 3;
                gmc.vo = duv[0].y << 3;
                gmc.uco = ((duv[0].x >> 1) | (duv[0].x & 1)) << 3;
                gmc.vco = ((duv[0].y >> 1) | (duv[0].y & 1)) << 3;
            }
        } else {
            let rho = 3 - accuracy as i32;
            let mut alpha = log2bin((width - 1) as u32) as i32;
            let ws = 1 << alpha;

            gmc.du[0] = 16 * ws + rdiv(8 * ws * duv[1].x, width);
            gmc.dv[0] = rdiv(8 * ws * duv[1].y, width);

            if nb == 2 {
                gmc.du[1] = -gmc.dv[0];
                gmc.dv[1] = gmc.du[0];
            } else {
                let beta = log2bin((height - 1) as u32) as i32;
                let hs = 1 << beta;
                gmc.du[1] = rdiv(8 * hs * duv[2].x, height);
                gmc.dv[1] = 16 * hs + rdiv(8 * hs * duv[2].y, height);
                if beta > alpha {
                    gmc.du[0] <<= beta - alpha;
                    gmc.dv[0] <<= beta - alpha;
                    alpha = beta;
                } else {
                    gmc.du[1] <<= alpha - beta;
                    gmc.dv[1] <<= alpha - beta;
                }
            }

            let shift = 16 - alpha - rho;
            for v in gmc.du.iter_mut().chain(gmc.dv.iter_mut()) {
                *v = if shift >= 0 { *v << shift } else { *v >> -shift };
            }

            // 14 位轨迹加上 accuracy 移位后接近 2^31, 按 32 位回绕计算
            let acc = accuracy;
            gmc.uo = (duv[0].x << (16 + acc)).wrapping_add(1 << 15);
            gmc.vo = (duv[0].y << (16 + acc)).wrapping_add(1 << 15);
            gmc.uco = ((duv[0].x - 1) << (17 + acc)).wrapping_add(1 << 17);
            gmc.vco = ((duv[0].y - 1) << (17 + acc)).wrapping_add(1 << 17);
            gmc.uco = gmc.uco.wrapping_add(gmc.du[0]).wrapping_add(gmc.du[1]) >> 2;
            gmc.vco = gmc.vco.wrapping_add(gmc.dv[0]).wrapping_add(gmc.dv[1]) >> 2;
        }

        debug!(
            "GMC: {} 点, accuracy={}, uo={} vo={} du={:?} dv={:?}",
            nb, accuracy, gmc.uo, gmc.vo, gmc.du, gmc.dv
        );
        gmc
    }

    fn rho(&self) -> i32 {
        3 - self.accuracy as i32
    }

    fn rounder(&self, rounding: bool) -> i32 {
        128 - ((rounding as i32) << (2 * self.rho()))
    }

    /// 预测宏块 `(mb_x, mb_y)` 的 16x16 亮度
    pub(super) fn predict_luma(
        &self,
        src: &Plane,
        mb_x: usize,
        mb_y: usize,
        rounding: bool,
        out: &mut [u8; 256],
    ) {
        let rounder = self.rounder(rounding);
        let (mx, my) = (mb_x as i32, mb_y as i32);

        if self.num_points <= 1 {
            let uo = self.uo + (mx << 8);
            let vo = self.vo + (my << 8);
            let (x0, fx) = clamp_block_origin(uo, self.sw, -64, -16);
            let (y0, fy) = clamp_block_origin(vo, self.sh, -64, -16);
            for j in 0..16 {
                for i in 0..16 {
                    out[j * 16 + i] = bilinear(src, x0 + i as i32, y0 + j as i32, fx, fy, rounder);
                }
            }
            return;
        }

        let rho = self.rho();
        let mut uo = self
            .uo
            .wrapping_add(16i32.wrapping_mul(self.du[1].wrapping_mul(my).wrapping_add(self.du[0].wrapping_mul(mx))));
        let mut vo = self
            .vo
            .wrapping_add(16i32.wrapping_mul(self.dv[1].wrapping_mul(my).wrapping_add(self.dv[0].wrapping_mul(mx))));
        for j in 0..16 {
            let (mut u_acc, mut v_acc) = (uo, vo);
            uo = uo.wrapping_add(self.du[1]);
            vo = vo.wrapping_add(self.dv[1]);
            for i in 0..16 {
                let u = (u_acc >> 16) << rho;
                let v = (v_acc >> 16) << rho;
                u_acc = u_acc.wrapping_add(self.du[0]);
                v_acc = v_acc.wrapping_add(self.dv[0]);
                let (x, fx) = clamp_sample(u, self.sw);
                let (y, fy) = clamp_sample(v, self.sh);
                out[j * 16 + i] = bilinear(src, x, y, fx, fy, rounder);
            }
        }
    }

    /// 预测宏块 `(mb_x, mb_y)` 的两个 8x8 色度块
    #[allow(clippy::too_many_arguments)]
    pub(super) fn predict_chroma(
        &self,
        src_u: &Plane,
        src_v: &Plane,
        mb_x: usize,
        mb_y: usize,
        rounding: bool,
        out_u: &mut [u8; 64],
        out_v: &mut [u8; 64],
    ) {
        let rounder = self.rounder(rounding);
        let (mx, my) = (mb_x as i32, mb_y as i32);
        let w = self.sw >> 1;
        let h = self.sh >> 1;

        if self.num_points <= 1 {
            let uo = self.uco + (mx << 7);
            let vo = self.vco + (my << 7);
            let (x0, fx) = clamp_block_origin(uo, w, -32, -8);
            let (y0, fy) = clamp_block_origin(vo, h, -32, -8);
            for j in 0..8 {
                for i in 0..8 {
                    let (x, y) = (x0 + i as i32, y0 + j as i32);
                    out_u[j * 8 + i] = bilinear(src_u, x, y, fx, fy, rounder);
                    out_v[j * 8 + i] = bilinear(src_v, x, y, fx, fy, rounder);
                }
            }
            return;
        }

        let rho = self.rho();
        let mut uo = self
            .uco
            .wrapping_add(8i32.wrapping_mul(self.du[1].wrapping_mul(my).wrapping_add(self.du[0].wrapping_mul(mx))));
        let mut vo = self
            .vco
            .wrapping_add(8i32.wrapping_mul(self.dv[1].wrapping_mul(my).wrapping_add(self.dv[0].wrapping_mul(mx))));
        for j in 0..8 {
            let (mut u_acc, mut v_acc) = (uo, vo);
            uo = uo.wrapping_add(self.du[1]);
            vo = vo.wrapping_add(self.dv[1]);
            for i in 0..8 {
                let u = (u_acc >> 16) << rho;
                let v = (v_acc >> 16) << rho;
                u_acc = u_acc.wrapping_add(self.du[0]);
                v_acc = v_acc.wrapping_add(self.dv[0]);
                let (x, fx) = clamp_sample(u, w);
                let (y, fy) = clamp_sample(v, h);
                out_u[j * 8 + i] = bilinear(src_u, x, y, fx, fy, rounder);
                out_v[j * 8 + i] = bilinear(src_v, x, y, fx, fy, rounder);
            }
        }
    }

    /// 宏块平均运动向量 (半像素, `quarterpel` 时为四分之一像素)
    pub(super) fn average_mv(&self, mb_x: usize, mb_y: usize, quarterpel: bool) -> MotionVector {
        let qpel = quarterpel as u32;
        if self.num_points <= 1 {
            return MotionVector::new(rshift(self.uo << qpel, 3), rshift(self.vo << qpel, 3));
        }

        let (mx, my) = (mb_x as i32, mb_y as i32);
        let mut uo = self
            .uo
            .wrapping_add(16i32.wrapping_mul(self.du[1].wrapping_mul(my).wrapping_add(self.du[0].wrapping_mul(mx))));
        let mut vo = self
            .vo
            .wrapping_add(16i32.wrapping_mul(self.dv[1].wrapping_mul(my).wrapping_add(self.dv[0].wrapping_mul(mx))));
        let (mut vx, mut vy) = (0i32, 0i32);
        for _ in 0..16 {
            let (mut u_acc, mut v_acc) = (uo, vo);
            uo = uo.wrapping_add(self.du[1]);
            vo = vo.wrapping_add(self.dv[1]);
            for _ in 0..16 {
                vx = vx.wrapping_add(u_acc >> 16);
                vy = vy.wrapping_add(v_acc >> 16);
                u_acc = u_acc.wrapping_add(self.du[0]);
                v_acc = v_acc.wrapping_add(self.dv[0]);
            }
        }
        vx = vx.wrapping_sub((256 * mx + 120) << (5 + self.accuracy));
        vy = vy.wrapping_sub((256 * my + 120) << (5 + self.accuracy));
        let shift = 8 - qpel + self.accuracy;
        MotionVector::new(rshift(vx, shift), rshift(vy, shift))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warp(points: &[(i32, i32)]) -> WarpPoints {
        let mut w = WarpPoints::default();
        for (i, &(x, y)) in points.iter().enumerate() {
            w.duv[i] = MotionVector::new(x, y);
        }
        w
    }

    fn ramp_plane() -> Plane {
        let mut plane = Plane::new(64, 64, 32);
        for y in 0..64 {
            for x in 0..64 {
                plane.set(x, y, (x * 3 + y) as u8);
            }
        }
        plane.set_edges(64, 64);
        plane
    }

    #[test]
    fn test_零点等价于零向量() {
        let gmc = GmcParameters::new(3, 3, &warp(&[]), 64, 64);
        assert_eq!(gmc.num_points, 0);
        let plane = ramp_plane();
        let mut out = [0u8; 256];
        gmc.predict_luma(&plane, 1, 1, false, &mut out);
        for j in 0..16 {
            for i in 0..16 {
                assert_eq!(out[j * 16 + i], plane.get(16 + i as i32, 16 + j as i32));
            }
        }
        assert_eq!(gmc.average_mv(1, 1, false), MotionVector::ZERO);
    }

    #[test]
    fn test_尾部零点约简() {
        let gmc = GmcParameters::new(3, 3, &warp(&[(4, 2)]), 64, 64);
        assert_eq!(gmc.num_points, 1);
        let gmc = GmcParameters::new(3, 3, &warp(&[(4, 2), (1, 0)]), 64, 64);
        assert_eq!(gmc.num_points, 2);
        let gmc = GmcParameters::new(1, 3, &warp(&[(0, 0), (5, 5)]), 64, 64);
        assert_eq!(gmc.num_points, 0);
        let gmc = GmcParameters::new(3, 3, &warp(&[(0, 0), (0, 0), (0, 1)]), 64, 64);
        assert_eq!(gmc.num_points, 3);
    }

    #[test]
    fn test_单点平移() {
        // 半像素轨迹 (4, 2) 即整像素 (2, 1)
        let gmc = GmcParameters::new(1, 3, &warp(&[(4, 2)]), 64, 64);
        let plane = ramp_plane();
        let mut out = [0u8; 256];
        gmc.predict_luma(&plane, 1, 1, false, &mut out);
        assert_eq!(out[0], plane.get(18, 17));
        assert_eq!(out[255], plane.get(33, 32));
        assert_eq!(gmc.average_mv(0, 0, false), MotionVector::new(4, 2));
        assert_eq!(gmc.average_mv(0, 0, true), MotionVector::new(8, 4));
    }

    #[test]
    fn test_仿射恒等平移() {
        let gmc = GmcParameters::new(2, 3, &warp(&[(0, 0), (0, 0)]), 64, 64);
        assert_eq!(gmc.num_points, 0);

        // 无旋转无缩放, 平移 1 像素 (轨迹 2 个半像素)
        let gmc = GmcParameters {
            sw: 64 << 4,
            sh: 64 << 4,
            accuracy: 3,
            num_points: 2,
            uo: (2 << 19) + (1 << 15),
            vo: 1 << 15,
            uco: 0,
            vco: 0,
            du: [1 << 20, 0],
            dv: [0, 1 << 20],
        };
        let plane = ramp_plane();
        let mut out = [0u8; 256];
        gmc.predict_luma(&plane, 1, 0, false, &mut out);
        assert_eq!(out[0], plane.get(17, 0));
        assert_eq!(out[15], plane.get(32, 0));
        assert_eq!(gmc.average_mv(1, 0, false), MotionVector::new(2, 0));
    }

    #[test]
    fn test_两点参数生成() {
        // 第二点零位移时只剩平移, 三点时保留
        let gmc = GmcParameters::new(2, 3, &warp(&[(2, 0), (0, 0)]), 64, 64);
        assert_eq!(gmc.num_points, 1);
        let gmc = GmcParameters::new(2, 3, &warp(&[(2, 0), (8, 0)]), 64, 64);
        assert_eq!(gmc.num_points, 2);
        // alpha = log2bin(63) = 6, ws = 64: du0 = 16*64 + rdiv(8*64*8, 64) = 1088
        assert_eq!(gmc.du[0], 1088 << (16 - 6));
        assert_eq!(gmc.dv[1], gmc.du[0]);
        assert_eq!(gmc.du[1], 0);
    }

    #[test]
    fn test_极端轨迹按32位回绕() {
        // 14 位轨迹的上限, 色度偏移的中间和超出 i32
        let gmc = GmcParameters::new(3, 3, &warp(&[(2047, 2047), (16383, 16383), (16383, 16383)]), 64, 64);
        assert_eq!(gmc.num_points, 3);
        assert_eq!(gmc.du, [132088 << 10, 131064 << 10]);
        assert_eq!(gmc.uo, 1_073_250_304);
        assert_eq!(gmc.uco, -469_995_520);
        assert_eq!(gmc.vco, gmc.uco);

        let plane = ramp_plane();
        let mut luma = [0u8; 256];
        gmc.predict_luma(&plane, 3, 3, true, &mut luma);
        let (mut u, mut v) = ([0u8; 64], [0u8; 64]);
        let chroma = Plane::new(32, 32, 16);
        gmc.predict_chroma(&chroma, &chroma, 3, 3, false, &mut u, &mut v);
        assert!(u.iter().chain(v.iter()).all(|&p| p == 0));

        let _ = gmc.average_mv(3, 3, true);

        let gmc = GmcParameters::new(3, 3, &warp(&[(-16383, -16383), (-16383, 16383), (16383, -16383)]), 64, 64);
        assert_eq!(gmc.num_points, 3);
        gmc.predict_luma(&plane, 0, 0, false, &mut luma);
        let _ = gmc.average_mv(0, 0, false);
    }

    #[test]
    fn test_rshift回绕() {
        assert_eq!(rshift(i32::MAX, 8), i32::MIN >> 8);
        assert_eq!(rshift(i32::MIN, 8), i32::MIN >> 8);
    }

    #[test]
    fn test_平均向量钳位() {
        assert_eq!(sanitize(100, 1), 31);
        assert_eq!(sanitize(-100, 1), -32);
        assert_eq!(sanitize(5, 1), 5);
    }

    #[test]
    fn test_rshift取整() {
        assert_eq!(rshift(12, 3), 2);
        assert_eq!(rshift(-12, 3), -2);
        assert_eq!(rshift(-4, 3), -1);
        assert_eq!(rshift(4, 3), 1);
    }
}
