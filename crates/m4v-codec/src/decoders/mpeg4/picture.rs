//! 带边缘填充的图像平面
//!
//! 每个平面的尺寸对齐到宏块, 四周额外保留 `edge` 像素的填充区.
//! 读取坐标钳位到填充区范围内, 写入只落在对齐后的图像区域内.

use m4v_core::{PixelFormat, Rational};

use crate::frame::{PictureType, VideoFrame};

/// 亮度填充宽度
pub(super) const EDGE_LUMA: usize = 32;
/// 色度填充宽度
pub(super) const EDGE_CHROMA: usize = 16;

/// 早于该 XviD 版本的码流从实际尺寸处开始填充
const SETEDGES_BUG_BEFORE: i32 = 18;

/// 一个样本平面
#[derive(Debug, Clone)]
pub(super) struct Plane {
    data: Vec<u8>,
    stride: usize,
    width: usize,
    height: usize,
    edge: usize,
}

impl Plane {
    pub(super) fn new(width: usize, height: usize, edge: usize) -> Self {
        let stride = width + 2 * edge;
        Self {
            data: vec![0; stride * (height + 2 * edge)],
            stride,
            width,
            height,
            edge,
        }
    }

    pub(super) fn width(&self) -> usize {
        self.width
    }

    pub(super) fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        let edge = self.edge as i32;
        let cx = x.clamp(-edge, self.width as i32 + edge - 1) + edge;
        let cy = y.clamp(-edge, self.height as i32 + edge - 1) + edge;
        cy as usize * self.stride + cx as usize
    }

    /// 读取一个样本, 越过填充区的坐标钳位到最近的填充像素
    #[inline]
    pub(super) fn get(&self, x: i32, y: i32) -> u8 {
        self.data[self.offset(x, y)]
    }

    /// 写入一个样本, 图像区域外的写入被忽略
    #[inline]
    pub(super) fn set(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            let idx = (y + self.edge) * self.stride + x + self.edge;
            self.data[idx] = value;
        }
    }

    /// 取出以 `(x, y)` 为左上角的 `w x h` 窗口 (行距 `w`)
    pub(super) fn fetch(&self, x: i32, y: i32, w: usize, h: usize, out: &mut [u8]) {
        let edge = self.edge as i32;
        let inside = x >= -edge
            && y >= -edge
            && x + w as i32 <= self.width as i32 + edge
            && y + h as i32 <= self.height as i32 + edge;
        if inside {
            for row in 0..h {
                let start = self.offset(x, y + row as i32);
                out[row * w..(row + 1) * w].copy_from_slice(&self.data[start..start + w]);
            }
        } else {
            for row in 0..h {
                for col in 0..w {
                    out[row * w + col] = self.get(x + col as i32, y + row as i32);
                }
            }
        }
    }

    /// 把 `w x h` 的块 (行距 `w`) 写到 `(x, y)`
    pub(super) fn put(&mut self, x: usize, y: usize, w: usize, h: usize, src: &[u8]) {
        for row in 0..h {
            for col in 0..w {
                self.set(x + col, y + row, src[row * w + col]);
            }
        }
    }

    /// 以 `line_step` 行距写入 8x8 残差块 (帧/场 DCT), 结果钳位到 0..255
    pub(super) fn put_block(&mut self, x: usize, y: usize, line_step: usize, block: &[i32; 64]) {
        for row in 0..8 {
            for col in 0..8 {
                self.set(x + col, y + row * line_step, block[row * 8 + col].clamp(0, 255) as u8);
            }
        }
    }

    /// 把残差块叠加到已有预测上
    pub(super) fn add_block(&mut self, x: usize, y: usize, line_step: usize, block: &[i32; 64]) {
        for row in 0..8 {
            let py = y + row * line_step;
            if py >= self.height {
                continue;
            }
            for col in 0..8 {
                let px = x + col;
                if px >= self.width {
                    continue;
                }
                let cur = i32::from(self.get(px as i32, py as i32));
                self.set(px, py, (cur + block[row * 8 + col]).clamp(0, 255) as u8);
            }
        }
    }

    pub(super) fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }

    /// 从另一同尺寸平面复制全部样本
    pub(super) fn copy_from(&mut self, other: &Plane) {
        if self.data.len() == other.data.len() {
            self.data.copy_from_slice(&other.data);
        }
    }

    /// 以 `[0, valid_w) x [0, valid_h)` 之外的样本复制最近的边缘像素
    pub(super) fn set_edges(&mut self, valid_w: usize, valid_h: usize) {
        let valid_w = valid_w.clamp(1, self.width);
        let valid_h = valid_h.clamp(1, self.height);
        let total_w = self.stride;
        let total_h = self.height + 2 * self.edge;
        let edge = self.edge;

        // 左右
        for row in edge..edge + valid_h {
            let line = row * self.stride;
            let left = self.data[line + edge];
            let right = self.data[line + edge + valid_w - 1];
            self.data[line..line + edge].fill(left);
            self.data[line + edge + valid_w..line + total_w].fill(right);
        }
        // 上下整行
        let first = edge * self.stride;
        let last = (edge + valid_h - 1) * self.stride;
        for row in 0..edge {
            self.data.copy_within(first..first + total_w, row * self.stride);
        }
        for row in edge + valid_h..total_h {
            self.data.copy_within(last..last + total_w, row * self.stride);
        }
    }

    /// 图像区域第 `y` 行的前 `w` 个样本
    pub(super) fn row(&self, y: usize, w: usize) -> &[u8] {
        let start = (y + self.edge) * self.stride + self.edge;
        &self.data[start..start + w.min(self.width)]
    }
}

/// 三平面 YUV 4:2:0 图像
#[derive(Debug, Clone)]
pub(super) struct Picture {
    pub y: Plane,
    pub u: Plane,
    pub v: Plane,
}

impl Picture {
    /// 按宏块网格分配 (亮度 16 像素对齐)
    pub(super) fn new(mb_width: usize, mb_height: usize) -> Self {
        let w = mb_width * 16;
        let h = mb_height * 16;
        Self {
            y: Plane::new(w, h, EDGE_LUMA),
            u: Plane::new(w / 2, h / 2, EDGE_CHROMA),
            v: Plane::new(w / 2, h / 2, EDGE_CHROMA),
        }
    }

    /// 清成黑色 (亮度 0, 色度 128)
    pub(super) fn clear(&mut self) {
        self.y.fill(0);
        self.u.fill(128);
        self.v.fill(128);
    }

    pub(super) fn copy_from(&mut self, other: &Picture) {
        self.y.copy_from(&other.y);
        self.u.copy_from(&other.u);
        self.v.copy_from(&other.v);
    }

    /// 重建完成后填充边缘
    ///
    /// 填充从 16 像素对齐的尺寸开始; 早期 XviD 码流从实际尺寸开始.
    pub(super) fn set_edges(&mut self, width: u32, height: u32, bs_version: Option<i32>) {
        let legacy = matches!(bs_version, Some(v) if v != 0 && v < SETEDGES_BUG_BEFORE);
        let (w, h) = if legacy {
            (width as usize, height as usize)
        } else {
            ((width as usize + 15) & !15, (height as usize + 15) & !15)
        };
        self.y.set_edges(w, h);
        self.u.set_edges(w / 2, h / 2);
        self.v.set_edges(w / 2, h / 2);
    }

    /// 裁剪到显示尺寸并输出
    pub(super) fn to_video_frame(
        &self,
        width: u32,
        height: u32,
        picture_type: PictureType,
        sample_aspect_ratio: Rational,
    ) -> VideoFrame {
        let format = PixelFormat::Yuv420p;
        let mut frame = VideoFrame::new(width, height, format);
        for (i, plane) in [&self.y, &self.u, &self.v].into_iter().enumerate() {
            let (pw, ph) = format.plane_dimensions(i, width, height).unwrap_or((0, 0));
            let (pw, ph) = (pw as usize, ph as usize);
            let mut data = Vec::with_capacity(pw * ph);
            for row in 0..ph.min(plane.height()) {
                data.extend_from_slice(plane.row(row, pw));
            }
            frame.data[i] = data;
            frame.linesize[i] = pw.min(plane.width());
        }
        frame.picture_type = picture_type;
        frame.is_keyframe = picture_type == PictureType::I;
        frame.sample_aspect_ratio = sample_aspect_ratio;
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_边缘复制() {
        let mut plane = Plane::new(16, 16, 32);
        for y in 0..16 {
            for x in 0..16 {
                plane.set(x, y, (x + y * 16) as u8);
            }
        }
        plane.set_edges(16, 16);
        assert_eq!(plane.get(-5, 0), 0);
        assert_eq!(plane.get(20, 0), 15);
        assert_eq!(plane.get(-3, -3), 0);
        assert_eq!(plane.get(40, 40), 255);
        assert_eq!(plane.get(3, 30), (3 + 15 * 16) as u8);
    }

    #[test]
    fn test_从实际尺寸开始填充() {
        let mut plane = Plane::new(16, 16, 32);
        for x in 0..16 {
            plane.set(x, 0, x as u8 * 10);
        }
        plane.set_edges(10, 16);
        // 第 10 列起被第 9 列覆盖
        assert_eq!(plane.get(10, 0), 90);
        assert_eq!(plane.get(15, 0), 90);
    }

    #[test]
    fn test_越界读取钳位() {
        let mut plane = Plane::new(16, 16, 32);
        plane.fill(7);
        plane.set(0, 0, 99);
        plane.set_edges(16, 16);
        let mut out = [0u8; 4];
        plane.fetch(-1000, -1000, 2, 2, &mut out);
        assert_eq!(out, [99; 4]);
        // 写越界被忽略
        plane.set(100, 100, 1);
    }

    #[test]
    fn test_残差叠加钳位() {
        let mut plane = Plane::new(16, 16, 32);
        plane.fill(250);
        let mut block = [0i32; 64];
        block[0] = 10;
        block[1] = -300;
        plane.add_block(0, 0, 1, &block);
        assert_eq!(plane.get(0, 0), 255);
        assert_eq!(plane.get(1, 0), 0);
        assert_eq!(plane.get(2, 0), 250);
    }

    #[test]
    fn test_输出裁剪() {
        let mut pic = Picture::new(2, 1);
        pic.clear();
        let frame = pic.to_video_frame(20, 10, PictureType::I, Rational::SQUARE);
        assert_eq!(frame.linesize, vec![20, 10, 10]);
        assert_eq!(frame.data[0].len(), 200);
        assert_eq!(frame.data[1].len(), 50);
        assert!(frame.is_keyframe);
    }
}
