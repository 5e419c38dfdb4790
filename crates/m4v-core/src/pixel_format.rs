//! 像素格式定义.
//!
//! 解码器只产出 8 位 YUV 4:2:0 平面图像, 这里保留描述其平面布局所需的最少信息.

use std::fmt;

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// 未指定
    #[default]
    None,
    /// YUV 4:2:0 平面格式, 8 位
    Yuv420p,
}

impl PixelFormat {
    /// 平面数量
    pub const fn plane_count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Yuv420p => 3,
        }
    }

    /// 指定平面的 (宽, 高), 色度平面向上取整
    pub fn plane_dimensions(&self, plane: usize, width: u32, height: u32) -> Option<(u32, u32)> {
        match (self, plane) {
            (Self::Yuv420p, 0) => Some((width, height)),
            (Self::Yuv420p, 1 | 2) => Some((width.div_ceil(2), height.div_ceil(2))),
            _ => None,
        }
    }

    /// 整帧的字节数 (无行填充)
    pub fn frame_size(&self, width: u32, height: u32) -> Option<usize> {
        if *self == Self::None {
            return None;
        }
        let mut total = 0usize;
        for plane in 0..self.plane_count() {
            let (w, h) = self.plane_dimensions(plane, width, height)?;
            total += w as usize * h as usize;
        }
        Some(total)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Yuv420p => "yuv420p",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuv420p_frame_size() {
        let pf = PixelFormat::Yuv420p;
        assert_eq!(pf.frame_size(176, 144), Some(176 * 144 * 3 / 2));
        assert_eq!(pf.plane_dimensions(1, 176, 144), Some((88, 72)));
    }

    #[test]
    fn test_奇数尺寸色度向上取整() {
        let pf = PixelFormat::Yuv420p;
        assert_eq!(pf.plane_dimensions(2, 17, 9), Some((9, 5)));
        assert_eq!(pf.frame_size(17, 9), Some(17 * 9 + 2 * 9 * 5));
    }

    #[test]
    fn test_none_return_none() {
        assert_eq!(PixelFormat::None.frame_size(16, 16), None);
        assert_eq!(PixelFormat::Yuv420p.plane_dimensions(3, 16, 16), None);
        assert_eq!(PixelFormat::Yuv420p.to_string(), "yuv420p");
    }
}
