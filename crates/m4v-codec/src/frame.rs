//! 解码输出的图像.
//!
//! 平面已裁剪到显示尺寸, 不含解码器内部的边缘填充.

use m4v_core::{PixelFormat, Rational};

use crate::packet::NOPTS_VALUE;

/// 一帧 YUV420P 图像
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Y, U, V 三个平面
    pub data: Vec<Vec<u8>>,
    /// 各平面每行的字节数
    pub linesize: Vec<usize>,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// 显示时间戳, 只有低延迟码流才能从输入包推导
    pub pts: i64,
    /// VOL 声明的时间基 (1 / vop_time_increment_resolution)
    pub time_base: Rational,
    pub is_keyframe: bool,
    pub picture_type: PictureType,
    /// 采样宽高比 (VOL 的 aspect_ratio_info)
    pub sample_aspect_ratio: Rational,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let plane_count = pixel_format.plane_count();
        Self {
            data: vec![Vec::new(); plane_count],
            linesize: vec![0; plane_count],
            width,
            height,
            pixel_format,
            pts: NOPTS_VALUE,
            time_base: Rational::UNDEFINED,
            is_keyframe: false,
            picture_type: PictureType::None,
            sample_aspect_ratio: Rational::SQUARE,
        }
    }

    /// 读取 `plane` 平面 (x, y) 处的采样, 越界返回 `None`
    pub fn sample(&self, plane: usize, x: usize, y: usize) -> Option<u8> {
        let stride = *self.linesize.get(plane)?;
        if x >= stride {
            return None;
        }
        self.data.get(plane)?.get(y * stride + x).copied()
    }
}

/// `Decoder` trait 输出的帧
#[derive(Debug, Clone)]
pub enum Frame {
    Video(VideoFrame),
}

/// VOP 编码类型对应的图片类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PictureType {
    #[default]
    None,
    I,
    P,
    B,
    /// S-VOP (GMC / sprite)
    S,
}
