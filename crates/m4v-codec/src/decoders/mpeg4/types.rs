//! MPEG-4 Part 2 解码器类型定义
//!
//! `SequenceParams` 只在 VOL 头处变化, `FrameHeader` 每个 VOP 一份,
//! `MacroblockInfo` 每个宏块一份并随参考帧轮换.

use crate::frame::PictureType;

use super::tables::{DEFAULT_INTER_MATRIX, DEFAULT_INTRA_MATRIX};

/// 运动向量 (半像素或四分之一像素单位)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionVector {
    pub x: i32,
    pub y: i32,
}

impl MotionVector {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

/// 宏块模式
///
/// I/P/S-VOP 使用前七种, B-VOP 使用后五种.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MbMode {
    #[default]
    Inter,
    InterQ,
    Inter4V,
    Intra,
    IntraQ,
    /// 跳过宏块 (零向量零残差)
    NotCoded,
    /// S-VOP 中的跳过宏块 (按全局运动预测)
    NotCodedGmc,
    /// B: 直接模式 (带修正向量)
    Direct,
    /// B: 双向插值
    Interpolate,
    /// B: 仅后向
    Backward,
    /// B: 仅前向
    Forward,
    /// B: 直接模式, 修正向量为零
    DirectNoneMv,
}

impl MbMode {
    /// 由 MCBPC 中的 3 位模式值得到 I/P 宏块模式
    pub(super) fn from_mcbpc(mode: u32) -> Self {
        match mode {
            0 => Self::Inter,
            1 => Self::InterQ,
            2 => Self::Inter4V,
            3 => Self::Intra,
            _ => Self::IntraQ,
        }
    }

    /// 由 B-VOP mb_type 得到宏块模式
    pub(super) fn from_b_mbtype(mbtype: u32) -> Option<Self> {
        match mbtype {
            0 => Some(Self::Direct),
            1 => Some(Self::Interpolate),
            2 => Some(Self::Backward),
            3 => Some(Self::Forward),
            _ => None,
        }
    }

    pub fn is_intra(&self) -> bool {
        matches!(self, Self::Intra | Self::IntraQ)
    }

    /// 是否按四个 8x8 向量做运动补偿
    ///
    /// B-VOP 的 Backward 与 Inter4V 共用同一个模式编号, 因而走四向量路径,
    /// 色度向量按四向量之和推导.
    pub(super) fn uses_four_vectors(&self) -> bool {
        matches!(self, Self::Inter4V | Self::Backward)
    }
}

/// 宏块信息
///
/// 当前帧与上一个非 B 帧各保留一组, 帧末交换.
#[derive(Debug, Clone)]
pub struct MacroblockInfo {
    pub mode: MbMode,
    pub quant: u32,
    pub cbp: u32,
    /// 前向 (P-VOP 唯一) 向量
    pub mvs: [MotionVector; 4],
    /// B-VOP 后向向量
    pub b_mvs: [MotionVector; 4],
    /// GMC 平均向量
    pub amv: MotionVector,
    /// 每块的 AC/DC 预测值: [DC, 首行 AC 1-7, 首列 AC 1-7]
    pub pred_values: [[i32; 15]; 6],
    /// 每块的 AC 预测方向 (0 无, 1 自上, 2 自左)
    pub acpred_directions: [u8; 6],
    pub field_dct: bool,
    pub field_pred: bool,
    pub field_for_top: bool,
    pub field_for_bot: bool,
    pub mcsel: bool,
}

impl Default for MacroblockInfo {
    fn default() -> Self {
        Self {
            mode: MbMode::NotCoded,
            quant: 1,
            cbp: 0,
            mvs: [MotionVector::ZERO; 4],
            b_mvs: [MotionVector::ZERO; 4],
            amv: MotionVector::ZERO,
            pred_values: [[0; 15]; 6],
            acpred_directions: [0; 6],
            field_dct: false,
            field_pred: false,
            field_for_top: false,
            field_for_bot: false,
            mcsel: false,
        }
    }
}

impl MacroblockInfo {
    pub(super) fn set_all_mvs(&mut self, mv: MotionVector) {
        self.mvs = [mv; 4];
    }
}

/// VOP 编码类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodingType {
    Intra,
    Predicted,
    Bidirectional,
    Sprite,
    /// vop_coded = 0, 不携带宏块数据
    NotCoded,
}

impl CodingType {
    pub(super) fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::Intra,
            1 => Self::Predicted,
            2 => Self::Bidirectional,
            _ => Self::Sprite,
        }
    }

    pub fn picture_type(&self) -> PictureType {
        match self {
            Self::Intra => PictureType::I,
            Self::Predicted | Self::NotCoded => PictureType::P,
            Self::Bidirectional => PictureType::B,
            Self::Sprite => PictureType::S,
        }
    }
}

/// Sprite 模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpriteMode {
    #[default]
    None,
    Static,
    Gmc,
}

/// 最多三个 GMC 控制点的位移
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarpPoints {
    pub duv: [MotionVector; 3],
}

/// complexity_estimation 头的开关位
///
/// VOP 头按这些开关跳过对应的 8 位统计字段.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexityEstimation {
    pub method: u32,
    pub opaque: bool,
    pub transparent: bool,
    pub intra_cae: bool,
    pub inter_cae: bool,
    pub no_update: bool,
    pub upsampling: bool,
    pub intra_blocks: bool,
    pub inter_blocks: bool,
    pub inter4v_blocks: bool,
    pub not_coded_blocks: bool,
    pub dct_coefs: bool,
    pub dct_lines: bool,
    pub vlc_symbols: bool,
    pub vlc_bits: bool,
    pub apm: bool,
    pub npm: bool,
    pub interpolate_mc_q: bool,
    pub forw_back_mc_q: bool,
    pub halfpel2: bool,
    pub halfpel4: bool,
    pub sadct: bool,
    pub quarterpel: bool,
}

/// Video signal type (VO 头)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoSignal {
    pub video_format: u32,
    pub full_range: bool,
    pub colour_primaries: u32,
    pub transfer_characteristics: u32,
    pub matrix_coefficients: u32,
}

/// GOV 头的时间码
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GovInfo {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub closed_gov: bool,
    pub broken_link: bool,
}

/// 序列参数, 由 VOL 头更新
#[derive(Debug, Clone)]
pub struct SequenceParams {
    pub width: u32,
    pub height: u32,
    pub mb_width: usize,
    pub mb_height: usize,
    pub ver_id: u32,
    pub aspect_ratio: u32,
    pub par_width: u32,
    pub par_height: u32,
    pub low_delay: bool,
    pub shape: u32,
    pub time_inc_resolution: u32,
    pub time_inc_bits: u32,
    pub interlacing: bool,
    pub sprite_mode: SpriteMode,
    pub sprite_warping_points: u32,
    pub sprite_warping_accuracy: u32,
    pub sprite_brightness_change: bool,
    pub quant_bits: u32,
    /// 0 = H.263, 1 = MPEG
    pub quant_type: u32,
    /// 自然顺序
    pub intra_matrix: [u8; 64],
    pub inter_matrix: [u8; 64],
    pub quarterpel: bool,
    pub complexity_estimation_disable: bool,
    pub estimation: ComplexityEstimation,
    pub resync_marker_disable: bool,
    pub data_partitioned: bool,
    pub reversible_vlc: bool,
    pub newpred_enable: bool,
    pub reduced_resolution_enable: bool,
}

impl Default for SequenceParams {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            mb_width: 0,
            mb_height: 0,
            ver_id: 1,
            aspect_ratio: 1,
            par_width: 1,
            par_height: 1,
            low_delay: false,
            shape: 0,
            time_inc_resolution: 1,
            time_inc_bits: 1,
            interlacing: false,
            sprite_mode: SpriteMode::None,
            sprite_warping_points: 0,
            sprite_warping_accuracy: 0,
            sprite_brightness_change: false,
            quant_bits: 5,
            quant_type: 0,
            intra_matrix: DEFAULT_INTRA_MATRIX,
            inter_matrix: DEFAULT_INTER_MATRIX,
            quarterpel: false,
            complexity_estimation_disable: true,
            estimation: ComplexityEstimation::default(),
            resync_marker_disable: true,
            data_partitioned: false,
            reversible_vlc: false,
            newpred_enable: false,
            reduced_resolution_enable: false,
        }
    }
}

impl SequenceParams {
    pub fn mb_count(&self) -> usize {
        self.mb_width * self.mb_height
    }

    /// 像素宽高比 (aspect_ratio_info 为 15 时取扩展值)
    pub fn pixel_aspect(&self) -> (u32, u32) {
        match self.aspect_ratio {
            1 => (1, 1),
            2 => (12, 11),
            3 => (10, 11),
            4 => (16, 11),
            5 => (40, 33),
            15 => (self.par_width.max(1), self.par_height.max(1)),
            _ => (1, 1),
        }
    }
}

/// 一个 VOP 的头信息
#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub coding_type: CodingType,
    pub quant: u32,
    pub fcode_forward: u32,
    pub fcode_backward: u32,
    pub intra_dc_threshold: u32,
    pub rounding: bool,
    pub reduced_resolution: bool,
    pub top_field_first: bool,
    pub alternate_vertical_scan: bool,
    pub warp: WarpPoints,
    /// 本 VOP 的 time_increment
    pub time: i32,
}

impl FrameHeader {
    pub(super) fn new(coding_type: CodingType) -> Self {
        Self {
            coding_type,
            quant: 1,
            fcode_forward: 1,
            fcode_backward: 1,
            intra_dc_threshold: 0,
            rounding: false,
            reduced_resolution: false,
            top_field_first: false,
            alternate_vertical_scan: false,
            warp: WarpPoints::default(),
            time: 0,
        }
    }

    /// 是否需要 GMC
    pub(super) fn uses_gmc(&self, seq: &SequenceParams) -> bool {
        self.coding_type == CodingType::Sprite && seq.sprite_mode == SpriteMode::Gmc
    }
}

/// 头解析结果
#[derive(Debug, Clone)]
pub enum HeaderEvent {
    /// 数据耗尽, 未找到图像头
    Nothing,
    /// VOL 头声明了新的尺寸
    LayerChange { width: u32, height: u32 },
    /// VOL 头已解析, 尺寸未变
    Layer,
    /// 图像头
    Picture(FrameHeader),
}

/// 宏块网格尺寸 (RRV 时每个宏块覆盖 32x32)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct MbGrid {
    pub width: usize,
    pub height: usize,
}

impl MbGrid {
    pub(super) fn for_picture(seq: &SequenceParams, reduced_resolution: bool) -> Self {
        if reduced_resolution {
            Self {
                width: (seq.width as usize).div_ceil(32),
                height: (seq.height as usize).div_ceil(32),
            }
        } else {
            Self {
                width: seq.mb_width,
                height: seq.mb_height,
            }
        }
    }

    pub(super) fn count(&self) -> usize {
        self.width * self.height
    }
}
