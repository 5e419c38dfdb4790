//! MPEG-4 Part 2 解码常量表
//!
//! 扫描顺序、默认量化矩阵、系数 VLC 基表 (ISO/IEC 14496-2 表 B-16/B-17)、
//! escape 模式使用的 max_level / max_run 表, 以及宏块头、运动矢量、DC 大小
//! 等短 VLC 的直接查找表.

// ============================================================================
// 扫描表
// ============================================================================

/// Zigzag 扫描顺序
pub(super) const ZIGZAG_SCAN: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, //
    12, 19, 26, 33, 40, 48, 41, 34, 27, 20, 13, 6, 7, 14, 21, 28, //
    35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, //
    58, 59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// 交替水平扫描 (AC 预测方向为垂直时使用)
pub(super) const ALTERNATE_HORIZONTAL_SCAN: [usize; 64] = [
    0, 1, 2, 3, 8, 9, 16, 17, 10, 11, 4, 5, 6, 7, 15, 14, //
    13, 12, 19, 18, 24, 25, 32, 33, 26, 27, 20, 21, 22, 23, 28, 29, //
    30, 31, 34, 35, 40, 41, 48, 49, 42, 43, 36, 37, 38, 39, 44, 45, //
    46, 47, 50, 51, 56, 57, 58, 59, 52, 53, 54, 55, 60, 61, 62, 63,
];

/// 交替垂直扫描 (AC 预测方向为水平, 或 alternate_vertical_scan 时使用)
pub(super) const ALTERNATE_VERTICAL_SCAN: [usize; 64] = [
    0, 8, 16, 24, 1, 9, 2, 10, 17, 25, 32, 40, 48, 56, 57, 49, //
    41, 33, 26, 18, 3, 11, 4, 12, 19, 27, 34, 42, 50, 58, 35, 43, //
    51, 59, 20, 28, 5, 13, 6, 14, 21, 29, 36, 44, 52, 60, 37, 45, //
    53, 61, 22, 30, 7, 15, 23, 31, 38, 46, 54, 62, 39, 47, 55, 63,
];

/// 按扫描方向索引: 0=zigzag, 1=水平, 2=垂直
pub(super) const SCAN_TABLES: [&[usize; 64]; 3] = [
    &ZIGZAG_SCAN,
    &ALTERNATE_HORIZONTAL_SCAN,
    &ALTERNATE_VERTICAL_SCAN,
];

// ============================================================================
// 量化相关
// ============================================================================

/// 默认帧内量化矩阵 (光栅顺序)
pub(super) const DEFAULT_INTRA_MATRIX: [u8; 64] = [
    8, 17, 18, 19, 21, 23, 25, 27, //
    17, 18, 19, 21, 23, 25, 27, 28, //
    20, 21, 22, 23, 24, 26, 28, 30, //
    21, 22, 23, 24, 26, 28, 30, 32, //
    22, 23, 24, 26, 28, 30, 32, 35, //
    23, 24, 26, 28, 30, 32, 35, 38, //
    25, 26, 28, 30, 32, 35, 38, 41, //
    27, 28, 30, 32, 35, 38, 41, 45,
];

/// 默认帧间量化矩阵 (光栅顺序)
pub(super) const DEFAULT_INTER_MATRIX: [u8; 64] = [
    16, 17, 18, 19, 20, 21, 22, 23, //
    17, 18, 19, 20, 21, 22, 23, 24, //
    18, 19, 20, 21, 22, 23, 24, 25, //
    19, 20, 21, 22, 23, 24, 26, 27, //
    20, 21, 22, 23, 25, 26, 27, 28, //
    21, 22, 23, 24, 26, 27, 28, 30, //
    22, 23, 24, 26, 27, 28, 30, 31, //
    23, 24, 25, 27, 28, 30, 31, 33,
];

/// dquant 码字 (2 位) 对应的量化步长变化
pub(super) const DQUANT_TABLE: [i32; 4] = [-1, -2, 1, 2];

/// intra_dc_vlc_thr (3 位) 对应的量化阈值
pub(super) const INTRA_DC_THRESHOLD_TABLE: [u32; 8] = [32, 13, 15, 17, 19, 21, 23, 1];

/// 单矢量色度 MV 舍入表 (索引为 `v & 3`)
pub(super) const ROUNDTAB_79: [i32; 4] = [0, 1, 0, 0];

/// 四矢量色度 MV 舍入表 (索引为 `sum & 15`)
pub(super) const ROUNDTAB_76: [i32; 16] = [0, 0, 0, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 1, 1];

// ============================================================================
// VLC 基本类型
// ============================================================================

/// 短 VLC 查找项: 解码值与码长
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Vlc {
    pub code: i32,
    pub len: u32,
}

impl Vlc {
    pub(super) const fn new(code: i32, len: u32) -> Self {
        Self { code, len }
    }
}

/// 系数 VLC 基表项: 码字 (不含符号位), 码长, 以及 (last, run, level) 事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct CoeffVlc {
    pub code: u32,
    pub len: u32,
    pub last: u8,
    pub run: u8,
    pub level: u8,
}

impl CoeffVlc {
    const fn new(code: u32, len: u32, last: u8, run: u8, level: u8) -> Self {
        Self {
            code,
            len,
            last,
            run,
            level,
        }
    }
}

/// 系数 escape 前缀 `0000011`
pub(super) const ESCAPE_CODE: u32 = 3;
/// escape 前缀长度
pub(super) const ESCAPE_LEN: u32 = 7;

// ============================================================================
// 系数 VLC 基表
// ============================================================================

/// 帧间块系数基表 (表 B-17)
pub(super) const INTER_COEFF_TABLE: [CoeffVlc; 102] = [
    CoeffVlc::new(2, 2, 0, 0, 1), CoeffVlc::new(15, 4, 0, 0, 2), CoeffVlc::new(21, 6, 0, 0, 3),
    CoeffVlc::new(23, 7, 0, 0, 4), CoeffVlc::new(31, 8, 0, 0, 5), CoeffVlc::new(37, 9, 0, 0, 6),
    CoeffVlc::new(36, 9, 0, 0, 7), CoeffVlc::new(33, 10, 0, 0, 8), CoeffVlc::new(32, 10, 0, 0, 9),
    CoeffVlc::new(7, 11, 0, 0, 10), CoeffVlc::new(6, 11, 0, 0, 11), CoeffVlc::new(32, 11, 0, 0, 12),
    CoeffVlc::new(6, 3, 0, 1, 1), CoeffVlc::new(20, 6, 0, 1, 2), CoeffVlc::new(30, 8, 0, 1, 3),
    CoeffVlc::new(15, 10, 0, 1, 4), CoeffVlc::new(33, 11, 0, 1, 5), CoeffVlc::new(80, 12, 0, 1, 6),
    CoeffVlc::new(14, 4, 0, 2, 1), CoeffVlc::new(29, 8, 0, 2, 2), CoeffVlc::new(14, 10, 0, 2, 3),
    CoeffVlc::new(81, 12, 0, 2, 4), CoeffVlc::new(13, 5, 0, 3, 1), CoeffVlc::new(35, 9, 0, 3, 2),
    CoeffVlc::new(13, 10, 0, 3, 3), CoeffVlc::new(12, 5, 0, 4, 1), CoeffVlc::new(34, 9, 0, 4, 2),
    CoeffVlc::new(82, 12, 0, 4, 3), CoeffVlc::new(11, 5, 0, 5, 1), CoeffVlc::new(12, 10, 0, 5, 2),
    CoeffVlc::new(83, 12, 0, 5, 3), CoeffVlc::new(19, 6, 0, 6, 1), CoeffVlc::new(11, 10, 0, 6, 2),
    CoeffVlc::new(84, 12, 0, 6, 3), CoeffVlc::new(18, 6, 0, 7, 1), CoeffVlc::new(10, 10, 0, 7, 2),
    CoeffVlc::new(17, 6, 0, 8, 1), CoeffVlc::new(9, 10, 0, 8, 2), CoeffVlc::new(16, 6, 0, 9, 1),
    CoeffVlc::new(8, 10, 0, 9, 2), CoeffVlc::new(22, 7, 0, 10, 1), CoeffVlc::new(85, 12, 0, 10, 2),
    CoeffVlc::new(21, 7, 0, 11, 1), CoeffVlc::new(20, 7, 0, 12, 1), CoeffVlc::new(28, 8, 0, 13, 1),
    CoeffVlc::new(27, 8, 0, 14, 1), CoeffVlc::new(33, 9, 0, 15, 1), CoeffVlc::new(32, 9, 0, 16, 1),
    CoeffVlc::new(31, 9, 0, 17, 1), CoeffVlc::new(30, 9, 0, 18, 1), CoeffVlc::new(29, 9, 0, 19, 1),
    CoeffVlc::new(28, 9, 0, 20, 1), CoeffVlc::new(27, 9, 0, 21, 1), CoeffVlc::new(26, 9, 0, 22, 1),
    CoeffVlc::new(34, 11, 0, 23, 1), CoeffVlc::new(35, 11, 0, 24, 1), CoeffVlc::new(86, 12, 0, 25, 1),
    CoeffVlc::new(87, 12, 0, 26, 1), CoeffVlc::new(7, 4, 1, 0, 1), CoeffVlc::new(25, 9, 1, 0, 2),
    CoeffVlc::new(5, 11, 1, 0, 3), CoeffVlc::new(15, 6, 1, 1, 1), CoeffVlc::new(4, 11, 1, 1, 2),
    CoeffVlc::new(14, 6, 1, 2, 1), CoeffVlc::new(13, 6, 1, 3, 1), CoeffVlc::new(12, 6, 1, 4, 1),
    CoeffVlc::new(19, 7, 1, 5, 1), CoeffVlc::new(18, 7, 1, 6, 1), CoeffVlc::new(17, 7, 1, 7, 1),
    CoeffVlc::new(16, 7, 1, 8, 1), CoeffVlc::new(26, 8, 1, 9, 1), CoeffVlc::new(25, 8, 1, 10, 1),
    CoeffVlc::new(24, 8, 1, 11, 1), CoeffVlc::new(23, 8, 1, 12, 1), CoeffVlc::new(22, 8, 1, 13, 1),
    CoeffVlc::new(21, 8, 1, 14, 1), CoeffVlc::new(20, 8, 1, 15, 1), CoeffVlc::new(19, 8, 1, 16, 1),
    CoeffVlc::new(24, 9, 1, 17, 1), CoeffVlc::new(23, 9, 1, 18, 1), CoeffVlc::new(22, 9, 1, 19, 1),
    CoeffVlc::new(21, 9, 1, 20, 1), CoeffVlc::new(20, 9, 1, 21, 1), CoeffVlc::new(19, 9, 1, 22, 1),
    CoeffVlc::new(18, 9, 1, 23, 1), CoeffVlc::new(17, 9, 1, 24, 1), CoeffVlc::new(7, 10, 1, 25, 1),
    CoeffVlc::new(6, 10, 1, 26, 1), CoeffVlc::new(5, 10, 1, 27, 1), CoeffVlc::new(4, 10, 1, 28, 1),
    CoeffVlc::new(36, 11, 1, 29, 1), CoeffVlc::new(37, 11, 1, 30, 1), CoeffVlc::new(38, 11, 1, 31, 1),
    CoeffVlc::new(39, 11, 1, 32, 1), CoeffVlc::new(88, 12, 1, 33, 1), CoeffVlc::new(89, 12, 1, 34, 1),
    CoeffVlc::new(90, 12, 1, 35, 1), CoeffVlc::new(91, 12, 1, 36, 1), CoeffVlc::new(92, 12, 1, 37, 1),
    CoeffVlc::new(93, 12, 1, 38, 1), CoeffVlc::new(94, 12, 1, 39, 1), CoeffVlc::new(95, 12, 1, 40, 1),
];

/// 帧内块系数基表 (表 B-16)
pub(super) const INTRA_COEFF_TABLE: [CoeffVlc; 102] = [
    CoeffVlc::new(2, 2, 0, 0, 1), CoeffVlc::new(15, 4, 0, 0, 3), CoeffVlc::new(21, 6, 0, 0, 6),
    CoeffVlc::new(23, 7, 0, 0, 9), CoeffVlc::new(31, 8, 0, 0, 10), CoeffVlc::new(37, 9, 0, 0, 13),
    CoeffVlc::new(36, 9, 0, 0, 14), CoeffVlc::new(33, 10, 0, 0, 17), CoeffVlc::new(32, 10, 0, 0, 18),
    CoeffVlc::new(7, 11, 0, 0, 21), CoeffVlc::new(6, 11, 0, 0, 22), CoeffVlc::new(32, 11, 0, 0, 23),
    CoeffVlc::new(6, 3, 0, 0, 2), CoeffVlc::new(20, 6, 0, 1, 2), CoeffVlc::new(30, 8, 0, 0, 11),
    CoeffVlc::new(15, 10, 0, 0, 19), CoeffVlc::new(33, 11, 0, 0, 24), CoeffVlc::new(80, 12, 0, 0, 25),
    CoeffVlc::new(14, 4, 0, 1, 1), CoeffVlc::new(29, 8, 0, 0, 12), CoeffVlc::new(14, 10, 0, 0, 20),
    CoeffVlc::new(81, 12, 0, 0, 26), CoeffVlc::new(13, 5, 0, 0, 4), CoeffVlc::new(35, 9, 0, 0, 15),
    CoeffVlc::new(13, 10, 0, 1, 7), CoeffVlc::new(12, 5, 0, 0, 5), CoeffVlc::new(34, 9, 0, 4, 2),
    CoeffVlc::new(82, 12, 0, 0, 27), CoeffVlc::new(11, 5, 0, 2, 1), CoeffVlc::new(12, 10, 0, 2, 4),
    CoeffVlc::new(83, 12, 0, 1, 9), CoeffVlc::new(19, 6, 0, 0, 7), CoeffVlc::new(11, 10, 0, 3, 4),
    CoeffVlc::new(84, 12, 0, 6, 3), CoeffVlc::new(18, 6, 0, 0, 8), CoeffVlc::new(10, 10, 0, 4, 3),
    CoeffVlc::new(17, 6, 0, 3, 1), CoeffVlc::new(9, 10, 0, 8, 2), CoeffVlc::new(16, 6, 0, 4, 1),
    CoeffVlc::new(8, 10, 0, 5, 3), CoeffVlc::new(22, 7, 0, 1, 3), CoeffVlc::new(85, 12, 0, 1, 10),
    CoeffVlc::new(21, 7, 0, 2, 2), CoeffVlc::new(20, 7, 0, 7, 1), CoeffVlc::new(28, 8, 0, 1, 4),
    CoeffVlc::new(27, 8, 0, 3, 2), CoeffVlc::new(33, 9, 0, 0, 16), CoeffVlc::new(32, 9, 0, 1, 5),
    CoeffVlc::new(31, 9, 0, 1, 6), CoeffVlc::new(30, 9, 0, 2, 3), CoeffVlc::new(29, 9, 0, 3, 3),
    CoeffVlc::new(28, 9, 0, 5, 2), CoeffVlc::new(27, 9, 0, 6, 2), CoeffVlc::new(26, 9, 0, 7, 2),
    CoeffVlc::new(34, 11, 0, 1, 8), CoeffVlc::new(35, 11, 0, 9, 2), CoeffVlc::new(86, 12, 0, 2, 5),
    CoeffVlc::new(87, 12, 0, 7, 3), CoeffVlc::new(7, 4, 1, 0, 1), CoeffVlc::new(25, 9, 0, 11, 1),
    CoeffVlc::new(5, 11, 1, 0, 6), CoeffVlc::new(15, 6, 1, 1, 1), CoeffVlc::new(4, 11, 1, 0, 7),
    CoeffVlc::new(14, 6, 1, 2, 1), CoeffVlc::new(13, 6, 0, 5, 1), CoeffVlc::new(12, 6, 1, 0, 2),
    CoeffVlc::new(19, 7, 1, 5, 1), CoeffVlc::new(18, 7, 0, 6, 1), CoeffVlc::new(17, 7, 1, 3, 1),
    CoeffVlc::new(16, 7, 1, 4, 1), CoeffVlc::new(26, 8, 1, 9, 1), CoeffVlc::new(25, 8, 0, 8, 1),
    CoeffVlc::new(24, 8, 0, 9, 1), CoeffVlc::new(23, 8, 0, 10, 1), CoeffVlc::new(22, 8, 1, 0, 3),
    CoeffVlc::new(21, 8, 1, 6, 1), CoeffVlc::new(20, 8, 1, 7, 1), CoeffVlc::new(19, 8, 1, 8, 1),
    CoeffVlc::new(24, 9, 0, 12, 1), CoeffVlc::new(23, 9, 1, 0, 4), CoeffVlc::new(22, 9, 1, 1, 2),
    CoeffVlc::new(21, 9, 1, 10, 1), CoeffVlc::new(20, 9, 1, 11, 1), CoeffVlc::new(19, 9, 1, 12, 1),
    CoeffVlc::new(18, 9, 1, 13, 1), CoeffVlc::new(17, 9, 1, 14, 1), CoeffVlc::new(7, 10, 0, 13, 1),
    CoeffVlc::new(6, 10, 1, 0, 5), CoeffVlc::new(5, 10, 1, 1, 3), CoeffVlc::new(4, 10, 1, 2, 2),
    CoeffVlc::new(36, 11, 1, 3, 2), CoeffVlc::new(37, 11, 1, 4, 2), CoeffVlc::new(38, 11, 1, 15, 1),
    CoeffVlc::new(39, 11, 1, 16, 1), CoeffVlc::new(88, 12, 0, 14, 1), CoeffVlc::new(89, 12, 1, 0, 8),
    CoeffVlc::new(90, 12, 1, 5, 2), CoeffVlc::new(91, 12, 1, 6, 2), CoeffVlc::new(92, 12, 1, 17, 1),
    CoeffVlc::new(93, 12, 1, 18, 1), CoeffVlc::new(94, 12, 1, 19, 1), CoeffVlc::new(95, 12, 1, 20, 1),
];

/// 基表中每个 run 的最大 level, 索引 `[intra][last][run]`
pub(super) const MAX_LEVEL: [[[u8; 64]; 2]; 2] = [
    [
        [
            12, 6, 4, 3, 3, 3, 3, 2, 2, 2, 2, 1, 1, 1, 1, 1, //
            1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ],
        [
            3, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, //
            1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, //
            1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ],
    ],
    [
        [
            27, 10, 5, 4, 3, 3, 3, 3, 2, 2, 1, 1, 1, 1, 1, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ],
        [
            8, 3, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, //
            1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ],
    ],
];

/// 基表中每个 level 的最大 run, 索引 `[intra][last][level]`
pub(super) const MAX_RUN: [[[u8; 64]; 2]; 2] = [
    [
        [
            0, 26, 10, 6, 2, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ],
        [
            0, 40, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ],
    ],
    [
        [
            0, 14, 9, 7, 3, 2, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ],
        [
            0, 20, 6, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ],
    ],
];

// ============================================================================
// 宏块头 VLC
// ============================================================================

/// I-VOP mcbpc, 索引 `show_bits(9) >> 3`. 解码值为 `mode | (cbpc << 4)`
pub(super) const MCBPC_INTRA_TABLE: [Vlc; 64] = [
    Vlc::new(-1, 0), Vlc::new(20, 6), Vlc::new(36, 6), Vlc::new(52, 6), Vlc::new(4, 4), Vlc::new(4, 4),
    Vlc::new(4, 4), Vlc::new(4, 4), Vlc::new(19, 3), Vlc::new(19, 3), Vlc::new(19, 3), Vlc::new(19, 3),
    Vlc::new(19, 3), Vlc::new(19, 3), Vlc::new(19, 3), Vlc::new(19, 3), Vlc::new(35, 3), Vlc::new(35, 3),
    Vlc::new(35, 3), Vlc::new(35, 3), Vlc::new(35, 3), Vlc::new(35, 3), Vlc::new(35, 3), Vlc::new(35, 3),
    Vlc::new(51, 3), Vlc::new(51, 3), Vlc::new(51, 3), Vlc::new(51, 3), Vlc::new(51, 3), Vlc::new(51, 3),
    Vlc::new(51, 3), Vlc::new(51, 3), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1),
    Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1),
    Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1),
    Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1),
    Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1),
    Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1), Vlc::new(3, 1),
];

/// P/S-VOP mcbpc, 索引 `min(show_bits(9), 256)`. 255 为填充码
pub(super) const MCBPC_INTER_TABLE: [Vlc; 257] = [
    Vlc::new(-1, 0), Vlc::new(255, 9), Vlc::new(52, 9), Vlc::new(36, 9), Vlc::new(20, 9), Vlc::new(49, 9),
    Vlc::new(35, 8), Vlc::new(35, 8), Vlc::new(19, 8), Vlc::new(19, 8), Vlc::new(50, 8), Vlc::new(50, 8),
    Vlc::new(51, 7), Vlc::new(51, 7), Vlc::new(51, 7), Vlc::new(51, 7), Vlc::new(34, 7), Vlc::new(34, 7),
    Vlc::new(34, 7), Vlc::new(34, 7), Vlc::new(18, 7), Vlc::new(18, 7), Vlc::new(18, 7), Vlc::new(18, 7),
    Vlc::new(33, 7), Vlc::new(33, 7), Vlc::new(33, 7), Vlc::new(33, 7), Vlc::new(17, 7), Vlc::new(17, 7),
    Vlc::new(17, 7), Vlc::new(17, 7), Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(4, 6),
    Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(48, 6), Vlc::new(48, 6),
    Vlc::new(48, 6), Vlc::new(48, 6), Vlc::new(48, 6), Vlc::new(48, 6), Vlc::new(48, 6), Vlc::new(48, 6),
    Vlc::new(3, 5), Vlc::new(3, 5), Vlc::new(3, 5), Vlc::new(3, 5), Vlc::new(3, 5), Vlc::new(3, 5),
    Vlc::new(3, 5), Vlc::new(3, 5), Vlc::new(3, 5), Vlc::new(3, 5), Vlc::new(3, 5), Vlc::new(3, 5),
    Vlc::new(3, 5), Vlc::new(3, 5), Vlc::new(3, 5), Vlc::new(3, 5), Vlc::new(32, 4), Vlc::new(32, 4),
    Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4),
    Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4),
    Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4),
    Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4),
    Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4), Vlc::new(32, 4),
    Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4),
    Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4),
    Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4),
    Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4),
    Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(16, 4),
    Vlc::new(16, 4), Vlc::new(16, 4), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3),
    Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3),
    Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3),
    Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3),
    Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3),
    Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3),
    Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3),
    Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3),
    Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3),
    Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3),
    Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(2, 3),
    Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3),
    Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3),
    Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3),
    Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3),
    Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3),
    Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3),
    Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3),
    Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3),
    Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3),
    Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3),
    Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(1, 3), Vlc::new(0, 1),
];

/// cbpy (帧内形式), 索引 `show_bits(6)`
pub(super) const CBPY_TABLE: [Vlc; 64] = [
    Vlc::new(-1, 0), Vlc::new(-1, 0), Vlc::new(6, 6), Vlc::new(9, 6), Vlc::new(8, 5), Vlc::new(8, 5),
    Vlc::new(4, 5), Vlc::new(4, 5), Vlc::new(2, 5), Vlc::new(2, 5), Vlc::new(1, 5), Vlc::new(1, 5),
    Vlc::new(0, 4), Vlc::new(0, 4), Vlc::new(0, 4), Vlc::new(0, 4), Vlc::new(12, 4), Vlc::new(12, 4),
    Vlc::new(12, 4), Vlc::new(12, 4), Vlc::new(10, 4), Vlc::new(10, 4), Vlc::new(10, 4), Vlc::new(10, 4),
    Vlc::new(14, 4), Vlc::new(14, 4), Vlc::new(14, 4), Vlc::new(14, 4), Vlc::new(5, 4), Vlc::new(5, 4),
    Vlc::new(5, 4), Vlc::new(5, 4), Vlc::new(13, 4), Vlc::new(13, 4), Vlc::new(13, 4), Vlc::new(13, 4),
    Vlc::new(3, 4), Vlc::new(3, 4), Vlc::new(3, 4), Vlc::new(3, 4), Vlc::new(11, 4), Vlc::new(11, 4),
    Vlc::new(11, 4), Vlc::new(11, 4), Vlc::new(7, 4), Vlc::new(7, 4), Vlc::new(7, 4), Vlc::new(7, 4),
    Vlc::new(15, 2), Vlc::new(15, 2), Vlc::new(15, 2), Vlc::new(15, 2), Vlc::new(15, 2), Vlc::new(15, 2),
    Vlc::new(15, 2), Vlc::new(15, 2), Vlc::new(15, 2), Vlc::new(15, 2), Vlc::new(15, 2), Vlc::new(15, 2),
    Vlc::new(15, 2), Vlc::new(15, 2), Vlc::new(15, 2), Vlc::new(15, 2),
];

// ============================================================================
// 运动矢量与 DC VLC
// ============================================================================

/// 运动矢量差分, `show_bits(12) >= 512` 时索引 `(v >> 8) - 2`
pub(super) const MV_TAB0: [Vlc; 14] = [
    Vlc::new(3, 4), Vlc::new(-3, 4), Vlc::new(2, 3), Vlc::new(2, 3), Vlc::new(-2, 3), Vlc::new(-2, 3),
    Vlc::new(1, 2), Vlc::new(1, 2), Vlc::new(1, 2), Vlc::new(1, 2), Vlc::new(-1, 2), Vlc::new(-1, 2),
    Vlc::new(-1, 2), Vlc::new(-1, 2),
];

/// 运动矢量差分, `128 <= show_bits(12) < 512` 时索引 `(v >> 2) - 32`
pub(super) const MV_TAB1: [Vlc; 96] = [
    Vlc::new(12, 10), Vlc::new(-12, 10), Vlc::new(11, 10), Vlc::new(-11, 10), Vlc::new(10, 9), Vlc::new(10, 9),
    Vlc::new(-10, 9), Vlc::new(-10, 9), Vlc::new(9, 9), Vlc::new(9, 9), Vlc::new(-9, 9), Vlc::new(-9, 9),
    Vlc::new(8, 9), Vlc::new(8, 9), Vlc::new(-8, 9), Vlc::new(-8, 9), Vlc::new(7, 7), Vlc::new(7, 7),
    Vlc::new(7, 7), Vlc::new(7, 7), Vlc::new(7, 7), Vlc::new(7, 7), Vlc::new(7, 7), Vlc::new(7, 7),
    Vlc::new(-7, 7), Vlc::new(-7, 7), Vlc::new(-7, 7), Vlc::new(-7, 7), Vlc::new(-7, 7), Vlc::new(-7, 7),
    Vlc::new(-7, 7), Vlc::new(-7, 7), Vlc::new(6, 7), Vlc::new(6, 7), Vlc::new(6, 7), Vlc::new(6, 7),
    Vlc::new(6, 7), Vlc::new(6, 7), Vlc::new(6, 7), Vlc::new(6, 7), Vlc::new(-6, 7), Vlc::new(-6, 7),
    Vlc::new(-6, 7), Vlc::new(-6, 7), Vlc::new(-6, 7), Vlc::new(-6, 7), Vlc::new(-6, 7), Vlc::new(-6, 7),
    Vlc::new(5, 7), Vlc::new(5, 7), Vlc::new(5, 7), Vlc::new(5, 7), Vlc::new(5, 7), Vlc::new(5, 7),
    Vlc::new(5, 7), Vlc::new(5, 7), Vlc::new(-5, 7), Vlc::new(-5, 7), Vlc::new(-5, 7), Vlc::new(-5, 7),
    Vlc::new(-5, 7), Vlc::new(-5, 7), Vlc::new(-5, 7), Vlc::new(-5, 7), Vlc::new(4, 6), Vlc::new(4, 6),
    Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(4, 6),
    Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(4, 6),
    Vlc::new(4, 6), Vlc::new(4, 6), Vlc::new(-4, 6), Vlc::new(-4, 6), Vlc::new(-4, 6), Vlc::new(-4, 6),
    Vlc::new(-4, 6), Vlc::new(-4, 6), Vlc::new(-4, 6), Vlc::new(-4, 6), Vlc::new(-4, 6), Vlc::new(-4, 6),
    Vlc::new(-4, 6), Vlc::new(-4, 6), Vlc::new(-4, 6), Vlc::new(-4, 6), Vlc::new(-4, 6), Vlc::new(-4, 6),
];

/// 运动矢量差分, `4 <= show_bits(12) < 128` 时索引 `v - 4`
pub(super) const MV_TAB2: [Vlc; 124] = [
    Vlc::new(32, 12), Vlc::new(-32, 12), Vlc::new(31, 12), Vlc::new(-31, 12), Vlc::new(30, 11), Vlc::new(30, 11),
    Vlc::new(-30, 11), Vlc::new(-30, 11), Vlc::new(29, 11), Vlc::new(29, 11), Vlc::new(-29, 11), Vlc::new(-29, 11),
    Vlc::new(28, 11), Vlc::new(28, 11), Vlc::new(-28, 11), Vlc::new(-28, 11), Vlc::new(27, 11), Vlc::new(27, 11),
    Vlc::new(-27, 11), Vlc::new(-27, 11), Vlc::new(26, 11), Vlc::new(26, 11), Vlc::new(-26, 11), Vlc::new(-26, 11),
    Vlc::new(25, 11), Vlc::new(25, 11), Vlc::new(-25, 11), Vlc::new(-25, 11), Vlc::new(24, 10), Vlc::new(24, 10),
    Vlc::new(24, 10), Vlc::new(24, 10), Vlc::new(-24, 10), Vlc::new(-24, 10), Vlc::new(-24, 10), Vlc::new(-24, 10),
    Vlc::new(23, 10), Vlc::new(23, 10), Vlc::new(23, 10), Vlc::new(23, 10), Vlc::new(-23, 10), Vlc::new(-23, 10),
    Vlc::new(-23, 10), Vlc::new(-23, 10), Vlc::new(22, 10), Vlc::new(22, 10), Vlc::new(22, 10), Vlc::new(22, 10),
    Vlc::new(-22, 10), Vlc::new(-22, 10), Vlc::new(-22, 10), Vlc::new(-22, 10), Vlc::new(21, 10), Vlc::new(21, 10),
    Vlc::new(21, 10), Vlc::new(21, 10), Vlc::new(-21, 10), Vlc::new(-21, 10), Vlc::new(-21, 10), Vlc::new(-21, 10),
    Vlc::new(20, 10), Vlc::new(20, 10), Vlc::new(20, 10), Vlc::new(20, 10), Vlc::new(-20, 10), Vlc::new(-20, 10),
    Vlc::new(-20, 10), Vlc::new(-20, 10), Vlc::new(19, 10), Vlc::new(19, 10), Vlc::new(19, 10), Vlc::new(19, 10),
    Vlc::new(-19, 10), Vlc::new(-19, 10), Vlc::new(-19, 10), Vlc::new(-19, 10), Vlc::new(18, 10), Vlc::new(18, 10),
    Vlc::new(18, 10), Vlc::new(18, 10), Vlc::new(-18, 10), Vlc::new(-18, 10), Vlc::new(-18, 10), Vlc::new(-18, 10),
    Vlc::new(17, 10), Vlc::new(17, 10), Vlc::new(17, 10), Vlc::new(17, 10), Vlc::new(-17, 10), Vlc::new(-17, 10),
    Vlc::new(-17, 10), Vlc::new(-17, 10), Vlc::new(16, 10), Vlc::new(16, 10), Vlc::new(16, 10), Vlc::new(16, 10),
    Vlc::new(-16, 10), Vlc::new(-16, 10), Vlc::new(-16, 10), Vlc::new(-16, 10), Vlc::new(15, 10), Vlc::new(15, 10),
    Vlc::new(15, 10), Vlc::new(15, 10), Vlc::new(-15, 10), Vlc::new(-15, 10), Vlc::new(-15, 10), Vlc::new(-15, 10),
    Vlc::new(14, 10), Vlc::new(14, 10), Vlc::new(14, 10), Vlc::new(14, 10), Vlc::new(-14, 10), Vlc::new(-14, 10),
    Vlc::new(-14, 10), Vlc::new(-14, 10), Vlc::new(13, 10), Vlc::new(13, 10), Vlc::new(13, 10), Vlc::new(13, 10),
    Vlc::new(-13, 10), Vlc::new(-13, 10), Vlc::new(-13, 10), Vlc::new(-13, 10),
];

/// 亮度 dc_size 短码 (3 位前缀), 0 号为非法码
pub(super) const DC_LUM_TABLE: [Vlc; 8] = [
    Vlc::new(0, 0),
    Vlc::new(4, 3),
    Vlc::new(3, 3),
    Vlc::new(0, 3),
    Vlc::new(2, 2),
    Vlc::new(2, 2),
    Vlc::new(1, 2),
    Vlc::new(1, 2),
];

/// sprite 轨迹长度码, 下标即后续差分值的位数
pub(super) const SPRITE_TRAJECTORY_LEN: [Vlc; 12] = [
    Vlc::new(0x00, 2),
    Vlc::new(0x02, 3),
    Vlc::new(0x03, 3),
    Vlc::new(0x04, 3),
    Vlc::new(0x05, 3),
    Vlc::new(0x06, 3),
    Vlc::new(0x0E, 4),
    Vlc::new(0x1E, 5),
    Vlc::new(0x3E, 6),
    Vlc::new(0x7E, 7),
    Vlc::new(0xFE, 8),
    Vlc::new(0x1FE, 9),
];
