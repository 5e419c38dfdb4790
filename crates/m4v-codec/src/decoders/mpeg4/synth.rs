//! 合成码流
//!
//! 写出解码器能接受的最小 VOL/VOP 序列, 供测试与基准构造输入. 图像内容
//! 由每个宏块的平坦亮度与色度组成: 帧内宏块只编码 DC 差分, 帧间宏块跳过、
//! 取直接模式或只带一个无残差的运动向量.
//!
//! ```rust
//! use m4v_codec::decoders::mpeg4::synth::StreamBuilder;
//!
//! let mut builder = StreamBuilder::new(32, 32);
//! builder.vol().intra_vop(0, 100);
//! let data = builder.take();
//! assert!(data.starts_with(&[0x00, 0x00, 0x01, 0x20]));
//! ```

use m4v_core::bitwriter::BitWriter;

use super::header::{
    NUMBITS_VP_RESYNC_MARKER, USERDATA_START_CODE, VIDOBJLAY_START_CODE, VOP_START_CODE, log2bin,
};

/// 合成图像使用的量化参数, dc_scaler 为 8
const QUANT: u32 = 4;
/// VOL 的时间分辨率
pub const TIME_INC_RESOLUTION: u32 = 30;

/// 合成码流构造器
#[derive(Debug, Default)]
pub struct StreamBuilder {
    writer: BitWriter,
    width: u32,
    height: u32,
    low_delay: Option<bool>,
    resync_markers: bool,
    reduced_resolution: bool,
}

impl StreamBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            writer: BitWriter::new(),
            width,
            height,
            low_delay: None,
            resync_markers: false,
            reduced_resolution: false,
        }
    }

    /// 在 VOL 中声明 vol_control_parameters 与 low_delay
    pub fn low_delay(mut self, low_delay: bool) -> Self {
        self.low_delay = Some(low_delay);
        self
    }

    /// 允许视频包重同步标记 (resync_marker_disable = 0)
    pub fn resync_markers(mut self, enabled: bool) -> Self {
        self.resync_markers = enabled;
        self
    }

    /// 写版本 2 的 VOL 并打开 RRV, 之后所有 I/P-VOP 都按降分辨率编码
    pub fn reduced_resolution(mut self, enabled: bool) -> Self {
        self.reduced_resolution = enabled;
        self
    }

    fn mb_size(&self) -> usize {
        if self.reduced_resolution { 32 } else { 16 }
    }

    pub fn mb_width(&self) -> usize {
        (self.width as usize).div_ceil(self.mb_size())
    }

    pub fn mb_count(&self) -> usize {
        self.mb_width() * (self.height as usize).div_ceil(self.mb_size())
    }

    /// 取出已写入的字节, 构造器清空后可继续写
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.writer).finish()
    }

    // ========================================================================
    // 头部
    // ========================================================================

    /// 写 VOL 头 (矩形, 无隔行, H.263 量化). 打开 RRV 时为版本 2, 否则版本 1
    pub fn vol(&mut self) -> &mut Self {
        let ver2 = self.reduced_resolution;
        let bw = &mut self.writer;
        bw.write_start_code(start_code_byte(VIDOBJLAY_START_CODE));
        bw.write_bits(0, 1); // random_accessible_vol
        bw.write_bits(1, 8); // video_object_type_indication
        if ver2 {
            bw.write_bits(1, 1); // is_object_layer_identifier
            bw.write_bits(2, 4); // verid
            bw.write_bits(1, 3); // priority
        } else {
            bw.write_bits(0, 1);
        }
        bw.write_bits(1, 4); // aspect_ratio_info 1:1
        match self.low_delay {
            Some(low_delay) => {
                bw.write_bits(1, 1); // vol_control_parameters
                bw.write_bits(1, 2); // chroma_format
                bw.write_bits(u32::from(low_delay), 1);
                bw.write_bits(0, 1); // vbv_parameters
            }
            None => bw.write_bits(0, 1),
        }
        bw.write_bits(0, 2); // shape
        bw.write_marker();
        bw.write_bits(TIME_INC_RESOLUTION, 16);
        bw.write_marker();
        bw.write_bits(0, 1); // fixed_vop_rate
        bw.write_marker();
        bw.write_bits(self.width, 13);
        bw.write_marker();
        bw.write_bits(self.height, 13);
        bw.write_marker();
        bw.write_bits(0, 1); // interlacing
        bw.write_bits(1, 1); // obmc_disable
        bw.write_bits(0, if ver2 { 2 } else { 1 }); // sprite_enable
        bw.write_bits(0, 1); // not_8_bit
        bw.write_bits(0, 1); // quant_type
        if ver2 {
            bw.write_bits(0, 1); // quarter_sample
        }
        bw.write_bits(1, 1); // complexity_estimation_disable
        bw.write_bits(u32::from(!self.resync_markers), 1);
        bw.write_bits(0, 1); // data_partitioned
        if ver2 {
            bw.write_bits(0, 1); // newpred_enable
            bw.write_bits(1, 1); // reduced_resolution_vop_enable
        }
        bw.write_bits(0, 1); // scalability
        bw.write_stuffing();
        self
    }

    /// 写用户数据, 例如 `DivX503b1393p` 打开 packed 模式
    pub fn user_data(&mut self, text: &str) -> &mut Self {
        self.writer.write_start_code(start_code_byte(USERDATA_START_CODE));
        self.writer.write_bytes(text.as_bytes());
        self
    }

    /// VOP 头公共部分, 返回前写到 vop_coded
    fn vop_start(&mut self, coding_type: u32, time: u32, coded: bool) {
        let bits = log2bin(TIME_INC_RESOLUTION - 1).max(1);
        let bw = &mut self.writer;
        bw.write_start_code(start_code_byte(VOP_START_CODE));
        bw.write_bits(coding_type, 2);
        for _ in 0..time / TIME_INC_RESOLUTION {
            bw.write_bits(1, 1);
        }
        bw.write_bits(0, 1);
        bw.write_marker();
        bw.write_bits(time % TIME_INC_RESOLUTION, bits);
        bw.write_marker();
        bw.write_bits(u32::from(coded), 1);
    }

    /// I/P-VOP 的 vop_reduced_resolution
    fn rrv_flag(&mut self) {
        if self.reduced_resolution {
            self.writer.write_bits(1, 1);
        }
    }

    // ========================================================================
    // 图像
    // ========================================================================

    /// 整帧亮度为 `luma`, 色度为 128 的 I-VOP
    pub fn intra_vop(&mut self, time: u32, luma: u8) -> &mut Self {
        self.intra_vop_in_packets(time, luma, &[])
    }

    /// 同 [`intra_vop`](Self::intra_vop), 在 `packet_starts` 列出的宏块前插入视频包头
    ///
    /// 需要以 [`resync_markers(true)`](Self::resync_markers) 构造.
    pub fn intra_vop_in_packets(&mut self, time: u32, luma: u8, packet_starts: &[usize]) -> &mut Self {
        let flat = vec![128; self.mb_count()];
        self.write_intra_vop(time, luma, &flat, packet_starts)
    }

    /// 亮度平坦, 第 `i` 个宏块的 U 分量为 `chroma_u[i]` 的 I-VOP (V 为 128)
    pub fn intra_vop_with_chroma(&mut self, time: u32, luma: u8, chroma_u: &[u8]) -> &mut Self {
        self.write_intra_vop(time, luma, chroma_u, &[])
    }

    fn write_intra_vop(&mut self, time: u32, luma: u8, chroma_u: &[u8], packet_starts: &[usize]) -> &mut Self {
        self.vop_start(0, time, true);
        self.rrv_flag();
        let bw = &mut self.writer;
        bw.write_bits(0, 3); // intra_dc_vlc_thr: 始终用 DC VLC
        bw.write_bits(QUANT, 5);

        let mb_width = self.mb_width();
        let mb_count = self.mb_count();
        let mbnum_bits = log2bin(mb_count.saturating_sub(1) as u32);
        let mut bound = 0;
        for index in 0..mb_count {
            if index > 0 && packet_starts.contains(&index) {
                let bw = &mut self.writer;
                bw.write_stuffing();
                bw.write_bits(0, NUMBITS_VP_RESYNC_MARKER - 1);
                bw.write_bits(1, 1);
                bw.write_bits(index as u32, mbnum_bits);
                bw.write_bits(QUANT, 5);
                bw.write_bits(0, 1); // header_extension_code
                bound = index;
            }
            // 左邻与上邻都不可用时预测值为 128, 需要显式差分
            let x = index % mb_width;
            let left = x > 0 && index > bound;
            let top = index >= bound + mb_width;
            let diag = x > 0 && index > bound + mb_width;
            let diff = if left || top { 0 } else { i32::from(luma) - 128 };

            let u_at = |available: bool, i: usize| {
                if available {
                    chroma_u.get(i).map_or(128, |&u| i32::from(u))
                } else {
                    128
                }
            };
            let a = u_at(left, index.wrapping_sub(1));
            let b = u_at(diag, index.wrapping_sub(mb_width + 1));
            let c = u_at(top, index.wrapping_sub(mb_width));
            let pred = if (a - b).abs() < (b - c).abs() { c } else { a };
            self.intra_mb(diff, u_at(true, index) - pred);
        }
        self.writer.write_stuffing();
        self
    }

    fn intra_mb(&mut self, luma_diff: i32, u_diff: i32) {
        let bw = &mut self.writer;
        bw.write_bits(1, 1); // mcbpc: Intra, cbpc = 0
        bw.write_bits(0, 1); // ac_pred_flag
        bw.write_bits(0b0011, 4); // cbpy = 0
        write_dc_luma(bw, luma_diff);
        for _ in 1..4 {
            write_dc_luma(bw, 0);
        }
        write_dc_chroma(bw, u_diff);
        write_dc_chroma(bw, 0);
    }

    /// 所有宏块都跳过的 P-VOP
    pub fn skipped_p_vop(&mut self, time: u32) -> &mut Self {
        self.vop_start(1, time, true);
        let mb_count = self.mb_count();
        self.writer.write_bits(0, 1); // rounding_type
        self.rrv_flag();
        let bw = &mut self.writer;
        bw.write_bits(0, 3);
        bw.write_bits(QUANT, 5);
        bw.write_bits(1, 3); // fcode_forward
        for _ in 0..mb_count {
            bw.write_bits(1, 1); // not_coded
        }
        bw.write_stuffing();
        self
    }

    /// 只有第 `index` 个宏块编码的 P-VOP: 单向量 `mv` (半像素), 无残差
    ///
    /// 其余宏块跳过, 向量预测值为零, 所以 `mv` 就是差分; 分量限 -3..=3.
    pub fn single_vector_p_vop(&mut self, time: u32, index: usize, mv: (i32, i32)) -> &mut Self {
        self.vop_start(1, time, true);
        let mb_count = self.mb_count();
        self.writer.write_bits(0, 1); // rounding_type
        self.rrv_flag();
        let bw = &mut self.writer;
        bw.write_bits(0, 3);
        bw.write_bits(QUANT, 5);
        bw.write_bits(1, 3); // fcode_forward
        for i in 0..mb_count {
            if i != index {
                bw.write_bits(1, 1);
                continue;
            }
            bw.write_bits(0, 1); // not_coded
            bw.write_bits(1, 1); // mcbpc: Inter, cbpc = 0
            bw.write_bits(0b11, 2); // cbpy = 0 (帧间取反)
            write_mv_component(bw, mv.0);
            write_mv_component(bw, mv.1);
        }
        bw.write_stuffing();
        self
    }

    /// 所有宏块取无残差直接模式的 B-VOP
    ///
    /// 共位宏块为跳过宏块时解码器不读任何位, 这种情况下应改用空 VOP.
    pub fn direct_b_vop(&mut self, time: u32) -> &mut Self {
        self.vop_start(2, time, true);
        let mb_count = self.mb_count();
        let bw = &mut self.writer;
        bw.write_bits(0, 3);
        bw.write_bits(QUANT, 5);
        bw.write_bits(1, 3); // fcode_forward
        bw.write_bits(1, 3); // fcode_backward
        for _ in 0..mb_count {
            bw.write_bits(1, 1); // modb
        }
        bw.write_stuffing();
        self
    }

    /// vop_coded = 0 的 P-VOP
    pub fn not_coded_vop(&mut self, time: u32) -> &mut Self {
        self.vop_start(1, time, false);
        self.writer.write_stuffing();
        self
    }
}

fn start_code_byte(code: u32) -> u8 {
    (code & 0xFF) as u8
}

fn dc_size(diff: i32) -> u32 {
    32 - diff.unsigned_abs().leading_zeros()
}

/// 负差分按反码写出
fn write_dc_diff(bw: &mut BitWriter, diff: i32, size: u32) {
    if size == 0 {
        return;
    }
    let code = if diff > 0 { diff } else { diff + (1 << size) - 1 };
    bw.write_bits(code as u32, size);
    if size > 8 {
        bw.write_marker();
    }
}

/// fcode = 1 的运动向量差分: `|v|` 个 0, 一个 1, 再接符号位
fn write_mv_component(bw: &mut BitWriter, v: i32) {
    debug_assert!((-3..=3).contains(&v), "运动向量差分 {} 超出合成范围", v);
    if v == 0 {
        bw.write_bits(1, 1);
        return;
    }
    bw.write_bits(1, v.unsigned_abs() + 1);
    bw.write_bits(u32::from(v < 0), 1);
}

fn write_dc_luma(bw: &mut BitWriter, diff: i32) {
    let size = dc_size(diff);
    match size {
        0 => bw.write_bits(0b011, 3),
        1 => bw.write_bits(0b11, 2),
        2 => bw.write_bits(0b10, 2),
        3 => bw.write_bits(0b010, 3),
        4 => bw.write_bits(0b001, 3),
        _ => bw.write_bits(1, size - 1),
    }
    write_dc_diff(bw, diff, size);
}

fn write_dc_chroma(bw: &mut BitWriter, diff: i32) {
    let size = dc_size(diff);
    match size {
        0 => bw.write_bits(0b11, 2),
        1 => bw.write_bits(0b10, 2),
        2 => bw.write_bits(0b01, 2),
        _ => bw.write_bits(1, size),
    }
    write_dc_diff(bw, diff, size);
}
