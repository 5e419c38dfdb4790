//! 比特流写入器.
//!
//! 按大端位序 (MSB first) 写入, 与 [`crate::bitreader::BitReader`] 对应.
//! 解码器本身不写码流, 写入器用于构造测试码流和基准输入, 因此额外提供
//! MPEG-4 的起始码、标记位和填充位写法.

/// 比特流写入器
///
/// 未满一个字节的位暂存在 64 位累加器中, 凑满整字节后写入缓冲区.
///
/// # 示例
/// ```
/// use m4v_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_start_code(0xB6);
/// bw.write_bits(0b01, 2);
/// bw.write_stuffing();
/// assert_eq!(bw.finish(), vec![0x00, 0x00, 0x01, 0xB6, 0b0101_1111]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    /// 累加器, 有效位靠低端
    acc: u64,
    /// 累加器中的有效位数 (< 8, 写入过程中临时可达 40)
    pending: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.pending as usize
    }

    /// 写入 `value` 的低 `n` 位 (n <= 32)
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);
        if n == 0 {
            return;
        }
        let masked = u64::from(value) & ((1u64 << n) - 1);
        self.acc = (self.acc << n) | masked;
        self.pending += n;
        while self.pending >= 8 {
            self.pending -= 8;
            self.data.push((self.acc >> self.pending) as u8);
        }
        self.acc &= (1u64 << self.pending) - 1;
    }

    /// 写入最长 64 位的码字, 用于 VLC 码字与 escape 序列
    pub fn write_bits_u64(&mut self, value: u64, n: u32) {
        debug_assert!(n <= 64, "write_bits_u64: n={} 超过 64 位", n);
        if n > 32 {
            self.write_bits((value >> 32) as u32, n - 32);
            self.write_bits(value as u32, 32);
        } else {
            self.write_bits(value as u32, n);
        }
    }

    /// 写入标记位 (恒为 1)
    pub fn write_marker(&mut self) {
        self.write_bits(1, 1);
    }

    /// 写入 MPEG-4 填充位: 一个 0 后跟若干 1 直到字节边界
    ///
    /// 已对齐时写入整字节 `0111_1111`.
    pub fn write_stuffing(&mut self) {
        let n = 8 - self.pending;
        self.write_bits((1u32 << (n - 1)) - 1, n);
    }

    /// 用 0 对齐后写入 32 位起始码 `0x000001xx`
    pub fn write_start_code(&mut self, code: u8) {
        self.align_to_byte();
        self.write_bits(0x0000_0100 | u32::from(code), 32);
    }

    /// 用 0 补齐到字节边界
    pub fn align_to_byte(&mut self) {
        if self.pending > 0 {
            self.write_bits(0, 8 - self.pending);
        }
    }

    /// 写入完整字节
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.pending == 0 {
            self.data.extend_from_slice(bytes);
            return;
        }
        for &b in bytes {
            self.write_bits(u32::from(b), 8);
        }
    }

    /// 补齐字节边界后返回全部数据
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.data
    }
}
