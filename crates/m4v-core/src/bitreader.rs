//! 比特流读取器.
//!
//! MPEG-4 Part 2 视频码流按大端位序 (MSB first) 组织. 读取器维护两个 32 位
//! 缓冲字, 支持两类窥视操作:
//!
//! - `show_bits`: 越过末尾的位视为 0, 用于 VLC 查表和起始码扫描;
//! - `peek` / `read_bits` / `consume`: 严格检查剩余位数, 不足时返回
//!   [`M4vError::TruncatedStream`].

use crate::{M4vError, M4vResult};

/// 比特流读取器
///
/// # 示例
/// ```
/// use m4v_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(br.show_bits(4), 0b0001);
/// br.consume(4).unwrap();
/// assert_eq!(br.read_bits(8).unwrap(), 0b01010101);
/// assert_eq!(br.show_bits(8), 0);
/// ```
#[derive(Clone)]
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前缓冲字 (高位在前)
    bufa: u32,
    /// 下一个缓冲字
    bufb: u32,
    /// bufa 对应的字索引
    word: usize,
    /// bufa 中已消耗的位数 (0-31)
    pos: u32,
}

/// 读取第 `idx` 个 32 位大端字, 越界部分补 0
fn load_word(data: &[u8], idx: usize) -> u32 {
    let start = idx.saturating_mul(4);
    let mut bytes = [0u8; 4];
    if start < data.len() {
        let end = (start + 4).min(data.len());
        bytes[..end - start].copy_from_slice(&data[start..end]);
    }
    u32::from_be_bytes(bytes)
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bufa: load_word(data, 0),
            bufb: load_word(data, 1),
            word: 0,
            pos: 0,
        }
    }

    /// 源数据
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// 源数据总位数
    pub fn total_bits(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    /// 当前绝对位位置
    pub fn bit_position(&self) -> u64 {
        self.word as u64 * 32 + u64::from(self.pos)
    }

    /// 剩余可读位数
    pub fn bits_remaining(&self) -> u64 {
        self.total_bits().saturating_sub(self.bit_position())
    }

    /// 当前字节位置 (向下取整)
    pub fn byte_position(&self) -> usize {
        (self.bit_position() / 8) as usize
    }

    /// 是否已读到末尾
    pub fn is_eof(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// 窥视接下来的 `n` 位 (0-32), 越过末尾的位按 0 返回
    pub fn show_bits(&self, n: u32) -> u32 {
        debug_assert!(n <= 32, "show_bits: n={} 超过 32 位", n);
        if n == 0 {
            return 0;
        }
        let window = (u64::from(self.bufa) << 32) | u64::from(self.bufb);
        ((window << self.pos) >> (64 - n.min(32))) as u32
    }

    /// 窥视从当前位置向后偏移 `offset` 位处的 `n` 位 (0-32), 越界补 0
    pub fn show_bits_at(&self, offset: u64, n: u32) -> u32 {
        debug_assert!(n <= 32, "show_bits_at: n={} 超过 32 位", n);
        let start = self.bit_position() + offset;
        let mut value = 0u32;
        for i in 0..u64::from(n.min(32)) {
            let bit = start + i;
            let byte = (bit / 8) as usize;
            let b = self
                .data
                .get(byte)
                .map_or(0, |v| (v >> (7 - (bit % 8) as u32)) & 1);
            value = (value << 1) | u32::from(b);
        }
        value
    }

    /// 严格窥视: 剩余位数不足时报截断
    pub fn peek(&self, n: u32) -> M4vResult<u32> {
        if n > 32 {
            return Err(M4vError::InvalidArgument(format!(
                "peek: n={} 超过 32 位",
                n
            )));
        }
        self.ensure(u64::from(n))?;
        Ok(self.show_bits(n))
    }

    /// 严格跳过 `n` 位
    pub fn consume(&mut self, n: u32) -> M4vResult<()> {
        self.ensure(u64::from(n))?;
        self.advance(n);
        Ok(())
    }

    /// 读取 `n` 位 (0-32)
    pub fn read_bits(&mut self, n: u32) -> M4vResult<u32> {
        let value = self.peek(n)?;
        self.advance(n);
        Ok(value)
    }

    /// 读取 1 位
    pub fn read_bit(&mut self) -> M4vResult<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    /// 读取 `n` 位并按二进制补码解释
    pub fn read_bits_signed(&mut self, n: u32) -> M4vResult<i32> {
        let raw = self.read_bits(n)?;
        if n == 0 || n >= 32 {
            return Ok(raw as i32);
        }
        let shift = 32 - n;
        Ok(((raw << shift) as i32) >> shift)
    }

    /// 对齐到下一个字节边界, 已对齐时不动
    pub fn align_to_byte(&mut self) {
        let rem = self.pos % 8;
        if rem != 0 {
            self.advance(8 - rem);
        }
    }

    /// 当前位置是否字节对齐
    pub fn is_byte_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    /// 到下一个字节边界需要的位数 (1-8, 已对齐时为 8)
    ///
    /// 视频包的填充位总是存在, 所以已对齐时返回整字节.
    pub fn bits_to_byte_align(&self) -> u32 {
        let n = (8 - self.pos % 8) % 8;
        if n == 0 { 8 } else { n }
    }

    /// 跳过 `bits_to_byte_align()` 位后再窥视 `n` 位
    pub fn show_bits_from_byte_align(&self, n: u32) -> u32 {
        self.show_bits_at(u64::from(self.bits_to_byte_align()), n)
    }

    /// 定位到绝对位位置 (超出末尾时钳位到末尾)
    pub fn seek_bits(&mut self, bit: u64) {
        let bit = bit.min(self.total_bits());
        self.word = (bit / 32) as usize;
        self.pos = (bit % 32) as u32;
        self.bufa = load_word(self.data, self.word);
        self.bufb = load_word(self.data, self.word + 1);
    }

    /// 检查剩余位数
    fn ensure(&self, n: u64) -> M4vResult<()> {
        let remaining = self.bits_remaining();
        if n > remaining {
            return Err(M4vError::TruncatedStream {
                needed: n,
                remaining,
            });
        }
        Ok(())
    }

    /// 前进 `n` 位, 不做检查
    fn advance(&mut self, n: u32) {
        self.pos += n;
        while self.pos >= 32 {
            self.pos -= 32;
            self.word += 1;
            self.bufa = self.bufb;
            self.bufb = load_word(self.data, self.word + 1);
        }
    }
}
