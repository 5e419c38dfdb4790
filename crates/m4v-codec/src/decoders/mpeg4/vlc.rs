//! VLC (变长编码) 解码函数
//!
//! 系数 VLC 使用 12 位直接查找表, 由 102 项基表展开而来, 首次使用时构建一次.
//! 其余短码 (mcbpc, cbpy, MVD, dc_size) 直接按窥视到的位查 `tables` 中的表.

use std::sync::OnceLock;

use log::warn;
use m4v_core::bitreader::BitReader;
use m4v_core::{M4vError, M4vResult};

use super::tables::*;

// ============================================================================
// 系数查找表
// ============================================================================

/// 12 位查找表项, `level == 0` 表示该前缀不是合法码字
#[derive(Debug, Clone, Copy, Default)]
struct DctEntry {
    len: u8,
    last: u8,
    run: u8,
    level: u8,
}

const DCT_LOOKUP_BITS: u32 = 12;
const DCT_LOOKUP_SIZE: usize = 1 << DCT_LOOKUP_BITS;

/// 帧间 / 帧内两张查找表
struct DctLookup {
    tables: [Box<[DctEntry]>; 2],
}

static DCT_LOOKUP: OnceLock<DctLookup> = OnceLock::new();

fn build_dct_table(base: &[CoeffVlc; 102]) -> Box<[DctEntry]> {
    let mut table = vec![DctEntry::default(); DCT_LOOKUP_SIZE].into_boxed_slice();
    for entry in base {
        let shift = DCT_LOOKUP_BITS - entry.len;
        let first = (entry.code << shift) as usize;
        for slot in &mut table[first..first + (1usize << shift)] {
            *slot = DctEntry {
                len: entry.len as u8,
                last: entry.last,
                run: entry.run,
                level: entry.level,
            };
        }
    }
    table
}

fn dct_lookup() -> &'static DctLookup {
    DCT_LOOKUP.get_or_init(|| DctLookup {
        tables: [
            build_dct_table(&INTER_COEFF_TABLE),
            build_dct_table(&INTRA_COEFF_TABLE),
        ],
    })
}

/// 一个 (last, run, level) 系数事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoeffEvent {
    /// 是否为块内最后一个非零系数
    pub last: bool,
    /// 前导零个数
    pub run: u32,
    /// 带符号的量化值
    pub level: i32,
}

fn max_level(intra: bool, last: bool, run: u32) -> u32 {
    MAX_LEVEL[intra as usize][last as usize]
        .get(run as usize)
        .map_or(0, |&v| u32::from(v))
}

fn max_run(intra: bool, last: bool, level: u32) -> u32 {
    MAX_RUN[intra as usize][last as usize]
        .get(level as usize)
        .map_or(0, |&v| u32::from(v))
}

/// 查 12 位表并消耗码字 (不含符号位)
fn lookup_base(reader: &mut BitReader, intra: bool) -> M4vResult<(bool, u32, u32)> {
    let entry = dct_lookup().tables[intra as usize][reader.show_bits(DCT_LOOKUP_BITS) as usize];
    if entry.level == 0 {
        return Err(M4vError::InvalidCoefficient(format!(
            "无法匹配的系数码字 0x{:03x}",
            reader.show_bits(DCT_LOOKUP_BITS)
        )));
    }
    reader.consume(u32::from(entry.len))?;
    Ok((entry.last != 0, u32::from(entry.run), u32::from(entry.level)))
}

/// 解码一个系数事件 (含三种 escape 形式)
pub(super) fn decode_coefficient(reader: &mut BitReader, intra: bool) -> M4vResult<CoeffEvent> {
    if reader.show_bits(ESCAPE_LEN) != ESCAPE_CODE {
        let (last, run, level) = lookup_base(reader, intra)?;
        let negative = reader.read_bit()?;
        return Ok(CoeffEvent {
            last,
            run,
            level: if negative {
                -(level as i32)
            } else {
                level as i32
            },
        });
    }

    reader.consume(ESCAPE_LEN)?;
    let mode = reader.show_bits(2);
    if mode < 3 {
        // `0`: level 偏移; `10`: run 偏移
        reader.consume(if mode == 2 { 2 } else { 1 })?;
        let (last, mut run, mut level) = lookup_base(reader, intra)?;
        if mode < 2 {
            level += max_level(intra, last, run);
        } else {
            run += max_run(intra, last, level) + 1;
        }
        let negative = reader.read_bit()?;
        return Ok(CoeffEvent {
            last,
            run,
            level: if negative {
                -(level as i32)
            } else {
                level as i32
            },
        });
    }

    // 定长形式: last(1) run(6) marker level(12) marker
    reader.consume(2)?;
    let last = reader.read_bit()?;
    let run = reader.read_bits(6)?;
    reader.consume(1)?;
    let level = reader.read_bits_signed(12)?;
    reader.consume(1)?;
    if level == 0 {
        warn!("escape 定长系数的 level 为 0");
    }
    Ok(CoeffEvent { last, run, level })
}

// ============================================================================
// 系数编码 (由同一组表反推)
// ============================================================================

/// 系数码字: 高位先出的 `len` 位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoeffCode {
    /// 码字
    pub code: u64,
    /// 位数
    pub len: u32,
}

/// 在基表中查找 (last, run, level), level 为绝对值
fn find_base(intra: bool, last: bool, run: u32, level: u32) -> Option<&'static CoeffVlc> {
    let table = if intra {
        &INTRA_COEFF_TABLE
    } else {
        &INTER_COEFF_TABLE
    };
    table.iter().find(|e| {
        (e.last != 0) == last && u32::from(e.run) == run && u32::from(e.level) == level
    })
}

/// 按解码器使用的 escape 规则为一个系数事件生成码字
///
/// 选择顺序与参考编码器一致: 基表, level 偏移, run 偏移, 最后是定长形式.
/// `level` 为 0, 超出 12 位有符号范围或 `run > 63` 时返回 `None`.
pub fn encode_coefficient(intra: bool, last: bool, run: u32, level: i32) -> Option<CoeffCode> {
    if level == 0 || run > 63 || !(-2048..=2047).contains(&level) {
        return None;
    }
    let sign = u64::from(level < 0);
    let abs = level.unsigned_abs();

    if let Some(base) = find_base(intra, last, run, abs) {
        return Some(CoeffCode {
            code: (u64::from(base.code) << 1) | sign,
            len: base.len + 1,
        });
    }

    let escape = u64::from(ESCAPE_CODE);
    let ml = max_level(intra, last, run);
    if abs > ml {
        let level_esc = abs - ml;
        if let Some(base) = find_base(intra, last, run, level_esc) {
            let code = (escape << 1) << (base.len + 1) | (u64::from(base.code) << 1) | sign;
            return Some(CoeffCode {
                code,
                len: ESCAPE_LEN + 1 + base.len + 1,
            });
        }
    }

    let mr = max_run(intra, last, abs);
    if run > mr {
        let run_esc = run - 1 - mr;
        if let Some(base) = find_base(intra, last, run_esc, abs) {
            let code = ((escape << 2) | 0b10) << (base.len + 1) | (u64::from(base.code) << 1) | sign;
            return Some(CoeffCode {
                code,
                len: ESCAPE_LEN + 2 + base.len + 1,
            });
        }
    }

    let level_bits = (level as u32 & 0xFFF) as u64;
    let code = (((escape << 2) | 0b11) << 21)
        | (u64::from(last) << 20)
        | (u64::from(run) << 14)
        | (1 << 13)
        | (level_bits << 1)
        | 1;
    Some(CoeffCode { code, len: 30 })
}

// ============================================================================
// 宏块头 VLC
// ============================================================================

/// mcbpc 解码结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Mcbpc {
    /// 宏块模式 (0..=4)
    pub mode: u32,
    /// 色度块编码模式 (2 位)
    pub cbpc: u32,
}

fn split_mcbpc(entry: Vlc) -> M4vResult<Mcbpc> {
    let mode = (entry.code & 7) as u32;
    if entry.code < 0 || mode > 4 {
        return Err(M4vError::InvalidCoefficient(format!(
            "非法 mcbpc 码字 (code={})",
            entry.code
        )));
    }
    Ok(Mcbpc {
        mode,
        cbpc: (entry.code >> 4) as u32,
    })
}

/// I-VOP mcbpc
pub(super) fn decode_mcbpc_intra(reader: &mut BitReader) -> M4vResult<Mcbpc> {
    let entry = MCBPC_INTRA_TABLE[(reader.show_bits(9) >> 3) as usize];
    let mcbpc = split_mcbpc(entry)?;
    reader.consume(entry.len)?;
    Ok(mcbpc)
}

/// P/S-VOP mcbpc
pub(super) fn decode_mcbpc_inter(reader: &mut BitReader) -> M4vResult<Mcbpc> {
    let entry = MCBPC_INTER_TABLE[reader.show_bits(9).min(256) as usize];
    let mcbpc = split_mcbpc(entry)?;
    reader.consume(entry.len)?;
    Ok(mcbpc)
}

/// cbpy, 非帧内宏块取反
pub(super) fn decode_cbpy(reader: &mut BitReader, intra: bool) -> M4vResult<u32> {
    let entry = CBPY_TABLE[reader.show_bits(6) as usize];
    if entry.code < 0 {
        return Err(M4vError::InvalidCoefficient("非法 cbpy 码字".into()));
    }
    reader.consume(entry.len)?;
    let cbpy = entry.code as u32;
    Ok(if intra { cbpy } else { 15 - cbpy })
}

// ============================================================================
// 运动矢量
// ============================================================================

/// 运动矢量差分的 VLC 部分
fn decode_mv_data(reader: &mut BitReader) -> M4vResult<i32> {
    if reader.read_bit()? {
        return Ok(0);
    }
    let index = reader.show_bits(12) as usize;
    let entry = if index >= 512 {
        MV_TAB0[(index >> 8) - 2]
    } else if index >= 128 {
        MV_TAB1[(index >> 2) - 32]
    } else if index >= 4 {
        MV_TAB2[index - 4]
    } else {
        return Err(M4vError::InvalidMotionVector(format!(
            "非法运动矢量码字 0x{:03x}",
            index
        )));
    };
    reader.consume(entry.len)?;
    Ok(entry.code)
}

/// 解码一个运动矢量分量的差分 (含 `fcode - 1` 位残差)
pub(super) fn decode_mv_component(reader: &mut BitReader, fcode: u32) -> M4vResult<i32> {
    let data = decode_mv_data(reader)?;
    if fcode <= 1 || data == 0 {
        return Ok(data);
    }
    let scale = 1i32 << (fcode - 1);
    let residual = reader.read_bits(fcode - 1)? as i32;
    let mv = (data.abs() - 1) * scale + residual + 1;
    Ok(if data < 0 { -mv } else { mv })
}

// ============================================================================
// 帧内 DC
// ============================================================================

/// 亮度 dc_size
pub(super) fn decode_dc_size_lum(reader: &mut BitReader) -> M4vResult<u32> {
    let mut code = reader.show_bits(11);
    for i in (4..=11).rev() {
        if code == 1 {
            reader.consume(i)?;
            return Ok(i + 1);
        }
        code >>= 1;
    }
    let entry = DC_LUM_TABLE[code as usize];
    if entry.len == 0 {
        return Err(M4vError::InvalidCoefficient("非法亮度 dc_size 码字".into()));
    }
    reader.consume(entry.len)?;
    Ok(entry.code as u32)
}

/// 色度 dc_size
pub(super) fn decode_dc_size_chrom(reader: &mut BitReader) -> M4vResult<u32> {
    let mut code = reader.show_bits(12);
    for i in (3..=12).rev() {
        if code == 1 {
            reader.consume(i)?;
            return Ok(i);
        }
        code >>= 1;
    }
    Ok(3 - reader.read_bits(2)?)
}

/// dc 差分值, 最高位为 0 时取反码的负数
pub(super) fn decode_dc_dif(reader: &mut BitReader, size: u32) -> M4vResult<i32> {
    if size == 0 {
        return Ok(0);
    }
    let code = reader.read_bits(size)? as i32;
    if code >> (size - 1) == 0 {
        return Ok(-(code ^ ((1 << size) - 1)));
    }
    Ok(code)
}

// ============================================================================
// B-VOP
// ============================================================================

/// B 宏块类型: 4 位内首个 1 的位置 (0=direct, 1=interpolate, 2=backward, 3=forward)
pub(super) fn decode_b_mbtype(reader: &mut BitReader) -> M4vResult<u32> {
    for mbtype in 0..4 {
        if reader.read_bit()? {
            return Ok(mbtype);
        }
    }
    Err(M4vError::InvalidCoefficient("非法 B 宏块类型".into()))
}

/// B 宏块 dquant: `0` → 0, `10` → -2, `11` → +2
pub(super) fn decode_dbquant(reader: &mut BitReader) -> M4vResult<i32> {
    if !reader.read_bit()? {
        return Ok(0);
    }
    Ok(if reader.read_bit()? { 2 } else { -2 })
}

// ============================================================================
// sprite 轨迹
// ============================================================================

/// sprite 轨迹差分的位数
pub(super) fn decode_sprite_trajectory_len(reader: &mut BitReader) -> M4vResult<u32> {
    for (i, entry) in SPRITE_TRAJECTORY_LEN.iter().enumerate() {
        if reader.show_bits(entry.len) as i32 == entry.code {
            reader.consume(entry.len)?;
            return Ok(i as u32);
        }
    }
    Err(M4vError::InvalidHeaderField("非法 sprite 轨迹长度码".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use m4v_core::bitwriter::BitWriter;

    fn pack_bits(bits: &[(u32, u32)]) -> Vec<u8> {
        let mut bw = BitWriter::new();
        for &(value, n) in bits {
            bw.write_bits(value, n);
        }
        bw.finish()
    }

    #[test]
    fn test_基表系数解码() {
        // 帧间 (0,0,1): 码字 10 + 符号 1 → -1
        let data = pack_bits(&[(0b101, 3)]);
        let mut br = BitReader::new(&data);
        let ev = decode_coefficient(&mut br, false).unwrap();
        assert_eq!(
            ev,
            CoeffEvent {
                last: false,
                run: 0,
                level: -1
            }
        );
        assert_eq!(br.bit_position(), 3);
    }

    #[test]
    fn test_定长escape() {
        // escape + 11 + last=1 + run=5 + marker + level=-100 + marker
        let data = pack_bits(&[
            (ESCAPE_CODE, 7),
            (0b11, 2),
            (1, 1),
            (5, 6),
            (1, 1),
            ((-100i32 as u32) & 0xFFF, 12),
            (1, 1),
        ]);
        let mut br = BitReader::new(&data);
        let ev = decode_coefficient(&mut br, true).unwrap();
        assert_eq!(
            ev,
            CoeffEvent {
                last: true,
                run: 5,
                level: -100
            }
        );
    }

    #[test]
    fn test_系数编解码往返() {
        // 覆盖基表, 两种偏移 escape 与定长形式
        for intra in [false, true] {
            for last in [false, true] {
                for run in 0..64u32 {
                    for level in [1, -1, 2, 3, -5, 8, 13, -27, 28, 40, -300, 2047, -2048] {
                        let code = encode_coefficient(intra, last, run, level).unwrap();
                        let mut bw = BitWriter::new();
                        bw.write_bits_u64(code.code, code.len);
                        let data = bw.finish();
                        let mut br = BitReader::new(&data);
                        let ev = decode_coefficient(&mut br, intra).unwrap();
                        assert_eq!(
                            ev,
                            CoeffEvent { last, run, level },
                            "intra={} last={} run={} level={}",
                            intra,
                            last,
                            run,
                            level
                        );
                        assert_eq!(br.bit_position(), u64::from(code.len));
                    }
                }
            }
        }
    }

    #[test]
    fn test_escape_形式选择() {
        // 帧间 last=0 run=0: max_level=12, level 13 走 level 偏移 (13-12=1)
        let code = encode_coefficient(false, false, 0, 13).unwrap();
        assert_eq!(code.len, 7 + 1 + 2 + 1);
        // 帧间 last=0 level=1: max_run=26, run 27 走 run 偏移 (27-1-26=0)
        let code = encode_coefficient(false, false, 27, 1).unwrap();
        assert_eq!(code.len, 7 + 2 + 2 + 1);
        assert_eq!(encode_coefficient(false, false, 0, 0), None);
        assert_eq!(encode_coefficient(false, false, 64, 1), None);
    }

    #[test]
    fn test_非法系数码字() {
        // 全零前缀既不是码字也不是 escape
        let data = [0u8; 4];
        let mut br = BitReader::new(&data);
        assert!(matches!(
            decode_coefficient(&mut br, false),
            Err(M4vError::InvalidCoefficient(_))
        ));
        assert_eq!(br.bit_position(), 0);
    }

    #[test]
    fn test_mcbpc_与_cbpy() {
        // I: "1" → mode 3 cbpc 0; P: "1" → mode 0 cbpc 0
        let data = pack_bits(&[(1, 1), (1, 1), (0b11, 2)]);
        let mut br = BitReader::new(&data);
        assert_eq!(
            decode_mcbpc_intra(&mut br).unwrap(),
            Mcbpc { mode: 3, cbpc: 0 }
        );
        assert_eq!(
            decode_mcbpc_inter(&mut br).unwrap(),
            Mcbpc { mode: 0, cbpc: 0 }
        );
        assert_eq!(decode_cbpy(&mut br.clone(), true).unwrap(), 15);
        assert_eq!(decode_cbpy(&mut br, false).unwrap(), 0);
    }

    #[test]
    fn test_运动矢量差分() {
        // "1" → 0; "010" → +1; "0011" → -2 (fcode 1)
        let data = pack_bits(&[(1, 1), (0b010, 3), (0b0011, 4)]);
        let mut br = BitReader::new(&data);
        assert_eq!(decode_mv_component(&mut br, 1).unwrap(), 0);
        assert_eq!(decode_mv_component(&mut br, 1).unwrap(), 1);
        assert_eq!(decode_mv_component(&mut br, 1).unwrap(), -2);

        // fcode 2: data=+1, residual 1 → (1-1)*2 + 1 + 1 = 2
        let data = pack_bits(&[(0b010, 3), (1, 1)]);
        let mut br = BitReader::new(&data);
        assert_eq!(decode_mv_component(&mut br, 2).unwrap(), 2);
    }

    #[test]
    fn test_dc_size_与差分() {
        // 亮度 "011" → 0, "11" → 1, "0001" → 5; 色度 "11" → 0, "001" → 3
        let data = pack_bits(&[(0b011, 3), (0b11, 2), (0b0001, 4), (0b11, 2), (0b001, 3)]);
        let mut br = BitReader::new(&data);
        assert_eq!(decode_dc_size_lum(&mut br).unwrap(), 0);
        assert_eq!(decode_dc_size_lum(&mut br).unwrap(), 1);
        assert_eq!(decode_dc_size_lum(&mut br).unwrap(), 5);
        assert_eq!(decode_dc_size_chrom(&mut br).unwrap(), 0);
        assert_eq!(decode_dc_size_chrom(&mut br).unwrap(), 3);

        // size 3: "101" → 5, "010" → -5
        let data = pack_bits(&[(0b101, 3), (0b010, 3)]);
        let mut br = BitReader::new(&data);
        assert_eq!(decode_dc_dif(&mut br, 3).unwrap(), 5);
        assert_eq!(decode_dc_dif(&mut br, 3).unwrap(), -5);
    }

    #[test]
    fn test_b_宏块类型与_dbquant() {
        let data = pack_bits(&[(1, 1), (0b001, 3), (0b0000, 4), (0, 1), (0b10, 2), (0b11, 2)]);
        let mut br = BitReader::new(&data);
        assert_eq!(decode_b_mbtype(&mut br).unwrap(), 0);
        assert_eq!(decode_b_mbtype(&mut br).unwrap(), 2);
        assert!(decode_b_mbtype(&mut br).is_err());
        assert_eq!(decode_dbquant(&mut br).unwrap(), 0);
        assert_eq!(decode_dbquant(&mut br).unwrap(), -2);
        assert_eq!(decode_dbquant(&mut br).unwrap(), 2);
    }

    #[test]
    fn test_sprite_轨迹长度() {
        let data = pack_bits(&[(0b00, 2), (0b1110, 4)]);
        let mut br = BitReader::new(&data);
        assert_eq!(decode_sprite_trajectory_len(&mut br).unwrap(), 0);
        assert_eq!(decode_sprite_trajectory_len(&mut br).unwrap(), 6);
    }
}
