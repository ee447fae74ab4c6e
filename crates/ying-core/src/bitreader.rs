//! 比特流读取器.
//!
//! 提供从字节缓冲区中按位读取数据的能力, 是 Bink 码流解析的基础设施.
//!
//! 按小端位序读取 (LSB first): 字节 k 的第 i 位先于第 i+1 位,
//! 字节 k 的第 7 位先于字节 k+1 的第 0 位. 这与 Bink 容器的比特布局一致.
//!
//! 越界读取返回 0 而不是错误: 码流末尾之后的位全部按 0 处理,
//! 调用方通过 [`BitReader::bits_left`] 自行核算比特预算.

/// 小端位序比特流读取器
///
/// # 示例
/// ```
/// use ying_core::bitreader::BitReader;
///
/// // 0xA5 = 0b1010_0101, 低 4 位在前
/// let data = [0xA5, 0x3C];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4), 0x5);
/// assert_eq!(br.read_bits(4), 0xA);
/// assert_eq!(br.read_bits(4), 0xC);
/// assert_eq!(br.read_bits(4), 0x3);
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前比特位置 (允许越过末尾)
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器, 位置为 0
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 获取当前比特位置
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 获取剩余可读位数 (位置越界时为 0)
    pub fn bits_left(&self) -> usize {
        let total = self.data.len() * 8;
        total.saturating_sub(self.pos)
    }

    /// 读取 N 个位 (0 <= N <= 32), 低位在前
    ///
    /// 返回值的低 N 位有效. 越过数据末尾的位按 0 读出.
    pub fn read_bits(&mut self, n: u32) -> u32 {
        debug_assert!(n <= 32);
        if n == 0 {
            return 0;
        }
        let mut result: u64 = 0;
        let mut got: u32 = 0;
        let mut byte = self.pos >> 3;
        let mut bit = (self.pos & 7) as u32;
        while got < n {
            let cur = self.data.get(byte).copied().unwrap_or(0) as u64;
            let take = (n - got).min(8 - bit);
            result |= ((cur >> bit) & ((1u64 << take) - 1)) << got;
            got += take;
            bit += take;
            if bit == 8 {
                bit = 0;
                byte += 1;
            }
        }
        self.pos += n as usize;
        result as u32
    }

    /// 窥视 N 个位 (不移动位置)
    pub fn peek_bits(&mut self, n: u32) -> u32 {
        let saved = self.pos;
        let v = self.read_bits(n);
        self.pos = saved;
        v
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> u32 {
        self.read_bits(1)
    }

    /// 读取 1 个位并转为 bool
    pub fn read_bool(&mut self) -> bool {
        self.read_bits(1) != 0
    }

    /// 跳过 N 个位
    pub fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    /// 对齐到下一个 32 位边界
    ///
    /// 已对齐时不做任何事.
    pub fn align32(&mut self) {
        self.pos = (self.pos + 31) & !31;
    }

    /// 读取 1 个符号位, 置位时返回 `-v`, 否则返回 `v`
    pub fn apply_sign(&mut self, v: i32) -> i32 {
        if self.read_bool() { -v } else { v }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_lsb_first() {
        let data = [0xA5, 0x3C];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(4), 5);
        assert_eq!(br.read_bits(4), 10);
        assert_eq!(br.read_bits(4), 12);
        assert_eq!(br.read_bits(4), 3);
        assert_eq!(br.bits_left(), 0);
    }

    #[test]
    fn test_read_bits_cross_byte() {
        // 字节 0 的高位先于字节 1 的低位
        let data = [0b1000_0000, 0b0000_0001];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(7), 0);
        assert_eq!(br.read_bits(2), 0b11);
        assert_eq!(br.read_bits(7), 0);
    }

    #[test]
    fn test_read_bits_32() {
        let data = [0x78, 0x56, 0x34, 0x12];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(32), 0x1234_5678);
    }

    #[test]
    fn test_peek_is_idempotent_and_matches_read() {
        let data = [0xC3, 0x5A];
        let mut br = BitReader::new(&data);
        let p1 = br.peek_bits(11);
        let p2 = br.peek_bits(11);
        assert_eq!(p1, p2);
        assert_eq!(br.read_bits(11), p1);
    }

    #[test]
    fn test_align32() {
        let data = [0u8; 8];
        let mut br = BitReader::new(&data);
        br.skip(16);
        br.align32();
        assert_eq!(br.position(), 32);
        // 已对齐时保持不动
        br.align32();
        assert_eq!(br.position(), 32);
    }

    #[test]
    fn test_past_end_reads_zero() {
        let data = [0xFF];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(8), 0xFF);
        assert_eq!(br.read_bits(16), 0);
        assert_eq!(br.bits_left(), 0);
    }

    #[test]
    fn test_apply_sign() {
        // 位序: 1 (取负), 0 (保持)
        let data = [0b0000_0001];
        let mut br = BitReader::new(&data);
        assert_eq!(br.apply_sign(7), -7);
        assert_eq!(br.apply_sign(7), 7);
    }

    #[test]
    fn test_skip_and_position() {
        let data = [0x0F, 0xF0];
        let mut br = BitReader::new(&data);
        br.skip(4);
        assert_eq!(br.position(), 4);
        assert_eq!(br.read_bits(8), 0x00);
        assert_eq!(br.read_bits(4), 0xF);
    }
}
