//! 参数流 (bundle) 管理.
//!
//! 每个平面有九条参数流: 块类型、子块类型、颜色、图案、X/Y 位移、
//! 帧内/帧间 DC、游程长度. 每条流按块行批量解码进各自的缓冲区,
//! 块分派时再逐个消费.
//!
//! 流的状态由两个游标描述: `dec_pos` 为已解码位置, `read_pos` 为已
//! 消费位置. 行首仅当 `dec_pos <= read_pos` 时才读取新的一批;
//! `dec_pos` 为负表示该流在本平面内不再编码任何值.

use ying_core::bitreader::BitReader;
use ying_core::{YingError, YingResult};

use super::trees::Tree;

/// 块类型符号 12-15 对应的重复长度
const BLOCK_TYPE_RUNS: [usize; 4] = [4, 8, 12, 32];

/// 一条参数流
#[derive(Default)]
pub struct Bundle<T: Copy + Default> {
    /// 符号重排表与码表引用
    pub tree: Tree,
    /// 本平面的值缓冲区 (容量为最坏情况上界)
    pub data: Vec<T>,
    /// 已解码位置; 负值表示本平面内该流已耗尽
    dec_pos: isize,
    /// 已消费位置
    read_pos: isize,
    /// 行首长度字段的位宽
    pub bits: u32,
}

impl<T: Copy + Default> Bundle<T> {
    /// 重新分配缓冲区 (解码器尺寸配置时调用一次)
    pub fn alloc(&mut self, cap: usize) {
        self.data.clear();
        self.data.resize(cap, T::default());
    }

    /// 重置游标 (每平面开始时)
    pub fn reset(&mut self) {
        self.dec_pos = 0;
        self.read_pos = 0;
    }

    /// 读取码表声明并重置游标
    pub fn read_desc(&mut self, br: &mut BitReader) {
        self.reset();
        self.tree.read_desc(br);
    }

    /// 行首读取本行的编码值个数
    ///
    /// 已耗尽或上一行仍有缓冲值时返回 0. 个数字段为 0 时置耗尽标记.
    /// `dec_pos == read_pos` 视为可读, `dec_pos > read_pos` 视为已缓冲;
    /// 颠倒这一比较会使各参数流失步.
    pub fn read_len(&mut self, br: &mut BitReader) -> usize {
        if self.dec_pos < 0 || self.dec_pos > self.read_pos {
            return 0;
        }
        let len = br.read_bits(self.bits) as usize;
        if len == 0 {
            self.dec_pos = -1;
        }
        len
    }

    /// 消费一个值
    pub fn next(&mut self) -> YingResult<T> {
        if self.dec_pos < 0 || self.read_pos >= self.dec_pos {
            return Err(YingError::InvalidData("参数流消费越过已解码范围".into()));
        }
        let val = self.data[self.read_pos as usize];
        self.read_pos += 1;
        Ok(val)
    }

    /// 校验本行新增 `len` 个值不会越过缓冲区, 返回解码起点与终点
    fn append_range(&self, len: usize) -> YingResult<(usize, usize)> {
        let start = self.dec_pos as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(YingError::InvalidData("参数流长度超出平面上界".into()));
        }
        Ok((start, end))
    }
}

impl Bundle<u8> {
    /// 游程流: 整行重复值或逐个前缀码符号
    pub fn read_runs(&mut self, br: &mut BitReader) -> YingResult<()> {
        let len = self.read_len(br);
        if len == 0 {
            return Ok(());
        }
        let (start, end) = self.append_range(len)?;
        if br.read_bool() {
            let val = br.read_bits(4) as u8;
            self.data[start..end].fill(val);
        } else {
            for i in start..end {
                self.data[i] = self.tree.read_sym(br);
            }
        }
        self.dec_pos = end as isize;
        Ok(())
    }

    /// 块类型流: 符号 12-15 展开为前值的重复
    pub fn read_block_types(&mut self, br: &mut BitReader) -> YingResult<()> {
        let len = self.read_len(br);
        if len == 0 {
            return Ok(());
        }
        let (start, end) = self.append_range(len)?;
        if br.read_bool() {
            let val = br.read_bits(4) as u8;
            self.data[start..end].fill(val);
            self.dec_pos = end as isize;
            return Ok(());
        }
        let mut pos = start;
        let mut last = 0u8;
        while pos < end {
            let val = self.tree.read_sym(br);
            if val < 12 {
                self.data[pos] = val;
                pos += 1;
                last = val;
            } else {
                let run = BLOCK_TYPE_RUNS[(val - 12) as usize];
                if pos + run > end {
                    return Err(YingError::InvalidData("块类型游程越过行尾".into()));
                }
                self.data[pos..pos + run].fill(last);
                pos += run;
            }
        }
        self.dec_pos = end as isize;
        Ok(())
    }

    /// 图案流: 两个前缀码半字节拼成一个 8 位行掩码
    pub fn read_patterns(&mut self, br: &mut BitReader) -> YingResult<()> {
        let len = self.read_len(br);
        if len == 0 {
            return Ok(());
        }
        let (start, end) = self.append_range(len)?;
        for i in start..end {
            let lo = self.tree.read_sym(br);
            let hi = self.tree.read_sym(br);
            self.data[i] = lo | (hi << 4);
        }
        self.dec_pos = end as isize;
        Ok(())
    }

    /// 颜色流: 高半字节由前值索引的辅助码表解码, 低半字节由本流码表解码
    ///
    /// 修订版早于 'e' 的文件对拼出的字节做对称重映射.
    pub fn read_colors(
        &mut self,
        br: &mut BitReader,
        col_hi: &[Tree; 16],
        col_last: &mut u8,
        remap: bool,
    ) -> YingResult<()> {
        let len = self.read_len(br);
        if len == 0 {
            return Ok(());
        }
        let (start, end) = self.append_range(len)?;
        let mut last = *col_last;
        if br.read_bool() {
            last = col_hi[last as usize].read_sym(br);
            let lo = self.tree.read_sym(br);
            let val = cvt_color(lo, last, remap);
            self.data[start..end].fill(val);
        } else {
            for i in start..end {
                last = col_hi[last as usize].read_sym(br);
                let lo = self.tree.read_sym(br);
                self.data[i] = cvt_color(lo, last, remap);
            }
        }
        *col_last = last;
        self.dec_pos = end as isize;
        Ok(())
    }
}

/// 拼合颜色字节, 按需做旧版对称重映射: v > 127 取 256 - v, 否则 v + 128
fn cvt_color(lo: u8, hi: u8, remap: bool) -> u8 {
    let v = lo | (hi << 4);
    if remap {
        if v > 127 {
            (256 - u32::from(v)) as u8
        } else {
            v.wrapping_add(128)
        }
    } else {
        v
    }
}

impl Bundle<i8> {
    /// 位移流: 4 位幅值 + 非零时的符号位, 存为有符号 8 位
    pub fn read_motion_values(&mut self, br: &mut BitReader) -> YingResult<()> {
        let len = self.read_len(br);
        if len == 0 {
            return Ok(());
        }
        let (start, end) = self.append_range(len)?;
        if br.read_bool() {
            let mut val = br.read_bits(4) as i32;
            if val != 0 {
                val = br.apply_sign(val);
            }
            self.data[start..end].fill(val as i8);
        } else {
            for i in start..end {
                let mut val = i32::from(self.tree.read_sym(br));
                if val != 0 {
                    val = br.apply_sign(val);
                }
                self.data[i] = val as i8;
            }
        }
        self.dec_pos = end as isize;
        Ok(())
    }
}

impl Bundle<i16> {
    /// DC 流: 首值为 10/11 位绝对值, 其后按最多 8 个一组的增量编码
    ///
    /// `has_sign` 时首值读 10 位并带符号位, 否则读 11 位无符号.
    pub fn read_dcs(&mut self, br: &mut BitReader, has_sign: bool) -> YingResult<()> {
        let len = self.read_len(br);
        if len == 0 {
            return Ok(());
        }
        let (start, end) = self.append_range(len)?;
        let mut val = if has_sign {
            let v = br.read_bits(10) as i32;
            if v != 0 { br.apply_sign(v) } else { v }
        } else {
            br.read_bits(11) as i32
        };
        self.data[start] = val as i16;
        let mut pos = start + 1;
        while pos < end {
            let seg_len = (end - pos).min(8);
            let bsize = br.read_bits(4);
            if bsize != 0 {
                for _ in 0..seg_len {
                    let mut diff = br.read_bits(bsize) as i32;
                    if diff != 0 {
                        diff = br.apply_sign(diff);
                    }
                    val += diff;
                    if !(i32::from(i16::MIN)..=i32::from(i16::MAX)).contains(&val) {
                        return Err(YingError::InvalidData("DC 增量累加越界".into()));
                    }
                    self.data[pos] = val as i16;
                    pos += 1;
                }
            } else {
                self.data[pos..pos + seg_len].fill(val as i16);
                pos += seg_len;
            }
        }
        self.dec_pos = end as isize;
        Ok(())
    }
}

/// 参数流长度字段的位宽: `⌊log2(上界 + 511)⌋ + 1`
pub fn calc_len_bits(estimate: usize) -> u32 {
    32 - ((estimate as u32) + 511).leading_zeros()
}
