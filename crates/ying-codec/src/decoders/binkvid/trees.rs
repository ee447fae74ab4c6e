//! 前缀码查表解码与符号表重排.
//!
//! Bink 使用 16 组固定的 16 符号前缀码 (见 `tables.rs`). 每个平面的
//! 每条参数流在码流中声明引用哪一组, 并附带一张 16 项的符号重排表,
//! 由 "顺序模式" 或 "归并模式" 之一编码.

use std::sync::OnceLock;

use ying_core::bitreader::BitReader;

use super::tables::{BINK_TREE_CODES, BINK_TREE_LENS};

/// 单组前缀码的查找表
///
/// 构建时把 `max_len` 位的所有取值展开为 (符号, 码长) 项;
/// 解码即窥视 `max_len` 位、查表、跳过实际码长.
pub struct HuffTable {
    /// 窥视位数 (本组最大码长)
    max_len: u32,
    /// (符号, 码长) 查找表, 长度为 `1 << max_len`
    lut: Vec<(u8, u8)>,
}

impl HuffTable {
    /// 从 16 个 (码字, 码长) 对构建查找表
    fn build(codes: &[u8; 16], lens: &[u8; 16]) -> Self {
        let max_len = u32::from(lens[15]);
        // 未被任何码字覆盖的取值退化为符号 0 + 最大码长, 保证解码始终前进
        let mut lut = vec![(0u8, max_len as u8); 1 << max_len];
        for (sym, (&code, &len)) in codes.iter().zip(lens.iter()).enumerate() {
            let len = u32::from(len);
            // 低 len 位固定为码字, 高位自由: 填充所有扩展
            let step = 1usize << len;
            let mut idx = code as usize;
            while idx < lut.len() {
                lut[idx] = (sym as u8, len as u8);
                idx += step;
            }
        }
        Self { max_len, lut }
    }

    /// 解码一个符号 (0-15)
    ///
    /// 返回的是码表符号下标, 尚未经过符号重排表映射.
    pub fn decode(&self, br: &mut BitReader) -> u8 {
        let peek = br.peek_bits(self.max_len) as usize;
        let (sym, len) = self.lut[peek];
        br.skip(len as usize);
        sym
    }
}

/// 16 组静态前缀码的查找表集合 (惰性构建, 进程级共享)
pub fn bink_trees() -> &'static [HuffTable; 16] {
    static TREES: OnceLock<[HuffTable; 16]> = OnceLock::new();
    TREES.get_or_init(|| {
        std::array::from_fn(|i| HuffTable::build(&BINK_TREE_CODES[i], &BINK_TREE_LENS[i]))
    })
}

/// 参数流绑定的码表引用与符号重排表
#[derive(Clone, Copy)]
pub struct Tree {
    /// 引用的静态码表下标 (0-15)
    pub id: usize,
    /// 解码符号到最终 4 位值的映射
    pub syms: [u8; 16],
}

impl Default for Tree {
    fn default() -> Self {
        Self {
            id: 0,
            syms: std::array::from_fn(|i| i as u8),
        }
    }
}

impl Tree {
    /// 从码流读取码表声明与符号重排表
    pub fn read_desc(&mut self, br: &mut BitReader) {
        self.id = br.read_bits(4) as usize;
        if self.id == 0 {
            for (i, s) in self.syms.iter_mut().enumerate() {
                *s = i as u8;
            }
            return;
        }
        if br.read_bool() {
            // 顺序模式: 显式列出前 len+1 个符号, 其余按升序补齐
            let len = br.read_bits(3) as usize;
            let mut present = [false; 16];
            for i in 0..=len {
                self.syms[i] = br.read_bits(4) as u8;
                present[self.syms[i] as usize] = true;
            }
            let mut idx = len + 1;
            for (sym, &used) in present.iter().enumerate() {
                if used {
                    continue;
                }
                self.syms[idx] = sym as u8;
                idx += 1;
            }
        } else {
            // 归并模式: 从恒等排列出发做 merge_depth+1 趟两两归并
            let merge_depth = br.read_bits(2) as usize;
            let mut syms: [u8; 16] = std::array::from_fn(|i| i as u8);
            let mut tmp = [0u8; 16];
            for depth in 0..=merge_depth {
                let size = 1usize << depth;
                for chunk in syms.chunks_mut(size * 2) {
                    let mut a = 0;
                    let mut b = size;
                    let mut out = 0;
                    while a < size && b < size * 2 {
                        if !br.read_bool() {
                            tmp[out] = chunk[a];
                            a += 1;
                        } else {
                            tmp[out] = chunk[b];
                            b += 1;
                        }
                        out += 1;
                    }
                    // 一侧耗尽后拷贝剩余
                    while a < size {
                        tmp[out] = chunk[a];
                        a += 1;
                        out += 1;
                    }
                    while b < size * 2 {
                        tmp[out] = chunk[b];
                        b += 1;
                        out += 1;
                    }
                    chunk.copy_from_slice(&tmp[0..size * 2]);
                }
            }
            self.syms = syms;
        }
    }

    /// 解码一个符号并映射为最终 4 位值
    pub fn read_sym(&self, br: &mut BitReader) -> u8 {
        let idx = bink_trees()[self.id].decode(br);
        self.syms[idx as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ying_core::bitwriter::BitWriter;

    /// 按指定码表编码一串符号下标
    fn encode_syms(table: usize, syms: &[u8]) -> Vec<u8> {
        let mut bw = BitWriter::new();
        for &s in syms {
            let code = BINK_TREE_CODES[table][s as usize];
            let len = BINK_TREE_LENS[table][s as usize];
            bw.write_bits(u32::from(code), u32::from(len));
        }
        bw.finish()
    }

    #[test]
    fn test_decode_roundtrip_all_tables() {
        let syms: Vec<u8> = (0..16).collect();
        for table in 0..16 {
            let data = encode_syms(table, &syms);
            let mut br = BitReader::new(&data);
            for &expect in &syms {
                assert_eq!(bink_trees()[table].decode(&mut br), expect, "码表 {table}");
            }
        }
    }

    #[test]
    fn test_decode_is_deterministic() {
        let data = encode_syms(2, &[7, 7, 7]);
        let mut br = BitReader::new(&data);
        let a = bink_trees()[2].decode(&mut br);
        let b = bink_trees()[2].decode(&mut br);
        let c = bink_trees()[2].decode(&mut br);
        assert_eq!(a, 7);
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_tree_identity_when_table_zero() {
        let mut bw = BitWriter::new();
        bw.write_bits(0, 4); // 码表 0
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut tree = Tree::default();
        tree.read_desc(&mut br);
        assert_eq!(tree.id, 0);
        for i in 0..16u8 {
            assert_eq!(tree.syms[i as usize], i);
        }
    }

    #[test]
    fn test_tree_order_mode() {
        // 码表 3, 顺序模式, 显式列出 [5, 0, 9], 其余按升序补齐
        let mut bw = BitWriter::new();
        bw.write_bits(3, 4);
        bw.write_bit(true);
        bw.write_bits(2, 3); // len = 2, 共 3 个显式符号
        bw.write_bits(5, 4);
        bw.write_bits(0, 4);
        bw.write_bits(9, 4);
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut tree = Tree::default();
        tree.read_desc(&mut br);
        assert_eq!(tree.id, 3);
        assert_eq!(&tree.syms[0..3], &[5, 0, 9]);
        let rest: Vec<u8> = tree.syms[3..].to_vec();
        assert_eq!(rest, vec![1, 2, 3, 4, 6, 7, 8, 10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn test_tree_merge_mode_keeps_permutation() {
        // 码表 1, 归并模式, merge_depth = 3, 全部归并位取 1:
        // 每趟都先取右块, 结果仍是 0-15 的一个排列
        let mut bw = BitWriter::new();
        bw.write_bits(1, 4);
        bw.write_bit(false);
        bw.write_bits(3, 2);
        for _ in 0..64 {
            bw.write_bit(true);
        }
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut tree = Tree::default();
        tree.read_desc(&mut br);
        let mut seen = [false; 16];
        for &s in tree.syms.iter() {
            assert!(!seen[s as usize]);
            seen[s as usize] = true;
        }
    }
}
