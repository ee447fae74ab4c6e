//! 系数/残差扫描.
//!
//! 8x8 块的 AC 系数与残差用同一套位平面扫描机读取: 两条并行队列
//! (`coef_list` 存扫描区间起点, `mode_list` 存区间状态), 从高位平面
//! 到低位平面逐层细分, 命中的叶子落在 `BINK_SCAN` 指定的位置上.
//!
//! 队列与命中位置数组在解码器构造时分配一次, 块间复用.

use ying_core::bitreader::BitReader;
use ying_core::YingResult;

use super::tables::{QuantMatrices, BINK_SCAN};

/// 扫描机的可复用状态
pub struct CoeffScan {
    /// 扫描区间起点队列
    coef_list: [i32; 128],
    /// 区间状态队列 (0: 可细分, 1: 已细分, 2: 待展开, 3: 单叶)
    mode_list: [u8; 128],
    /// 已写入系数的扫描下标 (DCT 模式) 或平面位置 (残差模式)
    coef_idx: [usize; 64],
}

impl Default for CoeffScan {
    fn default() -> Self {
        Self::new()
    }
}

impl CoeffScan {
    pub fn new() -> Self {
        Self {
            coef_list: [0; 128],
            mode_list: [0; 128],
            coef_idx: [0; 64],
        }
    }

    /// 队列初始种子: 三个 4 起点的可细分区间
    fn seed(&mut self) -> usize {
        let mut list_end = 64;
        for (i, &start) in [4, 24, 44].iter().enumerate() {
            self.coef_list[list_end + i] = start;
            self.mode_list[list_end + i] = 0;
        }
        list_end += 3;
        list_end
    }

    /// 读取 DCT 模式的 AC 系数并反量化
    ///
    /// `block[0]` 应已填入 DC; 量化等级从码流尾部的 4 位读出.
    pub fn read_dct_coefficients(
        &mut self,
        br: &mut BitReader,
        block: &mut [i32; 64],
        quant: &QuantMatrices,
    ) -> YingResult<()> {
        let mut list_start = 64;
        let mut list_end = self.seed();
        // 追加 1, 2, 3 三个单叶
        for i in 0..3 {
            self.coef_list[list_end] = 1 + i;
            self.mode_list[list_end] = 3;
            list_end += 1;
        }
        let mut coef_count = 0usize;

        let mut bits = br.read_bits(4) as i32 - 1;
        while bits >= 0 {
            let mut list_pos = list_start;
            while list_pos < list_end {
                let ccoef = self.coef_list[list_pos];
                let mode = self.mode_list[list_pos];
                if (mode == 0 && ccoef == 0) || !br.read_bool() {
                    list_pos += 1;
                    continue;
                }
                match mode {
                    0 | 2 => {
                        if mode == 0 {
                            // 细分: 本区间收窄, 下一层由模式 1 展开
                            self.coef_list[list_pos] = ccoef + 4;
                            self.mode_list[list_pos] = 1;
                        } else {
                            // 消费后清空槽位
                            self.coef_list[list_pos] = 0;
                            self.mode_list[list_pos] = 0;
                            list_pos += 1;
                        }
                        for i in 0..4 {
                            if br.read_bool() {
                                // 推迟到更低位平面
                                list_start -= 1;
                                self.coef_list[list_start] = ccoef + i;
                                self.mode_list[list_start] = 3;
                            } else {
                                let idx = (ccoef + i) as usize;
                                block[BINK_SCAN[idx]] = read_coef(br, bits as u32);
                                self.coef_idx[coef_count] = idx;
                                coef_count += 1;
                            }
                        }
                    }
                    1 => {
                        self.mode_list[list_pos] = 2;
                        for i in 0..3 {
                            self.coef_list[list_end] = ccoef + i * 4 + 4;
                            self.mode_list[list_end] = 2;
                            list_end += 1;
                        }
                    }
                    3 => {
                        let idx = ccoef as usize;
                        block[BINK_SCAN[idx]] = read_coef(br, bits as u32);
                        self.coef_idx[coef_count] = idx;
                        coef_count += 1;
                        self.coef_list[list_pos] = 0;
                        self.mode_list[list_pos] = 0;
                        list_pos += 1;
                    }
                    _ => unreachable!(),
                }
            }
            bits -= 1;
        }

        // 反量化: 4 位量化等级, 矩阵按扫描下标存储
        let q_idx = br.read_bits(4) as usize;
        let qmat = &quant[q_idx];
        block[0] = block[0].wrapping_mul(qmat[0]) >> 11;
        for &idx in self.coef_idx.iter().take(coef_count) {
            let pos = BINK_SCAN[idx];
            block[pos] = block[pos].wrapping_mul(qmat[idx]) >> 11;
        }
        Ok(())
    }

    /// 读取残差块: 位平面从 `1 << read(3)` 向下扫描
    ///
    /// 最多写入 `masks_count + 1` 个掩码位; 计数从 0 再减即返回.
    pub fn read_residue(
        &mut self,
        br: &mut BitReader,
        block: &mut [i32; 64],
    ) -> YingResult<()> {
        let mut list_start = 64;
        let mut list_end = self.seed();
        // 残差模式额外挂一个从 0 起的待展开区间
        self.coef_list[list_end] = 0;
        self.mode_list[list_end] = 2;
        list_end += 1;
        let mut nz_count = 0usize;

        let mut masks_count = br.read_bits(7) as i32;
        let mut mask = 1i32 << br.read_bits(3);
        while mask > 0 {
            // 已有的非零位置逐个决定是否叠加当前位平面
            for i in 0..nz_count {
                if !br.read_bool() {
                    continue;
                }
                let pos = self.coef_idx[i];
                if block[pos] < 0 {
                    block[pos] -= mask;
                } else {
                    block[pos] += mask;
                }
                if masks_count == 0 {
                    return Ok(());
                }
                masks_count -= 1;
            }
            let mut list_pos = list_start;
            while list_pos < list_end {
                let ccoef = self.coef_list[list_pos];
                let mode = self.mode_list[list_pos];
                if (mode == 0 && ccoef == 0) || !br.read_bool() {
                    list_pos += 1;
                    continue;
                }
                match mode {
                    0 | 2 => {
                        if mode == 0 {
                            self.coef_list[list_pos] = ccoef + 4;
                            self.mode_list[list_pos] = 1;
                        } else {
                            self.coef_list[list_pos] = 0;
                            self.mode_list[list_pos] = 0;
                            list_pos += 1;
                        }
                        for i in 0..4 {
                            if br.read_bool() {
                                list_start -= 1;
                                self.coef_list[list_start] = ccoef + i;
                                self.mode_list[list_start] = 3;
                            } else {
                                let pos = BINK_SCAN[(ccoef + i) as usize];
                                self.coef_idx[nz_count] = pos;
                                nz_count += 1;
                                block[pos] = br.apply_sign(mask);
                                if masks_count == 0 {
                                    return Ok(());
                                }
                                masks_count -= 1;
                            }
                        }
                    }
                    1 => {
                        self.mode_list[list_pos] = 2;
                        for i in 0..3 {
                            self.coef_list[list_end] = ccoef + i * 4 + 4;
                            self.mode_list[list_end] = 2;
                            list_end += 1;
                        }
                    }
                    3 => {
                        let pos = BINK_SCAN[ccoef as usize];
                        self.coef_idx[nz_count] = pos;
                        nz_count += 1;
                        block[pos] = br.apply_sign(mask);
                        self.coef_list[list_pos] = 0;
                        self.mode_list[list_pos] = 0;
                        list_pos += 1;
                        if masks_count == 0 {
                            return Ok(());
                        }
                        masks_count -= 1;
                    }
                    _ => unreachable!(),
                }
            }
            mask >>= 1;
        }
        Ok(())
    }
}

/// 读取一个叶子系数: `bits` 为 0 时读符号位得 ±1,
/// 否则读 `bits` 位幅值并补上隐含最高位, 再读符号位
fn read_coef(br: &mut BitReader, bits: u32) -> i32 {
    if bits == 0 {
        1 - 2 * br.read_bit() as i32
    } else {
        let val = (br.read_bits(bits) | (1 << bits)) as i32;
        br.apply_sign(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::tables::BINK_INTRA_QUANT;
    use ying_core::bitwriter::BitWriter;

    #[test]
    fn test_dct_no_coefficients() {
        // bits1 = 0 -> 主循环不执行, 只读量化等级
        let mut bw = BitWriter::new();
        bw.write_bits(0, 4); // bits1
        bw.write_bits(0, 4); // 量化等级 0
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut scan = CoeffScan::new();
        let mut block = [0i32; 64];
        block[0] = 100;
        scan.read_dct_coefficients(&mut br, &mut block, &BINK_INTRA_QUANT)
            .unwrap();
        // DC 按等级 0 反量化: 100 * 65536 >> 11 = 3200
        assert_eq!(block[0], 3200);
        assert!(block[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_dct_single_leaf() {
        // bits1 = 1; 队列顺序: 三个区间 (4/24/44) 不展开, 单叶 1 命中
        let mut bw = BitWriter::new();
        bw.write_bits(2, 4); // bits1 = 2, 循环跑 bits=1, 0 两层
        // 第一层 (bits = 1):
        bw.write_bit(false); // 区间 4 不展开
        bw.write_bit(false); // 区间 24 不展开
        bw.write_bit(false); // 区间 44 不展开
        bw.write_bit(true); // 单叶 1 命中
        bw.write_bits(0, 1); // 幅值低位 0 -> 值 = 0 | (1<<1) = 2
        bw.write_bit(false); // 正号
        bw.write_bit(false); // 单叶 2 不命中
        bw.write_bit(false); // 单叶 3 不命中
        // 第二层 (bits = 0): 单叶 1 已消费, 槽位清零后仍会被询问
        for _ in 0..5 {
            bw.write_bit(false);
        }
        bw.write_bits(0, 4); // 量化等级 0
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut scan = CoeffScan::new();
        let mut block = [0i32; 64];
        scan.read_dct_coefficients(&mut br, &mut block, &BINK_INTRA_QUANT)
            .unwrap();
        // 扫描下标 1 对应位置 BINK_SCAN[1] = 1
        let q = BINK_INTRA_QUANT[0][1];
        assert_eq!(block[1], 2i32.wrapping_mul(q) >> 11);
    }

    #[test]
    fn test_residue_masks_budget() {
        // masks_count = 0: 写入第一个叶子后立即返回
        let mut bw = BitWriter::new();
        bw.write_bits(0, 7); // masks_count
        bw.write_bits(2, 3); // mask = 1 << 2 = 4
        bw.write_bit(false); // 区间 4 不展开
        bw.write_bit(false); // 区间 24 不展开
        bw.write_bit(false); // 区间 44 不展开
        bw.write_bit(true); // 区间 0 (模式 2) 展开
        bw.write_bit(false); // 叶子 0 直接落位
        bw.write_bit(true); // 负号
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut scan = CoeffScan::new();
        let mut block = [0i32; 64];
        scan.read_residue(&mut br, &mut block).unwrap();
        assert_eq!(block[BINK_SCAN[0]], -4);
        assert_eq!(block.iter().filter(|&&c| c != 0).count(), 1);
    }
}
