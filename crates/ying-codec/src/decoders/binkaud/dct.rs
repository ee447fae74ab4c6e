//! 逆 DCT-III (Lee 递归分解).
//!
//! 每层递归把 N 点变换拆成两个 N/2 点子变换: 偶数下标直接抄入前半,
//! 奇数下标相邻两项求和放入后半; 子变换完成后用 1/(2·cos((i+0.5)π/N))
//! 的蝶形组合出结果. 倒数余弦表按递归层级预先算好.

/// 逆 DCT-III 变换器
///
/// 持有 N 点变换所需的全部层级余弦倒数表与一块递归暂存区.
pub struct DctIII {
    /// 变换长度 (2 的幂)
    n: usize,
    /// 各层级的 1/(2·cos((i+0.5)π/n_level)) 表, 自顶层向下
    cos_tables: Vec<Vec<f32>>,
    /// 递归暂存区
    scratch: Vec<f32>,
}

impl DctIII {
    /// 创建 `1 << n_bits` 点的变换器
    pub fn new(n_bits: u32) -> Self {
        let n = 1usize << n_bits;
        let mut cos_tables = Vec::new();
        let mut len = n;
        while len >= 2 {
            let half = len / 2;
            let table: Vec<f32> = (0..half)
                .map(|i| {
                    let angle = (i as f64 + 0.5) * std::f64::consts::PI / len as f64;
                    (0.5 / angle.cos()) as f32
                })
                .collect();
            cos_tables.push(table);
            len /= 2;
        }
        Self {
            n,
            cos_tables,
            scratch: vec![0.0; n],
        }
    }

    /// 变换长度
    pub fn len(&self) -> usize {
        self.n
    }

    /// 原地计算逆 DCT-III
    pub fn transform(&mut self, data: &mut [f32]) {
        debug_assert!(data.len() >= self.n);
        let mut scratch = std::mem::take(&mut self.scratch);
        Self::transform_level(&mut data[..self.n], &mut scratch[..], &self.cos_tables, 0);
        self.scratch = scratch;
    }

    /// 递归一层: `data` 持有输入与最终输出, `tmp` 为本层暂存
    fn transform_level(data: &mut [f32], tmp: &mut [f32], tables: &[Vec<f32>], level: usize) {
        let n = data.len();
        if n < 2 {
            return;
        }
        let half = n / 2;
        // 重排: 偶数项进前半, 奇数项相邻求和进后半
        tmp[0] = data[0];
        tmp[half] = data[1];
        for i in 1..half {
            tmp[i] = data[2 * i];
            tmp[i + half] = data[2 * i - 1] + data[2 * i + 1];
        }
        // 递归时暂存与数据互换角色
        {
            let (tmp_lo, tmp_hi) = tmp.split_at_mut(half);
            let (data_lo, data_hi) = data.split_at_mut(half);
            Self::transform_level(tmp_lo, data_lo, tables, level + 1);
            Self::transform_level(tmp_hi, data_hi, tables, level + 1);
        }
        // 蝶形组合
        let table = &tables[level];
        for i in 0..half {
            let x = tmp[i];
            let y = tmp[i + half] * table[i];
            data[i] = x + y;
            data[n - 1 - i] = x - y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 朴素逆 DCT-III 参考: y_n = x_0 + Σ_{k>=1} 2·x_k·cos((2n+1)kπ/2N) 的半幅形式
    fn dct3_ref(input: &[f32]) -> Vec<f32> {
        let n = input.len();
        (0..n)
            .map(|i| {
                let mut sum = f64::from(input[0]);
                for (k, &x) in input.iter().enumerate().skip(1) {
                    let angle =
                        (i as f64 + 0.5) * k as f64 * std::f64::consts::PI / n as f64;
                    sum += f64::from(x) * angle.cos();
                }
                sum as f32
            })
            .collect()
    }

    #[test]
    fn test_matches_reference_small() {
        let mut dct = DctIII::new(3);
        let mut data = [1.0f32, 0.5, -0.25, 0.75, 0.0, -1.0, 0.25, 0.125];
        let expect = dct3_ref(&data);
        dct.transform(&mut data);
        for (i, (&got, &want)) in data.iter().zip(expect.iter()).enumerate() {
            assert!((got - want).abs() < 1e-4, "样本 {i}: {got} vs {want}");
        }
    }

    #[test]
    fn test_dc_only_is_flat() {
        let mut dct = DctIII::new(5);
        let mut data = vec![0.0f32; 32];
        data[0] = 3.5;
        dct.transform(&mut data);
        for &v in data.iter() {
            assert!((v - 3.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_larger_sizes_match_reference() {
        for bits in [4u32, 6, 9] {
            let n = 1usize << bits;
            let mut dct = DctIII::new(bits);
            let mut data: Vec<f32> = (0..n)
                .map(|i| ((i as f32 * 0.37).sin() * 0.8) + ((i as f32 * 0.11).cos() * 0.2))
                .collect();
            let expect = dct3_ref(&data);
            dct.transform(&mut data);
            for (i, (&got, &want)) in data.iter().zip(expect.iter()).enumerate() {
                assert!(
                    (got - want).abs() < 1e-2,
                    "N={n} 样本 {i}: {got} vs {want}"
                );
            }
        }
    }
}
