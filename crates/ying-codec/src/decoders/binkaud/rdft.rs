//! 逆实数 DFT (IRDFT) 与基-2 复数 FFT.
//!
//! IRDFT 输入为打包的半谱: `data[0] = Re[0]`, `data[1] = Re[N/2]`,
//! 其后 `data[2k], data[2k+1] = Re[k], Im[k]`. 先做共轭对称预组合,
//! 再对重解释为复数序列的缓冲区做一次 N/2 点正向 FFT.

/// 基-2 时间抽取复数 FFT
///
/// 数据为交错的 (re, im) 对. 位反转表与旋转因子在构造时算好.
/// `inverse` 选择旋转因子的指数符号; IRDFT 的半长变换使用正指数.
pub struct Fft {
    /// 复数点数 (2 的幂)
    n: usize,
    /// 位反转置换表
    bit_rev: Vec<u32>,
    /// 旋转因子表: 单位圆上 n/2 个点的 (cos, sin)
    twiddles: Vec<(f32, f32)>,
}

impl Fft {
    /// 创建 `n` 点复数 FFT (n 为 2 的幂)
    pub fn new(n: usize, inverse: bool) -> Self {
        debug_assert!(n.is_power_of_two());
        let bits = n.trailing_zeros();
        let sign = if inverse { 2.0 } else { -2.0 };
        let bit_rev = (0..n as u32)
            .map(|i| i.reverse_bits() >> (32 - bits.max(1)))
            .collect();
        let twiddles = (0..n / 2)
            .map(|i| {
                let angle = sign * std::f64::consts::PI * i as f64 / n as f64;
                (angle.cos() as f32, angle.sin() as f32)
            })
            .collect();
        Self { n, bit_rev, twiddles }
    }

    /// 原地 FFT, `data` 为交错复数 (长度 2n)
    pub fn transform(&self, data: &mut [f32]) {
        let n = self.n;
        if n <= 1 {
            return;
        }
        debug_assert!(data.len() >= n * 2);
        // 位反转置换
        for i in 0..n {
            let j = self.bit_rev[i] as usize;
            if i < j {
                data.swap(i * 2, j * 2);
                data.swap(i * 2 + 1, j * 2 + 1);
            }
        }
        // 蝶形
        let mut size = 2;
        while size <= n {
            let half = size / 2;
            let step = n / size;
            for base in (0..n).step_by(size) {
                for k in 0..half {
                    let (wr, wi) = self.twiddles[k * step];
                    let even = (base + k) * 2;
                    let odd = (base + k + half) * 2;
                    let (er, ei) = (data[even], data[even + 1]);
                    let (or_, oi) = (data[odd], data[odd + 1]);
                    let tr = wr * or_ - wi * oi;
                    let ti = wr * oi + wi * or_;
                    data[even] = er + tr;
                    data[even + 1] = ei + ti;
                    data[odd] = er - tr;
                    data[odd + 1] = ei - ti;
                }
            }
            size *= 2;
        }
    }
}

/// 逆实数 DFT
pub struct Rdft {
    /// 输出的实数点数
    n: usize,
    /// 半长复数 FFT
    fft: Fft,
    /// 预组合用的 (cos, sin) 表
    angles: Vec<(f32, f32)>,
}

impl Rdft {
    /// 创建 `1 << n_bits` 点的逆实数 DFT
    pub fn new(n_bits: u32) -> Self {
        let n = 1usize << n_bits;
        let theta = 2.0 * std::f64::consts::PI / n as f64;
        let angles = (0..n / 4)
            .map(|i| {
                let a = theta * i as f64;
                (a.cos() as f32, a.sin() as f32)
            })
            .collect();
        Self {
            n,
            fft: Fft::new(n / 2, true),
            angles,
        }
    }

    /// 输出的实数点数
    pub fn len(&self) -> usize {
        self.n
    }

    /// 原地逆实数 DFT
    pub fn transform(&self, data: &mut [f32]) {
        let n = self.n;
        debug_assert!(data.len() >= n);
        // DC 与 Nyquist 合并进打包首对
        let d0 = data[0];
        let d1 = data[1];
        data[0] = (d0 + d1) * 0.5;
        data[1] = (d0 - d1) * 0.5;
        // 共轭对称预组合
        for i in 1..n / 4 {
            let i1 = 2 * i;
            let i2 = n - i1;
            let (a, b, c, d) = (data[i1], data[i2], data[i1 + 1], data[i2 + 1]);
            let even_re = (a + b) * 0.5;
            let odd_im = (a - b) * 0.5;
            let even_im = (c - d) * 0.5;
            let odd_re = -(c + d) * 0.5;
            let (cos_a, sin_a) = self.angles[i];
            data[i1] = even_re + odd_re * cos_a - odd_im * sin_a;
            data[i1 + 1] = even_im + odd_im * cos_a + odd_re * sin_a;
            data[i2] = even_re - odd_re * cos_a + odd_im * sin_a;
            data[i2 + 1] = -even_im + odd_im * cos_a + odd_re * sin_a;
        }
        // 中点频率自共轭, 预组合循环不覆盖, 逆变换需要取共轭
        data[n / 2 + 1] = -data[n / 2 + 1];
        // 半长 FFT 还原时域 (正指数)
        self.fft.transform(&mut data[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 朴素参考: 由打包半谱重建实序列
    ///
    /// 与 `Rdft` 的约定一致:
    /// x_t = Re[0]/2 + (−1)^t·Re[N/2]/2 + Σ_{k=1}^{N/2−1} (Re[k]cos(2πkt/N) − Im[k]sin(2πkt/N))
    fn irdft_ref(packed: &[f32]) -> Vec<f32> {
        let n = packed.len();
        let mut re = vec![0.0f64; n / 2 + 1];
        let mut im = vec![0.0f64; n / 2 + 1];
        re[0] = f64::from(packed[0]);
        re[n / 2] = f64::from(packed[1]);
        for k in 1..n / 2 {
            re[k] = f64::from(packed[2 * k]);
            im[k] = f64::from(packed[2 * k + 1]);
        }
        (0..n)
            .map(|t| {
                let nyq = if t % 2 == 0 { 1.0 } else { -1.0 };
                let mut sum = 0.5 * re[0] + 0.5 * nyq * re[n / 2];
                for k in 1..n / 2 {
                    let angle = 2.0 * std::f64::consts::PI * k as f64 * t as f64 / n as f64;
                    sum += re[k] * angle.cos() - im[k] * angle.sin();
                }
                sum as f32
            })
            .collect()
    }

    #[test]
    fn test_fft_impulse() {
        // 冲激的频谱为常数
        let fft = Fft::new(8, false);
        let mut data = vec![0.0f32; 16];
        data[0] = 1.0;
        fft.transform(&mut data);
        for k in 0..8 {
            assert!((data[k * 2] - 1.0).abs() < 1e-5);
            assert!(data[k * 2 + 1].abs() < 1e-5);
        }
    }

    #[test]
    fn test_fft_single_tone() {
        // e^{-2πi·t/n} 输入在负指数 FFT 的 bin 1 聚能
        let n = 16usize;
        let fft = Fft::new(n, false);
        let mut data = vec![0.0f32; n * 2];
        for t in 0..n {
            let angle = -2.0 * std::f64::consts::PI * t as f64 / n as f64;
            data[t * 2] = angle.cos() as f32;
            data[t * 2 + 1] = angle.sin() as f32;
        }
        fft.transform(&mut data);
        assert!((data[2] - n as f32).abs() < 1e-3);
        for k in 0..n {
            if k != 1 {
                assert!(data[k * 2].abs() < 1e-3, "bin {k}");
                assert!(data[k * 2 + 1].abs() < 1e-3, "bin {k}");
            }
        }
    }

    #[test]
    fn test_rdft_cos_tone() {
        // Re[1] = 1 还原为单位余弦波
        let n = 16usize;
        let rdft = Rdft::new(4);
        let mut data = vec![0.0f32; n];
        data[2] = 1.0;
        rdft.transform(&mut data);
        for (t, &v) in data.iter().enumerate() {
            let want = (2.0 * std::f64::consts::PI * t as f64 / n as f64).cos() as f32;
            assert!((v - want).abs() < 1e-5, "样本 {t}: {v} vs {want}");
        }
    }

    #[test]
    fn test_rdft_matches_reference() {
        for bits in [4u32, 6, 8] {
            let n = 1usize << bits;
            let rdft = Rdft::new(bits);
            let mut data: Vec<f32> = (0..n)
                .map(|i| ((i as f32 * 0.71).sin() * 0.5) + ((i as f32 * 0.23).cos() * 0.3))
                .collect();
            let expect = irdft_ref(&data);
            rdft.transform(&mut data);
            for (i, (&got, &want)) in data.iter().zip(expect.iter()).enumerate() {
                assert!(
                    (got - want).abs() < 1e-2,
                    "N={n} 样本 {i}: {got} vs {want}"
                );
            }
        }
    }
}
