//! 整数 AAN 8x8 IDCT 与像素块操作.
//!
//! IDCT 以 32 位有符号整数计算: 常数乘法后算术右移 11 位;
//! 列变换不带舍入偏置与移位, 行变换带偏置 127 并右移 8 位.
//! 写入像素时按 8 位回绕截断, 不做饱和.

/// round(√2 · 2048)
const C0: i32 = 2896;
/// round((√(2+√2) − √(2−√2)) · 2048)
const C1: i32 = 2217;
/// round(√(2+√2) · 2048)
const C2: i32 = 3784;
/// round(−(√(2+√2) + √(2−√2)) · 2048)
const C3: i32 = -5352;

/// 一维 AAN 变换: 从 `src` 以步长 `sstep` 取 8 点, 写入 `dst` 以步长 `dstep`
///
/// `bias` 为输出加性偏置, `shift` 为输出右移位数.
#[inline]
fn idct_pass(
    src: &[i32],
    sstep: usize,
    dst: &mut [i32],
    dstep: usize,
    off: usize,
    bias: i32,
    shift: u32,
) {
    let x = |i: usize| src[off + i * sstep];

    let a0 = x(0) + x(4);
    let a1 = x(0) - x(4);
    let a2 = x(2) + x(6);
    let a3 = C0.wrapping_mul(x(2) - x(6)) >> 11;
    let a4 = x(5) + x(3);
    let a5 = x(5) - x(3);
    let a6 = x(1) + x(7);
    let a7 = x(1) - x(7);

    let b0 = a4 + a6;
    let b1 = C2.wrapping_mul(a5 + a7) >> 11;
    let b2 = (C3.wrapping_mul(a5) >> 11) - b0 + b1;
    let b3 = (C0.wrapping_mul(a6 - a4) >> 11) - b2;
    let b4 = (C1.wrapping_mul(a7) >> 11) + b3 - b1;

    dst[off] = (a0 + bias + a2 + b0) >> shift;
    dst[off + dstep] = (a1 + bias + a3 - a2 + b2) >> shift;
    dst[off + 2 * dstep] = (a1 + bias - a3 + a2 + b3) >> shift;
    dst[off + 3 * dstep] = (a0 + bias - a2 - b4) >> shift;
    dst[off + 4 * dstep] = (a0 + bias - a2 + b4) >> shift;
    dst[off + 5 * dstep] = (a1 + bias - a3 + a2 - b3) >> shift;
    dst[off + 6 * dstep] = (a1 + bias + a3 - a2 - b2) >> shift;
    dst[off + 7 * dstep] = (a0 + bias + a2 - b0) >> shift;
}

/// 二维 IDCT: 先 8 列入暂存, 再 8 行出结果
fn idct_2d(coeffs: &[i32; 64], out: &mut [i32; 64]) {
    let mut tmp = [0i32; 64];
    for col in 0..8 {
        idct_pass(coeffs, 8, &mut tmp, 8, col, 0, 0);
    }
    let mut row_buf = [0i32; 8];
    for row in 0..8 {
        idct_pass(&tmp[row * 8..row * 8 + 8], 1, &mut row_buf, 1, 0, 0x7F, 8);
        out[row * 8..row * 8 + 8].copy_from_slice(&row_buf);
    }
}

/// IDCT 结果直接写入目标 (回绕截断到 u8)
pub fn idct_put(coeffs: &[i32; 64], dst: &mut [u8], off: usize, stride: usize) {
    let mut pix = [0i32; 64];
    idct_2d(coeffs, &mut pix);
    for (row, src) in pix.chunks_exact(8).enumerate() {
        let out = &mut dst[off + row * stride..][..8];
        for (o, &v) in out.iter_mut().zip(src.iter()) {
            *o = v as u8;
        }
    }
}

/// IDCT 结果叠加到目标 (回绕加法)
pub fn idct_add(coeffs: &[i32; 64], dst: &mut [u8], off: usize, stride: usize) {
    let mut pix = [0i32; 64];
    idct_2d(coeffs, &mut pix);
    add_block(&pix, dst, off, stride);
}

/// 把 64 个残差叠加到 8x8 目标块 (回绕加法)
pub fn add_block(residue: &[i32; 64], dst: &mut [u8], off: usize, stride: usize) {
    for (row, src) in residue.chunks_exact(8).enumerate() {
        let out = &mut dst[off + row * stride..][..8];
        for (o, &v) in out.iter_mut().zip(src.iter()) {
            *o = (i32::from(*o) + v) as u8;
        }
    }
}

/// 写入 8x8 像素块; `scaled` 时做 2x 最近邻放大写成 16x16
pub fn put_block(block: &[u8; 64], dst: &mut [u8], off: usize, stride: usize, scaled: bool) {
    if !scaled {
        for (row, src) in block.chunks_exact(8).enumerate() {
            dst[off + row * stride..][..8].copy_from_slice(src);
        }
    } else {
        for (row, src) in block.chunks_exact(8).enumerate() {
            for half in 0..2 {
                let out = &mut dst[off + (row * 2 + half) * stride..][..16];
                for (i, &v) in src.iter().enumerate() {
                    out[i * 2] = v;
                    out[i * 2 + 1] = v;
                }
            }
        }
    }
}

/// 从上一帧平面拷贝 8x8 块
pub fn copy_block(prev: &[u8], dst: &mut [u8], src_off: usize, dst_off: usize, stride: usize) {
    for row in 0..8 {
        let src = &prev[src_off + row * stride..][..8];
        dst[dst_off + row * stride..][..8].copy_from_slice(src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idct_dc_only_flat() {
        // 纯直流块: 输出平坦, 直流增益为 1/256
        let mut coeffs = [0i32; 64];
        coeffs[0] = 256 * 200;
        let mut dst = [0u8; 64];
        idct_put(&coeffs, &mut dst, 0, 8);
        for &p in dst.iter() {
            assert_eq!(p, 200);
        }
    }

    #[test]
    fn test_idct_add_wraps() {
        let mut coeffs = [0i32; 64];
        coeffs[0] = 256 * 100;
        let mut dst = [200u8; 64];
        idct_add(&coeffs, &mut dst, 0, 8);
        for &p in dst.iter() {
            assert_eq!(p, 44); // (200 + 100) & 0xFF
        }
    }

    /// 浮点 DCT-II 参考实现, 输出与 AAN 输入约定匹配的缩放系数
    fn dct2_ref(pixels: &[i32; 64]) -> [i32; 64] {
        use std::f64::consts::PI;
        let aan = [
            1.0,
            1.387_039_845_322_148,
            1.306_562_964_876_377,
            1.175_875_602_419_359,
            1.0,
            0.785_694_958_387_102,
            0.541_196_100_146_197,
            0.275_899_379_282_943,
        ];
        let mut out = [0i32; 64];
        for u in 0..8 {
            for v in 0..8 {
                let mut sum = 0.0f64;
                for y in 0..8 {
                    for x in 0..8 {
                        sum += f64::from(pixels[y * 8 + x])
                            * ((2 * y + 1) as f64 * u as f64 * PI / 16.0).cos()
                            * ((2 * x + 1) as f64 * v as f64 * PI / 16.0).cos();
                    }
                }
                let cu = if u == 0 { (0.5f64).sqrt() } else { 1.0 };
                let cv = if v == 0 { (0.5f64).sqrt() } else { 1.0 };
                // 折叠进 AAN 的行列缩放; 整体增益 32 抵消行变换的 >>8
                let scaled = sum * cu * cv * 8.0 * aan[u] * aan[v];
                out[u * 8 + v] = scaled.round() as i32;
            }
        }
        out
    }

    #[test]
    fn test_idct_recovers_dct2_within_budget() {
        // 取若干确定性伪随机块, 正变换后逆变换应在 ±2 之内复原
        let mut seed = 0x1234_5678u32;
        let mut rand = || {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 20) as i32 % 256
        };
        for _ in 0..8 {
            let mut pixels = [0i32; 64];
            for p in pixels.iter_mut() {
                *p = rand();
            }
            let coeffs = dct2_ref(&pixels);
            let mut out = [0i32; 64];
            idct_2d(&coeffs, &mut out);
            for (i, (&a, &b)) in pixels.iter().zip(out.iter()).enumerate() {
                assert!((a - b).abs() <= 2, "位置 {i}: 期望 {a}, 实际 {b}");
            }
        }
    }

    #[test]
    fn test_put_block_scaled_quads() {
        let mut block = [0u8; 64];
        block[0] = 7;
        block[1] = 9;
        let mut dst = [0u8; 16 * 16];
        put_block(&block, &mut dst, 0, 16, true);
        assert_eq!(dst[0], 7);
        assert_eq!(dst[1], 7);
        assert_eq!(dst[16], 7);
        assert_eq!(dst[17], 7);
        assert_eq!(dst[2], 9);
        assert_eq!(dst[3], 9);
    }
}
