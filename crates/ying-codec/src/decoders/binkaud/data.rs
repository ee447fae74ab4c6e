//! Bink 音频解码常量.

/// 临界频带上限 (Hz), 用于把频谱划分为量化频带
pub const AUDIO_CRITICAL_FREQS: [u32; 25] = [
    100, 200, 300, 400, 510, 630, 770, 920, 1080, 1270, 1480, 1720, 2000, 2320, 2700, 3150, 3700,
    4400, 5300, 6400, 7700, 9500, 12000, 15500, 24500,
];

/// 频带数量上限
pub const MAX_BANDS: usize = AUDIO_CRITICAL_FREQS.len();

/// 系数游程长度表 (已乘 8, 直接作为跨度使用)
pub const AUDIO_RLE_LEN: [usize; 16] = [
    16, 24, 32, 40, 48, 64, 72, 80, 88, 96, 104, 112, 120, 128, 256, 512,
];
