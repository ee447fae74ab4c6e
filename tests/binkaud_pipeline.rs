//! Bink 音频解码端到端测试.
//!
//! 构造带音轨的 .bik 文件, 通过 `BikMedia` 验证音轨切分、子块长度
//! 与 reset 重放的一致性. 视频载荷复用全 FILL 帧.

use ying::media::BikMedia;
use ying_core::bitwriter::BitWriter;

/// 临界频带上限 (与解码器一致, 用于计算静音块的频带数)
const CRITICAL_FREQS: [u32; 25] = [
    100, 200, 300, 400, 510, 630, 770, 920, 1080, 1270, 1480, 1720, 2000, 2320, 2700, 3150, 3700,
    4400, 5300, 6400, 7700, 9500, 12000, 15500, 24500,
];

// ========================
// 辅助函数
// ========================

/// 计算一条音轨的 (变换长度, 内部声道数, 频带数)
fn track_layout(sample_rate: u32, channels: u32, use_dct: bool) -> (usize, usize, usize) {
    let mut frame_bits = if sample_rate < 22050 {
        9u32
    } else if sample_rate < 44100 {
        10
    } else {
        11
    };
    let mut internal_rate = sample_rate;
    let internal_channels = if use_dct {
        channels as usize
    } else {
        internal_rate *= channels;
        frame_bits += channels.next_power_of_two().trailing_zeros() & 3;
        1
    };
    let frame_len = 1usize << frame_bits;
    let half = (internal_rate as usize + 1) / 2;
    let num_bands = CRITICAL_FREQS
        .iter()
        .position(|&cf| half <= cf as usize)
        .map(|k| k + 1)
        .unwrap_or(CRITICAL_FREQS.len() + 1)
        .min(CRITICAL_FREQS.len());
    (frame_len, internal_channels, num_bands)
}

/// 写一个静音子块
fn silent_block(sample_rate: u32, channels: u32, use_dct: bool, blocks: usize) -> Vec<u8> {
    let (frame_len, internal_channels, num_bands) = track_layout(sample_rate, channels, use_dct);
    let mut bw = BitWriter::new();
    for _ in 0..blocks {
        if use_dct {
            bw.write_bits(0, 2);
        }
        for _ in 0..internal_channels {
            bw.write_bits(0, 29);
            bw.write_bits(0, 29);
            for _ in 0..num_bands {
                bw.write_bits(0, 8);
            }
            let mut i = 2;
            while i < frame_len {
                bw.write_bit(false); // 固定 8 步长
                bw.write_bits(0, 4); // width = 0
                i += 8;
            }
        }
        bw.align32();
    }
    bw.finish()
}

/// 16x16 全 FILL 的视频载荷 (修订版 'g')
fn fill_video_payload() -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(0, 32);
    // Y 平面
    for _ in 0..23 {
        bw.write_bits(0, 4);
    }
    let btype_row = |bw: &mut BitWriter| {
        bw.write_bits(2, 10);
        bw.write_bit(true);
        bw.write_bits(6, 4); // FILL
    };
    let colors_row = |bw: &mut BitWriter, vals: &[u8]| {
        bw.write_bits(vals.len() as u32, 10);
        bw.write_bit(false);
        for &v in vals {
            bw.write_bits(u32::from(v >> 4), 4);
            bw.write_bits(u32::from(v & 0xF), 4);
        }
    };
    btype_row(&mut bw);
    bw.write_bits(0, 10); // 子块类型耗尽
    colors_row(&mut bw, &[128, 128]);
    for _ in 0..6 {
        bw.write_bits(0, 10);
    }
    btype_row(&mut bw);
    colors_row(&mut bw, &[128, 128]);
    bw.align32();
    // 两个色度平面
    for _ in 0..2 {
        for _ in 0..23 {
            bw.write_bits(0, 4);
        }
        bw.write_bits(1, 10);
        bw.write_bit(true);
        bw.write_bits(6, 4);
        bw.write_bits(0, 10);
        colors_row(&mut bw, &[128]);
        for _ in 0..6 {
            bw.write_bits(0, 10);
        }
        bw.align32();
    }
    bw.finish()
}

/// 构造带一条音轨的 16x16 .bik 文件
fn build_bik_with_audio(
    rate: u16,
    flags: u16,
    frames: &[(Vec<u8>, Vec<u8>)], // (音频载荷, 视频载荷)
) -> Vec<u8> {
    let header_size = 44 + 12 + 4 * (frames.len() + 1);
    let mut bodies = Vec::new();
    for (audio, video) in frames {
        let mut body = Vec::new();
        if audio.is_empty() {
            body.extend_from_slice(&4u32.to_le_bytes());
            body.extend_from_slice(&0u32.to_le_bytes());
        } else {
            body.extend_from_slice(&((audio.len() + 4) as u32).to_le_bytes());
            body.extend_from_slice(&(audio.len() as u32 * 2).to_le_bytes());
            body.extend_from_slice(audio);
        }
        body.extend_from_slice(video);
        bodies.push(body);
    }
    let total: usize = header_size + bodies.iter().map(Vec::len).sum::<usize>();
    let mut data = Vec::new();
    data.extend_from_slice(b"BIKg");
    data.extend_from_slice(&((total - 8) as u32).to_le_bytes());
    data.extend_from_slice(&(frames.len() as u32).to_le_bytes());
    let largest = bodies.iter().map(Vec::len).max().unwrap_or(0) as u32;
    data.extend_from_slice(&largest.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(&30u32.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes()); // 一条音轨
    data.extend_from_slice(&0u32.to_le_bytes()); // 最大输出帧大小 (跳过)
    data.extend_from_slice(&rate.to_le_bytes());
    data.extend_from_slice(&flags.to_le_bytes());
    data.extend_from_slice(&7u32.to_le_bytes()); // 音轨 ID
    let mut pos = header_size as u32;
    for (i, body) in bodies.iter().enumerate() {
        let raw = if i == 0 { pos | 1 } else { pos };
        data.extend_from_slice(&raw.to_le_bytes());
        pos += body.len() as u32;
    }
    data.extend_from_slice(&pos.to_le_bytes());
    for body in bodies {
        data.extend_from_slice(&body);
    }
    data
}

// ========================
// 测试
// ========================

#[test]
fn test_dct_stereo_block_lengths() {
    // 44100 Hz DCT 立体声: 变换长度 2048, 子块每声道 2048 - 128 = 1920
    let audio = silent_block(44100, 2, true, 1);
    let video = fill_video_payload();
    let file = build_bik_with_audio(44100, 0x3000, &[(audio, video)]);
    let mut media = BikMedia::open_memory(file).unwrap();

    let frame = media.next_frame().unwrap().unwrap();
    assert_eq!(frame.audio.len(), 1);
    let blocks = &frame.audio[0];
    assert!(!blocks.is_empty());
    for block in blocks {
        assert_eq!(block.nb_samples, 1920);
        assert_eq!(block.data.len(), 2);
        assert_eq!(block.sample_rate, 44100);
        let samples = block.channel_f32(0);
        assert_eq!(samples.len(), 1920);
        assert!(samples.iter().all(|&s| s == 0.0));
    }
}

#[test]
fn test_rdft_stereo_block_lengths() {
    // 44100 Hz RDFT 立体声: 声道交错, 变换长度 4096,
    // 拆分后每声道 (4096 - 256) / 2 = 1920
    let audio = silent_block(44100, 2, false, 1);
    let video = fill_video_payload();
    let file = build_bik_with_audio(44100, 0x2000, &[(audio, video)]);
    let mut media = BikMedia::open_memory(file).unwrap();

    let frame = media.next_frame().unwrap().unwrap();
    let blocks = &frame.audio[0];
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].nb_samples, 1920);
    assert_eq!(blocks[0].data.len(), 2);
}

#[test]
fn test_multiple_blocks_per_packet() {
    let audio = silent_block(11025, 1, true, 3);
    let video = fill_video_payload();
    let file = build_bik_with_audio(11025, 0x1000, &[(audio, video)]);
    let mut media = BikMedia::open_memory(file).unwrap();

    let frame = media.next_frame().unwrap().unwrap();
    let blocks = &frame.audio[0];
    assert_eq!(blocks.len(), 3);
    // 11025 Hz: 变换长度 512, 子块 512 - 32 = 480
    for block in blocks {
        assert_eq!(block.nb_samples, 480);
    }
    // 子块 PTS 按采样数递增
    assert_eq!(blocks[0].pts, 0);
    assert_eq!(blocks[1].pts, 480);
    assert_eq!(blocks[2].pts, 960);
}

#[test]
fn test_empty_audio_frame_has_no_blocks() {
    let video = fill_video_payload();
    let file = build_bik_with_audio(22050, 0x1000, &[(Vec::new(), video)]);
    let mut media = BikMedia::open_memory(file).unwrap();
    let frame = media.next_frame().unwrap().unwrap();
    assert_eq!(frame.audio.len(), 1);
    assert!(frame.audio[0].is_empty());
}

#[test]
fn test_reset_replays_audio_identically() {
    let frames = [
        (silent_block(22050, 1, true, 2), fill_video_payload()),
        (silent_block(22050, 1, true, 1), fill_video_payload()),
    ];
    let file = build_bik_with_audio(22050, 0x1000, &frames);
    let mut media = BikMedia::open_memory(file).unwrap();

    let collect = |media: &mut BikMedia| -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(frame) = media.next_frame().unwrap() {
            for block in frame.audio[0].iter() {
                out.extend(block.data.iter().cloned());
            }
        }
        out
    };
    let first = collect(&mut media);
    media.reset().unwrap();
    let second = collect(&mut media);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
