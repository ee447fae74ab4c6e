//! Bink 容器解封装集成测试.
//!
//! 在内存中构造完整的 .bik 文件 (固定头 + 音轨表 + 帧偏移表 + 帧体),
//! 验证头部解析、流发现、逐帧切分与关键帧定位.

use ying_codec::CodecId;
use ying_core::{MediaType, PixelFormat, YingError};
use ying_format::demuxers::bik::{BikDemuxer, BikProbe};
use ying_format::io::IoContext;
use ying_format::probe::{FormatProbe, SCORE_MAX};
use ying_format::stream::StreamParams;
use ying_format::Demuxer;

// ========================
// 辅助函数: 构造 .bik 文件
// ========================

/// 一个音轨的声明: (采样率, 标志位)
type TrackDecl = (u16, u16);

/// 一帧的内容: (是否关键帧, 各音轨载荷, 视频载荷)
struct FrameDecl {
    keyframe: bool,
    audio: Vec<Vec<u8>>,
    video: Vec<u8>,
}

/// 构造完整的 Bink 文件
fn build_bik(
    magic: &[u8; 3],
    revision: u8,
    width: u32,
    height: u32,
    video_flags: u32,
    tracks: &[TrackDecl],
    frames: &[FrameDecl],
) -> Vec<u8> {
    let n = tracks.len();
    let header_size = 44 + 12 * n + 4 * (frames.len() + 1);

    // 帧体
    let mut bodies = Vec::new();
    for frame in frames {
        assert_eq!(frame.audio.len(), n, "每帧必须覆盖所有音轨");
        let mut body = Vec::new();
        for payload in frame.audio.iter() {
            if payload.is_empty() {
                // 空段: 只有长度与采样数
                body.extend_from_slice(&4u32.to_le_bytes());
                body.extend_from_slice(&0u32.to_le_bytes());
            } else {
                let track_size = (payload.len() + 4) as u32;
                body.extend_from_slice(&track_size.to_le_bytes());
                body.extend_from_slice(&(payload.len() as u32 * 2).to_le_bytes());
                body.extend_from_slice(payload);
            }
        }
        body.extend_from_slice(&frame.video);
        bodies.push(body);
    }

    let mut data = Vec::new();
    data.extend_from_slice(magic);
    data.push(revision);
    let total_size: usize = header_size + bodies.iter().map(Vec::len).sum::<usize>();
    data.extend_from_slice(&((total_size - 8) as u32).to_le_bytes());
    data.extend_from_slice(&(frames.len() as u32).to_le_bytes());
    let largest = bodies.iter().map(Vec::len).max().unwrap_or(0) as u32;
    data.extend_from_slice(&largest.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes()); // 未使用
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data.extend_from_slice(&30u32.to_le_bytes()); // fps 分子
    data.extend_from_slice(&1u32.to_le_bytes()); // fps 分母
    data.extend_from_slice(&video_flags.to_le_bytes());
    data.extend_from_slice(&(n as u32).to_le_bytes());
    // 每轨最大输出帧大小 (解封装器跳过)
    for _ in 0..n {
        data.extend_from_slice(&0u32.to_le_bytes());
    }
    // 采样率与标志
    for &(rate, flags) in tracks {
        data.extend_from_slice(&rate.to_le_bytes());
        data.extend_from_slice(&flags.to_le_bytes());
    }
    // 音轨 ID
    for (i, _) in tracks.iter().enumerate() {
        data.extend_from_slice(&(100 + i as u32).to_le_bytes());
    }
    // 帧偏移表
    let mut pos = header_size as u32;
    for (frame, body) in frames.iter().zip(bodies.iter()) {
        let raw = if frame.keyframe { pos | 1 } else { pos };
        data.extend_from_slice(&raw.to_le_bytes());
        pos += body.len() as u32;
    }
    data.extend_from_slice(&pos.to_le_bytes());
    // 帧体
    for body in bodies {
        data.extend_from_slice(&body);
    }
    assert_eq!(data.len(), total_size);
    data
}

fn simple_frame(keyframe: bool, n_tracks: usize, video_len: usize) -> FrameDecl {
    FrameDecl {
        keyframe,
        audio: vec![Vec::new(); n_tracks],
        video: vec![0xAB; video_len],
    }
}

// ========================
// 测试
// ========================

#[test]
fn test_header_and_streams() {
    // DCT 立体声 + RDFT 单声道两条音轨
    let tracks = [(44100u16, 0x3000u16), (22050, 0x0000)];
    let frames = [simple_frame(true, 2, 16), simple_frame(false, 2, 8)];
    let data = build_bik(b"BIK", b'g', 640, 352, 0, &tracks, &frames);
    let mut io = IoContext::from_memory(data);
    let mut dmx = BikDemuxer::new();
    dmx.open(&mut io).unwrap();

    let header = dmx.header().unwrap();
    assert_eq!(header.version, 1);
    assert_eq!(header.revision, b'g');
    assert_eq!(header.width, 640);
    assert_eq!(header.height, 352);
    assert_eq!(header.num_frames, 2);
    assert_eq!(header.num_audio_tracks, 2);
    assert_eq!(header.fps.to_f64(), 30.0);
    assert!(header.is_supported());

    let streams = dmx.streams();
    assert_eq!(streams.len(), 3);
    assert_eq!(streams[0].media_type, MediaType::Video);
    assert_eq!(streams[0].codec_id, CodecId::BinkVideo);
    let StreamParams::Video(ref vp) = streams[0].params else {
        panic!("流 0 应为视频");
    };
    assert_eq!(vp.pixel_format, PixelFormat::Yuv420p);

    let StreamParams::Audio(ref a0) = streams[1].params else {
        panic!("流 1 应为音频");
    };
    assert_eq!(streams[1].codec_id, CodecId::BinkAudioDct);
    assert_eq!(a0.sample_rate, 44100);
    assert_eq!(a0.channel_layout.channels, 2);
    assert_eq!(a0.track_id, 100);

    let StreamParams::Audio(ref a1) = streams[2].params else {
        panic!("流 2 应为音频");
    };
    assert_eq!(streams[2].codec_id, CodecId::BinkAudioRdft);
    assert_eq!(a1.sample_rate, 22050);
    assert_eq!(a1.channel_layout.channels, 1);
    assert_eq!(a1.track_id, 101);
}

#[test]
fn test_alpha_flag_selects_pixel_format() {
    let frames = [simple_frame(true, 0, 4)];
    let data = build_bik(b"BIK", b'i', 32, 32, 1 << 20, &[], &frames);
    let mut io = IoContext::from_memory(data);
    let mut dmx = BikDemuxer::new();
    dmx.open(&mut io).unwrap();
    let StreamParams::Video(ref vp) = dmx.streams()[0].params else {
        panic!("流 0 应为视频");
    };
    assert_eq!(vp.pixel_format, PixelFormat::Yuva420p);
}

#[test]
fn test_frame_slicing_audio_then_video() {
    let tracks = [(11025u16, 0u16)];
    let frames = [FrameDecl {
        keyframe: true,
        audio: vec![vec![0x11; 12]],
        video: vec![0x22; 20],
    }];
    let data = build_bik(b"BIK", b'h', 64, 48, 0, &tracks, &frames);
    let mut io = IoContext::from_memory(data);
    let mut dmx = BikDemuxer::new();
    dmx.open(&mut io).unwrap();

    // 音频包先于视频包
    let audio_pkt = dmx.read_packet(&mut io).unwrap();
    assert_eq!(audio_pkt.stream_index, 1);
    assert_eq!(audio_pkt.size(), 12);
    assert!(audio_pkt.data.iter().all(|&b| b == 0x11));

    let video_pkt = dmx.read_packet(&mut io).unwrap();
    assert_eq!(video_pkt.stream_index, 0);
    assert_eq!(video_pkt.size(), 20);
    assert!(video_pkt.is_keyframe);
    assert!(video_pkt.data.iter().all(|&b| b == 0x22));

    assert!(matches!(dmx.read_packet(&mut io), Err(YingError::Eof)));
}

#[test]
fn test_empty_audio_segment_yields_no_packet() {
    let tracks = [(11025u16, 0u16)];
    let frames = [simple_frame(true, 1, 6)];
    let data = build_bik(b"BIK", b'g', 64, 48, 0, &tracks, &frames);
    let mut io = IoContext::from_memory(data);
    let mut dmx = BikDemuxer::new();
    dmx.open(&mut io).unwrap();
    // 空音轨段只出视频包
    let pkt = dmx.read_packet(&mut io).unwrap();
    assert_eq!(pkt.stream_index, 0);
    assert_eq!(pkt.size(), 6);
}

#[test]
fn test_no_audio_tracks() {
    let frames = [simple_frame(true, 0, 4), simple_frame(false, 0, 4)];
    let data = build_bik(b"BIK", b'd', 16, 16, 0, &[], &frames);
    let mut io = IoContext::from_memory(data);
    let mut dmx = BikDemuxer::new();
    dmx.open(&mut io).unwrap();
    assert_eq!(dmx.streams().len(), 1);
    for pts in 0..2 {
        let pkt = dmx.read_packet(&mut io).unwrap();
        assert_eq!(pkt.stream_index, 0);
        assert_eq!(pkt.pts, pts);
    }
    assert!(matches!(dmx.read_packet(&mut io), Err(YingError::Eof)));
}

#[test]
fn test_unsupported_revisions_and_version2() {
    for (magic, revision) in [(b"BIK", b'b'), (b"BIK", b'e'), (b"KB2", b'a')] {
        let frames = [simple_frame(true, 0, 4)];
        let data = build_bik(magic, revision, 32, 32, 0, &[], &frames);
        let mut io = IoContext::from_memory(data);
        let mut dmx = BikDemuxer::new();
        dmx.open(&mut io).unwrap();
        let header = dmx.header().unwrap();
        assert_eq!(header.revision, revision);
        assert_eq!(header.version, if magic == b"KB2" { 2 } else { 1 });
        assert!(!header.is_supported());
        // 头部可见但不产出数据包
        assert!(!dmx.streams().is_empty());
        assert!(matches!(dmx.read_packet(&mut io), Err(YingError::Eof)));
    }
}

#[test]
fn test_seek_backs_to_keyframe() {
    let frames: Vec<FrameDecl> = (0..6)
        .map(|i| simple_frame(i == 0 || i == 4, 0, 4))
        .collect();
    let data = build_bik(b"BIK", b'g', 32, 32, 0, &[], &frames);
    let mut io = IoContext::from_memory(data);
    let mut dmx = BikDemuxer::new();
    dmx.open(&mut io).unwrap();

    // 目标帧 5 不是关键帧, 回退到帧 4
    dmx.seek(&mut io, 0, 5).unwrap();
    let pkt = dmx.read_packet(&mut io).unwrap();
    assert_eq!(pkt.pts, 4);
    assert!(pkt.is_keyframe);

    // 目标帧 2 回退到帧 0
    dmx.seek(&mut io, 0, 2).unwrap();
    let pkt = dmx.read_packet(&mut io).unwrap();
    assert_eq!(pkt.pts, 0);
}

#[test]
fn test_registry_probe_and_open() {
    let frames = [simple_frame(true, 0, 4)];
    let data = build_bik(b"BIK", b'g', 32, 32, 0, &[], &frames);

    let probe = BikProbe;
    assert_eq!(probe.probe(&data, None), Some(SCORE_MAX));

    let registry = ying::default_format_registry();
    let mut io = IoContext::from_memory(data);
    let dmx = registry.open_input(&mut io, Some("test.bik")).unwrap();
    assert_eq!(dmx.name(), "bik");
    assert_eq!(dmx.streams().len(), 1);
}

#[test]
fn test_frame_sizes_within_file_size() {
    let tracks = [(22050u16, 0x1000u16)];
    let frames = [
        FrameDecl {
            keyframe: true,
            audio: vec![vec![0; 32]],
            video: vec![0; 100],
        },
        FrameDecl {
            keyframe: false,
            audio: vec![vec![0; 16]],
            video: vec![0; 50],
        },
    ];
    let data = build_bik(b"BIK", b'f', 32, 32, 0, &tracks, &frames);
    let total = data.len() as u64;
    let mut io = IoContext::from_memory(data);
    let mut dmx = BikDemuxer::new();
    dmx.open(&mut io).unwrap();
    let header = dmx.header().unwrap();
    // 帧偏移表闭合: 帧大小之和 + 头部 <= 文件大小
    assert_eq!(header.file_size, total);
    let mut payload_total = 0u64;
    loop {
        match dmx.read_packet(&mut io) {
            Ok(pkt) => payload_total += pkt.size() as u64,
            Err(YingError::Eof) => break,
            Err(e) => panic!("读取失败: {e}"),
        }
    }
    assert!(payload_total < total);
}
