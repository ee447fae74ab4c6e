//! Bink 视频解码端到端测试.
//!
//! 在内存中构造带真实视频载荷的 .bik 文件, 通过 `BikMedia` 管线
//! 驱动解封装与解码, 验证帧内容、平面布局、SKIP 帧同一性与
//! reset 重放的逐位一致性.

use ying::media::BikMedia;
use ying_core::bitwriter::BitWriter;

/// FILL 块类型
const FILL: u32 = 6;
/// SKIP 块类型
const SKIP: u32 = 0;

// ========================
// 辅助函数: 构造载荷与文件
// ========================

/// 16x16 画面的帧载荷构造器 (修订版 'g': 平面组前跳过 32 位,
/// U/V 槽位互换; 各参数流行长度位宽均为 10)
struct PayloadBuilder {
    bw: BitWriter,
}

impl PayloadBuilder {
    fn new() -> Self {
        let mut bw = BitWriter::new();
        bw.write_bits(0, 32);
        Self { bw }
    }

    fn plane_descs(&mut self) {
        for _ in 0..23 {
            self.bw.write_bits(0, 4);
        }
    }

    fn row_len(&mut self, count: u32) {
        self.bw.write_bits(count, 10);
    }

    fn btype_row_repeat(&mut self, count: u32, btype: u32) {
        self.row_len(count);
        self.bw.write_bit(true);
        self.bw.write_bits(btype, 4);
    }

    fn colors_row(&mut self, values: &[u8]) {
        self.row_len(values.len() as u32);
        self.bw.write_bit(false);
        for &v in values {
            self.bw.write_bits(u32::from(v >> 4), 4);
            self.bw.write_bits(u32::from(v & 0xF), 4);
        }
    }

    fn row_exhausted(&mut self) {
        self.row_len(0);
    }

    fn finish(mut self) -> Vec<u8> {
        self.bw.align32();
        self.bw.finish()
    }
}

/// 全 FILL 的 16x16 帧载荷
fn fill_payload(y: u8, u: u8, v: u8) -> Vec<u8> {
    let mut pb = PayloadBuilder::new();
    // Y 平面: 2x2 块
    pb.plane_descs();
    pb.btype_row_repeat(2, FILL);
    pb.row_exhausted(); // 子块类型
    pb.colors_row(&[y, y]);
    for _ in 0..6 {
        pb.row_exhausted(); // 图案 / 位移 / DC / 游程
    }
    pb.btype_row_repeat(2, FILL);
    pb.colors_row(&[y, y]);
    pb.bw.align32();
    // 修订版 > 'c': 先写 V 平面数据 (落入 U 槽位), 再写 U
    for &c in &[v, u] {
        pb.plane_descs();
        pb.btype_row_repeat(1, FILL);
        pb.row_exhausted();
        pb.colors_row(&[c]);
        for _ in 0..6 {
            pb.row_exhausted();
        }
        pb.bw.align32();
    }
    pb.finish()
}

/// 全 SKIP 的 16x16 帧载荷
fn skip_payload() -> Vec<u8> {
    let mut pb = PayloadBuilder::new();
    pb.plane_descs();
    pb.btype_row_repeat(2, SKIP);
    for _ in 0..8 {
        pb.row_exhausted();
    }
    pb.btype_row_repeat(2, SKIP);
    pb.bw.align32();
    for _ in 0..2 {
        pb.plane_descs();
        pb.btype_row_repeat(1, SKIP);
        for _ in 0..8 {
            pb.row_exhausted();
        }
        pb.bw.align32();
    }
    pb.finish()
}

/// 把若干帧载荷封装成 16x16 修订版 'g' 的 .bik 文件
fn build_bik_video(frames: &[Vec<u8>]) -> Vec<u8> {
    let header_size = 44 + 4 * (frames.len() + 1);
    let total: usize = header_size + frames.iter().map(Vec::len).sum::<usize>();
    let mut data = Vec::new();
    data.extend_from_slice(b"BIKg");
    data.extend_from_slice(&((total - 8) as u32).to_le_bytes());
    data.extend_from_slice(&(frames.len() as u32).to_le_bytes());
    let largest = frames.iter().map(Vec::len).max().unwrap_or(0) as u32;
    data.extend_from_slice(&largest.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&16u32.to_le_bytes()); // width
    data.extend_from_slice(&16u32.to_le_bytes()); // height
    data.extend_from_slice(&30u32.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes()); // video flags
    data.extend_from_slice(&0u32.to_le_bytes()); // 无音轨
    let mut pos = header_size as u32;
    for (i, frame) in frames.iter().enumerate() {
        // 第一帧标记为关键帧
        let raw = if i == 0 { pos | 1 } else { pos };
        data.extend_from_slice(&raw.to_le_bytes());
        pos += frame.len() as u32;
    }
    data.extend_from_slice(&pos.to_le_bytes());
    for frame in frames {
        data.extend_from_slice(frame);
    }
    data
}

// ========================
// 测试
// ========================

#[test]
fn test_decode_fill_frame_end_to_end() {
    let file = build_bik_video(&[fill_payload(120, 60, 200)]);
    let mut media = BikMedia::open_memory(file).unwrap();
    assert!(media.is_supported());

    let frame = media.next_frame().unwrap().expect("应解出一帧");
    let video = &frame.video;
    assert_eq!(video.width, 16);
    assert_eq!(video.height, 16);
    // 平面总大小 = W·H + 2·⌈W/2⌉·⌈H/2⌉
    assert_eq!(video.total_size(), 16 * 16 + 2 * 8 * 8);
    assert!(video.data[0].iter().all(|&p| p == 120));
    assert!(video.data[1].iter().all(|&p| p == 60));
    assert!(video.data[2].iter().all(|&p| p == 200));
    assert!(video.is_keyframe);
    assert!(frame.audio.is_empty());

    // 帧数耗尽后返回终止
    assert!(media.next_frame().unwrap().is_none());
    assert_eq!(media.frames_read(), 1);
}

#[test]
fn test_skip_frame_equals_previous() {
    let file = build_bik_video(&[fill_payload(33, 66, 99), skip_payload()]);
    let mut media = BikMedia::open_memory(file).unwrap();
    let first = media.next_frame().unwrap().unwrap();
    let second = media.next_frame().unwrap().unwrap();
    // 全 SKIP 帧与上一帧逐位一致
    assert_eq!(first.video.data, second.video.data);
    assert!(media.next_frame().unwrap().is_none());
}

#[test]
fn test_frame_count_matches_header() {
    let frames: Vec<Vec<u8>> = (0..5)
        .map(|i| {
            if i == 0 {
                fill_payload(10, 20, 30)
            } else {
                skip_payload()
            }
        })
        .collect();
    let file = build_bik_video(&frames);
    let mut media = BikMedia::open_memory(file).unwrap();
    assert_eq!(media.header().unwrap().num_frames, 5);
    let mut count = 0;
    while media.next_frame().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 5);
    // 第 num_frames + 1 次调用仍为终止
    assert!(media.next_frame().unwrap().is_none());
}

#[test]
fn test_reset_and_replay_is_bit_exact() {
    let file = build_bik_video(&[
        fill_payload(50, 100, 150),
        skip_payload(),
        fill_payload(200, 10, 20),
    ]);
    let mut media = BikMedia::open_memory(file).unwrap();

    let mut first_pass = Vec::new();
    while let Some(frame) = media.next_frame().unwrap() {
        first_pass.push(frame.video.data);
    }
    assert_eq!(first_pass.len(), 3);

    media.reset().unwrap();

    let mut second_pass = Vec::new();
    while let Some(frame) = media.next_frame().unwrap() {
        second_pass.push(frame.video.data);
    }
    // 两次完整解码逐位一致
    assert_eq!(first_pass, second_pass);
}

#[test]
fn test_unsupported_file_yields_terminal() {
    let mut file = build_bik_video(&[fill_payload(1, 2, 3)]);
    // 把修订版改成 'e' (不支持)
    file[3] = b'e';
    let mut media = BikMedia::open_memory(file).unwrap();
    assert!(!media.is_supported());
    assert_eq!(media.header().unwrap().revision, b'e');
    // 头部可读, 帧产出立即终止
    assert!(media.next_frame().unwrap().is_none());
}
