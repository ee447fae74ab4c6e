//! Ying 解码核心路径的性能基准测试.
//!
//! 覆盖比特流读取与完整的 demux -> decode 帧管线.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ying::media::BikMedia;
use ying_core::bitreader::BitReader;
use ying_core::bitwriter::BitWriter;

/// 构造一个全 FILL 的 16x16 单帧 .bik 文件
fn make_fill_file() -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(0, 32);
    for _ in 0..23 {
        bw.write_bits(0, 4);
    }
    let btype_row = |bw: &mut BitWriter, count: u32| {
        bw.write_bits(count, 10);
        bw.write_bit(true);
        bw.write_bits(6, 4);
    };
    let colors_row = |bw: &mut BitWriter, vals: &[u8]| {
        bw.write_bits(vals.len() as u32, 10);
        bw.write_bit(false);
        for &v in vals {
            bw.write_bits(u32::from(v >> 4), 4);
            bw.write_bits(u32::from(v & 0xF), 4);
        }
    };
    btype_row(&mut bw, 2);
    bw.write_bits(0, 10);
    colors_row(&mut bw, &[128, 128]);
    for _ in 0..6 {
        bw.write_bits(0, 10);
    }
    btype_row(&mut bw, 2);
    colors_row(&mut bw, &[128, 128]);
    bw.align32();
    for _ in 0..2 {
        for _ in 0..23 {
            bw.write_bits(0, 4);
        }
        btype_row(&mut bw, 1);
        bw.write_bits(0, 10);
        colors_row(&mut bw, &[128]);
        for _ in 0..6 {
            bw.write_bits(0, 10);
        }
        bw.align32();
    }
    let payload = bw.finish();

    let header_size = 44 + 8;
    let total = header_size + payload.len();
    let mut data = Vec::new();
    data.extend_from_slice(b"BIKg");
    data.extend_from_slice(&((total - 8) as u32).to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(&30u32.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&((header_size as u32) | 1).to_le_bytes());
    data.extend_from_slice(&(total as u32).to_le_bytes());
    data.extend_from_slice(&payload);
    data
}

fn bench_bitreader(c: &mut Criterion) {
    let data: Vec<u8> = (0..4096).map(|i| (i % 251) as u8).collect();
    c.bench_function("bitreader_read_mixed_widths", |b| {
        b.iter(|| {
            let mut br = BitReader::new(black_box(&data));
            let mut acc = 0u64;
            while br.bits_left() >= 17 {
                acc = acc.wrapping_add(u64::from(br.read_bits(3)));
                acc = acc.wrapping_add(u64::from(br.read_bits(14)));
            }
            acc
        });
    });
}

fn bench_decode_frame(c: &mut Criterion) {
    let file = make_fill_file();
    c.bench_function("bik_decode_fill_frame_16x16", |b| {
        b.iter(|| {
            let mut media = BikMedia::open_memory(black_box(file.clone())).unwrap();
            let frame = media.next_frame().unwrap().unwrap();
            black_box(frame.video.data[0][0])
        });
    });
}

criterion_group!(benches, bench_bitreader, bench_decode_frame);
criterion_main!(benches);
