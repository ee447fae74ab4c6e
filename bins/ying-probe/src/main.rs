//! ying-probe - Bink 文件信息探测工具
//!
//! 分析 Bink 文件的头部与流信息, 可选做一次完整解码统计.

use clap::Parser;
use serde::Serialize;
use std::process;

use ying::media::BikMedia;
use ying_core::MediaType;
use ying_format::stream::{AudioStreamParams, StreamParams, VideoStreamParams};

/// Ying Bink 文件探测工具
#[derive(Parser, Debug)]
#[command(name = "ying-probe", version, about = "纯 Rust Bink 文件探测工具")]
struct Cli {
    /// 输入文件路径
    input: Option<String>,

    /// 显示流信息
    #[arg(long, default_value_t = true)]
    show_streams: bool,

    /// 完整解码所有帧并统计 (较慢)
    #[arg(long)]
    decode: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 静默模式 (只输出探测结果)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize)]
struct ProbeOutput {
    format: FormatInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    streams: Option<Vec<StreamInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decode: Option<DecodeSummary>,
}

/// 格式信息
#[derive(Serialize)]
struct FormatInfo {
    filename: String,
    version: u8,
    revision: String,
    supported: bool,
    num_frames: u32,
    file_size: u64,
    largest_frame_size: u32,
    scaling: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
}

/// 流信息
#[derive(Serialize)]
struct StreamInfo {
    index: usize,
    codec_type: String,
    codec_name: String,
    // 视频字段
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pixel_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_rate: Option<String>,
    // 音频字段
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    track_id: Option<u32>,
}

/// 解码统计
#[derive(Serialize)]
struct DecodeSummary {
    video_frames: u64,
    audio_blocks: u64,
    audio_samples: u64,
    /// 亮度平面逐字节求和的校验值
    luma_checksum: u64,
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let Some(input_path) = cli.input.as_ref() else {
        print_banner();
        return;
    };

    if !cli.quiet {
        eprintln!(
            "ying-probe 版本 {} -- 纯 Rust Bink 探测工具",
            env!("CARGO_PKG_VERSION")
        );
        eprintln!("输入文件: {input_path}");
    }

    let mut media = match BikMedia::open(input_path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("错误: 无法打开文件 '{input_path}': {e}");
            process::exit(1);
        }
    };

    let Some(header) = media.header().cloned() else {
        eprintln!("错误: 未解析出文件头");
        process::exit(1);
    };

    let format_info = FormatInfo {
        filename: input_path.clone(),
        version: header.version,
        revision: (header.revision as char).to_string(),
        supported: header.is_supported(),
        num_frames: header.num_frames,
        file_size: header.file_size,
        largest_frame_size: header.largest_frame_size,
        scaling: header.scaling(),
        duration: {
            let fps = header.fps.to_f64();
            if fps.is_finite() && fps > 0.0 {
                Some(f64::from(header.num_frames) / fps)
            } else {
                None
            }
        },
    };

    let streams_info = if cli.show_streams {
        Some(
            media
                .streams()
                .iter()
                .map(build_stream_info)
                .collect::<Vec<_>>(),
        )
    } else {
        None
    };

    let decode_summary = if cli.decode {
        Some(run_decode(&mut media))
    } else {
        None
    };

    if cli.json {
        let output = ProbeOutput {
            format: format_info,
            streams: streams_info,
            decode: decode_summary,
        };
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("错误: JSON 序列化失败: {e}");
                process::exit(1);
            }
        }
    } else {
        print_format_text(&format_info);
        if let Some(ref streams) = streams_info {
            print_streams_text(streams);
        }
        if let Some(ref summary) = decode_summary {
            print_decode_text(summary);
        }
    }
}

/// 完整解码所有帧, 统计输出
fn run_decode(media: &mut BikMedia) -> DecodeSummary {
    let mut summary = DecodeSummary {
        video_frames: 0,
        audio_blocks: 0,
        audio_samples: 0,
        luma_checksum: 0,
    };
    loop {
        match media.next_frame() {
            Ok(Some(frame)) => {
                summary.video_frames += 1;
                summary.luma_checksum = summary.luma_checksum.wrapping_add(
                    frame.video.data[0]
                        .iter()
                        .map(|&p| u64::from(p))
                        .sum::<u64>(),
                );
                for track in frame.audio.iter() {
                    for block in track.iter() {
                        summary.audio_blocks += 1;
                        summary.audio_samples += u64::from(block.nb_samples);
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("警告: 解码中断: {e}");
                break;
            }
        }
    }
    summary
}

/// 从 Stream 构建 StreamInfo
fn build_stream_info(stream: &ying_format::Stream) -> StreamInfo {
    let codec_type = match stream.media_type {
        MediaType::Video => "video",
        MediaType::Audio => "audio",
        MediaType::Data => "data",
    }
    .to_string();

    let mut info = StreamInfo {
        index: stream.index,
        codec_type,
        codec_name: format!("{}", stream.codec_id),
        width: None,
        height: None,
        pixel_format: None,
        frame_rate: None,
        sample_rate: None,
        channels: None,
        track_id: None,
    };

    match &stream.params {
        StreamParams::Video(VideoStreamParams {
            width,
            height,
            pixel_format,
            frame_rate,
        }) => {
            info.width = Some(*width);
            info.height = Some(*height);
            info.pixel_format = Some(format!("{pixel_format}"));
            if frame_rate.is_valid() {
                info.frame_rate = Some(format!("{}/{}", frame_rate.num, frame_rate.den));
            }
        }
        StreamParams::Audio(AudioStreamParams {
            sample_rate,
            channel_layout,
            track_id,
            ..
        }) => {
            info.sample_rate = Some(*sample_rate);
            info.channels = Some(channel_layout.channels);
            info.track_id = Some(*track_id);
        }
        _ => {}
    }

    info
}

/// 文本输出: 格式信息
fn print_format_text(info: &FormatInfo) {
    println!("[FORMAT]");
    println!("  文件名       : {}", info.filename);
    println!("  格式         : Bink 版本 {} 修订版 '{}'", info.version, info.revision);
    println!("  是否支持     : {}", if info.supported { "是" } else { "否" });
    println!("  帧数         : {}", info.num_frames);
    println!("  文件大小     : {} 字节", info.file_size);
    println!("  最大帧       : {} 字节", info.largest_frame_size);
    if info.scaling != 0 {
        println!("  缩放模式     : {}", info.scaling);
    }
    if let Some(dur) = info.duration {
        println!("  时长         : {dur:.3} 秒");
    }
    println!("[/FORMAT]");
    println!();
}

/// 文本输出: 流信息
fn print_streams_text(streams: &[StreamInfo]) {
    for stream in streams {
        println!("[STREAM #{}]", stream.index);
        println!("  类型         : {}", stream.codec_type);
        println!("  编解码器     : {}", stream.codec_name);
        if let (Some(w), Some(h)) = (stream.width, stream.height) {
            println!("  分辨率       : {w}x{h}");
        }
        if let Some(ref pf) = stream.pixel_format {
            println!("  像素格式     : {pf}");
        }
        if let Some(ref fr) = stream.frame_rate {
            println!("  帧率         : {fr}");
        }
        if let Some(sr) = stream.sample_rate {
            println!("  采样率       : {sr} Hz");
        }
        if let Some(ch) = stream.channels {
            println!("  声道数       : {ch}");
        }
        if let Some(id) = stream.track_id {
            println!("  音轨 ID      : {id}");
        }
        println!("[/STREAM]");
        println!();
    }
}

/// 文本输出: 解码统计
fn print_decode_text(summary: &DecodeSummary) {
    println!("[DECODE]");
    println!("  视频帧       : {}", summary.video_frames);
    println!("  音频子块     : {}", summary.audio_blocks);
    println!("  音频采样     : {}", summary.audio_samples);
    println!("  亮度校验值   : {:#x}", summary.luma_checksum);
    println!("[/DECODE]");
}

/// 打印版本横幅
fn print_banner() {
    println!(
        "ying-probe 版本 {} -- 纯 Rust Bink 探测工具",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("用法: ying-probe [选项] <输入文件>");
    println!();
    println!("选项:");
    println!("  --show-streams    显示流信息 (默认开启)");
    println!("  --decode          完整解码所有帧并统计");
    println!("  --json            以 JSON 格式输出");
    println!("  -q, --quiet       静默模式");
    println!();
    println!("使用 --help 查看完整用法.");
}
