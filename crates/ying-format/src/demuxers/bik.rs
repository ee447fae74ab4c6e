//! Bink 容器解封装器.
//!
//! Bink 文件由 44 字节固定头、音轨表、帧偏移表与逐帧数据组成,
//! 全部为小端. 每帧内先是各音轨的数据段 (u32 长度 + u32 采样数 +
//! 载荷), 其余字节是视频载荷. 帧偏移的最低位标记关键帧.
//!
//! 支持的格式为 Bink 1 修订版 'd'/'f'/'g'/'h'/'i'. 其余修订版与
//! Bink 2 的头部仍可解析 (流信息可见), 但不产出任何数据包.

use std::collections::VecDeque;
use std::io::SeekFrom;

use log::{debug, warn};
use ying_codec::{CodecId, Packet};
use ying_core::{
    ChannelLayout, MediaType, PixelFormat, Rational, SampleFormat, YingError, YingResult,
};

use crate::demuxer::Demuxer;
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::{FormatProbe, ProbeScore, SCORE_EXTENSION, SCORE_MAX};
use crate::stream::{AudioStreamParams, Stream, StreamParams, VideoStreamParams};

/// 魔数低 24 位: "BIK"
const MAGIC_BIK: u32 = 0x004B_4942;
/// 魔数低 24 位: "KB2"
const MAGIC_KB2: u32 = 0x0032_424B;

/// 音轨标志: DCT 编码
const AUDIO_FLAG_DCT: u16 = 0x1000;
/// 音轨标志: 立体声
const AUDIO_FLAG_STEREO: u16 = 0x2000;

/// 视频标志: 带 alpha 平面
const VIDEO_FLAG_ALPHA: u32 = 1 << 20;
/// 视频标志: 灰度
const VIDEO_FLAG_GRAY: u32 = 1 << 17;

/// 已解析的 Bink 文件头
#[derive(Debug, Clone)]
pub struct BikHeader {
    /// 主版本: 1 (BIK) 或 2 (KB2)
    pub version: u8,
    /// 修订版字节 (ASCII 'b'..'k')
    pub revision: u8,
    /// 文件总大小 (头部声明值 + 8)
    pub file_size: u64,
    /// 帧数
    pub num_frames: u32,
    /// 最大帧的字节数
    pub largest_frame_size: u32,
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 帧率
    pub fps: Rational,
    /// 视频标志位
    pub video_flags: u32,
    /// 音轨数量
    pub num_audio_tracks: u32,
}

impl BikHeader {
    /// 本解码器是否支持此文件
    ///
    /// 修订版 'b' 与 'e' 以及 Bink 2 都不支持.
    pub fn is_supported(&self) -> bool {
        self.version == 1 && matches!(self.revision, b'd' | b'f' | b'g' | b'h' | b'i')
    }

    /// 头部声明的缩放模式 (0-15)
    pub fn scaling(&self) -> u8 {
        ((self.video_flags >> 28) & 0xF) as u8
    }
}

/// 音轨记录
struct AudioTrack {
    /// 对应的流索引
    stream_index: usize,
}

/// Bink 解封装器
pub struct BikDemuxer {
    header: Option<BikHeader>,
    streams: Vec<Stream>,
    audio_tracks: Vec<AudioTrack>,
    /// 帧偏移表原始值 (最低位为关键帧标记), 共 num_frames + 1 项
    frame_offsets: Vec<u32>,
    /// 下一个要读取的帧
    cur_frame: usize,
    /// 本帧拆出的数据包队列 (音频在前, 视频在后)
    queued: VecDeque<Packet>,
}

impl BikDemuxer {
    pub fn create() -> YingResult<Box<dyn Demuxer>> {
        Ok(Box::new(Self::new()))
    }

    pub fn new() -> Self {
        Self {
            header: None,
            streams: Vec::new(),
            audio_tracks: Vec::new(),
            frame_offsets: Vec::new(),
            cur_frame: 0,
            queued: VecDeque::new(),
        }
    }

    /// 获取已解析的文件头
    pub fn header(&self) -> Option<&BikHeader> {
        self.header.as_ref()
    }

    /// 帧是否为关键帧
    pub fn is_keyframe(&self, frame: usize) -> bool {
        self.frame_offsets
            .get(frame)
            .map(|&off| off & 1 != 0)
            .unwrap_or(false)
    }

    /// 读取一帧并把各流的数据包压入队列
    fn read_frame(&mut self, io: &mut IoContext) -> YingResult<()> {
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| YingError::Internal("解封装器尚未打开".into()))?;
        let fps = header.fps;
        let frame = self.cur_frame;
        let offset = u64::from(self.frame_offsets[frame] & !1);
        let end = u64::from(self.frame_offsets[frame + 1] & !1);
        if end <= offset {
            return Err(YingError::InvalidData(format!(
                "帧 {frame} 的偏移表不单调"
            )));
        }
        let mut payload_size = (end - offset) as usize;
        io.seek(SeekFrom::Start(offset))?;

        let time_base = Rational::new(fps.den, fps.num);
        let is_keyframe = self.is_keyframe(frame);

        for track in self.audio_tracks.iter() {
            if payload_size < 4 {
                return Err(YingError::InvalidData(format!(
                    "帧 {frame} 小于音轨段头"
                )));
            }
            let track_size = io.read_u32_le()? as usize;
            payload_size -= 4;
            if payload_size < track_size {
                return Err(YingError::InvalidData(format!(
                    "帧 {frame} 的音轨段长度越界: {track_size}"
                )));
            }
            payload_size -= track_size;
            if track_size > 3 {
                // 段内先是解码后的采样字节数, 其后为压缩载荷
                let _num_samples = io.read_u32_le()?;
                let payload = io.read_bytes(track_size - 4)?;
                if !payload.is_empty() {
                    let mut pkt = Packet::from_data(payload);
                    pkt.stream_index = track.stream_index;
                    pkt.pts = frame as i64;
                    pkt.time_base = time_base;
                    pkt.is_keyframe = true;
                    pkt.pos = offset as i64;
                    self.queued.push_back(pkt);
                }
            } else if track_size > 0 {
                io.skip(track_size)?;
            }
        }

        let video_payload = io.read_bytes(payload_size)?;
        let mut pkt = Packet::from_data(video_payload);
        pkt.stream_index = 0;
        pkt.pts = frame as i64;
        pkt.duration = 1;
        pkt.time_base = time_base;
        pkt.is_keyframe = is_keyframe;
        pkt.pos = offset as i64;
        self.queued.push_back(pkt);

        self.cur_frame += 1;
        Ok(())
    }
}

impl Default for BikDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl Demuxer for BikDemuxer {
    fn format_id(&self) -> FormatId {
        FormatId::Bik
    }

    fn name(&self) -> &str {
        "bik"
    }

    fn open(&mut self, io: &mut IoContext) -> YingResult<()> {
        // 固定头: 11 个小端 u32
        let word0 = io.read_u32_le()?;
        let version = match word0 & 0x00FF_FFFF {
            MAGIC_BIK => 1u8,
            MAGIC_KB2 => 2u8,
            _ => {
                return Err(YingError::InvalidData("不是 Bink 文件 (魔数不匹配)".into()));
            }
        };
        let revision = (word0 >> 24) as u8;
        let file_size = u64::from(io.read_u32_le()?) + 8;
        let num_frames = io.read_u32_le()?;
        let largest_frame_size = io.read_u32_le()?;
        let _unused = io.read_u32_le()?;
        let width = io.read_u32_le()?;
        let height = io.read_u32_le()?;
        let fps_num = io.read_u32_le()?;
        let fps_den = io.read_u32_le()?;
        let video_flags = io.read_u32_le()?;
        let num_audio_tracks = io.read_u32_le()?;

        if width == 0 || height == 0 || width > 7680 || height > 4800 {
            return Err(YingError::InvalidData(format!(
                "画面尺寸非法: {width}x{height}"
            )));
        }
        if num_frames == 0 || fps_num == 0 || fps_den == 0 {
            return Err(YingError::InvalidData("帧数或帧率非法".into()));
        }
        if num_audio_tracks >= 256 {
            return Err(YingError::InvalidData(format!(
                "音轨数量非法: {num_audio_tracks}"
            )));
        }

        let header = BikHeader {
            version,
            revision,
            file_size,
            num_frames,
            largest_frame_size,
            width,
            height,
            fps: Rational::new(fps_num as i32, fps_den as i32),
            video_flags,
            num_audio_tracks,
        };

        // 视频流
        let has_alpha = video_flags & VIDEO_FLAG_ALPHA != 0;
        let is_gray = video_flags & VIDEO_FLAG_GRAY != 0;
        let pixel_format = if has_alpha {
            PixelFormat::Yuva420p
        } else if is_gray {
            PixelFormat::Gray8
        } else {
            PixelFormat::Yuv420p
        };
        let time_base = Rational::new(fps_den as i32, fps_num as i32);
        let mut extra = word0.to_le_bytes().to_vec();
        extra.extend_from_slice(&video_flags.to_le_bytes());
        self.streams.push(Stream {
            index: 0,
            media_type: MediaType::Video,
            codec_id: CodecId::BinkVideo,
            time_base,
            duration: i64::from(num_frames),
            nb_frames: u64::from(num_frames),
            extra_data: extra,
            params: StreamParams::Video(VideoStreamParams {
                width,
                height,
                pixel_format,
                frame_rate: header.fps,
            }),
        });

        // 音轨表: 先跳过每轨的最大输出帧大小, 再读采样率/标志, 最后是音轨 ID
        let n = num_audio_tracks as usize;
        io.skip(n * 4)?;
        let mut rates = Vec::with_capacity(n);
        for _ in 0..n {
            let rate = io.read_u16_le()?;
            let flags = io.read_u16_le()?;
            rates.push((rate, flags));
        }
        for (i, &(rate, flags)) in rates.iter().enumerate() {
            let track_id = io.read_u32_le()?;
            let channels = if flags & AUDIO_FLAG_STEREO != 0 { 2 } else { 1 };
            let codec_id = if flags & AUDIO_FLAG_DCT != 0 {
                CodecId::BinkAudioDct
            } else {
                CodecId::BinkAudioRdft
            };
            if rate == 0 {
                warn!("bik: 音轨 {i} 采样率为 0");
            }
            let stream_index = self.streams.len();
            self.streams.push(Stream {
                index: stream_index,
                media_type: MediaType::Audio,
                codec_id,
                time_base,
                duration: i64::from(num_frames),
                nb_frames: 0,
                extra_data: vec![revision],
                params: StreamParams::Audio(AudioStreamParams {
                    sample_rate: u32::from(rate),
                    channel_layout: ChannelLayout::from_channels(channels),
                    sample_format: SampleFormat::F32p,
                    track_id,
                }),
            });
            self.audio_tracks.push(AudioTrack { stream_index });
        }

        // 帧偏移表: num_frames + 1 项, 末项为结束偏移
        self.frame_offsets = Vec::with_capacity(num_frames as usize + 1);
        for _ in 0..=num_frames {
            self.frame_offsets.push(io.read_u32_le()?);
        }

        debug!(
            "bik: {}x{} @ {}, {} 帧, {} 音轨, 修订版 '{}', 支持 = {}",
            width,
            height,
            header.fps,
            num_frames,
            num_audio_tracks,
            revision as char,
            header.is_supported()
        );
        if !header.is_supported() {
            warn!(
                "bik: 不支持的格式 (版本 {}, 修订版 '{}'), 仅提供头部信息",
                version, revision as char
            );
        }
        self.header = Some(header);
        self.cur_frame = 0;
        Ok(())
    }

    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn read_packet(&mut self, io: &mut IoContext) -> YingResult<Packet> {
        if let Some(pkt) = self.queued.pop_front() {
            return Ok(pkt);
        }
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| YingError::Internal("解封装器尚未打开".into()))?;
        // 不支持的文件不产出数据包
        if !header.is_supported() {
            return Err(YingError::Eof);
        }
        if self.cur_frame >= header.num_frames as usize {
            return Err(YingError::Eof);
        }
        self.read_frame(io)?;
        self.queued
            .pop_front()
            .ok_or_else(|| YingError::Internal("帧拆分未产出数据包".into()))
    }

    fn seek(&mut self, io: &mut IoContext, stream_index: usize, timestamp: i64) -> YingResult<()> {
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| YingError::Internal("解封装器尚未打开".into()))?;
        if stream_index >= self.streams.len() {
            return Err(YingError::StreamNotFound(stream_index));
        }
        let target = timestamp.clamp(0, i64::from(header.num_frames) - 1) as usize;
        // 向前回退到最近的关键帧
        let mut frame = target;
        while frame > 0 && !self.is_keyframe(frame) {
            frame -= 1;
        }
        let offset = u64::from(self.frame_offsets[frame] & !1);
        io.seek(SeekFrom::Start(offset))?;
        self.cur_frame = frame;
        self.queued.clear();
        debug!("bik: seek 到帧 {frame} (目标 {target})");
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        let header = self.header.as_ref()?;
        let fps = header.fps.to_f64();
        if fps.is_finite() && fps > 0.0 {
            Some(f64::from(header.num_frames) / fps)
        } else {
            None
        }
    }
}

/// Bink 格式探测器
pub struct BikProbe;

impl FormatProbe for BikProbe {
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
        if data.len() >= 4 {
            let word0 = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            let magic = word0 & 0x00FF_FFFF;
            let revision = (word0 >> 24) as u8;
            if (magic == MAGIC_BIK || magic == MAGIC_KB2) && revision.is_ascii_lowercase() {
                return Some(SCORE_MAX);
            }
        }
        let name = filename?;
        if FormatId::from_filename(name) == Some(FormatId::Bik) {
            return Some(SCORE_EXTENSION);
        }
        None
    }

    fn format_id(&self) -> FormatId {
        FormatId::Bik
    }
}
