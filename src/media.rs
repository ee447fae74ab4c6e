//! Bink 文件的高层读取接口.
//!
//! 把解封装器与各流的解码器组合成 demux -> decode 管线:
//! 每次 `next_frame()` 产出一个视频帧与同帧期的各音轨子块,
//! 严格按编码顺序推进. `reset()` 回到文件开头重放,
//! 两次完整解码的输出逐位一致.

use log::debug;
use ying_codec::codec_parameters::{
    AudioCodecParams, CodecParameters, CodecParamsType, VideoCodecParams,
};
use ying_codec::frame::{AudioFrame, Frame, VideoFrame};
use ying_codec::{CodecId, Decoder};
use ying_core::{MediaType, YingError, YingResult};
use ying_format::demuxers::bik::{BikDemuxer, BikHeader};
use ying_format::io::IoContext;
use ying_format::stream::StreamParams;
use ying_format::Demuxer;

/// 一帧的完整解码结果: 视频帧与各音轨在本帧期内的子块
pub struct MediaFrame {
    /// 解码后的视频帧
    pub video: VideoFrame,
    /// 各音轨的子块, 下标与音轨顺序一致
    pub audio: Vec<Vec<AudioFrame>>,
}

/// Bink 文件读取器
///
/// 拥有字节源、解封装器与各流的解码器; 解码器的参考帧与重叠窗口
/// 在其生命周期内复用.
pub struct BikMedia {
    io: IoContext,
    demuxer: BikDemuxer,
    video_decoder: Box<dyn Decoder>,
    audio_decoders: Vec<Box<dyn Decoder>>,
    /// 已产出的帧数
    frames_read: u32,
}

impl BikMedia {
    /// 从文件路径打开
    pub fn open(path: &str) -> YingResult<Self> {
        let io = IoContext::open_read(path)?;
        Self::from_io(io)
    }

    /// 从内存数据打开
    pub fn open_memory(data: Vec<u8>) -> YingResult<Self> {
        Self::from_io(IoContext::from_memory(data))
    }

    /// 从任意字节源打开: 解析头部并创建所有解码器
    pub fn from_io(mut io: IoContext) -> YingResult<Self> {
        let mut demuxer = BikDemuxer::new();
        demuxer.open(&mut io)?;

        let mut video_decoder = None;
        let mut audio_decoders = Vec::new();
        for stream in demuxer.streams() {
            let params = CodecParameters {
                codec_id: stream.codec_id,
                extra_data: stream.extra_data.clone(),
                params: match &stream.params {
                    StreamParams::Video(v) => CodecParamsType::Video(VideoCodecParams {
                        width: v.width,
                        height: v.height,
                        pixel_format: v.pixel_format,
                        frame_rate: v.frame_rate,
                    }),
                    StreamParams::Audio(a) => CodecParamsType::Audio(AudioCodecParams {
                        sample_rate: a.sample_rate,
                        channel_layout: a.channel_layout,
                        sample_format: a.sample_format,
                    }),
                    StreamParams::Other => CodecParamsType::None,
                },
            };
            // 不支持的文件只暴露头部, 不创建解码器
            if !demuxer.header().map(BikHeader::is_supported).unwrap_or(false) {
                continue;
            }
            match stream.media_type {
                MediaType::Video => {
                    let mut dec =
                        ying_codec::decoders::binkvid::BinkVideoDecoder::create()?;
                    dec.open(&params)?;
                    video_decoder = Some(dec);
                }
                MediaType::Audio => {
                    let mut dec = match stream.codec_id {
                        CodecId::BinkAudioDct => {
                            ying_codec::decoders::binkaud::BinkAudioDecoder::create_dct()?
                        }
                        _ => ying_codec::decoders::binkaud::BinkAudioDecoder::create_rdft()?,
                    };
                    dec.open(&params)?;
                    audio_decoders.push(dec);
                }
                MediaType::Data => {}
            }
        }

        // 支持的文件必有视频流; 不支持的文件给一个占位解码器
        let video_decoder = match video_decoder {
            Some(dec) => dec,
            None => ying_codec::decoders::binkvid::BinkVideoDecoder::create()?,
        };

        Ok(Self {
            io,
            demuxer,
            video_decoder,
            audio_decoders,
            frames_read: 0,
        })
    }

    /// 已解析的文件头
    pub fn header(&self) -> Option<&BikHeader> {
        self.demuxer.header()
    }

    /// 文件是否受支持
    pub fn is_supported(&self) -> bool {
        self.header().map(BikHeader::is_supported).unwrap_or(false)
    }

    /// 流信息
    pub fn streams(&self) -> &[ying_format::Stream] {
        self.demuxer.streams()
    }

    /// 解码下一帧
    ///
    /// # 返回
    /// - `Ok(Some(frame))`: 解出一帧
    /// - `Ok(None)`: 没有更多帧 (文件结束或不支持的格式)
    pub fn next_frame(&mut self) -> YingResult<Option<MediaFrame>> {
        let mut video = None;
        let mut audio: Vec<Vec<AudioFrame>> = vec![Vec::new(); self.audio_decoders.len()];
        // 一帧的数据包序列: 各音轨在前, 视频在后
        loop {
            let pkt = match self.demuxer.read_packet(&mut self.io) {
                Ok(pkt) => pkt,
                Err(YingError::Eof) => return Ok(None),
                Err(e) => return Err(e),
            };
            if pkt.stream_index == 0 {
                self.video_decoder.send_packet(&pkt)?;
                if let Frame::Video(f) = self.video_decoder.receive_frame()? {
                    video = Some(f);
                }
                break;
            }
            let track = pkt.stream_index - 1;
            let dec = self.audio_decoders.get_mut(track).ok_or_else(|| {
                YingError::StreamNotFound(pkt.stream_index)
            })?;
            dec.send_packet(&pkt)?;
            loop {
                match dec.receive_frame() {
                    Ok(Frame::Audio(f)) => audio[track].push(f),
                    Ok(Frame::Video(_)) => {
                        return Err(YingError::Internal("音频流解出视频帧".into()));
                    }
                    Err(YingError::NeedMoreData) => break,
                    Err(e) => return Err(e),
                }
            }
        }
        let video = video.ok_or_else(|| YingError::Internal("帧内缺少视频载荷".into()))?;
        self.frames_read += 1;
        Ok(Some(MediaFrame { video, audio }))
    }

    /// 解码并丢弃下一帧 (用于向前跳帧)
    pub fn skip_frame(&mut self) -> YingResult<bool> {
        Ok(self.next_frame()?.is_some())
    }

    /// 回到文件开头
    ///
    /// 清空解码器的参考帧与重叠窗口, 重放可得到逐位一致的输出.
    pub fn reset(&mut self) -> YingResult<()> {
        self.demuxer.seek(&mut self.io, 0, 0)?;
        self.video_decoder.flush();
        for dec in self.audio_decoders.iter_mut() {
            dec.flush();
        }
        self.frames_read = 0;
        debug!("BikMedia: 已重置到文件开头");
        Ok(())
    }

    /// 已产出的帧数
    pub fn frames_read(&self) -> u32 {
        self.frames_read
    }
}
