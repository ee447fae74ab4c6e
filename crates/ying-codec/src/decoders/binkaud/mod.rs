//! Bink 音频解码器
//!
//! Bink 音轨有两种编码: 带窗重叠的 DCT 块与声道交错的 RDFT 块.
//! 每个数据包由若干子块组成, 逐子块解码:
//!
//! 1. 每个内部声道读两个 29 位浮点 (频谱首两项), 再读各临界频带的
//!    量化器下标, 然后按游程分段读出带量化的频谱系数.
//! 2. 对系数做逆变换 (IDCT-III 或 IRDFT) 得到时域样本.
//! 3. 与上一子块的重叠窗口做线性混合 (每块的后 1/16 留作下一块的窗口);
//!    每轨的第一个子块跳过混合.
//! 4. RDFT 立体声在单一内部声道中交错, 输出前拆分.
//! 5. 子块之间码流对齐到 32 位边界.
//!
//! ## 模块结构
//!
//! - `data`: 临界频带与游程长度常量
//! - `dct`: 逆 DCT-III (Lee 递归)
//! - `rdft`: 逆实数 DFT 与基-2 FFT

mod data;
mod dct;
mod rdft;

use std::collections::VecDeque;

use log::debug;
use ying_core::bitreader::BitReader;
use ying_core::{ChannelLayout, Rational, SampleFormat, YingError, YingResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::{CodecParameters, CodecParamsType};
use crate::decoder::Decoder;
use crate::frame::{AudioFrame, Frame};
use crate::packet::Packet;

use data::{AUDIO_CRITICAL_FREQS, AUDIO_RLE_LEN, MAX_BANDS};
use dct::DctIII;
use rdft::Rdft;

/// 逆变换
enum Transform {
    Dct(DctIII),
    Rdft(Rdft),
}

/// Bink 音频解码器 (DCT 与 RDFT 两种编码共用)
pub struct BinkAudioDecoder {
    use_dct: bool,
    opened: bool,
    /// 输出采样率 (音轨头部声明值)
    sample_rate: u32,
    /// 输出声道数
    channels: u32,
    /// 内部声道数: DCT 为实际声道数, RDFT 交错后为 1
    internal_channels: usize,
    /// 子块变换长度
    frame_len: usize,
    /// 重叠窗口长度 (frame_len / 16)
    overlap_len: usize,
    /// 子块输出的样本总数 (跨内部声道)
    block_size: usize,
    base_quant: f32,
    /// 量化器表 (已含 base_quant)
    quant_table: [f32; 96],
    num_bands: usize,
    /// 频带边界 (下标 0..=num_bands)
    bands: [usize; MAX_BANDS + 1],
    transform: Option<Transform>,
    /// 每内部声道的系数缓冲
    coeffs: Vec<Vec<f32>>,
    /// 每内部声道的重叠窗口
    overlap: Vec<Vec<f32>>,
    /// 本轨尚未输出过子块
    first_block: bool,
    /// 已解码待取出的子块帧
    queued: VecDeque<AudioFrame>,
    /// 输出样本累计 (PTS, 以采样为单位)
    next_pts: i64,
}

impl BinkAudioDecoder {
    pub fn create_dct() -> YingResult<Box<dyn Decoder>> {
        Ok(Box::new(Self::new(true)))
    }

    pub fn create_rdft() -> YingResult<Box<dyn Decoder>> {
        Ok(Box::new(Self::new(false)))
    }

    pub fn new(use_dct: bool) -> Self {
        Self {
            use_dct,
            opened: false,
            sample_rate: 0,
            channels: 0,
            internal_channels: 1,
            frame_len: 0,
            overlap_len: 0,
            block_size: 0,
            base_quant: 0.0,
            quant_table: [0.0; 96],
            num_bands: 0,
            bands: [0; MAX_BANDS + 1],
            transform: None,
            coeffs: Vec::new(),
            overlap: Vec::new(),
            first_block: true,
            queued: VecDeque::new(),
            next_pts: 0,
        }
    }

    /// 每声道每子块输出的样本数
    pub fn samples_per_block(&self) -> usize {
        let stride = (self.channels as usize).div_ceil(self.internal_channels);
        self.block_size / self.internal_channels / stride
    }

    /// 解码一个子块: 所有内部声道的系数读取、逆变换与重叠混合
    fn decode_block(&mut self, br: &mut BitReader) -> YingResult<()> {
        if self.use_dct {
            br.skip(2);
        }
        for ch in 0..self.internal_channels {
            self.decode_channel_coeffs(br, ch)?;
            let coeffs = &mut self.coeffs[ch];
            match self.transform.as_mut() {
                Some(Transform::Dct(dct)) => {
                    dct.transform(coeffs);
                    let scale = 4.0 * self.base_quant;
                    for v in coeffs.iter_mut() {
                        *v *= scale;
                    }
                }
                Some(Transform::Rdft(rdft)) => rdft.transform(coeffs),
                None => return Err(YingError::Internal("逆变换未初始化".into())),
            }
        }
        self.overlap_add();
        self.first_block = false;
        br.align32();
        Ok(())
    }

    /// 读取一个内部声道的频谱系数
    fn decode_channel_coeffs(&mut self, br: &mut BitReader, ch: usize) -> YingResult<()> {
        let frame_len = self.frame_len;
        let coeffs = &mut self.coeffs[ch];
        coeffs.fill(0.0);
        coeffs[0] = read_float29(br) * self.base_quant;
        coeffs[1] = read_float29(br) * self.base_quant;

        // 各频带的量化器值
        let mut quants = [0.0f32; MAX_BANDS];
        for q in quants.iter_mut().take(self.num_bands) {
            let idx = (br.read_bits(8) as usize).min(self.quant_table.len() - 1);
            *q = self.quant_table[idx];
        }

        let mut k = 0usize;
        let mut q = quants[0];
        let mut i = 2usize;
        while i < frame_len {
            // 分段跨度: 游程表或固定 8
            let j = if br.read_bool() {
                i + AUDIO_RLE_LEN[br.read_bits(4) as usize]
            } else {
                i + 8
            };
            let j = j.min(frame_len);
            let width = br.read_bits(4);
            if width == 0 {
                coeffs[i..j].fill(0.0);
                i = j;
                while self.bands[k] < i {
                    q = quants[k];
                    k += 1;
                }
            } else {
                while i < j {
                    if self.bands[k] == i {
                        q = quants[k];
                        k += 1;
                    }
                    let c = br.read_bits(width);
                    if c != 0 {
                        let v = c as f32 * q;
                        coeffs[i] = if br.read_bool() { -v } else { v };
                    } else {
                        coeffs[i] = 0.0;
                    }
                    i += 1;
                }
            }
        }
        Ok(())
    }

    /// 与上一子块的窗口线性混合, 并保存本子块尾部作为新窗口
    fn overlap_add(&mut self) {
        let count = self.overlap_len * self.internal_channels;
        for ch in 0..self.internal_channels {
            let coeffs = &mut self.coeffs[ch];
            let window = &mut self.overlap[ch];
            if !self.first_block {
                let mut j = ch;
                for i in 0..self.overlap_len {
                    coeffs[i] = (window[i] * (count - j) as f32 + coeffs[i] * j as f32)
                        / count as f32;
                    j += self.internal_channels;
                }
            }
            window.copy_from_slice(&coeffs[self.frame_len - self.overlap_len..]);
        }
    }

    /// 把当前子块样本导出为一帧: 必要时把交错声道拆开
    fn export_block(&mut self) -> AudioFrame {
        let stride = (self.channels as usize).div_ceil(self.internal_channels);
        let per_channel = self.samples_per_block();
        let mut frame = AudioFrame::new(
            per_channel as u32,
            self.sample_rate,
            SampleFormat::F32p,
            ChannelLayout::from_channels(self.channels),
        );
        if stride > 1 {
            // RDFT 立体声: 单一内部声道按步长拆成左右声道
            for (c, out) in frame.data.iter_mut().enumerate() {
                out.reserve(per_channel * 4);
                for i in 0..per_channel {
                    out.extend_from_slice(&self.coeffs[0][i * stride + c].to_le_bytes());
                }
            }
        } else {
            for (ch, out) in frame.data.iter_mut().enumerate() {
                out.reserve(per_channel * 4);
                for &v in self.coeffs[ch][..per_channel].iter() {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
        frame.pts = self.next_pts;
        frame.time_base = Rational::new(1, self.sample_rate as i32);
        frame.duration = per_channel as i64;
        self.next_pts += per_channel as i64;
        frame
    }
}

/// 读取 Bink 的 29 位浮点: 5 位指数, 23 位尾数, 符号位在后
fn read_float29(br: &mut BitReader) -> f32 {
    let exp = br.read_bits(5) as i32;
    let mantissa = br.read_bits(23) as f32;
    let v = mantissa * (2.0f32).powi(exp - 23);
    if br.read_bool() { -v } else { v }
}

impl Decoder for BinkAudioDecoder {
    fn codec_id(&self) -> CodecId {
        if self.use_dct {
            CodecId::BinkAudioDct
        } else {
            CodecId::BinkAudioRdft
        }
    }

    fn name(&self) -> &str {
        if self.use_dct {
            "binkaudio_dct"
        } else {
            "binkaudio_rdft"
        }
    }

    fn open(&mut self, params: &CodecParameters) -> YingResult<()> {
        let CodecParamsType::Audio(ref ap) = params.params else {
            return Err(YingError::InvalidArgument("binkaud 需要音频参数".into()));
        };
        let channels = ap.channel_layout.channels;
        if channels == 0 || channels > 2 {
            return Err(YingError::Unsupported(format!(
                "Bink 音轨声道数非法: {channels}"
            )));
        }
        if ap.sample_rate == 0 {
            return Err(YingError::InvalidArgument("采样率非法".into()));
        }
        self.sample_rate = ap.sample_rate;
        self.channels = channels;

        let mut frame_bits: u32 = if ap.sample_rate < 22050 {
            9
        } else if ap.sample_rate < 44100 {
            10
        } else {
            11
        };
        // 频带划分用的内部采样率; RDFT 把声道折叠进同一条流
        let mut internal_rate = ap.sample_rate;
        if !self.use_dct {
            internal_rate *= channels;
            frame_bits += channels.next_power_of_two().trailing_zeros() & 3;
            self.internal_channels = 1;
        } else {
            self.internal_channels = channels as usize;
        }
        self.frame_len = 1 << frame_bits;
        self.overlap_len = self.frame_len / 16;
        self.block_size = (self.frame_len - self.overlap_len) * self.internal_channels;
        let numerator = if self.use_dct {
            self.frame_len as f32
        } else {
            2.0
        };
        self.base_quant = numerator / ((self.frame_len as f32).sqrt() * 32768.0);
        for (i, q) in self.quant_table.iter_mut().enumerate() {
            *q = (i as f32 * 0.0664 / std::f32::consts::LOG10_E).exp() * self.base_quant;
        }

        // 频带边界: 临界频率映射到系数下标, 偶数对齐
        let half_rate = (internal_rate as usize + 1) / 2;
        self.num_bands = AUDIO_CRITICAL_FREQS
            .iter()
            .position(|&cf| half_rate <= cf as usize)
            .map(|k| k + 1)
            .unwrap_or(AUDIO_CRITICAL_FREQS.len() + 1)
            .min(MAX_BANDS);
        self.bands[0] = 2;
        for i in 1..self.num_bands {
            self.bands[i] =
                (AUDIO_CRITICAL_FREQS[i - 1] as usize * self.frame_len / half_rate) & !1;
        }
        self.bands[self.num_bands] = self.frame_len;

        self.transform = Some(if self.use_dct {
            Transform::Dct(DctIII::new(frame_bits))
        } else {
            Transform::Rdft(Rdft::new(frame_bits))
        });
        self.coeffs = vec![vec![0.0; self.frame_len]; self.internal_channels];
        self.overlap = vec![vec![0.0; self.overlap_len]; self.internal_channels];
        self.first_block = true;
        self.next_pts = 0;
        self.opened = true;
        debug!(
            "binkaud: 打开 {} Hz x{}, {} 编码, 子块 {} 样本, {} 频带",
            self.sample_rate,
            self.channels,
            if self.use_dct { "DCT" } else { "RDFT" },
            self.frame_len,
            self.num_bands
        );
        Ok(())
    }

    fn send_packet(&mut self, packet: &Packet) -> YingResult<()> {
        if !self.opened {
            return Err(YingError::InvalidArgument("解码器尚未打开".into()));
        }
        if packet.is_empty() {
            return Ok(());
        }
        let data = packet.data.clone();
        let mut br = BitReader::new(&data);
        while br.bits_left() != 0 {
            self.decode_block(&mut br)?;
            let frame = self.export_block();
            self.queued.push_back(frame);
        }
        Ok(())
    }

    fn receive_frame(&mut self) -> YingResult<Frame> {
        match self.queued.pop_front() {
            Some(frame) => Ok(Frame::Audio(frame)),
            None => Err(YingError::NeedMoreData),
        }
    }

    fn flush(&mut self) {
        self.queued.clear();
        self.first_block = true;
        self.next_pts = 0;
        for window in self.overlap.iter_mut() {
            window.fill(0.0);
        }
    }
}
