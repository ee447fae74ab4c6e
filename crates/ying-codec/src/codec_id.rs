//! 编解码器标识符.

use std::fmt;
use ying_core::MediaType;

/// 编解码器标识符
///
/// 唯一标识一种编解码算法, 与容器格式无关. Bink 音频按逆变换方式
/// 分为 DCT 与 RDFT 两种编码.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// 未知编解码器
    None,
    /// Bink 1 视频
    BinkVideo,
    /// Bink 音频 (带窗重叠 DCT 块)
    BinkAudioDct,
    /// Bink 音频 (声道交错 RDFT 块)
    BinkAudioRdft,
}

impl CodecId {
    /// 获取编解码器对应的媒体类型
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::None => MediaType::Data,
            Self::BinkVideo => MediaType::Video,
            Self::BinkAudioDct | Self::BinkAudioRdft => MediaType::Audio,
        }
    }

    /// 获取编解码器的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BinkVideo => "binkvideo",
            Self::BinkAudioDct => "binkaudio_dct",
            Self::BinkAudioRdft => "binkaudio_rdft",
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
