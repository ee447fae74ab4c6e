//! 解码器实现模块.

pub mod binkaud;
pub mod binkvid;

use crate::codec_id::CodecId;
use crate::registry::CodecRegistry;

/// 注册所有内置解码器
pub fn register_all_decoders(registry: &mut CodecRegistry) {
    registry.register_decoder(
        CodecId::BinkVideo,
        "binkvideo",
        binkvid::BinkVideoDecoder::create,
    );
    registry.register_decoder(
        CodecId::BinkAudioDct,
        "binkaudio_dct",
        binkaud::BinkAudioDecoder::create_dct,
    );
    registry.register_decoder(
        CodecId::BinkAudioRdft,
        "binkaudio_rdft",
        binkaud::BinkAudioDecoder::create_rdft,
    );
}
