//! # ying-codec
//!
//! Ying 多媒体框架编解码器库, 提供解码器框架与 Packet/Frame 抽象.
//!
//! ## 支持的解码器
//!
//! - **Bink 视频**: Bink 1 修订版 'c'-'i' (不含 'b')
//! - **Bink 音频**: DCT 与 RDFT 两种编码
//!
//! ## 使用示例
//!
//! ```rust
//! use ying_codec::{CodecRegistry, CodecId};
//!
//! let mut reg = CodecRegistry::new();
//! ying_codec::register_all(&mut reg);
//!
//! let decoder = reg.create_decoder(CodecId::BinkVideo).unwrap();
//! assert_eq!(decoder.name(), "binkvideo");
//! ```

pub mod codec_id;
pub mod codec_parameters;
pub mod decoder;
pub mod decoders;
pub mod frame;
pub mod packet;
pub mod registry;

// 重导出常用类型
pub use codec_id::CodecId;
pub use codec_parameters::{AudioCodecParams, CodecParameters, CodecParamsType, VideoCodecParams};
pub use decoder::Decoder;
pub use frame::{AudioFrame, Frame, VideoFrame};
pub use packet::Packet;
pub use registry::CodecRegistry;

/// 注册所有内置解码器
pub fn register_all(registry: &mut CodecRegistry) {
    decoders::register_all_decoders(registry);
}
