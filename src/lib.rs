//! # Ying (影)
//!
//! 纯 Rust 实现的 Bink 1 解码框架.
//!
//! Ying 提供 Bink 容器与编解码的完整解码能力:
//! - **视频**: Bink 1 修订版 'c'-'i' (不含 'b'), 平面 YUV 4:2:0 输出,
//!   可选 alpha 平面
//! - **音频**: DCT 与 RDFT 两种 Bink 音频编码, f32 平面 PCM 输出
//! - **容器**: Bink (.bik) 解封装, 关键帧定位
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use ying::media::BikMedia;
//!
//! let mut media = BikMedia::open("movie.bik").unwrap();
//! while let Some(frame) = media.next_frame().unwrap() {
//!     println!("帧 {}x{}", frame.video.width, frame.video.height);
//! }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `ying-core` | 核心类型与比特流工具 |
//! | `ying-codec` | Bink 视频/音频解码器 |
//! | `ying-format` | Bink 容器解封装 |

/// 核心类型与比特流工具
pub use ying_core as core;

/// 编解码器框架
pub use ying_codec as codec;

/// 容器格式框架
pub use ying_format as format;

pub mod media;

/// 获取 Ying 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置解码器的注册表
pub fn default_codec_registry() -> ying_codec::CodecRegistry {
    let mut registry = ying_codec::CodecRegistry::new();
    ying_codec::register_all(&mut registry);
    registry
}

/// 创建已注册所有内置容器格式的注册表
pub fn default_format_registry() -> ying_format::FormatRegistry {
    let mut registry = ying_format::FormatRegistry::new();
    ying_format::register_all(&mut registry);
    registry
}
