//! 采样格式定义.

use std::fmt;

/// 音频采样格式
///
/// Bink 音频解码输出 32 位浮点平面格式; 其余格式用于外部转换.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// 有符号 16 位交错
    S16,
    /// 32 位浮点交错
    F32,
    /// 32 位浮点平面 (每声道独立缓冲区)
    F32p,
}

impl SampleFormat {
    /// 是否为平面格式
    pub const fn is_planar(&self) -> bool {
        matches!(self, Self::F32p)
    }

    /// 每个采样占用的字节数
    pub const fn bytes_per_sample(&self) -> usize {
        match self {
            Self::S16 => 2,
            Self::F32 | Self::F32p => 4,
        }
    }

    /// 获取人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::S16 => "s16",
            Self::F32 => "f32",
            Self::F32p => "f32p",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
