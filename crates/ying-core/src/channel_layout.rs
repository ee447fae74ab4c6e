//! 声道布局定义.
//!
//! Bink 音轨只有单声道与立体声两种, 这里保留声道数并附带常用布局常量.

use std::fmt;

/// 声道布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelLayout {
    /// 声道数
    pub channels: u32,
}

impl ChannelLayout {
    /// 单声道
    pub const MONO: Self = Self { channels: 1 };

    /// 立体声
    pub const STEREO: Self = Self { channels: 2 };

    /// 按声道数创建布局
    pub const fn from_channels(channels: u32) -> Self {
        Self { channels }
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channels {
            1 => write!(f, "mono"),
            2 => write!(f, "stereo"),
            n => write!(f, "{n}ch"),
        }
    }
}
