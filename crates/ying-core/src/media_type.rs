//! 媒体类型定义.

use std::fmt;

/// 媒体类型
///
/// 标识一条流承载的数据类别.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// 视频
    Video,
    /// 音频
    Audio,
    /// 其他数据
    Data,
}

impl MediaType {
    /// 获取人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
