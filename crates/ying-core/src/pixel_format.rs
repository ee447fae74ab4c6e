//! 像素格式定义.
//!
//! Bink 1 的输出都是 8 位平面 YUV: 标准文件为 YUV 4:2:0,
//! 带 alpha 的文件追加一个与亮度同尺寸的 A 平面.

use std::fmt;

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 平面 YUV 4:2:0, 每分量 8 位
    Yuv420p,
    /// 平面 YUV 4:2:0 + Alpha 平面, 每分量 8 位
    Yuva420p,
    /// 8 位灰度 (仅亮度平面有效)
    Gray8,
}

impl PixelFormat {
    /// 平面数量
    pub const fn plane_count(&self) -> u32 {
        match self {
            Self::Yuv420p => 3,
            Self::Yuva420p => 4,
            // 灰度文件仍然携带 U/V 平面以保持缓冲区布局一致
            Self::Gray8 => 3,
        }
    }

    /// 是否带 alpha 平面
    pub const fn has_alpha(&self) -> bool {
        matches!(self, Self::Yuva420p)
    }

    /// 指定平面的尺寸 (宽, 高)
    ///
    /// 色度平面使用向上取整的半尺寸, 以正确处理奇数宽高.
    pub const fn plane_dimensions(&self, plane: usize, width: u32, height: u32) -> (u32, u32) {
        match plane {
            // 亮度与 alpha
            0 | 3 => (width, height),
            // 色度: 向上取整的半尺寸
            _ => ((width + 1) / 2, (height + 1) / 2),
        }
    }

    /// 获取人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Yuv420p => "yuv420p",
            Self::Yuva420p => "yuva420p",
            Self::Gray8 => "gray8",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_dimensions_odd_size() {
        let fmt = PixelFormat::Yuv420p;
        assert_eq!(fmt.plane_dimensions(0, 99, 55), (99, 55));
        assert_eq!(fmt.plane_dimensions(1, 99, 55), (50, 28));
        assert_eq!(fmt.plane_dimensions(2, 99, 55), (50, 28));
    }

    #[test]
    fn test_plane_count() {
        assert_eq!(PixelFormat::Yuv420p.plane_count(), 3);
        assert_eq!(PixelFormat::Yuva420p.plane_count(), 4);
        assert!(PixelFormat::Yuva420p.has_alpha());
    }
}
