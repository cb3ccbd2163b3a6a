//! 像素格式
//!
//! 只列出渲染目标 / 深度目标 / 中间缓冲常用的格式子集。

/// 纹理像素格式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RhiFormat {
    #[default]
    Unknown = 0,
    R8G8B8A8Unorm,
    B8G8R8A8Unorm,
    R16G16B16A16Float,
    R11G11B10Float,
    R32Float,
    D24UnormS8Uint,
    D32Float,
}

impl RhiFormat {
    /// 是否是深度（或深度-模板）格式
    #[inline]
    pub fn is_depth_stencil(self) -> bool {
        matches!(self, RhiFormat::D24UnormS8Uint | RhiFormat::D32Float)
    }

    /// 格式的位模式，用于把描述符打包成扁平 key
    #[inline]
    pub const fn to_bits(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_formats() {
        assert!(RhiFormat::D32Float.is_depth_stencil());
        assert!(RhiFormat::D24UnormS8Uint.is_depth_stencil());
        assert!(!RhiFormat::R8G8B8A8Unorm.is_depth_stencil());
    }
}
