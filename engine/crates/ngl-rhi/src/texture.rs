//! 纹理描述

use crate::format::RhiFormat;
use crate::state::RhiResourceState;

bitflags::bitflags! {
    /// 纹理的用途，决定可以为它创建哪些视图
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RhiTextureUsage: u8 {
        const RENDER_TARGET = 0b0001;
        const DEPTH_STENCIL = 0b0010;
        const SHADER_RESOURCE = 0b0100;
        const UNORDERED_ACCESS = 0b1000;
    }
}

/// 2D 纹理的创建参数
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RhiTextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: RhiFormat,
    pub usage: RhiTextureUsage,
    pub initial_state: RhiResourceState,
}

impl RhiTextureDesc {
    #[inline]
    pub fn new_2d(width: u32, height: u32, format: RhiFormat) -> Self {
        Self {
            width,
            height,
            format,
            usage: RhiTextureUsage::SHADER_RESOURCE,
            initial_state: RhiResourceState::Common,
        }
    }

    #[inline]
    pub fn with_usage(mut self, usage: RhiTextureUsage) -> Self {
        self.usage = usage;
        self
    }

    #[inline]
    pub fn with_initial_state(mut self, state: RhiResourceState) -> Self {
        self.initial_state = state;
        self
    }
}
