//! 资源访问类型
//!
//! 访问类型是 RTG 推导的全部输入：它同时决定目标资源状态、
//! 纹理需要的 usage bit 以及节点执行时要用的视图种类。

use ngl_rhi::{RhiResourceState, RhiTextureUsage, RhiViewKind};

/// 节点对资源的一种访问方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RtgAccessType {
    /// 作为 render target 写入
    RenderTarget,
    /// 作为 depth target 写入
    DepthTarget,
    /// 着色器只读采样
    ShaderRead,
    /// UAV 读写
    Uav,
}

bitflags::bitflags! {
    /// 一个句柄在整帧内所有访问类型的并集
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RtgAccessMask: u8 {
        const RENDER_TARGET = 0b0001;
        const DEPTH_TARGET = 0b0010;
        const SHADER_READ = 0b0100;
        const UAV = 0b1000;
    }
}

impl RtgAccessType {
    #[inline]
    pub fn mask(self) -> RtgAccessMask {
        match self {
            RtgAccessType::RenderTarget => RtgAccessMask::RENDER_TARGET,
            RtgAccessType::DepthTarget => RtgAccessMask::DEPTH_TARGET,
            RtgAccessType::ShaderRead => RtgAccessMask::SHADER_READ,
            RtgAccessType::Uav => RtgAccessMask::UAV,
        }
    }

    /// 访问发生前资源必须处于的状态
    #[inline]
    pub fn target_state(self) -> RhiResourceState {
        match self {
            RtgAccessType::RenderTarget => RhiResourceState::RenderTarget,
            RtgAccessType::DepthTarget => RhiResourceState::DepthWrite,
            RtgAccessType::ShaderRead => RhiResourceState::ShaderRead,
            RtgAccessType::Uav => RhiResourceState::UnorderedAccess,
        }
    }

    /// 该访问要求纹理带有的 usage bit
    #[inline]
    pub fn required_usage(self) -> RhiTextureUsage {
        match self {
            RtgAccessType::RenderTarget => RhiTextureUsage::RENDER_TARGET,
            RtgAccessType::DepthTarget => RhiTextureUsage::DEPTH_STENCIL,
            RtgAccessType::ShaderRead => RhiTextureUsage::SHADER_RESOURCE,
            RtgAccessType::Uav => RhiTextureUsage::UNORDERED_ACCESS,
        }
    }

    /// 节点执行时通过哪种视图使用资源
    #[inline]
    pub fn view_kind(self) -> RhiViewKind {
        match self {
            RtgAccessType::RenderTarget => RhiViewKind::Rtv,
            RtgAccessType::DepthTarget => RhiViewKind::Dsv,
            RtgAccessType::ShaderRead => RhiViewKind::Srv,
            RtgAccessType::Uav => RhiViewKind::Uav,
        }
    }
}

impl RtgAccessMask {
    /// 同一个句柄既当 render target 又当 depth target 是角色冲突
    #[inline]
    pub fn has_render_depth_conflict(self) -> bool {
        self.contains(RtgAccessMask::RENDER_TARGET | RtgAccessMask::DEPTH_TARGET)
    }

    /// 该掩码要求的纹理 usage 并集
    pub fn required_usage(self) -> RhiTextureUsage {
        let mut usage = RhiTextureUsage::empty();
        if self.contains(RtgAccessMask::RENDER_TARGET) {
            usage |= RhiTextureUsage::RENDER_TARGET;
        }
        if self.contains(RtgAccessMask::DEPTH_TARGET) {
            usage |= RhiTextureUsage::DEPTH_STENCIL;
        }
        if self.contains(RtgAccessMask::SHADER_READ) {
            usage |= RhiTextureUsage::SHADER_RESOURCE;
        }
        if self.contains(RtgAccessMask::UAV) {
            usage |= RhiTextureUsage::UNORDERED_ACCESS;
        }
        usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mapping() {
        assert_eq!(RtgAccessType::RenderTarget.target_state(), RhiResourceState::RenderTarget);
        assert_eq!(RtgAccessType::DepthTarget.target_state(), RhiResourceState::DepthWrite);
        assert_eq!(RtgAccessType::ShaderRead.target_state(), RhiResourceState::ShaderRead);
        assert_eq!(RtgAccessType::Uav.target_state(), RhiResourceState::UnorderedAccess);

        assert_eq!(RtgAccessType::DepthTarget.view_kind(), RhiViewKind::Dsv);
        assert_eq!(RtgAccessType::ShaderRead.required_usage(), RhiTextureUsage::SHADER_RESOURCE);
    }

    #[test]
    fn test_render_depth_conflict() {
        let mask = RtgAccessType::RenderTarget.mask() | RtgAccessType::ShaderRead.mask();
        assert!(!mask.has_render_depth_conflict());
        assert!((mask | RtgAccessMask::DEPTH_TARGET).has_render_depth_conflict());
    }

    #[test]
    fn test_mask_usage_union() {
        let mask = RtgAccessType::RenderTarget.mask() | RtgAccessType::ShaderRead.mask();
        assert_eq!(
            mask.required_usage(),
            RhiTextureUsage::RENDER_TARGET | RhiTextureUsage::SHADER_RESOURCE
        );
    }
}
