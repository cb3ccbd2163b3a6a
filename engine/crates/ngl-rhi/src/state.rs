//! 资源状态
//!
//! GPU 同步意义上的资源模式。状态之间的切换需要显式 barrier，
//! barrier 的推导由上层（RTG）完成。

/// 资源当前所处的 GPU 状态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RhiResourceState {
    /// 通用状态（新创建资源的初始状态）
    #[default]
    Common = 0,
    /// 可被 swapchain 呈现
    Present,
    /// 作为 render target 写入
    RenderTarget,
    /// 作为 depth target 写入
    DepthWrite,
    /// 着色器只读采样
    ShaderRead,
    /// 无序访问（UAV 读写）
    UnorderedAccess,
}

impl RhiResourceState {
    /// 该状态下资源是否可能被写入
    #[inline]
    pub fn is_write(self) -> bool {
        matches!(
            self,
            RhiResourceState::RenderTarget | RhiResourceState::DepthWrite | RhiResourceState::UnorderedAccess
        )
    }
}
