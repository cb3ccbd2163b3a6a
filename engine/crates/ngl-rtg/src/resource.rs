//! 池化资源与解析结果
//!
//! Compile 把每个句柄绑定到一份物理存储：内部句柄绑定到 manager
//! 资源池的槽位，外部句柄绑定到导入时登记的信息。绑定结果以
//! [`RtgResolvedResource`] 的形式复制进 builder，节点执行时无需再碰池。

use crate::stage::RtgTaskStage;
use ngl_rhi::{RhiFormat, RhiResourceState, RhiSwapchainHandle, RhiTextureDesc, RhiTextureHandle, RhiTextureUsage, RhiViewHandle, RhiViewKind};

/// 资源池中一份长期存活的物理纹理
pub(crate) struct InternalResourceInstance {
    pub desc: RhiTextureDesc,
    pub texture: RhiTextureHandle,
    pub rtv: Option<RhiViewHandle>,
    pub dsv: Option<RhiViewHandle>,
    pub srv: Option<RhiViewHandle>,
    pub uav: Option<RhiViewHandle>,

    /// 本帧内最后一次访问该实例的调度位置
    ///
    /// 每次 Compile 结束后复位到 `frontmost`（被钉住的槽位除外），
    /// 让下一帧可以从头复用。
    pub last_access_stage: RtgTaskStage,
    /// 上一个绑定留下的资源状态，是下一次绑定 barrier 链的起点
    pub cached_state: RhiResourceState,
    /// 最近一次状态演化之前的状态，仅用于调试
    pub prev_cached_state: RhiResourceState,

    /// 连续多少帧没有被任何图绑定
    pub unused_frame_count: u32,
    /// 本帧是否被绑定过，`begin_frame` 时折算进 unused_frame_count
    pub used_this_frame: bool,
    /// 被跨帧传递钉住的槽位不参与复用，也不会被淘汰
    pub pinned: bool,
}

impl InternalResourceInstance {
    /// 槽位是否能满足一次池查找
    ///
    /// 复用条件：上一次访问严格早于 `eligible_before`（新绑定的首次
    /// 访问），格式一致，尺寸不小于请求值，并且请求的每种视图都已创建。
    pub fn matches(&self, key: &ResourceSearchKey, eligible_before: RtgTaskStage) -> bool {
        self.last_access_stage < eligible_before
            && self.desc.format == key.format
            && self.desc.width >= key.width
            && self.desc.height >= key.height
            && self.has_views_for(key.usage)
    }

    fn has_views_for(&self, usage: RhiTextureUsage) -> bool {
        (!usage.contains(RhiTextureUsage::RENDER_TARGET) || self.rtv.is_some())
            && (!usage.contains(RhiTextureUsage::DEPTH_STENCIL) || self.dsv.is_some())
            && (!usage.contains(RhiTextureUsage::SHADER_RESOURCE) || self.srv.is_some())
            && (!usage.contains(RhiTextureUsage::UNORDERED_ACCESS) || self.uav.is_some())
    }

    pub fn resolved(&self) -> RtgResolvedResource {
        RtgResolvedResource {
            texture: Some(self.texture),
            swapchain: None,
            rtv: self.rtv,
            dsv: self.dsv,
            srv: self.srv,
            uav: self.uav,
        }
    }
}

/// 池查找的 key
#[derive(Clone, Copy, Debug)]
pub(crate) struct ResourceSearchKey {
    pub format: RhiFormat,
    pub width: u32,
    pub height: u32,
    pub usage: RhiTextureUsage,
}

/// 外部导入资源的登记信息，只在单次 builder 生命周期内有效
pub(crate) struct ExternalResourceInfo {
    pub texture: Option<RhiTextureHandle>,
    pub swapchain: Option<RhiSwapchainHandle>,
    pub rtv: Option<RhiViewHandle>,
    pub dsv: Option<RhiViewHandle>,
    pub srv: Option<RhiViewHandle>,
    pub uav: Option<RhiViewHandle>,

    /// 进入本图时资源所处的状态
    pub entry_state: RhiResourceState,
    /// 本图执行完毕后资源必须处于的状态
    pub require_end_state: RhiResourceState,
    /// 图内状态演化的游标，Compile 时推进
    pub cached_state: RhiResourceState,
    pub last_access_stage: RtgTaskStage,
}

impl ExternalResourceInfo {
    pub fn resolved(&self) -> RtgResolvedResource {
        RtgResolvedResource {
            texture: self.texture,
            swapchain: self.swapchain,
            rtv: self.rtv,
            dsv: self.dsv,
            srv: self.srv,
            uav: self.uav,
        }
    }
}

/// 句柄绑定到的物理存储
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CompiledResourceInfo {
    /// 内部资源：manager 池中的槽位下标
    Internal { pool_index: usize },
    /// 外部资源：物理存储在导入登记里
    External,
}

/// 绑定解析出来的物理对象集合
#[derive(Clone, Copy, Debug, Default)]
pub struct RtgResolvedResource {
    pub texture: Option<RhiTextureHandle>,
    pub swapchain: Option<RhiSwapchainHandle>,
    pub rtv: Option<RhiViewHandle>,
    pub dsv: Option<RhiViewHandle>,
    pub srv: Option<RhiViewHandle>,
    pub uav: Option<RhiViewHandle>,
}

impl RtgResolvedResource {
    #[inline]
    pub fn view(&self, kind: RhiViewKind) -> Option<RhiViewHandle> {
        match kind {
            RhiViewKind::Rtv => self.rtv,
            RhiViewKind::Dsv => self.dsv,
            RhiViewKind::Srv => self.srv,
            RhiViewKind::Uav => self.uav,
        }
    }
}

/// 节点执行时查询到的资源绑定快照
#[derive(Clone, Copy, Debug)]
pub struct RtgAllocatedResource {
    /// 本节点的 barrier 之前资源所处的状态
    pub prev_state: RhiResourceState,
    /// 本节点访问时资源所处的状态
    pub curr_state: RhiResourceState,
    pub resolved: RtgResolvedResource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngl_rhi::RhiTextureDesc;

    fn instance(width: u32, height: u32, format: RhiFormat) -> InternalResourceInstance {
        InternalResourceInstance {
            desc: RhiTextureDesc::new_2d(width, height, format).with_usage(RhiTextureUsage::RENDER_TARGET | RhiTextureUsage::SHADER_RESOURCE),
            texture: RhiTextureHandle::default(),
            rtv: Some(RhiViewHandle::default()),
            dsv: None,
            srv: Some(RhiViewHandle::default()),
            uav: None,
            last_access_stage: RtgTaskStage::frontmost(),
            cached_state: RhiResourceState::Common,
            prev_cached_state: RhiResourceState::Common,
            unused_frame_count: 0,
            used_this_frame: false,
            pinned: false,
        }
    }

    #[test]
    fn test_match_requires_strictly_earlier_access() {
        let mut inst = instance(256, 256, RhiFormat::R8G8B8A8Unorm);
        let key = ResourceSearchKey {
            format: RhiFormat::R8G8B8A8Unorm,
            width: 256,
            height: 256,
            usage: RhiTextureUsage::RENDER_TARGET,
        };

        assert!(inst.matches(&key, RtgTaskStage::new(0, 0)));

        // 与请求的首次访问重叠（相等）时不可复用
        inst.last_access_stage = RtgTaskStage::new(0, 0);
        assert!(!inst.matches(&key, RtgTaskStage::new(0, 0)));
        assert!(inst.matches(&key, RtgTaskStage::new(0, 1)));
    }

    #[test]
    fn test_match_size_and_format() {
        let inst = instance(256, 256, RhiFormat::R8G8B8A8Unorm);
        let eligible = RtgTaskStage::new(0, 0);

        // 尺寸更小的请求可以落在更大的实例上
        let smaller = ResourceSearchKey {
            format: RhiFormat::R8G8B8A8Unorm,
            width: 128,
            height: 128,
            usage: RhiTextureUsage::RENDER_TARGET,
        };
        assert!(inst.matches(&smaller, eligible));

        let bigger = ResourceSearchKey { width: 512, ..smaller };
        assert!(!inst.matches(&bigger, eligible));

        let wrong_format = ResourceSearchKey {
            format: RhiFormat::R16G16B16A16Float,
            ..smaller
        };
        assert!(!inst.matches(&wrong_format, eligible));
    }

    #[test]
    fn test_match_requires_views() {
        let inst = instance(256, 256, RhiFormat::R8G8B8A8Unorm);
        // 实例没有 UAV 视图，即使其它条件满足也不能复用
        let key = ResourceSearchKey {
            format: RhiFormat::R8G8B8A8Unorm,
            width: 256,
            height: 256,
            usage: RhiTextureUsage::UNORDERED_ACCESS,
        };
        assert!(!inst.matches(&key, RtgTaskStage::new(0, 0)));
    }
}
