//! RHI 对象句柄
//!
//! 纹理 / 视图 / swapchain / fence 使用带版本号的 slotmap key，
//! 销毁后旧句柄自动失效。命令列表的提交序号是单调递增的整数，
//! 由后端在创建命令列表时分配。

slotmap::new_key_type! {
    /// 纹理句柄
    pub struct RhiTextureHandle;
    /// 视图句柄（RTV/DSV/SRV/UAV 共用同一个 key 空间）
    pub struct RhiViewHandle;
    /// Swapchain 句柄
    pub struct RhiSwapchainHandle;
    /// Fence 句柄
    pub struct RhiFenceHandle;
}

/// 视图的种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RhiViewKind {
    Rtv,
    Dsv,
    Srv,
    Uav,
}

/// 命令列表的提交标识
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RhiCommandListId(pub u64);
