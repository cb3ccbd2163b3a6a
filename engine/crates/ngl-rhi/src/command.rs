//! 命令列表与队列能力
//!
//! Graphics 与 Compute 列表在类型层面分开：状态转换 barrier 只出现在
//! [`RhiGraphicsCommandList`] 上，compute 列表无法录制 transition，
//! 保证跨队列同步必须走显式的 fence。

use crate::handles::{RhiCommandListId, RhiFenceHandle, RhiSwapchainHandle, RhiTextureHandle};
use crate::state::RhiResourceState;

/// 两类命令列表共有的能力
pub trait RhiCommandList {
    /// UAV 读写之间的执行顺序屏障，不改变资源状态
    fn uav_barrier(&mut self, texture: RhiTextureHandle);

    /// 调试标记：开启一个命名区间
    fn begin_event(&mut self, name: &str);

    /// 调试标记：结束最近的区间
    fn end_event(&mut self);
}

/// Graphics 队列的命令列表
pub trait RhiGraphicsCommandList: RhiCommandList {
    /// 资源状态转换 barrier
    fn texture_barrier(&mut self, texture: RhiTextureHandle, before: RhiResourceState, after: RhiResourceState);

    /// swapchain 当前 backbuffer 的状态转换 barrier
    fn swapchain_barrier(&mut self, swapchain: RhiSwapchainHandle, before: RhiResourceState, after: RhiResourceState);
}

/// Compute 队列的命令列表
///
/// 故意不提供 transition barrier。
pub trait RhiComputeCommandList: RhiCommandList {}

/// 命令队列的提交能力
pub trait RhiCommandQueue {
    /// 按顺序提交一批已录制完成的命令列表
    fn execute_command_lists(&mut self, lists: &[RhiCommandListId]);

    /// 队列执行到此处时把 fence 推进到 `value`
    fn signal_fence(&mut self, fence: RhiFenceHandle, value: u64);

    /// 队列在此处等待 fence 达到 `value`
    fn wait_fence(&mut self, fence: RhiFenceHandle, value: u64);
}
