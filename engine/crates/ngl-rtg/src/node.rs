//! 任务节点
//!
//! 节点的生命周期分两个阶段：
//!
//! 1. **setup**: 节点在加入图时通过 [`RtgNodeBuilder`] 声明自己要访问的
//!    资源。只有这里声明过的访问会参与生命周期分析和 barrier 推导。
//! 2. **run**: 图执行时回调，此时 barrier 已经录制完毕，节点通过
//!    [`RtgNodeContext`] 拿到解析好的物理资源录制渲染命令。
//!
//! Graphics 与 compute 节点是两个独立的 trait，run 拿到的命令列表
//! 能力不同：compute 节点拿不到 transition barrier 接口。

use crate::access::RtgAccessType;
use crate::builder::{RenderTaskGraphBuilder, RtgCompiledState};
use crate::desc::RtgResourceDesc2D;
use crate::error::{RtgError, RtgResult};
use crate::handle::RtgResourceHandle;
use crate::resource::RtgAllocatedResource;
use crate::stage::RtgTaskStage;
use ngl_rhi::{RhiComputeCommandList, RhiGraphicsCommandList, RhiResourceState};

/// 节点所属的队列类别
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RtgQueueClass {
    Graphics,
    Compute,
}

/// Graphics 队列上执行的任务节点
pub trait RtgGraphicsTaskNode {
    /// 声明资源访问
    fn setup(&mut self, builder: &mut RtgNodeBuilder<'_, '_>);

    /// 录制渲染命令
    fn run(&self, ctx: &RtgNodeContext<'_>, cmd: &mut dyn RhiGraphicsCommandList);
}

/// Compute 队列上执行的任务节点
pub trait RtgComputeTaskNode {
    fn setup(&mut self, builder: &mut RtgNodeBuilder<'_, '_>);

    fn run(&self, ctx: &RtgNodeContext<'_>, cmd: &mut dyn RhiComputeCommandList);
}

/// 图内对节点的类型擦除包装
pub(crate) enum RtgNodeExecutor<'a> {
    Graphics(Box<dyn RtgGraphicsTaskNode + 'a>),
    Compute(Box<dyn RtgComputeTaskNode + 'a>),
}

/// 一个已加入图的任务节点
pub(crate) struct RtgTaskNode<'a> {
    pub name: String,
    pub queue: RtgQueueClass,
    /// setup 阶段声明的访问，录制顺序保留
    pub accesses: Vec<(RtgResourceHandle, RtgAccessType)>,
    /// Compile 分配的调度位置
    pub stage: RtgTaskStage,
    pub executor: RtgNodeExecutor<'a>,
}

/// 节点在图中的编号
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RtgNodeId(pub(crate) usize);

/// setup 阶段传给节点的记录器
pub struct RtgNodeBuilder<'b, 'a> {
    pub(crate) graph: &'b mut RenderTaskGraphBuilder<'a>,
    pub(crate) node_name: &'b str,
    pub(crate) accesses: Vec<(RtgResourceHandle, RtgAccessType)>,
}

impl RtgNodeBuilder<'_, '_> {
    /// 在图上创建一份惰性资源，返回它的句柄
    pub fn create_resource(&mut self, desc: RtgResourceDesc2D) -> RtgResourceHandle {
        self.graph.create_resource(desc)
    }

    /// 声明本节点以 `access` 方式使用 `handle`
    ///
    /// 返回传入的句柄本身，方便链式写法：
    /// `self.color = builder.record_resource_access(color, RtgAccessType::ShaderRead)`。
    /// 同一个句柄在一个节点里只能声明一次，重复声明在 Compile 时报错。
    pub fn record_resource_access(&mut self, handle: RtgResourceHandle, access: RtgAccessType) -> RtgResourceHandle {
        self.accesses.push((handle, access));
        self.graph.note_access(handle, access);
        handle
    }

    /// 本帧 swapchain 资源的句柄，未导入时返回 INVALID
    #[inline]
    pub fn swapchain_resource_handle(&self) -> RtgResourceHandle {
        self.graph.get_swapchain_resource_handle()
    }

    /// 本帧的基准分辨率
    #[inline]
    pub fn base_resolution(&self) -> (u32, u32) {
        self.graph.base_resolution()
    }

    #[inline]
    pub fn node_name(&self) -> &str {
        self.node_name
    }
}

/// run 阶段传给节点的上下文
pub struct RtgNodeContext<'b> {
    pub(crate) node_name: &'b str,
    pub(crate) accesses: &'b [(RtgResourceHandle, RtgAccessType)],
    pub(crate) transitions: &'b [(RtgResourceHandle, RhiResourceState, RhiResourceState)],
    pub(crate) compiled: &'b RtgCompiledState,
}

impl RtgNodeContext<'_> {
    #[inline]
    pub fn node_name(&self) -> &str {
        self.node_name
    }

    /// 查询句柄绑定到的物理资源
    ///
    /// 只有 setup 阶段声明过访问的句柄可以查询，其余句柄返回
    /// [`RtgError::HandleNotRecordedByNode`]。
    pub fn get_allocated_resource(&self, handle: RtgResourceHandle) -> RtgResult<RtgAllocatedResource> {
        let (_, prev, curr) = self
            .transitions
            .iter()
            .find(|(h, _, _)| *h == handle)
            .ok_or(RtgError::HandleNotRecordedByNode(handle))?;
        let resolved = self.compiled.resolved_for(handle)?;
        Ok(RtgAllocatedResource {
            prev_state: *prev,
            curr_state: *curr,
            resolved,
        })
    }

    /// 本节点声明过的访问列表
    #[inline]
    pub fn accesses(&self) -> &[(RtgResourceHandle, RtgAccessType)] {
        self.accesses
    }
}
