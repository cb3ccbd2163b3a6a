//! 渲染任务图（Render Task Graph）
//!
//! 每帧的渲染被描述成一张由任务节点组成的图：节点在 setup 阶段声明
//! 自己要读写哪些资源，图在 Compile 阶段据此完成资源生命周期分析、
//! 从池中绑定物理纹理，并推导出每个节点执行前需要的状态转换 barrier。
//! 节点的 run 回调里只剩纯粹的渲染命令。
//!
//! # 核心概念
//!
//! - [`RenderTaskGraphManager`]: 跨帧长期存活，持有资源池与句柄分配器
//! - [`RenderTaskGraphBuilder`]: 单帧一次性的图对象，Record -> Compile -> Execute
//! - [`RtgGraphicsTaskNode`] / [`RtgComputeTaskNode`]: 业务 Pass 实现的 trait
//! - [`RtgResourceHandle`]: 图内资源的轻量句柄，物理纹理由池按需复用
//!
//! # 使用示例
//!
//! ```ignore
//! let manager = RenderTaskGraphManager::new(device, RtgManagerConfig::default());
//! manager.begin_frame();
//!
//! let mut graph = manager.create_builder(1920, 1080);
//! graph.add_graphics_node("gbuffer", GBufferPass::default())?;
//! graph.add_graphics_node("lighting", LightingPass::default())?;
//! graph.compile()?;
//! graph.execute(&mut cmd)?;
//! ```

mod access;
mod builder;
mod desc;
mod error;
mod handle;
mod manager;
mod node;
mod resource;
mod stage;
mod submit;

pub use access::{RtgAccessMask, RtgAccessType};
pub use builder::{RenderTaskGraphBuilder, RtgExternalViews};
pub use desc::{RtgResourceDesc2D, RtgSize2D};
pub use error::{RtgError, RtgResult};
pub use handle::RtgResourceHandle;
pub use manager::{RenderTaskGraphManager, RtgManagerConfig};
pub use node::{RtgComputeTaskNode, RtgGraphicsTaskNode, RtgNodeBuilder, RtgNodeContext, RtgNodeId, RtgQueueClass};
pub use resource::{RtgAllocatedResource, RtgResolvedResource};
pub use stage::RtgTaskStage;
pub use submit::{RtgCommandSequenceElem, submit_command_sequence};
