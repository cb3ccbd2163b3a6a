//! NGL RHI 边界层
//!
//! 渲染任务图（RTG）只依赖这里定义的能力抽象，不关心具体图形 API：
//!
//! - **RhiFormat / RhiResourceState / RhiTextureDesc**: 纹理描述相关的值类型
//! - **RhiDevice**: 创建纹理 / 视图 / fence 的设备能力
//! - **RhiGraphicsCommandList / RhiComputeCommandList**: 命令列表能力，
//!   其中 compute 列表在类型层面上不提供状态转换 barrier
//! - **RhiCommandQueue**: 队列提交能力
//! - **headless**: 纯 CPU 的记录型后端，用于单元测试和离线验证渲染 Pass
//!
//! 真实后端（D3D12 等）按相同的 trait 实现即可接入。

pub mod command;
pub mod device;
pub mod error;
pub mod format;
pub mod handles;
pub mod headless;
pub mod state;
pub mod texture;

pub use command::{RhiCommandList, RhiCommandQueue, RhiComputeCommandList, RhiGraphicsCommandList};
pub use device::RhiDevice;
pub use error::{RhiError, RhiResult};
pub use format::RhiFormat;
pub use handles::{RhiCommandListId, RhiFenceHandle, RhiSwapchainHandle, RhiTextureHandle, RhiViewHandle, RhiViewKind};
pub use state::RhiResourceState;
pub use texture::{RhiTextureDesc, RhiTextureUsage};
