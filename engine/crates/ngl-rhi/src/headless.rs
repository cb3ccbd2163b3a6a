//! Headless 后端
//!
//! 纯 CPU 实现：创建的纹理只保留描述，命令列表把每条命令记录成
//! [`HeadlessCommand`]，队列把每次提交记录成 [`HeadlessSubmit`]。
//! 测试通过回读这些记录来断言 barrier 序列与提交顺序。
//!
//! 额外提供 `inject_texture_failures`，让接下来 N 次纹理创建失败，
//! 用于验证上层的错误传播路径。

use slotmap::SlotMap;

use crate::command::{RhiCommandList, RhiCommandQueue, RhiComputeCommandList, RhiGraphicsCommandList};
use crate::device::RhiDevice;
use crate::error::{RhiError, RhiResult};
use crate::format::RhiFormat;
use crate::handles::{RhiCommandListId, RhiFenceHandle, RhiSwapchainHandle, RhiTextureHandle, RhiViewHandle, RhiViewKind};
use crate::state::RhiResourceState;
use crate::texture::{RhiTextureDesc, RhiTextureUsage};

// ==================================================
// device
// ==================================================

#[derive(Clone, Debug)]
pub struct HeadlessTexture {
    pub desc: RhiTextureDesc,
    pub name: String,
}

#[derive(Clone, Copy, Debug)]
pub struct HeadlessView {
    pub texture: RhiTextureHandle,
    pub kind: RhiViewKind,
}

#[derive(Clone, Copy, Debug)]
pub struct HeadlessSwapchain {
    pub width: u32,
    pub height: u32,
    pub format: RhiFormat,
    pub buffer_count: u32,
}

/// 记录型设备
#[derive(Default)]
pub struct HeadlessRhiDevice {
    textures: SlotMap<RhiTextureHandle, HeadlessTexture>,
    views: SlotMap<RhiViewHandle, HeadlessView>,
    swapchains: SlotMap<RhiSwapchainHandle, HeadlessSwapchain>,
    fences: SlotMap<RhiFenceHandle, String>,

    /// 接下来多少次 create_texture 直接失败
    inject_texture_failures: u32,
    /// 累计创建过的纹理数（不随销毁减少）
    created_texture_count: u64,
}

impl HeadlessRhiDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个假 swapchain
    pub fn register_swapchain(&mut self, width: u32, height: u32, format: RhiFormat, buffer_count: u32) -> RhiSwapchainHandle {
        self.swapchains.insert(HeadlessSwapchain { width, height, format, buffer_count })
    }

    /// 让接下来 `count` 次纹理创建失败
    pub fn inject_texture_failures(&mut self, count: u32) {
        self.inject_texture_failures = count;
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    #[inline]
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    #[inline]
    pub fn created_texture_count(&self) -> u64 {
        self.created_texture_count
    }

    #[inline]
    pub fn texture(&self, handle: RhiTextureHandle) -> Option<&HeadlessTexture> {
        self.textures.get(handle)
    }

    #[inline]
    pub fn view(&self, handle: RhiViewHandle) -> Option<&HeadlessView> {
        self.views.get(handle)
    }
}

impl RhiDevice for HeadlessRhiDevice {
    fn create_texture(&mut self, desc: &RhiTextureDesc, debug_name: &str) -> RhiResult<RhiTextureHandle> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RhiError::InvalidDesc(format!("zero extent: {}x{}", desc.width, desc.height)));
        }
        if desc.format == RhiFormat::Unknown {
            return Err(RhiError::InvalidDesc("unknown format".into()));
        }
        if self.inject_texture_failures > 0 {
            self.inject_texture_failures -= 1;
            return Err(RhiError::TextureCreation(format!("injected failure for `{debug_name}`")));
        }

        self.created_texture_count += 1;
        log::debug!("headless: create texture `{debug_name}` {}x{} {:?}", desc.width, desc.height, desc.format);
        Ok(self.textures.insert(HeadlessTexture {
            desc: *desc,
            name: debug_name.into(),
        }))
    }

    fn destroy_texture(&mut self, texture: RhiTextureHandle) {
        if self.textures.remove(texture).is_none() {
            log::warn!("headless: destroy of unknown texture {texture:?}");
            return;
        }
        self.views.retain(|_, view| view.texture != texture);
    }

    fn create_view(&mut self, texture: RhiTextureHandle, kind: RhiViewKind) -> RhiResult<RhiViewHandle> {
        let tex = self.textures.get(texture).ok_or(RhiError::UnknownTexture)?;
        let required = match kind {
            RhiViewKind::Rtv => RhiTextureUsage::RENDER_TARGET,
            RhiViewKind::Dsv => RhiTextureUsage::DEPTH_STENCIL,
            RhiViewKind::Srv => RhiTextureUsage::SHADER_RESOURCE,
            RhiViewKind::Uav => RhiTextureUsage::UNORDERED_ACCESS,
        };
        if !tex.desc.usage.contains(required) {
            return Err(RhiError::MissingUsage { kind, usage: required });
        }
        Ok(self.views.insert(HeadlessView { texture, kind }))
    }

    fn texture_desc(&self, texture: RhiTextureHandle) -> Option<RhiTextureDesc> {
        self.textures.get(texture).map(|t| t.desc)
    }

    fn create_fence(&mut self, debug_name: &str) -> RhiResult<RhiFenceHandle> {
        Ok(self.fences.insert(debug_name.into()))
    }
}

// ==================================================
// command list
// ==================================================

/// headless 命令列表记录下来的单条命令
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeadlessCommand {
    TextureBarrier {
        texture: RhiTextureHandle,
        before: RhiResourceState,
        after: RhiResourceState,
    },
    SwapchainBarrier {
        swapchain: RhiSwapchainHandle,
        before: RhiResourceState,
        after: RhiResourceState,
    },
    UavBarrier(RhiTextureHandle),
    BeginEvent(String),
    EndEvent,
}

/// 记录型命令列表，同时充当 graphics 和 compute 列表
pub struct HeadlessCommandList {
    id: RhiCommandListId,
    commands: Vec<HeadlessCommand>,
}

impl HeadlessCommandList {
    pub fn new(id: RhiCommandListId) -> Self {
        Self { id, commands: Vec::new() }
    }

    #[inline]
    pub fn id(&self) -> RhiCommandListId {
        self.id
    }

    #[inline]
    pub fn commands(&self) -> &[HeadlessCommand] {
        &self.commands
    }

    /// 记录中的状态转换 barrier 数量（texture 与 swapchain 合计）
    pub fn barrier_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, HeadlessCommand::TextureBarrier { .. } | HeadlessCommand::SwapchainBarrier { .. }))
            .count()
    }
}

impl RhiCommandList for HeadlessCommandList {
    fn uav_barrier(&mut self, texture: RhiTextureHandle) {
        self.commands.push(HeadlessCommand::UavBarrier(texture));
    }

    fn begin_event(&mut self, name: &str) {
        self.commands.push(HeadlessCommand::BeginEvent(name.into()));
    }

    fn end_event(&mut self) {
        self.commands.push(HeadlessCommand::EndEvent);
    }
}

impl RhiGraphicsCommandList for HeadlessCommandList {
    fn texture_barrier(&mut self, texture: RhiTextureHandle, before: RhiResourceState, after: RhiResourceState) {
        self.commands.push(HeadlessCommand::TextureBarrier { texture, before, after });
    }

    fn swapchain_barrier(&mut self, swapchain: RhiSwapchainHandle, before: RhiResourceState, after: RhiResourceState) {
        self.commands.push(HeadlessCommand::SwapchainBarrier { swapchain, before, after });
    }
}

impl RhiComputeCommandList for HeadlessCommandList {}

// ==================================================
// queue
// ==================================================

/// headless 队列记录下来的单次提交动作
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeadlessSubmit {
    Execute(Vec<RhiCommandListId>),
    Signal { fence: RhiFenceHandle, value: u64 },
    Wait { fence: RhiFenceHandle, value: u64 },
}

/// 记录型命令队列
#[derive(Default)]
pub struct HeadlessCommandQueue {
    submits: Vec<HeadlessSubmit>,
}

impl HeadlessCommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn submits(&self) -> &[HeadlessSubmit] {
        &self.submits
    }
}

impl RhiCommandQueue for HeadlessCommandQueue {
    fn execute_command_lists(&mut self, lists: &[RhiCommandListId]) {
        self.submits.push(HeadlessSubmit::Execute(lists.to_vec()));
    }

    fn signal_fence(&mut self, fence: RhiFenceHandle, value: u64) {
        self.submits.push(HeadlessSubmit::Signal { fence, value });
    }

    fn wait_fence(&mut self, fence: RhiFenceHandle, value: u64) {
        self.submits.push(HeadlessSubmit::Wait { fence, value });
    }
}
