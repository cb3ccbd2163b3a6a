//! 单帧任务图 builder
//!
//! builder 是一次性对象，生命周期严格按 Record -> Compile -> Execute
//! 推进，越过或重复任何一步都返回错误：
//!
//! 1. **Record**: 加入任务节点、创建惰性资源、导入外部资源
//! 2. **Compile**（经由 manager）: 校验、分配调度位置、计算资源生命
//!    周期、绑定资源池、推导每个节点需要的状态转换
//! 3. **Execute**: 按调度顺序录制 barrier 与节点命令，最后把外部资源
//!    恢复到约定的结束状态
//!
//! Execute 之后 builder 只剩查询价值，下一帧从 manager 重新创建。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use itertools::Itertools;
use ngl_rhi::{RhiComputeCommandList, RhiDevice, RhiGraphicsCommandList, RhiResourceState, RhiSwapchainHandle, RhiTextureHandle, RhiViewHandle};

use crate::access::{RtgAccessMask, RtgAccessType};
use crate::desc::RtgResourceDesc2D;
use crate::error::{RtgError, RtgResult};
use crate::handle::RtgResourceHandle;
use crate::manager::{PropagatedSlot, RenderTaskGraphManager, RtgManagerConfig, RtgManagerInner};
use crate::node::{RtgComputeTaskNode, RtgGraphicsTaskNode, RtgNodeBuilder, RtgNodeContext, RtgNodeExecutor, RtgNodeId, RtgQueueClass, RtgTaskNode};
use crate::resource::{CompiledResourceInfo, ExternalResourceInfo, ResourceSearchKey, RtgAllocatedResource, RtgResolvedResource};
use crate::stage::RtgTaskStage;

/// builder 的生命周期阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RtgBuilderState {
    Recording,
    Compiled,
    Executed,
}

/// 外部纹理随导入一起登记的视图
#[derive(Clone, Copy, Debug, Default)]
pub struct RtgExternalViews {
    pub rtv: Option<RhiViewHandle>,
    pub dsv: Option<RhiViewHandle>,
    pub srv: Option<RhiViewHandle>,
    pub uav: Option<RhiViewHandle>,
}

/// Compile 的产物：句柄编号、绑定与每个节点的状态转换
pub(crate) struct RtgCompiledState {
    /// 句柄 -> 稠密下标（首次出现顺序）
    pub handle_index: HashMap<RtgResourceHandle, usize>,
    /// 按稠密下标排列的句柄
    pub ordered: Vec<RtgResourceHandle>,
    pub bindings: Vec<CompiledResourceInfo>,
    pub resolved: Vec<RtgResolvedResource>,
    /// 每个句柄的 (首次访问, 最后访问)
    pub lifetimes: Vec<(RtgTaskStage, RtgTaskStage)>,
    /// 每个节点执行前需要的 (句柄, before, after)
    pub transitions: Vec<Vec<(RtgResourceHandle, RhiResourceState, RhiResourceState)>>,
}

impl RtgCompiledState {
    pub fn resolved_for(&self, handle: RtgResourceHandle) -> RtgResult<RtgResolvedResource> {
        let idx = self.handle_index.get(&handle).ok_or(RtgError::UnregisteredHandle(handle))?;
        Ok(self.resolved[*idx])
    }
}

/// 单帧渲染任务图
pub struct RenderTaskGraphBuilder<'a> {
    pub(crate) manager: Arc<RenderTaskGraphManager>,
    base_width: u32,
    base_height: u32,

    state: RtgBuilderState,
    nodes: Vec<RtgTaskNode<'a>>,
    /// 内部句柄的惰性描述
    descs: HashMap<RtgResourceHandle, RtgResourceDesc2D>,
    /// 外部句柄的导入登记，Execute 结束时清空
    externals: HashMap<RtgResourceHandle, ExternalResourceInfo>,
    swapchain_handle: RtgResourceHandle,
    /// 每个句柄在整帧内访问类型的并集
    access_masks: HashMap<RtgResourceHandle, RtgAccessMask>,
    /// 请求跨帧传递的内部句柄
    propagate_requests: Vec<RtgResourceHandle>,
    /// 从上一帧导入的句柄 -> (上一帧的句柄, 池槽位)
    prev_frame_bindings: HashMap<RtgResourceHandle, (RtgResourceHandle, usize)>,

    compiled: Option<RtgCompiledState>,
}

// ==================================================
// new & record
// ==================================================

impl<'a> RenderTaskGraphBuilder<'a> {
    pub(crate) fn new(manager: Arc<RenderTaskGraphManager>, base_width: u32, base_height: u32) -> Self {
        Self {
            manager,
            base_width,
            base_height,
            state: RtgBuilderState::Recording,
            nodes: Vec::new(),
            descs: HashMap::new(),
            externals: HashMap::new(),
            swapchain_handle: RtgResourceHandle::INVALID,
            access_masks: HashMap::new(),
            propagate_requests: Vec::new(),
            prev_frame_bindings: HashMap::new(),
            compiled: None,
        }
    }

    #[inline]
    pub fn base_resolution(&self) -> (u32, u32) {
        (self.base_width, self.base_height)
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn ensure_recording(&self) -> RtgResult<()> {
        match self.state {
            RtgBuilderState::Recording => Ok(()),
            RtgBuilderState::Compiled => Err(RtgError::AlreadyCompiled),
            RtgBuilderState::Executed => Err(RtgError::AlreadyExecuted),
        }
    }

    /// 创建一份惰性 2D 资源
    ///
    /// 只登记描述，物理纹理在 Compile 时才从资源池解析。
    /// Compile 之后调用无效，返回 INVALID 句柄。
    pub fn create_resource(&mut self, desc: RtgResourceDesc2D) -> RtgResourceHandle {
        if self.ensure_recording().is_err() {
            log::error!("rtg: create_resource after compile is ignored");
            return RtgResourceHandle::INVALID;
        }
        let handle = RtgResourceHandle::internal(self.manager.allocate_unique_id());
        self.descs.insert(handle, desc);
        handle
    }

    pub(crate) fn note_access(&mut self, handle: RtgResourceHandle, access: RtgAccessType) {
        *self.access_masks.entry(handle).or_default() |= access.mask();
    }

    /// 加入一个 graphics 节点，立即回调它的 setup
    pub fn add_graphics_node<N>(&mut self, name: impl Into<String>, node: N) -> RtgResult<RtgNodeId>
    where
        N: RtgGraphicsTaskNode + 'a,
    {
        self.ensure_recording()?;
        let name = name.into();
        let mut node = node;
        let mut recorder = RtgNodeBuilder {
            graph: self,
            node_name: &name,
            accesses: Vec::new(),
        };
        node.setup(&mut recorder);
        let accesses = recorder.accesses;

        self.nodes.push(RtgTaskNode {
            name,
            queue: RtgQueueClass::Graphics,
            accesses,
            stage: RtgTaskStage::frontmost(),
            executor: RtgNodeExecutor::Graphics(Box::new(node)),
        });
        Ok(RtgNodeId(self.nodes.len() - 1))
    }

    /// 加入一个 compute 节点，立即回调它的 setup
    pub fn add_compute_node<N>(&mut self, name: impl Into<String>, node: N) -> RtgResult<RtgNodeId>
    where
        N: RtgComputeTaskNode + 'a,
    {
        self.ensure_recording()?;
        let name = name.into();
        let mut node = node;
        let mut recorder = RtgNodeBuilder {
            graph: self,
            node_name: &name,
            accesses: Vec::new(),
        };
        node.setup(&mut recorder);
        let accesses = recorder.accesses;

        self.nodes.push(RtgTaskNode {
            name,
            queue: RtgQueueClass::Compute,
            accesses,
            stage: RtgTaskStage::frontmost(),
            executor: RtgNodeExecutor::Compute(Box::new(node)),
        });
        Ok(RtgNodeId(self.nodes.len() - 1))
    }

    /// 导入一张外部纹理
    ///
    /// `entry_state` 是纹理进入本图时的状态，`require_end_state` 是
    /// Execute 结束后必须恢复到的状态。两者的差异由图在收尾时补 barrier。
    ///
    /// 不登记尺寸/格式描述：外部资源不参与池查找，物理对象与视图
    /// 都由调用方提供，图只跟踪它的状态演化。
    pub fn import_external_texture(
        &mut self,
        texture: Option<RhiTextureHandle>,
        views: RtgExternalViews,
        entry_state: RhiResourceState,
        require_end_state: RhiResourceState,
    ) -> RtgResult<RtgResourceHandle> {
        self.ensure_recording()?;
        let texture = texture.ok_or(RtgError::InvalidExternalResource)?;
        let handle = RtgResourceHandle::external(self.manager.allocate_unique_id());
        self.externals.insert(
            handle,
            ExternalResourceInfo {
                texture: Some(texture),
                swapchain: None,
                rtv: views.rtv,
                dsv: views.dsv,
                srv: views.srv,
                uav: views.uav,
                entry_state,
                require_end_state,
                cached_state: entry_state,
                last_access_stage: RtgTaskStage::frontmost(),
            },
        );
        Ok(handle)
    }

    /// 导入本帧的 swapchain backbuffer
    pub fn import_swapchain(
        &mut self,
        swapchain: Option<RhiSwapchainHandle>,
        rtv: Option<RhiViewHandle>,
        entry_state: RhiResourceState,
        require_end_state: RhiResourceState,
    ) -> RtgResult<RtgResourceHandle> {
        self.ensure_recording()?;
        let swapchain = swapchain.ok_or(RtgError::InvalidExternalResource)?;
        let handle = RtgResourceHandle::swapchain(self.manager.allocate_unique_id());
        self.externals.insert(
            handle,
            ExternalResourceInfo {
                texture: None,
                swapchain: Some(swapchain),
                rtv,
                dsv: None,
                srv: None,
                uav: None,
                entry_state,
                require_end_state,
                cached_state: entry_state,
                last_access_stage: RtgTaskStage::frontmost(),
            },
        );
        self.swapchain_handle = handle;
        Ok(handle)
    }

    /// 本帧 swapchain 的句柄，未导入时返回 INVALID
    #[inline]
    pub fn get_swapchain_resource_handle(&self) -> RtgResourceHandle {
        self.swapchain_handle
    }

    /// 请求把一份内部资源的物理存储保留到下一帧
    ///
    /// Compile 时生效：对应池槽位被钉住，不参与复用与淘汰，直到下一帧
    /// 的 builder 通过 [`import_previous_frame_resource`] 接手或超时释放。
    ///
    /// [`import_previous_frame_resource`]: Self::import_previous_frame_resource
    pub fn propagate_resource_to_next_frame(&mut self, handle: RtgResourceHandle) -> RtgResult<()> {
        self.ensure_recording()?;
        if !handle.is_valid() || handle.is_external() {
            return Err(RtgError::InvalidPropagation(handle));
        }
        if !self.descs.contains_key(&handle) {
            return Err(RtgError::UnregisteredHandle(handle));
        }
        self.propagate_requests.push(handle);
        Ok(())
    }

    /// 接手上一帧传递下来的资源，返回本帧的新句柄
    ///
    /// `prev` 是上一帧调用 `propagate_resource_to_next_frame` 时的句柄。
    /// 物理纹理与其中的内容原样保留，资源状态从上一帧的缓存继续。
    pub fn import_previous_frame_resource(&mut self, prev: RtgResourceHandle) -> RtgResult<RtgResourceHandle> {
        self.ensure_recording()?;
        let (pool_index, desc) = self.manager.peek_propagated(prev).ok_or(RtgError::NotPropagated(prev))?;
        let handle = RtgResourceHandle::internal(self.manager.allocate_unique_id());
        self.descs.insert(handle, RtgResourceDesc2D::new_abs(desc.width, desc.height, desc.format));
        self.prev_frame_bindings.insert(handle, (prev, pool_index));
        Ok(handle)
    }
}

// ==================================================
// compile
// ==================================================

impl RenderTaskGraphBuilder<'_> {
    /// 编译本图，等价于 `manager.compile(self)`
    pub fn compile(&mut self) -> RtgResult<()> {
        let manager = self.manager.clone();
        manager.compile(self)
    }

    /// 实际的编译流程，由 manager 在持有池锁时调用
    pub(crate) fn compile_with_pool(
        &mut self,
        inner: &mut RtgManagerInner,
        device: &Mutex<dyn RhiDevice>,
        config: &RtgManagerConfig,
    ) -> RtgResult<()> {
        self.ensure_recording()?;

        // 校验：节点内不允许重复声明同一个句柄
        for node in &self.nodes {
            let mut seen = HashSet::new();
            for (handle, _) in &node.accesses {
                if !seen.insert(*handle) {
                    log::error!("rtg compile: node `{}` records {:?} more than once", node.name, handle);
                    return Err(RtgError::DuplicateAccess(*handle, node.name.clone()));
                }
            }
        }
        // 校验：整帧内 RT 与 DS 角色互斥
        for (&handle, &mask) in &self.access_masks {
            if mask.has_render_depth_conflict() {
                log::error!("rtg compile: {:?} used as both render target and depth target", handle);
                return Err(RtgError::RenderDepthConflict(handle));
            }
        }

        // 调度位置：单 stage，节点按录制顺序排 step
        for (step, node) in self.nodes.iter_mut().enumerate() {
            node.stage = RtgTaskStage::new(0, step as i32);
        }

        // 句柄按首次出现的顺序编成稠密下标，并聚合每个句柄的访问序列
        let mut handle_index: HashMap<RtgResourceHandle, usize> = HashMap::new();
        let mut ordered: Vec<RtgResourceHandle> = Vec::new();
        let mut touches: Vec<Vec<(usize, RtgAccessType)>> = Vec::new();
        for (node_idx, node) in self.nodes.iter().enumerate() {
            for &(handle, access) in &node.accesses {
                if !handle.is_valid() {
                    return Err(RtgError::UnregisteredHandle(handle));
                }
                let idx = *handle_index.entry(handle).or_insert_with(|| {
                    ordered.push(handle);
                    touches.push(Vec::new());
                    ordered.len() - 1
                });
                touches[idx].push((node_idx, access));
            }
        }

        // 生命周期：首次访问与最后访问的调度位置
        let lifetimes: Vec<(RtgTaskStage, RtgTaskStage)> = touches
            .iter()
            .map(|t| {
                let first = self.nodes[t[0].0].stage;
                let last = self.nodes[t[t.len() - 1].0].stage;
                (first, last)
            })
            .collect();

        // 绑定物理存储
        let mut bindings: Vec<CompiledResourceInfo> = Vec::with_capacity(ordered.len());
        let mut resolved: Vec<RtgResolvedResource> = Vec::with_capacity(ordered.len());
        for (idx, &handle) in ordered.iter().enumerate() {
            let (first, last) = lifetimes[idx];
            if let Some(&(prev_handle, pool_index)) = self.prev_frame_bindings.get(&handle) {
                // 上一帧传递下来的资源已经占着槽位，解除钉住后直接接手
                inner.propagated.remove(&prev_handle);
                let slot = inner.slot_mut(pool_index);
                slot.pinned = false;
                slot.last_access_stage = last;
                slot.used_this_frame = true;
                bindings.push(CompiledResourceInfo::Internal { pool_index });
                resolved.push(slot.resolved());
            } else if handle.is_external() {
                let ext = self.externals.get_mut(&handle).ok_or(RtgError::UnregisteredHandle(handle))?;
                ext.last_access_stage = last;
                bindings.push(CompiledResourceInfo::External);
                resolved.push(ext.resolved());
            } else {
                let desc = self.descs.get(&handle).ok_or(RtgError::UnregisteredHandle(handle))?;
                let (width, height) = desc.size.resolve(self.base_width, self.base_height);
                let mask = self.access_masks.get(&handle).copied().unwrap_or_default();
                let key = ResourceSearchKey {
                    format: desc.format,
                    width,
                    height,
                    usage: mask.required_usage(),
                };
                // 调试模式下关闭复用，每个句柄都拿独立的纹理
                let eligible_before = config.allow_pool_reuse.then_some(first);
                let pool_index = inner.get_or_create_from_pool(device, &key, eligible_before)?;
                let slot = inner.slot_mut(pool_index);
                slot.last_access_stage = last;
                slot.used_this_frame = true;
                bindings.push(CompiledResourceInfo::Internal { pool_index });
                resolved.push(slot.resolved());
            }
        }

        // 推导状态转换：从缓存状态出发，沿访问序列逐段演化。
        // 同一个槽位先后绑定多个句柄时，后一个句柄自然接住前一个留下的状态。
        let mut transitions: Vec<Vec<(RtgResourceHandle, RhiResourceState, RhiResourceState)>> = vec![Vec::new(); self.nodes.len()];
        for (idx, &handle) in ordered.iter().enumerate() {
            let entry = match bindings[idx] {
                CompiledResourceInfo::Internal { pool_index } => inner.slot_mut(pool_index).cached_state,
                CompiledResourceInfo::External => {
                    self.externals.get(&handle).ok_or(RtgError::UnregisteredHandle(handle))?.cached_state
                }
            };
            let mut cursor = entry;
            for &(node_idx, access) in &touches[idx] {
                let target = access.target_state();
                transitions[node_idx].push((handle, cursor, target));
                cursor = target;
            }
            match bindings[idx] {
                CompiledResourceInfo::Internal { pool_index } => {
                    let slot = inner.slot_mut(pool_index);
                    slot.prev_cached_state = entry;
                    slot.cached_state = cursor;
                }
                CompiledResourceInfo::External => {
                    if let Some(ext) = self.externals.get_mut(&handle) {
                        ext.cached_state = cursor;
                    }
                }
            }
        }

        // 跨帧传递：钉住槽位并登记给下一帧
        let frame = inner.frame_counter;
        for &handle in &self.propagate_requests {
            let idx = handle_index.get(&handle).copied().ok_or(RtgError::InvalidPropagation(handle))?;
            let CompiledResourceInfo::Internal { pool_index } = bindings[idx] else {
                return Err(RtgError::InvalidPropagation(handle));
            };
            let slot = inner.slot_mut(pool_index);
            slot.pinned = true;
            slot.last_access_stage = RtgTaskStage::endmost();
            inner.propagated.insert(handle, PropagatedSlot { pool_index, frame });
        }

        // 收尾：未钉住的槽位复位，供下一次编译从头复用
        for slot in inner.pool.iter_mut().flatten() {
            if !slot.pinned {
                slot.last_access_stage = RtgTaskStage::frontmost();
            }
        }

        log::debug!(
            "rtg compile: {} nodes, {} resources, pool holds {} instances",
            self.nodes.len(),
            ordered.len(),
            inner.occupied_count()
        );

        self.compiled = Some(RtgCompiledState {
            handle_index,
            ordered,
            bindings,
            resolved,
            lifetimes,
            transitions,
        });
        self.state = RtgBuilderState::Compiled;
        Ok(())
    }
}

// ==================================================
// execute & query
// ==================================================

impl RenderTaskGraphBuilder<'_> {
    /// 录制整帧：每个节点先补 barrier 再回调 run，最后把外部资源
    /// 恢复到约定的结束状态
    ///
    /// 命令列表要求同时具备 graphics 与 compute 能力（单队列调度，
    /// barrier 统一录制在这条列表上）。
    pub fn execute<C>(&mut self, cmd: &mut C) -> RtgResult<()>
    where
        C: RhiGraphicsCommandList + RhiComputeCommandList,
    {
        match self.state {
            RtgBuilderState::Recording => return Err(RtgError::NotCompiled),
            RtgBuilderState::Executed => return Err(RtgError::AlreadyExecuted),
            RtgBuilderState::Compiled => {}
        }
        let compiled = self.compiled.as_ref().ok_or(RtgError::NotCompiled)?;

        for (node_idx, node) in self.nodes.iter().enumerate() {
            cmd.begin_event(&node.name);
            for &(handle, before, after) in &compiled.transitions[node_idx] {
                if before == after {
                    continue;
                }
                let resolved = compiled.resolved_for(handle)?;
                if let Some(swapchain) = resolved.swapchain {
                    cmd.swapchain_barrier(swapchain, before, after);
                } else if let Some(texture) = resolved.texture {
                    cmd.texture_barrier(texture, before, after);
                }
            }

            let ctx = RtgNodeContext {
                node_name: &node.name,
                accesses: &node.accesses,
                transitions: &compiled.transitions[node_idx],
                compiled,
            };
            match &node.executor {
                RtgNodeExecutor::Graphics(n) => n.run(&ctx, cmd),
                RtgNodeExecutor::Compute(n) => n.run(&ctx, cmd),
            }
            cmd.end_event();
        }

        // 外部资源恢复到结束状态，包括本帧没有任何节点访问过的
        let mut external_handles: Vec<RtgResourceHandle> = self.externals.keys().copied().collect();
        external_handles.sort();
        for handle in external_handles {
            let Some(ext) = self.externals.get_mut(&handle) else { continue };
            if ext.cached_state == ext.require_end_state {
                continue;
            }
            log::trace!("rtg: restore external {:?} {:?} -> {:?}", handle, ext.cached_state, ext.require_end_state);
            if let Some(swapchain) = ext.swapchain {
                cmd.swapchain_barrier(swapchain, ext.cached_state, ext.require_end_state);
            } else if let Some(texture) = ext.texture {
                cmd.texture_barrier(texture, ext.cached_state, ext.require_end_state);
            }
            ext.cached_state = ext.require_end_state;
        }

        self.externals.clear();
        self.state = RtgBuilderState::Executed;
        Ok(())
    }

    /// 查询某个节点视角下句柄绑定到的物理资源，Compile 之后可用
    pub fn get_allocated_resource(&self, node: RtgNodeId, handle: RtgResourceHandle) -> RtgResult<RtgAllocatedResource> {
        let compiled = self.compiled.as_ref().ok_or(RtgError::NotCompiled)?;
        let transitions = compiled.transitions.get(node.0).ok_or(RtgError::UnknownNode)?;
        let (_, prev, curr) = transitions
            .iter()
            .find(|(h, _, _)| *h == handle)
            .ok_or(RtgError::HandleNotRecordedByNode(handle))?;
        Ok(RtgAllocatedResource {
            prev_state: *prev,
            curr_state: *curr,
            resolved: compiled.resolved_for(handle)?,
        })
    }

    /// 把编译结果打进日志，方便排查调度与 barrier 问题
    pub fn print_execution_plan(&self) {
        let Some(compiled) = self.compiled.as_ref() else {
            log::warn!("rtg: execution plan requested before compile");
            return;
        };

        log::info!("========== render task graph: {} nodes, {} resources ==========", self.nodes.len(), compiled.ordered.len());
        for (node_idx, node) in self.nodes.iter().enumerate() {
            let accesses = node.accesses.iter().map(|(h, a)| format!("{h:?}:{a:?}")).join(", ");
            log::info!("[{}.{}] {:?} `{}` {{{}}}", node.stage.stage, node.stage.step, node.queue, node.name, accesses);
            for &(handle, before, after) in &compiled.transitions[node_idx] {
                if before != after {
                    log::info!("    barrier {:?} {:?} -> {:?}", handle, before, after);
                }
            }
        }
        for (idx, &handle) in compiled.ordered.iter().enumerate() {
            let (first, last) = compiled.lifetimes[idx];
            let binding = match compiled.bindings[idx] {
                CompiledResourceInfo::Internal { pool_index } => format!("pool#{pool_index}"),
                CompiledResourceInfo::External => "external".to_string(),
            };
            log::info!("res {:?} alive [{}.{} .. {}.{}] -> {}", handle, first.stage, first.step, last.stage, last.step, binding);
        }
    }
}
