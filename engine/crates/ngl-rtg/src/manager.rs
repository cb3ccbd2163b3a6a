//! 任务图 manager
//!
//! manager 跨帧长期存活，持有两样东西：
//!
//! - **资源池**: 所有内部资源的物理纹理。编译时按首次匹配（first-fit）
//!   复用，连续多帧没人用的实例会被淘汰销毁。
//! - **池锁**: 所有 builder 的 Compile 都经由 manager 串行执行，
//!   一次只有一个图在读写池。
//!
//! 同一帧内多个图依次编译时，调用方必须保证 Compile 的顺序与
//! 最终的 GPU 提交顺序一致：状态缓存按编译顺序链式推进，顺序错位
//! 会推导出错误的 barrier。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ngl_rhi::{RhiDevice, RhiResourceState, RhiTextureDesc, RhiViewKind};

use crate::builder::RenderTaskGraphBuilder;
use crate::error::RtgResult;
use crate::handle::RtgResourceHandle;
use crate::resource::{InternalResourceInstance, ResourceSearchKey};
use crate::stage::RtgTaskStage;

/// manager 的行为配置
#[derive(Clone, Copy, Debug)]
pub struct RtgManagerConfig {
    /// 连续多少帧未被绑定后淘汰池中实例
    pub evict_after_frames: u32,
    /// 关闭后每个句柄都分配独立纹理，用于排查资源混叠问题
    pub allow_pool_reuse: bool,
}

impl Default for RtgManagerConfig {
    fn default() -> Self {
        Self {
            evict_after_frames: 60,
            allow_pool_reuse: true,
        }
    }
}

/// 跨帧传递中的池槽位
pub(crate) struct PropagatedSlot {
    pub pool_index: usize,
    /// 发起传递的帧号，隔一帧没人接手就释放
    pub frame: u64,
}

/// 池锁保护的部分
pub(crate) struct RtgManagerInner {
    /// 槽位用 `Option` 占位，淘汰后留下空洞，下标保持稳定
    pub pool: Vec<Option<InternalResourceInstance>>,
    /// 上一帧传递出来、等待接手的资源
    pub propagated: HashMap<RtgResourceHandle, PropagatedSlot>,
    pub frame_counter: u64,
}

impl RtgManagerInner {
    /// 取出占用中的槽位
    ///
    /// 下标来自本次编译期间的绑定结果，槽位必然存在。
    pub fn slot_mut(&mut self, index: usize) -> &mut InternalResourceInstance {
        self.pool[index].as_mut().expect("bound pool slot is vacant")
    }

    pub fn occupied_count(&self) -> usize {
        self.pool.iter().filter(|slot| slot.is_some()).count()
    }

    /// 首次匹配查找，失败则创建新实例
    ///
    /// `eligible_before` 是新绑定的首次访问位置；传 `None` 表示跳过
    /// 查找直接创建。只创建 `key.usage` 要求的那些视图。
    pub fn get_or_create_from_pool(
        &mut self,
        device: &Mutex<dyn RhiDevice>,
        key: &ResourceSearchKey,
        eligible_before: Option<RtgTaskStage>,
    ) -> RtgResult<usize> {
        if let Some(before) = eligible_before {
            let found = self
                .pool
                .iter()
                .position(|slot| slot.as_ref().is_some_and(|inst| inst.matches(key, before)));
            if let Some(index) = found {
                log::trace!("rtg pool: reuse slot {index} for {key:?}");
                return Ok(index);
            }
        }

        let index = self.pool.iter().position(|slot| slot.is_none()).unwrap_or(self.pool.len());
        let desc = RhiTextureDesc {
            width: key.width,
            height: key.height,
            format: key.format,
            usage: key.usage,
            initial_state: RhiResourceState::Common,
        };

        let mut device = device.lock().unwrap_or_else(PoisonError::into_inner);
        let name = format!("rtg-pool-{index}");
        let texture = device.create_texture(&desc, &name)?;
        let mut instance = InternalResourceInstance {
            desc,
            texture,
            rtv: None,
            dsv: None,
            srv: None,
            uav: None,
            last_access_stage: RtgTaskStage::frontmost(),
            cached_state: desc.initial_state,
            prev_cached_state: desc.initial_state,
            unused_frame_count: 0,
            used_this_frame: false,
            pinned: false,
        };
        if key.usage.contains(ngl_rhi::RhiTextureUsage::RENDER_TARGET) {
            instance.rtv = Some(device.create_view(texture, RhiViewKind::Rtv)?);
        }
        if key.usage.contains(ngl_rhi::RhiTextureUsage::DEPTH_STENCIL) {
            instance.dsv = Some(device.create_view(texture, RhiViewKind::Dsv)?);
        }
        if key.usage.contains(ngl_rhi::RhiTextureUsage::SHADER_RESOURCE) {
            instance.srv = Some(device.create_view(texture, RhiViewKind::Srv)?);
        }
        if key.usage.contains(ngl_rhi::RhiTextureUsage::UNORDERED_ACCESS) {
            instance.uav = Some(device.create_view(texture, RhiViewKind::Uav)?);
        }
        drop(device);

        log::debug!("rtg pool: new instance at slot {index}: {}x{} {:?}", key.width, key.height, key.format);
        if index == self.pool.len() {
            self.pool.push(Some(instance));
        } else {
            self.pool[index] = Some(instance);
        }
        Ok(index)
    }
}

/// 长期存活的任务图 manager
pub struct RenderTaskGraphManager {
    device: Arc<Mutex<dyn RhiDevice>>,
    inner: Mutex<RtgManagerInner>,
    /// 句柄 id 分配器，0 保留给 INVALID
    next_unique_id: AtomicU32,
    config: RtgManagerConfig,
}

impl RenderTaskGraphManager {
    pub fn new(device: Arc<Mutex<dyn RhiDevice>>, config: RtgManagerConfig) -> Arc<Self> {
        Arc::new(Self {
            device,
            inner: Mutex::new(RtgManagerInner {
                pool: Vec::new(),
                propagated: HashMap::new(),
                frame_counter: 0,
            }),
            next_unique_id: AtomicU32::new(1),
            config,
        })
    }

    /// 为当前帧创建一个 builder
    pub fn create_builder<'a>(self: &Arc<Self>, base_width: u32, base_height: u32) -> RenderTaskGraphBuilder<'a> {
        RenderTaskGraphBuilder::new(self.clone(), base_width, base_height)
    }

    pub(crate) fn allocate_unique_id(&self) -> u32 {
        self.next_unique_id.fetch_add(1, Ordering::Relaxed)
    }

    /// 编译一个 builder
    ///
    /// 所有编译持同一把池锁串行执行。同帧多图时编译顺序必须与 GPU
    /// 提交顺序一致，否则跨图共享槽位的状态缓存会推导出错误的 barrier。
    pub fn compile(self: &Arc<Self>, builder: &mut RenderTaskGraphBuilder<'_>) -> RtgResult<()> {
        if !Arc::ptr_eq(self, &builder.manager) {
            return Err(crate::error::RtgError::ManagerMismatch);
        }
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        builder.compile_with_pool(&mut inner, &self.device, &self.config)
    }

    /// 推进到下一帧：折算空闲计数、淘汰久未使用的实例、释放过期的
    /// 跨帧传递
    pub fn begin_frame(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.frame_counter += 1;
        let current_frame = inner.frame_counter;

        // 隔一帧没被接手的传递资源不再保留
        let mut stale: Vec<RtgResourceHandle> = Vec::new();
        for (&handle, slot) in &inner.propagated {
            if slot.frame + 1 < current_frame {
                stale.push(handle);
            }
        }
        for handle in stale {
            if let Some(prop) = inner.propagated.remove(&handle) {
                log::debug!("rtg pool: propagated resource {handle:?} not imported, releasing slot {}", prop.pool_index);
                if let Some(slot) = inner.pool[prop.pool_index].as_mut() {
                    slot.pinned = false;
                    slot.last_access_stage = RtgTaskStage::frontmost();
                }
            }
        }

        for slot in inner.pool.iter_mut().flatten() {
            if slot.used_this_frame {
                slot.unused_frame_count = 0;
            } else {
                slot.unused_frame_count += 1;
            }
            slot.used_this_frame = false;
        }

        // 淘汰
        let evict_after = self.config.evict_after_frames;
        let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        for index in 0..inner.pool.len() {
            let evict = inner.pool[index]
                .as_ref()
                .is_some_and(|slot| !slot.pinned && slot.unused_frame_count >= evict_after);
            if !evict {
                continue;
            }
            if let Some(slot) = inner.pool[index].take() {
                log::debug!(
                    "rtg pool: evict slot {index} ({}x{} {:?}) after {} idle frames",
                    slot.desc.width,
                    slot.desc.height,
                    slot.desc.format,
                    slot.unused_frame_count
                );
                device.destroy_texture(slot.texture);
            }
        }
    }

    /// 查看一份等待接手的跨帧资源，返回 (池槽位, 纹理描述)
    pub(crate) fn peek_propagated(&self, prev: RtgResourceHandle) -> Option<(usize, RhiTextureDesc)> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let prop = inner.propagated.get(&prev)?;
        let slot = inner.pool[prop.pool_index].as_ref()?;
        Some((prop.pool_index, slot.desc))
    }

    /// 池中占用的实例数量
    pub fn pool_size(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).occupied_count()
    }

    #[inline]
    pub fn config(&self) -> &RtgManagerConfig {
        &self.config
    }
}
