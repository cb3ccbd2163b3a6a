//! 任务图端到端测试：headless 后端上跑完整的 Record -> Compile -> Execute

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use ngl_rhi::headless::{HeadlessCommand, HeadlessCommandList, HeadlessRhiDevice};
use ngl_rhi::{RhiCommandListId, RhiComputeCommandList, RhiDevice, RhiFormat, RhiGraphicsCommandList, RhiResourceState, RhiTextureDesc, RhiTextureHandle, RhiTextureUsage};
use ngl_rtg::{
    RenderTaskGraphManager, RtgAccessType, RtgError, RtgExternalViews, RtgManagerConfig, RtgNodeBuilder, RtgNodeContext, RtgResourceDesc2D,
    RtgResourceHandle,
};

fn setup() -> (Arc<Mutex<HeadlessRhiDevice>>, Arc<RenderTaskGraphManager>) {
    setup_with(RtgManagerConfig::default())
}

fn setup_with(config: RtgManagerConfig) -> (Arc<Mutex<HeadlessRhiDevice>>, Arc<RenderTaskGraphManager>) {
    ngl_crate_tools::init_test_log();
    let device = Arc::new(Mutex::new(HeadlessRhiDevice::new()));
    let manager = RenderTaskGraphManager::new(device.clone(), config);
    (device, manager)
}

/// 按构造时给定的列表声明访问，run 时验证每个句柄都能解析
struct AccessPass {
    accesses: Vec<(RtgResourceHandle, RtgAccessType)>,
}

impl AccessPass {
    fn new(accesses: impl Into<Vec<(RtgResourceHandle, RtgAccessType)>>) -> Self {
        Self { accesses: accesses.into() }
    }
}

impl ngl_rtg::RtgGraphicsTaskNode for AccessPass {
    fn setup(&mut self, builder: &mut RtgNodeBuilder<'_, '_>) {
        for &(handle, access) in &self.accesses {
            builder.record_resource_access(handle, access);
        }
    }

    fn run(&self, ctx: &RtgNodeContext<'_>, _cmd: &mut dyn RhiGraphicsCommandList) {
        for &(handle, _) in &self.accesses {
            ctx.get_allocated_resource(handle).unwrap();
        }
    }
}

struct ComputeAccessPass {
    accesses: Vec<(RtgResourceHandle, RtgAccessType)>,
}

impl ngl_rtg::RtgComputeTaskNode for ComputeAccessPass {
    fn setup(&mut self, builder: &mut RtgNodeBuilder<'_, '_>) {
        for &(handle, access) in &self.accesses {
            builder.record_resource_access(handle, access);
        }
    }

    fn run(&self, ctx: &RtgNodeContext<'_>, _cmd: &mut dyn RhiComputeCommandList) {
        for &(handle, _) in &self.accesses {
            ctx.get_allocated_resource(handle).unwrap();
        }
    }
}

fn texture_barriers(cmd: &HeadlessCommandList) -> Vec<(RhiTextureHandle, RhiResourceState, RhiResourceState)> {
    cmd.commands()
        .iter()
        .filter_map(|c| match c {
            HeadlessCommand::TextureBarrier { texture, before, after } => Some((*texture, *before, *after)),
            _ => None,
        })
        .collect()
}

fn swapchain_barriers(cmd: &HeadlessCommandList) -> Vec<(RhiResourceState, RhiResourceState)> {
    cmd.commands()
        .iter()
        .filter_map(|c| match c {
            HeadlessCommand::SwapchainBarrier { before, after, .. } => Some((*before, *after)),
            _ => None,
        })
        .collect()
}

// ==================================================
// 场景测试
// ==================================================

/// 单节点渲染到 swapchain：进出各一条 barrier
#[test]
fn test_swapchain_render_roundtrip() {
    let (device, manager) = setup();
    let swapchain = device.lock().unwrap().register_swapchain(1280, 720, RhiFormat::B8G8R8A8Unorm, 3);

    manager.begin_frame();
    let mut graph = manager.create_builder(1280, 720);
    let backbuffer = graph
        .import_swapchain(Some(swapchain), None, RhiResourceState::Present, RhiResourceState::Present)
        .unwrap();
    assert_eq!(graph.get_swapchain_resource_handle(), backbuffer);
    assert!(backbuffer.is_swapchain());

    graph.add_graphics_node("present-pass", AccessPass::new([(backbuffer, RtgAccessType::RenderTarget)])).unwrap();
    graph.compile().unwrap();
    graph.print_execution_plan();

    let mut cmd = HeadlessCommandList::new(RhiCommandListId(1));
    graph.execute(&mut cmd).unwrap();

    // Present -> RenderTarget 进入节点，结束后恢复 Present，再无其它 barrier
    assert_eq!(
        swapchain_barriers(&cmd),
        vec![
            (RhiResourceState::Present, RhiResourceState::RenderTarget),
            (RhiResourceState::RenderTarget, RhiResourceState::Present),
        ]
    );
    assert_eq!(cmd.barrier_count(), 2);
}

/// 生命周期不重叠的两份资源落在同一张物理纹理上，barrier 链跨句柄延续
#[test]
fn test_transient_aliasing_within_frame() {
    let (device, manager) = setup();

    manager.begin_frame();
    let mut graph = manager.create_builder(1920, 1080);
    let desc = RtgResourceDesc2D::new_rel(1.0, 1.0, RhiFormat::R16G16B16A16Float);
    let tex_a = graph.create_resource(desc);
    let tex_b = graph.create_resource(desc);

    // A 的生命周期 [0, 1]，B 从 2 开始，B 可以复用 A 的存储
    let n0 = graph.add_graphics_node("write-a", AccessPass::new([(tex_a, RtgAccessType::RenderTarget)])).unwrap();
    graph.add_graphics_node("read-a", AccessPass::new([(tex_a, RtgAccessType::ShaderRead)])).unwrap();
    let n2 = graph.add_graphics_node("write-b", AccessPass::new([(tex_b, RtgAccessType::RenderTarget)])).unwrap();
    graph.compile().unwrap();

    let phys_a = graph.get_allocated_resource(n0, tex_a).unwrap().resolved.texture.unwrap();
    let phys_b = graph.get_allocated_resource(n2, tex_b).unwrap().resolved.texture.unwrap();
    assert_eq!(phys_a, phys_b);
    assert_eq!(manager.pool_size(), 1);
    assert_eq!(device.lock().unwrap().created_texture_count(), 1);

    let mut cmd = HeadlessCommandList::new(RhiCommandListId(1));
    graph.execute(&mut cmd).unwrap();

    // B 的链从 A 留下的 ShaderRead 状态继续
    assert_eq!(
        texture_barriers(&cmd),
        vec![
            (phys_a, RhiResourceState::Common, RhiResourceState::RenderTarget),
            (phys_a, RhiResourceState::RenderTarget, RhiResourceState::ShaderRead),
            (phys_a, RhiResourceState::ShaderRead, RhiResourceState::RenderTarget),
        ]
    );
}

/// 生命周期重叠时不会混叠，各拿各的纹理
#[test]
fn test_overlapping_lifetimes_do_not_alias() {
    let (device, manager) = setup();

    manager.begin_frame();
    let mut graph = manager.create_builder(1920, 1080);
    let desc = RtgResourceDesc2D::new_rel(1.0, 1.0, RhiFormat::R16G16B16A16Float);
    let tex_a = graph.create_resource(desc);
    let tex_b = graph.create_resource(desc);

    graph.add_graphics_node("write-a", AccessPass::new([(tex_a, RtgAccessType::RenderTarget)])).unwrap();
    graph.add_graphics_node("write-b", AccessPass::new([(tex_b, RtgAccessType::RenderTarget)])).unwrap();
    // 两份资源在同一个节点里同时存活
    graph
        .add_graphics_node(
            "read-both",
            AccessPass::new([(tex_a, RtgAccessType::ShaderRead), (tex_b, RtgAccessType::ShaderRead)]),
        )
        .unwrap();
    graph.compile().unwrap();

    assert_eq!(manager.pool_size(), 2);
    assert_eq!(device.lock().unwrap().created_texture_count(), 2);
}

/// 跨帧复用：第二帧不再创建纹理，且从缓存状态续链
#[test]
fn test_pool_reuse_across_frames() {
    let (device, manager) = setup();
    let mut barrier_counts = Vec::new();

    for frame in 0..2u64 {
        manager.begin_frame();
        let mut graph = manager.create_builder(1920, 1080);
        let tex = graph.create_resource(RtgResourceDesc2D::new_rel(1.0, 1.0, RhiFormat::R8G8B8A8Unorm));
        graph.add_graphics_node("draw", AccessPass::new([(tex, RtgAccessType::RenderTarget)])).unwrap();
        graph.compile().unwrap();

        let mut cmd = HeadlessCommandList::new(RhiCommandListId(frame));
        graph.execute(&mut cmd).unwrap();
        barrier_counts.push(cmd.barrier_count());
    }

    assert_eq!(device.lock().unwrap().created_texture_count(), 1);
    assert_eq!(manager.pool_size(), 1);
    // 第一帧 Common -> RenderTarget；第二帧缓存状态已是 RenderTarget，无需 barrier
    assert_eq!(barrier_counts, vec![1, 0]);
}

/// compute 节点的 UAV 访问：barrier 由图推导，节点只拿 UAV 视图
#[test]
fn test_compute_uav_access() {
    let (_device, manager) = setup();

    manager.begin_frame();
    let mut graph = manager.create_builder(640, 480);
    let buffer = graph.create_resource(RtgResourceDesc2D::new_abs(640, 480, RhiFormat::R32Float));
    let node = graph
        .add_compute_node("simulate", ComputeAccessPass { accesses: vec![(buffer, RtgAccessType::Uav)] })
        .unwrap();
    graph.compile().unwrap();

    let allocated = graph.get_allocated_resource(node, buffer).unwrap();
    assert!(allocated.resolved.uav.is_some());
    // 访问掩码只有 UAV，其它视图不会创建
    assert!(allocated.resolved.rtv.is_none());
    assert!(allocated.resolved.srv.is_none());
    assert_eq!(allocated.prev_state, RhiResourceState::Common);
    assert_eq!(allocated.curr_state, RhiResourceState::UnorderedAccess);

    let mut cmd = HeadlessCommandList::new(RhiCommandListId(1));
    graph.execute(&mut cmd).unwrap();
    let phys = allocated.resolved.texture.unwrap();
    assert_eq!(texture_barriers(&cmd), vec![(phys, RhiResourceState::Common, RhiResourceState::UnorderedAccess)]);
}

/// 只读、从未被写入的资源也能正常编译绑定
#[test]
fn test_read_only_resource_compiles() {
    let (device, manager) = setup();

    manager.begin_frame();
    let mut graph = manager.create_builder(1920, 1080);
    let history = graph.create_resource(RtgResourceDesc2D::new_rel(0.5, 0.5, RhiFormat::R8G8B8A8Unorm));
    let n0 = graph.add_graphics_node("sample-1", AccessPass::new([(history, RtgAccessType::ShaderRead)])).unwrap();
    graph.add_graphics_node("sample-2", AccessPass::new([(history, RtgAccessType::ShaderRead)])).unwrap();
    graph.compile().unwrap();

    assert_eq!(manager.pool_size(), 1);
    let phys = graph.get_allocated_resource(n0, history).unwrap().resolved.texture.unwrap();
    let desc = device.lock().unwrap().texture_desc(phys).unwrap();
    assert_eq!((desc.width, desc.height), (960, 540));

    // 新纹理从 Common 进入 ShaderRead，第二个节点无需再转换
    let mut cmd = HeadlessCommandList::new(RhiCommandListId(1));
    graph.execute(&mut cmd).unwrap();
    assert_eq!(texture_barriers(&cmd), vec![(phys, RhiResourceState::Common, RhiResourceState::ShaderRead)]);
}

/// 相对尺寸在 Compile 时按基准分辨率解析
#[test]
fn test_relative_size_resolution() {
    let (device, manager) = setup();

    manager.begin_frame();
    let mut graph = manager.create_builder(1920, 1080);
    let half = graph.create_resource(RtgResourceDesc2D::new_rel(0.5, 0.5, RhiFormat::R11G11B10Float));
    let node = graph.add_graphics_node("downsample", AccessPass::new([(half, RtgAccessType::RenderTarget)])).unwrap();
    graph.compile().unwrap();

    let phys = graph.get_allocated_resource(node, half).unwrap().resolved.texture.unwrap();
    let desc = device.lock().unwrap().texture_desc(phys).unwrap();
    assert_eq!((desc.width, desc.height), (960, 540));
    assert_eq!(desc.format, RhiFormat::R11G11B10Float);
}

// ==================================================
// 句柄与校验
// ==================================================

/// 同一个 manager 下所有句柄（含外部与 swapchain）两两不同
#[test]
fn test_handle_uniqueness_across_builders() {
    let (device, manager) = setup();
    let swapchain = device.lock().unwrap().register_swapchain(800, 600, RhiFormat::B8G8R8A8Unorm, 2);
    let external_tex = device
        .lock()
        .unwrap()
        .create_texture(&RhiTextureDesc::new_2d(64, 64, RhiFormat::R8G8B8A8Unorm), "ext")
        .unwrap();

    manager.begin_frame();
    let mut g1 = manager.create_builder(800, 600);
    let mut g2 = manager.create_builder(800, 600);

    let desc = RtgResourceDesc2D::new_abs(32, 32, RhiFormat::R8G8B8A8Unorm);
    let handles = [
        g1.create_resource(desc),
        g1.create_resource(desc),
        g2.create_resource(desc),
        g1.import_external_texture(
            Some(external_tex),
            RtgExternalViews::default(),
            RhiResourceState::ShaderRead,
            RhiResourceState::ShaderRead,
        )
        .unwrap(),
        g2.import_swapchain(Some(swapchain), None, RhiResourceState::Present, RhiResourceState::Present).unwrap(),
    ];

    let bits: HashSet<u64> = handles.iter().map(|h| h.to_bits()).collect();
    assert_eq!(bits.len(), handles.len());
    assert!(handles.iter().all(|h| h.is_valid()));
    assert!(handles[3].is_external() && !handles[3].is_swapchain());
    assert!(handles[4].is_external() && handles[4].is_swapchain());
}

/// 同帧内 RT 与 DS 角色互斥
#[test]
fn test_render_depth_role_conflict_rejected() {
    let (_device, manager) = setup();

    manager.begin_frame();
    let mut graph = manager.create_builder(800, 600);
    let tex = graph.create_resource(RtgResourceDesc2D::new_abs(800, 600, RhiFormat::D32Float));
    graph.add_graphics_node("as-color", AccessPass::new([(tex, RtgAccessType::RenderTarget)])).unwrap();
    graph.add_graphics_node("as-depth", AccessPass::new([(tex, RtgAccessType::DepthTarget)])).unwrap();

    assert!(matches!(graph.compile(), Err(RtgError::RenderDepthConflict(h)) if h == tex));
}

/// 一个节点不能重复声明同一个句柄
#[test]
fn test_duplicate_access_in_node_rejected() {
    let (_device, manager) = setup();

    manager.begin_frame();
    let mut graph = manager.create_builder(800, 600);
    let tex = graph.create_resource(RtgResourceDesc2D::new_abs(256, 256, RhiFormat::R8G8B8A8Unorm));
    graph
        .add_graphics_node(
            "broken",
            AccessPass::new([(tex, RtgAccessType::RenderTarget), (tex, RtgAccessType::ShaderRead)]),
        )
        .unwrap();

    assert!(matches!(graph.compile(), Err(RtgError::DuplicateAccess(h, name)) if h == tex && name == "broken"));
}

/// 未在本 builder 上登记过的句柄在 Compile 时报错
#[test]
fn test_foreign_handle_rejected() {
    let (_device, manager) = setup();

    manager.begin_frame();
    let mut other = manager.create_builder(800, 600);
    let foreign = other.create_resource(RtgResourceDesc2D::new_abs(64, 64, RhiFormat::R8G8B8A8Unorm));

    let mut graph = manager.create_builder(800, 600);
    graph.add_graphics_node("steal", AccessPass::new([(foreign, RtgAccessType::ShaderRead)])).unwrap();
    assert!(matches!(graph.compile(), Err(RtgError::UnregisteredHandle(h)) if h == foreign));
}

// ==================================================
// 生命周期状态机
// ==================================================

/// builder 是一次性对象：重复 Compile / Execute 都是硬错误
#[test]
fn test_builder_is_single_use() {
    let (_device, manager) = setup();

    manager.begin_frame();
    let mut graph = manager.create_builder(800, 600);
    let tex = graph.create_resource(RtgResourceDesc2D::new_abs(64, 64, RhiFormat::R8G8B8A8Unorm));
    graph.add_graphics_node("draw", AccessPass::new([(tex, RtgAccessType::RenderTarget)])).unwrap();

    // Compile 之前不能 Execute
    let mut cmd = HeadlessCommandList::new(RhiCommandListId(1));
    assert!(matches!(graph.execute(&mut cmd), Err(RtgError::NotCompiled)));

    graph.compile().unwrap();
    assert!(matches!(graph.compile(), Err(RtgError::AlreadyCompiled)));
    // Compile 之后不能再加节点
    assert!(matches!(
        graph.add_graphics_node("late", AccessPass::new([])),
        Err(RtgError::AlreadyCompiled)
    ));

    graph.execute(&mut cmd).unwrap();
    assert!(matches!(graph.execute(&mut cmd), Err(RtgError::AlreadyExecuted)));
    assert!(matches!(graph.compile(), Err(RtgError::AlreadyExecuted)));
}

/// builder 只能交回创建它的 manager 编译
#[test]
fn test_manager_mismatch() {
    let (_d1, m1) = setup();
    let (_d2, m2) = setup();

    m1.begin_frame();
    let mut graph = m1.create_builder(800, 600);
    assert!(matches!(m2.compile(&mut graph), Err(RtgError::ManagerMismatch)));
    // 原 manager 仍然可以正常编译
    graph.compile().unwrap();
}

/// 查询只认节点声明过的句柄
#[test]
fn test_allocated_resource_query_scope() {
    let (_device, manager) = setup();

    manager.begin_frame();
    let mut graph = manager.create_builder(800, 600);
    let desc = RtgResourceDesc2D::new_abs(128, 128, RhiFormat::R8G8B8A8Unorm);
    let tex_a = graph.create_resource(desc);
    let tex_b = graph.create_resource(desc);
    let n0 = graph.add_graphics_node("only-a", AccessPass::new([(tex_a, RtgAccessType::RenderTarget)])).unwrap();
    graph.add_graphics_node("only-b", AccessPass::new([(tex_b, RtgAccessType::RenderTarget)])).unwrap();

    assert!(matches!(graph.get_allocated_resource(n0, tex_a), Err(RtgError::NotCompiled)));
    graph.compile().unwrap();

    assert!(graph.get_allocated_resource(n0, tex_a).is_ok());
    assert!(matches!(
        graph.get_allocated_resource(n0, tex_b),
        Err(RtgError::HandleNotRecordedByNode(h)) if h == tex_b
    ));
}

// ==================================================
// 外部资源
// ==================================================

/// 外部纹理的进出状态契约，包括整帧未被访问的情况
#[test]
fn test_external_texture_end_state_restore() {
    let (device, manager) = setup();
    let desc = RhiTextureDesc::new_2d(512, 512, RhiFormat::R8G8B8A8Unorm)
        .with_usage(RhiTextureUsage::RENDER_TARGET | RhiTextureUsage::SHADER_RESOURCE);
    let (touched, untouched) = {
        let mut dev = device.lock().unwrap();
        (dev.create_texture(&desc, "touched").unwrap(), dev.create_texture(&desc, "untouched").unwrap())
    };

    manager.begin_frame();
    let mut graph = manager.create_builder(512, 512);
    let h_touched = graph
        .import_external_texture(Some(touched), RtgExternalViews::default(), RhiResourceState::ShaderRead, RhiResourceState::ShaderRead)
        .unwrap();
    // 整帧没有任何节点访问它，但进出状态不一致，收尾时也要补 barrier
    graph
        .import_external_texture(Some(untouched), RtgExternalViews::default(), RhiResourceState::Common, RhiResourceState::ShaderRead)
        .unwrap();

    graph.add_graphics_node("overwrite", AccessPass::new([(h_touched, RtgAccessType::RenderTarget)])).unwrap();
    graph.compile().unwrap();

    let mut cmd = HeadlessCommandList::new(RhiCommandListId(1));
    graph.execute(&mut cmd).unwrap();

    let barriers = texture_barriers(&cmd);
    assert!(barriers.contains(&(touched, RhiResourceState::ShaderRead, RhiResourceState::RenderTarget)));
    assert!(barriers.contains(&(touched, RhiResourceState::RenderTarget, RhiResourceState::ShaderRead)));
    assert!(barriers.contains(&(untouched, RhiResourceState::Common, RhiResourceState::ShaderRead)));
    assert_eq!(barriers.len(), 3);
}

/// 外部导入必须带有物理对象
#[test]
fn test_external_import_requires_storage() {
    let (_device, manager) = setup();

    manager.begin_frame();
    let mut graph = manager.create_builder(800, 600);
    assert!(matches!(
        graph.import_external_texture(None, RtgExternalViews::default(), RhiResourceState::Common, RhiResourceState::Common),
        Err(RtgError::InvalidExternalResource)
    ));
    assert!(matches!(
        graph.import_swapchain(None, None, RhiResourceState::Present, RhiResourceState::Present),
        Err(RtgError::InvalidExternalResource)
    ));
}

// ==================================================
// 资源池策略
// ==================================================

/// 连续空闲超过阈值的实例被淘汰销毁
#[test]
fn test_pool_eviction() {
    let (device, manager) = setup_with(RtgManagerConfig {
        evict_after_frames: 2,
        allow_pool_reuse: true,
    });

    manager.begin_frame();
    let mut graph = manager.create_builder(800, 600);
    let tex = graph.create_resource(RtgResourceDesc2D::new_abs(256, 256, RhiFormat::R8G8B8A8Unorm));
    graph.add_graphics_node("draw", AccessPass::new([(tex, RtgAccessType::RenderTarget)])).unwrap();
    graph.compile().unwrap();
    assert_eq!(manager.pool_size(), 1);

    // 两帧没人用之后第三次 begin_frame 触发淘汰
    manager.begin_frame();
    manager.begin_frame();
    assert_eq!(manager.pool_size(), 1);
    manager.begin_frame();
    assert_eq!(manager.pool_size(), 0);
    assert_eq!(device.lock().unwrap().texture_count(), 0);
}

/// 调试模式：关闭复用后每个句柄都拿独立纹理
#[test]
fn test_pool_reuse_disabled() {
    let (device, manager) = setup_with(RtgManagerConfig {
        evict_after_frames: 60,
        allow_pool_reuse: false,
    });

    manager.begin_frame();
    let mut graph = manager.create_builder(1920, 1080);
    let desc = RtgResourceDesc2D::new_rel(1.0, 1.0, RhiFormat::R16G16B16A16Float);
    let tex_a = graph.create_resource(desc);
    let tex_b = graph.create_resource(desc);

    // 生命周期不重叠，开启复用时本应混叠
    graph.add_graphics_node("write-a", AccessPass::new([(tex_a, RtgAccessType::RenderTarget)])).unwrap();
    graph.add_graphics_node("write-b", AccessPass::new([(tex_b, RtgAccessType::RenderTarget)])).unwrap();
    graph.compile().unwrap();

    assert_eq!(manager.pool_size(), 2);
    assert_eq!(device.lock().unwrap().created_texture_count(), 2);
}

/// 纹理创建失败沿 Compile 向上传播
#[test]
fn test_texture_creation_failure_propagates() {
    let (device, manager) = setup();
    device.lock().unwrap().inject_texture_failures(1);

    manager.begin_frame();
    let mut graph = manager.create_builder(800, 600);
    let tex = graph.create_resource(RtgResourceDesc2D::new_abs(128, 128, RhiFormat::R8G8B8A8Unorm));
    graph.add_graphics_node("draw", AccessPass::new([(tex, RtgAccessType::RenderTarget)])).unwrap();

    assert!(matches!(graph.compile(), Err(RtgError::Rhi(_))));
}

// ==================================================
// 跨帧传递
// ==================================================

/// 资源跨帧传递：物理纹理与状态缓存原样交给下一帧
#[test]
fn test_propagate_resource_to_next_frame() {
    let (device, manager) = setup();

    // 第一帧：写入并读过一次，然后传递出去
    manager.begin_frame();
    let (prev_handle, prev_phys) = {
        let mut graph = manager.create_builder(800, 600);
        let tex = graph.create_resource(RtgResourceDesc2D::new_abs(256, 256, RhiFormat::R8G8B8A8Unorm));
        let node = graph.add_graphics_node("write", AccessPass::new([(tex, RtgAccessType::RenderTarget)])).unwrap();
        graph.add_graphics_node("read", AccessPass::new([(tex, RtgAccessType::ShaderRead)])).unwrap();
        graph.propagate_resource_to_next_frame(tex).unwrap();
        graph.compile().unwrap();
        let phys = graph.get_allocated_resource(node, tex).unwrap().resolved.texture;

        let mut cmd = HeadlessCommandList::new(RhiCommandListId(1));
        graph.execute(&mut cmd).unwrap();
        (tex, phys)
    };

    // 第二帧：接手后直接以 ShaderRead 读取，状态缓存续上，无需 barrier
    manager.begin_frame();
    {
        let mut graph = manager.create_builder(800, 600);
        let inherited = graph.import_previous_frame_resource(prev_handle).unwrap();
        assert_ne!(inherited, prev_handle);
        let node = graph.add_graphics_node("read-history", AccessPass::new([(inherited, RtgAccessType::ShaderRead)])).unwrap();
        graph.compile().unwrap();

        let allocated = graph.get_allocated_resource(node, inherited).unwrap();
        assert_eq!(allocated.resolved.texture, prev_phys);
        assert_eq!(allocated.prev_state, RhiResourceState::ShaderRead);
        assert_eq!(allocated.curr_state, RhiResourceState::ShaderRead);

        let mut cmd = HeadlessCommandList::new(RhiCommandListId(2));
        graph.execute(&mut cmd).unwrap();
        assert_eq!(cmd.barrier_count(), 0);
    }

    assert_eq!(device.lock().unwrap().created_texture_count(), 1);
    assert_eq!(manager.pool_size(), 1);
}

/// 没被接手的传递资源隔一帧自动解除钉住
#[test]
fn test_unclaimed_propagation_released() {
    let (_device, manager) = setup();

    manager.begin_frame();
    let prev = {
        let mut graph = manager.create_builder(800, 600);
        let tex = graph.create_resource(RtgResourceDesc2D::new_abs(64, 64, RhiFormat::R8G8B8A8Unorm));
        graph.add_graphics_node("write", AccessPass::new([(tex, RtgAccessType::RenderTarget)])).unwrap();
        graph.propagate_resource_to_next_frame(tex).unwrap();
        graph.compile().unwrap();
        tex
    };

    // 下一帧没人接手
    manager.begin_frame();
    // 再下一帧传递过期，句柄失效，槽位回到可复用状态
    manager.begin_frame();
    let mut graph = manager.create_builder(800, 600);
    assert!(matches!(
        graph.import_previous_frame_resource(prev),
        Err(RtgError::NotPropagated(h)) if h == prev
    ));
    assert_eq!(manager.pool_size(), 1);
}

/// 外部资源不能跨帧传递
#[test]
fn test_propagate_rejects_external() {
    let (device, manager) = setup();
    let swapchain = device.lock().unwrap().register_swapchain(800, 600, RhiFormat::B8G8R8A8Unorm, 2);

    manager.begin_frame();
    let mut graph = manager.create_builder(800, 600);
    let backbuffer = graph.import_swapchain(Some(swapchain), None, RhiResourceState::Present, RhiResourceState::Present).unwrap();
    assert!(matches!(
        graph.propagate_resource_to_next_frame(backbuffer),
        Err(RtgError::InvalidPropagation(h)) if h == backbuffer
    ));
    assert!(matches!(
        graph.propagate_resource_to_next_frame(RtgResourceHandle::INVALID),
        Err(RtgError::InvalidPropagation(_))
    ));
}
