//! 设备能力

use crate::error::RhiResult;
use crate::handles::{RhiFenceHandle, RhiTextureHandle, RhiViewHandle, RhiViewKind};
use crate::texture::RhiTextureDesc;

/// 设备端的资源创建能力
///
/// RTG 的资源池通过这个 trait 创建和销毁纹理，因此要求 `Send`：
/// manager 会被多个帧的 builder 共享。
pub trait RhiDevice: Send {
    /// 创建一张 2D 纹理，初始状态为 `desc.initial_state`
    fn create_texture(&mut self, desc: &RhiTextureDesc, debug_name: &str) -> RhiResult<RhiTextureHandle>;

    /// 销毁纹理。与之关联的视图一并失效
    fn destroy_texture(&mut self, texture: RhiTextureHandle);

    /// 为纹理创建某一种视图
    ///
    /// 纹理的 usage 中必须包含该视图种类要求的 bit，否则返回
    /// [`RhiError::MissingUsage`](crate::RhiError::MissingUsage)。
    fn create_view(&mut self, texture: RhiTextureHandle, kind: RhiViewKind) -> RhiResult<RhiViewHandle>;

    /// 查询纹理的创建参数
    fn texture_desc(&self, texture: RhiTextureHandle) -> Option<RhiTextureDesc>;

    /// 创建一个时间线 fence
    fn create_fence(&mut self, debug_name: &str) -> RhiResult<RhiFenceHandle>;
}
