//! 资源句柄
//!
//! 每帧所有 builder 创建/导入的资源共享同一个全局递增的 id 空间
//! （计数器在 manager 上），外部资源和 swapchain 用独立的标记位区分。
//! 句柄可以打包成 `u64` 存放在紧凑容器中。

const EXTERNAL_BIT: u64 = 1 << 32;
const SWAPCHAIN_BIT: u64 = 1 << 33;

/// RTG 资源句柄
///
/// 全 0 是无效哨兵值（[`RtgResourceHandle::INVALID`]），合法句柄的
/// unique_id 从 1 开始。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RtgResourceHandle {
    unique_id: u32,
    is_external: bool,
    is_swapchain: bool,
}

impl RtgResourceHandle {
    pub const INVALID: Self = Self {
        unique_id: 0,
        is_external: false,
        is_swapchain: false,
    };

    /// 图内部资源的句柄
    pub(crate) fn internal(unique_id: u32) -> Self {
        Self {
            unique_id,
            is_external: false,
            is_swapchain: false,
        }
    }

    /// 外部导入纹理的句柄
    pub(crate) fn external(unique_id: u32) -> Self {
        Self {
            unique_id,
            is_external: true,
            is_swapchain: false,
        }
    }

    /// swapchain 资源的句柄（同时带有 external 标记）
    pub(crate) fn swapchain(unique_id: u32) -> Self {
        Self {
            unique_id,
            is_external: true,
            is_swapchain: true,
        }
    }

    #[inline]
    pub fn unique_id(self) -> u32 {
        self.unique_id
    }

    #[inline]
    pub fn is_external(self) -> bool {
        self.is_external
    }

    #[inline]
    pub fn is_swapchain(self) -> bool {
        self.is_swapchain
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.unique_id != 0
    }

    /// 打包成 `u64`：低 32 位是 unique_id，第 32/33 位是标记位
    #[inline]
    pub fn to_bits(self) -> u64 {
        let mut bits = self.unique_id as u64;
        if self.is_external {
            bits |= EXTERNAL_BIT;
        }
        if self.is_swapchain {
            bits |= SWAPCHAIN_BIT;
        }
        bits
    }

    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        Self {
            unique_id: bits as u32,
            is_external: bits & EXTERNAL_BIT != 0,
            is_swapchain: bits & SWAPCHAIN_BIT != 0,
        }
    }
}

impl std::fmt::Debug for RtgResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_swapchain {
            write!(f, "RtgRes({}, swapchain)", self.unique_id)
        } else if self.is_external {
            write!(f, "RtgRes({}, external)", self.unique_id)
        } else {
            write!(f, "RtgRes({})", self.unique_id)
        }
    }
}
