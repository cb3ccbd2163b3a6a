//! 惰性资源描述
//!
//! builder 记录阶段只登记「要一张什么样的纹理」，真正的像素尺寸在
//! Compile 时根据本帧的基准分辨率解析，因此尺寸可以写成相对比例。

use ngl_rhi::RhiFormat;

/// 2D 尺寸：绝对像素或相对基准分辨率的比例
#[derive(Clone, Copy, Debug)]
pub enum RtgSize2D {
    Abs { width: u32, height: u32 },
    Rel { scale_w: f32, scale_h: f32 },
}

impl RtgSize2D {
    /// 解析成像素尺寸
    ///
    /// 相对尺寸按 round 取整，并保证结果至少是 1。
    pub fn resolve(self, base_width: u32, base_height: u32) -> (u32, u32) {
        match self {
            RtgSize2D::Abs { width, height } => (width, height),
            RtgSize2D::Rel { scale_w, scale_h } => {
                let w = (base_width as f32 * scale_w).round() as u32;
                let h = (base_height as f32 * scale_h).round() as u32;
                (w.max(1), h.max(1))
            }
        }
    }
}

/// 2D 资源的惰性描述
#[derive(Clone, Copy, Debug)]
pub struct RtgResourceDesc2D {
    pub size: RtgSize2D,
    pub format: RhiFormat,
}

impl RtgResourceDesc2D {
    #[inline]
    pub fn new_abs(width: u32, height: u32, format: RhiFormat) -> Self {
        Self {
            size: RtgSize2D::Abs { width, height },
            format,
        }
    }

    #[inline]
    pub fn new_rel(scale_w: f32, scale_h: f32, format: RhiFormat) -> Self {
        Self {
            size: RtgSize2D::Rel { scale_w, scale_h },
            format,
        }
    }

    /// 打包成两个 `u64`，作为哈希与相等比较的 key
    ///
    /// 相对尺寸使用 `f32::to_bits`，因此 `Abs{1920,1080}` 与
    /// `Rel{1.0,1.0}` 是不同的 key，即使解析结果相同。
    pub fn to_bits(self) -> [u64; 2] {
        let (mode, hi, lo) = match self.size {
            RtgSize2D::Abs { width, height } => (0u64, width as u64, height as u64),
            RtgSize2D::Rel { scale_w, scale_h } => (1u64, scale_w.to_bits() as u64, scale_h.to_bits() as u64),
        };
        [self.format.to_bits() as u64 | mode << 8, hi << 32 | lo]
    }
}

impl PartialEq for RtgResourceDesc2D {
    fn eq(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl Eq for RtgResourceDesc2D {}

impl std::hash::Hash for RtgResourceDesc2D {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bits().hash(state);
    }
}
