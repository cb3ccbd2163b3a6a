//! 调度时间戳

/// 任务在一帧内的调度位置：`(stage, step)` 字典序比较
///
/// 同一个 stage 内的节点按 step 排出录制顺序；跨 stage 的先后由
/// stage 决定。当前调度器把一帧的所有节点放在同一个 stage。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RtgTaskStage {
    pub stage: i32,
    pub step: i32,
}

impl RtgTaskStage {
    #[inline]
    pub const fn new(stage: i32, step: i32) -> Self {
        Self { stage, step }
    }

    /// 早于一切合法调度位置的哨兵值
    #[inline]
    pub const fn frontmost() -> Self {
        Self {
            stage: i32::MIN,
            step: i32::MIN,
        }
    }

    /// 晚于一切合法调度位置的哨兵值
    #[inline]
    pub const fn endmost() -> Self {
        Self {
            stage: i32::MAX,
            step: i32::MAX,
        }
    }
}
