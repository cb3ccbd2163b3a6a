//! 提交序列
//!
//! 一帧录制出的命令列表与 fence 操作排成一个线性序列，按顺序提交到
//! 队列。相邻的命令列表会合并成一次 `execute_command_lists` 调用，
//! fence 操作则切断合并。

use ngl_rhi::{RhiCommandListId, RhiCommandQueue, RhiFenceHandle};

/// 提交序列中的一个元素
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RtgCommandSequenceElem {
    /// 一条录制完成的命令列表
    CommandList(RhiCommandListId),
    /// 队列执行到此处时把 fence 推进到 value
    Signal { fence: RhiFenceHandle, value: u64 },
    /// 队列在此处等待 fence 达到 value
    Wait { fence: RhiFenceHandle, value: u64 },
}

/// 把一个提交序列下发到队列
pub fn submit_command_sequence(queue: &mut dyn RhiCommandQueue, sequence: &[RtgCommandSequenceElem]) {
    let mut batch: Vec<RhiCommandListId> = Vec::new();
    let flush = |queue: &mut dyn RhiCommandQueue, batch: &mut Vec<RhiCommandListId>| {
        if !batch.is_empty() {
            queue.execute_command_lists(batch);
            batch.clear();
        }
    };

    for elem in sequence {
        match *elem {
            RtgCommandSequenceElem::CommandList(id) => batch.push(id),
            RtgCommandSequenceElem::Signal { fence, value } => {
                flush(queue, &mut batch);
                queue.signal_fence(fence, value);
            }
            RtgCommandSequenceElem::Wait { fence, value } => {
                flush(queue, &mut batch);
                queue.wait_fence(fence, value);
            }
        }
    }
    flush(queue, &mut batch);
}
