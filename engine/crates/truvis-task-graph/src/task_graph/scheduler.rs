//! Batch 调度
//!
//! 对每个 task 计算它在当前 submit 中可以加入的最小 batch 下标。
//! 每个资源给出一个候选下标，task 取所有候选的最大值。

use crate::task_graph::barrier::is_access_hazard;
use crate::task_graph::resource_registry::TaskResourceRegistry;
use crate::task_graph::resource_state::{AccessType, TaskBufferState, TaskImageState};
use crate::task_graph::task::TaskUse;

/// 图像在本 submit 中上一次使用之后，`required` 是否需要排序
///
/// layout 变化一定需要，即使上一次使用没有任何访问；
/// layout 相同时，上一次没有访问或者两次都是纯读才可以合并。
#[inline]
fn image_is_hazard(last: &TaskImageState, required: &TaskImageState) -> bool {
    if last.layout != required.layout {
        return true;
    }
    !(last.access_type() == AccessType::None || (last.is_read_only() && required.is_read_only()))
}

/// 缓冲区没有 layout，只有涉及写的访问才需要排序
#[inline]
fn buffer_is_hazard(last: &TaskBufferState, required: &TaskBufferState) -> bool {
    is_access_hazard(last.access_type(), required.access_type())
}

/// 单个资源使用给出的候选 batch
fn candidate_batch(registry: &TaskResourceRegistry, task_use: &TaskUse, submit_index: usize) -> usize {
    let (last_batch, hazard) = match task_use {
        TaskUse::Image { id, state } => {
            let image = registry.image(*id);
            (image.usage.batch_in_submit(submit_index), image_is_hazard(&image.last_state, state))
        }
        TaskUse::Buffer { id, state } => {
            let buffer = registry.buffer(*id);
            (buffer.usage.batch_in_submit(submit_index), buffer_is_hazard(&buffer.last_state, state))
        }
    };

    match last_batch {
        // 本 submit 中还没有用过：之前的使用由 submit 之间的顺序保证
        None => 0,
        Some(last_batch) if hazard => last_batch + 1,
        Some(last_batch) => last_batch,
    }
}

/// 计算 task 在 `submit_index` 中所属的 batch
///
/// 没有任何资源使用的 task 放在 batch 0。
pub fn schedule_task(registry: &TaskResourceRegistry, uses: &[TaskUse], submit_index: usize) -> usize {
    uses.iter().map(|task_use| candidate_batch(registry, task_use, submit_index)).max().unwrap_or(0)
}
