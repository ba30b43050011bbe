//! Barrier 记录
//!
//! 构建阶段只生成与物理资源无关的 barrier 记录（追加式日志，batch/submit 保存下标），
//! 执行阶段再转换为 `vk::ImageMemoryBarrier2` / `vk::BufferMemoryBarrier2`。

use ash::vk;

use crate::task_graph::handle::{TaskBufferId, TaskImageId};
use crate::task_graph::resource_state::{AccessType, TaskBufferState, TaskImageState};

/// 图像 barrier：layout 转换 + 内存依赖
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskImageBarrier {
    pub image: TaskImageId,
    pub src: TaskImageState,
    pub dst: TaskImageState,
}

impl TaskImageBarrier {
    #[inline]
    pub fn src_layout(&self) -> vk::ImageLayout {
        self.src.layout
    }

    #[inline]
    pub fn dst_layout(&self) -> vk::ImageLayout {
        self.dst.layout
    }

    /// 转换为 `vk::ImageMemoryBarrier2`，覆盖整个图像
    pub fn to_vk_barrier(&self, image: vk::Image, aspect: vk::ImageAspectFlags) -> vk::ImageMemoryBarrier2<'static> {
        vk::ImageMemoryBarrier2::default()
            .src_stage_mask(self.src.stage)
            .src_access_mask(self.src.src_access())
            .dst_stage_mask(self.dst.stage)
            .dst_access_mask(self.dst.access)
            .old_layout(self.src.layout)
            .new_layout(self.dst.layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(aspect)
                    .base_mip_level(0)
                    .level_count(vk::REMAINING_MIP_LEVELS)
                    .base_array_layer(0)
                    .layer_count(vk::REMAINING_ARRAY_LAYERS),
            )
    }
}

/// 缓冲区 barrier：只有内存依赖
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskBufferBarrier {
    pub buffer: TaskBufferId,
    pub src: TaskBufferState,
    pub dst: TaskBufferState,
}

impl TaskBufferBarrier {
    /// 转换为 `vk::BufferMemoryBarrier2`，覆盖整个缓冲区
    pub fn to_vk_barrier(&self, buffer: vk::Buffer) -> vk::BufferMemoryBarrier2<'static> {
        vk::BufferMemoryBarrier2::default()
            .src_stage_mask(self.src.stage)
            .src_access_mask(self.src.src_access())
            .dst_stage_mask(self.dst.stage)
            .dst_access_mask(self.dst.access)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .buffer(buffer)
            .offset(0)
            .size(vk::WHOLE_SIZE)
    }
}

/// 物化后的 barrier 记录
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskBarrier {
    Image(TaskImageBarrier),
    Buffer(TaskBufferBarrier),
}

impl TaskBarrier {
    /// 把一个新的读操作并入 barrier 的 dst 范围
    ///
    /// 同一资源的多个读操作合并进同一批次时，它们都依赖于同一个 barrier。
    pub(crate) fn widen_dst(&mut self, stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) {
        match self {
            TaskBarrier::Image(barrier) => {
                barrier.dst.stage |= stage;
                barrier.dst.access |= access;
            }
            TaskBarrier::Buffer(barrier) => {
                barrier.dst.stage |= stage;
                barrier.dst.access |= access;
            }
        }
    }

    pub fn as_image(&self) -> Option<&TaskImageBarrier> {
        match self {
            TaskBarrier::Image(barrier) => Some(barrier),
            TaskBarrier::Buffer(_) => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&TaskBufferBarrier> {
        match self {
            TaskBarrier::Buffer(barrier) => Some(barrier),
            TaskBarrier::Image(_) => None,
        }
    }
}

/// 两次访问之间是否存在需要排序的冲突
///
/// 读后读不需要；上一次没有任何访问时也不需要。
#[inline]
pub(crate) fn is_access_hazard(prev: AccessType, next: AccessType) -> bool {
    match prev {
        AccessType::None => false,
        AccessType::Read => next != AccessType::Read,
        AccessType::Write | AccessType::ReadWrite => true,
    }
}

/// Barrier 计算器
pub struct BarrierCalculator;

impl BarrierCalculator {
    /// 图像从 `current` 转换到 `required` 是否需要 barrier
    ///
    /// layout 变化一定需要；layout 相同时，只有涉及写的访问才需要。
    pub fn image_needs_barrier(current: &TaskImageState, required: &TaskImageState) -> bool {
        current.layout != required.layout || is_access_hazard(current.access_type(), required.access_type())
    }

    pub fn buffer_needs_barrier(current: &TaskBufferState, required: &TaskBufferState) -> bool {
        is_access_hazard(current.access_type(), required.access_type())
    }

    pub fn compute_image_barrier(
        image: TaskImageId,
        current: TaskImageState,
        required: TaskImageState,
    ) -> Option<TaskImageBarrier> {
        Self::image_needs_barrier(&current, &required).then_some(TaskImageBarrier {
            image,
            src: current,
            dst: required,
        })
    }

    pub fn compute_buffer_barrier(
        buffer: TaskBufferId,
        current: TaskBufferState,
        required: TaskBufferState,
    ) -> Option<TaskBufferBarrier> {
        Self::buffer_needs_barrier(&current, &required).then_some(TaskBufferBarrier {
            buffer,
            src: current,
            dst: required,
        })
    }
}
