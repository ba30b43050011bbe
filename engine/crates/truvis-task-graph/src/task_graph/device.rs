//! Task Graph 依赖的设备能力
//!
//! graph 本身不创建任何 Vulkan 对象，只通过这里的 trait 分配、录制和提交命令缓冲。
//! 设备层负责 command pool、队列和每个队列的 timeline semaphore。

use std::fmt;

use ash::vk;

use crate::task_graph::submit_info::TaskSubmitInfo;

/// 硬件队列类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueueType {
    Graphics,
    Compute,
    Transfer,
}

impl QueueType {
    pub const ALL: [QueueType; 3] = [QueueType::Graphics, QueueType::Compute, QueueType::Transfer];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueType::Graphics => "graphics",
            QueueType::Compute => "compute",
            QueueType::Transfer => "transfer",
        }
    }
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 正在录制的命令缓冲
pub trait TaskCommandList {
    fn handle(&self) -> vk::CommandBuffer;

    /// 一次性录制一组 barrier（对应一次 `vkCmdPipelineBarrier2`）
    fn set_barriers(
        &mut self,
        buffer_barriers: &[vk::BufferMemoryBarrier2<'_>],
        image_barriers: &[vk::ImageMemoryBarrier2<'_>],
    );

    fn begin_label(&mut self, _name: &str) {}

    fn end_label(&mut self) {}
}

/// 硬件队列，以及它独占的 timeline semaphore
pub trait TaskQueue {
    fn timeline_semaphore(&self) -> vk::Semaphore;

    /// 该队列最后一次提交时 signal 的 timeline 值
    fn timeline_value(&self) -> u64;

    /// 提交命令缓冲
    ///
    /// 提交成功后，`timeline_value()` 必须返回 `info` 中对 `timeline_semaphore()` signal 的值。
    fn submit(&self, info: &TaskSubmitInfo) -> anyhow::Result<()>;

    /// CPU 阻塞等待 timeline semaphore 到达 `value`
    fn wait_timeline(&self, value: u64) -> anyhow::Result<()>;
}

/// 设备
pub trait TaskDevice {
    type CommandList: TaskCommandList;
    type Queue: TaskQueue;

    /// 准备本帧 `queue_type` 的 command allocator（通常是 reset 当前帧的 pool）
    fn create_command_allocator(&self, queue_type: QueueType) -> anyhow::Result<()>;

    /// 从本帧的 allocator 中分配一个命令缓冲并开始录制
    fn begin_command_list(&self, queue_type: QueueType, debug_name: &str) -> anyhow::Result<Self::CommandList>;

    fn end_command_list(&self, cmd: &mut Self::CommandList) -> anyhow::Result<()>;

    fn queue(&self, queue_type: QueueType) -> &Self::Queue;
}
