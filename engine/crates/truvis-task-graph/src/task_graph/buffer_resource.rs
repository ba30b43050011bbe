use ash::vk;

use crate::task_graph::resource_registry::ResourceUsage;
use crate::task_graph::resource_state::TaskBufferState;

/// 缓冲区资源条目
#[derive(Clone, Debug)]
pub struct TaskBuffer {
    /// 调试名称
    pub name: String,
    /// 物理缓冲区
    pub buffer: vk::Buffer,
    /// 最后一次使用时要求的状态
    pub last_state: TaskBufferState,

    pub(crate) usage: ResourceUsage,
}

impl TaskBuffer {
    pub fn new(name: impl Into<String>, buffer: vk::Buffer, initial_state: TaskBufferState) -> Self {
        Self {
            name: name.into(),
            buffer,
            last_state: initial_state,
            usage: ResourceUsage::default(),
        }
    }

    #[inline]
    pub fn last_access(&self) -> vk::AccessFlags2 {
        self.last_state.access
    }

    #[inline]
    pub fn last_batch_index(&self) -> Option<usize> {
        self.usage.last_batch_index
    }

    #[inline]
    pub fn last_submit_index(&self) -> Option<usize> {
        self.usage.last_submit_index
    }
}
