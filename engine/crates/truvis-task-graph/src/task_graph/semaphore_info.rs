use ash::vk;

/// 提交时等待或 signal 的 semaphore
///
/// 用于 graph 外部的同步，例如 swapchain acquire 和 present。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskSemaphoreInfo {
    /// Vulkan semaphore 原始句柄
    pub semaphore: vk::Semaphore,
    /// 等待或 signal 的 pipeline stage
    pub stage: vk::PipelineStageFlags2,
    /// Timeline semaphore 的值（binary semaphore 为 None）
    pub value: Option<u64>,
}

impl TaskSemaphoreInfo {
    /// binary semaphore
    #[inline]
    pub fn binary(semaphore: vk::Semaphore, stage: vk::PipelineStageFlags2) -> Self {
        Self {
            semaphore,
            stage,
            value: None,
        }
    }

    /// timeline semaphore
    #[inline]
    pub fn timeline(semaphore: vk::Semaphore, stage: vk::PipelineStageFlags2, value: u64) -> Self {
        Self {
            semaphore,
            stage,
            value: Some(value),
        }
    }

    #[inline]
    pub fn to_vk(&self) -> vk::SemaphoreSubmitInfo<'static> {
        vk::SemaphoreSubmitInfo::default()
            .semaphore(self.semaphore)
            .stage_mask(self.stage)
            .value(self.value.unwrap_or_default())
    }
}
