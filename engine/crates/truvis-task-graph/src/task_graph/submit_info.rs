use ash::vk;
use itertools::Itertools;

use crate::task_graph::semaphore_info::TaskSemaphoreInfo;

/// 一次队列提交的完整描述
///
/// 自己持有所有数组，`submit_info()` 返回借用它们的 `vk::SubmitInfo2`。
#[derive(Default, Debug)]
pub struct TaskSubmitInfo {
    command_buffers: Vec<vk::CommandBufferSubmitInfo<'static>>,
    wait_infos: Vec<vk::SemaphoreSubmitInfo<'static>>,
    signal_infos: Vec<vk::SemaphoreSubmitInfo<'static>>,
}

impl TaskSubmitInfo {
    pub fn new(command_buffers: impl IntoIterator<Item = vk::CommandBuffer>) -> Self {
        let command_buffers = command_buffers
            .into_iter()
            .map(|cmd| vk::CommandBufferSubmitInfo::default().command_buffer(cmd))
            .collect_vec();

        Self {
            command_buffers,
            wait_infos: vec![],
            signal_infos: vec![],
        }
    }

    #[inline]
    pub fn add_wait(&mut self, info: &TaskSemaphoreInfo) -> &mut Self {
        self.wait_infos.push(info.to_vk());
        self
    }

    #[inline]
    pub fn add_signal(&mut self, info: &TaskSemaphoreInfo) -> &mut Self {
        self.signal_infos.push(info.to_vk());
        self
    }

    #[inline]
    pub fn submit_info(&self) -> vk::SubmitInfo2<'_> {
        vk::SubmitInfo2::default()
            .command_buffer_infos(&self.command_buffers)
            .wait_semaphore_infos(&self.wait_infos)
            .signal_semaphore_infos(&self.signal_infos)
    }
}

// getters
impl TaskSubmitInfo {
    #[inline]
    pub fn command_buffers(&self) -> &[vk::CommandBufferSubmitInfo<'static>] {
        &self.command_buffers
    }

    #[inline]
    pub fn wait_infos(&self) -> &[vk::SemaphoreSubmitInfo<'static>] {
        &self.wait_infos
    }

    #[inline]
    pub fn signal_infos(&self) -> &[vk::SemaphoreSubmitInfo<'static>] {
        &self.signal_infos
    }

    /// 对 `semaphore` signal 的值
    pub fn signal_value(&self, semaphore: vk::Semaphore) -> Option<u64> {
        self.signal_infos.iter().find(|info| info.semaphore == semaphore).map(|info| info.value)
    }

    /// 等待 `semaphore` 的值
    pub fn wait_value(&self, semaphore: vk::Semaphore) -> Option<u64> {
        self.wait_infos.iter().find(|info| info.semaphore == semaphore).map(|info| info.value)
    }
}
