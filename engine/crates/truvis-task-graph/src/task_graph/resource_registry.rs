use ash::vk;

use crate::task_graph::buffer_resource::TaskBuffer;
use crate::task_graph::handle::{TaskBufferId, TaskImageId};
use crate::task_graph::image_resource::TaskImage;

/// 资源在当前构建中的使用位置
///
/// 只在构建阶段由调度器修改；`reset` 时清空，但资源的 layout/access 会保留。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceUsage {
    /// 当前 submit 中最后一次使用所在的 batch
    pub last_batch_index: Option<usize>,
    /// 最后一次使用所在的 submit
    pub last_submit_index: Option<usize>,
    /// 最后一个针对该资源的 barrier（仅限 `last_submit_index` 所在的 submit）
    pub last_barrier_index: Option<usize>,
    /// 自上一个 barrier 之后，合并进来的所有读操作的 stage
    pub read_stages: vk::PipelineStageFlags2,
}

impl ResourceUsage {
    /// 在 `submit_index` 中，该资源最后一次使用所在的 batch
    #[inline]
    pub fn batch_in_submit(&self, submit_index: usize) -> Option<usize> {
        if self.last_submit_index == Some(submit_index) { self.last_batch_index } else { None }
    }

    /// 新一帧的构建：位置信息全部失效
    #[inline]
    pub fn forget_positions(&mut self) {
        *self = Self::default();
    }
}

/// 资源注册表
///
/// 稠密数组存储，句柄就是下标。没有删除操作，句柄在 graph 生命周期内稳定。
/// 越界的句柄属于 graph 组装错误，直接 panic。
#[derive(Default)]
pub struct TaskResourceRegistry {
    images: Vec<TaskImage>,
    buffers: Vec<TaskBuffer>,
}

// new & init
impl TaskResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

// register
impl TaskResourceRegistry {
    pub fn register_image(&mut self, image: TaskImage) -> TaskImageId {
        let id = TaskImageId::new(self.images.len());
        self.images.push(image);
        id
    }

    pub fn register_buffer(&mut self, buffer: TaskBuffer) -> TaskBufferId {
        let id = TaskBufferId::new(self.buffers.len());
        self.buffers.push(buffer);
        id
    }
}

// getter & iter
impl TaskResourceRegistry {
    #[inline]
    pub fn image(&self, id: TaskImageId) -> &TaskImage {
        &self.images[id.index()]
    }

    #[inline]
    pub fn image_mut(&mut self, id: TaskImageId) -> &mut TaskImage {
        &mut self.images[id.index()]
    }

    #[inline]
    pub fn buffer(&self, id: TaskBufferId) -> &TaskBuffer {
        &self.buffers[id.index()]
    }

    #[inline]
    pub fn buffer_mut(&mut self, id: TaskBufferId) -> &mut TaskBuffer {
        &mut self.buffers[id.index()]
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn iter_images(&self) -> impl Iterator<Item = (TaskImageId, &TaskImage)> {
        self.images.iter().enumerate().map(|(i, image)| (TaskImageId::new(i), image))
    }

    pub fn iter_buffers(&self) -> impl Iterator<Item = (TaskBufferId, &TaskBuffer)> {
        self.buffers.iter().enumerate().map(|(i, buffer)| (TaskBufferId::new(i), buffer))
    }
}

// frame
impl TaskResourceRegistry {
    /// 新一帧开始构建
    ///
    /// 物理资源在 GPU 上的状态是跨帧延续的，所以 `last_state` 保留，
    /// 只清掉 batch/submit/barrier 的位置信息。
    pub fn begin_frame(&mut self) {
        for image in &mut self.images {
            image.usage.forget_positions();
            image.presented = false;
        }
        for buffer in &mut self.buffers {
            buffer.usage.forget_positions();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_graph::resource_state::{TaskBufferState, TaskImageState};

    fn color_image(name: &str) -> TaskImage {
        TaskImage::new(
            name,
            vk::Image::null(),
            vk::ImageView::null(),
            vk::Format::R8G8B8A8_UNORM,
            TaskImageState::UNDEFINED,
        )
    }

    #[test]
    fn test_register_dense_ids() {
        let mut registry = TaskResourceRegistry::new();
        let a = registry.register_image(color_image("a"));
        let b = registry.register_image(color_image("b"));
        let buf = registry.register_buffer(TaskBuffer::new("buf", vk::Buffer::null(), TaskBufferState::UNDEFINED));

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(buf.index(), 0);
        assert_eq!(registry.image(b).name, "b");
        assert_eq!(registry.image_count(), 2);
        assert_eq!(registry.buffer_count(), 1);
        assert_eq!(registry.iter_images().map(|(id, image)| (id, image.name.as_str())).collect::<Vec<_>>(), vec![(a, "a"), (b, "b")]);
    }

    #[test]
    fn test_begin_frame_keeps_state() {
        let mut registry = TaskResourceRegistry::new();
        let a = registry.register_image(color_image("a"));
        {
            let image = registry.image_mut(a);
            image.last_state = TaskImageState::SHADER_READ_FRAGMENT;
            image.usage.last_batch_index = Some(2);
            image.usage.last_submit_index = Some(0);
            image.presented = true;
        }

        registry.begin_frame();

        let image = registry.image(a);
        assert_eq!(image.last_state, TaskImageState::SHADER_READ_FRAGMENT);
        assert_eq!(image.last_batch_index(), None);
        assert_eq!(image.last_submit_index(), None);
        assert!(!image.presented);
    }

    #[test]
    fn test_batch_in_submit() {
        let usage = ResourceUsage {
            last_batch_index: Some(3),
            last_submit_index: Some(1),
            ..Default::default()
        };
        assert_eq!(usage.batch_in_submit(1), Some(3));
        assert_eq!(usage.batch_in_submit(0), None);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_id_panics() {
        let registry = TaskResourceRegistry::new();
        let _ = registry.image(TaskImageId::new(0));
    }
}
