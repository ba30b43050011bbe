//! Task 定义和构建器
//!
//! 提供 `Task` trait 用于声明式定义 GPU 工作，
//! 以及 `TaskUseBuilder` 用于在 setup 阶段声明资源使用。

use std::any::Any;

use ash::vk;

use crate::task_graph::device::TaskDevice;
use crate::task_graph::handle::{SubmitId, TaskBufferId, TaskImageId};
use crate::task_graph::resource_registry::TaskResourceRegistry;
use crate::task_graph::resource_state::{TaskBufferState, TaskImageState};

/// Task 对某个资源的使用声明
///
/// 这是 task 与调度器之间的契约：纯数据，在 `setup` 中生成一次。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskUse {
    Image { id: TaskImageId, state: TaskImageState },
    Buffer { id: TaskBufferId, state: TaskBufferState },
}

/// 使用声明构建器
///
/// 每个资源在一个 task 中只能声明一次；同一个 task 中先读后写请用 `read_write_*`。
#[derive(Default, Debug)]
pub struct TaskUseBuilder {
    uses: Vec<TaskUse>,
}

impl TaskUseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, task_use: TaskUse) -> &mut Self {
        let duplicated = self.uses.iter().any(|existing| match (existing, &task_use) {
            (TaskUse::Image { id: a, .. }, TaskUse::Image { id: b, .. }) => a == b,
            (TaskUse::Buffer { id: a, .. }, TaskUse::Buffer { id: b, .. }) => a == b,
            _ => false,
        });
        assert!(!duplicated, "resource declared twice in one task: {:?}", task_use);

        self.uses.push(task_use);
        self
    }

    /// 声明读取图像
    pub fn read_image(&mut self, id: TaskImageId, state: TaskImageState) -> &mut Self {
        debug_assert!(!state.is_write(), "read_image with a writing state: {:?}", state);
        self.push(TaskUse::Image { id, state })
    }

    /// 声明写入图像
    pub fn write_image(&mut self, id: TaskImageId, state: TaskImageState) -> &mut Self {
        debug_assert!(state.is_write(), "write_image with a read-only state: {:?}", state);
        self.push(TaskUse::Image { id, state })
    }

    /// 声明读写图像（如累积、blend）
    pub fn read_write_image(&mut self, id: TaskImageId, state: TaskImageState) -> &mut Self {
        self.push(TaskUse::Image { id, state })
    }

    pub fn read_buffer(&mut self, id: TaskBufferId, state: TaskBufferState) -> &mut Self {
        debug_assert!(!state.is_write(), "read_buffer with a writing state: {:?}", state);
        self.push(TaskUse::Buffer { id, state })
    }

    pub fn write_buffer(&mut self, id: TaskBufferId, state: TaskBufferState) -> &mut Self {
        debug_assert!(state.is_write(), "write_buffer with a read-only state: {:?}", state);
        self.push(TaskUse::Buffer { id, state })
    }

    pub fn read_write_buffer(&mut self, id: TaskBufferId, state: TaskBufferState) -> &mut Self {
        self.push(TaskUse::Buffer { id, state })
    }

    #[inline]
    pub fn uses(&self) -> &[TaskUse] {
        &self.uses
    }

    #[inline]
    pub(crate) fn into_uses(self) -> Vec<TaskUse> {
        self.uses
    }
}

/// Task 执行时的上下文
///
/// 提供命令缓冲、设备、资源查询，以及调用方在 execute 时传入的每帧数据。
pub struct TaskContext<'a, D: TaskDevice> {
    /// 设备
    pub device: &'a D,
    /// 命令缓冲区（已经 begin）
    pub cmd: &'a mut D::CommandList,

    pub(crate) registry: &'a TaskResourceRegistry,
    pub(crate) uses: &'a [TaskUse],
    pub(crate) user_data: Option<&'a dyn Any>,
}

impl<D: TaskDevice> TaskContext<'_, D> {
    /// 当前 task 声明的所有使用
    #[inline]
    pub fn uses(&self) -> &[TaskUse] {
        self.uses
    }

    #[inline]
    pub fn image(&self, id: TaskImageId) -> vk::Image {
        self.registry.image(id).image
    }

    #[inline]
    pub fn image_view(&self, id: TaskImageId) -> vk::ImageView {
        self.registry.image(id).view
    }

    #[inline]
    pub fn buffer(&self, id: TaskBufferId) -> vk::Buffer {
        self.registry.buffer(id).buffer
    }

    /// 当前 task 对图像声明的状态（执行时图像已经处于该 layout）
    pub fn image_state(&self, id: TaskImageId) -> Option<TaskImageState> {
        self.uses.iter().find_map(|task_use| match task_use {
            TaskUse::Image { id: use_id, state } if *use_id == id => Some(*state),
            _ => None,
        })
    }

    pub fn buffer_state(&self, id: TaskBufferId) -> Option<TaskBufferState> {
        self.uses.iter().find_map(|task_use| match task_use {
            TaskUse::Buffer { id: use_id, state } if *use_id == id => Some(*state),
            _ => None,
        })
    }

    /// 调用方传入的每帧数据
    pub fn user_data<T: Any>(&self) -> Option<&T> {
        self.user_data.and_then(|data| data.downcast_ref::<T>())
    }
}

/// Task trait
///
/// 定义 graph 中的一个 task。`setup` 在 `add_task` 时调用一次，用于声明资源使用；
/// `execute` 在 graph 执行时调用，此时 batch 的 barrier 已经录制完毕。
///
/// # 示例
///
/// ```ignore
/// struct BlurTask {
///     input: TaskImageId,
///     output: TaskImageId,
/// }
///
/// impl<D: TaskDevice> Task<D> for BlurTask {
///     fn setup(&mut self, uses: &mut TaskUseBuilder) {
///         uses.read_image(self.input, TaskImageState::SHADER_READ_COMPUTE)
///             .write_image(self.output, TaskImageState::STORAGE_WRITE_COMPUTE);
///     }
///
///     fn execute(&self, ctx: &mut TaskContext<'_, D>) {
///         let input_view = ctx.image_view(self.input);
///         // 绑定 descriptor, dispatch...
///     }
/// }
/// ```
pub trait Task<D: TaskDevice> {
    fn setup(&mut self, uses: &mut TaskUseBuilder);

    fn execute(&self, ctx: &mut TaskContext<'_, D>);
}

/// 由闭包组成的 task
pub struct FnTask<S, E> {
    setup: Option<S>,
    exec: E,
}

impl<S, E> FnTask<S, E> {
    pub fn new(setup: S, exec: E) -> Self {
        Self {
            setup: Some(setup),
            exec,
        }
    }
}

impl<D, S, E> Task<D> for FnTask<S, E>
where
    D: TaskDevice,
    S: FnOnce(&mut TaskUseBuilder),
    E: Fn(&mut TaskContext<'_, D>),
{
    fn setup(&mut self, uses: &mut TaskUseBuilder) {
        if let Some(setup) = self.setup.take() {
            setup(uses);
        }
    }

    fn execute(&self, ctx: &mut TaskContext<'_, D>) {
        (self.exec)(ctx)
    }
}

/// 类型擦除的 task 执行器
pub(crate) trait TaskExecutor<D: TaskDevice> {
    fn execute(&self, ctx: &mut TaskContext<'_, D>);
}

/// 包装用户 task 实现的执行器
pub(crate) struct TaskExecutorWrapper<T> {
    pub task: T,
}

impl<D: TaskDevice, T: Task<D>> TaskExecutor<D> for TaskExecutorWrapper<T> {
    fn execute(&self, ctx: &mut TaskContext<'_, D>) {
        self.task.execute(ctx);
    }
}

/// 调度完成后的 task 节点
pub(crate) struct TaskNode<'a, D: TaskDevice> {
    pub name: String,
    pub uses: Vec<TaskUse>,
    pub submit: SubmitId,
    pub batch: usize,
    pub executor: Box<dyn TaskExecutor<D> + 'a>,
}
