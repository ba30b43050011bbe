//! Task Graph 构建
//!
//! 构建阶段是纯 CPU 的簿记：每添加一个 task 就立即调度到某个 batch、生成 barrier、
//! 更新资源状态。构建必须在单线程中按确定的顺序进行。

use ash::vk;

use crate::task_graph::barrier::{BarrierCalculator, TaskBarrier, TaskImageBarrier};
use crate::task_graph::batch::TaskSubmit;
use crate::task_graph::buffer_resource::TaskBuffer;
use crate::task_graph::device::{QueueType, TaskDevice};
use crate::task_graph::handle::{SubmitId, TaskBufferId, TaskId, TaskImageId};
use crate::task_graph::image_resource::TaskImage;
use crate::task_graph::resource_registry::TaskResourceRegistry;
use crate::task_graph::resource_state::{TaskBufferState, TaskImageState};
use crate::task_graph::scheduler::schedule_task;
use crate::task_graph::task::{FnTask, Task, TaskContext, TaskExecutorWrapper, TaskNode, TaskUse, TaskUseBuilder};

/// Task Graph 配置
#[derive(Clone, Debug)]
pub struct TaskGraphInfo {
    /// 调试名称
    pub name: String,
    /// 第一个 submit 使用的队列
    pub initial_queue: QueueType,
    /// 执行时是否为每个 batch / task 插入 debug label
    pub debug_labels: bool,
    /// 执行前是否打印执行计划
    pub print_plan: bool,
}

impl Default for TaskGraphInfo {
    fn default() -> Self {
        Self {
            name: "task-graph".to_string(),
            initial_queue: QueueType::Graphics,
            debug_labels: true,
            print_plan: false,
        }
    }
}

impl TaskGraphInfo {
    #[inline]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[inline]
    pub fn with_initial_queue(mut self, queue_type: QueueType) -> Self {
        self.initial_queue = queue_type;
        self
    }

    #[inline]
    pub fn with_debug_labels(mut self, debug_labels: bool) -> Self {
        self.debug_labels = debug_labels;
        self
    }

    #[inline]
    pub fn with_print_plan(mut self, print_plan: bool) -> Self {
        self.print_plan = print_plan;
        self
    }
}

/// Task Graph
///
/// # 使用流程
///
/// 1. 创建 graph: `TaskGraph::new(info)`，此时已经打开一个 submit
/// 2. 注册持久资源: `graph.add_image(...)` / `graph.add_buffer(...)`
/// 3. 添加 task: `graph.add_task("name", task)`，需要换队列时 `graph.begin_submit(...)`
/// 4. 呈现: `graph.present(swapchain_image)`
/// 5. 执行: `graph.execute(&device, &execute_info)`
/// 6. 下一帧: `graph.reset()` 后从第 3 步重新构建
///
/// # 生命周期
///
/// `'a` 是 task 可以借用的外部资源的生命周期。
pub struct TaskGraph<'a, D: TaskDevice> {
    pub(crate) info: TaskGraphInfo,
    pub(crate) registry: TaskResourceRegistry,
    pub(crate) tasks: Vec<TaskNode<'a, D>>,
    pub(crate) submits: Vec<TaskSubmit>,
    /// 追加式的 barrier 日志
    pub(crate) barriers: Vec<TaskBarrier>,
}

// new & init
impl<D: TaskDevice> TaskGraph<'_, D> {
    pub fn new(info: TaskGraphInfo) -> Self {
        let submits = vec![TaskSubmit::new(info.initial_queue)];
        Self {
            info,
            registry: TaskResourceRegistry::new(),
            tasks: Vec::new(),
            submits,
            barriers: Vec::new(),
        }
    }

    /// 开始新一帧的构建
    ///
    /// task、batch、barrier、submit 全部清空；资源保留它们最后的 layout/access，
    /// 因为物理资源在 GPU 上的状态是跨帧延续的。
    pub fn reset(&mut self) {
        self.tasks.clear();
        self.barriers.clear();
        self.submits.clear();
        self.submits.push(TaskSubmit::new(self.info.initial_queue));
        self.registry.begin_frame();
    }
}

// resources
impl<D: TaskDevice> TaskGraph<'_, D> {
    /// 注册持久图像，`initial_state` 是图像当前在 GPU 上的状态
    pub fn add_image(
        &mut self,
        name: impl Into<String>,
        image: vk::Image,
        view: vk::ImageView,
        format: vk::Format,
        initial_state: TaskImageState,
    ) -> TaskImageId {
        self.registry.register_image(TaskImage::new(name, image, view, format, initial_state))
    }

    pub fn add_buffer(&mut self, name: impl Into<String>, buffer: vk::Buffer, initial_state: TaskBufferState) -> TaskBufferId {
        self.registry.register_buffer(TaskBuffer::new(name, buffer, initial_state))
    }

    /// 替换图像槽位背后的物理图像（例如每帧 acquire 到的 swapchain image）
    ///
    /// 跟踪的状态不变；如果新图像的状态不同，用 `set_image_state` 覆盖。
    pub fn update_image(&mut self, id: TaskImageId, image: vk::Image, view: vk::ImageView) {
        let entry = self.registry.image_mut(id);
        entry.image = image;
        entry.view = view;
    }

    pub fn set_image_state(&mut self, id: TaskImageId, state: TaskImageState) {
        self.registry.image_mut(id).last_state = state;
    }

    pub fn update_buffer(&mut self, id: TaskBufferId, buffer: vk::Buffer) {
        self.registry.buffer_mut(id).buffer = buffer;
    }
}

// submits
impl<D: TaskDevice> TaskGraph<'_, D> {
    /// 打开一个新的 submit，之后添加的 task 都属于它
    pub fn begin_submit(&mut self, queue_type: QueueType) -> SubmitId {
        self.submits.push(TaskSubmit::new(queue_type));
        let id = SubmitId::new(self.submits.len() - 1);
        log::debug!("[{}] begin {:?} on {} queue", self.info.name, id, queue_type);
        id
    }

    #[inline]
    pub fn current_submit(&self) -> SubmitId {
        SubmitId::new(self.submits.len() - 1)
    }

    /// 当前 submit 在 GPU 上等待 `producer` 完成
    ///
    /// 跨队列的数据依赖只能通过这种方式显式声明。
    pub fn wait_on_submit(&mut self, producer: SubmitId) {
        let current = self.current_submit();
        assert!(producer < current, "{:?} can only wait on an earlier submit, got {:?}", current, producer);

        let submit = &mut self.submits[current.index()];
        if !submit.wait_submits.contains(&producer) {
            submit.wait_submits.push(producer);
        }
    }
}

// tasks
impl<'a, D: TaskDevice> TaskGraph<'a, D> {
    /// 添加 task
    ///
    /// 立即调度：计算 batch、生成 barrier、更新资源状态。
    pub fn add_task<T: Task<D> + 'a>(&mut self, name: impl Into<String>, mut task: T) -> TaskId {
        let name = name.into();

        let mut builder = TaskUseBuilder::new();
        task.setup(&mut builder);
        let uses = builder.into_uses();

        let submit_index = self.submits.len() - 1;
        self.warn_unsynchronized_uses(&name, &uses, submit_index);

        let batch_index = schedule_task(&self.registry, &uses, submit_index);
        let task_id = TaskId::new(self.tasks.len());

        for task_use in &uses {
            match *task_use {
                TaskUse::Image { id, state } => self.track_image_use(id, state, submit_index, batch_index),
                TaskUse::Buffer { id, state } => self.track_buffer_use(id, state, submit_index, batch_index),
            }
        }
        self.submits[submit_index].batch_mut(batch_index).tasks.push(task_id);

        log::debug!("[{}] task \"{}\" -> submit {} batch {}", self.info.name, name, submit_index, batch_index);

        self.tasks.push(TaskNode {
            name,
            uses,
            submit: SubmitId::new(submit_index),
            batch: batch_index,
            executor: Box::new(TaskExecutorWrapper { task }),
        });
        task_id
    }

    /// 用闭包添加 task
    pub fn add_fn_task<S, E>(&mut self, name: impl Into<String>, setup: S, exec: E) -> TaskId
    where
        S: FnOnce(&mut TaskUseBuilder) + 'a,
        E: Fn(&mut TaskContext<'_, D>) + 'a,
    {
        self.add_task(name, FnTask::new(setup, exec))
    }

    /// 把图像转换到 present layout
    ///
    /// barrier 放在图像最后使用的 submit 的 signal barrier 中，在该 submit 所有 batch 之后单独录制。
    /// 图像在本次构建中没有被使用过时，放在当前 submit。
    pub fn present(&mut self, id: TaskImageId) {
        let current_submit = self.submits.len() - 1;
        let image = self.registry.image_mut(id);
        assert!(!image.presented, "image \"{}\" presented twice", image.name);

        let submit_index = image.usage.last_submit_index.unwrap_or(current_submit);
        let mut src = image.last_state;
        if image.usage.last_submit_index.is_some() {
            src.stage |= image.usage.read_stages;
        }

        // 已经在 present layout 且没有待完成的写入（例如上一帧 present 之后本帧没有使用）
        if src.layout == TaskImageState::PRESENT.layout && !src.is_write() {
            image.usage.last_barrier_index = None;
        } else {
            let barrier_index = self.barriers.len();
            self.barriers.push(TaskBarrier::Image(TaskImageBarrier {
                image: id,
                src,
                dst: TaskImageState::PRESENT,
            }));
            self.submits[submit_index].signal_barriers.push(barrier_index);
            image.usage.last_barrier_index = Some(barrier_index);
        }

        image.last_state = TaskImageState::PRESENT;
        image.usage.last_submit_index = Some(submit_index);
        image.usage.read_stages = vk::PipelineStageFlags2::empty();
        image.presented = true;

        log::debug!("[{}] present \"{}\" after submit {}", self.info.name, image.name, submit_index);
    }
}

// state tracking
impl<D: TaskDevice> TaskGraph<'_, D> {
    /// 生成图像 barrier（如果需要），并把图像状态推进到 task 的要求
    fn track_image_use(&mut self, id: TaskImageId, required: TaskImageState, submit_index: usize, batch_index: usize) {
        let image = self.registry.image_mut(id);
        assert!(!image.presented, "image \"{}\" used after present", image.name);

        let last = image.last_state;
        let barrier = match image.usage.last_submit_index {
            // 上一次使用在之前的 submit 中，访问顺序由 submit 之间的 semaphore 保证，只需要 layout 转换
            Some(last_submit) if last_submit != submit_index => {
                image.usage.last_barrier_index = None;
                image.usage.read_stages = vk::PipelineStageFlags2::empty();
                (last.layout != required.layout).then_some(TaskImageBarrier {
                    image: id,
                    src: TaskImageState::new(vk::PipelineStageFlags2::ALL_COMMANDS, vk::AccessFlags2::NONE, last.layout),
                    dst: required,
                })
            }
            _ => {
                let mut src = last;
                src.stage |= image.usage.read_stages;
                BarrierCalculator::compute_image_barrier(id, src, required)
            }
        };

        match barrier {
            Some(barrier) => {
                let barrier_index = self.barriers.len();
                self.barriers.push(TaskBarrier::Image(barrier));
                self.submits[submit_index].batch_mut(batch_index).barriers.push(barrier_index);

                image.usage.last_barrier_index = Some(barrier_index);
                image.usage.read_stages =
                    if required.is_read_only() { required.stage } else { vk::PipelineStageFlags2::empty() };
            }
            None if required.is_read_only() => {
                // 读后读：新的读者也必须被上一个 barrier 覆盖
                if let Some(barrier_index) = image.usage.last_barrier_index {
                    self.barriers[barrier_index].widen_dst(required.stage, required.access);
                }
                image.usage.read_stages |= required.stage;
            }
            None => {
                image.usage.read_stages = vk::PipelineStageFlags2::empty();
            }
        }

        image.last_state = required;
        image.usage.last_batch_index = Some(batch_index);
        image.usage.last_submit_index = Some(submit_index);
    }

    fn track_buffer_use(&mut self, id: TaskBufferId, required: TaskBufferState, submit_index: usize, batch_index: usize) {
        let buffer = self.registry.buffer_mut(id);

        let barrier = match buffer.usage.last_submit_index {
            Some(last_submit) if last_submit != submit_index => {
                buffer.usage.last_barrier_index = None;
                buffer.usage.read_stages = vk::PipelineStageFlags2::empty();
                None
            }
            _ => {
                let mut src = buffer.last_state;
                src.stage |= buffer.usage.read_stages;
                BarrierCalculator::compute_buffer_barrier(id, src, required)
            }
        };

        match barrier {
            Some(barrier) => {
                let barrier_index = self.barriers.len();
                self.barriers.push(TaskBarrier::Buffer(barrier));
                self.submits[submit_index].batch_mut(batch_index).barriers.push(barrier_index);

                buffer.usage.last_barrier_index = Some(barrier_index);
                buffer.usage.read_stages =
                    if required.is_read_only() { required.stage } else { vk::PipelineStageFlags2::empty() };
            }
            None if required.is_read_only() => {
                if let Some(barrier_index) = buffer.usage.last_barrier_index {
                    self.barriers[barrier_index].widen_dst(required.stage, required.access);
                }
                buffer.usage.read_stages |= required.stage;
            }
            None => {
                buffer.usage.read_stages = vk::PipelineStageFlags2::empty();
            }
        }

        buffer.last_state = required;
        buffer.usage.last_batch_index = Some(batch_index);
        buffer.usage.last_submit_index = Some(submit_index);
    }

    /// 资源上一次在另一个队列上使用，而当前 submit 没有等待那个队列时给出警告
    fn warn_unsynchronized_uses(&self, task_name: &str, uses: &[TaskUse], submit_index: usize) {
        let current = &self.submits[submit_index];

        for task_use in uses {
            let (resource_name, last_submit) = match task_use {
                TaskUse::Image { id, .. } => {
                    let image = self.registry.image(*id);
                    (image.name.as_str(), image.usage.last_submit_index)
                }
                TaskUse::Buffer { id, .. } => {
                    let buffer = self.registry.buffer(*id);
                    (buffer.name.as_str(), buffer.usage.last_submit_index)
                }
            };

            let Some(last_submit) = last_submit else { continue };
            if last_submit == submit_index {
                continue;
            }
            let producer_queue = self.submits[last_submit].queue_type;
            if producer_queue == current.queue_type {
                continue;
            }

            // 等待同一队列上更晚的 submit 也足够，timeline 是单调的
            let synchronized = current.wait_submits.iter().any(|wait| {
                wait.index() >= last_submit && self.submits[wait.index()].queue_type == producer_queue
            });
            if !synchronized {
                log::warn!(
                    "[{}] task \"{}\" uses \"{}\" last touched by submit {} on the {} queue, \
                     but submit {} ({} queue) does not wait on it",
                    self.info.name,
                    task_name,
                    resource_name,
                    last_submit,
                    producer_queue,
                    submit_index,
                    current.queue_type
                );
            }
        }
    }
}

// getters
impl<D: TaskDevice> TaskGraph<'_, D> {
    #[inline]
    pub fn info(&self) -> &TaskGraphInfo {
        &self.info
    }

    #[inline]
    pub fn registry(&self) -> &TaskResourceRegistry {
        &self.registry
    }

    #[inline]
    pub fn image(&self, id: TaskImageId) -> &TaskImage {
        self.registry.image(id)
    }

    #[inline]
    pub fn buffer(&self, id: TaskBufferId) -> &TaskBuffer {
        self.registry.buffer(id)
    }

    #[inline]
    pub fn submits(&self) -> &[TaskSubmit] {
        &self.submits
    }

    #[inline]
    pub fn barriers(&self) -> &[TaskBarrier] {
        &self.barriers
    }

    #[inline]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn task_name(&self, id: TaskId) -> &str {
        &self.tasks[id.index()].name
    }

    #[inline]
    pub fn task_uses(&self, id: TaskId) -> &[TaskUse] {
        &self.tasks[id.index()].uses
    }

    /// task 被调度到的 (submit, batch)
    #[inline]
    pub fn task_position(&self, id: TaskId) -> (SubmitId, usize) {
        let node = &self.tasks[id.index()];
        (node.submit, node.batch)
    }
}
