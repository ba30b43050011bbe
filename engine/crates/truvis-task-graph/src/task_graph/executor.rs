//! Task Graph 执行
//!
//! 按创建顺序遍历 submit：每个 batch 录制一个命令缓冲（barrier + task），
//! present 之类的尾部 barrier 单独录制一个命令缓冲，最后按队列提交并串联 timeline semaphore。

use std::any::Any;

use anyhow::Context;
use ash::vk;
use itertools::Itertools;

use crate::task_graph::barrier::TaskBarrier;
use crate::task_graph::device::{QueueType, TaskCommandList, TaskDevice, TaskQueue};
use crate::task_graph::graph::TaskGraph;
use crate::task_graph::semaphore_info::TaskSemaphoreInfo;
use crate::task_graph::submit_info::TaskSubmitInfo;
use crate::task_graph::task::{TaskContext, TaskUse};

/// 单次执行的参数
///
/// 外部 wait semaphore 合并进第一个 submit，外部 signal semaphore 合并进最后一个 submit。
#[derive(Default)]
pub struct TaskExecuteInfo<'a> {
    /// 例如 swapchain acquire
    pub wait_semaphores: Vec<TaskSemaphoreInfo>,
    /// 例如 present ready
    pub signal_semaphores: Vec<TaskSemaphoreInfo>,
    /// 通过 `TaskContext::user_data` 传给每个 task
    pub user_data: Option<&'a dyn Any>,
    /// 提交后 CPU 等待所有用到的队列执行完毕
    pub wait_idle: bool,
}

impl<'a> TaskExecuteInfo<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_wait_semaphore(mut self, info: TaskSemaphoreInfo) -> Self {
        self.wait_semaphores.push(info);
        self
    }

    #[inline]
    pub fn with_signal_semaphore(mut self, info: TaskSemaphoreInfo) -> Self {
        self.signal_semaphores.push(info);
        self
    }

    #[inline]
    pub fn with_user_data<T: Any>(mut self, data: &'a T) -> Self {
        self.user_data = Some(data);
        self
    }

    #[inline]
    pub fn with_wait_idle(mut self, wait_idle: bool) -> Self {
        self.wait_idle = wait_idle;
        self
    }
}

impl<D: TaskDevice> TaskGraph<'_, D> {
    /// 录制并提交整个 graph
    ///
    /// 任何设备错误都会中止本帧剩余的工作并返回，不做重试。
    pub fn execute(&self, device: &D, info: &TaskExecuteInfo<'_>) -> anyhow::Result<()> {
        if self.info.print_plan {
            self.print_execution_plan();
        }

        let used_queues = self.submits.iter().map(|submit| submit.queue_type).unique().collect_vec();
        for &queue_type in &used_queues {
            device
                .create_command_allocator(queue_type)
                .with_context(|| format!("[{}] failed to prepare {} command allocator", self.info.name, queue_type))?;
        }

        // 每个 submit 对自己队列 timeline signal 的值，供跨队列等待使用
        let mut signaled_values: Vec<u64> = Vec::with_capacity(self.submits.len());
        let last_submit_index = self.submits.len() - 1;

        for (submit_index, submit) in self.submits.iter().enumerate() {
            let queue = device.queue(submit.queue_type);
            let command_buffers = self.record_submit(device, info, submit_index)?;
            let command_buffer_count = command_buffers.len();

            let timeline = queue.timeline_semaphore();
            let wait_value = queue.timeline_value();
            let signal_value = wait_value + 1;

            let mut submit_info = TaskSubmitInfo::new(command_buffers);
            submit_info.add_wait(&TaskSemaphoreInfo::timeline(timeline, vk::PipelineStageFlags2::ALL_COMMANDS, wait_value));

            // 显式的跨队列依赖：每个生产者队列只等待其中最大的值
            for producer_queue in QueueType::ALL {
                if producer_queue == submit.queue_type {
                    continue;
                }
                let producer_value = submit
                    .wait_submits
                    .iter()
                    .filter(|producer| self.submits[producer.index()].queue_type == producer_queue)
                    .map(|producer| signaled_values[producer.index()])
                    .max();
                if let Some(value) = producer_value {
                    submit_info.add_wait(&TaskSemaphoreInfo::timeline(
                        device.queue(producer_queue).timeline_semaphore(),
                        vk::PipelineStageFlags2::ALL_COMMANDS,
                        value,
                    ));
                }
            }

            if submit_index == 0 {
                for wait in &info.wait_semaphores {
                    submit_info.add_wait(wait);
                }
            }

            submit_info.add_signal(&TaskSemaphoreInfo::timeline(
                timeline,
                vk::PipelineStageFlags2::ALL_COMMANDS,
                signal_value,
            ));
            if submit_index == last_submit_index {
                for signal in &info.signal_semaphores {
                    submit_info.add_signal(signal);
                }
            }

            queue.submit(&submit_info).with_context(|| {
                format!("[{}] failed to submit {} to the {} queue", self.info.name, submit_index, submit.queue_type)
            })?;
            signaled_values.push(signal_value);

            log::debug!(
                "[{}] submit {} on {} queue: {} command lists, timeline {} -> {}",
                self.info.name,
                submit_index,
                submit.queue_type,
                command_buffer_count,
                wait_value,
                signal_value
            );
        }

        if info.wait_idle {
            for &queue_type in &used_queues {
                let queue = device.queue(queue_type);
                queue
                    .wait_timeline(queue.timeline_value())
                    .with_context(|| format!("[{}] failed to wait for the {} queue", self.info.name, queue_type))?;
            }
        }

        Ok(())
    }

    /// 录制一个 submit 的所有命令缓冲，返回提交顺序的句柄
    fn record_submit(
        &self,
        device: &D,
        info: &TaskExecuteInfo<'_>,
        submit_index: usize,
    ) -> anyhow::Result<Vec<vk::CommandBuffer>> {
        let submit = &self.submits[submit_index];
        let labels = self.info.debug_labels;
        let mut command_buffers = Vec::with_capacity(submit.batches.len() + 1);

        for (batch_index, batch) in submit.batches.iter().enumerate() {
            if batch.is_empty() {
                continue;
            }

            let debug_name = format!("{}-submit{}-batch{}", self.info.name, submit_index, batch_index);
            let mut cmd = device
                .begin_command_list(submit.queue_type, &debug_name)
                .with_context(|| format!("failed to begin command list \"{}\"", debug_name))?;

            if labels {
                cmd.begin_label(&debug_name);
            }

            // batch 内所有 barrier 在任何 task 之前一次性录制
            self.record_barriers(&mut cmd, &batch.barriers);

            for &task_id in &batch.tasks {
                let node = &self.tasks[task_id.index()];
                if labels {
                    cmd.begin_label(&node.name);
                }

                let mut ctx = TaskContext {
                    device,
                    cmd: &mut cmd,
                    registry: &self.registry,
                    uses: &node.uses,
                    user_data: info.user_data,
                };
                node.executor.execute(&mut ctx);

                if labels {
                    cmd.end_label();
                }
            }

            if labels {
                cmd.end_label();
            }
            device
                .end_command_list(&mut cmd)
                .with_context(|| format!("failed to end command list \"{}\"", debug_name))?;
            command_buffers.push(cmd.handle());
        }

        if !submit.signal_barriers.is_empty() {
            let debug_name = format!("{}-submit{}-signal", self.info.name, submit_index);
            let mut cmd = device
                .begin_command_list(submit.queue_type, &debug_name)
                .with_context(|| format!("failed to begin command list \"{}\"", debug_name))?;
            self.record_barriers(&mut cmd, &submit.signal_barriers);
            device
                .end_command_list(&mut cmd)
                .with_context(|| format!("failed to end command list \"{}\"", debug_name))?;
            command_buffers.push(cmd.handle());
        }

        Ok(command_buffers)
    }

    /// 把 barrier 记录解析为物理资源上的 Vulkan barrier，合并成一次调用
    fn record_barriers(&self, cmd: &mut D::CommandList, barrier_indices: &[usize]) {
        if barrier_indices.is_empty() {
            return;
        }

        let mut image_barriers = Vec::new();
        let mut buffer_barriers = Vec::new();
        for &barrier_index in barrier_indices {
            match &self.barriers[barrier_index] {
                TaskBarrier::Image(barrier) => {
                    let image = self.registry.image(barrier.image);
                    image_barriers.push(barrier.to_vk_barrier(image.image, image.infer_aspect()));
                }
                TaskBarrier::Buffer(barrier) => {
                    buffer_barriers.push(barrier.to_vk_barrier(self.registry.buffer(barrier.buffer).buffer));
                }
            }
        }

        cmd.set_barriers(&buffer_barriers, &image_barriers);
    }
}

// 调试方法
impl<D: TaskDevice> TaskGraph<'_, D> {
    /// 打印执行计划（用于调试）
    ///
    /// 每个 submit 的队列与跨队列等待、每个 batch 的 barrier 和 task、以及尾部的 signal barrier。
    pub fn print_execution_plan(&self) {
        log::info!("╔══════════════════════════════════════════════════════════════════╗");
        log::info!("║ TaskGraph \"{}\" Execution Plan", self.info.name);
        log::info!("╠══════════════════════════════════════════════════════════════════╣");
        log::info!(
            "║ Submits: {}  |  Tasks: {}  |  Barriers: {}",
            self.submits.len(),
            self.tasks.len(),
            self.barriers.len()
        );
        log::info!("╚══════════════════════════════════════════════════════════════════╝");

        for (submit_index, submit) in self.submits.iter().enumerate() {
            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!("│ Submit {} @ {} queue", submit_index, submit.queue_type);
            if !submit.wait_submits.is_empty() {
                log::info!("│ Waits on: [{}]", submit.wait_submits.iter().map(|id| id.index()).join(", "));
            }

            for (batch_index, batch) in submit.batches.iter().enumerate() {
                log::info!("├─────────────────────────────────────────────────────────────────┤");
                log::info!("│ Batch {}: {} tasks, {} barriers", batch_index, batch.tasks.len(), batch.barriers.len());
                for &barrier_index in &batch.barriers {
                    self.print_barrier(barrier_index);
                }
                for &task_id in &batch.tasks {
                    let node = &self.tasks[task_id.index()];
                    log::info!("│   ▶ \"{}\"", node.name);
                    for task_use in &node.uses {
                        self.print_use(task_use);
                    }
                }
            }

            if !submit.signal_barriers.is_empty() {
                log::info!("├─────────────────────────────────────────────────────────────────┤");
                log::info!("│ Signal barriers: {}", submit.signal_barriers.len());
                for &barrier_index in &submit.signal_barriers {
                    self.print_barrier(barrier_index);
                }
            }
            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }

        log::info!("");
        log::info!("═══════════════════════ End of Execution Plan ═══════════════════════");
    }

    fn print_use(&self, task_use: &TaskUse) {
        match task_use {
            TaskUse::Image { id, state } => {
                let marker = if state.is_write() { "✏️ " } else { "📖" };
                log::info!(
                    "│       {} \"{}\" @ {:?} (stage: {}, access: {})",
                    marker,
                    self.registry.image(*id).name,
                    state.layout,
                    format_pipeline_stage(state.stage),
                    format_access_flags(state.access)
                );
            }
            TaskUse::Buffer { id, state } => {
                let marker = if state.is_write() { "✏️ " } else { "📖" };
                log::info!(
                    "│       {} \"{}\" (stage: {}, access: {})",
                    marker,
                    self.registry.buffer(*id).name,
                    format_pipeline_stage(state.stage),
                    format_access_flags(state.access)
                );
            }
        }
    }

    fn print_barrier(&self, barrier_index: usize) {
        match &self.barriers[barrier_index] {
            TaskBarrier::Image(barrier) => {
                let layout_change = if barrier.src.layout != barrier.dst.layout {
                    format!("{:?} → {:?}", barrier.src.layout, barrier.dst.layout)
                } else {
                    format!("{:?} (no layout change)", barrier.src.layout)
                };
                log::info!("│   🔒 #{} Image \"{}\": {}", barrier_index, self.registry.image(barrier.image).name, layout_change);
                log::info!(
                    "│       Stage:  {} → {}",
                    format_pipeline_stage(barrier.src.stage),
                    format_pipeline_stage(barrier.dst.stage)
                );
                log::info!(
                    "│       Access: {} → {}",
                    format_access_flags(barrier.src.access),
                    format_access_flags(barrier.dst.access)
                );
            }
            TaskBarrier::Buffer(barrier) => {
                log::info!("│   🔒 #{} Buffer \"{}\"", barrier_index, self.registry.buffer(barrier.buffer).name);
                log::info!(
                    "│       Stage:  {} → {}",
                    format_pipeline_stage(barrier.src.stage),
                    format_pipeline_stage(barrier.dst.stage)
                );
                log::info!(
                    "│       Access: {} → {}",
                    format_access_flags(barrier.src.access),
                    format_access_flags(barrier.dst.access)
                );
            }
        }
    }
}

/// 格式化 PipelineStageFlags2 为可读字符串
fn format_pipeline_stage(stage: vk::PipelineStageFlags2) -> String {
    const NAMES: &[(vk::PipelineStageFlags2, &str)] = &[
        (vk::PipelineStageFlags2::TOP_OF_PIPE, "TOP_OF_PIPE"),
        (vk::PipelineStageFlags2::BOTTOM_OF_PIPE, "BOTTOM_OF_PIPE"),
        (vk::PipelineStageFlags2::DRAW_INDIRECT, "DRAW_INDIRECT"),
        (vk::PipelineStageFlags2::VERTEX_INPUT, "VERTEX_INPUT"),
        (vk::PipelineStageFlags2::VERTEX_SHADER, "VERTEX_SHADER"),
        (vk::PipelineStageFlags2::FRAGMENT_SHADER, "FRAGMENT_SHADER"),
        (vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS, "EARLY_FRAGMENT_TESTS"),
        (vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS, "LATE_FRAGMENT_TESTS"),
        (vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, "COLOR_ATTACHMENT_OUTPUT"),
        (vk::PipelineStageFlags2::COMPUTE_SHADER, "COMPUTE_SHADER"),
        (vk::PipelineStageFlags2::TRANSFER, "TRANSFER"),
        (vk::PipelineStageFlags2::ALL_GRAPHICS, "ALL_GRAPHICS"),
        (vk::PipelineStageFlags2::ALL_COMMANDS, "ALL_COMMANDS"),
    ];

    let stages = NAMES.iter().filter(|(flag, _)| stage.contains(*flag)).map(|(_, name)| *name).collect_vec();
    if stages.is_empty() { format!("{:?}", stage) } else { stages.iter().join(" | ") }
}

/// 格式化 AccessFlags2 为可读字符串
fn format_access_flags(access: vk::AccessFlags2) -> String {
    if access == vk::AccessFlags2::NONE {
        return "NONE".to_string();
    }

    const NAMES: &[(vk::AccessFlags2, &str)] = &[
        (vk::AccessFlags2::INDIRECT_COMMAND_READ, "INDIRECT_CMD_READ"),
        (vk::AccessFlags2::INDEX_READ, "INDEX_READ"),
        (vk::AccessFlags2::VERTEX_ATTRIBUTE_READ, "VERTEX_ATTR_READ"),
        (vk::AccessFlags2::UNIFORM_READ, "UNIFORM_READ"),
        (vk::AccessFlags2::SHADER_SAMPLED_READ, "SHADER_SAMPLED_READ"),
        (vk::AccessFlags2::SHADER_STORAGE_READ, "STORAGE_READ"),
        (vk::AccessFlags2::SHADER_STORAGE_WRITE, "STORAGE_WRITE"),
        (vk::AccessFlags2::COLOR_ATTACHMENT_READ, "COLOR_ATTACH_READ"),
        (vk::AccessFlags2::COLOR_ATTACHMENT_WRITE, "COLOR_ATTACH_WRITE"),
        (vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ, "DEPTH_ATTACH_READ"),
        (vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE, "DEPTH_ATTACH_WRITE"),
        (vk::AccessFlags2::TRANSFER_READ, "TRANSFER_READ"),
        (vk::AccessFlags2::TRANSFER_WRITE, "TRANSFER_WRITE"),
        (vk::AccessFlags2::MEMORY_READ, "MEMORY_READ"),
        (vk::AccessFlags2::MEMORY_WRITE, "MEMORY_WRITE"),
    ];

    let flags = NAMES.iter().filter(|(flag, _)| access.contains(*flag)).map(|(_, name)| *name).collect_vec();
    if flags.is_empty() { format!("{:?}", access) } else { flags.iter().join(" | ") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_graph::graph::TaskGraphInfo;
    use crate::task_graph::resource_state::{TaskBufferState, TaskImageState};
    use crate::task_graph::test_device::{MockDevice, MockEvent};
    use ash::vk::Handle;

    fn graph<'a>() -> TaskGraph<'a, MockDevice> {
        TaskGraph::new(TaskGraphInfo::default().with_name("test").with_debug_labels(false))
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(
            format_pipeline_stage(vk::PipelineStageFlags2::FRAGMENT_SHADER | vk::PipelineStageFlags2::COMPUTE_SHADER),
            "FRAGMENT_SHADER | COMPUTE_SHADER"
        );
        assert_eq!(format_access_flags(vk::AccessFlags2::NONE), "NONE");
        assert_eq!(format_access_flags(vk::AccessFlags2::TRANSFER_WRITE), "TRANSFER_WRITE");
    }

    #[test]
    fn test_empty_graph_still_chains_timeline() {
        truvis_crate_tools::init_log::init_test_log();
        let device = MockDevice::new();
        let graph = graph();

        graph.execute(&device, &TaskExecuteInfo::new()).unwrap();
        graph.execute(&device, &TaskExecuteInfo::new()).unwrap();

        let submits = device.graphics().submits();
        assert_eq!(submits.len(), 2);
        assert!(submits[0].command_buffers.is_empty());
        assert_eq!(submits[0].waits, vec![(device.graphics().semaphore(), 0)]);
        assert_eq!(submits[1].waits, vec![(device.graphics().semaphore(), 1)]);
        assert_eq!(submits[1].signals, vec![(device.graphics().semaphore(), 2)]);
    }

    #[test]
    fn test_batches_record_barriers_before_tasks() {
        let device = MockDevice::new();
        let mut graph = graph();
        let color = graph.add_image(
            "color",
            vk::Image::from_raw(10),
            vk::ImageView::from_raw(11),
            vk::Format::R8G8B8A8_UNORM,
            TaskImageState::UNDEFINED,
        );

        graph.add_fn_task(
            "draw",
            move |uses| {
                uses.write_image(color, TaskImageState::COLOR_ATTACHMENT_WRITE);
            },
            |ctx| ctx.cmd.mark("draw"),
        );
        graph.add_fn_task(
            "blur",
            move |uses| {
                uses.read_image(color, TaskImageState::SHADER_READ_FRAGMENT);
            },
            move |ctx| {
                assert_eq!(ctx.image(color).as_raw(), 10);
                assert_eq!(ctx.image_state(color), Some(TaskImageState::SHADER_READ_FRAGMENT));
                ctx.cmd.mark("blur");
            },
        );

        graph.execute(&device, &TaskExecuteInfo::new()).unwrap();

        let events = device.events();
        let barriers_then_marks = events
            .iter()
            .filter_map(|event| match event {
                MockEvent::Barriers { images, .. } => Some(format!("barrier {:?}", images[0].2)),
                MockEvent::Mark { what, .. } => Some(what.clone()),
                _ => None,
            })
            .collect_vec();
        assert_eq!(
            barriers_then_marks,
            vec![
                format!("barrier {:?}", vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
                "draw".to_string(),
                format!("barrier {:?}", vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                "blur".to_string(),
            ]
        );

        // 两个 batch，两个命令缓冲，一次提交
        let submits = device.graphics().submits();
        assert_eq!(submits.len(), 1);
        assert_eq!(submits[0].command_buffers.len(), 2);
        assert!(events.contains(&MockEvent::Allocator(QueueType::Graphics)));
    }

    #[test]
    fn test_present_gets_trailing_command_list_and_external_semaphores() {
        let device = MockDevice::new();
        let mut graph = graph();
        let swapchain = graph.add_image(
            "swapchain",
            vk::Image::from_raw(20),
            vk::ImageView::from_raw(21),
            vk::Format::B8G8R8A8_SRGB,
            TaskImageState::UNDEFINED,
        );
        graph.add_fn_task(
            "draw",
            move |uses| {
                uses.write_image(swapchain, TaskImageState::COLOR_ATTACHMENT_WRITE);
            },
            |_| {},
        );
        graph.present(swapchain);

        let acquire = vk::Semaphore::from_raw(500);
        let present_ready = vk::Semaphore::from_raw(501);
        let info = TaskExecuteInfo::new()
            .with_wait_semaphore(TaskSemaphoreInfo::binary(
                acquire,
                vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            ))
            .with_signal_semaphore(TaskSemaphoreInfo::binary(present_ready, vk::PipelineStageFlags2::ALL_COMMANDS));
        graph.execute(&device, &info).unwrap();

        let submits = device.graphics().submits();
        assert_eq!(submits.len(), 1);
        assert_eq!(submits[0].command_buffers.len(), 2);
        assert!(submits[0].waits.contains(&(acquire, 0)));
        assert!(submits[0].signals.contains(&(present_ready, 0)));

        let last_barrier = device
            .events()
            .into_iter()
            .filter_map(|event| match event {
                MockEvent::Barriers { cmd, images, .. } => Some((cmd, images)),
                _ => None,
            })
            .last()
            .unwrap();
        assert_eq!(last_barrier.0, submits[0].command_buffers[1]);
        assert_eq!(
            last_barrier.1,
            vec![(
                vk::Image::from_raw(20),
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                vk::ImageLayout::PRESENT_SRC_KHR
            )]
        );
    }

    #[test]
    fn test_cross_queue_wait_uses_producer_signal_value() {
        let device = MockDevice::new();
        let mut graph = graph();
        let image = graph.add_image(
            "sim",
            vk::Image::from_raw(30),
            vk::ImageView::from_raw(31),
            vk::Format::R32_SFLOAT,
            TaskImageState::UNDEFINED,
        );

        // 先让 compute 队列的 timeline 前进一次
        device.compute().set_value(5);

        let compute = graph.begin_submit(QueueType::Compute);
        graph.add_fn_task(
            "simulate",
            move |uses| {
                uses.write_image(image, TaskImageState::STORAGE_WRITE_COMPUTE);
            },
            |_| {},
        );
        graph.begin_submit(QueueType::Graphics);
        graph.wait_on_submit(compute);
        graph.add_fn_task(
            "shade",
            move |uses| {
                uses.read_image(image, TaskImageState::SHADER_READ_FRAGMENT);
            },
            |_| {},
        );

        let info = TaskExecuteInfo::new().with_wait_idle(true);
        graph.execute(&device, &info).unwrap();

        let compute_submits = device.compute().submits();
        assert_eq!(compute_submits.len(), 1);
        assert_eq!(compute_submits[0].signals, vec![(device.compute().semaphore(), 6)]);

        // submit 0 在 graphics 上，没有 task
        let graphics_submits = device.graphics().submits();
        assert_eq!(graphics_submits.len(), 2);
        assert!(graphics_submits[0].command_buffers.is_empty());
        assert!(graphics_submits[1].waits.contains(&(device.compute().semaphore(), 6)));
        assert!(graphics_submits[1].waits.contains(&(device.graphics().semaphore(), 1)));

        assert_eq!(device.graphics().waited(), vec![2]);
        assert_eq!(device.compute().waited(), vec![6]);
    }

    #[test]
    fn test_user_data_and_labels() {
        struct FrameData {
            frame: u32,
        }

        let device = MockDevice::new();
        let mut graph: TaskGraph<MockDevice> =
            TaskGraph::new(TaskGraphInfo::default().with_name("labels").with_debug_labels(true));
        graph.add_fn_task(
            "tick",
            |_| {},
            |ctx| {
                let frame = ctx.user_data::<FrameData>().map(|data| data.frame).unwrap_or_default();
                ctx.cmd.mark(&format!("frame {}", frame));
            },
        );

        let data = FrameData { frame: 7 };
        graph.execute(&device, &TaskExecuteInfo::new().with_user_data(&data)).unwrap();

        let labels_and_marks = device
            .events()
            .into_iter()
            .filter_map(|event| match event {
                MockEvent::Label { name, .. } => Some(name),
                MockEvent::Mark { what, .. } => Some(what),
                _ => None,
            })
            .collect_vec();
        assert_eq!(labels_and_marks, vec!["labels-submit0-batch0", "tick", "frame 7"]);
    }

    #[test]
    fn test_context_resolves_buffer_uses() {
        let device = MockDevice::new();
        let mut graph = graph();
        let indirect = graph.add_buffer("indirect", vk::Buffer::from_raw(60), TaskBufferState::UNDEFINED);
        let unused = graph.add_buffer("unused", vk::Buffer::from_raw(61), TaskBufferState::UNDEFINED);

        graph.add_fn_task(
            "cull",
            move |uses| {
                uses.write_buffer(indirect, TaskBufferState::STORAGE_WRITE_COMPUTE);
            },
            move |ctx| {
                assert_eq!(ctx.buffer(indirect).as_raw(), 60);
                assert_eq!(ctx.buffer_state(indirect), Some(TaskBufferState::STORAGE_WRITE_COMPUTE));
                assert_eq!(ctx.buffer_state(unused), None);
                assert_eq!(ctx.uses().len(), 1);
                ctx.cmd.mark("cull");
            },
        );
        graph.execute(&device, &TaskExecuteInfo::new()).unwrap();

        assert!(device.events().iter().any(|event| matches!(event, MockEvent::Mark { what, .. } if what == "cull")));
    }

    #[test]
    fn test_submit_failure_is_reported() {
        let device = MockDevice::new();
        device.graphics().fail_next_submit();
        let graph = graph();

        let err = graph.execute(&device, &TaskExecuteInfo::new()).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to submit"));
    }
}
