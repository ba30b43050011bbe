//! Task Graph - 多队列 GPU 任务调度
//!
//! 以 task 为单位声明资源使用，自动生成 layout 转换和 barrier，
//! 并把互不冲突的 task 合并进同一个 batch。
//!
//! # 核心概念
//!
//! - **TaskImageId / TaskBufferId**: 持久资源在 graph 中的槽位，物理资源由外部持有
//! - **TaskImageState / TaskBufferState**: 资源状态描述，包含 stage、access、layout
//! - **Task**: 声明资源使用（setup）并录制命令（execute）
//! - **TaskBatch**: 一组互不冲突的 task，以及在它们之前录制的 barrier
//! - **TaskSubmit**: 一个队列上有序的 batch；present 等尾部 barrier 单独录制
//! - **TaskGraph**: 构建、执行，每帧 `reset` 后重新构建
//!
//! # 使用示例
//!
//! ```ignore
//! use truvis_task_graph::task_graph::*;
//!
//! let mut graph = TaskGraph::new(TaskGraphInfo::default().with_name("frame"));
//! let swapchain = graph.add_image("swapchain", image, view, format, TaskImageState::UNDEFINED);
//! let sim = graph.add_image("sim", sim_image, sim_view, vk::Format::R32G32B32A32_SFLOAT, TaskImageState::UNDEFINED);
//!
//! // compute 队列上的模拟
//! let compute = graph.begin_submit(QueueType::Compute);
//! graph.add_fn_task(
//!     "simulate",
//!     |uses| {
//!         uses.write_image(sim, TaskImageState::STORAGE_WRITE_COMPUTE);
//!     },
//!     |ctx| { /* dispatch */ },
//! );
//!
//! // graphics 队列上使用模拟结果
//! graph.begin_submit(QueueType::Graphics);
//! graph.wait_on_submit(compute);
//! graph.add_fn_task(
//!     "shade",
//!     |uses| {
//!         uses.read_image(sim, TaskImageState::SHADER_READ_FRAGMENT)
//!             .write_image(swapchain, TaskImageState::COLOR_ATTACHMENT_WRITE);
//!     },
//!     |ctx| { /* draw */ },
//! );
//! graph.present(swapchain);
//!
//! graph.execute(
//!     &device,
//!     &TaskExecuteInfo::new()
//!         .with_wait_semaphore(TaskSemaphoreInfo::binary(acquire, vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT))
//!         .with_signal_semaphore(TaskSemaphoreInfo::binary(present_ready, vk::PipelineStageFlags2::ALL_COMMANDS)),
//! )?;
//!
//! // 下一帧
//! graph.reset();
//! graph.update_image(swapchain, next_image, next_view);
//! ```
//!
//! # 模块结构
//!
//! - `handle`: 资源、task、submit 的句柄
//! - `resource_state`: 资源状态（stage/access/layout）
//! - `image_resource` / `buffer_resource` / `resource_registry`: 资源状态记录
//! - `task`: Task trait、使用声明和执行上下文
//! - `scheduler`: batch 调度
//! - `barrier`: barrier 计算
//! - `batch`: batch 和 submit
//! - `graph`: 构建
//! - `device` / `semaphore_info` / `submit_info`: graph 依赖的设备能力
//! - `executor`: 录制和提交

mod barrier;
mod batch;
mod buffer_resource;
mod device;
mod executor;
mod graph;
mod handle;
mod image_resource;
mod resource_registry;
mod resource_state;
mod scheduler;
mod semaphore_info;
mod submit_info;
mod task;

#[cfg(test)]
mod test_device;

// Re-exports
pub use barrier::{BarrierCalculator, TaskBarrier, TaskBufferBarrier, TaskImageBarrier};
pub use batch::{TaskBatch, TaskSubmit};
pub use buffer_resource::TaskBuffer;
pub use device::{QueueType, TaskCommandList, TaskDevice, TaskQueue};
pub use executor::TaskExecuteInfo;
pub use graph::{TaskGraph, TaskGraphInfo};
pub use handle::{SubmitId, TaskBufferId, TaskId, TaskImageId};
pub use image_resource::TaskImage;
pub use resource_registry::{ResourceUsage, TaskResourceRegistry};
pub use resource_state::{AccessType, TaskBufferState, TaskImageState};
pub use scheduler::schedule_task;
pub use semaphore_info::TaskSemaphoreInfo;
pub use submit_info::TaskSubmitInfo;
pub use task::{FnTask, Task, TaskContext, TaskUse, TaskUseBuilder};
