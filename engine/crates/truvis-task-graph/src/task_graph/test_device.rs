//! 记录调用的假设备，不需要 GPU 就能验证执行流程

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ash::vk;
use ash::vk::Handle;

use crate::task_graph::device::{QueueType, TaskCommandList, TaskDevice, TaskQueue};
use crate::task_graph::submit_info::TaskSubmitInfo;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum MockEvent {
    Allocator(QueueType),
    Begin {
        cmd: vk::CommandBuffer,
        queue: QueueType,
        name: String,
    },
    Barriers {
        cmd: vk::CommandBuffer,
        buffers: Vec<vk::Buffer>,
        /// (image, old layout, new layout)
        images: Vec<(vk::Image, vk::ImageLayout, vk::ImageLayout)>,
    },
    Label {
        cmd: vk::CommandBuffer,
        name: String,
    },
    EndLabel {
        cmd: vk::CommandBuffer,
    },
    Mark {
        cmd: vk::CommandBuffer,
        what: String,
    },
    End {
        cmd: vk::CommandBuffer,
    },
}

type EventLog = Rc<RefCell<Vec<MockEvent>>>;

pub(crate) struct MockCommandList {
    handle: vk::CommandBuffer,
    events: EventLog,
}

impl MockCommandList {
    /// task 在 execute 中留下的标记
    pub fn mark(&mut self, what: &str) {
        self.events.borrow_mut().push(MockEvent::Mark {
            cmd: self.handle,
            what: what.to_string(),
        });
    }
}

impl TaskCommandList for MockCommandList {
    fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }

    fn set_barriers(
        &mut self,
        buffer_barriers: &[vk::BufferMemoryBarrier2<'_>],
        image_barriers: &[vk::ImageMemoryBarrier2<'_>],
    ) {
        self.events.borrow_mut().push(MockEvent::Barriers {
            cmd: self.handle,
            buffers: buffer_barriers.iter().map(|barrier| barrier.buffer).collect(),
            images: image_barriers
                .iter()
                .map(|barrier| (barrier.image, barrier.old_layout, barrier.new_layout))
                .collect(),
        });
    }

    fn begin_label(&mut self, name: &str) {
        self.events.borrow_mut().push(MockEvent::Label {
            cmd: self.handle,
            name: name.to_string(),
        });
    }

    fn end_label(&mut self) {
        self.events.borrow_mut().push(MockEvent::EndLabel { cmd: self.handle });
    }
}

/// 一次 `submit` 的快照
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RecordedSubmit {
    pub command_buffers: Vec<vk::CommandBuffer>,
    pub waits: Vec<(vk::Semaphore, u64)>,
    pub signals: Vec<(vk::Semaphore, u64)>,
}

pub(crate) struct MockQueue {
    semaphore: vk::Semaphore,
    value: Cell<u64>,
    submits: RefCell<Vec<RecordedSubmit>>,
    waited: RefCell<Vec<u64>>,
    fail_next_submit: Cell<bool>,
}

impl MockQueue {
    fn new(semaphore: vk::Semaphore) -> Self {
        Self {
            semaphore,
            value: Cell::new(0),
            submits: RefCell::new(Vec::new()),
            waited: RefCell::new(Vec::new()),
            fail_next_submit: Cell::new(false),
        }
    }

    pub fn semaphore(&self) -> vk::Semaphore {
        self.semaphore
    }

    pub fn set_value(&self, value: u64) {
        self.value.set(value);
    }

    pub fn submits(&self) -> Vec<RecordedSubmit> {
        self.submits.borrow().clone()
    }

    pub fn waited(&self) -> Vec<u64> {
        self.waited.borrow().clone()
    }

    pub fn fail_next_submit(&self) {
        self.fail_next_submit.set(true);
    }
}

impl TaskQueue for MockQueue {
    fn timeline_semaphore(&self) -> vk::Semaphore {
        self.semaphore
    }

    fn timeline_value(&self) -> u64 {
        self.value.get()
    }

    fn submit(&self, info: &TaskSubmitInfo) -> anyhow::Result<()> {
        if self.fail_next_submit.replace(false) {
            anyhow::bail!("device lost");
        }

        self.submits.borrow_mut().push(RecordedSubmit {
            command_buffers: info.command_buffers().iter().map(|cmd| cmd.command_buffer).collect(),
            waits: info.wait_infos().iter().map(|wait| (wait.semaphore, wait.value)).collect(),
            signals: info.signal_infos().iter().map(|signal| (signal.semaphore, signal.value)).collect(),
        });
        if let Some(value) = info.signal_value(self.semaphore) {
            self.value.set(value);
        }
        Ok(())
    }

    fn wait_timeline(&self, value: u64) -> anyhow::Result<()> {
        self.waited.borrow_mut().push(value);
        Ok(())
    }
}

pub(crate) struct MockDevice {
    events: EventLog,
    next_command_buffer: Cell<u64>,
    queues: [MockQueue; 3],
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
            next_command_buffer: Cell::new(1),
            queues: [
                MockQueue::new(vk::Semaphore::from_raw(101)),
                MockQueue::new(vk::Semaphore::from_raw(102)),
                MockQueue::new(vk::Semaphore::from_raw(103)),
            ],
        }
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.events.borrow().clone()
    }

    pub fn graphics(&self) -> &MockQueue {
        self.queue(QueueType::Graphics)
    }

    pub fn compute(&self) -> &MockQueue {
        self.queue(QueueType::Compute)
    }
}

impl TaskDevice for MockDevice {
    type CommandList = MockCommandList;
    type Queue = MockQueue;

    fn create_command_allocator(&self, queue_type: QueueType) -> anyhow::Result<()> {
        self.events.borrow_mut().push(MockEvent::Allocator(queue_type));
        Ok(())
    }

    fn begin_command_list(&self, queue_type: QueueType, debug_name: &str) -> anyhow::Result<MockCommandList> {
        let handle = vk::CommandBuffer::from_raw(self.next_command_buffer.get());
        self.next_command_buffer.set(self.next_command_buffer.get() + 1);

        self.events.borrow_mut().push(MockEvent::Begin {
            cmd: handle,
            queue: queue_type,
            name: debug_name.to_string(),
        });
        Ok(MockCommandList {
            handle,
            events: self.events.clone(),
        })
    }

    fn end_command_list(&self, cmd: &mut MockCommandList) -> anyhow::Result<()> {
        self.events.borrow_mut().push(MockEvent::End { cmd: cmd.handle });
        Ok(())
    }

    fn queue(&self, queue_type: QueueType) -> &MockQueue {
        &self.queues[queue_type as usize]
    }
}
