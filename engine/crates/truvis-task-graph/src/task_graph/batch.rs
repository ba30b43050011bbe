use crate::task_graph::device::QueueType;
use crate::task_graph::handle::{SubmitId, TaskId};

/// 一组互不冲突的 task
///
/// 同一个 batch 内的 task 对共享资源只有同 layout 的读，
/// `barriers` 中的所有 barrier 在 batch 内任意 task 执行之前一次性录制。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskBatch {
    /// batch 内的 task（按添加顺序执行）
    pub tasks: Vec<TaskId>,
    /// 在 batch 之前录制的 barrier，指向 graph 的 barrier 日志
    pub barriers: Vec<usize>,
}

impl TaskBatch {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.barriers.is_empty()
    }
}

/// 提交到某一个队列的一组有序 batch
///
/// batch i 总是在 batch i-1 之后执行：同一队列上命令缓冲按提交顺序执行，不需要额外同步。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskSubmit {
    pub queue_type: QueueType,
    pub batches: Vec<TaskBatch>,
    /// 所有 batch 之后单独录制的 barrier（例如 present 转换）
    pub signal_barriers: Vec<usize>,
    /// 显式声明的跨队列依赖：执行前等待这些 submit 发出的 timeline 值
    pub wait_submits: Vec<SubmitId>,
}

impl TaskSubmit {
    pub fn new(queue_type: QueueType) -> Self {
        Self {
            queue_type,
            batches: Vec::new(),
            signal_barriers: Vec::new(),
            wait_submits: Vec::new(),
        }
    }

    /// 获取 batch，必要时在末尾补上空 batch
    pub(crate) fn batch_mut(&mut self, batch_index: usize) -> &mut TaskBatch {
        if batch_index >= self.batches.len() {
            self.batches.resize_with(batch_index + 1, TaskBatch::default);
        }
        &mut self.batches[batch_index]
    }

    #[inline]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn task_count(&self) -> usize {
        self.batches.iter().map(|batch| batch.tasks.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_mut_grows() {
        let mut submit = TaskSubmit::new(QueueType::Graphics);
        submit.batch_mut(2).tasks.push(TaskId::new(0));

        assert_eq!(submit.batch_count(), 3);
        assert!(submit.batches[0].is_empty());
        assert!(submit.batches[1].is_empty());
        assert_eq!(submit.task_count(), 1);
    }
}
