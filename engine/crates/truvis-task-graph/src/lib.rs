//! Truvis Task Graph
//!
//! 以 task 为单位声明 GPU 工作，自动推导 layout 转换与 barrier，
//! 把无冲突的 task 合并进同一个 batch，并按队列生成带 timeline semaphore 的提交。

pub mod task_graph;
