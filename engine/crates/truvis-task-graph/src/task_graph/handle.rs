//! Task Graph 句柄定义
//!
//! 所有句柄都是 graph 内部的稠密索引，与外部的 `vk::Image` / `vk::Buffer` 分离。
//! 句柄只在创建它的 graph（以及 `reset` 之后的同一个 graph）中有效。

use std::fmt;

macro_rules! dense_handle {
    ($(#[$meta:meta])* $name:ident, $debug_name:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            #[inline]
            pub(crate) fn new(index: usize) -> Self {
                Self(u32::try_from(index).expect(concat!(stringify!($name), " index overflow")))
            }

            /// 在 graph 内部存储中的索引
            #[inline]
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($debug_name, "({})"), self.0)
            }
        }
    };
}

dense_handle!(
    /// Graph 内部的 Image 句柄
    TaskImageId,
    "TaskImage"
);

dense_handle!(
    /// Graph 内部的 Buffer 句柄
    TaskBufferId,
    "TaskBuffer"
);

dense_handle!(
    /// Task 在 graph 中的索引（按添加顺序）
    TaskId,
    "Task"
);

dense_handle!(
    /// Submit 在 graph 中的索引（按创建顺序，也是执行顺序）
    SubmitId,
    "Submit"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_debug() {
        assert_eq!(format!("{:?}", TaskImageId::new(3)), "TaskImage(3)");
        assert_eq!(format!("{:?}", SubmitId::new(0)), "Submit(0)");
    }

    #[test]
    fn test_handle_index() {
        let id = TaskBufferId::new(7);
        assert_eq!(id.index(), 7);
        assert!(TaskId::new(1) < TaskId::new(2));
    }
}
