use ash::vk;

use crate::task_graph::resource_registry::ResourceUsage;
use crate::task_graph::resource_state::TaskImageState;

/// 图像资源条目
///
/// 物理图像由外部持有，graph 只记录句柄以及跟踪到的最后状态。
/// 在调度完第 N 个 task 之后，`last_state` 恰好等于 task N 对它的要求。
#[derive(Clone, Debug)]
pub struct TaskImage {
    /// 调试名称
    pub name: String,
    /// 物理图像
    pub image: vk::Image,
    /// 默认视图
    pub view: vk::ImageView,
    /// 图像格式（用于推断 barrier aspect）
    pub format: vk::Format,
    /// 最后一次使用时要求的状态
    pub last_state: TaskImageState,

    pub(crate) usage: ResourceUsage,
    /// 是否已经调用过 `present`
    pub(crate) presented: bool,
}

// new & init
impl TaskImage {
    pub fn new(
        name: impl Into<String>,
        image: vk::Image,
        view: vk::ImageView,
        format: vk::Format,
        initial_state: TaskImageState,
    ) -> Self {
        Self {
            name: name.into(),
            image,
            view,
            format,
            last_state: initial_state,
            usage: ResourceUsage::default(),
            presented: false,
        }
    }
}

// getters
impl TaskImage {
    #[inline]
    pub fn last_layout(&self) -> vk::ImageLayout {
        self.last_state.layout
    }

    #[inline]
    pub fn last_access(&self) -> vk::AccessFlags2 {
        self.last_state.access
    }

    /// 当前 submit 中最后使用它的 batch
    #[inline]
    pub fn last_batch_index(&self) -> Option<usize> {
        self.usage.last_batch_index
    }

    #[inline]
    pub fn last_submit_index(&self) -> Option<usize> {
        self.usage.last_submit_index
    }

    /// 根据格式推断 aspect flags
    pub fn infer_aspect(&self) -> vk::ImageAspectFlags {
        match self.format {
            vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
                vk::ImageAspectFlags::DEPTH
            }
            vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
            vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            }
            _ => vk::ImageAspectFlags::COLOR,
        }
    }
}
