//! Intent 模块 - 列表查询与变更意图
//!
//! 列表页的分页参数 ([`PagingState`], [`PageWindow`]) 以及详情页保存时
//! 发往数据访问层的 [`CrudAction`]。

pub mod query;

use serde::{Deserialize, Serialize};

// Re-exports
pub use query::*;

/// 通用 CRUD 操作
///
/// 泛型参数：
/// - `I`: 变更输入 (通常是合并后的实体快照序列化结果)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CrudAction<I> {
    /// 创建
    Create(I),
    /// 更新 (需要 ID 和数据)
    Update { id: String, data: I },
    /// 删除 (只需要 ID)
    Delete { id: String },
}

impl<I> CrudAction<I> {
    /// 操作名称 (用于日志)
    pub fn name(&self) -> &'static str {
        match self {
            CrudAction::Create(_) => "create",
            CrudAction::Update { .. } => "update",
            CrudAction::Delete { .. } => "delete",
        }
    }

    /// 目标 ID (创建时为空)
    pub fn target_id(&self) -> Option<&str> {
        match self {
            CrudAction::Create(_) => None,
            CrudAction::Update { id, .. } | CrudAction::Delete { id } => Some(id),
        }
    }
}
