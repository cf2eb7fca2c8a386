//! Rearrange command

use serde::{Deserialize, Serialize};

/// 移动层级节点 - 成为 `new_parent_id` 的第 `new_index` 个子节点
///
/// 索引为有符号整数: 原始的上移规则在首个子节点上会产生 `-1`，
/// 由服务端决定如何处理越界索引。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RearrangeCommand {
    pub entity_id: String,
    pub new_parent_id: String,
    pub new_index: i64,
}

impl RearrangeCommand {
    pub fn new(
        entity_id: impl Into<String>,
        new_parent_id: impl Into<String>,
        new_index: i64,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            new_parent_id: new_parent_id.into(),
            new_index,
        }
    }

    /// 原始的上移/下移规则: 在同一父节点下把索引加上 `delta`，不做边界检查
    pub fn shifted(
        entity_id: impl Into<String>,
        parent_id: impl Into<String>,
        current_index: usize,
        delta: i64,
    ) -> Self {
        Self::new(entity_id, parent_id, current_index as i64 + delta)
    }
}
