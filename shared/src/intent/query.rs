//! 查询请求类型
//!
//! 分页参数来源于 URL 查询参数 (`page` / `perPage`)，
//! 由 [`PagingState`] 推导出 [`PageWindow`] (skip / take)。

use serde::{Deserialize, Serialize};

/// 默认页码
pub const DEFAULT_PAGE: u32 = 1;
/// 默认每页数量
pub const DEFAULT_ITEMS_PER_PAGE: u32 = 10;

/// 分页状态 (从 URL 查询参数推导)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingState {
    /// 当前页码 (从 1 开始)
    pub current_page: u32,
    /// 每页数量
    pub items_per_page: u32,
}

impl Default for PagingState {
    fn default() -> Self {
        Self {
            current_page: DEFAULT_PAGE,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

impl PagingState {
    /// 从两个查询参数字符串推导分页状态
    ///
    /// 缺失、非数字或为 0 时使用默认值 (不报错)。
    pub fn from_params(page: Option<&str>, per_page: Option<&str>) -> Self {
        Self::from_params_or(page, per_page, DEFAULT_ITEMS_PER_PAGE)
    }

    /// 同 [`PagingState::from_params`]，但每页数量默认值可配置
    pub fn from_params_or(page: Option<&str>, per_page: Option<&str>, default_per_page: u32) -> Self {
        Self {
            current_page: parse_positive(page).unwrap_or(DEFAULT_PAGE),
            items_per_page: parse_positive(per_page).unwrap_or(default_per_page.max(1)),
        }
    }

    /// 计算 skip / take
    pub fn window(&self) -> PageWindow {
        PageWindow {
            skip: (self.current_page.saturating_sub(1)).saturating_mul(self.items_per_page),
            take: self.items_per_page,
        }
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|n| *n >= 1)
}

/// 查询窗口 - 传给分页查询的偏移量与数量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub skip: u32,
    pub take: u32,
}

impl PageWindow {
    /// 默认的查询变量形状: `{ "options": { "skip": .., "take": .. } }`
    pub fn to_variables(&self) -> serde_json::Value {
        serde_json::json!({
            "options": {
                "skip": self.skip,
                "take": self.take,
            }
        })
    }
}

/// 分页响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    /// 当前页数据
    pub items: Vec<T>,
    /// 总记录数
    pub total_items: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total_items: u64) -> Self {
        Self { items, total_items }
    }

    /// 创建单页响应 (不分页时使用)
    pub fn single_page(items: Vec<T>) -> Self {
        let total_items = items.len() as u64;
        Self { items, total_items }
    }

    /// 总页数
    pub fn total_pages(&self, items_per_page: u32) -> u32 {
        if items_per_page == 0 {
            return 1;
        }
        let pages = self.total_items.div_ceil(items_per_page as u64);
        pages.max(1) as u32
    }
}

impl<T> Default for PaginatedResponse<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_items: 0,
        }
    }
}
