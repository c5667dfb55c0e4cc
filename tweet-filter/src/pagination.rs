use serde::{Deserialize, Serialize};

use crate::assembler::PageWindow;

/// 分页状态
///
/// total_pages 在每次请求后根据结果总数重新计算。current_page 只由导航操作
/// 限制在 [1, total_pages] 内，结果总数变化时不会自动修正。
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaginationState {
    pub current_page: usize,
    pub items_per_page: usize,
    pub total_pages: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(20)
    }
}

impl PaginationState {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            current_page: 1,
            items_per_page: items_per_page.max(1),
            total_pages: 1,
        }
    }

    pub fn next(&mut self) {
        self.current_page = (self.current_page + 1).min(self.total_pages.max(1));
    }

    pub fn previous(&mut self) {
        self.current_page = self
            .current_page
            .saturating_sub(1)
            .min(self.total_pages)
            .max(1);
    }

    /// 任何筛选输入变化时调用
    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    pub fn on_result_count(&mut self, total_count: usize) {
        self.total_pages = total_count.div_ceil(self.items_per_page).max(1);
    }

    /// 当前页对应的查询窗口
    pub fn window(&self) -> PageWindow {
        PageWindow {
            offset: (self.current_page.max(1) - 1) * self.items_per_page,
            limit: self.items_per_page,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// 只有一页时不显示分页控件
    pub fn shows_controls(&self) -> bool {
        self.total_pages > 1
    }

    pub fn label(&self) -> String {
        format!("Page {} of {}", self.current_page, self.total_pages)
    }
}
