//! 仪表盘会话 - 协调筛选状态、分页和请求序号
//!
//! 每个请求都带一个单调递增的序号。只有与最近一次发出的请求序号相同的响应
//! 才能更新可见状态，迟到的旧响应被丢弃。

use serde::{Deserialize, Serialize};
use utils_common::{Sentiment, TweetRecord};

use crate::assembler::{assemble, QueryPlan};
use crate::models::{DashboardConfig, DateRangeInput, FilterCategory, FilterState, RawFilterInput};
use crate::pagination::PaginationState;
use crate::store::{RecordPage, RecordStore, StoreError};
use crate::{console_log, console_warn};

/// 已发出但尚未完成的请求
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PendingFetch {
    pub sequence: u64,
    pub plan: QueryPlan,
}

/// 视图状态
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ViewStatus {
    /// 尚未发出请求
    Idle,
    Loading,
    Loaded,
    /// 请求成功但没有匹配的记录
    Empty,
    /// 请求失败，之前的结果保持不变
    Failed(String),
}

/// 响应处理结果
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    Applied,
    Failed,
    Stale,
}

/// 会话
#[derive(Clone, Debug)]
pub struct DashboardSession {
    filters: FilterState,
    pagination: PaginationState,
    latest_sequence: u64,
    records: Vec<TweetRecord>,
    total_count: usize,
    status: ViewStatus,
}

impl Default for DashboardSession {
    fn default() -> Self {
        Self::new(&DashboardConfig::default())
    }
}

impl DashboardSession {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            filters: FilterState::default(),
            pagination: PaginationState::new(config.items_per_page),
            latest_sequence: 0,
            records: Vec::new(),
            total_count: 0,
            status: ViewStatus::Idle,
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    pub fn records(&self) -> &[TweetRecord] {
        &self.records
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    pub fn latest_sequence(&self) -> u64 {
        self.latest_sequence
    }

    /// 替换整个筛选状态。状态有变化时回到第一页，返回是否有变化
    pub fn set_filters(&mut self, filters: FilterState) -> bool {
        if filters == self.filters {
            return false;
        }
        self.filters = filters;
        self.pagination.reset();
        true
    }

    /// 单搜索框加类别选择器
    pub fn set_search(&mut self, term: &str, category: FilterCategory) -> bool {
        self.set_inputs(vec![RawFilterInput::new(term, category)])
    }

    pub fn set_inputs(&mut self, inputs: Vec<RawFilterInput>) -> bool {
        let filters = FilterState {
            inputs,
            ..self.filters.clone()
        };
        self.set_filters(filters)
    }

    pub fn set_sentiment(&mut self, sentiment: Option<Sentiment>) -> bool {
        let filters = FilterState {
            sentiment,
            ..self.filters.clone()
        };
        self.set_filters(filters)
    }

    pub fn set_date_range(&mut self, from: Option<String>, to: Option<String>) -> bool {
        let filters = FilterState {
            date_range: DateRangeInput { from, to },
            ..self.filters.clone()
        };
        self.set_filters(filters)
    }

    /// 清空所有筛选，总是回到第一页
    pub fn clear_filters(&mut self) {
        self.filters = FilterState::default();
        self.pagination.reset();
    }

    pub fn next_page(&mut self) {
        self.pagination.next();
    }

    pub fn previous_page(&mut self) {
        self.pagination.previous();
    }

    /// 当前状态对应的查询计划（不发出请求）
    pub fn plan(&self) -> QueryPlan {
        assemble(&self.filters, self.pagination.window())
    }

    /// 发出新请求，之前所有未完成的请求都变为过期
    pub fn issue(&mut self) -> PendingFetch {
        self.latest_sequence += 1;
        self.status = ViewStatus::Loading;
        PendingFetch {
            sequence: self.latest_sequence,
            plan: self.plan(),
        }
    }

    /// 处理请求结果
    pub fn complete(&mut self, sequence: u64, result: Result<RecordPage, StoreError>) -> FetchOutcome {
        if sequence != self.latest_sequence {
            console_warn!(
                "丢弃过期响应: 序号 {}，最新序号 {}",
                sequence,
                self.latest_sequence
            );
            return FetchOutcome::Stale;
        }

        match result {
            Ok(page) => {
                self.pagination.on_result_count(page.total_count);
                self.status = if page.records.is_empty() {
                    ViewStatus::Empty
                } else {
                    ViewStatus::Loaded
                };
                self.total_count = page.total_count;
                self.records = page.records;
                FetchOutcome::Applied
            }
            Err(e) => {
                console_warn!("获取推文失败: {}", e);
                self.status = ViewStatus::Failed(e.to_string());
                FetchOutcome::Failed
            }
        }
    }

    /// 同步执行一次完整的请求周期
    pub fn refresh<S: RecordStore + ?Sized>(&mut self, store: &S) -> FetchOutcome {
        let pending = self.issue();
        let result = store.execute(&pending.plan);
        let outcome = self.complete(pending.sequence, result);
        if outcome == FetchOutcome::Applied {
            console_log!(
                "已加载 {} 条推文，共 {} 条",
                self.records.len(),
                self.total_count
            );
        }
        outcome
    }

    /// 结果计数行
    pub fn headline(&self) -> String {
        self.filters.describe(self.records.len())
    }

    /// 可序列化的视图快照，供渲染层使用
    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            filters: &self.filters,
            pagination: &self.pagination,
            records: &self.records,
            total_count: self.total_count,
            status: &self.status,
            headline: self.headline(),
            page_label: self.pagination.label(),
            has_previous: self.pagination.has_previous(),
            has_next: self.pagination.has_next(),
            shows_controls: self.pagination.shows_controls(),
        }
    }
}

/// 渲染层读取的状态
#[derive(Serialize, Debug)]
pub struct SessionView<'a> {
    pub filters: &'a FilterState,
    pub pagination: &'a PaginationState,
    pub records: &'a [TweetRecord],
    pub total_count: usize,
    pub status: &'a ViewStatus,
    pub headline: String,
    pub page_label: String,
    pub has_previous: bool,
    pub has_next: bool,
    pub shows_controls: bool,
}
