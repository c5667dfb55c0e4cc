//! 查询组装器 - 把编译结果、情感筛选、日期范围和分页窗口组合成一个查询计划

use serde::{Deserialize, Serialize};

use crate::clause::{ClauseValue, Comparison, FieldName, Operator, PredicateClause};
use crate::compiler::{self, DateRangeSpec};
use crate::models::{DateRangeInput, FilterState};

/// 排序键，目前固定为 created_at 倒序
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: FieldName,
    pub descending: bool,
}

impl Default for SortKey {
    fn default() -> Self {
        Self {
            field: FieldName::CreatedAt,
            descending: true,
        }
    }
}

/// 分页窗口
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    pub limit: usize,
}

/// 查询计划 - 一次请求的完整指令，构造后不再修改
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct QueryPlan {
    pub clauses: Vec<PredicateClause>,
    pub sort: SortKey,
    pub window: PageWindow,
}

/// 组装查询计划
///
/// 条件顺序固定: 各筛选输入的条件（按输入顺序），然后情感等值，最后日期范围。
/// 不去重也不化简，重叠的日期条件原样保留。
pub fn assemble(filters: &FilterState, window: PageWindow) -> QueryPlan {
    let mut clauses: Vec<PredicateClause> = filters
        .inputs
        .iter()
        .flat_map(compiler::compile)
        .collect();

    if let Some(sentiment) = filters.sentiment {
        clauses.push(
            Comparison::new(
                FieldName::SentimentScore,
                Operator::Eq,
                ClauseValue::Text(sentiment.as_str().to_string()),
            )
            .into(),
        );
    }

    clauses.extend(date_range_spec(&filters.date_range).to_clauses());

    QueryPlan {
        clauses,
        sort: SortKey::default(),
        window,
    }
}

/// 日期选择器输入转换为区间。纯日期的结束日整天包含在内，
/// 完整时间戳作为闭区间上界
pub fn date_range_spec(range: &DateRangeInput) -> DateRangeSpec {
    let from = range.from.as_deref().unwrap_or("").trim();
    let to = range.to.as_deref().unwrap_or("").trim();

    // 完整时间戳保留原始时刻，纯日期取当天零点
    let start = compiler::parse_timestamp(from)
        .or_else(|| compiler::parse_calendar_date(from).map(compiler::start_of_day));

    let (end, end_inclusive) = match compiler::parse_timestamp(to) {
        Some(ts) => (Some(ts), true),
        None => (
            compiler::parse_calendar_date(to)
                .and_then(|date| date.succ_opt())
                .map(compiler::start_of_day),
            false,
        ),
    };

    DateRangeSpec { start, end, end_inclusive }
}
