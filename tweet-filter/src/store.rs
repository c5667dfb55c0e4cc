//! 记录存储边界
//!
//! 远程数据源（托管的 PostgREST 服务）由宿主页面执行；这里定义执行契约，
//! 并提供一个按同样语义在内存中执行查询计划的实现，用于离线快照和测试。

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;
use utils_common::{TweetRecord, TweetSnapshot};

use crate::assembler::QueryPlan;
use crate::clause::{ClauseValue, Comparison, FieldName, Operator, PredicateClause};

/// 查询执行失败。可恢复，由调用方决定是否重试
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("数据源不可用: {0}")]
    Unavailable(String),
    #[error("查询被拒绝 ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("响应解析失败: {0}")]
    Decode(String),
    #[error("快照未加载")]
    NoSnapshot,
}

/// 一页查询结果
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RecordPage {
    #[serde(default)]
    pub records: Vec<TweetRecord>,
    /// 匹配的记录总数（不受分页窗口影响）
    #[serde(default, alias = "totalCount", alias = "count")]
    pub total_count: usize,
}

/// 查询执行契约
pub trait RecordStore {
    fn execute(&self, plan: &QueryPlan) -> Result<RecordPage, StoreError>;
}

/// 内存记录存储
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: Vec<TweetRecord>,
}

impl MemoryStore {
    pub fn new(records: Vec<TweetRecord>) -> Self {
        Self { records }
    }

    /// 从压缩快照加载
    pub fn from_snapshot(data: &[u8]) -> Result<Self, StoreError> {
        let snapshot: TweetSnapshot = utils_common::from_compressed(data)
            .map_err(|e| StoreError::Decode(format!("解析快照失败: {}", e)))?;
        Ok(Self::new(snapshot.records))
    }

    pub fn records(&self) -> &[TweetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn execute(&self, plan: &QueryPlan) -> Result<RecordPage, StoreError> {
        let mut matched: Vec<&TweetRecord> = self
            .records
            .iter()
            .filter(|record| plan.clauses.iter().all(|clause| clause_matches(record, clause)))
            .collect();

        matched.sort_by(|a, b| {
            let order = compare_field(a, b, plan.sort.field);
            let order = if plan.sort.descending { order.reverse() } else { order };
            order.then_with(|| a.id.cmp(&b.id))
        });

        let total_count = matched.len();
        let records = matched
            .into_iter()
            .skip(plan.window.offset)
            .take(plan.window.limit)
            .cloned()
            .collect();

        Ok(RecordPage { records, total_count })
    }
}

/// 判断记录是否满足一个条件
pub fn clause_matches(record: &TweetRecord, clause: &PredicateClause) -> bool {
    match clause {
        PredicateClause::Match(c) => comparison_matches(record, c),
        PredicateClause::Or { left, right } => {
            comparison_matches(record, left) || comparison_matches(record, right)
        }
    }
}

fn comparison_matches(record: &TweetRecord, c: &Comparison) -> bool {
    match (c.field, &c.value) {
        (FieldName::Text, ClauseValue::Text(v)) => text_matches(&record.text, c.operator, v),
        (FieldName::Username, ClauseValue::Text(v)) => text_matches(&record.username, c.operator, v),
        // 缺失的情感标签与任何值比较都不成立
        (FieldName::SentimentScore, ClauseValue::Text(v)) => record
            .sentiment_score
            .is_some_and(|s| text_matches(s.as_str(), c.operator, v)),
        (FieldName::LikeCount, ClauseValue::Integer(v)) => {
            ordering_holds(c.operator, record.like_count.cmp(v))
        }
        (FieldName::RetweetCount, ClauseValue::Integer(v)) => {
            ordering_holds(c.operator, record.retweet_count.cmp(v))
        }
        (FieldName::CreatedAt, ClauseValue::Timestamp(v)) => {
            ordering_holds(c.operator, record.created_at.cmp(v))
        }
        _ => false,
    }
}

fn text_matches(actual: &str, op: Operator, expected: &str) -> bool {
    match op {
        Operator::Like => like_matches(actual, expected),
        other => ordering_holds(other, actual.cmp(expected)),
    }
}

/// 不区分大小写的包含匹配，模式中的 * 匹配任意字符序列
fn like_matches(actual: &str, pattern: &str) -> bool {
    let haystack = actual.to_lowercase();
    let pattern = pattern.to_lowercase();
    let mut rest = haystack.as_str();
    for piece in pattern.split('*').filter(|piece| !piece.is_empty()) {
        match rest.find(piece) {
            Some(pos) => rest = &rest[pos + piece.len()..],
            None => return false,
        }
    }
    true
}

fn ordering_holds(op: Operator, ordering: Ordering) -> bool {
    match op {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Gte => ordering != Ordering::Less,
        Operator::Lte => ordering != Ordering::Greater,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Like => false,
    }
}

fn compare_field(a: &TweetRecord, b: &TweetRecord, field: FieldName) -> Ordering {
    match field {
        FieldName::Text => a.text.cmp(&b.text),
        FieldName::Username => a.username.cmp(&b.username),
        FieldName::CreatedAt => a.created_at.cmp(&b.created_at),
        FieldName::LikeCount => a.like_count.cmp(&b.like_count),
        FieldName::RetweetCount => a.retweet_count.cmp(&b.retweet_count),
        FieldName::SentimentScore => a
            .sentiment_score
            .map(|s| s.as_str())
            .cmp(&b.sentiment_score.map(|s| s.as_str())),
    }
}
