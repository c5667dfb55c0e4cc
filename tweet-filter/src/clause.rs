//! 查询条件模型 - 与后端无关的结构化筛选指令

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 可筛选的字段，固定集合
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Text,
    Username,
    CreatedAt,
    LikeCount,
    RetweetCount,
    SentimentScore,
}

impl FieldName {
    /// 数据表中的列名
    pub fn column(&self) -> &'static str {
        match self {
            FieldName::Text => "text",
            FieldName::Username => "username",
            FieldName::CreatedAt => "created_at",
            FieldName::LikeCount => "like_count",
            FieldName::RetweetCount => "retweet_count",
            FieldName::SentimentScore => "sentiment_score",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// 比较运算符
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// 等于
    Eq,
    /// 不区分大小写的子串匹配
    Like,
    Gte,
    Lte,
    Gt,
    Lt,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Like => "like",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
        }
    }
}

/// 条件值
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ClauseValue {
    Text(String),
    Integer(u64),
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for ClauseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseValue::Text(s) => f.write_str(s),
            ClauseValue::Integer(n) => write!(f, "{}", n),
            ClauseValue::Timestamp(ts) => {
                f.write_str(&ts.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
            }
        }
    }
}

/// 单字段比较
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Comparison {
    pub field: FieldName,
    pub operator: Operator,
    pub value: ClauseValue,
}

impl Comparison {
    pub fn new(field: FieldName, operator: Operator, value: ClauseValue) -> Self {
        Self { field, operator, value }
    }

    pub fn like(field: FieldName, term: &str) -> Self {
        Self::new(field, Operator::Like, ClauseValue::Text(term.to_string()))
    }

    pub fn count(field: FieldName, operator: Operator, value: u64) -> Self {
        Self::new(field, operator, ClauseValue::Integer(value))
    }

    pub fn at(operator: Operator, ts: DateTime<Utc>) -> Self {
        Self::new(FieldName::CreatedAt, operator, ClauseValue::Timestamp(ts))
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator.as_str(), self.value)
    }
}

/// 查询条件。除 All 类别产生的唯一 OR 组合外，其余条件之间都是 AND 关系
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredicateClause {
    Match(Comparison),
    Or { left: Comparison, right: Comparison },
}

impl PredicateClause {
    /// 条件涉及的字段
    pub fn fields(&self) -> Vec<FieldName> {
        match self {
            PredicateClause::Match(c) => vec![c.field],
            PredicateClause::Or { left, right } => vec![left.field, right.field],
        }
    }
}

impl From<Comparison> for PredicateClause {
    fn from(comparison: Comparison) -> Self {
        PredicateClause::Match(comparison)
    }
}

impl fmt::Display for PredicateClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateClause::Match(c) => write!(f, "{}", c),
            PredicateClause::Or { left, right } => write!(f, "({} or {})", left, right),
        }
    }
}
