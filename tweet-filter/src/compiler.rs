//! 筛选词编译器
//!
//! 将 `(term, category)` 翻译成结构化查询条件。纯函数，没有 I/O。
//! 格式错误的输入只会产生更少的条件或不产生条件，永远不会返回错误。

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::clause::{Comparison, FieldName, Operator, PredicateClause};
use crate::models::{FilterCategory, RawFilterInput};

/// 范围形式: min-max，两侧都必须是数字
static RANGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)-(\d+)$").expect("范围正则无效"));

/// 比较形式: 可选运算符加一个非负整数
static OPERATOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(>=|<=|>|<|=)?(\d+)$").expect("比较正则无效"));

/// 可接受的纯日期格式，按顺序尝试
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%b %d, %Y", "%d %b %Y"];

/// 日期区间。由纯日期得到时为半开区间 [start, end)；
/// 显式给出结束时间戳时 end 为闭区间
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DateRangeSpec {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub end_inclusive: bool,
}

impl DateRangeSpec {
    /// 单个日历日
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: Some(start_of_day(date)),
            end: day_after(date),
            end_inclusive: false,
        }
    }

    pub fn to_clauses(&self) -> Vec<PredicateClause> {
        let mut clauses = Vec::new();
        if let Some(start) = self.start {
            clauses.push(Comparison::at(Operator::Gte, start).into());
        }
        if let Some(end) = self.end {
            let op = if self.end_inclusive { Operator::Lte } else { Operator::Lt };
            clauses.push(Comparison::at(op, end).into());
        }
        clauses
    }
}

/// 数值筛选。范围和比较两种形式同一时刻只有一种生效
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumericRangeSpec {
    Range { min: Option<u64>, max: Option<u64> },
    Compare { op: Operator, value: u64 },
}

impl NumericRangeSpec {
    pub fn to_clauses(&self, field: FieldName) -> Vec<PredicateClause> {
        match *self {
            NumericRangeSpec::Range { min, max } => {
                let mut clauses = Vec::new();
                if let Some(min) = min {
                    clauses.push(Comparison::count(field, Operator::Gte, min).into());
                }
                if let Some(max) = max {
                    clauses.push(Comparison::count(field, Operator::Lte, max).into());
                }
                clauses
            }
            NumericRangeSpec::Compare { op, value } => {
                vec![Comparison::count(field, op, value).into()]
            }
        }
    }
}

/// 编译一个筛选输入
pub fn compile(input: &RawFilterInput) -> Vec<PredicateClause> {
    compile_term(&input.term, input.category)
}

/// 编译筛选词。去除首尾空白后为空时不产生任何条件
pub fn compile_term(term: &str, category: FilterCategory) -> Vec<PredicateClause> {
    let term = term.trim();
    if term.is_empty() {
        return Vec::new();
    }

    match category {
        FilterCategory::All => vec![PredicateClause::Or {
            left: Comparison::like(FieldName::Text, term),
            right: Comparison::like(FieldName::Username, term),
        }],
        FilterCategory::Username => vec![Comparison::like(FieldName::Username, term).into()],
        FilterCategory::Text => vec![Comparison::like(FieldName::Text, term).into()],
        FilterCategory::Date => parse_date_term(term)
            .map(|spec| spec.to_clauses())
            .unwrap_or_default(),
        FilterCategory::Likes => parse_numeric_term(term)
            .map(|spec| spec.to_clauses(FieldName::LikeCount))
            .unwrap_or_default(),
        FilterCategory::Retweets => parse_numeric_term(term)
            .map(|spec| spec.to_clauses(FieldName::RetweetCount))
            .unwrap_or_default(),
    }
}

/// 解析日期筛选词。支持 `<date> to <date>`、`<date>..<date>` 和单个日期
pub fn parse_date_term(term: &str) -> Option<DateRangeSpec> {
    let normalized = term.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return None;
    }

    let parts: Vec<&str> = if normalized.contains(" to ") {
        normalized.split(" to ").collect()
    } else {
        normalized.split("..").collect()
    };

    if let [start, end] = parts.as_slice() {
        // 结束日当天整天包含在内
        let spec = DateRangeSpec {
            start: parse_calendar_date(start).map(start_of_day),
            end: parse_calendar_date(end).and_then(day_after),
            end_inclusive: false,
        };
        return (spec.start.is_some() || spec.end.is_some()).then_some(spec);
    }

    parse_calendar_date(&normalized).map(DateRangeSpec::day)
}

/// 解析数值筛选词。先尝试范围形式，不匹配时再尝试比较形式
pub fn parse_numeric_term(term: &str) -> Option<NumericRangeSpec> {
    let compact: String = term.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    if let Some(caps) = RANGE_PATTERN.captures(&compact) {
        let min = parse_count(&caps[1]);
        let max = parse_count(&caps[2]);
        return (min.is_some() || max.is_some()).then_some(NumericRangeSpec::Range { min, max });
    }

    let caps = OPERATOR_PATTERN.captures(&compact)?;
    let op = match caps.get(1).map(|m| m.as_str()) {
        Some(">=") => Operator::Gte,
        Some("<=") => Operator::Lte,
        Some(">") => Operator::Gt,
        Some("<") => Operator::Lt,
        _ => Operator::Eq,
    };
    let value = parse_count(&caps[2])?;
    Some(NumericRangeSpec::Compare { op, value })
}

/// 解析日历日期。完整时间戳取其 UTC 日期
pub fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}

/// 解析显式时间戳（RFC 3339）
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn day_after(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.succ_opt().map(start_of_day)
}

/// 非负整数，只接受十进制数字，溢出视为无效
fn parse_count(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::ClauseValue;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn at(op: Operator, t: DateTime<Utc>) -> PredicateClause {
        Comparison::at(op, t).into()
    }

    fn count(field: FieldName, op: Operator, n: u64) -> PredicateClause {
        Comparison::count(field, op, n).into()
    }

    #[test]
    fn blank_terms_yield_nothing_for_every_category() {
        for category in [
            FilterCategory::All,
            FilterCategory::Username,
            FilterCategory::Date,
            FilterCategory::Likes,
            FilterCategory::Retweets,
            FilterCategory::Text,
        ] {
            assert!(compile_term("", category).is_empty());
            assert!(compile_term(" \t\n ", category).is_empty());
        }
    }

    #[test]
    fn all_category_is_single_disjunction() {
        let clauses = compile_term("  Kampala ", FilterCategory::All);
        assert_eq!(
            clauses,
            vec![PredicateClause::Or {
                left: Comparison::like(FieldName::Text, "Kampala"),
                right: Comparison::like(FieldName::Username, "Kampala"),
            }]
        );
    }

    #[test]
    fn username_is_substring_match() {
        assert_eq!(
            compile_term("nrm", FilterCategory::Username),
            vec![PredicateClause::Match(Comparison::like(FieldName::Username, "nrm"))]
        );
    }

    #[test]
    fn single_date_is_one_day_window() {
        assert_eq!(
            compile_term("2024-03-01", FilterCategory::Date),
            vec![at(Operator::Gte, ts(2024, 3, 1)), at(Operator::Lt, ts(2024, 3, 2))]
        );
    }

    #[test]
    fn date_range_includes_end_day() {
        let expected = vec![at(Operator::Gte, ts(2024, 3, 1)), at(Operator::Lt, ts(2024, 3, 4))];
        assert_eq!(compile_term("2024-03-01 to 2024-03-03", FilterCategory::Date), expected);
        assert_eq!(compile_term("2024-03-01..2024-03-03", FilterCategory::Date), expected);
        assert_eq!(compile_term("2024-03-01   to\t2024-03-03", FilterCategory::Date), expected);
    }

    #[test]
    fn date_range_sides_fail_independently() {
        assert_eq!(
            compile_term("2024-03-01 to someday", FilterCategory::Date),
            vec![at(Operator::Gte, ts(2024, 3, 1))]
        );
        assert_eq!(
            compile_term("..2024-12-31", FilterCategory::Date),
            vec![at(Operator::Lt, ts(2025, 1, 1))]
        );
        assert!(compile_term("soon to later", FilterCategory::Date).is_empty());
    }

    #[test]
    fn unparseable_dates_yield_nothing() {
        assert!(compile_term("yesterday", FilterCategory::Date).is_empty());
        assert!(compile_term("2024-02-30", FilterCategory::Date).is_empty());
        assert!(compile_term("2024-03-01..2024-03-02..2024-03-03", FilterCategory::Date).is_empty());
    }

    #[test]
    fn other_date_spellings() {
        let day = vec![at(Operator::Gte, ts(2024, 3, 1)), at(Operator::Lt, ts(2024, 3, 2))];
        assert_eq!(compile_term("2024/03/01", FilterCategory::Date), day);
        assert_eq!(compile_term("Mar 01, 2024", FilterCategory::Date), day);
        assert_eq!(compile_term("2024-03-01T18:45:00Z", FilterCategory::Date), day);
    }

    #[test]
    fn numeric_range() {
        assert_eq!(
            compile_term("10-100", FilterCategory::Likes),
            vec![
                count(FieldName::LikeCount, Operator::Gte, 10),
                count(FieldName::LikeCount, Operator::Lte, 100)
            ]
        );
        assert_eq!(
            compile_term(" 10 - 100 ", FilterCategory::Retweets),
            vec![
                count(FieldName::RetweetCount, Operator::Gte, 10),
                count(FieldName::RetweetCount, Operator::Lte, 100)
            ]
        );
    }

    #[test]
    fn numeric_range_needs_digits_on_both_sides() {
        assert!(compile_term("10-lots", FilterCategory::Likes).is_empty());
        assert!(compile_term("-5", FilterCategory::Likes).is_empty());
        assert!(compile_term("5-", FilterCategory::Likes).is_empty());
        assert!(compile_term("1-2-3", FilterCategory::Retweets).is_empty());
    }

    #[test]
    fn overflowing_range_side_is_dropped() {
        assert_eq!(
            compile_term("99999999999999999999999-7", FilterCategory::Likes),
            vec![count(FieldName::LikeCount, Operator::Lte, 7)]
        );
    }

    #[test]
    fn numeric_operators() {
        assert_eq!(
            compile_term(">=50", FilterCategory::Retweets),
            vec![count(FieldName::RetweetCount, Operator::Gte, 50)]
        );
        assert_eq!(
            compile_term("50", FilterCategory::Retweets),
            vec![count(FieldName::RetweetCount, Operator::Eq, 50)]
        );
        assert_eq!(
            compile_term("< 3", FilterCategory::Likes),
            vec![count(FieldName::LikeCount, Operator::Lt, 3)]
        );
        assert_eq!(
            compile_term("=7", FilterCategory::Likes),
            vec![count(FieldName::LikeCount, Operator::Eq, 7)]
        );
        assert_eq!(
            compile_term("> 1 000", FilterCategory::Likes),
            vec![count(FieldName::LikeCount, Operator::Gt, 1000)]
        );
    }

    #[test]
    fn malformed_numeric_terms_yield_nothing() {
        for term in ["abc", ">=", "=>5", "5.5", "+5", "<<5", "99999999999999999999999"] {
            assert!(compile_term(term, FilterCategory::Likes).is_empty(), "{}", term);
        }
    }

    #[test]
    fn compiling_twice_is_identical() {
        for (term, category) in [
            ("nrm", FilterCategory::All),
            ("2024-03-01 to 2024-03-03", FilterCategory::Date),
            ("10-100", FilterCategory::Likes),
            (">=50", FilterCategory::Retweets),
        ] {
            assert_eq!(compile_term(term, category), compile_term(term, category));
        }
    }

    #[test]
    fn only_known_fields_are_referenced() {
        let clauses = compile_term("2024-03-01", FilterCategory::Date);
        assert!(clauses
            .iter()
            .flat_map(|c| c.fields())
            .all(|f| f == FieldName::CreatedAt));
        match &clauses[0] {
            PredicateClause::Match(c) => assert_eq!(c.value, ClauseValue::Timestamp(ts(2024, 3, 1))),
            other => panic!("unexpected clause {:?}", other),
        }
    }
}
