//! 把查询计划渲染成托管数据源（PostgREST）的请求参数

use serde::Serialize;

use crate::assembler::QueryPlan;
use crate::clause::{ClauseValue, Comparison, Operator, PredicateClause};
use crate::models::DashboardConfig;

/// 在 or=(...) 中需要加双引号的字符
const RESERVED: &[char] = &[',', '.', ':', '(', ')', '"', '\\', ' '];

/// PostgREST 请求描述，由宿主页面发送
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PostgrestRequest {
    pub path: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl PostgrestRequest {
    pub fn from_plan(config: &DashboardConfig, plan: &QueryPlan) -> Self {
        let mut params = vec![("select".to_string(), config.select.clone())];

        for clause in &plan.clauses {
            match clause {
                PredicateClause::Match(c) => {
                    params.push((c.field.column().to_string(), operand(c, false)));
                }
                PredicateClause::Or { left, right } => {
                    params.push((
                        "or".to_string(),
                        format!("({},{})", condition(left), condition(right)),
                    ));
                }
            }
        }

        let direction = if plan.sort.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{}", plan.sort.field.column(), direction)));
        params.push(("offset".to_string(), plan.window.offset.to_string()));
        params.push(("limit".to_string(), plan.window.limit.to_string()));

        Self {
            path: format!("/rest/v1/{}", config.table),
            params,
            headers: vec![("Prefer".to_string(), "count=exact".to_string())],
        }
    }

    /// URL 编码后的查询字符串
    pub fn query_string(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}?{}", base_url.trim_end_matches('/'), self.path, self.query_string())
    }
}

fn operator_token(op: Operator) -> &'static str {
    match op {
        Operator::Eq => "eq",
        Operator::Like => "ilike",
        Operator::Gte => "gte",
        Operator::Lte => "lte",
        Operator::Gt => "gt",
        Operator::Lt => "lt",
    }
}

/// 渲染 "op.value"；在 or=(...) 内部时按需加引号
fn operand(c: &Comparison, nested: bool) -> String {
    let value = match (&c.value, c.operator) {
        (ClauseValue::Text(term), Operator::Like) => format!("*{}*", escape_like(term)),
        (value, _) => value.to_string(),
    };
    let value = if nested { quote(&value) } else { value };
    format!("{}.{}", operator_token(c.operator), value)
}

fn condition(c: &Comparison) -> String {
    format!("{}.{}", c.field.column(), operand(c, true))
}

/// LIKE 模式中的 % 和 _ 按字面匹配。* 保留为通配符，
/// 内存存储按同样的规则匹配
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn quote(value: &str) -> String {
    if !value.contains(RESERVED) {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{assemble, PageWindow};
    use crate::models::{FilterCategory, FilterState};
    use utils_common::Sentiment;

    fn render(filters: &FilterState) -> PostgrestRequest {
        let plan = assemble(filters, PageWindow { offset: 20, limit: 20 });
        PostgrestRequest::from_plan(&DashboardConfig::default(), &plan)
    }

    fn param<'a>(request: &'a PostgrestRequest, key: &str) -> Vec<&'a str> {
        request
            .params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn renders_date_range_and_paging() {
        let mut filters = FilterState::search("2024-03-01 to 2024-03-03", FilterCategory::Date);
        filters.sentiment = Some(Sentiment::Positive);
        let request = render(&filters);

        assert_eq!(request.path, "/rest/v1/nrm_tweets_kb");
        assert_eq!(
            param(&request, "created_at"),
            vec!["gte.2024-03-01T00:00:00Z", "lt.2024-03-04T00:00:00Z"]
        );
        assert_eq!(param(&request, "sentiment_score"), vec!["eq.Positive"]);
        assert_eq!(param(&request, "order"), vec!["created_at.desc"]);
        assert_eq!(param(&request, "offset"), vec!["20"]);
        assert_eq!(param(&request, "limit"), vec!["20"]);
        assert_eq!(request.headers, vec![("Prefer".to_string(), "count=exact".to_string())]);
    }

    #[test]
    fn renders_disjunction_with_quoting() {
        let request = render(&FilterState::search("kampala", FilterCategory::All));
        assert_eq!(param(&request, "or"), vec!["(text.ilike.*kampala*,username.ilike.*kampala*)"]);

        let request = render(&FilterState::search("roads, gulu", FilterCategory::All));
        assert_eq!(
            param(&request, "or"),
            vec![r#"(text.ilike."*roads, gulu*",username.ilike."*roads, gulu*")"#]
        );
    }

    #[test]
    fn escapes_like_wildcards() {
        let request = render(&FilterState::search("nrm_official", FilterCategory::Username));
        assert_eq!(param(&request, "username"), vec![r"ilike.*nrm\_official*"]);
    }

    #[test]
    fn star_stays_a_wildcard() {
        let request = render(&FilterState::search("rally*kampala", FilterCategory::Text));
        assert_eq!(param(&request, "text"), vec!["ilike.*rally*kampala*"]);
    }

    #[test]
    fn inclusive_end_keeps_milliseconds() {
        let mut filters = FilterState::default();
        filters.date_range.to = Some("2024-03-03T23:59:59.999Z".to_string());
        let request = render(&filters);
        assert_eq!(param(&request, "created_at"), vec!["lte.2024-03-03T23:59:59.999Z"]);
    }

    #[test]
    fn query_string_is_url_encoded() {
        let request = render(&FilterState::search(">=50", FilterCategory::Likes));
        assert_eq!(
            request.query_string(),
            "select=%2A&like_count=gte.50&order=created_at.desc&offset=20&limit=20"
        );
        assert!(request
            .url("https://example.supabase.co/")
            .starts_with("https://example.supabase.co/rest/v1/nrm_tweets_kb?select="));
    }
}
