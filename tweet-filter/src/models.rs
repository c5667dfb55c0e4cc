use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utils_common::Sentiment;

/// 筛选类别 - 决定自由文本使用哪种语法解析
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FilterCategory {
    /// 同时匹配正文和用户名
    #[default]
    All,
    /// 仅匹配用户名
    Username,
    /// 单个日期或日期范围
    Date,
    /// 点赞数范围或比较
    Likes,
    /// 转发数范围或比较
    Retweets,
    /// 仅匹配正文（分栏筛选界面使用）
    Text,
}

impl FilterCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterCategory::All => "all",
            FilterCategory::Username => "username",
            FilterCategory::Date => "date",
            FilterCategory::Likes => "likes",
            FilterCategory::Retweets => "retweets",
            FilterCategory::Text => "text",
        }
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(FilterCategory::All),
            "username" | "user" => Ok(FilterCategory::Username),
            "date" => Ok(FilterCategory::Date),
            "likes" => Ok(FilterCategory::Likes),
            "retweets" => Ok(FilterCategory::Retweets),
            "text" | "tweet" => Ok(FilterCategory::Text),
            other => Err(format!("未知的筛选类别: {}", other)),
        }
    }
}

/// 单个筛选输入 - 每次界面变更时重新创建
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RawFilterInput {
    /// 用户输入的原始文本
    #[serde(default)]
    pub term: String,
    /// 筛选类别
    #[serde(default)]
    pub category: FilterCategory,
}

impl RawFilterInput {
    pub fn new(term: impl Into<String>, category: FilterCategory) -> Self {
        Self {
            term: term.into(),
            category,
        }
    }
}

/// 独立日期选择器提供的日期范围（与 Date 类别互不影响）
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DateRangeInput {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

impl DateRangeInput {
    pub fn is_empty(&self) -> bool {
        let blank = |side: &Option<String>| side.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.from) && blank(&self.to)
    }
}

/// 完整筛选状态 - 可序列化，由宿主页面持有并传入
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterState {
    /// 按顺序编译的筛选输入
    #[serde(default)]
    pub inputs: Vec<RawFilterInput>,
    /// 情感等值筛选 (可选)
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    /// 日期范围筛选 (可选)
    #[serde(default)]
    pub date_range: DateRangeInput,
}

impl FilterState {
    /// 单搜索框加类别选择器的界面形态
    pub fn search(term: impl Into<String>, category: FilterCategory) -> Self {
        Self {
            inputs: vec![RawFilterInput::new(term, category)],
            ..Self::default()
        }
    }

    /// 没有任何有效输入
    pub fn is_empty(&self) -> bool {
        self.inputs.iter().all(|input| input.term.trim().is_empty())
            && self.sentiment.is_none()
            && self.date_range.is_empty()
    }

    /// 结果计数行，例如: Showing 20 tweets for "nrm" with sentiment Positive
    pub fn describe(&self, shown: usize) -> String {
        let mut line = format!("Showing {} tweets", shown);

        for input in &self.inputs {
            let term = input.term.trim();
            if term.is_empty() {
                continue;
            }
            match input.category {
                FilterCategory::All => line.push_str(&format!(" for \"{}\"", term)),
                FilterCategory::Text => line.push_str(&format!(" for tweet \"{}\"", term)),
                FilterCategory::Username => line.push_str(&format!(" by user \"{}\"", term)),
                other => line.push_str(&format!(" where {} is \"{}\"", other, term)),
            }
        }

        if let Some(sentiment) = self.sentiment {
            line.push_str(&format!(" with sentiment {}", sentiment));
        }

        if !self.date_range.is_empty() {
            let side = |s: &Option<String>| {
                s.as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or("...")
                    .to_string()
            };
            line.push_str(&format!(
                " between {} and {}",
                side(&self.date_range.from),
                side(&self.date_range.to)
            ));
        }

        line
    }
}

/// 仪表盘配置 - 由宿主页面以 JSON 传入
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DashboardConfig {
    /// 远程数据表名
    #[serde(default = "default_table")]
    pub table: String,
    /// 查询的列
    #[serde(default = "default_select")]
    pub select: String,
    /// 每页条数
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            select: default_select(),
            items_per_page: default_items_per_page(),
        }
    }
}

impl DashboardConfig {
    /// 从 JSON 解析，空字符串使用默认配置
    pub fn from_json(json: &str) -> Result<Self, String> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| format!("解析配置失败: {}", e))?;
        config.items_per_page = config.items_per_page.max(1);
        Ok(config)
    }
}

/// 默认数据表
fn default_table() -> String {
    "nrm_tweets_kb".to_string()
}

fn default_select() -> String {
    "*".to_string()
}

/// 默认每页条数
fn default_items_per_page() -> usize {
    20
}
