use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 情感标签 - 数据表中的 sentiment_score 列是分类值
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// 从数据表中的标签解析，未知或空标签视为缺失
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Positive" | "positive" => Some(Sentiment::Positive),
            "Neutral" | "neutral" => Some(Sentiment::Neutral),
            "Negative" | "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }

    /// 数据表中存储的标签
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }

    /// 用于计算平均情感的数值: 正面 1，中性 0，负面 -1
    pub fn score(&self) -> i32 {
        match self {
            Sentiment::Positive => 1,
            Sentiment::Neutral => 0,
            Sentiment::Negative => -1,
        }
    }

    /// 表格中展示的标签，缺失时显示 N/A
    pub fn display(sentiment: Option<Sentiment>) -> &'static str {
        sentiment.map(|s| s.as_str()).unwrap_or("N/A")
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 推文记录 - 与远程数据表 nrm_tweets_kb 的行结构一致
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TweetRecord {
    /// 推文唯一标识符（数据表中可能是数字）
    #[serde(deserialize_with = "record_id::deserialize")]
    pub id: String,
    /// 推文正文
    pub text: String,
    /// 作者用户名
    pub username: String,
    /// 推文外部链接
    #[serde(default)]
    pub url: Option<String>,
    /// 点赞数
    #[serde(default)]
    pub like_count: u64,
    /// 回复数
    #[serde(default)]
    pub reply_count: u64,
    /// 转发数
    #[serde(default)]
    pub retweet_count: u64,
    /// 情感标签
    #[serde(default, with = "sentiment_label")]
    pub sentiment_score: Option<Sentiment>,
    /// 发布时间
    pub created_at: DateTime<Utc>,
    /// 所属地区（旧版地图筛选使用）
    #[serde(default)]
    pub district: Option<String>,
}

/// 快照元数据 - 存储快照的基本信息
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SnapshotMetadata {
    /// 快照包含的推文数量
    pub record_count: usize,
    /// 快照创建时间
    pub created_at: DateTime<Utc>,
    /// 最早的推文时间
    pub earliest: Option<DateTime<Utc>>,
    /// 最晚的推文时间
    pub latest: Option<DateTime<Utc>>,
    /// 快照版本
    pub version: String,
}

/// 推文快照 - 离线查询使用的完整数据集
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TweetSnapshot {
    pub metadata: SnapshotMetadata,
    pub records: Vec<TweetRecord>,
}

// 情感标签以字符串形式读写，JSON 和 bincode 使用同一种表示
mod sentiment_label {
    use super::Sentiment;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Sentiment>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(sentiment) => serializer.serialize_some(sentiment.as_str()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Sentiment>, D::Error> {
        let label: Option<String> = Option::deserialize(deserializer)?;
        Ok(label.as_deref().and_then(Sentiment::from_label))
    }
}

// JSON 中的 id 可能是字符串或数字；bincode 不支持 deserialize_any，只按字符串读取
mod record_id {
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("字符串或整数形式的 id")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(IdVisitor)
        } else {
            deserializer.deserialize_str(IdVisitor)
        }
    }
}
