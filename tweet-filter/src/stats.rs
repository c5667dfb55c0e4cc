use serde::Serialize;
use std::collections::HashSet;
use utils_common::{Sentiment, TweetRecord};

/// 情感分布（饼图数据）
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub unlabeled: usize,
}

/// 概览卡片上的统计数据
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct DashboardStats {
    pub total_tweets: usize,
    pub unique_users: usize,
    /// 有标签记录的平均情感，保留两位小数
    pub average_sentiment: f64,
    pub districts_covered: usize,
    pub distribution: SentimentDistribution,
}

impl DashboardStats {
    pub fn from_records(records: &[TweetRecord]) -> Self {
        let mut distribution = SentimentDistribution::default();
        let mut users = HashSet::new();
        let mut districts = HashSet::new();
        let mut score_sum = 0i64;

        for record in records {
            users.insert(record.username.as_str());
            if let Some(district) = record.district.as_deref().map(str::trim) {
                if !district.is_empty() {
                    districts.insert(district);
                }
            }

            match record.sentiment_score {
                Some(Sentiment::Positive) => distribution.positive += 1,
                Some(Sentiment::Neutral) => distribution.neutral += 1,
                Some(Sentiment::Negative) => distribution.negative += 1,
                None => distribution.unlabeled += 1,
            }
            if let Some(sentiment) = record.sentiment_score {
                score_sum += i64::from(sentiment.score());
            }
        }

        let labeled = records.len() - distribution.unlabeled;
        let average_sentiment = if labeled == 0 {
            0.0
        } else {
            (score_sum as f64 / labeled as f64 * 100.0).round() / 100.0
        };

        Self {
            total_tweets: records.len(),
            unique_users: users.len(),
            average_sentiment,
            districts_covered: districts.len(),
            distribution,
        }
    }
}
