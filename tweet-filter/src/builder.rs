use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use utils_common::compression::{to_compressed, SNAPSHOT_VERSION};
use utils_common::{SnapshotMetadata, TweetRecord, TweetSnapshot};

use crate::stats::DashboardStats;

/// 快照构建器
#[derive(Default)]
pub struct SnapshotBuilder {
    records: Vec<TweetRecord>,
    // id -> records 中的位置
    positions: HashMap<String, usize>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加推文，重复的 id 以后添加的为准
    pub fn add_record(&mut self, record: TweetRecord) {
        match self.positions.get(&record.id) {
            Some(&index) => self.records[index] = record,
            None => {
                self.positions.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats::from_records(&self.records)
    }

    /// 构建快照
    pub fn build_snapshot(&self) -> Result<TweetSnapshot, String> {
        if self.records.is_empty() {
            return Err("无法构建快照: 没有推文数据".to_string());
        }

        let mut records = self.records.clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let metadata = SnapshotMetadata {
            record_count: records.len(),
            created_at: Utc::now(),
            earliest: records.last().map(|r| r.created_at),
            latest: records.first().map(|r| r.created_at),
            version: format!("{}.{}", SNAPSHOT_VERSION[0], SNAPSHOT_VERSION[1]),
        };

        Ok(TweetSnapshot { metadata, records })
    }

    /// 构建并压缩快照
    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        let snapshot = self.build_snapshot()?;
        to_compressed(&snapshot, SNAPSHOT_VERSION).map_err(|e| format!("压缩快照失败: {}", e))
    }

    /// 保存快照到文件，返回写入的字节数
    pub fn save_snapshot(&self, path: &str) -> Result<usize, String> {
        let data = self.to_bytes()?;
        fs::write(path, &data).map_err(|e| format!("无法写入快照文件 {}: {}", path, e))?;
        Ok(data.len())
    }
}
