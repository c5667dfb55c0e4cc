use std::io::{self, Read, Write};
use flate2::{Compression, write::GzEncoder, read::GzDecoder};

/// 魔数常量 - 用于标识快照文件格式
pub const MAGIC_BYTES: &[u8] = b"TWSNP"; // Tweet Snapshot

/// 当前快照格式的主版本号
pub const SNAPSHOT_VERSION: [u8; 2] = [1, 0];

/// 预分配时假定的最大压缩比
const MAX_EXPANSION: usize = 32;

/// 头部长度: 魔数 + 版本号(2字节) + 原始大小(4字节)
const HEADER_LEN: usize = MAGIC_BYTES.len() + 2 + 4;

/// 快照头部 - 压缩数据前的固定长度头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// 格式版本号 [主版本, 次版本]
    pub version: [u8; 2],
    /// 解压后的原始数据大小
    pub original_size: u32,
}

impl SnapshotHeader {
    /// 解析并校验头部，主版本号超过 max_version 时拒绝
    pub fn parse(data: &[u8], max_version: u8) -> Result<Self, io::Error> {
        if data.len() < HEADER_LEN {
            return Err(invalid(format!("数据太短，无法解析: {} 字节", data.len())));
        }

        if &data[..MAGIC_BYTES.len()] != MAGIC_BYTES {
            return Err(invalid("无效的文件格式：魔数不匹配".to_string()));
        }

        let offset = MAGIC_BYTES.len();
        let version = [data[offset], data[offset + 1]];
        if version[0] > max_version {
            return Err(invalid(format!("不支持的版本: {}.{}", version[0], version[1])));
        }

        let mut size_bytes = [0u8; 4];
        size_bytes.copy_from_slice(&data[offset + 2..HEADER_LEN]);

        Ok(Self {
            version,
            original_size: u32::from_le_bytes(size_bytes),
        })
    }

    fn write_to(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(MAGIC_BYTES);
        output.extend_from_slice(&self.version);
        output.extend_from_slice(&self.original_size.to_le_bytes());
    }
}

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// 将对象序列化为二进制格式
pub fn to_binary<T: serde::Serialize>(obj: &T) -> Result<Vec<u8>, io::Error> {
    bincode::serde::encode_to_vec(obj, bincode::config::standard())
        .map_err(|e| io::Error::other(format!("序列化失败: {}", e)))
}

/// 从二进制格式反序列化对象
pub fn from_binary<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T, io::Error> {
    bincode::serde::decode_from_slice(data, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| io::Error::other(format!("反序列化失败: {}", e)))
}

/// 将对象序列化为压缩快照
pub fn to_compressed<T: serde::Serialize>(obj: &T, version: [u8; 2]) -> Result<Vec<u8>, io::Error> {
    let binary = to_binary(obj)?;
    let original_size = u32::try_from(binary.len())
        .map_err(|_| invalid(format!("快照过大: {} 字节", binary.len())))?;

    let mut output = Vec::with_capacity(HEADER_LEN + binary.len() / 2);
    SnapshotHeader { version, original_size }.write_to(&mut output);

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&binary)?;
    output.extend_from_slice(&encoder.finish()?);

    Ok(output)
}

/// 从压缩快照反序列化对象，使用当前主版本作为上限
pub fn from_compressed<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T, io::Error> {
    from_compressed_with_max_version(data, SNAPSHOT_VERSION[0])
}

/// 从压缩快照反序列化对象，允许指定支持的最大版本
pub fn from_compressed_with_max_version<T: serde::de::DeserializeOwned>(
    data: &[u8],
    max_version: u8,
) -> Result<T, io::Error> {
    let header = SnapshotHeader::parse(data, max_version)?;

    let decoder = GzDecoder::new(&data[HEADER_LEN..]);
    // 头部中的大小不可信，预分配和读取量都要设上限
    let expected = header.original_size as usize;
    let capacity = expected.min(data.len().saturating_mul(MAX_EXPANSION));
    let mut decompressed = Vec::with_capacity(capacity);
    decoder
        .take(header.original_size as u64 + 1)
        .read_to_end(&mut decompressed)?;

    if decompressed.len() != header.original_size as usize {
        return Err(invalid(format!(
            "解压后数据大小不匹配: 期望 {} 字节, 实际 {} 字节",
            header.original_size,
            decompressed.len()
        )));
    }

    from_binary(&decompressed)
}

/// 验证快照头部是否有效，返回版本号
pub fn validate_compressed_data(data: &[u8]) -> Result<[u8; 2], io::Error> {
    SnapshotHeader::parse(data, SNAPSHOT_VERSION[0]).map(|header| header.version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Sentiment, TweetRecord};
    use chrono::{TimeZone, Utc};

    fn sample() -> Vec<TweetRecord> {
        vec![TweetRecord {
            id: "1".to_string(),
            text: "Rally in Kampala".to_string(),
            username: "nrm_updates".to_string(),
            url: Some("https://x.com/nrm_updates/status/1".to_string()),
            like_count: 12,
            reply_count: 3,
            retweet_count: 4,
            sentiment_score: Some(Sentiment::Positive),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            district: None,
        }]
    }

    #[test]
    fn snapshot_survives_compression() {
        let data = to_compressed(&sample(), SNAPSHOT_VERSION).unwrap();
        assert_eq!(validate_compressed_data(&data).unwrap(), SNAPSHOT_VERSION);
        let restored: Vec<TweetRecord> = from_compressed(&data).unwrap();
        assert_eq!(restored, sample());
    }

    #[test]
    fn rejects_foreign_and_future_data() {
        let err = SnapshotHeader::parse(b"short", 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = SnapshotHeader::parse(b"NECMP\x03\x00\x00\x00\x00\x00", 1).unwrap_err();
        assert!(err.to_string().contains("魔数不匹配"));

        let data = to_compressed(&sample(), [2, 0]).unwrap();
        let err = from_compressed::<Vec<TweetRecord>>(&data).unwrap_err();
        assert!(err.to_string().contains("不支持的版本: 2.0"));
    }

    #[test]
    fn oversized_header_length_is_rejected() {
        let mut data = to_compressed(&sample(), SNAPSHOT_VERSION).unwrap();
        data[HEADER_LEN - 4..HEADER_LEN].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = from_compressed::<Vec<TweetRecord>>(&data).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("解压后数据大小不匹配"));
    }
}
