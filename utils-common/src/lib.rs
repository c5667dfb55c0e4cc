pub mod compression;
pub mod models;

// 重新导出常用类型和函数
pub use compression::{to_compressed, from_compressed, validate_compressed_data, SNAPSHOT_VERSION};
pub use models::{Sentiment, SnapshotMetadata, TweetRecord, TweetSnapshot};
