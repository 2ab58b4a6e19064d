use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::models::{NewWord, SavedWordRecord};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("数据库操作失败: {0}")]
    Database(#[from] sqlx::Error),
    #[error("序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("文件操作失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),
}

/// 按 key 存取整块文本的持久化后端
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

pub struct SqliteBlobStore {
    pool: SqlitePool,
}

impl SqliteBlobStore {
    pub async fn open(db_path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        if !db_path.exists() {
            tracing::info!(path = %db_path.display(), "创建新数据库文件");
        }

        // 直接传文件路径，不拼接连接串
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let store = SqliteBlobStore { pool };
        store.initialize_tables().await?;

        Ok(store)
    }

    pub async fn from_config(config: &Config) -> Result<Self, StorageError> {
        let db_path = std::env::current_dir()?.join(&config.database.db_file);
        tracing::debug!(path = %db_path.display(), "连接数据库");
        Self::open(&db_path).await
    }

    async fn initialize_tables(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// 进程内存储，不落盘
#[derive(Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// 已保存单词的存储。整个列表以 JSON 数组的形式存放在同一个 key 下，
/// 每次保存或删除都是完整的读-改-写。
pub struct RecordStore<S> {
    backend: S,
    key: String,
}

impl<S: BlobStore> RecordStore<S> {
    pub fn new(backend: S, key: impl Into<String>) -> Self {
        RecordStore {
            backend,
            key: key.into(),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// 按时间倒序返回全部记录。读取失败或内容无法解析时返回空列表。
    pub async fn list_all(&self) -> Vec<SavedWordRecord> {
        let raw = match self.backend.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "读取已保存单词失败，按空列表处理");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<SavedWordRecord>>(&raw) {
            Ok(mut records) => {
                sort_newest_first(&mut records);
                records
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "已保存单词格式无效，按空列表处理");
                Vec::new()
            }
        }
    }

    pub async fn save(&self, word: NewWord) -> Result<Vec<SavedWordRecord>, StorageError> {
        let current = self.list_all().await;

        let record = SavedWordRecord {
            id: uuid::Uuid::new_v4().to_string(),
            word: word.word,
            meaning: word.meaning,
            pronunciation: word.pronunciation,
            example: word.example,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        tracing::info!(id = %record.id, word = %record.word, "保存单词");

        let mut next = Vec::with_capacity(current.len() + 1);
        next.push(record);
        next.extend(current);

        self.write(&next).await?;
        sort_newest_first(&mut next);
        Ok(next)
    }

    /// 删除所有 id 匹配的记录；id 不存在时原样返回当前列表
    pub async fn delete_by_id(&self, id: &str) -> Result<Vec<SavedWordRecord>, StorageError> {
        let current = self.list_all().await;
        let before = current.len();

        let next: Vec<SavedWordRecord> = current.into_iter().filter(|r| r.id != id).collect();
        tracing::info!(id, removed = before - next.len(), "删除单词");

        self.write(&next).await?;
        Ok(next)
    }

    pub async fn clear_all(&self) -> Result<(), StorageError> {
        tracing::info!(key = %self.key, "清空已保存单词");
        self.backend.remove(&self.key).await
    }

    async fn write(&self, records: &[SavedWordRecord]) -> Result<(), StorageError> {
        let payload = serde_json::to_string(records)?;
        self.backend.set(&self.key, &payload).await
    }
}

fn sort_newest_first(records: &mut [SavedWordRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

// 导出已保存单词为 CSV，便于导入卡片软件
pub fn export_csv(records: &[SavedWordRecord], output_file: &Path) -> Result<(), StorageError> {
    let mut writer = csv::Writer::from_path(output_file)?;

    writer.write_record(["word", "meaning", "pronunciation", "example", "id", "timestamp"])?;
    for record in records {
        let timestamp = record.timestamp.to_string();
        writer.write_record([
            record.word.as_str(),
            record.meaning.as_str(),
            record.pronunciation.as_str(),
            record.example.as_str(),
            record.id.as_str(),
            timestamp.as_str(),
        ])?;
    }
    writer.flush()?;

    tracing::info!(path = %output_file.display(), count = records.len(), "导出完成");
    Ok(())
}
