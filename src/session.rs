use crate::api::GenerateContent;
use crate::database::{BlobStore, RecordStore, StorageError};
use crate::lookup::LookupService;
use crate::models::{NewWord, SavedWordRecord, WordLookupResult};

pub const EMPTY_WORD_MESSAGE: &str = "Vui lòng nhập một từ tiếng Anh.";
pub const LOOKUP_FAILED_MESSAGE: &str = "Có lỗi xảy ra khi tìm kiếm từ vựng. Vui lòng thử lại sau.";
pub const SAVED_MESSAGE: &str = "Từ vựng đã được lưu thành công!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupState {
    Idle,
    Loading,
    Failed(String),
    Found(WordLookupResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Search,
    Saved,
}

/// 界面层持有的状态：当前输入、查询状态、已保存列表的快照。
/// 同一时间只有一次查询，`search` 需要 `&mut self`。
pub struct Session<C, S> {
    lookup: LookupService<C>,
    store: RecordStore<S>,
    pub word: String,
    pub state: LookupState,
    pub saved: Vec<SavedWordRecord>,
    pub status: Option<String>,
    pub tab: Tab,
}

impl<C: GenerateContent, S: BlobStore> Session<C, S> {
    pub async fn open(lookup: LookupService<C>, store: RecordStore<S>) -> Self {
        let saved = store.list_all().await;
        Session {
            lookup,
            store,
            word: String::new(),
            state: LookupState::Idle,
            saved,
            status: None,
            tab: Tab::default(),
        }
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    pub async fn search(&mut self, input: &str) -> &LookupState {
        self.status = None;
        let word = input.trim();
        if word.is_empty() {
            self.state = LookupState::Failed(EMPTY_WORD_MESSAGE.to_string());
            return &self.state;
        }

        self.word = word.to_string();
        self.state = LookupState::Loading;

        self.state = match self.lookup.lookup(word).await {
            Ok(result) => LookupState::Found(result),
            Err(e) => {
                tracing::error!(word, error = %e, "单词查询失败");
                LookupState::Failed(LOOKUP_FAILED_MESSAGE.to_string())
            }
        };
        &self.state
    }

    /// 保存当前查询结果。没有结果时返回 `Ok(false)`。
    pub async fn save_current(&mut self) -> Result<bool, StorageError> {
        let result = match &self.state {
            LookupState::Found(result) if !self.word.is_empty() => result,
            _ => return Ok(false),
        };

        let new_word = NewWord::from_lookup(&self.word, result);
        self.saved = self.store.save(new_word).await?;
        self.status = Some(SAVED_MESSAGE.to_string());
        self.word.clear();
        self.state = LookupState::Idle;
        Ok(true)
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), StorageError> {
        self.saved = self.store.delete_by_id(id).await?;
        Ok(())
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AttemptError;
    use crate::database::MemoryBlobStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedReply {
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerateContent for FixedReply {
        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AttemptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(str::to_string)
                .ok_or(AttemptError::EmptyReply)
        }
    }

    async fn session(reply: Option<&'static str>) -> Session<FixedReply, MemoryBlobStore> {
        let client = FixedReply {
            reply,
            calls: AtomicUsize::new(0),
        };
        let lookup = LookupService::new(client, vec!["m1".to_string(), "m2".to_string()], Duration::ZERO);
        Session::open(lookup, RecordStore::new(MemoryBlobStore::new(), "words")).await
    }

    const REPLY: &str = r#"```json
{"vietnamese_meaning":"kiểm thử hồi quy","pronunciation":"/rɪˈɡrɛʃən/","example_sentence":"Run the regression suite."}
```"#;

    #[tokio::test]
    async fn blank_input_fails_without_request() {
        let mut session = session(Some(REPLY)).await;
        let state = session.search("   ").await.clone();

        assert_eq!(state, LookupState::Failed(EMPTY_WORD_MESSAGE.to_string()));
        assert_eq!(session.lookup.client().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_search_then_save() {
        let mut session = session(Some(REPLY)).await;
        assert!(matches!(session.search("  regression ").await, LookupState::Found(_)));
        assert_eq!(session.word, "regression");

        assert!(session.save_current().await.unwrap());
        assert_eq!(session.state, LookupState::Idle);
        assert!(session.word.is_empty());
        assert_eq!(session.status.as_deref(), Some(SAVED_MESSAGE));

        assert_eq!(session.saved.len(), 1);
        let saved = &session.saved[0];
        assert_eq!(saved.word, "regression");
        assert_eq!(saved.meaning, "kiểm thử hồi quy");
        assert_eq!(saved.pronunciation, "/rɪˈɡrɛʃən/");
        assert_eq!(saved.example, "Run the regression suite.");
        assert_eq!(session.store().list_all().await, session.saved);
    }

    #[tokio::test]
    async fn failed_search_shows_generic_message() {
        let mut session = session(None).await;
        let state = session.search("flaky").await.clone();

        assert_eq!(state, LookupState::Failed(LOOKUP_FAILED_MESSAGE.to_string()));
        assert_eq!(session.lookup.client().calls.load(Ordering::SeqCst), 2);
        assert!(!session.save_current().await.unwrap());
        assert!(session.saved.is_empty());
    }

    #[tokio::test]
    async fn new_search_clears_saved_status() {
        let mut session = session(Some(REPLY)).await;
        session.search("regression").await;
        session.save_current().await.unwrap();
        assert_eq!(session.status.as_deref(), Some(SAVED_MESSAGE));

        session.search("  ").await;
        assert!(session.status.is_none());

        session.search("regression").await;
        session.save_current().await.unwrap();
        session.search("smoke").await;
        assert!(session.status.is_none());
        assert!(matches!(session.state, LookupState::Found(_)));
    }

    #[tokio::test]
    async fn delete_refreshes_snapshot() {
        let mut session = session(Some(REPLY)).await;
        session.search("regression").await;
        session.save_current().await.unwrap();
        let id = session.saved[0].id.clone();

        session.delete(&id).await.unwrap();
        assert!(session.saved.is_empty());
    }

    #[tokio::test]
    async fn open_loads_existing_records() {
        let store = RecordStore::new(MemoryBlobStore::new(), "words");
        store
            .save(NewWord {
                word: "bug".to_string(),
                meaning: "lỗi".to_string(),
                pronunciation: "/bʌɡ/".to_string(),
                example: "Fix the bug.".to_string(),
            })
            .await
            .unwrap();

        let client = FixedReply {
            reply: None,
            calls: AtomicUsize::new(0),
        };
        let mut session = Session::open(LookupService::new(client, Vec::new(), Duration::ZERO), store).await;
        assert_eq!(session.saved.len(), 1);
        assert_eq!(session.tab, Tab::Search);

        session.set_tab(Tab::Saved);
        assert_eq!(session.tab, Tab::Saved);
    }
}
