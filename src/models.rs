use serde::{Deserialize, Serialize};

// 一次查询的结果，不落盘
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WordLookupResult {
    pub vietnamese_meaning: String,
    pub pronunciation: String,
    pub example_sentence: String,
}

// 已保存的单词记录，创建后不可修改
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SavedWordRecord {
    pub id: String,
    pub word: String,
    pub meaning: String,
    pub pronunciation: String,
    pub example: String,
    pub timestamp: i64, // 毫秒时间戳，只用于排序
}

// 调用方提供的字段，id 和 timestamp 由存储层生成
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWord {
    pub word: String,
    pub meaning: String,
    pub pronunciation: String,
    pub example: String,
}

impl NewWord {
    pub fn from_lookup(word: &str, result: &WordLookupResult) -> Self {
        NewWord {
            word: word.trim().to_string(),
            meaning: result.vietnamese_meaning.clone(),
            pronunciation: result.pronunciation.clone(),
            example: result.example_sentence.clone(),
        }
    }
}
