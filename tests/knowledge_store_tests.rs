//! KnowledgeStore 行为测试：导入导出、历史上限、持久化失败、配置加载

mod common;

use std::sync::Arc;

use tempfile::TempDir;

use common::{capture_logs, test_catalog};
use vocab_knowledge::knowledge::MAX_GAME_HISTORY;
use vocab_knowledge::{
    Direction, DocumentStorage, GameSession, KeyValueStore, KnowledgeConfig, KnowledgeData,
    KnowledgeStore, LessonProgressStore, MemoryKeyValueStore, Mode, Quality, StorageError,
    StorageResult, WordOutcome,
};

fn new_store() -> KnowledgeStore {
    KnowledgeStore::in_memory(Arc::new(test_catalog()))
}

/// 读取正常、写入总是失败的存储
struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Io("存储空间已满".to_string()))
    }

    fn remove(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }
}

#[test]
fn test_first_try_sequence() {
    let mut store = new_store();

    let scores: Vec<f64> = (0..3)
        .map(|_| store.record_answer("hola", Direction::Forward, Quality::FirstTry, Mode::Primary))
        .collect();

    assert_eq!(scores, vec![30.0, 51.0, 65.7]);
}

#[test]
fn test_failure_sequence_decays() {
    let mut store = new_store();
    store.record_answer("hola", Direction::Forward, Quality::FirstTry, Mode::Primary);

    let after_fail = store.record_answer("hola", Direction::Forward, Quality::Failed, Mode::Primary);
    assert_eq!(after_fail, 21.0);

    for _ in 0..40 {
        store.record_answer("hola", Direction::Forward, Quality::Failed, Mode::Primary);
    }
    // 两位小数舍入使分数停在 0.01
    assert_eq!(store.get_word_score("hola", Direction::Forward, Mode::Primary), 0.01);
}

#[test]
fn test_export_then_import_into_fresh_store() {
    let mut source = new_store();
    let mut session = GameSession::new("animals", Direction::Forward, Mode::Primary);
    session.record_attempt("gato", 1);
    session.record_attempt("perro", 3);
    session.finish(&mut source);
    source.record_answer("hola", Direction::Reverse, Quality::SecondTry, Mode::Junior);

    let exported = source.export_data(None).unwrap();

    let mut target = new_store();
    let summary = target.import_data(&exported).unwrap();

    assert_eq!(summary.words_added, 3);
    assert_eq!(summary.games_added, 1);
    assert_eq!(target.data().words, source.data().words);
    assert_eq!(target.data().game_history, source.data().game_history);
    assert_eq!(target.data().meta.total_sessions, 1);
    assert_eq!(target.data().meta.created_at, source.data().meta.created_at);
}

#[test]
fn test_importing_own_export_keeps_history_unique() {
    let mut store = new_store();
    store.record_game(
        "animals",
        Direction::Forward,
        vec![WordOutcome::new("gato", Quality::FirstTry)],
        Mode::Primary,
    );
    let before = store.data().words.clone();

    let exported = store.export_data(None).unwrap();
    let summary = store.import_data(&exported).unwrap();

    assert_eq!(summary.words_updated, 1);
    assert_eq!(summary.games_added, 0);
    assert_eq!(store.data().game_history.len(), 1);
    assert_eq!(store.data().words, before);
    // 会话计数按相加处理
    assert_eq!(store.data().meta.total_sessions, 2);
}

#[test]
fn test_mode_filtered_export_merges_without_touching_other_mode() {
    let mut source = new_store();
    source.record_answer("gato", Direction::Forward, Quality::FirstTry, Mode::Junior);
    source.record_answer("gato", Direction::Forward, Quality::Failed, Mode::Primary);
    let junior_only = source.export_data(Some(Mode::Junior)).unwrap();

    let mut target = new_store();
    target.record_answer("gato", Direction::Forward, Quality::FirstTry, Mode::Primary);
    target.record_answer("gato", Direction::Forward, Quality::FirstTry, Mode::Primary);
    target.import_data(&junior_only).unwrap();

    assert_eq!(target.get_word_score("gato", Direction::Forward, Mode::Primary), 51.0);
    assert_eq!(target.get_word_score("gato", Direction::Forward, Mode::Junior), 30.0);
}

#[test]
fn test_history_keeps_latest_hundred() {
    let mut store = new_store();
    let mut ids = Vec::new();
    for _ in 0..(MAX_GAME_HISTORY + 5) {
        let record = store.record_game("animals", Direction::Forward, Vec::new(), Mode::Primary);
        ids.push(record.id);
    }

    let history = &store.data().game_history;
    assert_eq!(history.len(), MAX_GAME_HISTORY);
    assert_eq!(history.as_slice()[0].id, ids[ids.len() - 1]);
    assert_eq!(history.as_slice()[MAX_GAME_HISTORY - 1].id, ids[5]);
    assert_eq!(store.data().meta.total_sessions as usize, MAX_GAME_HISTORY + 5);
}

#[test]
fn test_failed_write_keeps_in_memory_state() {
    let (score, logs) = capture_logs(|| {
        let mut store = KnowledgeStore::open(
            DocumentStorage::new(ReadOnlyStore, "slot"),
            Arc::new(test_catalog()),
        );
        let score = store.record_answer("gato", Direction::Forward, Quality::FirstTry, Mode::Primary);
        assert_eq!(store.get_word_score("gato", Direction::Forward, Mode::Primary), score);
        score
    });

    assert_eq!(score, 30.0);
    assert!(logs.contains("ERROR"), "logs: {logs}");
}

#[test]
fn test_subscriber_sees_each_import() {
    let mut store = new_store();
    let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::<usize>::new()));
    let sink = seen.clone();
    store.subscribe(move |data: &KnowledgeData| sink.borrow_mut().push(data.words.len()));

    let mut other = new_store();
    other.record_answer("hola", Direction::Forward, Quality::FirstTry, Mode::Primary);
    store.import_data(&other.export_data(None).unwrap()).unwrap();
    assert!(store.import_data("{}").is_err());

    assert_eq!(*seen.borrow(), vec![1]);
}

#[test]
fn test_from_config_persists_to_sqlite_file() {
    let dir = TempDir::new().unwrap();
    let config = KnowledgeConfig {
        db_path: dir.path().join("nested").join("knowledge.db"),
        ..KnowledgeConfig::default()
    };

    {
        let mut store = KnowledgeStore::from_config(&config, Arc::new(test_catalog())).unwrap();
        store.record_answer("perro", Direction::Reverse, Quality::ThirdTry, Mode::Junior);

        let mut lessons = LessonProgressStore::from_config(&config).unwrap();
        lessons.record_lesson_result("animals-1", 8, 10, Mode::Junior);
    }

    let store = KnowledgeStore::from_config(&config, Arc::new(test_catalog())).unwrap();
    assert_eq!(store.get_word_score("perro", Direction::Reverse, Mode::Junior), 12.0);

    let lessons = LessonProgressStore::from_config(&config).unwrap();
    assert_eq!(lessons.completed_lessons(Mode::Junior), vec!["animals-1".to_string()]);
}

#[test]
fn test_reset_clears_persisted_document() {
    let kv = MemoryKeyValueStore::new();
    let mut store = KnowledgeStore::open(
        DocumentStorage::new(kv.clone(), "slot"),
        Arc::new(test_catalog()),
    );
    store.record_answer("gato", Direction::Forward, Quality::FirstTry, Mode::Primary);
    store.reset();

    let raw = kv.get("slot").unwrap().unwrap();
    let saved: KnowledgeData = serde_json::from_str(&raw).unwrap();
    assert!(saved.words.is_empty());
    assert!(saved.game_history.is_empty());
}
