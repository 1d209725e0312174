use std::fs::{self, File};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use proptest::prelude::*;

use super::*;
use crate::registry::ResourceRegistry;
use crate::FenciError;

const DICT: &str = "\
我 100
来到 50
来 40
到 60
北京 80
北 10
京 10
清华 30
清华大学 20
华大 5
清 5
华 10
大学 60
大 50
学 40
是 100
一门 10
一 80
门 20
新型 15
新 30
型 10
的 200
计算机 20
计算 30
机 10
算 5
学科 10
科 10
机器 30
器 5
学习 50
习 5
天 500
天天 1
据 20
报道 30
前 40
执行 20
董事 10
";

const MODEL: &str = r#"{
    "trans": {
        "B": {"E": 6, "M": 4},
        "E": {"B": 5, "S": 5},
        "M": {"E": 7, "M": 3},
        "S": {"B": 5, "S": 5}
    },
    "emit": {
        "B": {"赛": 10},
        "E": {"博": 10},
        "S": {"的": 10}
    }
}"#;

fn config() -> TokenizerConfig {
    TokenizerConfig::new(DictionarySource::inline("test", DICT))
        .cache(false)
        .hmm(true)
        .buffer_policy(BufferPolicy::SplitDictionaryWords)
}

fn tokenizer() -> Tokenizer {
    Tokenizer::new(config())
}

#[test]
fn test_lazy_initialization() {
    let t = tokenizer();
    assert!(!t.is_initialized());
    assert_eq!(
        t.lcut("我来到北京清华大学").unwrap(),
        vec!["我", "来到", "北京", "清华大学"]
    );
    assert!(t.is_initialized());
}

#[test]
fn test_add_word_makes_word_a_token() {
    let t = tokenizer();
    let text = "机器学习是一门新型的计算机学科";
    let before = t.lcut(text).unwrap();
    assert_eq!(
        before,
        vec!["机器", "学习", "是", "一门", "新型", "的", "计算机", "学科"]
    );

    let total = t.dictionary().unwrap().total();
    let count = t.add_word("机器学习", None).unwrap();
    assert!(count >= 1);
    assert_eq!(t.dictionary().unwrap().total(), total + count);

    let after = t.lcut(text).unwrap();
    assert_eq!(after[0], "机器学习");
    assert_eq!(after.concat(), text);
}

#[test]
fn test_add_word_explicit_frequency_accumulates() {
    let t = Tokenizer::new(config().user_word_policy(DuplicatePolicy::Accumulate));
    assert_eq!(t.add_word("北京", Some(5)).unwrap(), 85);
    assert_eq!(t.add_word("赛博", Some(3)).unwrap(), 3);
    assert_eq!(t.dictionary().unwrap().get("赛博"), 3);
}

#[test]
fn test_repeated_dictionary_lines_accumulate_by_default() {
    let dict = DictionarySource::inline("repeated", "北京 3\n北京 4\n大学 1\n");
    let t = Tokenizer::new(TokenizerConfig::new(dict).cache(false));
    assert_eq!(t.config().duplicate_policy, DuplicatePolicy::Accumulate);
    let table = t.dictionary().unwrap();
    assert_eq!(table.get("北京"), 7);
    assert_eq!(table.total(), 8);
}

#[test]
fn test_add_empty_word_is_rejected() {
    let t = tokenizer();
    assert!(matches!(
        t.add_word("", None),
        Err(FenciError::Dict(DictError::EmptyWord))
    ));
}

#[test]
fn test_token_stream_keeps_its_snapshot() {
    let t = tokenizer();
    let text = "机器学习";
    let tokens = t.cut(text).unwrap();
    t.add_word("机器学习", None).unwrap();
    assert_eq!(tokens.collect::<Vec<_>>(), vec!["机器", "学习"]);
    assert_eq!(t.lcut(text).unwrap(), vec!["机器学习"]);
}

#[test]
fn test_script_splitting() {
    let t = tokenizer();
    assert_eq!(
        t.lcut("据 CNBC 报道").unwrap(),
        vec!["据", " ", "CNBC", " ", "报道"]
    );
    assert_eq!(
        t.lcut("Google    前").unwrap(),
        vec!["Google", "    ", "前"]
    );
}

#[test]
fn test_model_source_and_update() {
    let t = Tokenizer::new(config().model(ModelSource::inline("test", MODEL)));
    assert_eq!(
        t.lcut("我来到赛博北京").unwrap(),
        vec!["我", "来到", "赛博", "北京"]
    );

    let counts: HmmCounts = serde_json::from_str(
        r#"{"trans": {"B": {"E": 1}, "E": {"S": 1}, "M": {"E": 1}, "S": {"S": 1}},
            "emit": {"S": {"赛": 50, "博": 50}}}"#,
    )
    .unwrap();
    t.update_model(counts, ModelUpdate::Replace).unwrap();
    assert_eq!(
        t.lcut("我来到赛博北京").unwrap(),
        vec!["我", "来到", "赛", "博", "北京"]
    );
}

#[test]
fn test_invalid_model_is_reported() {
    let t = Tokenizer::new(config().model(ModelSource::inline("bad", r#"{"trans": {}}"#)));
    assert!(matches!(t.lcut("北京"), Err(FenciError::Model(_))));
    assert!(!t.is_initialized());
}

#[test]
fn test_learn_from_segmented() {
    let t = tokenizer();
    assert_eq!(t.learn_from_segmented("天天 向上\n天天").unwrap(), 3);
    let dict = t.dictionary().unwrap();
    assert_eq!(dict.get("天天"), 3);
    assert_eq!(dict.get("向上"), 1);
}

#[test]
fn test_load_user_dict() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user.txt");
    fs::write(&path, "机器学习\n赛博 5 n\n\n").unwrap();

    let t = tokenizer();
    assert_eq!(t.load_user_dict(&path).unwrap(), 2);
    assert_eq!(t.lcut("机器学习").unwrap(), vec!["机器学习"]);
    assert_eq!(t.lcut("我来到赛博北京").unwrap(), vec!["我", "来到", "赛博", "北京"]);
}

#[test]
fn test_bad_user_dict_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user.txt");
    fs::write(&path, "机器学习 3\n  7\n").unwrap();

    let t = tokenizer();
    let total = t.dictionary().unwrap().total();
    assert!(t.load_user_dict(&path).is_err());
    assert_eq!(t.dictionary().unwrap().total(), total);
    assert_eq!(t.dictionary().unwrap().get("机器学习"), 0);
}

#[test]
fn test_malformed_dictionary() {
    let t = Tokenizer::new(
        TokenizerConfig::new(DictionarySource::inline("bad", "北京 3\n大学\n")).cache(false),
    );
    assert!(matches!(
        t.lcut("北京"),
        Err(FenciError::Dict(DictError::MalformedEntry { line: 2, .. }))
    ));
}

#[test]
fn test_missing_dictionary_then_retry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dict.txt");
    let t = Tokenizer::new(
        TokenizerConfig::new(DictionarySource::file(&path))
            .cache_dir(dir.path().join("cache"))
            .cache(true),
    );
    assert!(matches!(t.lcut("北京"), Err(FenciError::Io(_))));

    fs::write(&path, DICT).unwrap();
    assert_eq!(t.lcut("北京").unwrap(), vec!["北京"]);
}

#[test]
fn test_cut_bytes() {
    let t = tokenizer();
    // "北京" in GBK
    assert_eq!(t.cut_bytes(&[0xB1, 0xB1, 0xBE, 0xA9]).unwrap(), vec!["北京"]);
    assert_eq!(t.cut_bytes("清华大学".as_bytes()).unwrap(), vec!["清华大学"]);
}

#[test]
fn test_decode_failure_before_loading() {
    let t = tokenizer();
    assert!(matches!(
        t.cut_bytes(&[0xFF, 0xFF]),
        Err(FenciError::Decode(_))
    ));
    assert!(!t.is_initialized());
}

#[test]
fn test_shared_registry() {
    let registry = Arc::new(ResourceRegistry::new());
    let a = Tokenizer::with_registry(config(), Arc::clone(&registry));
    let b = Tokenizer::with_registry(config(), Arc::clone(&registry));
    assert!(Arc::ptr_eq(&a.dictionary().unwrap(), &b.dictionary().unwrap()));

    a.add_word("机器学习", None).unwrap();
    assert_eq!(a.lcut("机器学习").unwrap(), vec!["机器学习"]);
    assert_eq!(b.lcut("机器学习").unwrap(), vec!["机器", "学习"]);
}

#[test]
fn test_cache_is_written_and_reused() {
    let dir = tempfile::tempdir().unwrap();
    let dict_path = dir.path().join("dict.txt");
    fs::write(&dict_path, DICT).unwrap();
    let config = TokenizerConfig::new(DictionarySource::file(&dict_path))
        .cache_dir(dir.path().join("cache"))
        .cache(true)
        .hmm(true);

    let first = Tokenizer::new(config.clone());
    let expected = first.lcut("我来到北京清华大学").unwrap();

    let store = config.cache_store();
    let key = config.resource_key();
    let snapshot = store.read(&key).unwrap().expect("cache written");
    assert_eq!(snapshot.dict.total(), first.dictionary().unwrap().total());

    let second = Tokenizer::new(config);
    assert_eq!(second.lcut("我来到北京清华大学").unwrap(), expected);
}

#[test]
fn test_corrupt_cache_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let dict_path = dir.path().join("dict.txt");
    fs::write(&dict_path, DICT).unwrap();
    let config = TokenizerConfig::new(DictionarySource::file(&dict_path))
        .cache_dir(dir.path().join("cache"))
        .cache(true);

    Tokenizer::new(config.clone()).initialize().unwrap();
    let cache_path = config.cache_store().path_for(&config.resource_key());
    fs::write(&cache_path, b"FNCS\x01 definitely not a snapshot").unwrap();

    let t = Tokenizer::new(config.clone());
    assert_eq!(t.lcut("北京").unwrap(), vec!["北京"]);
    assert!(config
        .cache_store()
        .read(&config.resource_key())
        .unwrap()
        .is_some());
}

#[test]
fn test_stale_cache_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let dict_path = dir.path().join("dict.txt");
    fs::write(&dict_path, DICT).unwrap();
    let config = TokenizerConfig::new(DictionarySource::file(&dict_path))
        .cache_dir(dir.path().join("cache"))
        .cache(true);
    Tokenizer::new(config.clone()).initialize().unwrap();

    fs::write(&dict_path, "北京 3\n新词 9\n").unwrap();
    File::options()
        .write(true)
        .open(&dict_path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();

    let t = Tokenizer::new(config);
    assert_eq!(t.dictionary().unwrap().total(), 12);
}

#[test]
fn test_concurrent_cut_matches_sequential() {
    let t = Arc::new(Tokenizer::new(config().model(ModelSource::inline("test", MODEL))));
    let inputs = [
        "我来到北京清华大学",
        "机器学习是一门新型的计算机学科。",
        "据 CNBC 报道，Google    前 CEO、Alphabet 前执行董事 Eric Schmidt",
        "我来到赛博北京，天天向上 3.5% 的人",
        "",
    ];
    let expected: Vec<Vec<String>> = inputs
        .iter()
        .map(|s| t.lcut(s).unwrap().into_iter().map(String::from).collect())
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let t = Arc::clone(&t);
            thread::spawn(move || {
                let mut results = Vec::new();
                for _ in 0..50 {
                    let round: Vec<Vec<String>> = inputs
                        .iter()
                        .map(|s| t.lcut(s).unwrap().into_iter().map(String::from).collect())
                        .collect();
                    results.push(round);
                }
                results
            })
        })
        .collect();

    for handle in handles {
        for round in handle.join().unwrap() {
            assert_eq!(round, expected);
        }
    }
}

#[test]
fn test_concurrent_first_use() {
    let t = Arc::new(tokenizer());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let t = Arc::clone(&t);
            thread::spawn(move || t.dictionary().unwrap())
        })
        .collect();
    let dicts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(dicts.iter().all(|d| Arc::ptr_eq(d, &dicts[0])));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_cut_bytes_matches_lcut(text in "[我来到北京清华大学天赛博 a-zA-Z0-9，。.%\n]{0,30}") {
        let t = tokenizer();
        let tokens = t.lcut(&text).unwrap();
        prop_assert_eq!(tokens.concat(), text.clone());
        prop_assert!(tokens.iter().all(|tok| !tok.is_empty()));
        let from_bytes = t.cut_bytes(text.as_bytes()).unwrap();
        prop_assert_eq!(from_bytes, tokens.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }
}
