use spamdex::tokenizer::tokenize;

#[test]
fn it_normalizes_and_stems() {
    let words = tokenize("Running Runners RUN! The café's menu.");
    assert!(words.contains(&"run".to_string()));
    assert!(words.iter().any(|w| w.starts_with("caf")));
    // NFKC folds the full-width letters before matching
    assert_eq!(tokenize("ＦＲＥＥ"), vec!["free"]);
}

#[test]
fn it_filters_stopwords() {
    let words = tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert_eq!(words.len(), 5);
}

#[test]
fn it_yields_nothing_for_punctuation() {
    assert!(tokenize("!!! ... 123").is_empty());
}
