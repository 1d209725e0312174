// Reject a broken default_settings.toml at build time instead of on the
// first settings() call at runtime.

const POLICY_KEYS: &[(&str, &str, &[&str])] = &[
    ("segment", "dictionary_buffer", &["split", "join"]),
    ("dictionary", "duplicate_policy", &["overwrite", "accumulate"]),
    ("dictionary", "user_word_policy", &["overwrite", "accumulate"]),
];

fn main() {
    let path = "src/default_settings.toml";
    println!("cargo:rerun-if-changed={path}");
    check_settings(path, include_str!("src/default_settings.toml"));
}

fn check_settings(path: &str, content: &str) {
    let doc: toml::Table = match content.parse() {
        Ok(doc) => doc,
        Err(e) => panic!("{path} contains invalid TOML: {e}"),
    };
    for table in ["segment", "dictionary", "cache"] {
        if !doc.get(table).is_some_and(toml::Value::is_table) {
            panic!("{path} is missing the [{table}] table");
        }
    }
    for (table, key, allowed) in POLICY_KEYS {
        let value = doc[*table].get(*key).and_then(toml::Value::as_str);
        match value {
            Some(v) if allowed.contains(&v) => {}
            _ => panic!("{path}: {table}.{key} must be one of {allowed:?}"),
        }
    }
}
