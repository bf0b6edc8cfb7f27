use std::collections::BTreeSet;

use super::Application;
use crate::KeyValue;

/// Inverted index: each word maps to the inputs it appears in.
///
/// Output values look like `2 a.txt,b.txt`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Indexer;

impl Application for Indexer {
    fn map(&self, filename: &str, contents: &str) -> Vec<KeyValue> {
        let words: BTreeSet<&str> = contents
            .split(|c: char| !c.is_alphabetic())
            .filter(|w| !w.is_empty())
            .collect();
        words
            .into_iter()
            .map(|w| KeyValue::new(w, filename))
            .collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        let docs: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        let docs: Vec<&str> = docs.into_iter().collect();
        format!("{} {}", docs.len(), docs.join(","))
    }
}
