use super::Application;
use crate::KeyValue;

/// Counts occurrences of each whitespace separated word.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordCount;

impl Application for WordCount {
    fn map(&self, _filename: &str, contents: &str) -> Vec<KeyValue> {
        contents
            .split_whitespace()
            .map(|w| KeyValue::new(w, "1"))
            .collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        values
            .iter()
            .filter_map(|v| v.parse::<u64>().ok())
            .sum::<u64>()
            .to_string()
    }
}
