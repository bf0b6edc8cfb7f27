use super::Application;
use crate::KeyValue;

/// Counts, per input, the lines containing a fixed pattern.
#[derive(Debug, Clone)]
pub struct Grep {
    pattern: String,
}

impl Grep {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl Default for Grep {
    fn default() -> Self {
        Self::new("And")
    }
}

impl Application for Grep {
    fn map(&self, filename: &str, contents: &str) -> Vec<KeyValue> {
        contents
            .split('\n')
            .filter(|line| !line.is_empty() && line.contains(self.pattern.as_str()))
            .map(|_| KeyValue::new(filename, "1"))
            .collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        values.len().to_string()
    }
}
