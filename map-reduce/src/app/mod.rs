//! User transforms run by workers.

use std::sync::Arc;

use crate::{Error, KeyValue, Result};

pub mod grep;
pub mod indexer;
pub mod wc;

/// A map/reduce pair.
///
/// Both functions must be deterministic and free of side effects: a task may
/// run more than once when a slow worker is leased around.
pub trait Application: Send + Sync {
    fn map(&self, filename: &str, contents: &str) -> Vec<KeyValue>;

    fn reduce(&self, key: &str, values: &[String]) -> String;
}

/// Look up a bundled application by name. `pattern` is only used by `grep`.
pub fn named(name: &str, pattern: Option<&str>) -> Result<Arc<dyn Application>> {
    match name {
        "wc" => Ok(Arc::new(wc::WordCount)),
        "indexer" => Ok(Arc::new(indexer::Indexer)),
        "grep" => Ok(Arc::new(match pattern {
            Some(p) => grep::Grep::new(p),
            None => grep::Grep::default(),
        })),
        _ => Err(Error::Config(format!("unknown application {:?}", name))),
    }
}
