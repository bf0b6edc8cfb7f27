use std::path::PathBuf;

use crate::TaskKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot reach coordinator at {addr}: {source}")]
    Connect {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("rpc to coordinator failed: {0}")]
    Rpc(#[from] tarpc::client::RpcError),

    #[error("unexpected task kind from coordinator: {0}")]
    Protocol(TaskKind),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("task execution panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
