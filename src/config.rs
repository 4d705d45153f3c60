//! Construction-time choice of publisher backend.
//!
//! Call sites receive a `Box<dyn Publisher>` from [`PublisherConfig::build`]
//! and never learn which backend sits behind it.

use crate::error::{Error, Result};
use crate::publisher::{FakePublisher, Publisher, StreamPublisher};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

/// Which publisher implementation to construct
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backend {
    /// Record messages in memory with [`FakePublisher`]
    #[default]
    Memory,
    /// Append JSON lines to a file with [`StreamPublisher`]
    JsonLines { path: PathBuf },
}

/// Configuration for creating a publisher
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PublisherConfig {
    #[serde(default)]
    pub backend: Backend,
}

impl PublisherConfig {
    /// Parse a config from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Construct the configured publisher
    pub fn build(&self) -> Result<Box<dyn Publisher>> {
        info!("Building publisher with config: {:?}", self);

        match &self.backend {
            Backend::Memory => Ok(Box::new(FakePublisher::new())),
            Backend::JsonLines { path } => {
                if path.as_os_str().is_empty() {
                    return Err(Error::InvalidConfig("JSON lines path cannot be empty".into()));
                }
                let file = File::create(path)?;
                Ok(Box::new(StreamPublisher::new(BufWriter::new(file))))
            }
        }
    }
}
