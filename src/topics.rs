//! Supported lecture topics and the partition registry that maps each one
//! to its vector-store collection.

use crate::config::Settings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A supported subject domain, plus the sentinel `None` meaning the query
/// falls outside every supported track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    NodeJs,
    Python,
    None,
}

impl Topic {
    /// Supported (non-sentinel) topics, in registration order. The order
    /// matters: it is the documented tie-break for ambiguous queries.
    pub fn supported() -> [Self; 2] {
        [Self::NodeJs, Self::Python]
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NodeJs => "NodeJS",
            Self::Python => "Python",
            Self::None => "none",
        }
    }
}

/// Association of a topic with its retrievable collection. Connection
/// parameters (endpoint, credentials) live on the shared vector-store
/// client; the partition only names the collection to search.
#[derive(Debug, Clone)]
pub struct Partition {
    pub topic: Topic,
    pub collection: String,
}

/// Read-only Topic -> Partition map, built once at startup from
/// configuration and shared across all invocations.
#[derive(Debug, Clone)]
pub struct TopicRegistry {
    partitions: HashMap<Topic, Partition>,
}

impl TopicRegistry {
    pub fn from_settings(settings: &Settings) -> Self {
        let mut partitions = HashMap::new();
        partitions.insert(
            Topic::NodeJs,
            Partition {
                topic: Topic::NodeJs,
                collection: settings.nodejs_collection.clone(),
            },
        );
        partitions.insert(
            Topic::Python,
            Partition {
                topic: Topic::Python,
                collection: settings.python_collection.clone(),
            },
        );
        Self { partitions }
    }

    /// Registry with explicit partitions. Tests use this to model a
    /// deployment where a topic was left unregistered.
    pub fn with_partitions(partitions: Vec<Partition>) -> Self {
        Self {
            partitions: partitions.into_iter().map(|p| (p.topic, p)).collect(),
        }
    }

    /// The partition registered for a topic. `None` for the sentinel and
    /// for topics a broken deployment forgot to register.
    pub fn partition_for(&self, topic: Topic) -> Option<&Partition> {
        if topic.is_sentinel() {
            return None;
        }
        self.partitions.get(&topic)
    }
}
