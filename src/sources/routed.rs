//! Split one harvest across two sources by record kind.

use async_trait::async_trait;
use serde_json::Value;

use crate::models::RecordKind;
use crate::sources::{Fetcher, SourceError};

/// Sends `meta` requests to one fetcher and citations/references to another
#[derive(Debug)]
pub struct RoutedFetcher {
    metadata: Box<dyn Fetcher>,
    relations: Box<dyn Fetcher>,
    id: String,
    name: String,
}

impl RoutedFetcher {
    pub fn new(metadata: Box<dyn Fetcher>, relations: Box<dyn Fetcher>) -> Self {
        let id = format!("{}+{}", metadata.id(), relations.id());
        let name = format!("{} + {}", metadata.name(), relations.name());
        Self {
            metadata,
            relations,
            id,
            name,
        }
    }

    fn route(&self, kind: RecordKind) -> &dyn Fetcher {
        match kind {
            RecordKind::Meta => self.metadata.as_ref(),
            RecordKind::Citations | RecordKind::References => self.relations.as_ref(),
        }
    }
}

#[async_trait]
impl Fetcher for RoutedFetcher {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, doi: &str, kind: RecordKind) -> Result<Value, SourceError> {
        self.route(kind).fetch(doi, kind).await
    }
}
