//! Server registry service.
//!
//! The only writer of the `servers` table. Every change invalidates the
//! per-id lookup cache and the snapshot [`MetadataCache`], so no response can
//! mix data computed against a removed or re-pointed server.

use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::cache::MetadataCache;
use crate::database::models::{ServerInput, UpstreamServer};
use crate::database::repositories::ServerRepository;
use crate::{Error, Result};

/// Which servers an inbound query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerSelection {
    #[default]
    All,
    Only(i64),
}

impl FromStr for ServerSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<i64>()
            .map(Self::Only)
            .map_err(|_| Error::validation(format!("invalid server filter '{s}'")))
    }
}

pub struct ServerRegistry {
    repository: Arc<dyn ServerRepository>,
    lookup: DashMap<i64, UpstreamServer>,
    metadata_cache: MetadataCache,
}

impl ServerRegistry {
    pub fn new(repository: Arc<dyn ServerRepository>, metadata_cache: MetadataCache) -> Self {
        Self {
            repository,
            lookup: DashMap::new(),
            metadata_cache,
        }
    }

    pub async fn list_servers(&self) -> Result<Vec<UpstreamServer>> {
        self.repository.list_servers().await
    }

    /// Cached lookup by id; hits avoid the database entirely.
    pub async fn get_server(&self, id: i64) -> Result<Option<UpstreamServer>> {
        if let Some(server) = self.lookup.get(&id) {
            return Ok(Some(server.clone()));
        }
        let server = self.repository.get_server(id).await?;
        if let Some(server) = &server {
            self.lookup.insert(id, server.clone());
        }
        Ok(server)
    }

    /// Resolve a selection to the servers a query fans out to.
    ///
    /// `Only(id)` for an unknown id is `NotFound`; `All` may be empty.
    pub async fn select(&self, selection: ServerSelection) -> Result<Vec<UpstreamServer>> {
        match selection {
            ServerSelection::All => self.list_servers().await,
            ServerSelection::Only(id) => self
                .get_server(id)
                .await?
                .map(|server| vec![server])
                .ok_or_else(|| Error::not_found("Server", id.to_string())),
        }
    }

    pub async fn create_server(&self, input: ServerInput) -> Result<UpstreamServer> {
        let input = input.validated()?;
        let server = self.repository.create_server(&input).await?;
        info!(server_id = server.id, name = %server.name, "Server registered");
        self.invalidate();
        Ok(server)
    }

    pub async fn update_server(&self, id: i64, input: ServerInput) -> Result<UpstreamServer> {
        let input = input.validated()?;
        let server = self.repository.update_server(id, &input).await?;
        info!(server_id = id, name = %server.name, "Server updated");
        self.invalidate();
        Ok(server)
    }

    pub async fn delete_server(&self, id: i64) -> Result<()> {
        self.repository.delete_server(id).await?;
        info!(server_id = id, "Server removed");
        self.invalidate();
        Ok(())
    }

    fn invalidate(&self) {
        self.lookup.clear();
        self.metadata_cache.clear();
    }
}
