//! Picks the storage backend named in configuration and builds the services
//! on top of it.

use std::sync::Arc;

use auth_adapters::{Argon2Hasher, JwtAuthProvider};
use configs::{AuthSettings, DatabaseSettings, StorageBackend};
use domains::{AdRepository, ProposalRepository, UserRepository};
use secrecy::ExposeSecret;
use services::{AccountService, AdService, ProposalService};
use storage_adapters::InMemoryStore;

pub struct Repositories {
    pub ads: Arc<dyn AdRepository>,
    pub proposals: Arc<dyn ProposalRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    fn shared<S>(store: Arc<S>) -> Self
    where
        S: AdRepository + ProposalRepository + UserRepository + 'static,
    {
        Self {
            ads: store.clone(),
            proposals: store.clone(),
            users: store,
        }
    }
}

pub async fn repositories(settings: &DatabaseSettings) -> anyhow::Result<Repositories> {
    match settings.backend {
        StorageBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on shutdown");
            Ok(Repositories::shared(Arc::new(InMemoryStore::new())))
        }
        StorageBackend::Postgres => postgres(settings).await,
    }
}

#[cfg(feature = "db-postgres")]
async fn postgres(settings: &DatabaseSettings) -> anyhow::Result<Repositories> {
    use anyhow::Context;
    use storage_adapters::PgStore;

    let url = settings
        .url
        .as_ref()
        .context("database.url is required for the postgres backend")?;
    let store = PgStore::connect(url.expose_secret(), settings.max_connections).await?;
    store.migrate().await?;
    tracing::info!(max_connections = settings.max_connections, "connected to postgres");
    Ok(Repositories::shared(Arc::new(store)))
}

#[cfg(not(feature = "db-postgres"))]
async fn postgres(_settings: &DatabaseSettings) -> anyhow::Result<Repositories> {
    anyhow::bail!("database.backend = \"postgres\" needs a build with the db-postgres feature")
}

pub struct Services {
    pub ads: Arc<AdService>,
    pub proposals: Arc<ProposalService>,
    pub accounts: Arc<AccountService>,
}

pub fn services(repos: Repositories, auth: &AuthSettings) -> anyhow::Result<Services> {
    let provider = JwtAuthProvider::new(
        auth.jwt_secret.expose_secret().as_bytes(),
        auth.issuer.clone(),
        auth.token_ttl(),
        Argon2Hasher::default(),
    )?;
    Ok(Services {
        ads: Arc::new(AdService::new(repos.ads.clone())),
        proposals: Arc::new(ProposalService::new(repos.proposals, repos.ads)),
        accounts: Arc::new(AccountService::new(repos.users, Arc::new(provider))),
    })
}
