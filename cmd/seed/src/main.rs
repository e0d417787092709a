//! # seed
//!
//! Fills a PostgreSQL database with a demo account and a handful of ads so
//! the API has something to show. Safe to re-run: an existing demo account is
//! reused and sample ads are only created while the ads table is empty.

use std::sync::Arc;

use anyhow::Context;
use auth_adapters::{Argon2Hasher, JwtAuthProvider};
use configs::Settings;
use domains::{
    AdFilter, AdInput, AdRepository, AppError, Credentials, PageRequest, UserRepository,
};
use secrecy::ExposeSecret;
use services::{AccountService, AdService};
use storage_adapters::PgStore;
use tracing_subscriber::EnvFilter;

const DEMO_USERNAME: &str = "demo";
const DEMO_PASSWORD: &str = "demo-password";

struct SampleAd {
    title: &'static str,
    description: &'static str,
    category: &'static str,
    condition: &'static str,
}

const SAMPLE_ADS: &[SampleAd] = &[
    SampleAd {
        title: "Горный велосипед",
        description: "26 дюймов, 21 скорость, после сезона",
        category: "Спорт",
        condition: "used",
    },
    SampleAd {
        title: "Acoustic guitar",
        description: "Full size, comes with a soft case",
        category: "Music",
        condition: "used",
    },
    SampleAd {
        title: "Настольная лампа",
        description: "Новая, в упаковке",
        category: "Дом",
        condition: "new",
    },
    SampleAd {
        title: "Board game bundle",
        description: "Three classic games, all pieces present",
        category: "Hobby",
        condition: "used",
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = configs::load_env_file();
    let settings = Settings::load().context("loading configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&settings.log.filter))?,
        )
        .init();
    if let Err(e) = env_file {
        tracing::warn!(error = %e, "ignoring unreadable .env file");
    }

    let url = settings
        .database
        .url
        .as_ref()
        .context("database.url is required to seed")?;
    let store = Arc::new(
        PgStore::connect(url.expose_secret(), settings.database.max_connections).await?,
    );
    store.migrate().await?;

    let auth = Arc::new(JwtAuthProvider::new(
        settings.auth.jwt_secret.expose_secret().as_bytes(),
        settings.auth.issuer.clone(),
        settings.auth.token_ttl(),
        Argon2Hasher::default(),
    )?);
    let accounts = AccountService::new(store.clone(), auth);
    let ads = AdService::new(store.clone());

    let credentials = Credentials {
        username: Some(DEMO_USERNAME.to_owned()),
        password: Some(DEMO_PASSWORD.to_owned()),
    };
    let owner = match accounts.register(credentials).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "created demo account");
            user.id
        }
        Err(AppError::Conflict(_)) => {
            let record = store
                .find_by_username(DEMO_USERNAME)
                .await?
                .context("demo account vanished")?;
            tracing::info!(user_id = %record.user.id, "reusing demo account");
            record.user.id
        }
        Err(e) => return Err(e.into()),
    };

    let existing =
        AdRepository::list(store.as_ref(), &AdFilter::default(), PageRequest::first(1)).await?;
    if existing.total > 0 {
        tracing::info!(ads = existing.total, "ads already present, nothing to seed");
        return Ok(());
    }

    for sample in SAMPLE_ADS {
        let ad = ads
            .create(
                owner,
                AdInput {
                    title: Some(sample.title.to_owned()),
                    description: Some(sample.description.to_owned()),
                    image_url: None,
                    category: Some(sample.category.to_owned()),
                    condition: Some(sample.condition.to_owned()),
                },
            )
            .await?;
        tracing::info!(ad_id = %ad.id, title = %ad.title, "seeded ad");
    }

    tracing::info!(
        username = DEMO_USERNAME,
        password = DEMO_PASSWORD,
        "seeding complete"
    );
    Ok(())
}
