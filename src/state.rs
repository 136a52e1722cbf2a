use crate::classifier::{self, Classifier, MockClassifier};
use crate::config::{AppConfig, StoreKind};
use crate::db::PgStore;
use crate::entries::services::SubmissionGate;
use crate::nutrition::{ReferenceTable, Resolver};
use crate::storage::{EntryStore, FileStore, MemoryStore};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub resolver: Arc<Resolver>,
    pub classifier: Arc<dyn Classifier>,
    pub store: Arc<dyn EntryStore>,
    pub gate: Arc<SubmissionGate>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let table = Arc::new(ReferenceTable::load(config.reference_table_path.as_deref()).await?);

        let classifier = classifier::from_config(&config.classifier, table.clone())?;

        let store: Arc<dyn EntryStore> = match config.store {
            StoreKind::File => Arc::new(
                FileStore::open(&config.data_dir)
                    .await
                    .with_context(|| format!("open data dir {}", config.data_dir.display()))?,
            ),
            StoreKind::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                Arc::new(PgStore::connect(url).await?)
            }
            StoreKind::Memory => Arc::new(MemoryStore::new()),
        };
        info!(store = ?config.store, "entry store ready");

        Ok(Self::from_parts(config, Resolver::new(table), classifier, store))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        resolver: Resolver,
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn EntryStore>,
    ) -> Self {
        Self {
            config,
            resolver: Arc::new(resolver),
            classifier,
            store,
            gate: Arc::new(SubmissionGate::new()),
        }
    }

    /// In-memory state with the built-in table and a mock that always sees pizza.
    pub fn fake() -> Self {
        Self::fake_with(MockClassifier::fixed("pizza", 0.95))
    }

    pub fn fake_with(classifier: impl Classifier + 'static) -> Self {
        let config = AppConfig::from_lookup(|_| None).expect("default config ok");
        let table = ReferenceTable::builtin().expect("builtin table ok");
        Self::from_parts(
            Arc::new(config),
            Resolver::new(Arc::new(table)),
            Arc::new(classifier),
            Arc::new(MemoryStore::new()),
        )
    }
}
