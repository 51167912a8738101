pub mod config;
pub mod error;
pub mod locator;
pub mod models;
pub mod mutation;
pub mod operation;
pub mod row;
pub mod schema;
pub mod store;
pub mod wire;

pub use config::StoreConfig;
pub use error::{ConversationError, ConversationResult};
pub use locator::Locator;
pub use models::{Conversation, NO_POSITION};
pub use mutation::{ApplierSource, BatchMutator, CONVERSATION_APPLIER_ID, OperationApplier};
pub use operation::{Operation, OperationKind, OperationTarget, OperationValue};
pub use row::{ConversationRow, MemoryRow};
pub use schema::{ColumnValue, ConversationColumn};
pub use store::{MemoryConversationStore, PgConversationStore};
pub use wire::WireCodec;

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

/// Install the process-wide logger once. `RUST_LOG` overrides the default filter.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info,sqlx=warn")).init();
    });
}

pub mod test_support {
    use log::LevelFilter;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
    use sqlx::{ConnectOptions, PgPool};
    use testcontainers::{GenericImage, ImageExt, core::WaitFor};
    use testcontainers_modules::testcontainers::{
        ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
    };
    use thiserror::Error;
    use uuid::Uuid;

    use crate::error::ConversationError;
    use crate::store::PgConversationStore;

    #[derive(Debug, Error)]
    pub enum TestDatabaseError {
        #[error("database error: {0}")]
        Sqlx(#[from] sqlx::Error),
        #[error("store error: {0}")]
        Store(#[from] ConversationError),
        #[error("container error: {0}")]
        Container(#[from] TestcontainersError),
    }

    /// Disposable Postgres database with the conversation schema applied.
    pub struct TestDatabase {
        store: Option<PgConversationStore>,
        admin_options: PgConnectOptions,
        database_name: String,
        container: Option<ContainerAsync<GenericImage>>,
    }

    impl TestDatabase {
        /// Launch a Postgres container and create a fresh, migrated database in it.
        pub async fn new() -> Result<Self, TestDatabaseError> {
            let image = GenericImage::new("postgres", "16-alpine").with_wait_for(
                WaitFor::message_on_stderr("database system is ready to accept connections"),
            );

            let container = image
                .with_env_var("POSTGRES_DB", "postgres")
                .with_env_var("POSTGRES_USER", "postgres")
                .with_env_var("POSTGRES_PASSWORD", "postgres")
                .start()
                .await?;

            let host = container.get_host().await?.to_string();
            let port = container.get_host_port_ipv4(5432).await?;
            let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let base_options: PgConnectOptions = admin_url.parse()?;
            let base_options = base_options.log_statements(LevelFilter::Off);
            let admin_options = base_options.clone().database("postgres");

            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options.clone())
                .await?;

            let database_name = format!("conversations_{}", Uuid::new_v4().simple());
            sqlx::query(&format!(
                "CREATE DATABASE \"{}\" TEMPLATE template0",
                database_name
            ))
            .execute(&admin_pool)
            .await?;
            admin_pool.close().await;

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect_with(base_options.database(&database_name))
                .await?;

            let store = PgConversationStore::new(pool);
            store.run_migrations().await?;

            Ok(Self {
                store: Some(store),
                admin_options,
                database_name,
                container: Some(container),
            })
        }

        pub fn store(&self) -> &PgConversationStore {
            self.store.as_ref().expect("test database store is available")
        }

        pub fn pool(&self) -> &PgPool {
            self.store().pool()
        }

        pub fn pool_clone(&self) -> PgPool {
            self.pool().clone()
        }

        /// Close pool connections, drop the database and stop the container.
        pub async fn close(mut self) -> Result<(), TestDatabaseError> {
            if let Some(store) = self.store.take() {
                store.pool().close().await;
            }

            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(self.admin_options.clone())
                .await?;
            sqlx::query(&format!(
                "DROP DATABASE \"{}\" WITH (FORCE)",
                self.database_name
            ))
            .execute(&admin_pool)
            .await?;
            admin_pool.close().await;

            if let Some(container) = self.container.take() {
                drop(container);
            }

            Ok(())
        }
    }
}
