//! Application state wiring stores, grammar and chat sessions together.
//!
//! AppState holds the concrete instances used by both CLI and REST API,
//! pinning the core repository traits to the SQLite implementations.

use std::path::PathBuf;
use std::sync::Arc;

use blocktask_core::chat::ChatSession;
use blocktask_core::editor::EditSession;
use blocktask_core::event::EventBus;
use blocktask_core::grammar::BlockTypeRegistry;
use blocktask_core::library::LibraryCatalog;
use blocktask_core::repository::load_catalog;
use blocktask_infra::config::database_url;
use blocktask_infra::sqlite::library::SqliteLibraryRepository;
use blocktask_infra::sqlite::pool::DatabasePool;
use blocktask_infra::sqlite::task::SqliteTaskStore;
use blocktask_types::config::GlobalConfig;
use blocktask_types::error::RepositoryError;
use dashmap::DashMap;
use uuid::Uuid;

/// A conversation in progress, plus the name its task will be saved under.
#[derive(Debug)]
pub struct PendingChat {
    pub session: ChatSession,
    pub task_name: String,
}

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<SqliteTaskStore>,
    pub library: Arc<SqliteLibraryRepository>,
    pub registry: Arc<BlockTypeRegistry>,
    pub config: Arc<GlobalConfig>,
    /// Graph change notifications from every edit session.
    pub events: EventBus,
    pub chats: Arc<DashMap<Uuid, PendingChat>>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the task database inside `data_dir` and wire everything up.
    pub async fn init(data_dir: PathBuf, config: GlobalConfig) -> anyhow::Result<Self> {
        let pool = DatabasePool::new(&database_url(&data_dir)).await?;
        Ok(Self::from_pool(pool, data_dir, config))
    }

    pub fn from_pool(pool: DatabasePool, data_dir: PathBuf, config: GlobalConfig) -> Self {
        Self {
            tasks: Arc::new(SqliteTaskStore::new(pool.clone())),
            library: Arc::new(SqliteLibraryRepository::new(pool)),
            registry: Arc::new(BlockTypeRegistry::standard()),
            config: Arc::new(config),
            events: EventBus::default(),
            chats: Arc::new(DashMap::new()),
            data_dir,
        }
    }

    /// A fresh, empty edit session sharing this state's grammar and bus.
    pub fn edit_session(&self) -> EditSession {
        EditSession::new(self.registry.clone(), self.config.layout, self.events.clone())
    }

    pub async fn catalog(&self) -> Result<LibraryCatalog, RepositoryError> {
        load_catalog(self.library.as_ref()).await
    }
}
