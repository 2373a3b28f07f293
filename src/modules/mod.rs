use self::database::get_postgres_pool;
use crate::config::app::ApplicationSettings;
use crate::config::environment::Environment;
use crate::config::get_config;
use crate::config::store::{LotterySettings, StoreSettings};
use crate::store::memory::MemoryStore;
use crate::store::postgres::PgStore;
use crate::store::timed::TimedStore;
use crate::store::Store;
use crate::utils::events::EventRegistry;
use crate::utils::invitations::InvitationManager;
use crate::utils::lottery::ticker::LotteryTicker;
use crate::utils::lottery::LotteryEngine;
use crate::utils::notifications::{NotificationFanout, PushChannel, TracingChannel};
use crate::utils::users::UserDirectory;
use crate::utils::waitlist::WaitlistManager;
use axum::extract::FromRef;
use core::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

pub mod database;
pub mod extractors;

pub struct Modules {
    pub app: ApplicationSettings,
    pub lottery: LotterySettings,
    services: Services,
    backend: &'static str,
    environment: Environment,
}

impl Modules {
    pub async fn load_from_settings() -> anyhow::Result<Self> {
        let settings = get_config()?;
        info!("Settings loaded");
        info!("Loading modules");

        let (store, backend): (Store, &'static str) = match &settings.postgres {
            Some(postgres) => {
                let pool = get_postgres_pool(postgres).await?;
                (Arc::new(PgStore::new(pool).await?), "postgres")
            }
            None => {
                warn!("Running on the in-memory store, nothing will be persisted!");
                (Arc::new(MemoryStore::new()), "memory")
            }
        };
        let store: Store = Arc::new(TimedStore::new(store, settings.store.timeout));
        let services = Services::new(
            store,
            Arc::new(TracingChannel),
            settings.store.conflict_retries,
        );
        info!("Modules loaded");

        Ok(Self {
            app: settings.app,
            lottery: settings.lottery,
            services,
            backend,
            environment: settings.environment,
        })
    }

    pub fn use_custom(
        store: Store,
        channel: Arc<dyn PushChannel>,
        addr: SocketAddr,
        store_settings: StoreSettings,
        environment: Environment,
    ) -> Self {
        let store: Store = Arc::new(TimedStore::new(store, store_settings.timeout));
        Self {
            app: ApplicationSettings::new(addr, format!("http://{addr}")),
            lottery: LotterySettings::default(),
            services: Services::new(store, channel, store_settings.conflict_retries),
            backend: "custom",
            environment,
        }
    }

    pub fn state(&self) -> AppState {
        AppState::new(self)
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn ticker(&self) -> LotteryTicker {
        LotteryTicker::new(self.services.lottery.clone(), self.lottery.tick)
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }
}

/// Every core service, sharing one store handle.
#[derive(Clone)]
pub struct Services {
    pub store: Store,
    pub users: UserDirectory,
    pub events: EventRegistry,
    pub waitlist: WaitlistManager,
    pub invitations: InvitationManager,
    pub lottery: LotteryEngine,
    pub notifications: NotificationFanout,
}

impl Services {
    pub fn new(store: Store, channel: Arc<dyn PushChannel>, retries: u32) -> Self {
        let notifications = NotificationFanout::new(store.clone(), channel);
        Self {
            users: UserDirectory::new(store.clone()),
            events: EventRegistry::new(store.clone(), retries),
            waitlist: WaitlistManager::new(store.clone(), retries),
            invitations: InvitationManager::new(store.clone(), retries),
            lottery: LotteryEngine::new(store.clone(), notifications.clone(), retries),
            notifications,
            store,
        }
    }
}

#[derive(Clone, FromRef)]
pub struct AppState {
    pub environment: Environment,
    pub services: Services,
    backend: &'static str,
}

impl AppState {
    fn new(modules: &Modules) -> Self {
        Self {
            environment: modules.environment,
            services: modules.services.clone(),
            backend: modules.backend,
        }
    }
}

impl Display for AppState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} store", self.backend)
    }
}
