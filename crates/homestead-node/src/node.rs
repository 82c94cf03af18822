//! Homestead Node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process owning one coordinator, one simulated world and
//!   one store file behind a single mutex
//! - Tick loop driving readiness polling at the configured tick rate
//! - Periodic autosave plus a final save on shutdown
//! - Unix admin socket for local diagnostics (homestead-admin CLI)

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use homestead_core::{HomesteadConfig, JoinCoordinator, Resolution, StoreFile, Tick};
use tokio::sync::Mutex;

use crate::admin_socket::AdminSocket;
use crate::error::{Error, Result};
use crate::world::{SimulatedWorld, WorldSettings};

/// Configuration for a homestead node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory holding the store record
    pub data_dir: PathBuf,

    /// Admin socket path (for homestead-admin CLI)
    pub admin_socket: PathBuf,

    /// Seconds between autosaves of a dirty store
    pub autosave_interval: Duration,

    /// Simulated world knobs
    pub world: WorldSettings,

    /// Allocation and readiness settings
    pub homestead: HomesteadConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("./homestead-data");
        Self {
            admin_socket: data_dir.join("admin.sock"),
            data_dir,
            autosave_interval: Duration::from_secs(60),
            world: WorldSettings::default(),
            homestead: HomesteadConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("HOMESTEAD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let admin_socket = lookup("HOMESTEAD_ADMIN_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("admin.sock"));

        let autosave_secs = parse_or(
            &lookup,
            "HOMESTEAD_AUTOSAVE_SECS",
            defaults.autosave_interval.as_secs(),
        )?;
        if autosave_secs == 0 {
            return Err(Error::InvalidInput("HOMESTEAD_AUTOSAVE_SECS must be at least 1".into()));
        }

        let world_defaults = defaults.world;
        let excluded_percent = parse_or(
            &lookup,
            "HOMESTEAD_WORLD_EXCLUDED_PERCENT",
            world_defaults.excluded_percent,
        )?;
        if excluded_percent > 100 {
            return Err(Error::InvalidInput(
                "HOMESTEAD_WORLD_EXCLUDED_PERCENT must be between 0 and 100".into(),
            ));
        }
        let world = WorldSettings {
            seed: parse_or(&lookup, "HOMESTEAD_WORLD_SEED", world_defaults.seed)?,
            excluded_percent,
            preparation_delay_ticks: parse_or(
                &lookup,
                "HOMESTEAD_WORLD_PREP_DELAY_TICKS",
                world_defaults.preparation_delay_ticks,
            )?,
            ..world_defaults
        };

        let homestead = HomesteadConfig::from_lookup(&lookup)?;

        Ok(Self {
            data_dir,
            admin_socket,
            autosave_interval: Duration::from_secs(autosave_secs),
            world,
            homestead,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("{key}: cannot parse {raw:?}"))),
        None => Ok(default),
    }
}

/// Everything behind the node's single lock.
pub struct NodeState {
    pub coordinator: JoinCoordinator,
    pub world: SimulatedWorld,
    pub store_file: StoreFile,
    pub tick: Tick,
}

impl NodeState {
    /// Load the store from `data_dir` and align the world spawn.
    pub fn open(config: &NodeConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let store_file = StoreFile::in_dir(&config.data_dir);
        let store = store_file.load();
        let mut coordinator = JoinCoordinator::new(config.homestead.clone(), store)?;

        let mut world = SimulatedWorld::new(config.world.clone());
        coordinator.on_server_starting(&mut world);

        Ok(Self {
            coordinator,
            world,
            store_file,
            tick: Tick::default(),
        })
    }

    /// Advance one host tick and drive readiness polling.
    pub fn advance_tick(&mut self) -> Vec<Resolution> {
        self.tick = Tick(self.tick.value().saturating_add(1));
        self.world.set_tick(self.tick);
        self.coordinator.on_tick(&mut self.world, self.tick)
    }

    /// Flush the store if it has unsaved changes. Returns whether it wrote.
    pub fn save_if_dirty(&mut self) -> Result<bool> {
        Ok(self.store_file.save_if_dirty(self.coordinator.store_mut())?)
    }
}

/// A homestead node instance.
pub struct HomesteadNode {
    state: Arc<Mutex<NodeState>>,
    config: NodeConfig,
}

impl HomesteadNode {
    /// Create a new node.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let state = Arc::new(Mutex::new(NodeState::open(&config)?));
        Ok(Self { state, config })
    }

    /// Get the shared state (for the admin socket).
    pub fn state(&self) -> Arc<Mutex<NodeState>> {
        Arc::clone(&self.state)
    }

    /// Run the node until ctrl-c (tick loop, autosave, admin socket).
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run the node until `shutdown` completes, then flush the store.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let ticks_per_second = self.config.homestead.ticks_per_second;
        tracing::info!("Homestead node starting");
        tracing::info!("  Admin: {:?}", self.config.admin_socket);
        tracing::info!("  Data: {:?}", self.config.data_dir);
        tracing::info!("  Tick rate: {}/s", ticks_per_second);

        let admin_socket = AdminSocket::new(self.state(), &self.config.admin_socket);
        tokio::spawn(async move {
            if let Err(e) = admin_socket.run().await {
                tracing::error!("Admin socket error: {}", e);
            }
        });

        let mut ticker = tokio::time::interval(self.config.homestead.tick_period());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut autosave = tokio::time::interval(self.config.autosave_interval);
        // First tick of an interval fires immediately
        autosave.tick().await;

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let resolved = self.state.lock().await.advance_tick();
                    for resolution in resolved {
                        tracing::debug!(
                            participant = %resolution.participant(),
                            ?resolution,
                            "Participant resolved"
                        );
                    }
                }
                _ = autosave.tick() => {
                    if let Err(e) = self.state.lock().await.save_if_dirty() {
                        tracing::error!("Autosave failed: {}", e);
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutting down");
                    break;
                }
            }
        }

        self.state.lock().await.save_if_dirty()?;
        let _ = std::fs::remove_file(&self.config.admin_socket);
        Ok(())
    }
}
