//! Unix socket server for admin commands.
//!
//! Provides a local IPC interface for diagnostics: simulating joins and
//! leaves, inspecting the spiral cursor, injecting preparation failures
//! and wiping assignment data.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use homestead_core::{JoinOutcome, ParticipantId};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::node::NodeState;

/// Admin command sent over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Run the join flow for a synthetic participant
    SimulateJoin { name: String },
    /// Disconnect a synthetic participant
    Leave { name: String },
    /// Wipe every assignment and reset the cursor
    ResetData,
    /// Make terrain preparation requests fail (or succeed again)
    FailPreparation { enabled: bool },
    /// Report the spiral cursor and counts
    Status,
    /// Ping (health check)
    Ping,
}

/// Response from admin command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    Ok {
        message: String,
    },
    Error {
        error: String,
    },
    Status {
        cursor: u64,
        assignments: usize,
        pending: usize,
        tick: u64,
    },
    Pong,
}

/// Admin socket server.
pub struct AdminSocket {
    state: Arc<Mutex<NodeState>>,
    socket_path: PathBuf,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(state: Arc<Mutex<NodeState>>, socket_path: &Path) -> Self {
        Self {
            state,
            socket_path: socket_path.to_path_buf(),
        }
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        // Remove a stale socket left by a previous run
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, state).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

async fn handle_connection(stream: UnixStream, state: Arc<Mutex<NodeState>>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<AdminCommand>(&line) {
            Ok(cmd) => {
                let mut state = state.lock().await;
                execute_command(cmd, &mut state)
            }
            Err(e) => AdminResponse::Error {
                error: format!("Invalid command: {}", e),
            },
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

/// Apply one admin command to the node state.
pub fn execute_command(cmd: AdminCommand, state: &mut NodeState) -> AdminResponse {
    match cmd {
        AdminCommand::SimulateJoin { name } => {
            let id = ParticipantId::from_name(&name);
            state.world.connect(id);
            let now = state.tick;

            let message = match state.coordinator.on_join(&mut state.world, id, now) {
                JoinOutcome::Allocated(alloc) => {
                    let mut message = format!(
                        "Allocated {} index {} at {} (skipped {})",
                        name, alloc.index, alloc.home, alloc.skipped
                    );
                    if alloc.exhausted {
                        message.push_str(", search exhausted");
                    }
                    message
                }
                JoinOutcome::Resumed { home } => format!("Resumed {} waiting at {}", name, home),
                JoinOutcome::AlreadyHomed { home } => format!("{} already homed at {}", name, home),
                JoinOutcome::AlreadyPending => format!("{} is already pending", name),
            };
            tracing::info!("Simulated join: {}", message);
            AdminResponse::Ok { message }
        }

        AdminCommand::Leave { name } => {
            let id = ParticipantId::from_name(&name);
            let was_pending = state.coordinator.on_leave(&mut state.world, id);
            state.world.disconnect(id);
            AdminResponse::Ok {
                message: if was_pending {
                    format!("{} left while pending", name)
                } else {
                    format!("{} left", name)
                },
            }
        }

        AdminCommand::ResetData => {
            // Waiting participants lose their slot and allocate afresh on next join
            let released = state.coordinator.reset_all_data(&mut state.world);

            match state.save_if_dirty() {
                Ok(_) => AdminResponse::Ok {
                    message: format!(
                        "Assignment data reset, cursor at 0 ({} pending released)",
                        released.len()
                    ),
                },
                Err(e) => AdminResponse::Error {
                    error: format!("Reset applied but save failed: {}", e),
                },
            }
        }

        AdminCommand::FailPreparation { enabled } => {
            state.world.set_fail_preparation(enabled);
            tracing::warn!(enabled, "Preparation failure injection toggled");
            AdminResponse::Ok {
                message: if enabled {
                    "Preparation requests will fail".to_string()
                } else {
                    "Preparation requests restored".to_string()
                },
            }
        }

        AdminCommand::Status => AdminResponse::Status {
            cursor: state.coordinator.current_cursor().value(),
            assignments: state.coordinator.store().len(),
            pending: state.coordinator.tracker().len(),
            tick: state.tick.value(),
        },

        AdminCommand::Ping => AdminResponse::Pong,
    }
}

/// Default socket path.
pub fn default_socket_path() -> PathBuf {
    let data_dir =
        std::env::var("HOMESTEAD_DATA_DIR").unwrap_or_else(|_| "./homestead-data".to_string());
    PathBuf::from(data_dir).join("admin.sock")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeConfig;
    use crate::world::WorldSettings;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

    fn open_state() -> (TempDir, NodeState) {
        let dir = tempdir().unwrap();
        let config = NodeConfig {
            data_dir: dir.path().to_path_buf(),
            admin_socket: dir.path().join("admin.sock"),
            world: WorldSettings {
                excluded_percent: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let state = NodeState::open(&config).unwrap();
        (dir, state)
    }

    fn status(state: &mut NodeState) -> (u64, usize, usize) {
        match execute_command(AdminCommand::Status, state) {
            AdminResponse::Status {
                cursor,
                assignments,
                pending,
                ..
            } => (cursor, assignments, pending),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    fn ok_message(response: &AdminResponse) -> &str {
        match response {
            AdminResponse::Ok { message } => message,
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn command_wire_format() {
        let cmd: AdminCommand =
            serde_json::from_str(r#"{"cmd":"simulate_join","name":"bot"}"#).unwrap();
        assert_eq!(cmd, AdminCommand::SimulateJoin { name: "bot".into() });

        let json = serde_json::to_string(&AdminResponse::Pong).unwrap();
        assert_eq!(json, r#"{"status":"pong"}"#);
    }

    #[test]
    fn simulate_join_allocates_then_short_circuits() {
        let (_dir, mut state) = open_state();

        let first = execute_command(AdminCommand::SimulateJoin { name: "bot".into() }, &mut state);
        assert!(ok_message(&first).starts_with("Allocated bot index 0"));

        let again = execute_command(AdminCommand::SimulateJoin { name: "bot".into() }, &mut state);
        assert_eq!(
            again,
            AdminResponse::Ok {
                message: "bot is already pending".into()
            }
        );
        assert_eq!(status(&mut state), (1, 1, 1));
    }

    #[test]
    fn leave_then_rejoin_resumes() {
        let (_dir, mut state) = open_state();
        execute_command(AdminCommand::SimulateJoin { name: "bot".into() }, &mut state);

        let left = execute_command(AdminCommand::Leave { name: "bot".into() }, &mut state);
        assert_eq!(
            left,
            AdminResponse::Ok {
                message: "bot left while pending".into()
            }
        );
        assert_eq!(status(&mut state), (1, 1, 0));

        let back = execute_command(AdminCommand::SimulateJoin { name: "bot".into() }, &mut state);
        assert!(ok_message(&back).starts_with("Resumed bot"));
        assert_eq!(status(&mut state), (1, 1, 1));
    }

    #[test]
    fn reset_data_clears_store_and_saves() {
        let (dir, mut state) = open_state();
        for name in ["a", "b"] {
            execute_command(AdminCommand::SimulateJoin { name: name.into() }, &mut state);
        }

        let response = execute_command(AdminCommand::ResetData, &mut state);
        assert_eq!(
            response,
            AdminResponse::Ok {
                message: "Assignment data reset, cursor at 0 (2 pending released)".into()
            }
        );
        assert_eq!(status(&mut state), (0, 0, 0));

        let on_disk = homestead_core::StoreFile::in_dir(dir.path()).load();
        assert!(on_disk.is_empty());
        assert_eq!(on_disk.cursor().value(), 0);
    }

    #[test]
    fn joins_after_reset_get_distinct_homes() {
        let (_dir, mut state) = open_state();
        for name in ["a", "b"] {
            execute_command(AdminCommand::SimulateJoin { name: name.into() }, &mut state);
        }
        execute_command(AdminCommand::ResetData, &mut state);

        let b = execute_command(AdminCommand::SimulateJoin { name: "b".into() }, &mut state);
        assert!(ok_message(&b).starts_with("Allocated b index 0"));
        let a = execute_command(AdminCommand::SimulateJoin { name: "a".into() }, &mut state);
        assert!(ok_message(&a).starts_with("Allocated a index 1"));
        assert_eq!(status(&mut state), (2, 2, 2));
    }

    #[test]
    fn failed_preparation_keeps_participant_pending() {
        let (_dir, mut state) = open_state();
        let on = execute_command(AdminCommand::FailPreparation { enabled: true }, &mut state);
        assert!(matches!(on, AdminResponse::Ok { .. }));

        let join = execute_command(AdminCommand::SimulateJoin { name: "bot".into() }, &mut state);
        assert!(ok_message(&join).starts_with("Allocated bot index 0"));
        assert_eq!(status(&mut state), (1, 1, 1));

        let cmd: AdminCommand =
            serde_json::from_str(r#"{"cmd":"fail_preparation","enabled":false}"#).unwrap();
        assert_eq!(cmd, AdminCommand::FailPreparation { enabled: false });
        execute_command(cmd, &mut state);
        let bot = ParticipantId::from_name("bot");
        assert!(state.coordinator.tracker().is_pending(bot));
    }

    #[test]
    fn ping_pongs() {
        let (_dir, mut state) = open_state();
        assert_eq!(execute_command(AdminCommand::Ping, &mut state), AdminResponse::Pong);
    }

    #[tokio::test]
    async fn socket_round_trip() {
        let (dir, state) = open_state();
        let socket_path = dir.path().join("admin.sock");
        let server = AdminSocket::new(Arc::new(Mutex::new(state)), &socket_path);
        tokio::spawn(async move {
            let _ = server.run().await;
        });

        let mut stream = None;
        for _ in 0..50 {
            if let Ok(s) = UnixStream::connect(&socket_path).await {
                stream = Some(s);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let stream = stream.expect("admin socket did not come up");
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        writer.write_all(b"{\"cmd\":\"ping\"}\n").await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(serde_json::from_str::<AdminResponse>(&line).unwrap(), AdminResponse::Pong);

        writer.write_all(b"{\"cmd\":\"fly\"}\n").await.unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert!(matches!(
            serde_json::from_str::<AdminResponse>(&line).unwrap(),
            AdminResponse::Error { .. }
        ));
    }

    #[test]
    fn status_through_shared_state() {
        let (_dir, state) = open_state();
        let shared = Arc::new(Mutex::new(state));

        let response = tokio_test::block_on(async {
            let mut state = shared.lock().await;
            execute_command(AdminCommand::Status, &mut state)
        });

        assert_eq!(
            response,
            AdminResponse::Status {
                cursor: 0,
                assignments: 0,
                pending: 0,
                tick: 0
            }
        );
    }
}
