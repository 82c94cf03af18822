//! Node-level scenarios: simulated world, admin commands and restarts.

use homestead_core::Resolution;
use homestead_node::admin_socket::execute_command;
use homestead_node::{AdminCommand, AdminResponse, NodeConfig, NodeState, WorldSettings};
use tempfile::tempdir;

fn config(dir: &std::path::Path, excluded_percent: u8) -> NodeConfig {
    NodeConfig {
        data_dir: dir.to_path_buf(),
        admin_socket: dir.join("admin.sock"),
        world: WorldSettings {
            seed: 7,
            excluded_percent,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn join(state: &mut NodeState, name: &str) -> AdminResponse {
    execute_command(AdminCommand::SimulateJoin { name: name.into() }, state)
}

fn run_until_settled(state: &mut NodeState, max_ticks: u64) -> Vec<Resolution> {
    let mut resolved = Vec::new();
    for _ in 0..max_ticks {
        resolved.extend(state.advance_tick());
        if state.coordinator.tracker().is_empty() {
            break;
        }
    }
    resolved
}

#[test]
fn simulated_joins_land_on_dry_ground() {
    let dir = tempdir().unwrap();
    let mut state = NodeState::open(&config(dir.path(), 40)).unwrap();

    for name in ["n1", "n2", "n3", "n4", "n5"] {
        assert!(matches!(join(&mut state, name), AdminResponse::Ok { .. }));
    }
    let resolved = run_until_settled(&mut state, 1_000);

    assert_eq!(resolved.len(), 5);
    for resolution in resolved {
        let Resolution::Homed { home, .. } = resolution else {
            panic!("unexpected resolution {:?}", resolution);
        };
        let column = home.column();
        assert!(!homestead_core::TerrainClassifier::is_excluded_terrain(&state.world, column));
        assert_eq!(home.y, state.world.surface_height(column) + 1);
    }
}

#[test]
fn restart_keeps_cursor_and_homes() {
    let dir = tempdir().unwrap();
    let config = config(dir.path(), 0);

    let cursor = {
        let mut state = NodeState::open(&config).unwrap();
        join(&mut state, "left");
        join(&mut state, "right");
        run_until_settled(&mut state, 1_000);
        state.save_if_dirty().unwrap();
        state.coordinator.current_cursor()
    };

    let mut state = NodeState::open(&config).unwrap();
    assert_eq!(state.coordinator.current_cursor(), cursor);

    let again = join(&mut state, "left");
    assert!(matches!(
        &again,
        AdminResponse::Ok { message } if message.starts_with("left already homed")
    ));

    let status = execute_command(AdminCommand::Status, &mut state);
    assert!(matches!(
        status,
        AdminResponse::Status {
            cursor: 2,
            assignments: 2,
            pending: 0,
            ..
        }
    ));
}

#[test]
fn reset_over_admin_persists() {
    let dir = tempdir().unwrap();
    let config = config(dir.path(), 0);

    {
        let mut state = NodeState::open(&config).unwrap();
        join(&mut state, "x");
        join(&mut state, "y");
        state.save_if_dirty().unwrap();
        execute_command(AdminCommand::ResetData, &mut state);
    }

    let state = NodeState::open(&config).unwrap();
    assert_eq!(state.coordinator.current_cursor().value(), 0);
    assert!(state.coordinator.store().is_empty());
}
