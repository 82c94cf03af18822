//! homestead-admin CLI tool
//!
//! Diagnostics for a running homestead node.
//!
//! Usage:
//!   homestead-admin simulate-join <name>
//!   homestead-admin leave <name>
//!   homestead-admin reset-data
//!   homestead-admin fail-preparation <on|off>
//!   homestead-admin status
//!   homestead-admin ping

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use homestead_node::admin_socket::default_socket_path;
use homestead_node::{AdminCommand, AdminResponse};

fn print_usage() {
    eprintln!("homestead-admin - Diagnose a running homestead node");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  homestead-admin simulate-join <name>  Join a synthetic participant");
    eprintln!("  homestead-admin leave <name>          Disconnect a synthetic participant");
    eprintln!("  homestead-admin reset-data            Wipe all assignments, cursor back to 0");
    eprintln!("  homestead-admin fail-preparation <on|off>");
    eprintln!("                                        Make terrain preparation requests fail");
    eprintln!("  homestead-admin status                Show the spiral cursor and counts");
    eprintln!("  homestead-admin ping                  Check if the node is running");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  HOMESTEAD_ADMIN_SOCKET  Path to admin socket");
    eprintln!("                          (default: ./homestead-data/admin.sock)");
}

fn get_socket_path() -> PathBuf {
    std::env::var("HOMESTEAD_ADMIN_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_socket_path())
}

fn send_command(cmd: AdminCommand) -> Result<AdminResponse, String> {
    let socket_path = get_socket_path();

    let mut stream = UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to homestead-node at {:?}: {}\n\
             Is the homestead-node running?",
            socket_path, e
        )
    })?;

    let cmd_json = serde_json::to_string(&cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&response_line).map_err(|e| format!("Invalid response: {}", e))
}

fn require_name(args: &[String], command: &str) -> String {
    match args.get(2) {
        Some(name) => name.clone(),
        None => {
            eprintln!("Error: {} requires a name argument", command);
            std::process::exit(1);
        }
    }
}

fn require_switch(args: &[String], command: &str) -> bool {
    match args.get(2).map(String::as_str) {
        Some("on") => true,
        Some("off") => false,
        _ => {
            eprintln!("Error: {} requires 'on' or 'off'", command);
            std::process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let cmd = match args[1].as_str() {
        "simulate-join" => AdminCommand::SimulateJoin {
            name: require_name(&args, "simulate-join"),
        },
        "leave" => AdminCommand::Leave {
            name: require_name(&args, "leave"),
        },
        "reset-data" => AdminCommand::ResetData,
        "fail-preparation" => AdminCommand::FailPreparation {
            enabled: require_switch(&args, "fail-preparation"),
        },
        "status" => AdminCommand::Status,
        "ping" => AdminCommand::Ping,
        "-h" | "--help" | "help" => {
            print_usage();
            std::process::exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    match send_command(cmd) {
        Ok(response) => match response {
            AdminResponse::Ok { message } => {
                println!("{}", message);
            }
            AdminResponse::Error { error } => {
                eprintln!("Error: {}", error);
                std::process::exit(1);
            }
            AdminResponse::Status {
                cursor,
                assignments,
                pending,
                tick,
            } => {
                println!("Spiral index: {}", cursor);
                println!("Assignments:  {}", assignments);
                println!("Pending:      {}", pending);
                println!("Tick:         {}", tick);
            }
            AdminResponse::Pong => {
                println!("pong - homestead-node is running");
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
