use clap::{Parser, ValueEnum};
use proxchat::prelude::*;
use proxchat::telemetry;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Game {
    /// No game attached; only the relay hub moves people around.
    None,
    /// An Impostor server running the event hub plugin.
    Impostor,
}

/// Joins a proximity voice room and prints every change to its state.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay hub WebSocket URL
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    hub: String,

    /// Display name; must match the in-game name
    #[arg(short, long)]
    name: String,

    /// Game code of the room to join
    #[arg(short, long)]
    game_code: String,

    /// Which game backend drives groups and poses
    #[arg(long, value_enum, default_value = "none")]
    game: Game,

    /// Impostor server host
    #[arg(long, default_value = "127.0.0.1")]
    impostor_ip: String,

    /// Impostor event hub port (plugin default when omitted)
    #[arg(long)]
    impostor_port: Option<u16>,

    /// Movement coalescing interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_MOVE_THROTTLE_MS)]
    throttle: u64,
}

impl Args {
    fn backend_model(&self) -> BackendModel {
        let backend = match self.game {
            Game::None => BackendParams::NoOp,
            Game::Impostor => BackendParams::Impostor(ImpostorParams {
                ip: self.impostor_ip.clone(),
                port: self.impostor_port,
                throttle_ms: self.throttle,
            }),
        };
        BackendModel::new(self.game_code.clone(), backend)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn describe(note: &RoomNotification) -> String {
    match note {
        RoomNotification::PoseChanged { uuid, pose, local } => {
            let who = if *local { "me".to_string() } else { uuid.to_string() };
            format!("{who} moved to ({:.2}, {:.2})", pose.x, pose.y)
        }
        RoomNotification::GroupChanged { uuid, group, local } => {
            let who = if *local { "me".to_string() } else { uuid.to_string() };
            format!("{who} is now {group}")
        }
        RoomNotification::MembershipChanged { peers } => format!("{peers} peer(s) in room"),
        RoomNotification::MapChanged(map) => format!("map changed to {map}"),
        RoomNotification::MetadataChanged(meta) => format!("{meta:?}"),
        RoomNotification::Reset => "room state reset".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();
    let args = Args::parse();
    let model = args.backend_model();

    let mut client = RelayClient::builder(&args.hub)
        .name(&args.name)
        .backend_model(model.clone())
        .connect()
        .await?;

    if model.backend_type() != BackendType::NoOp {
        let status = client.attach_backend(&model).await;
        if status != BackendStatus::Connected {
            tracing::warn!(%status, "game backend unavailable, following the relay hub only");
        }
    }

    let mut changes = client.store().subscribe();
    tokio::spawn(async move {
        while let Ok(note) = changes.recv().await {
            println!("{}", describe(&note));
        }
    });

    client
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impostor_args_build_impostor_model() {
        let args = Args::parse_from([
            "relay-monitor",
            "--name",
            "red",
            "--game-code",
            "ABCDEF",
            "--game",
            "impostor",
            "--impostor-ip",
            "10.0.0.2",
        ]);
        let model = args.backend_model();
        assert_eq!(model.game_code, "ABCDEF");
        let BackendParams::Impostor(params) = model.backend else {
            panic!("expected impostor params");
        };
        assert_eq!(params.ip, "10.0.0.2");
        assert_eq!(params.port, None);
        assert_eq!(params.throttle_ms, 50);
    }

    #[test]
    fn test_default_game_is_noop() {
        let args = Args::parse_from(["relay-monitor", "-n", "red", "-g", "ABCDEF"]);
        assert_eq!(args.backend_model().backend_type(), BackendType::NoOp);
    }

    #[test]
    fn test_describe_local_pose() {
        let note = RoomNotification::PoseChanged {
            uuid: ClientId::new("u1"),
            pose: Pose::new(1.0, 2.5),
            local: true,
        };
        assert_eq!(describe(&note), "me moved to (1.00, 2.50)");
    }
}
