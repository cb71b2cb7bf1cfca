use anyhow::{Context, Result};
use audio_room::room::RoomService;
use audio_room::{
    create_router, AppState, CaptureSourceMode, Config, JoinRequest, LoopbackHub,
    RoomController, SessionTransport, SimulatedDevices,
};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "audio-room", about = "Join real-time audio rooms")]
struct Cli {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/audio-room")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP control API over an in-process session hub
    Serve {
        /// Print an access token for ROOM:IDENTITY at startup (repeatable)
        #[arg(long = "issue", value_name = "ROOM:IDENTITY")]
        issue: Vec<String>,
    },
    /// Two participants join, mute, and leave on an in-process hub
    Demo {
        #[arg(long, default_value = "demo")]
        room: String,
        #[arg(long, default_value = "alice")]
        host: String,
        #[arg(long, default_value = "bob")]
        guest: String,
        /// Audio source for both participants: system or microphone
        #[arg(long, default_value = "system")]
        source: CaptureSourceMode,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config).context("Failed to load config")?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve { issue } => serve(cfg, issue).await,
        Command::Demo {
            room,
            host,
            guest,
            source,
        } => demo(cfg, room, host, guest, source).await,
    }
}

fn new_hub(cfg: &Config) -> LoopbackHub {
    LoopbackHub::new(cfg.room.loopback_endpoint.clone()).with_capacity(cfg.room.max_participants)
}

async fn serve(cfg: Config, issue: Vec<String>) -> Result<()> {
    let hub = new_hub(&cfg);
    for entry in &issue {
        let (room, identity) = entry
            .split_once(':')
            .with_context(|| format!("Expected ROOM:IDENTITY, got '{}'", entry))?;
        info!("Token for {} in {}: {}", identity, room, hub.issue_token(room, identity));
    }

    let controller = RoomController::new(
        Arc::new(hub.clone()),
        Arc::new(SimulatedDevices::new()),
        cfg.capture_settings(),
        cfg.room_options(),
    );
    let (room, service_task) = RoomService::spawn(controller);
    let app = create_router(AppState::new(room, hub.endpoint()));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    service_task.await.context("Room service panicked")?;
    Ok(())
}

async fn demo(
    cfg: Config,
    room: String,
    host: String,
    guest: String,
    source: CaptureSourceMode,
) -> Result<()> {
    let hub = new_hub(&cfg);
    let transport: Arc<dyn SessionTransport> = Arc::new(hub.clone());

    let new_controller = || {
        RoomController::new(
            transport.clone(),
            Arc::new(SimulatedDevices::new()),
            cfg.capture_settings(),
            cfg.room_options(),
        )
    };
    let request = |name: &str| JoinRequest {
        server_url: hub.endpoint().to_string(),
        room_name: room.clone(),
        display_name: name.to_string(),
        token: hub.issue_token(&room, name),
        source,
    };

    let mut host_room = new_controller();
    let mut guest_room = new_controller();
    let (host_request, guest_request) = (request(&host), request(&guest));

    let (host_joined, guest_joined) = futures::future::join(
        host_room.join(&host_request),
        guest_room.join(&guest_request),
    )
    .await;
    host_joined?;
    guest_joined?;

    host_room.process_pending_events();
    guest_room.process_pending_events();

    for controller in [&host_room, &guest_room] {
        let roster = controller.roster();
        info!("{}: {}", roster.summary(), roster.labels().join(", "));
    }
    info!(
        "{} hears {} remote audio track(s)",
        guest,
        guest_room.remote_audio_tracks().len()
    );

    let muted = host_room.toggle_mute().await;
    info!("{} muted: {}", host, muted);
    let muted = host_room.toggle_mute().await;
    info!("{} muted: {}", host, muted);

    guest_room.disconnect();
    host_room.process_pending_events();
    info!(
        "After {} left: {}",
        guest,
        host_room.roster().labels().join(", ")
    );

    host_room.disconnect();
    info!("Room {} now has {} participants", room, hub.participants(&room).len());
    Ok(())
}
