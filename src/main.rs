use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cavern_server::config::ServerConfig;
use cavern_server::ecs::world::GameWorld;
use cavern_server::error::GameError;
use cavern_server::network::server::{listen, Inbound, Outlets};
use cavern_server::protocol::SessionEvent;
use cavern_server::session::SessionCoordinator;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), GameError> {
    let config = ServerConfig::from_env()?;
    let addr = config.bind_addr()?;
    info!("Data directory: {}", config.data_dir.display());

    let world = GameWorld::new(&config)?;
    info!(
        "World ready ({} templates, default level '{}')",
        world.templates.len(),
        world.default_level
    );
    let mut coordinator = SessionCoordinator::new(world);

    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<Inbound>();
    let mut network = tokio::spawn(listen(addr, inbound_tx));

    let mut outlets = Outlets::new();
    let mut ticker = interval(config.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // ── Game loop ────────────────────────────────────────────────────
    loop {
        tokio::select! {
            Some(inbound) = inbound_rx.recv() => match inbound {
                Inbound::Connected { session, tx } => outlets.register(session, tx),
                Inbound::Event(event) => {
                    let closed = match event {
                        SessionEvent::Disconnect(sid) => Some(sid),
                        _ => None,
                    };
                    outlets.dispatch(coordinator.handle(event));
                    if let Some(sid) = closed {
                        outlets.remove(sid);
                    }
                }
            },
            _ = ticker.tick() => {
                outlets.dispatch(coordinator.tick());
            }
            result = &mut network => {
                return match result {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!("Network task panicked: {}", e);
                        Ok(())
                    }
                };
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                return Ok(());
            }
        }
    }
}
