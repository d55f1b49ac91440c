//! Replay a recorded dispatch stream through the state engine
//!
//! Run with:
//! ```bash
//! cargo run -p relay-state --bin relay-replay -- session.ndjson
//! ```
//!
//! Each input line is a `{"t": ..., "d": ...}` record. Without a file the
//! records are read from stdin. Configuration is loaded from environment
//! variables.

use async_trait::async_trait;
use relay_common::{try_init_tracing, AppConfig};
use relay_core::Snowflake;
use relay_state::{
    ClientEvent, GatewayCommands, GatewayRecord, MemberRequest, OutboundError, StateEngine,
};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

/// Command sink that only logs what the engine would send
struct LoggingCommands;

#[async_trait]
impl GatewayCommands for LoggingCommands {
    async fn request_members(&self, request: MemberRequest) -> Result<(), OutboundError> {
        info!(
            guild_id = %request.guild_id,
            nonce = %request.nonce,
            limit = request.limit,
            "REQUEST_GUILD_MEMBERS"
        );
        Ok(())
    }

    async fn request_guild(&self, guild_id: Snowflake) -> Result<(), OutboundError> {
        info!(guild_id = %guild_id, "REQUEST_GUILD");
        Ok(())
    }

    async fn subscribe_guild(&self, guild_id: Snowflake, max_online: u32) -> Result<(), OutboundError> {
        info!(guild_id = %guild_id, max_online, "GUILD_SUBSCRIPTIONS");
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Replay failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        env = ?config.app.env,
        max_messages = config.state.message_capacity(),
        "Configuration loaded"
    );

    let engine = StateEngine::new(config, Arc::new(LoggingCommands));
    let mut events = engine.subscribe();

    let replayed = match std::env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "Replaying file");
            let file = tokio::fs::File::open(&path).await?;
            replay(&engine, &mut events, BufReader::new(file)).await?
        }
        None => {
            info!("Replaying stdin");
            replay(&engine, &mut events, BufReader::new(tokio::io::stdin())).await?
        }
    };

    let store = engine.store();
    info!(
        records = replayed,
        phase = %engine.phase(),
        guilds = store.guild_count(),
        users = store.user_count(),
        messages = store.message_count(),
        "Replay finished"
    );
    Ok(())
}

/// Log the semantic events emitted so far
fn log_events(events: &mut broadcast::Receiver<ClientEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => info!(event = event.name(), "Client event"),
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "Event log lagged"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

/// Feed every line to the engine; returns how many records were applied
async fn replay<R>(
    engine: &StateEngine,
    events: &mut broadcast::Receiver<ClientEvent>,
    reader: R,
) -> Result<usize, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<GatewayRecord>(&line) {
            Ok(record) => {
                // Handler errors are logged by the dispatcher
                let _ = engine.dispatch(record);
                count += 1;
            }
            Err(e) => debug!(error = %e, "Skipping undecodable line"),
        }
        log_events(events);
        // Let spawned hydration work make progress between records
        tokio::task::yield_now().await;
    }
    log_events(events);
    Ok(count)
}
