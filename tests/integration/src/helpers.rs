//! Test helpers for integration tests
//!
//! Provides a command sink that records what the engine sends, and a session
//! harness that feeds records and waits for the resulting events.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use relay_common::AppConfig;
use relay_core::Snowflake;
use relay_state::{
    ClientEvent, GatewayCommands, GatewayRecord, MemberRequest, OutboundError, SessionPhase,
    StateEngine, StateResult,
};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, Mutex};

/// Default wait for anything the engine does asynchronously
pub const WAIT: Duration = Duration::from_secs(2);

/// Outbound command as recorded by [`MockCommands`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentCommand {
    RequestMembers(MemberRequest),
    RequestGuild(Snowflake),
    Subscribe { guild_id: Snowflake, max_online: u32 },
}

/// Command sink that records every call and always succeeds
pub struct MockCommands {
    tx: mpsc::UnboundedSender<SentCommand>,
}

impl MockCommands {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SentCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn record(&self, command: SentCommand) -> Result<(), OutboundError> {
        self.tx.send(command).map_err(|_| OutboundError::Closed)
    }
}

#[async_trait]
impl GatewayCommands for MockCommands {
    async fn request_members(&self, request: MemberRequest) -> Result<(), OutboundError> {
        self.record(SentCommand::RequestMembers(request))
    }

    async fn request_guild(&self, guild_id: Snowflake) -> Result<(), OutboundError> {
        self.record(SentCommand::RequestGuild(guild_id))
    }

    async fn subscribe_guild(&self, guild_id: Snowflake, max_online: u32) -> Result<(), OutboundError> {
        self.record(SentCommand::Subscribe {
            guild_id,
            max_online,
        })
    }
}

/// Configuration with short chunk timeouts so timeouts are testable
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.chunking.ready_timeout_ms = 500;
    config.chunking.guild_timeout_ms = 500;
    config.chunking.query_timeout_ms = 500;
    config
}

/// Engine plus the receiving ends of its events and commands
pub struct TestSession {
    pub engine: Arc<StateEngine>,
    pub events: broadcast::Receiver<ClientEvent>,
    commands: Mutex<mpsc::UnboundedReceiver<SentCommand>>,
}

impl TestSession {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let (commands, rx) = MockCommands::new();
        let engine = Arc::new(StateEngine::new(config, Arc::new(commands)));
        let events = engine.subscribe();
        Self {
            engine,
            events,
            commands: Mutex::new(rx),
        }
    }

    /// Dispatch one record
    pub fn send(&self, t: &str, d: Value) -> StateResult<()> {
        self.engine.dispatch(GatewayRecord::new(t, d))
    }

    /// Dispatch READY followed by READY_SUPPLEMENTAL
    pub fn baseline(&self, ready: Value, supplemental: Value) -> StateResult<()> {
        self.send("READY", ready)?;
        self.send("READY_SUPPLEMENTAL", supplemental)
    }

    /// Next outbound command, waiting up to `timeout`
    pub async fn next_command(&self, timeout: Duration) -> Result<SentCommand> {
        let mut rx = self.commands.lock().await;
        tokio::time::timeout(timeout, rx.recv())
            .await
            .map_err(|_| anyhow!("no command sent within {timeout:?}"))?
            .ok_or_else(|| anyhow!("command channel closed"))
    }

    /// Skip commands until a member request arrives
    pub async fn next_member_request(&self) -> Result<MemberRequest> {
        loop {
            if let SentCommand::RequestMembers(request) = self.next_command(WAIT).await? {
                return Ok(request);
            }
        }
    }

    /// Every command sent so far, without waiting
    pub async fn sent_commands(&self) -> Vec<SentCommand> {
        let mut rx = self.commands.lock().await;
        let mut sent = Vec::new();
        while let Ok(command) = rx.try_recv() {
            sent.push(command);
        }
        sent
    }

    /// Wait for the next event with the given name, skipping others
    pub async fn wait_for_event(&mut self, name: &str) -> Result<ClientEvent> {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let event = tokio::time::timeout_at(deadline, self.events.recv())
                .await
                .map_err(|_| anyhow!("no {name} event within {WAIT:?}"))??;
            if event.name() == name {
                return Ok(event);
            }
        }
    }

    /// Names of the events emitted so far, without waiting
    pub fn drain_names(&mut self) -> Vec<&'static str> {
        let mut names = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            names.push(event.name());
        }
        names
    }

    /// Wait until the session reports ready
    pub async fn wait_ready(&self) -> Result<()> {
        let mut phase = self.engine.watch_phase();
        let outcome = match tokio::time::timeout(WAIT, phase.wait_for(|p| *p == SessionPhase::Ready)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(anyhow!("phase channel closed: {e}")),
            Err(_) => Err(anyhow!("session still {} after {WAIT:?}", self.engine.phase())),
        };
        outcome
    }
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for a snowflake in assertions
pub fn sf(id: i64) -> Snowflake {
    Snowflake::new(id)
}
