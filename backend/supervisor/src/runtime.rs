//! One generation of the live bot: a connected transport, the command
//! executor bound to it, and the task routing inbound messages into it.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use chatbridge_commands::{register_builtin_handlers, CommandExecutor};
use chatbridge_completion::CompletionBridge;
use chatbridge_config::BridgeConfig;
use chatbridge_core::{BotIdentity, BridgeError, ChatTransport, InboundMessage};
use chatbridge_routing::MessageRouter;

use crate::error::RestartError;
use crate::factory::ServiceFactory;

const INBOUND_BUFFER: usize = 256;

pub struct RuntimeState {
    config: Arc<BridgeConfig>,
    transport: Arc<dyn ChatTransport>,
    executor: Arc<CommandExecutor>,
    identity: BotIdentity,
    pump: JoinHandle<()>,
}

impl RuntimeState {
    /// Build fresh services from `config`, connect, and start routing.
    ///
    /// Nothing is left running if the connect fails.
    pub async fn start(
        config: Arc<BridgeConfig>,
        factory: &dyn ServiceFactory,
    ) -> Result<Self, RestartError> {
        let transport = factory.transport(&config);
        let bridge = Arc::new(CompletionBridge::new(
            Arc::clone(&config),
            factory.completion(&config),
        ));

        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        let identity = transport.connect(&config.credential, tx).await?;
        info!(
            transport = transport.name(),
            bot = %identity.name,
            "Connected as {}",
            identity.name
        );

        let mut executor = CommandExecutor::new(Arc::clone(&transport));
        register_builtin_handlers(&mut executor, bridge, config.command_prefix);
        let executor = Arc::new(executor);

        let router = MessageRouter::new(config.command_prefix, identity.clone());
        let pump = tokio::spawn(route_inbound(rx, router, Arc::clone(&executor)));

        Ok(Self {
            config,
            transport,
            executor,
            identity,
            pump,
        })
    }

    /// Disconnect the transport and wait for the routing task to finish.
    ///
    /// Commands already dispatched keep running; their replies fail once
    /// the transport is down.
    pub async fn stop(self) -> Result<(), BridgeError> {
        let result = self.transport.disconnect().await;
        self.pump.abort();
        let _ = self.pump.await;
        info!(transport = self.transport.name(), "Transport stopped");
        result
    }

    pub fn config(&self) -> &Arc<BridgeConfig> {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn ChatTransport> {
        &self.transport
    }

    pub fn executor(&self) -> &Arc<CommandExecutor> {
        &self.executor
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }
}

async fn route_inbound(
    mut rx: mpsc::Receiver<InboundMessage>,
    router: MessageRouter,
    executor: Arc<CommandExecutor>,
) {
    while let Some(message) = rx.recv().await {
        let Some(invocation) = router.route(&message) else {
            continue;
        };
        let executor = Arc::clone(&executor);
        tokio::spawn(async move {
            // Failures are logged and answered by the executor itself.
            if let Err(e) = executor.execute(&invocation).await {
                debug!(invocation = %invocation.id, "Command ended with error: {}", e);
            }
        });
    }
    debug!("Inbound channel closed");
}
