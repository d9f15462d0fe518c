use async_trait::async_trait;
use serenity::gateway::ShardManager;
use serenity::http::Http;
use serenity::model::channel::{Message as DiscordMessage, MessageType};
use serenity::model::gateway::Ready;
use serenity::model::id::ChannelId;
use serenity::prelude::*;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use chatbridge_core::{
    Author, BotIdentity, BridgeError, ChannelKind, ChannelRef, ChatTransport, InboundMessage,
    SenderKind,
};

/// Discord rejects messages longer than this many characters.
const MAX_MESSAGE_CHARS: usize = 2000;

const NAME: &str = "discord";

/// How long `connect` waits for the gateway to report ready.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

type InboundSlot = Arc<Mutex<Option<mpsc::Sender<InboundMessage>>>>;

struct Handler {
    inbound: InboundSlot,
    ready: Mutex<Option<oneshot::Sender<()>>>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: DiscordMessage) {
        // Cleared by `disconnect`; nothing is forwarded after that.
        let Some(tx) = self.inbound.lock().ok().and_then(|slot| slot.clone()) else {
            return;
        };

        let channel = match msg.guild_id {
            Some(guild_id) => ChannelRef {
                id: msg.channel_id.to_string(),
                kind: ChannelKind::Guild,
                guild: Some(guild_id.name(&ctx.cache).unwrap_or_else(|| guild_id.to_string())),
            },
            None => ChannelRef::direct(msg.channel_id.to_string()),
        };

        let inbound = InboundMessage {
            id: msg.id.to_string(),
            content: msg.content.clone(),
            author: Author {
                id: msg.author.id.to_string(),
                name: msg.author.name.clone(),
                kind: classify_sender(
                    msg.author.bot,
                    msg.author.system,
                    msg.webhook_id.is_some(),
                    matches!(msg.kind, MessageType::Regular | MessageType::InlineReply),
                ),
            },
            channel,
        };

        if let Err(e) = tx.send(inbound).await {
            debug!("Dropping Discord message; router is gone: {}", e);
        }
    }

    async fn ready(&self, _: Context, ready: Ready) {
        info!("Connected as -> [{}] :)", ready.user.name);
        // Only the first ready completes `connect`; later ones are resumes.
        if let Some(tx) = self.ready.lock().ok().and_then(|mut slot| slot.take()) {
            let _ = tx.send(());
        }
    }
}

/// Map Discord author flags onto a [`SenderKind`].
fn classify_sender(is_bot: bool, is_system: bool, is_webhook: bool, is_regular: bool) -> SenderKind {
    if is_system || !is_regular {
        SenderKind::System
    } else if is_webhook {
        SenderKind::Webhook
    } else if is_bot {
        SenderKind::Bot
    } else {
        SenderKind::User
    }
}

/// Wait until the gateway reports ready, the client task exits, or `timeout`
/// elapses. Only the first case is a successful connect.
async fn await_gateway_ready<E: Display>(
    ready: oneshot::Receiver<()>,
    task: &mut JoinHandle<Result<(), E>>,
    timeout: Duration,
) -> Result<(), BridgeError> {
    tokio::select! {
        signal = ready => signal
            .map_err(|_| BridgeError::transport(NAME, "gateway closed before ready")),
        outcome = task => Err(match outcome {
            Ok(Ok(())) => BridgeError::transport(NAME, "gateway stopped before ready"),
            Ok(Err(e)) => BridgeError::transport(NAME, format!("gateway failed: {e}")),
            Err(e) => BridgeError::transport(NAME, format!("gateway task failed: {e}")),
        }),
        _ = tokio::time::sleep(timeout) => {
            Err(BridgeError::transport(NAME, "timed out waiting for gateway ready"))
        }
    }
}

/// Split `text` into chunks Discord will accept.
fn split_message(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(MAX_MESSAGE_CHARS)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

struct Session {
    http: Arc<Http>,
    shard_manager: Arc<ShardManager>,
    task: JoinHandle<Result<(), serenity::Error>>,
}

/// Discord gateway connection built on serenity.
pub struct DiscordTransport {
    inbound: InboundSlot,
    session: Mutex<Option<Session>>,
}

impl DiscordTransport {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(None)),
            session: Mutex::new(None),
        }
    }

    fn http(&self) -> Result<Arc<Http>, BridgeError> {
        self.session
            .lock()
            .ok()
            .and_then(|s| s.as_ref().map(|s| Arc::clone(&s.http)))
            .ok_or_else(|| BridgeError::transport(NAME, "not connected"))
    }
}

impl Default for DiscordTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for DiscordTransport {
    fn name(&self) -> &str {
        NAME
    }

    async fn connect(
        &self,
        credential: &str,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> Result<BotIdentity, BridgeError> {
        info!("Starting Discord transport");

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let (ready_tx, ready_rx) = oneshot::channel();
        let mut client = Client::builder(credential, intents)
            .event_handler(Handler {
                inbound: Arc::clone(&self.inbound),
                ready: Mutex::new(Some(ready_tx)),
            })
            .await
            .map_err(|e| BridgeError::transport(NAME, format!("client build failed: {e}")))?;

        let user = client
            .http
            .get_current_user()
            .await
            .map_err(|e| BridgeError::transport(NAME, format!("login failed: {e}")))?;
        let identity = BotIdentity {
            user_id: user.id.to_string(),
            name: user.name.clone(),
        };

        if let Ok(mut slot) = self.inbound.lock() {
            *slot = Some(inbound_tx);
        }

        let http = Arc::clone(&client.http);
        let shard_manager = Arc::clone(&client.shard_manager);
        let mut task = tokio::spawn(async move {
            let result = client.start().await;
            if let Err(why) = &result {
                error!("Discord client error: {:?}", why);
            }
            result
        });

        if let Err(e) = await_gateway_ready(ready_rx, &mut task, READY_TIMEOUT).await {
            if let Ok(mut slot) = self.inbound.lock() {
                *slot = None;
            }
            shard_manager.shutdown_all().await;
            task.abort();
            return Err(e);
        }

        if let Ok(mut session) = self.session.lock() {
            *session = Some(Session {
                http,
                shard_manager,
                task,
            });
        }

        info!(user = %identity.name, id = %identity.user_id, "Discord transport logged in");
        Ok(identity)
    }

    async fn disconnect(&self) -> Result<(), BridgeError> {
        if let Ok(mut slot) = self.inbound.lock() {
            *slot = None;
        }
        let session = self.session.lock().ok().and_then(|mut s| s.take());
        let Some(session) = session else {
            debug!("Discord transport already disconnected");
            return Ok(());
        };

        session.shard_manager.shutdown_all().await;
        match session.task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Discord client stopped with error: {}", e),
            Err(e) => warn!("Discord client task ended abnormally: {}", e),
        }
        info!("Discord transport disconnected");
        Ok(())
    }

    async fn send(&self, channel: &ChannelRef, text: &str) -> Result<(), BridgeError> {
        let http = self.http()?;
        let channel_id: u64 = channel
            .id
            .parse()
            .map_err(|_| BridgeError::transport(NAME, format!("invalid channel id {}", channel.id)))?;

        for chunk in split_message(text) {
            ChannelId::new(channel_id)
                .say(&http, chunk)
                .await
                .map_err(|e| BridgeError::transport(NAME, format!("send failed: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_senders() {
        assert_eq!(classify_sender(false, false, false, true), SenderKind::User);
        assert_eq!(classify_sender(true, false, false, true), SenderKind::Bot);
        assert_eq!(classify_sender(false, false, true, true), SenderKind::Webhook);
        assert_eq!(classify_sender(false, true, false, true), SenderKind::System);
        assert_eq!(classify_sender(false, false, false, false), SenderKind::System);
    }

    #[test]
    fn short_message_is_one_chunk() {
        assert_eq!(split_message("Ahoy!\nMatey"), vec!["Ahoy!\nMatey".to_string()]);
    }

    #[test]
    fn long_message_is_split_under_limit() {
        let text = "a".repeat(4500);
        let chunks = split_message(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_MESSAGE_CHARS));
        assert_eq!(chunks.concat(), text);
    }

    #[tokio::test]
    async fn send_before_connect_is_transport_error() {
        let transport = DiscordTransport::new();
        let err = transport
            .send(&ChannelRef::direct("1"), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Transport { .. }));
    }

    fn pending_task() -> JoinHandle<Result<(), String>> {
        tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
    }

    #[tokio::test]
    async fn ready_signal_completes_connect() {
        let (tx, rx) = oneshot::channel();
        let mut task = pending_task();
        tx.send(()).unwrap();
        assert!(await_gateway_ready(rx, &mut task, Duration::from_secs(5)).await.is_ok());
        task.abort();
    }

    #[tokio::test]
    async fn gateway_error_before_ready_fails_connect() {
        let (_tx, rx) = oneshot::channel::<()>();
        let mut task: JoinHandle<Result<(), String>> =
            tokio::spawn(async { Err("Disallowed gateway intents were provided".to_string()) });
        let err = await_gateway_ready(rx, &mut task, Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            BridgeError::Transport { message, .. } => {
                assert!(message.contains("Disallowed gateway intents"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn client_exit_before_ready_fails_connect() {
        let (_tx, rx) = oneshot::channel::<()>();
        let mut task: JoinHandle<Result<(), String>> = tokio::spawn(async { Ok(()) });
        let err = await_gateway_ready(rx, &mut task, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Transport { .. }));
    }

    #[tokio::test]
    async fn missing_ready_times_out() {
        let (_tx, rx) = oneshot::channel::<()>();
        let mut task = pending_task();
        let err = await_gateway_ready(rx, &mut task, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        task.abort();
    }

    #[tokio::test]
    async fn disconnect_without_session_is_ok() {
        assert!(DiscordTransport::new().disconnect().await.is_ok());
    }
}
