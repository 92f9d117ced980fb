use std::{fmt, sync::Arc, time::Duration};

use snafu::prelude::*;

use crate::{
    api, error,
    filter::Filter,
    subscriber::Subscriber,
    api::types::SessionStartLimit,
    ws::{CloseReason, Gateway, Identity, Intents, Payload, Presence},
    Result,
};

const RETRY_DELAY_START: u64 = 1;
const RETRY_DELAY_MAX: u64 = 60;

type BoxedFilter = Box<dyn Filter + Send + Sync>;

struct Registered {
    subscriber: Box<dyn Subscriber>,
    filter: BoxedFilter,
}

type Loaded = Vec<(Arc<dyn Subscriber>, BoxedFilter)>;

/// Cordial instance
pub struct Bot {
    token: String,
    api_client: api::Client,
    intents: Intents,
    presence: Option<Presence>,
    subscribers: Vec<Registered>,
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("api_client", &self.api_client)
            .field("intents", &self.intents)
            .field("presence", &self.presence)
            .field(
                "subscribers",
                &self
                    .subscribers
                    .iter()
                    .map(|r| r.subscriber.name())
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Bot {
    /// Create new framework instance using bot token
    pub fn new<S: AsRef<str> + ?Sized>(token: &S) -> Result<Self> {
        let api_client = api::Client::new_from_bot_token(&token).context(error::CallAPIFailed)?;

        log::info!("Create api client success");

        Ok(Self {
            token: token.as_ref().to_string(),
            api_client,
            intents: Intents::DEFAULT,
            presence: None,
            subscribers: Vec::new(),
        })
    }

    /// Set gateway intents used in identify
    pub fn intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    /// Set initial presence used in identify
    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Register a subscriber, it only receives payloads pass the filter
    pub fn subscribe<S, F>(mut self, subscriber: S, filter: F) -> Self
    where
        S: Subscriber + 'static,
        F: Filter + Send + Sync + 'static,
    {
        self.subscribers.push(Registered {
            subscriber: Box::new(subscriber),
            filter: Box::new(filter),
        });
        self
    }

    /// api client used by this bot
    pub fn api_client(&self) -> &api::Client {
        &self.api_client
    }

    fn identity(&self) -> Identity {
        let identity = Identity::new(self.token.as_str()).intents(self.intents);
        match self.presence {
            Some(ref presence) => identity.presence(presence.clone()),
            None => identity,
        }
    }

    /// Run until gateway closes connection with a reason reconnect can't fix.
    ///
    /// Failures before a session is ready are retried with exponential backoff.
    pub async fn run(mut self) -> Result<()> {
        let mut loaded: Loaded = Vec::with_capacity(self.subscribers.len());

        for Registered {
            mut subscriber,
            filter,
        } in self.subscribers.drain(..)
        {
            subscriber.on_loaded(self.api_client.clone()).await;
            log::info!("Subscriber {} loaded", subscriber.name());
            loaded.push((Arc::from(subscriber), filter));
        }

        let mut retry_delay = RETRY_DELAY_START;

        loop {
            match run_session(&self.api_client, self.identity(), &loaded).await {
                Ok(close) => {
                    if let Some(reason) = close {
                        ensure!(
                            reason.is_reconnectable(),
                            error::GatewayRejected { reason }
                        );
                        log::warn!("Gateway closed connection: {}", reason);
                    }

                    retry_delay = RETRY_DELAY_START;
                    log::info!("Session ended, reconnect after {} seconds", RETRY_DELAY_START);
                    tokio::time::sleep(Duration::from_secs(RETRY_DELAY_START)).await;
                }
                Err(err) => {
                    if let Some(reason) = err.close_reason() {
                        ensure!(
                            reason.is_reconnectable(),
                            error::GatewayRejected {
                                reason: reason.clone()
                            }
                        );
                    }

                    log::warn!("Gateway session failed: {}", err);
                    log::warn!("Retry after {} seconds ...", retry_delay);

                    tokio::time::sleep(Duration::from_secs(retry_delay)).await;
                    retry_delay = next_retry_delay(retry_delay);
                }
            }
        }
    }
}

fn next_retry_delay(delay: u64) -> u64 {
    (delay * 2).clamp(RETRY_DELAY_START, RETRY_DELAY_MAX)
}

/// How long to wait before identify, when no session start is left.
fn session_start_wait(limit: &SessionStartLimit) -> Option<Duration> {
    (limit.remaining == 0).then(|| Duration::from_millis(limit.reset_after))
}

async fn run_session(
    api_client: &api::Client,
    identity: Identity,
    subscribers: &Loaded,
) -> Result<Option<CloseReason>> {
    let gateway = Gateway::fetch(api_client)
        .await
        .context(error::BootstrapFailed)?;

    if let Some(wait) = session_start_wait(&gateway.descriptor().session_start_limit) {
        log::warn!("No session start left, wait {:?} before identify", wait);
        tokio::time::sleep(wait).await;
    }

    let mut conn = gateway.connect().await.context(error::ConnectFailed)?;

    let ready = Arc::new(
        conn.identify(identity)
            .await
            .context(error::IdentifyFailed)?,
    );

    for (subscriber, _) in subscribers {
        tokio::spawn(subscriber.clone().on_ready(ready.clone()));
    }

    log::info!("Session ready, start receiving events");

    let handle = conn.close_handle();

    conn.listen(|payload| {
        if matches!(payload, Payload::Reconnect | Payload::InvalidSession(_)) {
            log::info!("Gateway asks reconnect by {:?} payload", payload.opcode());
            handle.close();
        }

        let payload = Arc::new(payload);
        for (subscriber, filter) in subscribers {
            if filter.filter_payload(&payload) {
                log::trace!(
                    "Dispatch {:?} to subscriber {}",
                    payload.event_name(),
                    subscriber.name()
                );
                tokio::spawn(subscriber.clone().on_event(payload.clone()));
            }
        }
    })
    .await
    .context(error::ListenFailed)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::filter;

    #[test]
    fn test_retry_delay_backoff() {
        let mut delay = RETRY_DELAY_START;
        let mut delays = Vec::new();
        for _ in 0..8 {
            delays.push(delay);
            delay = next_retry_delay(delay);
        }
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn test_session_start_wait() {
        let mut limit = SessionStartLimit {
            total: 1000,
            remaining: 3,
            reset_after: 14_400_000,
            max_concurrency: 1,
        };
        assert_eq!(session_start_wait(&limit), None);

        limit.remaining = 0;
        assert_eq!(
            session_start_wait(&limit),
            Some(Duration::from_secs(4 * 60 * 60))
        );
    }

    #[test]
    fn test_bot_builder() {
        let bot = Bot::new("secret-token")
            .unwrap()
            .intents(Intents::GUILDS | Intents::MESSAGE_CONTENT)
            .subscribe(
                |_payload: Arc<Payload>| async {},
                filter::event("MESSAGE_CREATE"),
            );

        let identify = bot.identity().merge();
        assert_eq!(identify.token, "secret-token");
        assert_eq!(identify.intents, Intents::GUILDS | Intents::MESSAGE_CONTENT);
        assert_eq!(identify.presence, Presence::default());

        let debug = format!("{:?}", bot);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("Anonymous Fn Subscriber"));
    }
}
