//! Event subscribers.

use std::{borrow::Cow, future::Future, sync::Arc};

use crate::{
    api::{self, Client},
    ws::{Payload, Ready},
};

/// Subscriber can be register to bot and process payloads.
#[async_trait::async_trait]
pub trait Subscriber: Send + Sync {
    /// subscriber name
    fn name(&self) -> Cow<'static, str>;
    /// callback will be execute when a bot load this subscriber
    async fn on_loaded(&mut self, client: Client);
    /// callback will be execute every time a gateway session is ready
    async fn on_ready(self: Arc<Self>, _ready: Arc<Ready>) {}
    /// callback will be execute for every payload passed the filter
    async fn on_event(self: Arc<Self>, payload: Arc<Payload>);
}

#[async_trait::async_trait]
impl<F, Fut> Subscriber for F
where
    F: Fn(Arc<Payload>) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    fn name(&self) -> Cow<'static, str> {
        "Anonymous Fn Subscriber".into()
    }

    async fn on_loaded(&mut self, _client: api::Client) {}

    async fn on_event(self: Arc<Self>, payload: Arc<Payload>) {
        self(payload).await
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_closure_subscriber() {
        let count = Arc::new(AtomicUsize::new(0));

        let counter = count.clone();
        let mut subscriber = move |payload: Arc<Payload>| {
            let counter = counter.clone();
            async move {
                if payload.opcode() == crate::ws::Opcode::Reconnect {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }
        };

        subscriber
            .on_loaded(Client::new_from_bot_token("token").unwrap())
            .await;
        assert_eq!(subscriber.name(), "Anonymous Fn Subscriber");

        let subscriber = Arc::new(subscriber);
        subscriber
            .clone()
            .on_event(Arc::new(Payload::Reconnect))
            .await;
        subscriber
            .on_event(Arc::new(Payload::HeartbeatAck(None)))
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
