use std::{borrow::Cow, sync::Arc};

use cordial::{
    api::{self, TextSender},
    filter,
    subscriber::Subscriber,
    ws::{event::MESSAGE_CREATE, Intents, Payload, Ready},
    Bot,
};

/// Reply `pong` to `!ping`
#[derive(Debug, Default)]
struct PingPong {
    client: Option<api::Client>,
}

#[async_trait::async_trait]
impl Subscriber for PingPong {
    fn name(&self) -> Cow<'static, str> {
        "ping-pong".into()
    }

    async fn on_loaded(&mut self, client: api::Client) {
        self.client.replace(client);
    }

    async fn on_ready(self: Arc<Self>, ready: Arc<Ready>) {
        log::info!(
            "Logged in as {} ({})",
            ready.user.username.as_deref().unwrap_or("<unknown>"),
            ready.user.id
        );
    }

    async fn on_event(self: Arc<Self>, payload: Arc<Payload>) {
        let message = match payload
            .as_dispatch()
            .and_then(|dispatch| dispatch.event.as_message_create())
        {
            Some(message) => message,
            None => return,
        };

        if message.author.bot == Some(true) || message.content.trim() != "!ping" {
            return;
        }

        if let Some(ref client) = self.client {
            if let Err(err) = client.send_text(&message.channel_id, "pong").await {
                log::warn!("Reply pong failed: {}", err);
            }
        }
    }
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let token = std::env::var("DISCORD_BOT_TOKEN").unwrap_or_else(|_| {
        println!("No DISCORD_BOT_TOKEN env var or invalid");
        std::process::exit(1);
    });

    let bot = Bot::new(&token)
        .unwrap()
        .intents(Intents::DEFAULT | Intents::MESSAGE_CONTENT)
        .subscribe(PingPong::default(), filter::event(MESSAGE_CREATE));

    if let Err(err) = bot.run().await {
        log::error!("Bot stopped: {}", err);
        std::process::exit(1);
    }
}
