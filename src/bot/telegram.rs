//! Telegram long-polling transport.

use anyhow::{Context, Result};
use frankenstein::{
    AsyncApi, AsyncTelegramApi, BotCommand, GetUpdatesParams, InlineKeyboardButton,
    InlineKeyboardMarkup, ParseMode, ReplyMarkup, SendMessageParams, SetMyCommandsParams,
    UpdateContent,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::replies::{ChatUser, Command, Reply, Responder};
use crate::core::config::BotConfig;
use crate::core::pricing::Estimator;

const ERROR_PAUSE: Duration = Duration::from_secs(5);

struct Shared {
    api: AsyncApi,
    responder: Responder,
}

pub struct TelegramBot {
    api: AsyncApi,
    responder: Responder,
}

impl TelegramBot {
    pub fn new(
        token: &str,
        estimator: Estimator,
        reference_currency: &str,
        config: BotConfig,
    ) -> Self {
        TelegramBot {
            api: AsyncApi::new(token),
            responder: Responder::new(estimator, reference_currency, config),
        }
    }

    /// Username of this bot, needed to tell apart `/command@otherbot` in groups.
    async fn own_username(&self) -> Result<Option<String>> {
        let me = self.api.get_me().await.context("Failed to fetch bot identity")?;
        Ok(me.result.username)
    }

    async fn register_commands(&self) -> Result<()> {
        let commands = Command::ALL
            .iter()
            .map(|c| {
                BotCommand::builder()
                    .command(c.name())
                    .description(c.description())
                    .build()
            })
            .collect::<Vec<_>>();
        let params = SetMyCommandsParams::builder().commands(commands).build();
        self.api
            .set_my_commands(&params)
            .await
            .context("Failed to register bot commands")?;
        Ok(())
    }

    /// Polls for updates until interrupted with Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        if let Err(e) = self.register_commands().await {
            warn!(error = %e, "Continuing without command menu");
        }
        let username = match self.own_username().await {
            Ok(username) => username,
            Err(e) => {
                warn!(error = %e, "Accepting commands addressed to any bot");
                None
            }
        };
        info!(username = ?username, "Bot started");

        let shared = Arc::new(Shared {
            api: self.api.clone(),
            responder: self.responder.clone().with_username(username),
        });

        let mut params = GetUpdatesParams::builder().build();
        // long polling, seconds
        params.timeout = Some(30);

        loop {
            let updates = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                    return Ok(());
                }
                updates = shared.api.get_updates(&params) => updates,
            };

            let response = match updates {
                Ok(response) => response,
                Err(e) => {
                    error!(error = ?e, "Failed to get updates");
                    tokio::time::sleep(ERROR_PAUSE).await;
                    continue;
                }
            };

            for update in response.result {
                params.offset = Some(i64::from(update.update_id) + 1);

                let UpdateContent::Message(message) = update.content else {
                    continue;
                };
                let Some(text) = message.text.clone() else {
                    continue;
                };
                let chat_id = message.chat.id;
                let user = message.from.as_ref().and_then(|u| {
                    Some(ChatUser {
                        id: u64::try_from(u.id).ok()?,
                        first_name: u.first_name.clone(),
                    })
                });

                // One task per message so a slow rate fetch does not hold up other chats
                let ctx = Arc::clone(&shared);
                tokio::spawn(async move {
                    if let Err(e) = handle_message(&ctx, chat_id, &text, user).await {
                        error!(chat_id, error = %e, "Failed to answer message");
                    }
                });
            }
        }
    }
}

async fn handle_message(
    ctx: &Shared,
    chat_id: i64,
    text: &str,
    user: Option<ChatUser>,
) -> Result<()> {
    debug!(chat_id, "Handling message");
    let reply = ctx.responder.respond(text, user.as_ref()).await;

    match reply {
        Some(reply) => send_reply(&ctx.api, chat_id, reply).await,
        None => Ok(()),
    }
}

fn reply_markup(reply: &Reply) -> Option<ReplyMarkup> {
    let button = reply.button.as_ref()?;
    let button = InlineKeyboardButton::builder()
        .text(button.label.clone())
        .url(button.url.clone())
        .build();
    let keyboard = InlineKeyboardMarkup::builder()
        .inline_keyboard(vec![vec![button]])
        .build();
    Some(ReplyMarkup::InlineKeyboardMarkup(keyboard))
}

async fn send_reply(api: &AsyncApi, chat_id: i64, reply: Reply) -> Result<()> {
    let markup = reply_markup(&reply);
    let mut params = SendMessageParams::builder()
        .chat_id(chat_id)
        .text(reply.text)
        .build();
    if reply.html {
        params.parse_mode = Some(ParseMode::Html);
    }
    params.reply_markup = markup;

    api.send_message(&params)
        .await
        .with_context(|| format!("Failed to send message to chat {chat_id}"))?;
    Ok(())
}
