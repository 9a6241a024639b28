//! Chat replies, independent of the messaging transport.

use crate::core::config::{BotConfig, PricingConfig};
use crate::core::pricing::{Estimate, Estimator, PricingResult, format_grouped, parse_amount};
use tracing::{debug, info};

const COMMAND_LIST: &str = "/calc — Калькулятор стоимости\n\
/poizon — Инструкция по Poizon\n\
/operator — Связь с оператором";

const OPERATOR_BUTTON: &str = "Написать оператору";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Text uses Telegram HTML markup.
    pub html: bool,
    pub button: Option<LinkButton>,
}

impl Reply {
    fn plain(text: impl Into<String>) -> Self {
        Reply {
            text: text.into(),
            html: false,
            button: None,
        }
    }

    fn html(text: impl Into<String>) -> Self {
        Reply {
            text: text.into(),
            html: true,
            button: None,
        }
    }

    fn with_button(mut self, label: &str, url: String) -> Self {
        self.button = Some(LinkButton {
            label: label.to_string(),
            url,
        });
        self
    }
}

/// The person a message came from.
#[derive(Debug, Clone)]
pub struct ChatUser {
    pub id: u64,
    pub first_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Calc,
    Operator,
    Guide,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Start,
        Command::Help,
        Command::Calc,
        Command::Operator,
        Command::Guide,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Calc => "calc",
            Command::Operator => "operator",
            Command::Guide => "poizon",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Command::Start => "Главное меню",
            Command::Help => "Список команд",
            Command::Calc => "Калькулятор стоимости",
            Command::Operator => "Связаться с оператором",
            Command::Guide => "Инструкция по Poizon",
        }
    }

    /// Parses `/name` or `/name@botname`, ignoring any arguments.
    ///
    /// A command addressed to another bot is not ours. When `own_username` is
    /// unknown the `@botname` suffix is not checked.
    pub fn parse(text: &str, own_username: Option<&str>) -> Option<Command> {
        let word = text.trim().strip_prefix('/')?.split_whitespace().next()?;
        let (name, addressee) = match word.split_once('@') {
            Some((name, addressee)) => (name, Some(addressee)),
            None => (word, None),
        };
        if let (Some(addressee), Some(own)) = (addressee, own_username) {
            if !addressee.eq_ignore_ascii_case(own.trim_start_matches('@')) {
                return None;
            }
        }
        Command::ALL.into_iter().find(|c| c.name() == name)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn currency_sign(code: &str) -> &str {
    match code {
        "EUR" => "€",
        "USD" => "$",
        "RUB" => "₽",
        "CNY" => "¥",
        other => other,
    }
}

fn command_reply(command: Command, user: Option<&ChatUser>, config: &BotConfig) -> Reply {
    match command {
        Command::Start => {
            let greeting = user.map_or_else(
                || "Привет! 👋".to_string(),
                |u| {
                    format!(
                        "Привет, <a href=\"tg://user?id={}\">{}</a>! 👋",
                        u.id,
                        escape_html(&u.first_name)
                    )
                },
            );
            Reply::html(format!(
                "{greeting}\n\n\
                 Я бот-помощник по доставке товаров из Китая (Poizon и др.) в РФ.\n\n\
                 Доступные команды:\n{COMMAND_LIST}\n\n\
                 Или просто отправьте цену в юанях (например: 500) для быстрого расчёта."
            ))
        }
        Command::Help => Reply::plain(format!(
            "Доступные команды:\n\
             /start — Главное меню\n{COMMAND_LIST}\n\n\
             Для расчёта просто отправьте цену товара в юанях (например: 500)."
        )),
        Command::Calc => {
            Reply::plain("Введите цену товара в юанях (только число, например: 500)")
        }
        Command::Operator => {
            Reply::plain("Для оформления заказа или консультации нажмите кнопку ниже:")
                .with_button(OPERATOR_BUTTON, config.operator_url())
        }
        Command::Guide => Reply::plain("Инструкция по заказу через Poizon:")
            .with_button("Перейти к инструкции", config.guide_url.clone()),
    }
}

fn invalid_amount_reply() -> Reply {
    Reply::plain(
        "Не удалось распознать число. Пожалуйста, введите только цену в юанях.\n\
         Пример: 500\n\n\
         Или используйте команды: /calc, /operator, /poizon",
    )
}

fn unavailable_reply(config: &BotConfig) -> Reply {
    Reply::plain(format!(
        "Не удалось получить курсы валют от ЦБ РФ. Попробуйте позже или напишите оператору: @{}",
        config.operator_username
    ))
}

fn priced_reply(
    result: &PricingResult,
    pricing: &PricingConfig,
    reference_currency: &str,
    config: &BotConfig,
) -> Reply {
    let mut text = format!(
        "<b>Примерная цена доставки за одну пару кроссовок\n\
         (до 1,5 кг с учётом упаковки):</b>\n\n\
         <b>{} ₽</b>\n\n",
        format_grouped(result.total)
    );

    if result.tax_applied {
        let sign = currency_sign(reference_currency);
        text.push_str(&format!(
            "<i>В стоимость включён дополнительный налог {:.0}%\n\
             за превышение лимита в {:.0}{sign} (цена товара ≈ {:.0}{sign}).</i>\n\n",
            pricing.tax_rate * 100.0,
            pricing.tax_threshold,
            result.reference_amount,
        ));
    }

    text.push_str("Для точного расчёта и оформления заказа свяжитесь с оператором:");
    Reply::html(text).with_button(OPERATOR_BUTTON, config.operator_url())
}

/// Everything needed to answer a chat message.
#[derive(Clone)]
pub struct Responder {
    estimator: Estimator,
    reference_currency: String,
    config: BotConfig,
    username: Option<String>,
}

impl Responder {
    pub fn new(estimator: Estimator, reference_currency: &str, config: BotConfig) -> Self {
        Responder {
            estimator,
            reference_currency: reference_currency.to_string(),
            config,
            username: None,
        }
    }

    /// The bot's own username, used to ignore commands addressed to other bots.
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// Answers one incoming text message. `None` means the message is left unanswered.
    pub async fn respond(&self, text: &str, user: Option<&ChatUser>) -> Option<Reply> {
        if text.trim_start().starts_with('/') {
            let command = Command::parse(text, self.username.as_deref());
            debug!(?command, "Received command");
            return command.map(|c| command_reply(c, user, &self.config));
        }

        let amount = match parse_amount(text) {
            Ok(amount) => amount,
            Err(e) => {
                debug!(error = %e, "Rejected amount");
                return Some(invalid_amount_reply());
            }
        };

        info!(amount, "Estimating delivery price");
        let reply = match self.estimator.estimate(amount).await {
            Estimate::Priced { result, .. } => priced_reply(
                &result,
                self.estimator.pricing(),
                &self.reference_currency,
                &self.config,
            ),
            Estimate::RatesUnavailable => unavailable_reply(&self.config),
        };
        Some(reply)
    }
}
