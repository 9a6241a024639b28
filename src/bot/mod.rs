//! Chat bot front end

pub mod replies;
pub mod telegram;

pub use replies::{ChatUser, Command, LinkButton, Reply, Responder};
pub use telegram::TelegramBot;
