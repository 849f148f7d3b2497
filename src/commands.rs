//! Slash commands with fixed replies.

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "get help")]
    Help,
    #[command(description = "get a custom message")]
    Custom,
}

pub const START_REPLY: &str = "Hello! this is Raka 👋. How can I help you?";
pub const HELP_REPLY: &str = "I am Raka, a bot created by @noob_raka. I can help you with some basic commands. Here are some commands you can use:\n\n/start - To start the bot\n/help - To get help\n/custom - To get a custom message";
pub const CUSTOM_REPLY: &str = "This is a custom message!";

impl Command {
    pub fn reply(&self) -> &'static str {
        match self {
            Command::Start => START_REPLY,
            Command::Help => HELP_REPLY,
            Command::Custom => CUSTOM_REPLY,
        }
    }
}
