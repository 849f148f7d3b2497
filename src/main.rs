use std::path::{Path, PathBuf};
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{Chat, ReplyParameters};
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use rakabot::commands::Command;
use rakabot::config::Config;
use rakabot::dispatcher::{ChatType, IncomingMessage, MessageDispatcher};
use rakabot::inference::Backend;

const DEFAULT_CONFIG_PATH: &str = "rakabot.json";

struct BotState {
    dispatcher: MessageDispatcher<Backend>,
}

impl BotState {
    async fn new(config: &Config, bot: &Bot) -> Result<Self, String> {
        let handle = match config.bot_username.clone() {
            Some(handle) => handle,
            None => match bot.get_me().await {
                Ok(me) => {
                    info!("Bot user ID: {}, username: @{}", me.id, me.username());
                    format!("@{}", me.username())
                }
                Err(e) => return Err(format!("Failed to get bot info: {e}")),
            },
        };

        let backend = Backend::from_config(config)
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            dispatcher: MessageDispatcher::new(handle, Arc::new(backend)),
        })
    }
}

/// Explicit path must exist; the default one is optional.
fn config_path() -> Option<PathBuf> {
    match std::env::args().nth(1) {
        Some(path) => Some(PathBuf::from(path)),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            default.exists().then(|| default.to_path_buf())
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config_path = config_path();
    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("rakabot.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file: {e}");
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting rakabot...");
    match &config_path {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("No config file, using defaults and environment"),
    }

    let bot = Bot::new(&config.telegram_bot_token);

    let state = match BotState::new(&config, &bot).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };
    info!("Answering mentions of {}", state.dispatcher.handle());

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_message));

    info!("Bot is polling!");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn chat_type(chat: &Chat) -> ChatType {
    if chat.is_private() {
        ChatType::Private
    } else if chat.is_group() {
        ChatType::Group
    } else if chat.is_supergroup() {
        ChatType::Supergroup
    } else {
        ChatType::Channel
    }
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> ResponseResult<()> {
    info!("Command {:?} in chat {}", cmd, msg.chat.id);
    bot.send_message(msg.chat.id, cmd.reply())
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let incoming = IncomingMessage {
        chat_id: msg.chat.id.0,
        chat_type: chat_type(&msg.chat),
        text: text.to_string(),
    };

    let Some(reply) = state.dispatcher.dispatch(&incoming).await else {
        return Ok(());
    };

    if let Err(e) = bot
        .send_message(msg.chat.id, reply)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await
    {
        warn!("Failed to send reply in chat {}: {e}", msg.chat.id);
        return Err(e);
    }

    Ok(())
}

