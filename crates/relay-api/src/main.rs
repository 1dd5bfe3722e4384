//! Storefront relay server binary.
//!
//! Start the server with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx TELEGRAM_ADMIN_IDS=123 cargo run -p relay-api -- serve
//! ```

use std::sync::Arc;

use clap::{Parser, Subcommand};
use relay_api::config::{CORS_ORIGINS_ENV, DEFAULT_HOST, DEFAULT_PORT, HOST_ENV, PORT_ENV};
use relay_api::{serve, ApiConfig, AppState};
use relay_core::config::{
    BOT_TOKEN_ENV, BOT_USERNAME_ENV, OPERATOR_IDS_ENV, WEBHOOK_URL_ENV,
};
use relay_core::{load_env_files, ConfigError, RelayConfig};
use relay_telegram::{
    spawn_session_sweeper, MessagingGateway, RecordingGateway, RelayBot, TelegramGateway,
    DEFAULT_SWEEP_INTERVAL,
};
use tracing_subscriber::EnvFilter;

/// Storefront relay - forwards orders and customer chats to Telegram operators
#[derive(Parser, Debug)]
#[command(name = "storefront-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Bot credential
    #[arg(long, global = true, env = BOT_TOKEN_ENV, hide_env_values = true)]
    bot_token: Option<String>,

    /// Bot username used in deep links (looked up when omitted)
    #[arg(long, global = true, env = BOT_USERNAME_ENV)]
    bot_username: Option<String>,

    /// Comma-separated operator ids
    #[arg(long, global = true, env = OPERATOR_IDS_ENV)]
    admin_ids: Option<String>,

    /// Public webhook URL
    #[arg(long, global = true, env = WEBHOOK_URL_ENV)]
    webhook_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the order and webhook endpoints
    Serve {
        /// Host to bind to
        #[arg(long, env = HOST_ENV, default_value = DEFAULT_HOST)]
        host: String,

        /// Port to bind to
        #[arg(short, long, env = PORT_ENV, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Allowed storefront origins, comma-separated
        #[arg(long, env = CORS_ORIGINS_ENV, default_value = "*")]
        cors_origins: String,

        /// Log outbound messages instead of calling the bot API
        #[arg(long)]
        dry_run: bool,
    },

    /// Register the webhook URL with the bot API
    SetWebhook,

    /// Remove the registered webhook
    DeleteWebhook,
}

impl Cli {
    /// Flags take precedence; clap has already folded in their variables.
    fn lookup(&self, key: &str) -> Option<String> {
        let flag = match key {
            BOT_TOKEN_ENV => self.bot_token.clone(),
            BOT_USERNAME_ENV => self.bot_username.clone(),
            OPERATOR_IDS_ENV => self.admin_ids.clone(),
            WEBHOOK_URL_ENV => self.webhook_url.clone(),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_files();
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "storefront_relay=info,relay_api=info,relay_telegram=info,relay_core=info,teloxide=warn",
        1 => "storefront_relay=debug,relay_api=debug,relay_telegram=debug,relay_core=debug,teloxide=info",
        2 => "storefront_relay=trace,relay_api=trace,relay_telegram=trace,relay_core=trace,teloxide=debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let relay = RelayConfig::from_lookup(|key| cli.lookup(key))?;

    match cli.command {
        Commands::Serve {
            ref host,
            port,
            ref cors_origins,
            dry_run,
        } => {
            let api = ApiConfig::new(host.clone(), port).with_cors_list(cors_origins);
            run_server(api, relay, dry_run).await
        }
        Commands::SetWebhook => {
            let url = relay
                .webhook_url
                .as_deref()
                .ok_or(ConfigError::Missing(WEBHOOK_URL_ENV))?;
            RelayBot::new(&relay.bot_token, relay.send_timeout)?
                .set_webhook(url)
                .await?;
            println!("Webhook set to {}", url);
            Ok(())
        }
        Commands::DeleteWebhook => {
            RelayBot::new(&relay.bot_token, relay.send_timeout)?
                .delete_webhook()
                .await?;
            println!("Webhook deleted");
            Ok(())
        }
    }
}

async fn run_server(
    api: ApiConfig,
    relay: RelayConfig,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (gateway, bot_username): (Arc<dyn MessagingGateway>, String) = if dry_run {
        tracing::warn!("Dry run: outbound messages are logged, not sent");
        (
            Arc::new(RecordingGateway::new()),
            relay.require_bot_username()?.to_string(),
        )
    } else {
        let telegram = TelegramGateway::new(&relay.bot_token, relay.send_timeout)?;
        let username = match relay.bot_username.clone() {
            Some(username) => username,
            None => {
                let username = RelayBot::from_gateway(&telegram).get_me().await?;
                tracing::info!(username = %username, "Bot username resolved");
                username
            }
        };
        (Arc::new(telegram), username)
    };

    if relay.operator_ids.is_empty() {
        tracing::warn!("No operators configured; orders and customer messages reach nobody");
    }

    let state = AppState::build(api.clone(), &relay, &bot_username, gateway)?;

    if let Some(ttl) = relay.session_ttl {
        let ttl_chrono = chrono::Duration::from_std(ttl)?;
        spawn_session_sweeper(
            Arc::clone(&state.dispatcher),
            ttl_chrono,
            DEFAULT_SWEEP_INTERVAL.min(ttl),
        );
    }

    println!("\n[shop] Storefront relay");
    println!("   Bot: @{}", bot_username);
    println!("   Operators: {}", relay.operator_ids.len());
    println!("   Listening on {}", api.bind_address());
    println!("   Press Ctrl+C to stop\n");

    serve(api, state).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_serve() {
        let cli = Cli::try_parse_from([
            "storefront-relay",
            "-vv",
            "--bot-token",
            "123:abc",
            "serve",
            "--port",
            "8080",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.lookup(BOT_TOKEN_ENV).as_deref(), Some("123:abc"));
        match cli.command {
            Commands::Serve { port, dry_run, .. } => {
                assert_eq!(port, 8080);
                assert!(dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_webhook_commands() {
        let cli = Cli::try_parse_from([
            "storefront-relay",
            "set-webhook",
            "--webhook-url",
            "https://relay.example/api/telegram/webhook",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::SetWebhook));
        assert_eq!(
            cli.lookup(WEBHOOK_URL_ENV).as_deref(),
            Some("https://relay.example/api/telegram/webhook")
        );

        let cli = Cli::try_parse_from(["storefront-relay", "delete-webhook"]).unwrap();
        assert!(matches!(cli.command, Commands::DeleteWebhook));
    }
}
