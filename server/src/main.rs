use anyhow::Result;
use clap::Parser;
use codequest_core::Branding;
use codequest_mailer::{Address, DeliveryGateway, Mailbox, RelayConfig, SmtpRelay};
use codequest_server::{build_app, AppState};
use codequest_upstream::{
    UpstreamClient, UpstreamConfig, DEFAULT_REDDIT_BASE, DEFAULT_STACK_EXCHANGE_BASE,
    DEFAULT_USER_AGENT,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser)]
struct Args {
    /// Host to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,
    /// SMTP relay host (implicit TLS)
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    smtp_host: String,
    #[arg(long, env = "SMTP_PORT", default_value_t = 465)]
    smtp_port: u16,
    #[arg(long, env = "SMTP_USERNAME")]
    smtp_username: String,
    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    smtp_password: String,
    /// Maximum pooled SMTP connections
    #[arg(long, env = "SMTP_POOL_SIZE", default_value_t = 5)]
    smtp_pool_size: u32,
    /// Sender address; defaults to the SMTP username
    #[arg(long, env = "MAIL_FROM_ADDRESS")]
    mail_from_address: Option<String>,
    #[arg(long, env = "MAIL_FROM_NAME", default_value = "CodeQuest Search")]
    mail_from_name: String,
    /// Link behind the product name in digest emails
    #[arg(long, env = "PRODUCT_LINK")]
    product_link: Option<String>,
    /// User-Agent sent to the search APIs
    #[arg(long, env = "UPSTREAM_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 12)]
    upstream_timeout_secs: u64,
    #[arg(long, env = "REDDIT_BASE_URL", default_value = DEFAULT_REDDIT_BASE)]
    reddit_base: Url,
    #[arg(long, env = "STACK_EXCHANGE_BASE_URL", default_value = DEFAULT_STACK_EXCHANGE_BASE)]
    stack_exchange_base: Url,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let upstream = UpstreamClient::new(UpstreamConfig {
        reddit_base: args.reddit_base,
        stack_exchange_base: args.stack_exchange_base,
        user_agent: args.user_agent,
        timeout: Duration::from_secs(args.upstream_timeout_secs),
        ..UpstreamConfig::default()
    })?;

    let relay = SmtpRelay::new(&RelayConfig {
        host: args.smtp_host,
        port: args.smtp_port,
        username: args.smtp_username.clone(),
        password: args.smtp_password,
        pool_size: args.smtp_pool_size,
        ..RelayConfig::default()
    })?;
    let from_address: Address = args.mail_from_address.unwrap_or(args.smtp_username).parse()?;
    let from = Mailbox::new(Some(args.mail_from_name.clone()), from_address);
    let gateway = DeliveryGateway::new(Arc::new(relay), from);
    let branding = Branding { product_name: args.mail_from_name, product_link: args.product_link };

    let app = build_app(AppState::new(upstream, gateway, branding));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    // The router, and with it the relay's connection pool, is dropped here.
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
