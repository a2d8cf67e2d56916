use anyhow::Result;
use clap::Parser;
use codequest_core::{apply_filters, FilterCriteria, SortKey, TimeWindow};
use codequest_upstream::{
    UpstreamClient, UpstreamConfig, DEFAULT_REDDIT_BASE, DEFAULT_STACK_EXCHANGE_BASE,
    DEFAULT_USER_AGENT,
};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "codequest-search")]
#[command(about = "Search Reddit and Stack Overflow and print the merged results as JSON")]
struct Cli {
    /// Search query
    #[arg(long)]
    query: String,
    /// Sort key: relevance, date, score or comments
    #[arg(long, default_value = "relevance")]
    sort: SortKey,
    /// Time window: all, day, week, month or year
    #[arg(long, default_value = "all")]
    time: TimeWindow,
    /// User-Agent sent to both APIs
    #[arg(long, env = "UPSTREAM_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
    /// Request timeout seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 12)]
    timeout_secs: u64,
    #[arg(long, env = "REDDIT_BASE_URL", default_value = DEFAULT_REDDIT_BASE)]
    reddit_base: Url,
    #[arg(long, env = "STACK_EXCHANGE_BASE_URL", default_value = DEFAULT_STACK_EXCHANGE_BASE)]
    stack_exchange_base: Url,
    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let args = Cli::parse();

    let client = UpstreamClient::new(UpstreamConfig {
        reddit_base: args.reddit_base,
        stack_exchange_base: args.stack_exchange_base,
        user_agent: args.user_agent,
        timeout: Duration::from_secs(args.timeout_secs),
        ..UpstreamConfig::default()
    })?;

    let results = client.fetch_results(&args.query).await?;
    let filtered = apply_filters(&results, &FilterCriteria::new(args.sort, args.time));
    eprintln!(
        "codequest-search: query={:?} reddit={} stack_overflow={}",
        args.query,
        filtered.reddit.len(),
        filtered.stack_overflow.len()
    );

    let out = if args.pretty {
        serde_json::to_string_pretty(&filtered)?
    } else {
        serde_json::to_string(&filtered)?
    };
    println!("{}", out);
    Ok(())
}
