use anyhow::{bail, ensure};
use chunkflow::{BatchConfig, DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY};
use chunkflow_gbdx::{Credentials, DEFAULT_BASE_URL, MAX_ORDER_SIZE};
use clap::{Args, Parser, Subcommand};
use core::fmt;
use core::time::Duration;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chunkflow", author, version, about = "Place bulk orders against the GBDX ordering API")]
pub struct CliArgs {
    /// Emit logs as JSON objects instead of human-readable lines.
    #[arg(long, global = true, env = "CHUNKFLOW_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Order acquisitions from GBDX.
    ///
    /// Acquisition IDs can be given as space delimited arguments, or, when no
    /// arguments are given, one per line on stdin.
    Order(OrderArgs),
}

#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Acquisition IDs to order.
    #[arg(value_name = "ACQIDS")]
    pub ids: Vec<String>,

    /// Number of acquisitions per order request.
    #[arg(long, env = "CHUNKFLOW_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Maximum number of order requests in flight.
    #[arg(long, env = "CHUNKFLOW_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Root URL of the GBDX API.
    #[arg(long, env = "GBDX_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, env = "GBDX_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "GBDX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, env = "GBDX_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "GBDX_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Where the access token is cached between runs [default: ~/.gbdx/token.json]
    #[arg(long, env = "GBDX_TOKEN_CACHE")]
    pub token_cache: Option<PathBuf>,

    /// Timeout for each HTTP request, in seconds.
    #[arg(long, env = "GBDX_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,
}

/// Credential fields as configured; any of them may be missing as long as a
/// cached token is usable.
#[derive(Clone, Default)]
pub struct CredentialArgs {
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl CredentialArgs {
    pub fn resolve(&self) -> chunkflow_gbdx::Result<Credentials> {
        Credentials::from_parts(
            self.username.clone(),
            self.password.clone(),
            self.client_id.clone(),
            self.client_secret.clone(),
        )
    }
}

impl fmt::Debug for CredentialArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialArgs")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Validated settings for one `order` run.
#[derive(Clone, Debug)]
pub struct OrderConfig {
    pub ids: Vec<String>,
    pub batch: BatchConfig,
    pub base_url: String,
    pub credentials: CredentialArgs,
    pub token_cache: PathBuf,
    pub timeout: Duration,
}

impl TryFrom<OrderArgs> for OrderConfig {
    type Error = anyhow::Error;

    fn try_from(args: OrderArgs) -> Result<Self, Self::Error> {
        ensure!(
            (1..=MAX_ORDER_SIZE).contains(&args.chunk_size),
            "--chunk-size must be between 1 and {MAX_ORDER_SIZE}, got {}",
            args.chunk_size
        );
        ensure!(args.concurrency >= 1, "--concurrency must be >= 1");
        ensure!(args.timeout_secs >= 1, "--timeout-secs must be >= 1");
        if !(args.base_url.starts_with("https://") || args.base_url.starts_with("http://")) {
            bail!("--base-url must be an http(s) URL, got {}", args.base_url);
        }

        Ok(Self {
            ids: args.ids,
            batch: BatchConfig::new(args.chunk_size, args.concurrency),
            base_url: args.base_url,
            credentials: CredentialArgs {
                username: args.username,
                password: args.password,
                client_id: args.client_id,
                client_secret: args.client_secret,
            },
            token_cache: args.token_cache.unwrap_or_else(default_token_cache),
            timeout: Duration::from_secs(args.timeout_secs),
        })
    }
}

fn default_token_cache() -> PathBuf {
    let home = std::env::var_os("HOME").map_or_else(PathBuf::new, PathBuf::from);
    home.join(".gbdx").join("token.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> OrderArgs {
        let cli = CliArgs::try_parse_from(["chunkflow", "order"].iter().chain(args)).unwrap();
        match cli.command {
            Command::Order(order) => order,
        }
    }

    #[test]
    fn defaults_follow_engine_constants() {
        let config = OrderConfig::try_from(parse(&["a", "b", "--token-cache", "/tmp/t.json"])).unwrap();
        assert_eq!(config.ids, vec!["a", "b"]);
        assert_eq!(config.batch, BatchConfig::default());
        assert_eq!(config.token_cache, PathBuf::from("/tmp/t.json"));
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let err = OrderConfig::try_from(parse(&["--chunk-size", "0"])).unwrap_err();
        assert!(err.to_string().contains("--chunk-size"));
    }

    #[test]
    fn rejects_chunks_larger_than_the_api_allows() {
        let err = OrderConfig::try_from(parse(&["--chunk-size", "101"])).unwrap_err();
        assert!(err.to_string().contains("between 1 and 100"));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = OrderConfig::try_from(parse(&["--concurrency", "0"])).unwrap_err();
        assert!(err.to_string().contains("--concurrency"));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = OrderConfig::try_from(parse(&["--base-url", "ftp://example.com"])).unwrap_err();
        assert!(err.to_string().contains("--base-url"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = OrderConfig::try_from(parse(&[
            "--password",
            "hunter2",
            "--client-secret",
            "shh",
        ]))
        .unwrap();
        let out = format!("{config:?}");
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("shh"));
    }
}
