use crate::cli::config::OrderConfig;
use anyhow::Context;
use chunkflow::{CancellationToken, submit_all_with_cancel};
use chunkflow_gbdx::{OrderClient, Orders, TokenCache, authenticate, http_client};
use std::io::Write;
use std::sync::Arc;

/// Orders `ids` and writes the combined [`Orders`] to `out` as one JSON line.
///
/// The access token comes from the cache when it is still valid and is
/// written back only after every order succeeded.
///
/// # Errors
///
/// Fails on authentication problems, on the first rejected order (nothing is
/// written to `out` in that case), and on output or cache I/O errors.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(ids = ids.len())))]
pub async fn run_order<W>(
    config: &OrderConfig,
    ids: Vec<String>,
    cancel: CancellationToken,
    out: &mut W,
) -> anyhow::Result<Orders>
where
    W: Write,
{
    let http = http_client(config.timeout)?;
    let cache = TokenCache::new(&config.token_cache);
    let token = authenticate(&http, &config.base_url, &cache, || {
        config.credentials.resolve()
    })
    .await
    .context("failed to obtain a GBDX access token")?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Ordering {} acquisitions in chunks of {} with up to {} requests in flight",
        ids.len(),
        config.batch.chunk_size,
        config.batch.concurrency
    );

    let client = Arc::new(OrderClient::new(http, config.base_url.clone(), token));
    let orders: Orders =
        submit_all_with_cancel(ids, Arc::clone(&client), config.batch, cancel).await?;

    serde_json::to_writer(&mut *out, &orders)?;
    writeln!(out)?;
    out.flush()?;

    cache
        .store(client.token())
        .await
        .context("failed to cache access token")?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Placed {} orders covering {} acquisitions",
        orders.ids.len(),
        orders.acquisitions.len()
    );
    Ok(orders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::CredentialArgs;
    use chunkflow::BatchConfig;
    use chunkflow_gbdx::{ORDER_PATH, TOKEN_PATH, Token};
    use core::time::Duration;
    use std::path::Path;

    fn config(base_url: String, token_cache: &Path) -> OrderConfig {
        OrderConfig {
            ids: Vec::new(),
            batch: BatchConfig::new(2, 2),
            base_url,
            credentials: CredentialArgs {
                username: Some("ada".into()),
                password: Some("hunter2".into()),
                client_id: Some("client".into()),
                client_secret: Some("shh".into()),
            },
            token_cache: token_cache.to_path_buf(),
            timeout: Duration::from_secs(5),
        }
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("acq-{i}")).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn logs_in_orders_and_caches_token() {
        let mut server = mockito::Server::new_async().await;
        let login = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "fresh", "expires_in": 3600}"#)
            .expect(1)
            .create_async()
            .await;
        let order = server
            .mock("POST", ORDER_PATH)
            .match_header("authorization", "Bearer fresh")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"order_id": "o", "acquisitions": [{"acquisition_id": "x", "state": "submitted"}]}"#)
            .expect(3)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("token.json");
        let mut out = Vec::new();
        let orders = run_order(
            &config(server.url(), &cache_path),
            ids(5),
            CancellationToken::new(),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(orders.ids.len(), 3);
        let printed: Orders = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed, orders);
        assert!(out.ends_with(b"\n"));

        let cached = TokenCache::new(&cache_path).load().await.unwrap().unwrap();
        assert_eq!(cached.access_token, "fresh");

        login.assert_async().await;
        order.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_order_prints_nothing_and_keeps_cache() {
        let mut server = mockito::Server::new_async().await;
        let _order = server
            .mock("POST", ORDER_PATH)
            .with_status(429)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("token.json");
        let cached = Token {
            access_token: "cached".into(),
            token_type: "Bearer".into(),
            refresh_token: None,
            expiry: None,
        };
        TokenCache::new(&cache_path).store(&cached).await.unwrap();
        let before = std::fs::read(&cache_path).unwrap();

        let mut out = Vec::new();
        let err = run_order(
            &config(server.url(), &cache_path),
            ids(3),
            CancellationToken::new(),
            &mut out,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("quota exceeded"));
        assert!(out.is_empty());
        assert_eq!(std::fs::read(&cache_path).unwrap(), before);
    }
}
