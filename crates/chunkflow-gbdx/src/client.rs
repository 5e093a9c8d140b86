use crate::{Error, Order, Result, Token};
use chunkflow::Submitter;
use core::time::Duration;

/// Production GBDX API root.
pub const DEFAULT_BASE_URL: &str = "https://geobigdata.io";

/// Path of the ordering endpoint, relative to the API base URL.
pub const ORDER_PATH: &str = "/orders/v2/order";

/// Builds the HTTP client shared by token and order requests.
///
/// `timeout` bounds each request end to end; the batch engine itself never
/// times out a chunk.
///
/// # Errors
///
/// Returns [`Error::Http`] if the TLS backend cannot be initialised.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("chunkflow/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Places orders on behalf of one authenticated user.
///
/// Each call to [`OrderClient::new_order`] is one request to the ordering
/// endpoint, so callers must keep batches within
/// [`MAX_ORDER_SIZE`](crate::MAX_ORDER_SIZE). As a [`Submitter`] it is meant to
/// be driven by [`chunkflow::submit_all`], which takes care of that.
#[derive(Clone, Debug)]
pub struct OrderClient {
    http: reqwest::Client,
    base_url: String,
    token: Token,
}

impl OrderClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, token: Token) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The token every order request is authorized with.
    pub const fn token(&self) -> &Token {
        &self.token
    }

    /// Orders the given acquisitions in a single request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport or decoding failures and
    /// [`Error::Api`] with the response body if the service rejects the order.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(count = ids.len())))]
    pub async fn new_order(&self, ids: &[String]) -> Result<Order> {
        let response = self
            .http
            .post(endpoint(&self.base_url, ORDER_PATH))
            .bearer_auth(&self.token.access_token)
            .json(ids)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            #[cfg(feature = "tracing")]
            tracing::warn!("Order request failed with {status}: {}", message.trim());
            return Err(Error::Api {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let order: Order = response.json().await?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Order {} placed for {} acquisitions",
            order.order_id,
            order.acquisitions.len()
        );
        Ok(order)
    }
}

impl Submitter<String> for OrderClient {
    type Output = Order;
    type Error = Error;

    fn submit(&self, chunk: &[String]) -> impl Future<Output = Result<Order>> + Send {
        self.new_order(chunk)
    }
}
