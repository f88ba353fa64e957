use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use reqwest::{header, Client, Method, Response};

use crate::{error::FetchError, logging::Logger};

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// reqwest 使用 rustls-no-provider，需要先安裝 process 層級的 CryptoProvider。
fn install_crypto_provider() {
    // 已安裝過會回傳 Err，忽略即可
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Builds a reqwest client bounded by the given timeouts.
///
/// # Arguments
///
/// * `user_agent`: The `User-Agent` sent with every request.
/// * `connect_timeout`: Upper bound for establishing the connection.
/// * `timeout`: Upper bound for the whole request, body included.
pub fn build_client(
    user_agent: &str,
    connect_timeout: Duration,
    timeout: Duration,
) -> Result<Client, FetchError> {
    install_crypto_provider();

    Client::builder()
        // ===== 壓縮 =====
        .brotli(true)
        .gzip(true)
        .zstd(true)
        // ===== 超時設置 =====
        .connect_timeout(connect_timeout)
        .timeout(timeout)
        // ===== TCP 優化 =====
        .tcp_nodelay(true)
        .tcp_keepalive(Duration::from_secs(60))
        // ===== 連接池 =====
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Duration::from_secs(90))
        // ===== 重定向 =====
        .redirect(reqwest::redirect::Policy::limited(5))
        .referer(true)
        .user_agent(user_agent)
        .build()
        .map_err(|why| FetchError::Client(format!("{:?}", why)))
}

/// Performs one HTTP GET request and returns the response body as text.
///
/// Non-2xx responses are reported as [`FetchError::Unreachable`] like any transport
/// failure. There is no retry here.
pub async fn get(
    client: &Client,
    url: &str,
    headers: Option<header::HeaderMap>,
) -> Result<String, FetchError> {
    send(client, Method::GET, url, headers)
        .await?
        .text()
        .await
        .map_err(|why| unreachable(url, format!("Error reading response text: {:?}", why)))
}

/// Sends a single request and turns any failure into [`FetchError::Unreachable`].
async fn send(
    client: &Client,
    method: Method,
    url: &str,
    headers: Option<header::HeaderMap>,
) -> Result<Response, FetchError> {
    let visit_log = format!("{method}:{url}");
    let mut rb = client.request(method, url);

    if let Some(h) = headers {
        rb = rb.headers(h);
    }

    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    match res {
        Ok(response) => {
            let status = response.status();
            let line = format!("{} {} {} ms", visit_log, status, elapsed);
            if status.is_success() {
                LOGGER.info(line);
            } else {
                LOGGER.warn(line);
            }
            response
                .error_for_status()
                .map_err(|why| unreachable(url, format!("HTTP status {}: {:?}", status, why)))
        }
        Err(why) => {
            LOGGER.error(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
            let reason = if why.is_timeout() {
                format!("timed out after {} ms", elapsed)
            } else {
                format!("{:?}", why)
            };
            Err(unreachable(url, reason))
        }
    }
}

fn unreachable(url: &str, reason: String) -> FetchError {
    FetchError::Unreachable {
        url: url.to_string(),
        reason,
    }
}

/// Builds a header map, skipping empty values and entries that are not valid
/// header text.
pub fn header_map(pairs: &[(header::HeaderName, &str)]) -> header::HeaderMap {
    let mut headers = header::HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        if value.is_empty() {
            continue;
        }

        if let Ok(v) = header::HeaderValue::from_str(value) {
            headers.insert(name.clone(), v);
        }
    }

    headers
}
