use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::config::WatchConfig;

#[derive(Debug, Clone)]
pub(crate) struct FetchedPage {
    /// URL after redirects; relative links resolve against this.
    pub(crate) final_url: String,
    pub(crate) body: String,
}

#[derive(Debug, Clone)]
pub(crate) struct FetchOptions {
    pub(crate) user_agent: String,
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) attempts: usize,
    pub(crate) retry_delay: Duration,
}

impl From<&WatchConfig> for FetchOptions {
    fn from(config: &WatchConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            attempts: config.attempts,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

pub(crate) fn fetch_page_with_retries(
    url: &str,
    options: &FetchOptions,
) -> Result<FetchedPage, String> {
    let attempts = options.attempts.max(1);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(options.connect_timeout)
        .timeout_read(options.read_timeout)
        .timeout_write(options.read_timeout)
        .user_agent(&options.user_agent)
        .build();

    for attempt in 1..=attempts {
        debug!(url, attempt, "fetching page");
        match agent.get(url).call() {
            Ok(response) => {
                let final_url = response.get_url().to_string();
                return match response.into_string() {
                    Ok(body) => Ok(FetchedPage { final_url, body }),
                    Err(err) => Err(format!("request failed: response decode failed: {err}")),
                };
            }
            Err(ureq::Error::Status(status, response)) => {
                let response_body = response.into_string().ok().unwrap_or_default();
                let body = response_body.trim();
                let status_error = if body.is_empty() {
                    format!("HTTP status {status}")
                } else {
                    let truncated = body.chars().take(240).collect::<String>();
                    format!("HTTP status {status} ({truncated})")
                };

                if should_retry_http_status(status) && attempt < attempts {
                    thread::sleep(options.retry_delay);
                    continue;
                }

                if should_retry_http_status(status) {
                    return Err(format!(
                        "request failed after {attempts} attempt(s): {status_error}"
                    ));
                }

                return Err(format!("request failed: {status_error}"));
            }
            Err(ureq::Error::Transport(err)) => {
                let transport_error = format!("transport error: {err}");
                if attempt < attempts {
                    thread::sleep(options.retry_delay);
                    continue;
                }
                return Err(format!(
                    "request failed after {attempts} attempt(s): {transport_error}"
                ));
            }
        }
    }

    Err("request failed: exhausted attempts without a concrete error".to_string())
}
