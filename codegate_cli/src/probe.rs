//! Probe traffic against a running Codegate server
//!
//! The sweep behaves like an adversarial client: concurrent workers
//! draining a shared range of candidate codes, rotating identity strings,
//! jittered pacing, and multiplied backoff after rate-limit or
//! service-failure responses. Only the guard's external interface is
//! exercised; the guard's reaction is the interesting output.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use codegate_common::{constants, status, CheckRequest, CheckResponse};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::StatusCode;

/// Identity strings rotated across probe requests
static USER_AGENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64)",
        "curl/7.85.0",
        "Codegate-Lab-Agent/1.0",
        "python-requests/2.31",
    ]
});

#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub target: String,
    pub start: u32,
    pub count: u32,
    pub concurrency: usize,
    pub delay_ms: u64,
}

/// Outcome of one submission, as seen from outside the guard.
enum Attempt {
    Found(CheckResponse),
    Miss,
    /// 429 or 403: the guard pushed back
    Limited,
    /// 503 or transport failure: worth the long backoff too
    ServiceError,
}

/// Submit a single code and print the wire response.
pub async fn check(target: &str, code: &str) -> Result<()> {
    let client = http_client()?;
    let response = client
        .post(endpoint(target))
        .header(reqwest::header::USER_AGENT, "Codegate-Lab-Agent/1.0")
        .json(&CheckRequest::new(code))
        .send()
        .await
        .context("request failed")?;

    let http_status = response.status();
    let body: CheckResponse = response
        .json()
        .await
        .context("response body was not valid JSON")?;

    println!("{}", http_status);
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Run the sweep until a code is found or the range is exhausted.
pub async fn run(opts: ProbeOptions) -> Result<()> {
    let end = opts
        .start
        .saturating_add(opts.count)
        .min(constants::CODE_MAX + 1);
    tracing::info!(
        start = opts.start,
        end,
        concurrency = opts.concurrency,
        "starting probe sweep"
    );

    let client = http_client()?;
    let opts = Arc::new(opts);
    let next = Arc::new(AtomicU32::new(opts.start));
    let stop = Arc::new(AtomicBool::new(false));
    let started = Instant::now();

    let workers: Vec<_> = (0..opts.concurrency)
        .map(|id| {
            tokio::spawn(worker(
                id,
                client.clone(),
                end,
                Arc::clone(&opts),
                Arc::clone(&next),
                Arc::clone(&stop),
            ))
        })
        .collect();

    let mut found = None;
    for result in futures_util::future::join_all(workers).await {
        if let Some(hit) = result.context("worker panicked")?? {
            found = Some(hit);
        }
    }

    match found {
        Some((code, response)) => {
            tracing::info!(code, "valid code found");
            println!("FOUND {}", code);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        None => {
            tracing::info!("sweep exhausted without a hit");
        }
    }
    tracing::info!(elapsed_secs = started.elapsed().as_secs(), "probe complete");
    Ok(())
}

async fn worker(
    id: usize,
    client: reqwest::Client,
    end: u32,
    opts: Arc<ProbeOptions>,
    next: Arc<AtomicU32>,
    stop: Arc<AtomicBool>,
) -> Result<Option<(u32, CheckResponse)>> {
    let base = Duration::from_millis(opts.delay_ms);

    loop {
        if stop.load(Ordering::Relaxed) {
            return Ok(None);
        }
        let code = next.fetch_add(1, Ordering::Relaxed);
        if code >= end {
            return Ok(None);
        }

        let delay = match try_code(&client, &opts.target, code).await {
            Ok(Attempt::Found(response)) => {
                tracing::info!(worker = id, code, "worker found the code");
                stop.store(true, Ordering::Relaxed);
                return Ok(Some((code, response)));
            }
            Ok(Attempt::Miss) => jittered(base, 0.5, 1.0),
            Ok(Attempt::Limited) => {
                tracing::warn!(worker = id, code, "guard pushed back; backing off");
                jittered(base, 4.0, 4.0)
            }
            Ok(Attempt::ServiceError) => {
                tracing::warn!(worker = id, code, "transient service failure");
                jittered(base, 4.0, 4.0)
            }
            Err(e) => {
                tracing::debug!(worker = id, code, "request error: {e:#}");
                jittered(base, 2.0, 2.0)
            }
        };
        tokio::time::sleep(delay).await;
    }
}

async fn try_code(client: &reqwest::Client, target: &str, code: u32) -> Result<Attempt> {
    let identity = USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Codegate-Lab-Agent/1.0");

    let response = client
        .post(endpoint(target))
        .header(reqwest::header::USER_AGENT, identity)
        .json(&CheckRequest::new(code.to_string()))
        .send()
        .await?;

    match response.status() {
        StatusCode::OK => {
            let body: CheckResponse = response.json().await?;
            if body.status == status::OK {
                Ok(Attempt::Found(body))
            } else {
                Ok(Attempt::Miss)
            }
        }
        StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN => Ok(Attempt::Limited),
        StatusCode::SERVICE_UNAVAILABLE => Ok(Attempt::ServiceError),
        other => {
            tracing::debug!(code, %other, "unexpected status");
            Ok(Attempt::Miss)
        }
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")
}

fn endpoint(target: &str) -> String {
    format!(
        "{}{}",
        target.trim_end_matches('/'),
        constants::CHECK_CODE_PATH
    )
}

/// Scale `base` by a factor drawn uniformly from [lo, lo + spread).
fn jittered(base: Duration, lo: f64, spread: f64) -> Duration {
    let factor = lo + rand::thread_rng().gen::<f64>() * spread;
    base.mul_f64(factor)
}
