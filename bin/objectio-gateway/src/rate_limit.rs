//! Fixed-window per-IP rate limiter (spec §4.13, §5 "rate-limiter's
//! per-IP table requires mutex protection with periodic eviction").
//!
//! Thin `tower::Layer`, not part of the core pipeline: a request over
//! the configured RPM gets a 429 before it ever reaches a handler.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};

struct Window {
    started_at: Instant,
    count: u32,
}

#[derive(Clone)]
pub struct RateLimiter {
    per_minute: u32,
    windows: Arc<DashMap<IpAddr, Window>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(requests_per_minute: u32) -> Self {
        let limiter = Self {
            per_minute: requests_per_minute,
            windows: Arc::new(DashMap::new()),
        };
        limiter.spawn_evictor();
        limiter
    }

    fn spawn_evictor(&self) {
        let windows = self.windows.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                ticker.tick().await;
                windows.retain(|_, w| w.started_at.elapsed() < Duration::from_secs(120));
            }
        });
    }

    fn allow(&self, ip: IpAddr) -> bool {
        let mut entry = self.windows.entry(ip).or_insert_with(|| Window {
            started_at: Instant::now(),
            count: 0,
        });
        if entry.started_at.elapsed() >= Duration::from_secs(60) {
            entry.started_at = Instant::now();
            entry.count = 0;
        }
        entry.count += 1;
        entry.count <= self.per_minute
    }
}

#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: RateLimiter,
}

impl RateLimitLayer {
    #[must_use]
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            limiter: RateLimiter::new(requests_per_minute),
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: RateLimiter,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let ip = req
            .extensions()
            .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
            .map(|c| c.0.ip())
            .unwrap_or(IpAddr::from([0, 0, 0, 0]));

        if !self.limiter.allow(ip) {
            return Box::pin(async move {
                Ok((StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response())
            });
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}
