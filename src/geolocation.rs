//! Device location lookup.
//!
//! A [`Locator`] runs at most one request at a time. Starting a new request
//! aborts the previous one, and every request carries a generation number so
//! the session can drop answers that arrive after they stopped mattering.

use crate::error::GeolocationError;
use crate::types::Coordinates;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeolocationOptions {
    pub timeout: Duration,
    /// Oldest cached position the provider may answer with.
    pub maximum_age: Duration,
    pub high_accuracy: bool,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(5 * 60),
            high_accuracy: true,
        }
    }
}

pub trait PositionProvider: Send + Sync + 'static {
    fn current_position(
        &self,
        options: &GeolocationOptions,
    ) -> impl Future<Output = Result<Coordinates, GeolocationError>> + Send;
}

/// Answers every request the same way, optionally after a delay.
#[derive(Debug, Clone)]
pub struct FixedPosition {
    answer: Result<Coordinates, GeolocationError>,
    delay: Duration,
}

impl FixedPosition {
    pub fn at(position: Coordinates) -> Self {
        Self {
            answer: Ok(position),
            delay: Duration::ZERO,
        }
    }

    pub fn denied() -> Self {
        Self {
            answer: Err(GeolocationError::Denied),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl PositionProvider for FixedPosition {
    fn current_position(
        &self,
        _options: &GeolocationOptions,
    ) -> impl Future<Output = Result<Coordinates, GeolocationError>> + Send {
        let answer = self.answer.clone();
        let delay = self.delay;
        async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            answer
        }
    }
}

/// Outcome of one request, tagged with the generation that asked for it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub generation: u64,
    pub result: Result<Coordinates, GeolocationError>,
}

type Pending = (u64, JoinHandle<Result<Coordinates, GeolocationError>>);

pub struct Locator<P> {
    provider: Arc<P>,
    options: GeolocationOptions,
    generation: u64,
    in_flight: Option<Pending>,
}

impl<P: PositionProvider> Locator<P> {
    pub fn new(provider: P, options: GeolocationOptions) -> Self {
        Self {
            provider: Arc::new(provider),
            options,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn options(&self) -> &GeolocationOptions {
        &self.options
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts a request, superseding any in flight. Must be called inside a
    /// tokio runtime.
    pub fn request(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;

        let provider = Arc::clone(&self.provider);
        let options = self.options;
        let handle = tokio::spawn(async move {
            match timeout(options.timeout, provider.current_position(&options)).await {
                Ok(result) => result,
                Err(_) => Err(GeolocationError::Timeout),
            }
        });

        info!(generation = self.generation, "requesting device location");
        self.in_flight = Some((self.generation, handle));
        self.generation
    }

    /// Waits for the request in flight. `None` if there is none or it was
    /// aborted.
    pub async fn resolve(&mut self) -> Option<LocationFix> {
        let (generation, handle) = self.in_flight.take()?;
        match handle.await {
            Ok(result) => Some(LocationFix { generation, result }),
            Err(e) if e.is_cancelled() => None,
            Err(e) => Some(LocationFix {
                generation,
                result: Err(GeolocationError::Unavailable(e.to_string())),
            }),
        }
    }

    pub fn cancel(&mut self) {
        if let Some((generation, handle)) = self.in_flight.take() {
            handle.abort();
            debug!(generation, "location request cancelled");
        }
    }
}

impl<P> Drop for Locator<P> {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.in_flight.take() {
            handle.abort();
        }
    }
}
