//! Single-flight coordination for access token refresh

use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::RefreshError;

type RefreshFuture = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

#[derive(Default)]
struct Flight {
    generation: u64,
    current: Option<RefreshFuture>,
}

/// Holds at most one in-flight refresh.
///
/// Callers arriving while a refresh runs attach to it instead of starting
/// another; everyone observes the same result. Once resolved, the slot is
/// emptied so the next expiry starts a fresh refresh.
#[derive(Default)]
pub struct RefreshCoordinator {
    flight: Mutex<Flight>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the in-flight refresh, or starts one with `start`.
    ///
    /// `start` is only called when nothing is in flight.
    pub async fn run<F, Fut>(&self, start: F) -> Result<String, RefreshError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, RefreshError>> + Send + 'static,
    {
        let (generation, refresh) = {
            let mut flight = self.flight.lock().await;
            match &flight.current {
                Some(existing) => {
                    debug!(generation = flight.generation, "Joining in-flight token refresh");
                    (flight.generation, existing.clone())
                }
                None => {
                    flight.generation += 1;
                    debug!(generation = flight.generation, "Starting token refresh");
                    let refresh = start().boxed().shared();
                    flight.current = Some(refresh.clone());
                    (flight.generation, refresh)
                }
            }
        };

        let result = refresh.await;

        let mut flight = self.flight.lock().await;
        if flight.generation == generation {
            flight.current = None;
        }

        result
    }

    pub async fn in_flight(&self) -> bool {
        self.flight.lock().await.current.is_some()
    }
}
