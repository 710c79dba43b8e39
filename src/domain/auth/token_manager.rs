use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::error::RefreshError;
use super::redirect::{login_redirect_url, Locale, Navigator};
use super::RefreshTokenResponse;
use crate::infrastructure::store::CredentialStore;

/// New access token, or the reason the session could not be renewed
pub type RefreshOutcome = Result<String, RefreshError>;

/// Exchanges a refresh credential for a new credential pair
#[async_trait]
pub trait RefreshEndpoint: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshTokenResponse, RefreshError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    RefreshInFlight,
}

/// A request that hit a 401 while another caller was already refreshing
struct PendingRequest {
    resolver: oneshot::Sender<RefreshOutcome>,
}

impl PendingRequest {
    // Consumes the request, so it can only ever be settled once.
    fn settle(self, outcome: RefreshOutcome) {
        if self.resolver.send(outcome).is_err() {
            tracing::debug!("Queued request dropped before refresh settled");
        }
    }
}

struct RefreshState {
    phase: RefreshPhase,
    failed_queue: Vec<PendingRequest>,
}

enum Role {
    Leader,
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

/// Owns the refresh state shared by every request of one session.
///
/// At most one refresh call is in flight at a time. Callers that observe a 401
/// while it runs are queued and all settled with its outcome. The lock is only
/// held for bookkeeping, never across an await.
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    endpoint: Arc<dyn RefreshEndpoint>,
    navigator: Option<Arc<dyn Navigator>>,
    default_locale: Locale,
    state: Mutex<RefreshState>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, endpoint: Arc<dyn RefreshEndpoint>) -> Self {
        Self {
            store,
            endpoint,
            navigator: None,
            default_locale: Locale::default(),
            state: Mutex::new(RefreshState {
                phase: RefreshPhase::Idle,
                failed_queue: Vec::new(),
            }),
        }
    }

    /// Send the user to the login page when the session cannot be renewed
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>, default_locale: Locale) -> Self {
        self.navigator = Some(navigator);
        self.default_locale = default_locale;
        self
    }

    pub fn phase(&self) -> RefreshPhase {
        self.state.lock().phase
    }

    /// Number of requests waiting on the in-flight refresh
    pub fn queued(&self) -> usize {
        self.state.lock().failed_queue.len()
    }

    /// Current access token. An unreadable store counts as "no token": the
    /// backend decides whether the request is then rejected.
    pub async fn access_token(&self) -> Option<String> {
        match self.store.get_access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!(error = %e, "Access token unreadable, continuing without it");
                None
            }
        }
    }

    /// Obtain a renewed access token after a request was rejected with 401.
    ///
    /// The first caller runs the refresh; callers arriving while it is in
    /// flight wait for its outcome instead of starting another one. On failure
    /// the stored credentials are cleared and, when a navigator is configured,
    /// the user is sent to the login page (once per failed refresh).
    pub async fn refresh_after_unauthorized(&self) -> RefreshOutcome {
        match self.claim() {
            Role::Waiter(receiver) => {
                tracing::debug!("Refresh already in flight, queueing request");
                receiver.await.unwrap_or(Err(RefreshError::Abandoned))
            }
            Role::Leader => {
                let guard = SettleGuard {
                    manager: self,
                    settled: false,
                };

                let outcome = self.run_refresh().await;
                match &outcome {
                    Ok(_) => tracing::info!("Session refreshed"),
                    Err(e) => self.expire_session(e).await,
                }

                guard.settle(outcome.clone());
                outcome
            }
        }
    }

    // Decides leader or waiter in one critical section, so the phase flips to
    // RefreshInFlight before the leader reaches its first await.
    fn claim(&self) -> Role {
        let mut state = self.state.lock();
        match state.phase {
            RefreshPhase::RefreshInFlight => {
                let (resolver, receiver) = oneshot::channel();
                state.failed_queue.push(PendingRequest { resolver });
                Role::Waiter(receiver)
            }
            RefreshPhase::Idle => {
                state.phase = RefreshPhase::RefreshInFlight;
                Role::Leader
            }
        }
    }

    async fn run_refresh(&self) -> RefreshOutcome {
        let refresh_token = match self.store.get_refresh_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(RefreshError::MissingRefreshToken),
            Err(e) => {
                tracing::warn!(error = %e, "Refresh token unreadable");
                return Err(RefreshError::MissingRefreshToken);
            }
        };

        let response = self.endpoint.refresh(&refresh_token).await?;

        let access_token = response
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RefreshError::MalformedResponse("missing accessToken".to_string()))?;

        self.store
            .set_access_token(&access_token)
            .await
            .map_err(|e| RefreshError::Store(e.to_string()))?;

        if let Some(refresh_token) = response.refresh_token.filter(|token| !token.is_empty()) {
            self.store
                .set_refresh_token(&refresh_token)
                .await
                .map_err(|e| RefreshError::Store(e.to_string()))?;
        }

        Ok(access_token)
    }

    async fn expire_session(&self, cause: &RefreshError) {
        tracing::warn!(error = %cause, "Session refresh failed, clearing credentials");

        if let Err(e) = self.store.clear_all().await {
            tracing::error!(error = %e, "Failed to clear credentials");
        }

        let Some(navigator) = &self.navigator else {
            return;
        };

        let current_path = navigator.current_path().unwrap_or_else(|| "/".to_string());
        if let Some(url) = login_redirect_url(&current_path, self.default_locale) {
            tracing::info!(redirect = %url, "Redirecting to login");
            navigator.redirect(&url);
        }
    }

    fn settle(&self, outcome: RefreshOutcome) {
        let waiters = {
            let mut state = self.state.lock();
            state.phase = RefreshPhase::Idle;
            std::mem::take(&mut state.failed_queue)
        };

        if !waiters.is_empty() {
            tracing::debug!(
                waiters = waiters.len(),
                success = outcome.is_ok(),
                "Releasing queued requests"
            );
        }

        for waiter in waiters {
            waiter.settle(outcome.clone());
        }
    }
}

/// Returns the manager to `Idle` even if the leading future is dropped mid-refresh
struct SettleGuard<'a> {
    manager: &'a TokenManager,
    settled: bool,
}

impl SettleGuard<'_> {
    fn settle(mut self, outcome: RefreshOutcome) {
        self.settled = true;
        self.manager.settle(outcome);
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Refresh dropped before completion, releasing queued requests");
            self.manager.settle(Err(RefreshError::Abandoned));
        }
    }
}
