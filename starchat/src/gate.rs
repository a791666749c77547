//! Access gate for unverified accounts.
//!
//! While an account is unverified the UI shows a blocking modal backed
//! by this state machine. The gate owns its state, the resend cooldown
//! timer, and the terminal admitted flag; the UI only observes it
//! through the event channel returned by the constructor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::AuthApi;
use crate::session::{LocalStorage, NAV_KEY, SESSION_KEY};

/// State of the verification gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    /// Blocking modal shown; resend and re-check are available.
    Gated,
    /// A resend was triggered; seconds remaining until the next one.
    ResendCooldown(u32),
    /// A status check is in flight.
    CheckPending,
}

/// Events the gate reports to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// Cooldown countdown update, seconds remaining.
    CooldownTick(u32),
    /// The cooldown elapsed; resend is available again.
    CooldownFinished,
    /// The resend call failed; the cooldown still engaged.
    ResendFailed(String),
    /// The account is verified; the gate is permanently open.
    Admitted,
    /// The status check came back unverified or failed.
    StillUnverified,
    /// The user signed out; local session state was cleared.
    SignedOut,
}

/// Tuning for the resend cooldown.
#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    /// Cooldown length in seconds.
    pub cooldown_secs: u32,
    /// Wall-clock length of one countdown second.
    pub tick: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 60,
            tick: Duration::from_secs(1),
        }
    }
}

const EVENT_BUFFER: usize = 64;

/// The unverified-account state machine.
#[derive(Debug)]
pub struct VerificationGate<A> {
    auth: Arc<A>,
    storage: LocalStorage,
    config: GateConfig,
    state: Arc<Mutex<VerificationState>>,
    admitted: Arc<AtomicBool>,
    events: mpsc::Sender<GateEvent>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<A: AuthApi> VerificationGate<A> {
    /// Creates a gate in the `Gated` state and the channel its events
    /// flow through.
    #[must_use]
    pub fn new(
        auth: Arc<A>,
        storage: LocalStorage,
        config: GateConfig,
    ) -> (Self, mpsc::Receiver<GateEvent>) {
        let (events, rx) = mpsc::channel(EVENT_BUFFER);
        let gate = Self {
            auth,
            storage,
            config,
            state: Arc::new(Mutex::new(VerificationState::Gated)),
            admitted: Arc::new(AtomicBool::new(false)),
            events,
            timer: Mutex::new(None),
        };
        (gate, rx)
    }

    /// The gate's current state.
    #[must_use]
    pub fn state(&self) -> VerificationState {
        *self.state.lock()
    }

    /// Whether the account has been admitted. Terminal: once true it
    /// never reverts except through [`sign_out`](Self::sign_out).
    #[must_use]
    pub fn admitted(&self) -> bool {
        self.admitted.load(Ordering::SeqCst)
    }

    /// Triggers a verification-email resend and starts the cooldown.
    ///
    /// Only valid from `Gated`; a call in any other state is a no-op
    /// with no external call. The cooldown engages even if the resend
    /// itself fails; the failure is reported via
    /// [`GateEvent::ResendFailed`].
    pub async fn request_resend(&self) {
        {
            let mut state = self.state.lock();
            if *state != VerificationState::Gated {
                tracing::debug!(state = ?*state, "resend ignored outside Gated");
                return;
            }
            *state = VerificationState::ResendCooldown(self.config.cooldown_secs);
        }
        self.emit(GateEvent::CooldownTick(self.config.cooldown_secs));
        self.start_cooldown_timer();

        if let Err(err) = self.auth.resend_verification_email().await {
            tracing::warn!(error = %err, "verification resend failed");
            self.emit(GateEvent::ResendFailed(err.to_string()));
        }
    }

    /// Asks the backend whether the account is verified now.
    ///
    /// Only valid from `Gated`. On a verified answer the persisted
    /// session is rewritten with `is_verified: true` and the gate
    /// admits; on an unverified answer or a failed call the gate
    /// returns to `Gated`.
    pub async fn check_verification(&self) {
        {
            let mut state = self.state.lock();
            if *state != VerificationState::Gated {
                tracing::debug!(state = ?*state, "status check ignored outside Gated");
                return;
            }
            *state = VerificationState::CheckPending;
        }
        match self.auth.check_verification_status().await {
            Ok(true) => {
                self.persist_verified();
                self.admitted.store(true, Ordering::SeqCst);
                *self.state.lock() = VerificationState::Gated;
                self.emit(GateEvent::Admitted);
            }
            Ok(false) => {
                *self.state.lock() = VerificationState::Gated;
                self.emit(GateEvent::StillUnverified);
            }
            Err(err) => {
                tracing::warn!(error = %err, "verification status check failed");
                *self.state.lock() = VerificationState::Gated;
                self.emit(GateEvent::StillUnverified);
            }
        }
    }

    /// Signs out: clears the persisted session and navigation state,
    /// stops the cooldown timer, and closes the gate. Valid from any
    /// state.
    pub fn sign_out(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
        *self.state.lock() = VerificationState::Gated;
        self.admitted.store(false, Ordering::SeqCst);
        for key in [SESSION_KEY, NAV_KEY] {
            if let Err(err) = self.storage.remove(key) {
                tracing::warn!(key, error = %err, "failed to clear storage key");
            }
        }
        self.emit(GateEvent::SignedOut);
    }

    fn persist_verified(&self) {
        match self.storage.load_session() {
            Ok(Some(mut session)) => {
                session.user.is_verified = true;
                if let Err(err) = self.storage.save_session(&session) {
                    tracing::error!(error = %err, "failed to persist verified session");
                }
            }
            Ok(None) => tracing::warn!("no persisted session to mark verified"),
            Err(err) => tracing::error!(error = %err, "failed to load persisted session"),
        }
    }

    fn start_cooldown_timer(&self) {
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let tick = self.config.tick;
        let mut remaining = self.config.cooldown_secs;
        let handle = tokio::spawn(async move {
            while remaining > 0 {
                tokio::time::sleep(tick).await;
                remaining -= 1;
                if remaining > 0 {
                    *state.lock() = VerificationState::ResendCooldown(remaining);
                    let _ = events.try_send(GateEvent::CooldownTick(remaining));
                }
            }
            *state.lock() = VerificationState::Gated;
            let _ = events.try_send(GateEvent::CooldownFinished);
        });
        let mut timer = self.timer.lock();
        if let Some(old) = timer.take() {
            old.abort();
        }
        *timer = Some(handle);
    }

    fn emit(&self, event: GateEvent) {
        if self.events.try_send(event).is_err() {
            tracing::warn!("gate event dropped, receiver full or gone");
        }
    }
}

impl<A> Drop for VerificationGate<A> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }
}
