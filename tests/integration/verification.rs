//! Integration tests for the unverified-account gate.
//!
//! Exercises the gate against the stub auth backend and real
//! file-backed storage: admission persists the verified session,
//! the cooldown suppresses repeat resends, and sign-out clears local
//! state from any gate state.

use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use starchat::api::StubAuthService;
use starchat::gate::{GateConfig, GateEvent, VerificationGate, VerificationState};
use starchat::session::{LocalStorage, NAV_KEY, SESSION_KEY};
use starchat_proto::session::Session;

static DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

fn scratch_storage() -> LocalStorage {
    let seq = DIR_SEQ.fetch_add(1, Ordering::SeqCst);
    LocalStorage::new(
        std::env::temp_dir().join(format!("starchat-verify-test-{}-{seq}", process::id())),
    )
}

fn fast_config() -> GateConfig {
    GateConfig {
        cooldown_secs: 2,
        tick: Duration::from_millis(10),
    }
}

fn unverified_session() -> Session {
    serde_json::from_str(
        r#"{
            "access_token": "tok-abc",
            "user": {
                "username": "ada",
                "email": "ada@example.com",
                "is_verified": false,
                "aud": "authenticated"
            }
        }"#,
    )
    .unwrap()
}

#[tokio::test]
async fn admission_persists_the_verified_session() {
    let storage = scratch_storage();
    storage.save_session(&unverified_session()).unwrap();
    let auth = Arc::new(StubAuthService::new());
    auth.set_verified(true);
    let (gate, mut rx) = VerificationGate::new(Arc::clone(&auth), storage.clone(), fast_config());

    gate.check_verification().await;
    assert_eq!(rx.recv().await, Some(GateEvent::Admitted));
    assert!(gate.admitted());

    let persisted = storage.load_session().unwrap().unwrap();
    assert!(persisted.user.is_verified);
    // Token material the auth layer stored must survive the rewrite.
    assert_eq!(persisted.extra["access_token"], "tok-abc");
    assert_eq!(persisted.user.extra["aud"], "authenticated");
}

#[tokio::test]
async fn unverified_answer_keeps_the_gate_closed() {
    let storage = scratch_storage();
    storage.save_session(&unverified_session()).unwrap();
    let auth = Arc::new(StubAuthService::new());
    let (gate, mut rx) = VerificationGate::new(Arc::clone(&auth), storage.clone(), fast_config());

    gate.check_verification().await;
    assert_eq!(rx.recv().await, Some(GateEvent::StillUnverified));
    assert!(!gate.admitted());
    assert_eq!(gate.state(), VerificationState::Gated);
    assert!(!storage.load_session().unwrap().unwrap().user.is_verified);
}

#[tokio::test]
async fn cooldown_suppresses_repeat_resends() {
    let auth = Arc::new(StubAuthService::new());
    let (gate, mut rx) =
        VerificationGate::new(Arc::clone(&auth), scratch_storage(), fast_config());

    gate.request_resend().await;
    gate.request_resend().await;
    gate.request_resend().await;
    assert_eq!(auth.resend_calls(), 1);

    // Once the countdown finishes a fresh resend goes through.
    loop {
        match rx.recv().await {
            Some(GateEvent::CooldownFinished) => break,
            Some(_) => {}
            None => panic!("event channel closed during cooldown"),
        }
    }
    gate.request_resend().await;
    assert_eq!(auth.resend_calls(), 2);
}

#[tokio::test]
async fn sign_out_clears_local_state_during_cooldown() {
    let storage = scratch_storage();
    storage.save_session(&unverified_session()).unwrap();
    storage.set_json(NAV_KEY, &"chats").unwrap();
    let auth = Arc::new(StubAuthService::new());
    let (gate, mut rx) = VerificationGate::new(Arc::clone(&auth), storage.clone(), fast_config());

    gate.request_resend().await;
    gate.sign_out();

    let session: Option<Session> = storage.get_json(SESSION_KEY).unwrap();
    assert!(session.is_none());
    let nav: Option<String> = storage.get_json(NAV_KEY).unwrap();
    assert!(nav.is_none());

    let mut saw_signed_out = false;
    while let Ok(event) = rx.try_recv() {
        if event == GateEvent::SignedOut {
            saw_signed_out = true;
        }
    }
    assert!(saw_signed_out);
}

#[tokio::test]
async fn countdown_ticks_down_to_gated() {
    let auth = Arc::new(StubAuthService::new());
    let (gate, mut rx) =
        VerificationGate::new(Arc::clone(&auth), scratch_storage(), fast_config());

    gate.request_resend().await;
    assert_eq!(rx.recv().await, Some(GateEvent::CooldownTick(2)));
    assert_eq!(rx.recv().await, Some(GateEvent::CooldownTick(1)));
    assert_eq!(rx.recv().await, Some(GateEvent::CooldownFinished));
    assert_eq!(gate.state(), VerificationState::Gated);
}
