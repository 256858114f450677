/*!
 * Lifecycle Context Integration Tests
 *
 * End-to-end scenarios against the simulated host: sign-in/out, device
 * association, the suspend/resume handshake and degraded startup paths
 */

use platform_lifecycle::{
    DeviceAssociationChange, DeviceId, HostError, HostMessage, LifecycleConfig, LifecycleContext,
    LifecycleError, LifecycleEvent, LifecycleState, LocalId, PlatformServices, ResumeMode,
    SessionChangeEvent, SessionError, SignInOptions, SimulatedHost, SimulatedHostOptions,
    SimulatedUser, TickStats, WindowHandle,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WINDOW: WindowHandle = WindowHandle(1);

fn device(b: u8) -> DeviceId {
    DeviceId::from_bytes([b; 32])
}

fn started(host: &Arc<SimulatedHost>, config: LifecycleConfig) -> LifecycleContext {
    let mut context = LifecycleContext::builder(host.clone())
        .with_config(config)
        .build();
    context.init().unwrap();
    context.on_main_window_created(WINDOW).unwrap();
    context
}

fn signed_in(host: &Arc<SimulatedHost>, context: &mut LifecycleContext, id: u64) -> SimulatedUser {
    let user = SimulatedUser::new(LocalId(id));
    if host.pending_sign_ins() == 0 {
        context.request_sign_in(SignInOptions::AddUser).unwrap();
    }
    assert!(host.complete_sign_in(user.clone()));
    context.tick();
    user
}

/// Upper bound for any thread taking part in a handshake
const HANDSHAKE_WINDOW: Duration = Duration::from_secs(2);

/// Deliver `quiescing = true` from a separate host thread
///
/// The receiver yields the notification's return value once the host thread
/// has been released.
fn quiesce_on_host_thread(host: &Arc<SimulatedHost>) -> flume::Receiver<bool> {
    let (tx, rx) = flume::bounded(1);
    let host = host.clone();
    thread::spawn(move || {
        let _ = tx.send(host.notify_quiescence(true));
    });
    rx
}

/// Spin until `cond` holds or `timeout` elapses
fn wait_for(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

// ============================================================================
// Sessions
// ============================================================================

#[test]
fn test_sign_in_registers_session_on_tick() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());

    // Default config signs in during init
    assert_eq!(host.pending_sign_ins(), 1);
    assert!(host.complete_sign_in(SimulatedUser::new(LocalId(7))));

    // Nothing changes until the main thread ticks
    assert!(context.sessions().is_empty());
    assert!(!context.can_open_url());

    let stats = context.tick();
    assert_eq!(stats.completions_applied, 1);
    assert_eq!(context.sessions().len(), 1);
    assert_eq!(context.default_session().unwrap().local_id(), LocalId(7));
    assert!(context.can_open_url());
}

#[test]
fn test_sign_out_removes_and_releases_session() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());
    let user = signed_in(&host, &mut context, 7);

    assert!(host.notify_session_change(LocalId(7), SessionChangeEvent::SignedOut.raw()));
    context.tick();

    assert!(context.sessions().is_empty());
    assert!(context.default_session().is_none());
    assert_eq!(user.close_count(), 1);
}

#[test]
fn test_informational_events_leave_registry_unchanged() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());
    let user = signed_in(&host, &mut context, 7);

    for event in [
        SessionChangeEvent::SignedInAgain,
        SessionChangeEvent::SigningOut,
        SessionChangeEvent::Gamertag,
        SessionChangeEvent::Privileges,
    ] {
        host.notify_session_change(LocalId(7), event.raw());
    }
    let stats = context.tick();

    assert_eq!(stats.completions_applied, 4);
    assert_eq!(context.sessions().len(), 1);
    assert!(!user.is_closed());
}

#[test]
fn test_unknown_session_event_is_discarded() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());
    signed_in(&host, &mut context, 7);

    host.notify_session_change(LocalId(7), 99);
    host.notify_session_change(LocalId(7), SessionChangeEvent::SignedOut.raw());
    let stats = context.tick();

    // The bad completion does not stop the drain
    assert_eq!(stats.completions_discarded, 1);
    assert_eq!(stats.completions_applied, 1);
    assert!(context.sessions().is_empty());
}

#[test]
fn test_duplicate_sign_in_releases_second_handle() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());
    let first = signed_in(&host, &mut context, 7);
    let second = signed_in(&host, &mut context, 7);

    assert_eq!(context.sessions().len(), 1);
    assert!(!first.is_closed());
    assert_eq!(second.close_count(), 1);
}

#[test]
fn test_sign_in_beyond_capacity_is_dropped() {
    let host = Arc::new(SimulatedHost::new());
    let config = LifecycleConfig {
        max_sessions: 2,
        ..Default::default()
    };
    let mut context = started(&host, config);

    signed_in(&host, &mut context, 1);
    signed_in(&host, &mut context, 2);
    let third = signed_in(&host, &mut context, 3);

    assert_eq!(context.sessions().len(), 2);
    assert!(!context.sessions().contains(LocalId(3)));
    assert_eq!(third.close_count(), 1);
}

#[test]
fn test_failed_sign_in_is_discarded() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());

    host.fail_sign_in(HostError::CallFailed {
        call: "XUserAddResult",
        code: 0x8000_4005,
    });
    let stats = context.tick();

    assert_eq!(stats.completions_discarded, 1);
    assert!(context.sessions().is_empty());
}

#[test]
fn test_unreadable_local_id_releases_handle() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());
    let user = SimulatedUser::unreadable(LocalId(7));

    host.complete_sign_in(user.clone());
    let stats = context.tick();

    assert_eq!(stats.completions_discarded, 1);
    assert!(context.sessions().is_empty());
    assert_eq!(user.close_count(), 1);
}

#[test]
fn test_completions_apply_in_fifo_order() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());
    let a = signed_in(&host, &mut context, 1);

    // Sign-out of A, sign-in of B, then device to B: order matters for all three
    host.notify_session_change(LocalId(1), SessionChangeEvent::SignedOut.raw());
    context.request_sign_in(SignInOptions::AddUser).unwrap();
    host.complete_sign_in(SimulatedUser::new(LocalId(2)));
    host.notify_device_association(DeviceAssociationChange {
        device: device(0xb2),
        old_user: None,
        new_user: Some(LocalId(2)),
    });

    let stats = context.tick();
    assert_eq!(stats.completions_applied, 3);
    assert!(a.is_closed());

    let session = context.default_session().unwrap();
    assert_eq!(session.local_id(), LocalId(2));
    assert_eq!(session.devices(), &[device(0xb2)]);
}

// ============================================================================
// Devices
// ============================================================================

#[test]
fn test_device_moves_between_sessions() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());
    signed_in(&host, &mut context, 1);
    signed_in(&host, &mut context, 2);

    host.notify_device_association(DeviceAssociationChange {
        device: device(0xd1),
        old_user: None,
        new_user: Some(LocalId(1)),
    });
    context.tick();
    assert!(context.sessions().find(LocalId(1)).unwrap().has_device(&device(0xd1)));

    host.notify_device_association(DeviceAssociationChange {
        device: device(0xd1),
        old_user: Some(LocalId(1)),
        new_user: Some(LocalId(2)),
    });
    context.tick();

    assert!(context.sessions().find(LocalId(1)).unwrap().devices().is_empty());
    assert_eq!(
        context.sessions().find(LocalId(2)).unwrap().devices(),
        &[device(0xd1)]
    );
}

#[test]
fn test_device_for_unknown_session_is_ignored() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());
    signed_in(&host, &mut context, 7);

    host.notify_device_association(DeviceAssociationChange {
        device: device(0xd1),
        old_user: None,
        new_user: Some(LocalId(99)),
    });
    let stats = context.tick();

    assert_eq!(stats.completions_applied, 1);
    assert_eq!(context.sessions().len(), 1);
    assert!(context.default_session().unwrap().devices().is_empty());
}

#[test]
fn test_repeated_device_binding_is_stored_once() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());
    signed_in(&host, &mut context, 7);

    for _ in 0..3 {
        host.notify_device_association(DeviceAssociationChange {
            device: device(0xd1),
            old_user: None,
            new_user: Some(LocalId(7)),
        });
    }
    context.tick();

    assert_eq!(context.default_session().unwrap().devices().len(), 1);
}

// ============================================================================
// Suspend / resume
// ============================================================================

#[test]
fn test_park_mode_handshake() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());

    let suspends = Arc::new(AtomicUsize::new(0));
    let resumes = Arc::new(AtomicUsize::new(0));
    {
        let suspends = suspends.clone();
        context.events().subscribe(LifecycleEvent::Suspend, move || {
            suspends.fetch_add(1, Ordering::SeqCst);
        });
        let resumes = resumes.clone();
        context.events().subscribe(LifecycleEvent::Resume, move || {
            resumes.fetch_add(1, Ordering::SeqCst);
        });
    }

    // Host thread reports how many on-suspend calls had run when it was released
    let (released_tx, released_rx) = flume::bounded(1);
    {
        let host = host.clone();
        let suspends = suspends.clone();
        thread::spawn(move || {
            host.notify_quiescence(true);
            let _ = released_tx.send(suspends.load(Ordering::SeqCst));
            thread::sleep(Duration::from_millis(20));
            host.notify_quiescence(false);
        });
    }

    // The host thread stays blocked until the main thread pumps the wake-up
    assert!(wait_for(HANDSHAKE_WINDOW, || host.queued_messages() == 1));
    assert_eq!(context.state(), LifecycleState::Suspending);
    thread::sleep(Duration::from_millis(50));
    assert!(released_rx.try_recv().is_err());

    // Main thread parks inside the wake-up handler until the host resumes
    let (ticked_tx, ticked_rx) = flume::bounded(1);
    let main_thread = thread::spawn(move || {
        let stats = context.tick();
        let _ = ticked_tx.send(());
        (context, stats)
    });

    // on-suspend ran exactly once, before the host was released
    assert_eq!(released_rx.recv_timeout(HANDSHAKE_WINDOW), Ok(1));
    assert!(ticked_rx.recv_timeout(HANDSHAKE_WINDOW).is_ok());
    let (context, stats) = main_thread.join().unwrap();

    assert_eq!(stats.messages_pumped, 1);
    assert_eq!(suspends.load(Ordering::SeqCst), 1);
    assert_eq!(resumes.load(Ordering::SeqCst), 1);
    assert_eq!(context.state(), LifecycleState::Running);
    assert!(context.has_focus());
    assert_eq!(context.handshakes_completed(), 1);
}

#[test]
fn test_poll_mode_handshake() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::polling());

    let resumes = Arc::new(AtomicUsize::new(0));
    {
        let resumes = resumes.clone();
        context.events().subscribe(LifecycleEvent::Resume, move || {
            resumes.fetch_add(1, Ordering::SeqCst);
        });
    }

    let released = quiesce_on_host_thread(&host);
    assert!(wait_for(HANDSHAKE_WINDOW, || host.queued_messages() == 1));

    // Returns right after acknowledging
    context.tick();
    assert_eq!(released.recv_timeout(HANDSHAKE_WINDOW), Ok(true));
    assert_eq!(context.state(), LifecycleState::Suspended);
    assert!(!context.has_focus());

    // Still suspended: nothing to resume yet
    assert!(!context.tick().resumed);
    assert_eq!(resumes.load(Ordering::SeqCst), 0);

    host.notify_quiescence(false);
    assert_eq!(context.state(), LifecycleState::Resuming);

    let stats = context.tick();
    assert!(stats.resumed);
    assert_eq!(resumes.load(Ordering::SeqCst), 1);
    assert_eq!(context.state(), LifecycleState::Running);
    assert!(context.has_focus());
}

#[test]
fn test_completions_keep_flowing_while_suspended_in_poll_mode() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::polling());

    let released = quiesce_on_host_thread(&host);
    assert!(wait_for(HANDSHAKE_WINDOW, || host.queued_messages() == 1));
    context.tick();
    assert_eq!(released.recv_timeout(HANDSHAKE_WINDOW), Ok(true));

    host.complete_sign_in(SimulatedUser::new(LocalId(7)));
    context.tick();

    assert_eq!(context.state(), LifecycleState::Suspended);
    assert_eq!(context.sessions().len(), 1);
}

#[test]
fn test_repeated_handshakes() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::polling());

    for cycle in 1..=3u64 {
        let released = quiesce_on_host_thread(&host);
        assert!(wait_for(HANDSHAKE_WINDOW, || host.queued_messages() == 1));
        context.tick();
        assert_eq!(released.recv_timeout(HANDSHAKE_WINDOW), Ok(true));

        host.notify_quiescence(false);
        assert!(context.tick().resumed);
        assert_eq!(context.handshakes_completed(), cycle);
    }
}

#[test]
fn test_shutdown_during_pending_suspend_is_unsupported() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::polling());

    let resumes = Arc::new(AtomicUsize::new(0));
    {
        let resumes = resumes.clone();
        context.events().subscribe(LifecycleEvent::Resume, move || {
            resumes.fetch_add(1, Ordering::SeqCst);
        });
    }

    let released = quiesce_on_host_thread(&host);
    assert!(wait_for(HANDSHAKE_WINDOW, || host.queued_messages() == 1));
    context.tick();
    assert_eq!(released.recv_timeout(HANDSHAKE_WINDOW), Ok(true));

    // Exit while suspended: the handshake is abandoned, not completed
    context.exit();
    assert!(!host.notify_quiescence(false));
    assert_eq!(context.state(), LifecycleState::Suspended);
    assert_eq!(resumes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_suspend_without_deferral_when_registration_fails() {
    let host = Arc::new(SimulatedHost::with_options(SimulatedHostOptions {
        fail_app_state_registration: true,
        ..Default::default()
    }));
    let mut context = started(&host, LifecycleConfig::default());

    // Nothing registered, so the host never reaches the coordinator
    assert!(!host.notify_quiescence(true));
    assert_eq!(context.tick().messages_pumped, 0);
    assert_eq!(context.state(), LifecycleState::Running);
    assert!(context.has_focus());
}

#[test]
fn test_suspend_without_deferral_when_post_fails() {
    let host = Arc::new(SimulatedHost::with_options(SimulatedHostOptions {
        fail_post_message: true,
        ..Default::default()
    }));
    let context = started(&host, LifecycleConfig::default());

    // Returns instead of blocking on the acknowledgement
    assert!(host.notify_quiescence(true));
    assert_eq!(context.state(), LifecycleState::Running);
}

#[test]
fn test_native_messages_reach_handler() {
    let host = Arc::new(SimulatedHost::new());
    let seen = Arc::new(AtomicUsize::new(0));
    let mut context = {
        let seen = seen.clone();
        LifecycleContext::builder(host.clone())
            .with_message_handler(move |window, id| {
                assert_eq!(window, WINDOW);
                seen.fetch_add(id as usize, Ordering::SeqCst);
            })
            .build()
    };
    context.init().unwrap();
    context.on_main_window_created(WINDOW).unwrap();

    host.post_message(WINDOW, HostMessage::Native(5)).unwrap();
    host.post_message(WINDOW, HostMessage::Native(7)).unwrap();

    assert_eq!(context.tick().messages_pumped, 2);
    assert_eq!(seen.load(Ordering::SeqCst), 12);
}

// ============================================================================
// Startup and shutdown
// ============================================================================

#[test]
fn test_runtime_init_failure_is_fatal() {
    let host = Arc::new(SimulatedHost::with_options(SimulatedHostOptions {
        fail_runtime_init: true,
        ..Default::default()
    }));
    let mut context = LifecycleContext::builder(host.clone()).build();

    let err = context.init().unwrap_err();
    assert!(matches!(err, LifecycleError::RuntimeInit(_)));
    assert!(err.is_fatal());
    assert!(!host.is_runtime_initialized());
    assert_eq!(host.active_registrations(), 0);
}

#[test]
fn test_registration_failures_degrade_session_tracking() {
    let host = Arc::new(SimulatedHost::with_options(SimulatedHostOptions {
        fail_session_registration: true,
        fail_device_registration: true,
        ..Default::default()
    }));
    let mut context = started(&host, LifecycleConfig::default());

    // Sign-in still works; change notifications simply never arrive
    assert!(!host.notify_session_change(LocalId(7), SessionChangeEvent::SignedOut.raw()));
    host.complete_sign_in(SimulatedUser::new(LocalId(7)));
    context.tick();
    assert_eq!(context.sessions().len(), 1);
}

#[test]
fn test_sign_in_request_failure_is_not_fatal() {
    let host = Arc::new(SimulatedHost::with_options(SimulatedHostOptions {
        fail_sign_in_request: true,
        ..Default::default()
    }));
    let context = started(&host, LifecycleConfig::default());

    assert_eq!(host.pending_sign_ins(), 0);
    assert!(matches!(
        context.request_sign_in(SignInOptions::AddUser),
        Err(LifecycleError::Host(_))
    ));
}

#[test]
fn test_sign_in_on_init_can_be_disabled() {
    let host = Arc::new(SimulatedHost::new());
    let config = LifecycleConfig {
        sign_in_on_init: None,
        ..Default::default()
    };
    let _context = started(&host, config);
    assert_eq!(host.pending_sign_ins(), 0);
}

#[test]
fn test_phase_checks() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = LifecycleContext::builder(host.clone()).build();

    assert!(matches!(
        context.request_sign_in(SignInOptions::AddUser),
        Err(LifecycleError::InvalidPhase("uninitialized"))
    ));

    context.init().unwrap();
    assert!(matches!(context.init(), Err(LifecycleError::InvalidPhase("initialized"))));

    context.exit();
    assert!(matches!(context.init(), Err(LifecycleError::InvalidPhase("exited"))));
    assert!(matches!(
        context.on_main_window_created(WINDOW),
        Err(LifecycleError::InvalidPhase("exited"))
    ));
}

#[test]
fn test_exit_releases_everything_and_is_idempotent() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());
    let a = signed_in(&host, &mut context, 1);
    let b = signed_in(&host, &mut context, 2);
    assert_eq!(host.active_registrations(), 3);

    context.exit();
    context.exit();

    assert_eq!(a.close_count(), 1);
    assert_eq!(b.close_count(), 1);
    assert!(context.sessions().is_empty());
    assert_eq!(host.active_registrations(), 0);
    assert!(!host.is_runtime_initialized());

    // Late completions are dropped, ticks do nothing
    host.complete_sign_in(SimulatedUser::new(LocalId(3)));
    assert_eq!(context.tick(), TickStats::default());
    assert!(context.sessions().is_empty());
}

#[test]
fn test_drop_performs_exit() {
    let host = Arc::new(SimulatedHost::new());
    let user = {
        let mut context = started(&host, LifecycleConfig::default());
        signed_in(&host, &mut context, 7)
    };

    assert_eq!(user.close_count(), 1);
    assert_eq!(host.active_registrations(), 0);
    assert!(!host.is_runtime_initialized());
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_open_url_uses_default_session() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());

    assert!(matches!(
        context.open_url("https://example.com"),
        Err(LifecycleError::Session(SessionError::NoSession))
    ));

    signed_in(&host, &mut context, 7);
    signed_in(&host, &mut context, 8);
    context.open_url("https://example.com").unwrap();

    assert_eq!(
        host.launched_uris(),
        vec![(LocalId(7), "https://example.com".to_string())]
    );
}

#[test]
fn test_default_session_follows_removal() {
    let host = Arc::new(SimulatedHost::new());
    let mut context = started(&host, LifecycleConfig::default());
    signed_in(&host, &mut context, 1);
    signed_in(&host, &mut context, 2);

    host.notify_session_change(LocalId(1), SessionChangeEvent::SignedOut.raw());
    context.tick();

    assert_eq!(context.default_session().unwrap().local_id(), LocalId(2));
}

#[test]
fn test_resume_mode_override_on_builder() {
    let host = Arc::new(SimulatedHost::new());
    let context = LifecycleContext::builder(host)
        .with_resume_mode(ResumeMode::Poll)
        .build();
    assert_eq!(context.config().resume_mode, ResumeMode::Poll);
}
