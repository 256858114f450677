/*!
 * Lifecycle Simulator - Main Entry Point
 *
 * Drives a lifecycle context against the simulated host:
 * - Sign-in and device association delivered from pool threads
 * - One suspend/resume handshake while the main loop ticks
 * - Orderly exit
 */

use platform_lifecycle::{
    init_tracing, DeviceAssociationChange, DeviceId, LifecycleConfig, LifecycleContext,
    LifecycleEvent, LocalId, SimulatedHost, SimulatedUser, WindowHandle,
};
use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const FRAME: Duration = Duration::from_millis(16);
const RUN_FOR: Duration = Duration::from_millis(1500);
const MAIN_WINDOW: WindowHandle = WindowHandle(1);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    info!("Lifecycle simulator starting...");

    let config = match LifecycleConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Invalid lifecycle configuration, using defaults");
            LifecycleConfig::default()
        }
    };
    info!(resume_mode = ?config.resume_mode, "Configuration loaded");

    let host = Arc::new(SimulatedHost::new());
    let mut context = LifecycleContext::builder(host.clone())
        .with_config(config)
        .with_message_handler(|window, id| info!(window = window.0, id, "Window message"))
        .build();

    context
        .events()
        .subscribe(LifecycleEvent::Suspend, || info!("Application saving state"));
    context
        .events()
        .subscribe(LifecycleEvent::Resume, || info!("Application restoring state"));

    if let Err(e) = context.init() {
        if e.is_fatal() {
            eprintln!("{:?}", miette::Report::new(e));
            std::process::exit(-1);
        }
        return Err(e.into());
    }
    context.on_main_window_created(MAIN_WINDOW)?;

    // Host pool threads: sign-in result and a controller binding
    let pool_host = host.clone();
    tokio::task::spawn_blocking(move || {
        pool_host.complete_sign_in(SimulatedUser::new(LocalId(7)));
        pool_host.notify_device_association(DeviceAssociationChange {
            device: DeviceId::from_bytes([0x2a; 32]),
            old_user: None,
            new_user: Some(LocalId(7)),
        });
    })
    .await?;

    // Host notification thread: one suspend/resume cycle
    let plm_host = host.clone();
    let plm = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        let suspend_host = plm_host.clone();
        let started = Instant::now();
        tokio::task::spawn_blocking(move || suspend_host.notify_quiescence(true)).await?;
        info!(waited_ms = started.elapsed().as_millis() as u64, "Host suspend deferral completed");

        tokio::time::sleep(Duration::from_millis(300)).await;
        tokio::task::spawn_blocking(move || plm_host.notify_quiescence(false)).await?;
        Ok::<_, tokio::task::JoinError>(())
    });

    // Main thread: frame loop
    let context = tokio::task::spawn_blocking(move || {
        let started = Instant::now();
        let mut frames = 0u64;
        while started.elapsed() < RUN_FOR {
            let stats = context.tick();
            if stats.completions_applied > 0 || stats.completions_discarded > 0 {
                info!(
                    frame = frames,
                    applied = stats.completions_applied,
                    discarded = stats.completions_discarded,
                    sessions = context.sessions().len(),
                    "Completions applied"
                );
            }
            frames += 1;
            std::thread::sleep(FRAME);
        }
        info!(frames, handshakes = context.handshakes_completed(), "Main loop finished");
        context
    })
    .await?;

    if let Err(e) = plm.await? {
        error!(error = %e, "Host notification task failed");
    }

    if let Some(session) = context.default_session() {
        info!(
            local_id = %session.local_id(),
            devices = session.devices().len(),
            "Default session"
        );
    }
    if context.can_open_url() {
        context.open_url("ms-settings:network")?;
    }

    let mut context = context;
    context.exit();
    info!(launched = host.launched_uris().len(), "Lifecycle simulator exited");
    Ok(())
}
