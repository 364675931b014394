//! bandgate: reads bands, runs them through the kiosk chain and serves the
//! next UID to whoever asks for it on `/get_uid`.

mod config;
mod logging;
mod simulate;

use anyhow::{Context, bail};
use bandgate_core::Event;
use bandgate_core::constants::DEFAULT_READ_TIMEOUT_SECS;
use bandgate_hardware::mock::{MockAudio, MockLights, MockUidDevice};
use bandgate_hardware::{CardReader, Color, LightStrip, ReadOutcome, UidDevice};
use bandgate_kiosk::{KioskDeps, build_registry};
use bandgate_network::{RouteError, Routed, Router, ServiceClient, sync_sounds};
use clap::Parser;
use config::{Args, Config};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const STARTUP_BLINK_BRIGHTNESS: u8 = 64;
const STARTUP_BLINK_TIMES: u32 = 2;
const STARTUP_BLINK_DELAY: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(Args::parse()).context("Invalid configuration")?;
    logging::init(config.log_level, config.log_report_caller)
        .context("Failed to initialize logging")?;
    config.log_effective();

    let service =
        ServiceClient::new(config.service_config()).context("Failed to create the service client")?;

    if config.sync_sounds {
        let report = sync_sounds(&service, &config.sound_dir)
            .await
            .context("Failed to sync sounds")?;
        info!(
            downloaded = report.downloaded.len(),
            refreshed = report.refreshed.len(),
            current = report.current.len(),
            "Sounds synced"
        );
    }
    config.validate_sounds().context("Invalid configuration")?;

    if !config.simulate {
        bail!("No card reader driver is available in this build; run with --simulate");
    }

    let (device, presenter) = MockUidDevice::new();
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        if let Err(e) = simulate::feed(stdin, presenter).await {
            warn!(error = %e, "Failed to read simulated bands");
        }
    });
    let audio = Arc::new(
        MockAudio::new()
            .with_sound_dir(&config.sound_dir)
            .with_volume(config.volume_level),
    );
    let lights = Arc::new(MockLights::new(config.outer_ring_size, config.inner_ring_size));

    let registry = build_registry(&KioskDeps {
        audio,
        lights: lights.clone(),
        authorizer: Arc::new(service),
        settings: config.kiosk_settings(),
    })
    .context("Failed to build the handler chain")?;

    let router = Router::new(registry);
    let (address, server) = router
        .serve(&config.listen_addr())
        .await
        .context("Failed to start the UID bridge")?;
    debug!(address = %address, "UID bridge started");

    let reader = Arc::new(CardReader::new(device));
    let shutdown = tokio::spawn(shutdown_on_signal(
        router.clone(),
        Arc::clone(&reader),
        lights.clone(),
    ));

    startup_blink(lights).await;
    info!("Waiting for a band...");
    run(&router, &reader).await?;

    server.await.context("UID bridge task failed")?;
    shutdown.await.context("Shutdown task failed")?;
    info!("Shutdown complete");
    Ok(())
}

/// Read and route bands until the router is closed.
async fn run<D: UidDevice>(router: &Router, reader: &CardReader<D>) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS);
    while !router.is_closed() {
        let uid = match reader.read(timeout).await.context("Card reader failed")? {
            ReadOutcome::Uid(uid) => uid,
            ReadOutcome::TimedOut => continue,
            ReadOutcome::Halted => break,
        };

        match router.route(Event::new(uid)).await {
            Ok(Routed::Bridge) | Ok(Routed::Chain(_)) => {}
            Err(RouteError::Closed) => break,
            Err(e) => error!(error = %e, "Failed to process band"),
        }
    }
    Ok(())
}

async fn startup_blink(lights: Arc<MockLights>) {
    let blink = tokio::task::spawn_blocking(move || {
        lights.blink(
            Color::White,
            STARTUP_BLINK_BRIGHTNESS,
            STARTUP_BLINK_TIMES,
            STARTUP_BLINK_DELAY,
        )
    });
    match blink.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Startup blink failed"),
        Err(e) => warn!(error = %e, "Startup blink did not complete"),
    }
}

async fn shutdown_on_signal<D: UidDevice>(
    router: Router,
    reader: Arc<CardReader<D>>,
    lights: Arc<MockLights>,
) {
    let signal = wait_for_signal().await;
    debug!(signal, "Received signal, shutting down");

    router.close();
    let closed = tokio::task::spawn_blocking(move || {
        if let Err(e) = reader.close() {
            warn!(error = %e, "Failed to close the card reader");
        }
        lights.close();
    })
    .await;
    if let Err(e) = closed {
        error!(error = %e, "Failed to release devices");
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let kinds = [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
        (SignalKind::hangup(), "SIGHUP"),
        (SignalKind::quit(), "SIGQUIT"),
    ];
    let mut streams = Vec::new();
    for (kind, name) in kinds {
        match signal(kind) {
            Ok(stream) => streams.push((stream, name)),
            Err(e) => warn!(signal = name, error = %e, "Failed to install signal handler"),
        }
    }
    if streams.is_empty() {
        return ctrl_c().await;
    }

    let received = streams.iter_mut().map(|(stream, name)| {
        let name = *name;
        Box::pin(async move {
            stream.recv().await;
            name
        })
    });
    let (name, _, _) = futures::future::select_all(received).await;
    name
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    "Ctrl-C"
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandgate_dispatch::{HandlerError, HandlerRegistry, handler_fn};
    use bandgate_hardware::mock::MockUidHandle;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn failing_router(passes: Arc<AtomicUsize>) -> Router {
        let mut registry = HandlerRegistry::new();
        registry
            .register(
                1,
                handler_fn("fails", move |_, _| {
                    passes.fetch_add(1, Ordering::SeqCst);
                    Err(HandlerError::failed("service down"))
                }),
            )
            .unwrap();
        Router::new(registry)
    }

    fn spawn_run(
        router: &Router,
        reader: &Arc<CardReader<MockUidDevice>>,
    ) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        let router = router.clone();
        let reader = Arc::clone(reader);
        tokio::spawn(async move { run(&router, &reader).await })
    }

    async fn wait_for_passes(passes: &AtomicUsize, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while passes.load(Ordering::SeqCst) < expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("chain passes should run");
    }

    fn setup() -> (Arc<CardReader<MockUidDevice>>, MockUidHandle) {
        let (device, handle) = MockUidDevice::new();
        (Arc::new(CardReader::new(device)), handle)
    }

    #[tokio::test]
    async fn test_run_keeps_reading_after_chain_failure() {
        let passes = Arc::new(AtomicUsize::new(0));
        let router = failing_router(Arc::clone(&passes));
        let (reader, handle) = setup();
        let task = spawn_run(&router, &reader);

        handle.present(vec![0xAA, 0xBB, 0xCC]);
        handle.present(vec![0x11, 0x22]);
        wait_for_passes(&passes, 2).await;
        assert!(!task.is_finished());

        router.close();
        reader.close().unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("read loop should stop after close")
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(passes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_stops_when_reader_halts() {
        let passes = Arc::new(AtomicUsize::new(0));
        let router = failing_router(Arc::clone(&passes));
        let (reader, _handle) = setup();
        let task = spawn_run(&router, &reader);

        reader.close().unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("read loop should stop on halt")
            .unwrap();
        assert!(result.is_ok());
        assert!(!router.is_closed());
        assert_eq!(passes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_stops_when_router_closed() {
        let passes = Arc::new(AtomicUsize::new(0));
        let router = failing_router(Arc::clone(&passes));
        let (reader, handle) = setup();

        router.close();
        let task = spawn_run(&router, &reader);
        handle.present(vec![0x01]);

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("read loop should not start on a closed router")
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(passes.load(Ordering::SeqCst), 0);
    }
}
