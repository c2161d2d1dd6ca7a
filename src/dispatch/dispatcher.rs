use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use statum::{machine, state};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::device::{Category, EventSource, RawEvent, SourceError};
use crate::dispatch::latency::{LatencyAggregator, LatencyReport};
use crate::normalize::{CalibrationProfile, Normalizer};
use crate::protocol::{Encoder, Framing, PROTOCOL_VERSION};
use crate::transport::PacketSink;

// Dispatcher settings
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DispatchSettings {
    /// Upper bound for one readiness wait
    pub poll_timeout_ms: u64,
    /// Pause after an unexpected pull failure
    pub error_backoff_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 100,
            error_backoff_ms: 100,
        }
    }
}

impl DispatchSettings {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.poll_timeout_ms == 0 {
            return Err(DispatchError::InitializationError(
                "poll_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// Dispatcher errors
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to initialize dispatcher: {0}")]
    InitializationError(String),
}

// Why the run loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Interrupted,
    DeviceLost(String),
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Interrupted => write!(f, "interrupted by operator"),
            ShutdownReason::DeviceLost(reason) => write!(f, "device lost ({})", reason),
        }
    }
}

// Result of a single tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    // Wait elapsed or the pull would block
    Idle,
    Dispatched { category: Category, delivered: bool },
    Recovered,
    Shutdown(ShutdownReason),
}

// Define dispatcher states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum DispatchState {
    Init,
    Running,
    Draining(ShutdownReason),
    Stopped(LatencyReport),
}

#[machine]
pub struct Dispatcher<S: DispatchState> {
    // Device events
    source: Box<dyn EventSource>,

    // Outgoing datagrams
    sink: Box<dyn PacketSink>,

    normalizer: Normalizer,
    encoder: Encoder,

    // Per-category latency sums, only touched while running
    aggregator: LatencyAggregator,

    settings: DispatchSettings,

    // Cooperative shutdown, observed between ticks
    cancel: CancellationToken,
}

// Implementation of methods available in all states
impl<S: DispatchState> Dispatcher<S> {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

// Implementation for Init state
impl Dispatcher<Init> {
    pub fn create(
        source: Box<dyn EventSource>,
        sink: Box<dyn PacketSink>,
        profile: CalibrationProfile,
        framing: Framing,
        settings: Option<DispatchSettings>,
        cancel: CancellationToken,
    ) -> Result<Self, DispatchError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Dispatcher with settings: {:?}", settings);

        settings.validate()?;
        profile.validate().map_err(|e| {
            error!("Rejecting calibration profile: {}", e);
            DispatchError::InitializationError(e.to_string())
        })?;
        debug!("Calibration profile: {:?}", profile);

        info!("Dispatcher created for {}", source.describe());
        Ok(Self::new(
            source,
            sink,
            Normalizer::new(profile),
            Encoder::new(framing),
            LatencyAggregator::new(),
            settings,
            cancel,
        ))
    }

    // Transition to Running state
    pub fn start(self) -> Dispatcher<Running> {
        info!(
            "Starting event loop (protocol v{}, {:?} framing, {} ms poll timeout)",
            PROTOCOL_VERSION,
            self.encoder.framing(),
            self.settings.poll_timeout_ms
        );
        self.transition()
    }
}

// Implementation for Running state
impl Dispatcher<Running> {
    /// Waits for at most one poll timeout and handles at most one event.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.cancel.is_cancelled() {
            return TickOutcome::Shutdown(ShutdownReason::Interrupted);
        }

        let poll_timeout = self.settings.poll_timeout();
        let pulled = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            res = tokio::time::timeout(poll_timeout, self.source.next_event()) => Some(res),
        };

        let Some(pulled) = pulled else {
            info!("Shutdown requested while waiting for events");
            return TickOutcome::Shutdown(ShutdownReason::Interrupted);
        };

        match pulled {
            Err(_) => {
                debug!("No event within {} ms", self.settings.poll_timeout_ms);
                TickOutcome::Idle
            }
            Ok(Ok(raw)) => self.dispatch(raw),
            Ok(Err(SourceError::WouldBlock)) => {
                debug!("Event pull would block, retrying next tick");
                TickOutcome::Idle
            }
            Ok(Err(e)) if e.is_fatal() => {
                error!("Event source failed: {}", e);
                TickOutcome::Shutdown(ShutdownReason::DeviceLost(e.to_string()))
            }
            Ok(Err(e)) => {
                error!("Error pulling event: {}", e);
                tokio::time::sleep(self.settings.error_backoff()).await;
                TickOutcome::Recovered
            }
        }
    }

    // Normalize, encode and send one event, timing the whole path
    fn dispatch(&mut self, raw: RawEvent) -> TickOutcome {
        let category = raw.category();
        let started = Instant::now();

        let delivered = match self.normalizer.normalize(&raw) {
            Some(event) => {
                let datagram = self.encoder.encode(&event);
                match self.sink.send(datagram.as_bytes()) {
                    Ok(_) => true,
                    Err(e) => {
                        debug!("Dropped {}: {}", datagram, e);
                        self.aggregator.record_dropped_send();
                        false
                    }
                }
            }
            None => {
                debug!("No datagram for {:?}", raw);
                false
            }
        };

        self.aggregator.record(category, started.elapsed());
        TickOutcome::Dispatched {
            category,
            delivered,
        }
    }

    // Tick until shutdown, then transition to Draining
    pub async fn run(mut self) -> Dispatcher<Draining> {
        info!("Entering main event loop");
        let reason = loop {
            if let TickOutcome::Shutdown(reason) = self.tick().await {
                break reason;
            }
        };

        info!("Event loop stopped: {}", reason);
        self.transition_with(reason)
    }
}

// Implementation for Draining state
impl Dispatcher<Draining> {
    pub fn shutdown_reason(&self) -> Option<&ShutdownReason> {
        self.get_state_data()
    }

    // Close the socket, summarize latencies and transition to Stopped
    pub fn drain(mut self) -> Dispatcher<Stopped> {
        debug!("Draining dispatcher");
        self.sink.close();

        let report = self.aggregator.summarize();
        info!("{}", report);
        self.transition_with(report)
    }
}

// Implementation for Stopped state
impl Dispatcher<Stopped> {
    pub fn report(&self) -> Option<&LatencyReport> {
        self.get_state_data()
    }
}

/// Drives a dispatcher through its whole lifecycle.
pub async fn run_dispatcher(dispatcher: Dispatcher<Init>) -> (ShutdownReason, LatencyReport) {
    let draining = dispatcher.start().run().await;
    let reason = draining
        .shutdown_reason()
        .cloned()
        .unwrap_or(ShutdownReason::Interrupted);

    let stopped = draining.drain();
    let report = match stopped.report() {
        Some(report) => report.clone(),
        None => LatencyAggregator::new().summarize(),
    };
    (reason, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SourceFuture;
    use crate::protocol::button::codes;
    use crate::protocol::{decode, ButtonEvent, ButtonState, Frame, WiimoteButton};
    use crate::transport::TransportError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct ScriptedSource {
        script: VecDeque<Result<RawEvent, SourceError>>,
        // Wait forever once the script is exhausted instead of disconnecting
        idle_when_empty: bool,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<RawEvent, SourceError>>, idle_when_empty: bool) -> Self {
            Self {
                script: script.into(),
                idle_when_empty,
            }
        }
    }

    impl EventSource for ScriptedSource {
        fn next_event(&mut self) -> SourceFuture<'_> {
            Box::pin(async move {
                match self.script.pop_front() {
                    Some(item) => item,
                    None if self.idle_when_empty => std::future::pending().await,
                    None => Err(SourceError::Disconnected("script exhausted".to_string())),
                }
            })
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        closed: Arc<AtomicBool>,
        failing: bool,
    }

    impl RecordingSink {
        fn datagrams(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl PacketSink for RecordingSink {
        fn send(&mut self, datagram: &[u8]) -> Result<usize, TransportError> {
            if self.failing {
                return Err(TransportError::SendError("unreachable".to_string()));
            }
            self.sent.lock().unwrap().push(datagram.to_vec());
            Ok(datagram.len())
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn fast_settings() -> Option<DispatchSettings> {
        Some(DispatchSettings {
            poll_timeout_ms: 10,
            error_backoff_ms: 5,
        })
    }

    fn dispatcher(
        source: ScriptedSource,
        sink: RecordingSink,
        cancel: CancellationToken,
    ) -> Dispatcher<Init> {
        Dispatcher::create(
            Box::new(source),
            Box::new(sink),
            CalibrationProfile::emulator(),
            Framing::Legacy,
            fast_settings(),
            cancel,
        )
        .unwrap()
    }

    fn accel(x: i32) -> RawEvent {
        RawEvent::Accel {
            channel: 0,
            axes: [Some(x), Some(0), Some(0)],
        }
    }

    fn key(code: u16, state: i32) -> RawEvent {
        RawEvent::Key { code, state }
    }

    #[tokio::test]
    async fn every_event_is_sent_once_in_order() {
        let script = vec![
            Ok(accel(0)),
            Ok(RawEvent::Ir {
                channel: 0,
                axes: [Some(1023), Some(767), Some(1023)],
            }),
            Ok(key(codes::BTN_A, 1)),
            Ok(key(codes::BTN_A, 0)),
            Ok(accel(-512)),
        ];
        let sink = RecordingSink::default();
        let dispatcher = dispatcher(
            ScriptedSource::new(script, false),
            sink.clone(),
            CancellationToken::new(),
        );

        let (reason, report) = run_dispatcher(dispatcher).await;

        assert!(matches!(reason, ShutdownReason::DeviceLost(_)));
        let frames: Vec<Frame> = sink
            .datagrams()
            .iter()
            .map(|datagram| decode(datagram).unwrap())
            .collect();
        assert_eq!(
            frames,
            vec![
                Frame::Accel([512.0, 512.0, 512.0]),
                Frame::Ir([0.0, 0.0, 0.0]),
                Frame::Button(ButtonEvent {
                    button: WiimoteButton::A,
                    state: ButtonState::Pressed
                }),
                Frame::Button(ButtonEvent {
                    button: WiimoteButton::A,
                    state: ButtonState::Released
                }),
                Frame::Accel([0.0, 512.0, 512.0]),
            ]
        );
        assert_eq!(sink.datagrams()[2], b"button 1 WIIMOTE_A".to_vec());

        assert_eq!(report.get(Category::Accel).count, 2);
        assert_eq!(report.get(Category::Ir).count, 1);
        assert_eq!(report.get(Category::Key).count, 2);
        assert_eq!(report.dropped_sends, 0);
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn interrupt_before_first_tick_yields_empty_summary() {
        let cancel = CancellationToken::new();
        let sink = RecordingSink::default();
        let dispatcher = dispatcher(
            ScriptedSource::new(vec![Ok(accel(1))], false),
            sink.clone(),
            cancel.clone(),
        );

        cancel.cancel();
        let (reason, report) = run_dispatcher(dispatcher).await;

        assert_eq!(reason, ShutdownReason::Interrupted);
        assert_eq!(report.total_events(), 0);
        for category in Category::ALL {
            assert_eq!(report.get(category).mean_us, 0.0);
        }
        assert!(sink.datagrams().is_empty());
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn interrupt_while_waiting_stops_the_loop() {
        let dispatcher = dispatcher(
            ScriptedSource::new(vec![], true),
            RecordingSink::default(),
            CancellationToken::new(),
        );

        let trigger = dispatcher.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let (reason, report) =
            tokio::time::timeout(Duration::from_secs(2), run_dispatcher(dispatcher))
                .await
                .expect("dispatcher did not observe cancellation");
        assert_eq!(reason, ShutdownReason::Interrupted);
        assert_eq!(report.total_events(), 0);
    }

    #[tokio::test]
    async fn timeouts_and_would_block_are_idle_ticks() {
        let mut running = dispatcher(
            ScriptedSource::new(vec![Err(SourceError::WouldBlock)], true),
            RecordingSink::default(),
            CancellationToken::new(),
        )
        .start();

        assert_eq!(running.tick().await, TickOutcome::Idle);
        assert_eq!(running.tick().await, TickOutcome::Idle);
        assert_eq!(running.aggregator.count(Category::Accel), 0);
        assert_eq!(running.aggregator.count(Category::Key), 0);
    }

    #[tokio::test]
    async fn read_errors_pause_and_continue() {
        let sink = RecordingSink::default();
        let dispatcher = dispatcher(
            ScriptedSource::new(
                vec![
                    Err(SourceError::ReadError("short read".to_string())),
                    Ok(accel(3)),
                ],
                false,
            ),
            sink.clone(),
            CancellationToken::new(),
        );

        let mut running = dispatcher.start();
        assert_eq!(running.tick().await, TickOutcome::Recovered);
        assert_eq!(
            running.tick().await,
            TickOutcome::Dispatched {
                category: Category::Accel,
                delivered: true
            }
        );
        assert!(matches!(
            running.tick().await,
            TickOutcome::Shutdown(ShutdownReason::DeviceLost(_))
        ));
        assert_eq!(sink.datagrams().len(), 1);
    }

    #[tokio::test]
    async fn unmapped_keys_are_timed_but_not_sent() {
        let sink = RecordingSink::default();
        let dispatcher = dispatcher(
            ScriptedSource::new(vec![Ok(key(0x2ff, 1)), Ok(key(codes::BTN_B, 2))], false),
            sink.clone(),
            CancellationToken::new(),
        );

        let (_, report) = run_dispatcher(dispatcher).await;

        assert!(sink.datagrams().is_empty());
        assert_eq!(report.get(Category::Key).count, 2);
        assert_eq!(report.dropped_sends, 0);
    }

    #[tokio::test]
    async fn failed_sends_are_counted_not_retried() {
        let sink = RecordingSink {
            failing: true,
            ..Default::default()
        };
        let dispatcher = dispatcher(
            ScriptedSource::new(vec![Ok(accel(1)), Ok(key(codes::BTN_1, 1))], false),
            sink.clone(),
            CancellationToken::new(),
        );

        let (_, report) = run_dispatcher(dispatcher).await;

        assert_eq!(report.dropped_sends, 2);
        assert_eq!(report.total_events(), 2);
    }

    #[test]
    fn invalid_profile_is_rejected_at_init() {
        let mut profile = CalibrationProfile::emulator();
        profile.accel.scale = 0.0;

        let result = Dispatcher::create(
            Box::new(ScriptedSource::new(vec![], true)),
            Box::new(RecordingSink::default()),
            profile,
            Framing::Legacy,
            None,
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(DispatchError::InitializationError(_))));
    }

    #[test]
    fn zero_poll_timeout_is_rejected() {
        let result = Dispatcher::create(
            Box::new(ScriptedSource::new(vec![], true)),
            Box::new(RecordingSink::default()),
            CalibrationProfile::emulator(),
            Framing::Tagged,
            Some(DispatchSettings {
                poll_timeout_ms: 0,
                error_backoff_ms: 0,
            }),
            CancellationToken::new(),
        );
        assert!(result.is_err());
    }
}
