use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::descriptor::{AdvertiseMode, BeaconDescriptor};
use crate::error::ErrorKind;
use crate::layout::AdvertisingFrame;
use crate::transmitter::{TransmissionSupport, Transmitter, UnsupportedReason};
use crate::{sys, Result};

/// The advertising-state listener registered by a `start` call. At most one
/// is retained; a later `start` replaces it.
type Listener = Box<dyn FnMut(bool) + Send + 'static>;

enum Command {
    Start {
        frame: AdvertisingFrame,
        mode: AdvertiseMode,
        listener: Option<Listener>,
    },
    Stop,
    Subscribe(mpsc::UnboundedSender<bool>),
}

/// A beacon advertising controller.
///
/// One `Beacon` owns one platform transmitter for its whole lifetime. All
/// lifecycle work happens on a driver task: [`start`][Self::start] and
/// [`stop`][Self::stop] enqueue a request and return immediately, and the
/// OS's asynchronous acknowledgment re-enters the driver as a message rather
/// than mutating shared state. Outcomes are delivered through the registered
/// listener and the [`advertising_events`][Self::advertising_events] stream,
/// never through return values.
///
/// The advertising state is a single cached boolean: it becomes `true` only
/// when the OS acknowledges a start, and `false` on a start failure or any
/// `stop`. Exactly one notification is emitted per start outcome and per
/// stop call.
pub struct Beacon {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<bool>,
    support: TransmissionSupport,
}

impl std::fmt::Debug for Beacon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Beacon")
            .field("advertising", &*self.state.borrow())
            .field("support", &self.support)
            .finish()
    }
}

impl Beacon {
    /// Creates a controller for the platform's beacon transmitter.
    ///
    /// Acquiring the transmitter can fail when the platform has no usable
    /// BLE stack; that is not an error here. The failure is cached and
    /// reported by [`check_support`][Self::check_support], and any `start`
    /// surfaces a single `false` notification without reaching the OS.
    ///
    /// Must be called within a Tokio runtime, which the driver task runs on.
    pub async fn new() -> Beacon {
        let (transmitter, support) = match sys::transmitter().await {
            Ok(transmitter) => {
                let support = transmitter.check_support().await;
                (Some(transmitter), support)
            }
            Err(err) => {
                warn!("beacon transmitter unavailable: {}", err);
                let reason = match err.kind() {
                    ErrorKind::AdapterUnavailable => UnsupportedReason::NoRadio,
                    _ => UnsupportedReason::AdvertiserUnavailable,
                };
                (None, TransmissionSupport::Unsupported(reason))
            }
        };
        Beacon::spawn(transmitter, support)
    }

    #[cfg(test)]
    pub(crate) async fn with_transmitter(transmitter: Arc<dyn Transmitter>) -> Beacon {
        let support = transmitter.check_support().await;
        Beacon::spawn(Some(transmitter), support)
    }

    fn spawn(transmitter: Option<Arc<dyn Transmitter>>, support: TransmissionSupport) -> Beacon {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(false);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let driver = Driver {
            transmitter,
            support,
            state: state_tx,
            listener: None,
            sink: None,
            generation: 0,
            outcomes: outcome_tx,
        };
        tokio::spawn(driver.run(command_rx, outcome_rx));
        Beacon {
            commands,
            state,
            support,
        }
    }

    /// Begins advertising `descriptor`, clearing any registered listener.
    ///
    /// See [`start_with_listener`][Self::start_with_listener].
    pub fn start(&self, descriptor: &BeaconDescriptor) -> Result<()> {
        self.send_start(descriptor, None)
    }

    /// Begins advertising `descriptor` and registers `listener` as the
    /// single active advertising-state listener, replacing any previous one.
    ///
    /// The advertising payload is assembled synchronously, so a descriptor
    /// that does not fit its layout fails here with
    /// [`ErrorKind::InvalidParameter`] and nothing reaches the OS. The OS
    /// request itself is asynchronous: this returns immediately and the
    /// outcome arrives as exactly one boolean notification: `true` when the
    /// OS acknowledges the start, `false` when it rejects it or the platform
    /// is unsupported.
    pub fn start_with_listener(
        &self,
        descriptor: &BeaconDescriptor,
        listener: impl FnMut(bool) + Send + 'static,
    ) -> Result<()> {
        self.send_start(descriptor, Some(Box::new(listener)))
    }

    fn send_start(&self, descriptor: &BeaconDescriptor, listener: Option<Listener>) -> Result<()> {
        let frame = AdvertisingFrame::from_descriptor(descriptor)?;
        let _ = self.commands.send(Command::Start {
            frame,
            mode: descriptor.advertise_mode(),
            listener,
        });
        Ok(())
    }

    /// Ceases advertising.
    ///
    /// Always emits exactly one `false` notification, even when nothing was
    /// ever started. A start still awaiting its OS acknowledgment is
    /// invalidated: a late success can no longer flip the state back on.
    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }

    /// Returns the cached advertising state.
    ///
    /// This never queries the OS; the asynchronous acknowledgments are the
    /// only source of truth.
    pub fn is_advertising(&self) -> bool {
        *self.state.borrow()
    }

    /// Returns the capability probe result cached at construction.
    pub fn check_support(&self) -> TransmissionSupport {
        self.support
    }

    /// Subscribes to advertising-state notifications.
    ///
    /// At most one subscription is active at a time: subscribing replaces
    /// the previous sink, which stops receiving events.
    pub fn advertising_events(&self) -> impl Stream<Item = bool> + Send + Unpin {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = self.commands.send(Command::Subscribe(tx));
        UnboundedReceiverStream::new(rx)
    }
}

/// Controller phases. `Starting` covers the window between a `start` request
/// and the OS acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Starting,
    Advertising,
}

struct Driver {
    transmitter: Option<Arc<dyn Transmitter>>,
    support: TransmissionSupport,
    state: watch::Sender<bool>,
    listener: Option<Listener>,
    sink: Option<mpsc::UnboundedSender<bool>>,
    /// Bumped by every accepted start and every stop. An OS acknowledgment
    /// tagged with an older generation is stale and discarded.
    generation: u64,
    outcomes: mpsc::UnboundedSender<(u64, Result<()>)>,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut outcomes: mpsc::UnboundedReceiver<(u64, Result<()>)>,
    ) {
        let mut phase = Phase::Idle;
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Start { frame, mode, listener }) => phase = self.handle_start(frame, mode, listener),
                    Some(Command::Stop) => phase = self.handle_stop(),
                    Some(Command::Subscribe(sink)) => self.sink = Some(sink),
                    None => break,
                },
                Some((generation, result)) = outcomes.recv() => {
                    phase = self.handle_outcome(phase, generation, result);
                }
            }
        }

        // All handles dropped; cease advertising before the transmitter goes.
        if phase != Phase::Idle {
            if let Some(transmitter) = self.transmitter.take() {
                tokio::spawn(async move {
                    let _ = transmitter.stop_advertising().await;
                });
            }
        }
    }

    fn handle_start(&mut self, frame: AdvertisingFrame, mode: AdvertiseMode, listener: Option<Listener>) -> Phase {
        self.listener = listener;

        let transmitter = if self.support.is_supported() {
            self.transmitter.clone()
        } else {
            None
        };
        let Some(transmitter) = transmitter else {
            debug!("start requested on an unsupported platform");
            self.notify(false);
            return Phase::Idle;
        };

        self.generation += 1;
        let generation = self.generation;
        let outcomes = self.outcomes.clone();
        debug!(generation, "requesting advertising start");
        tokio::spawn(async move {
            // A radio that is not yet powered on defers the start; the
            // request is issued once, after power-on, not retried.
            let result = async {
                transmitter.wait_powered_on().await?;
                transmitter.start_advertising(&frame, mode).await
            }
            .await;
            let _ = outcomes.send((generation, result));
        });
        Phase::Starting
    }

    fn handle_stop(&mut self) -> Phase {
        // Invalidates any start still awaiting acknowledgment.
        self.generation += 1;
        if let Some(transmitter) = self.transmitter.clone() {
            tokio::spawn(async move {
                if let Err(err) = transmitter.stop_advertising().await {
                    warn!("advertising stop failed: {}", err);
                }
            });
        }
        self.notify(false);
        Phase::Idle
    }

    fn handle_outcome(&mut self, phase: Phase, generation: u64, result: Result<()>) -> Phase {
        if generation != self.generation {
            debug!(generation, "discarding stale advertising acknowledgment");
            return phase;
        }
        match result {
            Ok(()) => {
                debug!("advertising started");
                self.notify(true);
                Phase::Advertising
            }
            Err(err) => {
                warn!("advertising start failed: {}", err);
                self.notify(false);
                Phase::Idle
            }
        }
    }

    fn notify(&mut self, advertising: bool) {
        self.state.send_replace(advertising);
        if let Some(listener) = &mut self.listener {
            listener(advertising);
        }
        if self.sink.as_ref().map_or(false, |sink| sink.send(advertising).is_err()) {
            self.sink = None;
        }
    }
}
