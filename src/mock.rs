//! Scriptable transmitter for controller tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::descriptor::AdvertiseMode;
use crate::error::ErrorKind;
use crate::layout::AdvertisingFrame;
use crate::transmitter::{TransmissionSupport, Transmitter, UnsupportedReason};
use crate::{Error, Result};

pub(crate) struct MockTransmitter {
    support: TransmissionSupport,
    start_fails: bool,
    powered: watch::Receiver<bool>,
    pub(crate) start_calls: AtomicUsize,
    pub(crate) stop_calls: AtomicUsize,
}

impl MockTransmitter {
    fn new(support: TransmissionSupport, start_fails: bool, powered: watch::Receiver<bool>) -> Arc<Self> {
        Arc::new(MockTransmitter {
            support,
            start_fails,
            powered,
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        })
    }

    /// Powered-on transmitter that acknowledges every start.
    pub(crate) fn supported() -> Arc<Self> {
        let (_, rx) = watch::channel(true);
        Self::new(TransmissionSupport::Supported, false, rx)
    }

    /// Powered-on transmitter whose starts are rejected by the "OS".
    pub(crate) fn failing_start() -> Arc<Self> {
        let (_, rx) = watch::channel(true);
        Self::new(TransmissionSupport::Supported, true, rx)
    }

    /// Transmitter on a platform without advertising capability.
    pub(crate) fn unsupported(reason: UnsupportedReason) -> Arc<Self> {
        let (_, rx) = watch::channel(true);
        Self::new(TransmissionSupport::Unsupported(reason), false, rx)
    }

    /// Transmitter whose radio starts powered off; flip the returned sender
    /// to `true` to let a deferred start proceed.
    pub(crate) fn power_gated() -> (Arc<Self>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self::new(TransmissionSupport::Supported, false, rx), tx)
    }
}

#[async_trait]
impl Transmitter for MockTransmitter {
    async fn check_support(&self) -> TransmissionSupport {
        self.support
    }

    async fn wait_powered_on(&self) -> Result<()> {
        let mut powered = self.powered.clone();
        while !*powered.borrow() {
            if powered.changed().await.is_err() {
                return Err(ErrorKind::Internal.into());
            }
        }
        Ok(())
    }

    async fn start_advertising(&self, _frame: &AdvertisingFrame, _mode: AdvertiseMode) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.start_fails {
            Err(Error::with_message(ErrorKind::AdvertisingFailed, "mock start rejected"))
        } else {
            Ok(())
        }
    }

    async fn stop_advertising(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
