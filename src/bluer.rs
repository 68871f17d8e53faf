//! BlueZ beacon transmitter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bluer::adv::{Advertisement, AdvertisementHandle, Type};
use bluer::AdapterProperty;
use tokio::sync::Mutex;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::descriptor::AdvertiseMode;
use crate::error::ErrorKind;
use crate::layout::AdvertisingFrame;
use crate::transmitter::{TransmissionSupport, Transmitter, UnsupportedReason};
use crate::{Error, Result};

impl From<bluer::Error> for Error {
    fn from(err: bluer::Error) -> Self {
        Error::new(kind_from_bluer(&err), Some(Box::new(err)), String::new())
    }
}

fn kind_from_bluer(err: &bluer::Error) -> ErrorKind {
    match err.kind {
        bluer::ErrorKind::InvalidArguments => ErrorKind::InvalidParameter,
        bluer::ErrorKind::InvalidLength => ErrorKind::InvalidParameter,
        bluer::ErrorKind::NotReady => ErrorKind::AdapterUnavailable,
        bluer::ErrorKind::NotSupported => ErrorKind::NotSupported,
        bluer::ErrorKind::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::Other,
    }
}

/// Acquires the system's default Bluetooth adapter as a beacon transmitter.
pub(crate) async fn transmitter() -> Result<Arc<dyn Transmitter>> {
    let session = bluer::Session::new().await?;
    let adapter = session.default_adapter().await?;
    debug!("using Bluetooth adapter {}", adapter.name());
    Ok(Arc::new(TransmitterImpl {
        adapter,
        handle: Mutex::new(None),
    }))
}

struct TransmitterImpl {
    adapter: bluer::Adapter,
    /// Registration handle for the active advertisement; dropping it asks
    /// bluetoothd to cease advertising.
    handle: Mutex<Option<AdvertisementHandle>>,
}

/// Advertising interval bounds for each duty-cycle mode, mirroring the
/// OS-level low-power/balanced/low-latency settings.
fn advertising_interval(mode: AdvertiseMode) -> (Duration, Duration) {
    match mode {
        AdvertiseMode::LowPower => (Duration::from_millis(1000), Duration::from_millis(1200)),
        AdvertiseMode::Balanced => (Duration::from_millis(250), Duration::from_millis(400)),
        AdvertiseMode::LowLatency => (Duration::from_millis(100), Duration::from_millis(150)),
    }
}

#[async_trait]
impl Transmitter for TransmitterImpl {
    async fn check_support(&self) -> TransmissionSupport {
        // A powered-off radio is not "unsupported"; starts wait for power.
        // Failing to read the property at all means there is no usable radio.
        match self.adapter.is_powered().await {
            Ok(_) => TransmissionSupport::Supported,
            Err(_) => TransmissionSupport::Unsupported(UnsupportedReason::NoRadio),
        }
    }

    async fn wait_powered_on(&self) -> Result<()> {
        let mut events = Box::pin(self.adapter.events().await?);
        if self.adapter.is_powered().await? {
            return Ok(());
        }
        while let Some(event) = events.next().await {
            if matches!(
                event,
                bluer::AdapterEvent::PropertyChanged(AdapterProperty::Powered(true))
            ) {
                return Ok(());
            }
        }
        Err(Error::with_message(
            ErrorKind::Internal,
            "adapter event stream closed unexpectedly",
        ))
    }

    async fn start_advertising(&self, frame: &AdvertisingFrame, mode: AdvertiseMode) -> Result<()> {
        let (min_interval, max_interval) = advertising_interval(mode);
        let advertisement = Advertisement {
            advertisement_type: Type::Broadcast,
            manufacturer_data: [(frame.company_id, frame.data.clone())].into_iter().collect(),
            min_interval: Some(min_interval),
            max_interval: Some(max_interval),
            ..Default::default()
        };

        let handle = self.adapter.advertise(advertisement).await.map_err(|err| {
            Error::new(
                ErrorKind::AdvertisingFailed,
                Some(Box::new(err)),
                "bluetoothd rejected the advertisement".to_string(),
            )
        })?;
        *self.handle.lock().await = Some(handle);
        debug!(company_id = frame.company_id, "beacon advertisement registered");
        Ok(())
    }

    async fn stop_advertising(&self) -> Result<()> {
        if self.handle.lock().await.take().is_some() {
            debug!("beacon advertisement unregistered");
        }
        Ok(())
    }
}
