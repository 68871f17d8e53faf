use async_trait::async_trait;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::descriptor::AdvertiseMode;
use crate::layout::AdvertisingFrame;
use crate::Result;

/// Result of the platform capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransmissionSupport {
    /// The platform can transmit beacon advertisements
    Supported,
    /// The platform cannot transmit beacon advertisements
    Unsupported(UnsupportedReason),
}

impl TransmissionSupport {
    /// Returns `true` if beacon advertising is available.
    pub fn is_supported(&self) -> bool {
        matches!(self, TransmissionSupport::Supported)
    }

    /// The integer status code reported to callers: `0` when supported,
    /// otherwise the [`UnsupportedReason`] code.
    pub fn status_code(&self) -> u8 {
        match self {
            TransmissionSupport::Supported => 0,
            TransmissionSupport::Unsupported(reason) => (*reason).into(),
        }
    }
}

/// Why beacon advertising is unavailable on this platform.
#[repr(u8)]
#[derive(
    Debug, displaydoc::Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, IntoPrimitive,
)]
pub enum UnsupportedReason {
    /// the OS version is below the minimum required for BLE advertising
    OsVersion = 1,
    /// the device has no BLE radio
    NoRadio = 2,
    /// the OS advertiser could not be acquired
    AdvertiserUnavailable = 4,
}

/// The seam between the portable [`Beacon`][crate::Beacon] controller and a
/// platform BLE stack.
///
/// Implementations are thin shims over the OS advertiser: they do not track
/// advertising state, invoke listeners, or retry. All of that lives in the
/// controller, which calls these methods from its driver task.
#[async_trait]
pub(crate) trait Transmitter: Send + Sync + 'static {
    /// Probes whether this platform can transmit beacon advertisements.
    async fn check_support(&self) -> TransmissionSupport;

    /// Resolves once the radio is powered on and able to advertise.
    async fn wait_powered_on(&self) -> Result<()>;

    /// Asks the OS to begin advertising `frame`, resolving when the OS
    /// acknowledges the request.
    async fn start_advertising(&self, frame: &AdvertisingFrame, mode: AdvertiseMode) -> Result<()>;

    /// Asks the OS to cease advertising.
    async fn stop_advertising(&self) -> Result<()>;
}
