use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Advertising duty-cycle mode, mirroring the OS advertising mode enums.
///
/// Wire-encoded as the integers `0`/`1`/`2` accepted from callers.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, IntoPrimitive, Serialize,
    Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum AdvertiseMode {
    /// Longest advertising interval, lowest power consumption
    LowPower = 0,
    /// Balanced interval and power consumption
    #[default]
    Balanced = 1,
    /// Shortest advertising interval, highest power consumption
    LowLatency = 2,
}

/// Canonical defaults for unset [`BeaconDescriptor`] fields.
///
/// Kept in one table so every field has exactly one documented default.
pub mod defaults {
    use super::AdvertiseMode;

    /// Default major identifier
    pub const MAJOR_ID: u16 = 1;
    /// Default minor identifier
    pub const MINOR_ID: u16 = 2;
    /// Default calibrated transmission power at 1m, in dBm
    pub const TRANSMISSION_POWER: i8 = -59;
    /// Default manufacturer company identifier (AltBeacon's assigned id)
    pub const MANUFACTURER_ID: u16 = 0x0118;
    /// Default beacon frame layout (AltBeacon)
    pub const LAYOUT: &str = "m:2-3=beac,i:4-19,i:20-21,i:22-23,p:24-24,d:25-25";
    /// Default advertising mode
    pub const ADVERTISE_MODE: AdvertiseMode = AdvertiseMode::Balanced;
    /// Default extra data fields
    pub const EXTRA_DATA: &[u8] = &[0];
}

/// Describes one beacon advertisement to broadcast.
///
/// A descriptor is a plain value: it is built fresh for every
/// [`start`][crate::Beacon::start] call and has no lifecycle of its own. Only
/// the region `uuid` is required; every other field falls back to the
/// [`defaults`] table. The `uuid` field being a [`Uuid`] guarantees a
/// descriptor never holds an unparseable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconDescriptor {
    /// The region/proximity identifier
    pub uuid: Uuid,
    /// First 16-bit sub-identifier within the region
    #[serde(default)]
    pub major_id: Option<u16>,
    /// Second 16-bit sub-identifier within the region
    #[serde(default)]
    pub minor_id: Option<u16>,
    /// Calibrated signal strength at 1m, in dBm
    #[serde(default)]
    pub transmission_power: Option<i8>,
    /// Advertising duty-cycle mode
    #[serde(default)]
    pub advertise_mode: Option<AdvertiseMode>,
    /// Beacon frame layout string, e.g. [`defaults::LAYOUT`]
    #[serde(default)]
    pub layout: Option<String>,
    /// BLE manufacturer company identifier
    #[serde(default)]
    pub manufacturer_id: Option<u16>,
    /// Additional single-byte data fields for layouts that carry them
    #[serde(default)]
    pub extra_data: Option<Vec<u8>>,
    /// Region identifier label (used by CoreLocation-style backends)
    #[serde(default)]
    pub identifier: Option<String>,
}

impl BeaconDescriptor {
    /// Creates a descriptor broadcasting `uuid` with every other field at its default.
    pub fn new(uuid: Uuid) -> Self {
        BeaconDescriptor {
            uuid,
            major_id: None,
            minor_id: None,
            transmission_power: None,
            advertise_mode: None,
            layout: None,
            manufacturer_id: None,
            extra_data: None,
            identifier: None,
        }
    }

    /// The advertising mode to request, with the default applied.
    pub fn advertise_mode(&self) -> AdvertiseMode {
        self.advertise_mode.unwrap_or(defaults::ADVERTISE_MODE)
    }
}
