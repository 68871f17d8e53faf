#![warn(missing_docs)]

//! Cross-platform Bluetooth Low Energy beacon advertising.
//!
//! This crate broadcasts proximity-beacon frames (AltBeacon by default,
//! other layouts via a frame layout string) through the platform's BLE
//! stack. The goal is a *thin* abstraction: a [`Beacon`] controller owns the
//! platform transmitter and the advertising lifecycle. It builds the payload
//! from a [`BeaconDescriptor`], hands it to the OS, and reports the single
//! success/failure boolean through a listener or event stream. Receiving or
//! scanning for beacons is out of scope.
//!
//! # Usage
//!
//! ```rust,no_run
//!# use beacon_broadcast::{Beacon, BeaconDescriptor};
//!# use futures_lite::StreamExt;
//!# #[tokio::main]
//!# async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!let beacon = Beacon::new().await;
//!let mut events = beacon.advertising_events();
//!
//!let descriptor = BeaconDescriptor::new("2f234454-cf6d-4a0f-adf2-f4911ba9ffa6".parse()?);
//!beacon.start(&descriptor)?;
//!
//!if events.next().await == Some(true) {
//!    println!("advertising ({})", descriptor.uuid);
//!}
//!
//!beacon.stop();
//!#
//!#    Ok(())
//!# }
//! ```
//!
//! # Overview
//!
//! The primary pieces are:
//!
//! - [`BeaconDescriptor`]: the value object describing one advertisement:
//!   region UUID, major/minor identifiers, calibrated transmission power,
//!   duty-cycle mode, manufacturer id and frame layout, with one canonical
//!   [`defaults`] table for everything left unset.
//! - [`Beacon`]: the controller: [`start`][Beacon::start],
//!   [`stop`][Beacon::stop], the cached
//!   [`is_advertising`][Beacon::is_advertising] boolean, the
//!   [`check_support`][Beacon::check_support] capability probe, and the
//!   [`advertising_events`][Beacon::advertising_events] notification stream.
//! - [`bridge`]: a transport-abstracted method table (`start`, `stop`,
//!   `isAdvertising`, `isTransmissionSupported`) for host application
//!   layers that drive the controller through named calls with map payloads.
//!
//! # Platform specifics
//!
//! The controller semantics are portable and identical everywhere: starts
//! are deferred until the radio reports powered-on, every start outcome and
//! every stop produces exactly one notification, and a stop invalidates a
//! start the OS has not yet acknowledged. Platform code is only the shim
//! that registers and unregisters the advertisement.
//!
//! ## Linux (BlueZ)
//!
//! Advertisements are registered with `bluetoothd` through the `bluer`
//! crate, which requires the Tokio runtime. The manufacturer frame is
//! carried as manufacturer-specific data and the duty-cycle mode maps to
//! the advertising interval bounds.
//!
//! ## Other targets
//!
//! Targets without a backend report
//! [`Unsupported`][TransmissionSupport::Unsupported] from the capability
//! probe; `start` surfaces a single `false` notification without touching
//! any OS API.

pub mod bridge;
pub mod error;

mod beacon;
mod descriptor;
mod layout;
mod transmitter;

#[cfg(target_os = "linux")]
mod bluer;
#[cfg(not(target_os = "linux"))]
mod unsupported;

#[cfg(test)]
mod mock;

#[cfg(target_os = "linux")]
pub(crate) use crate::bluer as sys;
#[cfg(not(target_os = "linux"))]
pub(crate) use crate::unsupported as sys;

pub use beacon::Beacon;
pub use descriptor::{defaults, AdvertiseMode, BeaconDescriptor};
pub use error::{Error, ErrorKind};
pub use layout::{AdvertisingFrame, BeaconLayout};
pub use transmitter::{TransmissionSupport, UnsupportedReason};
pub use uuid::Uuid;

/// Convenience alias for a result with [`Error`]
pub type Result<T, E = Error> = core::result::Result<T, E>;
