//! Fallback for targets without a beacon advertising backend.
//!
//! The controller treats the acquisition failure the same way the Android
//! lineage treats an OS below the minimum version: the support probe reports
//! a reason code and `start` never reaches a transmitter.

use std::sync::Arc;

use crate::error::ErrorKind;
use crate::transmitter::Transmitter;
use crate::{Error, Result};

pub(crate) async fn transmitter() -> Result<Arc<dyn Transmitter>> {
    Err(Error::with_message(
        ErrorKind::NotSupported,
        "no beacon advertising backend for this platform",
    ))
}
