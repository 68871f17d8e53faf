//! Transport-abstracted remote-call surface.
//!
//! Host application layers drive a [`Beacon`] through named method calls
//! with map-shaped payloads and receive advertising-state booleans through
//! [`Beacon::advertising_events`]. This module is the method table; wiring
//! it to a concrete channel transport is the host's concern.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorKind;
use crate::{Beacon, BeaconDescriptor, Error, Result};

/// A method invocation received from the host application layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    /// The method name, e.g. `"start"`
    pub method: String,
    /// The method payload; a map of descriptor fields for `start`
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    /// Creates a call with no arguments.
    pub fn new(method: impl Into<String>) -> Self {
        MethodCall {
            method: method.into(),
            arguments: Value::Null,
        }
    }
}

/// Dispatches one method call against `beacon`.
///
/// Methods: `start` (descriptor field map; a payload that is not a map or
/// has a missing/malformed `uuid` fails with
/// [`ErrorKind::InvalidParameter`]), `stop`, `isAdvertising` → boolean, and
/// `isTransmissionSupported` → integer status code. Unknown methods fail
/// with [`ErrorKind::NotFound`]. `start` and `stop` return null; their
/// outcomes arrive on the event stream.
pub fn dispatch(beacon: &Beacon, call: &MethodCall) -> Result<Value> {
    match call.method.as_str() {
        "start" => {
            if !call.arguments.is_object() {
                return Err(Error::with_message(
                    ErrorKind::InvalidParameter,
                    format!("arguments are not a map: {}", call.arguments),
                ));
            }
            let descriptor: BeaconDescriptor = serde_json::from_value(call.arguments.clone()).map_err(|err| {
                Error::new(
                    ErrorKind::InvalidParameter,
                    Some(Box::new(err)),
                    "invalid start arguments".to_string(),
                )
            })?;
            beacon.start(&descriptor)?;
            Ok(Value::Null)
        }
        "stop" => {
            beacon.stop();
            Ok(Value::Null)
        }
        "isAdvertising" => Ok(Value::Bool(beacon.is_advertising())),
        "isTransmissionSupported" => Ok(Value::from(beacon.check_support().status_code())),
        method => Err(Error::with_message(
            ErrorKind::NotFound,
            format!("method {method:?} is not implemented"),
        )),
    }
}
