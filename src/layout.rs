//! Beacon frame layouts.
//!
//! A layout string describes which bytes of the manufacturer-specific
//! advertising structure carry which beacon fields, in the AltBeacon parser
//! notation: comma-separated terms of the form `m:<start>-<end>=<hex>`
//! (matcher bytes identifying the frame type), `i:<start>-<end>` (identifier
//! fields, filled with UUID/major/minor in order), `p:<start>-<end>` (the
//! calibrated power byte) and `d:<start>-<end>` (extra data fields). Offsets
//! index the manufacturer structure, whose first two bytes are the company
//! identifier.

use uuid::Uuid;

use crate::descriptor::{defaults, BeaconDescriptor};
use crate::error::ErrorKind;
use crate::{Error, Result};

/// The assembled manufacturer-specific advertising payload for one beacon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingFrame {
    /// BLE company identifier carried in the manufacturer structure
    pub company_id: u16,
    /// Payload bytes following the company identifier
    pub data: Vec<u8>,
}

impl AdvertisingFrame {
    /// Builds the advertising payload for `descriptor`, applying the
    /// [`defaults`] table to every unset field.
    ///
    /// Fails with [`ErrorKind::InvalidParameter`] if the descriptor's layout
    /// string is malformed or its values do not fit the layout's fields.
    pub fn from_descriptor(descriptor: &BeaconDescriptor) -> Result<AdvertisingFrame> {
        let layout = match &descriptor.layout {
            Some(s) => BeaconLayout::parse(s)?,
            None => BeaconLayout::parse(defaults::LAYOUT)?,
        };
        layout.assemble(descriptor)
    }
}

/// Largest usable field offset: the on-air advertising payload tops out at
/// 31 bytes, so bytes past this offset can never be transmitted.
const MAX_FIELD_OFFSET: usize = 28;

/// Inclusive byte range within the manufacturer structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

impl Span {
    fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// A parsed beacon frame layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconLayout {
    matchers: Vec<(Span, Vec<u8>)>,
    identifiers: Vec<Span>,
    power: Option<Span>,
    data_fields: Vec<Span>,
}

impl BeaconLayout {
    /// Parses a layout string such as [`defaults::LAYOUT`].
    pub fn parse(layout: &str) -> Result<BeaconLayout> {
        let mut parsed = BeaconLayout {
            matchers: Vec::new(),
            identifiers: Vec::new(),
            power: None,
            data_fields: Vec::new(),
        };
        // Occupancy bitmap over the frame bytes; fields may not overlap.
        let mut occupied = 0u64;

        for term in layout.split(',') {
            let (kind, rest) = term
                .split_once(':')
                .ok_or_else(|| invalid_layout(term, "missing ':'"))?;
            let (range, value) = match rest.split_once('=') {
                Some((range, value)) => (range, Some(value)),
                None => (rest, None),
            };
            let (start, end) = range
                .split_once('-')
                .ok_or_else(|| invalid_layout(term, "missing byte range"))?;
            let span = Span {
                start: parse_offset(start, term)?,
                end: parse_offset(end, term)?,
            };
            if span.end < span.start {
                return Err(invalid_layout(term, "end offset before start offset"));
            }
            // The first two bytes of the manufacturer structure are the
            // company identifier and cannot be claimed by a field.
            if span.start < 2 {
                return Err(invalid_layout(term, "field overlaps the manufacturer id"));
            }
            if span.end > MAX_FIELD_OFFSET {
                return Err(invalid_layout(term, "field extends past the advertising payload"));
            }
            let mask = ((1u64 << span.len()) - 1) << span.start;
            if occupied & mask != 0 {
                return Err(invalid_layout(term, "field overlaps an earlier field"));
            }
            occupied |= mask;

            match (kind, value) {
                ("m", Some(hex)) => {
                    let bytes = parse_hex(hex, term)?;
                    if bytes.len() != span.len() {
                        return Err(invalid_layout(term, "matcher value does not fill its range"));
                    }
                    parsed.matchers.push((span, bytes));
                }
                ("i", None) => parsed.identifiers.push(span),
                ("p", None) => {
                    if span.len() != 1 {
                        return Err(invalid_layout(term, "power field must be a single byte"));
                    }
                    parsed.power = Some(span);
                }
                ("d", None) => {
                    if span.len() != 1 {
                        return Err(invalid_layout(term, "data field must be a single byte"));
                    }
                    parsed.data_fields.push(span);
                }
                _ => return Err(invalid_layout(term, "unrecognized term")),
            }
        }

        Ok(parsed)
    }

    /// Fills this layout's fields from `descriptor` and returns the frame.
    pub fn assemble(&self, descriptor: &BeaconDescriptor) -> Result<AdvertisingFrame> {
        let len = self
            .matchers
            .iter()
            .map(|(span, _)| span.end)
            .chain(self.identifiers.iter().map(|span| span.end))
            .chain(self.power.iter().map(|span| span.end))
            .chain(self.data_fields.iter().map(|span| span.end))
            .max()
            .ok_or_else(|| Error::with_message(ErrorKind::InvalidParameter, "layout has no fields"))?
            + 1;
        let mut frame = vec![0u8; len];

        for (span, bytes) in &self.matchers {
            frame[span.start..=span.end].copy_from_slice(bytes);
        }

        // Values the caller set explicitly must land in a field; values
        // filled from the defaults table may be dropped by shorter layouts.
        let explicit = [
            ("uuid", true),
            ("major", descriptor.major_id.is_some()),
            ("minor", descriptor.minor_id.is_some()),
        ];
        for (index, (name, set)) in explicit.iter().enumerate() {
            if *set && self.identifiers.len() <= index {
                return Err(Error::with_message(
                    ErrorKind::InvalidParameter,
                    format!("the {name} identifier has no field in the layout"),
                ));
            }
        }

        let identifiers: [Vec<u8>; 3] = [
            identifier_bytes(descriptor.uuid),
            descriptor.major_id.unwrap_or(defaults::MAJOR_ID).to_be_bytes().to_vec(),
            descriptor.minor_id.unwrap_or(defaults::MINOR_ID).to_be_bytes().to_vec(),
        ];
        for (span, value) in self.identifiers.iter().zip(identifiers.iter()) {
            if value.len() > span.len() {
                return Err(Error::with_message(
                    ErrorKind::InvalidParameter,
                    format!("identifier value of {} bytes does not fit a {}-byte field", value.len(), span.len()),
                ));
            }
            // Right-align short values, leaving high bytes zero.
            let start = span.start + (span.len() - value.len());
            frame[start..=span.end].copy_from_slice(value);
        }

        if let Some(span) = self.power {
            let power = descriptor.transmission_power.unwrap_or(defaults::TRANSMISSION_POWER);
            frame[span.start] = power as u8;
        }

        // The fit check applies to caller-provided extra data only; the
        // default byte is simply skipped by layouts without data fields.
        if let Some(extra) = &descriptor.extra_data {
            if extra.len() > self.data_fields.len() {
                return Err(Error::with_message(
                    ErrorKind::InvalidParameter,
                    format!("{} extra data values but the layout has {} data fields", extra.len(), self.data_fields.len()),
                ));
            }
        }
        let extra = descriptor.extra_data.as_deref().unwrap_or(defaults::EXTRA_DATA);
        for (span, byte) in self.data_fields.iter().zip(extra.iter()) {
            frame[span.start] = *byte;
        }

        Ok(AdvertisingFrame {
            company_id: descriptor.manufacturer_id.unwrap_or(defaults::MANUFACTURER_ID),
            data: frame.split_off(2),
        })
    }
}

fn identifier_bytes(uuid: Uuid) -> Vec<u8> {
    uuid.as_bytes().to_vec()
}

fn parse_offset(s: &str, term: &str) -> Result<usize> {
    s.parse()
        .map_err(|_| invalid_layout(term, "byte offset is not a number"))
}

fn parse_hex(hex: &str, term: &str) -> Result<Vec<u8>> {
    // Byte-offset slicing below is only sound on ASCII input.
    if !hex.is_ascii() || hex.is_empty() || hex.len() % 2 != 0 {
        return Err(invalid_layout(term, "matcher value is not whole hex bytes"));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid_layout(term, "matcher value is not hex")))
        .collect()
}

fn invalid_layout(term: &str, reason: &str) -> Error {
    Error::with_message(ErrorKind::InvalidParameter, format!("layout term {term:?}: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "2f234454-cf6d-4a0f-adf2-f4911ba9ffa6";

    fn descriptor() -> BeaconDescriptor {
        BeaconDescriptor::new(UUID.parse().unwrap())
    }

    #[test]
    fn altbeacon_frame_offsets() {
        let frame = AdvertisingFrame::from_descriptor(&descriptor()).unwrap();

        assert_eq!(frame.company_id, 0x0118);
        assert_eq!(frame.data.len(), 24);
        // Beacon type code at manufacturer offsets 2-3, i.e. payload 0-1.
        assert_eq!(&frame.data[0..2], &[0xbe, 0xac]);
        assert_eq!(&frame.data[2..18], "2f234454cf6d4a0fadf2f4911ba9ffa6".as_bytes_hex());
        // Default major 1, minor 2, big-endian.
        assert_eq!(&frame.data[18..20], &[0x00, 0x01]);
        assert_eq!(&frame.data[20..22], &[0x00, 0x02]);
        // Default tx power -59 dBm.
        assert_eq!(frame.data[22], (-59i8) as u8);
        // Single default data field.
        assert_eq!(frame.data[23], 0);
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let mut d = descriptor();
        d.major_id = Some(0x1234);
        d.minor_id = Some(0x5678);
        d.transmission_power = Some(-70);
        d.manufacturer_id = Some(0x004c);
        d.extra_data = Some(vec![0x2a]);

        let frame = AdvertisingFrame::from_descriptor(&d).unwrap();
        assert_eq!(frame.company_id, 0x004c);
        assert_eq!(&frame.data[18..20], &[0x12, 0x34]);
        assert_eq!(&frame.data[20..22], &[0x56, 0x78]);
        assert_eq!(frame.data[22], (-70i8) as u8);
        assert_eq!(frame.data[23], 0x2a);
    }

    #[test]
    fn malformed_layouts_are_rejected() {
        for layout in [
            "",
            "m:2-3",             // matcher without value
            "m:2-3=be",          // matcher value too short for its range
            "m:2-3=xyzw,i:4-19", // not hex
            "i:19-4",            // inverted range
            "i:0-15",            // overlaps the manufacturer id
            "q:4-19",            // unknown kind
            "p:24-25",           // power wider than one byte
        ] {
            let mut d = descriptor();
            d.layout = Some(layout.to_string());
            let err = AdvertisingFrame::from_descriptor(&d).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter, "layout {layout:?}");
        }
    }

    #[test]
    fn non_ascii_matcher_value_is_rejected() {
        let mut d = descriptor();
        // Four bytes but not four ASCII characters; must fail, not panic.
        d.layout = Some("m:2-5=aéc,i:6-21".to_string());
        let err = AdvertisingFrame::from_descriptor(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn oversized_offsets_are_rejected() {
        for layout in ["i:4-18446744073709551615", "i:4-999999999", "i:4-29"] {
            let mut d = descriptor();
            d.layout = Some(layout.to_string());
            let err = AdvertisingFrame::from_descriptor(&d).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter, "layout {layout:?}");
        }
    }

    #[test]
    fn overlapping_fields_are_rejected() {
        let mut d = descriptor();
        d.layout = Some("m:2-3=beac,i:2-17,i:20-21,i:22-23".to_string());
        let err = AdvertisingFrame::from_descriptor(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn layout_without_data_fields_accepts_a_default_descriptor() {
        let mut d = descriptor();
        d.layout = Some("m:2-3=beac,i:4-19,i:20-21,i:22-23,p:24-24".to_string());
        let frame = AdvertisingFrame::from_descriptor(&d).unwrap();
        assert_eq!(frame.data.len(), 23);
        assert_eq!(frame.data[22], (-59i8) as u8);
    }

    #[test]
    fn short_layouts_drop_default_identifiers_only() {
        // Default major/minor may be dropped by a uuid-only layout.
        let mut d = descriptor();
        d.layout = Some("m:2-3=beac,i:4-19".to_string());
        let frame = AdvertisingFrame::from_descriptor(&d).unwrap();
        assert_eq!(&frame.data[2..18], d.uuid.as_bytes());

        // An explicitly set major must land in a field.
        d.major_id = Some(7);
        let err = AdvertisingFrame::from_descriptor(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        // The uuid is always explicit; a layout with no identifier fields
        // cannot carry it.
        let mut d = descriptor();
        d.layout = Some("m:2-3=beac,p:4-4".to_string());
        let err = AdvertisingFrame::from_descriptor(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn extra_data_must_fit_the_layout() {
        let mut d = descriptor();
        d.extra_data = Some(vec![1, 2]);
        let err = AdvertisingFrame::from_descriptor(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    trait AsBytesHex {
        fn as_bytes_hex(&self) -> Vec<u8>;
    }

    impl AsBytesHex for &str {
        fn as_bytes_hex(&self) -> Vec<u8> {
            (0..self.len())
                .step_by(2)
                .map(|i| u8::from_str_radix(&self[i..i + 2], 16).unwrap())
                .collect()
        }
    }
}
