//! ## vaktprov-core::packet
//! Opaque frame value exchanged between a scenario and the code under test.

use std::fmt;

use bytes::Bytes;
use vaktprov_protocols::{Frame, HeaderKind};

use crate::error::ScenarioError;
use crate::wildcard::Wildcard;

/// An immutable Ethernet frame. Equality is byte equality.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Packet {
    data: Bytes,
}

/// First point at which two packets disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Difference {
    Length {
        expected: usize,
        observed: usize,
    },
    Byte {
        offset: usize,
        layer: Option<HeaderKind>,
        expected: u8,
        observed: u8,
    },
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::Length { expected, observed } => {
                write!(f, "length {observed} bytes, expected {expected} bytes")
            }
            Difference::Byte {
                offset,
                layer,
                expected,
                observed,
            } => {
                write!(
                    f,
                    "byte {offset} is 0x{observed:02x}, expected 0x{expected:02x}"
                )?;
                match layer {
                    Some(kind) => write!(f, " (in {kind} header)"),
                    None => f.write_str(" (outside any known header)"),
                }
            }
        }
    }
}

impl Packet {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Parses a hex dump; whitespace is ignored.
    pub fn from_hex(text: &str) -> Result<Self, ScenarioError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        Ok(Self::new(hex::decode(compact)?))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn to_bytes(&self) -> Bytes {
        self.data.clone()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame::decode(&self.data)
    }

    pub fn summary(&self, focus: Option<HeaderKind>) -> String {
        self.frame().summarize(focus)
    }

    /// Compares `self` (the scripted packet) with `observed`, skipping the
    /// bytes of every wildcard field present in either frame.
    pub fn first_difference(&self, observed: &Packet, masks: &[Wildcard]) -> Option<Difference> {
        if self.len() != observed.len() {
            return Some(Difference::Length {
                expected: self.len(),
                observed: observed.len(),
            });
        }

        let expected_frame = self.frame();
        let observed_frame = observed.frame();
        let masked: Vec<_> = masks
            .iter()
            .flat_map(|w| {
                [
                    w.byte_range(&expected_frame),
                    w.byte_range(&observed_frame),
                ]
            })
            .flatten()
            .collect();

        self.data
            .iter()
            .zip(observed.data.iter())
            .enumerate()
            .find(|(offset, (a, b))| a != b && !masked.iter().any(|r| r.contains(offset)))
            .map(|(offset, (&expected, &observed))| Difference::Byte {
                offset,
                layer: expected_frame.layer_at(offset),
                expected,
                observed,
            })
    }

    pub fn matches(&self, observed: &Packet, masks: &[Wildcard]) -> bool {
        self.first_difference(observed, masks).is_none()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet({})", self.summary(None))
    }
}

impl From<Vec<u8>> for Packet {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<Bytes> for Packet {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for Packet {
    fn from(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }
}
