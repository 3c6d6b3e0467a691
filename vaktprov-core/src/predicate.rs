//! ## vaktprov-core::predicate
//! Named packet predicates used by inexact output events.
//!
//! Two flavours exist. Field predicates are self-describing expressions over
//! a decoded header field (`ipv4.ttl >= 8`, `icmp.data ^= "hello"`) and can
//! be written to and read from scenario documents verbatim. Custom
//! predicates wrap an arbitrary closure; they are stored by name and must be
//! registered in a [`PredicateRegistry`] to be loaded back.

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use vaktprov_protocols::{Frame, MacAddr};

use crate::error::ScenarioError;
use crate::packet::Packet;

pub type PredicateFn = Arc<dyn Fn(&Packet) -> bool + Send + Sync>;

static EXPRESSION: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^\s*([a-z0-9_]+\.[a-z0-9_]+)\s*(==|!=|>=|<=|\^=|>|<)\s*(.+?)\s*$").ok()
});

#[derive(Clone)]
pub enum PredicateTest {
    Field(FieldPredicate),
    Custom(PredicateFn),
}

/// A named test over an observed packet.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    test: PredicateTest,
}

impl Predicate {
    pub fn custom<F>(name: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Packet) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            test: PredicateTest::Custom(Arc::new(test)),
        }
    }

    /// Parses a field expression; the expression is also the name.
    pub fn field(expr: &str) -> Result<Self, ScenarioError> {
        let parsed = FieldPredicate::parse(expr)?;
        Ok(Self {
            name: parsed.to_string(),
            test: PredicateTest::Field(parsed),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test(&self) -> &PredicateTest {
        &self.test
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.test, PredicateTest::Custom(_))
    }

    pub fn evaluate(&self, packet: &Packet) -> bool {
        match &self.test {
            PredicateTest::Field(field) => field.evaluate(packet),
            PredicateTest::Custom(f) => f(packet),
        }
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Predicate {}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_custom() { "custom" } else { "field" };
        write!(f, "Predicate({kind}: {})", self.name)
    }
}

/// Header field addressable from an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    EthSrc,
    EthDst,
    EthType,
    ArpOp,
    ArpSenderHw,
    ArpSenderIp,
    ArpTargetHw,
    ArpTargetIp,
    Ipv4Src,
    Ipv4Dst,
    Ipv4Ttl,
    Ipv4Protocol,
    IcmpType,
    IcmpCode,
    IcmpData,
    UdpSrcPort,
    UdpDstPort,
    UdpPayload,
}

const FIELDS: [(&str, Field); 18] = [
    ("eth.src", Field::EthSrc),
    ("eth.dst", Field::EthDst),
    ("eth.ethertype", Field::EthType),
    ("arp.op", Field::ArpOp),
    ("arp.sender_hw", Field::ArpSenderHw),
    ("arp.sender_ip", Field::ArpSenderIp),
    ("arp.target_hw", Field::ArpTargetHw),
    ("arp.target_ip", Field::ArpTargetIp),
    ("ipv4.src", Field::Ipv4Src),
    ("ipv4.dst", Field::Ipv4Dst),
    ("ipv4.ttl", Field::Ipv4Ttl),
    ("ipv4.protocol", Field::Ipv4Protocol),
    ("icmp.type", Field::IcmpType),
    ("icmp.code", Field::IcmpCode),
    ("icmp.data", Field::IcmpData),
    ("udp.src_port", Field::UdpSrcPort),
    ("udp.dst_port", Field::UdpDstPort),
    ("udp.payload", Field::UdpPayload),
];

impl Field {
    fn lookup(name: &str) -> Option<Self> {
        FIELDS.iter().find(|(n, _)| *n == name).map(|(_, f)| *f)
    }

    pub fn name(&self) -> &'static str {
        FIELDS
            .iter()
            .find(|(_, f)| f == self)
            .map(|(n, _)| *n)
            .unwrap_or("?")
    }

    fn kind(&self) -> ValueKind {
        match self {
            Field::EthSrc | Field::EthDst | Field::ArpSenderHw | Field::ArpTargetHw => {
                ValueKind::Mac
            }
            Field::ArpSenderIp | Field::ArpTargetIp | Field::Ipv4Src | Field::Ipv4Dst => {
                ValueKind::Ip
            }
            Field::IcmpData | Field::UdpPayload => ValueKind::Bytes,
            _ => ValueKind::Int,
        }
    }

    fn extract(&self, frame: &Frame<'_>) -> Option<Value> {
        let value = match self {
            Field::EthSrc => Value::Mac(frame.ethernet?.src),
            Field::EthDst => Value::Mac(frame.ethernet?.dst),
            Field::EthType => Value::Int(frame.ethernet?.ethertype.into()),
            Field::ArpOp => Value::Int(frame.arp?.operation.into()),
            Field::ArpSenderHw => Value::Mac(frame.arp?.sender_hw),
            Field::ArpSenderIp => Value::Ip(frame.arp?.sender_proto),
            Field::ArpTargetHw => Value::Mac(frame.arp?.target_hw),
            Field::ArpTargetIp => Value::Ip(frame.arp?.target_proto),
            Field::Ipv4Src => Value::Ip(frame.ipv4?.src),
            Field::Ipv4Dst => Value::Ip(frame.ipv4?.dst),
            Field::Ipv4Ttl => Value::Int(frame.ipv4?.ttl.into()),
            Field::Ipv4Protocol => Value::Int(frame.ipv4?.protocol.into()),
            Field::IcmpType => Value::Int(frame.icmp?.icmp_type.into()),
            Field::IcmpCode => Value::Int(frame.icmp?.code.into()),
            Field::IcmpData => Value::Bytes(frame.icmp?.data.to_vec()),
            Field::UdpSrcPort => Value::Int(frame.udp?.src_port.into()),
            Field::UdpDstPort => Value::Int(frame.udp?.dst_port.into()),
            Field::UdpPayload => Value::Bytes(frame.udp?.payload.to_vec()),
        };
        Some(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Int,
    Ip,
    Mac,
    Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Int(u64),
    Ip(Ipv4Addr),
    Mac(MacAddr),
    Bytes(Vec<u8>),
}

impl Value {
    fn parse(kind: ValueKind, text: &str) -> Option<Self> {
        match kind {
            ValueKind::Int => match text.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => text.parse().ok(),
            }
            .map(Value::Int),
            ValueKind::Ip => text.parse().ok().map(Value::Ip),
            ValueKind::Mac => text.parse().ok().map(Value::Mac),
            ValueKind::Bytes => {
                if let Some(hex) = text.strip_prefix("hex:") {
                    hex::decode(hex).ok().map(Value::Bytes)
                } else {
                    text.strip_prefix('"')
                        .and_then(|t| t.strip_suffix('"'))
                        .map(|t| Value::Bytes(t.as_bytes().to_vec()))
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Ip(ip) => write!(f, "{ip}"),
            Value::Mac(mac) => write!(f, "{mac}"),
            Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) if !text.contains('"') && text.chars().all(|c| !c.is_control()) => {
                    write!(f, "\"{text}\"")
                }
                _ => write!(f, "hex:{}", hex::encode(bytes)),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Prefix,
}

impl Op {
    fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "==" => Op::Eq,
            "!=" => Op::Ne,
            "<" => Op::Lt,
            "<=" => Op::Le,
            ">" => Op::Gt,
            ">=" => Op::Ge,
            "^=" => Op::Prefix,
            _ => return None,
        })
    }

    fn symbol(&self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Prefix => "^=",
        }
    }
}

/// `<field> <op> <value>` over one decoded header field. A packet lacking the
/// field's header never satisfies the predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPredicate {
    pub field: Field,
    pub op: Op,
    pub value: Value,
}

impl FieldPredicate {
    pub fn parse(expr: &str) -> Result<Self, ScenarioError> {
        let invalid = |reason: &str| ScenarioError::InvalidPredicate {
            expr: expr.to_string(),
            reason: reason.to_string(),
        };
        let caps = EXPRESSION
            .as_ref()
            .and_then(|re| re.captures(expr))
            .ok_or_else(|| invalid("expected `<layer>.<field> <op> <value>`"))?;
        let field = Field::lookup(&caps[1]).ok_or_else(|| invalid("unknown field"))?;
        let op = Op::parse(&caps[2]).ok_or_else(|| invalid("unknown operator"))?;
        let kind = field.kind();
        if op == Op::Prefix && kind != ValueKind::Bytes {
            return Err(invalid("`^=` only applies to byte fields"));
        }
        if matches!(op, Op::Lt | Op::Le | Op::Gt | Op::Ge) && kind == ValueKind::Bytes {
            return Err(invalid("ordering is not defined for byte fields"));
        }
        let value = Value::parse(kind, &caps[3]).ok_or_else(|| invalid("malformed value"))?;
        Ok(Self { field, op, value })
    }

    pub fn evaluate(&self, packet: &Packet) -> bool {
        let Some(actual) = self.field.extract(&packet.frame()) else {
            return false;
        };
        match self.op {
            Op::Eq => actual == self.value,
            Op::Ne => actual != self.value,
            Op::Lt => actual < self.value,
            Op::Le => actual <= self.value,
            Op::Gt => actual > self.value,
            Op::Ge => actual >= self.value,
            Op::Prefix => match (&actual, &self.value) {
                (Value::Bytes(data), Value::Bytes(prefix)) => data.starts_with(prefix),
                _ => false,
            },
        }
    }
}

impl fmt::Display for FieldPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field.name(), self.op.symbol(), self.value)
    }
}

/// Resolves predicate names found in scenario documents.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    custom: HashMap<String, PredicateFn>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, test: F) -> &mut Self
    where
        F: Fn(&Packet) -> bool + Send + Sync + 'static,
    {
        self.custom.insert(name.into(), Arc::new(test));
        self
    }

    /// Registered custom predicates win; anything else must be a field
    /// expression.
    pub fn resolve(&self, name: &str) -> Result<Predicate, ScenarioError> {
        if let Some(test) = self.custom.get(name) {
            return Ok(Predicate {
                name: name.to_string(),
                test: PredicateTest::Custom(test.clone()),
            });
        }
        if EXPRESSION.as_ref().is_some_and(|re| re.is_match(name)) {
            Predicate::field(name)
        } else {
            Err(ScenarioError::UnknownPredicate(name.to_string()))
        }
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(ttl: u8, data: &[u8]) -> Packet {
        let mut raw = hex::decode("1000000000012000000000010800").unwrap();
        let total = (20 + 8 + data.len()) as u16;
        raw.extend_from_slice(&[0x45, 0]);
        raw.extend_from_slice(&total.to_be_bytes());
        raw.extend_from_slice(&[0, 0, 0, 0, ttl, 1, 0, 0, 172, 16, 128, 1, 172, 16, 42, 1]);
        raw.extend_from_slice(&[8, 0, 0, 0, 0, 0, 0, 1]);
        raw.extend_from_slice(data);
        Packet::from(raw)
    }

    #[test]
    fn test_integer_comparisons() {
        let packet = echo(10, b"hello");
        assert!(Predicate::field("ipv4.ttl >= 8").unwrap().evaluate(&packet));
        assert!(Predicate::field("ipv4.ttl >= 8").unwrap().evaluate(&echo(8, b"")));
        assert!(!Predicate::field("ipv4.ttl >= 8").unwrap().evaluate(&echo(7, b"")));
        assert!(!Predicate::field("ipv4.ttl < 10").unwrap().evaluate(&packet));
        assert!(Predicate::field("icmp.type == 0x08").unwrap().evaluate(&packet));
    }

    #[test]
    fn test_address_and_byte_values() {
        let packet = echo(10, b"hello icmp");
        assert!(Predicate::field("ipv4.dst == 172.16.42.1")
            .unwrap()
            .evaluate(&packet));
        assert!(Predicate::field("eth.src == 20:00:00:00:00:01")
            .unwrap()
            .evaluate(&packet));
        assert!(Predicate::field("icmp.data ^= \"hello\"")
            .unwrap()
            .evaluate(&packet));
        assert!(Predicate::field("icmp.data ^= hex:68656c")
            .unwrap()
            .evaluate(&packet));
        assert!(!Predicate::field("icmp.data == \"hello\"")
            .unwrap()
            .evaluate(&packet));
    }

    #[test]
    fn test_missing_layer_fails() {
        let packet = echo(10, b"");
        assert!(!Predicate::field("udp.dst_port == 53").unwrap().evaluate(&packet));
        assert!(!Predicate::field("arp.op != 1").unwrap().evaluate(&packet));
    }

    #[test]
    fn test_name_is_normalized_expression() {
        let p = Predicate::field("  ipv4.ttl>=0x08 ").unwrap();
        assert_eq!(p.name(), "ipv4.ttl >= 8");
        assert_eq!(Predicate::field(p.name()).unwrap(), p);
    }

    #[test]
    fn test_rejects_bad_expressions() {
        for expr in ["ipv4.ttl ^= 3", "icmp.data > \"a\"", "ipv4.bogus == 1", "ipv4.ttl == x"] {
            assert!(
                matches!(
                    Predicate::field(expr),
                    Err(ScenarioError::InvalidPredicate { .. })
                ),
                "{expr}"
            );
        }
    }

    #[test]
    fn test_registry_resolution() {
        let mut registry = PredicateRegistry::new();
        registry.register("is_big", |p: &Packet| p.len() > 40);
        assert!(registry.resolve("is_big").unwrap().is_custom());
        assert!(!registry.resolve("ipv4.ttl == 3").unwrap().is_custom());
        assert!(matches!(
            registry.resolve("nonexistent"),
            Err(ScenarioError::UnknownPredicate(_))
        ));
        assert!(matches!(
            registry.resolve("ipv4.nope == 3"),
            Err(ScenarioError::InvalidPredicate { .. })
        ));
    }
}
