#![allow(dead_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Physical dimension of a unit. Conversions only exist within a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Current,
    Power,
    Energy,
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Ampere,
    Milliampere,
    Watt,
    Kilowatt,
    WattHour,
    KilowattHour,
    Celsius,
}

impl Unit {
    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Ampere | Unit::Milliampere => Dimension::Current,
            Unit::Watt | Unit::Kilowatt => Dimension::Power,
            Unit::WattHour | Unit::KilowattHour => Dimension::Energy,
            Unit::Celsius => Dimension::Temperature,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Ampere => "A",
            Unit::Milliampere => "mA",
            Unit::Watt => "W",
            Unit::Kilowatt => "kW",
            Unit::WattHour => "Wh",
            Unit::KilowattHour => "kWh",
            Unit::Celsius => "°C",
        }
    }

    /// Scale factor to the base unit of this unit's dimension.
    fn base_factor(&self) -> f64 {
        match self {
            Unit::Ampere => 1.0,
            Unit::Milliampere => 0.001,
            Unit::Watt => 1.0,
            Unit::Kilowatt => 1_000.0,
            Unit::WattHour => 1.0,
            Unit::KilowattHour => 1_000.0,
            Unit::Celsius => 1.0,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A numeric magnitude tagged with a physical unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub magnitude: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    /// Convert to another unit of the same dimension. Cross-dimension
    /// conversions yield None.
    pub fn to_unit(&self, unit: Unit) -> Option<Quantity> {
        if self.unit.dimension() != unit.dimension() {
            return None;
        }
        let magnitude = self.magnitude * self.unit.base_factor() / unit.base_factor();
        Some(Quantity { magnitude, unit })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

/// A normalized channel value as handed to the host.
///
/// `Undefined` means "no data reported yet" and is distinct from zero,
/// false, and from `Text(None)` (a string value wrapping no tag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelValue {
    Undefined,
    OnOff(bool),
    Count(i64),
    Text(Option<String>),
    Quantity(Quantity),
}

impl ChannelValue {
    pub fn quantity(magnitude: f64, unit: Unit) -> Self {
        ChannelValue::Quantity(Quantity::new(magnitude, unit))
    }

    pub fn text(tag: impl Into<String>) -> Self {
        ChannelValue::Text(Some(tag.into()))
    }

    pub fn unset_text() -> Self {
        ChannelValue::Text(None)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, ChannelValue::Undefined)
    }
}

/// Channels exposed for a go-e charger device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    PwmSignal,
    Error,
    AccessConfiguration,
    AllowCharging,
    Phases,
    Temperature,
    SessionChargeConsumption,
    SessionChargeConsumptionLimit,
    TotalChargeConsumption,
    MaxCurrent,
    CurrentL1,
    CurrentL2,
    CurrentL3,
    PowerL1,
    PowerL2,
    PowerL3,
}

impl Channel {
    pub const ALL: &'static [Channel] = &[
        Channel::PwmSignal,
        Channel::Error,
        Channel::AccessConfiguration,
        Channel::AllowCharging,
        Channel::Phases,
        Channel::Temperature,
        Channel::SessionChargeConsumption,
        Channel::SessionChargeConsumptionLimit,
        Channel::TotalChargeConsumption,
        Channel::MaxCurrent,
        Channel::CurrentL1,
        Channel::CurrentL2,
        Channel::CurrentL3,
        Channel::PowerL1,
        Channel::PowerL2,
        Channel::PowerL3,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Channel::PwmSignal => "pwmSignal",
            Channel::Error => "error",
            Channel::AccessConfiguration => "accessConfiguration",
            Channel::AllowCharging => "allowCharging",
            Channel::Phases => "phases",
            Channel::Temperature => "temperature",
            Channel::SessionChargeConsumption => "sessionChargeConsumption",
            Channel::SessionChargeConsumptionLimit => "sessionChargeConsumptionLimit",
            Channel::TotalChargeConsumption => "totalChargeConsumption",
            Channel::MaxCurrent => "maxCurrent",
            Channel::CurrentL1 => "currentL1",
            Channel::CurrentL2 => "currentL2",
            Channel::CurrentL3 => "currentL3",
            Channel::PowerL1 => "powerL1",
            Channel::PowerL2 => "powerL2",
            Channel::PowerL3 => "powerL3",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Error)]
#[error("unknown channel id: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .iter()
            .copied()
            .find(|channel| channel.id() == s)
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}

/// An inbound request to change (or refresh) one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Number(f64),
    Quantity(Quantity),
    OnOff(bool),
    Text(String),
    Refresh,
}

/// A device parameter write ready for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub key: &'static str,
    pub value: String,
}

impl WriteRequest {
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Firmware API generation; selects the status DTO variant at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiVersion {
    V1,
    V2,
}

impl Default for ApiVersion {
    fn default() -> Self {
        ApiVersion::V1
    }
}

#[derive(Debug, Error)]
#[error("unsupported api version: {0}")]
pub struct UnknownApiVersion(pub String);

impl FromStr for ApiVersion {
    type Err = UnknownApiVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "v1" | "V1" => Ok(ApiVersion::V1),
            "2" | "v2" | "V2" => Ok(ApiVersion::V2),
            other => Err(UnknownApiVersion(other.to_string())),
        }
    }
}

/// Basic identity for a charger endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub ip: String,
    #[serde(default)]
    pub api_version: ApiVersion,
}
