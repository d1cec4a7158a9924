#![allow(dead_code)]

use serde::Deserialize;
use thiserror::Error;
use types::{ApiVersion, Channel, ChannelValue, Command, Unit, WriteRequest};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("status parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Deka-watt-seconds per kilowatt-hour; the v1 session energy unit.
const SESSION_CHARGE_DIVISOR: f64 = 360_000.0;
/// The v1 energy limit and total counters are reported in 0.1 kWh steps.
const DECI_KWH_DIVISOR: f64 = 10.0;

// nrg array layout: indices 4-6 carry per-phase current in 0.1 A,
// indices 7-9 per-phase power in 0.01 kW.
const NRG_CURRENT_L1: usize = 4;
const NRG_CURRENT_L2: usize = 5;
const NRG_CURRENT_L3: usize = 6;
const NRG_POWER_L1: usize = 7;
const NRG_POWER_L2: usize = 8;
const NRG_POWER_L3: usize = 9;

/// Status payload of the v1 HTTP API. Every field is optional: the firmware
/// omits values it has not reported yet, and absence must stay observable
/// downstream instead of collapsing into zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusV1 {
    #[serde(rename = "car")]
    pub pwm_signal: Option<i64>,
    #[serde(rename = "err")]
    pub error_code: Option<i64>,
    #[serde(rename = "ast")]
    pub access_configuration: Option<i64>,
    #[serde(rename = "alw")]
    pub allow_charging: Option<i64>,
    #[serde(rename = "tmp")]
    pub temperature: Option<f64>,
    #[serde(rename = "dws")]
    pub session_charge: Option<f64>,
    #[serde(rename = "dwo")]
    pub session_charge_limit: Option<f64>,
    #[serde(rename = "eto")]
    pub total_charge: Option<f64>,
    #[serde(rename = "nrg")]
    pub energy: Option<Vec<f64>>,
}

/// Status payload of the v2 HTTP API. The coded fields kept their meaning
/// but several counters moved to plain watt-hours and allow-charging became
/// a boolean; accessors on [`DeviceStatus`] normalize these back into the
/// v1 raw units once so the decode table stays version-agnostic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusV2 {
    #[serde(rename = "car")]
    pub pwm_signal: Option<i64>,
    #[serde(rename = "err")]
    pub error_code: Option<i64>,
    #[serde(rename = "acs")]
    pub access_configuration: Option<i64>,
    #[serde(rename = "alw")]
    pub allow_charging: Option<bool>,
    /// Temperature sensor array; the first probe is the circuit board.
    #[serde(rename = "tma")]
    pub temperatures: Option<Vec<f64>>,
    /// Session energy in watt-hours.
    #[serde(rename = "wh")]
    pub session_charge_wh: Option<f64>,
    /// Session energy limit in watt-hours.
    #[serde(rename = "dwo")]
    pub session_charge_limit_wh: Option<f64>,
    /// Total energy in watt-hours.
    #[serde(rename = "eto")]
    pub total_charge_wh: Option<f64>,
    #[serde(rename = "nrg")]
    pub energy: Option<Vec<f64>>,
}

/// A parsed status response. The API generation is resolved once at parse
/// time; everything downstream works on the version-agnostic accessors.
#[derive(Debug, Clone)]
pub enum DeviceStatus {
    V1(StatusV1),
    V2(StatusV2),
}

impl DeviceStatus {
    pub fn parse(version: ApiVersion, body: &str) -> Result<Self, CodecError> {
        match version {
            ApiVersion::V1 => Ok(DeviceStatus::V1(serde_json::from_str(body)?)),
            ApiVersion::V2 => Ok(DeviceStatus::V2(serde_json::from_str(body)?)),
        }
    }

    pub fn pwm_signal_code(&self) -> Option<i64> {
        match self {
            DeviceStatus::V1(status) => status.pwm_signal,
            DeviceStatus::V2(status) => status.pwm_signal,
        }
    }

    pub fn error_code(&self) -> Option<i64> {
        match self {
            DeviceStatus::V1(status) => status.error_code,
            DeviceStatus::V2(status) => status.error_code,
        }
    }

    pub fn access_code(&self) -> Option<i64> {
        match self {
            DeviceStatus::V1(status) => status.access_configuration,
            DeviceStatus::V2(status) => status.access_configuration,
        }
    }

    pub fn allow_charging(&self) -> Option<bool> {
        match self {
            // 1 means allowed; every other reported value counts as off.
            DeviceStatus::V1(status) => status.allow_charging.map(|value| value == 1),
            DeviceStatus::V2(status) => status.allow_charging,
        }
    }

    pub fn temperature_celsius(&self) -> Option<f64> {
        match self {
            DeviceStatus::V1(status) => status.temperature,
            DeviceStatus::V2(status) => status
                .temperatures
                .as_deref()
                .and_then(|probes| probes.first().copied()),
        }
    }

    /// Session energy in deka-watt-seconds (the v1 raw unit).
    pub fn session_charge_raw(&self) -> Option<f64> {
        match self {
            DeviceStatus::V1(status) => status.session_charge,
            DeviceStatus::V2(status) => status.session_charge_wh.map(|wh| wh * 360.0),
        }
    }

    /// Session energy limit in 0.1 kWh steps (the v1 raw unit).
    pub fn session_limit_raw(&self) -> Option<f64> {
        match self {
            DeviceStatus::V1(status) => status.session_charge_limit,
            DeviceStatus::V2(status) => status.session_charge_limit_wh.map(|wh| wh / 100.0),
        }
    }

    /// Total energy in 0.1 kWh steps (the v1 raw unit).
    pub fn total_charge_raw(&self) -> Option<f64> {
        match self {
            DeviceStatus::V1(status) => status.total_charge,
            DeviceStatus::V2(status) => status.total_charge_wh.map(|wh| wh / 100.0),
        }
    }

    pub fn energy(&self) -> Option<&[f64]> {
        match self {
            DeviceStatus::V1(status) => status.energy.as_deref(),
            DeviceStatus::V2(status) => status.energy.as_deref(),
        }
    }
}

/// Policy for codes missing from a [`CodeTable`].
enum Fallback {
    /// Produce a string value wrapping no tag (`ChannelValue::Text(None)`).
    UnsetText,
    /// Collapse every unknown code into a fixed tag.
    Tag(&'static str),
}

/// Vendor enum table with an explicit policy for unmatched codes.
///
/// The firmware's three coded fields do not fall back uniformly: pwm signal
/// and access configuration leave the tag unset while the error field
/// reports INTERNAL. The asymmetry is device-observed behavior and is kept
/// as is; hosts distinguish `Text(None)` from `Undefined`.
struct CodeTable {
    entries: &'static [(i64, &'static str)],
    fallback: Fallback,
}

impl CodeTable {
    fn decode(&self, code: i64) -> ChannelValue {
        for (candidate, tag) in self.entries {
            if *candidate == code {
                return ChannelValue::text(*tag);
            }
        }
        match self.fallback {
            Fallback::UnsetText => ChannelValue::unset_text(),
            Fallback::Tag(tag) => ChannelValue::text(tag),
        }
    }
}

const PWM_SIGNAL_TABLE: CodeTable = CodeTable {
    entries: &[
        (1, "READY_NO_CAR"),
        (2, "CHARGING"),
        (3, "WAITING_FOR_CAR"),
        (4, "CHARGING_DONE_CAR_CONNECTED"),
    ],
    fallback: Fallback::UnsetText,
};

const ERROR_TABLE: CodeTable = CodeTable {
    entries: &[(0, "NONE"), (1, "RCCB"), (3, "PHASE"), (8, "NO_GROUND")],
    fallback: Fallback::Tag("INTERNAL"),
};

const ACCESS_TABLE: CodeTable = CodeTable {
    entries: &[(0, "OPEN"), (1, "RFID"), (2, "AWATTAR"), (3, "TIMER")],
    fallback: Fallback::UnsetText,
};

/// Write-side mapping for access configuration tags, matched
/// case-insensitively.
const ACCESS_WRITE_TABLE: &[(&str, &str)] = &[
    ("OPEN", "0"),
    ("RFID", "1"),
    ("AWATTAR", "2"),
    ("TIMER", "3"),
];

/// Map one channel of a parsed status payload to its normalized value.
///
/// Total and pure: never fails. Absent or too-short fields degrade to
/// [`ChannelValue::Undefined`] for the affected channel only.
pub fn decode(channel: Channel, status: &DeviceStatus) -> ChannelValue {
    match channel {
        Channel::PwmSignal => match status.pwm_signal_code() {
            Some(code) => PWM_SIGNAL_TABLE.decode(code),
            None => ChannelValue::Undefined,
        },
        Channel::Error => match status.error_code() {
            Some(code) => ERROR_TABLE.decode(code),
            None => ChannelValue::Undefined,
        },
        Channel::AccessConfiguration => match status.access_code() {
            Some(code) => ACCESS_TABLE.decode(code),
            None => ChannelValue::Undefined,
        },
        Channel::AllowCharging => match status.allow_charging() {
            Some(allowed) => ChannelValue::OnOff(allowed),
            None => ChannelValue::Undefined,
        },
        Channel::Phases => {
            let l1 = energy_at(status, NRG_CURRENT_L1);
            let l2 = energy_at(status, NRG_CURRENT_L2);
            let l3 = energy_at(status, NRG_CURRENT_L3);
            match (l1, l2, l3) {
                (Some(l1), Some(l2), Some(l3)) => {
                    let count = [l1, l2, l3].iter().filter(|value| **value > 0.0).count();
                    ChannelValue::Count(count as i64)
                }
                _ => ChannelValue::Undefined,
            }
        }
        Channel::Temperature => match status.temperature_celsius() {
            Some(celsius) => ChannelValue::quantity(celsius, Unit::Celsius),
            None => ChannelValue::Undefined,
        },
        Channel::SessionChargeConsumption => match status.session_charge_raw() {
            Some(raw) => ChannelValue::quantity(raw / SESSION_CHARGE_DIVISOR, Unit::KilowattHour),
            None => ChannelValue::Undefined,
        },
        Channel::SessionChargeConsumptionLimit => match status.session_limit_raw() {
            Some(raw) => ChannelValue::quantity(raw / DECI_KWH_DIVISOR, Unit::KilowattHour),
            None => ChannelValue::Undefined,
        },
        Channel::TotalChargeConsumption => match status.total_charge_raw() {
            Some(raw) => ChannelValue::quantity(raw / DECI_KWH_DIVISOR, Unit::KilowattHour),
            None => ChannelValue::Undefined,
        },
        // raw values come in as A*10, 41 means 4.1 A
        Channel::CurrentL1 => decode_current(status, NRG_CURRENT_L1),
        Channel::CurrentL2 => decode_current(status, NRG_CURRENT_L2),
        Channel::CurrentL3 => decode_current(status, NRG_CURRENT_L3),
        // raw values come in as kW*100, 7 means 700 W
        Channel::PowerL1 => decode_power(status, NRG_POWER_L1),
        Channel::PowerL2 => decode_power(status, NRG_POWER_L2),
        Channel::PowerL3 => decode_power(status, NRG_POWER_L3),
        // maxCurrent is write-only through this adapter
        Channel::MaxCurrent => ChannelValue::Undefined,
    }
}

fn energy_at(status: &DeviceStatus, index: usize) -> Option<f64> {
    status.energy().and_then(|nrg| nrg.get(index).copied())
}

fn decode_current(status: &DeviceStatus, index: usize) -> ChannelValue {
    match energy_at(status, index) {
        Some(raw) => ChannelValue::quantity(raw / 10.0, Unit::Ampere),
        None => ChannelValue::Undefined,
    }
}

fn decode_power(status: &DeviceStatus, index: usize) -> ChannelValue {
    match energy_at(status, index) {
        Some(raw) => ChannelValue::quantity(raw * 100.0, Unit::Watt),
        None => ChannelValue::Undefined,
    }
}

/// Map a (channel, command) pair to a device parameter write.
///
/// Partial: a command the device cannot express yields `None` and the
/// caller reports the failure instead of sending anything. A refresh is a
/// query-only signal and never produces a write.
pub fn encode(channel: Channel, command: &Command) -> Option<WriteRequest> {
    if matches!(command, Command::Refresh) {
        return None;
    }

    match channel {
        Channel::MaxCurrent => {
            encode_amperes(command).map(|value| WriteRequest::new("amp", value))
        }
        Channel::SessionChargeConsumptionLimit => {
            encode_energy_limit(command).map(|value| WriteRequest::new("dwo", value))
        }
        Channel::AllowCharging => match command {
            Command::OnOff(on) => Some(WriteRequest::new("alw", if *on { "1" } else { "0" })),
            _ => None,
        },
        Channel::AccessConfiguration => match command {
            Command::Text(tag) => {
                access_write_value(tag).map(|value| WriteRequest::new("ast", value))
            }
            _ => None,
        },
        _ => None,
    }
}

fn encode_amperes(command: &Command) -> Option<String> {
    match command {
        Command::Number(value) => Some((value.trunc() as i64).to_string()),
        Command::Quantity(quantity) => quantity
            .to_unit(Unit::Ampere)
            .map(|amps| (amps.magnitude.trunc() as i64).to_string()),
        _ => None,
    }
}

fn encode_energy_limit(command: &Command) -> Option<String> {
    let kwh = match command {
        Command::Number(value) => Some(*value),
        Command::Quantity(quantity) => quantity
            .to_unit(Unit::KilowattHour)
            .map(|energy| energy.magnitude),
        _ => None,
    }?;
    // restore the 0.1 kWh device unit
    Some(((kwh.trunc() as i64) * 10).to_string())
}

fn access_write_value(tag: &str) -> Option<&'static str> {
    ACCESS_WRITE_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(tag))
        .map(|(_, value)| *value)
}
