use goe_codec::{decode, encode, DeviceStatus};
use types::{ApiVersion, Channel, ChannelValue, Command, Quantity, Unit, WriteRequest};

fn v1_fixture() -> DeviceStatus {
    let data = include_str!("fixtures/status-v1.json");
    DeviceStatus::parse(ApiVersion::V1, data).expect("v1 parse")
}

fn v2_fixture() -> DeviceStatus {
    let data = include_str!("fixtures/status-v2.json");
    DeviceStatus::parse(ApiVersion::V2, data).expect("v2 parse")
}

#[test]
fn decode_v1_fixture() {
    let status = v1_fixture();

    assert_eq!(
        decode(Channel::PwmSignal, &status),
        ChannelValue::text("CHARGING")
    );
    assert_eq!(decode(Channel::Error, &status), ChannelValue::text("NONE"));
    assert_eq!(
        decode(Channel::AccessConfiguration, &status),
        ChannelValue::text("RFID")
    );
    assert_eq!(
        decode(Channel::AllowCharging, &status),
        ChannelValue::OnOff(true)
    );
    assert_eq!(
        decode(Channel::Temperature, &status),
        ChannelValue::quantity(28.5, Unit::Celsius)
    );
    assert_eq!(
        decode(Channel::SessionChargeConsumption, &status),
        ChannelValue::quantity(10.0, Unit::KilowattHour)
    );
    assert_eq!(
        decode(Channel::SessionChargeConsumptionLimit, &status),
        ChannelValue::quantity(10.5, Unit::KilowattHour)
    );
    assert_eq!(
        decode(Channel::TotalChargeConsumption, &status),
        ChannelValue::quantity(133.7, Unit::KilowattHour)
    );
}

#[test]
fn decode_energy_array_indices() {
    // nrg = [_,_,_,_, 12, 0, 5, 3, 0, 7, ...]
    let status = v1_fixture();

    assert_eq!(decode(Channel::Phases, &status), ChannelValue::Count(2));
    assert_eq!(
        decode(Channel::CurrentL1, &status),
        ChannelValue::quantity(1.2, Unit::Ampere)
    );
    assert_eq!(
        decode(Channel::CurrentL2, &status),
        ChannelValue::quantity(0.0, Unit::Ampere)
    );
    assert_eq!(
        decode(Channel::CurrentL3, &status),
        ChannelValue::quantity(0.5, Unit::Ampere)
    );
    assert_eq!(
        decode(Channel::PowerL1, &status),
        ChannelValue::quantity(300.0, Unit::Watt)
    );
    assert_eq!(
        decode(Channel::PowerL2, &status),
        ChannelValue::quantity(0.0, Unit::Watt)
    );
    assert_eq!(
        decode(Channel::PowerL3, &status),
        ChannelValue::quantity(700.0, Unit::Watt)
    );
}

#[test]
fn decode_v2_normalizes_to_v1_units() {
    let status = v2_fixture();

    assert_eq!(
        decode(Channel::PwmSignal, &status),
        ChannelValue::text("CHARGING")
    );
    assert_eq!(
        decode(Channel::AccessConfiguration, &status),
        ChannelValue::text("RFID")
    );
    assert_eq!(
        decode(Channel::AllowCharging, &status),
        ChannelValue::OnOff(true)
    );
    assert_eq!(
        decode(Channel::Temperature, &status),
        ChannelValue::quantity(28.5, Unit::Celsius)
    );
    assert_eq!(
        decode(Channel::SessionChargeConsumption, &status),
        ChannelValue::quantity(10.0, Unit::KilowattHour)
    );
    assert_eq!(
        decode(Channel::SessionChargeConsumptionLimit, &status),
        ChannelValue::quantity(1.05, Unit::KilowattHour)
    );
    assert_eq!(
        decode(Channel::TotalChargeConsumption, &status),
        ChannelValue::quantity(13.37, Unit::KilowattHour)
    );
    assert_eq!(decode(Channel::Phases, &status), ChannelValue::Count(2));
}

#[test]
fn empty_status_decodes_every_channel_to_undefined() {
    let status = DeviceStatus::parse(ApiVersion::V1, "{}").expect("empty parse");

    for channel in Channel::ALL {
        assert_eq!(
            decode(*channel, &status),
            ChannelValue::Undefined,
            "channel {channel} must be undefined on an empty status"
        );
    }
}

#[test]
fn unmatched_codes_follow_table_fallbacks() {
    let status =
        DeviceStatus::parse(ApiVersion::V1, r#"{"car": 5, "err": 99, "ast": 7}"#).expect("parse");

    // pwm signal and access configuration leave the tag unset
    assert_eq!(
        decode(Channel::PwmSignal, &status),
        ChannelValue::unset_text()
    );
    assert_eq!(
        decode(Channel::AccessConfiguration, &status),
        ChannelValue::unset_text()
    );
    // the error table collapses unknown codes instead
    assert_eq!(
        decode(Channel::Error, &status),
        ChannelValue::text("INTERNAL")
    );
}

#[test]
fn error_code_three_is_phase() {
    let status = DeviceStatus::parse(ApiVersion::V1, r#"{"err": 3}"#).expect("parse");
    assert_eq!(decode(Channel::Error, &status), ChannelValue::text("PHASE"));
}

#[test]
fn allow_charging_nonzero_codes_decode_off() {
    let status = DeviceStatus::parse(ApiVersion::V1, r#"{"alw": 2}"#).expect("parse");
    assert_eq!(
        decode(Channel::AllowCharging, &status),
        ChannelValue::OnOff(false)
    );
}

#[test]
fn short_energy_array_degrades_to_undefined() {
    let status =
        DeviceStatus::parse(ApiVersion::V1, r#"{"nrg": [230, 231, 229, 0, 12]}"#).expect("parse");

    assert_eq!(
        decode(Channel::CurrentL1, &status),
        ChannelValue::quantity(1.2, Unit::Ampere)
    );
    assert_eq!(decode(Channel::CurrentL2, &status), ChannelValue::Undefined);
    assert_eq!(decode(Channel::Phases, &status), ChannelValue::Undefined);
    assert_eq!(decode(Channel::PowerL1, &status), ChannelValue::Undefined);
}

#[test]
fn malformed_body_is_a_parse_error() {
    assert!(DeviceStatus::parse(ApiVersion::V1, "not json").is_err());
    assert!(DeviceStatus::parse(ApiVersion::V2, r#"{"alw": "yes"}"#).is_err());
}

#[test]
fn encode_max_current() {
    let quantity = Command::Quantity(Quantity::new(6.0, Unit::Ampere));
    assert_eq!(
        encode(Channel::MaxCurrent, &quantity),
        Some(WriteRequest::new("amp", "6"))
    );

    let milliamps = Command::Quantity(Quantity::new(16_500.0, Unit::Milliampere));
    assert_eq!(
        encode(Channel::MaxCurrent, &milliamps),
        Some(WriteRequest::new("amp", "16"))
    );

    assert_eq!(
        encode(Channel::MaxCurrent, &Command::Number(10.0)),
        Some(WriteRequest::new("amp", "10"))
    );

    // unit mismatch yields no write
    let energy = Command::Quantity(Quantity::new(6.0, Unit::KilowattHour));
    assert_eq!(encode(Channel::MaxCurrent, &energy), None);
    assert_eq!(encode(Channel::MaxCurrent, &Command::OnOff(true)), None);
}

#[test]
fn encode_session_limit_restores_device_unit() {
    let quantity = Command::Quantity(Quantity::new(10.0, Unit::KilowattHour));
    assert_eq!(
        encode(Channel::SessionChargeConsumptionLimit, &quantity),
        Some(WriteRequest::new("dwo", "100"))
    );

    assert_eq!(
        encode(Channel::SessionChargeConsumptionLimit, &Command::Number(7.0)),
        Some(WriteRequest::new("dwo", "70"))
    );

    let amps = Command::Quantity(Quantity::new(10.0, Unit::Ampere));
    assert_eq!(encode(Channel::SessionChargeConsumptionLimit, &amps), None);
}

#[test]
fn encode_allow_charging() {
    assert_eq!(
        encode(Channel::AllowCharging, &Command::OnOff(true)),
        Some(WriteRequest::new("alw", "1"))
    );
    assert_eq!(
        encode(Channel::AllowCharging, &Command::OnOff(false)),
        Some(WriteRequest::new("alw", "0"))
    );
    assert_eq!(
        encode(Channel::AllowCharging, &Command::Number(1.0)),
        None
    );
}

#[test]
fn encode_access_configuration_tags() {
    assert_eq!(
        encode(
            Channel::AccessConfiguration,
            &Command::Text("timer".to_string())
        ),
        Some(WriteRequest::new("ast", "3"))
    );
    assert_eq!(
        encode(
            Channel::AccessConfiguration,
            &Command::Text("OPEN".to_string())
        ),
        Some(WriteRequest::new("ast", "0"))
    );
    assert_eq!(
        encode(
            Channel::AccessConfiguration,
            &Command::Text("bogus".to_string())
        ),
        None
    );
}

#[test]
fn refresh_and_read_only_channels_never_write() {
    for channel in Channel::ALL {
        assert_eq!(encode(*channel, &Command::Refresh), None);
    }
    assert_eq!(encode(Channel::Temperature, &Command::Number(20.0)), None);
    assert_eq!(
        encode(Channel::PwmSignal, &Command::Text("CHARGING".to_string())),
        None
    );
}

#[test]
fn read_write_channels_round_trip() {
    // decode(1) -> on -> encode(on) -> "1"
    let status = DeviceStatus::parse(ApiVersion::V1, r#"{"alw": 1, "ast": 3}"#).expect("parse");

    let allow = decode(Channel::AllowCharging, &status);
    let command = match allow {
        ChannelValue::OnOff(on) => Command::OnOff(on),
        other => panic!("unexpected allowCharging value: {other:?}"),
    };
    assert_eq!(
        encode(Channel::AllowCharging, &command),
        Some(WriteRequest::new("alw", "1"))
    );

    let access = decode(Channel::AccessConfiguration, &status);
    let command = match access {
        ChannelValue::Text(Some(tag)) => Command::Text(tag),
        other => panic!("unexpected accessConfiguration value: {other:?}"),
    };
    assert_eq!(
        encode(Channel::AccessConfiguration, &command),
        Some(WriteRequest::new("ast", "3"))
    );
}
