use std::str::FromStr;

use anyhow::{Context, Result};
use types::{Channel, Command, Quantity, Unit};

/// Parse a `<channel>=<value>` assignment into a typed command.
///
/// Value syntax: `on`/`off`, a bare number, `<number> <unit>` (e.g. `16 A`,
/// `10 kWh`), anything else is a text tag.
pub fn parse_assignment(input: &str) -> Result<(Channel, Command)> {
    let (channel, value) = input
        .split_once('=')
        .with_context(|| format!("expected <channel>=<value>, got '{input}'"))?;
    let channel = Channel::from_str(channel.trim())?;
    Ok((channel, parse_value(value.trim())))
}

fn parse_value(value: &str) -> Command {
    match value {
        "on" => return Command::OnOff(true),
        "off" => return Command::OnOff(false),
        _ => {}
    }

    if let Ok(number) = value.parse::<f64>() {
        return Command::Number(number);
    }

    if let Some((magnitude, symbol)) = value.split_once(' ') {
        if let (Ok(magnitude), Some(unit)) = (magnitude.parse::<f64>(), unit_from_symbol(symbol)) {
            return Command::Quantity(Quantity::new(magnitude, unit));
        }
    }

    Command::Text(value.to_string())
}

fn unit_from_symbol(symbol: &str) -> Option<Unit> {
    match symbol.trim() {
        "A" => Some(Unit::Ampere),
        "mA" => Some(Unit::Milliampere),
        "W" => Some(Unit::Watt),
        "kW" => Some(Unit::Kilowatt),
        "Wh" => Some(Unit::WattHour),
        "kWh" => Some(Unit::KilowattHour),
        "°C" | "C" => Some(Unit::Celsius),
        _ => None,
    }
}
