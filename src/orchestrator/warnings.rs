use serde::Serialize;

use crate::weather::WeatherSnapshot;

const EXTREME_HEAT_C: f64 = 35.0;
const HIGH_HEAT_C: f64 = 30.0;
const FREEZE_C: f64 = 5.0;
/// m/s
const HIGH_WIND: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    ExtremeHeat,
    HighHeat,
    Freeze,
    HighWind,
    RainAdvisory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

/// At most one warning, first match in priority order.
pub fn derive_warning(snapshot: &WeatherSnapshot) -> Option<Warning> {
    let temp = snapshot.temperature_c;
    let wind = snapshot.wind_speed;

    let (kind, message) = if temp > EXTREME_HEAT_C {
        (
            WarningKind::ExtremeHeat,
            format!("Extreme Heat Alert! ({:.1}°C) Wear sunscreen.", temp),
        )
    } else if temp > HIGH_HEAT_C {
        (
            WarningKind::HighHeat,
            format!("High Temp Warning ({:.1}°C) Stay hydrated.", temp),
        )
    } else if temp < FREEZE_C {
        (WarningKind::Freeze, format!("Freeze Warning! ({:.1}°C)", temp))
    } else if wind > HIGH_WIND {
        (WarningKind::HighWind, format!("High Wind Alert! ({} m/s)", wind))
    } else if snapshot.condition.to_lowercase().contains("rain") {
        (
            WarningKind::RainAdvisory,
            "Rain Detected. Bring an umbrella!".to_string(),
        )
    } else {
        return None;
    };

    Some(Warning { kind, message })
}
