//! Plain-text rendering of a resolution for the terminal.

use chrono::NaiveDateTime;
use std::fmt::Write;

use crate::orchestrator::{DataSource, Resolution};
use crate::session::{title_case, DisplayedTemps};
use crate::weather::WeatherSnapshot;

pub fn footer(res: &Resolution) -> String {
    match res.source {
        DataSource::Live => "Live Data".to_string(),
        DataSource::Cached => format!("Updated {} mins ago", res.age_minutes()),
        DataSource::Offline => format!("Offline - Data from {} mins ago", res.age_minutes()),
    }
}

pub fn location_line(snapshot: &WeatherSnapshot) -> String {
    if snapshot.country.is_empty() {
        snapshot.city.clone()
    } else {
        format!("{}, {}", snapshot.city, snapshot.country)
    }
}

fn clock_time(time: Option<NaiveDateTime>) -> String {
    time.map(|t| t.format("%I:%M %p").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

pub fn render(res: &Resolution, temps: DisplayedTemps) -> String {
    let snap = &res.snapshot;
    let sym = temps.symbol();
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "{}", location_line(snap));
    let _ = writeln!(out, "{:.1}{}  {}", temps.temperature, sym, title_case(&snap.description));
    let _ = writeln!(out, "Feels like {:.1}{}", temps.feels_like, sym);

    if let Some(warning) = &res.warning {
        let _ = writeln!(out, "\n!! {}", warning.message);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  Humidity    {}%", snap.humidity);
    let _ = writeln!(out, "  Wind Speed  {} m/s", snap.wind_speed);
    let _ = writeln!(out, "  Wind Gust   {} m/s", snap.wind_gust);
    let _ = writeln!(out, "  Pressure    {} hPa", snap.pressure_hpa);
    let _ = writeln!(out, "  Sunrise     {}", clock_time(snap.local_epoch(snap.sunrise)));
    let _ = writeln!(out, "  Sunset      {}", clock_time(snap.local_epoch(snap.sunset)));

    if !res.forecast.is_empty() {
        let _ = writeln!(out, "\n{}-Day Forecast", res.forecast.len());
        let offset = chrono::Duration::seconds(i64::from(snap.utc_offset_secs));
        for day in &res.forecast {
            let _ = writeln!(
                out,
                "  {} {:.1}{} {}",
                (day.timestamp + offset).format("%a"),
                temps.convert(day.temp_c),
                sym,
                day.condition
            );
        }
    }

    let lifestyle = &res.lifestyle;
    let _ = writeln!(out, "\nDid you know? {}", lifestyle.fact);
    let _ = writeln!(out, "Now playing: {}", lifestyle.music);
    let _ = writeln!(out, "  {}", lifestyle.explanation);

    let _ = write!(out, "\n{}", footer(res));
    out
}
