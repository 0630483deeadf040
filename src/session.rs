//! Per-user presentation state: recent searches, display unit and the
//! last resolution shown.

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use crate::error::AppError;
use crate::orchestrator::{Orchestrator, Resolution};
use crate::weather::{TempUnit, WeatherSnapshot};

pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Most recent first, title cased, no case-insensitive duplicates.
#[derive(Debug, Clone)]
pub struct SearchHistory {
    entries: VecDeque<String>,
    limit: usize,
}

impl SearchHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn record(&mut self, city: &str) {
        let name = title_case(city.trim());
        if name.is_empty() || self.limit == 0 {
            return;
        }
        let folded = name.to_lowercase();
        self.entries.retain(|existing| existing.to_lowercase() != folded);
        self.entries.push_front(name);
        self.entries.truncate(self.limit);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SearchHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

/// Uppercase the first letter of each whitespace-separated word, lowercase the rest.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Readings expressed in the session's display unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayedTemps {
    pub unit: TempUnit,
    pub temperature: f64,
    pub feels_like: f64,
}

impl DisplayedTemps {
    /// Recomputed from the metric snapshot, never from a previous display value.
    pub fn new(snapshot: &WeatherSnapshot, unit: TempUnit) -> Self {
        Self {
            unit,
            temperature: unit.from_celsius(snapshot.temperature_c),
            feels_like: unit.from_celsius(snapshot.feels_like_c),
        }
    }

    pub fn symbol(&self) -> &'static str {
        self.unit.symbol()
    }

    /// Another Celsius reading from the same snapshot, e.g. a forecast day.
    pub fn convert(&self, celsius: f64) -> f64 {
        self.unit.from_celsius(celsius)
    }
}

pub struct Session {
    orchestrator: Arc<Orchestrator>,
    history: SearchHistory,
    unit: TempUnit,
    current: Option<Resolution>,
}

impl Session {
    pub fn new(orchestrator: Arc<Orchestrator>, unit: TempUnit, history_limit: usize) -> Self {
        Self {
            orchestrator,
            history: SearchHistory::new(history_limit),
            unit,
            current: None,
        }
    }

    /// Resolve a city and make it current. A failure leaves the previous
    /// result and the history as they were.
    pub async fn search(&mut self, city: &str) -> Result<(), AppError> {
        let resolution = self.orchestrator.resolve(city).await?;
        self.history.record(city);
        debug!("History: {:?}", self.history.entries());
        self.current = Some(resolution);
        Ok(())
    }

    /// Flip °C/°F. The stored snapshot is never touched.
    pub fn toggle_units(&mut self) -> TempUnit {
        self.unit = self.unit.toggled();
        self.unit
    }

    pub fn unit(&self) -> TempUnit {
        self.unit
    }

    pub fn current(&self) -> Option<&Resolution> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    /// Current readings in the display unit, recomputed from the metric snapshot.
    pub fn displayed(&self) -> Option<DisplayedTemps> {
        self.current
            .as_ref()
            .map(|res| DisplayedTemps::new(&res.snapshot, self.unit))
    }
}
