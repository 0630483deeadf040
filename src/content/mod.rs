//! Weather-matched trivia and music suggestions.
//!
//! A generative model is tried first. Any failure on that path, including a
//! missing API key, lands on the hardcoded table in [`fallback`], so
//! [`ContentGenerator::generate`] always produces content.

pub mod fallback;
pub mod gemini;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::weather::WeatherSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// [5,12) morning, [12,17) afternoon, [17,21) evening, otherwise night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation hint for the content cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconTag {
    Sun,
    Cloud,
    WaterDrop,
    Flash,
    Snowflake,
    MusicNote,
    Lightbulb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifestyleContent {
    pub fact: String,
    pub music: String,
    pub explanation: String,
    pub condition_icon: IconTag,
    pub fact_icon: IconTag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub condition: String,
    pub temp_c: f64,
    pub city: String,
    pub time_of_day: TimeOfDay,
}

impl ContentRequest {
    /// Time of day is taken in the city's timezone, not the caller's.
    pub fn for_snapshot(snapshot: &WeatherSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            condition: snapshot.condition.clone(),
            temp_c: snapshot.temperature_c,
            city: snapshot.city.clone(),
            time_of_day: TimeOfDay::from_hour(snapshot.local_time(now).hour()),
        }
    }
}

/// Why the generative path was abandoned. Never leaves this module's
/// [`ContentGenerator::generate`].
#[derive(Debug, Error)]
pub enum ContentGenerationError {
    #[error("no generative API key configured")]
    Disabled,
    #[error("request failed: {0}")]
    Request(String),
    #[error("service returned HTTP {0}")]
    Status(u16),
    #[error("empty reply")]
    EmptyReply,
    #[error("unparseable reply: {0}")]
    Parse(String),
}

/// A text completion backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ContentGenerationError>;
}

#[derive(Debug, Deserialize)]
struct AiReply {
    #[serde(default = "default_fact")]
    fact: String,
    #[serde(default = "default_music")]
    music: String,
    #[serde(default)]
    music_explanation: Option<String>,
    /// Some replies use the shorter key
    #[serde(default)]
    explanation: Option<String>,
}

impl AiReply {
    fn explanation(&self) -> String {
        self.music_explanation
            .clone()
            .or_else(|| self.explanation.clone())
            .unwrap_or_else(default_explanation)
    }
}

fn default_fact() -> String { "Weather is interesting!".to_string() }
fn default_music() -> String { "Weather with You - Crowded House".to_string() }
fn default_explanation() -> String { "Fits the vibe.".to_string() }

#[derive(Clone)]
pub struct ContentGenerator {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl ContentGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator: Some(generator) }
    }

    /// Static table only.
    pub fn disabled() -> Self {
        Self { generator: None }
    }

    pub fn is_ai_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn generate(&self, request: &ContentRequest) -> LifestyleContent {
        match self.try_generate(request).await {
            Ok(content) => {
                info!("Generated lifestyle content for {} ({})", request.city, request.time_of_day);
                content
            }
            Err(ContentGenerationError::Disabled) => {
                debug!("AI content disabled, using static table");
                fallback::lifestyle_for(&request.condition)
            }
            Err(e) => {
                warn!("AI content failed for {}: {}", request.city, e);
                fallback::lifestyle_for(&request.condition)
            }
        }
    }

    pub async fn try_generate(
        &self,
        request: &ContentRequest,
    ) -> Result<LifestyleContent, ContentGenerationError> {
        let generator = self.generator.as_ref().ok_or(ContentGenerationError::Disabled)?;
        debug!(
            "AI prompt: {} | {} | {} | {:.1}",
            request.time_of_day, request.city, request.condition, request.temp_c
        );
        let text = generator.complete(&build_prompt(request)).await?;
        let reply = parse_reply(&text)?;

        Ok(LifestyleContent {
            explanation: reply.explanation(),
            fact: reply.fact,
            music: reply.music,
            condition_icon: condition_icon(&request.condition),
            fact_icon: IconTag::Lightbulb,
        })
    }
}

fn build_prompt(request: &ContentRequest) -> String {
    let ContentRequest { condition, temp_c, city, time_of_day } = request;
    format!(
        "It is currently {time_of_day} in {city}. The weather is {condition} and {temp_c:.1} degrees Celsius. \
         Give me a JSON response with three fields: \
         'fact' (a short and specific, scientific or historical trivia related to a {condition} weather or to {city}), \
         'music' (a song title and artist that strictly matches the vibe of this weather and time of day), \
         and 'music_explanation' (a very short, 1-sentence explanation of why this song fits the current weather and time). \
         Do not use markdown formatting."
    )
}

/// Drop a surrounding markdown code fence, with or without a language tag.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the info string ("json") up to the first newline
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest.trim_start_matches("json"),
    };
    rest.trim_end().trim_end_matches("```").trim()
}

fn parse_reply(text: &str) -> Result<AiReply, ContentGenerationError> {
    let text = strip_code_fences(text);
    let json = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    };
    serde_json::from_str(json)
        .map_err(|e| ContentGenerationError::Parse(format!("{} in {}", e, truncate(text, 100))))
}

/// Icon for AI content. Checked in order, first substring match wins.
fn condition_icon(condition: &str) -> IconTag {
    const MAP: &[(&str, IconTag)] = &[
        ("clear", IconTag::Sun),
        ("cloud", IconTag::Cloud),
        ("rain", IconTag::WaterDrop),
        ("thunder", IconTag::Flash),
        ("snow", IconTag::Snowflake),
    ];
    let condition = condition.to_lowercase();
    MAP.iter()
        .find(|(needle, _)| condition.contains(needle))
        .map(|(_, icon)| *icon)
        .unwrap_or(IconTag::MusicNote)
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max.saturating_sub(3);
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedGenerator;
    use super::*;
    use crate::weather::testing::snapshot;
    use chrono::TimeZone;

    fn request(condition: &str) -> ContentRequest {
        ContentRequest {
            condition: condition.to_string(),
            temp_c: 18.0,
            city: "London".to_string(),
            time_of_day: TimeOfDay::Evening,
        }
    }

    #[test]
    fn test_time_of_day_boundaries() {
        let cases = [
            (4, TimeOfDay::Night),
            (5, TimeOfDay::Morning),
            (11, TimeOfDay::Morning),
            (12, TimeOfDay::Afternoon),
            (16, TimeOfDay::Afternoon),
            (17, TimeOfDay::Evening),
            (20, TimeOfDay::Evening),
            (21, TimeOfDay::Night),
            (0, TimeOfDay::Night),
            (23, TimeOfDay::Night),
        ];
        for (hour, expected) in cases {
            assert_eq!(TimeOfDay::from_hour(hour), expected, "hour {}", hour);
        }
    }

    #[test]
    fn test_request_uses_city_timezone() {
        let mut snap = snapshot("Tokyo", 22.0, 2.0, "Clear");
        snap.utc_offset_secs = 9 * 3600;

        // 19:59 UTC is 04:59 in Tokyo, 20:00 UTC is 05:00
        let before = Utc.with_ymd_and_hms(2025, 6, 1, 19, 59, 0).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap();
        assert_eq!(ContentRequest::for_snapshot(&snap, before).time_of_day, TimeOfDay::Night);
        assert_eq!(ContentRequest::for_snapshot(&snap, at).time_of_day, TimeOfDay::Morning);
    }

    #[test]
    fn test_local_minute_boundaries() {
        let snap = snapshot("London", 15.0, 2.0, "Clear");
        let cases = [
            ((4, 59), TimeOfDay::Night),
            ((5, 0), TimeOfDay::Morning),
            ((11, 59), TimeOfDay::Morning),
            ((12, 0), TimeOfDay::Afternoon),
            ((16, 59), TimeOfDay::Afternoon),
            ((17, 0), TimeOfDay::Evening),
            ((20, 59), TimeOfDay::Evening),
            ((21, 0), TimeOfDay::Night),
        ];
        for ((h, m), expected) in cases {
            let now = Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap();
            assert_eq!(ContentRequest::for_snapshot(&snap, now).time_of_day, expected, "{:02}:{:02}", h, m);
        }
    }

    #[test]
    fn test_prompt_embeds_request() {
        let prompt = build_prompt(&request("Rain"));
        assert!(prompt.contains("It is currently evening in London"));
        assert!(prompt.contains("Rain and 18.0 degrees Celsius"));
        assert!(prompt.contains("'music_explanation'"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_reply_defaults_missing_fields() {
        let reply = parse_reply(r#"{"fact": "Fog is a cloud on the ground."}"#).unwrap();
        assert_eq!(reply.fact, "Fog is a cloud on the ground.");
        assert_eq!(reply.music, "Weather with You - Crowded House");
        assert_eq!(reply.explanation(), "Fits the vibe.");
    }

    #[test]
    fn test_parse_reply_explanation_keys() {
        let both = parse_reply(
            r#"{"fact": "f", "music": "m", "music_explanation": "long key", "explanation": "short key"}"#,
        )
        .unwrap();
        assert_eq!(both.explanation(), "long key");

        let short = parse_reply(r#"{"fact": "f", "explanation": "short key"}"#).unwrap();
        assert_eq!(short.explanation(), "short key");
    }

    #[test]
    fn test_parse_reply_rejects_prose() {
        assert!(matches!(
            parse_reply("Sorry, I can't help with that."),
            Err(ContentGenerationError::Parse(_))
        ));
    }

    #[test]
    fn test_condition_icon_order() {
        assert_eq!(condition_icon("Thunderstorm"), IconTag::Flash);
        assert_eq!(condition_icon("Snow"), IconTag::Snowflake);
        assert_eq!(condition_icon("Mist"), IconTag::MusicNote);
        assert_eq!(condition_icon("Clouds"), IconTag::Cloud);
    }

    #[tokio::test]
    async fn test_generate_uses_ai_reply() {
        let ai = Arc::new(ScriptedGenerator::replying(
            "```json\n{\"fact\": \"London gets less rain than Rome.\", \"music\": \"Rain - The Beatles\", \"music_explanation\": \"Obvious.\"}\n```",
        ));
        let generator = ContentGenerator::new(ai.clone());

        let content = generator.generate(&request("Rain")).await;
        assert_eq!(content.fact, "London gets less rain than Rome.");
        assert_eq!(content.music, "Rain - The Beatles");
        assert_eq!(content.explanation, "Obvious.");
        assert_eq!(content.condition_icon, IconTag::WaterDrop);
        assert_eq!(content.fact_icon, IconTag::Lightbulb);
        assert_eq!(ai.calls(), 1);
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_service_failure() {
        let ai = Arc::new(ScriptedGenerator::failing(503));
        let generator = ContentGenerator::new(ai.clone());

        let content = generator.generate(&request("Clear")).await;
        assert_eq!(content, fallback::lifestyle_for("Clear"));
        assert_eq!(ai.calls(), 1);
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_malformed_reply() {
        let ai = Arc::new(ScriptedGenerator::replying("not json at all"));
        let generator = ContentGenerator::new(ai);

        let content = generator.generate(&request("Clouds")).await;
        assert_eq!(content.music, "Sweater Weather - The Neighbourhood");
    }

    #[tokio::test]
    async fn test_disabled_skips_generator() {
        let generator = ContentGenerator::disabled();
        assert!(!generator.is_ai_enabled());
        assert!(matches!(
            generator.try_generate(&request("Rain")).await,
            Err(ContentGenerationError::Disabled)
        ));
        assert_eq!(generator.generate(&request("Rain")).await.music, "Umbrella - Rihanna");
    }
}
