use super::{IconTag, LifestyleContent};

struct StaticEntry {
    needle: &'static str,
    fact: &'static str,
    music: &'static str,
    explanation: &'static str,
    icon: IconTag,
}

/// Checked in order; the first substring found in the condition wins.
const TABLE: &[StaticEntry] = &[
    StaticEntry {
        needle: "clear",
        fact: "The sun is 400 times larger than the moon.",
        music: "Here Comes The Sun - The Beatles",
        explanation: "Perfect for a sunny day.",
        icon: IconTag::Sun,
    },
    StaticEntry {
        needle: "cloud",
        fact: "Clouds can weigh more than a million pounds!",
        music: "Sweater Weather - The Neighbourhood",
        explanation: "Cozy vibes for cloudy weather.",
        icon: IconTag::Cloud,
    },
    StaticEntry {
        needle: "rain",
        fact: "Raindrops look like hamburger buns when falling.",
        music: "Umbrella - Rihanna",
        explanation: "Stay dry out there!",
        icon: IconTag::WaterDrop,
    },
];

static DEFAULT_ENTRY: StaticEntry = StaticEntry {
    needle: "",
    fact: "The fastest wind ever recorded on Earth was 253 mph.",
    music: "Weather with You - Crowded House",
    explanation: "A classic weather song.",
    icon: IconTag::MusicNote,
};

/// Hardcoded content for a condition. Case-insensitive.
pub fn lifestyle_for(condition: &str) -> LifestyleContent {
    let condition = condition.to_lowercase();
    let entry = TABLE
        .iter()
        .find(|e| condition.contains(e.needle))
        .unwrap_or(&DEFAULT_ENTRY);

    LifestyleContent {
        fact: entry.fact.to_string(),
        music: entry.music.to_string(),
        explanation: entry.explanation.to_string(),
        condition_icon: entry.icon,
        fact_icon: IconTag::Lightbulb,
    }
}
