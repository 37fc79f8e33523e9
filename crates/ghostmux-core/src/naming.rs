//! Deterministic, human-friendly labels for terminal ids.
//!
//! The first eight characters of an id (separators removed, lowercased) are
//! read as two 16-bit hex halves that index an adjective and a noun table.
//! The space is 50 × 50 = 2500 names, so collisions between live terminals
//! are possible; names are for display and addressing only.

const ADJECTIVES: [&str; 50] = [
    "swift", "bold", "calm", "keen", "warm", "cool", "wise", "fair", "kind", "pure", "free",
    "true", "glad", "soft", "firm", "deep", "wild", "neat", "safe", "rich", "rare", "vast", "tall",
    "slim", "dark", "pale", "gold", "jade", "ruby", "onyx", "iron", "zinc", "mint", "sage", "teal",
    "rust", "navy", "plum", "lime", "rose", "aqua", "dawn", "dusk", "noon", "peak", "base", "core",
    "apex", "node", "edge",
];

const NOUNS: [&str; 50] = [
    "falcon", "river", "storm", "flame", "frost", "spark", "wind", "wave", "cloud", "stone",
    "maple", "cedar", "birch", "aspen", "oak", "pine", "lotus", "iris", "daisy", "fern", "hawk",
    "crane", "finch", "raven", "dove", "wolf", "bear", "deer", "fox", "lynx", "tiger", "lion",
    "cobra", "viper", "owl", "comet", "nova", "star", "moon", "mars", "atlas", "delta", "gamma",
    "sigma", "theta", "prism", "nexus", "pulse", "helix", "axis",
];

const SEED_CHARS: usize = 8;
const HALF_CHARS: usize = 4;

pub fn friendly_name(id: &str) -> String {
    let (adjective, noun) = name_indices(id);
    format!("{}-{}", ADJECTIVES[adjective], NOUNS[noun])
}

/// First eight characters of the raw id.
pub fn short_id(id: &str) -> String {
    id.chars().take(SEED_CHARS).collect()
}

pub(crate) fn name_indices(id: &str) -> (usize, usize) {
    let seed: Vec<char> = id
        .chars()
        .filter(|ch| *ch != '-')
        .flat_map(char::to_lowercase)
        .take(SEED_CHARS)
        .collect();

    // Short seeds overlap: the noun half is always the last four characters.
    let adjective_half: String = seed.iter().take(HALF_CHARS).collect();
    let noun_half: String = seed[seed.len().saturating_sub(HALF_CHARS)..].iter().collect();

    (
        parse_half(&adjective_half) % ADJECTIVES.len(),
        parse_half(&noun_half) % NOUNS.len(),
    )
}

fn parse_half(half: &str) -> usize {
    u16::from_str_radix(half, 16).map(usize::from).unwrap_or(0)
}
