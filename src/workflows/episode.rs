use regex::Regex;
use tracing::debug;

use crate::domain::models::EpisodeKey;

const OPEN: &str = r"[\s\-_.\[({]";
const CLOSE: &str = r"[\s\-_.\])}]";

/// What a rule's capture groups stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Captures {
    Episode,
    SeasonEpisode,
}

#[derive(Debug)]
struct Rule {
    name: &'static str,
    pattern: Regex,
    captures: Captures,
}

/// Infers an [`EpisodeKey`] from a filename.
///
/// Rules run in order and every rule that matches overwrites the fields it
/// captures, so later, more specific rules win over earlier ones.
#[derive(Debug)]
pub struct EpisodeKeyExtractor {
    rules: Vec<Rule>,
}

impl Default for EpisodeKeyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EpisodeKeyExtractor {
    pub fn new() -> Self {
        let table: [(&str, String, Captures); 4] = [
            (
                "bare-episode",
                format!(r"{OPEN}(\d{{1,2}}){CLOSE}"),
                Captures::Episode,
            ),
            (
                "dense",
                format!(r"{OPEN}(\d{{1,2}})(\d{{2}}){CLOSE}"),
                Captures::SeasonEpisode,
            ),
            (
                "cross",
                format!(r"{OPEN}(\d{{1,2}})x(\d{{2}}){CLOSE}"),
                Captures::SeasonEpisode,
            ),
            ("sxxexx", r"s(\d{1,2})e(\d{1,2})".to_string(), Captures::SeasonEpisode),
        ];

        let rules = table
            .into_iter()
            .map(|(name, pattern, captures)| Rule {
                name,
                // Patterns are compile-time constants.
                pattern: Regex::new(&format!("(?i){pattern}")).unwrap(),
                captures,
            })
            .collect();

        Self { rules }
    }

    /// Rule names in the order they are applied.
    #[cfg(test)]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    pub fn extract(&self, name: &str) -> EpisodeKey {
        let mut key = EpisodeKey::default();

        for rule in &self.rules {
            let Some(caps) = rule.pattern.captures(name) else {
                continue;
            };
            debug!(rule = rule.name, name, "episode rule matched");
            let number = |i: usize| {
                caps.get(i)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(0)
            };
            match rule.captures {
                Captures::Episode => key.episode = number(1),
                Captures::SeasonEpisode => {
                    key.season = number(1);
                    key.episode = number(2);
                }
            }
        }

        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(name: &str) -> (u32, u32) {
        let key = EpisodeKeyExtractor::new().extract(name);
        (key.season, key.episode)
    }

    #[test]
    fn test_rule_order_is_fixed() {
        assert_eq!(
            EpisodeKeyExtractor::new().rule_names(),
            vec!["bare-episode", "dense", "cross", "sxxexx"]
        );
    }

    #[test]
    fn test_sxxexx() {
        assert_eq!(extract("Show.S02E05.mkv"), (2, 5));
        assert_eq!(extract("show.s2e5.srt"), (2, 5));
        assert_eq!(extract("ShowS10E12"), (10, 12));
    }

    #[test]
    fn test_cross_notation() {
        assert_eq!(extract("Show.2x05.mkv"), (2, 5));
        assert_eq!(extract("Show [12X03].srt"), (12, 3));
    }

    #[test]
    fn test_dense_notation() {
        assert_eq!(extract("Show.205.mkv"), (2, 5));
        assert_eq!(extract("Show - 1012 - Title.avi"), (10, 12));
    }

    #[test]
    fn test_bare_episode() {
        assert_eq!(extract("Show.05.mkv"), (0, 5));
        assert_eq!(extract("Show (7) Title.mp4"), (0, 7));
        assert_eq!(extract("Show_{3}_x.srt"), (0, 3));
    }

    #[test]
    fn test_later_rules_win() {
        // The bare episode rule sees "03", the explicit marker overrides it.
        assert_eq!(extract("Show.03.S01E09.mkv"), (1, 9));
    }

    #[test]
    fn test_no_markers_default_to_zero() {
        assert_eq!(extract("Ep1.mkv"), (0, 0));
        assert_eq!(extract("Movie.1080p.mkv"), (0, 0));
        assert_eq!(extract(""), (0, 0));
    }
}
