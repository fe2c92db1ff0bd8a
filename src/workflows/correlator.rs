use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::domain::models::{EpisodeKey, MediaKind, PairingTable};
use crate::workflows::episode::EpisodeKeyExtractor;

/// How episode keys are compared in the general pairing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMatching {
    /// Keys match iff both components are equal, including two keys with
    /// no detected markers at all.
    #[default]
    Loose,
    /// Like `Loose`, but a key with no detected markers matches nothing.
    Strict,
}

impl KeyMatching {
    pub fn matches(self, video: EpisodeKey, subtitle: EpisodeKey) -> bool {
        match self {
            KeyMatching::Loose => video == subtitle,
            KeyMatching::Strict => !video.is_bare() && video == subtitle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationPolicy {
    pub matching: KeyMatching,
    /// Pair one video with one subtitle without comparing keys.
    pub single_pair_shortcut: bool,
}

impl Default for CorrelationPolicy {
    fn default() -> Self {
        Self {
            matching: KeyMatching::Loose,
            single_pair_shortcut: true,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Discovered {
    pub videos: Vec<PathBuf>,
    pub subtitles: Vec<PathBuf>,
}

/// Expands `inputs` depth-first and sorts files into videos and subtitles.
/// Directory entries are visited in name order.
pub fn discover(inputs: &[PathBuf]) -> Discovered {
    let mut found = Discovered::default();
    for input in inputs {
        visit(input, &mut found);
    }
    found
}

fn visit(path: &Path, found: &mut Discovered) {
    if path.is_dir() {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read directory");
                return;
            }
        };
        let mut children: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot read directory entry");
                    None
                }
            })
            .collect();
        children.sort();

        for child in children {
            visit(&child, found);
        }
    } else if path.is_file() {
        match MediaKind::of(path) {
            Some(MediaKind::Video) => found.videos.push(path.to_path_buf()),
            Some(MediaKind::Subtitle) => found.subtitles.push(path.to_path_buf()),
            None => debug!(path = %path.display(), "ignoring file"),
        }
    } else {
        warn!(path = %path.display(), "No such file or directory");
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Associates every video with the subtitles whose episode key matches its own.
pub fn pair(
    found: &Discovered,
    extractor: &EpisodeKeyExtractor,
    policy: CorrelationPolicy,
) -> PairingTable {
    let mut table = PairingTable::default();

    if policy.single_pair_shortcut && found.videos.len() == 1 && found.subtitles.len() == 1 {
        debug!(
            video = %found.videos[0].display(),
            subtitle = %found.subtitles[0].display(),
            "single video and subtitle, pairing without key comparison"
        );
        table.push(found.videos[0].clone(), found.subtitles.clone());
        return table;
    }

    let subtitle_keys: Vec<(&PathBuf, EpisodeKey)> = found
        .subtitles
        .iter()
        .map(|s| (s, extractor.extract(&file_name(s))))
        .collect();

    for video in &found.videos {
        let key = extractor.extract(&file_name(video));
        let subtitles: Vec<PathBuf> = subtitle_keys
            .iter()
            .filter(|(_, sub_key)| policy.matching.matches(key, *sub_key))
            .map(|(path, _)| (*path).clone())
            .collect();
        debug!(
            video = %video.display(),
            key = %key,
            subtitles = subtitles.len(),
            "correlated video"
        );
        table.push(video.clone(), subtitles);
    }

    table
}

/// Discovers media under `inputs` and builds the pairing table.
pub fn correlate(
    inputs: &[PathBuf],
    extractor: &EpisodeKeyExtractor,
    policy: CorrelationPolicy,
) -> PairingTable {
    pair(&discover(inputs), extractor, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(&path).unwrap();
        path
    }

    fn found(videos: &[&str], subtitles: &[&str]) -> Discovered {
        Discovered {
            videos: videos.iter().map(PathBuf::from).collect(),
            subtitles: subtitles.iter().map(PathBuf::from).collect(),
        }
    }

    #[test]
    fn test_discover_recurses_and_classifies() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let a = touch(dir, "b/Show.S01E02.MKV");
        let b = touch(dir, "a/Show.S01E01.mkv");
        let sub = touch(dir, "a/subs/Show.S01E01.srt");
        touch(dir, "a/Show.nfo");

        let found = discover(&[dir.to_path_buf(), dir.join("missing")]);
        assert_eq!(found.videos, vec![b, a]);
        assert_eq!(found.subtitles, vec![sub]);
    }

    #[test]
    fn test_discover_accepts_single_files() {
        let temp_dir = TempDir::new().unwrap();
        let video = touch(temp_dir.path(), "Ep1.avi");

        let found = discover(&[video.clone()]);
        assert_eq!(found.videos, vec![video]);
        assert!(found.subtitles.is_empty());
    }

    #[test]
    fn test_pairs_by_episode_key() {
        let found = found(
            &["Show.S01E01.mkv", "Show.S01E02.mkv", "Show.S01E03.mkv"],
            &["show.1x02.srt", "Show.S01E01.srt", "Show.S01E01.en.ass"],
        );
        let table = pair(&found, &EpisodeKeyExtractor::new(), CorrelationPolicy::default());

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.get(Path::new("Show.S01E01.mkv")).unwrap().subtitles,
            vec![PathBuf::from("Show.S01E01.srt"), PathBuf::from("Show.S01E01.en.ass")]
        );
        assert_eq!(
            table.get(Path::new("Show.S01E02.mkv")).unwrap().subtitles,
            vec![PathBuf::from("show.1x02.srt")]
        );
        assert!(table.get(Path::new("Show.S01E03.mkv")).unwrap().subtitles.is_empty());
    }

    #[test]
    fn test_single_pair_shortcut_ignores_keys() {
        let found = found(&["Movie.S01E01.mkv"], &["whatever.S09E09.srt"]);
        let extractor = EpisodeKeyExtractor::new();

        let table = pair(&found, &extractor, CorrelationPolicy::default());
        assert_eq!(
            table.get(Path::new("Movie.S01E01.mkv")).unwrap().subtitles,
            vec![PathBuf::from("whatever.S09E09.srt")]
        );

        let policy = CorrelationPolicy {
            single_pair_shortcut: false,
            ..CorrelationPolicy::default()
        };
        let table = pair(&found, &extractor, policy);
        assert!(table.get(Path::new("Movie.S01E01.mkv")).unwrap().subtitles.is_empty());
    }

    #[test]
    fn test_single_video_without_subtitles() {
        let found = found(&["Ep1.mkv"], &[]);
        let table = pair(&found, &EpisodeKeyExtractor::new(), CorrelationPolicy::default());
        assert_eq!(table.len(), 1);
        assert!(table.iter().all(|p| p.subtitles.is_empty()));
    }

    // Filenames without markers all share the (0, 0) key. Loose matching
    // pairs them with each other, which may well be over-matching.
    #[test]
    fn test_bare_keys_match_only_when_loose() {
        let found = found(&["Movie.mkv", "Other.mkv"], &["Movie.srt"]);
        let extractor = EpisodeKeyExtractor::new();

        let loose = pair(&found, &extractor, CorrelationPolicy::default());
        assert!(loose.iter().all(|p| p.subtitles == vec![PathBuf::from("Movie.srt")]));

        let strict = pair(
            &found,
            &extractor,
            CorrelationPolicy {
                matching: KeyMatching::Strict,
                single_pair_shortcut: true,
            },
        );
        assert!(strict.iter().all(|p| p.subtitles.is_empty()));
    }

    #[test]
    fn test_colliding_keys_pair_with_every_video() {
        let found = found(&["A.S01E01.mkv", "B.S01E01.mkv"], &["x.S01E01.srt"]);
        let table = pair(&found, &EpisodeKeyExtractor::new(), CorrelationPolicy::default());
        assert!(table.iter().all(|p| p.subtitles.len() == 1));
    }

    #[test]
    fn test_correlate_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let video = touch(temp_dir.path(), "Ep1.mkv");
        let subtitle = touch(temp_dir.path(), "Ep1.srt");

        let table = correlate(
            &[temp_dir.path().to_path_buf()],
            &EpisodeKeyExtractor::new(),
            CorrelationPolicy::default(),
        );
        assert_eq!(table.get(&video).unwrap().subtitles, vec![subtitle]);
    }
}
