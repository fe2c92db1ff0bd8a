use std::fmt;
use std::path::{Path, PathBuf};

pub const VIDEO_EXTENSIONS: &[&str] = &["avi", "mkv", "mp4"];
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Subtitle,
}

impl MediaKind {
    /// Classifies a path by its extension, case-insensitively.
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if SUBTITLE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Subtitle)
        } else {
            None
        }
    }
}

/// Season/episode pair inferred from a filename. Zero means "not present".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EpisodeKey {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeKey {
    /// True when no marker was found in the filename at all.
    pub fn is_bare(&self) -> bool {
        self.season == 0 && self.episode == 0
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Everything the remote search needs to identify a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSignature {
    pub fingerprint: Fingerprint,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub language: String,
    pub fingerprint: Fingerprint,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub display_name: String,
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSubtitle {
    pub file_id: String,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub video: PathBuf,
    pub subtitles: Vec<PathBuf>,
}

/// Videos in discovery order, each with the subtitles correlated to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingTable {
    entries: Vec<Pairing>,
}

impl PairingTable {
    pub fn push(&mut self, video: PathBuf, subtitles: Vec<PathBuf>) {
        self.entries.push(Pairing { video, subtitles });
    }

    #[cfg(test)]
    pub fn get(&self, video: &Path) -> Option<&Pairing> {
        self.entries.iter().find(|p| p.video == video)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pairing> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Pairing> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
