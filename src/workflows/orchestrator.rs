use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::domain::models::{Pairing, PairingTable, SearchCriteria, VideoSignature};
use crate::error::{Result, SubtitlerError};
use crate::infra::opensubtitles::SubtitleService;
use crate::media::checksum;
use crate::media::encoding::EncodingNormalizer;
use crate::workflows::renamer;
use crate::workflows::selection::SelectionStrategy;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub renamed: usize,
    pub downloaded: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// Rationalizes existing subtitles and fetches missing ones.
pub struct Orchestrator<'a> {
    service: &'a dyn SubtitleService,
    selector: Box<dyn SelectionStrategy + 'a>,
    normalizer: EncodingNormalizer,
    languages: Vec<String>,
}

/// Turns a service payload (base64 text of gzip data) into subtitle bytes.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>> {
    let compact: String = payload.split_whitespace().collect();
    let compressed = STANDARD
        .decode(compact)
        .map_err(|e| SubtitlerError::Payload(format!("invalid base64: {e}")))?;

    let mut raw = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut raw)
        .map_err(|e| SubtitlerError::Payload(format!("invalid gzip data: {e}")))?;
    Ok(raw)
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        service: &'a dyn SubtitleService,
        selector: Box<dyn SelectionStrategy + 'a>,
        normalizer: EncodingNormalizer,
        languages: Vec<String>,
    ) -> Self {
        Self {
            service,
            selector,
            normalizer,
            languages,
        }
    }

    pub fn run(&mut self, table: &mut PairingTable) -> RunSummary {
        let mut summary = RunSummary::default();
        for pairing in table.iter_mut() {
            if pairing.subtitles.is_empty() {
                self.acquire(pairing, &mut summary);
            } else {
                self.rationalize(pairing, &mut summary);
            }
        }
        summary
    }

    /// Re-encodes and renames every subtitle paired with the video.
    fn rationalize(&self, pairing: &mut Pairing, summary: &mut RunSummary) {
        for (index, subtitle) in pairing.subtitles.iter_mut().enumerate() {
            if let Err(e) = self.normalizer.normalize(subtitle) {
                warn!(path = %subtitle.display(), error = %e, "skipping subtitle");
                summary.failed += 1;
                continue;
            }
            match renamer::rename_subtitle(&pairing.video, subtitle, index) {
                Ok(new_path) => {
                    *subtitle = new_path;
                    summary.renamed += 1;
                }
                Err(e) => {
                    warn!(path = %subtitle.display(), error = %e, "could not rename subtitle");
                    summary.failed += 1;
                }
            }
        }
    }

    /// Tries every configured language, independently of earlier outcomes.
    fn acquire(&mut self, pairing: &mut Pairing, summary: &mut RunSummary) {
        info!(video = %pairing.video.display(), "Searching subtitles for video");
        let signature = checksum::compute(&pairing.video);

        for language in self.languages.clone() {
            let signature = match &signature {
                Ok(signature) => *signature,
                Err(e) => {
                    warn!(
                        video = %pairing.video.display(),
                        language = %language,
                        error = %e,
                        "cannot fingerprint video"
                    );
                    summary.failed += 1;
                    continue;
                }
            };

            match self.acquire_language(&pairing.video, signature, &language) {
                Ok(path) => {
                    pairing.subtitles.push(path);
                    summary.downloaded += 1;
                }
                Err(SubtitlerError::LookupEmpty { .. }) => {
                    info!(
                        video = %pairing.video.display(),
                        language = %language,
                        "No subtitles found"
                    );
                    summary.not_found += 1;
                }
                Err(e) => {
                    warn!(
                        video = %pairing.video.display(),
                        language = %language,
                        error = %e,
                        "Couldn't download subtitle"
                    );
                    summary.failed += 1;
                }
            }
        }
    }

    fn acquire_language(
        &mut self,
        video: &Path,
        signature: VideoSignature,
        language: &str,
    ) -> Result<PathBuf> {
        let target = renamer::with_suffix(&renamer::video_base(video)?, &format!("{language}.srt"));

        let criteria = SearchCriteria {
            language: language.to_string(),
            fingerprint: signature.fingerprint,
            size: signature.size,
        };
        let candidates = self.service.search(&criteria).unwrap_or_else(|e| {
            warn!(video = %video.display(), language, error = %e, "search failed");
            Vec::new()
        });
        if candidates.is_empty() {
            return Err(SubtitlerError::LookupEmpty {
                language: language.to_string(),
            });
        }

        let index = self.selector.select(language, &candidates)?;
        let chosen = candidates
            .get(index)
            .ok_or_else(|| SubtitlerError::InvalidSelection {
                input: index.to_string(),
            })?;
        info!(name = %chosen.display_name, "Downloading subtitle");

        let fetched = self.service.fetch(std::slice::from_ref(&chosen.file_id))?;
        let payload = fetched
            .into_iter()
            .next()
            .filter(|f| !f.payload.trim().is_empty())
            .ok_or_else(|| SubtitlerError::FetchEmpty {
                id: chosen.file_id.clone(),
            })?;

        let raw = decode_payload(&payload.payload)?;
        info!(path = %target.display(), "Writing subtitle to file");
        fs::write(&target, raw).map_err(|e| SubtitlerError::io(&target, e))?;
        self.normalizer.normalize(&target)?;

        Ok(target)
    }
}
