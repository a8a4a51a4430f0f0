//! Source classification: which of the four known layouts produced a text.
//!
//! Content fingerprints are scored per source; the directory hint is only
//! consulted when no source clears [`MIN_SCORE`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::SourceTag;

/// Minimum fingerprint score for a content-based decision.
pub const MIN_SCORE: u32 = 2;

/// Layout used when neither content nor hint identifies the source.
pub const FALLBACK_SOURCE: SourceTag = SourceTag::Charley;

struct Fingerprint {
    regex: Regex,
    source: SourceTag,
    weight: u32,
}

fn fp(pattern: &str, source: SourceTag, weight: u32) -> Fingerprint {
    Fingerprint {
        regex: Regex::new(pattern).unwrap(),
        source,
        weight,
    }
}

static FINGERPRINTS: LazyLock<Vec<Fingerprint>> = LazyLock::new(|| {
    use SourceTag::*;
    vec![
        // NamUs case export
        fp(r"\bNamUs\b", NamUs, 2),
        fp(r"(?i)\bCase\s+Created\b", NamUs, 1),
        fp(r"(?i)\bDate\s+of\s+Last\s+Contact\b", NamUs, 1),
        fp(r"(?i)\bCircumstances\s+of\s+Disappearance\b", NamUs, 1),
        fp(r"(?i)\bLegal\s+(?:First|Last)\s+Name\b", NamUs, 1),
        // NCMEC poster
        fp(r"(?i)\bHave\s+you\s+seen\s+this\s+child\?", Ncmec, 2),
        fp(r"\bNCMEC\b", Ncmec, 2),
        fp(r"(?i)\bmissingkids\b", Ncmec, 2),
        fp(r"(?i)1-800-THE-LOST", Ncmec, 2),
        fp(r"(?i)\bMissing\s+Since\s*:", Ncmec, 1),
        fp(r"(?i)\bAge\s+Now\b", Ncmec, 1),
        // FBI poster
        fp(r"(?i)\bFederal\s+Bureau\s+of\s+Investigation\b", Fbi, 2),
        fp(r"(?i)\bwww\.fbi\.gov\b", Fbi, 2),
        fp(r"\bFBI\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\s+Field\s+Office\b", Fbi, 2),
        fp(r"(?i)\bIf\s+you\s+have\s+any\s+information\s+concerning\s+this\s+(?:child|person)\b", Fbi, 1),
        fp(r"\bFBI\b", Fbi, 1),
        // Charley Project page
        fp(r"(?i)\bThe\s+Charley\s+Project\b", Charley, 3),
        fp(r"(?i)\bDetails\s+of\s+Disappearance\b", Charley, 2),
        fp(r"(?i)\bMissing\s+From\b", Charley, 1),
        fp(r"(?i)\bInvestigating\s+Agency\b", Charley, 1),
        fp(r"(?i)\bClassification\s*:?\s*(?:Endangered|Non-Family|Family|Lost|Runaway)", Charley, 1),
    ]
});

/// "Field Office: <location>" only appears on FBI posters.
pub static FIELD_OFFICE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bField\s+Office\s*:\s*([A-Za-z][A-Za-z .'\-]*[A-Za-z])").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationBasis {
    FieldOfficeMarker,
    Fingerprint,
    DirectoryHint,
    /// Neither content nor hint resolved the source.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub source: SourceTag,
    pub basis: ClassificationBasis,
    pub score: u32,
}

/// Per-source fingerprint scores, in priority order.
pub fn score_sources(text: &str) -> Vec<(SourceTag, u32)> {
    SourceTag::PRIORITY
        .iter()
        .map(|&source| {
            let score = FINGERPRINTS
                .iter()
                .filter(|f| f.source == source && f.regex.is_match(text))
                .map(|f| f.weight)
                .sum();
            (source, score)
        })
        .collect()
}

pub fn classify_source(text: &str, hint: Option<SourceTag>) -> Classification {
    let scores = score_sources(text);

    if FIELD_OFFICE_MARKER.is_match(text) {
        let score = scores
            .iter()
            .find(|(s, _)| *s == SourceTag::Fbi)
            .map(|(_, sc)| *sc)
            .unwrap_or(0);
        return Classification {
            source: SourceTag::Fbi,
            basis: ClassificationBasis::FieldOfficeMarker,
            score,
        };
    }

    // Scores come in priority order, so the first maximum wins ties.
    let mut best: Option<(SourceTag, u32)> = None;
    for &(source, score) in &scores {
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((source, score));
        }
    }

    if let Some((source, score)) = best.filter(|(_, s)| *s >= MIN_SCORE) {
        tracing::debug!(source = %source, score, "Source classified by fingerprint");
        return Classification {
            source,
            basis: ClassificationBasis::Fingerprint,
            score,
        };
    }

    let score = best.map(|(_, s)| s).unwrap_or(0);
    match hint {
        Some(source) => {
            tracing::info!(source = %source, score, "Fingerprints inconclusive, using directory hint");
            Classification {
                source,
                basis: ClassificationBasis::DirectoryHint,
                score,
            }
        }
        None => {
            tracing::warn!(
                fallback = %FALLBACK_SOURCE,
                score,
                "ClassificationAmbiguous: no fingerprint or hint resolved the source"
            );
            Classification {
                source: FALLBACK_SOURCE,
                basis: ClassificationBasis::Fallback,
                score,
            }
        }
    }
}
