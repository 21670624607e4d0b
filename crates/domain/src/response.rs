use crate::{notification::Channel, occurrence::OccurrenceStatus};

/// How a recipient answered a reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Positive,
    Negative,
}

impl ResponseKind {
    pub fn resolved_status(&self) -> OccurrenceStatus {
        match self {
            Self::Positive => OccurrenceStatus::Success,
            Self::Negative => OccurrenceStatus::Rejected,
        }
    }
}

const POSITIVE_IDS: [&str; 2] = ["taken", "confirm"];
const NEGATIVE_IDS: [&str; 3] = ["skip", "cancel", "dismiss"];

const POSITIVE_WORDS: [&str; 8] = ["taken", "confirm", "yes", "si", "ok", "listo", "tome", "confirmar"];
const NEGATIVE_WORDS: [&str; 8] = [
    "skip", "cancel", "dismiss", "no", "omitir", "cancelar", "descartar", "nunca",
];

/// Classifies a button id, button title or free text reply.
///
/// Exact choice ids win. Otherwise the text is normalised (lowercase,
/// accents stripped) and matched word by word, negatives first so that
/// "no lo tomé" is not read as a confirmation. Voice replies also accept
/// the keypad digits 1 (positive) and 2 (negative).
pub fn classify_response(channel: Channel, text: &str) -> Option<ResponseKind> {
    let trimmed = text.trim();
    if POSITIVE_IDS.contains(&trimmed) {
        return Some(ResponseKind::Positive);
    }
    if NEGATIVE_IDS.contains(&trimmed) {
        return Some(ResponseKind::Negative);
    }

    if channel == Channel::Voice {
        match trimmed {
            "1" => return Some(ResponseKind::Positive),
            "2" => return Some(ResponseKind::Negative),
            _ => (),
        }
    }

    let normalized = normalize(trimmed);
    let words: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|w| NEGATIVE_WORDS.contains(w)) {
        return Some(ResponseKind::Negative);
    }
    if words.iter().any(|w| POSITIVE_WORDS.contains(w)) {
        return Some(ResponseKind::Positive);
    }
    None
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            c => c,
        })
        .collect()
}
