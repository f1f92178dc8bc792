//! Language code negotiation.
//!
//! A request names its language either explicitly through the `languageCode`
//! query parameter or implicitly through `Accept-Language`. The explicit
//! parameter always wins; the header is only parsed when it is missing.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Weight assigned to entries without a usable `q=` parameter.
pub const DEFAULT_WEIGHT: f32 = 1.0;

/// One entry of an `Accept-Language` header.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedLanguage {
    pub code: String,
    pub weight: f32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("No language code provided and no valid Accept-Language header found")]
    NoLanguageCode,
}

impl IntoResponse for NegotiationError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "text/plain")],
            self.to_string(),
        )
            .into_response()
    }
}

/// Pick the language code for a request.
///
/// `explicit` is the `languageCode` query parameter, `accept_language` the raw
/// header value. The result is already normalized.
pub fn negotiate(
    explicit: Option<&str>,
    accept_language: Option<&str>,
) -> Result<String, NegotiationError> {
    let candidate = match explicit.filter(|code| !code.is_empty()) {
        Some(code) => code.to_string(),
        None => select_preferred(&parse_accept_language(accept_language.unwrap_or_default()))
            .map(|lang| lang.code.clone())
            .ok_or(NegotiationError::NoLanguageCode)?,
    };

    let code = normalize_language_code(&candidate);
    if code.is_empty() {
        return Err(NegotiationError::NoLanguageCode);
    }
    Ok(code)
}

/// Parse an `Accept-Language` value such as
/// `zh-CN,zh;q=0.9,en;q=0.8` into its entries, in header order.
pub fn parse_accept_language(value: &str) -> Vec<NegotiatedLanguage> {
    value
        .split(',')
        .filter_map(|entry| {
            let mut segments = entry.trim().split(';');
            let code = segments.next().unwrap_or_default().trim();
            if code.is_empty() {
                return None;
            }

            let weight = segments.next().map_or(DEFAULT_WEIGHT, parse_weight);
            Some(NegotiatedLanguage {
                code: code.to_string(),
                weight,
            })
        })
        .collect()
}

/// Highest weight wins; on a tie the earliest entry is kept.
pub fn select_preferred(languages: &[NegotiatedLanguage]) -> Option<&NegotiatedLanguage> {
    languages.iter().fold(None, |best, lang| match best {
        Some(current) if current.weight >= lang.weight => Some(current),
        _ => Some(lang),
    })
}

/// Drop anything after the first `;` and surrounding whitespace.
/// Casing is preserved.
pub fn normalize_language_code(code: &str) -> String {
    code.split(';').next().unwrap_or_default().trim().to_string()
}

fn parse_weight(segment: &str) -> f32 {
    segment
        .trim()
        .strip_prefix("q=")
        .and_then(|value| value.trim().parse::<f32>().ok())
        .filter(|weight| weight.is_finite())
        .unwrap_or(DEFAULT_WEIGHT)
}
