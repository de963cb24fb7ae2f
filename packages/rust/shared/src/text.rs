//! Text normalization applied to every extracted string and claim.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Vietnamese vowels with tone marks, plus `đ`, kept by [`normalize_text`].
const DIACRITICS: &str = "áàảãạăắằẳẵặâấầẩẫậéèẻẽẹêếềểễệíìỉĩịóòỏõọôốồổỗộơớờởỡợúùủũụưứừửữựýỳỷỹỵđ";

static DISALLOWED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"[^\w\s.,!?;:\-(){DIACRITICS}]")).expect("valid regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// NFC-compose, lowercase, replace characters outside the whitelist with a
/// space, and collapse whitespace.
///
/// The function is idempotent: `normalize_text(normalize_text(s)) == normalize_text(s)`.
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let composed: String = text.nfc().collect();
    let lowered = composed.to_lowercase();
    let cleaned = DISALLOWED_RE.replace_all(&lowered, " ");
    WHITESPACE_RE.replace_all(&cleaned, " ").trim().to_string()
}

/// Length in Unicode scalar values. All length thresholds use this.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Return at most the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
