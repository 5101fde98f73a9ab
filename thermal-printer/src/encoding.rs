//! Code page utilities for single-byte thermal printers
//!
//! The printer renders text through a selectable code table. Text must be
//! converted from UTF-8 before it is written, and anything the table cannot
//! represent is rejected up front instead of being printed as garbage.
//!
//! This module provides:
//! - The [`CharacterProfile`] enum and its ESC/POS code table number
//! - Strict encoding (first unrepresentable character is reported)
//! - Width helpers and word wrapping for fixed-width paper

use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{PrintError, PrintResult};

/// Character encoding profile selected on the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CharacterProfile {
    /// Windows code page 1252 (Western European: Æ, Ø, Å)
    #[default]
    #[serde(rename = "CP1252", alias = "cp1252", alias = "windows-1252")]
    Cp1252,
}

impl CharacterProfile {
    /// ESC/POS code table number used with `ESC t n`
    pub fn code_table(self) -> u8 {
        match self {
            CharacterProfile::Cp1252 => 16,
        }
    }

    /// Backing encoding_rs encoding
    pub fn encoding(self) -> &'static Encoding {
        match self {
            CharacterProfile::Cp1252 => encoding_rs::WINDOWS_1252,
        }
    }

    /// Command bytes selecting this code table (`ESC t n`)
    pub fn select_command(self) -> [u8; 3] {
        [0x1B, 0x74, self.code_table()]
    }
}

impl fmt::Display for CharacterProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacterProfile::Cp1252 => f.write_str("CP1252"),
        }
    }
}

impl FromStr for CharacterProfile {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cp1252" | "windows-1252" | "wpc1252" => Ok(CharacterProfile::Cp1252),
            other => Err(PrintError::InvalidConfig(format!(
                "Unsupported character profile: {}",
                other
            ))),
        }
    }
}

/// Encode text under a profile, failing on the first unrepresentable character
///
/// Nothing is substituted: either every character maps to exactly one byte
/// of the code page, or an [`PrintError::Encoding`] names the culprit.
#[instrument(skip(text), fields(profile = %profile, len = text.len()))]
pub fn encode_strict(text: &str, profile: CharacterProfile) -> PrintResult<Vec<u8>> {
    let encoding = profile.encoding();
    let (cow, _, had_errors) = encoding.encode(text);
    if !had_errors {
        return Ok(cow.into_owned());
    }

    let mut buf = [0u8; 4];
    for (position, character) in text.chars().enumerate() {
        let (_, _, bad) = encoding.encode(character.encode_utf8(&mut buf));
        if bad {
            return Err(PrintError::Encoding {
                character,
                position,
                profile,
            });
        }
    }

    // encode() only reports errors for unmappable characters, so one was found above
    Err(PrintError::InvalidConfig(format!(
        "{} encoder rejected text without an unmappable character",
        profile
    )))
}

/// Check whether every character of `text` exists in the profile
pub fn is_encodable(text: &str, profile: CharacterProfile) -> bool {
    let (_, _, had_errors) = profile.encoding().encode(text);
    !had_errors
}

/// Decode printer bytes back to UTF-8
pub fn decode(bytes: &[u8], profile: CharacterProfile) -> String {
    let (cow, _) = profile.encoding().decode_without_bom_handling(bytes);
    cow.into_owned()
}

/// Printed width of a string in columns
///
/// Single-byte code pages print one column per character.
pub fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to fit within a column width
pub fn truncate(s: &str, max_width: usize) -> String {
    s.chars().take(max_width).collect()
}

/// Pad a string to a specific column width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad(s: &str, width: usize, align_right: bool) -> String {
    let current_width = text_width(s);
    if current_width >= width {
        return truncate(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}

/// Wrap text on word boundaries so no line exceeds `width` columns
///
/// Existing line breaks are kept. Words longer than a line are split.
pub fn wrap_text(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            let mut word: String = word.to_string();

            while text_width(&word) > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let head: String = word.chars().take(width).collect();
                word = word.chars().skip(width).collect();
                lines.push(head);
            }

            if word.is_empty() {
                continue;
            }

            if current.is_empty() {
                current = word;
            } else if text_width(&current) + 1 + text_width(&word) <= width {
                current.push(' ');
                current.push_str(&word);
            } else {
                lines.push(std::mem::replace(&mut current, word));
            }
        }
        lines.push(current);
    }
    lines.join("\n")
}
