//! Typed regions of a composite `.vue` document.
//!
//! A region is a byte span of the host document that belongs to a single
//! sub-language: the content of a `<template>`, `<script>`, `<style>` or
//! custom block, or the value of a directive attribute inside the template.

use std::ops::Range;

/// Language id reported for offsets outside every region.
pub const DOCUMENT_LANGUAGE_ID: &str = "vue";

/// The block type a region was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// `<template>` content.
    Markup,
    /// `<script>` content, or a directive value inside the template.
    Script,
    /// `<style>` content.
    Style,
    /// Any other top-level block (`<i18n>`, `<docs>`, ...).
    Custom,
}

impl RegionKind {
    /// Language id used when a block declares no `lang` attribute.
    ///
    /// Custom blocks have no fixed default; the parser falls back to the tag
    /// name for them.
    pub fn default_language_id(self) -> &'static str {
        match self {
            RegionKind::Markup => "component-markup",
            RegionKind::Script => "script",
            RegionKind::Style => "stylesheet",
            RegionKind::Custom => "custom",
        }
    }

    /// Map a top-level tag name to its region kind.
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("template") {
            RegionKind::Markup
        } else if tag.eq_ignore_ascii_case("script") {
            RegionKind::Script
        } else if tag.eq_ignore_ascii_case("style") {
            RegionKind::Style
        } else {
            RegionKind::Custom
        }
    }
}

/// A single typed span of a composite document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub language_id: String,
    /// Byte offset of the first content byte.
    pub start: usize,
    /// Byte offset one past the last content byte.
    pub end: usize,
    /// Set for regions lifted out of a template attribute value.
    pub is_attribute_value: bool,
}

impl Region {
    pub fn block(kind: RegionKind, language_id: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            kind,
            language_id: language_id.into(),
            start: span.start,
            end: span.end,
            is_attribute_value: false,
        }
    }

    pub fn attribute_value(language_id: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            kind: RegionKind::Script,
            language_id: language_id.into(),
            start: span.start,
            end: span.end,
            is_attribute_value: true,
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Inclusive containment: a cursor sitting right before the closing tag
    /// still belongs to the block.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Normalize a `lang` attribute value into a language id.
///
/// Script blocks accept the usual short aliases; every other block keeps the
/// declared value, lowercased.
pub fn language_id_for(kind: RegionKind, lang: Option<&str>) -> Option<String> {
    let lang = lang.map(str::trim).filter(|l| !l.is_empty())?;
    let lang = lang.to_ascii_lowercase();
    if kind != RegionKind::Script {
        return Some(lang);
    }
    let normalized = match lang.as_str() {
        "ts" | "typescript" => "typescript",
        "tsx" => "tsx",
        "js" | "javascript" => "javascript",
        "jsx" => "jsx",
        _ => return Some(lang),
    };
    Some(normalized.to_string())
}
