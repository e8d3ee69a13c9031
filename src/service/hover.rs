//! Hover conversion for script blocks.

use tower_lsp::lsp_types::{Hover, HoverContents, LanguageString, MarkedString};

use super::types::QuickInfo;
use crate::document::LineIndex;

/// Language tag for the signature block.
const DISPLAY_LANGUAGE: &str = "ts";

/// Build a hover from quick info. Documentation, when there is any, comes
/// first and is separated from the signature by a newline.
pub fn to_hover(info: QuickInfo, line_index: &LineIndex) -> Hover {
    let signature = MarkedString::LanguageString(LanguageString {
        language: DISPLAY_LANGUAGE.to_string(),
        value: info.display,
    });
    let contents = if info.documentation.is_empty() {
        vec![signature]
    } else {
        vec![
            MarkedString::String(info.documentation),
            MarkedString::String("\n".to_string()),
            signature,
        ]
    };

    Hover {
        contents: HoverContents::Array(contents),
        range: Some(line_index.span_to_range(info.text_span.range())),
    }
}
