//! Completion conversion for script blocks.

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionList, CompletionTextEdit, TextEdit,
};

use super::types::{CompletionEntry, ScriptElementKind};
use crate::document::LineIndex;
use crate::script::BRIDGE_IDENTIFIER;

/// Characters after which script completion is not offered; they belong to
/// markup and comments.
pub const NON_SCRIPT_TRIGGERS: [char; 4] = ['<', '/', '*', ':'];

/// Is the character before `offset` one of the non-script triggers?
pub fn after_non_script_trigger(text: &str, offset: usize) -> bool {
    text.get(..offset)
        .and_then(|before| before.chars().next_back())
        .is_some_and(|c| NON_SCRIPT_TRIGGERS.contains(&c))
}

pub fn completion_kind(kind: ScriptElementKind) -> CompletionItemKind {
    use ScriptElementKind as K;
    match kind {
        K::Primitive | K::Keyword => CompletionItemKind::KEYWORD,
        K::Variable | K::LocalVariable | K::Let | K::Const | K::Alias | K::Parameter => {
            CompletionItemKind::VARIABLE
        }
        K::Property | K::Getter | K::Setter => CompletionItemKind::FIELD,
        K::Function | K::LocalFunction => CompletionItemKind::FUNCTION,
        K::Method | K::ConstructSignature | K::CallSignature | K::IndexSignature => {
            CompletionItemKind::METHOD
        }
        K::Enum => CompletionItemKind::ENUM,
        K::EnumMember => CompletionItemKind::ENUM_MEMBER,
        K::Module | K::ExternalModuleName => CompletionItemKind::MODULE,
        K::Class | K::LocalClass | K::Type => CompletionItemKind::CLASS,
        K::Interface => CompletionItemKind::INTERFACE,
        K::TypeParameter => CompletionItemKind::TYPE_PARAMETER,
        K::Constructor => CompletionItemKind::CONSTRUCTOR,
        K::Script | K::Directory => CompletionItemKind::FILE,
        K::String => CompletionItemKind::CONSTANT,
        K::Label | K::Unknown => CompletionItemKind::PROPERTY,
    }
}

/// Convert service entries to an LSP list.
///
/// The bridge binding is dropped. Sort texts get the entry's position
/// appended so the client keeps the service's order among equal keys.
pub fn to_completion_list(entries: Vec<CompletionEntry>, line_index: &LineIndex) -> CompletionList {
    let items = entries
        .into_iter()
        .filter(|entry| entry.name != BRIDGE_IDENTIFIER)
        .enumerate()
        .map(|(index, entry)| {
            let text_edit = entry.replacement_span.map(|span| {
                CompletionTextEdit::Edit(TextEdit {
                    range: line_index.span_to_range(span.range()),
                    new_text: entry.name.clone(),
                })
            });
            CompletionItem {
                kind: Some(completion_kind(entry.kind)),
                sort_text: Some(format!("{}{}", entry.sort_text, index)),
                detail: entry.source,
                text_edit,
                label: entry.name,
                ..Default::default()
            }
        })
        .collect();

    CompletionList {
        is_incomplete: false,
        items,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use expect_test::expect;

    use super::*;
    use crate::service::types::TextSpan;

    fn entry(name: &str, kind: ScriptElementKind, sort_text: &str) -> CompletionEntry {
        CompletionEntry {
            name: name.to_string(),
            kind,
            sort_text: sort_text.to_string(),
            replacement_span: None,
            source: None,
        }
    }

    #[test]
    fn triggers_are_checked_on_the_preceding_character() {
        let text = "a < b; // c\n/* d */ x:";
        assert!(after_non_script_trigger(text, 3));
        assert!(!after_non_script_trigger(text, 4));
        assert!(after_non_script_trigger(text, text.len()));
        assert!(!after_non_script_trigger(text, 0));
        assert!(!after_non_script_trigger(text, 999));
    }

    #[test]
    fn bridge_entry_is_hidden_and_order_is_kept() {
        let index = LineIndex::new(Arc::from("export default { data }"));
        let mut data = entry("data", ScriptElementKind::Property, "0");
        data.replacement_span = Some(TextSpan::new(17, 4));
        let list = to_completion_list(
            vec![
                entry(BRIDGE_IDENTIFIER, ScriptElementKind::Alias, "0"),
                data,
                entry("methods", ScriptElementKind::Property, "0"),
                entry("console", ScriptElementKind::Variable, "1"),
            ],
            &index,
        );

        let rendered: Vec<String> = list
            .items
            .iter()
            .map(|item| {
                let kind = match item.kind {
                    Some(CompletionItemKind::FIELD) => "field",
                    Some(CompletionItemKind::VARIABLE) => "variable",
                    _ => "other",
                };
                format!(
                    "{} {} {}{}",
                    item.label,
                    kind,
                    item.sort_text.as_deref().unwrap_or(""),
                    match &item.text_edit {
                        Some(CompletionTextEdit::Edit(edit)) => format!(
                            " edit {}:{}-{}:{}",
                            edit.range.start.line,
                            edit.range.start.character,
                            edit.range.end.line,
                            edit.range.end.character
                        ),
                        _ => String::new(),
                    }
                )
            })
            .collect();
        expect![[r#"
            data field 00 edit 0:17-0:21
            methods field 01
            console variable 12"#]]
        .assert_eq(&rendered.join("\n"));
        assert!(!list.is_incomplete);
    }
}
