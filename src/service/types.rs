//! Data exchanged with the compiler service.
//!
//! Offsets are byte offsets into the script snapshot the host served, which
//! for components are also offsets into the original document.

use std::ops::Range;

/// Span reported by the compiler service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    pub start: usize,
    pub length: usize,
}

impl TextSpan {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    pub fn end(self) -> usize {
        self.start + self.length
    }

    pub fn range(self) -> Range<usize> {
        self.start..self.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDiagnostic {
    /// `None` for diagnostics that apply to the whole file.
    pub span: Option<TextSpan>,
    pub message: String,
    pub code: u32,
}

/// Kinds of completion entries and symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptElementKind {
    Keyword,
    Script,
    Module,
    ExternalModuleName,
    Class,
    LocalClass,
    Interface,
    Type,
    Enum,
    EnumMember,
    Variable,
    LocalVariable,
    Let,
    Const,
    Function,
    LocalFunction,
    Method,
    Getter,
    Setter,
    Property,
    Constructor,
    CallSignature,
    IndexSignature,
    ConstructSignature,
    Parameter,
    TypeParameter,
    Primitive,
    Label,
    Alias,
    Directory,
    String,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEntry {
    pub name: String,
    pub kind: ScriptElementKind,
    pub sort_text: String,
    /// Text the entry replaces, when it is not just the word at the cursor.
    pub replacement_span: Option<TextSpan>,
    /// Module the entry would be auto-imported from.
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletionOptions {
    /// Include exports of modules that are not imported yet.
    pub include_external_module_exports: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickInfo {
    pub kind: ScriptElementKind,
    pub text_span: TextSpan,
    /// Signature or type, rendered as code.
    pub display: String,
    pub documentation: String,
}

/// A definition or reference site in some file of the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanInFile {
    pub file_name: String,
    pub text_span: TextSpan,
}
