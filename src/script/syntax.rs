//! Owned script syntax tree.
//!
//! Scripts are parsed with `oxc_parser` and lowered into a small tree that
//! only models what the host needs: imports, re-exports and the default
//! export. Everything else is kept as an opaque `Other` node with its range.
//!
//! Nodes carry their text range. A node is either lowered from a parse or
//! built by [`NodeBuilder`]; in both cases the range is fixed at
//! construction.

use std::fmt;

use oxc_allocator::Allocator;
use oxc_ast::ast;
use oxc_parser::Parser;
use oxc_span::{GetSpan, Span};

use super::kind::ScriptKind;

/// Half-open byte range in the script text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

impl TextRange {
    pub const EMPTY: TextRange = TextRange { start: 0, end: 0 };

    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

impl From<Span> for TextRange {
    fn from(span: Span) -> Self {
        Self::new(span.start, span.end)
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Parsed,
    Synthetic,
}

/// A syntax node paired with its range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<T> {
    node: T,
    range: TextRange,
    origin: Origin,
}

impl<T> Node<T> {
    fn parsed(node: T, range: impl Into<TextRange>) -> Self {
        Self {
            node,
            range: range.into(),
            origin: Origin::Parsed,
        }
    }

    pub fn node(&self) -> &T {
        &self.node
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin == Origin::Synthetic
    }

    pub fn into_inner(self) -> T {
        self.node
    }

    /// Replace the payload, keeping range and origin.
    pub(crate) fn map<U>(self, f: impl FnOnce(T) -> U) -> Node<U> {
        Node {
            node: f(self.node),
            range: self.range,
            origin: self.origin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Import(ImportDeclaration),
    /// `export … from 'x'` and `export * from 'x'`.
    ReExport(Node<StringLiteral>),
    ExportDefault(ExportDefault),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDeclaration {
    pub default_binding: Option<Node<Identifier>>,
    pub source: Node<StringLiteral>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDefault {
    pub expression: Node<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Object(ObjectLiteral),
    Call(CallExpression),
    Identifier(Identifier),
    /// Anything else, including `export default class` / `function`.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLiteral {
    pub properties: Vec<Node<Property>>,
}

/// An object member. `key` is `None` for spreads and computed keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpression {
    pub callee: Box<Node<Expression>>,
    pub arguments: Node<Vec<Node<Expression>>>,
}

impl CallExpression {
    pub fn callee_name(&self) -> Option<&str> {
        match self.callee.node() {
            Expression::Identifier(id) => Some(&id.name),
            _ => None,
        }
    }
}

/// Builds synthetic nodes. Every constructor takes the final range up front.
pub struct NodeBuilder;

impl NodeBuilder {
    fn synthetic<T>(node: T, range: TextRange) -> Node<T> {
        Node {
            node,
            range,
            origin: Origin::Synthetic,
        }
    }

    pub fn identifier(name: &str, range: TextRange) -> Node<Identifier> {
        Self::synthetic(
            Identifier {
                name: name.to_string(),
            },
            range,
        )
    }

    pub fn identifier_expression(name: &str, range: TextRange) -> Node<Expression> {
        Self::synthetic(
            Expression::Identifier(Identifier {
                name: name.to_string(),
            }),
            range,
        )
    }

    pub fn string_literal(value: &str, range: TextRange) -> Node<StringLiteral> {
        Self::synthetic(
            StringLiteral {
                value: value.to_string(),
            },
            range,
        )
    }

    /// `import <binding> from '<specifier>'` with every part at `range`.
    pub fn default_import(binding: &str, specifier: &str, range: TextRange) -> Node<Statement> {
        Self::synthetic(
            Statement::Import(ImportDeclaration {
                default_binding: Some(Self::identifier(binding, range)),
                source: Self::string_literal(specifier, range),
            }),
            range,
        )
    }

    pub fn call(
        callee: Node<Expression>,
        arguments: Vec<Node<Expression>>,
        range: TextRange,
        arguments_range: TextRange,
    ) -> Node<Expression> {
        Self::synthetic(
            Expression::Call(CallExpression {
                callee: Box::new(callee),
                arguments: Self::synthetic(arguments, arguments_range),
            }),
            range,
        )
    }
}

/// Lowered top-level statements of one script.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptTree {
    pub(crate) statements: Vec<Node<Statement>>,
    pub(crate) source_len: u32,
    pub(crate) had_errors: bool,
}

impl ScriptTree {
    pub fn statements(&self) -> &[Node<Statement>] {
        &self.statements
    }

    pub fn source_len(&self) -> u32 {
        self.source_len
    }

    /// True when the parser reported recoverable errors or gave up.
    pub fn had_errors(&self) -> bool {
        self.had_errors
    }

    /// Expression of the first `export default`.
    pub fn default_export(&self) -> Option<&Node<Expression>> {
        self.statements.iter().find_map(|stmt| match stmt.node() {
            Statement::ExportDefault(export) => Some(&export.expression),
            _ => None,
        })
    }

    /// Specifiers of imports and re-exports in source order.
    pub fn module_specifiers(&self) -> impl Iterator<Item = &str> {
        self.statements.iter().filter_map(|stmt| match stmt.node() {
            Statement::Import(import) => Some(import.source.node().value.as_str()),
            Statement::ReExport(source) => Some(source.node().value.as_str()),
            _ => None,
        })
    }
}

/// Parse `source` as `kind` and lower it.
pub fn parse_script(source: &str, kind: ScriptKind) -> ScriptTree {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, kind.source_type()).parse();
    let source_len = u32::try_from(source.len()).unwrap_or(u32::MAX);

    if ret.panicked {
        tracing::debug!(?kind, errors = ret.errors.len(), "script parse aborted");
        return ScriptTree {
            statements: Vec::new(),
            source_len,
            had_errors: true,
        };
    }

    ScriptTree {
        statements: ret.program.body.iter().map(lower_statement).collect(),
        source_len,
        had_errors: !ret.errors.is_empty(),
    }
}

/// Static import and re-export specifiers of a script block.
pub fn static_import_specifiers(source: &str, language_id: &str) -> Vec<String> {
    parse_script(source, ScriptKind::from_language_id(language_id))
        .module_specifiers()
        .map(str::to_string)
        .collect()
}

fn lower_statement(stmt: &ast::Statement<'_>) -> Node<Statement> {
    match stmt {
        ast::Statement::ImportDeclaration(decl) => {
            let default_binding = decl.specifiers.as_ref().and_then(|specifiers| {
                specifiers.iter().find_map(|s| match s {
                    ast::ImportDeclarationSpecifier::ImportDefaultSpecifier(d) => Some(
                        Node::parsed(
                            Identifier {
                                name: d.local.name.to_string(),
                            },
                            d.local.span,
                        ),
                    ),
                    _ => None,
                })
            });
            Node::parsed(
                Statement::Import(ImportDeclaration {
                    default_binding,
                    source: lower_string(&decl.source),
                }),
                decl.span,
            )
        }
        ast::Statement::ExportNamedDeclaration(decl) => match &decl.source {
            Some(source) => Node::parsed(Statement::ReExport(lower_string(source)), decl.span),
            None => Node::parsed(Statement::Other, decl.span),
        },
        ast::Statement::ExportAllDeclaration(decl) => {
            Node::parsed(Statement::ReExport(lower_string(&decl.source)), decl.span)
        }
        ast::Statement::ExportDefaultDeclaration(decl) => {
            let expression = match &decl.declaration {
                ast::ExportDefaultDeclarationKind::ObjectExpression(obj) => lower_object(obj),
                ast::ExportDefaultDeclarationKind::CallExpression(call) => lower_call(call),
                ast::ExportDefaultDeclarationKind::Identifier(id) => lower_identifier(id),
                other => Node::parsed(Expression::Other, other.span()),
            };
            Node::parsed(
                Statement::ExportDefault(ExportDefault { expression }),
                decl.span,
            )
        }
        other => Node::parsed(Statement::Other, other.span()),
    }
}

fn lower_string(lit: &ast::StringLiteral<'_>) -> Node<StringLiteral> {
    Node::parsed(
        StringLiteral {
            value: lit.value.to_string(),
        },
        lit.span,
    )
}

fn lower_identifier(id: &ast::IdentifierReference<'_>) -> Node<Expression> {
    Node::parsed(
        Expression::Identifier(Identifier {
            name: id.name.to_string(),
        }),
        id.span,
    )
}

fn lower_expression(expr: &ast::Expression<'_>) -> Node<Expression> {
    match expr {
        ast::Expression::ObjectExpression(obj) => lower_object(obj),
        ast::Expression::CallExpression(call) => lower_call(call),
        ast::Expression::Identifier(id) => lower_identifier(id),
        other => Node::parsed(Expression::Other, other.span()),
    }
}

fn lower_argument(arg: &ast::Argument<'_>) -> Node<Expression> {
    match arg {
        ast::Argument::ObjectExpression(obj) => lower_object(obj),
        ast::Argument::CallExpression(call) => lower_call(call),
        ast::Argument::Identifier(id) => lower_identifier(id),
        other => Node::parsed(Expression::Other, other.span()),
    }
}

fn lower_object(obj: &ast::ObjectExpression<'_>) -> Node<Expression> {
    let properties = obj
        .properties
        .iter()
        .map(|prop| match prop {
            ast::ObjectPropertyKind::ObjectProperty(p) => {
                let key = match &p.key {
                    ast::PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
                    ast::PropertyKey::StringLiteral(s) => Some(s.value.to_string()),
                    _ => None,
                };
                Node::parsed(Property { key }, p.span)
            }
            ast::ObjectPropertyKind::SpreadProperty(s) => {
                Node::parsed(Property { key: None }, s.span)
            }
        })
        .collect();
    Node::parsed(Expression::Object(ObjectLiteral { properties }), obj.span)
}

fn lower_call(call: &ast::CallExpression<'_>) -> Node<Expression> {
    let arguments: Vec<Node<Expression>> = call.arguments.iter().map(lower_argument).collect();
    // oxc does not record the parenthesized list; cover the arguments themselves.
    let arguments_range = match (arguments.first(), arguments.last()) {
        (Some(first), Some(last)) => TextRange::new(first.range().start, last.range().end),
        _ => TextRange::new(call.span.end, call.span.end),
    };
    Node::parsed(
        Expression::Call(CallExpression {
            callee: Box::new(lower_expression(&call.callee)),
            arguments: Node::parsed(arguments, arguments_range),
        }),
        call.span,
    )
}

/// Indented outline of the tree, one node per line.
impl fmt::Display for ScriptTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write_statement(f, stmt)?;
        }
        Ok(())
    }
}

fn marker<T>(node: &Node<T>) -> &'static str {
    if node.is_synthetic() {
        " (synthetic)"
    } else {
        ""
    }
}

fn write_statement(f: &mut fmt::Formatter<'_>, stmt: &Node<Statement>) -> fmt::Result {
    let range = stmt.range();
    match stmt.node() {
        Statement::Import(import) => {
            write!(f, "Import @{range}{}", marker(stmt))?;
            if let Some(binding) = &import.default_binding {
                write!(f, " default {}@{}", binding.node().name, binding.range())?;
            }
            writeln!(
                f,
                " from {:?}@{}",
                import.source.node().value,
                import.source.range()
            )
        }
        Statement::ReExport(source) => {
            writeln!(f, "ReExport @{range} from {:?}", source.node().value)
        }
        Statement::ExportDefault(export) => {
            writeln!(f, "ExportDefault @{range}{}", marker(stmt))?;
            write_expression(f, &export.expression, 1)
        }
        Statement::Other => writeln!(f, "Other @{range}"),
    }
}

fn write_expression(f: &mut fmt::Formatter<'_>, expr: &Node<Expression>, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    let range = expr.range();
    match expr.node() {
        Expression::Object(obj) => {
            let keys: Vec<&str> = obj
                .properties
                .iter()
                .map(|p| p.node().key.as_deref().unwrap_or("<computed>"))
                .collect();
            writeln!(f, "{indent}Object @{range}{} {{{}}}", marker(expr), keys.join(", "))
        }
        Expression::Call(call) => {
            writeln!(f, "{indent}Call @{range}{}", marker(expr))?;
            writeln!(f, "{indent}  callee:")?;
            write_expression(f, &call.callee, depth + 2)?;
            writeln!(
                f,
                "{indent}  arguments @{}{}:",
                call.arguments.range(),
                marker(&call.arguments)
            )?;
            for arg in call.arguments.node() {
                write_expression(f, arg, depth + 2)?;
            }
            Ok(())
        }
        Expression::Identifier(id) => {
            writeln!(f, "{indent}Identifier {} @{range}{}", id.name, marker(expr))
        }
        Expression::Other => writeln!(f, "{indent}Other @{range}"),
    }
}
