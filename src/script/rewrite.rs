//! Wraps a component's default-exported options object with the bridge.
//!
//! `export default { ... }` becomes, structurally,
//!
//! ```text
//! import __vueEditorBridge from 'vue-editor-bridge'
//! export default __vueEditorBridge({ ... })
//! ```
//!
//! The source text is never touched. The synthetic import sits at `0..0`, and
//! the call reuses the literal's range so every diagnostic on the options
//! object keeps pointing at the original text.

use super::bridge::{BRIDGE_IDENTIFIER, BRIDGE_MODULE_NAME};
use super::syntax::{ExportDefault, Expression, NodeBuilder, ScriptTree, Statement, TextRange};

/// Rewrite the first `export default <object literal>`.
///
/// Trees without such an export, including ones already wrapped, come back
/// unchanged.
pub fn rewrite_default_export(tree: ScriptTree) -> ScriptTree {
    let Some(index) = tree.statements.iter().position(|stmt| {
        matches!(
            stmt.node(),
            Statement::ExportDefault(export) if matches!(export.expression.node(), Expression::Object(_))
        )
    }) else {
        return tree;
    };

    let ScriptTree {
        mut statements,
        source_len,
        had_errors,
    } = tree;

    let export = statements.remove(index);
    let wrapped = export.map(|stmt| match stmt {
        Statement::ExportDefault(ExportDefault { expression }) => {
            let literal = expression.range();
            let callee = NodeBuilder::identifier_expression(
                BRIDGE_IDENTIFIER,
                TextRange::new(literal.start, literal.start + 1),
            );
            Statement::ExportDefault(ExportDefault {
                expression: NodeBuilder::call(callee, vec![expression], literal, literal),
            })
        }
        other => other,
    });
    statements.insert(index, wrapped);
    statements.insert(
        0,
        NodeBuilder::default_import(BRIDGE_IDENTIFIER, BRIDGE_MODULE_NAME, TextRange::EMPTY),
    );

    ScriptTree {
        statements,
        source_len,
        had_errors,
    }
}

/// Does the default export already go through the bridge?
pub fn is_bridged(tree: &ScriptTree) -> bool {
    matches!(
        tree.default_export().map(|e| e.node()),
        Some(Expression::Call(call)) if call.callee_name() == Some(BRIDGE_IDENTIFIER)
    )
}
