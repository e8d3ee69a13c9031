//! Script-side model: syntax lowering, the default-export rewrite and the
//! bridging module.

pub mod bridge;
pub mod kind;
pub mod rewrite;
pub mod syntax;

pub use bridge::{BridgeSchema, BRIDGE_FILE_NAME, BRIDGE_IDENTIFIER, BRIDGE_MODULE_NAME};
pub use kind::{Extension, ScriptKind};
pub use rewrite::{is_bridged, rewrite_default_export};
pub use syntax::{parse_script, static_import_specifiers, Node, NodeBuilder, ScriptTree, TextRange};
