//! Single-pass region parser for `.vue` documents.
//!
//! Walks the top-level markup once, turning every block into a [`Region`]
//! spanning the block's content. Byte-level scanning with `memchr`; nothing
//! here allocates per character.

use std::ops::Range;

use memchr::memchr;

use super::region::{language_id_for, Region, RegionKind};
use crate::script::syntax::static_import_specifiers;

/// Everything the parser extracts from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRegions {
    /// Block regions, sorted by `start` and pairwise non-overlapping.
    pub regions: Vec<Region>,
    /// Directive attribute values inside the template block.
    pub attribute_regions: Vec<Region>,
    /// Static import specifiers and `<script src>` values, in document order.
    pub imported_scripts: Vec<String>,
}

/// Split a composite document into typed regions.
///
/// Malformed markup (an unclosed block, tag or comment) yields no regions at
/// all, so callers treat the whole file as the document-level language.
pub fn parse_regions(text: &str) -> ParsedRegions {
    match scan_blocks(text) {
        Some(parsed) => parsed,
        None => {
            tracing::debug!("region parse failed, treating document as unrecognized");
            ParsedRegions::default()
        }
    }
}

fn scan_blocks(text: &str) -> Option<ParsedRegions> {
    let bytes = text.as_bytes();
    let mut parsed = ParsedRegions::default();
    let mut pos = 0;

    while let Some(lt) = memchr(b'<', &bytes[pos..]) {
        pos += lt;

        if bytes[pos..].starts_with(b"<!--") {
            pos = skip_comment(text, pos)?;
            continue;
        }
        if !bytes.get(pos + 1).is_some_and(u8::is_ascii_alphabetic) {
            // Stray closing tag or bare `<` between blocks.
            pos += 1;
            continue;
        }

        let tag = parse_open_tag(text, pos)?;
        if tag.self_closing {
            pos = tag.end;
            continue;
        }

        let kind = RegionKind::from_tag(tag.name);
        let content_start = tag.end;
        let content_end = find_block_end(text, content_start, tag.name, kind)?;
        let close_end = content_end + memchr(b'>', &bytes[content_end..])? + 1;
        let content = &text[content_start..content_end];

        let language_id = language_id_for(kind, tag.attr("lang")).unwrap_or_else(|| match kind {
            RegionKind::Custom => tag.name.to_ascii_lowercase(),
            _ => kind.default_language_id().to_string(),
        });

        match kind {
            RegionKind::Script => {
                if let Some(src) = tag.attr("src").filter(|s| !s.is_empty()) {
                    parsed.imported_scripts.push(src.to_string());
                }
                parsed
                    .imported_scripts
                    .extend(static_import_specifiers(content, &language_id));
            }
            RegionKind::Markup => {
                collect_attribute_regions(text, content_start..content_end, &mut parsed);
            }
            RegionKind::Style | RegionKind::Custom => {}
        }

        parsed.regions.push(Region::block(
            kind,
            language_id,
            content_start..content_end,
        ));
        pos = close_end;
    }

    Some(parsed)
}

/// An opening tag with borrowed name and attributes.
#[derive(Debug)]
struct OpenTag<'a> {
    name: &'a str,
    attrs: Vec<Attr<'a>>,
    /// Offset one past the closing `>`.
    end: usize,
    self_closing: bool,
}

impl<'a> OpenTag<'a> {
    fn attr(&self, name: &str) -> Option<&'a str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_ref().map_or("", |(v, _)| *v))
    }
}

#[derive(Debug)]
struct Attr<'a> {
    name: &'a str,
    /// Value text and its span in the document, quotes excluded.
    value: Option<(&'a str, Range<usize>)>,
}

#[inline]
fn is_tag_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b':' | b'.')
}

#[inline]
fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
}

/// Parse the tag starting at `start` (which must point at `<`).
///
/// Returns `None` if the tag never reaches its `>`.
fn parse_open_tag(text: &str, start: usize) -> Option<OpenTag<'_>> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut pos = start + 1;

    let name_start = pos;
    while pos < len && is_tag_name_char(bytes[pos]) {
        pos += 1;
    }
    if pos == name_start {
        return None;
    }
    let name = &text[name_start..pos];
    let mut attrs = Vec::new();

    loop {
        while pos < len && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= len {
            return None;
        }

        match bytes[pos] {
            b'>' => {
                return Some(OpenTag {
                    name,
                    attrs,
                    end: pos + 1,
                    self_closing: false,
                });
            }
            b'/' if bytes.get(pos + 1) == Some(&b'>') => {
                return Some(OpenTag {
                    name,
                    attrs,
                    end: pos + 2,
                    self_closing: true,
                });
            }
            b'/' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = pos;
        while pos < len {
            let c = bytes[pos];
            if is_whitespace(c) || c == b'=' || c == b'>' || c == b'/' {
                break;
            }
            pos += 1;
        }
        if pos == attr_start {
            pos += 1;
            continue;
        }
        let attr_name = &text[attr_start..pos];

        while pos < len && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        let mut value = None;
        if pos < len && bytes[pos] == b'=' {
            pos += 1;
            while pos < len && is_whitespace(bytes[pos]) {
                pos += 1;
            }
            if pos < len && (bytes[pos] == b'"' || bytes[pos] == b'\'') {
                let quote = bytes[pos];
                let value_start = pos + 1;
                let value_end = value_start + memchr(quote, &bytes[value_start..])?;
                value = Some((&text[value_start..value_end], value_start..value_end));
                pos = value_end + 1;
            } else {
                let value_start = pos;
                while pos < len && !is_whitespace(bytes[pos]) && bytes[pos] != b'>' {
                    pos += 1;
                }
                value = Some((&text[value_start..pos], value_start..pos));
            }
        }

        attrs.push(Attr {
            name: attr_name,
            value,
        });
    }
}

/// Offset one past the end of the `<!-- ... -->` comment starting at `start`.
fn skip_comment(text: &str, start: usize) -> Option<usize> {
    text[start + 4..]
        .find("-->")
        .map(|idx| start + 4 + idx + 3)
}

/// Does `bytes[pos..]` start with `prefix` followed by a non-name byte?
fn starts_with_tag(bytes: &[u8], pos: usize, prefix: &[u8]) -> bool {
    let end = pos + prefix.len();
    end <= bytes.len()
        && bytes[pos..end].eq_ignore_ascii_case(prefix)
        && !bytes.get(end).copied().is_some_and(is_tag_name_char)
}

/// Find the offset of the `</tag` that closes the block whose content starts
/// at `from`.
///
/// Templates may contain nested `<template>` elements, so those are depth
/// counted; every other block ends at its first closing tag.
fn find_block_end(text: &str, from: usize, tag: &str, kind: RegionKind) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut close = Vec::with_capacity(tag.len() + 2);
    close.extend_from_slice(b"</");
    close.extend_from_slice(tag.as_bytes());
    let mut open = Vec::with_capacity(tag.len() + 1);
    open.push(b'<');
    open.extend_from_slice(tag.as_bytes());

    let mut depth = 0usize;
    let mut pos = from;
    while let Some(lt) = memchr(b'<', &bytes[pos..]) {
        pos += lt;
        if kind == RegionKind::Markup && bytes[pos..].starts_with(b"<!--") {
            pos = skip_comment(text, pos)?;
            continue;
        }
        if starts_with_tag(bytes, pos, &close) {
            if depth == 0 {
                return Some(pos);
            }
            depth -= 1;
            pos += close.len();
            continue;
        }
        if kind == RegionKind::Markup && starts_with_tag(bytes, pos, &open) {
            let nested = parse_open_tag(text, pos)?;
            if !nested.self_closing {
                depth += 1;
            }
            pos = nested.end;
            continue;
        }
        pos += 1;
    }
    None
}

/// Is this attribute a directive whose value is a script expression?
fn is_directive(name: &str) -> bool {
    name.starts_with("v-") || name.starts_with([':', '@', '#'])
}

fn collect_attribute_regions(text: &str, content: Range<usize>, parsed: &mut ParsedRegions) {
    let bytes = text.as_bytes();
    let language_id = RegionKind::Script.default_language_id();
    let mut pos = content.start;

    while pos < content.end {
        let Some(lt) = memchr(b'<', &bytes[pos..content.end]) else {
            break;
        };
        pos += lt;
        if bytes[pos..].starts_with(b"<!--") {
            match skip_comment(text, pos) {
                Some(next) => pos = next,
                None => break,
            }
            continue;
        }
        if !bytes.get(pos + 1).is_some_and(u8::is_ascii_alphabetic) {
            pos += 1;
            continue;
        }
        let Some(tag) = parse_open_tag(text, pos).filter(|t| t.end <= content.end) else {
            break;
        };
        for attr in tag.attrs.iter().filter(|a| is_directive(a.name)) {
            if let Some((_, span)) = &attr.value {
                parsed
                    .attribute_regions
                    .push(Region::attribute_value(language_id, span.clone()));
            }
        }
        pos = tag.end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice<'a>(text: &'a str, region: &Region) -> &'a str {
        &text[region.span()]
    }

    fn assert_well_formed(text: &str, regions: &[Region]) {
        for r in regions {
            assert!(r.start <= r.end && r.end <= text.len(), "{r:?}");
        }
        for pair in regions.windows(2) {
            assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn basic_component() {
        let text = "<template><div/></template><script>export default { data(){return {a:1}} }</script>";
        let parsed = parse_regions(text);
        assert_eq!(parsed.regions.len(), 2);

        let template = &parsed.regions[0];
        assert_eq!(template.kind, RegionKind::Markup);
        assert_eq!(template.language_id, "component-markup");
        assert_eq!(slice(text, template), "<div/>");

        let script = &parsed.regions[1];
        assert_eq!(script.kind, RegionKind::Script);
        assert_eq!(script.language_id, "script");
        assert_eq!(script.start, text.find("<script>").unwrap() + "<script>".len());
        assert_eq!(script.end, text.find("</script>").unwrap());
        assert_well_formed(text, &parsed.regions);
    }

    #[test]
    fn multiple_styles_are_kept() {
        let text = "<style>a{}</style>\n<style lang=\"scss\" scoped>b{}</style>";
        let parsed = parse_regions(text);
        assert_eq!(parsed.regions.len(), 2);
        assert_eq!(parsed.regions[0].language_id, "stylesheet");
        assert_eq!(parsed.regions[1].language_id, "scss");
        assert_eq!(slice(text, &parsed.regions[1]), "b{}");
    }

    #[test]
    fn lang_attribute_overrides_default() {
        let text = "<script lang=\"ts\">const a: number = 1</script>";
        let parsed = parse_regions(text);
        assert_eq!(parsed.regions[0].language_id, "typescript");
    }

    #[test]
    fn custom_block_uses_tag_name() {
        let text = "<i18n>{\"en\": {}}</i18n><docs lang=\"md\"># hi</docs>";
        let parsed = parse_regions(text);
        assert_eq!(parsed.regions[0].kind, RegionKind::Custom);
        assert_eq!(parsed.regions[0].language_id, "i18n");
        assert_eq!(parsed.regions[1].language_id, "md");
    }

    #[test]
    fn nested_templates_are_depth_counted() {
        let text = "<template><div><template v-if=\"ok\"><p/></template></div></template><style></style>";
        let parsed = parse_regions(text);
        assert_eq!(parsed.regions.len(), 2);
        assert_eq!(
            slice(text, &parsed.regions[0]),
            "<div><template v-if=\"ok\"><p/></template></div>"
        );
    }

    #[test]
    fn unclosed_block_yields_no_regions() {
        let parsed = parse_regions("<template><div></div></template><script>export default {}");
        assert!(parsed.regions.is_empty());
        assert!(parsed.imported_scripts.is_empty());

        let parsed = parse_regions("<template");
        assert!(parsed.regions.is_empty());
    }

    #[test]
    fn empty_script_block() {
        let text = "<template><div/></template><script></script>";
        let parsed = parse_regions(text);
        let script = &parsed.regions[1];
        assert!(script.is_empty());
        assert_eq!(script.start, text.len() - "</script>".len());
    }

    #[test]
    fn top_level_comments_are_skipped() {
        let text = "<!-- <script>nope</script> --><script>yes</script>";
        let parsed = parse_regions(text);
        assert_eq!(parsed.regions.len(), 1);
        assert_eq!(slice(text, &parsed.regions[0]), "yes");
    }

    #[test]
    fn directive_values_become_attribute_regions() {
        let text = "<template><button @click=\"count++\" :title='label' class=\"x\">{{ a }}</button></template>";
        let parsed = parse_regions(text);
        assert_eq!(parsed.regions.len(), 1);
        let values: Vec<_> = parsed
            .attribute_regions
            .iter()
            .map(|r| slice(text, r))
            .collect();
        assert_eq!(values, vec!["count++", "label"]);
        assert!(parsed.attribute_regions.iter().all(|r| r.is_attribute_value));

        let template = &parsed.regions[0];
        for attr in &parsed.attribute_regions {
            assert!(template.start <= attr.start && attr.end <= template.end);
        }
    }

    #[test]
    fn imports_and_src_are_collected() {
        let text = "<script src=\"./logic.js\"></script>\n<script>\nimport Foo from './Foo.vue'\nimport { ref } from 'vue'\nexport default {}\n</script>";
        let parsed = parse_regions(text);
        assert_eq!(
            parsed.imported_scripts,
            vec!["./logic.js", "./Foo.vue", "vue"]
        );
    }

    #[test]
    fn regions_are_sorted_and_disjoint() {
        let text = "\n<template>\n  <p>{{ msg }}</p>\n</template>\n\n<script lang=\"tsx\">\nexport default {}\n</script>\n<style module>.a{}</style>\n<custom/>\n";
        let parsed = parse_regions(text);
        assert_eq!(parsed.regions.len(), 3);
        assert_well_formed(text, &parsed.regions);
    }
}
