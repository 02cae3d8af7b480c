//! Regex-based reference discovery.
//!
//! Finds the specifiers a resource authors, records their byte spans so the
//! versioning pass can rewrite them, and reads hot-update declarations and
//! exported names from scripts. It does not parse: references inside comments
//! or string literals that look like statements are reported too.

use std::ops::Range;
use std::sync::LazyLock;

use async_trait::async_trait;
use kiln_graph::{InlineContent, Reference, ReferenceKind, ResourceKind, SourcePosition, essence};
use regex::{Captures, Regex};

use super::is_external;
use crate::plugins::{KilnPlugin, PluginContext, PluginError, PluginResult, TransformState};

static PATTERNS: LazyLock<Result<ScanPatterns, regex::Error>> = LazyLock::new(ScanPatterns::compile);

struct ScanPatterns {
    static_import: Regex,
    export_from: Regex,
    dynamic_import: Regex,
    hot_accept: Regex,
    hot_decline: Regex,
    quoted: Regex,
    export_decl: Regex,
    export_default: Regex,
    export_list: Regex,
    export_star: Regex,
    css_import: Regex,
    css_url: Regex,
    markup_tag: Regex,
    markup_attr: Regex,
    attr_type: Regex,
    attr_rel: Regex,
    attr_src: Regex,
    inline_script: Regex,
    inline_style: Regex,
}

impl ScanPatterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            static_import: Regex::new(
                r#"(?m)(?:^|[;}])\s*import\s*(?:[\w$*{}\s,]+?\s*from\s*)?["']([^"'\n]+)["']"#,
            )?,
            export_from: Regex::new(
                r#"(?m)(?:^|[;}])\s*export\s*(?:\*\s*(?:as\s+[\w$]+\s*)?|\{[^}]*\}\s*)from\s*["']([^"'\n]+)["']"#,
            )?,
            dynamic_import: Regex::new(r#"\bimport\s*\(\s*["']([^"'\n]+)["']\s*\)"#)?,
            hot_accept: Regex::new(
                r#"import\.meta\.hot\.accept\s*\(\s*(\[[^\]]*\]|"[^"]*"|'[^']*')?"#,
            )?,
            hot_decline: Regex::new(r"import\.meta\.hot\.decline\s*\(")?,
            quoted: Regex::new(r#""([^"]*)"|'([^']*)'"#)?,
            export_decl: Regex::new(
                r"(?m)(?:^|[;}])\s*export\s+(?:async\s+)?(?:function\s*\*?|class|const|let|var)\s*([\w$]+)",
            )?,
            export_default: Regex::new(r"(?m)(?:^|[;}])\s*export\s+default\b")?,
            export_list: Regex::new(r"(?m)(?:^|[;}])\s*export\s*\{([^}]*)\}")?,
            export_star: Regex::new(r"(?m)(?:^|[;}])\s*export\s*\*\s*from")?,
            css_import: Regex::new(
                r#"@import\s+(?:url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]+))\s*\)|"([^"]*)"|'([^']*)')"#,
            )?,
            css_url: Regex::new(r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]+))\s*\)"#)?,
            markup_tag: Regex::new(r"(?is)<(script|link|img|source|iframe|video|audio)\b([^>]*)>")?,
            markup_attr: Regex::new(r#"(?is)\b(src|href)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
            attr_type: Regex::new(r#"(?i)\btype\s*=\s*["']?([^"'\s>]+)"#)?,
            attr_rel: Regex::new(r#"(?i)\brel\s*=\s*["']?([^"'\s>]+)"#)?,
            attr_src: Regex::new(r"(?i)\bsrc\s*=")?,
            inline_script: Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>")?,
            inline_style: Regex::new(r"(?is)<style\b([^>]*)>(.*?)</style\s*>")?,
        })
    }
}

/// First participating group among `groups`.
fn first_group<'t>(caps: &Captures<'t>, groups: &[usize]) -> Option<regex::Match<'t>> {
    groups.iter().find_map(|idx| caps.get(*idx))
}

/// Discovers references, hot declarations and exported names.
///
/// Runs on scripts, stylesheets, markup and inline content. Transforms after it
/// may rewrite the text; [`TransformState::set_content`] carries the spans over.
///
/// [`TransformState::set_content`]: crate::plugins::TransformState::set_content
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceScannerPlugin;

impl ReferenceScannerPlugin {
    pub const NAME: &'static str = "scanner";

    pub fn new() -> Self {
        Self
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Script,
    Style,
    Markup,
}

fn syntax_of(kind: ResourceKind, content_type: &str) -> Option<Syntax> {
    match kind {
        ResourceKind::Module => Some(Syntax::Script),
        ResourceKind::Style => Some(Syntax::Style),
        ResourceKind::Markup => Some(Syntax::Markup),
        ResourceKind::Asset => None,
        ResourceKind::InlineVirtual => match ResourceKind::from_content_type(content_type) {
            ResourceKind::Module => Some(Syntax::Script),
            ResourceKind::Style => Some(Syntax::Style),
            _ => None,
        },
    }
}

#[async_trait]
impl KilnPlugin for ReferenceScannerPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn transform_content(
        &self,
        state: &mut TransformState,
        _ctx: &PluginContext,
    ) -> PluginResult<()> {
        let Some(syntax) = syntax_of(state.kind(), state.content_type()) else {
            return Ok(());
        };
        let Some(text) = state.text().map(str::to_owned) else {
            return Ok(());
        };
        let patterns = PATTERNS
            .as_ref()
            .map_err(|err| PluginError::new(format!("invalid scanner pattern: {err}")))?;

        let mut found = match syntax {
            Syntax::Script => {
                scan_script_declarations(patterns, &text, state);
                scan_script(patterns, &text)
            }
            Syntax::Style => scan_style(patterns, &text),
            Syntax::Markup => scan_markup(patterns, &text, state.url().file_name()),
        };
        found.sort_by_key(|reference| reference.span.as_ref().map_or(0, |span| span.start));

        for reference in found {
            if !is_external(&reference.specifier) {
                state.add_reference(reference);
            }
        }
        Ok(())
    }
}

fn reference_at(
    text: &str,
    specifier: &regex::Match<'_>,
    kind: ReferenceKind,
) -> Reference {
    Reference::new(specifier.as_str(), kind)
        .at(SourcePosition::from_offset(text, specifier.start()))
        .with_span(specifier.range())
}

fn scan_script(patterns: &ScanPatterns, text: &str) -> Vec<Reference> {
    let mut found = Vec::new();
    for (regex, kind) in [
        (&patterns.static_import, ReferenceKind::ModuleImport),
        (&patterns.export_from, ReferenceKind::ModuleImport),
        (&patterns.dynamic_import, ReferenceKind::DynamicImport),
    ] {
        for caps in regex.captures_iter(text) {
            if let Some(specifier) = caps.get(1) {
                found.push(reference_at(text, &specifier, kind));
            }
        }
    }
    found
}

fn scan_script_declarations(patterns: &ScanPatterns, text: &str, state: &mut TransformState) {
    for caps in patterns.hot_accept.captures_iter(text) {
        match caps.get(1) {
            Some(deps) => {
                let specifiers: Vec<String> = patterns
                    .quoted
                    .captures_iter(deps.as_str())
                    .filter_map(|quoted| first_group(&quoted, &[1, 2]))
                    .map(|m| m.as_str().to_string())
                    .collect();
                state.accept_dependencies(specifiers);
            }
            None => state.accept_self(),
        }
    }
    if patterns.hot_decline.is_match(text) {
        state.decline();
    }

    for caps in patterns.export_decl.captures_iter(text) {
        if let Some(name) = caps.get(1) {
            state.expose(name.as_str());
        }
    }
    if patterns.export_default.is_match(text) {
        state.expose("default");
    }
    for caps in patterns.export_list.captures_iter(text) {
        let Some(list) = caps.get(1) else {
            continue;
        };
        for item in list.as_str().split(',') {
            if let Some(name) = item.split_whitespace().last() {
                state.expose(name);
            }
        }
    }
    if patterns.export_star.is_match(text) {
        state.expose("*");
    }
}

fn scan_style(patterns: &ScanPatterns, text: &str) -> Vec<Reference> {
    let mut found = Vec::new();
    let mut import_ranges: Vec<Range<usize>> = Vec::new();

    for caps in patterns.css_import.captures_iter(text) {
        if let (Some(whole), Some(specifier)) = (caps.get(0), first_group(&caps, &[1, 2, 3, 4, 5])) {
            import_ranges.push(whole.range());
            found.push(
                reference_at(text, &specifier, ReferenceKind::StyleImport)
                    .expect_kind(ResourceKind::Style),
            );
        }
    }

    for caps in patterns.css_url.captures_iter(text) {
        let (Some(whole), Some(specifier)) = (caps.get(0), first_group(&caps, &[1, 2, 3])) else {
            continue;
        };
        if import_ranges
            .iter()
            .any(|range| range.start <= whole.start() && whole.end() <= range.end)
        {
            continue;
        }
        found.push(reference_at(text, &specifier, ReferenceKind::StyleUrl));
    }

    found
}

fn attr_value<'t>(regex: &Regex, attrs: &'t str) -> Option<&'t str> {
    regex
        .captures(attrs)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn scan_markup(patterns: &ScanPatterns, text: &str, file_name: &str) -> Vec<Reference> {
    let mut found = Vec::new();

    for caps in patterns.markup_tag.captures_iter(text) {
        let (Some(tag), Some(attrs)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let tag = tag.as_str().to_ascii_lowercase();
        let rel = attr_value(&patterns.attr_rel, attrs.as_str()).map(str::to_ascii_lowercase);

        let expected = match (tag.as_str(), rel.as_deref()) {
            ("script", _) => Some(ResourceKind::Module),
            ("link", Some("stylesheet")) => Some(ResourceKind::Style),
            ("link", Some("modulepreload")) => Some(ResourceKind::Module),
            ("link", _) if rel.is_none() => continue,
            _ => None,
        };

        for attr in patterns.markup_attr.captures_iter(attrs.as_str()) {
            let Some(value) = first_group(&attr, &[2, 3]) else {
                continue;
            };
            let span = attrs.start() + value.start()..attrs.start() + value.end();
            let mut reference = Reference::new(value.as_str(), ReferenceKind::MarkupAttribute)
                .at(SourcePosition::from_offset(text, span.start))
                .with_span(span);
            if let Some(kind) = expected {
                reference = reference.expect_kind(kind);
            }
            found.push(reference);
        }
    }

    for caps in patterns.inline_script.captures_iter(text) {
        let (Some(attrs), Some(body)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if patterns.attr_src.is_match(attrs.as_str()) || body.as_str().trim().is_empty() {
            continue;
        }
        let script_type = attr_value(&patterns.attr_type, attrs.as_str()).map(essence);
        let is_script = match script_type.as_deref() {
            None | Some("module") => true,
            Some(other) => ResourceKind::from_content_type(other) == ResourceKind::Module,
        };
        if is_script {
            found.push(inline_reference(text, &body, file_name, "text/javascript", "js"));
        }
    }

    for caps in patterns.inline_style.captures_iter(text) {
        if let Some(body) = caps.get(2) {
            if !body.as_str().trim().is_empty() {
                found.push(inline_reference(text, &body, file_name, "text/css", "css"));
            }
        }
    }

    found
}

fn inline_reference(
    text: &str,
    body: &regex::Match<'_>,
    file_name: &str,
    content_type: &str,
    extension: &str,
) -> Reference {
    let position = SourcePosition::from_offset(text, body.start());
    let specifier = format!(
        "{file_name}@L{}C{}.{extension}",
        position.line, position.column
    );
    Reference::new(specifier, ReferenceKind::InlineContent)
        .at(position)
        .with_span(body.range())
        .with_inline(InlineContent {
            content: body.as_str().to_string(),
            content_type: content_type.to_string(),
            extension: extension.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kiln_graph::{Content, MemoryRuntime, ResourceGraph, ResourceUrl};

    use super::*;
    use crate::plugins::{BuildMode, HotDeclaration};

    async fn scan(path: &str, kind: ResourceKind, text: &str) -> TransformState {
        let ctx = PluginContext::new(
            ResourceGraph::new(),
            Arc::new(MemoryRuntime::default()),
            ResourceUrl::new_virtual("/"),
            BuildMode::Dev,
        );
        let url = ResourceUrl::new_virtual(path);
        let content_type = kiln_graph::content_type_for_extension(url.extension().unwrap_or(""));
        let mut state = TransformState::new(url, kind, Content::from(text), content_type);
        ReferenceScannerPlugin::new()
            .transform_content(&mut state, &ctx)
            .await
            .unwrap();
        state
    }

    fn specifiers(state: &TransformState) -> Vec<&str> {
        state.references().iter().map(|r| r.specifier.as_str()).collect()
    }

    #[tokio::test]
    async fn finds_es_module_references_in_order() {
        let source = "import a from './a.js';\nimport { b } from \"./b.js\";\nimport './side.js';\nexport * from './re.js';\nconst lazy = () => import('./lazy.js');\n";
        let state = scan("/main.js", ResourceKind::Module, source).await;

        assert_eq!(
            specifiers(&state),
            vec!["./a.js", "./b.js", "./side.js", "./re.js", "./lazy.js"]
        );
        let lazy = &state.references()[4];
        assert_eq!(lazy.kind, ReferenceKind::DynamicImport);
        assert_eq!(lazy.position, SourcePosition::new(5, 28));
        let span = lazy.span.clone().unwrap();
        assert_eq!(&source[span], "./lazy.js");
    }

    #[tokio::test]
    async fn ignores_strings_that_mention_import() {
        let state = scan("/main.js", ResourceKind::Module, "const s = \"import\"; const t = 'x';\n").await;
        assert!(state.references().is_empty());
    }

    #[tokio::test]
    async fn reads_hot_declarations_and_exports() {
        let source = "import { dep } from './dep.js';\nexport const value = dep;\nexport function run() {}\nexport { value as alias };\nexport default run;\nimport.meta.hot.accept(['./dep.js'], () => {});\n";
        let state = scan("/a.js", ResourceKind::Module, source).await;

        assert_eq!(
            state.hot(),
            Some(&HotDeclaration::AcceptDependencies(vec!["./dep.js".into()]))
        );
        assert_eq!(state.exposed(), ["value", "run", "default", "alias"]);
    }

    #[tokio::test]
    async fn self_accept_and_decline() {
        let accept = scan("/a.js", ResourceKind::Module, "import.meta.hot.accept();\n").await;
        assert_eq!(accept.hot(), Some(&HotDeclaration::AcceptSelf));

        let decline = scan("/a.js", ResourceKind::Module, "import.meta.hot.decline();\n").await;
        assert_eq!(decline.hot(), Some(&HotDeclaration::Decline));
    }

    #[tokio::test]
    async fn stylesheet_imports_and_urls() {
        let source = "@import url(\"./reset.css\");\n@import './theme.css';\nbody { background: url(img/bg.png); }\n.icon { background: url('data:image/png;base64,AA'); }\n";
        let state = scan("/site.css", ResourceKind::Style, source).await;

        assert_eq!(specifiers(&state), vec!["./reset.css", "./theme.css", "img/bg.png"]);
        assert_eq!(state.references()[0].kind, ReferenceKind::StyleImport);
        assert_eq!(state.references()[0].expected_kind, Some(ResourceKind::Style));
        assert_eq!(state.references()[2].kind, ReferenceKind::StyleUrl);
    }

    #[tokio::test]
    async fn markup_attributes_and_inline_scripts() {
        let source = "<html><head>\n<link rel=\"stylesheet\" href=\"./site.css\">\n<link rel=\"icon\" href=\"/favicon.ico\">\n<script type=\"module\" src=\"./app.js\"></script>\n<script type=\"module\">import './inline-dep.js';</script>\n<script type=\"importmap\">{\"imports\":{}}</script>\n</head><body><img src=\"logo.png\"><a href=\"https://example.com\">x</a></body></html>\n";
        let state = scan("/index.html", ResourceKind::Markup, source).await;

        let refs = state.references();
        assert_eq!(refs[0].specifier, "./site.css");
        assert_eq!(refs[0].expected_kind, Some(ResourceKind::Style));
        assert_eq!(refs[1].specifier, "/favicon.ico");
        assert_eq!(refs[1].expected_kind, None);
        assert_eq!(refs[2].specifier, "./app.js");
        assert_eq!(refs[2].expected_kind, Some(ResourceKind::Module));

        let inline = &refs[3];
        assert_eq!(inline.kind, ReferenceKind::InlineContent);
        let content = inline.inline.as_ref().unwrap();
        assert_eq!(content.content, "import './inline-dep.js';");
        assert_eq!(content.extension, "js");

        assert_eq!(refs[4].specifier, "logo.png");
        assert_eq!(refs.len(), 5);
    }

    #[tokio::test]
    async fn inline_script_content_is_scanned_as_script() {
        let state = scan(
            "/index.html@L5C23.js",
            ResourceKind::InlineVirtual,
            "import './inline-dep.js';",
        )
        .await;
        assert_eq!(specifiers(&state), vec!["./inline-dep.js"]);
    }
}
