//! Logic-less Mustache templates rendered against JSON data.
//!
//! | Tag | Output |
//! |-----|--------|
//! | `{{name}}` | value, HTML-escaped |
//! | `{{{name}}}`, `{{& name}}` | value, raw |
//! | `{{#name}}…{{/name}}` | body once per list item, once for any other truthy value |
//! | `{{^name}}…{{/name}}` | body only if `name` is missing or falsy |
//! | `{{> name}}` | the partial `name`, or nothing if there is none |
//! | `{{! comment}}` | nothing |
//! | `{{=<% %>=}}` | nothing; switches delimiters for the rest of the template |
//!
//! Names can be dotted (`{{page.title}}`), and `{{.}}` is the current item.
//! A missing name renders as empty text.
//!
//! A [`Template`] is compiled once and can be rendered any number of times,
//! from any thread. Partials come from a [`PartialStore`] supplied at render
//! time, so compiling a template never looks anything up.

mod context;
mod parser;

use context::{Stack, display, is_truthy};
use parser::Node;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Deepest chain of partials including partials before rendering gives up.
pub const MAX_PARTIAL_DEPTH: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("line {line}: tag is never closed with `{close}`")]
    UnclosedTag { close: String, line: usize },
    #[error("line {line}: empty tag")]
    EmptyTag { line: usize },
    #[error("line {line}: invalid delimiter change `{tag}`")]
    BadDelimiters { tag: String, line: usize },
    #[error("line {line}: section `{name}` is never closed")]
    UnclosedSection { name: String, line: usize },
    #[error("line {line}: closing `{name}` without an open section")]
    UnexpectedClose { name: String, line: usize },
    #[error("line {line}: closing `{found}` but the open section is `{expected}`")]
    MismatchedClose {
        expected: String,
        found: String,
        line: usize,
    },
    #[error("partial `{name}` nested more than {depth} levels deep", depth = MAX_PARTIAL_DEPTH)]
    TooDeep { name: String },
}

/// Where partials are looked up by name while rendering.
pub trait PartialStore {
    fn get(&self, name: &str) -> Option<&Template>;
}

impl PartialStore for BTreeMap<String, Template> {
    fn get(&self, name: &str) -> Option<&Template> {
        BTreeMap::get(self, name)
    }
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            nodes: parser::parse(source)?,
        })
    }

    pub fn render(&self, data: &Value, partials: &dyn PartialStore) -> Result<String, TemplateError> {
        let mut out = Output::new();
        let mut stack = Stack::new(data);
        render_nodes(&self.nodes, &mut stack, partials, "", 0, &mut out)?;
        Ok(out.buf)
    }
}

/// Rendered text plus whether the next write starts a new line, which is
/// where partial indentation goes.
struct Output {
    buf: String,
    line_start: bool,
}

impl Output {
    fn new() -> Self {
        Self {
            buf: String::new(),
            line_start: true,
        }
    }

    /// Template text: every line it starts is indented.
    fn text(&mut self, text: &str, indent: &str) {
        for line in text.split_inclusive('\n') {
            if self.line_start {
                self.buf.push_str(indent);
            }
            self.buf.push_str(line);
            self.line_start = line.ends_with('\n');
        }
    }

    /// Interpolated data: only indented where it begins, never inside.
    fn value(&mut self, value: &str, indent: &str) {
        if value.is_empty() {
            return;
        }
        if self.line_start {
            self.buf.push_str(indent);
        }
        self.buf.push_str(value);
        self.line_start = false;
    }
}

fn render_nodes<'a>(
    nodes: &[Node],
    stack: &mut Stack<'a>,
    partials: &dyn PartialStore,
    indent: &str,
    depth: usize,
    out: &mut Output,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.text(text, indent),
            Node::Variable { name, escape } => {
                let value = stack.lookup(name).map(display).unwrap_or_default();
                if *escape {
                    out.value(&escape_html(&value), indent);
                } else {
                    out.value(&value, indent);
                }
            }
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let value = stack.lookup(name).filter(|v| is_truthy(v));
                match (value, *inverted) {
                    (None, true) => render_nodes(children, stack, partials, indent, depth, out)?,
                    (Some(Value::Array(items)), false) => {
                        for item in items {
                            stack.push(item);
                            let result = render_nodes(children, stack, partials, indent, depth, out);
                            stack.pop();
                            result?;
                        }
                    }
                    (Some(value), false) => {
                        stack.push(value);
                        let result = render_nodes(children, stack, partials, indent, depth, out);
                        stack.pop();
                        result?;
                    }
                    (Some(_), true) | (None, false) => {}
                }
            }
            Node::Partial {
                name,
                indent: own_indent,
            } => {
                let Some(partial) = partials.get(name) else {
                    continue;
                };
                if depth >= MAX_PARTIAL_DEPTH {
                    return Err(TemplateError::TooDeep { name: name.clone() });
                }
                let nested = format!("{indent}{own_indent}");
                render_nodes(&partial.nodes, stack, partials, &nested, depth + 1, out)?;
            }
        }
    }
    Ok(())
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_partials() -> BTreeMap<String, Template> {
        BTreeMap::new()
    }

    fn render(source: &str, data: Value) -> String {
        Template::compile(source)
            .unwrap()
            .render(&data, &no_partials())
            .unwrap()
    }

    fn store(partials: &[(&str, &str)]) -> BTreeMap<String, Template> {
        partials
            .iter()
            .map(|(name, source)| (name.to_string(), Template::compile(source).unwrap()))
            .collect()
    }

    // =========================================================================
    // Interpolation
    // =========================================================================

    #[test]
    fn escapes_html_specials_only() {
        let data = json!({"v": "<a href=\"x\">&'`="});
        assert_eq!(
            render("{{v}}", data.clone()),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;`="
        );
        assert_eq!(render("{{{v}}}|{{&v}}", data), "<a href=\"x\">&'`=|<a href=\"x\">&'`=");
    }

    #[test]
    fn missing_names_render_empty() {
        assert_eq!(render("[{{a}}][{{a.b}}][{{{c}}}]", json!({})), "[][][]");
    }

    #[test]
    fn dotted_names() {
        assert_eq!(render("{{a.b}}", json!({"a": {"b": "deep"}})), "deep");
    }

    #[test]
    fn scalars_are_written_as_text() {
        assert_eq!(render("{{n}} {{t}} {{z}}", json!({"n": 4, "t": true, "z": null})), "4 true ");
    }

    // =========================================================================
    // Sections
    // =========================================================================

    #[test]
    fn list_section_repeats_per_item() {
        let data = json!({"items": [{"n": "a"}, {"n": "b"}]});
        assert_eq!(render("{{#items}}<{{n}}>{{/items}}", data), "<a><b>");
    }

    #[test]
    fn implicit_iterator() {
        assert_eq!(render("{{#xs}}({{.}}){{/xs}}", json!({"xs": [1, 2, 3]})), "(1)(2)(3)");
    }

    #[test]
    fn object_section_changes_context() {
        let data = json!({"p": {"n": "inner"}, "n": "outer"});
        assert_eq!(render("{{#p}}{{n}}{{/p}} {{n}}", data), "inner outer");
    }

    #[test]
    fn outer_names_visible_inside_sections() {
        let data = json!({"site": "S", "pages": [{"t": "a"}, {"t": "b"}]});
        assert_eq!(render("{{#pages}}{{site}}/{{t}} {{/pages}}", data), "S/a S/b ");
    }

    #[test]
    fn falsy_sections_are_skipped() {
        let data = json!({"f": false, "e": [], "s": "", "z": 0, "n": null});
        assert_eq!(
            render("{{#f}}1{{/f}}{{#e}}2{{/e}}{{#s}}3{{/s}}{{#z}}4{{/z}}{{#n}}5{{/n}}{{#m}}6{{/m}}", data),
            ""
        );
    }

    #[test]
    fn inverted_sections() {
        let data = json!({"items": [], "on": true});
        assert_eq!(
            render("{{^items}}none{{/items}}{{^on}}off{{/on}}{{^missing}}!{{/missing}}", data),
            "none!"
        );
    }

    #[test]
    fn standalone_section_tags_leave_no_blank_lines() {
        let data = json!({"items": ["a", "b"]});
        let source = "<ul>\n  {{#items}}\n  <li>{{.}}</li>\n  {{/items}}\n</ul>\n";
        assert_eq!(render(source, data), "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>\n");
    }

    #[test]
    fn set_delimiters() {
        assert_eq!(render("{{=<% %>=}}<% v %> {{v}}", json!({"v": 1})), "1 {{v}}");
    }

    #[test]
    fn comments_render_nothing() {
        assert_eq!(render("a{{! ignored }}b", json!({})), "ab");
    }

    // =========================================================================
    // Partials
    // =========================================================================

    #[test]
    fn partial_sees_current_context() {
        let partials = store(&[("item", "<li>{{n}}</li>")]);
        let template = Template::compile("{{#items}}{{> item}}{{/items}}").unwrap();
        let out = template
            .render(&json!({"items": [{"n": 1}, {"n": 2}]}), &partials)
            .unwrap();
        assert_eq!(out, "<li>1</li><li>2</li>");
    }

    #[test]
    fn missing_partial_renders_empty() {
        let template = Template::compile("[{{> nope}}]").unwrap();
        assert_eq!(template.render(&json!({}), &no_partials()).unwrap(), "[]");
    }

    #[test]
    fn standalone_partial_is_indented() {
        let partials = store(&[("row", "<td>{{v}}</td>\n<td/>\n")]);
        let template = Template::compile("<tr>\n  {{> row}}\n</tr>").unwrap();
        let out = template
            .render(&json!({"v": "a\nb"}), &partials)
            .unwrap();
        assert_eq!(out, "<tr>\n  <td>a\nb</td>\n  <td/>\n</tr>");
    }

    #[test]
    fn nested_partials_accumulate_indent() {
        let partials = store(&[("outer", "o\n  {{> inner}}\n"), ("inner", "i\n")]);
        let template = Template::compile("  {{> outer}}\n").unwrap();
        let out = template.render(&json!({}), &partials).unwrap();
        assert_eq!(out, "  o\n    i\n");
    }

    #[test]
    fn recursive_partial_over_tree_data() {
        let partials = store(&[("node", "{{name}}{{#kids}}({{> node}}){{/kids}}")]);
        let template = Template::compile("{{> node}}").unwrap();
        let data = json!({
            "name": "a",
            "kids": [{"name": "b", "kids": [{"name": "c", "kids": []}]}]
        });
        assert_eq!(template.render(&data, &partials).unwrap(), "a(b(c))");
    }

    #[test]
    fn self_including_partial_stops() {
        let partials = store(&[("loop", "x{{> loop}}")]);
        let template = Template::compile("{{> loop}}").unwrap();
        let err = template.render(&json!({}), &partials).unwrap_err();
        assert_eq!(err, TemplateError::TooDeep { name: "loop".into() });
    }

    #[test]
    fn compiled_template_is_reusable() {
        let template = Template::compile("{{n}}").unwrap();
        let empty = no_partials();
        assert_eq!(template.render(&json!({"n": 1}), &empty).unwrap(), "1");
        assert_eq!(template.render(&json!({"n": 2}), &empty).unwrap(), "2");
    }
}
