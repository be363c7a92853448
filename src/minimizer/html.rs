//! # Bundled HTML Minimizer
//!
//! Minimizer HTML conservativo a passata singola, registrato come `"html"`.
//!
//! ## Cosa fa:
//! - Collassa sequenze di whitespace ASCII nel testo in un singolo spazio
//! - Elimina il whitespace adiacente ai tag di blocco (`<p> hi </p>` diventa `<p>hi</p>`)
//! - Collassa il whitespace dentro i tag, fuori dai valori di attributo quotati
//! - Rimuove i commenti, mantenendo quelli condizionali (`<!--[if IE]>`)
//! - Copia alla lettera il corpo di `<pre>`, `<textarea>`, `<script>` e `<style>`
//!
//! ## Errori:
//! Commenti, tag o elementi raw-text non terminati fanno fallire l'asset. Le
//! opzioni sconosciute diventano warning e vengono ignorate.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Minimizer, MinifyOutput};

/// Registry name of the bundled minimizer.
pub const NAME: &str = "html";

const RAW_TEXT_TAGS: &[&str] = &["pre", "textarea", "script", "style"];

const BLOCK_TAGS: &[&str] = &[
    "!doctype", "address", "article", "aside", "blockquote", "body", "br", "dd", "details",
    "dialog", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "head", "header", "hr", "html", "li", "link", "main", "meta",
    "nav", "ol", "option", "p", "pre", "script", "section", "style", "summary", "table", "tbody",
    "td", "textarea", "tfoot", "th", "thead", "title", "tr", "ul",
];

const KNOWN_OPTIONS: &[&str] = &["collapse_whitespace", "remove_comments"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HtmlOptions {
    pub collapse_whitespace: bool,
    pub remove_comments: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            collapse_whitespace: true,
            remove_comments: true,
        }
    }
}

/// The bundled minimizer
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMinimizer;

impl Minimizer for HtmlMinimizer {
    fn minify(&self, name: &str, input: &str, options: &Value) -> Result<MinifyOutput> {
        let mut warnings = Vec::new();
        let parsed = match options {
            Value::Null => HtmlOptions::default(),
            Value::Object(map) => {
                for key in map.keys().filter(|k| !KNOWN_OPTIONS.contains(&k.as_str())) {
                    warnings.push(format!("Unknown html minimizer option '{key}' ignored"));
                }
                serde_json::from_value(options.clone())
                    .map_err(|e| anyhow!("Invalid html minimizer options: {e}"))?
            }
            other => return Err(anyhow!("Html minimizer options must be an object, got {other}")),
        };

        let code = minify_html(input, &parsed)?;
        debug!("{}: {} -> {} bytes", name, input.len(), code.len());

        Ok(MinifyOutput {
            code,
            warnings,
            errors: Vec::new(),
        })
    }
}

struct Tag {
    name: String,
    closing: bool,
    end: usize,
}

/// Minimize an HTML document.
pub fn minify_html(input: &str, options: &HtmlOptions) -> Result<String> {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut text = String::new();
    // Whether the boundary before the pending text lets leading whitespace go.
    let mut after_block = true;
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            let next = input[pos..].find('<').map_or(bytes.len(), |i| pos + i);
            text.push_str(&input[pos..next]);
            pos = next;
            continue;
        }

        if input[pos..].starts_with("<!--") {
            let close = input[pos + 4..]
                .find("-->")
                .ok_or_else(|| anyhow!("Unterminated comment at byte {pos}"))?;
            let end = pos + 4 + close + 3;
            let comment = &input[pos..end];
            let conditional = comment.starts_with("<!--[if") || comment.starts_with("<!--<![endif");
            if !options.remove_comments || conditional {
                flush_text(&mut out, &mut text, after_block, false, options);
                out.push_str(comment);
                after_block = false;
            }
            pos = end;
            continue;
        }

        let Some(tag) = parse_tag(input, pos)? else {
            text.push('<');
            pos += 1;
            continue;
        };

        let block = BLOCK_TAGS.contains(&tag.name.as_str());
        flush_text(&mut out, &mut text, after_block, block, options);
        push_tag(&mut out, &input[pos..tag.end], options);
        after_block = block;
        pos = tag.end;

        if !tag.closing && RAW_TEXT_TAGS.contains(&tag.name.as_str()) {
            let closing = format!("</{}", tag.name);
            let body_len = input[pos..]
                .to_ascii_lowercase()
                .find(&closing)
                .ok_or_else(|| anyhow!("Unclosed <{}> element", tag.name))?;
            out.push_str(&input[pos..pos + body_len]);
            pos += body_len;
        }
    }

    flush_text(&mut out, &mut text, after_block, true, options);
    Ok(out)
}

fn parse_tag(input: &str, start: usize) -> Result<Option<Tag>> {
    let bytes = input.as_bytes();
    let mut pos = start + 1;
    let closing = bytes.get(pos) == Some(&b'/');
    if closing {
        pos += 1;
    }

    let name_start = pos;
    match bytes.get(pos) {
        Some(b) if b.is_ascii_alphabetic() || *b == b'!' || *b == b'?' => pos += 1,
        _ => return Ok(None),
    }
    while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' && bytes[pos] != b'/' {
        pos += 1;
    }
    let name = input[name_start..pos].to_ascii_lowercase();

    let mut quote = None;
    while pos < bytes.len() {
        match (quote, bytes[pos]) {
            (None, b'"' | b'\'') => quote = Some(bytes[pos]),
            (Some(q), b) if b == q => quote = None,
            (None, b'>') => {
                return Ok(Some(Tag {
                    name,
                    closing,
                    end: pos + 1,
                }))
            }
            _ => {}
        }
        pos += 1;
    }

    Err(anyhow!("Unterminated tag <{name} at byte {start}"))
}

fn push_tag(out: &mut String, tag: &str, options: &HtmlOptions) {
    if !options.collapse_whitespace {
        out.push_str(tag);
        return;
    }

    let mut quote = None;
    let mut pending_space = false;
    for c in tag.chars() {
        if quote.is_none() && c.is_ascii_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && c != '>' && !(c == '/' && tag.ends_with("/>")) {
            out.push(' ');
        }
        pending_space = false;
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            _ => {}
        }
        out.push(c);
    }
}

fn flush_text(out: &mut String, text: &mut String, after_block: bool, before_block: bool, options: &HtmlOptions) {
    if text.is_empty() {
        return;
    }
    if !options.collapse_whitespace {
        out.push_str(text);
        text.clear();
        return;
    }

    let mut collapsed = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            in_space = true;
            continue;
        }
        if in_space && (!collapsed.is_empty() || !after_block) {
            collapsed.push(' ');
        }
        in_space = false;
        collapsed.push(c);
    }
    if in_space && !before_block && (!collapsed.is_empty() || !after_block) {
        collapsed.push(' ');
    }

    out.push_str(&collapsed);
    text.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minify(input: &str) -> String {
        minify_html(input, &HtmlOptions::default()).unwrap()
    }

    #[test]
    fn test_collapses_whitespace_inside_block() {
        assert_eq!(minify("<p> hi </p>"), "<p>hi</p>");
        assert_eq!(minify("<p>  a  </p>"), "<p>a</p>");
        assert_eq!(minify("<div>\n  <p>one   two</p>\n</div>\n"), "<div><p>one two</p></div>");
    }

    #[test]
    fn test_keeps_single_space_between_inline_tags() {
        assert_eq!(minify("<b>a</b>   <i>b</i>"), "<b>a</b> <i>b</i>");
        assert_eq!(minify("<p>a <b>b</b> c</p>"), "<p>a <b>b</b> c</p>");
    }

    #[test]
    fn test_raw_text_elements_are_preserved() {
        let input = "<pre>  keep\n   this </pre>\n<script>if (a  <  b) {  }</script>";
        assert_eq!(
            minify(input),
            "<pre>  keep\n   this </pre><script>if (a  <  b) {  }</script>"
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(minify("<p>a<!-- note -->b</p>"), "<p>ab</p>");
        assert_eq!(
            minify("<!--[if IE]><p>x</p><![endif]-->"),
            "<!--[if IE]><p>x</p><![endif]-->"
        );
        let keep = HtmlOptions {
            remove_comments: false,
            ..Default::default()
        };
        assert_eq!(minify_html("<p><!-- n --></p>", &keep).unwrap(), "<p><!-- n --></p>");
    }

    #[test]
    fn test_collapses_attribute_whitespace_outside_quotes() {
        assert_eq!(
            minify("<a   href=\"x  y\"\n  class='c'  >t</a>"),
            "<a href=\"x  y\" class='c'>t</a>"
        );
        assert_eq!(minify("<br  />"), "<br/>");
    }

    #[test]
    fn test_malformed_markup_fails() {
        assert!(minify_html("<p>a<!-- open", &HtmlOptions::default()).is_err());
        assert!(minify_html("<script>var a;", &HtmlOptions::default()).is_err());
        assert!(minify_html("<div class=\"x>", &HtmlOptions::default()).is_err());
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        assert_eq!(minify("<p>1 < 2</p>"), "<p>1 < 2</p>");
    }

    #[test]
    fn test_unknown_options_warn() {
        let out = HtmlMinimizer
            .minify("a.html", "<p> x </p>", &json!({ "minify_css": true }))
            .unwrap();
        assert_eq!(out.code, "<p>x</p>");
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("minify_css"));

        assert!(HtmlMinimizer.minify("a.html", "<p>", &json!([1])).is_err());
    }
}
