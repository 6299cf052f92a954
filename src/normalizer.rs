use encoding_rs::{Encoding, UTF_8};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// How far into an HTML body we look for a `charset=` declaration.
const CHARSET_SNIFF_BYTES: usize = 1024;

/// How a response body is treated, decided from its declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Text,
    Binary,
}

impl ContentKind {
    pub fn classify(content_type: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("text/html") {
            ContentKind::Html
        } else if content_type.starts_with("text/") || content_type.contains("application/json") {
            ContentKind::Text
        } else {
            ContentKind::Binary
        }
    }

    pub fn is_expandable(self) -> bool {
        !matches!(self, ContentKind::Binary)
    }
}

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub text: String,
}

impl Extracted {
    fn raw(body: &str) -> Self {
        Self {
            title: String::new(),
            text: body.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Copy)]
enum Context {
    Title,
    Body,
}

/// Turns a decoded body into `{title, text}`.
///
/// Only HTML with `strip_html` set is parsed; everything else passes through
/// untouched. Parsing never fails the call: on error the raw body comes back
/// as the text with an empty title. Callers must not pass
/// [`ContentKind::Binary`] bodies; they are passed through as-is if they do.
pub fn extract(body: &str, kind: ContentKind, strip_html: bool) -> Extracted {
    match kind {
        ContentKind::Html if strip_html => match html_to_text(body) {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::debug!("html extraction failed, returning raw body: {e}");
                Extracted::raw(body)
            }
        },
        _ => Extracted::raw(body),
    }
}

fn html_to_text(html: &str) -> std::io::Result<Extracted> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())?;

    let mut walker = TextWalker::default();
    walker.walk(&dom.document);

    Ok(Extracted {
        title: walker.title.unwrap_or_default().trim().to_string(),
        text: collapse_lines(&walker.body),
    })
}

enum Step {
    Enter(Handle, Context),
    Leave { block: bool, title: bool },
}

#[derive(Default)]
struct TextWalker {
    // `None` until the first <title> opens; later titles are ignored.
    title: Option<String>,
    title_closed: bool,
    body: String,
}

impl TextWalker {
    /// Depth-first walk on an explicit stack; nesting depth is bounded only
    /// by the heap.
    fn walk(&mut self, root: &Handle) {
        let mut stack = vec![Step::Enter(root.clone(), Context::Body)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(handle, ctx) => self.enter(&handle, ctx, &mut stack),
                Step::Leave { block, title } => {
                    if block {
                        self.body.push('\n');
                    }
                    if title && self.title.is_some() {
                        self.title_closed = true;
                    }
                }
            }
        }
    }

    fn enter(&mut self, handle: &Handle, ctx: Context, stack: &mut Vec<Step>) {
        match &handle.data {
            NodeData::Text { contents } => {
                let s = contents.borrow();
                match ctx {
                    Context::Title => {
                        if !self.title_closed {
                            self.title.get_or_insert_with(String::new).push_str(&s);
                        }
                    }
                    Context::Body => self.body.push_str(&s),
                }
            }
            NodeData::Element { name, .. } => {
                let local = &*name.local;

                if is_hidden(local) {
                    return;
                }

                if local == "br" {
                    self.body.push('\n');
                    return;
                }

                let is_title = local == "title" && &*name.ns == HTML_NS;
                let new_ctx = if is_title { Context::Title } else { ctx };
                let block = new_ctx == Context::Body && is_block_like(local);

                if is_title && !self.title_closed {
                    self.title.get_or_insert_with(String::new);
                }
                if block {
                    self.body.push('\n');
                }

                stack.push(Step::Leave {
                    block,
                    title: is_title,
                });
                push_children(handle, new_ctx, stack);
            }
            _ => push_children(handle, ctx, stack),
        }
    }
}

// reversed so the first child is popped first
fn push_children(handle: &Handle, ctx: Context, stack: &mut Vec<Step>) {
    for child in handle.children.borrow().iter().rev() {
        stack.push(Step::Enter(child.clone(), ctx));
    }
}

fn is_hidden(local: &str) -> bool {
    matches!(local, "script" | "style" | "noscript" | "template")
}

fn is_block_like(local: &str) -> bool {
    matches!(
        local,
        "p" | "div"
            | "section"
            | "article"
            | "aside"
            | "main"
            | "nav"
            | "header"
            | "footer"
            | "li"
            | "ul"
            | "ol"
            | "dl"
            | "dt"
            | "dd"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "pre"
            | "blockquote"
            | "table"
            | "tr"
            | "td"
            | "th"
            | "form"
            | "figure"
            | "figcaption"
            | "hr"
    )
}

/// Detects the encoding, decodes and extracts in one go. CPU-bound; the
/// fetcher runs it on the blocking pool.
pub fn normalize(
    content_type: &str,
    body: &[u8],
    kind: ContentKind,
    strip_html: bool,
) -> (&'static Encoding, Extracted) {
    let encoding = detect_encoding(content_type, body, kind);
    let decoded = decode(body, encoding);
    (encoding, extract(&decoded, kind, strip_html))
}

/// One trimmed line per non-blank input line; blank lines are dropped.
pub fn collapse_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Hard cut at `max_chars` characters. The flag is true iff anything was cut.
pub fn truncate_chars(mut text: String, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            text.truncate(byte_idx);
            (text, true)
        }
        None => (text, false),
    }
}

/// Best-effort encoding detection: BOM, then the `charset` parameter of the
/// content type, then (HTML only) a `charset=` declaration near the top of
/// the document. Falls back to UTF-8.
pub fn detect_encoding(content_type: &str, body: &[u8], kind: ContentKind) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(body) {
        return encoding;
    }
    if let Some(encoding) = charset_param(content_type).and_then(label_to_encoding) {
        return encoding;
    }
    if kind == ContentKind::Html {
        let head = &body[..body.len().min(CHARSET_SNIFF_BYTES)];
        let head = String::from_utf8_lossy(head).to_ascii_lowercase();
        if let Some(encoding) = sniff_charset(&head).and_then(label_to_encoding) {
            return encoding;
        }
    }
    UTF_8
}

pub fn encoding_label(encoding: &'static Encoding) -> String {
    encoding.name().to_ascii_lowercase()
}

/// Decodes with malformed sequences replaced, never failing.
pub fn decode(body: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, had_errors) = encoding.decode(body);
    if had_errors {
        tracing::debug!("body had malformed {} sequences", encoding.name());
    }
    text.into_owned()
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(|c: char| c == '"' || c == '\''))
        } else {
            None
        }
    })
}

fn sniff_charset(head: &str) -> Option<&str> {
    let start = head.find("charset=")? + "charset=".len();
    let rest = head[start..].trim_start_matches(|c: char| c == '"' || c == '\'');
    let end = rest
        .find(|c: char| matches!(c, '"' | '\'' | ';' | '>' | '/') || c.is_whitespace())
        .unwrap_or(rest.len());
    let label = &rest[..end];
    (!label.is_empty()).then_some(label)
}

fn label_to_encoding(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.as_bytes())
}
