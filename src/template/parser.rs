//! Template source → node tree.
//!
//! Scanning works one line at a time. A line that holds nothing but
//! whitespace and non-output tags (sections, closes, comments, partials,
//! delimiter changes) is "standalone": the tags are kept and the rest of the
//! line, including its line ending, is dropped. A standalone partial keeps
//! the whitespace in front of it as the indentation for every line it
//! renders.

use super::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Node {
    Text(String),
    Variable {
        name: String,
        escape: bool,
    },
    Section {
        name: String,
        inverted: bool,
        children: Vec<Node>,
    },
    Partial {
        name: String,
        indent: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Escaped,
    Unescaped,
    Section,
    Inverted,
    Close,
    Partial,
    Comment,
    Delimiters,
}

impl TagKind {
    fn from_sigil(c: char) -> Option<Self> {
        match c {
            '#' => Some(TagKind::Section),
            '^' => Some(TagKind::Inverted),
            '/' => Some(TagKind::Close),
            '>' => Some(TagKind::Partial),
            '!' => Some(TagKind::Comment),
            '=' => Some(TagKind::Delimiters),
            '&' => Some(TagKind::Unescaped),
            _ => None,
        }
    }

    fn can_stand_alone(self) -> bool {
        !matches!(self, TagKind::Escaped | TagKind::Unescaped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    kind: TagKind,
    name: String,
    line: usize,
    indent: String,
}

#[derive(Debug)]
enum Token {
    Text(String),
    Tag(Tag),
}

/// A token on the line currently being scanned.
#[derive(Debug)]
enum Piece {
    Text(String),
    Newline(String),
    Tag(Tag),
}

/// Parse template source into a node tree.
pub(super) fn parse(source: &str) -> Result<Vec<Node>, TemplateError> {
    struct Open {
        name: String,
        inverted: bool,
        line: usize,
        outer: Vec<Node>,
    }

    let mut open: Vec<Open> = Vec::new();
    let mut nodes = Vec::new();
    for token in tokenize(source)? {
        let tag = match token {
            Token::Text(text) => {
                push_text(&mut nodes, text);
                continue;
            }
            Token::Tag(tag) => tag,
        };
        match tag.kind {
            TagKind::Escaped | TagKind::Unescaped => nodes.push(Node::Variable {
                name: tag.name,
                escape: tag.kind == TagKind::Escaped,
            }),
            TagKind::Section | TagKind::Inverted => open.push(Open {
                name: tag.name,
                inverted: tag.kind == TagKind::Inverted,
                line: tag.line,
                outer: std::mem::take(&mut nodes),
            }),
            TagKind::Close => {
                let Some(section) = open.pop() else {
                    return Err(TemplateError::UnexpectedClose {
                        name: tag.name,
                        line: tag.line,
                    });
                };
                if section.name != tag.name {
                    return Err(TemplateError::MismatchedClose {
                        expected: section.name,
                        found: tag.name,
                        line: tag.line,
                    });
                }
                let children = std::mem::replace(&mut nodes, section.outer);
                nodes.push(Node::Section {
                    name: section.name,
                    inverted: section.inverted,
                    children,
                });
            }
            TagKind::Partial => nodes.push(Node::Partial {
                name: tag.name,
                indent: tag.indent,
            }),
            TagKind::Comment | TagKind::Delimiters => {}
        }
    }

    if let Some(section) = open.pop() {
        return Err(TemplateError::UnclosedSection {
            name: section.name,
            line: section.line,
        });
    }
    Ok(nodes)
}

fn push_text(nodes: &mut Vec<Node>, text: String) {
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(&text);
    } else {
        nodes.push(Node::Text(text));
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut open = String::from("{{");
    let mut close = String::from("}}");
    let mut line = 1;
    let mut rest = source;
    let mut tokens = Vec::new();
    let mut pieces = Vec::new();

    while !rest.is_empty() {
        let tag_at = rest.find(open.as_str());
        let newline_at = rest.find('\n');
        match (tag_at, newline_at) {
            (_, Some(nl)) if tag_at.is_none_or(|t| nl < t) => {
                let (text, ending) = split_line_ending(&rest[..=nl]);
                if !text.is_empty() {
                    pieces.push(Piece::Text(text.to_string()));
                }
                pieces.push(Piece::Newline(ending.to_string()));
                flush_line(&mut tokens, &mut pieces);
                rest = &rest[nl + 1..];
                line += 1;
            }
            (Some(t), _) => {
                if t > 0 {
                    pieces.push(Piece::Text(rest[..t].to_string()));
                }
                let after_open = &rest[t + open.len()..];
                let (tag, consumed) = read_tag(after_open, &close, line)?;
                line += after_open[..consumed].matches('\n').count();
                rest = &after_open[consumed..];
                if tag.kind == TagKind::Delimiters {
                    (open, close) = parse_delimiters(&tag.name, tag.line)?;
                }
                pieces.push(Piece::Tag(tag));
            }
            (None, _) => {
                pieces.push(Piece::Text(rest.to_string()));
                rest = "";
            }
        }
    }
    flush_line(&mut tokens, &mut pieces);
    Ok(tokens)
}

/// Split `"text\r\n"` or `"text\n"` into the text and its line ending.
fn split_line_ending(line: &str) -> (&str, &str) {
    let cut = if line.ends_with("\r\n") {
        line.len() - 2
    } else {
        line.len() - 1
    };
    line.split_at(cut)
}

/// Read one tag from just after its opening delimiter. Returns the tag and
/// the number of bytes consumed, closing delimiter included.
fn read_tag(input: &str, close: &str, line: usize) -> Result<(Tag, usize), TemplateError> {
    let unclosed = || TemplateError::UnclosedTag {
        close: close.to_string(),
        line,
    };

    // `{{{name}}}` ends with an extra brace in front of the closing delimiter.
    if let Some(body) = input.strip_prefix('{') {
        let end_marker = format!("}}{close}");
        let end = body.find(&end_marker).ok_or_else(unclosed)?;
        let tag = make_tag(TagKind::Unescaped, body[..end].trim(), line)?;
        return Ok((tag, 1 + end + end_marker.len()));
    }

    let end = input.find(close).ok_or_else(unclosed)?;
    let content = input[..end].trim();
    let tag = match content.chars().next().and_then(TagKind::from_sigil) {
        Some(TagKind::Delimiters) => {
            let inner = content[1..]
                .strip_suffix('=')
                .ok_or_else(|| TemplateError::BadDelimiters {
                    tag: content.to_string(),
                    line,
                })?;
            make_tag(TagKind::Delimiters, inner.trim(), line)?
        }
        Some(kind) => make_tag(kind, content[1..].trim(), line)?,
        None => make_tag(TagKind::Escaped, content, line)?,
    };
    Ok((tag, end + close.len()))
}

fn make_tag(kind: TagKind, name: &str, line: usize) -> Result<Tag, TemplateError> {
    if name.is_empty() && kind != TagKind::Comment {
        return Err(TemplateError::EmptyTag { line });
    }
    Ok(Tag {
        kind,
        name: name.to_string(),
        line,
        indent: String::new(),
    })
}

fn parse_delimiters(spec: &str, line: usize) -> Result<(String, String), TemplateError> {
    let parts: Vec<&str> = spec.split_whitespace().collect();
    match parts.as_slice() {
        [open, close] if !open.contains('=') && !close.contains('=') => {
            Ok((open.to_string(), close.to_string()))
        }
        _ => Err(TemplateError::BadDelimiters {
            tag: spec.to_string(),
            line,
        }),
    }
}

/// Move the pieces of one finished line into `tokens`, dropping the
/// whitespace and line ending of a standalone line.
fn flush_line(tokens: &mut Vec<Token>, pieces: &mut Vec<Piece>) {
    let standalone = pieces.iter().any(|p| matches!(p, Piece::Tag(_)))
        && pieces.iter().all(|p| match p {
            Piece::Text(text) => text.chars().all(|c| c == ' ' || c == '\t'),
            Piece::Newline(_) => true,
            Piece::Tag(tag) => tag.kind.can_stand_alone(),
        });

    let mut indent = String::new();
    for piece in pieces.drain(..) {
        match piece {
            Piece::Text(text) | Piece::Newline(text) if !standalone => {
                tokens.push(Token::Text(text));
            }
            Piece::Text(text) => indent.push_str(&text),
            Piece::Newline(_) => {}
            Piece::Tag(mut tag) => {
                if standalone && tag.kind == TagKind::Partial {
                    tag.indent = indent.clone();
                }
                tokens.push(Token::Tag(tag));
            }
        }
    }
}
