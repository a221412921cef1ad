use logos::Logos;

use super::Span;
use crate::errors::{ErrorKind, MsError};

/// Unescape a quoted string literal, handling the JSON escape set.
fn unescape(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s[1..s.len() - 1].chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('b') => out.push('\u{0008}'),
                Some('f') => out.push('\u{000c}'),
                Some('/') => out.push('/'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('\'') => out.push('\''),
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).collect();
                    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        Some(u) => out.push(u),
                        None => {
                            out.push_str("\\u");
                            out.push_str(&hex);
                        }
                    }
                }
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n;]+")]
pub enum Token {
    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    // Punctuation
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("!")]
    Bang,
    #[token(".")]
    Dot,

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("=")]
    Assign,
    #[token("->")]
    Arrow,

    // Keywords
    #[token("let")]
    Let,
    #[token("do")]
    Do,
    #[token("end")]
    End,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("fun")]
    Fun,
    #[token("oracle")]
    Oracle,
    #[token("from")]
    From,
    #[token("type")]
    TypeCons,
    #[token("Enum")]
    EnumKw,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,

    // Literals
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok(), priority = 3)]
    Int(i64),
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Num(f64),
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r"'([^'\\]|\\.)*'", |lex| unescape(lex.slice()))]
    Str(String),

    // Primitive type atoms
    #[token("Null", |_| "Null".to_string())]
    #[token("Bool", |_| "Bool".to_string())]
    #[token("Int", |_| "Int".to_string())]
    #[token("Num", |_| "Num".to_string())]
    #[token("Str", |_| "Str".to_string())]
    #[token("Type", |_| "Type".to_string())]
    #[token("Any", |_| "Any".to_string())]
    TyName(String),

    // Identifiers
    #[regex(r"[A-Za-z_][A-Za-z_0-9]*", |lex| lex.slice().to_string())]
    Ident(String),

    // `#` annotation, raw to end of line (`##` comments are filtered out
    // by the post-lex pass before they reach the parser)
    #[regex(r"#[^\n]*", |lex| lex.slice().to_string(), allow_greedy = true)]
    Hash(String),
}

/// The word a keyword-ish token was written as, for use as a property name
/// after `.` (so `obj.type` and `obj.end` are legal member accesses).
fn keyword_text(token: &Token) -> Option<&str> {
    Some(match token {
        Token::Let => "let",
        Token::Do => "do",
        Token::End => "end",
        Token::If => "if",
        Token::Elif => "elif",
        Token::Else => "else",
        Token::For => "for",
        Token::In => "in",
        Token::Return => "return",
        Token::Break => "break",
        Token::Continue => "continue",
        Token::Fun => "fun",
        Token::Oracle => "oracle",
        Token::From => "from",
        Token::TypeCons => "type",
        Token::EnumKw => "Enum",
        Token::And => "and",
        Token::Or => "or",
        Token::Not => "not",
        Token::True => "true",
        Token::False => "false",
        Token::Null => "null",
        Token::TyName(name) => name.as_str(),
        _ => return None,
    })
}

/// A token plus its span and whether it directly abuts the previous token.
/// `glued` is how the parser tells a call `f(x)` from a grouping `f (x)`
/// and an index `a[0]` from an array literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Tok {
    pub kind: Token,
    pub span: Span,
    pub glued: bool,
}

fn is_separator(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b';')
}

/// Text of an annotation line without the leading `#`, trimmed.
fn annotation_line(raw: &str) -> &str {
    raw[1..].trim()
}

/// A single-line annotation written as a quoted string yields its unescaped
/// content; anything else is kept as raw text.
fn normalize_annotation(text: String) -> String {
    if text.len() >= 2 && !text.contains('\n') {
        let bytes = text.as_bytes();
        if (bytes[0] == b'"' && bytes[text.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[text.len() - 1] == b'\'')
        {
            return unescape(&text);
        }
    }
    text
}

/// Lex a source string into the token stream the parser consumes.
///
/// On top of the raw logos output this drops `##` comments, folds
/// consecutive `#` lines into one annotation token, converts keywords
/// after `.` into plain property names, and records glue.
pub fn lex(source: &str) -> Result<Vec<Tok>, MsError> {
    let mut out: Vec<Tok> = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(item) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start, range.end);
        let kind = match item {
            Ok(token) => token,
            Err(()) => {
                let slice = &source[range.clone()];
                let message = if slice.starts_with('"') || slice.starts_with('\'') {
                    "string was not terminated".to_string()
                } else if slice.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                    "numeric literal out of range".to_string()
                } else {
                    format!("unexpected character {:?}", slice)
                };
                return Err(MsError::new(ErrorKind::Lex, message, Some(span)));
            }
        };

        let glued = span.start > 0 && !is_separator(source.as_bytes()[span.start - 1]);

        if let Token::Hash(raw) = &kind {
            if raw.starts_with("##") {
                continue;
            }
            let line = annotation_line(raw).to_string();
            // Annotation lines on directly consecutive lines fold together.
            if let Some(prev) = out.last_mut() {
                if let Token::Hash(acc) = &mut prev.kind {
                    let gap = &source[prev.span.end..span.start];
                    if gap.bytes().filter(|&b| b == b'\n').count() <= 1 {
                        if !acc.is_empty() && !line.is_empty() {
                            acc.push('\n');
                        }
                        acc.push_str(&line);
                        prev.span = prev.span.merge(span);
                        continue;
                    }
                }
            }
            out.push(Tok {
                kind: Token::Hash(line),
                span,
                glued,
            });
            continue;
        }

        // After `.` every keyword is just a property name.
        if matches!(out.last().map(|t| &t.kind), Some(Token::Dot)) {
            if let Some(text) = keyword_text(&kind) {
                out.push(Tok {
                    kind: Token::Ident(text.to_string()),
                    span,
                    glued,
                });
                continue;
            }
        }

        out.push(Tok { kind, span, glued });
    }

    for tok in &mut out {
        if let Token::Hash(text) = &mut tok.kind {
            *text = normalize_annotation(std::mem::take(text));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers_and_idents() {
        assert_eq!(
            kinds("x1 42 3.5 1. 2e3"),
            vec![
                Token::Ident("x1".into()),
                Token::Int(42),
                Token::Num(3.5),
                Token::Num(1.0),
                Token::Num(2000.0),
            ]
        );
    }

    #[test]
    fn glued_parens_distinguish_calls() {
        let toks = lex("f(1) f (1)").unwrap();
        let parens: Vec<bool> = toks
            .iter()
            .filter(|t| t.kind == Token::LParen)
            .map(|t| t.glued)
            .collect();
        assert_eq!(parens, vec![true, false]);
    }

    #[test]
    fn semicolons_are_separators() {
        let toks = lex("a;(b)").unwrap();
        assert_eq!(toks[0].kind, Token::Ident("a".into()));
        assert_eq!(toks[1].kind, Token::LParen);
        assert!(!toks[1].glued);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\nb" 'c\'d' "A""#),
            vec![
                Token::Str("a\nb".into()),
                Token::Str("c'd".into()),
                Token::Str("A".into()),
            ]
        );
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(kinds("1 ## a comment\n2"), vec![Token::Int(1), Token::Int(2)]);
    }

    #[test]
    fn annotations_capture_rest_of_line() {
        assert_eq!(
            kinds("# the answer\n42"),
            vec![Token::Hash("the answer".into()), Token::Int(42)]
        );
    }

    #[test]
    fn annotation_lines_fold() {
        assert_eq!(
            kinds("# first\n# second\n42"),
            vec![Token::Hash("first\nsecond".into()), Token::Int(42)]
        );
    }

    #[test]
    fn quoted_annotation_unescapes() {
        assert_eq!(
            kinds("# \"two\\nlines\"\n1"),
            vec![Token::Hash("two\nlines".into()), Token::Int(1)]
        );
    }

    #[test]
    fn keywords_after_dot_become_properties() {
        assert_eq!(
            kinds("obj.type"),
            vec![
                Token::Ident("obj".into()),
                Token::Dot,
                Token::Ident("type".into()),
            ]
        );
    }

    #[test]
    fn type_atoms() {
        assert_eq!(
            kinds("Int Num Any"),
            vec![
                Token::TyName("Int".to_string()),
                Token::TyName("Num".to_string()),
                Token::TyName("Any".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_string_errors() {
        let err = lex("\"abc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lex);
        assert!(err.message.contains("terminated"));
    }
}
