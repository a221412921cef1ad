use crate::syntax::Span;
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

/// Classification of everything that can go wrong, from malformed tokens
/// to a misbehaving oracle backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Parse,
    Name,
    Type,
    Value,
    Oracle,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Lex => "lexical error",
            ErrorKind::Parse => "syntax error",
            ErrorKind::Name => "name error",
            ErrorKind::Type => "type error",
            ErrorKind::Value => "value error",
            ErrorKind::Oracle => "oracle error",
            ErrorKind::Internal => "internal error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct MsError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Option<Span>,
    /// Set when the parser ran out of tokens mid-expression in interactive
    /// mode; the REPL keeps reading lines instead of reporting.
    pub incomplete: bool,
}

impl MsError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            incomplete: false,
        }
    }

    pub fn incomplete_input(span: Span) -> Self {
        Self {
            kind: ErrorKind::Parse,
            message: "unexpected end of input".to_string(),
            span: Some(span),
            incomplete: true,
        }
    }

    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }
}

impl std::fmt::Display for MsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span {
            Some(span) => write!(
                f,
                "{} at {}..{}: {}",
                self.kind, span.start, span.end, self.message
            ),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for MsError {}

/// Render an error against its source with codespan-reporting.
pub fn report(filename: &str, source: &str, error: &MsError) {
    let mut files = SimpleFiles::new();
    let file_id = files.add(filename, source);
    let mut diagnostic = Diagnostic::error().with_message(format!("{}: {}", error.kind, error.message));
    if let Some(span) = error.span {
        let end = span.end.min(source.len());
        let start = span.start.min(end);
        diagnostic = diagnostic.with_labels(vec![Label::primary(file_id, start..end)]);
    }
    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = term::Config::default();
    let _ = term::emit(&mut writer.lock(), &config, &files, &diagnostic);
}

/// Line and column (0-based) of a byte offset, for hosts that report
/// positions without codespan.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let mut line = 0;
    let mut col = 0;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (line, col)
}
