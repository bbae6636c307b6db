use std::fmt;

/// Byte range within the original expression string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn point(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One coded diagnostic, as emitted by the validator (and, for the first
/// violation encountered, by strict parsing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    pub field: Option<&'static str>,
    pub value: Option<String>,
    pub position: Option<usize>,
}

impl Diagnostic {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            value: None,
            position: None,
        }
    }

    pub fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(field) = self.field {
            write!(f, " (field: {field})")?;
        }
        if let Some(value) = &self.value {
            write!(f, " (value: {value})")?;
        }
        Ok(())
    }
}

/// All errors produced while parsing or evaluating a Chronex expression.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ChronexError {
    /// Tokenizer-level failure: unbalanced braces, stray text after `}`, etc.
    Lex {
        message: String,
        span: Span,
        input: String,
    },

    /// Grammar-level failure: wrong field count, malformed token, unknown alias.
    Parse {
        message: String,
        span: Span,
        input: String,
        code: &'static str,
    },

    /// Evaluation-time failure: bad timezone, calendar overflow, etc.
    Eval { message: String },

    /// Every diagnostic collected by the validator, surfaced as an error
    /// (used when strict parsing wants the full picture, not just the first).
    Validate { diagnostics: Vec<Diagnostic> },
}

impl fmt::Display for ChronexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex { message, .. } => write!(f, "{message}"),
            Self::Parse { message, .. } => write!(f, "{message}"),
            Self::Eval { message } => write!(f, "{message}"),
            Self::Validate { diagnostics } => {
                write!(f, "{} error(s): ", diagnostics.len())?;
                for (i, d) in diagnostics.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{d}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ChronexError {}

impl ChronexError {
    pub fn lex(message: impl Into<String>, span: Span, input: impl Into<String>) -> Self {
        Self::Lex {
            message: message.into(),
            span,
            input: input.into(),
        }
    }

    pub fn parse(
        code: &'static str,
        message: impl Into<String>,
        span: Span,
        input: impl Into<String>,
    ) -> Self {
        Self::Parse {
            message: message.into(),
            span,
            input: input.into(),
            code,
        }
    }

    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval {
            message: message.into(),
        }
    }

    /// Error code for this variant, where one exists.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Parse { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Format a rich error with a caret underline into the source string.
    pub fn display_rich(&self) -> String {
        match self {
            Self::Lex {
                message,
                span,
                input,
            } => format_span_error(message, span, input),
            Self::Parse {
                message,
                span,
                input,
                ..
            } => format_span_error(message, span, input),
            Self::Eval { message } => format!("error: {message}"),
            Self::Validate { diagnostics } => diagnostics
                .iter()
                .map(|d| format!("error: {d}"))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

fn format_span_error(message: &str, span: &Span, input: &str) -> String {
    let mut out = format!("error: {message}\n");
    out.push_str(&format!("  {input}\n"));
    let padding = " ".repeat(span.start + 2);
    let underline = "^".repeat((span.end - span.start).max(1));
    out.push_str(&padding);
    out.push_str(&underline);
    out
}
