//! Script exception diagnostics.
//!
//! Renders a caught exception as
//!
//! ```text
//! <file>:<line>: <name>: <message>
//! The code:
//! <offending source line>
//!     ^^^^^^^^
//! Stack trace:
//! <script stack>
//! ```

use rquickjs::convert::Coerced;
use rquickjs::{CaughtError, Ctx, Exception, FromJs, Value};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptDiagnostic {
    pub file: Option<String>,
    pub line: Option<u32>,
    /// 1-based, when the engine reports one.
    pub column: Option<u32>,
    pub message: String,
    pub source_line: Option<String>,
    pub stack: Option<String>,
}

impl ScriptDiagnostic {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Start and end column of the caret underline, counted in characters
    /// (0-based, exclusive end). A column past the end of the line gets no caret.
    pub fn underline(&self) -> Option<(usize, usize)> {
        let code = self.source_line.as_deref()?;
        match self.column {
            Some(col) => {
                let start = (col as usize).checked_sub(1)?;
                let mut rest = code.chars().skip(start).peekable();
                rest.peek()?;
                let token = rest
                    .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
                    .count();
                Some((start, start + token.max(1)))
            }
            None => {
                let trimmed = code.trim_end();
                let indent = trimmed.chars().take_while(|c| c.is_whitespace()).count();
                let end = trimmed.chars().count();
                if indent == end {
                    return None;
                }
                Some((indent, end))
            }
        }
    }
}

impl fmt::Display for ScriptDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => writeln!(f, "{}:{}: {}", file, line, self.message)?,
            (None, Some(line)) => writeln!(f, "<anonymous>:{}: {}", line, self.message)?,
            _ => {
                write!(f, "{}", self.message)?;
                return Ok(());
            }
        }

        if let Some(code) = &self.source_line {
            writeln!(f, "The code:")?;
            writeln!(f, "{}", code)?;
            if let Some((start, end)) = self.underline() {
                writeln!(f, "{}{}", " ".repeat(start), "^".repeat(end - start))?;
            }
        }

        if let Some(stack) = self.stack.as_deref().filter(|s| !s.trim().is_empty()) {
            writeln!(f, "Stack trace: ")?;
            writeln!(f, "{}", stack.trim_end())?;
        }
        Ok(())
    }
}

/// Resolves a script file name to its source text, for the code snippet.
pub type SourceLookup<'a> = &'a dyn Fn(Option<&str>) -> Option<String>;

pub fn diagnose(caught: CaughtError<'_>, sources: SourceLookup<'_>) -> ScriptDiagnostic {
    let mut diagnostic = match caught {
        CaughtError::Exception(ex) => from_exception(&ex),
        CaughtError::Value(value) => ScriptDiagnostic::message(coerce_to_string(value)),
        CaughtError::Error(e) => ScriptDiagnostic::message(e.to_string()),
    };

    if let Some(line) = diagnostic.line {
        diagnostic.source_line = sources(diagnostic.file.as_deref())
            .and_then(|src| src.lines().nth((line as usize).saturating_sub(1)).map(str::to_string));
    }
    diagnostic
}

/// Whether the caught value is a parse failure rather than a thrown error.
pub fn is_syntax_error(caught: &CaughtError<'_>) -> bool {
    match caught {
        CaughtError::Exception(ex) => ex
            .as_object()
            .get::<_, Option<String>>("name")
            .ok()
            .flatten()
            .is_some_and(|name| name == "SyntaxError"),
        _ => false,
    }
}

/// Takes the pending exception behind an engine error and describes it in
/// one line. Clears the exception from the context.
pub fn describe_pending(ctx: &Ctx<'_>, err: rquickjs::Error) -> String {
    if !matches!(err, rquickjs::Error::Exception) {
        return err.to_string();
    }
    let value = ctx.catch();
    match value.clone().into_object().and_then(Exception::from_object) {
        Some(ex) => exception_headline(&ex),
        None => coerce_to_string(value),
    }
}

fn exception_headline(ex: &Exception<'_>) -> String {
    let name = ex
        .as_object()
        .get::<_, Option<String>>("name")
        .ok()
        .flatten();
    let message = ex.message().unwrap_or_default();
    match name {
        Some(name) if !name.is_empty() => format!("{}: {}", name, message),
        _ => message,
    }
}

fn from_exception(ex: &Exception<'_>) -> ScriptDiagnostic {
    let obj = ex.as_object();
    let stack = ex.stack();

    let mut file = obj.get::<_, Option<String>>("fileName").ok().flatten();
    let mut line = obj
        .get::<_, Option<i32>>("lineNumber")
        .ok()
        .flatten()
        .and_then(|l| u32::try_from(l).ok());
    let mut column = obj
        .get::<_, Option<i32>>("columnNumber")
        .ok()
        .flatten()
        .and_then(|c| u32::try_from(c).ok());

    if let Some((f, l, c)) = stack.as_deref().and_then(first_frame_location) {
        match line {
            None => {
                file = Some(f);
                line = Some(l);
                column = c;
            }
            Some(known) => {
                if file.is_none() {
                    file = Some(f);
                }
                if column.is_none() && known == l {
                    column = c;
                }
            }
        }
    }

    ScriptDiagnostic {
        file,
        line,
        column,
        message: exception_headline(ex),
        source_line: None,
        stack,
    }
}

fn coerce_to_string(value: Value<'_>) -> String {
    let ctx = value.ctx().clone();
    match Coerced::<String>::from_js(&ctx, value) {
        Ok(Coerced(s)) => s,
        Err(_) => {
            let _ = ctx.catch();
            "<unprintable exception>".to_string()
        }
    }
}

/// First `file:line[:col]` found in a stack trace, skipping native frames.
pub fn first_frame_location(stack: &str) -> Option<(String, u32, Option<u32>)> {
    stack.lines().find_map(|frame| {
        let rest = frame.trim().strip_prefix("at ")?;
        let location = match (rest.rfind('('), rest.rfind(')')) {
            (Some(open), Some(close)) if open < close => &rest[open + 1..close],
            _ => rest,
        };
        parse_location(location)
    })
}

fn parse_location(location: &str) -> Option<(String, u32, Option<u32>)> {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next()?;
    let middle = parts.next()?;
    match (parts.next(), middle.parse::<u32>(), last.parse::<u32>()) {
        (Some(file), Ok(line), Ok(col)) => Some((file.to_string(), line, Some(col))),
        (_, _, Ok(line)) => {
            let file = &location[..location.len() - last.len() - 1];
            Some((file.to_string(), line, None))
        }
        _ => None,
    }
}

/// Source listing with 1-based line numbers, for reset failures.
pub fn with_line_numbers(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + source.len() / 8);
    for (i, line) in source.lines().enumerate() {
        out.push_str(&format!("{}:\t{}\n", i + 1, line));
    }
    out
}
