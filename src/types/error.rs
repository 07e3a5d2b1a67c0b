use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, fmt};

/// The four error classes the engine can produce. Callers match on the
/// kind; everything else on [`ExprError`] is diagnostic payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// An operator or user function failed while evaluating.
    Runtime,
    /// The source can't be tokenized or parsed, or an operation was
    /// applied to operand types it doesn't support.
    Syntax,
    /// The parser accepted the input but produced an empty program, or
    /// input JSON failed top-level validation.
    Parser,
    /// An engine invariant was violated. These indicate bugs.
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Runtime => "RuntimeErr",
            ErrorKind::Syntax => "SyntaxErr",
            ErrorKind::Parser => "ParserErr",
            ErrorKind::Internal => "InternalErr",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExprError {
    kind: ErrorKind,
    title: String,
    data: HashMap<String, Value>,
}

impl ExprError {
    pub fn runtime(title: &str) -> ExprError {
        ExprError::new(ErrorKind::Runtime, title)
    }

    pub fn syntax(title: &str) -> ExprError {
        ExprError::new(ErrorKind::Syntax, title)
    }

    pub fn parser(title: &str) -> ExprError {
        ExprError::new(ErrorKind::Parser, title)
    }

    pub fn internal(title: &str) -> ExprError {
        ExprError::new(ErrorKind::Internal, title)
    }

    fn new(kind: ErrorKind, title: &str) -> ExprError {
        ExprError {
            kind,
            title: title.to_owned(),
            data: HashMap::new(),
        }
    }

    /// Attaches a named piece of diagnostic data.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> ExprError {
        self.data.insert(key.to_owned(), value.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn title<'a>(&'a self) -> &'a str {
        &self.title
    }

    pub fn data<'a>(&'a self) -> &'a HashMap<String, Value> {
        &self.data
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.title)?;

        // Sorted so the rendering is stable.
        let mut keys = self.data.keys().collect::<Vec<&String>>();
        keys.sort();
        for key in keys {
            write!(f, "; {} = {}", key, self.data[key])?;
        }

        Ok(())
    }
}

impl std::error::Error for ExprError {}

pub type ExprResult<T> = Result<T, ExprError>;

#[cfg(test)]
mod test {
    use super::{ErrorKind, ExprError};
    use test_case::test_case;

    #[test_case(ExprError::runtime("boom"), ErrorKind::Runtime, "RuntimeErr")]
    #[test_case(ExprError::syntax("boom"), ErrorKind::Syntax, "SyntaxErr")]
    #[test_case(ExprError::parser("boom"), ErrorKind::Parser, "ParserErr")]
    #[test_case(ExprError::internal("boom"), ErrorKind::Internal, "InternalErr")]
    fn test_kinds(err: ExprError, kind: ErrorKind, code: &str) {
        assert!(err.is(kind));
        assert_eq!(err.kind().code(), code);
    }

    #[test]
    fn test_display_renders_sorted_data() {
        let err = ExprError::syntax("unrecognized operator")
            .with("pos", "0:4")
            .with("op", "@");

        assert_eq!(
            err.to_string(),
            r#"SyntaxErr: unrecognized operator; op = "@"; pos = "0:4""#
        );
    }

    #[test]
    fn test_data_is_queryable() {
        let err = ExprError::runtime("operation error").with("op", "+");

        assert_eq!(err.title(), "operation error");
        assert_eq!(err.data()["op"], "+");
    }
}
