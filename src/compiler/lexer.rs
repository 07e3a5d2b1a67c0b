use super::{input_scanner::StringScanner, precedence, source_location::SourceLocation};
use crate::types::{ExprError, ExprResult, Token};

/// One unit recognized by the lexer. Identifiers and operator text come
/// back raw: deciding between reserved words, compile-time references
/// and plain variables takes context the lexer doesn't have.
#[derive(Debug, Clone, PartialEq)]
pub enum Lexeme {
    /// A literal, ready to be pushed into the RPN.
    Value(Token),
    /// An identifier.
    Word(String),
    /// Gathered operator text and the cursor position of its first
    /// character, in case the resolution has to rewind.
    OpText { text: String, start: usize },
    Open(char),
    Close(char),
}

pub struct Lexer<'l> {
    scanner: StringScanner<'l>,
}

impl<'l> Lexer<'l> {
    pub fn with_input(input: &'l str) -> Lexer<'l> {
        Lexer {
            scanner: StringScanner::with_input(input),
        }
    }

    pub fn scanner_mut<'a>(&'a mut self) -> &'a mut StringScanner<'l> {
        &mut self.scanner
    }

    pub fn location(&self) -> SourceLocation {
        self.scanner.location()
    }

    /// Produces the next lexeme, or None at end of input or at the `;`
    /// terminating the expression.
    pub fn next_lexeme(&mut self) -> ExprResult<Option<Lexeme>> {
        self.skip_whitespace();

        let c = match self.scanner.peek() {
            Some(c) => c,
            None => return Ok(None),
        };

        match c {
            ';' => {
                self.scanner.next();
                Ok(None)
            }
            '0'..='9' => Ok(Some(Lexeme::Value(self.parse_number()?))),
            '\'' | '"' => Ok(Some(Lexeme::Value(Token::String(
                self.parse_string_literal()?,
            )))),
            '(' | '[' | '{' => {
                self.scanner.next();
                Ok(Some(Lexeme::Open(c)))
            }
            ')' | ']' | '}' => {
                self.scanner.next();
                Ok(Some(Lexeme::Close(c)))
            }
            c if c.is_alphabetic() || c == '_' => Ok(Some(Lexeme::Word(self.parse_word()))),
            _ => Ok(Some(self.parse_operator())),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.scanner.peek(), Some(c) if c.is_whitespace()) {
            self.scanner.next();
        }
    }

    fn parse_word(&mut self) -> String {
        let mut word = String::new();

        while let Some(c) = self.scanner.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.scanner.next();
            } else {
                break;
            }
        }

        word
    }

    /// Numeric literals: decimal, `0x` hex, `0b` binary and `0`-prefixed
    /// octal, with a decimal point allowed in base 10 only.
    fn parse_number(&mut self) -> ExprResult<Token> {
        let started_at = self.scanner.location();
        let mut literal = String::new();
        let mut digits = String::new();

        let mut base = 10;
        if self.scanner.peek() == Some('0') {
            match self.scanner.peek_at(1) {
                Some('x') => {
                    base = 16;
                    literal.push_str("0x");
                    self.scanner.next();
                    self.scanner.next();
                }
                Some('b') => {
                    base = 2;
                    literal.push_str("0b");
                    self.scanner.next();
                    self.scanner.next();
                }
                Some(c) if c.is_ascii_digit() => {
                    base = 8;
                    literal.push('0');
                    self.scanner.next();
                }
                _ => {}
            }
        }

        while let Some(c) = self.scanner.peek() {
            if is_digit_in(c, base) {
                literal.push(c);
                digits.push(c);
                self.scanner.next();
            } else {
                break;
            }
        }

        // A `.` followed by further digits turns the literal into a
        // float; a bare `.` stays behind as the member-access operator.
        let mut is_float = false;
        if self.scanner.peek() == Some('.')
            && matches!(self.scanner.peek_at(1), Some(c) if is_digit_in(c, base))
        {
            is_float = true;
            literal.push('.');
            digits.push('.');
            self.scanner.next();

            while let Some(c) = self.scanner.peek() {
                if is_digit_in(c, base) {
                    literal.push(c);
                    digits.push(c);
                    self.scanner.next();
                } else {
                    break;
                }
            }
        }

        if is_float {
            if base != 10 {
                return Err(ExprError::syntax("only base 10 literals can have decimals")
                    .with("literal", literal)
                    .with("pos", started_at.to_string()));
            }

            return match digits.parse::<f64>() {
                Ok(number) => Ok(Token::Float(number)),
                Err(err) => Err(
                    ExprError::internal("failed to parse a pre-scanned float literal")
                        .with("literal", literal)
                        .with("error", err.to_string()),
                ),
            };
        }

        match i64::from_str_radix(&digits, base) {
            Ok(number) => Ok(Token::Int(number)),
            Err(err) => Err(ExprError::syntax("error parsing numeric literal")
                .with("literal", literal)
                .with("error", err.to_string())
                .with("pos", started_at.to_string())),
        }
    }

    /// Single- or double-quoted literals. `\n` and `\t` translate, an
    /// escaped quote or backslash (or any other escaped character) is
    /// taken verbatim, and an escaped newline continues the literal on
    /// the next line. An unescaped newline or end of input before the
    /// closing quote is an error pointing at the opening quote.
    fn parse_string_literal(&mut self) -> ExprResult<String> {
        let started_at = self.scanner.location();
        let quote = match self.scanner.next() {
            Some(quote) => quote,
            None => {
                return Err(ExprError::internal(
                    "string literal parser called at end of input",
                ));
            }
        };

        let mut value = String::new();
        loop {
            match self.scanner.peek() {
                None | Some('\n') => {
                    return Err(ExprError::syntax("string literal not terminated")
                        .with("startedAt", started_at.to_string()));
                }
                Some(c) if c == quote => {
                    self.scanner.next();
                    return Ok(value);
                }
                Some('\\') => {
                    self.scanner.next();
                    match self.scanner.next() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(other) => value.push(other),
                        None => {
                            return Err(ExprError::syntax("string literal not terminated")
                                .with("startedAt", started_at.to_string()));
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.scanner.next();
                }
            }
        }
    }

    /// Gathers consecutive operator characters, stopping at characters
    /// that start a fresh token so `*-` splits into `*` and `-`. The
    /// first character is taken unconditionally; resolving the text is
    /// the compiler's job.
    fn parse_operator(&mut self) -> Lexeme {
        let start = self.scanner.pos();
        let mut text = String::new();

        if let Some(c) = self.scanner.next() {
            text.push(c);
        }

        while let Some(c) = self.scanner.peek() {
            if precedence::is_op_char(c) && !precedence::is_op_boundary_char(c) {
                text.push(c);
                self.scanner.next();
            } else {
                break;
            }
        }

        Lexeme::OpText { text, start }
    }
}

fn is_digit_in(c: char, base: u32) -> bool {
    if base == 16 {
        c.is_ascii_hexdigit()
    } else {
        c.is_ascii_digit()
    }
}

#[cfg(test)]
mod test {
    use super::{Lexeme, Lexer};
    use crate::types::{ErrorKind, ExprError, Token};
    use test_case::test_case;

    fn lex(input: &str) -> Result<Vec<Lexeme>, ExprError> {
        let mut lexer = Lexer::with_input(input);
        let mut lexemes = Vec::new();

        while let Some(lexeme) = lexer.next_lexeme()? {
            lexemes.push(lexeme);
        }

        Ok(lexemes)
    }

    fn value(token: Token) -> Lexeme {
        Lexeme::Value(token)
    }

    #[test_case("100", 100; "decimal")]
    #[test_case("0xA", 10; "hex")]
    #[test_case("0x1f", 31; "hex lowercase")]
    #[test_case("0b1010", 10; "binary")]
    #[test_case("012", 10; "octal")]
    #[test_case("0", 0; "lone zero")]
    fn test_integer_literals(input: &str, expected: i64) {
        assert_eq!(lex(input).unwrap(), vec![value(Token::Int(expected))]);
    }

    #[test_case("1.5", 1.5)]
    #[test_case("0.25", 0.25)]
    #[test_case("10.0", 10.0)]
    fn test_float_literals(input: &str, expected: f64) {
        assert_eq!(lex(input).unwrap(), vec![value(Token::Float(expected))]);
    }

    #[test_case("0x1.2"; "hex decimals")]
    #[test_case("0b1.1"; "binary decimals")]
    fn test_decimals_need_base_10(input: &str) {
        let err = lex(input).unwrap_err();

        assert!(err.is(ErrorKind::Syntax));
        assert_eq!(err.title(), "only base 10 literals can have decimals");
    }

    #[test_case("0b2"; "digit outside binary alphabet")]
    #[test_case("098"; "digit outside octal alphabet")]
    #[test_case("9223372036854775808"; "signed 64 bit overflow")]
    fn test_bad_integer_literals(input: &str) {
        let err = lex(input).unwrap_err();

        assert!(err.is(ErrorKind::Syntax));
        assert_eq!(err.title(), "error parsing numeric literal");
    }

    #[test]
    fn test_number_leaves_a_bare_dot_for_member_access() {
        let lexemes = lex("1.foo").unwrap();

        assert_eq!(lexemes.len(), 3);
        assert_eq!(lexemes[0], value(Token::Int(1)));
        assert!(matches!(&lexemes[1], Lexeme::OpText { text, .. } if text == "."));
        assert_eq!(lexemes[2], Lexeme::Word("foo".to_owned()));
    }

    #[test_case(r#""hello""#, "hello")]
    #[test_case("'hello'", "hello"; "single quotes")]
    #[test_case(r#""with \"inner\"""#, "with \"inner\""; "escaped quotes")]
    #[test_case(r#""tab\there""#, "tab\there")]
    #[test_case(r#""line\nbreak""#, "line\nbreak")]
    #[test_case(r#""back\\slash""#, "back\\slash")]
    #[test_case(r#""\q""#, "q"; "unknown escapes are taken verbatim")]
    #[test_case("\"one\\\ntwo\"", "one\ntwo"; "escaped newline continues the literal")]
    fn test_string_literals(input: &str, expected: &str) {
        assert_eq!(
            lex(input).unwrap(),
            vec![value(Token::String(expected.to_owned()))]
        );
    }

    #[test_case("\"ab"; "ended by eof")]
    #[test_case("\"ab\ncd\""; "ended by a raw newline")]
    #[test_case("'ab\""; "mismatched quotes run to eof")]
    fn test_unterminated_string_literals(input: &str) {
        let err = lex(input).unwrap_err();

        assert!(err.is(ErrorKind::Syntax));
        assert_eq!(err.title(), "string literal not terminated");
        assert_eq!(err.data()["startedAt"], "0:0");
    }

    #[test]
    fn test_operator_gathering_stops_at_starting_chars() {
        let lexemes = lex("*-").unwrap();

        assert!(matches!(&lexemes[0], Lexeme::OpText { text, .. } if text == "*"));
        assert!(matches!(&lexemes[1], Lexeme::OpText { text, .. } if text == "-"));
    }

    #[test]
    fn test_multi_char_operators_gather_whole() {
        let lexemes = lex("a <= 1").unwrap();

        assert_eq!(lexemes[0], Lexeme::Word("a".to_owned()));
        assert!(matches!(&lexemes[1], Lexeme::OpText { text, .. } if text == "<="));
        assert_eq!(lexemes[2], value(Token::Int(1)));
    }

    #[test]
    fn test_semicolon_terminates_the_expression() {
        let lexemes = lex("1; this is ignored").unwrap();

        assert_eq!(lexemes, vec![value(Token::Int(1))]);
    }

    #[test]
    fn test_newlines_are_counted_for_diagnostics() {
        let err = lex("\n\n  \"ab").unwrap_err();

        assert_eq!(err.data()["startedAt"], "2:2");
    }
}
