use super::{
    lexer::{Lexeme, Lexer},
    precedence, reserved,
    rpn_builder::RpnBuilder,
};
use crate::types::{containers, ExprError, ExprResult, RefToken, Token, TokenMap, VarPath};
use crate::Program;

/// Compiles an expression into an immutable [`Program`]. Identifiers
/// found in `bindings` are pinned as references carrying their
/// compile-time value; everything else stays a variable and defers to
/// the evaluation environment.
pub fn compile(source: &str, bindings: &TokenMap) -> ExprResult<Program> {
    ExprCompiler::with_input(source, bindings).compile()
}

pub struct ExprCompiler<'l> {
    lexer: Lexer<'l>,
    builder: RpnBuilder,
    source: &'l str,
    bindings: &'l TokenMap,
}

impl<'l> ExprCompiler<'l> {
    pub fn with_input(source: &'l str, bindings: &'l TokenMap) -> ExprCompiler<'l> {
        ExprCompiler {
            lexer: Lexer::with_input(source),
            builder: RpnBuilder::new(),
            source,
            bindings,
        }
    }

    pub fn compile(mut self) -> ExprResult<Program> {
        if self.source.is_empty() {
            return Err(ExprError::parser(
                "cannot build an expression from an empty string",
            ));
        }

        while let Some(lexeme) = self.lexer.next_lexeme()? {
            match lexeme {
                Lexeme::Value(token) => self.builder.handle_token(token)?,
                Lexeme::Word(word) => self.handle_word(word)?,
                Lexeme::OpText { text, start } => self.handle_op_text(text, start)?,
                Lexeme::Open(bracket) => self.handle_open(bracket)?,
                Lexeme::Close(bracket) => {
                    let opener = match bracket {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    self.builder.close_bracket(opener)?;
                }
            }
        }

        let rpn = self.builder.finish(self.lexer.location())?;
        let rpn = link_paths(rpn);

        Ok(Program::new(self.source, rpn))
    }

    fn handle_word(&mut self, word: String) -> ExprResult<()> {
        if let Some(parser) = reserved::lookup(&word) {
            return parser(self.lexer.scanner_mut(), &mut self.builder);
        }

        if let Some(value) = self.bindings.get(&word) {
            return self.builder.handle_token(Token::Ref(RefToken::new(
                VarPath::new(&word),
                value.clone(),
            )));
        }

        self.builder.handle_token(Token::Var(VarPath::new(&word)))
    }

    /// Resolves gathered operator text, in order: a reserved word, a
    /// known operator, or a reserved word made of just the first
    /// character (with the cursor rewound past it).
    fn handle_op_text(&mut self, text: String, start: usize) -> ExprResult<()> {
        if let Some(parser) = reserved::lookup(&text) {
            return parser(self.lexer.scanner_mut(), &mut self.builder);
        }

        if precedence::is_known_op(&text) {
            return self.builder.handle_op(&text);
        }

        let first = text.chars().take(1).collect::<String>();
        if let Some(parser) = reserved::lookup(&first) {
            self.lexer.scanner_mut().rewind_to(start + 1);
            return parser(self.lexer.scanner_mut(), &mut self.builder);
        }

        Err(ExprError::syntax("unrecognized operator")
            .with("op", text)
            .with("pos", self.lexer.location().to_string()))
    }

    fn handle_open(&mut self, bracket: char) -> ExprResult<()> {
        match bracket {
            '(' => {
                // A value right before `(` makes this a call; `()`
                // counts both as a bracket and as an operator.
                if self.builder.last_was_value() {
                    self.builder.handle_op("()")?;
                }
            }
            '[' => {
                if self.builder.last_was_value() {
                    self.builder.handle_op("[]")?;
                } else {
                    // A list literal is a constructor call in disguise.
                    self.builder
                        .handle_token(Token::Function(containers::list_constructor()))?;
                    self.builder.handle_op("()")?;
                }
            }
            _ => {
                self.builder
                    .handle_token(Token::Function(containers::map_constructor()))?;
                self.builder.handle_op("()")?;
            }
        }

        self.builder.open_bracket(bracket);
        Ok(())
    }
}

/// The lexer only emits single-segment variables: `a.b['c']` reaches
/// the raw RPN as three pushes and two operators. This pass folds those
/// chains back into multi-segment paths, and turns folds into
/// compile-time bound maps into references that remember their origin
/// map.
fn link_paths(rpn: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::new();

    for token in rpn.into_iter() {
        let op = match &token {
            Token::Op(op) if op == "." || op == "[]" => op.clone(),
            _ => {
                out.push(token);
                continue;
            }
        };

        let segment = match out.last() {
            Some(Token::Var(path)) if op == "." && path.segments().len() == 1 => {
                path.segments()[0].clone()
            }
            Some(Token::String(key)) if op == "[]" => key.clone(),
            _ => {
                out.push(token);
                continue;
            }
        };

        let folded = if out.len() >= 2 {
            match &out[out.len() - 2] {
                Token::Var(path) => Some(Token::Var(path.join(&segment))),
                Token::Ref(reference) => Some(fold_reference(reference, &segment)),
                _ => None,
            }
        } else {
            None
        };

        match folded {
            Some(folded) => {
                out.pop();
                out.pop();
                out.push(folded);
            }
            None => out.push(token),
        }
    }

    out
}

fn fold_reference(reference: &RefToken, segment: &str) -> Token {
    let path = reference.path().join(segment);

    if let Token::Map(map) = reference.value() {
        if let Some(member) = map.get(segment) {
            return Token::Ref(RefToken::with_origin(path, member.clone(), map.clone()));
        }
    }

    // The binding doesn't reach this far down; leave the lookup to the
    // evaluation environment.
    Token::Var(path)
}
