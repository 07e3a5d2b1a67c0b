use super::{precedence, source_location::SourceLocation};
use crate::types::{ExprError, ExprResult, Token};

/// The last-intake marker used when the previous item was a value, not
/// an operator.
const NOT_AN_OP: &str = "no";

/// Assembles a Reverse Polish token stream out of the values and
/// operators the compiler feeds it, preserving precedence with an
/// operator stack. It doesn't parse anything itself.
pub struct RpnBuilder {
    rpn: Vec<Token>,
    op_stack: Vec<String>,

    /// The last operator handled, or [`NOT_AN_OP`] after a value. The
    /// initial empty string counts as an operator, which makes a unary
    /// at the very start of the expression parse correctly.
    last_token_was_op: String,
    last_token_was_unary: bool,

    /// Kept so custom parsers can tell whether the expression would end
    /// inside a bracket.
    bracket_level: usize,
}

impl RpnBuilder {
    pub fn new() -> RpnBuilder {
        RpnBuilder {
            rpn: Vec::new(),
            op_stack: Vec::new(),
            last_token_was_op: String::new(),
            last_token_was_unary: false,
            bracket_level: 0,
        }
    }

    pub fn last_was_value(&self) -> bool {
        self.last_token_was_op == NOT_AN_OP
    }

    pub fn bracket_level(&self) -> usize {
        self.bracket_level
    }

    pub fn handle_token(&mut self, token: Token) -> ExprResult<()> {
        if self.last_was_value() {
            return Err(
                ExprError::syntax("expected token to be an operator or bracket")
                    .with("token", token.to_string()),
            );
        }

        self.rpn.push(token);
        self.last_token_was_op = NOT_AN_OP.to_owned();
        self.last_token_was_unary = false;

        Ok(())
    }

    /// Finds out whether `op` is a left unary, right unary or binary
    /// operator and handles it accordingly.
    pub fn handle_op(&mut self, op: &str) -> ExprResult<()> {
        if !self.last_was_value() {
            // Only a left unary operator can follow another operator.
            let unary = format!("L{}", op);
            if precedence::precedence(&unary).is_none() {
                return Err(ExprError::syntax("unrecognized unary operator").with("op", op));
            }

            self.rpn.push(Token::UnaryPlaceholder);
            self.op_stack.push(unary);
            self.last_token_was_unary = true;
            self.last_token_was_op = op.to_owned();

            return Ok(());
        }

        let right_unary = format!("R{}", op);
        if precedence::precedence(&right_unary).is_some() {
            // Right unary operators drain the stack *before* emitting
            // their placeholder and operator; the operand is already in
            // the output.
            self.drain_op_stack(&right_unary);
            self.rpn.push(Token::UnaryPlaceholder);
            self.rpn
                .push(Token::Op(precedence::normalize_op(&right_unary).to_owned()));
            self.last_token_was_unary = false;
            self.last_token_was_op = NOT_AN_OP.to_owned();
        } else if precedence::precedence(op).is_some() {
            self.drain_op_stack(op);
            self.op_stack.push(op.to_owned());
            self.last_token_was_unary = false;
            self.last_token_was_op = op.to_owned();
        } else {
            return Err(ExprError::syntax("unrecognized binary operator").with("op", op));
        }

        Ok(())
    }

    /// Moves operators from the stack to the output while the stacked
    /// rank binds at least as tight as the incoming one (strictly
    /// tighter for right-associative incoming operators). Opening
    /// brackets fence the drain.
    fn drain_op_stack(&mut self, op: &str) {
        let incoming = match precedence::precedence(op) {
            Some(rank) => rank,
            None => return,
        };
        let strict = precedence::is_right_associative(op);

        while let Some(top) = self.op_stack.last() {
            if is_open_bracket(top) {
                break;
            }

            let stacked = match precedence::precedence(top) {
                Some(rank) => rank,
                None => break,
            };
            let pops = if strict {
                incoming > stacked
            } else {
                incoming >= stacked
            };
            if !pops {
                break;
            }

            let top = self.op_stack.pop().unwrap_or_default();
            self.rpn
                .push(Token::Op(precedence::normalize_op(&top).to_owned()));
        }
    }

    pub fn open_bracket(&mut self, bracket: char) {
        self.op_stack.push(bracket.to_string());
        self.last_token_was_op = bracket.to_string();
        self.last_token_was_unary = false;
        self.bracket_level += 1;
    }

    /// Closes the bracket opened by `opener`, moving everything stacked
    /// inside it to the output.
    pub fn close_bracket(&mut self, opener: char) -> ExprResult<()> {
        let opener = opener.to_string();

        if self.last_token_was_op == opener {
            return Err(
                ExprError::syntax("bracket unexpectedly closed with no elements")
                    .with("bracketType", opener),
            );
        }

        loop {
            let top = match self.op_stack.pop() {
                Some(top) => top,
                None => {
                    return Err(ExprError::syntax("extra closing bracket on the expression")
                        .with("bracketType", opener));
                }
            };

            if top == opener {
                break;
            }
            if is_open_bracket(&top) {
                return Err(ExprError::syntax("mismatched brackets")
                    .with("expected", opener)
                    .with("found", top));
            }

            self.rpn
                .push(Token::Op(precedence::normalize_op(&top).to_owned()));
        }

        self.last_token_was_op = NOT_AN_OP.to_owned();
        self.last_token_was_unary = false;
        self.bracket_level -= 1;

        Ok(())
    }

    /// Drains what's left on the operator stack and hands the finished
    /// RPN over, after checking the expression didn't end mid-way
    /// through an operation or a bracket.
    pub fn finish(mut self, ended_at: SourceLocation) -> ExprResult<Vec<Token>> {
        if self.last_token_was_unary {
            let op = self
                .op_stack
                .last()
                .map(|op| precedence::normalize_op(op).to_owned())
                .unwrap_or_default();
            return Err(ExprError::syntax("expected operand after unary operator")
                .with("operator", op)
                .with("pos", ended_at.to_string()));
        }

        let last = self.last_token_was_op.clone();
        if last != NOT_AN_OP && !last.is_empty() && !is_open_bracket(&last) {
            return Err(ExprError::syntax("expected operand after operator")
                .with("operator", last)
                .with("pos", ended_at.to_string()));
        }

        while let Some(top) = self.op_stack.pop() {
            if is_open_bracket(&top) {
                return Err(ExprError::syntax("bracket was never closed").with("bracketType", top));
            }

            self.rpn
                .push(Token::Op(precedence::normalize_op(&top).to_owned()));
        }

        if self.rpn.is_empty() {
            return Err(ExprError::parser("invalid state: the final rpn ended up empty"));
        }

        Ok(self.rpn)
    }
}

fn is_open_bracket(op: &str) -> bool {
    matches!(op, "(" | "[" | "{")
}

#[cfg(test)]
mod test {
    use super::RpnBuilder;
    use crate::compiler::source_location::SourceLocation;
    use crate::types::{ErrorKind, ExprError, Token};

    fn finish(builder: RpnBuilder) -> Result<Vec<Token>, ExprError> {
        builder.finish(SourceLocation::new(0, 0))
    }

    fn ops(rpn: &[Token]) -> Vec<String> {
        rpn.iter()
            .filter_map(|token| match token {
                Token::Op(op) => Some(op.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_precedence_orders_the_output() {
        // a + b * c => a b c * +
        let mut builder = RpnBuilder::new();
        builder.handle_token(1.into()).unwrap();
        builder.handle_op("+").unwrap();
        builder.handle_token(2.into()).unwrap();
        builder.handle_op("*").unwrap();
        builder.handle_token(3.into()).unwrap();

        let rpn = finish(builder).unwrap();

        assert_eq!(ops(&rpn), vec!["*", "+"]);
    }

    #[test]
    fn test_equal_ranks_pop_left_to_right() {
        // a - b + c => a b - c +
        let mut builder = RpnBuilder::new();
        builder.handle_token(1.into()).unwrap();
        builder.handle_op("-").unwrap();
        builder.handle_token(2.into()).unwrap();
        builder.handle_op("+").unwrap();
        builder.handle_token(3.into()).unwrap();

        let rpn = finish(builder).unwrap();

        assert_eq!(ops(&rpn), vec!["-", "+"]);
    }

    #[test]
    fn test_exponent_stacks_right_to_left() {
        // a ** b ** c => a b c ** **
        let mut builder = RpnBuilder::new();
        builder.handle_token(2.into()).unwrap();
        builder.handle_op("**").unwrap();
        builder.handle_token(3.into()).unwrap();
        builder.handle_op("**").unwrap();
        builder.handle_token(2.into()).unwrap();

        let rpn = finish(builder).unwrap();

        assert_eq!(rpn.len(), 5);
        assert_eq!(ops(&rpn), vec!["**", "**"]);
        assert_eq!(rpn[2], 2.into());
    }

    #[test]
    fn test_leading_unary_uses_the_initial_op_state() {
        let mut builder = RpnBuilder::new();
        builder.handle_op("-").unwrap();
        builder.handle_token(3.into()).unwrap();

        let rpn = finish(builder).unwrap();

        assert_eq!(
            rpn,
            vec![Token::UnaryPlaceholder, 3.into(), Token::Op("-".to_owned())]
        );
    }

    #[test]
    fn test_two_values_in_a_row_is_an_error() {
        let mut builder = RpnBuilder::new();
        builder.handle_token(1.into()).unwrap();

        let err = builder.handle_token(2.into()).unwrap_err();

        assert!(err.is(ErrorKind::Syntax));
    }

    #[test]
    fn test_unknown_unary_is_an_error() {
        let mut builder = RpnBuilder::new();

        let err = builder.handle_op("*").unwrap_err();

        assert!(err.is(ErrorKind::Syntax));
        assert_eq!(err.title(), "unrecognized unary operator");
    }

    #[test]
    fn test_dangling_unary_is_an_error() {
        let mut builder = RpnBuilder::new();
        builder.handle_token(1.into()).unwrap();
        builder.handle_op("+").unwrap();
        builder.handle_op("-").unwrap();

        let err = finish(builder).unwrap_err();

        assert_eq!(err.title(), "expected operand after unary operator");
        assert_eq!(err.data()["operator"], "-");
    }

    #[test]
    fn test_dangling_binary_is_an_error() {
        let mut builder = RpnBuilder::new();
        builder.handle_token(1.into()).unwrap();
        builder.handle_op("+").unwrap();

        let err = finish(builder).unwrap_err();

        assert_eq!(err.title(), "expected operand after operator");
    }

    #[test]
    fn test_empty_bracket_is_an_error() {
        let mut builder = RpnBuilder::new();
        builder.open_bracket('(');

        let err = builder.close_bracket('(').unwrap_err();

        assert_eq!(err.title(), "bracket unexpectedly closed with no elements");
    }

    #[test]
    fn test_extra_closing_bracket_is_an_error() {
        let mut builder = RpnBuilder::new();
        builder.handle_token(1.into()).unwrap();

        let err = builder.close_bracket('(').unwrap_err();

        assert_eq!(err.title(), "extra closing bracket on the expression");
    }

    #[test]
    fn test_unclosed_bracket_is_an_error() {
        let mut builder = RpnBuilder::new();
        builder.open_bracket('(');
        builder.handle_token(1.into()).unwrap();

        let err = finish(builder).unwrap_err();

        assert_eq!(err.title(), "bracket was never closed");
    }

    #[test]
    fn test_brackets_fence_the_drain() {
        // a * (b + c) => a b c + *
        let mut builder = RpnBuilder::new();
        builder.handle_token(1.into()).unwrap();
        builder.handle_op("*").unwrap();
        builder.open_bracket('(');
        builder.handle_token(2.into()).unwrap();
        builder.handle_op("+").unwrap();
        builder.handle_token(3.into()).unwrap();
        builder.close_bracket('(').unwrap();

        let rpn = finish(builder).unwrap();

        assert_eq!(ops(&rpn), vec!["+", "*"]);
    }

    #[test]
    fn test_bracket_level_tracks_nesting() {
        let mut builder = RpnBuilder::new();

        assert_eq!(builder.bracket_level(), 0);
        builder.open_bracket('(');
        assert_eq!(builder.bracket_level(), 1);
        builder.handle_token(1.into()).unwrap();
        builder.close_bracket('(').unwrap();
        assert_eq!(builder.bracket_level(), 0);
    }

    #[test]
    fn test_empty_input_is_a_parser_error() {
        let err = finish(RpnBuilder::new()).unwrap_err();

        assert!(err.is(ErrorKind::Parser));
    }
}
