mod operators;

pub use operators::{OpImpl, OpRegistry};

use std::sync::OnceLock;

use crate::types::{
    bind_json_object, ExprError, ExprResult, FunctionToken, Token, TokenMap, VarPath,
};

/// What the evaluator knows about the reference (or variable) an
/// operand came from, captured before the operand is resolved to its
/// value.
pub struct RefInfo {
    pub path: VarPath,
    pub origin: Option<TokenMap>,
}

/// Context handed to operator implementations.
pub struct EvalData<'a> {
    pub vars: &'a TokenMap,
    pub left_ref: Option<RefInfo>,
    pub right_ref: Option<RefInfo>,
}

impl<'a> EvalData<'a> {
    pub fn new(vars: &'a TokenMap) -> EvalData<'a> {
        EvalData {
            vars,
            left_ref: None,
            right_ref: None,
        }
    }
}

fn default_registry() -> &'static OpRegistry {
    static REGISTRY: OnceLock<OpRegistry> = OnceLock::new();

    REGISTRY.get_or_init(OpRegistry::with_defaults)
}

/// Runs an RPN stream against a variable environment. The stream is
/// copied first; evaluation never writes into the program or the
/// environment, so both can be shared across calls and threads.
pub fn run_rpn(rpn: &[Token], vars: &TokenMap) -> ExprResult<Token> {
    let registry = default_registry();
    let rpn = rpn.to_vec();

    let mut stack: Vec<Token> = Vec::new();
    let mut data = EvalData::new(vars);

    for token in rpn.into_iter() {
        let op = match token {
            Token::Op(op) => op,
            Token::Var(path) => {
                stack.push(path.resolve(vars)?);
                continue;
            }
            token => {
                stack.push(token);
                continue;
            }
        };

        let right = pop_operand(&mut stack, &op)?;
        let left = pop_operand(&mut stack, &op)?;

        data.right_ref = ref_info_of(&right);
        data.left_ref = ref_info_of(&left);
        let right = resolve_operand(right, vars)?;
        let left = resolve_operand(left, vars)?;

        let result = if op == "," {
            build_tuple(left, right)
        } else if op == "()" {
            match left {
                Token::Function(function) => call_function(function, right, &data)?,
                left => {
                    return Err(ExprError::syntax("unsupported types for operator")
                        .with("op", "()")
                        .with("leftToken", left.to_string())
                        .with("rightToken", right.to_string()));
                }
            }
        } else {
            registry.dispatch(&op, left, right, &mut data)?
        };

        stack.push(result);
    }

    if stack.len() != 1 {
        return Err(ExprError::internal(
            "the eval stack should contain a single element at the end",
        )
        .with("stackSize", stack.len()));
    }

    match stack.pop() {
        Some(result) => Ok(result),
        None => Err(ExprError::internal(
            "the eval stack should contain a single element at the end",
        )),
    }
}

/// Binds a raw JSON record as a lazy environment, evaluates, and
/// asserts the result is a boolean.
pub fn run_rpn_bool(rpn: &[Token], raw_json: &[u8]) -> ExprResult<bool> {
    let vars = bind_json_object(raw_json)?;

    match run_rpn(rpn, &vars)? {
        Token::Bool(value) => Ok(value),
        other => Err(
            ExprError::internal("expression should evaluate to a boolean")
                .with("actualValue", other.to_string()),
        ),
    }
}

fn pop_operand(stack: &mut Vec<Token>, op: &str) -> ExprResult<Token> {
    match stack.pop() {
        Some(token) => Ok(token),
        None => Err(ExprError::internal("missing operands for operator").with("op", op)),
    }
}

fn ref_info_of(token: &Token) -> Option<RefInfo> {
    match token {
        Token::Ref(reference) => Some(RefInfo {
            path: reference.path().clone(),
            origin: reference.origin().cloned(),
        }),
        Token::Var(path) => Some(RefInfo {
            path: path.clone(),
            origin: None,
        }),
        _ => None,
    }
}

fn resolve_operand(token: Token, vars: &TokenMap) -> ExprResult<Token> {
    match token {
        Token::Ref(reference) => reference.resolve(Some(vars)),
        token => Ok(token),
    }
}

/// Function application is handled outside the registry: any value may
/// sit to the right of `()`, and the callee gets a fresh scope chained
/// under `$parent`. The receiver is the origin map recorded on the
/// function's reference, if any, else the current environment.
fn call_function(function: FunctionToken, right: Token, data: &EvalData) -> ExprResult<Token> {
    let args = match right {
        Token::Tuple(items) => items,
        // A bare operand is a single argument; a placeholder would be a
        // no-argument call.
        other => vec![other],
    };

    let receiver = match data.left_ref.as_ref().and_then(|info| info.origin.clone()) {
        Some(origin) => origin,
        None => data.vars.clone(),
    };

    let mut scope = TokenMap::new();
    scope.insert("$parent".to_owned(), Token::Map(data.vars.clone()));
    scope.insert("this".to_owned(), Token::Map(receiver));

    function.call(&args, &scope)
}

/// `,` folds left to right: a growing tuple keeps absorbing the next
/// element.
fn build_tuple(left: Token, right: Token) -> Token {
    match left {
        Token::Tuple(mut items) => {
            items.push(right);
            Token::Tuple(items)
        }
        left => Token::Tuple(vec![left, right]),
    }
}

#[cfg(test)]
mod test {
    use super::{run_rpn, run_rpn_bool};
    use crate::types::{ErrorKind, Token, TokenMap, VarPath};
    use test_case::test_case;

    fn op(text: &str) -> Token {
        Token::Op(text.to_owned())
    }

    #[test_case("+", 7.into(); "add through the stack")]
    #[test_case("-", 1.into(); "sub through the stack")]
    #[test_case("*", 12.into(); "mul through the stack")]
    #[test_case("/", 1.into(); "div through the stack")]
    #[test_case("%", 1.into(); "rem through the stack")]
    #[test_case("<", false.into(); "lt through the stack")]
    #[test_case("<=", false.into(); "le through the stack")]
    #[test_case("==", false.into(); "eq through the stack")]
    #[test_case("!=", true.into(); "ne through the stack")]
    #[test_case(">=", true.into(); "ge through the stack")]
    #[test_case(">", true.into(); "gt through the stack")]
    fn test_binary_ops_through_the_stack(operator: &str, expected: Token) {
        let rpn = vec![4.into(), 3.into(), op(operator)];

        assert_eq!(run_rpn(&rpn, &TokenMap::new()).unwrap(), expected);
    }

    #[test]
    fn test_variables_resolve_on_push() {
        let mut vars = TokenMap::new();
        vars.insert("a".to_owned(), 5.into());
        let rpn = vec![Token::Var(VarPath::new("a")), 5.into(), op("==")];

        assert_eq!(run_rpn(&rpn, &vars).unwrap(), true.into());
    }

    #[test]
    fn test_missing_operand_is_an_internal_error() {
        let rpn = vec![4.into(), op("+")];

        let err = run_rpn(&rpn, &TokenMap::new()).unwrap_err();

        assert!(err.is(ErrorKind::Internal));
        assert_eq!(err.title(), "missing operands for operator");
    }

    #[test]
    fn test_residual_stack_is_an_internal_error() {
        let rpn = vec![4.into(), 3.into()];

        let err = run_rpn(&rpn, &TokenMap::new()).unwrap_err();

        assert!(err.is(ErrorKind::Internal));
        assert_eq!(err.data()["stackSize"], 2);
    }

    #[test]
    fn test_bool_entry_point_rejects_other_results() {
        let rpn = vec![4.into(), 3.into(), op("+")];

        let err = run_rpn_bool(&rpn, b"{}").unwrap_err();

        assert!(err.is(ErrorKind::Internal));
        assert_eq!(err.title(), "expression should evaluate to a boolean");
        assert_eq!(err.data()["actualValue"], "7");
    }

    #[test]
    fn test_tuples_fold_left_to_right() {
        let rpn = vec![1.into(), 2.into(), op(","), 3.into(), op(",")];

        let result = run_rpn(&rpn, &TokenMap::new()).unwrap();

        assert_eq!(result, Token::Tuple(vec![1.into(), 2.into(), 3.into()]));
    }
}
