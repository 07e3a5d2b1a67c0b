use std::collections::HashMap;

use super::EvalData;
use crate::types::{ExprError, ExprResult, Token, TokenTag};

/// Implementation of one operator for one (left, right) operand pair.
/// Unary operators get a UnaryPlaceholder on their unused side.
pub type OpImpl = fn(left: Token, right: Token, op: &str, data: &mut EvalData) -> ExprResult<Token>;

const NUMERIC_PAIRS: [(TokenTag, TokenTag); 4] = [
    (TokenTag::Int, TokenTag::Int),
    (TokenTag::Int, TokenTag::Float),
    (TokenTag::Float, TokenTag::Int),
    (TokenTag::Float, TokenTag::Float),
];

/// Two-level dispatch table: operator string first, then the exact
/// operand tag pair. Mixed Int/Float arithmetic is registered
/// explicitly so JSON-sourced numbers (always Float) compare cleanly
/// against integer literals.
pub struct OpRegistry {
    ops: HashMap<&'static str, HashMap<(TokenTag, TokenTag), OpImpl>>,
}

impl OpRegistry {
    pub fn with_defaults() -> OpRegistry {
        let mut registry = OpRegistry {
            ops: HashMap::new(),
        };

        for op in ["==", "!=", "<", "<=", ">", ">="] {
            for pair in NUMERIC_PAIRS {
                registry.register(op, pair, compare_numbers);
            }
        }
        for op in ["==", "!="] {
            for tag in [TokenTag::Str, TokenTag::Bool, TokenTag::List, TokenTag::Map] {
                registry.register(op, (tag, tag), strict_equality);
            }
        }

        for op in ["+", "-", "*", "/", "%", "**"] {
            for pair in NUMERIC_PAIRS {
                registry.register(op, pair, arithmetic);
            }
        }
        registry.register("+", (TokenTag::Str, TokenTag::Str), concat_strings);

        for op in ["<<", ">>", "&", "^", "|"] {
            registry.register(op, (TokenTag::Int, TokenTag::Int), integer_bitwise);
        }

        for op in ["&&", "||"] {
            registry.register(op, (TokenTag::Bool, TokenTag::Bool), logical);
        }

        for tag in [TokenTag::Int, TokenTag::Float] {
            registry.register("-", (TokenTag::UnaryPlaceholder, tag), unary_sign);
            registry.register("+", (TokenTag::UnaryPlaceholder, tag), unary_sign);
        }
        registry.register("!", (TokenTag::UnaryPlaceholder, TokenTag::Bool), unary_not);

        // `:` accepts any value on its right; the key side must already
        // be a string.
        for tag in TokenTag::ALL {
            registry.register(":", (TokenTag::Str, tag), key_value);
        }

        registry.register(".", (TokenTag::Map, TokenTag::Str), member_access);
        registry.register(".", (TokenTag::Str, TokenTag::Str), join_path);
        registry.register("[]", (TokenTag::Map, TokenTag::Str), member_access);
        registry.register("[]", (TokenTag::List, TokenTag::Int), index_list);
        registry.register("[]", (TokenTag::List, TokenTag::Float), index_list);

        registry
    }

    pub fn register(&mut self, op: &'static str, pair: (TokenTag, TokenTag), imp: OpImpl) {
        self.ops.entry(op).or_default().insert(pair, imp);
    }

    pub fn dispatch(
        &self,
        op: &str,
        left: Token,
        right: Token,
        data: &mut EvalData,
    ) -> ExprResult<Token> {
        let by_pair = match self.ops.get(op) {
            Some(group) => group,
            None => return Err(ExprError::syntax("unrecognized operator").with("op", op)),
        };

        let imp = match by_pair.get(&(left.tag(), right.tag())) {
            Some(imp) => imp,
            None => {
                return Err(ExprError::syntax("unsupported types for operator")
                    .with("op", op)
                    .with("leftToken", left.to_string())
                    .with("rightToken", right.to_string()));
            }
        };

        imp(left, right, op, data)
    }
}

enum NumberPair {
    Ints(i64, i64),
    Floats(f64, f64),
}

/// Int is promoted to Float for mixed pairs.
fn number_pair(left: &Token, right: &Token) -> Option<NumberPair> {
    match (left, right) {
        (Token::Int(a), Token::Int(b)) => Some(NumberPair::Ints(*a, *b)),
        (Token::Int(a), Token::Float(b)) => Some(NumberPair::Floats(*a as f64, *b)),
        (Token::Float(a), Token::Int(b)) => Some(NumberPair::Floats(*a, *b as f64)),
        (Token::Float(a), Token::Float(b)) => Some(NumberPair::Floats(*a, *b)),
        _ => None,
    }
}

fn wrong_operands(op: &str) -> ExprError {
    ExprError::internal("operator dispatched on unexpected operand types").with("op", op)
}

fn compare_numbers(left: Token, right: Token, op: &str, _data: &mut EvalData) -> ExprResult<Token> {
    use std::cmp::Ordering;

    let ordering = match number_pair(&left, &right) {
        Some(NumberPair::Ints(a, b)) => a.partial_cmp(&b),
        Some(NumberPair::Floats(a, b)) => a.partial_cmp(&b),
        None => return Err(wrong_operands(op)),
    };

    // An incomparable pair (NaN) is unequal and unordered.
    let result = match op {
        "==" => ordering == Some(Ordering::Equal),
        "!=" => ordering != Some(Ordering::Equal),
        "<" => ordering == Some(Ordering::Less),
        "<=" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        ">" => ordering == Some(Ordering::Greater),
        ">=" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        _ => return Err(wrong_operands(op)),
    };

    Ok(Token::Bool(result))
}

fn strict_equality(left: Token, right: Token, op: &str, _data: &mut EvalData) -> ExprResult<Token> {
    let equal = left == right;

    Ok(Token::Bool(if op == "!=" { !equal } else { equal }))
}

fn arithmetic(left: Token, right: Token, op: &str, _data: &mut EvalData) -> ExprResult<Token> {
    match number_pair(&left, &right) {
        Some(NumberPair::Ints(a, b)) => int_arithmetic(a, b, op),
        Some(NumberPair::Floats(a, b)) => float_arithmetic(a, b, op),
        None => Err(wrong_operands(op)),
    }
}

fn int_arithmetic(a: i64, b: i64, op: &str) -> ExprResult<Token> {
    let result = match op {
        "+" => a.checked_add(b),
        "-" => a.checked_sub(b),
        "*" => a.checked_mul(b),
        "/" => {
            if b == 0 {
                return Err(division_by_zero(op));
            }
            a.checked_div(b)
        }
        "%" => {
            if b == 0 {
                return Err(division_by_zero(op));
            }
            a.checked_rem(b)
        }
        "**" => {
            // A negative exponent leaves the integers.
            if b < 0 {
                return Ok(Token::Float((a as f64).powf(b as f64)));
            }
            u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp))
        }
        _ => return Err(wrong_operands(op)),
    };

    match result {
        Some(value) => Ok(Token::Int(value)),
        None => Err(ExprError::runtime("integer overflow")
            .with("op", op)
            .with("left", a)
            .with("right", b)),
    }
}

fn float_arithmetic(a: f64, b: f64, op: &str) -> ExprResult<Token> {
    let value = match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" => a / b,
        "%" => a % b,
        "**" => a.powf(b),
        _ => return Err(wrong_operands(op)),
    };

    Ok(Token::Float(value))
}

fn division_by_zero(op: &str) -> ExprError {
    ExprError::runtime("division by zero").with("op", op)
}

fn concat_strings(left: Token, right: Token, op: &str, _data: &mut EvalData) -> ExprResult<Token> {
    match (left, right) {
        (Token::String(mut a), Token::String(b)) => {
            a.push_str(&b);
            Ok(Token::String(a))
        }
        _ => Err(wrong_operands(op)),
    }
}

fn integer_bitwise(left: Token, right: Token, op: &str, _data: &mut EvalData) -> ExprResult<Token> {
    let (a, b) = match (left, right) {
        (Token::Int(a), Token::Int(b)) => (a, b),
        _ => return Err(wrong_operands(op)),
    };

    let result = match op {
        "&" => Some(a & b),
        "^" => Some(a ^ b),
        "|" => Some(a | b),
        "<<" | ">>" => {
            if b < 0 {
                return Err(ExprError::runtime("negative shift amount")
                    .with("op", op)
                    .with("amount", b));
            }
            let amount = u32::try_from(b).ok();
            match op {
                "<<" => amount.and_then(|amount| a.checked_shl(amount)),
                _ => amount.and_then(|amount| a.checked_shr(amount)),
            }
        }
        _ => return Err(wrong_operands(op)),
    };

    match result {
        Some(value) => Ok(Token::Int(value)),
        None => Err(ExprError::runtime("shift amount out of range")
            .with("op", op)
            .with("amount", b)),
    }
}

fn logical(left: Token, right: Token, op: &str, _data: &mut EvalData) -> ExprResult<Token> {
    match (left, right) {
        (Token::Bool(a), Token::Bool(b)) => {
            let value = match op {
                "&&" => a && b,
                "||" => a || b,
                _ => return Err(wrong_operands(op)),
            };
            Ok(Token::Bool(value))
        }
        _ => Err(wrong_operands(op)),
    }
}

fn unary_sign(_left: Token, right: Token, op: &str, _data: &mut EvalData) -> ExprResult<Token> {
    match (op, right) {
        ("+", right) => Ok(right),
        ("-", Token::Int(value)) => match value.checked_neg() {
            Some(negated) => Ok(Token::Int(negated)),
            None => Err(ExprError::runtime("integer overflow")
                .with("op", op)
                .with("right", value)),
        },
        ("-", Token::Float(value)) => Ok(Token::Float(-value)),
        _ => Err(wrong_operands(op)),
    }
}

fn unary_not(_left: Token, right: Token, op: &str, _data: &mut EvalData) -> ExprResult<Token> {
    match right {
        Token::Bool(value) => Ok(Token::Bool(!value)),
        _ => Err(wrong_operands(op)),
    }
}

fn key_value(left: Token, right: Token, op: &str, _data: &mut EvalData) -> ExprResult<Token> {
    match left {
        Token::String(key) => Ok(Token::KeyValue(key, Box::new(right))),
        _ => Err(wrong_operands(op)),
    }
}

/// `.` between two strings concatenates them with a dot, so an
/// undefined dotted path degrades to its printable form instead of
/// erroring out.
fn join_path(left: Token, right: Token, op: &str, _data: &mut EvalData) -> ExprResult<Token> {
    match (left, right) {
        (Token::String(mut a), Token::String(b)) => {
            a.push('.');
            a.push_str(&b);
            Ok(Token::String(a))
        }
        _ => Err(wrong_operands(op)),
    }
}

/// Member access on a map. A missing member fails soft to the printable
/// path, the same degradation an unresolved variable takes.
fn member_access(left: Token, right: Token, op: &str, data: &mut EvalData) -> ExprResult<Token> {
    let (map, key) = match (left, right) {
        (Token::Map(map), Token::String(key)) => (map, key),
        _ => return Err(wrong_operands(op)),
    };

    match map.get(&key) {
        Some(Token::LazyJson(lazy)) => lazy.materialize(),
        Some(member) => Ok(member.clone()),
        None => {
            let printable = match data.left_ref.as_ref() {
                Some(info) => info.path.join(&key).to_string(),
                None => key,
            };
            Ok(Token::String(printable))
        }
    }
}

fn index_list(left: Token, right: Token, op: &str, _data: &mut EvalData) -> ExprResult<Token> {
    let list = match left {
        Token::List(list) => list,
        _ => return Err(wrong_operands(op)),
    };

    let index = match right {
        Token::Int(index) => index,
        // JSON numbers arrive as floats; whole ones index fine.
        Token::Float(index) if index.fract() == 0.0 => index as i64,
        Token::Float(index) => {
            return Err(ExprError::runtime("list index must be a whole number")
                .with("index", index));
        }
        _ => return Err(wrong_operands(op)),
    };

    if index < 0 {
        return Err(ExprError::runtime("negative index is not allowed").with("index", index));
    }

    match list.get(index as usize) {
        Some(Token::LazyJson(lazy)) => lazy.materialize(),
        Some(element) => Ok(element.clone()),
        None => Err(ExprError::runtime("list access out of bounds")
            .with("index", index)
            .with("length", list.len())),
    }
}
