//! Operator precedence metadata shared by the lexer and the RPN
//! builder.

/// Precedence ranks, lower binds tighter. Modeled on the default C++
/// operator precedence order.
///
/// Unary operators are entered with an `L` or `R` prefix saying which
/// side of their operand they sit on; `L-` is negation, a hypothetical
/// `R++` would be a postfix increment.
const OP_PRECEDENCE: &[(&str, u32)] = &[
    ("[]", 2),
    ("()", 2),
    (".", 2),
    ("**", 3),
    ("*", 5),
    ("/", 5),
    ("%", 5),
    ("+", 6),
    ("-", 6),
    ("<<", 7),
    (">>", 7),
    ("<", 9),
    ("<=", 9),
    (">=", 9),
    (">", 9),
    ("==", 10),
    ("!=", 10),
    ("&", 11),
    ("^", 12),
    ("|", 13),
    ("&&", 14),
    ("||", 15),
    ("=", 16),
    (":", 16),
    (",", 17),
    ("L-", 3),
    ("L+", 3),
    ("L!", 3),
];

pub fn precedence(op: &str) -> Option<u32> {
    OP_PRECEDENCE
        .iter()
        .find(|entry| entry.0 == op)
        .map(|entry| entry.1)
}

/// Whether the lexer should accept this operator text. An operator that
/// only exists in a unary form, like `!`, is known through its prefixed
/// entry; the builder decides unary vs binary later.
pub fn is_known_op(op: &str) -> bool {
    precedence(op).is_some()
        || precedence(&format!("L{}", op)).is_some()
        || precedence(&format!("R{}", op)).is_some()
}

/// Right-associative operators pop the stack only on strictly greater
/// ranks, so `2 ** 3 ** 2` groups as `2 ** (3 ** 2)`.
pub fn is_right_associative(op: &str) -> bool {
    op == "**"
}

/// Strips the `L`/`R` side prefix off a unary operator.
pub fn normalize_op(op: &str) -> &str {
    match op.strip_prefix('L').or_else(|| op.strip_prefix('R')) {
        Some(stripped) => stripped,
        None => op,
    }
}

/// Whether the character can appear in an operator, i.e. occurs in some
/// registered operator string.
pub fn is_op_char(c: char) -> bool {
    matches!(
        c,
        '.' | '*'
            | '/'
            | '%'
            | '+'
            | '-'
            | '<'
            | '>'
            | '='
            | '!'
            | '&'
            | '^'
            | '|'
            | ','
            | ':'
            | '('
            | ')'
            | '['
            | ']'
    )
}

/// Characters that always start a fresh token. Operator gathering stops
/// at them so `10 *-3` reads as `*` then `-3` instead of a single `*-`.
pub fn is_op_boundary_char(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '\'' | '"' | '(' | ')' | '[' | ']' | '{' | '}' | '_'
    )
}
