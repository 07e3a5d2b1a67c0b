use std::{collections::HashMap, fmt};

use crate::types::{ExprResult, LazyJson};

/// A nested variable environment. Maps may embed an enclosing scope
/// under the reserved `$parent` key; name lookup walks that chain.
pub type TokenMap = HashMap<String, Token>;

/// The calling convention every function value follows, including the
/// built-in list and map constructors.
pub type NativeFunction = fn(args: &[Token], scope: &TokenMap) -> ExprResult<Token>;

/// The value universe shared by the compiler and the evaluator. A
/// compiled program is a sequence of these; so is every intermediate
/// and final result of evaluating one.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    List(Vec<Token>),
    Map(TokenMap),
    /// Built by the `,` operator; distinguished from List so function
    /// arguments and list elements don't mix.
    Tuple(Vec<Token>),
    /// Transient: only valid as a map-constructor argument.
    KeyValue(String, Box<Token>),
    /// A name chain resolved against the environment at evaluation
    /// time.
    Var(VarPath),
    /// A name bound at compilation time; see [`RefToken`].
    Ref(RefToken),
    Function(FunctionToken),
    /// An instruction in the RPN.
    Op(String),
    /// Stack-balancing marker that lets unary operators share the
    /// binary-operator machinery.
    UnaryPlaceholder,
    LazyJson(LazyJson),
}

/// Variant tags, used as dispatch keys by the operator registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenTag {
    Int,
    Float,
    Bool,
    Str,
    List,
    Map,
    Tuple,
    KeyValue,
    Var,
    Ref,
    Function,
    Op,
    UnaryPlaceholder,
    LazyJson,
}

impl TokenTag {
    pub const ALL: [TokenTag; 14] = [
        TokenTag::Int,
        TokenTag::Float,
        TokenTag::Bool,
        TokenTag::Str,
        TokenTag::List,
        TokenTag::Map,
        TokenTag::Tuple,
        TokenTag::KeyValue,
        TokenTag::Var,
        TokenTag::Ref,
        TokenTag::Function,
        TokenTag::Op,
        TokenTag::UnaryPlaceholder,
        TokenTag::LazyJson,
    ];
}

impl Token {
    pub fn tag(&self) -> TokenTag {
        match self {
            Token::Int(_) => TokenTag::Int,
            Token::Float(_) => TokenTag::Float,
            Token::Bool(_) => TokenTag::Bool,
            Token::String(_) => TokenTag::Str,
            Token::List(_) => TokenTag::List,
            Token::Map(_) => TokenTag::Map,
            Token::Tuple(_) => TokenTag::Tuple,
            Token::KeyValue(_, _) => TokenTag::KeyValue,
            Token::Var(_) => TokenTag::Var,
            Token::Ref(_) => TokenTag::Ref,
            Token::Function(_) => TokenTag::Function,
            Token::Op(_) => TokenTag::Op,
            Token::UnaryPlaceholder => TokenTag::UnaryPlaceholder,
            Token::LazyJson(_) => TokenTag::LazyJson,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(value) => write!(f, "{}", value),
            Token::Float(value) => {
                // Whole floats keep their decimal point so the printed
                // form lexes back to a Float, not an Int.
                if value.is_finite() && value.fract() == 0.0 {
                    write!(f, "{:.1}", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            Token::Bool(value) => write!(f, "{}", value),
            Token::String(value) => write!(f, "{}", json_quote(value)?),
            Token::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Token::Map(map) => {
                let mut keys = map.keys().collect::<Vec<&String>>();
                keys.sort();

                write!(f, "{{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", json_quote(key)?, map[key])?;
                }
                write!(f, "}}")
            }
            Token::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Token::KeyValue(key, value) => write!(f, "{}:{}", json_quote(key)?, value),
            Token::Var(path) => write!(f, "{}", path),
            Token::Ref(reference) => write!(f, "&{}", reference.path()),
            Token::Function(_) => write!(f, "[function]"),
            Token::Op(op) => write!(f, "{}", op),
            Token::UnaryPlaceholder => write!(f, "UnaryToken"),
            Token::LazyJson(lazy) => write!(f, "{}", lazy.raw()),
        }
    }
}

fn json_quote(value: &str) -> Result<String, fmt::Error> {
    serde_json::to_string(value).map_err(|_| fmt::Error)
}

impl From<i64> for Token {
    fn from(value: i64) -> Token {
        Token::Int(value)
    }
}

impl From<f64> for Token {
    fn from(value: f64) -> Token {
        Token::Float(value)
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Token {
        Token::Bool(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Token {
        Token::String(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Token {
        Token::String(value)
    }
}

impl From<Vec<Token>> for Token {
    fn from(value: Vec<Token>) -> Token {
        Token::List(value)
    }
}

impl From<TokenMap> for Token {
    fn from(value: TokenMap) -> Token {
        Token::Map(value)
    }
}

/// A variable reference such as `a.b['and c']`, stored as its segment
/// chain `["a", "b", "and c"]`. Paths are never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct VarPath(Vec<String>);

impl VarPath {
    pub fn new(name: &str) -> VarPath {
        VarPath(vec![name.to_owned()])
    }

    pub fn segments<'a>(&'a self) -> &'a [String] {
        &self.0
    }

    pub fn join(&self, segment: &str) -> VarPath {
        let mut segments = self.0.clone();
        segments.push(segment.to_owned());
        VarPath(segments)
    }

    /// Strict resolution: walks the environment segment by segment,
    /// materializing lazy JSON along the way. The first segment also
    /// searches enclosing scopes through `$parent`. Returns None when
    /// any step finds nothing or a non-map.
    pub fn lookup(&self, vars: &TokenMap) -> ExprResult<Option<Token>> {
        let mut value = match lookup_chained(vars, &self.0[0]) {
            Some(value) => value,
            None => return Ok(None),
        };
        if let Token::LazyJson(lazy) = &value {
            value = lazy.materialize()?;
        }

        for segment in &self.0[1..] {
            let map = match value {
                Token::Map(map) => map,
                _ => return Ok(None),
            };

            value = match map.get(segment) {
                Some(member) => member.clone(),
                None => return Ok(None),
            };
            if let Token::LazyJson(lazy) = &value {
                value = lazy.materialize()?;
            }
        }

        Ok(Some(value))
    }

    /// Soft resolution: an undefined path degrades to its printable
    /// form so it can participate in comparisons as an inert string
    /// instead of aborting the evaluation.
    pub fn resolve(&self, vars: &TokenMap) -> ExprResult<Token> {
        Ok(match self.lookup(vars)? {
            Some(value) => value,
            None => Token::String(self.to_string()),
        })
    }
}

fn lookup_chained(vars: &TokenMap, name: &str) -> Option<Token> {
    if let Some(value) = vars.get(name) {
        return Some(value.clone());
    }

    match vars.get("$parent") {
        Some(Token::Map(parent)) => lookup_chained(parent, name),
        _ => None,
    }
}

impl fmt::Display for VarPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0[0])?;

        for segment in &self.0[1..] {
            if is_plain_segment(segment) {
                write!(f, ".{}", segment)?;
            } else {
                write!(f, "[{}]", json_quote(segment)?)?;
            }
        }

        Ok(())
    }
}

fn is_plain_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// A variable that resolved to a compile-time binding. The value seen
/// at compilation time is kept as a fall-back for evaluations whose
/// live scope doesn't redefine the name; `origin` remembers the map a
/// dotted binding was found in so calls can use it as their receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct RefToken {
    path: VarPath,
    value: Box<Token>,
    origin: Option<TokenMap>,
}

impl RefToken {
    pub fn new(path: VarPath, value: Token) -> RefToken {
        RefToken {
            path,
            value: Box::new(value),
            origin: None,
        }
    }

    pub fn with_origin(path: VarPath, value: Token, origin: TokenMap) -> RefToken {
        RefToken {
            path,
            value: Box::new(value),
            origin: Some(origin),
        }
    }

    pub fn path<'a>(&'a self) -> &'a VarPath {
        &self.path
    }

    pub fn value<'a>(&'a self) -> &'a Token {
        &self.value
    }

    pub fn origin<'a>(&'a self) -> Option<&'a TokenMap> {
        self.origin.as_ref()
    }

    /// Local bindings (no origin map) prefer the most recent value from
    /// the live scope; everything else falls back to the value captured
    /// at compilation time.
    pub fn resolve(&self, local_scope: Option<&TokenMap>) -> ExprResult<Token> {
        if self.origin.is_none() {
            if let Some(scope) = local_scope {
                if let Some(value) = self.path.lookup(scope)? {
                    return Ok(value);
                }
            }
        }

        Ok((*self.value).clone())
    }
}

/// A first-class function value: a name for diagnostics plus the
/// callable itself.
#[derive(Clone, Copy)]
pub struct FunctionToken {
    name: &'static str,
    func: NativeFunction,
}

impl FunctionToken {
    pub fn new(name: &'static str, func: NativeFunction) -> FunctionToken {
        FunctionToken { name, func }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, args: &[Token], scope: &TokenMap) -> ExprResult<Token> {
        (self.func)(args, scope)
    }
}

impl fmt::Debug for FunctionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

impl PartialEq for FunctionToken {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
