use crate::types::{ExprError, ExprResult, FunctionToken, Token, TokenMap};

/// The constructor behind `[...]` literals. It matches the Function
/// calling convention, so the compiler turns a list literal into an
/// ordinary call.
pub fn list_constructor() -> FunctionToken {
    FunctionToken::new("list", new_token_list)
}

/// The constructor behind `{...}` literals.
pub fn map_constructor() -> FunctionToken {
    FunctionToken::new("map", new_token_map)
}

fn new_token_list(args: &[Token], _scope: &TokenMap) -> ExprResult<Token> {
    Ok(Token::List(args.to_vec()))
}

fn new_token_map(args: &[Token], _scope: &TokenMap) -> ExprResult<Token> {
    let mut map = TokenMap::new();

    for arg in args.iter() {
        let (key, value) = match arg {
            Token::KeyValue(key, value) => (key, value),
            other => {
                return Err(
                    ExprError::syntax("map constructor expects only `key: value` pairs")
                        .with("invalidArgument", other.to_string()),
                );
            }
        };

        if map.contains_key(key.as_str()) {
            return Err(ExprError::syntax("duplicate key in map literal").with("key", key.as_str()));
        }

        map.insert(key.clone(), (**value).clone());
    }

    Ok(Token::Map(map))
}

#[cfg(test)]
mod test {
    use super::{list_constructor, map_constructor};
    use crate::types::{ErrorKind, Token, TokenMap};

    #[test]
    fn test_list_constructor_keeps_argument_order() {
        let args: Vec<Token> = vec![1.into(), "two".into(), 3.into()];

        let result = list_constructor().call(&args, &TokenMap::new()).unwrap();

        assert_eq!(result, Token::List(args));
    }

    #[test]
    fn test_map_constructor_builds_from_pairs() {
        let args = vec![
            Token::KeyValue("a".to_owned(), Box::new(1.into())),
            Token::KeyValue("b".to_owned(), Box::new(2.into())),
        ];

        let result = map_constructor().call(&args, &TokenMap::new()).unwrap();

        let map = match result {
            Token::Map(map) => map,
            other => panic!("expected a map, got {:?}", other),
        };
        assert_eq!(map["a"], 1.into());
        assert_eq!(map["b"], 2.into());
    }

    #[test]
    fn test_map_constructor_rejects_duplicate_keys() {
        let args = vec![
            Token::KeyValue("a".to_owned(), Box::new(1.into())),
            Token::KeyValue("a".to_owned(), Box::new(2.into())),
        ];

        let err = map_constructor().call(&args, &TokenMap::new()).unwrap_err();

        assert!(err.is(ErrorKind::Syntax));
        assert_eq!(err.title(), "duplicate key in map literal");
    }

    #[test]
    fn test_map_constructor_rejects_loose_values() {
        let args: Vec<Token> = vec![1.into()];

        let err = map_constructor().call(&args, &TokenMap::new()).unwrap_err();

        assert!(err.is(ErrorKind::Syntax));
    }
}
