use std::collections::HashMap;

use serde_json::value::RawValue;

use crate::types::{ExprError, ExprResult, Token, TokenMap};

/// A raw JSON fragment that only deserializes when an expression
/// actually touches it. Filters usually read a handful of fields out of
/// a large record; wrapping each field keeps the per-record cost
/// proportional to the fields accessed.
///
/// Materialization parses on every access and never caches, so sharing
/// a value across threads needs no synchronization.
#[derive(Debug, Clone, PartialEq)]
pub struct LazyJson {
    raw: String,
}

impl LazyJson {
    pub fn from_raw(raw: &str) -> LazyJson {
        LazyJson {
            raw: raw.to_owned(),
        }
    }

    pub fn raw<'a>(&'a self) -> &'a str {
        &self.raw
    }

    /// Parses exactly one JSON value. All JSON numbers become Floats.
    /// Objects and arrays stay lazy one level down. The fragment was
    /// validated when the record was bound, so a parse failure here is
    /// an internal error.
    pub fn materialize(&self) -> ExprResult<Token> {
        let text = self.raw.trim_start();

        match text.as_bytes().first() {
            Some(b'0'..=b'9') | Some(b'-') => match serde_json::from_str::<f64>(text) {
                Ok(number) => Ok(Token::Float(number)),
                Err(err) => Err(invalid_fragment(text, err)),
            },
            Some(b'"') => match serde_json::from_str::<String>(text) {
                Ok(string) => Ok(Token::String(string)),
                Err(err) => Err(invalid_fragment(text, err)),
            },
            Some(b't') | Some(b'f') => match serde_json::from_str::<bool>(text) {
                Ok(boolean) => Ok(Token::Bool(boolean)),
                Err(err) => Err(invalid_fragment(text, err)),
            },
            Some(b'{') => match serde_json::from_str::<HashMap<String, &RawValue>>(text) {
                Ok(entries) => {
                    let mut map = TokenMap::new();
                    for (key, value) in entries {
                        map.insert(key, Token::LazyJson(LazyJson::from_raw(value.get())));
                    }
                    Ok(Token::Map(map))
                }
                Err(err) => Err(invalid_fragment(text, err)),
            },
            Some(b'[') => match serde_json::from_str::<Vec<&RawValue>>(text) {
                Ok(elements) => {
                    let mut list = Vec::new();
                    for element in elements {
                        list.push(Token::LazyJson(LazyJson::from_raw(element.get())));
                    }
                    Ok(Token::List(list))
                }
                Err(err) => Err(invalid_fragment(text, err)),
            },
            _ => Err(ExprError::internal(
                "unrecognized JSON value received when materializing a lazy value",
            )
            .with("value", text)),
        }
    }
}

fn invalid_fragment(text: &str, err: serde_json::Error) -> ExprError {
    ExprError::internal("invalid JSON reached materialization, input should have been validated")
        .with("value", text)
        .with("error", err.to_string())
}

/// Validates the top level of a JSON record and binds each field as a
/// lazy token, ready to be used as an evaluation environment.
pub fn bind_json_object(raw: &[u8]) -> ExprResult<TokenMap> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(err) => {
            return Err(
                ExprError::parser("bad input json received").with("error", err.to_string())
            );
        }
    };

    match serde_json::from_str::<HashMap<String, &RawValue>>(text) {
        Ok(entries) => {
            let mut vars = TokenMap::new();
            for (key, value) in entries {
                vars.insert(key, Token::LazyJson(LazyJson::from_raw(value.get())));
            }
            Ok(vars)
        }
        Err(err) => Err(ExprError::parser("bad input json received")
            .with("invalidJson", text)
            .with("error", err.to_string())),
    }
}
