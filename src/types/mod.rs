pub mod containers;
pub mod error;
pub mod lazy_json;
pub mod token;

pub use error::{ErrorKind, ExprError, ExprResult};
pub use lazy_json::{bind_json_object, LazyJson};
pub use token::{FunctionToken, NativeFunction, RefToken, Token, TokenMap, TokenTag, VarPath};
