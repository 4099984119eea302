/// Errors raised while configuring memoization.
///
/// These are programmer errors: they surface synchronously where `memoize`
/// is called, usually while a type is being defined, so a misconfigured type
/// fails before its first call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoizeError {
    /// The method is not defined on the type at any visibility.
    #[error("Method {method} is not defined on {type_name}")]
    UndefinedMethod { method: String, type_name: String },
}

impl MemoizeError {
    pub(crate) fn undefined(method: &str, type_name: &str) -> Self {
        Self::UndefinedMethod {
            method: method.to_string(),
            type_name: type_name.to_string(),
        }
    }
}
