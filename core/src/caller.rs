use std::fmt;

/// Identity of the code location requesting access, typically a module path
/// captured at the call site.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CallerId(String);

impl CallerId {
    pub fn new(ident: impl Into<String>) -> Self {
        Self(ident.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallerId {
    fn from(ident: &str) -> Self {
        Self::new(ident)
    }
}

/// Resolves the identity of the immediate caller at a public entry point.
///
/// Hosts with a real stack-introspection facility implement this; where no
/// such facility exists (or a security policy blocks it) `resolve` returns
/// `None` and the broker treats the call as coming from no one, which is
/// rejected everywhere except the very first install.
pub trait CallerResolver: Send + Sync {
    fn resolve(&self) -> Option<CallerId>;
}

/// Resolver for embedders with a single known call site, and for tests.
pub struct FixedResolver(Option<CallerId>);

impl FixedResolver {
    pub fn caller(ident: impl Into<String>) -> Self {
        Self(Some(CallerId::new(ident)))
    }

    /// Models an environment where caller identity cannot be observed.
    pub fn unresolved() -> Self {
        Self(None)
    }
}

impl CallerResolver for FixedResolver {
    fn resolve(&self) -> Option<CallerId> {
        self.0.clone()
    }
}
