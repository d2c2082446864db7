//! Workspace-qualified identifiers.
//!
//! Catalog objects are addressed as `"workspace:name"` or by bare name.
//! Parsing splits on the first colon only, so names containing further
//! colons survive intact. A missing workspace is resolved against the
//! catalog's default workspace at call time by the engine, never here:
//! parsing is pure and infallible.

use std::fmt;

/// A parsed `"workspace:name"` identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    /// Workspace segment, when the identifier was qualified.
    pub workspace: Option<String>,

    /// Object name (the whole input when no colon is present).
    pub name: String,
}

impl Identifier {
    /// Parse an identifier string.
    ///
    /// Never fails: `"roads"` becomes `(None, "roads")` and
    /// `"transport:roads"` becomes `(Some("transport"), "roads")`.
    pub fn parse(identifier: &str) -> Self {
        match identifier.split_once(':') {
            Some((workspace, name)) => Identifier {
                workspace: Some(workspace.to_string()),
                name: name.to_string(),
            },
            None => Identifier {
                workspace: None,
                name: identifier.to_string(),
            },
        }
    }

}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.workspace {
            Some(workspace) => write!(f, "{}:{}", workspace, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for Identifier {
    fn from(identifier: &str) -> Self {
        Identifier::parse(identifier)
    }
}
