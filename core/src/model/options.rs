/// Knobs for `Graph::resolve_with_options`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Fail on attributes the node's schema does not declare. When off they
    /// are only logged.
    pub reject_unknown_attributes: bool,
    /// Check that every initializer payload matches its dims.
    pub check_initializers: bool,
    /// Resolve graphs nested in node attributes before the outer graph.
    pub resolve_subgraphs: bool,
}

impl Default for ResolveOptions {
    fn default() -> ResolveOptions {
        ResolveOptions {
            reject_unknown_attributes: true,
            check_initializers: true,
            resolve_subgraphs: true,
        }
    }
}

impl ResolveOptions {
    pub fn with_reject_unknown_attributes(self, reject_unknown_attributes: bool) -> Self {
        ResolveOptions { reject_unknown_attributes, ..self }
    }

    pub fn with_check_initializers(self, check_initializers: bool) -> Self {
        ResolveOptions { check_initializers, ..self }
    }

    pub fn with_resolve_subgraphs(self, resolve_subgraphs: bool) -> Self {
        ResolveOptions { resolve_subgraphs, ..self }
    }
}
