//! Merge configuration.
//!
//! Options are plain data with builder-style setters; a default-constructed
//! value merges without internalization, without duplicate allowances beyond
//! the well-known set, and without a platform baseline.

use std::path::PathBuf;

/// Source of the output assembly's own custom attributes and security
/// declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributePolicy {
    /// Copy from the primary module only (the default).
    #[default]
    Primary,
    /// Copy from the input at the given position instead of the primary.
    FromInput(usize),
    /// Copy from every input, deduplicating structurally equal applications.
    Union,
}

/// Configuration of one merge run.
///
/// # Examples
///
/// ```rust
/// use dotfuse::merge::MergeOptions;
///
/// let options = MergeOptions::default()
///     .with_internalize(true)
///     .exclude_from_internalize("PublicApi.")
///     .allow_duplicate("Ns.GeneratedMarker");
/// assert!(options.internalize);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Name of the output assembly; defaults to the primary module's name.
    pub output_name: Option<String>,
    /// Reduce visibility of secondary modules' public types after merging.
    /// The primary module's types are never internalized.
    pub internalize: bool,
    /// Full names and namespace prefixes exempt from internalization.
    pub internalize_exclude: Vec<String>,
    /// Type full names for which duplicates merge instead of colliding.
    pub allow_duplicates: Vec<String>,
    /// Namespace prefixes for which duplicates merge instead of colliding.
    pub allow_duplicate_namespaces: Vec<String>,
    /// Union-merge mode: public duplicate types merge member-wise instead of
    /// colliding or being renamed.
    pub union_merge: bool,
    /// Directory of a platform baseline; external references are retargeted
    /// to the assemblies found there.
    pub target_platform: Option<PathBuf>,
    /// Where assembly-level attributes and security come from.
    pub attribute_policy: AttributePolicy,
}

impl MergeOptions {
    /// Set the output assembly name.
    #[must_use]
    pub fn with_output_name(mut self, name: &str) -> Self {
        self.output_name = Some(name.to_string());
        self
    }

    /// Enable or disable internalization of secondary modules.
    #[must_use]
    pub fn with_internalize(mut self, internalize: bool) -> Self {
        self.internalize = internalize;
        self
    }

    /// Exempt a full name or namespace prefix from internalization.
    #[must_use]
    pub fn exclude_from_internalize(mut self, pattern: &str) -> Self {
        self.internalize_exclude.push(pattern.to_string());
        self
    }

    /// Allow duplicates of the type with this full name.
    #[must_use]
    pub fn allow_duplicate(mut self, full_name: &str) -> Self {
        self.allow_duplicates.push(full_name.to_string());
        self
    }

    /// Allow duplicates of every type under this namespace prefix.
    #[must_use]
    pub fn allow_duplicate_namespace(mut self, prefix: &str) -> Self {
        self.allow_duplicate_namespaces.push(prefix.to_string());
        self
    }

    /// Enable union-merge mode for public types.
    #[must_use]
    pub fn with_union_merge(mut self, union: bool) -> Self {
        self.union_merge = union;
        self
    }

    /// Configure a platform baseline directory.
    #[must_use]
    pub fn with_target_platform(mut self, directory: PathBuf) -> Self {
        self.target_platform = Some(directory);
        self
    }

    /// Configure the assembly-attribute policy.
    #[must_use]
    pub fn with_attribute_policy(mut self, policy: AttributePolicy) -> Self {
        self.attribute_policy = policy;
        self
    }

    /// Whether `full_name` is exempt from internalization, by exact match or
    /// namespace-prefix match.
    #[must_use]
    pub fn internalize_exempt(&self, full_name: &str) -> bool {
        self.internalize_exclude
            .iter()
            .any(|pattern| full_name == pattern || full_name.starts_with(pattern.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let options = MergeOptions::default()
            .with_output_name("Merged")
            .with_internalize(true)
            .exclude_from_internalize("Api.")
            .with_union_merge(true);
        assert_eq!(options.output_name.as_deref(), Some("Merged"));
        assert!(options.internalize);
        assert!(options.union_merge);
    }

    #[test]
    fn test_internalize_exempt_prefix() {
        let options = MergeOptions::default().exclude_from_internalize("Api.");
        assert!(options.internalize_exempt("Api.Surface"));
        assert!(!options.internalize_exempt("Internal.Surface"));
    }
}
