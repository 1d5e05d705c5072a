//! Assembly identity and reference scopes for merge deduplication.
//!
//! This module provides [`AssemblyIdentity`], the four-part identity used to name
//! assemblies throughout a merge, the [`ReferenceScope`] a symbolic reference claims
//! to originate from, and the [`IdentityKey`] that the identity mapper uses as its
//! unit of deduplication.
//!
//! # Key Types
//! - [`AssemblyIdentity`] - name, version, culture and public-key token of an assembly
//! - [`AssemblyVersion`] - four-part version number
//! - [`ReferenceScope`] - the nominal origin of a reference (current module, assembly, module)
//! - [`IdentityKey`] - `(scope-name, full-name)` pair keying the identity map
//!
//! Strong-name key material is out of scope for the merge engine; the public-key
//! token is carried as opaque bytes and never recomputed.

use std::fmt;

/// Four-part assembly version number.
///
/// Used for display and for carrying the primary module's version into the
/// output manifest. Version binding policy is a runtime concern and not
/// interpreted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct AssemblyVersion {
    /// Major version component
    pub major: u16,
    /// Minor version component
    pub minor: u16,
    /// Build number component
    pub build: u16,
    /// Revision component
    pub revision: u16,
}

impl AssemblyVersion {
    /// Create a version from its four components.
    #[must_use]
    pub fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// An identifier for an assembly, as it appears in manifests and assembly references.
///
/// Identities compare by all four parts; scope-name comparisons during the merge
/// use only [`AssemblyIdentity::name`], because input modules referencing different
/// versions of the same assembly still deduplicate to one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyIdentity {
    /// Simple assembly name (e.g. "mscorlib", "System.Core").
    pub name: String,
    /// Four-part version number.
    pub version: AssemblyVersion,
    /// Culture for localized satellite assemblies, `None` for culture-neutral.
    pub culture: Option<String>,
    /// 8-byte public-key token, carried opaque. `None` for unsigned assemblies.
    pub public_key_token: Option<[u8; 8]>,
}

impl AssemblyIdentity {
    /// Create a culture-neutral, unsigned identity with the given name and version.
    #[must_use]
    pub fn new(name: &str, version: AssemblyVersion) -> Self {
        Self {
            name: name.to_string(),
            version,
            culture: None,
            public_key_token: None,
        }
    }

    /// Parse a display-form identity string.
    ///
    /// Accepts the conventional `"Name, Version=1.2.3.4, Culture=neutral,
    /// PublicKeyToken=b77a5c561934e089"` form; every part after the name is
    /// optional. `Culture=neutral` and `PublicKeyToken=null` map to `None`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] when the name is empty or a part
    /// does not parse.
    pub fn parse(display: &str) -> crate::Result<Self> {
        let mut parts = display.split(',').map(str::trim);
        let name = match parts.next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(malformed_error!("assembly identity without a name: {:?}", display)),
        };

        let mut identity = AssemblyIdentity::new(&name, AssemblyVersion::default());
        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                return Err(malformed_error!("invalid identity part {:?}", part));
            };
            match key {
                "Version" => {
                    let mut numbers = value.split('.');
                    let mut next = || -> crate::Result<u16> {
                        numbers
                            .next()
                            .unwrap_or("0")
                            .parse()
                            .map_err(|_| malformed_error!("invalid version {:?}", value))
                    };
                    identity.version = AssemblyVersion::new(next()?, next()?, next()?, next()?);
                }
                "Culture" => {
                    if !value.eq_ignore_ascii_case("neutral") {
                        identity.culture = Some(value.to_string());
                    }
                }
                "PublicKeyToken" => {
                    if !value.eq_ignore_ascii_case("null") {
                        if value.len() != 16 {
                            return Err(malformed_error!("invalid public key token {:?}", value));
                        }
                        let mut token = [0u8; 8];
                        for (i, byte) in token.iter_mut().enumerate() {
                            *byte = u8::from_str_radix(&value[i * 2..i * 2 + 2], 16)
                                .map_err(|_| malformed_error!("invalid public key token {:?}", value))?;
                        }
                        identity.public_key_token = Some(token);
                    }
                }
                _ => return Err(malformed_error!("unknown identity part {:?}", key)),
            }
        }
        Ok(identity)
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Version={}", self.name, self.version)?;
        write!(
            f,
            ", Culture={}",
            self.culture.as_deref().unwrap_or("neutral")
        )?;
        match &self.public_key_token {
            Some(token) => {
                write!(f, ", PublicKeyToken=")?;
                for byte in token {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            None => write!(f, ", PublicKeyToken=null"),
        }
    }
}

/// The nominal origin a symbolic reference claims for the entity it mentions.
///
/// A scope is a claim, not a guarantee: before the fix-up pass many references
/// carry the scope of a merged input whose definitions have already moved into
/// the output graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceScope {
    /// The entity lives in the module that contains the reference.
    CurrentModule,
    /// The entity lives in an external assembly.
    Assembly(AssemblyIdentity),
    /// The entity lives in another module of the same assembly.
    Module(String),
}

impl ReferenceScope {
    /// The scope name used in identity keys and diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ReferenceScope::CurrentModule => "",
            ReferenceScope::Assembly(identity) => &identity.name,
            ReferenceScope::Module(name) => name,
        }
    }

    /// Returns `true` if this scope names an external assembly or module.
    #[must_use]
    pub fn is_external(&self) -> bool {
        !matches!(self, ReferenceScope::CurrentModule)
    }
}

/// The `(scope-name, full-name)` pair that keys the identity map.
///
/// One key per source type definition; the mapper translates it to the type
/// definition that now represents the source type in the output graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    /// Name of the scope the definition originated from (assembly simple name).
    pub scope: String,
    /// Full type name, nested path rendered with `/`.
    pub full_name: String,
}

impl IdentityKey {
    /// Build a key from a scope name and a full type name.
    #[must_use]
    pub fn new(scope: &str, full_name: &str) -> Self {
        Self {
            scope: scope.to_string(),
            full_name: full_name.to_string(),
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.scope, self.full_name)
    }
}
