use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all failure modes of a merge: malformed input graphs, genuine type
/// collisions, unresolvable external references, and write failures. Each variant carries
/// enough context to let a user locate the offending input.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Empty`] - No input modules were provided
/// - [`Error::Malformed`] - An input module graph is structurally invalid
/// - [`Error::FileError`] - Filesystem I/O errors while reading inputs
///
/// ## Merge Errors
/// - [`Error::DuplicateType`] - Two public types collide and no duplicate allowance applies
/// - [`Error::TypeNotFound`] - A definition referenced during the merge does not exist
/// - [`Error::UnresolvedReference`] - An external dependency could not be located
///
/// ## Output Errors
/// - [`Error::Write`] - The writer rejected the populated output graph
///
/// # Examples
///
/// ```rust,no_run
/// use dotfuse::{Error, merge::{MergeSession, MergeOptions}};
///
/// let mut session = MergeSession::new(MergeOptions::default());
/// match session.merge_graphs(vec![]) {
///     Err(Error::Empty) => eprintln!("no inputs given"),
///     Err(Error::DuplicateType { name, existing_module, incoming_module }) => {
///         eprintln!("{} defined in both {} and {}", name, existing_module, incoming_module);
///     }
///     Err(e) => eprintln!("merge failed: {}", e),
///     Ok(_) => {}
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// No input modules were provided.
    ///
    /// A merge needs at least a primary module; an empty input list is rejected
    /// before any output state is created.
    #[error("Provided input was empty")]
    Empty,

    /// An input module graph is damaged or violates a structural invariant.
    ///
    /// The error includes the source location where the malformation was
    /// detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while mapping input modules
    /// into memory, such as missing files or permission issues.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Two public type definitions collide and no duplicate allowance applies.
    ///
    /// This is the only per-type condition that aborts the whole merge. The
    /// originating modules of both occupants are named so the user can decide
    /// whether the collision is genuine or belongs on the allow-duplicate list.
    #[error("Duplicate type {name}: defined in both {existing_module} and {incoming_module}")]
    DuplicateType {
        /// Full name of the colliding type
        name: String,
        /// Module that placed the existing occupant
        existing_module: String,
        /// Module whose import triggered the collision
        incoming_module: String,
    },

    /// A definition referenced during the merge does not exist in its graph.
    ///
    /// Indicates an inconsistent input graph, e.g. a member list naming an id
    /// outside the owning arena.
    #[error("Failed to find definition - {0}")]
    TypeNotFound(String),

    /// An external dependency could not be located by the resolver.
    #[error("Unresolved external reference - {0}")]
    UnresolvedReference(String),

    /// The writer rejected the populated output graph.
    #[error("Write failed - {0}")]
    Write(String),

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories or for
    /// wrapping external failures with additional context.
    #[error("{0}")]
    Error(String),
}
