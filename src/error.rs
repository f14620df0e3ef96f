use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load the Go grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    #[error("{}:{line}:{column}: {reason}", path.display())]
    ParseError {
        path: PathBuf,
        line: usize,
        column: usize,
        reason: String,
    },

    #[error("{}: expected 'package' clause", .0.display())]
    MissingPackage(PathBuf),

    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {}: {reason}", path.display())]
    Walk { path: PathBuf, reason: String },
}
