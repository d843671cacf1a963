//! Document store error types
//!
//! Errors carry the operation that failed, a categorised kind, and optional
//! entity context so the HTTP layer can turn them into the right status.

use std::fmt;

/// Store operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Looking up a single document by id
    FindById,
    /// Running a filtered query
    Find,
    /// Counting matching documents
    Count,
    /// Inserting a document
    Insert,
    /// Replacing a stored document
    Replace,
    /// Deleting a single document
    Delete,
    /// Deleting every matching document
    DeleteMany,
    /// Loading fixture files
    Seed,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindById => write!(f, "find_by_id"),
            Self::Find => write!(f, "find"),
            Self::Count => write!(f, "count"),
            Self::Insert => write!(f, "insert"),
            Self::Replace => write!(f, "replace"),
            Self::Delete => write!(f, "delete"),
            Self::DeleteMany => write!(f, "delete_many"),
            Self::Seed => write!(f, "seed"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Document not found
    NotFound,
    /// Unique index violated
    AlreadyExists,
    /// Document failed validation
    ValidationFailed,
    /// Document could not be converted to or from JSON
    SerializationError,
    /// Fixture or storage I/O failed
    Io,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Entity type (e.g. "Bootcamp")
    pub entity_type: Option<String>,
    /// Entity identifier, or the offending field for duplicates
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error with entity context
    ///
    /// ```rust
    /// use devcamper_api::store::RepositoryError;
    ///
    /// let error = RepositoryError::not_found("Bootcamp", "5d713995b721c3bb38c1f5d0");
    /// assert_eq!(error.entity_type.as_deref(), Some("Bootcamp"));
    /// ```
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            operation: RepositoryOperation::FindById,
            kind: RepositoryErrorKind::NotFound,
            message: "Entity not found".to_string(),
            entity_type: Some(entity_type.into()),
            entity_id: Some(entity_id.into()),
        }
    }

    /// Create a unique index violation naming the collection and fields
    pub fn already_exists(
        operation: RepositoryOperation,
        collection: impl Into<String>,
        fields: impl Into<String>,
    ) -> Self {
        let fields = fields.into();
        Self {
            operation,
            kind: RepositoryErrorKind::AlreadyExists,
            message: format!("Unique index on {fields} violated"),
            entity_type: Some(collection.into()),
            entity_id: Some(fields),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ValidationFailed, message)
    }

    /// Create a serialization error
    pub fn serialization_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::SerializationError, message)
    }

    /// Create an I/O error
    pub fn io(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Io, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

/// Result type for store operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;
