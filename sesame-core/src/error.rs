use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Scheduling error: {0}")]
    Schedule(String),

    #[error("Delivery error: {0}")]
    Delivery(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl Error {
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let validation_error =
            Error::Validation(ValidationError::InvalidEmail("test@".to_string()));
        assert_eq!(
            validation_error.to_string(),
            "Validation error: Invalid email format: test@"
        );

        let storage_error = Error::Storage(StorageError::NotFound);
        assert_eq!(storage_error.to_string(), "Storage error: Record not found");

        let schedule_error = Error::Schedule("runtime unavailable".to_string());
        assert_eq!(
            schedule_error.to_string(),
            "Scheduling error: runtime unavailable"
        );
    }

    #[test]
    fn test_error_from_conversions() {
        let error: Error = StorageError::Database("disk full".to_string()).into();
        assert!(error.is_storage_error());

        let error: Error = ValidationError::MissingField("email".to_string()).into();
        assert!(error.is_validation_error());
    }
}
