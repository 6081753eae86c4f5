// sqlx::Error -> AppError::Repository

use kairos_core::error::AppError;

/// Convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            match db_err.code().as_deref() {
                Some(code @ ("2067" | "1555")) => AppError::Repository(format!(
                    "Unique constraint violation: {} ({})",
                    db_err.message(),
                    code
                )),
                Some("5") => AppError::Repository(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                Some("13") => {
                    AppError::Repository(format!("Database full: {}", db_err.message()))
                }
                Some(code) => AppError::Repository(format!(
                    "Database error [{}]: {}",
                    code,
                    db_err.message()
                )),
                None => AppError::Repository(format!("Database error: {}", db_err.message())),
            }
        }
        sqlx::Error::RowNotFound => AppError::Repository("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Repository(format!("Column not found: {}", col))
        }
        // Connection, pool, protocol errors
        _ => AppError::Repository(err.to_string()),
    }
}
