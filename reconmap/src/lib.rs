pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{load_log_file, open_database, parse_log_line, resolve_db_path};
