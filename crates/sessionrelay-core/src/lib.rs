mod error;
pub mod lines;
pub mod log;
mod project_path;
mod sessions_root;

pub use error::{Error, Result};
pub use lines::{Line, LineReader, DEFAULT_MAX_LINE_BYTES};
pub use project_path::{decode_project_path, encode_project_path};
pub use sessions_root::{
    is_session_file_name, require_sessions_root, resolve_sessions_root, SESSIONS_ROOT_ENV,
};
