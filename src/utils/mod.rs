pub mod environment;
pub mod paths;
pub mod timestamps;

pub use environment::get_default_config_path;
pub use paths::{
    build_attachment_file_name, build_conversation_file_name, extension_of,
    format_path_with_tilde, is_image_mime_type, sanitize_file_name, split_extension,
};
pub use timestamps::{
    epoch_seconds_to_iso, format_date_label, format_iso, normalize_timestamp, parse_timestamp,
};
