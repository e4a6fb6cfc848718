use std::borrow::Cow;
use std::env;
use std::path::Path;

/// Characters that are invalid in file names on at least one major platform
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum number of characters of the title kept in a note file name
pub const MAX_TITLE_CHARS: usize = 80;

/// Number of leading conversation-id characters appended to a note file name
pub const ID_PREFIX_CHARS: usize = 8;

const FALLBACK_FILE_NAME: &str = "untitled";

/// Makes an arbitrary string safe to use as a file name
///
/// Control characters and reserved characters become spaces, whitespace runs collapse to a
/// single space and the result is trimmed. An empty result becomes `"untitled"`.
///
/// # Examples
///
/// ```
/// use ai_history_importer::utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("What is 2/3?"), "What is 2 3");
/// assert_eq!(sanitize_file_name("  \t "), "untitled");
/// ```
pub fn sanitize_file_name(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut pending_space = false;

    for ch in input.chars() {
        let ch = if is_unsafe_char(ch) { ' ' } else { ch };
        if ch.is_whitespace() {
            pending_space = !cleaned.is_empty();
            continue;
        }
        if pending_space {
            cleaned.push(' ');
            pending_space = false;
        }
        cleaned.push(ch);
    }

    if cleaned.is_empty() { FALLBACK_FILE_NAME.to_string() } else { cleaned }
}

fn is_unsafe_char(ch: char) -> bool {
    (ch as u32) <= 0x1f || RESERVED_CHARS.contains(&ch)
}

/// Extension (including the dot) of the last path segment, or `""`
///
/// Dot-files such as `.env` have no extension.
pub fn extension_of(path: &str) -> &str {
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match base.rfind('.') {
        Some(index) if index > 0 => &base[index..],
        _ => "",
    }
}

/// Deterministic note file name: sanitized title capped at [`MAX_TITLE_CHARS`], then the first
/// [`ID_PREFIX_CHARS`] characters of the conversation id, with unsafe characters replaced by `_`
///
/// # Examples
///
/// ```
/// use ai_history_importer::utils::build_conversation_file_name;
///
/// assert_eq!(build_conversation_file_name("My Chat", "conv-12345678"), "My Chat-conv-123.md");
/// ```
pub fn build_conversation_file_name(title: &str, conversation_id: &str) -> String {
    let base: String = sanitize_file_name(title).chars().take(MAX_TITLE_CHARS).collect();
    let id_prefix: String = conversation_id
        .chars()
        .take(ID_PREFIX_CHARS)
        .map(|ch| if is_unsafe_char(ch) { '_' } else { ch })
        .collect();
    format!("{}-{}.md", base, id_prefix)
}

/// Destination file name for a copied attachment
///
/// The original name is used when present and it already carries an extension. Otherwise the
/// attachment id is used, inheriting the source file's extension if the id has none.
pub fn build_attachment_file_name(
    original_name: Option<&str>,
    source_path: &str,
    attachment_id: &str,
) -> String {
    if let Some(name) = original_name.filter(|n| !n.trim().is_empty()) {
        let sanitized = sanitize_file_name(name);
        if !extension_of(&sanitized).is_empty() {
            return sanitized;
        }
    }

    let base = sanitize_file_name(attachment_id);
    if !extension_of(&base).is_empty() {
        return base;
    }
    format!("{}{}", base, extension_of(source_path))
}

pub fn is_image_mime_type(mime_type: Option<&str>) -> bool {
    mime_type.is_some_and(|m| m.starts_with("image/"))
}

/// Splits `dir/name.ext` into (`dir/name`, `.ext`), looking only at the last segment
pub fn split_extension(path: &str) -> (&str, &str) {
    let ext = extension_of(path);
    (&path[..path.len() - ext.len()], ext)
}

/// Formats a path with ~ substitution for the home directory
pub fn format_path_with_tilde(path: &Path) -> String {
    format_path_with_tilde_internal(path, None)
}

pub(crate) fn format_path_with_tilde_internal(path: &Path, home_override: Option<&str>) -> String {
    let home_from_env = env::var("HOME").ok();
    let home = home_override.or(home_from_env.as_deref());

    let path_str = path.to_string_lossy();
    if let Some(home) = home
        && !home.is_empty()
        && path_str.starts_with(home)
    {
        return path_str.replacen(home, "~", 1);
    }

    match path_str {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}
