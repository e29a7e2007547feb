/// The longest account name we accept, in characters.
pub const MAX_NAME_LEN: usize = 64;

/// **Basic input validation for an account name**
///
/// Checks for:
/// - An empty (or all-whitespace) string;
/// - A name longer than [`MAX_NAME_LEN`] characters;
/// - Whitespace or control characters inside the name.
///
/// Returns `None` for a valid name, or a short reason otherwise.
pub fn is_valid_name(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some("The name cannot be empty.")
    } else if name.chars().count() > MAX_NAME_LEN {
        Some("The name is too long.")
    } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("The name cannot contain whitespace or control characters.")
    } else {
        None
    }
}
