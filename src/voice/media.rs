//! Prompt media references

/// Scheme prepended to prompt names when none is configured
pub const DEFAULT_SCHEME: &str = "sound";

/// Strip the final extension from a prompt name.
pub fn strip_extension(prompt: &str) -> &str {
    match prompt.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => prompt,
    }
}

/// Build the media reference the channel plays, e.g. `sound:welcome`.
pub fn media_ref(scheme: &str, prompt: &str) -> String {
    format!("{}:{}", scheme, strip_extension(prompt))
}
