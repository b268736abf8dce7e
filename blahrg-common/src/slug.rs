//! Filesystem-safe filenames derived from clip descriptions

/// Extension given to every stored clip
pub const CLIP_EXTENSION: &str = "ogg";

/// Slug used when a description has no alphanumeric characters at all
const EMPTY_SLUG: &str = "clip";

/// Highest numeric suffix tried when a slug collides
pub const MAX_FILENAME_SUFFIX: u32 = 1000;

/// Lower-case `text` and collapse every run of non-alphanumeric characters
/// into a single `-`, without leading or trailing separators.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// Clip filename for a description, e.g. `"Scream of terror"` → `"scream-of-terror.ogg"`
pub fn clip_filename(description: &str) -> String {
    format!("{}.{}", slugify(description), CLIP_EXTENSION)
}

/// Filename with a numeric suffix before the extension (`name-2.ogg`)
pub fn numbered_filename(description: &str, n: u32) -> String {
    format!("{}-{}.{}", slugify(description), n, CLIP_EXTENSION)
}

/// Filenames to try for a new clip, in order:
/// `slug.ogg`, then `slug-2.ogg` up to `slug-1000.ogg`
pub fn filename_candidates(description: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(clip_filename(description))
        .chain((2..=MAX_FILENAME_SUFFIX).map(move |n| numbered_filename(description, n)))
}
