//! File naming rules for scratch pages and output containers.
//!
//! - Titles are sanitized to alphanumerics, spaces and underscores
//! - Scratch pages are named by zero-padded global index, so lexical order is
//!   reading order across chapter boundaries
//! - Containers are named `<title>[_Part_<n>].<ext>`

/// Minimum zero-padding width of scratch page file names.
const MIN_PAGE_DIGITS: usize = 4;

/// Extension used when a page key carries none.
pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Sanitizes an archive title for use as a file name prefix.
///
/// Keeps alphanumerics (including non-ASCII letters), spaces and underscores,
/// then trims trailing whitespace. An empty result becomes `untitled`.
///
/// # Examples
///
/// ```rust
/// use mangapack::naming::sanitize_title;
///
/// assert_eq!(sanitize_title("Chainsaw Man_Ch_12.5"), "Chainsaw Man_Ch_125");
/// assert_eq!(sanitize_title("Who?! Me... "), "Who Me");
/// assert_eq!(sanitize_title("???"), "untitled");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    let sanitized = sanitized.trim_end();

    if sanitized.trim().is_empty() {
        "untitled".to_string()
    } else {
        sanitized.to_string()
    }
}

/// Builds the file name of one container part.
///
/// `suffixed` selects between the bare title and `<title>_Part_<number>`.
///
/// # Examples
///
/// ```rust
/// use mangapack::naming::part_file_name;
///
/// assert_eq!(part_file_name("Dandadan", 2, true, "cbz"), "Dandadan_Part_2.cbz");
/// assert_eq!(part_file_name("Dandadan", 1, false, "cbz"), "Dandadan.cbz");
/// ```
pub fn part_file_name(sanitized_title: &str, number: usize, suffixed: bool, ext: &str) -> String {
    if suffixed {
        format!("{}_Part_{}.{}", sanitized_title, number, ext)
    } else {
        format!("{}.{}", sanitized_title, ext)
    }
}

/// Builds the scratch file name of the page with global index `index`.
///
/// Indices are padded to at least four digits, or to the width of
/// `expected_total` when that is larger.
///
/// # Examples
///
/// ```rust
/// use mangapack::naming::page_file_name;
///
/// assert_eq!(page_file_name(7, 300, "png"), "0007.png");
/// assert_eq!(page_file_name(7, 12_000, "jpg"), "00007.jpg");
/// ```
pub fn page_file_name(index: usize, expected_total: usize, ext: &str) -> String {
    let width = expected_total.to_string().len().max(MIN_PAGE_DIGITS);
    format!("{:0width$}.{}", index, ext, width = width)
}

/// Whether `file_name` is a container left behind by a job titled `sanitized_title`.
pub fn is_stray_container(file_name: &str, sanitized_title: &str, ext: &str) -> bool {
    let Some(rest) = file_name.strip_prefix(sanitized_title) else {
        return false;
    };
    let lower = rest.to_ascii_lowercase();
    lower.ends_with(&format!(".{}", ext.to_ascii_lowercase())) || lower.ends_with(".zip")
}

/// Extracts a file extension from an image key or URL.
///
/// Query parameters and fragments are ignored. Returns `None` when there is
/// no usable extension.
///
/// # Examples
///
/// ```rust
/// use mangapack::naming::extract_extension;
///
/// assert_eq!(extract_extension("0001-abcdef.webp"), Some("webp".to_string()));
/// assert_eq!(extract_extension("https://cdn.example/x.PNG?v=2"), Some("png".to_string()));
/// assert_eq!(extract_extension("no-extension"), None);
/// ```
pub fn extract_extension(key: &str) -> Option<String> {
    let clean = key.split(['?', '#']).next()?;
    let name = clean.rsplit('/').next()?;

    let (_, ext) = name.rsplit_once('.')?;
    if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext.to_ascii_lowercase())
    } else {
        None
    }
}
