//! Sort option normalization.

/// Maps a caller-facing sort name to its index field and default
/// direction.
fn translate_field(field: &str) -> (&str, &'static str) {
    match field {
        "year" | "publishDate" => ("publishDateSort", "desc"),
        "author" => ("authorStr", "asc"),
        "title" => ("title_sort", "asc"),
        other => (other, "asc"),
    }
}

/// Normalizes one sort part into `field direction` form.
///
/// The direction defaults per field (descending for date sorts) and is
/// forced to lowercase `asc`/`desc`; anything else falls back to the
/// default.
fn normalize_part(part: &str) -> String {
    let mut pieces = part.trim().splitn(2, ' ');
    let field = pieces.next().unwrap_or_default();
    let (field, default_direction) = translate_field(field);

    let direction = match pieces
        .next()
        .map(|d| d.trim().to_lowercase())
        .as_deref()
    {
        Some("asc") => "asc",
        Some("desc") => "desc",
        _ => default_direction,
    };

    format!("{field} {direction}")
}

/// Normalizes a full sort option.
///
/// Multiple comma-separated parts (ranked sorts with tie-breakers) are
/// normalized individually and reassembled.
pub fn normalize_sort(sort: &str) -> String {
    sort.split(',')
        .map(normalize_part)
        .collect::<Vec<_>>()
        .join(",")
}
