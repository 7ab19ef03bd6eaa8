/// Title normalization used by the fuzzy evidence collector. Both sides of
/// a comparison (filename-derived title and catalog title) go through the
/// same pass: lowercase, punctuation to spaces, collapsed whitespace, and
/// configured noise tokens dropped.
///
/// Known false-negative class: a source filename carrying a series prefix
/// that the catalog title lacks ("Dune 03 - Children of Dune" vs "Children
/// of Dune") normalizes to a different string and will not match. That gap
/// is closed by the sidecar or authoritative collectors, not here.
pub fn normalize_title(input: &str, noise_tokens: &[String]) -> String {
    let mut flat = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                flat.push(lower);
            }
        } else {
            flat.push(' ');
        }
    }

    flat.split_whitespace()
        .filter(|token| !noise_tokens.iter().any(|noise| noise == token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derive a human title from a source file stem. Underscores and dots are
/// common separator damage in ripped filenames.
pub fn title_from_stem(stem: &str) -> String {
    stem.replace(['_', '.'], " ").trim().to_string()
}
