/// Replaces characters that Radiance file names cannot carry (spaces and colons) with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == ' ' || c == ':' { '_' } else { c })
        .collect()
}
