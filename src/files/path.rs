// Path normalization for generated file names

/// Canonicalize a generated file path.
///
/// Exactly one rule is applied: a leading `./` is removed, otherwise a leading
/// `/` is removed, otherwise the path is returned unchanged. Interior segments,
/// case and repeated separators are left alone.
pub fn normalize(path: &str) -> &str {
    if let Some(rest) = path.strip_prefix("./") {
        rest
    } else if let Some(rest) = path.strip_prefix('/') {
        rest
    } else {
        path
    }
}

/// Key used to identify a file inside a project collection.
///
/// Applies [`normalize`] until it stops changing, so names like `././a` and
/// `//a` land on the same key as `a` and re-merging a collection never
/// produces a second entry for the same file.
pub fn collection_key(path: &str) -> String {
    let mut current = path;
    loop {
        let next = normalize(current);
        if next.len() == current.len() {
            return next.to_string();
        }
        current = next;
    }
}
