use std::borrow::Cow;

/// Normalizes a path by replacing backslashes with forward slashes and removing
/// "." components. ".." components are kept. Uses Cow to avoid allocation when
/// path is already normalized.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let path = if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/"))
    } else {
        Cow::Borrowed(path)
    };

    if !path.split('/').any(|component| component == ".") {
        return path;
    }

    Cow::Owned(
        path.split('/')
            .filter(|component| *component != ".")
            .collect::<Vec<_>>()
            .join("/"),
    )
}

/// Whether `path` climbs out of the directory it is relative to.
pub fn escapes_root(path: &str) -> bool {
    normalize_path(path).split('/').any(|component| component == "..")
}

/// Join `file` onto the repository-relative `directory`, producing a git
/// pathspec. An empty or "." directory yields `file` unchanged.
pub fn join_relative(directory: &str, file: &str) -> String {
    let directory = normalize_path(directory);
    let directory = directory.trim_matches('/');

    if directory.is_empty() || directory == "." {
        return normalize_path(file).into_owned();
    }

    format!("{directory}/{}", normalize_path(file))
}
