//! Shared helpers for file naming and object-store key resolution,
//! used by every `ReceivedFileStorage` variant.

use std::path::Path;

/// Keeps only the final path component of `name`, stripping any `..`
/// or directory prefixes.
pub fn sanitize(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|os| os.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty() && s != "." && s != "..")
        .unwrap_or_else(|| "unnamed".to_string())
}

/// Strips leading slashes from an object key prefix.
pub fn normalize_key(key: &str) -> String {
    key.trim_start_matches('/').to_string()
}

/// `prefix` + sanitized `name`, used when `destination` is a
/// directory-style prefix ending in `/`.
pub fn build_key(prefix: &str, name: &str) -> String {
    format!("{}{}", normalize_key(prefix), sanitize(name))
}

/// The object-store key resolution shared by the S3/Azure/GCS storage
/// variants:
/// - `destination` ends with `/`: `normalize(destination) + sanitize(name)`.
/// - `destination` is non-blank: `normalize(destination)` (a full key).
/// - otherwise: `sanitize(name)`.
pub fn resolve_key(destination: &str, name: &str) -> String {
    if destination.ends_with('/') {
        build_key(destination, name)
    } else if !destination.trim().is_empty() {
        normalize_key(destination)
    } else {
        sanitize(name)
    }
}

/// Deletes a temp file, logging but not propagating failure.
pub async fn delete_local_temp_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to delete temp file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directory_prefixes() {
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("a/b/c.csv"), "c.csv");
        assert_eq!(sanitize("plain.csv"), "plain.csv");
    }

    #[test]
    fn resolve_key_directory_destination_appends_sanitized_name() {
        assert_eq!(resolve_key("exports/", "../a/report.csv"), "exports/report.csv");
    }

    #[test]
    fn resolve_key_full_key_destination_is_normalized() {
        assert_eq!(resolve_key("/exports/report-final.csv", "report.csv"), "exports/report-final.csv");
    }

    #[test]
    fn resolve_key_blank_destination_falls_back_to_sanitized_name() {
        assert_eq!(resolve_key("", "report.csv"), "report.csv");
        assert_eq!(resolve_key("   ", "report.csv"), "report.csv");
    }
}
