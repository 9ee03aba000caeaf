use std::path::Path;

use percent_encoding::percent_decode_str;

use crate::SvnError;

/// Validates a raw listing href and returns the local file name it maps to.
///
/// A trailing `/` (directory marker) is ignored. The raw value is what goes
/// on the wire; the returned name is the percent-decoded form used on disk.
pub(crate) fn validate_entry_name(href: &str) -> Result<String, SvnError> {
    let raw = href.strip_suffix('/').unwrap_or(href);
    if raw.is_empty() {
        return Err(SvnError::InvalidPath(format!("empty entry name: {href:?}")));
    }
    if raw.contains(['/', '\\', '?', '#', '\0']) {
        return Err(SvnError::InvalidPath(format!("unsafe entry name: {href:?}")));
    }

    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| SvnError::InvalidPath(format!("entry name is not valid UTF-8: {href:?}")))?
        .into_owned();
    if decoded.is_empty()
        || decoded == "."
        || decoded == ".."
        || decoded.contains(['/', '\\', '\0'])
    {
        return Err(SvnError::InvalidPath(format!("unsafe entry name: {href:?}")));
    }

    #[cfg(windows)]
    if decoded.contains(':') {
        return Err(SvnError::InvalidPath(format!("unsafe entry name: {href:?}")));
    }

    Ok(decoded)
}

/// Fails if `path` exists and is a symlink; the mirror never writes through one.
pub(crate) async fn reject_symlink(path: &Path) -> Result<(), SvnError> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.file_type().is_symlink() => Err(SvnError::InvalidPath(format!(
            "refusing to write through symlink: {}",
            path.display()
        ))),
        Ok(_) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn validate_entry_name_accepts_plain_files_and_dirs() {
        assert_eq!(validate_entry_name("a.txt").unwrap(), "a.txt");
        assert_eq!(validate_entry_name("sub/").unwrap(), "sub");
        assert_eq!(validate_entry_name(".hidden").unwrap(), ".hidden");
    }

    #[test]
    fn validate_entry_name_percent_decodes() {
        assert_eq!(validate_entry_name("my%20file.txt").unwrap(), "my file.txt");
        assert_eq!(validate_entry_name("caf%C3%A9/").unwrap(), "café");
    }

    #[test]
    fn validate_entry_name_rejects_invalid_utf8() {
        for href in ["a%FF.txt", "a%FE.txt", "%C3/"] {
            let err = validate_entry_name(href).unwrap_err();
            assert!(matches!(err, SvnError::InvalidPath(_)), "{href}");
        }
    }

    #[test]
    fn validate_entry_name_rejects_empty() {
        let err = validate_entry_name("").unwrap_err();
        assert!(matches!(err, SvnError::InvalidPath(_)));
        assert!(validate_entry_name("/").is_err());
    }

    #[test]
    fn validate_entry_name_rejects_parent_and_cur_dir() {
        assert!(validate_entry_name("../").is_err());
        assert!(validate_entry_name("..").is_err());
        assert!(validate_entry_name("./").is_err());
        assert!(validate_entry_name("%2e%2e/").is_err());
    }

    #[test]
    fn validate_entry_name_rejects_embedded_separators() {
        assert!(validate_entry_name("a/b").is_err());
        assert!(validate_entry_name("a/../b").is_err());
        assert!(validate_entry_name("/etc/passwd").is_err());
        assert!(validate_entry_name("a\\b").is_err());
        assert!(validate_entry_name("..%2fescape").is_err());
        assert!(validate_entry_name("a%5cb").is_err());
        assert!(validate_entry_name("nul%00byte").is_err());
    }

    #[test]
    fn validate_entry_name_rejects_query_and_fragment() {
        assert!(validate_entry_name("?C=N;O=D").is_err());
        assert!(validate_entry_name("file#frag").is_err());
    }

    #[cfg(windows)]
    #[test]
    fn validate_entry_name_rejects_drive_prefix() {
        assert!(validate_entry_name("C:").is_err());
        assert!(validate_entry_name("C%3Aevil").is_err());
    }

    fn run_async<T>(f: impl std::future::Future<Output = T>) -> T {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn reject_symlink_allows_missing_and_regular_paths() {
        run_async(async {
            let temp = tempfile::tempdir().unwrap();
            reject_symlink(&temp.path().join("missing")).await.unwrap();
            reject_symlink(temp.path()).await.unwrap();
        });
    }

    #[cfg(unix)]
    #[test]
    fn reject_symlink_refuses_links() {
        run_async(async {
            let temp = tempfile::tempdir().unwrap();
            let link = temp.path().join("link");
            std::os::unix::fs::symlink(temp.path(), &link).unwrap();
            let err = reject_symlink(&link).await.unwrap_err();
            assert!(matches!(err, SvnError::InvalidPath(_)));
        });
    }
}
