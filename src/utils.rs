//! Utility functions for source lines and path naming

use std::path::Path;

/// Return the URL carried by a source line, or `None` if the line is skipped
///
/// A line is skipped when it is blank, contains only whitespace, or contains
/// `skip_token` anywhere (case-insensitive). Kept lines are trimmed.
///
/// # Examples
///
/// ```
/// use webcrawl::utils::eligible_url;
///
/// assert_eq!(eligible_url("  http://a.test/ok \n", "pdf"), Some("http://a.test/ok"));
/// assert_eq!(eligible_url("http://b.test/paper.PDF", "pdf"), None);
/// assert_eq!(eligible_url("   ", "pdf"), None);
/// ```
#[must_use]
pub fn eligible_url<'a>(line: &'a str, skip_token: &str) -> Option<&'a str> {
    let url = line.trim();
    if url.is_empty() {
        return None;
    }
    if url
        .to_lowercase()
        .contains(&skip_token.to_lowercase())
    {
        return None;
    }
    Some(url)
}

/// Name of a source: its file name with the final extension removed
///
/// `links.txt` becomes `links`, `news.2024.txt` becomes `news.2024`.
/// Falls back to the full file name when there is no stem.
#[must_use]
pub fn source_name(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Index entry for a saved page: `<workspace>/<file>` with a `/` separator
///
/// Index lines use this so archives read the same on every platform.
#[must_use]
pub fn index_path(workspace: &str, file_name: &str) -> String {
    format!("{}/{}", workspace, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_whitespace_lines_are_skipped() {
        assert_eq!(eligible_url("", "pdf"), None);
        assert_eq!(eligible_url("   ", "pdf"), None);
        assert_eq!(eligible_url("\t\r", "pdf"), None);
    }

    #[test]
    fn skip_token_is_case_insensitive_substring() {
        assert_eq!(eligible_url("http://b.test/x.pdf", "pdf"), None);
        assert_eq!(eligible_url("http://b.test/X.PDF", "pdf"), None);
        assert_eq!(eligible_url("http://pdfs.test/index.html", "pdf"), None);
        assert_eq!(eligible_url("http://b.test/x.pdf", "PDF"), None);
    }

    #[test]
    fn other_lines_are_trimmed_and_kept() {
        assert_eq!(
            eligible_url("  http://a.test/ok\r", "pdf"),
            Some("http://a.test/ok")
        );
        assert_eq!(
            eligible_url("http://a.test/report.pdf", ".zip"),
            Some("http://a.test/report.pdf")
        );
    }

    #[test]
    fn source_name_strips_final_extension() {
        assert_eq!(source_name(Path::new("links.txt")), "links");
        assert_eq!(source_name(Path::new("dir/news.2024.txt")), "news.2024");
        assert_eq!(source_name(Path::new("README")), "README");
    }

    #[test]
    fn index_path_uses_forward_slash() {
        assert_eq!(index_path("links", "3.html"), "links/3.html");
    }
}
