use anyhow::Result;
use url::Url;

/// Output filename for a URL: its final path segment, or a fixed generic
/// name when the path has none. Deterministic so that re-runs resolve the
/// same URL to the same partial file.
pub fn filename_from_url(url_str: &str) -> Result<String> {
    let url = Url::parse(url_str)?;

    if let Some(segments) = url.path_segments() {
        if let Some(filename) = segments.last() {
            if !filename.is_empty() {
                return Ok(filename.to_string());
            }
        }
    }

    Ok("downloaded_file".to_string())
}

pub fn sanitize_filename(filename: &str) -> String {
    filename.replace(
        |c: char| !c.is_alphanumeric() && c != '.' && c != '-' && c != '_',
        "_",
    )
}
