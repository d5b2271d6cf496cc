use crate::db::utils::years_from_values;
use crate::services::prelude::*;

/// Year lists arrive as JSON arrays; numbers are accepted alongside strings.
pub fn normalize_years(values: &[Value]) -> CatalogResult<Vec<String>> {
    years_from_values(values)
        .ok_or_else(|| CatalogError::validation("Years must be strings or integers"))
}

pub fn ext_from_filename(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
}
pub fn ext_from_mime(mime: &str) -> Option<String> {
    mime_guess::get_mime_extensions_str(mime)
        .and_then(|exts| exts.first().copied())
        .map(|ext| ext.to_string())
}
/// Keeps only the last path component of a client supplied file name.
pub fn sanitize_filename(raw: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() {
        "upload".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_years_accepts_numbers() {
        let years = normalize_years(&[json!("2023"), json!(2021), json!(" 2019 ")]).unwrap();
        assert_eq!(years, vec!["2023", "2021", "2019"]);
        assert!(normalize_years(&[json!(true)]).is_err());
    }

    #[test]
    fn test_ext_from_filename() {
        assert_eq!(ext_from_filename("Scan.PDF"), Some("pdf".to_string()));
        assert_eq!(ext_from_filename("noext"), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\notes.docx"), "notes.docx");
        assert_eq!(sanitize_filename("  "), "upload");
    }
}
