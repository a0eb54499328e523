//! Input validation for service URLs and DOIs.

use thiserror::Error;

/// Validation errors
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid DOI: {0}")]
    InvalidDoi(String),
}

/// Validate the base URL of a self-hosted service.
///
/// Loopback and private hosts are allowed since the structuring service
/// normally runs next to the extractor; only the shape of the URL is checked.
pub fn validate_service_url(url: &str) -> Result<String, ValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(ValidationError::InvalidUrl("empty URL".to_string()));
    }

    if url.contains(['\0', '\n', '\r']) {
        return Err(ValidationError::InvalidUrl(
            "contains control characters".to_string(),
        ));
    }

    let parsed = url::Url::parse(url)
        .map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationError::InvalidUrl(format!(
                "invalid scheme: {}",
                other
            )))
        }
    }

    if parsed.host_str().is_none() {
        return Err(ValidationError::InvalidUrl("missing host".to_string()));
    }

    Ok(url.trim_end_matches('/').to_string())
}

/// Validate and normalize a DOI
///
/// DOIs have the format "10.xxxx/xxxxxx" where xxxx is a registrant code
/// and xxxxxx is an item ID. Resolver prefixes are stripped and the result is
/// lowercased (DOIs are case-insensitive).
pub fn validate_doi(doi: &str) -> Result<String, ValidationError> {
    let doi = doi.trim().to_lowercase();

    if doi.is_empty() {
        return Err(ValidationError::InvalidDoi("empty DOI".to_string()));
    }

    let doi = doi.strip_prefix("doi:").unwrap_or(&doi).trim_start();
    let doi = doi.strip_prefix("https://doi.org/").unwrap_or(doi);
    let doi = doi.strip_prefix("http://doi.org/").unwrap_or(doi);
    let doi = doi.strip_prefix("https://dx.doi.org/").unwrap_or(doi);

    if !doi.starts_with("10.") {
        return Err(ValidationError::InvalidDoi(
            "DOI must start with '10.'".to_string(),
        ));
    }

    match doi.split_once('/') {
        Some((_, suffix)) if !suffix.is_empty() => {}
        _ => {
            return Err(ValidationError::InvalidDoi(
                "DOI must contain a suffix after '/'".to_string(),
            ))
        }
    }

    if doi.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidDoi(
            "DOI must not contain whitespace".to_string(),
        ));
    }

    Ok(doi.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_service_url_valid() {
        assert_eq!(
            validate_service_url("http://localhost:8070/").unwrap(),
            "http://localhost:8070"
        );
        assert!(validate_service_url("https://grobid.example.org").is_ok());
        assert!(validate_service_url("http://10.0.0.5:8070").is_ok());
    }

    #[test]
    fn test_validate_service_url_invalid() {
        assert!(validate_service_url("").is_err());
        assert!(validate_service_url("ftp://example.com").is_err());
        assert!(validate_service_url("javascript:alert(1)").is_err());
        assert!(validate_service_url("localhost:8070").is_err());
        assert!(validate_service_url("http://host\n/").is_err());
    }

    #[test]
    fn test_validate_doi_valid() {
        assert_eq!(
            validate_doi("10.1038/Nature12345").unwrap(),
            "10.1038/nature12345"
        );
        assert_eq!(
            validate_doi("doi:10.1234/abc123").unwrap(),
            "10.1234/abc123"
        );
        assert_eq!(
            validate_doi("DOI: 10.1234/abc123").unwrap(),
            "10.1234/abc123"
        );
        assert_eq!(
            validate_doi("https://doi.org/10.1234/abc123").unwrap(),
            "10.1234/abc123"
        );
    }

    #[test]
    fn test_validate_doi_invalid() {
        assert!(validate_doi("").is_err());
        assert!(validate_doi("10.1234").is_err());
        assert!(validate_doi("10.1234/").is_err());
        assert!(validate_doi("9.1234/abc").is_err());
        assert!(validate_doi("10.1234/a b").is_err());
    }
}
