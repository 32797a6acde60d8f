//! Credential-profile enumeration
//!
//! Reads section headers from the AWS shared config and credentials files to
//! discover which profiles are configured. Only the headers are parsed; the
//! credential contents stay with the external credential store.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use crate::error::{ReportError, Result};

/// All configured profile names, in file order, config file first.
pub fn available_profiles() -> Result<Vec<String>> {
    let mut profiles = Vec::new();
    let mut seen = HashSet::new();

    for path in [config_file_path(), credentials_file_path()]
        .into_iter()
        .flatten()
    {
        if !path.exists() {
            continue;
        }
        let content = fs::read_to_string(&path)?;
        for name in parse_profile_headers(&content) {
            if seen.insert(name.clone()) {
                profiles.push(name);
            }
        }
    }

    if profiles.is_empty() {
        return Err(ReportError::Configuration(
            "no AWS profiles found; configure them with 'aws configure' or set profiles in the config file".into(),
        ));
    }

    Ok(profiles)
}

/// Extract profile names from INI section headers.
///
/// The config file prefixes named sections with `profile `; the credentials
/// file does not. Both spellings are accepted here, along with `[default]`.
pub fn parse_profile_headers(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let section = line.strip_prefix('[')?.strip_suffix(']')?.trim();
            if section.is_empty() {
                return None;
            }
            match section.strip_prefix("profile ") {
                Some(name) => Some(name.trim().to_string()),
                None => Some(section.to_string()),
            }
        })
        .collect()
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AWS_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".aws/config"))
}

fn credentials_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AWS_SHARED_CREDENTIALS_FILE") {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".aws/credentials"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_file_headers() {
        let content = "\
[default]
region = us-east-1

[profile 123456789012.admin]
sso_start_url = https://example.awsapps.com/start

[profile staging]
region = eu-central-1
";
        let profiles = parse_profile_headers(content);
        assert_eq!(profiles, vec!["default", "123456789012.admin", "staging"]);
    }

    #[test]
    fn test_parse_credentials_file_headers() {
        let content = "\
[prod]
aws_access_key_id = AKIA...
aws_secret_access_key = secret

[dev]
aws_access_key_id = AKIA...
";
        let profiles = parse_profile_headers(content);
        assert_eq!(profiles, vec!["prod", "dev"]);
    }

    #[test]
    fn test_parse_ignores_non_headers() {
        let content = "region = us-east-1\noutput = json\n[]\n";
        assert!(parse_profile_headers(content).is_empty());
    }
}
