//! Extension source references
//!
//! Supported forms:
//! - URL: `https://github.com/user/repo(.git)`, `http://`, `ssh://`, `git://`, `file://`
//! - scp-like: `git@github.com:user/repo.git`
//! - GitHub shorthand: `github:user/repo`
//!
//! Any form may carry a `#ref` suffix selecting a branch or tag.
//!
//! The extension id is derived from the source: host labels reversed, then
//! the repository path, e.g. `https://github.com/user/Timer.git` becomes
//! `com.github.user.timer`. Local `file://` sources use the `local.` prefix.

use extctl_core::ExtensionId;
use std::fmt;
use url::Url;

use crate::error::TransferError;

const SUPPORTED_SCHEMES: &[&str] = &["https", "http", "ssh", "git", "file"];

/// A parsed, validated source reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSource {
    /// URL handed to the fetcher
    url: String,
    /// Branch or tag to fetch
    git_ref: Option<String>,
    /// Id derived from the URL
    id: ExtensionId,
}

impl ExtensionSource {
    /// Parse a user-supplied source reference
    pub fn parse(input: &str) -> Result<Self, TransferError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TransferError::invalid_source(input, "source is empty"));
        }

        let (base, git_ref) = match input.split_once('#') {
            Some((_, "")) => {
                return Err(TransferError::invalid_source(input, "empty reference after '#'"));
            }
            Some((base, reference)) => (base, Some(reference.to_string())),
            None => (input, None),
        };

        let (url, host, segments) = if let Some(rest) = base.strip_prefix("github:") {
            Self::parse_shorthand(input, rest)?
        } else if let Some((host, path)) = Self::split_scp(base) {
            let segments = Self::split_path(path);
            (base.to_string(), Some(host.to_string()), segments)
        } else {
            Self::parse_url(input, base)?
        };

        let Some((repo, owners)) = segments.split_last() else {
            return Err(TransferError::invalid_source(input, "missing repository path"));
        };
        if repo.trim_end_matches(".git").is_empty() {
            return Err(TransferError::invalid_source(input, "empty repository name"));
        }

        let mut parts: Vec<String> = match &host {
            Some(host) => host
                .split('.')
                .rev()
                .filter(|label| !label.is_empty())
                .map(sanitize)
                .collect(),
            None => vec!["local".to_string()],
        };
        if host.is_some() {
            parts.extend(owners.iter().map(|s| sanitize(s)));
        }
        parts.push(sanitize(repo.trim_end_matches(".git")));

        let id = ExtensionId::new(parts.join("."))
            .map_err(|e| TransferError::invalid_source(input, e.to_string()))?;

        Ok(Self { url, git_ref, id })
    }

    fn parse_shorthand(
        input: &str,
        rest: &str,
    ) -> Result<(String, Option<String>, Vec<String>), TransferError> {
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
            return Err(TransferError::invalid_source(
                input,
                "GitHub shorthand must be github:owner/repo",
            ));
        }
        Ok((
            format!("https://github.com/{}/{}", parts[0], parts[1]),
            Some("github.com".to_string()),
            parts.iter().map(|s| s.to_string()).collect(),
        ))
    }

    /// `user@host:path` without a scheme
    fn split_scp(base: &str) -> Option<(&str, &str)> {
        if base.contains("://") {
            return None;
        }
        let (user_host, path) = base.split_once(':')?;
        let (_, host) = user_host.split_once('@')?;
        if host.is_empty() || path.is_empty() {
            return None;
        }
        Some((host, path))
    }

    fn parse_url(
        input: &str,
        base: &str,
    ) -> Result<(String, Option<String>, Vec<String>), TransferError> {
        let url = Url::parse(base).map_err(|e| TransferError::invalid_source(input, e.to_string()))?;

        if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
            return Err(TransferError::invalid_source(
                input,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        let host = url.host_str().filter(|h| !h.is_empty()).map(str::to_string);
        if host.is_none() && url.scheme() != "file" {
            return Err(TransferError::invalid_source(input, "missing host"));
        }

        let segments = Self::split_path(url.path());
        Ok((base.to_string(), host, segments))
    }

    fn split_path(path: &str) -> Vec<String> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn git_ref(&self) -> Option<&str> {
        self.git_ref.as_deref()
    }

    pub fn id(&self) -> &ExtensionId {
        &self.id
    }

    /// Rebuild a source from a stored record
    pub fn from_record(url: &str, git_ref: Option<&str>) -> Result<Self, TransferError> {
        match git_ref {
            Some(reference) => Self::parse(&format!("{url}#{reference}")),
            None => Self::parse(url),
        }
    }
}

impl fmt::Display for ExtensionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.git_ref {
            Some(reference) => write!(f, "{}#{}", self.url, reference),
            None => f.write_str(&self.url),
        }
    }
}

fn sanitize(part: &str) -> String {
    part.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
