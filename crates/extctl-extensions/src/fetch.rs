//! Fetching extension sources
//!
//! `Fetcher` is the seam between the transfer engine and the network.
//! `GitFetcher` shells out to git; tests provide an in-memory fake.

use std::ffi::OsString;
use std::path::Path;
use std::process::Output;
use tracing::debug;

use crate::error::FetchError;
use crate::source::ExtensionSource;

/// Retrieves extension files and remote revision information
pub trait Fetcher {
    /// Materialise the source tree into `dest` (which must not exist yet)
    /// and return the fetched commit
    fn fetch(&self, source: &ExtensionSource, dest: &Path) -> Result<String, FetchError>;

    /// Latest commit available for the source's reference
    fn latest_commit(&self, source: &ExtensionSource) -> Result<String, FetchError>;
}

/// git-backed fetcher
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: String,
    depth: Option<u32>,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new("git", Some(1))
    }
}

impl GitFetcher {
    pub fn new(program: impl Into<String>, depth: Option<u32>) -> Self {
        Self {
            program: program.into(),
            depth,
        }
    }

    fn run(&self, operation: &str, args: Vec<OsString>) -> Result<Output, FetchError> {
        debug!("Running: {} {}", self.program, operation);

        let output = duct::cmd(self.program.as_str(), args)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|source| FetchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(FetchError::failed(&self.program, operation, stderr));
        }
        Ok(output)
    }

    fn clone_args(&self, source: &ExtensionSource, dest: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["clone".into(), "--quiet".into()];
        if let Some(depth) = self.depth {
            args.push("--depth".into());
            args.push(depth.to_string().into());
        }
        if let Some(reference) = source.git_ref() {
            args.push("--branch".into());
            args.push(reference.into());
        }
        args.push(source.url().into());
        args.push(dest.as_os_str().to_owned());
        args
    }
}

impl Fetcher for GitFetcher {
    fn fetch(&self, source: &ExtensionSource, dest: &Path) -> Result<String, FetchError> {
        self.run("clone", self.clone_args(source, dest))?;

        let output = self.run(
            "rev-parse",
            vec![
                "-C".into(),
                dest.as_os_str().to_owned(),
                "rev-parse".into(),
                "HEAD".into(),
            ],
        )?;
        let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if commit.is_empty() {
            return Err(FetchError::failed(&self.program, "rev-parse", "no HEAD commit"));
        }
        Ok(commit)
    }

    fn latest_commit(&self, source: &ExtensionSource) -> Result<String, FetchError> {
        let reference = source.git_ref().unwrap_or("HEAD");
        let output = self.run(
            "ls-remote",
            vec!["ls-remote".into(), source.url().into(), reference.into()],
        )?;

        parse_ls_remote(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            FetchError::RefNotFound {
                url: source.url().to_string(),
                reference: reference.to_string(),
            }
        })
    }
}

/// Pick the commit from `git ls-remote` output, preferring a peeled tag
fn parse_ls_remote(stdout: &str) -> Option<String> {
    let refs: Vec<(&str, &str)> = stdout
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .collect();

    refs.iter()
        .find(|(_, name)| name.ends_with("^{}"))
        .or_else(|| refs.first())
        .map(|(sha, _)| sha.trim().to_string())
        .filter(|sha| !sha.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_clone_args() {
        let fetcher = GitFetcher::new("git", Some(1));
        let source = ExtensionSource::parse("https://github.com/user/timer#v2").unwrap();
        let args = fetcher.clone_args(&source, &PathBuf::from("/tmp/dest"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert_eq!(
            args,
            [
                "clone",
                "--quiet",
                "--depth",
                "1",
                "--branch",
                "v2",
                "https://github.com/user/timer",
                "/tmp/dest"
            ]
        );
    }

    #[test]
    fn test_full_clone_has_no_depth() {
        let fetcher = GitFetcher::new("git", None);
        let source = ExtensionSource::parse("https://github.com/user/timer").unwrap();
        let args = fetcher.clone_args(&source, &PathBuf::from("/tmp/dest"));
        assert!(!args.iter().any(|a| a == "--depth"));
    }

    #[test]
    fn test_parse_ls_remote() {
        assert_eq!(
            parse_ls_remote("abc123\tHEAD\n").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            parse_ls_remote("tagobj\trefs/tags/v2\npeeled\trefs/tags/v2^{}\n").as_deref(),
            Some("peeled")
        );
        assert_eq!(parse_ls_remote(""), None);
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let fetcher = GitFetcher::new("extctl-definitely-not-a-real-git", None);
        let source = ExtensionSource::parse("https://github.com/user/timer").unwrap();
        let err = fetcher.latest_commit(&source).unwrap_err();
        assert!(matches!(err, FetchError::Spawn { .. }));
    }
}
