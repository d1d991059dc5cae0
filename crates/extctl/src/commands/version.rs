//! Version command

use anyhow::Result;
use serde::Serialize;

use crate::cli::VersionArgs;
use crate::output;

/// Metadata baked in by the build script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct BuildInfo {
    version: &'static str,
    commit: Option<&'static str>,
    build_date: Option<&'static str>,
    target: Option<&'static str>,
}

const BUILD: BuildInfo = BuildInfo {
    version: env!("CARGO_PKG_VERSION"),
    commit: option_env!("EXTCTL_GIT_SHA"),
    build_date: option_env!("EXTCTL_BUILD_DATE"),
    target: option_env!("EXTCTL_TARGET"),
};

impl BuildInfo {
    /// Labelled fields that are known for this build
    fn details(&self) -> Vec<(&'static str, &'static str)> {
        [
            ("commit", self.commit),
            ("built", self.build_date),
            ("target", self.target),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| (label, v)))
        .collect()
    }
}

pub fn run(args: VersionArgs) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(&BUILD)?);
        return Ok(());
    }

    println!("extctl {}", BUILD.version);
    for (label, value) in BUILD.details() {
        output::kv(label, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_version_is_valid_semver() {
        let parsed = semver::Version::parse(BUILD.version);
        assert!(
            parsed.is_ok(),
            "version should be valid semver, got: {}",
            BUILD.version
        );
    }

    #[test]
    fn test_details_list_each_field_once() {
        let info = BuildInfo {
            version: "1.2.3",
            commit: Some("abc1234"),
            build_date: Some("2026-10-19"),
            target: Some("x86_64-unknown-linux-gnu"),
        };
        assert_eq!(
            info.details(),
            [
                ("commit", "abc1234"),
                ("built", "2026-10-19"),
                ("target", "x86_64-unknown-linux-gnu"),
            ]
        );
    }

    #[test]
    fn test_details_skip_unknown_fields() {
        let info = BuildInfo {
            version: "1.2.3",
            commit: None,
            build_date: Some("2026-10-19"),
            target: None,
        };
        assert_eq!(info.details(), [("built", "2026-10-19")]);
    }

    #[test]
    fn test_json_keeps_unknown_fields_as_null() {
        let info = BuildInfo {
            version: "1.2.3",
            commit: None,
            build_date: None,
            target: None,
        };
        let json = serde_json::to_value(info).unwrap();
        assert_eq!(json["version"], "1.2.3");
        assert!(json["commit"].is_null());
    }
}
