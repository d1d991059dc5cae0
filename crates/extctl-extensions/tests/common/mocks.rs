//! Mock implementations for testing
//!
//! Stand-ins for the network (`FakeFetcher`) and for the transfer engine
//! (`RecordingExecutor`). Both record their invocations so tests can assert
//! on ordering and on what was never called.

#![allow(dead_code)]

use extctl_extensions::manifest::MANIFEST_FILE;
use extctl_extensions::{ExtensionId, ExtensionSource, FetchError, Fetcher, PlanExecutor};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Commit returned for sources without a configured latest commit
pub const INITIAL_COMMIT: &str = "0000001";

/// Record of a fetcher invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchCall {
    Fetch(String),
    LatestCommit(String),
}

#[derive(Default)]
struct FakeState {
    latest: HashMap<String, String>,
    failing: HashSet<String>,
    without_manifest: HashSet<String>,
    calls: Vec<FetchCall>,
}

/// In-memory fetcher keyed by source URL
///
/// Clones share state, so a test can keep a handle after moving one into
/// the engine.
#[derive(Clone, Default)]
pub struct FakeFetcher {
    state: Arc<Mutex<FakeState>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the commit the remote currently points at
    pub fn set_latest(&self, url: &str, commit: &str) {
        self.state
            .lock()
            .unwrap()
            .latest
            .insert(url.to_string(), commit.to_string());
    }

    /// Make every operation against `url` fail
    pub fn fail(&self, url: &str) {
        self.state.lock().unwrap().failing.insert(url.to_string());
    }

    /// Fetch `url` without a manifest.json
    pub fn without_manifest(&self, url: &str) {
        self.state
            .lock()
            .unwrap()
            .without_manifest
            .insert(url.to_string());
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, FetchCall::Fetch(_)))
            .count()
    }

    fn latest_for(state: &FakeState, url: &str) -> String {
        state
            .latest
            .get(url)
            .cloned()
            .unwrap_or_else(|| INITIAL_COMMIT.to_string())
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, source: &ExtensionSource, dest: &Path) -> Result<String, FetchError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(FetchCall::Fetch(source.url().to_string()));

        if state.failing.contains(source.url()) {
            return Err(FetchError::failed("git", "clone", "network unreachable"));
        }

        let commit = Self::latest_for(&state, source.url());
        fs::create_dir_all(dest).unwrap();
        fs::write(dest.join("COMMIT"), &commit).unwrap();
        if !state.without_manifest.contains(source.url()) {
            let name = source.url().rsplit('/').next().unwrap_or("extension");
            fs::write(
                dest.join(MANIFEST_FILE),
                format!(r#"{{"name":"{name} extension","required_api_version":"^2"}}"#),
            )
            .unwrap();
        }
        Ok(commit)
    }

    fn latest_commit(&self, source: &ExtensionSource) -> Result<String, FetchError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(FetchCall::LatestCommit(source.url().to_string()));

        if state.failing.contains(source.url()) {
            return Err(FetchError::failed("git", "ls-remote", "network unreachable"));
        }
        Ok(Self::latest_for(&state, source.url()))
    }
}

/// Plan executor that records calls and fails on request
#[derive(Default)]
pub struct RecordingExecutor {
    pub calls: Vec<String>,
    failing: HashSet<String>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    fn record(&mut self, kind: &str, id: &ExtensionId) -> Result<(), String> {
        self.calls.push(format!("{kind} {id}"));
        if self.failing.contains(id.as_str()) {
            return Err(format!("{kind} of {id} failed"));
        }
        Ok(())
    }
}

impl PlanExecutor for RecordingExecutor {
    type Error = String;

    fn remove(&mut self, id: &ExtensionId) -> Result<(), String> {
        self.record("remove", id)
    }

    fn install(&mut self, id: &ExtensionId) -> Result<(), String> {
        self.record("install", id)
    }
}
