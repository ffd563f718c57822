//! Locating the CLI executable

use crate::error::{Result, TransportError};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Strategy for finding the CLI executable
pub trait CliResolver: Send + Sync + fmt::Debug {
    /// Return the path of the executable to spawn
    fn resolve(&self) -> Result<PathBuf>;
}

/// Searches `PATH`, then well-known install locations under the home directory
#[derive(Debug, Clone)]
pub struct DefaultCliResolver {
    program: String,
    fallbacks: Vec<PathBuf>,
}

impl DefaultCliResolver {
    /// Resolver for the `claude` executable
    pub fn new() -> Self {
        Self::for_program("claude")
    }

    /// Resolver for another executable name, with the standard fallbacks
    pub fn for_program(program: impl Into<String>) -> Self {
        let program = program.into();
        let fallbacks = default_fallbacks(&program);
        Self { program, fallbacks }
    }

    /// Replace the fallback locations
    pub fn with_fallbacks(mut self, fallbacks: Vec<PathBuf>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// The fallback locations, in search order
    pub fn fallbacks(&self) -> &[PathBuf] {
        &self.fallbacks
    }
}

impl Default for DefaultCliResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CliResolver for DefaultCliResolver {
    fn resolve(&self) -> Result<PathBuf> {
        if let Ok(path) = which::which(&self.program) {
            return Ok(path);
        }

        self.fallbacks
            .iter()
            .find(|path| path.is_file())
            .cloned()
            .ok_or(TransportError::CliNotFound)
    }
}

/// Always resolves to one path
#[derive(Debug, Clone)]
pub struct FixedCliResolver(pub PathBuf);

impl CliResolver for FixedCliResolver {
    fn resolve(&self) -> Result<PathBuf> {
        Ok(self.0.clone())
    }
}

fn default_fallbacks(program: &str) -> Vec<PathBuf> {
    let exe = format!("{}{}", program, env::consts::EXE_SUFFIX);
    let home = home_dir();

    let mut locations = Vec::new();
    if let Some(home) = &home {
        locations.push(home.join(".npm-global/bin").join(&exe));
    }
    locations.push(PathBuf::from("/usr/local/bin").join(&exe));
    if let Some(home) = &home {
        locations.push(home.join(".local/bin").join(&exe));
        locations.push(home.join("node_modules/.bin").join(&exe));
        locations.push(home.join(".yarn/bin").join(&exe));
        locations.push(home.join(".claude/local").join(&exe));
    }
    locations
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
