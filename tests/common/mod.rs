//! Shared test infrastructure for integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Isolated config dir + directory store for one binary run sequence.
pub struct TestFixture {
    pub config: TempDir,
    pub store: TempDir,
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            config: tempfile::tempdir().expect("create config tempdir"),
            store: tempfile::tempdir().expect("create store tempdir"),
        }
    }

    /// Run the binary against this fixture's config dir and store dir.
    pub fn run(&self, args: &[&str]) -> Output {
        let mut command = Command::new(env!("CARGO_BIN_EXE_registri"));
        command
            .env("REGISTRI_CONFIG_DIR", self.config.path())
            .arg("--store-dir")
            .arg(self.store.path())
            .args(args);
        command.output().expect("run registri")
    }

    /// Run and require success, returning stdout.
    pub fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "command {:?} failed\nstdout: {}\nstderr: {}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// Path of a file inside the directory store.
    pub fn store_path(&self, relative: &str) -> PathBuf {
        self.store.path().join(relative)
    }
}

#[allow(dead_code)]
pub fn read_text(path: &Path) -> String {
    String::from_utf8(std::fs::read(path).expect("read file")).expect("utf-8 file")
}
