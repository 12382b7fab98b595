//! Screenshot and page-source capture.

use std::fs;
use std::path::{Path, PathBuf};

use autoheal_config::ArtifactsConfig;
use autoheal_protocols::{BrowserDriver, Instruction, WindowId};
use chrono::Local;
use tracing::{debug, warn};

use crate::error::EngineError;

/// Paths written for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Captured {
    pub screenshot: PathBuf,
    pub page_source: PathBuf,
}

/// Writes per-step artifacts under a timestamped run directory.
///
/// Capture never fails a step: when a capture cannot be taken a `.txt`
/// note with the reason is written in its place, so every PASS and FAIL
/// record carries two paths.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    run_dir: PathBuf,
    screenshots: bool,
    page_source: bool,
}

impl ArtifactStore {
    /// Create `run_<timestamp>` under the configured directory.
    pub fn create(config: &ArtifactsConfig) -> Result<Self, EngineError> {
        let run_dir = config
            .dir
            .join(format!("run_{}", Local::now().format("%Y%m%d_%H%M%S")));
        Self::in_dir(run_dir, config.screenshots, config.page_source)
    }

    pub fn in_dir(
        run_dir: impl Into<PathBuf>,
        screenshots: bool,
        page_source: bool,
    ) -> Result<Self, EngineError> {
        let run_dir = run_dir.into();
        fs::create_dir_all(&run_dir)?;
        debug!("Artifacts directory: {}", run_dir.display());
        Ok(Self {
            run_dir,
            screenshots,
            page_source,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn stem(position: usize, instruction: &Instruction) -> String {
        format!(
            "step_{}_{}",
            position,
            instruction.action.as_str().to_ascii_lowercase()
        )
    }

    /// Capture screenshot and page source of `window` for the step at 1-based `position`.
    pub async fn capture(
        &self,
        driver: &dyn BrowserDriver,
        window: Option<&WindowId>,
        position: usize,
        instruction: &Instruction,
    ) -> Captured {
        let stem = Self::stem(position, instruction);

        let screenshot = match (window, self.screenshots) {
            (_, false) => self.note(&stem, "screenshot", "screenshot capture disabled"),
            (None, true) => self.note(&stem, "screenshot", "no open window to capture"),
            (Some(window), true) => match driver.screenshot(window).await {
                Ok(png) => self.write(&format!("{}.png", stem), &png, "screenshot", &stem),
                Err(e) => self.note(&stem, "screenshot", &e.to_string()),
            },
        };

        let page_source = match (window, self.page_source) {
            (_, false) => self.note(&stem, "source", "page source capture disabled"),
            (None, true) => self.note(&stem, "source", "no open window to capture"),
            (Some(window), true) => match driver.page_source(window).await {
                Ok(html) => self.write(&format!("{}.html", stem), html.as_bytes(), "source", &stem),
                Err(e) => self.note(&stem, "source", &e.to_string()),
            },
        };

        Captured {
            screenshot,
            page_source,
        }
    }

    fn write(&self, name: &str, bytes: &[u8], kind: &str, stem: &str) -> PathBuf {
        let path = self.run_dir.join(name);
        match fs::write(&path, bytes) {
            Ok(()) => path,
            Err(e) => self.note(stem, kind, &format!("write failed: {}", e)),
        }
    }

    /// Write `<stem>_<kind>.txt` explaining a missing artifact.
    fn note(&self, stem: &str, kind: &str, reason: &str) -> PathBuf {
        let path = self.run_dir.join(format!("{}_{}.txt", stem, kind));
        if let Err(e) = fs::write(&path, format!("{} not captured: {}\n", kind, reason)) {
            warn!("Could not write artifact note {}: {}", path.display(), e);
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use autoheal_protocols::Action;

    use super::*;
    use crate::mock_driver::MockDriver;

    #[tokio::test]
    async fn test_capture_writes_png_and_html() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::in_dir(dir.path().join("run"), true, true).unwrap();
        let driver = MockDriver::with_window("main", "https://app.test/");
        let inst = Instruction::new("1", Action::Click, "Submit");

        let captured = store
            .capture(&driver, Some(&WindowId::new("main")), 1, &inst)
            .await;
        assert!(captured.screenshot.ends_with("step_1_click.png"));
        assert!(captured.page_source.ends_with("step_1_click.html"));
        assert!(fs::read(&captured.screenshot).unwrap().starts_with(b"\x89PNG"));
        assert!(fs::read_to_string(&captured.page_source).unwrap().contains("<html>"));
    }

    #[tokio::test]
    async fn test_failed_capture_leaves_note() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::in_dir(dir.path(), true, true).unwrap();
        let driver = MockDriver::with_window("main", "");
        driver.fail_screenshots();
        let inst = Instruction::new("4", Action::Verify, "Welcome");

        let captured = store
            .capture(&driver, Some(&WindowId::new("main")), 4, &inst)
            .await;
        assert!(captured.screenshot.ends_with("step_4_verify_screenshot.txt"));
        let note = fs::read_to_string(&captured.screenshot).unwrap();
        assert!(note.contains("screenshot capture failed"));
        assert!(captured.page_source.ends_with("step_4_verify.html"));
    }

    #[tokio::test]
    async fn test_no_window_still_yields_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::in_dir(dir.path(), true, false).unwrap();
        let driver = MockDriver::new();
        let inst = Instruction::new("2", Action::Open, "https://app.test/");

        let captured = store.capture(&driver, None, 2, &inst).await;
        assert!(captured.screenshot.exists());
        assert!(captured.page_source.exists());
        assert!(
            fs::read_to_string(&captured.page_source)
                .unwrap()
                .contains("disabled")
        );
    }
}
