//! One-shot commands: run, elements, check-config.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use autoheal_cdp::CdpDriver;
use autoheal_config::{Config, ConfigValidator};
use autoheal_engine::{
    ArtifactStore, JsonFileSink, RunControl, RunSession, RunSummary, StepController,
    list_current_elements, load_instructions,
};
use autoheal_protocols::BrowserDriver;
use tracing::{error, info, warn};

/// Connect to the configured browser.
pub(crate) async fn connect(
    config: &Config,
) -> Result<Arc<dyn BrowserDriver>, Box<dyn std::error::Error>> {
    let driver = CdpDriver::connect(&config.browser).await?;
    Ok(Arc::new(driver))
}

/// Execute an instruction file against the browser.
///
/// Ctrl-C requests a cooperative stop; the remaining steps are recorded as
/// STOPPED and the results file is still written.
pub(crate) async fn run_file(
    config: Config,
    instructions: &Path,
    results: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let steps = load_instructions(instructions)?;
    info!("Loaded {} step(s) from {}", steps.len(), instructions.display());

    let driver = connect(&config).await?;
    let store = ArtifactStore::create(&config.artifacts)?;
    let results = results.unwrap_or_else(|| store.run_dir().join("results.json"));

    let control = Arc::new(RunControl::new(config.run.pause_poll()));
    let stopper = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current step");
            stopper.stop();
        }
    });

    let config = Arc::new(config);
    let controller =
        StepController::new(&config, store).with_sink(JsonFileSink::new(results.clone()));
    let mut session = RunSession::new(driver, config.clone(), control);
    let summary = controller.run(&mut session, &steps).await?;

    print_summary(&summary);
    info!("Results written to {}", results.display());

    if let Some(reason) = &summary.aborted {
        error!("Run aborted: {}", reason);
        return Err(format!("run aborted: {}", reason).into());
    }
    if summary.failed > 0 {
        return Err(format!("{} of {} step(s) failed", summary.failed, summary.total).into());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    for record in &summary.records {
        println!(
            "{:>4}  {:<10} {:<8} {}",
            record.step,
            record.action.to_string(),
            record.status.to_string(),
            record.remarks
        );
    }
    println!(
        "\n{} step(s): {} passed, {} failed, {} skipped, {} stopped",
        summary.total, summary.passed, summary.failed, summary.skipped, summary.stopped
    );
}

/// Print the element listing of the focused window.
pub(crate) async fn list_elements(
    config: Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let driver = connect(&config).await?;
    let elements = list_current_elements(driver.as_ref(), &config.resolution).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&elements)?);
        return Ok(());
    }
    for element in &elements {
        println!(
            "{:<9} {:<10} {:<40} {}{}",
            element.kind,
            element.tag,
            element.description,
            element.context,
            if element.visible { "" } else { " (hidden)" }
        );
    }
    let window = elements.first().map(|e| e.window.as_str()).unwrap_or("-");
    println!("\n{} element(s) in window {}", elements.len(), window);
    Ok(())
}

/// Validate `config`, printing errors and warnings.
pub(crate) fn check_config(config: &Config, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let result = ConfigValidator::validate(config)?;

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if result.is_valid() {
        println!("{}: ok", path.display());
        Ok(())
    } else {
        Err(format!("{} error(s) in {}", result.errors.len(), path.display()).into())
    }
}
