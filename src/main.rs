//! staged-pipeline - Main Entry Point
//!
//! Runs the sample sensor pipeline: several depth sensors, a clamp stage per
//! sensor, a tracker joining one frame per sensor, and a renderer.

use anyhow::Context;
use staged_pipeline::{config, demo, logging, PipelineConfig};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(config::default_config_path);

    let config = match &config_path {
        Some(path) if path.exists() => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        _ => PipelineConfig::default(),
    };

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init(&config.logging);

    match &config_path {
        Some(path) if path.exists() => tracing::info!("Loaded configuration from {:?}", path),
        Some(path) => tracing::info!("No configuration at {:?}, using defaults", path),
        None => tracing::info!("No configuration directory, using defaults"),
    }
    config.validate().context("Invalid configuration")?;

    let capacity = config.queue.capacity();
    let mut wired = demo::build(&config.demo, capacity).context("Failed to wire pipeline")?;
    tracing::info!(
        sensors = config.demo.frames_per_sensor.len(),
        stages = wired.pipeline.len(),
        ?capacity,
        "Starting staged pipeline"
    );

    let outcome = wired.pipeline.run();
    let report = wired.pipeline.report();

    for stage in &report.stages {
        tracing::info!(
            stage = %stage.name,
            state = %stage.state,
            received = stage.received,
            emitted = stage.emitted,
            released = stage.released,
            elapsed_ms = stage.elapsed().map(|d| d.num_milliseconds()),
            "Stage summary"
        );
    }
    tracing::info!(
        rendered = wired.rendered.count(),
        expected = demo::DemoPipeline::expected_scenes(&config.demo),
        "Scenes rendered"
    );

    if let Some(path) = &config.report_path {
        let json = report.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        tracing::info!("Report written to {:?}", path);
    }

    outcome.context("Pipeline failed")?;
    Ok(())
}
