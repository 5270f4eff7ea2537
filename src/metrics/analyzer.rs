//! Files for the plotting side: CSV, JSON summaries and whitespace-separated
//! `.dat` columns that gnuplot or pgfplots read as-is.

use super::logger::MetricsLogger;
use super::sweep::SweepReport;
use super::{RunSummary, TracePoint};
use crate::client::{Client, ClientStatus};
use crate::simulation::Simulation;
use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Flat per-client row with the derived times filled in.
#[derive(Debug, Clone, Serialize)]
pub struct ClientRow {
    pub id: u64,
    pub arrival_time: f64,
    pub service_time: f64,
    pub start_service_time: Option<f64>,
    pub end_service_time: Option<f64>,
    pub wait_time: Option<f64>,
    pub finished: bool,
}

impl From<&Client> for ClientRow {
    fn from(c: &Client) -> Self {
        Self {
            id: c.id.index() as u64,
            arrival_time: c.arrival_time,
            service_time: c.service_time,
            start_service_time: c.start_service_time(),
            end_service_time: c.end_service_time(),
            wait_time: c.wait_time(),
            finished: c.status() == ClientStatus::Finished,
        }
    }
}

pub fn write_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub fn trace_plot_data(trace: &[TracePoint]) -> String {
    let mut out = String::from("# time mean_wait\n");
    for p in trace {
        let _ = writeln!(out, "{:.4} {:.4}", p.time, p.mean_wait);
    }
    out
}

pub fn sweep_plot_data(report: &SweepReport) -> String {
    let mut out = String::from("# agents mean_wait percent_exceeding\n");
    for p in &report.points {
        let _ = writeln!(out, "{} {:.4} {:.2}", p.agents, p.mean_wait, p.percent_exceeding);
    }
    out
}

/// Writes trace, clients, summary and plot data for one run into `dir`.
pub fn save_run_results(sim: &Simulation, summary: &RunSummary, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let base = dir.join(format!("{}_{}", summary.name, timestamp));
    let path = |suffix: &str| PathBuf::from(format!("{}{}", base.display(), suffix));

    let trace_path = path("_trace.csv");
    MetricsLogger::new(&trace_path)?.log_batch(sim.trace())?;
    info!("Trace saved to: {}", trace_path.display());

    let clients_path = path("_clients.csv");
    let rows: Vec<ClientRow> = sim.clients().iter().map(ClientRow::from).collect();
    MetricsLogger::new(&clients_path)?.log_batch(&rows)?;
    info!("Client timings saved to: {}", clients_path.display());

    let summary_path = path("_summary.json");
    write_json(summary, &summary_path)?;
    info!("Summary saved to: {}", summary_path.display());

    let plot_path = path("_trace.dat");
    std::fs::write(&plot_path, trace_plot_data(sim.trace()))?;
    info!("Plot data saved to: {}", plot_path.display());

    Ok(vec![trace_path, clients_path, summary_path, plot_path])
}

pub fn save_sweep_results(report: &SweepReport, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");

    let json_path = dir.join(format!("sweep_{timestamp}.json"));
    write_json(report, &json_path)?;
    info!("Sweep saved to: {}", json_path.display());

    let csv_path = dir.join(format!("sweep_{timestamp}.csv"));
    MetricsLogger::new(&csv_path)?.log_batch(&report.points)?;

    let plot_path = dir.join(format!("sweep_{timestamp}.dat"));
    std::fs::write(&plot_path, sweep_plot_data(report))?;
    info!("Plot data saved to: {}", plot_path.display());

    Ok(vec![json_path, csv_path, plot_path])
}
