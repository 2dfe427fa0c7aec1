use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use serde::Serialize;
use serde_json::json;

use crate::config::OutputFormat;
use crate::simulator::{EventKind, RunReport};
use crate::timeline::Occupant;
use crate::utils::prelude::*;

pub fn render(format: OutputFormat, writer: impl Write, reports: &[RunReport]) -> Result<()> {
    match format {
        OutputFormat::Text => render_text(writer, reports),
        OutputFormat::Json => render_json(writer, reports),
        OutputFormat::Csv => render_csv(writer, reports),
    }
}

/// Gantt chart and result table per run
pub fn render_text(mut writer: impl Write, reports: &[RunReport]) -> Result<()> {
    for report in reports {
        let name = report.policy.to_string();
        let m = &report.metrics;

        writeln!(writer, "\n=== {} Gantt Chart ===", name)?;
        writeln!(writer, "{}", report.timeline.units().map(|o| o.to_string()).join(" "))?;
        writeln!(
            writer,
            "{}",
            report
                .timeline
                .slices()
                .iter()
                .map(|s| format!("[{}-{}) {}", s.start, s.end(), s.occupant))
                .join(", ")
        )?;

        writeln!(writer, "\n===== {} Results =====", name)?;
        writeln!(
            writer,
            "Process | Arrival | Burst | Priority | Start | Finish | Turnaround | Waiting"
        )?;
        for p in &m.processes {
            writeln!(
                writer,
                "P{:<6} | {:<7} | {:<5} | {:<8} | {:<5} | {:<6} | {:<10} | {:<7}",
                p.id.0,
                p.arrival.0,
                p.burst.0,
                p.priority,
                p.start.0,
                p.completion.0,
                p.turnaround.0,
                p.waiting.0
            )?;
        }

        writeln!(writer, "\nTotal Turnaround Time: {}", m.total_turnaround)?;
        writeln!(writer, "Average Turnaround Time: {:.2}", m.avg_turnaround)?;
        writeln!(writer, "Total Waiting Time: {}", m.total_waiting)?;
        writeln!(writer, "Average Waiting Time: {:.2}", m.avg_waiting)?;
        writeln!(writer, "Makespan: {} (idle {})", m.makespan, m.idle)?;
        writeln!(writer, "CPU Utilization: {:.1}%", m.utilization * 100.0)?;
        writeln!(writer, "====================================")?;
    }
    Ok(())
}

pub fn render_json(mut writer: impl Write, reports: &[RunReport]) -> Result<()> {
    let runs: Vec<_> = reports
        .iter()
        .map(|r| {
            json!({
                "algorithm": r.policy.algorithm(),
                "name": r.policy.to_string(),
                "timeline": r.timeline,
                "metrics": r.metrics,
            })
        })
        .collect();
    serde_json::to_writer_pretty(&mut writer, &runs)?;
    writeln!(writer)?;
    Ok(())
}

#[derive(Serialize)]
struct CsvRow {
    algorithm: &'static str,
    pid: usize,
    arrival: u64,
    burst: u64,
    priority: i64,
    start: u64,
    completion: u64,
    turnaround: u64,
    waiting: u64,
}

/// One row per process per run
pub fn render_csv(writer: impl Write, reports: &[RunReport]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for report in reports {
        let algorithm = report.policy.algorithm().abbrev();
        for p in &report.metrics.processes {
            csv.serialize(CsvRow {
                algorithm,
                pid: p.id.0,
                arrival: p.arrival.0,
                burst: p.burst.0,
                priority: p.priority,
                start: p.start.0,
                completion: p.completion.0,
                turnaround: p.turnaround.0,
                waiting: p.waiting.0,
            })?;
        }
    }
    csv.flush()?;
    Ok(())
}

fn event_line(writer: impl io::Write, val: serde_json::Value) -> Result<()> {
    event_line_with_ending(writer, val, true)
}

fn event_line_with_ending(mut writer: impl io::Write, val: serde_json::Value, ending: bool) -> Result<()> {
    serde_json::to_writer(&mut writer, &val)?;
    if ending {
        writer.write_all(b",\n")?;
    }
    Ok(())
}

/// Write all runs as a `chrome://tracing` file, one trace process per algorithm.
/// Simulated time units are written as microseconds.
pub fn render_chrome_trace(path: &Path, reports: &[RunReport], config: &impl Serialize) -> Result<()> {
    info!(path = %path.display(), "writing chrome trace");
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(b"{\"traceEvents\":[\n")?;

    for (pid, report) in reports.iter().enumerate() {
        event_line(
            &mut file,
            json!({
                "name": "process_name",
                "ph": "M",
                "pid": pid,
                "args": {
                    "name": report.policy.to_string(),
                }
            }),
        )?;
        event_line(
            &mut file,
            json!({
                "name": "process_sort_index",
                "ph": "M",
                "pid": pid,
                "args": {
                    "sort_index": pid,
                }
            }),
        )?;

        // cpu occupation on thread 0
        for slice in report.timeline.slices() {
            let (name, cat) = match slice.occupant {
                Occupant::Process(p) => (p.to_string(), "exec"),
                Occupant::Idle => ("Idle".to_owned(), "idle"),
            };
            event_line(
                &mut file,
                json!({
                    "name": name,
                    "ph": "X",
                    "cat": cat,
                    "ts": slice.start,
                    "dur": slice.duration,
                    "tid": 0,
                    "pid": pid,
                }),
            )?;
        }

        // lifetime of each process on its own thread
        for p in &report.metrics.processes {
            event_line(
                &mut file,
                json!({
                    "name": p.id.to_string(),
                    "ph": "X",
                    "cat": "lifetime",
                    "ts": p.arrival,
                    "dur": p.turnaround,
                    "tid": p.id.0 + 1,
                    "pid": pid,
                    "args": {
                        "burst": p.burst,
                        "priority": p.priority,
                        "waiting": p.waiting,
                    }
                }),
            )?;
        }

        for evt in &report.events {
            if let EventKind::Preempt { pid: p } = evt.kind {
                event_line(
                    &mut file,
                    json!({
                        "name": format!("{} preempted", p),
                        "ph": "i",
                        "cat": "preempt",
                        "ts": evt.time,
                        "tid": 0,
                        "pid": pid,
                        "s": "t",
                    }),
                )?;
            }
        }
    }

    event_line_with_ending(
        &mut file,
        json!({
            "name": "thread_name",
            "ph": "M",
            "pid": 0,
            "tid": 0,
            "args": {
                "name": "CPU"
            }
        }),
        false,
    )?;
    file.write_all(b"\n],\"config\":")?;
    serde_json::to_writer(&mut file, config)?;
    file.write_all(b"\n}")?;
    file.flush()?;
    Ok(())
}
