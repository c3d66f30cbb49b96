//! Simulated runs, offline estimation and result output.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use staircase_config::{Config, TrialRow};
use staircase_core::trial::interleaved;
use staircase_core::{
    Estimate, FileProtocol, RunCfg, RunSummary, SequenceRegistry, TrialRecord, run_trials,
};
use staircase_sim::{Keys, PsychometricObserver};
use staircase_traits::{Observer, ProtocolSink};

/// Command-line overrides for `simulate`.
#[derive(Debug, Default, Clone)]
pub struct SimulateArgs {
    pub trials: Option<u32>,
    pub seed: Option<u64>,
    pub threshold: Option<f64>,
    pub spread: Option<f64>,
    pub out: Option<PathBuf>,
    pub protocol: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunOutput {
    pub summary: Option<RunSummary>,
    pub estimates: Vec<Estimate>,
}

fn registry_for(cfg: &Config, protocol: Option<&Path>) -> SequenceRegistry {
    let registry = SequenceRegistry::new(RunCfg::from(cfg));
    match protocol {
        Some(path) => {
            let path = path.to_path_buf();
            registry.with_protocol_factory(Box::new(move |_: i64| -> Box<dyn ProtocolSink> {
                Box::new(FileProtocol::new(path.clone()))
            }))
        }
        None => registry,
    }
}

/// Drive every configured sequence with a seeded psychometric observer,
/// then estimate whatever was collected (also after an interrupt).
pub fn simulate(cfg: &Config, args: &SimulateArgs, shutdown: &Arc<AtomicBool>) -> eyre::Result<RunOutput> {
    let sim = &cfg.simulation;
    let keys = Keys {
        yes: cfg.responses.yes,
        no: cfg.responses.no,
    };
    let mut observer = PsychometricObserver::new(
        args.threshold.unwrap_or(sim.threshold),
        args.spread.unwrap_or(sim.spread),
        args.seed.unwrap_or(sim.seed),
        keys,
    )
    .map_err(eyre::Report::new)
    .wrap_err("invalid configuration: simulated observer")?;
    simulate_with(cfg, args, &mut observer, shutdown)
}

/// `simulate` with any observer answering the trials.
pub fn simulate_with<O: Observer + ?Sized>(
    cfg: &Config,
    args: &SimulateArgs,
    observer: &mut O,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<RunOutput> {
    let per_sequence = args.trials.unwrap_or(cfg.simulation.trials_per_sequence);
    if per_sequence == 0 {
        eyre::bail!("invalid configuration: --trials must be >= 1");
    }

    let mut registry = registry_for(cfg, args.protocol.as_deref());
    let starts: Vec<(i64, f64, f64)> = cfg
        .simulation
        .sequences
        .iter()
        .map(|&id| {
            let s = registry.run_cfg().sequence(id);
            (id, s.start_value, s.start_divisor)
        })
        .collect();
    let mut trials = interleaved(&starts, per_sequence);

    tracing::info!(
        sequences = starts.len(),
        per_sequence,
        trials = trials.len(),
        "simulation start"
    );
    let summary = run_trials(&mut registry, &mut trials, observer, shutdown)?;
    let estimates = registry.estimate_all(&mut trials)?;

    if let Some(out) = &args.out {
        let rows: Vec<TrialRow> = trials.iter().map(TrialRow::from).collect();
        staircase_config::write_trials_csv(out, &rows)?;
        tracing::info!(path = %out.display(), rows = rows.len(), "trial list written");
    }

    Ok(RunOutput {
        summary: Some(summary),
        estimates,
    })
}

/// Estimate every adaptive sequence of a recorded trial list.
pub fn estimate_file(cfg: &Config, path: &Path) -> eyre::Result<RunOutput> {
    let rows = staircase_config::load_trials_csv(path).wrap_err("invalid trial list")?;
    let mut trials: Vec<TrialRecord> = rows.into_iter().map(TrialRecord::from).collect();
    let mut registry = registry_for(cfg, None);
    let estimates = registry.estimate_all(&mut trials)?;
    Ok(RunOutput {
        summary: None,
        estimates,
    })
}

fn estimate_json(e: &Estimate) -> serde_json::Value {
    serde_json::json!({
        "sequence_id": e.sequence_id,
        "method": e.method.name(),
        "results": e.results,
        "n": e.n,
        "goodness_of_fit": e.goodness_of_fit,
        "diagnostics": e.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
    })
}

fn summary_json(s: &RunSummary) -> serde_json::Value {
    serde_json::json!({
        "presented": s.presented,
        "skipped": s.skipped,
        "stopped": s.stopped,
        "exhausted": s.exhausted,
        "interrupted": s.interrupted,
    })
}

fn fmt_results(results: &[f64]) -> String {
    results
        .iter()
        .map(|v| format!("{v:.4}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the output either as JSON lines or as plain text.
pub fn render(out: &RunOutput, json: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(out.estimates.len() + 1);
    if json {
        lines.extend(out.estimates.iter().map(|e| estimate_json(e).to_string()));
        if let Some(s) = &out.summary {
            lines.push(serde_json::json!({ "summary": summary_json(s) }).to_string());
        }
        return lines;
    }
    for e in &out.estimates {
        let mut line = format!(
            "sequence {}: {} n={} results=[{}]",
            e.sequence_id,
            e.method,
            e.n,
            fmt_results(&e.results)
        );
        if let Some(gof) = e.goodness_of_fit {
            line.push_str(&format!(" gof={gof:.4}"));
        }
        lines.push(line);
        lines.extend(e.errors.iter().map(|err| format!("  note: {err}")));
    }
    if let Some(s) = &out.summary {
        lines.push(format!(
            "presented {} trials, stopped {:?}, exhausted {:?}{}",
            s.presented,
            s.stopped,
            s.exhausted,
            if s.interrupted { " (interrupted)" } else { "" }
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deterministic_cfg() -> Config {
        let cfg = staircase_config::load_toml(
            r#"
[staircase]
start_value = 5.0

[simulation]
sequences = [1, 2]
trials_per_sequence = 40
threshold = 3.0
spread = 0.0
"#,
        )
        .expect("parse");
        cfg.validate().expect("valid");
        cfg
    }

    #[test]
    fn simulate_estimates_every_sequence() {
        let cfg = deterministic_cfg();
        let shutdown = Arc::new(AtomicBool::new(false));
        let out = simulate(&cfg, &SimulateArgs::default(), &shutdown).expect("simulate");
        assert_eq!(out.estimates.len(), 2);
        for e in &out.estimates {
            assert!((e.results[0] - 2.75).abs() < 1e-9, "{e:?}");
        }
        let summary = out.summary.expect("summary");
        assert!(!summary.interrupted);
        assert_eq!(summary.stopped.len(), 2);
    }

    #[test]
    fn interrupted_run_still_estimates() {
        let cfg = deterministic_cfg();
        let shutdown = Arc::new(AtomicBool::new(true));
        let out = simulate(&cfg, &SimulateArgs::default(), &shutdown).expect("simulate");
        let summary = out.summary.as_ref().expect("summary");
        assert!(summary.interrupted);
        assert_eq!(summary.presented, 0);
        assert_eq!(out.estimates.len(), 2);
        assert!(out.estimates.iter().all(|e| e.results[0].is_nan()));
    }

    /// Answers yes and raises the shutdown flag after `left` answers.
    struct InterruptAfter {
        left: usize,
        shutdown: Arc<AtomicBool>,
    }

    impl Observer for InterruptAfter {
        fn respond(
            &mut self,
            _sequence_id: i64,
            _parameter_value: f64,
        ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
            self.left = self.left.saturating_sub(1);
            if self.left == 0 {
                self.shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
            }
            Ok(1)
        }
    }

    #[test]
    fn interrupted_tail_mean_uses_presented_trials_only() {
        let cfg = staircase_config::load_toml(
            r#"
[staircase]
start_value = 5.0
stopping_rule = "dont_stop"
result_method = "tail_mean"

[simulation]
sequences = [1]
trials_per_sequence = 10
"#,
        )
        .expect("parse");
        cfg.validate().expect("valid");
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut observer = InterruptAfter {
            left: 3,
            shutdown: Arc::clone(&shutdown),
        };
        let out = simulate_with(&cfg, &SimulateArgs::default(), &mut observer, &shutdown)
            .expect("simulate");
        let summary = out.summary.as_ref().expect("summary");
        assert!(summary.interrupted);
        assert_eq!(summary.presented, 3);
        // shown: 5.0, 4.0, 3.0
        assert_eq!(out.estimates[0].n, 3);
        assert_eq!(out.estimates[0].results, vec![4.0, 1.0]);
    }

    #[test]
    fn json_lines_carry_method_names() {
        let cfg = deterministic_cfg();
        let shutdown = Arc::new(AtomicBool::new(false));
        let out = simulate(&cfg, &SimulateArgs::default(), &shutdown).expect("simulate");
        let lines = render(&out, true);
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).expect("json");
        assert_eq!(first["method"], "turnpoint_mean");
        assert_eq!(first["sequence_id"], 1);
        let last: serde_json::Value = serde_json::from_str(&lines[2]).expect("json");
        assert_eq!(last["summary"]["interrupted"], false);
    }
}
