//! Human-readable error descriptions and structured JSON error formatting.

use staircase_core::{BuildError, StaircaseError};

/// Stable process exit codes. Clap uses 2 for usage errors.
pub mod exit {
    pub const FAILURE: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const TRIAL_LIST: i32 = 4;
    pub const OBSERVER: i32 = 5;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Config,
    TrialList,
    Observer,
    Engine,
    Other,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Config => "InvalidConfig",
            Kind::TrialList => "InvalidTrialList",
            Kind::Observer => "ObserverFailed",
            Kind::Engine => "EngineError",
            Kind::Other => "Error",
        }
    }
}

fn classify(err: &eyre::Report) -> Kind {
    if err.downcast_ref::<BuildError>().is_some() {
        return Kind::Config;
    }
    if err.downcast_ref::<StaircaseError>().is_some() {
        return Kind::Engine;
    }
    let lower = err.to_string().to_ascii_lowercase();
    if lower.contains("invalid configuration") || lower.contains("config file") {
        Kind::Config
    } else if lower.contains("invalid trial list") || lower.contains("trial csv") {
        Kind::TrialList
    } else if lower.contains("observer failed") {
        Kind::Observer
    } else {
        Kind::Other
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    let root = err.root_cause().to_string();

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidId(id) => format!(
                "What happened: Sequence id {id} cannot be adaptive.\nLikely causes: A [[sequence]] entry or a trial row uses an id below 1.\nHow to fix: Use positive sequence ids for adaptive sequences."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid sequence settings ({msg}).\nLikely causes: Zero step size, non-positive divisor or reversed limits.\nHow to fix: Edit the [step] and [staircase] tables, then rerun `staircase self-check`."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<StaircaseError>() {
        return match se {
            StaircaseError::TrialIndex { .. } | StaircaseError::ForeignTrial { .. } => format!(
                "What happened: The trial list and the engine disagree ({se}).\nLikely causes: The list was edited while a run was in progress.\nHow to fix: Rerun from an unmodified trial list."
            ),
            _ => format!(
                "What happened: {se}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    match classify(err) {
        Kind::Config => format!(
            "What happened: Configuration is invalid or unreadable ({root}).\nLikely causes: Missing file, TOML syntax error, or out-of-range values.\nHow to fix: Fix the config (see `staircase self-check`) and try again."
        ),
        Kind::TrialList => {
            if root.contains("must have headers") {
                return format!(
                    "Invalid headers in trial CSV. Expected '{}'.",
                    staircase_config::TRIAL_HEADERS.join(",")
                );
            }
            format!(
                "What happened: The trial list could not be read ({root}).\nLikely causes: Wrong path, empty file, or a non-numeric cell.\nHow to fix: Check the CSV against the expected header and rerun."
            )
        }
        Kind::Observer => format!(
            "What happened: {err}.\nLikely causes: The response source stopped answering.\nHow to fix: Check the observer setup and rerun; collected trials are not estimated after this error."
        ),
        Kind::Engine | Kind::Other => {
            let msg = err.to_string();
            let cause = if root == msg {
                String::new()
            } else {
                format!(" Cause: {root}")
            };
            format!(
                "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
            )
        }
    }
}

pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match classify(err) {
        Kind::Config => exit::CONFIG,
        Kind::TrialList => exit::TRIAL_LIST,
        Kind::Observer => exit::OBSERVER,
        Kind::Engine | Kind::Other => exit::FAILURE,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": classify(err).name(),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn build_errors_are_config_errors() {
        let err = eyre::Report::new(BuildError::InvalidConfig("step size must be non-zero"));
        assert_eq!(exit_code_for_error(&err), exit::CONFIG);
        assert!(humanize(&err).contains("step size must be non-zero"));
    }

    #[test]
    fn wrapped_messages_are_classified() {
        let err: eyre::Result<()> = Err(eyre::eyre!("step.size must be finite and non-zero"));
        let err = err.wrap_err("invalid configuration").expect_err("error");
        assert_eq!(exit_code_for_error(&err), exit::CONFIG);
        assert!(humanize(&err).contains("step.size"));

        let err = eyre::eyre!("observer failed on trial 3 of sequence 1: gone");
        assert_eq!(exit_code_for_error(&err), exit::OBSERVER);
    }

    #[test]
    fn header_errors_name_the_expected_header() {
        let err: eyre::Result<()> = Err(eyre::eyre!("trial CSV must have headers 'x', got: y"));
        let err = err.wrap_err("invalid trial list").expect_err("error");
        assert!(humanize(&err).starts_with("Invalid headers in trial CSV"));
        assert_eq!(exit_code_for_error(&err), exit::TRIAL_LIST);
    }

    #[test]
    fn json_shape() {
        let err = eyre::eyre!("boom");
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).expect("json");
        assert_eq!(v["reason"], "Error");
        assert_eq!(v["exit_code"], 1);
        assert!(v["message"].as_str().is_some_and(|m| m.contains("boom")));
    }
}
