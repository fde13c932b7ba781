use std::sync::Arc;

use concierge_core::config::{AppConfig, LoadOptions};
use concierge_db::{connect_with_settings, BookingLedger, FileBillingMirror, SeedDataset};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Readiness report; exits with 6 when any check fails.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 6 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.extend(check_store(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            let reason = "configuration did not load";
            checks.push(DoctorCheck::skipped("database_connectivity", reason));
            checks.push(DoctorCheck::skipped("reference_data", reason));
            checks.push(DoctorCheck::skipped("billing_mirror", reason));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Connectivity, seeded reference data and bill artifact consistency. Later
/// checks are skipped once an earlier one fails.
fn check_store(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to initialize async runtime: {error}"),
                ),
                DoctorCheck::skipped("reference_data", "the async runtime did not start"),
                DoctorCheck::skipped("billing_mirror", "the async runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let mut checks = Vec::new();
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                checks.push(DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to connect to database: {error}"),
                ));
                checks.push(DoctorCheck::skipped("reference_data", "the database is unreachable"));
                checks.push(DoctorCheck::skipped("billing_mirror", "the database is unreachable"));
                return checks;
            }
        };
        checks.push(DoctorCheck::pass(
            "database_connectivity",
            format!("connected using `{}`", config.database.url),
        ));

        let seeded = match SeedDataset::verify(&pool).await {
            Ok(verification) if verification.all_present => {
                checks.push(DoctorCheck::pass(
                    "reference_data",
                    "room categories, units and service menu match the seed dataset",
                ));
                true
            }
            Ok(verification) => {
                let failed = verification
                    .checks
                    .iter()
                    .filter_map(|(check, passed)| (!passed).then_some(*check))
                    .collect::<Vec<_>>();
                checks.push(DoctorCheck::fail(
                    "reference_data",
                    format!("missing or altered: {}; run `concierge seed`", failed.join(", ")),
                ));
                false
            }
            Err(error) => {
                checks.push(DoctorCheck::fail(
                    "reference_data",
                    format!("could not read reference data ({error}); run `concierge migrate`"),
                ));
                false
            }
        };

        if seeded {
            let mirror = Arc::new(FileBillingMirror::new(config.billing.mirror_dir.clone()));
            let ledger = BookingLedger::new(pool.clone(), mirror, config.booking.default_year);
            checks.push(match ledger.audit_mirrors().await {
                Ok(drifted) if drifted.is_empty() => DoctorCheck::pass(
                    "billing_mirror",
                    format!("bill artifacts in `{}` match the ledger", config.billing.mirror_dir.display()),
                ),
                Ok(drifted) => DoctorCheck::fail(
                    "billing_mirror",
                    format!(
                        "bill artifacts out of sync for bookings: {}",
                        drifted.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
                    ),
                ),
                Err(error) => DoctorCheck::fail("billing_mirror", error.to_string()),
            });
        } else {
            checks.push(DoctorCheck::skipped("billing_mirror", "reference data is not in place"));
        }

        pool.close().await;
        checks
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
