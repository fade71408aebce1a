use serde::Serialize;

use travo_core::config::{AppConfig, LoadOptions};
use travo_db::repositories::SqlDirectoryStore;
use travo_db::{connect_with_settings, migrations};

use crate::commands::load_taxonomy;

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

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_taxonomy(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["taxonomy", "database_connectivity", "schema_present", "directory_staffing"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
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

fn check_taxonomy(config: &AppConfig) -> DoctorCheck {
    match load_taxonomy(config) {
        Ok(_) => DoctorCheck {
            name: "taxonomy",
            status: CheckStatus::Pass,
            details: "taxonomy loads and is cycle-free".to_string(),
        },
        Err(error) => DoctorCheck { name: "taxonomy", status: CheckStatus::Fail, details: error },
    }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            }];
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
            Ok(pool) => {
                checks.push(DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Pass,
                    details: "database reachable".to_string(),
                });
                pool
            }
            Err(error) => {
                checks.push(DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to connect to database: {error}"),
                });
                checks.push(DoctorCheck {
                    name: "schema_present",
                    status: CheckStatus::Skipped,
                    details: "skipped because the database is unreachable".to_string(),
                });
                checks.push(DoctorCheck {
                    name: "directory_staffing",
                    status: CheckStatus::Skipped,
                    details: "skipped because the database is unreachable".to_string(),
                });
                return checks;
            }
        };

        let schema_present = migrations::schema_is_applied(&pool).await.unwrap_or(false);

        if schema_present {
            checks.push(DoctorCheck {
                name: "schema_present",
                status: CheckStatus::Pass,
                details: "baseline schema is applied".to_string(),
            });
        } else {
            checks.push(DoctorCheck {
                name: "schema_present",
                status: CheckStatus::Fail,
                details: "baseline schema missing; run `travo migrate`".to_string(),
            });
            checks.push(DoctorCheck {
                name: "directory_staffing",
                status: CheckStatus::Skipped,
                details: "skipped because the schema is missing".to_string(),
            });
            pool.close().await;
            return checks;
        }

        // A request whose chain scan exhausts falls back to the top
        // authority, so an unstaffed top authority can deadlock routing.
        let top_count = SqlDirectoryStore::new(pool.clone())
            .count_active_top_authorities()
            .await
            .unwrap_or(0);

        if top_count > 0 {
            checks.push(DoctorCheck {
                name: "directory_staffing",
                status: CheckStatus::Pass,
                details: format!("{top_count} active top-authority candidate(s)"),
            });
        } else {
            checks.push(DoctorCheck {
                name: "directory_staffing",
                status: CheckStatus::Fail,
                details: "no active top-authority candidate; run `travo seed` or fix the directory"
                    .to_string(),
            });
        }

        pool.close().await;
        checks
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("  [{marker}] {} - {}", check.name, check.details));
    }
    lines.join("\n")
}

fn escape_json(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
