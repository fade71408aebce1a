use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;

use travo_core::config::{AppConfig, LoadOptions};
use travo_core::{
    ActorId, InMemoryNotificationSink, OrgTaxonomy, Requester, UnitCode,
};
use travo_db::{connect_with_settings, migrations};
use travo_service::{SubmitTravelOrder, TravelOrderService};

use crate::commands::{seed, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

/// End-to-end readiness: route a submission through the full demo chain on an
/// ephemeral in-memory database and verify the terminal order number. The
/// configured database is never touched.
pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed(|| AppConfig::load(LoadOptions::default())) {
        (elapsed_ms, Ok(config)) => {
            checks.push(pass("config_validation", elapsed_ms, "configuration loaded and validated"));
            config
        }
        (elapsed_ms, Err(error)) => {
            checks.push(fail("config_validation", elapsed_ms, error.to_string()));
            for name in ["workflow_round_trip", "order_number_shape"] {
                checks.push(skipped(name));
            }
            return finalize(checks, started.elapsed().as_millis() as u64);
        }
    };

    let format = match config.order_numbers.format() {
        Ok(format) => format,
        Err(error) => {
            checks.push(fail("workflow_round_trip", 0, error.to_string()));
            checks.push(skipped("order_number_shape"));
            return finalize(checks, started.elapsed().as_millis() as u64);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(fail("workflow_round_trip", 0, format!("runtime init failed: {error}")));
            checks.push(skipped("order_number_shape"));
            return finalize(checks, started.elapsed().as_millis() as u64);
        }
    };

    let round_trip_started = Instant::now();
    let outcome = runtime.block_on(async {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .map_err(|error| format!("ephemeral database: {error}"))?;
        migrations::run_pending(&pool).await.map_err(|error| format!("migrations: {error}"))?;

        let taxonomy = OrgTaxonomy::default_region();
        seed::seed_into(&pool, &taxonomy).await.map_err(|error| format!("seed: {error}"))?;

        let service = TravelOrderService::new(
            pool.clone(),
            Arc::new(taxonomy),
            format.clone(),
            Arc::new(InMemoryNotificationSink::default()),
        );

        let mut order = service
            .submit(SubmitTravelOrder {
                requester: Requester {
                    actor: ActorId::new("smoke-requester"),
                    unit: UnitCode::new("bayfield_center"),
                    is_unit_head: false,
                    is_top_authority: false,
                },
                prepared_by: ActorId::new("smoke-requester"),
                participants: vec![ActorId::new("smoke-requester")],
                destination: "Capital City".to_string(),
                purpose: "Smoke validation run".to_string(),
                depart_on: NaiveDate::from_ymd_opt(2026, 8, 10).ok_or("bad date")?,
                return_on: NaiveDate::from_ymd_opt(2026, 8, 12).ok_or("bad date")?,
                evidence: None,
            })
            .await
            .map_err(|error| format!("submit: {error}"))?;

        let mut hops = 0usize;
        while let Some(approver) = order.current_approver.clone() {
            hops += 1;
            if hops > 16 {
                return Err("approval chain did not terminate".to_string());
            }
            order = service
                .approve(&order.id, &approver, None, None)
                .await
                .map_err(|error| format!("approve ({approver}): {error}"))?;
        }

        if !order.status.is_finally_approved() {
            return Err(format!("unexpected terminal status `{}`", order.status.as_code()));
        }
        order.order_number.ok_or_else(|| "terminal approval assigned no number".to_string())
    });
    let round_trip_ms = round_trip_started.elapsed().as_millis() as u64;

    let number = match outcome {
        Ok(number) => {
            checks.push(pass(
                "workflow_round_trip",
                round_trip_ms,
                "submission routed through the full chain to terminal approval",
            ));
            number
        }
        Err(error) => {
            checks.push(fail("workflow_round_trip", round_trip_ms, error));
            checks.push(skipped("order_number_shape"));
            return finalize(checks, started.elapsed().as_millis() as u64);
        }
    };

    let prefix_ok = number.starts_with(&format!("{}-", config.order_numbers.prefix));
    if prefix_ok && number.ends_with("-0001") {
        checks.push(pass("order_number_shape", 0, format!("assigned `{number}`")));
    } else {
        checks.push(fail("order_number_shape", 0, format!("unexpected number `{number}`")));
    }

    finalize(checks, started.elapsed().as_millis() as u64)
}

fn timed<T>(work: impl FnOnce() -> T) -> (u64, T) {
    let started = Instant::now();
    let value = work();
    (started.elapsed().as_millis() as u64, value)
}

fn pass(name: &'static str, elapsed_ms: u64, message: impl Into<String>) -> SmokeCheck {
    SmokeCheck { name, status: SmokeStatus::Pass, elapsed_ms, message: message.into() }
}

fn fail(name: &'static str, elapsed_ms: u64, message: impl Into<String>) -> SmokeCheck {
    SmokeCheck { name, status: SmokeStatus::Fail, elapsed_ms, message: message.into() }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped because an earlier check failed".to_string(),
    }
}

fn finalize(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let all_pass = checks.iter().all(|check| check.status == SmokeStatus::Pass);
    let status = if all_pass { SmokeStatus::Pass } else { SmokeStatus::Fail };
    let summary = if all_pass {
        "smoke: end-to-end workflow checks passed".to_string()
    } else {
        "smoke: one or more checks failed".to_string()
    };

    let report = SmokeReport {
        command: "smoke",
        status,
        summary,
        total_elapsed_ms,
        checks,
    };
    let output = serde_json::to_string_pretty(&report)
        .unwrap_or_else(|error| format!("{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed: {error}\"}}"));

    CommandResult { exit_code: u8::from(!all_pass), output }
}
