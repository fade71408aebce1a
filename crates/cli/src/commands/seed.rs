use chrono::Utc;

use travo_core::config::{AppConfig, LoadOptions};
use travo_core::{ActorId, ApproverCandidate, OrgTaxonomy, UnitCode};
use travo_db::repositories::SqlDirectoryStore;
use travo_db::{connect_with_settings, migrations};

use crate::commands::{load_taxonomy, CommandResult};

/// Deterministic demo directory: one head per unit in the built-in region
/// plus the Regional Director. Safe to re-run; rows are upserted.
pub(crate) fn demo_candidates() -> Vec<ApproverCandidate> {
    let now = Utc::now();
    let head = |id: &str, unit: &str, name: &str| ApproverCandidate {
        id: ActorId::new(id),
        full_name: name.to_string(),
        unit: Some(UnitCode::new(unit)),
        is_unit_head: true,
        is_top_authority: false,
        active: true,
        created_at: now,
        updated_at: now,
    };

    let mut candidates = vec![
        head("u-bayfield-head", "bayfield_center", "Alon Reyes"),
        head("u-lakeside-head", "lakeside_center", "Mira Santos"),
        head("u-hillcrest-head", "hillcrest_center", "Teo Villanueva"),
        head("u-harbor-head", "harbor_po", "Carmen Dizon"),
        head("u-summit-head", "summit_po", "Ramon Aquino"),
        head("u-operations-chief", "operations_division", "Lucia Ferrer"),
        head("u-finance-chief", "finance_admin_division", "Benito Cruz"),
    ];
    candidates.push(ApproverCandidate {
        id: ActorId::new("u-regional-director"),
        full_name: "Isabel Navarro".to_string(),
        unit: None,
        is_unit_head: false,
        is_top_authority: true,
        active: true,
        created_at: now,
        updated_at: now,
    });
    candidates
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let taxonomy = match load_taxonomy(&config) {
        Ok(taxonomy) => taxonomy,
        Err(error) => return CommandResult::failure("seed", "taxonomy", error, 6),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seeded = seed_into(&pool, &taxonomy)
            .await
            .map_err(|error| ("seed", error, 6u8))?;
        pool.close().await;
        Ok::<usize, (&'static str, String, u8)>(seeded)
    });

    match result {
        Ok(seeded) => {
            CommandResult::success("seed", format!("seeded {seeded} directory candidates"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

pub(crate) async fn seed_into(
    pool: &travo_db::DbPool,
    taxonomy: &OrgTaxonomy,
) -> Result<usize, String> {
    let candidates = demo_candidates();

    for candidate in &candidates {
        if let Some(unit) = &candidate.unit {
            if !taxonomy.contains(unit) {
                return Err(format!(
                    "seed candidate `{}` references unit `{unit}` missing from the taxonomy",
                    candidate.id,
                ));
            }
        }
    }

    let store = SqlDirectoryStore::new(pool.clone());
    for candidate in &candidates {
        store.save(candidate.clone()).await.map_err(|error| error.to_string())?;
    }
    Ok(candidates.len())
}
