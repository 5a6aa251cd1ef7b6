use shelfbot_db::fixtures::{SeedCheck, SeededTable};
use shelfbot_db::DemoCatalog;

use crate::commands::{open_migrated, prepare, CommandResult, Failure};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated(&config).await?;

        let seeded = DemoCatalog::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoCatalog::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        pool.close().await;

        let outcome: Result<Vec<SeededTable>, Failure> = if verification.all_passed {
            Ok(seeded.tables)
        } else {
            Err(("seed_verification", verification_message(&verification.checks), 6u8))
        };
        outcome
    });

    match result {
        Ok(tables) => CommandResult::success("seed", summary(&tables)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn summary(tables: &[SeededTable]) -> String {
    let total: i64 = tables.iter().map(|table| table.rows).sum();
    let lines: Vec<String> =
        tables.iter().map(|table| format!("  - {}: {} rows", table.table, table.rows)).collect();
    format!("demo catalog loaded ({total} rows):\n{}", lines.join("\n"))
}

fn verification_message(checks: &[SeedCheck]) -> String {
    let failed: Vec<String> = checks
        .iter()
        .filter(|check| !check.passed)
        .map(|check| format!("{} (expected {}, found {})", check.table, check.expected, check.actual))
        .collect();

    if failed.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for: {}", failed.join(", "))
    }
}
