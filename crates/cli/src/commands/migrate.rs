use crate::commands::{open_migrated, prepare, CommandResult, Failure};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("migrate") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated(&config).await?;
        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations'",
        )
        .fetch_one(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<_, Failure>(tables)
    });

    match result {
        Ok(tables) => CommandResult::success(
            "migrate",
            format!("applied pending migrations ({tables} catalog tables present)"),
        ),
        Err(failure) => CommandResult::from_failure("migrate", failure),
    }
}
