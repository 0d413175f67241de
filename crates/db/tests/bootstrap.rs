use sqlx::PgPool;

/// Connect, migrate, verify the queue lookup table is seeded.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    eggbank_db::health_check(&pool).await.unwrap();

    let names: Vec<(i16, String)> = sqlx::query_as("SELECT id, name FROM task_statuses ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    let names: Vec<&str> = names.iter().map(|(_, n)| n.as_str()).collect();
    assert_eq!(names, ["pending", "running", "completed", "failed"]);
}

/// The documents table exists and starts empty.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_documents_table_exists(pool: PgPool) {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM documents")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}
