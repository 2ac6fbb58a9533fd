use std::time::Duration;

use clickhouse_backup_client::{BackupRunner, Database, DatabaseError, HttpDatabase};
use serde_json::json;
use wiremock::matchers::{body_string, body_string_contains, header, method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn compact(rows: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "meta": [],
        "data": rows,
        "rows": 1,
    }))
}

#[tokio::test]
async fn decodes_rows_and_sends_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("default_format", "JSONCompact"))
        .and(header("X-ClickHouse-User", "backup"))
        .and(header("X-ClickHouse-Key", "hunter2"))
        .and(body_string("SELECT 1, 'a'"))
        .respond_with(compact(json!([[1, "a"]])))
        .mount(&server)
        .await;

    let db = HttpDatabase::with_url(server.uri(), "backup", "hunter2");
    let rows = db.execute("SELECT 1, 'a'", &[]).await.expect("rows");
    assert_eq!(rows, vec![vec![json!(1), json!("a")]]);
}

#[tokio::test]
async fn binds_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("param_id", "abc"))
        .respond_with(compact(json!([])))
        .mount(&server)
        .await;

    let db = HttpDatabase::with_url(server.uri(), "default", "");
    let rows = db
        .execute("SELECT 1 WHERE {id:String} = 'abc'", &[("id", "abc")])
        .await
        .expect("rows");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn server_errors_carry_the_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Code: 62. Syntax error\n"))
        .mount(&server)
        .await;

    let db = HttpDatabase::with_url(server.uri(), "default", "");
    match db.execute("SELEC 1", &[]).await {
        Err(DatabaseError::Server { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Code: 62. Syntax error");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn full_backup_round_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("ASYNC"))
        .respond_with(compact(json!([["e3b0c442", "CREATING_BACKUP"]])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("system.backups"))
        .and(query_param("param_id", "e3b0c442"))
        .respond_with(compact(json!([["File('x.zip')", "BACKUP_CREATED", ""]])))
        .mount(&server)
        .await;

    let db = HttpDatabase::with_url(server.uri(), "default", "");
    let created = BackupRunner::new(&db)
        .poll_interval(Duration::ZERO)
        .run("BACKUP ALL EXCEPT DATABASES system TO File('x.zip')")
        .await
        .expect("backup created");
    assert_eq!(created.id.0, "e3b0c442");
    assert_eq!(created.name, "File('x.zip')");
}
