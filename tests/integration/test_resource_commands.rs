//! Integration tests for resource commands
//!
//! Lines go through the shell and the dispatcher; requests either stop at
//! `--dry-run` or reach a local mock appliance.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use serde_json::{json, Value};
use test_utils::{home_with_remote, home_with_remote_at, mock_appliance, shell, shell_with};

#[tokio::test]
async fn test_dry_run_list() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    let outcome = t.shell.execute("certificates list --max 5 -d").await;
    assert!(outcome.is_success());
    assert!(t
        .output()
        .contains("GET https://appliance.test/api/certificates?max=5&offset=0"));
}

#[tokio::test]
async fn test_dry_run_by_name_prints_lookup() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    let outcome = t.shell.execute("datastores remove backups -d").await;
    assert!(outcome.is_success());
    let output = t.output();
    assert!(output.contains("GET https://appliance.test/api/datastores?name=backups"));
    assert!(!output.contains("DELETE"));
}

#[tokio::test]
async fn test_dry_run_json_body() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    let outcome = t
        .shell
        .execute("schedules add nightly --cron '0 2 * * *' -O enabled=true -d --json")
        .await;
    assert!(outcome.is_success());

    let request: Value = serde_json::from_str(&t.output()).unwrap();
    assert_eq!(request["method"], "POST");
    assert_eq!(request["url"], "https://appliance.test/api/execute-schedules");
    assert_eq!(request["body"]["schedule"]["name"], "nightly");
    assert_eq!(request["body"]["schedule"]["cron"], "0 2 * * *");
}

#[tokio::test]
async fn test_unknown_remote_option() {
    let home = home_with_remote();
    let mut t = shell(home.path());

    let outcome = t.shell.execute("whoami --remote prod").await;
    assert_eq!(outcome.code, 1);
    assert!(t.errors().contains("Remote appliance 'prod' not found"));
}

#[tokio::test]
async fn test_declined_remove_exit_code() {
    let home = home_with_remote();
    let mut t = shell_with(home.path(), &[], "n\n");

    let outcome = t.shell.execute("cypher remove secret/db").await;
    assert_eq!(outcome.code, 9);
    assert!(!t.shell.is_terminated());
}

#[tokio::test]
async fn test_list_renders_table() {
    let (url, server) = mock_appliance(vec![(
        200,
        json!({
            "certificates": [
                {"id": 1, "name": "web", "domainName": "example.com", "certType": "internal", "wildcard": false},
                {"id": 2, "name": "api", "domainName": "api.example.com", "certType": "internal", "wildcard": true}
            ],
            "meta": {"offset": 0, "total": 2}
        }),
    )])
    .await;
    let home = home_with_remote_at(&url);
    let mut t = shell(home.path());

    let outcome = t.shell.execute("certificates list").await;
    assert!(outcome.is_success(), "{}", t.errors());

    let output = t.output();
    assert!(output.contains("Morpheus Certificates"));
    assert!(output.contains("example.com"));
    assert!(output.contains("api.example.com"));
    assert!(output.contains("Viewing 1-2 of 2"));

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("GET /api/certificates?"));
    assert!(requests[0]
        .to_lowercase()
        .contains("authorization: bearer token"));
}

#[tokio::test]
async fn test_get_by_name_not_found() {
    let (url, server) = mock_appliance(vec![(200, json!({"certificates": []}))]).await;
    let home = home_with_remote_at(&url);
    let mut t = shell(home.path());

    let outcome = t.shell.execute("certificates get missing").await;
    assert_eq!(outcome.code, 1);
    assert!(t.errors().contains("Certificate missing not found"));

    let requests = server.await.unwrap();
    assert!(requests[0].contains("name=missing"));
}

#[tokio::test]
async fn test_get_by_id_404() {
    let (url, server) =
        mock_appliance(vec![(404, json!({"success": false, "msg": "missing"}))]).await;
    let home = home_with_remote_at(&url);
    let mut t = shell(home.path());

    let outcome = t.shell.execute("datastores get 42").await;
    assert_eq!(outcome.code, 1);
    assert!(t.errors().contains("Datastore 42 not found"));
    server.await.unwrap();
}

#[tokio::test]
async fn test_api_error_message() {
    let (url, server) = mock_appliance(vec![(500, json!({"msg": "appliance on fire"}))]).await;
    let home = home_with_remote_at(&url);
    let mut t = shell(home.path());

    let outcome = t.shell.execute("whoami").await;
    assert_eq!(outcome.code, 1);
    assert!(t.errors().contains("appliance on fire"));
    assert!(!t.shell.is_terminated());
    server.await.unwrap();
}

#[tokio::test]
async fn test_whoami_json() {
    let user = json!({"user": {"id": 1, "username": "admin", "email": "admin@example.com"}});
    let (url, server) = mock_appliance(vec![(200, user.clone())]).await;
    let home = home_with_remote_at(&url);
    let mut t = shell(home.path());

    assert!(t.shell.execute("whoami --json").await.is_success());
    let printed: Value = serde_json::from_str(&t.output()).unwrap();
    assert_eq!(printed, user);
    server.await.unwrap();
}

#[tokio::test]
async fn test_remove_with_yes() {
    let (url, server) = mock_appliance(vec![
        (200, json!({"certificate": {"id": 7, "name": "web"}})),
        (200, json!({"success": true})),
    ])
    .await;
    let home = home_with_remote_at(&url);
    let mut t = shell(home.path());

    let outcome = t.shell.execute("certificates remove 7 -y").await;
    assert!(outcome.is_success(), "{}", t.errors());
    assert!(t.output().contains("Certificate 'web' removed"));

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("GET /api/certificates/7 "));
    assert!(requests[1].starts_with("DELETE /api/certificates/7 "));
}

#[tokio::test]
async fn test_incident_close_sends_status() {
    let (url, server) = mock_appliance(vec![
        (200, json!({"incident": {"id": 31, "name": "disk full", "status": "open"}})),
        (200, json!({"incident": {"id": 31, "status": "closed"}})),
    ])
    .await;
    let home = home_with_remote_at(&url);
    let mut t = shell(home.path());

    let outcome = t.shell.execute("incidents close 31 -y").await;
    assert!(outcome.is_success(), "{}", t.errors());
    assert!(t.output().contains("Incident 31 is now closed"));

    let requests = server.await.unwrap();
    assert!(requests[1].starts_with("PUT /api/monitoring/incidents/31 "));
    assert!(requests[1].contains(r#""status":"closed""#));
}
