//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small school directory and run the
//! walk and enrichment stages end-to-end against it.

use school_harvest::config::Config;
use school_harvest::crawler::{Harvester, WalkStop};
use school_harvest::record::{Group, Record};
use school_harvest::storage::{read_json, write_json_atomic};
use school_harvest::HarvestError;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `dir`, with all delays disabled
fn create_test_config(dir: &TempDir) -> Config {
    let file = |name: &str| dir.path().join(name).display().to_string();

    let mut config = Config::default();
    config.user_agent.crawler_name = "TestHarvester".to_string();
    config.http.timeout_secs = 5.0;
    config.http.retry_delay_secs = 0.0;
    config.walker.page_delay_secs = 0.0;
    config.walker.group_delay_secs = 0.0;
    config.enrichment.delay_secs = 0.0;
    config.output.groups_path = file("districts.json");
    config.output.records_path = file("SchoolsData.json");
    config.output.checkpoint_path = file("progress_checkpoint.json");
    config.output.complete_path = file("SchoolsData_Complete.json");
    config
}

fn listing_page(base: &str, schools: &[(&str, &str)], next: Option<&str>) -> String {
    let mut html = String::from("<html><body>");
    for (name, link) in schools {
        html.push_str(&format!(
            r#"<div class="catbox"><h2><a href="{}{}">{}</a></h2><p>About {}</p></div>"#,
            base, link, name, name
        ));
    }
    if let Some(next) = next {
        html.push_str(&format!(
            r#"<div class="wp-pagenavi"><a class="nextpostslink" href="{}{}">»</a></div>"#,
            base, next
        ));
    }
    html.push_str("</body></html>");
    html
}

fn detail_page(affiliation_id: &str) -> String {
    format!(
        r#"<html><body><div id="schooldetails"><table>
            <tr><td>Affiliation ID</td><td>{}</td></tr>
            <tr><td>Name of Principal</td><td>Dr. Example</td></tr>
            <tr><td>Phone/Fax</td><td>011-000</td></tr>
        </table></div></body></html>"#,
        affiliation_id
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn write_groups(config: &Config, groups: &[Group]) {
    write_json_atomic(Path::new(&config.output.groups_path), groups).unwrap();
}

#[tokio::test]
async fn test_full_harvest_single_group() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    mount_page(
        &server,
        "/district/alpha/",
        listing_page(
            &base,
            &[("S1", "/school/1/"), ("S2", "/school/2/")],
            Some("/district/alpha/page/2/"),
        ),
    )
    .await;
    mount_page(
        &server,
        "/district/alpha/page/2/",
        listing_page(&base, &[("S3", "/school/3/")], None),
    )
    .await;
    mount_page(&server, "/school/1/", detail_page("1001")).await;
    mount_page(&server, "/school/2/", detail_page("1002")).await;
    Mock::given(method("GET"))
        .and(path("/school/3/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    write_groups(
        &config,
        &[Group::new("Alpha", format!("{}/district/alpha/", base))],
    );

    let mut harvester = Harvester::new(config.clone()).unwrap();
    let report = harvester.run(false).await.unwrap();

    assert_eq!(report.total_records, 3);
    assert_eq!(report.enriched_records, 2);
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].group, "Alpha");

    let progress = report.progress.unwrap();
    assert_eq!(progress.success_count, 2);
    assert_eq!(progress.fail_count, 1);
    assert_eq!(progress.skip_count, 0);

    // Base list from the walk has no detail fields
    let base_records: Vec<Record> = read_json(Path::new(&config.output.records_path))
        .unwrap()
        .unwrap();
    assert_eq!(base_records.len(), 3);
    assert!(base_records.iter().all(|r| r.fields.is_empty()));
    assert!(base_records.iter().all(|r| r.group == "Alpha"));

    // Complete list is one flat JSON object per school
    let raw = std::fs::read_to_string(&config.output.complete_path).unwrap();
    let complete: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(complete.len(), 3);
    assert_eq!(complete[0]["school_name"], "S1");
    assert_eq!(complete[0]["school_district"], "Alpha");
    assert_eq!(complete[0]["school_description"], "About S1");
    assert_eq!(complete[0]["affiliation_id"], "1001");
    assert_eq!(complete[0]["name_of_principal"], "Dr. Example");
    assert_eq!(complete[0]["phone_fax"], "011-000");
    assert!(complete[2].get("affiliation_id").is_none());

    assert!(Path::new(&config.output.checkpoint_path).exists());
}

#[tokio::test]
async fn test_network_error_and_empty_page_fail_their_records() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    // A port nobody listens on, for a connection-level failure
    let closed = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };

    let listing = format!(
        r#"<html><body>
            <div class="catbox"><h2><a href="{base}/school/1/">S1</a></h2></div>
            <div class="catbox"><h2><a href="{closed}/school/2/">S2</a></h2></div>
            <div class="catbox"><h2><a href="{base}/school/3/">S3</a></h2></div>
        </body></html>"#
    );
    mount_page(&server, "/district/alpha/", listing).await;
    mount_page(&server, "/school/1/", detail_page("1001")).await;
    Mock::given(method("GET"))
        .and(path("/school/3/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    write_groups(
        &config,
        &[Group::new("Alpha", format!("{}/district/alpha/", base))],
    );

    let mut harvester = Harvester::new(config.clone()).unwrap();
    let report = harvester.run(false).await.unwrap();

    let progress = report.progress.unwrap();
    assert_eq!(progress.success_count, 1);
    assert_eq!(progress.fail_count, 2);
    assert_eq!(progress.skip_count, 0);
    assert_eq!(report.enriched_records, 1);

    let complete: Vec<Record> = read_json(Path::new(&config.output.complete_path))
        .unwrap()
        .unwrap();
    assert_eq!(complete.len(), 3);
    assert_eq!(complete[0].field("affiliation_id"), Some("1001"));
    assert_eq!(complete[1].field("affiliation_id"), None);
    assert_eq!(complete[2].field("affiliation_id"), None);
}

#[tokio::test]
async fn test_cyclic_pagination_terminates() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    mount_page(
        &server,
        "/loop/a/",
        listing_page(&base, &[("A", "/school/a/")], Some("/loop/b/")),
    )
    .await;
    mount_page(
        &server,
        "/loop/b/",
        listing_page(&base, &[("B", "/school/b/")], Some("/loop/a/")),
    )
    .await;

    write_groups(&config, &[Group::new("Loop", format!("{}/loop/a/", base))]);

    let mut harvester = Harvester::new(config).unwrap();
    let summary = harvester.walk().await.unwrap();

    assert_eq!(summary.records.len(), 2);
    assert_eq!(summary.groups.len(), 1);
    assert!(matches!(
        summary.groups[0].stop,
        WalkStop::CycleDetected { .. }
    ));
    assert_eq!(summary.pages_visited(), 2);
}

#[tokio::test]
async fn test_resume_skips_enriched_records() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    let mut done = Record::new("Done", format!("{}/school/done/", base), "", "Alpha");
    done.fields
        .insert("affiliation_id".to_string(), "9".to_string());
    let pending = Record::new("Pending", format!("{}/school/pending/", base), "", "Alpha");
    write_json_atomic(
        Path::new(&config.output.checkpoint_path),
        &vec![done.clone(), pending],
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/school/done/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("X")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/school/pending/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("10")))
        .expect(1)
        .mount(&server)
        .await;

    let mut harvester = Harvester::new(config.clone()).unwrap();
    let report = harvester.run(false).await.unwrap();

    let progress = report.progress.unwrap();
    assert_eq!(progress.skip_count, 1);
    assert_eq!(progress.success_count, 1);
    assert_eq!(report.enriched_records, 2);

    let complete: Vec<Record> = read_json(Path::new(&config.output.complete_path))
        .unwrap()
        .unwrap();
    assert_eq!(complete[0], done);
    assert_eq!(complete[1].field("affiliation_id"), Some("10"));

    // A second pass over the same range fetches nothing
    let mut records = harvester.resume_records(false).unwrap();
    let run = harvester.enrich(&mut records).await.unwrap();
    assert_eq!(run.progress.skip_count, 2);
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    Mock::given(method("GET"))
        .and(path("/school/flaky/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "/school/flaky/", detail_page("77")).await;
    Mock::given(method("GET"))
        .and(path("/school/gone/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    write_json_atomic(
        Path::new(&config.output.records_path),
        &vec![
            Record::new("Flaky", format!("{}/school/flaky/", base), "", "G"),
            Record::new("Gone", format!("{}/school/gone/", base), "", "G"),
            Record::new("Unlinked", "", "", "G"),
        ],
    )
    .unwrap();

    let mut harvester = Harvester::new(config).unwrap();
    let mut records = harvester.resume_records(true).unwrap();
    let run = harvester.enrich(&mut records).await.unwrap();

    assert_eq!(run.progress.success_count, 1);
    assert_eq!(run.progress.fail_count, 2);
    assert_eq!(records[0].field("affiliation_id"), Some("77"));
    assert_eq!(run.group_tallies["G"].fail, 2);
}

#[tokio::test]
async fn test_range_and_checkpoint_interval() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.enrichment.start_index = 1;
    config.enrichment.count = Some(2);
    config.enrichment.save_interval = 1;

    for i in 0..4 {
        mount_page(&server, &format!("/school/{}/", i), detail_page(&i.to_string())).await;
    }
    let records: Vec<Record> = (0..4)
        .map(|i| Record::new(format!("S{}", i), format!("{}/school/{}/", base, i), "", "G"))
        .collect();
    write_json_atomic(Path::new(&config.output.records_path), &records).unwrap();

    let mut harvester = Harvester::new(config.clone()).unwrap();
    let mut records = harvester.resume_records(false).unwrap();
    let run = harvester.enrich(&mut records).await.unwrap();

    assert_eq!(run.progress.start_index, 1);
    assert_eq!(run.progress.end_index, 3);
    assert_eq!(run.progress.success_count, 2);

    let checkpoint: Vec<Record> = read_json(Path::new(&config.output.checkpoint_path))
        .unwrap()
        .unwrap();
    assert!(checkpoint[0].fields.is_empty());
    assert_eq!(checkpoint[1].field("affiliation_id"), Some("1"));
    assert_eq!(checkpoint[2].field("affiliation_id"), Some("2"));
    assert!(checkpoint[3].fields.is_empty());
}

#[tokio::test]
async fn test_sqlite_checkpoint_and_ledger() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.output.checkpoint_path = dir.path().join("checkpoint.db").display().to_string();
    config.output.database_path = Some(dir.path().join("runs.sqlite").display().to_string());

    mount_page(&server, "/school/1/", detail_page("1")).await;
    write_json_atomic(
        Path::new(&config.output.records_path),
        &vec![Record::new("S1", format!("{}/school/1/", base), "", "G")],
    )
    .unwrap();

    let mut harvester = Harvester::new(config)
        .unwrap()
        .with_config_hash("deadbeef");
    let mut records = harvester.resume_records(false).unwrap();
    harvester.enrich(&mut records).await.unwrap();

    let resumed = harvester.resume_records(false).unwrap();
    assert_eq!(resumed[0].field("affiliation_id"), Some("1"));

    let runs = harvester.run_history(5).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].config_hash, "deadbeef");
    assert_eq!(runs[0].tally.success, 1);
}

#[tokio::test]
async fn test_missing_group_list_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    let mut harvester = Harvester::new(config).unwrap();
    let result = harvester.walk().await;

    assert!(matches!(result, Err(HarvestError::GroupList { .. })));
}
