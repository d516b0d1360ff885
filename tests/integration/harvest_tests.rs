//! Integration tests for the harvester
//!
//! These tests use wiremock to stand up a mock directory site and drive the
//! full harvest over real HTTP: form loading, autocomplete enumeration,
//! searches, detail pages, the response cache and the output files.

use prefix_harvest::config::load_config;
use prefix_harvest::crawler::{HarvestOptions, Harvester};
use prefix_harvest::HarvestError;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUTOCOMPLETE_PATH: &str = "/bottin/default.aspx/GetListeNom";
const LIST_PATH: &str = "/bottin/list.aspx";
const DETAIL_PATH: &str = "/bottin/Fiche.aspx";

/// Writes a configuration for the mock site and loads it
fn create_test_config(dir: &Path, base_url: &str) -> prefix_harvest::Config {
    let config_path = dir.join("harvest.toml");
    let content = format!(
        r#"
[site]
base-url = "{base}/bottin/"
form-page = "list.aspx?lang=en"
search-endpoint = "list.aspx?lang=en"
autocomplete-endpoint = "default.aspx/GetListeNom"
name-field = "txbNom"
form-selector = "form#form1"
excluded-form-fields = ["cbxExMembres"]
results-selector = "table#GViewList"
entry-id-param = "id"

[enumeration]
alphabet = "ab"
truncation-threshold = 2

[rate-limit]
search-min-delay = 0
search-max-delay = 0
autocomplete-delays = [0]

[fetch]
max-retries = 2
retry-base-delay = 1

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[cache]
database-path = "{dir}/cache.db"

[output]
names-path = "{dir}/names.txt"
links-path = "{dir}/links.txt"
records-path = "{dir}/records.csv"

[record]
table-selector = "table#fiche"

[[record.fields]]
label = "Permit number"
column = "permit"

[[record.fields]]
label = "Status"
column = "status"
"#,
        base = base_url,
        dir = dir.display()
    );
    fs::write(&config_path, content).expect("Failed to write config");
    load_config(&config_path).expect("Failed to load config")
}

fn search_form() -> String {
    r#"<html><body>
    <form id="form1" method="post" action="list.aspx?lang=en">
        <input type="hidden" name="__VIEWSTATE" value="abc123" />
        <input type="text" name="txbNom" />
        <input type="checkbox" name="cbxExMembres" value="on" />
        <input type="submit" value="Search" />
    </form>
    </body></html>"#
        .to_string()
}

fn listing(entries: &[(&str, u32)]) -> String {
    let rows: String = entries
        .iter()
        .map(|(name, id)| {
            format!(
                r#"<tr><td><a href="Fiche.aspx?id={}&amp;lang=en">{}</a></td></tr>"#,
                id, name
            )
        })
        .collect();
    format!(
        r#"<html><body><table id="GViewList">{}</table></body></html>"#,
        rows
    )
}

fn detail_page(permit: &str, status: &str) -> String {
    format!(
        r#"<html><body><table id="fiche">
        <tr><th>Permit number:</th><td>{}</td></tr>
        <tr><th>Status</th><td>{}</td></tr>
        </table></body></html>"#,
        permit, status
    )
}

/// Mounts the search form page
async fn mount_form(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_form()))
        .mount(server)
        .await;
}

/// Mounts an autocomplete answer for one prefix
async fn mount_suggestions(server: &MockServer, prefix: &str, names: &[&str]) {
    Mock::given(method("POST"))
        .and(path(AUTOCOMPLETE_PATH))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .and(body_json(json!({ "nom": prefix })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "d": names })))
        .mount(server)
        .await;
}

/// Mounts a directory with two entries, "aa" (id 1) and "ab" (id 2)
///
/// The listing for "ab" also links entry 1, so dedup is exercised.
async fn mount_directory(server: &MockServer) {
    mount_form(server).await;

    mount_suggestions(server, "a", &["aa", "ab"]).await;
    mount_suggestions(server, "aa", &["aa"]).await;
    mount_suggestions(server, "ab", &["ab"]).await;
    Mock::given(method("POST"))
        .and(path(AUTOCOMPLETE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "d": [] })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .and(body_string_contains("__VIEWSTATE=abc123"))
        .and(body_string_contains("txbNom=aa"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing(&[("Tremblay, Marie", 1)])),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .and(body_string_contains("__VIEWSTATE=abc123"))
        .and(body_string_contains("txbNom=ab"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[
            ("Tremblay, Marie", 1),
            ("Gagnon, Luc", 2),
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .and(query_param("id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("12345", "Active")))
        .mount(server)
        .await;
}

async fn mount_detail_2(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .and(query_param("id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("67890", "Retired")))
        .mount(server)
        .await;
}

async fn count_requests(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

#[tokio::test]
async fn test_full_harvest() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    mount_detail_2(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &server.uri());

    let harvester = Harvester::new(config, HarvestOptions::default()).unwrap();
    let stats = harvester.run().await.unwrap();

    assert_eq!(stats.names, 2);
    assert_eq!(stats.queries_issued, 4);
    assert_eq!(stats.links, 2);
    assert_eq!(stats.records, 2);
    assert_eq!(stats.failures(), 0);

    // Entry 1 is linked from both listings but fetched once
    assert_eq!(count_requests(&server, DETAIL_PATH).await, 2);

    let names = fs::read_to_string(dir.path().join("names.txt")).unwrap();
    assert_eq!(names, "aa\nab\n");

    let links = fs::read_to_string(dir.path().join("links.txt")).unwrap();
    assert_eq!(links.lines().count(), 2);

    let records = fs::read_to_string(dir.path().join("records.csv")).unwrap();
    let lines: Vec<&str> = records.lines().collect();
    assert_eq!(lines[0], r#""id","name","url","permit","status""#);
    assert!(lines[1].starts_with(r#""id=1","Tremblay, Marie","#));
    assert!(lines[1].contains("12345"));
    assert!(lines[1].ends_with(r#""Active""#));
    assert!(lines[2].starts_with(r#""id=2","Gagnon, Luc","#));
}

#[tokio::test]
async fn test_rerun_replays_from_cache() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    mount_detail_2(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &server.uri());

    Harvester::new(config.clone(), HarvestOptions::default())
        .unwrap()
        .run()
        .await
        .unwrap();
    let first_run = server.received_requests().await.unwrap().len();

    let fresh = HarvestOptions {
        fresh: true,
        names_only: false,
    };
    let stats = Harvester::new(config, fresh).unwrap().run().await.unwrap();
    let second_run = server.received_requests().await.unwrap().len() - first_run;

    // Only the search form is loaded again; every other call is cached
    assert_eq!(second_run, 1);
    assert_eq!(stats.fetch.misses, 0);
    assert_eq!(stats.records, 2);
    assert_eq!(stats.waits, 1);
}

#[tokio::test]
async fn test_transient_autocomplete_failure_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(AUTOCOMPLETE_PATH))
        .and(body_json(json!({ "nom": "a" })))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_directory(&server).await;
    mount_detail_2(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &server.uri());

    let stats = Harvester::new(config, HarvestOptions::default())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(stats.failed_prefixes, 0);
    assert_eq!(stats.names, 2);
    assert_eq!(stats.records, 2);
}

#[tokio::test]
async fn test_missing_detail_page_does_not_stop_harvest() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    // Entry 2 has no detail page mock: the server answers 404

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &server.uri());

    let stats = Harvester::new(config, HarvestOptions::default())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(stats.records, 1);
    assert_eq!(stats.failed_details, 1);

    let records = fs::read_to_string(dir.path().join("records.csv")).unwrap();
    assert_eq!(records.lines().count(), 2);
}

#[tokio::test]
async fn test_unloadable_search_form_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Maintenance</body></html>"))
        .mount(&server)
        .await;
    mount_directory(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &server.uri());

    let result = Harvester::new(config, HarvestOptions::default())
        .unwrap()
        .run()
        .await;

    assert!(matches!(result, Err(HarvestError::HtmlParse { .. })));
    assert!(dir.path().join("names.txt").exists());
    assert!(!dir.path().join("records.csv").exists());
}

#[tokio::test]
async fn test_names_only() {
    let server = MockServer::start().await;
    mount_directory(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &server.uri());
    let options = HarvestOptions {
        fresh: false,
        names_only: true,
    };

    let stats = Harvester::new(config, options).unwrap().run().await.unwrap();

    assert_eq!(stats.names, 2);
    assert_eq!(count_requests(&server, LIST_PATH).await, 0);
    assert!(!dir.path().join("links.txt").exists());
}
