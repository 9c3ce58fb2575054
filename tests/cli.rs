use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rlens_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("rlens");
    path
}

/// Three 1-star reviews on 2024-06-10 and two 5-star reviews later that week,
/// written as two concatenated batches the way the scraper appends them.
const CORPUS: &str = r#"[
  {"reviewer_name": "Ana Lopez", "date": "2024-06-10", "star_rating": "1",
   "review_text": "They froze my payout and support ignored me", "useful_count": "4",
   "source_url": "https://reviews.test/r1"},
  {"reviewer_name": "Ben Okafor", "date": "2024-06-10", "star_rating": "1",
   "review_text": "Account banned without warning, refund refused", "useful_count": "1",
   "source_url": "https://reviews.test/r2"},
  {"reviewer_name": "Cy Park", "date": "Updated Jun 10, 2024", "star_rating": "1",
   "review_text": "Support never answered my ticket about the refund", "useful_count": "",
   "source_url": "https://reviews.test/r3"}
][
  {"reviewer_name": "Dee Ross", "date": "2 days ago", "star_rating": "5",
   "review_text": "Found a great designer for my logo. Reply from Fiverr: Thanks for sharing!",
   "source_url": "https://reviews.test/r4"},
  {"reviewer_name": "Eli Moss", "date": "2024-06-13", "star_rating": "5",
   "review_text": "Fast delivery and a fair price", "useful_count": "2",
   "source_url": "https://reviews.test/r5"}
]"#;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    fs::write(data_dir.join("reviews.json"), CORPUS).unwrap();

    let config_content = format!(
        r#"[corpus]
path = "{root}/data/reviews.json"
operator_names = ["Fiverr"]

[analysis]
now = "2024-06-15T12:00:00Z"

[clustering]
threshold = 70

[state]
path = "{root}/data/state.json"
"#,
        root = root.display()
    );
    let config_path = config_dir.join("rlens.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_rlens(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rlens_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rlens binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_json(config_path: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, success) = run_rlens(config_path, args);
    assert!(success, "rlens {:?} failed: {}", args, stderr);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON ({}): {}", e, stdout))
}

fn urls(reviews: &Value) -> Vec<String> {
    reviews
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["source_url"].as_str().unwrap().trim_start_matches("https://reviews.test/").to_string())
        .collect()
}

#[test]
fn test_stats_json_covers_merged_batches() {
    let (_tmp, config_path) = setup_test_env();
    let report = run_json(&config_path, &["stats", "--json"]);

    let overview = &report["aggregates"]["overview"];
    assert_eq!(overview["total"], 5);
    assert_eq!(overview["dated"], 5);
    assert_eq!(overview["reply_count"], 1);
    assert_eq!(report["fingerprint"].as_str().unwrap().len(), 64);
    assert_eq!(report["aggregates"]["daily"].as_array().unwrap().len(), 2);
}

#[test]
fn test_stats_text_output() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_rlens(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Reviews:     5 (5 dated, 0 undated)"));
    // One of five reviews carries an operator reply.
    assert!(stdout.contains("Replies:     1 (20.0%)"), "{}", stdout);
    assert!(stdout.contains("1 Star"));
}

#[test]
fn test_cluster_rating_highest_first() {
    let (_tmp, config_path) = setup_test_env();
    let groups = run_json(&config_path, &["cluster", "--mode", "rating", "--json"]);
    let groups = groups.as_array().unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["label"], "5 Stars");
    assert_eq!(groups[0]["count"], 2);
    assert_eq!(groups[1]["label"], "1 Star");
    assert_eq!(groups[1]["count"], 3);
}

#[test]
fn test_cluster_rejects_threshold_outside_range() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_rlens(
        &config_path,
        &["cluster", "--mode", "similarity", "--threshold", "99"],
    );
    assert!(!success);
    assert!(stderr.contains("threshold"));
}

#[test]
fn test_calendar_flags_crisis_day() {
    let (_tmp, config_path) = setup_test_env();
    let report = run_json(&config_path, &["calendar", "--month", "2024-06", "--json"]);

    assert_eq!(report["crises"]["total"], 1);
    assert_eq!(report["crises"]["recent"][0]["date"], "2024-06-10");
    assert_eq!(report["crises"]["overflow"], 0);

    let cells = report["month"]["cells"].as_array().unwrap();
    assert_eq!(cells.len(), 30);
    assert_eq!(cells[9]["tone"], "crisis");
    assert_eq!(cells[12]["tone"], "positive");
    assert_eq!(report["month"]["max_count"], 3);
}

#[test]
fn test_filter_csv_to_file() {
    let (tmp, config_path) = setup_test_env();
    let out = tmp.path().join("ones.csv");
    let (_, stderr, success) = run_rlens(
        &config_path,
        &[
            "filter",
            "--rating",
            "1",
            "--format",
            "csv",
            "--output",
            out.to_str().unwrap(),
        ],
    );
    assert!(success, "filter failed: {}", stderr);

    let csv = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "Reviewer Name,Date,Rating,Review Text,Useful Count,Source URL,Has Reply"
    );
    assert_eq!(lines.len(), 4);
    assert!(lines[2].contains("\"Account banned without warning, refund refused\""));
}

#[test]
fn test_filter_text_shows_reply_body() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_rlens(&config_path, &["filter", "--has-reply", "true"]);
    assert!(success, "filter failed: {}", stderr);
    assert!(stdout.contains("    Found a great designer for my logo.\n"), "{}", stdout);
    assert!(stdout.contains("    ↳ reply: Thanks for sharing!\n"), "{}", stdout);
    assert!(stdout.ends_with("1 review(s)\n"));
}

#[test]
fn test_filter_day_override_keeps_input_order() {
    let (_tmp, config_path) = setup_test_env();
    let reviews = run_json(
        &config_path,
        &["filter", "--day", "2024-06-10", "--rating", "5", "--format", "json"],
    );
    // The day override replaces the composed filter.
    assert_eq!(urls(&reviews), vec!["r1", "r2", "r3"]);
}

#[test]
fn test_saved_search_round_trip() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rlens(
        &config_path,
        &["saved", "save", "refunds", "--search", "REFUND", "--sort", "date", "--direction", "asc"],
    );
    assert!(success, "saved save failed: {}", stderr);
    assert!(stdout.contains("Created saved search 'refunds'"));

    let listed = run_json(&config_path, &["saved", "list", "--json"]);
    assert_eq!(listed[0]["name"], "refunds");
    assert_eq!(listed[0]["spec"]["search"], "REFUND");

    let reviews = run_json(&config_path, &["filter", "--saved", "refunds", "--format", "json"]);
    assert_eq!(urls(&reviews), vec!["r2", "r3"]);

    let (_, _, success) = run_rlens(&config_path, &["saved", "delete", "refunds"]);
    assert!(success);
    let (_, stderr, success) = run_rlens(&config_path, &["filter", "--saved", "refunds"]);
    assert!(!success);
    assert!(stderr.contains("Unknown saved search"));
}

#[test]
fn test_collection_overrides_cluster_group() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_rlens(&config_path, &["collection", "create", "praise"]);
    assert!(success, "collection create failed: {}", stderr);
    let (stdout, _, success) = run_rlens(
        &config_path,
        &["collection", "add", "praise", "https://reviews.test/r5", "https://reviews.test/r5"],
    );
    assert!(success);
    assert!(stdout.contains("Added 1 of 2"));

    let reviews = run_json(
        &config_path,
        &[
            "filter",
            "--collection",
            "praise",
            "--group-mode",
            "rating",
            "--group",
            "rating-1",
            "--format",
            "json",
        ],
    );
    assert_eq!(urls(&reviews), vec!["r5"]);

    let collections = run_json(&config_path, &["collection", "list", "--json"]);
    assert_eq!(collections[0]["source_urls"].as_array().unwrap().len(), 1);

    let (_, stderr, success) = run_rlens(&config_path, &["collection", "create", "praise"]);
    assert!(!success);
    assert!(stderr.contains("already exists"));
}

#[test]
fn test_filter_group_selects_cluster_members() {
    let (_tmp, config_path) = setup_test_env();
    let reviews = run_json(
        &config_path,
        &["filter", "--group-mode", "rating", "--group", "rating-5", "--sort", "rating", "--format", "json"],
    );
    assert_eq!(urls(&reviews), vec!["r4", "r5"]);
}

#[test]
fn test_words_by_rating() {
    let (_tmp, config_path) = setup_test_env();
    let terms = run_json(&config_path, &["words", "--rating", "1", "--json"]);
    let terms = terms.as_array().unwrap();
    // Ties keep first-seen order.
    assert_eq!(terms[0]["term"], "support");
    assert_eq!(terms[0]["count"], 2);
    assert_eq!(terms[1]["term"], "refund");
    assert_eq!(terms[1]["count"], 2);
}

#[test]
fn test_missing_config_uses_defaults_with_corpus_flag() {
    let (tmp, _) = setup_test_env();
    let missing = tmp.path().join("config/absent.toml");
    let corpus = tmp.path().join("data/reviews.json");
    let (stdout, stderr, success) = run_rlens(
        &missing,
        &["--corpus", corpus.to_str().unwrap(), "cluster", "--mode", "rating", "--json"],
    );
    assert!(success, "cluster failed: {}", stderr);
    let groups: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(groups.as_array().unwrap().len(), 2);
}
