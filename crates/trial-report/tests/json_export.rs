//! A report assembled through the [`Reporter`] and written to disk parses
//! back into the documented shape.

use std::fs;

use serde_json::Value;
use trial_core::{Failure, Outcome, TestId, TestMeta, Tick};
use trial_report::{Disposition, Reporter};

fn meta(id: u32, name: &str, tags: &[&str], max_attempts: u32) -> TestMeta {
    TestMeta {
        id: TestId(id),
        category: "doors".into(),
        name: name.into(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        required: true,
        max_attempts,
        batch: None,
    }
}

#[test]
fn written_report_matches_recorded_outcomes() {
    let mut reporter = Reporter::new();
    let opens = meta(0, "opens", &["smoke"], 2);
    let jams = meta(1, "jams", &[], 1);

    let first = reporter.record(&opens, &Outcome::Failed(Failure::new("hinge")), 1);
    assert_eq!(first, Disposition::Retry { next_attempt: 2 });
    reporter.record(&opens, &Outcome::Succeeded, 2);
    reporter.record(&jams, &Outcome::TimedOut, 1);

    let report = reporter.report(Tick(120));
    let path = std::env::temp_dir().join(format!("trial-report-{}.json", std::process::id()));
    report.write_json(&path).unwrap();
    let json: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(json["ticks"], 120);
    assert_eq!(json["passed"], false);
    assert_eq!(json["totals"]["succeeded"], 1);
    assert_eq!(json["totals"]["timed_out"], 1);

    let tests = json["tests"].as_array().unwrap();
    assert_eq!(tests.len(), 2);
    assert_eq!(tests[0]["name"], "opens");
    assert_eq!(tests[0]["status"], "succeeded");
    assert_eq!(tests[0]["attempts"], 2);
    assert_eq!(tests[1]["status"], "timed_out");

    let tags: Vec<&str> = json["by_tag"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["tag"].as_str())
        .collect();
    assert_eq!(tags, ["smoke", "untagged"]);
}
