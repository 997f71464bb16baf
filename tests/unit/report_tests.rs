/*!
 * Tests for report rendering and serialization
 */

use subalign::correction::{
    CorrectionReport, CorrectionReportEntry, EntryStatus, NO_CHANGES, RenderOptions, render, render_with,
};

fn entry(cue_index: usize, original: &str, corrected: &str, status: EntryStatus) -> CorrectionReportEntry {
    CorrectionReportEntry {
        cue_index,
        original_text: original.to_string(),
        corrected_text: corrected.to_string(),
        status,
    }
}

fn sample_report() -> CorrectionReport {
    let mut report = CorrectionReport::default();
    report.push(entry(1, "天氣很好", "天氣非常好", EntryStatus::Changed));
    report.push(entry(2, "我們去公園", "我們去公園", EntryStatus::Unchanged));
    report.push(entry(3, "非常開心", "非常開心", EntryStatus::Unresolved));
    report
}

/// Test that the default rendering hides verified-unchanged cues
#[test]
fn test_render_withMixedReport_shouldHideUnchanged() {
    let rendered = render(&sample_report());
    assert_eq!(
        rendered,
        "1: \"天氣很好\" -> \"天氣非常好\"\n3: \"非常開心\" -> kept due to failure"
    );
}

/// Test that unchanged cues can be listed on request
#[test]
fn test_renderWith_includeUnchanged_shouldListAllEntries() {
    let rendered = render_with(&sample_report(), RenderOptions { include_unchanged: true });
    assert_eq!(rendered.lines().count(), 3);
    assert!(rendered.contains("2: \"我們去公園\" (unchanged)"));
}

/// Test that an empty report is never rendered as an empty string
#[test]
fn test_render_withNoEntries_shouldUseSentinel() {
    let rendered = render(&CorrectionReport::default());
    assert_eq!(rendered, NO_CHANGES);
    assert!(!rendered.is_empty());
}

/// Test the entry counters
#[test]
fn test_count_withMixedReport_shouldCountByStatus() {
    let report = sample_report();
    assert_eq!(report.count(EntryStatus::Changed), 1);
    assert_eq!(report.count(EntryStatus::Unchanged), 1);
    assert_eq!(report.count(EntryStatus::Unresolved), 1);
    assert!(report.entries()[0].changed());
    assert!(report.entries()[2].is_unresolved());
}

/// Test the JSON shape consumed downstream
#[test]
fn test_toJson_withMixedReport_shouldUseLowercaseStatus() {
    let json = sample_report().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value[0]["cue_index"], 1);
    assert_eq!(value[0]["status"], "changed");
    assert_eq!(value[1]["status"], "unchanged");
    assert_eq!(value[2]["status"], "unresolved");
    assert_eq!(value[0]["corrected_text"], "天氣非常好");
}

/// Test that quotes and arrows inside cue text stay unambiguous
#[test]
fn test_render_withQuotesAndArrowInText_shouldEscapeQuotes() {
    let mut report = CorrectionReport::default();
    report.push(entry(7, "he said \"go\" -> left", "he said \"go\" to the left", EntryStatus::Changed));
    report.push(entry(8, "say \"hi\"", "say \"hi\"", EntryStatus::Unresolved));

    let rendered = render(&report);
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines[0], r#"7: "he said \"go\" -> left" -> "he said \"go\" to the left""#);
    assert_eq!(lines[1], r#"8: "say \"hi\"" -> kept due to failure"#);
}
