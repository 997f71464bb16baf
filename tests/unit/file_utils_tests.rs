/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use subalign::correction::{CorrectionReport, CorrectionReportEntry, EntryStatus};
use subalign::file_utils::FileManager;
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "exists.tmp", "test content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    Ok(())
}

/// Test that generate_output_path creates sibling paths
#[test]
fn test_generate_output_path_withValidInputs_shouldCreateSiblingPath() {
    let input_file = Path::new("/tmp/input/talk.srt");

    assert_eq!(
        FileManager::corrected_subtitle_path(input_file),
        Path::new("/tmp/input/talk.corrected.srt")
    );
    assert_eq!(FileManager::report_path(input_file), Path::new("/tmp/input/talk.report.txt"));
}

/// Test reading a subtitle file into a track
#[test]
fn test_load_track_withSampleFile_shouldParse() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "sample.srt")?;

    let track = FileManager::load_track(&path)?;
    assert_eq!(track.len(), 3);
    assert_eq!(track.cues()[2].text(), "For testing purposes.");
    Ok(())
}

/// Test that a malformed subtitle file names the file and the line
#[test]
fn test_load_track_withMalformedFile_shouldReportContext() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "bad.srt", "1\n00:00:01 --> 00:00:02\nHi\n")?;

    let error = FileManager::load_track(&path).unwrap_err();
    let message = format!("{:#}", error);
    assert!(message.contains("bad.srt"));
    assert!(message.contains("line 2"));
    Ok(())
}

/// Test loading a transcript applies normalization
#[test]
fn test_load_transcript_withMarkup_shouldNormalize() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "ref.txt", "<p>Hello</p>\n\n world\n")?;

    let transcript = FileManager::load_transcript(&path)?;
    assert_eq!(transcript.text(), "Hello world");
    Ok(())
}

/// Test that saved tracks and reports can be read back
#[test]
fn test_save_track_andReport_shouldWriteFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let track = common::track_from_texts(&["one", "two"]);
    let srt_path = temp_dir.path().join("nested").join("out.srt");
    let report_path = temp_dir.path().join("out.report.txt");
    let json_path = temp_dir.path().join("out.report.json");

    let mut report = CorrectionReport::default();
    report.push(CorrectionReportEntry {
        cue_index: 1,
        original_text: "one".to_string(),
        corrected_text: "One".to_string(),
        status: EntryStatus::Changed,
    });

    FileManager::save_track(&track, &srt_path)?;
    FileManager::save_report("1: \"one\" -> \"One\"", &report_path)?;
    FileManager::save_json_report(&report, &json_path)?;

    assert_eq!(FileManager::load_track(&srt_path)?, track);
    assert_eq!(fs::read_to_string(&report_path)?, "1: \"one\" -> \"One\"\n");
    assert!(fs::read_to_string(&json_path)?.contains("\"changed\""));
    Ok(())
}

/// Test the overwrite guard
#[test]
fn test_check_writable_withExistingFile_shouldRequireForce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let existing = common::create_test_file(temp_dir.path(), "taken.srt", "x")?;

    assert!(FileManager::check_writable(&existing, false).is_err());
    assert!(FileManager::check_writable(&existing, true).is_ok());
    assert!(FileManager::check_writable(temp_dir.path().join("free.srt"), false).is_ok());
    Ok(())
}
