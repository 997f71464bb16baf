/*!
 * End-to-end correction workflow tests through the application controller
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use subalign::app_config::Config;
use subalign::app_controller::{Controller, CorrectionJob};
use subalign::file_utils::FileManager;
use subalign::subtitle_processor::SubtitleTrack;
use crate::common::{self, ScriptedService};

const SCENARIO_SRT: &str = "1
00:00:01,000 --> 00:00:02,000
天氣很好

2
00:00:02,500 --> 00:00:04,000
我們去公園

3
00:00:04,200 --> 00:00:06,000
非常開心
";

fn scenario_service() -> Arc<ScriptedService> {
    Arc::new(ScriptedService::with_corrections(&[
        (1, common::SCENARIO_CORRECTIONS[0]),
        (2, common::SCENARIO_CORRECTIONS[1]),
        (3, common::SCENARIO_CORRECTIONS[2]),
    ]))
}

fn test_controller() -> Result<Controller> {
    let mut config = Config::default();
    config.correction = common::fast_config(10);
    Controller::with_config(config)
}

/// Test the full workflow from files on disk to corrected outputs
#[tokio::test]
async fn test_runWithService_withScenarioFiles_shouldWriteOutputs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let transcript = common::create_test_file(temp_dir.path(), "talk.txt", common::SCENARIO_REFERENCE)?;
    let subtitles = common::create_test_file(temp_dir.path(), "talk.srt", SCENARIO_SRT)?;
    let job = CorrectionJob::new(&transcript, &subtitles);

    let controller = test_controller()?;
    let outcome = controller.run_with_service(scenario_service(), &job, CancellationToken::new()).await?;

    assert_eq!(outcome.changed_count(), 2);

    let corrected = FileManager::load_track(temp_dir.path().join("talk.corrected.srt"))?;
    let original = SubtitleTrack::parse(SCENARIO_SRT)?;
    assert_eq!(corrected.len(), original.len());
    for (a, b) in original.cues().iter().zip(corrected.cues()) {
        assert_eq!(a.timing(), b.timing());
    }
    assert_eq!(corrected.cues()[1].text(), "我們去公園玩");

    let report = fs::read_to_string(temp_dir.path().join("talk.report.txt"))?;
    assert_eq!(report.lines().count(), 2);
    assert!(report.contains("2: \"我們去公園\" -> \"我們去公園玩\""));
    Ok(())
}

/// Test that existing outputs are protected unless forced
#[tokio::test]
async fn test_runWithService_withExistingOutput_shouldRefuseWithoutForce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let transcript = common::create_test_file(temp_dir.path(), "talk.txt", common::SCENARIO_REFERENCE)?;
    let subtitles = common::create_test_file(temp_dir.path(), "talk.srt", SCENARIO_SRT)?;
    let existing = common::create_test_file(temp_dir.path(), "talk.corrected.srt", "keep me")?;
    let service = scenario_service();

    let controller = test_controller()?;
    let mut job = CorrectionJob::new(&transcript, &subtitles);
    let result = controller.run_with_service(service.clone(), &job, CancellationToken::new()).await;

    assert!(result.is_err());
    assert_eq!(service.call_count(), 0);
    assert_eq!(fs::read_to_string(&existing)?, "keep me");

    job.force = true;
    controller.run_with_service(service, &job, CancellationToken::new()).await?;
    assert_ne!(fs::read_to_string(&existing)?, "keep me");
    Ok(())
}

/// Test that a cancelled run writes nothing
#[tokio::test]
async fn test_runWithService_withCancelledToken_shouldNotWriteFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let transcript = common::create_test_file(temp_dir.path(), "talk.txt", common::SCENARIO_REFERENCE)?;
    let subtitles = common::create_test_file(temp_dir.path(), "talk.srt", SCENARIO_SRT)?;
    let job = CorrectionJob::new(&transcript, &subtitles);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let controller = test_controller()?;
    let outcome = controller.run_with_service(scenario_service(), &job, cancel).await?;

    assert!(outcome.is_cancelled());
    assert!(!job.output_path().exists());
    assert!(!job.report_path().exists());
    Ok(())
}

/// Test that malformed subtitles abort before any service call
#[tokio::test]
async fn test_runWithService_withMalformedSubtitles_shouldFailEarly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let transcript = common::create_test_file(temp_dir.path(), "talk.txt", common::SCENARIO_REFERENCE)?;
    let subtitles = common::create_test_file(temp_dir.path(), "talk.srt", "1\n00:00:02,000 --> 00:00:01,000\nbackwards\n")?;
    let job = CorrectionJob::new(&transcript, &subtitles);
    let service = scenario_service();

    let controller = test_controller()?;
    let result = controller.run_with_service(service.clone(), &job, CancellationToken::new()).await;

    assert!(result.is_err());
    assert_eq!(service.call_count(), 0);
    assert!(!job.output_path().exists());
    Ok(())
}

/// Test that the JSON report is written when requested
#[tokio::test]
async fn test_runWithService_withJsonReport_shouldWriteJson() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let transcript = common::create_test_file(temp_dir.path(), "talk.txt", common::SCENARIO_REFERENCE)?;
    let subtitles = common::create_test_file(temp_dir.path(), "talk.srt", SCENARIO_SRT)?;
    let mut job = CorrectionJob::new(&transcript, &subtitles);
    job.output = Some(temp_dir.path().join("out").join("fixed.srt"));
    job.json_report = Some(temp_dir.path().join("report.json"));

    let controller = test_controller()?;
    controller.run_with_service(scenario_service(), &job, CancellationToken::new()).await?;

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(temp_dir.path().join("report.json"))?)?;
    assert_eq!(json.as_array().map(Vec::len), Some(2));
    assert!(temp_dir.path().join("out").join("fixed.srt").exists());
    Ok(())
}

/// Test validating a subtitle file without correcting it
#[test]
fn test_validateSubtitles_withSampleFile_shouldReturnTrack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "sample.srt")?;

    let track = Controller::validate_subtitles(&path)?;
    assert_eq!(track.len(), 3);
    Ok(())
}
