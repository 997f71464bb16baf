/*!
 * Tests for reconciliation and the end-to-end correction pipeline
 */

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use subalign::app_config::CorrectionConfig;
use subalign::correction::{
    BatchProgress, CorrectionEngine, CorrectionResponse, EntryStatus, NO_CHANGES, RunHooks, RunStatus, correct, render,
};
use subalign::errors::{CorrectionError, ProviderError};
use crate::common::{self, ScriptedService};

/// Scenario: two cues corrected, one verified unchanged
#[tokio::test]
async fn test_correct_withScenarioTrack_shouldUpdateTwoCues() {
    common::init_test_logging();
    let track = common::track_from_texts(&common::SCENARIO_CUES);
    let reference = common::reference(common::SCENARIO_REFERENCE);
    let service = ScriptedService::with_corrections(&[
        (1, common::SCENARIO_CORRECTIONS[0]),
        (2, common::SCENARIO_CORRECTIONS[1]),
        (3, common::SCENARIO_CORRECTIONS[2]),
    ]);
    let config = CorrectionConfig { report_unchanged: true, ..common::fast_config(10) };

    let outcome = correct(&track, &reference, &config, &service, &RunHooks::new()).await.unwrap();

    assert_eq!(service.call_count(), 1);
    let corrected = outcome.corrected_track.cues();
    assert_eq!(corrected.len(), 3);
    for (original, fixed) in track.cues().iter().zip(corrected) {
        assert_eq!(original.timing(), fixed.timing());
        assert_eq!(original.index, fixed.index);
    }
    let texts: Vec<String> = corrected.iter().map(|c| c.text()).collect();
    assert_eq!(texts, common::SCENARIO_CORRECTIONS);

    let statuses: Vec<(usize, EntryStatus)> = outcome.report.entries()
        .iter()
        .map(|e| (e.cue_index, e.status))
        .collect();
    assert_eq!(statuses, vec![
        (1, EntryStatus::Changed),
        (2, EntryStatus::Changed),
        (3, EntryStatus::Unchanged),
    ]);

    let rendered = render(&outcome.report);
    assert_eq!(rendered.lines().count(), 2);
    assert!(!rendered.contains(NO_CHANGES));
    assert!(rendered.starts_with("1: \"天氣很好\" -> \"天氣非常好\""));
}

/// Test that unchanged cues are left out of the report by default
#[tokio::test]
async fn test_correct_withDefaultConfig_shouldOmitUnchangedEntries() {
    let track = common::track_from_texts(&common::SCENARIO_CUES);
    let reference = common::reference(common::SCENARIO_REFERENCE);
    let service = ScriptedService::with_corrections(&[(1, "天氣非常好")]);

    let outcome = correct(&track, &reference, &common::fast_config(10), &service, &RunHooks::new())
        .await
        .unwrap();

    assert_eq!(outcome.report.len(), 1);
    assert!(outcome.report.entries()[0].changed());
}

/// Test idempotence when the service echoes its input
#[tokio::test]
async fn test_correct_withEchoService_shouldReproduceTrack() {
    let track = common::numbered_track(25);
    let reference = common::reference("cue one, cue two, and so on until twenty five.");
    let service = ScriptedService::echo();

    let outcome = correct(&track, &reference, &common::fast_config(4), &service, &RunHooks::new())
        .await
        .unwrap();

    assert_eq!(outcome.corrected_track, track);
    assert_eq!(outcome.changed_count(), 0);
    assert_eq!(render(&outcome.report), NO_CHANGES);
    assert_eq!(outcome.batches_total, 7);
    assert_eq!(outcome.batches_completed, 7);
    assert_eq!(outcome.status, RunStatus::Completed);
}

/// Test that whitespace-only differences do not count as changes
#[tokio::test]
async fn test_correct_withPaddedEcho_shouldNotReportChange() {
    let track = common::track_from_texts(&["hello"]);
    let reference = common::reference("hello");
    let service = ScriptedService::with_corrections(&[(1, "  hello \n")]);

    let outcome = correct(&track, &reference, &common::fast_config(10), &service, &RunHooks::new())
        .await
        .unwrap();

    assert_eq!(outcome.changed_count(), 0);
}

/// Test fail-soft behaviour when one batch gets a wrong item count
#[tokio::test]
async fn test_correct_withOneBadBatch_shouldFlagOnlyThatBatch() {
    let track = common::numbered_track(6);
    let reference = common::reference("reference text for six cues");
    let service = ScriptedService::new(|request, _| {
        let mut items: Vec<_> = request.items.iter()
            .map(|i| subalign::correction::CueItem { index: i.index, text: i.text.to_uppercase() })
            .collect();
        if request.batch_id == 2 {
            items.pop();
        }
        Ok(CorrectionResponse { items })
    });

    let outcome = correct(&track, &reference, &common::fast_config(2), &service, &RunHooks::new())
        .await
        .unwrap();

    let texts: Vec<String> = outcome.corrected_track.cues().iter().map(|c| c.text()).collect();
    assert_eq!(texts, vec!["CUE 1", "CUE 2", "cue 3", "cue 4", "CUE 5", "CUE 6"]);

    let unresolved: Vec<usize> = outcome.report.entries()
        .iter()
        .filter(|e| e.is_unresolved())
        .map(|e| e.cue_index)
        .collect();
    assert_eq!(unresolved, vec![3, 4]);
    assert_eq!(outcome.unresolved_batches.len(), 1);
    assert_eq!(outcome.unresolved_batches[0].batch_id, 2);
    assert!(render(&outcome.report).contains("3: \"cue 3\" -> kept due to failure"));
}

/// Test that the run fails loudly when every batch fails
#[tokio::test]
async fn test_correct_withFailingService_shouldReturnAllBatchesFailed() {
    let track = common::numbered_track(5);
    let reference = common::reference("reference");
    let service = ScriptedService::failing();

    let result = correct(&track, &reference, &common::fast_config(2), &service, &RunHooks::new()).await;

    match result {
        Err(CorrectionError::AllBatchesFailed { batches, last }) => {
            assert_eq!(batches, 3);
            assert_eq!(last.batch_id, 3);
            assert_eq!(last.attempts, 3);
        }
        other => panic!("expected AllBatchesFailed, got {:?}", other.map(|o| o.status)),
    }
}

/// Test that parse-level problems abort before any service call
#[tokio::test]
async fn test_correct_withEmptyTrack_shouldFailWithoutCalls() {
    let track = subalign::SubtitleTrack::default();
    let reference = common::reference("reference");
    let service = ScriptedService::echo();

    let result = correct(&track, &reference, &common::fast_config(2), &service, &RunHooks::new()).await;

    assert!(matches!(result, Err(CorrectionError::EmptyTrack)));
    assert_eq!(service.call_count(), 0);
}

/// Test that progress is reported after every batch
#[tokio::test]
async fn test_correct_withProgressHook_shouldEmitPerBatch() {
    let track = common::numbered_track(5);
    let reference = common::reference("reference");
    let service = ScriptedService::new(|request, _| {
        if request.batch_id == 2 {
            Err(ProviderError::AuthenticationError("denied".to_string()))
        } else {
            Ok(common::echo_response(request))
        }
    });
    let seen: Arc<Mutex<Vec<BatchProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let hooks = RunHooks::new().with_progress(move |p| sink.lock().push(p));

    correct(&track, &reference, &common::fast_config(2), &service, &hooks).await.unwrap();

    let seen = seen.lock().clone();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], BatchProgress { completed: 1, total: 3, batch_id: 1, resolved: true });
    assert!(!seen[1].resolved);
    assert_eq!(seen[2].completed, 3);
}

/// Test that cancellation between batches keeps completed work
#[tokio::test]
async fn test_correct_withCancellationAfterFirstBatch_shouldReturnPartialOutcome() {
    let track = common::numbered_track(6);
    let reference = common::reference("reference");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let service = ScriptedService::new(move |request, _| {
        trigger.cancel();
        let items = request.items.iter()
            .map(|i| subalign::correction::CueItem { index: i.index, text: format!("{}!", i.text) })
            .collect();
        Ok(CorrectionResponse { items })
    });
    let hooks = RunHooks::new().with_cancel(cancel);

    let outcome = correct(&track, &reference, &common::fast_config(2), &service, &hooks).await.unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(service.call_count(), 1);
    assert_eq!(outcome.batches_completed, 1);
    assert_eq!(outcome.batches_total, 3);
    assert!(matches!(
        outcome.cancellation(),
        Some(CorrectionError::Cancelled { completed_batches: 1, total_batches: 3 })
    ));

    let texts: Vec<String> = outcome.corrected_track.cues().iter().map(|c| c.text()).collect();
    assert_eq!(texts, vec!["cue 1!", "cue 2!", "cue 3", "cue 4", "cue 5", "cue 6"]);
    assert_eq!(outcome.report.len(), 2);
}

/// Test that a pending inter-batch delay is cut short by cancellation
#[tokio::test]
async fn test_correct_withBatchDelayAndCancellation_shouldStopWithoutWaiting() {
    let track = common::numbered_track(4);
    let reference = common::reference("reference");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let service = ScriptedService::new(move |request, _| {
        trigger.cancel();
        Ok(common::echo_response(request))
    });
    let config = CorrectionConfig { batch_delay_ms: 60_000, ..common::fast_config(2) };
    let hooks = RunHooks::new().with_cancel(cancel);

    let started = std::time::Instant::now();
    let outcome = correct(&track, &reference, &config, &service, &hooks).await.unwrap();

    assert!(outcome.is_cancelled());
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}

/// Test that a token cancelled up front stops before any call
#[tokio::test]
async fn test_correct_withPreCancelledToken_shouldNotCallService() {
    let track = common::numbered_track(3);
    let reference = common::reference("reference");
    let service = ScriptedService::echo();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = correct(&track, &reference, &common::fast_config(2), &service, &RunHooks::new().with_cancel(cancel))
        .await
        .unwrap();

    assert_eq!(service.call_count(), 0);
    assert_eq!(outcome.corrected_track, track);
    assert!(outcome.report.is_empty());
}

/// Test the engine handle outside an async test harness
#[test]
fn test_correctionEngine_withBlockOn_shouldCorrectTrack() {
    common::init_test_logging();
    let track = common::numbered_track(5);
    let reference = common::reference("cue one cue two cue three cue four cue five");
    let service = Arc::new(ScriptedService::with_corrections(&[(4, "cue four")]));
    let engine = CorrectionEngine::new(service.clone(), common::fast_config(2)).unwrap();

    let outcome = tokio_test::block_on(engine.correct(&track, &reference, &RunHooks::new())).unwrap();

    assert_eq!(service.call_count(), 3);
    assert_eq!(outcome.batches_total, 3);
    assert_eq!(outcome.changed_count(), 1);
    assert_eq!(outcome.corrected_track.cues()[3].text(), "cue four");
    assert_eq!(engine.config().max_batch_size, 2);
}

/// Test that the engine refuses an unusable configuration
#[test]
fn test_correctionEngine_withZeroBatchSize_shouldRejectConfig() {
    let service = Arc::new(ScriptedService::echo());
    let result = CorrectionEngine::new(service, common::fast_config(0));
    assert!(matches!(result, Err(CorrectionError::InvalidConfig(_))));
}
