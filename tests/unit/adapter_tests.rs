/*!
 * Tests for the correction adapter: request building, validation and retries
 */

use subalign::app_config::RetryPolicy;
use subalign::correction::{CorrectionAdapter, CorrectionRequest, CorrectionResponse, CueItem, partition};
use subalign::errors::{AttemptError, ProviderError, ResponseError};
use crate::common::{self, ScriptedService};

fn item(index: usize, text: &str) -> CueItem {
    CueItem { index, text: text.to_string() }
}

/// Test that the request tags every cue with its index and carries context
#[test]
fn test_correctionRequest_fromBatch_shouldTagCues() {
    let track = common::track_from_texts(&["a", "b", "c"]);
    let reference = common::reference("A. B. C.");
    let batches = partition(&track, &reference, &common::fast_config(2)).unwrap();

    let request = CorrectionRequest::from_batch(&batches[1]);

    assert_eq!(request.batch_id, 2);
    assert_eq!(request.items, vec![item(3, "c")]);
    assert_eq!(request.context, vec![item(1, "a"), item(2, "b")]);
    assert!(!request.reference_excerpt.is_empty());
}

/// Test that a reply in reverse order is mapped back by index
#[tokio::test]
async fn test_correctBatch_withReversedReply_shouldReturnBatchOrder() {
    let track = common::track_from_texts(&["a", "b", "c"]);
    let reference = common::reference("A B C");
    let batches = partition(&track, &reference, &common::fast_config(10)).unwrap();
    let service = ScriptedService::new(|request, _| {
        let mut items: Vec<CueItem> = request.items.iter()
            .map(|i| item(i.index, &i.text.to_uppercase()))
            .collect();
        items.reverse();
        Ok(CorrectionResponse { items })
    });

    let adapter = CorrectionAdapter::new(&service, RetryPolicy::immediate(0), None);
    let corrected = adapter.correct_batch(&batches[0]).await.unwrap();

    assert_eq!(corrected, vec![vec!["A".to_string()], vec!["B".to_string()], vec!["C".to_string()]]);
}

/// Test that a transient failure is retried
#[tokio::test]
async fn test_correctBatch_withTransientFailure_shouldRetry() {
    let track = common::numbered_track(2);
    let reference = common::reference("reference");
    let batches = partition(&track, &reference, &common::fast_config(10)).unwrap();
    let service = ScriptedService::new(|request, call| {
        if call == 1 {
            Err(ProviderError::Timeout("slow".to_string()))
        } else {
            Ok(common::echo_response(request))
        }
    });

    let adapter = CorrectionAdapter::new(&service, RetryPolicy::immediate(2), None);

    assert!(adapter.correct_batch(&batches[0]).await.is_ok());
    assert_eq!(service.call_count(), 2);
}

/// Test that an invalid reply is retried before giving up
#[tokio::test]
async fn test_correctBatch_withShortReplyOnce_shouldRecover() {
    let track = common::numbered_track(3);
    let reference = common::reference("reference");
    let batches = partition(&track, &reference, &common::fast_config(10)).unwrap();
    let service = ScriptedService::new(|request, call| {
        let mut response = common::echo_response(request);
        if call == 1 {
            response.items.pop();
        }
        Ok(response)
    });

    let adapter = CorrectionAdapter::new(&service, RetryPolicy::immediate(1), None);
    let corrected = adapter.correct_batch(&batches[0]).await.unwrap();

    assert_eq!(corrected.len(), 3);
    assert_eq!(service.call_count(), 2);
}

/// Test that the retry bound is honoured and the last cause reported
#[tokio::test]
async fn test_correctBatch_withPersistentCountMismatch_shouldFailAfterBound() {
    let track = common::numbered_track(3);
    let reference = common::reference("reference");
    let batches = partition(&track, &reference, &common::fast_config(10)).unwrap();
    let service = ScriptedService::new(|request, _| {
        let mut response = common::echo_response(request);
        response.items.truncate(1);
        Ok(response)
    });

    let adapter = CorrectionAdapter::new(&service, RetryPolicy::immediate(2), None);
    let error = adapter.correct_batch(&batches[0]).await.unwrap_err();

    assert_eq!(error.batch_id, 1);
    assert_eq!(error.attempts, 3);
    assert_eq!(service.call_count(), 3);
    assert!(matches!(
        error.cause,
        AttemptError::InvalidResponse(ResponseError::CountMismatch { expected: 3, found: 1 })
    ));
}

/// Test that authentication errors are not retried
#[tokio::test]
async fn test_correctBatch_withAuthenticationError_shouldNotRetry() {
    let track = common::numbered_track(1);
    let reference = common::reference("reference");
    let batches = partition(&track, &reference, &common::fast_config(10)).unwrap();
    let service = ScriptedService::new(|_, _| Err(ProviderError::AuthenticationError("bad key".to_string())));

    let adapter = CorrectionAdapter::new(&service, RetryPolicy::immediate(5), None);
    let error = adapter.correct_batch(&batches[0]).await.unwrap_err();

    assert_eq!(error.attempts, 1);
    assert_eq!(service.call_count(), 1);
    assert!(matches!(error.cause, AttemptError::Provider(ProviderError::AuthenticationError(_))));
}

/// Test that the optional length check rejects rewritten cues
#[tokio::test]
async fn test_correctBatch_withLengthLimit_shouldRejectLongRewrite() {
    let track = common::track_from_texts(&["short"]);
    let reference = common::reference("reference");
    let batches = partition(&track, &reference, &common::fast_config(10)).unwrap();
    let service = ScriptedService::with_corrections(&[(1, "a much much longer sentence than before")]);

    let adapter = CorrectionAdapter::new(&service, RetryPolicy::immediate(0), Some(0.3));
    let error = adapter.correct_batch(&batches[0]).await.unwrap_err();

    assert!(matches!(
        error.cause,
        AttemptError::InvalidResponse(ResponseError::LengthDrift { index: 1, original: 5, .. })
    ));
}
