//! End-to-end scenarios against a real `JobQueue` + in-memory backend, no
//! mocking of retry/backoff or priority dispatch.

use std::time::{Duration, Instant};

use concord_queue::{JobOutcome, JobQueue, JobStatus, JobTask, NackDisposition, Priority};

fn match_task(seq: usize) -> JobTask {
    JobTask::Match {
        payload: serde_json::json!({"seq": seq}),
    }
}

/// A standard-priority job nacked as retryable on every attempt must be
/// dequeued `maxRetries + 1` times in total, with real exponential backoff
/// between each retry, before landing in the dead letter queue. The queue's
/// backoff delays are computed from `std::time::Instant`, not `tokio::time`,
/// so this runs on the real clock rather than a paused one.
#[tokio::test]
async fn s5_standard_job_exhausts_retries_into_dead_letter() {
    let queue = JobQueue::in_memory(100);
    let id = queue
        .enqueue(Priority::Standard, match_task(0), None, None)
        .await
        .unwrap();

    let max_retries = Priority::Standard.max_retries();
    let mut dequeue_count = 0u32;
    let mut nacked_at = Vec::with_capacity(max_retries as usize);
    let mut dequeued_at = Vec::with_capacity((max_retries + 1) as usize);

    for attempt in 0..=max_retries {
        let job = queue
            .dequeue(&[Priority::Standard], Duration::from_secs(10))
            .await
            .unwrap()
            .expect("job should become ready well within 10s of backoff");
        dequeued_at.push(Instant::now());
        dequeue_count += 1;
        assert_eq!(job.id, id);
        assert_eq!(job.attempts, attempt, "attempts should match the retry count so far");

        let disposition = queue
            .nack(id, "simulated transient upstream timeout", true)
            .await
            .unwrap();
        let expected = if attempt < max_retries { NackDisposition::Requeued } else { NackDisposition::Dead };
        assert_eq!(disposition, expected, "attempt {attempt}");
        nacked_at.push(Instant::now());
    }

    assert_eq!(dequeue_count, max_retries + 1, "one initial attempt plus one per retry");

    // Gap between each nack and the following dequeue should track
    // `backoff_delay(attempt, 1s, 300s)`: base 1s doubling per attempt,
    // jittered 0.9-1.1x. Bounds below are loosened around the jitter range
    // to absorb scheduling slop, not to weaken the backoff requirement.
    for attempt in 0..max_retries {
        let expected_unjittered = 2f64.powi(attempt as i32);
        let gap = dequeued_at[attempt as usize + 1].duration_since(nacked_at[attempt as usize]);
        assert!(
            gap.as_secs_f64() >= expected_unjittered * 0.85,
            "retry {attempt}: gap {gap:?} shorter than expected backoff"
        );
        assert!(
            gap.as_secs_f64() <= expected_unjittered * 1.5,
            "retry {attempt}: gap {gap:?} far longer than expected backoff"
        );
    }

    let record = queue.fetch(id).await.unwrap();
    assert_eq!(record.status, JobStatus::Dead);
    // The backend's attempt counter only increments on requeue, not on the
    // final kill: a job with `maxRetries == 3` is dequeued 4 times but dies
    // with `attempts == 3`, reflecting the last successful requeue rather
    // than the attempt that killed it.
    assert_eq!(record.attempts, max_retries);
    assert!(matches!(record.outcome, Some(JobOutcome::Failure(_))));
}

/// A premium job enqueued behind ten pending batch jobs must still surface
/// first, and the batch jobs must drain in their original FIFO order once
/// the premium queue is empty.
#[tokio::test]
async fn s6_premium_preempts_queued_batch_jobs() {
    let queue = JobQueue::in_memory(100);

    let mut batch_ids = Vec::with_capacity(10);
    for seq in 0..10 {
        let id = queue.enqueue(Priority::Batch, match_task(seq), None, None).await.unwrap();
        batch_ids.push(id);
    }
    let premium_id = queue
        .enqueue(Priority::Premium, match_task(99), None, None)
        .await
        .unwrap();

    let priorities = [Priority::Premium, Priority::Standard, Priority::Batch];

    let first = queue
        .dequeue(&priorities, Duration::from_millis(200))
        .await
        .unwrap()
        .expect("premium job should be immediately ready");
    assert_eq!(first.id, premium_id);
    assert_eq!(first.priority, Priority::Premium);

    for expected_id in batch_ids {
        let job = queue
            .dequeue(&priorities, Duration::from_millis(200))
            .await
            .unwrap()
            .expect("batch jobs should remain ready after premium drains");
        assert_eq!(job.id, expected_id);
        assert_eq!(job.priority, Priority::Batch);
    }

    let empty = queue.dequeue(&priorities, Duration::from_millis(50)).await.unwrap();
    assert!(empty.is_none(), "queue should be fully drained");
}
