//! Backend contract tests, run against the in-memory store.

use std::sync::Arc;

use jobline_core::codec::AttrMap;
use jobline_core::{Backend, DequeueFilter, JobStatus, NewJob};
use jobline_memory::MemoryStore;
use serde_json::json;
use tokio::sync::Barrier;

/// Fresh store with log capture hooked up; run with `RUST_LOG=debug` to see
/// the claim tracing.
fn store() -> MemoryStore {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    MemoryStore::new()
}

fn payload(key: &str, value: &str) -> AttrMap {
    let mut map = AttrMap::new();
    map.insert(key.into(), json!(value));
    map
}

#[tokio::test]
async fn enqueue_assigns_an_id_and_returns_the_durable_record() {
    let store = store();

    let job = store
        .enqueue(NewJob::new("SendEmail", "email", payload("to", "bob@example.com")))
        .await
        .unwrap();

    let id = job.id().expect("enqueue assigns an id");
    assert_eq!(job.status(), Some(JobStatus::Free));
    assert_eq!(job.class_name(), Some("SendEmail"));
    assert_eq!(job.job_type(), Some("email"));
    assert_eq!(job.get("to"), Some(&json!("bob@example.com")));

    let found = store.find(id).await.unwrap().expect("job is findable");
    assert_eq!(found, job);
}

#[tokio::test]
async fn dequeue_is_fifo_within_a_filter() {
    let store = store();

    let first = store
        .enqueue(NewJob::new("SendEmail", "email", AttrMap::new()))
        .await
        .unwrap();
    let second = store
        .enqueue(NewJob::new("SendEmail", "email", AttrMap::new()))
        .await
        .unwrap();

    let claimed = store.dequeue(&DequeueFilter::Any).await.unwrap().unwrap();
    assert_eq!(claimed.id(), first.id());
    assert_eq!(claimed.status(), Some(JobStatus::Locked));

    let claimed = store.dequeue(&DequeueFilter::Any).await.unwrap().unwrap();
    assert_eq!(claimed.id(), second.id());

    assert!(store.dequeue(&DequeueFilter::Any).await.unwrap().is_none());
}

#[tokio::test]
async fn only_filter_never_claims_other_types() {
    let store = store();

    store
        .enqueue(NewJob::new("SendEmail", "email", AttrMap::new()))
        .await
        .unwrap();

    assert!(
        store
            .dequeue(&DequeueFilter::only(["sms"]))
            .await
            .unwrap()
            .is_none()
    );

    let claimed = store
        .dequeue(&DequeueFilter::only(["email", "sms"]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claimed.job_type(), Some("email"));
}

#[tokio::test]
async fn exclude_filter_never_claims_excluded_types() {
    let store = store();

    store
        .enqueue(NewJob::new("SendEmail", "email", AttrMap::new()))
        .await
        .unwrap();

    assert!(
        store
            .dequeue(&DequeueFilter::exclude(["email"]))
            .await
            .unwrap()
            .is_none()
    );

    let claimed = store
        .dequeue(&DequeueFilter::exclude(["sms"]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claimed.job_type(), Some("email"));
}

#[tokio::test]
async fn filtered_then_unfiltered_scenario() {
    let store = store();

    let a = store
        .enqueue(NewJob::new("SendEmail", "email", AttrMap::new()))
        .await
        .unwrap();
    let b = store
        .enqueue(NewJob::new("SendSms", "sms", AttrMap::new()))
        .await
        .unwrap();

    let claimed = store
        .dequeue(&DequeueFilter::only(["sms"]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claimed.id(), b.id());

    let claimed = store.dequeue(&DequeueFilter::Any).await.unwrap().unwrap();
    assert_eq!(claimed.id(), a.id());

    assert!(store.dequeue(&DequeueFilter::Any).await.unwrap().is_none());
}

#[tokio::test]
async fn complete_is_terminal() {
    let store = store();

    store
        .enqueue(NewJob::new("SendEmail", "email", AttrMap::new()))
        .await
        .unwrap();
    let claimed = store.dequeue(&DequeueFilter::Any).await.unwrap().unwrap();
    let id = claimed.id().unwrap();

    store.complete(&claimed).await.unwrap();
    assert!(store.find(id).await.unwrap().is_none());
}

#[tokio::test]
async fn write_back_without_an_id_is_a_no_op() {
    let store = store();

    let unclaimed = jobline_core::JobAttrs::from(AttrMap::new());
    store.complete(&unclaimed).await.unwrap();
    store.reset(&unclaimed).await.unwrap();
    store.fail(&unclaimed).await.unwrap();
}

#[tokio::test]
async fn reset_recirculates_with_updated_type_and_payload() {
    let store = store();

    store
        .enqueue(NewJob::new("SendEmail", "email", payload("to", "bob@example.com")))
        .await
        .unwrap();
    let mut claimed = store.dequeue(&DequeueFilter::Any).await.unwrap().unwrap();
    let id = claimed.id().unwrap();

    claimed.set_job_type("retry");
    claimed.insert("attempts", json!(1));
    store.reset(&claimed).await.unwrap();

    let found = store.find(id).await.unwrap().unwrap();
    assert_eq!(found.status(), Some(JobStatus::Free));
    assert_eq!(found.job_type(), Some("retry"));
    assert_eq!(found.get("attempts"), Some(&json!(1)));
    // class identity is immutable after enqueue
    assert_eq!(found.class_name(), Some("SendEmail"));

    let reclaimed = store.dequeue(&DequeueFilter::Any).await.unwrap().unwrap();
    assert_eq!(reclaimed.id(), Some(id));
}

#[tokio::test]
async fn failed_jobs_are_parked_and_never_claimed() {
    let store = store();

    store
        .enqueue(NewJob::new("SendEmail", "email", AttrMap::new()))
        .await
        .unwrap();
    let claimed = store.dequeue(&DequeueFilter::Any).await.unwrap().unwrap();
    let id = claimed.id().unwrap();

    store.fail(&claimed).await.unwrap();

    let found = store.find(id).await.unwrap().unwrap();
    assert_eq!(found.status(), Some(JobStatus::Failed));

    assert!(store.dequeue(&DequeueFilter::Any).await.unwrap().is_none());
    assert!(
        store
            .dequeue(&DequeueFilter::only(["email"]))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn clear_removes_everything() {
    let store = store();

    let job = store
        .enqueue(NewJob::new("SendEmail", "email", AttrMap::new()))
        .await
        .unwrap();
    store.clear().await.unwrap();

    assert!(store.find(job.id().unwrap()).await.unwrap().is_none());
    assert!(store.dequeue(&DequeueFilter::Any).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exactly_one_concurrent_dequeue_wins_a_single_job() {
    let store = Arc::new(store());

    store
        .enqueue(NewJob::new("SendEmail", "email", AttrMap::new()))
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            store.dequeue(&DequeueFilter::Any).await.unwrap()
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1, "exactly one caller claims the job");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_dequeues_never_share_a_job() {
    let store = Arc::new(store());

    for i in 0..8 {
        store
            .enqueue(NewJob::new("SendEmail", "email", payload("n", &i.to_string())))
            .await
            .unwrap();
    }

    let barrier = Arc::new(Barrier::new(8));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            store.dequeue(&DequeueFilter::Any).await.unwrap()
        }));
    }

    let mut seen = std::collections::HashSet::new();
    for handle in handles {
        let job = handle.await.unwrap().expect("eight jobs for eight callers");
        assert!(seen.insert(job.id().unwrap()), "job claimed twice");
    }
}
