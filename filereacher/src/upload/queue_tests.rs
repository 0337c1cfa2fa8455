use super::*;
use crate::upload::testing::{Call, FakeApi, RecordingReporter, Report, destination};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;

const CHUNK: u64 = 4;

fn setup() -> (
    Arc<FakeApi>,
    Arc<RecordingReporter>,
    UploadQueue,
    UploadWorker<Arc<FakeApi>>,
    UnboundedReceiver<QueueEvent>,
) {
    let api = Arc::new(FakeApi::default());
    let reporter = Arc::new(RecordingReporter::default());
    let (queue, worker, events) = upload_queue(
        api.clone(),
        reporter.clone(),
        UploadConfig { chunk_size: CHUNK },
    );
    (api, reporter, queue, worker, events)
}

fn file(name: &str, size: usize) -> (UploadFile, PathToken) {
    (UploadFile::from_bytes(name, vec![1u8; size]), destination(name))
}

async fn until_drained(events: &mut UnboundedReceiver<QueueEvent>) -> Vec<QueueEvent> {
    let mut out = Vec::new();
    while let Some(event) = events.recv().await {
        let drained = matches!(event, QueueEvent::Drained);
        out.push(event);
        if drained {
            break;
        }
    }
    out
}

fn call_path(call: &Call) -> &str {
    match call {
        Call::Start { path, .. } | Call::Chunk { path, .. } | Call::Complete { path } => path,
    }
}

fn outcomes(events: &[QueueEvent]) -> Vec<(String, bool)> {
    events
        .iter()
        .filter_map(|event| match event {
            QueueEvent::Finished { name, result } => Some((name.clone(), result.is_ok())),
            QueueEvent::Drained => None,
        })
        .collect()
}

#[tokio::test]
async fn tasks_run_one_at_a_time_in_submission_order() {
    let (api, _reporter, queue, worker, mut events) = setup();
    tokio::spawn(worker.run());

    queue
        .submit_many([file("a", 9), file("b", 5), file("c", 0)])
        .unwrap();
    let events = until_drained(&mut events).await;

    let paths: Vec<String> = api.calls().iter().map(|c| call_path(c).to_string()).collect();
    let mut runs: Vec<String> = Vec::new();
    for path in paths {
        if runs.last() != Some(&path) {
            runs.push(path);
        }
    }
    // each file's calls are contiguous, and files follow submission order
    assert_eq!(runs, ["/a", "/b", "/c"]);
    assert_eq!(
        outcomes(&events),
        [("a".to_string(), true), ("b".to_string(), true), ("c".to_string(), true)]
    );
    assert_eq!(queue.pending(), 0);
}

#[tokio::test]
async fn failed_task_does_not_block_the_rest() {
    let (api, reporter, queue, worker, mut events) = setup();
    api.fail_chunk("/b", 4);
    tokio::spawn(worker.run());

    queue
        .submit_many([file("a", 6), file("b", 10), file("c", 6)])
        .unwrap();
    let events = until_drained(&mut events).await;

    assert_eq!(
        outcomes(&events),
        [("a".to_string(), true), ("b".to_string(), false), ("c".to_string(), true)]
    );
    assert!(api.calls().contains(&Call::Complete { path: "/c".into() }));
    assert!(!api.calls().contains(&Call::Complete { path: "/b".into() }));
    assert_eq!(queue.pending(), 0);
    assert_eq!(reporter.reports().last(), Some(&Report::Hide));

    match &events[1] {
        QueueEvent::Finished {
            result: Err(err), ..
        } => assert_eq!(err.name(), "b"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn start_failure_still_counts_down() {
    let (api, reporter, queue, worker, mut events) = setup();
    api.fail_start("/a");
    tokio::spawn(worker.run());

    queue.submit_many([file("a", 3), file("b", 3)]).unwrap();
    let events = until_drained(&mut events).await;

    assert_eq!(outcomes(&events), [("a".to_string(), false), ("b".to_string(), true)]);
    let pending: Vec<usize> = reporter
        .reports()
        .into_iter()
        .filter_map(|report| match report {
            Report::Pending(count) => Some(count),
            _ => None,
        })
        .collect();
    assert_eq!(pending, [1, 2, 1, 0]);
}

#[tokio::test]
async fn submissions_while_draining_join_the_same_queue() {
    let (_api, reporter, queue, mut worker, mut events) = setup();
    queue.submit_many([file("a", 5), file("b", 5)]).unwrap();

    let first = worker.jobs.recv().await.unwrap();
    worker.process(first).await;
    assert_eq!(queue.pending(), 1);

    let late = queue.clone();
    late.submit(file("c", 5).0, destination("c")).unwrap();
    assert_eq!(queue.pending(), 2);

    for _ in 0..2 {
        let task = worker.jobs.recv().await.unwrap();
        worker.process(task).await;
    }

    let events = until_drained(&mut events).await;
    assert_eq!(
        outcomes(&events),
        [("a".to_string(), true), ("b".to_string(), true), ("c".to_string(), true)]
    );
    let hides = reporter
        .reports()
        .into_iter()
        .filter(|report| *report == Report::Hide)
        .count();
    assert_eq!(hides, 1);
}

#[tokio::test]
async fn submit_fails_once_worker_is_gone() {
    let (_api, _reporter, queue, worker, _events) = setup();
    drop(worker);

    let (upload, target) = file("a", 1);
    assert!(matches!(queue.submit(upload, target), Err(QueueError::Closed)));
    assert_eq!(queue.pending(), 0);
}

/// Records, for every pending count it is told about, whether the event
/// channel was still empty at that moment.
#[derive(Default)]
struct ChannelObserver {
    events: Mutex<Option<UnboundedReceiver<QueueEvent>>>,
    seen: Mutex<Vec<(usize, bool)>>,
}

impl ProgressReporter for ChannelObserver {
    fn show(&self, _name: &str) {}

    fn set_progress(&self, _percentage: f64) {}

    fn set_pending_count(&self, count: usize) {
        let empty = self
            .events
            .lock()
            .unwrap()
            .as_ref()
            .is_none_or(|events| events.is_empty());
        self.seen.lock().unwrap().push((count, empty));
    }

    fn hide(&self) {}
}

#[tokio::test]
async fn outcome_is_queued_before_pending_count_drops() {
    let api = Arc::new(FakeApi::default());
    api.fail_start("/a");
    let observer = Arc::new(ChannelObserver::default());
    let (queue, mut worker, events) = upload_queue(
        api.clone(),
        observer.clone(),
        UploadConfig { chunk_size: CHUNK },
    );
    *observer.events.lock().unwrap() = Some(events);

    queue.submit(file("a", 3).0, destination("a")).unwrap();
    let task = worker.jobs.recv().await.unwrap();
    worker.process(task).await;

    assert_eq!(*observer.seen.lock().unwrap(), [(1, true), (0, false)]);
    let mut events = observer.events.lock().unwrap().take().unwrap();
    let events = until_drained(&mut events).await;
    assert_eq!(outcomes(&events), [("a".to_string(), false)]);
}
