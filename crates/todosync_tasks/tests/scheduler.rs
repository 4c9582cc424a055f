//! End-to-end scheduler behavior across task shapes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use todosync_tasks::{Completion, Scheduler, SchedulerConfig, Task, TaskState};

fn scheduler() -> Scheduler {
    Scheduler::new(SchedulerConfig::default()).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn callback_task_completes_from_another_thread() {
    let scheduler = scheduler();
    let task = Task::from_callback("callback", |done: Completion<String>| {
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            done.complete("pong".to_string());
        });
    });

    scheduler.submit(&task).unwrap();
    task.finished().await;
    assert_eq!(task.result().map(String::as_str), Some("pong"));
}

#[tokio::test(flavor = "multi_thread")]
async fn dropped_completion_finishes_empty() {
    let scheduler = scheduler();
    let task: Task<u32> = Task::from_callback("dropped", drop);
    let after = Task::from_fn("after", || true).with_dependency(&task).unwrap();

    scheduler.submit(&task).unwrap();
    scheduler.submit(&after).unwrap();
    scheduler.wait_idle().await;

    assert_eq!(task.state(), TaskState::Finished);
    assert!(task.result().is_none());
    assert_eq!(after.result(), Some(&true));
}

#[tokio::test(flavor = "multi_thread")]
async fn blocking_task_runs_on_blocking_pool() {
    let scheduler = scheduler();
    let task = Task::blocking("sleep", || {
        std::thread::sleep(Duration::from_millis(5));
        42u64
    });
    scheduler.submit(&task).unwrap();
    task.finished().await;
    assert_eq!(task.result(), Some(&42));
}

#[tokio::test(flavor = "multi_thread")]
async fn dependent_reads_predecessor_result() {
    let scheduler = scheduler();
    let fetch = Task::new("fetch", || async { Some(vec![1, 2, 3]) });
    let source = fetch.clone();
    let sum = Task::from_fn("sum", move || {
        source.result().map(|v| v.iter().sum::<i32>()).unwrap_or(-1)
    })
    .with_dependency(&fetch)
    .unwrap();

    scheduler.submit(&fetch).unwrap();
    scheduler.submit(&sum).unwrap();
    sum.finished().await;
    assert_eq!(sum.result(), Some(&6));
}

#[tokio::test(flavor = "multi_thread")]
async fn fan_in_waits_for_every_predecessor() {
    let scheduler = scheduler();
    let counter = Arc::new(AtomicUsize::new(0));

    let mut inputs = Vec::new();
    for i in 0..5u64 {
        let counter = Arc::clone(&counter);
        inputs.push(Task::new(format!("input-{i}"), move || async move {
            tokio::time::sleep(Duration::from_millis(i * 3)).await;
            counter.fetch_add(1, Ordering::SeqCst);
            Some(())
        }));
    }

    let seen = Arc::clone(&counter);
    let join = Task::from_fn("join", move || seen.load(Ordering::SeqCst));
    for input in &inputs {
        join.add_dependency(input).unwrap();
    }

    scheduler.submit(&join).unwrap();
    for input in &inputs {
        scheduler.submit(input).unwrap();
    }
    join.finished().await;
    assert_eq!(join.result(), Some(&5));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_predecessor_still_releases_dependent() {
    let scheduler = scheduler();
    let ran = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&ran);
    let skipped = Task::from_fn("skipped", move || flag.fetch_add(1, Ordering::SeqCst));
    let after = Task::from_fn("after", || "after").with_dependency(&skipped).unwrap();

    assert!(skipped.cancel());
    scheduler.submit(&skipped).unwrap();
    scheduler.submit(&after).unwrap();
    scheduler.wait_idle().await;

    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert!(skipped.is_cancelled());
    assert_eq!(after.result(), Some(&"after"));
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_never_blocks_on_busy_scheduler() {
    let scheduler = Scheduler::new(SchedulerConfig::default().with_max_concurrency(1)).unwrap();
    let hold = Task::new("hold", || std::future::pending::<Option<()>>());
    scheduler.submit(&hold).unwrap();

    let quick = Task::from_fn("quick", || 1);
    let started = std::time::Instant::now();
    scheduler.submit(&quick).unwrap();
    assert!(started.elapsed() < Duration::from_millis(100));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(quick.state(), TaskState::Pending);
    assert_eq!(scheduler.running(), 1);
    assert_eq!(scheduler.outstanding(), 2);
}
