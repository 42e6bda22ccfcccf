//! Deadline flushing on the background scheduler, under a paused clock.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use jabber_events::{
    Config,
    FlushReason,
    FragmentAssembler,
    FragmentId,
    MessageAssembled,
    fragment::{FlushScheduler, FlushTimer},
};
use jabber_events_testing::fragment;
use rstest::{fixture, rstest};
use tokio::{
    sync::mpsc::{UnboundedReceiver, error::TryRecvError},
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(30);

#[fixture]
fn config() -> Config {
    Config::builder()
        .fragment_timeout(TIMEOUT)
        .placeholder("[?]")
        .build()
        .expect("valid configuration")
}

async fn next(rx: &mut UnboundedReceiver<MessageAssembled>) -> MessageAssembled {
    time::timeout(TIMEOUT * 4, rx.recv())
        .await
        .expect("message flushed before timeout")
        .expect("assembler alive")
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn incomplete_message_flushes_at_deadline(config: Config) {
    let assembler = FragmentAssembler::spawn(&config);
    let mut rx = assembler.listeners().subscribe();
    let start = Instant::now();

    assembler.on_fragment(fragment("g", "bob@example.org", 3, 1, "middle"));
    time::sleep(TIMEOUT - Duration::from_millis(1)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    let message = next(&mut rx).await;
    assert_eq!(message.body, "[?]middle[?]");
    assert_eq!(message.reason, FlushReason::TimedOut);
    assert!(message.was_truncated);
    assert!(start.elapsed() >= TIMEOUT);
    assert_eq!(assembler.pending_len(), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn completed_message_is_not_flushed_again(config: Config) {
    let assembler = FragmentAssembler::spawn(&config);
    let mut rx = assembler.listeners().subscribe();

    assembler.on_fragment(fragment("g", "bob@example.org", 2, 0, "hello "));
    time::sleep(TIMEOUT / 2).await;
    assembler.on_fragment(fragment("g", "bob@example.org", 2, 1, "world"));
    let message = next(&mut rx).await;
    assert_eq!(message.body, "hello world");
    assert_eq!(message.reason, FlushReason::Complete);

    time::sleep(TIMEOUT * 2).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn late_fragment_gets_its_own_deadline(config: Config) {
    let assembler = FragmentAssembler::spawn(&config);
    let mut rx = assembler.listeners().subscribe();

    assembler.on_fragment(fragment("g", "bob@example.org", 2, 0, "A"));
    let first = next(&mut rx).await;
    assert_eq!(first.body, "A[?]");
    let flushed_at = Instant::now();

    assembler.on_fragment(fragment("g", "bob@example.org", 2, 1, "B"));
    assert_eq!(assembler.pending_len(), 1);
    let second = next(&mut rx).await;

    assert_eq!(second.body, "[?]B");
    assert!(flushed_at.elapsed() >= TIMEOUT);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn deadlines_fire_in_order(config: Config) {
    let assembler = FragmentAssembler::spawn(&config);
    let mut rx = assembler.listeners().subscribe();

    assembler.on_fragment(fragment("first", "bob@example.org", 2, 0, "1"));
    time::sleep(Duration::from_secs(5)).await;
    assembler.on_fragment(fragment("second", "bob@example.org", 2, 0, "2"));

    assert_eq!(next(&mut rx).await.group, FragmentId::new("first"));
    assert_eq!(next(&mut rx).await.group, FragmentId::new("second"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stopped_timer_leaves_buffers_for_explicit_flush(config: Config) {
    let assembler = FragmentAssembler::spawn(&config);
    let mut rx = assembler.listeners().subscribe();

    assembler.on_fragment(fragment("g", "bob@example.org", 2, 0, "A"));
    assembler.stop_timer();
    time::sleep(TIMEOUT * 2).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    assert_eq!(assembler.flush_expired(), 1);
    assert_eq!(rx.try_recv().expect("flushed").reason, FlushReason::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn scheduler_skips_cancelled_timers() {
    let fired = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&fired);
    let scheduler = FlushScheduler::spawn(Arc::new(move |group: FragmentId, generation| {
        sink.lock().expect("lock").push((group, generation));
    }));
    let deadline = (Instant::now() + Duration::from_secs(1)).into_std();
    let cancelled = CancellationToken::new();
    cancelled.cancel();

    assert!(scheduler.schedule(FlushTimer {
        group: FragmentId::new("gone"),
        generation: 1,
        deadline,
        token: cancelled,
    }));
    assert!(scheduler.schedule(FlushTimer {
        group: FragmentId::new("live"),
        generation: 2,
        deadline,
        token: CancellationToken::new(),
    }));
    time::sleep(Duration::from_secs(2)).await;
    scheduler.join().await;

    assert_eq!(
        *fired.lock().expect("lock"),
        vec![(FragmentId::new("live"), 2)]
    );
}

#[tokio::test(start_paused = true)]
async fn schedule_after_shutdown_is_refused() {
    let scheduler = FlushScheduler::spawn(Arc::new(|_: FragmentId, _| {}));
    scheduler.shutdown();
    time::sleep(Duration::from_millis(1)).await;

    let accepted = scheduler.schedule(FlushTimer {
        group: FragmentId::new("g"),
        generation: 0,
        deadline: Instant::now().into_std(),
        token: CancellationToken::new(),
    });
    assert!(!accepted);
}
