mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use common::{
    Call, Journal, MockTransport, RecordingSink, address, config, descriptor, eventually,
};
use fleetvisor::{
    Action, Command, CommandError, Connectivity, Event, EventKind, FailureReport, Fleet,
    QueueError, RuntimeError, SessionRef, SupervisorConfig,
};
use tokio::sync::broadcast;

fn fleet_with(
    cfg: SupervisorConfig,
    transport: &MockTransport,
    sink: &Arc<RecordingSink>,
) -> Arc<Fleet> {
    Fleet::builder(cfg, Arc::new(transport.clone()))
        .with_status_sink(sink.clone())
        .build()
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn idle_device_connects_once_for_queued_commands() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let fleet = fleet_with(config(), &transport, &sink);
    let journal = Journal::default();

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(transport.calls().is_empty());
    assert_eq!(sink.connectivity("a"), vec![Connectivity::Offline]);

    car.push(journal.ok("first")).await.unwrap();
    car.push(journal.ok("second")).await.unwrap();
    eventually(|| journal.entries().len() == 2).await;

    let a = address("a");
    assert_eq!(
        transport.calls(),
        vec![
            Call::Connect(a.clone()),
            Call::WakeSession(a.clone()),
            Call::Execute(a.clone(), Action::WakeUp),
            Call::FullSession(a.clone()),
        ]
    );
    assert_eq!(journal.entries(), ["first", "second"]);
    assert_eq!(car.connectivity(), Connectivity::Online);

    fleet.stop().await.unwrap();
    assert_eq!(transport.calls().last(), Some(&Call::Close(a)));
    assert_eq!(
        sink.connectivity("a"),
        vec![
            Connectivity::Offline,
            Connectivity::Online,
            Connectivity::Offline
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn failing_command_runs_exactly_max_attempts() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let cfg = SupervisorConfig {
        max_attempts: 3,
        ..config()
    };
    let fleet = fleet_with(cfg, &transport, &sink);
    let journal = Journal::default();

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    car.push(journal.failing("b")).await.unwrap();
    eventually(|| !sink.failures("a").is_empty()).await;
    eventually(|| car.connectivity() == Connectivity::Offline).await;

    assert_eq!(journal.entries(), ["b", "b", "b"]);
    assert_eq!(
        sink.failures("a"),
        vec![FailureReport {
            command: "b".into(),
            attempts: 3,
            error: "command failed: b refused".into(),
        }]
    );
    assert_eq!(transport.count(|c| matches!(c, Call::Connect(_))), 3);

    // Connectivity strictly alternates, starting and ending offline.
    let seen = sink.connectivity("a");
    assert_eq!(seen.len(), 7);
    assert!(seen.windows(2).all(|w| w[0] != w[1]));
    assert_eq!(seen.first(), Some(&Connectivity::Offline));

    // Nothing left to run: the device stays disconnected.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.count(|c| matches!(c, Call::Connect(_))), 3);
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn retried_command_follows_earlier_commands() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let fleet = fleet_with(config(), &transport, &sink);
    let journal = Journal::default();
    let mut events = fleet.subscribe_events();

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    car.push(journal.ok("a")).await.unwrap();
    car.push(journal.failing("b")).await.unwrap();
    eventually(|| !sink.failures("a").is_empty()).await;

    assert_eq!(journal.entries(), ["a", "b", "b"]);
    assert_eq!(sink.failures("a")[0].attempts, 2);

    let outcomes: Vec<(EventKind, Option<String>)> = drain(&mut events)
        .into_iter()
        .filter(|e| {
            matches!(
                e.kind,
                EventKind::CommandSucceeded
                    | EventKind::CommandRequeued
                    | EventKind::CommandExhausted
            )
        })
        .map(|e| (e.kind, e.command.as_deref().map(str::to_string)))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (EventKind::CommandSucceeded, Some("a".into())),
            (EventKind::CommandRequeued, Some("b".into())),
            (EventKind::CommandExhausted, Some("b".into())),
        ]
    );
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn requeued_command_goes_to_the_back() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let fleet = fleet_with(config(), &transport, &sink);
    let journal = Journal::default();

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    car.push(journal.failing("b")).await.unwrap();
    car.push(journal.ok("c")).await.unwrap();
    eventually(|| !sink.failures("a").is_empty()).await;

    assert_eq!(journal.entries(), ["b", "c", "b"]);
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn self_cancelled_command_is_retried_and_reported() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let fleet = fleet_with(config(), &transport, &sink);
    let runs = Arc::new(AtomicU32::new(0));

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    let counter = Arc::clone(&runs);
    let cmd = Command::from_fn("x", move |_session: SessionRef, _ctx| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), CommandError>(CommandError::Canceled)
        }
    });
    car.push(cmd).await.unwrap();
    eventually(|| !sink.failures("a").is_empty()).await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(
        sink.failures("a"),
        vec![FailureReport {
            command: "x".into(),
            attempts: 2,
            error: "command cancelled".into(),
        }]
    );
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn requeue_into_a_full_queue_is_reported_when_the_queue_closes() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let cfg = SupervisorConfig {
        queue_capacity: 1,
        ..config()
    };
    let fleet = fleet_with(cfg, &transport, &sink);
    let journal = Journal::default();
    let mut events = fleet.subscribe_events();

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    let slow = Command::from_fn("slow", |_session: SessionRef, _ctx| async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        Err::<(), CommandError>(CommandError::Fail {
            reason: "slow refused".into(),
        })
    });
    car.push(slow).await.unwrap();
    // Fills the single slot while `slow` is running.
    car.push(journal.ok("filler")).await.unwrap();

    // `slow` failed and its requeue is waiting for room; the link is down.
    eventually(|| sink.connectivity("a").len() == 3).await;
    assert!(sink.failures("a").is_empty());
    car.close();

    eventually(|| !sink.failures("a").is_empty()).await;
    assert_eq!(
        sink.failures("a"),
        vec![FailureReport {
            command: "slow".into(),
            attempts: 1,
            error: "command failed: slow refused".into(),
        }]
    );
    assert!(journal.entries().is_empty());

    let outcomes: Vec<(EventKind, Option<String>)> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e.kind, EventKind::CommandRequeued | EventKind::CommandExhausted))
        .map(|e| (e.kind, e.command.as_deref().map(str::to_string)))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (EventKind::CommandRequeued, Some("slow".into())),
            (EventKind::CommandExhausted, Some("slow".into())),
        ]
    );
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn removal_publishes_the_retained_command() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let fleet = fleet_with(config(), &transport, &sink);
    let journal = Journal::default();
    let mut events = fleet.subscribe_events();
    transport.unreachable(&address("a"));

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    car.push(journal.ok("x")).await.unwrap();
    eventually(|| transport.count(|c| matches!(c, Call::Connect(_))) >= 2).await;

    fleet.remove_device("a").await.unwrap();

    let dropped: Vec<Event> = drain(&mut events)
        .into_iter()
        .filter(|e| e.kind == EventKind::CommandExhausted)
        .collect();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].command.as_deref(), Some("x"));
    assert_eq!(dropped[0].reason.as_deref(), Some("cancelled"));
    assert!(journal.entries().is_empty());
    assert!(sink.failures("a").is_empty());
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn rejected_wake_session_never_opens_the_full_session() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let fleet = fleet_with(config(), &transport, &sink);
    let journal = Journal::default();
    let a = address("a");
    transport.fail_wake_sessions(&a, 1);

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    car.push(journal.ok("x")).await.unwrap();
    eventually(|| !journal.entries().is_empty()).await;

    assert_eq!(
        transport.calls(),
        vec![
            Call::Connect(a.clone()),
            Call::WakeSession(a.clone()),
            Call::Close(a.clone()),
            Call::Connect(a.clone()),
            Call::WakeSession(a.clone()),
            Call::Execute(a.clone(), Action::WakeUp),
            Call::FullSession(a.clone()),
        ]
    );
    // The triggering command survived the failed bootstrap and ran once.
    assert_eq!(journal.entries(), ["x"]);
    assert!(sink.failures("a").is_empty());
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn closing_an_idle_queue_exits_without_connecting() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let fleet = fleet_with(config(), &transport, &sink);
    let mut events = fleet.subscribe_events();

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    car.close();

    let stopped = loop {
        let ev = events.recv().await.unwrap();
        if ev.kind == EventKind::SupervisorStopped {
            break ev;
        }
    };
    assert_eq!(stopped.reason.as_deref(), Some("queue_closed"));
    assert!(transport.calls().is_empty());
    assert_eq!(sink.connectivity("a"), vec![Connectivity::Offline]);

    let journal = Journal::default();
    assert_eq!(car.push(journal.ok("late")).await, Err(QueueError::Closed));
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn transport_failures_back_off_before_any_session() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let fleet = fleet_with(config(), &transport, &sink);
    let journal = Journal::default();
    let mut events = fleet.subscribe_events();
    let a = address("a");
    transport.fail_connects(&a, 3);

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    car.push(journal.ok("x")).await.unwrap();
    eventually(|| !journal.entries().is_empty()).await;

    let calls = transport.calls();
    assert_eq!(&calls[..4], &vec![Call::Connect(a.clone()); 4][..]);
    assert_eq!(calls[4], Call::WakeSession(a.clone()));

    let backoffs: Vec<(Option<u32>, Option<u32>)> = drain(&mut events)
        .into_iter()
        .filter(|e| e.kind == EventKind::BackoffScheduled)
        .map(|e| (e.attempt, e.delay_ms))
        .collect();
    assert_eq!(
        backoffs,
        vec![(Some(1), Some(1000)), (Some(2), Some(1000)), (Some(3), Some(1000))]
    );

    assert_eq!(
        sink.connectivity("a"),
        vec![Connectivity::Offline, Connectivity::Online]
    );
    assert_eq!(journal.entries(), ["x"]);
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn devices_are_supervised_independently() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let fleet = fleet_with(config(), &transport, &sink);
    let journal = Journal::default();
    transport.unreachable(&address("b"));

    let a = fleet.add_device(descriptor("a")).await.unwrap();
    let b = fleet.add_device(descriptor("b")).await.unwrap();

    b.push(journal.ok("b1")).await.unwrap();
    a.push(journal.ok("a1")).await.unwrap();
    a.push(journal.ok("a2")).await.unwrap();
    eventually(|| journal.entries().len() == 2).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(journal.entries(), ["a1", "a2"]);
    assert_eq!(a.connectivity(), Connectivity::Online);
    assert_eq!(b.connectivity(), Connectivity::Offline);
    assert_eq!(b.pending(), 0, "the retained command is held by the supervisor");
    assert!(transport.count(|c| *c == Call::Connect(address("b"))) >= 3);
    assert_eq!(transport.count(|c| *c == Call::Connect(address("a"))), 1);
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn lost_link_reconnects_only_when_work_arrives() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let fleet = fleet_with(config(), &transport, &sink);
    let journal = Journal::default();
    let a = address("a");

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    car.push(journal.ok("x")).await.unwrap();
    eventually(|| car.connectivity() == Connectivity::Online).await;

    transport.drop_link(&a);
    eventually(|| car.connectivity() == Connectivity::Offline).await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.count(|c| matches!(c, Call::Connect(_))), 1);
    assert_eq!(transport.count(|c| matches!(c, Call::Close(_))), 1);

    car.push(journal.ok("y")).await.unwrap();
    eventually(|| journal.entries().len() == 2).await;
    assert_eq!(transport.count(|c| matches!(c, Call::Connect(_))), 2);
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn keepalive_pings_while_active() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let cfg = SupervisorConfig {
        keepalive: Some(Duration::from_secs(30)),
        ..config()
    };
    let fleet = fleet_with(cfg, &transport, &sink);
    let journal = Journal::default();

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    car.push(journal.ok("x")).await.unwrap();
    eventually(|| !journal.entries().is_empty()).await;
    tokio::time::sleep(Duration::from_secs(95)).await;

    let pings = transport.count(|c| matches!(c, Call::Execute(_, Action::Ping)));
    assert_eq!(pings, 3);
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_reports_supervisors_stuck_past_grace() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let fleet = fleet_with(config(), &transport, &sink);
    let journal = Journal::default();
    transport.hang_on_close();

    let car = fleet.add_device(descriptor("a")).await.unwrap();
    fleet.add_device(descriptor("idle")).await.unwrap();
    car.push(journal.ok("x")).await.unwrap();
    eventually(|| !journal.entries().is_empty()).await;

    match fleet.stop().await {
        Err(RuntimeError::GraceExceeded { grace, stuck }) => {
            assert_eq!(grace, Duration::from_secs(1));
            assert_eq!(stuck, vec!["a".to_string()]);
        }
        other => panic!("expected GraceExceeded, got {other:?}"),
    }
    assert!(fleet.devices().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn device_lifecycle_through_the_fleet() {
    let transport = MockTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let fleet = fleet_with(config(), &transport, &sink);

    fleet.add_device(descriptor("a")).await.unwrap();
    fleet.add_device(descriptor("b")).await.unwrap();
    assert!(matches!(
        fleet.add_device(descriptor("a")).await,
        Err(RuntimeError::DuplicateDevice { .. })
    ));
    assert_eq!(fleet.devices().await, ["a", "b"]);

    fleet.remove_device("a").await.unwrap();
    assert!(fleet.device("a").await.is_none());
    assert!(matches!(
        fleet.remove_device("a").await,
        Err(RuntimeError::UnknownDevice { .. })
    ));

    let mut events = fleet.subscribe_events();
    fleet.stop().await.unwrap();
    assert!(
        drain(&mut events)
            .iter()
            .any(|e| e.kind == EventKind::AllStoppedWithin)
    );
    assert!(matches!(
        fleet.add_device(descriptor("c")).await,
        Err(RuntimeError::ShuttingDown)
    ));
}
