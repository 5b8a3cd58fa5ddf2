use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tileboard::events::{DashboardEvent, EventBus};

#[test]
fn listeners_receive_typed_payloads_in_order() {
    let bus = EventBus::new();
    let seen: Arc<Mutex<Vec<DashboardEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let seen2 = Arc::clone(&seen);
    bus.subscribe(move |event| seen2.lock().unwrap().push(event.clone()));

    bus.publish(&DashboardEvent::WidgetRemoved { id: "clock".into() });
    bus.publish(&DashboardEvent::Reloaded);

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            DashboardEvent::WidgetRemoved { id: "clock".into() },
            DashboardEvent::Reloaded,
        ]
    );
}

#[test]
fn panicking_listener_does_not_block_the_rest() {
    let bus = EventBus::new();
    let reached = Arc::new(AtomicUsize::new(0));
    bus.subscribe(|_| panic!("listener bug"));
    let reached2 = Arc::clone(&reached);
    bus.subscribe(move |_| {
        reached2.fetch_add(1, Ordering::SeqCst);
    });

    bus.publish(&DashboardEvent::Reloaded);
    assert_eq!(reached.load(Ordering::SeqCst), 1);
}

#[test]
fn unsubscribe_is_idempotent_and_stops_delivery() {
    let bus = EventBus::new();
    let count = Arc::new(AtomicUsize::new(0));
    let count2 = Arc::clone(&count);
    let id = bus.subscribe(move |_| {
        count2.fetch_add(1, Ordering::SeqCst);
    });

    bus.publish(&DashboardEvent::Reloaded);
    bus.unsubscribe(id);
    bus.unsubscribe(id);
    bus.publish(&DashboardEvent::Reloaded);

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(bus.listener_count(), 0);
}

#[test]
fn listeners_may_reenter_the_bus() {
    let bus = Arc::new(EventBus::new());
    let bus2 = Arc::clone(&bus);
    let count = Arc::new(AtomicUsize::new(0));
    let count2 = Arc::clone(&count);
    bus.subscribe(move |event| {
        if matches!(event, DashboardEvent::Reloaded) {
            count2.fetch_add(1, Ordering::SeqCst);
            // Reading state from inside a listener must not deadlock.
            let _ = bus2.listener_count();
        }
    });

    bus.publish(&DashboardEvent::Reloaded);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
