use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use voiceforge::event_bus::{ChannelSink, Event, EventBus, PlaybackEventSink};

struct CountingSink(Arc<AtomicUsize>);
impl PlaybackEventSink for CountingSink {
    fn on_event(&self, _event: &Event) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn events_reach_every_subscriber() {
    let bus = EventBus::new();
    let count = Arc::new(AtomicUsize::new(0));
    bus.subscribe(Box::new(CountingSink(Arc::clone(&count))));
    bus.subscribe(Box::new(CountingSink(Arc::clone(&count))));
    bus.publish(Event::VolumeChanged(50));
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn position_changed_is_debounced() {
    let bus = EventBus::new();
    let count = Arc::new(AtomicUsize::new(0));
    bus.subscribe(Box::new(CountingSink(Arc::clone(&count))));
    bus.publish(Event::PositionChanged(0));
    bus.publish(Event::PositionChanged(1000));
    bus.publish(Event::PositionChanged(2000));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn non_position_events_are_never_debounced() {
    let bus = EventBus::new();
    let count = Arc::new(AtomicUsize::new(0));
    bus.subscribe(Box::new(CountingSink(Arc::clone(&count))));
    bus.publish(Event::VolumeChanged(10));
    bus.publish(Event::VolumeChanged(20));
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn channel_sink_forwards_events() {
    let (sink, rx) = ChannelSink::new(4);
    let bus = EventBus::new();
    bus.subscribe(Box::new(sink));
    bus.publish(Event::ShuffleChanged(true));
    assert!(matches!(rx.try_recv(), Ok(Event::ShuffleChanged(true))));
}
