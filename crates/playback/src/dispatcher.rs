//! Fan-out of session, clock and library events to subscribers

use crossbeam_channel::{unbounded, Receiver, Sender};
use lectern_core::{BookKey, Event, PlaybackStatus};
use log::debug;

/// Receives every dispatched event, in production order
pub trait Subscriber: Send {
    fn on_event(&mut self, event: &Event);
}

/// Delivers events to subscribers.
///
/// Position ticks are coalesced: only the latest one is delivered, at
/// [`Dispatcher::end_tick`] or right before the next non-tick event.
/// A `TrackChanged` for the book that is already current is dropped.
#[derive(Default)]
pub struct Dispatcher {
    subscribers: Vec<Box<dyn Subscriber>>,
    pending_tick: Option<Event>,
    current_track: Option<BookKey>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn publish(&mut self, event: Event) {
        if event.is_position_tick() {
            self.pending_tick = Some(event);
            return;
        }
        self.flush_tick();

        match &event {
            Event::TrackChanged { key, .. } => {
                if self.current_track.as_ref() == Some(key) {
                    debug!("Suppressing repeated track change for {}", key);
                    return;
                }
                self.current_track = Some(key.clone());
            }
            Event::StatusChanged {
                status: PlaybackStatus::Idle,
                ..
            } => self.current_track = None,
            _ => {}
        }

        self.deliver(&event);
    }

    pub fn publish_all(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Delivers the tick held back during this clock period
    pub fn end_tick(&mut self) {
        self.flush_tick();
    }

    fn flush_tick(&mut self) {
        if let Some(tick) = self.pending_tick.take() {
            self.deliver(&tick);
        }
    }

    fn deliver(&mut self, event: &Event) {
        for subscriber in &mut self.subscribers {
            subscriber.on_event(event);
        }
    }
}

/// Forwards events to a crossbeam channel, for a UI thread to drain
pub struct ChannelSubscriber {
    tx: Sender<Event>,
}

impl ChannelSubscriber {
    pub fn new() -> (Self, Receiver<Event>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl Subscriber for ChannelSubscriber {
    fn on_event(&mut self, event: &Event) {
        if self.tx.send(event.clone()).is_err() {
            debug!("Event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> BookKey {
        BookKey::from_string("a")
    }

    fn tick(position: f64) -> Event {
        Event::PositionTick {
            key: key(),
            position,
            duration: Some(100.0),
        }
    }

    fn dispatcher() -> (Dispatcher, Receiver<Event>) {
        let mut dispatcher = Dispatcher::new();
        let (subscriber, rx) = ChannelSubscriber::new();
        dispatcher.subscribe(Box::new(subscriber));
        (dispatcher, rx)
    }

    #[test]
    fn test_ticks_coalesce_to_latest() {
        let (mut dispatcher, rx) = dispatcher();
        dispatcher.publish(tick(1.0));
        dispatcher.publish(tick(1.5));
        dispatcher.publish(tick(2.0));
        assert!(rx.try_recv().is_err());

        dispatcher.end_tick();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![tick(2.0)]);
    }

    #[test]
    fn test_pending_tick_precedes_next_event() {
        let (mut dispatcher, rx) = dispatcher();
        let finished = Event::Finished { key: key() };
        dispatcher.publish(tick(99.0));
        dispatcher.publish(finished.clone());
        dispatcher.end_tick();

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![tick(99.0), finished]);
    }

    #[test]
    fn test_repeated_track_change_is_suppressed_until_idle() {
        let (mut dispatcher, rx) = dispatcher();
        let track = Event::TrackChanged {
            key: key(),
            title: "A".to_string(),
        };
        dispatcher.publish(track.clone());
        dispatcher.publish(track.clone());
        assert_eq!(rx.try_iter().count(), 1);

        dispatcher.publish(Event::StatusChanged {
            key: key(),
            status: PlaybackStatus::Idle,
        });
        dispatcher.publish(track);
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let (mut dispatcher, rx) = dispatcher();
        drop(rx);
        dispatcher.publish(Event::TimerCancelled);
    }
}
