//! Lectern playback
//!
//! A [`PlaybackSession`] binds one book to a [`Transport`] and owns its
//! session state. The [`ClockService`] ticks it: polling position, wrapping
//! A-B loops, deciding when state is worth saving and running the sleep
//! timer. Everything that happens is published as events through the
//! [`Dispatcher`], where the [`Announcer`] turns them into speech.

pub mod announcer;
pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod session;
pub mod transport;

pub use announcer::{describe, AccessibilityChannel, Announcer, FocusHandle, Importance};
pub use clock::{ClockService, ClockSettings, SaveRequest, TimerAction};
pub use dispatcher::{ChannelSubscriber, Dispatcher, Subscriber};
pub use error::{SessionError, SessionResult, TransportError, TransportResult};
pub use session::{smart_resume_target, ChapterJump, LoopPress, PlaybackSession, SessionSettings};
pub use transport::{GuardedTransport, Transport, TransportEvent};
