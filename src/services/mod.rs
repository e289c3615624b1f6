pub mod document_parser;
pub mod event_log;
pub mod image_resolver;
pub mod locator;
pub mod progress_store;
pub mod wait;

pub use document_parser::{parse_document, DocumentParser};
pub use event_log::{
    EventSink, FanoutEventSink, JsonlEventSink, MemoryEventSink, PublishEvent, TracingEventSink,
};
pub use image_resolver::ImageResolver;
pub use locator::{LocatorResolver, Target};
pub use progress_store::ProgressStore;
pub use wait::{poll_until, PollPolicy};
