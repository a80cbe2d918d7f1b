mod events;
mod history;

pub use events::JsonEventStore;
pub use history::FileHistoryArchive;
