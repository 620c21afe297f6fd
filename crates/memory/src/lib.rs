//! Session-scoped conversational memory
//!
//! A process-wide table of bounded per-session turn histories. Constructed at
//! service start, torn down at service stop; callers only see the
//! `read`/`append` contract, never the underlying container.

mod store;

pub use store::ConversationStore;
