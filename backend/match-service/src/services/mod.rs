pub mod compatibility;
pub mod geo;
pub mod pool;
pub mod presence;
pub mod ranking;
pub mod reputation;
pub mod suggestions;

pub use pool::{CandidatePool, InMemoryDirectory, PgDirectory};
pub use presence::{LocalPresence, PresenceReader, RedisPresence};
pub use ranking::RankingEngine;
pub use reputation::FameRecalculator;
pub use suggestions::{SuggestionRequest, SuggestionService};
