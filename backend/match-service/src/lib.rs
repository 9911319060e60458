pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{MatchError, Result};
pub use services::{
    CandidatePool, FameRecalculator, InMemoryDirectory, PgDirectory, RankingEngine,
    SuggestionRequest, SuggestionService,
};
