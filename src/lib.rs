//! Backend for a lecture Q&A chat assistant. A query is routed to a
//! topic partition, relevant transcript passages are retrieved from the
//! vector store, and an answer grounded in those passages is generated
//! with lecture/timestamp citations.

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod retriever;
pub mod router;
pub mod synthesizer;
pub mod topics;
