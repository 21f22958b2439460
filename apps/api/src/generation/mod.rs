//! Ad Text Generation
//!
//! Structured prompt building, reply parsing and the generate / variant / shorten
//! calls. All LLM traffic goes through the `Completion` seam in `llm_client`.

pub mod generator;
pub mod handlers;
pub mod parse;
pub mod prompts;
