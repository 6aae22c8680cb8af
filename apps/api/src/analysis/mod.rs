// AI-backed analysis features: style insight, identity alignment,
// content compass and outfit visualizer.
// All provider calls go through llm_client; no direct Gemini calls here.

pub mod contract;
pub mod data_uri;
pub mod features;
pub mod handlers;
pub mod prompts;
pub mod schema;

#[cfg(test)]
pub mod test_support;
