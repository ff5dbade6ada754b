// Composition root for the catalog sync service.
//
// Responsibilities
// - Read config from environment.
// - Instantiate concrete infrastructure implementations.
// - Wire implementations into use case handlers and inbound routes.

pub mod config;
pub mod graphql;
pub mod http;
pub mod state;
