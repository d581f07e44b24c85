//! Integration tests against the full axum `Router`, exercised with
//! `tower::ServiceExt::oneshot` the way the reference server's own
//! `src/tests/` module does. Colocated rather than under a top-level
//! `tests/` directory since these need `pub(crate)` access to
//! [`crate::app_state::AppState`]'s fields to assemble a fixture.

mod routes_integration_tests;
mod test_utils;
