//! entity-server — illustrative REST surface over the entity engine.
//!
//! This crate is a thin demonstration: it wires one `axum` router over a
//! tenant-scoped path prefix (`/t/:tenant_id/...`) so a caller can reach
//! every kernel operation over HTTP. Tenant authentication, subdomain
//! routing and rate limiting are all out of scope — an embedder exposing
//! the engine for real would put its own edge in front of this.
//!
//! Routes:
//!   GET    /health                                   — liveness
//!   POST   /t/:tenant/nouns                           — defineNoun
//!   GET    /t/:tenant/nouns                           — list nouns
//!   GET    /t/:tenant/nouns/:name                     — get noun
//!   POST   /t/:tenant/entities/:type                  — create
//!   GET    /t/:tenant/entities/:type                  — list (filter/sort/paginate)
//!   GET    /t/:tenant/entities/:type/:id              — get
//!   PATCH  /t/:tenant/entities/:type/:id              — update
//!   DELETE /t/:tenant/entities/:type/:id               — delete
//!   POST   /t/:tenant/entities/:type/:id/verbs/:verb  — execute custom verb
//!   GET    /t/:tenant/entities/:type/:id/history      — event history
//!   GET    /t/:tenant/entities/:type/:id/reconstruct  — time-travel reconstruct
//!   GET    /t/:tenant/entities/:type/:id/diff         — time-travel diff
//!   GET    /t/:tenant/events                          — query events
//!   GET    /t/:tenant/cdc                             — poll CDC stream
//!   POST   /t/:tenant/subscriptions                   — create subscription
//!   GET    /t/:tenant/subscriptions                   — list subscriptions
//!   POST   /t/:tenant/integration-hooks                — register integration hook
//!   GET    /t/:tenant/integration-hooks                — list integration hooks (incl. built-ins)
//!   GET    /t/:tenant/dispatch-log                     — list dispatch log entries
//!   GET    /t/:tenant/relationships                    — forward/reverse relationship lookup
//!   POST   /t/:tenant/relationships                    — link
//!   DELETE /t/:tenant/relationships                    — unlink
//!   GET    /t/:tenant/status                           — tenant metadata
//!   POST   /t/:tenant/deactivate                       — deactivate tenant
//!   POST   /t/:tenant/reactivate                       — reactivate tenant

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
