//! Unit tests for the hub service facade.
//!
//! Transport behaviour is scripted with `mockall` doubles so each test pins
//! down exactly which connects, listings, invocations and closes happen.
