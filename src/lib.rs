//! WhatsApp Measurement Gateway API Library
//!
//! Receives WhatsApp Business webhook events, persists click-to-message
//! attribution signals for referral-tagged messages, matches message text
//! against configured keyword mappings, and forwards matched conversions to
//! the Meta Conversions API within a time-based attribution window.
//!
//! # Modules
//!
//! - `auth`: Security-token filter for the management routes.
//! - `capi_client`: Conversions API client and event payload types.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers for the management API.
//! - `models`: Core data models.
//! - `processor`: Per-message attribution pipeline.
//! - `sender`: Attribution gate and conversion-event dispatcher.
//! - `store`: Signal and keyword persistence.
//! - `webhook_handler`: Webhook ingestion and verification handlers.
//! - `webhook_models`: Webhook payload models.

pub mod auth;
pub mod capi_client;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod processor;
pub mod sender;
pub mod store;
pub mod webhook_handler;
pub mod webhook_models;
