//! Chatrelay Library
//!
//! Chat backend that streams model generations to clients over server-sent
//! events and persists each exchange as a transcript.

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod generation;
pub mod relay;
