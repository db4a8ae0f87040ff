// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Duplex transport sessions.
//!
//! - [`server`] - WebSocket accept loop, one cooperative task per peer
//! - [`client`] - single-connection client with a one-request in-flight gate
//!
//! Requests are JSON text frames, replies are binary frames; exactly one
//! reply per request, in request order on a connection.

pub mod client;
pub mod server;

pub use client::ClientSession;
pub use server::{ServerSession, ShutdownHandle};
