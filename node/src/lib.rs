// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod api;
pub mod telemetry;
pub mod store;
pub mod context;
pub mod peers;
pub mod generator;
pub mod builder;
pub mod ingest;
pub mod network;
pub mod sync;
pub mod server;
