//! CEP → Bitrix24 address sync library
//!
//! Resolves a Brazilian postal code (CEP) to city, street, neighborhood and state
//! through a chain of public CEP APIs, and writes the result into a Bitrix24 deal.
//!
//! # Modules
//!
//! - `api`: Router assembly and OpenAPI document.
//! - `bitrix_client`: Bitrix24 webhook client (`crm.deal.update`).
//! - `cache`: Bounded LRU cache of resolved CEPs.
//! - `circuit_breaker`: Per-provider circuit breakers.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Address, provider payloads and response bodies.
//! - `resolver`: Provider fallback and caching.
//! - `services`: CEP provider clients (ViaCEP, OpenCEP, BrasilAPI).

pub mod api;
pub mod bitrix_client;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod resolver;
pub mod services;
