//! HTTP transport
//!
//! The executor builds requests and interprets responses; sockets, TLS and
//! timeouts belong to whatever implements [`HttpTransport`].

pub mod client;

pub use client::{
    HttpClient, HttpClientBuilder, HttpRequest, HttpResponse, HttpTransport, TransportError,
};
