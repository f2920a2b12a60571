//! Authentication and session service for the device-repair platform.
//!
//! The server side owns credential validation, session issuance, and the
//! session-validation middleware; the `client` module is the matching
//! consumer used by front-end shells: one owned auth client, a bounded role
//! resolver, and the pure redirect mapping.

pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub mod models {
    pub mod session;
    pub mod user;
}

pub mod repositories {
    pub mod user;
}

pub mod services {
    pub mod auth;
}

pub mod handlers {
    pub mod admin;
    pub mod auth;
    pub mod health;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod csrf;
    pub mod rate_limit;
}

pub mod validation {
    pub mod auth;
}

pub mod client {
    pub mod redirect;
    pub mod resolver;
    pub mod session;
}
