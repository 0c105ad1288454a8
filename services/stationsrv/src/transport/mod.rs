//! Link Transport Module
//!
//! One [`LinkTransport`] owns one open serial link to a board chain and turns
//! its byte stream into decoded frames.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             Device Manager              │
//! │   broadcast(), collect(), transmit()    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │             LinkTransport               │
//! │       write(), read_framed()            │
//! └─────────────────────────────────────────┘
//!                     │
//!           ┌─────────┴─────────┐
//!           ▼                   ▼
//!     ┌───────────┐       ┌───────────┐
//!     │ SerialLink│       │ MockLink  │
//!     │ (LinkIo)  │       │ (LinkIo)  │
//!     └───────────┘       └───────────┘
//! ```

pub mod link;
pub mod serial;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use link::LinkTransport;
pub use serial::{SerialLink, SerialOpener};
pub use traits::{LinkIo, LinkOpener, TransportError};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockLink, MockOpener};
