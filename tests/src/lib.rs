//! # MQTT Adapter Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── send_fanout.rs     # Adapter-to-adapter request/response
//! │   └── inbound_funnel.rs  # Bound handlers, backpressure, FIFO
//! └── benches/
//!     └── adapter_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p adapter-tests
//! cargo test -p adapter-tests integration::send_fanout
//! cargo bench -p adapter-tests
//! ```

pub mod integration;
