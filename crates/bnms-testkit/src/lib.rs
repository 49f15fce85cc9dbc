//! BNMS Testing Infrastructure
//!
//! Fixtures and an in-process network harness shared by the integration
//! tests and the demo driver.
//!
//! ```rust,no_run
//! use bnms_testkit::{role, TestNetwork};
//!
//! # async fn example() -> bnms_core::MembershipResult<()> {
//! let net = TestNetwork::builder().participants(3).build();
//! net.onboard_all(role("DEFAULT")).await?;
//! let directory = net.sync(0, true).await?;
//! assert_eq!(directory.len(), 3);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod fixtures;
pub mod network;

pub use fixtures::*;
pub use network::{TestNetwork, TestNetworkBuilder};
