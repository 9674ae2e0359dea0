//! apcdeploy AWS - AppConfig adapter
//!
//! Implements the engine's provider traits on top of the AWS SDK. Only
//! requests and data mapping live here; every workflow decision is made by
//! `apcdeploy-engine`.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod client;
pub mod convert;
pub mod error;

pub use client::AwsAppConfig;
pub use error::classify;
