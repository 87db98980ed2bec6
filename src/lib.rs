//! Prediction of the ACMG/AMP PVS1 strength for loss-of-function variants.

pub mod batch;
pub mod classify;
pub mod common;
pub mod conf;
pub mod err;
pub mod pvs1;
pub mod snapshot;
