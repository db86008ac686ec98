//! Range math and part planning.
//!
//! Splits a download into N parts and computes the Part table (byte ranges,
//! segment file names) the Part Workers will transfer.

mod range;

pub use range::plan_parts;
