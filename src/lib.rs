//! Bike Distributor
//!
//! Quantity-based discount resolution and line pricing for a bicycle distributor. Bikes carry an
//! optional discount schedule mapping minimum quantities to rules (percentage, fixed amount or a
//! small script); pricing a line resolves the winning rule and derives the unit and total
//! discount figures, which orders aggregate into a taxed total and renderers turn into receipts.

pub mod bikes;
pub mod discounts;
pub mod fixtures;
pub mod orders;
pub mod prelude;
pub mod pricing;
pub mod renderers;
pub mod schedules;
pub mod scripting;
pub mod validation;
