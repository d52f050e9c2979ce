//! Inventory subsystems. Each takes an explicit [`crate::core::store::Store`].

pub mod assembly;
pub mod inventory;
pub mod records;
pub mod reports;
