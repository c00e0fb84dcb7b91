//! `SeaORM` entity definitions.

pub mod expense_splits;
pub mod expenses;
pub mod families;
pub mod family_members;
pub mod projects;
pub mod sea_orm_active_enums;
pub mod transactions;
pub mod users;
pub mod wallets;
