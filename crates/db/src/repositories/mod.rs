//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations, hiding
//! the `SeaORM` implementation details from the rest of the application.
//! Every mutating operation runs as a single database transaction.

pub mod expense;
pub mod family;
pub mod project;
pub mod user;
pub mod wallet;

#[cfg(test)]
mod integration_tests;

pub use expense::{
    CreateExpenseInput, ExpenseError, ExpenseFilter, ExpenseRepository, ExpenseWithSplits,
    SplitLine, UpdateExpenseInput,
};
pub use family::{FamilyError, FamilyRepository, MemberWithUser};
pub use project::{ProjectError, ProjectRepository, ProjectWithSpend, UpdateProjectInput};
pub use user::UserRepository;
pub use wallet::{BalanceView, TransactionView, WalletError, WalletRepository};
