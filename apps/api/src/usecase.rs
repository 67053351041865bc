//! # ユースケース層
//!
//! ハンドラから呼び出されるビジネスロジックを実装する。
//! リポジトリ・アイデンティティプロバイダにはトレイト経由で依存し、
//! テストではインメモリ実装に差し替える。

pub mod auth;
pub mod dashboard;
pub(crate) mod helpers;
pub mod loan;
pub mod review;

pub use auth::AuthUseCaseImpl;
pub use dashboard::{DashboardStats, DashboardUseCaseImpl};
pub use loan::{CreateLoanInput, LoanApplicationUseCaseImpl};
pub use review::LoanReviewUseCaseImpl;
