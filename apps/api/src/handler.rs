//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ビジネスロジックはユースケース層に委譲

pub mod admin;
pub mod auth;
pub mod health;
pub mod loan;

pub use admin::{
    AdminState,
    get_dashboard_stats,
    get_loan,
    list_loans,
    list_users,
    update_loan_status,
};
pub use auth::{AuthState, verify_identity};
pub use health::health_check;
pub use loan::{LoanState, create_loan, delete_loan, list_my_loans, list_user_loans};
