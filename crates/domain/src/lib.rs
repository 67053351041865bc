//! # LoanFlow ドメイン層
//!
//! ビジネスロジックの中核を担うドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! このクレートは DDD（ドメイン駆動設計）の原則に従い、以下を提供する:
//!
//! - **エンティティ**: 一意の識別子を持つオブジェクト（例: LoanApplication,
//!   User）
//! - **値オブジェクト**: 識別子を持たない不変オブジェクト（例: LoanAmount,
//!   LoanStatus）
//! - **ドメインエラー**: ビジネスルール違反を表現するエラー型
//!
//! ## 依存関係の方向
//!
//! ```text
//! api → infra → domain → shared
//! ```
//!
//! ドメイン層はインフラ層（DB、外部サービス）には一切依存しない。
//! これにより、ビジネスロジックの純粋性が保たれる。
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`loan`] - ローン申請エンティティとステータス遷移ポリシー
//! - [`user`] - ユーザーエンティティとプロバイダ ID
//! - [`value_objects`] - 共有される値オブジェクト
//! - [`clock`] - テスト可能な時刻プロバイダ
//!
//! ## 使用例
//!
//! ```rust
//! use loanflow_domain::{DomainError, loan::LoanApplicationId};
//!
//! // ローン申請 ID の生成
//! let loan_id = LoanApplicationId::new();
//!
//! // ドメインエラーの生成
//! let error = DomainError::NotFound {
//!     entity_type: "LoanApplication",
//!     id:          loan_id.to_string(),
//! };
//! ```

#[macro_use]
mod macros;

pub mod clock;
pub mod error;
pub mod loan;
pub mod user;
pub mod value_objects;

pub use error::DomainError;

/// PII フィールドの Debug 出力に使用するマスク文字列
pub const REDACTED: &str = "[REDACTED]";
