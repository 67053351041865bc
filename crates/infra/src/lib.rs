//! # LoanFlow インフラ層
//!
//! データベース（PostgreSQL）と外部サービス（アイデンティティプロバイダ）への
//! アクセスを担当する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! api → infra → domain → shared
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - 接続プールとマイグレーション
//! - [`error`] - インフラ層エラー（SpanTrace 付き）
//! - [`identity`] - アイデンティティプロバイダクライアント
//! - [`repository`] - リポジトリトレイトと PostgreSQL 実装

pub mod db;
pub mod error;
pub mod identity;
pub mod mock;
pub mod repository;

pub use error::{InfraError, InfraErrorKind};
