//! # HTTP ミドルウェア
//!
//! 認証・認可のリクエスト前処理を定義する。

pub mod auth;

pub use auth::{AuthGateState, AuthenticatedUser, authenticate, require_admin};
