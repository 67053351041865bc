//! # LoanFlow API ライブラリ
//!
//! API サーバーの設定・ハンドラ・ユースケースを公開する。
//! テスト用に内部モジュールへのアクセスを提供する。

pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod usecase;
