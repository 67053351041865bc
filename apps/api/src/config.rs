//! # API サーバー設定
//!
//! 環境変数から API サーバーの設定を読み込む。
//!
//! 設定はプロセス起動時に一度だけ読み込まれ、不変の構造体として
//! 必要なコンポーネントへ参照渡しされる。ハンドラ内での環境変数の
//! 直接参照は行わない。

use std::env;

/// API サーバーの設定
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// データベース接続 URL
    pub database_url: String,
    /// CORS で許可するオリジン一覧
    pub allowed_origins: Vec<String>,
    /// 管理者メールアドレス許可リスト（小文字で比較）
    pub admin_emails: Vec<String>,
    /// アイデンティティプロバイダ設定
    pub identity: IdentityConfig,
}

/// アイデンティティプロバイダの設定
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// プロバイダ API のベース URL
    pub base_url:   String,
    /// サーバー間認証用のシークレットキー
    pub secret_key: String,
}

impl ApiConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("API_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .expect("API_PORT は有効なポート番号である必要があります"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL が設定されていません"),
            allowed_origins: parse_list(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            admin_emails: parse_email_list(&env::var("ADMIN_EMAILS").unwrap_or_default()),
            identity: IdentityConfig::from_env(),
        })
    }
}

impl IdentityConfig {
    /// 環境変数からアイデンティティプロバイダ設定を読み込む
    fn from_env() -> Self {
        Self {
            base_url:   env::var("IDENTITY_BASE_URL")
                .expect("IDENTITY_BASE_URL が設定されていません"),
            secret_key: env::var("IDENTITY_SECRET_KEY")
                .expect("IDENTITY_SECRET_KEY が設定されていません"),
        }
    }
}

/// カンマ区切りの環境変数値をリストに分解する
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// カンマ区切りのメールアドレスリストを小文字正規化して分解する
fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}
