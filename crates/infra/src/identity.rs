//! # アイデンティティプロバイダクライアント
//!
//! 外部アイデンティティプロバイダへの通信を担当する。
//! トークンの発行・検証とユーザープロフィールの管理はプロバイダ側の責務で、
//! このシステムは REST API 経由で消費するのみ。
//!
//! ## エンドポイント
//!
//! - `POST /v1/tokens/verify` - ベアラートークンの検証
//! - `GET /v1/users/{id}` - プロフィール取得

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InfraError;

/// プロバイダから取得したユーザープロフィール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    /// プロバイダ発行の不透明な識別子
    pub provider_user_id: String,
    /// プライマリメールアドレス
    pub email: String,
    /// 表示名（名・姓の結合。両方空の場合は空文字列）
    pub name: String,
}

/// アイデンティティプロバイダクライアントトレイト
///
/// テスト時にスタブを使用できるようトレイトで定義。
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// ベアラートークンを検証し、プロバイダ ID を解決する
    ///
    /// # 戻り値
    ///
    /// - `Ok(Some(provider_user_id))`: トークンが有効な場合
    /// - `Ok(None)`: トークンが無効または期限切れの場合
    /// - `Err(_)`: プロバイダとの通信エラー
    async fn verify_token(&self, token: &str) -> Result<Option<String>, InfraError>;

    /// プロバイダ ID からプロフィールを取得する
    ///
    /// # 戻り値
    ///
    /// - `Ok(Some(profile))`: ユーザーが存在する場合
    /// - `Ok(None)`: ユーザーが存在しない場合
    /// - `Err(_)`: プロバイダとの通信エラー
    async fn fetch_profile(
        &self,
        provider_user_id: &str,
    ) -> Result<Option<IdentityProfile>, InfraError>;
}

// --- リクエスト/レスポンス型 ---

/// トークン検証リクエスト
#[derive(Debug, Serialize)]
struct VerifyTokenRequest<'a> {
    token: &'a str,
}

/// トークン検証レスポンス
#[derive(Debug, Deserialize)]
struct VerifyTokenResponse {
    user_id: String,
}

/// プロフィールレスポンス
#[derive(Debug, Deserialize)]
struct ProviderUserResponse {
    id: String,
    email_addresses: Vec<ProviderEmailAddress>,
    first_name: Option<String>,
    last_name: Option<String>,
}

/// プロフィール内のメールアドレス要素
#[derive(Debug, Deserialize)]
struct ProviderEmailAddress {
    email_address: String,
}

/// 名・姓から表示名を組み立てる
///
/// どちらかが欠けていても残りを使い、前後の空白を除去する。
fn assemble_name(first_name: Option<&str>, last_name: Option<&str>) -> String {
    format!(
        "{} {}",
        first_name.unwrap_or_default(),
        last_name.unwrap_or_default()
    )
    .trim()
    .to_string()
}

/// HTTP 実装のアイデンティティプロバイダクライアント
pub struct HttpIdentityProvider {
    base_url:   String,
    secret_key: String,
    client:     reqwest::Client,
}

impl HttpIdentityProvider {
    /// 新しいクライアントを作成する
    ///
    /// # 引数
    ///
    /// - `base_url`: プロバイダ API のベース URL
    /// - `secret_key`: サーバー間認証用のシークレットキー
    pub fn new(base_url: &str, secret_key: impl Into<String>) -> Self {
        Self {
            base_url:   base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            client:     reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[tracing::instrument(skip_all)]
    async fn verify_token(&self, token: &str) -> Result<Option<String>, InfraError> {
        let url = format!("{}/v1/tokens/verify", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&VerifyTokenRequest { token })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body = response.json::<VerifyTokenResponse>().await?;
                Ok(Some(body.user_id))
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::NOT_FOUND => Ok(None),
            status => Err(InfraError::unexpected(format!(
                "トークン検証で予期しないステータス: {status}"
            ))),
        }
    }

    #[tracing::instrument(skip_all, fields(%provider_user_id))]
    async fn fetch_profile(
        &self,
        provider_user_id: &str,
    ) -> Result<Option<IdentityProfile>, InfraError> {
        let url = format!("{}/v1/users/{}", self.base_url, provider_user_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body = response.json::<ProviderUserResponse>().await?;

                let email = body
                    .email_addresses
                    .first()
                    .map(|e| e.email_address.clone())
                    .ok_or_else(|| {
                        InfraError::unexpected(format!(
                            "プロバイダのプロフィールにメールアドレスがありません: {}",
                            body.id
                        ))
                    })?;

                Ok(Some(IdentityProfile {
                    provider_user_id: body.id,
                    email,
                    name: assemble_name(body.first_name.as_deref(), body.last_name.as_deref()),
                }))
            }
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status => Err(InfraError::unexpected(format!(
                "プロフィール取得で予期しないステータス: {status}"
            ))),
        }
    }
}
