//! # 認証ハンドラ
//!
//! アイデンティティプロバイダのプロフィール同期エンドポイントを実装する。
//!
//! ## エンドポイント
//!
//! - `GET /api/auth/verify` - プロフィール同期 + 管理者フラグ計算

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use loanflow_domain::user::User;
use loanflow_shared::ApiResponse;
use serde::Serialize;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AuthenticatedUser, usecase::AuthUseCaseImpl};

/// 認証 API の共有状態
pub struct AuthState {
    pub usecase: AuthUseCaseImpl,
}

/// 同期済みユーザーレスポンス
#[derive(Debug, Serialize)]
pub struct VerifiedUserDto {
    pub user_id: Uuid,
    pub provider_user_id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
}

impl From<&User> for VerifiedUserDto {
    fn from(user: &User) -> Self {
        Self {
            user_id: *user.id().as_uuid(),
            provider_user_id: user.provider_user_id().as_str().to_string(),
            email: user.email().as_str().to_string(),
            name: user.name().as_str().to_string(),
            is_admin: user.is_admin(),
        }
    }
}

/// GET /api/auth/verify
///
/// 検証済みの呼び出し元のプロフィールをプロバイダから取得し、
/// ローカルレコードへ同期（upsert）して返す。
/// 管理者フラグは設定された許可リストとの照合で決定する。
///
/// ## レスポンス
///
/// - `200 OK`: 同期済みユーザー
/// - `404 Not Found`: プロバイダにプロフィールが存在しない
#[tracing::instrument(skip_all)]
pub async fn verify_identity(
    State(state): State<Arc<AuthState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.usecase.sync_profile(&caller.0).await?;

    let response = ApiResponse::new(VerifiedUserDto::from(&user));
    Ok((StatusCode::OK, Json(response)))
}
