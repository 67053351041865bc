//! # 認証・認可ミドルウェア
//!
//! Authorization Gate を実装する。
//!
//! - [`authenticate`]: ベアラートークンをアイデンティティプロバイダで検証し、
//!   呼び出し元のプロバイダ ID をリクエストに付与する。全 `/api` ルートを包む。
//! - [`require_admin`]: 認証済みの呼び出し元をローカルの User レコードに解決し、
//!   管理者フラグを検証する。`/api/admin` 配下の全ルートを包む。
//!
//! ## 使い方
//!
//! ```rust,ignore
//! use axum::middleware::from_fn_with_state;
//!
//! let gate = AuthGateState { identity, user_repository };
//!
//! Router::new()
//!     .route("/api/admin/loans", get(list_loans))
//!     .route_layer(from_fn_with_state(gate.clone(), require_admin))
//!     .layer(from_fn_with_state(gate, authenticate))
//! ```

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use loanflow_domain::user::ProviderUserId;
use loanflow_infra::identity::IdentityProvider;
use loanflow_infra::repository::UserRepository;
use loanflow_shared::ErrorResponse;

/// Authorization Gate の状態
#[derive(Clone)]
pub struct AuthGateState {
    pub identity:        Arc<dyn IdentityProvider>,
    pub user_repository: Arc<dyn UserRepository>,
}

/// 認証済みの呼び出し元
///
/// `authenticate` がリクエスト拡張に挿入し、
/// ハンドラが `Extension<AuthenticatedUser>` で取り出す。
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub ProviderUserId);

/// `Authorization: Bearer <token>` ヘッダからトークンを取り出す
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn unauthorized_response(detail: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::unauthorized(detail)),
    )
        .into_response()
}

fn forbidden_response(detail: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorResponse::forbidden(detail)),
    )
        .into_response()
}

fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::internal_error()),
    )
        .into_response()
}

/// 認証ミドルウェア
///
/// ベアラートークンを検証し、呼び出し元のプロバイダ ID を
/// リクエスト拡張に挿入する。
/// トークンがない・無効な場合は 401 Unauthorized を返す。
pub async fn authenticate(
    State(state): State<AuthGateState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return unauthorized_response("認証トークンがありません");
    };

    match state.identity.verify_token(&token).await {
        Ok(Some(provider_user_id)) => match ProviderUserId::new(provider_user_id) {
            Ok(provider_user_id) => {
                request
                    .extensions_mut()
                    .insert(AuthenticatedUser(provider_user_id));
                next.run(request).await
            }
            Err(_) => unauthorized_response("トークンが無効です"),
        },
        Ok(None) => unauthorized_response("トークンが無効または期限切れです"),
        Err(e) => {
            tracing::error!("トークン検証で内部エラー: {}", e);
            internal_error_response()
        }
    }
}

/// 認可ミドルウェア（管理者チェック）
///
/// 認証済みの呼び出し元をローカルの User レコードに解決し、
/// 管理者フラグを検証する。
/// レコードが存在しない、または管理者でない場合は 403 Forbidden を返す。
/// 副作用はない（読み取り専用チェック）。
pub async fn require_admin(
    State(state): State<AuthGateState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(AuthenticatedUser(provider_user_id)) =
        request.extensions().get::<AuthenticatedUser>().cloned()
    else {
        return unauthorized_response("認証されていません");
    };

    match state
        .user_repository
        .find_by_provider_id(&provider_user_id)
        .await
    {
        Ok(Some(user)) if user.is_admin() => next.run(request).await,
        Ok(_) => forbidden_response("管理者権限が必要です"),
        Err(e) => {
            tracing::error!("管理者判定で内部エラー: {}", e);
            internal_error_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        Router,
        body::Body,
        http::{Method, Request, StatusCode},
        middleware::from_fn_with_state,
        response::IntoResponse,
        routing::get,
    };
    use chrono::Utc;
    use loanflow_domain::user::{Email, User, UserId};
    use loanflow_domain::value_objects::UserName;
    use loanflow_infra::InfraError;
    use loanflow_infra::identity::IdentityProfile;
    use tower::ServiceExt;

    use super::*;

    const TEST_PROVIDER_ID: &str = "user_2abcDEF";

    /// テスト用のダミーハンドラ
    async fn dummy_handler() -> impl IntoResponse {
        StatusCode::OK
    }

    /// テスト用スタブ IdentityProvider
    ///
    /// `valid_token` に一致するトークンのみ `TEST_PROVIDER_ID` に解決する。
    struct StubIdentityProvider {
        valid_token: Option<String>,
    }

    #[async_trait]
    impl IdentityProvider for StubIdentityProvider {
        async fn verify_token(&self, token: &str) -> Result<Option<String>, InfraError> {
            Ok(self
                .valid_token
                .as_deref()
                .filter(|valid| *valid == token)
                .map(|_| TEST_PROVIDER_ID.to_string()))
        }

        async fn fetch_profile(
            &self,
            _provider_user_id: &str,
        ) -> Result<Option<IdentityProfile>, InfraError> {
            Ok(None)
        }
    }

    /// テスト用スタブ UserRepository
    struct StubUserRepository {
        user: Option<User>,
    }

    impl StubUserRepository {
        fn empty() -> Self {
            Self { user: None }
        }

        fn with_user(is_admin: bool) -> Self {
            let now = Utc::now();
            Self {
                user: Some(User::new(
                    UserId::new(),
                    ProviderUserId::new(TEST_PROVIDER_ID).unwrap(),
                    Email::new("user@example.com").unwrap(),
                    UserName::new("Test User").unwrap(),
                    is_admin,
                    now,
                )),
            }
        }
    }

    #[async_trait]
    impl UserRepository for StubUserRepository {
        async fn upsert_by_provider_id(&self, user: &User) -> Result<User, InfraError> {
            Ok(user.clone())
        }

        async fn find_by_provider_id(
            &self,
            provider_user_id: &ProviderUserId,
        ) -> Result<Option<User>, InfraError> {
            Ok(self
                .user
                .clone()
                .filter(|u| u.provider_user_id() == provider_user_id))
        }

        async fn find_all_paged(
            &self,
            _limit: i64,
            _offset: i64,
        ) -> Result<Vec<User>, InfraError> {
            Ok(Vec::new())
        }

        async fn count(&self) -> Result<i64, InfraError> {
            Ok(0)
        }

        async fn count_admins(&self) -> Result<i64, InfraError> {
            Ok(0)
        }
    }

    fn create_test_app(identity: StubIdentityProvider, users: StubUserRepository) -> Router {
        let gate = AuthGateState {
            identity:        Arc::new(identity),
            user_repository: Arc::new(users),
        };

        Router::new()
            .route("/admin-only", get(dummy_handler))
            .route_layer(from_fn_with_state(gate.clone(), require_admin))
            .route("/user-only", get(dummy_handler))
            .layer(from_fn_with_state(gate, authenticate))
    }

    fn request(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_有効なトークンは認証を通過する() {
        let sut = create_test_app(
            StubIdentityProvider {
                valid_token: Some("valid-token".to_string()),
            },
            StubUserRepository::empty(),
        );

        let response = sut
            .oneshot(request("/user-only", Some("valid-token")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_トークンなしは401を返す() {
        let sut = create_test_app(
            StubIdentityProvider {
                valid_token: Some("valid-token".to_string()),
            },
            StubUserRepository::empty(),
        );

        let response = sut.oneshot(request("/user-only", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_無効なトークンは401を返す() {
        let sut = create_test_app(
            StubIdentityProvider {
                valid_token: Some("valid-token".to_string()),
            },
            StubUserRepository::empty(),
        );

        let response = sut
            .oneshot(request("/user-only", Some("expired-token")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_管理者は管理ルートを通過する() {
        let sut = create_test_app(
            StubIdentityProvider {
                valid_token: Some("valid-token".to_string()),
            },
            StubUserRepository::with_user(true),
        );

        let response = sut
            .oneshot(request("/admin-only", Some("valid-token")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_非管理者は管理ルートで403を返す() {
        let sut = create_test_app(
            StubIdentityProvider {
                valid_token: Some("valid-token".to_string()),
            },
            StubUserRepository::with_user(false),
        );

        let response = sut
            .oneshot(request("/admin-only", Some("valid-token")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_ローカルレコードのないユーザーは管理ルートで403を返す() {
        let sut = create_test_app(
            StubIdentityProvider {
                valid_token: Some("valid-token".to_string()),
            },
            StubUserRepository::empty(),
        );

        let response = sut
            .oneshot(request("/admin-only", Some("valid-token")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_管理ルートもトークンなしは401を返す() {
        let sut = create_test_app(
            StubIdentityProvider { valid_token: None },
            StubUserRepository::with_user(true),
        );

        let response = sut.oneshot(request("/admin-only", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
