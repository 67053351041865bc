//! # 認証同期ユースケース
//!
//! アイデンティティプロバイダのプロフィールをローカルの User レコードに
//! 同期（upsert）する。管理者フラグは設定された許可リストとの
//! 大文字小文字を区別しない照合で決定する。

use std::sync::Arc;

use loanflow_domain::clock::Clock;
use loanflow_domain::user::{Email, ProviderUserId, User, UserId};
use loanflow_domain::value_objects::UserName;
use loanflow_infra::identity::IdentityProvider;
use loanflow_infra::repository::UserRepository;

use crate::error::ApiError;
use crate::usecase::helpers::FindResultExt;

/// 認証同期ユースケース実装
pub struct AuthUseCaseImpl {
    user_repository: Arc<dyn UserRepository>,
    identity: Arc<dyn IdentityProvider>,
    /// 小文字に正規化済みの管理者メール許可リスト
    admin_emails: Vec<String>,
    clock: Arc<dyn Clock>,
}

impl AuthUseCaseImpl {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        identity: Arc<dyn IdentityProvider>,
        admin_emails: &[String],
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_repository,
            identity,
            admin_emails: admin_emails.iter().map(|e| e.to_lowercase()).collect(),
            clock,
        }
    }

    /// メールアドレスが管理者許可リストに含まれるか判定する
    fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.contains(&email.to_lowercase())
    }

    /// プロバイダのプロフィールをローカルレコードへ同期する
    ///
    /// プロフィールを取得し、管理者フラグを計算して upsert する。
    /// 既存レコードがある場合は id / created_at を保持したまま
    /// プロフィールを上書きする。
    ///
    /// # エラー
    ///
    /// - `NotFound`: プロバイダにプロフィールが存在しない
    /// - `Internal`: プロバイダのプロフィールがローカルの検証を通らない
    #[tracing::instrument(skip_all, fields(%provider_user_id))]
    pub async fn sync_profile(
        &self,
        provider_user_id: &ProviderUserId,
    ) -> Result<User, ApiError> {
        // 1. プロバイダからプロフィールを取得
        let profile = self
            .identity
            .fetch_profile(provider_user_id.as_str())
            .await
            .or_not_found("ユーザープロフィール")?;

        let email = Email::new(&profile.email)
            .map_err(|e| ApiError::Internal(format!("プロバイダのメールアドレスが不正: {e}")))?;

        // プロバイダ側で姓名が未設定の場合はメールアドレスを表示名にする
        let name_raw = if profile.name.is_empty() {
            profile.email.clone()
        } else {
            profile.name.clone()
        };
        let name = UserName::new(name_raw)
            .map_err(|e| ApiError::Internal(format!("プロバイダの表示名が不正: {e}")))?;

        let is_admin = self.is_admin_email(&profile.email);
        let now = self.clock.now();

        // 2. 既存レコードがあればプロフィールを上書き、なければ新規作成
        let user = match self
            .user_repository
            .find_by_provider_id(provider_user_id)
            .await?
        {
            Some(existing) => existing.with_profile(email, name, is_admin, now),
            None => User::new(
                UserId::new(),
                provider_user_id.clone(),
                email,
                name,
                is_admin,
                now,
            ),
        };

        // 3. upsert して保存後のレコードを返す
        Ok(self.user_repository.upsert_by_provider_id(&user).await?)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use loanflow_domain::clock::FixedClock;
    use loanflow_infra::InfraError;
    use loanflow_infra::identity::IdentityProfile;
    use loanflow_infra::mock::MockUserRepository;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    /// テスト用スタブ IdentityProvider
    struct StubIdentityProvider {
        profile: Option<IdentityProfile>,
    }

    #[async_trait]
    impl IdentityProvider for StubIdentityProvider {
        async fn verify_token(&self, _token: &str) -> Result<Option<String>, InfraError> {
            Ok(self.profile.as_ref().map(|p| p.provider_user_id.clone()))
        }

        async fn fetch_profile(
            &self,
            provider_user_id: &str,
        ) -> Result<Option<IdentityProfile>, InfraError> {
            Ok(self
                .profile
                .clone()
                .filter(|p| p.provider_user_id == provider_user_id))
        }
    }

    fn profile(email: &str, name: &str) -> IdentityProfile {
        IdentityProfile {
            provider_user_id: "user_2abcDEF".to_string(),
            email: email.to_string(),
            name: name.to_string(),
        }
    }

    fn build_sut(
        user_repo: &MockUserRepository,
        profile: Option<IdentityProfile>,
        admin_emails: &[String],
        now: DateTime<Utc>,
    ) -> AuthUseCaseImpl {
        AuthUseCaseImpl::new(
            Arc::new(user_repo.clone()),
            Arc::new(StubIdentityProvider { profile }),
            admin_emails,
            Arc::new(FixedClock::new(now)),
        )
    }

    #[tokio::test]
    async fn test_初回ログインでレコードが作成される() {
        let now = fixed_now();
        let user_repo = MockUserRepository::new();
        let sut = build_sut(
            &user_repo,
            Some(profile("user@example.com", "山田 太郎")),
            &[],
            now,
        );

        let caller = ProviderUserId::new("user_2abcDEF").unwrap();
        let user = sut.sync_profile(&caller).await.unwrap();

        assert_eq!(user.email().as_str(), "user@example.com");
        assert_eq!(user.name().as_str(), "山田 太郎");
        assert!(!user.is_admin());
        assert_eq!(user_repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_許可リストのメールは管理者になる() {
        let now = fixed_now();
        let user_repo = MockUserRepository::new();
        let sut = build_sut(
            &user_repo,
            Some(profile("admin@example.com", "管理者")),
            &["admin@example.com".to_string()],
            now,
        );

        let caller = ProviderUserId::new("user_2abcDEF").unwrap();
        let user = sut.sync_profile(&caller).await.unwrap();

        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn test_管理者判定は大文字小文字を区別しない() {
        let now = fixed_now();
        let user_repo = MockUserRepository::new();
        let sut = build_sut(
            &user_repo,
            Some(profile("Admin@Example.COM", "管理者")),
            &["ADMIN@example.com".to_string()],
            now,
        );

        let caller = ProviderUserId::new("user_2abcDEF").unwrap();
        let user = sut.sync_profile(&caller).await.unwrap();

        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn test_再ログインでプロフィールが上書きされレコードは増えない() {
        let now = fixed_now();
        let user_repo = MockUserRepository::new();
        let caller = ProviderUserId::new("user_2abcDEF").unwrap();

        // 初回ログイン
        let sut = build_sut(
            &user_repo,
            Some(profile("user@example.com", "山田 太郎")),
            &[],
            now,
        );
        let first = sut.sync_profile(&caller).await.unwrap();

        // メールアドレスが変わって再ログイン
        let sut = build_sut(
            &user_repo,
            Some(profile("renamed@example.com", "山田 太郎")),
            &[],
            now,
        );
        let second = sut.sync_profile(&caller).await.unwrap();

        assert_eq!(second.email().as_str(), "renamed@example.com");
        assert_eq!(second.id(), first.id());
        assert_eq!(user_repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_姓名が未設定の場合はメールアドレスが表示名になる() {
        let now = fixed_now();
        let user_repo = MockUserRepository::new();
        let sut = build_sut(
            &user_repo,
            Some(profile("user@example.com", "")),
            &[],
            now,
        );

        let caller = ProviderUserId::new("user_2abcDEF").unwrap();
        let user = sut.sync_profile(&caller).await.unwrap();

        assert_eq!(user.name().as_str(), "user@example.com");
    }

    #[tokio::test]
    async fn test_プロフィールが存在しない場合は404() {
        let now = fixed_now();
        let user_repo = MockUserRepository::new();
        let sut = build_sut(&user_repo, None, &[], now);

        let caller = ProviderUserId::new("user_2abcDEF").unwrap();
        let result = sut.sync_profile(&caller).await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_許可リストから外れると管理者フラグが剥奪される() {
        let now = fixed_now();
        let user_repo = MockUserRepository::new();
        let caller = ProviderUserId::new("user_2abcDEF").unwrap();

        let sut = build_sut(
            &user_repo,
            Some(profile("admin@example.com", "管理者")),
            &["admin@example.com".to_string()],
            now,
        );
        assert!(sut.sync_profile(&caller).await.unwrap().is_admin());

        // 許可リストが空になった後の再ログイン
        let sut = build_sut(
            &user_repo,
            Some(profile("admin@example.com", "管理者")),
            &[],
            now,
        );
        assert!(!sut.sync_profile(&caller).await.unwrap().is_admin());
    }
}
