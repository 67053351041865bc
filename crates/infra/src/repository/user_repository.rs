//! # UserRepository
//!
//! ユーザー情報の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **upsert キー**: プロバイダ ID（検証済みログインのたびに同期）
//! - **行→エンティティ変換**: 破損レコードは `Unexpected` として表面化

use async_trait::async_trait;
use loanflow_domain::user::{Email, ProviderUserId, User, UserId};
use loanflow_domain::value_objects::UserName;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::InfraError;

/// ユーザーリポジトリトレイト
///
/// ユーザー情報の永続化操作を定義する。
/// インフラ層で具体的な実装を提供し、ユースケース層から利用する。
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ユーザーを upsert する（プロバイダ ID をキーに挿入または更新）
    ///
    /// 既存レコードがある場合は email / name / is_admin / updated_at を
    /// 上書きし、id と created_at は保持する。
    ///
    /// # 戻り値
    ///
    /// 保存後のレコード（既存レコードの場合は元の id を持つ）。
    async fn upsert_by_provider_id(&self, user: &User) -> Result<User, InfraError>;

    /// プロバイダ ID でユーザーを検索
    ///
    /// # 戻り値
    ///
    /// - `Ok(Some(user))`: ユーザーが見つかった場合
    /// - `Ok(None)`: ユーザーが見つからない場合
    /// - `Err(_)`: データベースエラー
    async fn find_by_provider_id(
        &self,
        provider_user_id: &ProviderUserId,
    ) -> Result<Option<User>, InfraError>;

    /// ユーザー一覧をページ指定で取得（表示名の昇順）
    async fn find_all_paged(&self, limit: i64, offset: i64) -> Result<Vec<User>, InfraError>;

    /// ユーザー総数を取得
    async fn count(&self) -> Result<i64, InfraError>;

    /// 管理者ユーザー数を取得
    async fn count_admins(&self) -> Result<i64, InfraError>;
}

/// PostgreSQL 実装の UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// DB 行からユーザーエンティティを復元する
fn user_from_row(row: &PgRow) -> Result<User, InfraError> {
    Ok(User::from_db(
        UserId::from_uuid(row.try_get("id")?),
        ProviderUserId::new(row.try_get::<String, _>("provider_user_id")?)
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        Email::new(row.try_get::<String, _>("email")?)
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        UserName::new(row.try_get::<String, _>("name")?)
            .map_err(|e| InfraError::unexpected(e.to_string()))?,
        row.try_get("is_admin")?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[tracing::instrument(skip_all, fields(provider_user_id = %user.provider_user_id()))]
    async fn upsert_by_provider_id(&self, user: &User) -> Result<User, InfraError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (
                id, provider_user_id, email, name, is_admin,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (provider_user_id) DO UPDATE SET
                email = EXCLUDED.email,
                name = EXCLUDED.name,
                is_admin = EXCLUDED.is_admin,
                updated_at = EXCLUDED.updated_at
            RETURNING
                id, provider_user_id, email, name, is_admin,
                created_at, updated_at
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.provider_user_id().as_str())
        .bind(user.email().as_str())
        .bind(user.name().as_str())
        .bind(user.is_admin())
        .bind(user.created_at())
        .bind(user.updated_at())
        .fetch_one(&self.pool)
        .await?;

        user_from_row(&row)
    }

    #[tracing::instrument(skip_all, fields(%provider_user_id))]
    async fn find_by_provider_id(
        &self,
        provider_user_id: &ProviderUserId,
    ) -> Result<Option<User>, InfraError> {
        let row = sqlx::query(
            r#"
            SELECT
                id, provider_user_id, email, name, is_admin,
                created_at, updated_at
            FROM users
            WHERE provider_user_id = $1
            "#,
        )
        .bind(provider_user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[tracing::instrument(skip_all)]
    async fn find_all_paged(&self, limit: i64, offset: i64) -> Result<Vec<User>, InfraError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id, provider_user_id, email, name, is_admin,
                created_at, updated_at
            FROM users
            ORDER BY name ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    #[tracing::instrument(skip_all)]
    async fn count(&self) -> Result<i64, InfraError> {
        let row = sqlx::query("SELECT COUNT(*) AS user_count FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("user_count")?)
    }

    #[tracing::instrument(skip_all)]
    async fn count_admins(&self) -> Result<i64, InfraError> {
        let row = sqlx::query("SELECT COUNT(*) AS admin_count FROM users WHERE is_admin")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("admin_count")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresUserRepository>();
        assert_send_sync::<Box<dyn UserRepository>>();
    }
}
