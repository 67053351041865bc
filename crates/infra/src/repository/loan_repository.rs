//! # LoanRepository
//!
//! ローン申請の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **条件付き更新**: ステータス遷移は `WHERE id = $1 AND status = $2` の
//!   compare-and-swap で行い、check-then-act の競合を閉じる
//! - **集計クエリ**: ダッシュボードの集計は GROUP BY / COUNT / SUM を
//!   そのまま SQL に委譲し、リクエストごとに再計算する

use async_trait::async_trait;
use loanflow_domain::loan::{
    LoanApplication,
    LoanApplicationId,
    LoanApplicationRecord,
    LoanStatus,
};
use loanflow_domain::user::ProviderUserId;
use loanflow_domain::value_objects::{
    EmploymentAddress,
    EmploymentStatus,
    FullName,
    LoanAmount,
    LoanDuration,
    LoanPurpose,
};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::InfraError;

/// ステータスごとの件数・金額合計
///
/// `GROUP BY status` の 1 行に対応する。存在しないステータスの行は含まれない。
#[derive(Debug, Clone, PartialEq)]
pub struct LoanStatusAggregate {
    pub status: LoanStatus,
    pub count: i64,
    pub amount_total: f64,
}

/// ローン申請リポジトリトレイト
///
/// ローン申請の永続化操作と集計クエリを定義する。
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// ローン申請を新規保存する
    async fn insert(&self, loan: &LoanApplication) -> Result<(), InfraError>;

    /// ID でローン申請を取得
    async fn find_by_id(
        &self,
        id: &LoanApplicationId,
    ) -> Result<Option<LoanApplication>, InfraError>;

    /// 所有者のローン申請一覧を取得（申請日時の降順）
    async fn find_by_owner(
        &self,
        owner: &ProviderUserId,
    ) -> Result<Vec<LoanApplication>, InfraError>;

    /// ローン申請一覧をページ指定で取得（申請日時の降順）
    ///
    /// `status` を指定した場合はそのステータスのみに絞り込む。
    async fn find_all_paged(
        &self,
        status: Option<LoanStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LoanApplication>, InfraError>;

    /// ローン申請の件数を取得（`status` 指定時は絞り込み後の件数）
    async fn count(&self, status: Option<LoanStatus>) -> Result<i64, InfraError>;

    /// ステータスを条件付きで更新する（compare-and-swap）
    ///
    /// `loan` は遷移適用済みのエンティティ。
    /// `WHERE id = $id AND status = $expected` に一致した場合のみ更新する。
    ///
    /// # 戻り値
    ///
    /// - `Ok(Some(loan))`: 更新成功（更新後のレコード）
    /// - `Ok(None)`: レコードが存在しないか、現在のステータスが
    ///   `expected` と一致しなかった（並行更新に敗北した）場合
    async fn update_status_checked(
        &self,
        loan: &LoanApplication,
        expected: LoanStatus,
    ) -> Result<Option<LoanApplication>, InfraError>;

    /// ローン申請を削除する
    ///
    /// # 戻り値
    ///
    /// - `Ok(true)`: 削除した
    /// - `Ok(false)`: レコードが存在しなかった（二重削除を含む）
    async fn delete(&self, id: &LoanApplicationId) -> Result<bool, InfraError>;

    /// ステータスごとの件数・金額合計を取得
    async fn status_summary(&self) -> Result<Vec<LoanStatusAggregate>, InfraError>;

    /// ローンを持つユーザー数（user_id のユニーク数）を取得
    async fn count_distinct_owners(&self) -> Result<i64, InfraError>;

    /// 直近のローン申請を取得（申請日時の降順、`limit` 件まで）
    async fn find_recent(&self, limit: i64) -> Result<Vec<LoanApplication>, InfraError>;
}

/// PostgreSQL 実装の LoanRepository
#[derive(Debug, Clone)]
pub struct PostgresLoanRepository {
    pool: PgPool,
}

impl PostgresLoanRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// SELECT 句のカラムリスト（全クエリで共有）
const LOAN_COLUMNS: &str = r#"
    id, user_id, full_name, loan_amount, duration_months,
    purpose, employment_status, employment_address, status,
    applied_at, updated_at
"#;

/// DB 行からローン申請エンティティを復元する
fn loan_from_row(row: &PgRow) -> Result<LoanApplication, InfraError> {
    let unexpected = |e: loanflow_domain::DomainError| InfraError::unexpected(e.to_string());

    Ok(LoanApplication::from_db(LoanApplicationRecord {
        id: LoanApplicationId::from_uuid(row.try_get("id")?),
        owner: ProviderUserId::new(row.try_get::<String, _>("user_id")?).map_err(unexpected)?,
        full_name: FullName::new(row.try_get::<String, _>("full_name")?).map_err(unexpected)?,
        amount: LoanAmount::new(row.try_get("loan_amount")?).map_err(unexpected)?,
        duration: LoanDuration::new(row.try_get("duration_months")?).map_err(unexpected)?,
        purpose: LoanPurpose::new(row.try_get::<String, _>("purpose")?).map_err(unexpected)?,
        employment_status: EmploymentStatus::new(row.try_get::<String, _>("employment_status")?)
            .map_err(unexpected)?,
        employment_address: EmploymentAddress::new(
            row.try_get::<String, _>("employment_address")?,
        )
        .map_err(unexpected)?,
        status: row
            .try_get::<String, _>("status")?
            .parse::<LoanStatus>()
            .map_err(unexpected)?,
        applied_at: row.try_get("applied_at")?,
        updated_at: row.try_get("updated_at")?,
    }))
}

#[async_trait]
impl LoanRepository for PostgresLoanRepository {
    #[tracing::instrument(skip_all, fields(loan_id = %loan.id()))]
    async fn insert(&self, loan: &LoanApplication) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO loan_applications (
                id, user_id, full_name, loan_amount, duration_months,
                purpose, employment_status, employment_address, status,
                applied_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(loan.id().as_uuid())
        .bind(loan.owner().as_str())
        .bind(loan.full_name().as_str())
        .bind(loan.amount().as_f64())
        .bind(loan.duration().as_i32())
        .bind(loan.purpose().as_str())
        .bind(loan.employment_status().as_str())
        .bind(loan.employment_address().as_str())
        .bind(loan.status().as_str())
        .bind(loan.applied_at())
        .bind(loan.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(%id))]
    async fn find_by_id(
        &self,
        id: &LoanApplicationId,
    ) -> Result<Option<LoanApplication>, InfraError> {
        let row = sqlx::query(&format!(
            "SELECT {LOAN_COLUMNS} FROM loan_applications WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(loan_from_row).transpose()
    }

    #[tracing::instrument(skip_all, fields(%owner))]
    async fn find_by_owner(
        &self,
        owner: &ProviderUserId,
    ) -> Result<Vec<LoanApplication>, InfraError> {
        let rows = sqlx::query(&format!(
            "SELECT {LOAN_COLUMNS} FROM loan_applications \
             WHERE user_id = $1 ORDER BY applied_at DESC"
        ))
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(loan_from_row).collect()
    }

    #[tracing::instrument(skip_all)]
    async fn find_all_paged(
        &self,
        status: Option<LoanStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LoanApplication>, InfraError> {
        let rows = if let Some(status) = status {
            sqlx::query(&format!(
                "SELECT {LOAN_COLUMNS} FROM loan_applications \
                 WHERE status = $1 ORDER BY applied_at DESC LIMIT $2 OFFSET $3"
            ))
            .bind(status.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {LOAN_COLUMNS} FROM loan_applications \
                 ORDER BY applied_at DESC LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter().map(loan_from_row).collect()
    }

    #[tracing::instrument(skip_all)]
    async fn count(&self, status: Option<LoanStatus>) -> Result<i64, InfraError> {
        let row = if let Some(status) = status {
            sqlx::query(
                "SELECT COUNT(*) AS loan_count FROM loan_applications WHERE status = $1",
            )
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query("SELECT COUNT(*) AS loan_count FROM loan_applications")
                .fetch_one(&self.pool)
                .await?
        };

        Ok(row.try_get("loan_count")?)
    }

    #[tracing::instrument(skip_all, fields(loan_id = %loan.id(), %expected))]
    async fn update_status_checked(
        &self,
        loan: &LoanApplication,
        expected: LoanStatus,
    ) -> Result<Option<LoanApplication>, InfraError> {
        let row = sqlx::query(&format!(
            "UPDATE loan_applications \
             SET status = $1, updated_at = $2 \
             WHERE id = $3 AND status = $4 \
             RETURNING {LOAN_COLUMNS}"
        ))
        .bind(loan.status().as_str())
        .bind(loan.updated_at())
        .bind(loan.id().as_uuid())
        .bind(expected.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(loan_from_row).transpose()
    }

    #[tracing::instrument(skip_all, fields(%id))]
    async fn delete(&self, id: &LoanApplicationId) -> Result<bool, InfraError> {
        let result = sqlx::query("DELETE FROM loan_applications WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip_all)]
    async fn status_summary(&self) -> Result<Vec<LoanStatusAggregate>, InfraError> {
        let rows = sqlx::query(
            r#"
            SELECT
                status,
                COUNT(*) AS loan_count,
                COALESCE(SUM(loan_amount), 0) AS amount_total
            FROM loan_applications
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(LoanStatusAggregate {
                    status: row
                        .try_get::<String, _>("status")?
                        .parse::<LoanStatus>()
                        .map_err(|e| InfraError::unexpected(e.to_string()))?,
                    count: row.try_get("loan_count")?,
                    amount_total: row.try_get("amount_total")?,
                })
            })
            .collect()
    }

    #[tracing::instrument(skip_all)]
    async fn count_distinct_owners(&self) -> Result<i64, InfraError> {
        let row = sqlx::query(
            "SELECT COUNT(DISTINCT user_id) AS borrower_count FROM loan_applications",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("borrower_count")?)
    }

    #[tracing::instrument(skip_all)]
    async fn find_recent(&self, limit: i64) -> Result<Vec<LoanApplication>, InfraError> {
        let rows = sqlx::query(&format!(
            "SELECT {LOAN_COLUMNS} FROM loan_applications \
             ORDER BY applied_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(loan_from_row).collect()
    }
}
