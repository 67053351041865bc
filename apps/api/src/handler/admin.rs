//! # 管理 API ハンドラ
//!
//! 管理者向けエンドポイントを実装する。
//! ルート全体が `require_admin` ミドルウェア（Authorization Gate）で包まれる。
//!
//! ## エンドポイント
//!
//! - `GET /api/admin/dashboard-stats` - ダッシュボード集計
//! - `GET /api/admin/loans` - ローン一覧（ページネーション・ステータス絞り込み）
//! - `GET /api/admin/loans/{id}` - ローン詳細
//! - `PATCH /api/admin/loans/{id}/status` - ステータス遷移
//! - `GET /api/admin/users` - ユーザー一覧（ページネーション）

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use loanflow_domain::loan::{LoanApplicationId, LoanStatus};
use loanflow_domain::user::User;
use loanflow_infra::repository::{LoanRepository, UserRepository};
use loanflow_shared::{ApiResponse, PagedResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    handler::loan::LoanDto,
    usecase::{DashboardStats, DashboardUseCaseImpl, LoanReviewUseCaseImpl},
    usecase::helpers::FindResultExt,
};

/// 管理 API の共有状態
pub struct AdminState {
    pub dashboard: DashboardUseCaseImpl,
    pub review: LoanReviewUseCaseImpl,
    pub loan_repository: Arc<dyn LoanRepository>,
    pub user_repository: Arc<dyn UserRepository>,
}

// --- リクエスト/レスポンス型 ---

/// ページネーションクエリパラメータ
///
/// `page` / `limit` の省略時は 1 ページ目・10 件。
/// `status` は `all` またはステータス名（ローン一覧のみ）。
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page:   Option<u32>,
    pub limit:  Option<u32>,
    pub status: Option<String>,
}

impl PageQuery {
    /// デフォルト適用済みの (page, limit, offset) を返す
    fn resolve(&self) -> (u32, u32, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(10).max(1);
        let offset = i64::from(page - 1) * i64::from(limit);
        (page, limit, offset)
    }

    /// ステータスフィルタをパースする（`all` と省略は絞り込みなし）
    fn status_filter(&self) -> Result<Option<LoanStatus>, ApiError> {
        match self.status.as_deref() {
            None | Some("all") => Ok(None),
            Some(s) => s
                .parse::<LoanStatus>()
                .map(Some)
                .map_err(|_| ApiError::BadRequest("不正なステータス値です".to_string())),
        }
    }
}

/// ステータス遷移リクエスト
#[derive(Debug, Deserialize)]
pub struct UpdateLoanStatusRequest {
    pub status: String,
}

/// ユーザー一覧の要素 DTO
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub provider_user_id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: *user.id().as_uuid(),
            provider_user_id: user.provider_user_id().as_str().to_string(),
            email: user.email().as_str().to_string(),
            name: user.name().as_str().to_string(),
            is_admin: user.is_admin(),
            created_at: user.created_at(),
        }
    }
}

/// ダッシュボード統計 DTO
#[derive(Debug, Serialize)]
pub struct DashboardStatsDto {
    pub stats: OverviewDto,
    pub loan_stats: LoanStatusSummaryDto,
    pub recent_loans: Vec<LoanDto>,
    pub kpis: KpiDto,
}

/// 概況パネル
#[derive(Debug, Serialize)]
pub struct OverviewDto {
    pub active_users: i64,
    pub borrower_count: i64,
    pub cash_disbursed: f64,
    pub cash_received: f64,
    pub repaid_loans: i64,
    pub savings_account: f64,
    pub other_accounts: i64,
}

/// ステータス別の件数
#[derive(Debug, Serialize)]
pub struct LoanStatusSummaryDto {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub total: i64,
}

/// KPI パネル
#[derive(Debug, Serialize)]
pub struct KpiDto {
    pub average_loan_amount: f64,
    pub approval_rate: f64,
    pub collection_rate: f64,
}

impl From<DashboardStats> for DashboardStatsDto {
    fn from(stats: DashboardStats) -> Self {
        Self {
            stats: OverviewDto {
                active_users: stats.active_users,
                borrower_count: stats.borrower_count,
                cash_disbursed: stats.cash_disbursed,
                cash_received: stats.cash_received,
                repaid_loans: stats.repaid_loans,
                savings_account: stats.savings_account,
                other_accounts: stats.other_accounts,
            },
            loan_stats: LoanStatusSummaryDto {
                pending: stats.pending_applications,
                approved: stats.approved_applications,
                rejected: stats.rejected_applications,
                total: stats.pending_applications
                    + stats.approved_applications
                    + stats.rejected_applications,
            },
            recent_loans: stats.recent_loans.iter().map(LoanDto::from).collect(),
            kpis: KpiDto {
                average_loan_amount: stats.average_loan_amount,
                approval_rate: stats.approval_rate,
                collection_rate: stats.collection_rate,
            },
        }
    }
}

// --- ハンドラ ---

/// GET /api/admin/dashboard-stats
///
/// ダッシュボード集計を取得する。すべての値はリクエストごとに再計算される。
#[tracing::instrument(skip_all)]
pub async fn get_dashboard_stats(
    State(state): State<Arc<AdminState>>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.dashboard.get_stats().await?;

    let response = ApiResponse::new(DashboardStatsDto::from(stats));
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/admin/loans
///
/// ローン申請一覧をページ指定で取得する（申請日時の降順）。
///
/// ## クエリパラメータ
///
/// - `page`: ページ番号（デフォルト 1）
/// - `limit`: 1 ページの件数（デフォルト 10）
/// - `status`: ステータス絞り込み（`all` または省略で全件）
#[tracing::instrument(skip_all)]
pub async fn list_loans(
    State(state): State<Arc<AdminState>>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit, offset) = query.resolve();
    let status = query.status_filter()?;

    let loans = state
        .loan_repository
        .find_all_paged(status, i64::from(limit), offset)
        .await?;
    let total = state.loan_repository.count(status).await?;

    let items: Vec<LoanDto> = loans.iter().map(LoanDto::from).collect();
    let response = PagedResponse::new(items, total, page, limit);
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/admin/loans/{id}
///
/// ローン申請の詳細を取得する。
///
/// ## レスポンス
///
/// - `200 OK`: ローン詳細
/// - `404 Not Found`: 申請が存在しない
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_loan(
    State(state): State<Arc<AdminState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let loan_id = LoanApplicationId::from_uuid(id);

    let loan = state
        .loan_repository
        .find_by_id(&loan_id)
        .await
        .or_not_found("ローン申請")?;

    let response = ApiResponse::new(LoanDto::from(&loan));
    Ok((StatusCode::OK, Json(response)))
}

/// PATCH /api/admin/loans/{id}/status
///
/// ローン申請のステータスを遷移させる。
///
/// ## レスポンス
///
/// - `200 OK`: 更新後のローン
/// - `400 Bad Request`: 不正なステータス値、または禁止された遷移
/// - `404 Not Found`: 申請が存在しない
/// - `409 Conflict`: 並行更新との競合
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_loan_status(
    State(state): State<Arc<AdminState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLoanStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_status: LoanStatus = req
        .status
        .parse()
        .map_err(|_| ApiError::BadRequest("不正なステータス値です".to_string()))?;

    let loan_id = LoanApplicationId::from_uuid(id);
    let loan = state.review.set_status(&loan_id, new_status).await?;

    let response = ApiResponse::new(LoanDto::from(&loan));
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/admin/users
///
/// ユーザー一覧をページ指定で取得する（表示名の昇順）。
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<Arc<AdminState>>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit, offset) = query.resolve();

    let users = state
        .user_repository
        .find_all_paged(i64::from(limit), offset)
        .await?;
    let total = state.user_repository.count().await?;

    let items: Vec<UserDto> = users.iter().map(UserDto::from).collect();
    let response = PagedResponse::new(items, total, page, limit);
    Ok((StatusCode::OK, Json(response)))
}
