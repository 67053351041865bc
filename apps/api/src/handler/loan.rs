//! # ローン申請ハンドラ
//!
//! エンドユーザー向けのローン申請エンドポイントを実装する。
//!
//! ## エンドポイント
//!
//! - `POST /api/loan` - ローン申請の提出
//! - `GET /api/loan/my-loans` - 自分の申請一覧
//! - `GET /api/loan/{user_id}` - 指定ユーザーの申請一覧（本人または管理者）
//! - `DELETE /api/loan/{id}` - 申請の削除（所有者または管理者）

use std::sync::Arc;

use axum::{
    Extension,
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use loanflow_domain::loan::{LoanApplication, LoanApplicationId};
use loanflow_domain::user::ProviderUserId;
use loanflow_domain::value_objects::{
    EmploymentAddress,
    EmploymentStatus,
    FullName,
    LoanAmount,
    LoanDuration,
    LoanPurpose,
};
use loanflow_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::AuthenticatedUser,
    usecase::{CreateLoanInput, LoanApplicationUseCaseImpl},
};

/// ローン申請 API の共有状態
pub struct LoanState {
    pub usecase: LoanApplicationUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// ローン申請の作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateLoanRequest {
    pub full_name: String,
    pub loan_amount: f64,
    pub duration_months: i32,
    pub purpose: String,
    pub employment_status: String,
    pub employment_address: String,
}

/// ローン申請レスポンス
#[derive(Debug, Clone, Serialize)]
pub struct LoanDto {
    pub id: Uuid,
    pub user_id: String,
    pub full_name: String,
    pub loan_amount: f64,
    pub duration_months: i32,
    pub purpose: String,
    pub employment_status: String,
    pub employment_address: String,
    pub status: String,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&LoanApplication> for LoanDto {
    fn from(loan: &LoanApplication) -> Self {
        Self {
            id: *loan.id().as_uuid(),
            user_id: loan.owner().as_str().to_string(),
            full_name: loan.full_name().as_str().to_string(),
            loan_amount: loan.amount().as_f64(),
            duration_months: loan.duration().as_i32(),
            purpose: loan.purpose().as_str().to_string(),
            employment_status: loan.employment_status().as_str().to_string(),
            employment_address: loan.employment_address().as_str().to_string(),
            status: loan.status().to_string(),
            applied_at: loan.applied_at(),
            updated_at: loan.updated_at(),
        }
    }
}

/// 削除確認レスポンス
#[derive(Debug, Serialize)]
pub struct DeletedDto {
    pub id: Uuid,
    pub deleted: bool,
}

impl TryFrom<CreateLoanRequest> for CreateLoanInput {
    type Error = ApiError;

    /// リクエストボディを値オブジェクトに変換する
    ///
    /// バリデーション違反は 400 Bad Request として報告する。
    fn try_from(req: CreateLoanRequest) -> Result<Self, Self::Error> {
        let bad_request = |e: loanflow_domain::DomainError| ApiError::BadRequest(e.to_string());

        Ok(Self {
            full_name: FullName::new(req.full_name).map_err(bad_request)?,
            amount: LoanAmount::new(req.loan_amount).map_err(bad_request)?,
            duration: LoanDuration::new(req.duration_months).map_err(bad_request)?,
            purpose: LoanPurpose::new(req.purpose).map_err(bad_request)?,
            employment_status: EmploymentStatus::new(req.employment_status).map_err(bad_request)?,
            employment_address: EmploymentAddress::new(req.employment_address)
                .map_err(bad_request)?,
        })
    }
}

// --- ハンドラ ---

/// POST /api/loan
///
/// ローン申請を提出する。所有者は認証済みの呼び出し元になる。
///
/// ## レスポンス
///
/// - `201 Created`: 作成された申請
/// - `400 Bad Request`: バリデーションエラー
#[tracing::instrument(skip_all)]
pub async fn create_loan(
    State(state): State<Arc<LoanState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(req): Json<CreateLoanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateLoanInput::try_from(req)?;

    let loan = state.usecase.create(caller.0, input).await?;

    let response = ApiResponse::new(LoanDto::from(&loan));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/loan/my-loans
///
/// 呼び出し元のローン申請一覧を取得する（申請日時の降順）。
#[tracing::instrument(skip_all)]
pub async fn list_my_loans(
    State(state): State<Arc<LoanState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    let loans = state.usecase.list_mine(&caller.0).await?;

    let items: Vec<LoanDto> = loans.iter().map(LoanDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// GET /api/loan/{user_id}
///
/// 指定ユーザーのローン申請一覧を取得する。
/// 本人または管理者のみ参照できる。
///
/// ## レスポンス
///
/// - `200 OK`: 申請一覧
/// - `400 Bad Request`: ユーザー ID の形式が不正
/// - `403 Forbidden`: 本人でも管理者でもない
#[tracing::instrument(skip_all, fields(%user_id))]
pub async fn list_user_loans(
    State(state): State<Arc<LoanState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target =
        ProviderUserId::new(user_id).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let loans = state.usecase.list_by_user(&target, &caller.0).await?;

    let items: Vec<LoanDto> = loans.iter().map(LoanDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// DELETE /api/loan/{id}
///
/// ローン申請を削除する。所有者または管理者のみ。
///
/// ## レスポンス
///
/// - `200 OK`: 削除確認
/// - `403 Forbidden`: 所有者でも管理者でもない
/// - `404 Not Found`: 申請が存在しない（二重削除を含む）
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_loan(
    State(state): State<Arc<LoanState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let loan_id = LoanApplicationId::from_uuid(id);

    state.usecase.delete(&loan_id, &caller.0).await?;

    let response = ApiResponse::new(DeletedDto { id, deleted: true });
    Ok((StatusCode::OK, Json(response)))
}
