//! # ローン審査ユースケース
//!
//! 管理者によるステータス遷移を実装する。
//!
//! ## 遷移ポリシー
//!
//! 禁止ペアはドメイン層の [`LoanApplication::with_status`] が判定する:
//! `verified → approved` / `verified → rejected` の 2 ペアのみ拒否し、
//! それ以外はすべて許可する。
//!
//! ## 並行性
//!
//! 取得から更新までの check-then-act は、リポジトリの条件付き更新
//! （`WHERE id = $1 AND status = $expected`）で閉じる。
//! 同一ローンへの並行遷移リクエストは一方だけが成功し、
//! 敗北した側は 409 Conflict を受け取る。

use std::sync::Arc;

use loanflow_domain::clock::Clock;
use loanflow_domain::loan::{LoanApplication, LoanApplicationId, LoanStatus};
use loanflow_infra::repository::LoanRepository;

use crate::error::ApiError;
use crate::usecase::helpers::FindResultExt;

/// ローン審査ユースケース実装
pub struct LoanReviewUseCaseImpl {
    loan_repository: Arc<dyn LoanRepository>,
    clock: Arc<dyn Clock>,
}

impl LoanReviewUseCaseImpl {
    pub fn new(loan_repository: Arc<dyn LoanRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            loan_repository,
            clock,
        }
    }

    /// ローンのステータスを遷移させる
    ///
    /// # エラー
    ///
    /// - `NotFound`: 指定 ID のローンが存在しない
    /// - `BadRequest`: 禁止ペア（verified → approved / rejected）への遷移
    /// - `Conflict`: 取得後に別リクエストがステータスを変更した（条件付き更新の敗北）
    #[tracing::instrument(skip_all, fields(%loan_id, %new_status))]
    pub async fn set_status(
        &self,
        loan_id: &LoanApplicationId,
        new_status: LoanStatus,
    ) -> Result<LoanApplication, ApiError> {
        // 1. 現在のローンを取得
        let loan = self
            .loan_repository
            .find_by_id(loan_id)
            .await
            .or_not_found("ローン申請")?;

        let current = loan.status();

        // 2. 遷移ポリシーを適用（禁止ペアは 400）
        let updated = loan.with_status(new_status, self.clock.now())?;

        // 3. 条件付き更新で永続化（取得時のステータスを期待値とする CAS）
        match self
            .loan_repository
            .update_status_checked(&updated, current)
            .await?
        {
            Some(stored) => Ok(stored),
            None => Err(ApiError::Conflict(
                "ローン申請は別のリクエストで更新されました。最新の状態を取得してください。"
                    .to_string(),
            )),
        }
    }
}
