//! # ダッシュボードユースケース
//!
//! 管理者ダッシュボードの集計情報を計算する。
//!
//! すべての値はリクエストごとに集計クエリから再計算する。
//! キャッシュや差分更新は行わない（少数の集計クエリで十分なため）。
//!
//! ## 集計項目
//!
//! - 融資実行額: approved / verified のローン金額合計
//! - 回収額: verified のローン金額合計
//! - 積立額: 回収額の 5%
//! - 承認率・回収率・平均融資額: ステータス件数からの導出値

use std::sync::Arc;

use loanflow_domain::loan::{LoanApplication, LoanStatus};
use loanflow_infra::repository::{LoanRepository, LoanStatusAggregate, UserRepository};

use crate::error::ApiError;

/// 回収額のうち積立に回る割合
const SAVINGS_RATE: f64 = 0.05;

/// ダッシュボードに表示する直近の申請件数
const RECENT_LOANS_LIMIT: i64 = 10;

/// ダッシュボード統計情報
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    /// 全ユーザー数
    pub active_users: i64,
    /// ローンを持つユーザー数（ユニーク）
    pub borrower_count: i64,
    /// 融資実行額（approved + verified の金額合計）
    pub cash_disbursed: f64,
    /// 回収額（verified の金額合計）
    pub cash_received: f64,
    /// 返済完了ローン数（verified の件数）
    pub repaid_loans: i64,
    /// 積立額（回収額の 5%）
    pub savings_account: f64,
    /// その他口座数（管理者ユーザー数を流用した暫定指標）
    pub other_accounts: i64,
    /// 審査待ち件数
    pub pending_applications: i64,
    /// 承認済み件数
    pub approved_applications: i64,
    /// 却下件数
    pub rejected_applications: i64,
    /// 平均融資額（approved + verified の母集団）
    pub average_loan_amount: f64,
    /// 承認率（%）
    pub approval_rate: f64,
    /// 回収率（%）
    pub collection_rate: f64,
    /// 直近の申請（申請日時の降順、最大 10 件）
    pub recent_loans: Vec<LoanApplication>,
}

/// ダッシュボードユースケース実装
pub struct DashboardUseCaseImpl {
    loan_repository: Arc<dyn LoanRepository>,
    user_repository: Arc<dyn UserRepository>,
}

/// ステータス集計からの検索ヘルパー
fn aggregate_for(summary: &[LoanStatusAggregate], status: LoanStatus) -> (i64, f64) {
    summary
        .iter()
        .find(|a| a.status == status)
        .map(|a| (a.count, a.amount_total))
        .unwrap_or((0, 0.0))
}

impl DashboardUseCaseImpl {
    pub fn new(
        loan_repository: Arc<dyn LoanRepository>,
        user_repository: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            loan_repository,
            user_repository,
        }
    }

    /// ダッシュボード統計情報を取得する
    #[tracing::instrument(skip_all)]
    pub async fn get_stats(&self) -> Result<DashboardStats, ApiError> {
        // 1. ステータスごとの件数・金額合計
        let summary = self.loan_repository.status_summary().await?;

        let (pending, _) = aggregate_for(&summary, LoanStatus::Pending);
        let (approved, approved_amount) = aggregate_for(&summary, LoanStatus::Approved);
        let (rejected, _) = aggregate_for(&summary, LoanStatus::Rejected);
        let (repaid, verified_amount) = aggregate_for(&summary, LoanStatus::Verified);

        // 2. 金額系の導出値
        let cash_disbursed = approved_amount + verified_amount;
        let cash_received = verified_amount;
        let savings_account = cash_received * SAVINGS_RATE;

        // 3. 比率系の導出値（分母 0 は 0% として扱う）
        let disbursed_count = approved + repaid;
        let total_loans = pending + approved + rejected + repaid;

        let average_loan_amount = if disbursed_count > 0 {
            cash_disbursed / disbursed_count as f64
        } else {
            0.0
        };
        let approval_rate = if total_loans > 0 {
            disbursed_count as f64 / total_loans as f64 * 100.0
        } else {
            0.0
        };
        let collection_rate = if disbursed_count > 0 {
            repaid as f64 / disbursed_count as f64 * 100.0
        } else {
            0.0
        };

        // 4. ユーザー系の集計と直近の申請
        let active_users = self.user_repository.count().await?;
        let borrower_count = self.loan_repository.count_distinct_owners().await?;
        let other_accounts = self.user_repository.count_admins().await?;
        let recent_loans = self.loan_repository.find_recent(RECENT_LOANS_LIMIT).await?;

        Ok(DashboardStats {
            active_users,
            borrower_count,
            cash_disbursed,
            cash_received,
            repaid_loans: repaid,
            savings_account,
            other_accounts,
            pending_applications: pending,
            approved_applications: approved,
            rejected_applications: rejected,
            average_loan_amount,
            approval_rate,
            collection_rate,
            recent_loans,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use loanflow_domain::loan::{LoanApplicationId, NewLoanApplication};
    use loanflow_domain::user::{Email, ProviderUserId, User, UserId};
    use loanflow_domain::value_objects::{
        EmploymentAddress,
        EmploymentStatus,
        FullName,
        LoanAmount,
        LoanDuration,
        LoanPurpose,
        UserName,
    };
    use loanflow_infra::mock::{MockLoanRepository, MockUserRepository};
    use pretty_assertions::assert_eq;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn new_loan(
        owner: &str,
        amount: f64,
        status: LoanStatus,
        now: DateTime<Utc>,
    ) -> LoanApplication {
        LoanApplication::new(NewLoanApplication {
            id: LoanApplicationId::new(),
            owner: ProviderUserId::new(owner).unwrap(),
            full_name: FullName::new("山田太郎").unwrap(),
            amount: LoanAmount::new(amount).unwrap(),
            duration: LoanDuration::new(12).unwrap(),
            purpose: LoanPurpose::new("運転資金").unwrap(),
            employment_status: EmploymentStatus::new("正社員").unwrap(),
            employment_address: EmploymentAddress::new("東京都千代田区1-1-1").unwrap(),
            now,
        })
        .with_status(status, now)
        .unwrap()
    }

    fn build_sut(
        loan_repo: &MockLoanRepository,
        user_repo: &MockUserRepository,
    ) -> DashboardUseCaseImpl {
        DashboardUseCaseImpl::new(Arc::new(loan_repo.clone()), Arc::new(user_repo.clone()))
    }

    /// {pending: 2, approved: 1 (100), verified: 1 (200)} の場合、
    /// cash_disbursed = 300, repaid_loans = 1, savings_account = 10 になる
    #[tokio::test]
    async fn test_集計シナリオ_融資実行額と積立額() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();

        loan_repo
            .insert(&new_loan("user_a", 50.0, LoanStatus::Pending, now))
            .await
            .unwrap();
        loan_repo
            .insert(&new_loan("user_a", 70.0, LoanStatus::Pending, now))
            .await
            .unwrap();
        loan_repo
            .insert(&new_loan("user_b", 100.0, LoanStatus::Approved, now))
            .await
            .unwrap();
        loan_repo
            .insert(&new_loan("user_c", 200.0, LoanStatus::Verified, now))
            .await
            .unwrap();

        let sut = build_sut(&loan_repo, &user_repo);
        let stats = sut.get_stats().await.unwrap();

        assert_eq!(stats.cash_disbursed, 300.0);
        assert_eq!(stats.cash_received, 200.0);
        assert_eq!(stats.repaid_loans, 1);
        assert_eq!(stats.savings_account, 10.0);
        assert_eq!(stats.pending_applications, 2);
        assert_eq!(stats.approved_applications, 1);
        assert_eq!(stats.rejected_applications, 0);
        // approved 1 件 + verified 1 件で平均 150
        assert_eq!(stats.average_loan_amount, 150.0);
        // (1 + 1) / 4 = 50%
        assert_eq!(stats.approval_rate, 50.0);
        // 1 / 2 = 50%
        assert_eq!(stats.collection_rate, 50.0);
        assert_eq!(stats.borrower_count, 3);
    }

    #[tokio::test]
    async fn test_データなしではすべてゼロ() {
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();

        let sut = build_sut(&loan_repo, &user_repo);
        let stats = sut.get_stats().await.unwrap();

        let expected = DashboardStats {
            active_users: 0,
            borrower_count: 0,
            cash_disbursed: 0.0,
            cash_received: 0.0,
            repaid_loans: 0,
            savings_account: 0.0,
            other_accounts: 0,
            pending_applications: 0,
            approved_applications: 0,
            rejected_applications: 0,
            average_loan_amount: 0.0,
            approval_rate: 0.0,
            collection_rate: 0.0,
            recent_loans: Vec::new(),
        };
        assert_eq!(stats, expected);
    }

    #[tokio::test]
    async fn test_ユーザー数と管理者数が反映される() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();

        let member = User::new(
            UserId::new(),
            ProviderUserId::new("user_member").unwrap(),
            Email::new("member@example.com").unwrap(),
            UserName::new("Member").unwrap(),
            false,
            now,
        );
        let admin = User::new(
            UserId::new(),
            ProviderUserId::new("user_admin").unwrap(),
            Email::new("admin@example.com").unwrap(),
            UserName::new("Admin").unwrap(),
            true,
            now,
        );
        user_repo.upsert_by_provider_id(&member).await.unwrap();
        user_repo.upsert_by_provider_id(&admin).await.unwrap();

        let sut = build_sut(&loan_repo, &user_repo);
        let stats = sut.get_stats().await.unwrap();

        assert_eq!(stats.active_users, 2);
        assert_eq!(stats.other_accounts, 1);
    }

    #[tokio::test]
    async fn test_直近の申請は新しい順で最大10件() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();

        // 12 件を 1 時間刻みで投入
        for i in 0..12 {
            let at = now + Duration::hours(i);
            loan_repo
                .insert(&new_loan("user_a", 100.0, LoanStatus::Pending, at))
                .await
                .unwrap();
        }

        let sut = build_sut(&loan_repo, &user_repo);
        let stats = sut.get_stats().await.unwrap();

        assert_eq!(stats.recent_loans.len(), 10);
        // 先頭が最新（+11 時間）
        assert_eq!(
            stats.recent_loans[0].applied_at(),
            now + Duration::hours(11)
        );
        // 降順であること
        for pair in stats.recent_loans.windows(2) {
            assert!(pair[0].applied_at() >= pair[1].applied_at());
        }
    }

    #[tokio::test]
    async fn test_却下のみの場合の承認率は0() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();

        loan_repo
            .insert(&new_loan("user_a", 100.0, LoanStatus::Rejected, now))
            .await
            .unwrap();

        let sut = build_sut(&loan_repo, &user_repo);
        let stats = sut.get_stats().await.unwrap();

        assert_eq!(stats.approval_rate, 0.0);
        assert_eq!(stats.average_loan_amount, 0.0);
        assert_eq!(stats.collection_rate, 0.0);
    }
}
