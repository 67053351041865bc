//! # ローン申請ユースケース
//!
//! ローン申請の作成・一覧・削除に関するビジネスロジックを実装する。
//!
//! ## 認可ルール
//!
//! - 作成: 認証済みの呼び出し元が所有者になる（リクエストボディでの
//!   所有者指定は受け付けない）
//! - 自分の一覧: 呼び出し元のレコードのみ、申請日時の降順
//! - ユーザー指定の一覧: 本人または管理者のみ
//! - 削除: 所有者または管理者のみ

use std::sync::Arc;

use loanflow_domain::clock::Clock;
use loanflow_domain::loan::{LoanApplication, LoanApplicationId, NewLoanApplication};
use loanflow_domain::user::ProviderUserId;
use loanflow_domain::value_objects::{
    EmploymentAddress,
    EmploymentStatus,
    FullName,
    LoanAmount,
    LoanDuration,
    LoanPurpose,
};
use loanflow_infra::repository::{LoanRepository, UserRepository};

use crate::error::ApiError;
use crate::usecase::helpers::FindResultExt;

/// ローン申請の作成入力
pub struct CreateLoanInput {
    pub full_name: FullName,
    pub amount: LoanAmount,
    pub duration: LoanDuration,
    pub purpose: LoanPurpose,
    pub employment_status: EmploymentStatus,
    pub employment_address: EmploymentAddress,
}

/// ローン申請ユースケース実装
pub struct LoanApplicationUseCaseImpl {
    loan_repository: Arc<dyn LoanRepository>,
    user_repository: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl LoanApplicationUseCaseImpl {
    pub fn new(
        loan_repository: Arc<dyn LoanRepository>,
        user_repository: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            loan_repository,
            user_repository,
            clock,
        }
    }

    /// 呼び出し元が管理者か判定する
    async fn is_admin(&self, caller: &ProviderUserId) -> Result<bool, ApiError> {
        Ok(self
            .user_repository
            .find_by_provider_id(caller)
            .await?
            .is_some_and(|u| u.is_admin()))
    }

    /// ローン申請を作成する
    ///
    /// ステータス `pending`・現在時刻で保存し、作成されたレコードを返す。
    #[tracing::instrument(skip_all, fields(%owner))]
    pub async fn create(
        &self,
        owner: ProviderUserId,
        input: CreateLoanInput,
    ) -> Result<LoanApplication, ApiError> {
        let loan = LoanApplication::new(NewLoanApplication {
            id: LoanApplicationId::new(),
            owner,
            full_name: input.full_name,
            amount: input.amount,
            duration: input.duration,
            purpose: input.purpose,
            employment_status: input.employment_status,
            employment_address: input.employment_address,
            now: self.clock.now(),
        });

        self.loan_repository.insert(&loan).await?;

        Ok(loan)
    }

    /// 呼び出し元のローン申請一覧を取得する（申請日時の降順）
    #[tracing::instrument(skip_all, fields(%caller))]
    pub async fn list_mine(
        &self,
        caller: &ProviderUserId,
    ) -> Result<Vec<LoanApplication>, ApiError> {
        Ok(self.loan_repository.find_by_owner(caller).await?)
    }

    /// 指定ユーザーのローン申請一覧を取得する
    ///
    /// 本人または管理者のみ許可する。
    #[tracing::instrument(skip_all, fields(%target, %caller))]
    pub async fn list_by_user(
        &self,
        target: &ProviderUserId,
        caller: &ProviderUserId,
    ) -> Result<Vec<LoanApplication>, ApiError> {
        if target != caller && !self.is_admin(caller).await? {
            return Err(ApiError::Forbidden(
                "他のユーザーの申請一覧は管理者のみ参照できます".to_string(),
            ));
        }

        Ok(self.loan_repository.find_by_owner(target).await?)
    }

    /// ローン申請を削除する
    ///
    /// 所有者または管理者のみ許可する。
    ///
    /// # エラー
    ///
    /// - `NotFound`: レコードが存在しない（二重削除を含む）
    /// - `Forbidden`: 所有者でも管理者でもない
    #[tracing::instrument(skip_all, fields(%loan_id, %caller))]
    pub async fn delete(
        &self,
        loan_id: &LoanApplicationId,
        caller: &ProviderUserId,
    ) -> Result<(), ApiError> {
        let loan = self
            .loan_repository
            .find_by_id(loan_id)
            .await
            .or_not_found("ローン申請")?;

        if !loan.is_owned_by(caller) && !self.is_admin(caller).await? {
            return Err(ApiError::Forbidden(
                "ローン申請を削除できるのは所有者または管理者のみです".to_string(),
            ));
        }

        // 取得後に別リクエストが削除した場合も 404 として扱う
        let deleted = self.loan_repository.delete(loan_id).await?;
        if !deleted {
            return Err(ApiError::NotFound(
                "ローン申請が見つかりません".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use loanflow_domain::clock::FixedClock;
    use loanflow_domain::loan::LoanStatus;
    use loanflow_domain::user::{Email, User, UserId};
    use loanflow_domain::value_objects::UserName;
    use loanflow_infra::mock::{MockLoanRepository, MockUserRepository};

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn create_input(full_name: &str) -> CreateLoanInput {
        CreateLoanInput {
            full_name: FullName::new(full_name).unwrap(),
            amount: LoanAmount::new(500.0).unwrap(),
            duration: LoanDuration::new(12).unwrap(),
            purpose: LoanPurpose::new("運転資金").unwrap(),
            employment_status: EmploymentStatus::new("正社員").unwrap(),
            employment_address: EmploymentAddress::new("東京都千代田区1-1-1").unwrap(),
        }
    }

    fn build_sut(
        loan_repo: &MockLoanRepository,
        user_repo: &MockUserRepository,
        now: DateTime<Utc>,
    ) -> LoanApplicationUseCaseImpl {
        LoanApplicationUseCaseImpl::new(
            Arc::new(loan_repo.clone()),
            Arc::new(user_repo.clone()),
            Arc::new(FixedClock::new(now)),
        )
    }

    async fn add_admin(user_repo: &MockUserRepository, provider_id: &str, now: DateTime<Utc>) {
        let admin = User::new(
            UserId::new(),
            ProviderUserId::new(provider_id).unwrap(),
            Email::new("admin@example.com").unwrap(),
            UserName::new("Admin").unwrap(),
            true,
            now,
        );
        user_repo.upsert_by_provider_id(&admin).await.unwrap();
    }

    #[tokio::test]
    async fn test_作成でステータスpendingと現在時刻が設定される() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();
        let sut = build_sut(&loan_repo, &user_repo, now);

        let owner = ProviderUserId::new("user_2abcDEF").unwrap();
        let created = sut.create(owner.clone(), create_input("山田太郎")).await.unwrap();

        assert_eq!(created.status(), LoanStatus::Pending);
        assert_eq!(created.applied_at(), now);
        assert!(created.is_owned_by(&owner));
        // 永続化も確認
        let stored = loan_repo.find_by_id(created.id()).await.unwrap().unwrap();
        assert_eq!(stored, created);
    }

    #[tokio::test]
    async fn test_自分の一覧は自分のレコードのみ申請日時降順() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();

        let caller = ProviderUserId::new("user_2abcDEF").unwrap();
        let other = ProviderUserId::new("user_2other").unwrap();

        // caller のローンを 2 件、時刻をずらして作成
        let sut_old = build_sut(&loan_repo, &user_repo, now);
        let first = sut_old
            .create(caller.clone(), create_input("山田太郎"))
            .await
            .unwrap();

        let later = now + Duration::hours(1);
        let sut_new = build_sut(&loan_repo, &user_repo, later);
        let second = sut_new
            .create(caller.clone(), create_input("山田太郎"))
            .await
            .unwrap();

        // 他ユーザーのローン
        sut_old
            .create(other.clone(), create_input("別人"))
            .await
            .unwrap();

        let result = sut_old.list_mine(&caller).await.unwrap();

        assert_eq!(result.len(), 2);
        // 新しい方が先頭
        assert_eq!(result[0].id(), second.id());
        assert_eq!(result[1].id(), first.id());
    }

    #[tokio::test]
    async fn test_ユーザー指定の一覧は本人なら参照できる() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();
        let sut = build_sut(&loan_repo, &user_repo, now);

        let caller = ProviderUserId::new("user_2abcDEF").unwrap();
        sut.create(caller.clone(), create_input("山田太郎"))
            .await
            .unwrap();

        let result = sut.list_by_user(&caller, &caller).await.unwrap();

        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_ユーザー指定の一覧は管理者なら参照できる() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();
        add_admin(&user_repo, "user_2admin", now).await;
        let sut = build_sut(&loan_repo, &user_repo, now);

        let target = ProviderUserId::new("user_2abcDEF").unwrap();
        let admin = ProviderUserId::new("user_2admin").unwrap();
        sut.create(target.clone(), create_input("山田太郎"))
            .await
            .unwrap();

        let result = sut.list_by_user(&target, &admin).await.unwrap();

        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_ユーザー指定の一覧は第三者なら403() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();
        let sut = build_sut(&loan_repo, &user_repo, now);

        let target = ProviderUserId::new("user_2abcDEF").unwrap();
        let stranger = ProviderUserId::new("user_2stranger").unwrap();

        let result = sut.list_by_user(&target, &stranger).await;

        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_所有者による削除は成功する() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();
        let sut = build_sut(&loan_repo, &user_repo, now);

        let owner = ProviderUserId::new("user_2abcDEF").unwrap();
        let loan = sut.create(owner.clone(), create_input("山田太郎")).await.unwrap();

        sut.delete(loan.id(), &owner).await.unwrap();

        assert!(loan_repo.find_by_id(loan.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_管理者による削除は成功する() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();
        add_admin(&user_repo, "user_2admin", now).await;
        let sut = build_sut(&loan_repo, &user_repo, now);

        let owner = ProviderUserId::new("user_2abcDEF").unwrap();
        let admin = ProviderUserId::new("user_2admin").unwrap();
        let loan = sut.create(owner, create_input("山田太郎")).await.unwrap();

        sut.delete(loan.id(), &admin).await.unwrap();

        assert!(loan_repo.find_by_id(loan.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_第三者による削除は403でレコードが残る() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();
        let sut = build_sut(&loan_repo, &user_repo, now);

        let owner = ProviderUserId::new("user_2abcDEF").unwrap();
        let stranger = ProviderUserId::new("user_2stranger").unwrap();
        let loan = sut.create(owner, create_input("山田太郎")).await.unwrap();

        let result = sut.delete(loan.id(), &stranger).await;

        assert!(matches!(result, Err(ApiError::Forbidden(_))));
        // レコードは残っている
        assert!(loan_repo.find_by_id(loan.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_存在しないidの削除は404() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();
        let sut = build_sut(&loan_repo, &user_repo, now);

        let caller = ProviderUserId::new("user_2abcDEF").unwrap();

        let result = sut.delete(&LoanApplicationId::new(), &caller).await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_二重削除は404() {
        let now = fixed_now();
        let loan_repo = MockLoanRepository::new();
        let user_repo = MockUserRepository::new();
        let sut = build_sut(&loan_repo, &user_repo, now);

        let owner = ProviderUserId::new("user_2abcDEF").unwrap();
        let loan = sut.create(owner.clone(), create_input("山田太郎")).await.unwrap();

        sut.delete(loan.id(), &owner).await.unwrap();
        let result = sut.delete(loan.id(), &owner).await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
