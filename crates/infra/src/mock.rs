//! # インメモリモックリポジトリ
//!
//! ユースケース層のテストで使用するインメモリ実装。
//! 本番コードからは参照しない。
//!
//! `Arc<Mutex<Vec<_>>>` によるシンプルな実装で、Postgres 実装と同じ
//! 並べ替え・絞り込み・条件付き更新のセマンティクスを再現する。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use loanflow_domain::loan::{LoanApplication, LoanApplicationId, LoanStatus};
use loanflow_domain::user::{ProviderUserId, User, UserId};

use crate::error::InfraError;
use crate::repository::{LoanRepository, LoanStatusAggregate, UserRepository};

/// インメモリ実装の LoanRepository
#[derive(Clone, Default)]
pub struct MockLoanRepository {
    loans: Arc<Mutex<Vec<LoanApplication>>>,
}

impl MockLoanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanRepository for MockLoanRepository {
    async fn insert(&self, loan: &LoanApplication) -> Result<(), InfraError> {
        self.loans.lock().unwrap().push(loan.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &LoanApplicationId,
    ) -> Result<Option<LoanApplication>, InfraError> {
        Ok(self
            .loans
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.id() == id)
            .cloned())
    }

    async fn find_by_owner(
        &self,
        owner: &ProviderUserId,
    ) -> Result<Vec<LoanApplication>, InfraError> {
        let mut loans: Vec<_> = self
            .loans
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.owner() == owner)
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.applied_at().cmp(&a.applied_at()));
        Ok(loans)
    }

    async fn find_all_paged(
        &self,
        status: Option<LoanStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LoanApplication>, InfraError> {
        let mut loans: Vec<_> = self
            .loans
            .lock()
            .unwrap()
            .iter()
            .filter(|l| status.is_none_or(|s| l.status() == s))
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.applied_at().cmp(&a.applied_at()));
        Ok(loans
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, status: Option<LoanStatus>) -> Result<i64, InfraError> {
        Ok(self
            .loans
            .lock()
            .unwrap()
            .iter()
            .filter(|l| status.is_none_or(|s| l.status() == s))
            .count() as i64)
    }

    async fn update_status_checked(
        &self,
        loan: &LoanApplication,
        expected: LoanStatus,
    ) -> Result<Option<LoanApplication>, InfraError> {
        let mut loans = self.loans.lock().unwrap();
        let Some(stored) = loans
            .iter_mut()
            .find(|l| l.id() == loan.id() && l.status() == expected)
        else {
            return Ok(None);
        };
        *stored = loan.clone();
        Ok(Some(loan.clone()))
    }

    async fn delete(&self, id: &LoanApplicationId) -> Result<bool, InfraError> {
        let mut loans = self.loans.lock().unwrap();
        let before = loans.len();
        loans.retain(|l| l.id() != id);
        Ok(loans.len() < before)
    }

    async fn status_summary(&self) -> Result<Vec<LoanStatusAggregate>, InfraError> {
        let loans = self.loans.lock().unwrap();
        let mut aggregates: Vec<LoanStatusAggregate> = Vec::new();
        for loan in loans.iter() {
            if let Some(agg) = aggregates.iter_mut().find(|a| a.status == loan.status()) {
                agg.count += 1;
                agg.amount_total += loan.amount().as_f64();
            } else {
                aggregates.push(LoanStatusAggregate {
                    status: loan.status(),
                    count: 1,
                    amount_total: loan.amount().as_f64(),
                });
            }
        }
        Ok(aggregates)
    }

    async fn count_distinct_owners(&self) -> Result<i64, InfraError> {
        let loans = self.loans.lock().unwrap();
        let mut owners: Vec<&ProviderUserId> = loans.iter().map(|l| l.owner()).collect();
        owners.sort_by_key(|o| o.as_str().to_string());
        owners.dedup();
        Ok(owners.len() as i64)
    }

    async fn find_recent(&self, limit: i64) -> Result<Vec<LoanApplication>, InfraError> {
        let mut loans: Vec<_> = self.loans.lock().unwrap().clone();
        loans.sort_by(|a, b| b.applied_at().cmp(&a.applied_at()));
        Ok(loans.into_iter().take(limit.max(0) as usize).collect())
    }
}

/// インメモリ実装の UserRepository
#[derive(Clone, Default)]
pub struct MockUserRepository {
    users: Arc<Mutex<Vec<User>>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn upsert_by_provider_id(&self, user: &User) -> Result<User, InfraError> {
        let mut users = self.users.lock().unwrap();
        if let Some(existing) = users
            .iter_mut()
            .find(|u| u.provider_user_id() == user.provider_user_id())
        {
            // 既存レコードの id / created_at を保持して上書き
            let merged = User::from_db(
                existing.id().clone(),
                existing.provider_user_id().clone(),
                user.email().clone(),
                user.name().clone(),
                user.is_admin(),
                existing.created_at(),
                user.updated_at(),
            );
            *existing = merged.clone();
            return Ok(merged);
        }
        let inserted = User::from_db(
            UserId::from_uuid(*user.id().as_uuid()),
            user.provider_user_id().clone(),
            user.email().clone(),
            user.name().clone(),
            user.is_admin(),
            user.created_at(),
            user.updated_at(),
        );
        users.push(inserted.clone());
        Ok(inserted)
    }

    async fn find_by_provider_id(
        &self,
        provider_user_id: &ProviderUserId,
    ) -> Result<Option<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.provider_user_id() == provider_user_id)
            .cloned())
    }

    async fn find_all_paged(&self, limit: i64, offset: i64) -> Result<Vec<User>, InfraError> {
        let mut users: Vec<_> = self.users.lock().unwrap().clone();
        users.sort_by_key(|u| u.name().as_str().to_string());
        Ok(users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self) -> Result<i64, InfraError> {
        Ok(self.users.lock().unwrap().len() as i64)
    }

    async fn count_admins(&self) -> Result<i64, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.is_admin())
            .count() as i64)
    }
}
