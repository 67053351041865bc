//! # ローン申請
//!
//! エンドユーザーが提出するローン申請と、そのステータスライフサイクルを管理する。
//!
//! ステータスは 4 状態（pending / approved / rejected / verified）を持ち、
//! 遷移は管理者がリクエストで指定する。遷移ポリシーは「禁止ペアの列挙」方式:
//! 返済完了（verified）のローンを approved / rejected に戻す 2 ペアのみを禁止し、
//! それ以外の遷移は管理者の修正操作を許容するため意図的にすべて許可する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    DomainError,
    user::ProviderUserId,
    value_objects::{
        EmploymentAddress,
        EmploymentStatus,
        FullName,
        LoanAmount,
        LoanDuration,
        LoanPurpose,
    },
};

define_uuid_id! {
    /// ローン申請 ID
    pub struct LoanApplicationId;
}

/// ローン申請ステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LoanStatus {
    /// 審査待ち（作成時の唯一の初期状態）
    Pending,
    /// 承認済み（融資実行）
    Approved,
    /// 却下
    Rejected,
    /// 返済確認済み
    Verified,
}

impl std::str::FromStr for LoanStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "verified" => Ok(Self::Verified),
            _ => Err(DomainError::Validation(format!(
                "不正なローンステータス: {}",
                s
            ))),
        }
    }
}

impl LoanStatus {
    /// DB 保存用の文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// 禁止された遷移ペアか判定する
    ///
    /// 禁止テーブルは (from, to) の完全一致で判定する:
    ///
    /// - `verified → approved`
    /// - `verified → rejected`
    ///
    /// 上記以外のすべてのペア（`approved → pending`、`rejected → pending`、
    /// `verified → pending` を含む）は許可される。
    pub fn transition_forbidden(self, to: LoanStatus) -> bool {
        matches!(
            (self, to),
            (Self::Verified, Self::Approved) | (Self::Verified, Self::Rejected)
        )
    }
}

/// ローン申請エンティティ
///
/// ユーザー操作で作成され、変更は管理者によるステータス遷移と
/// 全体削除（所有者または管理者）のみ。それ以外の更新は行わない。
///
/// # 不変条件
///
/// - `status` は常に 4 状態のいずれか
/// - verified のローンは approved / rejected に遷移できない
#[derive(Debug, Clone, PartialEq)]
pub struct LoanApplication {
    id: LoanApplicationId,
    owner: ProviderUserId,
    full_name: FullName,
    amount: LoanAmount,
    duration: LoanDuration,
    purpose: LoanPurpose,
    employment_status: EmploymentStatus,
    employment_address: EmploymentAddress,
    status: LoanStatus,
    applied_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// ローン申請の新規作成パラメータ
pub struct NewLoanApplication {
    pub id: LoanApplicationId,
    pub owner: ProviderUserId,
    pub full_name: FullName,
    pub amount: LoanAmount,
    pub duration: LoanDuration,
    pub purpose: LoanPurpose,
    pub employment_status: EmploymentStatus,
    pub employment_address: EmploymentAddress,
    pub now: DateTime<Utc>,
}

/// ローン申請の DB 復元パラメータ
///
/// DB スキーマのフラット構造を表現する。
pub struct LoanApplicationRecord {
    pub id: LoanApplicationId,
    pub owner: ProviderUserId,
    pub full_name: FullName,
    pub amount: LoanAmount,
    pub duration: LoanDuration,
    pub purpose: LoanPurpose,
    pub employment_status: EmploymentStatus,
    pub employment_address: EmploymentAddress,
    pub status: LoanStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanApplication {
    /// 新しいローン申請を作成する
    ///
    /// # 不変条件
    ///
    /// - 作成時のステータスは `Pending`
    /// - `applied_at` は注入された現在時刻
    pub fn new(params: NewLoanApplication) -> Self {
        Self {
            id: params.id,
            owner: params.owner,
            full_name: params.full_name,
            amount: params.amount,
            duration: params.duration,
            purpose: params.purpose,
            employment_status: params.employment_status,
            employment_address: params.employment_address,
            status: LoanStatus::Pending,
            applied_at: params.now,
            updated_at: params.now,
        }
    }

    /// 既存のデータから復元する
    pub fn from_db(record: LoanApplicationRecord) -> Self {
        Self {
            id: record.id,
            owner: record.owner,
            full_name: record.full_name,
            amount: record.amount,
            duration: record.duration,
            purpose: record.purpose,
            employment_status: record.employment_status,
            employment_address: record.employment_address,
            status: record.status,
            applied_at: record.applied_at,
            updated_at: record.updated_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &LoanApplicationId {
        &self.id
    }

    pub fn owner(&self) -> &ProviderUserId {
        &self.owner
    }

    pub fn full_name(&self) -> &FullName {
        &self.full_name
    }

    pub fn amount(&self) -> LoanAmount {
        self.amount
    }

    pub fn duration(&self) -> LoanDuration {
        self.duration
    }

    pub fn purpose(&self) -> &LoanPurpose {
        &self.purpose
    }

    pub fn employment_status(&self) -> &EmploymentStatus {
        &self.employment_status
    }

    pub fn employment_address(&self) -> &EmploymentAddress {
        &self.employment_address
    }

    pub fn status(&self) -> LoanStatus {
        self.status
    }

    pub fn applied_at(&self) -> DateTime<Utc> {
        self.applied_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ビジネスロジックメソッド

    /// 指定した呼び出し元が所有者か判定する
    pub fn is_owned_by(&self, caller: &ProviderUserId) -> bool {
        &self.owner == caller
    }

    /// ステータスを遷移させた新しいインスタンスを返す
    ///
    /// 禁止ペア（verified → approved / verified → rejected）のみ拒否し、
    /// それ以外のすべての遷移を許可する。同一ステータスへの遷移も許可される。
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidTransition`: 禁止ペアに一致した場合。
    ///   試行された (from, to) ペアを保持する。
    pub fn with_status(self, to: LoanStatus, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status.transition_forbidden(to) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        Ok(Self {
            status: to,
            updated_at: now,
            ..self
        })
    }
}
