//! # 共通値オブジェクト
//!
//! 複数のエンティティで共有される値オブジェクトを定義する。
//!
//! ## 設計方針
//!
//! - **Newtype パターン**: プリミティブ型をラップし、型安全性を確保
//! - **バリデーション**: 生成時に検証し、不正な値の存在を型レベルで排除
//! - **不変性**: 一度作成したら変更不可
//!
//! ## 含まれる型
//!
//! | 型 | ラップ対象 | 用途 |
//! |---|-----------|------|
//! | [`LoanAmount`] | `f64` | 借入希望額 |
//! | [`LoanDuration`] | `i32` | 借入期間（月数） |
//! | [`UserName`] | `String` | ユーザー表示名 |
//! | [`FullName`] | `String` | 申請者氏名 |
//! | [`LoanPurpose`] | `String` | 借入目的 |
//! | [`EmploymentStatus`] | `String` | 雇用形態 |
//! | [`EmploymentAddress`] | `String` | 勤務先住所 |

use serde::{Deserialize, Serialize};

use crate::DomainError;

// =========================================================================
// LoanAmount（借入希望額）
// =========================================================================

/// 借入希望額（値オブジェクト）
///
/// ローン申請で要求される金額。集計クエリとの互換のため f64 をラップする。
///
/// # 不変条件
///
/// - 有限の数値（NaN / Infinity は不可）
/// - 0 より大きい
///
/// # 使用例
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use loanflow_domain::value_objects::LoanAmount;
///
/// let amount = LoanAmount::new(5000.0)?;
/// assert_eq!(amount.as_f64(), 5000.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct LoanAmount(f64);

impl LoanAmount {
    /// 指定した値から借入希望額を作成する
    ///
    /// # バリデーション
    ///
    /// - NaN / Infinity は無効
    /// - 0 以下は無効
    ///
    /// # エラー
    ///
    /// バリデーションに失敗した場合は `DomainError::Validation` を返す。
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() {
            return Err(DomainError::Validation(
                "借入希望額は有限の数値である必要があります".to_string(),
            ));
        }
        if value <= 0.0 {
            return Err(DomainError::Validation(
                "借入希望額は 0 より大きい必要があります".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// 内部の f64 値を取得する
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for LoanAmount {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::fmt::Display for LoanAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =========================================================================
// LoanDuration（借入期間）
// =========================================================================

/// 借入期間（値オブジェクト）
///
/// 月数で表現する。
///
/// # 不変条件
///
/// - 1 以上の正整数
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoanDuration(i32);

impl LoanDuration {
    /// 指定した月数から借入期間を作成する
    ///
    /// # バリデーション
    ///
    /// - 0 以下は無効（借入期間は 1 ヶ月以上）
    ///
    /// # エラー
    ///
    /// バリデーションに失敗した場合は `DomainError::Validation` を返す。
    pub fn new(months: i32) -> Result<Self, DomainError> {
        if months <= 0 {
            return Err(DomainError::Validation(
                "借入期間は 1 ヶ月以上である必要があります".to_string(),
            ));
        }
        Ok(Self(months))
    }

    /// 内部の i32 値（月数）を取得する
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for LoanDuration {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::fmt::Display for LoanDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =========================================================================
// UserName（ユーザー表示名）
// =========================================================================

define_validated_string! {
    /// ユーザー表示名（値オブジェクト）
    ///
    /// アイデンティティプロバイダのプロフィールから同期される表示名。
    /// PII（個人識別情報）のため、Debug 出力はマスクされる。
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 100 文字
    pub struct UserName {
        label: "ユーザー名",
        max_length: 100,
        pii: true,
    }
}

// =========================================================================
// FullName（申請者氏名）
// =========================================================================

define_validated_string! {
    /// 申請者氏名（値オブジェクト）
    ///
    /// ローン申請フォームに記入されたフルネーム。
    /// PII（個人識別情報）のため、Debug 出力はマスクされる。
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 100 文字
    pub struct FullName {
        label: "申請者氏名",
        max_length: 100,
        pii: true,
    }
}

// =========================================================================
// LoanPurpose（借入目的）
// =========================================================================

define_validated_string! {
    /// 借入目的（値オブジェクト）
    ///
    /// 申請フォームの自由記述欄。
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 500 文字
    pub struct LoanPurpose {
        label: "借入目的",
        max_length: 500,
    }
}

// =========================================================================
// EmploymentStatus（雇用形態）
// =========================================================================

define_validated_string! {
    /// 雇用形態（値オブジェクト）
    ///
    /// 申請フォームの自由記述欄（例: 「正社員」「自営業」）。
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 100 文字
    pub struct EmploymentStatus {
        label: "雇用形態",
        max_length: 100,
    }
}

// =========================================================================
// EmploymentAddress（勤務先住所）
// =========================================================================

define_validated_string! {
    /// 勤務先住所（値オブジェクト）
    ///
    /// PII（個人識別情報）のため、Debug 出力はマスクされる。
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 255 文字
    pub struct EmploymentAddress {
        label: "勤務先住所",
        max_length: 255,
        pii: true,
    }
}

// =========================================================================
// テスト
// =========================================================================
