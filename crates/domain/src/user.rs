//! # ユーザー
//!
//! ユーザーエンティティとそれに関連する値オブジェクトを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`User`] | ユーザー | 検証済みログインのたびに同期されるローカルレコード |
//! | [`ProviderUserId`] | プロバイダ ID | 外部アイデンティティプロバイダが発行する不透明な識別子 |
//!
//! ## 設計方針
//!
//! - **Newtype パターン**: UserId / ProviderUserId は内部表現をラップし、型安全性を確保
//! - **不変性**: エンティティフィールドは基本的に不変、変更はメソッド経由
//! - **バリデーション**: 値オブジェクトの生成時に検証ロジックを実行
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use loanflow_domain::{
//!     user::{Email, ProviderUserId, User, UserId},
//!     value_objects::UserName,
//! };
//!
//! let user = User::new(
//!     UserId::new(),
//!     ProviderUserId::new("user_2abcDEF")?,
//!     Email::new("user@example.com")?,
//!     UserName::new("山田太郎")?,
//!     false,
//!     chrono::Utc::now(),
//! );
//!
//! assert!(!user.is_admin());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, value_objects::UserName};

define_uuid_id! {
    /// ユーザー ID（一意識別子）
    ///
    /// UUID v7 を使用し、生成順にソート可能。
    /// Newtype パターンで型安全性を確保。
    pub struct UserId;
}

define_validated_string! {
    /// プロバイダ ID（値オブジェクト）
    ///
    /// 外部アイデンティティプロバイダが発行する不透明な一意識別子。
    /// ローカルの User レコードへの結合キーとして使用する。
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 255 文字
    pub struct ProviderUserId {
        label: "プロバイダ ID",
        max_length: 255,
    }
}

/// メールアドレス（値オブジェクト）
///
/// `local@domain` 形式を要求する。
/// 生成時にバリデーションを実行し、不正な値の作成を防ぐ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// メールアドレスを作成する
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - `@` を含み、ローカル部とドメイン部が空ではない
    /// - 最大 255 文字
    ///
    /// # エラー
    ///
    /// バリデーションに失敗した場合は `DomainError::Validation` を返す。
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }

        // 基本的な構造検証: local@domain の形式であること
        let Some((local, domain)) = value.split_once('@') else {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        };

        if local.is_empty() || domain.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        }

        if value.len() > 255 {
            return Err(DomainError::Validation(
                "メールアドレスは255文字以内である必要があります".to_string(),
            ));
        }

        Ok(Self(value))
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所有権を持つ文字列に変換する
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ユーザーエンティティ
///
/// アイデンティティプロバイダで認証されたユーザーのローカルレコード。
/// 検証済みログインのたびにプロフィールが同期（upsert）される。
/// 認証情報（トークン発行・検証）はプロバイダ側で管理され、
/// このシステムは保持しない。
///
/// # 不変条件
///
/// - `provider_user_id` は全体で一意
/// - `email` は全体で一意
/// - `is_admin` は管理者メール許可リストとの照合結果を保持する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    provider_user_id: ProviderUserId,
    email: Email,
    name: UserName,
    is_admin: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// 新しいユーザーを作成する
    ///
    /// # 引数
    ///
    /// - `id`: ユーザー ID
    /// - `provider_user_id`: プロバイダ発行の識別子
    /// - `email`: メールアドレス
    /// - `name`: 表示名
    /// - `is_admin`: 管理者フラグ（許可リスト照合済み）
    /// - `now`: 現在日時（呼び出し元から注入）
    pub fn new(
        id: UserId,
        provider_user_id: ProviderUserId,
        email: Email,
        name: UserName,
        is_admin: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            provider_user_id,
            email,
            name,
            is_admin,
            created_at: now,
            updated_at: now,
        }
    }

    /// 既存のデータからユーザーを復元する（データベースから取得時）
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: UserId,
        provider_user_id: ProviderUserId,
        email: Email,
        name: UserName,
        is_admin: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            provider_user_id,
            email,
            name,
            is_admin,
            created_at,
            updated_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn provider_user_id(&self) -> &ProviderUserId {
        &self.provider_user_id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn name(&self) -> &UserName {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ビジネスロジックメソッド

    /// ユーザーが管理者か判定する
    ///
    /// Authorization Gate がアクセス判定に使用する唯一の読み取り点。
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// プロバイダのプロフィールを反映した新しいインスタンスを返す
    ///
    /// ログイン検証のたびに呼ばれ、メールアドレス・表示名・管理者フラグを
    /// 最新の値で上書きする。
    pub fn with_profile(
        self,
        email: Email,
        name: UserName,
        is_admin: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            name,
            is_admin,
            updated_at: now,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    // フィクスチャ

    /// テスト用の固定タイムスタンプ
    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[fixture]
    fn member_user(now: DateTime<Utc>) -> User {
        User::new(
            UserId::new(),
            ProviderUserId::new("user_2abcDEF").unwrap(),
            Email::new("user@example.com").unwrap(),
            UserName::new("Test User").unwrap(),
            false,
            now,
        )
    }

    // Email のテスト

    #[test]
    fn test_メールアドレスは正常な形式を受け入れる() {
        assert!(Email::new("user@example.com").is_ok());
    }

    #[rstest]
    #[case("", "空文字列")]
    #[case("no-at-sign", "@記号なし")]
    #[case("@", "@のみ")]
    #[case("@example.com", "ローカル部分が空")]
    #[case("user@", "ドメイン部分が空")]
    #[case(&format!("{}@example.com", "a".repeat(256)), "255文字超過")]
    fn test_メールアドレスは不正な形式を拒否する(
        #[case] input: &str,
        #[case] _reason: &str,
    ) {
        assert!(Email::new(input).is_err());
    }

    // ProviderUserId のテスト

    #[rstest]
    #[case("", "空文字列")]
    #[case("   ", "空白のみ")]
    fn test_プロバイダidは空を拒否する(#[case] input: &str, #[case] _reason: &str) {
        assert!(ProviderUserId::new(input).is_err());
    }

    #[test]
    fn test_プロバイダidは前後の空白をトリムする() {
        let id = ProviderUserId::new("  user_2abcDEF  ").unwrap();
        assert_eq!(id.as_str(), "user_2abcDEF");
    }

    // User のテスト

    #[rstest]
    fn test_新規ユーザーは管理者ではない(member_user: User) {
        assert!(!member_user.is_admin());
    }

    #[rstest]
    fn test_新規ユーザーのcreated_atとupdated_atは注入された値と一致する(
        now: DateTime<Utc>,
        member_user: User,
    ) {
        assert_eq!(member_user.created_at(), now);
        assert_eq!(member_user.updated_at(), now);
    }

    #[rstest]
    fn test_プロフィール同期後の状態(member_user: User) {
        let sync_time = DateTime::from_timestamp(1_700_001_000, 0).unwrap();
        let original = member_user.clone();
        let new_email = Email::new("renamed@example.com").unwrap();
        let new_name = UserName::new("改名太郎").unwrap();

        let sut = member_user.with_profile(new_email.clone(), new_name.clone(), true, sync_time);

        let expected = User::from_db(
            original.id().clone(),
            original.provider_user_id().clone(),
            new_email,
            new_name,
            true,
            original.created_at(),
            sync_time,
        );
        assert_eq!(sut, expected);
    }

    #[rstest]
    fn test_プロフィール同期で管理者フラグが付与される(member_user: User) {
        let sync_time = DateTime::from_timestamp(1_700_001_000, 0).unwrap();
        let email = member_user.email().clone();
        let name = member_user.name().clone();

        let sut = member_user.with_profile(email, name, true, sync_time);

        assert!(sut.is_admin());
    }

    #[rstest]
    fn test_プロフィール同期で管理者フラグが剥奪される(now: DateTime<Utc>) {
        let admin = User::new(
            UserId::new(),
            ProviderUserId::new("user_2admin").unwrap(),
            Email::new("admin@example.com").unwrap(),
            UserName::new("Admin").unwrap(),
            true,
            now,
        );
        let email = admin.email().clone();
        let name = admin.name().clone();

        let sut = admin.with_profile(email, name, false, now);

        assert!(!sut.is_admin());
    }
}
