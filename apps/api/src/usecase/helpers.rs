//! ユースケース層の共通ヘルパー

use loanflow_infra::InfraError;

use crate::error::ApiError;

/// `Result<Option<T>, InfraError>` を 404 NotFound に畳み込む拡張トレイト
///
/// リポジトリの `find_*` 結果に対して
/// `repo.find_by_id(&id).await.or_not_found("ローン申請")?` の形で使用する。
pub(crate) trait FindResultExt<T> {
    /// `Ok(None)` を `ApiError::NotFound` に変換する
    fn or_not_found(self, entity: &str) -> Result<T, ApiError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
    fn or_not_found(self, entity: &str) -> Result<T, ApiError> {
        self?.ok_or_else(|| ApiError::NotFound(format!("{entity}が見つかりません")))
    }
}
