//! # LoanFlow API サーバー
//!
//! ローン管理バックエンドの HTTP サービス。
//!
//! ## 役割
//!
//! - **エンドユーザー API**: ローン申請の提出・一覧・削除、プロフィール同期
//! - **管理 API**: ダッシュボード集計、一覧、ステータス遷移
//!   （Authorization Gate で管理者のみに制限）
//!
//! 認証はアイデンティティプロバイダ（外部）のベアラートークン検証に委譲し、
//! このサービスはトークンもパスワードも保持しない。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `API_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `API_PORT` | No | ポート番号（デフォルト: `5000`） |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `ALLOWED_ORIGINS` | No | CORS 許可オリジン（カンマ区切り） |
//! | `ADMIN_EMAILS` | No | 管理者メール許可リスト（カンマ区切り） |
//! | `IDENTITY_BASE_URL` | **Yes** | プロバイダ API のベース URL |
//! | `IDENTITY_SECRET_KEY` | **Yes** | プロバイダのシークレットキー |
//! | `LOG_FORMAT` | No | `json` または `pretty`（デフォルト: `pretty`） |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境
//! cargo run -p loanflow-api
//!
//! # 本番環境
//! API_PORT=5000 DATABASE_URL=postgres://... cargo run -p loanflow-api --release
//! ```

mod config;
mod error;
mod handler;
mod middleware;
mod usecase;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};
use config::ApiConfig;
use handler::{
    AdminState,
    AuthState,
    LoanState,
    create_loan,
    delete_loan,
    get_dashboard_stats,
    get_loan,
    health_check,
    list_loans,
    list_my_loans,
    list_user_loans,
    list_users,
    update_loan_status,
    verify_identity,
};
use loanflow_domain::clock::{Clock, SystemClock};
use loanflow_infra::{
    db,
    identity::{HttpIdentityProvider, IdentityProvider},
    repository::{
        LoanRepository,
        PostgresLoanRepository,
        PostgresUserRepository,
        UserRepository,
    },
};
use loanflow_shared::observability::{LogFormat, TracingConfig};
use middleware::{AuthGateState, authenticate, require_admin};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use usecase::{
    AuthUseCaseImpl,
    DashboardUseCaseImpl,
    LoanApplicationUseCaseImpl,
    LoanReviewUseCaseImpl,
};

/// API サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化（LOG_FORMAT で JSON / Pretty を切り替え）
    let tracing_config = TracingConfig::from_env("loanflow-api");
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,loanflow=debug".into()),
    );
    match tracing_config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    // 設定読み込み（起動時に一度だけ。以降は不変の構造体として受け渡す）
    let config = ApiConfig::from_env().expect("設定の読み込みに失敗しました");

    tracing::info!(
        "API サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // データベース接続プールを作成し、マイグレーションを適用
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("データベース接続に失敗しました");
    db::run_migrations(&pool)
        .await
        .expect("マイグレーションの適用に失敗しました");
    tracing::info!("データベースに接続しました");

    // 依存コンポーネントを初期化
    let loan_repository: Arc<dyn LoanRepository> =
        Arc::new(PostgresLoanRepository::new(pool.clone()));
    let user_repository: Arc<dyn UserRepository> =
        Arc::new(PostgresUserRepository::new(pool.clone()));
    let identity: Arc<dyn IdentityProvider> = Arc::new(HttpIdentityProvider::new(
        &config.identity.base_url,
        config.identity.secret_key.clone(),
    ));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Authorization Gate
    let gate = AuthGateState {
        identity:        identity.clone(),
        user_repository: user_repository.clone(),
    };

    // ハンドラの共有状態
    let auth_state = Arc::new(AuthState {
        usecase: AuthUseCaseImpl::new(
            user_repository.clone(),
            identity.clone(),
            &config.admin_emails,
            clock.clone(),
        ),
    });
    let loan_state = Arc::new(LoanState {
        usecase: LoanApplicationUseCaseImpl::new(
            loan_repository.clone(),
            user_repository.clone(),
            clock.clone(),
        ),
    });
    let admin_state = Arc::new(AdminState {
        dashboard: DashboardUseCaseImpl::new(loan_repository.clone(), user_repository.clone()),
        review: LoanReviewUseCaseImpl::new(loan_repository.clone(), clock.clone()),
        loan_repository: loan_repository.clone(),
        user_repository: user_repository.clone(),
    });

    // 管理 API（ルート全体を require_admin で包む）
    let admin_routes = Router::new()
        .route("/api/admin/dashboard-stats", get(get_dashboard_stats))
        .route("/api/admin/loans", get(list_loans))
        .route("/api/admin/loans/{id}", get(get_loan))
        .route("/api/admin/loans/{id}/status", patch(update_loan_status))
        .route("/api/admin/users", get(list_users))
        .with_state(admin_state)
        .route_layer(from_fn_with_state(gate.clone(), require_admin));

    // 認証が必要な API 全体（エンドユーザー + 管理）
    let api_routes = Router::new()
        .route("/api/auth/verify", get(verify_identity))
        .with_state(auth_state)
        .route("/api/loan", post(create_loan))
        .route("/api/loan/my-loans", get(list_my_loans))
        .route(
            "/api/loan/{id}",
            get(list_user_loans).delete(delete_loan),
        )
        .with_state(loan_state)
        .merge(admin_routes)
        .layer(from_fn_with_state(gate, authenticate));

    // CORS（許可オリジンは設定から。ハンドラ内での環境変数参照はしない）
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    // ルーター構築
    let app = Router::new()
        .route("/health", get(health_check))
        .merge(api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // サーバー起動
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("アドレスのパースに失敗しました");

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("API サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
