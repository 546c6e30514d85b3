pub mod config;
pub mod domain;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::InvoicingConfig;
use crate::services::{
    AccountService, CatalogService, EmailProvider, EntitlementChecker, InvoiceService,
    InvoicingStore, JwtService, ReportService,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::verify_email,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::me::get_me,
        handlers::me::update_me,
        handlers::me::change_password,
        handlers::activity::list_activity,
        handlers::company::get_company,
        handlers::company::update_company,
        handlers::company::update_invoice_settings,
        handlers::billing::list_plans,
        handlers::billing::get_subscription,
        handlers::billing::update_subscription,
        handlers::clients::list_clients,
        handlers::clients::create_client,
        handlers::clients::get_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,
        handlers::products::list_products,
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::invoices::list_invoices,
        handlers::invoices::create_invoice,
        handlers::invoices::get_invoice,
        handlers::invoices::update_invoice,
        handlers::invoices::add_line_item,
        handlers::invoices::update_line_item,
        handlers::invoices::remove_line_item,
        handlers::invoices::send_invoice,
        handlers::invoices::record_payment,
        handlers::invoices::cancel_invoice,
        handlers::invoices::duplicate_invoice,
        handlers::invoices::remind_invoice,
        handlers::invoices::invoice_pdf,
        handlers::dashboard::dashboard,
        handlers::reports::revenue,
        handlers::reports::vat,
        handlers::reports::clients,
        handlers::reports::export_invoices,
        handlers::reports::export_vat,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::MessageResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::LoginRequest,
            dtos::auth::ForgotPasswordRequest,
            dtos::auth::ResetPasswordRequest,
            dtos::auth::UpdateProfileRequest,
            dtos::auth::ChangePasswordRequest,
            dtos::auth::MeResponse,
            dtos::company::UpdateCompanyRequest,
            dtos::company::InvoiceSettingsRequest,
            dtos::company::PlanResponse,
            dtos::company::UpdateSubscriptionRequest,
            dtos::company::SubscriptionResponse,
            dtos::catalog::CreateClientRequest,
            dtos::catalog::UpdateClientRequest,
            dtos::catalog::ClientRemovalResponse,
            dtos::catalog::CreateProductRequest,
            dtos::catalog::UpdateProductRequest,
            dtos::invoices::InvoiceListResponse,
            dtos::invoices::LineItemRequest,
            dtos::invoices::CreateInvoiceRequest,
            dtos::invoices::UpdateInvoiceRequest,
            dtos::invoices::UpdateLineItemRequest,
            dtos::invoices::RecordPaymentRequest,
            domain::SubscriptionPlan,
            domain::PlanLimits,
            models::SanitizedUser,
            models::Company,
            models::Client,
            models::ClientType,
            models::ClientBalance,
            models::Product,
            models::ProductType,
            models::Invoice,
            models::InvoiceStatus,
            models::LineItem,
            models::ActivityLog,
            services::AuthSession,
            services::ClientDetail,
            services::InvoiceDetail,
            services::PlanUsage,
            services::entitlement::ResourceUsage,
            services::reports::Dashboard,
            services::reports::DashboardStats,
            services::reports::MonthlyRevenuePoint,
            services::reports::MonthlyRevenue,
            services::reports::ClientRevenue,
            services::reports::RevenueReport,
            services::reports::VatRateTotals,
            services::reports::VatReport,
            services::reports::ClientSummary,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and password recovery"),
        (name = "User", description = "Profile and activity of the signed-in user"),
        (name = "Company", description = "Seller details and invoice settings"),
        (name = "Billing", description = "Subscription plans and usage"),
        (name = "Clients", description = "Buyers invoiced by the company"),
        (name = "Products", description = "Catalogue of products and services"),
        (name = "Invoices", description = "Invoice drafting, delivery and payment"),
        (name = "Reports", description = "Dashboard, revenue and VAT reporting"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: InvoicingConfig,
    pub store: Arc<dyn InvoicingStore>,
    pub email: Arc<dyn EmailProvider>,
    pub jwt: JwtService,
    pub accounts: AccountService,
    pub entitlements: EntitlementChecker,
    pub catalog: CatalogService,
    pub invoices: InvoiceService,
    pub reports: ReportService,
}

impl AppState {
    /// Wire the services over a store and mail transport.
    pub fn new(
        config: InvoicingConfig,
        store: Arc<dyn InvoicingStore>,
        email: Arc<dyn EmailProvider>,
    ) -> Result<Self, AppError> {
        let jwt = JwtService::new(&config.jwt).map_err(AppError::ConfigError)?;
        let entitlements = EntitlementChecker::new(store.clone());
        let accounts = AccountService::new(
            store.clone(),
            email.clone(),
            jwt.clone(),
            config.app_base_url.clone(),
        );
        let catalog = CatalogService::new(store.clone(), entitlements.clone());
        let invoices = InvoiceService::new(store.clone(), email.clone(), entitlements.clone());
        let reports = ReportService::new(store.clone(), invoices.clone(), entitlements.clone());

        Ok(Self {
            config,
            store,
            email,
            jwt,
            accounts,
            entitlements,
            catalog,
            invoices,
            reports,
        })
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/me",
            get(handlers::me::get_me).put(handlers::me::update_me),
        )
        .route("/me/password", post(handlers::me::change_password))
        .route("/activity", get(handlers::activity::list_activity))
        .route(
            "/company",
            get(handlers::company::get_company).put(handlers::company::update_company),
        )
        .route(
            "/company/invoice-settings",
            put(handlers::company::update_invoice_settings),
        )
        .route(
            "/billing/subscription",
            get(handlers::billing::get_subscription).put(handlers::billing::update_subscription),
        )
        .route(
            "/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/clients/:client_id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/products/:product_id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/invoices",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route(
            "/invoices/:invoice_id",
            get(handlers::invoices::get_invoice).put(handlers::invoices::update_invoice),
        )
        .route(
            "/invoices/:invoice_id/items",
            post(handlers::invoices::add_line_item),
        )
        .route(
            "/invoices/:invoice_id/items/:item_id",
            put(handlers::invoices::update_line_item).delete(handlers::invoices::remove_line_item),
        )
        .route("/invoices/:invoice_id/send", post(handlers::invoices::send_invoice))
        .route("/invoices/:invoice_id/pay", post(handlers::invoices::record_payment))
        .route("/invoices/:invoice_id/cancel", post(handlers::invoices::cancel_invoice))
        .route(
            "/invoices/:invoice_id/duplicate",
            post(handlers::invoices::duplicate_invoice),
        )
        .route("/invoices/:invoice_id/remind", post(handlers::invoices::remind_invoice))
        .route("/invoices/:invoice_id/pdf", get(handlers::invoices::invoice_pdf))
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route("/reports/revenue", get(handlers::reports::revenue))
        .route("/reports/vat", get(handlers::reports::vat))
        .route("/reports/clients", get(handlers::reports::clients))
        .route(
            "/reports/export/invoices",
            get(handlers::reports::export_invoices),
        )
        .route("/reports/export/vat", get(handlers::reports::export_vat))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_handler))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/verify", get(handlers::auth::verify_email))
        .route("/auth/forgot-password", post(handlers::auth::forgot_password))
        .route("/auth/reset-password", post(handlers::auth::reset_password))
        .route("/billing/plans", get(handlers::billing::list_plans))
        .merge(protected)
        .merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        // Add metrics middleware
        .layer(from_fn(metrics_middleware))
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}
