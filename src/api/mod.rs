use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::cli::{
    EstimateArgs, OutputFormat, ProjectArgs, ServeArgs, build_estimate, build_inputs,
};
use crate::core::{
    ProjectionError, QuickEstimate, SimulationInputs, YearlySnapshot, project, quick_estimate,
};
use crate::gateway::{Asset, AssetGateway, AssetKind, GatewayError};
use crate::report::{
    ReportError, ReportFormat, ReportRow, drip_label, render_csv, render_pdf, rows_from_snapshots,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<AssetGateway>,
}

impl AppState {
    pub fn new(gateway: AssetGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Gateway(#[from] GatewayError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CompoundPayload {
    #[serde(deserialize_with = "lenient_f64")]
    principal: Option<f64>,
    #[serde(alias = "price", deserialize_with = "lenient_f64")]
    stock_price: Option<f64>,
    #[serde(alias = "yield", deserialize_with = "lenient_f64")]
    dividend_yield: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    expense_ratio: Option<f64>,
    #[serde(alias = "extraContribution", deserialize_with = "lenient_f64")]
    extra: Option<f64>,
    #[serde(alias = "dividendGrowth", deserialize_with = "lenient_f64")]
    div_var: Option<f64>,
    #[serde(alias = "priceAppreciation", deserialize_with = "lenient_f64")]
    app_var: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    years: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EstimatePayload {
    #[serde(deserialize_with = "lenient_f64")]
    principal: Option<f64>,
    #[serde(alias = "stockPrice", deserialize_with = "lenient_f64")]
    price: Option<f64>,
    #[serde(alias = "yield", deserialize_with = "lenient_f64")]
    dividend_yield: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    expense_ratio: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    kind: AssetKind,
    #[serde(default)]
    term: String,
}

#[derive(Debug, Deserialize)]
struct ReportPayload {
    data: Vec<ReportRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompoundResponse {
    dividend_yield: f64,
    years: Vec<YearlySnapshot>,
    rows: Vec<ReportRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EstimateResponse {
    true_yield: f64,
    #[serde(flatten)]
    estimate: QuickEstimate,
    drip_label: String,
    quarterly_drip_label: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssetView {
    #[serde(flatten)]
    asset: Asset,
    true_yield: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/graphql", post(graphql_handler))
        .route("/api/search", get(search_handler))
        .route(
            "/api/estimate",
            get(estimate_get_handler).post(estimate_post_handler),
        )
        .route(
            "/api/compound",
            get(compound_get_handler).post(compound_post_handler),
        )
        .route("/csv", post(csv_handler))
        .route("/pdf", post(pdf_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(args: ServeArgs) -> Result<(), ServerError> {
    let gateway = AssetGateway::new(args.upstream_config())?;
    let app = router(AppState::new(gateway));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, upstream = %args.api_url, "dividend calculator listening");
    info!("Local access: http://127.0.0.1:{}/", args.port);
    if args.api_key.is_none() {
        warn!("API_KEY is not set; upstream searches will likely be rejected");
    }

    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn graphql_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };

    match state.gateway.forward(&body).await {
        Ok(data) => json_response(StatusCode::OK, data),
        Err(e) => {
            warn!(error = %e, "GraphQL proxy request failed");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

async fn search_handler(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Response {
    match state.gateway.search(query.kind, query.term.trim()).await {
        Ok(assets) => {
            let views = assets
                .into_iter()
                .map(|asset| AssetView {
                    true_yield: asset.true_yield(),
                    asset,
                })
                .collect::<Vec<_>>();
            json_response(StatusCode::OK, views)
        }
        Err(e) => {
            warn!(error = %e, kind = ?query.kind, "asset search failed");
            error_response(StatusCode::BAD_GATEWAY, &e.to_string())
        }
    }
}

async fn estimate_get_handler(Query(payload): Query<EstimatePayload>) -> Response {
    estimate_handler_impl(payload)
}

async fn estimate_post_handler(payload: Result<Json<EstimatePayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => estimate_handler_impl(payload),
        Err(rejection) => error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    }
}

fn estimate_handler_impl(payload: EstimatePayload) -> Response {
    let args = match estimate_args_from_payload(payload) {
        Ok(args) => args,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    let inputs = match build_estimate(&args).map_err(|msg| with_payload_keys(&msg)) {
        Ok(inputs) => inputs,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match quick_estimate(inputs.principal, inputs.price, inputs.true_yield) {
        Ok(estimate) => json_response(
            StatusCode::OK,
            EstimateResponse {
                true_yield: inputs.true_yield,
                drip_label: drip_label(estimate.drip_eligible, estimate.drip_multiple),
                quarterly_drip_label: drip_label(
                    estimate.quarterly_drip_eligible,
                    estimate.quarterly_drip_multiple,
                ),
                estimate,
            },
        ),
        Err(e) => projection_error_response(&e),
    }
}

async fn compound_get_handler(Query(payload): Query<CompoundPayload>) -> Response {
    compound_handler_impl(payload)
}

async fn compound_post_handler(payload: Result<Json<CompoundPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => compound_handler_impl(payload),
        Err(rejection) => error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    }
}

fn compound_handler_impl(payload: CompoundPayload) -> Response {
    let inputs = match api_inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => {
            warn!(%msg, "rejected compound request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match project(&inputs) {
        Ok(years) => {
            info!(years = years.len(), "compound projection served");
            let rows = rows_from_snapshots(&years);
            json_response(
                StatusCode::OK,
                CompoundResponse {
                    dividend_yield: inputs.base_dividend_yield,
                    years,
                    rows,
                },
            )
        }
        Err(e) => {
            warn!(error = %e, "compound projection failed");
            projection_error_response(&e)
        }
    }
}

async fn csv_handler(payload: Result<Json<ReportPayload>, JsonRejection>) -> Response {
    report_handler_impl(ReportFormat::Csv, payload)
}

async fn pdf_handler(payload: Result<Json<ReportPayload>, JsonRejection>) -> Response {
    report_handler_impl(ReportFormat::Pdf, payload)
}

fn report_handler_impl(
    format: ReportFormat,
    payload: Result<Json<ReportPayload>, JsonRejection>,
) -> Response {
    let rows = match payload {
        Ok(Json(payload)) => payload.data,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };

    let now = Utc::now();
    let rendered = match format {
        ReportFormat::Csv => render_csv(&rows),
        ReportFormat::Pdf => render_pdf(&rows, now),
    };
    match rendered {
        Ok(bytes) => {
            info!(rows = rows.len(), bytes = bytes.len(), ?format, "report rendered");
            attachment_response(format, now.timestamp_millis(), bytes)
        }
        Err(ReportError::Empty) => error_response(StatusCode::BAD_REQUEST, "report has no rows"),
        Err(e) => {
            warn!(error = %e, ?format, "report rendering failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

fn attachment_response(format: ReportFormat, timestamp_millis: i64, bytes: Vec<u8>) -> Response {
    let file_name = format.file_name(timestamp_millis);
    with_cache_control((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    ))
}

fn projection_error_response(e: &ProjectionError) -> Response {
    let status = match e {
        ProjectionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ProjectionError::NumericOverflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    error_response(status, &e.to_string())
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

/// Accepts numbers either as JSON numbers or as numeric strings (form fields arrive as text).
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(v)) => Ok(Some(v)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("`{s}` is not a number"))),
    }
}

#[cfg(test)]
fn api_inputs_from_json(json: &str) -> Result<SimulationInputs, String> {
    let payload = serde_json::from_str::<CompoundPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_inputs_from_payload(payload)
}

fn api_inputs_from_payload(payload: CompoundPayload) -> Result<SimulationInputs, String> {
    let mut args = default_project_args_for_api();

    args.principal = payload.principal.ok_or("principal is required")?;
    args.stock_price = payload.stock_price.ok_or("stockPrice is required")?;
    args.dividend_yield = payload.dividend_yield.ok_or("dividendYield is required")?;

    if let Some(v) = payload.expense_ratio {
        args.expense_ratio = Some(v);
    }
    if let Some(v) = payload.extra {
        args.extra_contribution = v;
    }
    if let Some(v) = payload.div_var {
        args.dividend_growth = v;
    }
    if let Some(v) = payload.app_var {
        args.price_appreciation = v;
    }
    if let Some(v) = payload.years {
        if v.fract() != 0.0 || v < 0.0 || v > u32::MAX as f64 {
            return Err("years must be a whole number".to_string());
        }
        args.years = v as u32;
    }

    build_inputs(&args).map_err(|msg| with_payload_keys(&msg))
}

/// Rewrites CLI flag names in a validation message to the JSON keys the web client posts.
fn with_payload_keys(msg: &str) -> String {
    const KEYS: [(&str, &str); 9] = [
        ("--price-appreciation", "appVar"),
        ("--dividend-growth", "divVar"),
        ("--extra-contribution", "extra"),
        ("--stock-price", "stockPrice"),
        ("--dividend-yield", "dividendYield"),
        ("--expense-ratio", "expenseRatio"),
        ("--principal", "principal"),
        ("--price", "price"),
        ("--years", "years"),
    ];
    KEYS.iter()
        .fold(msg.to_string(), |acc, (flag, key)| acc.replace(flag, key))
}

fn estimate_args_from_payload(payload: EstimatePayload) -> Result<EstimateArgs, String> {
    Ok(EstimateArgs {
        principal: payload.principal.ok_or("principal is required")?,
        price: payload.price.ok_or("price is required")?,
        dividend_yield: payload.dividend_yield.ok_or("dividendYield is required")?,
        expense_ratio: payload.expense_ratio,
    })
}

fn default_project_args_for_api() -> ProjectArgs {
    ProjectArgs {
        principal: 0.0,
        stock_price: 0.0,
        dividend_yield: 0.0,
        expense_ratio: None,
        extra_contribution: 0.0,
        dividend_growth: 0.0,
        price_appreciation: 0.0,
        years: 1,
        format: OutputFormat::Table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::UpstreamConfig;
    use axum::http::Uri;
    use std::time::Duration;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn offline_state() -> AppState {
        let gateway = AssetGateway::new(UpstreamConfig {
            url: "http://127.0.0.1:9/".to_string(),
            api_key: None,
            api_host: None,
            timeout: Duration::from_secs(2),
        })
        .expect("client builds");
        AppState::new(gateway)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable")
            .to_vec()
    }

    #[test]
    fn api_inputs_from_json_parses_web_keys() {
        let json = r#"{
          "principal": 10000,
          "stockPrice": 50,
          "dividendYield": 4.5,
          "expenseRatio": 0.06,
          "extra": 1200,
          "divVar": 0.5,
          "appVar": 3,
          "years": 15
        }"#;
        let inputs = api_inputs_from_json(json).expect("json should parse");

        assert_approx(inputs.principal, 10_000.0);
        assert_approx(inputs.stock_price, 50.0);
        assert_approx(inputs.base_dividend_yield, 4.44);
        assert_approx(inputs.extra_annual_contribution, 1_200.0);
        assert_approx(inputs.dividend_growth_rate_per_year, 0.5);
        assert_approx(inputs.price_appreciation_rate_per_year, 3.0);
        assert_eq!(inputs.years, 15);
    }

    #[test]
    fn api_inputs_from_json_accepts_string_fields_and_aliases() {
        let json = r#"{
          "symbol": "SCHD",
          "principal": "2500.50",
          "price": "25",
          "yield": "3.2",
          "extra": "",
          "divVar": "0",
          "appVar": "-1.5"
        }"#;
        let inputs = api_inputs_from_json(json).expect("json should parse");

        assert_approx(inputs.principal, 2_500.5);
        assert_approx(inputs.stock_price, 25.0);
        assert_approx(inputs.base_dividend_yield, 3.2);
        assert_approx(inputs.extra_annual_contribution, 0.0);
        assert_approx(inputs.price_appreciation_rate_per_year, -1.5);
        assert_eq!(inputs.years, 1);
    }

    #[test]
    fn api_inputs_from_json_requires_core_fields() {
        let err = api_inputs_from_json(r#"{ "stockPrice": 10, "dividendYield": 4 }"#)
            .expect_err("principal missing");
        assert!(err.contains("principal"));

        let err = api_inputs_from_json(r#"{ "principal": 10, "dividendYield": 4 }"#)
            .expect_err("price missing");
        assert!(err.contains("stockPrice"));
    }

    #[test]
    fn api_inputs_from_json_rejects_fractional_years_and_garbage_numbers() {
        let err = api_inputs_from_json(
            r#"{ "principal": 10, "stockPrice": 10, "dividendYield": 4, "years": 2.5 }"#,
        )
        .expect_err("fractional years");
        assert!(err.contains("years"));

        let err = api_inputs_from_json(r#"{ "principal": "ten", "stockPrice": 10, "dividendYield": 4 }"#)
            .expect_err("non-numeric principal");
        assert!(err.contains("not a number"));
    }

    #[test]
    fn compound_response_serialization_contains_expected_fields() {
        let inputs = api_inputs_from_json(
            r#"{ "principal": 10000, "stockPrice": 50, "dividendYield": 4, "years": 2 }"#,
        )
        .expect("valid inputs");
        let years = project(&inputs).expect("projection runs");
        let response = CompoundResponse {
            dividend_yield: inputs.base_dividend_yield,
            rows: rows_from_snapshots(&years),
            years,
        };
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(json.contains("\"years\""));
        assert!(json.contains("\"rows\""));
        assert!(json.contains("\"dividendYield\""));
        assert!(json.contains("\"cumulativeContributions\""));
        assert!(json.contains("\"cumulativeDividends\""));
        assert!(json.contains("\"endingBalance\""));
        assert!(json.contains("\"totalReturnPercent\""));
        assert!(json.contains("\"intret\""));
        assert!(json.contains("\"contributions\":\"$10,000.00\""));
    }

    #[tokio::test]
    async fn compound_handler_returns_snapshots_and_rows() {
        let payload = CompoundPayload {
            principal: Some(10_000.0),
            stock_price: Some(50.0),
            dividend_yield: Some(4.0),
            extra: Some(1_000.0),
            years: Some(2.0),
            ..CompoundPayload::default()
        };
        let response = compound_handler_impl(payload);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );

        let body = body_json(response).await;
        let years = body["years"].as_array().expect("years array");
        assert_eq!(years.len(), 2);
        assert_eq!(years[1]["year"], 2);
        assert_approx(
            years[1]["cumulativeContributions"].as_f64().expect("number"),
            12_000.0,
        );
        assert_eq!(body["rows"][1]["contributions"], "$12,000.00");
    }

    #[tokio::test]
    async fn compound_handler_maps_errors_to_status_codes() {
        let zero_price = CompoundPayload {
            principal: Some(10_000.0),
            stock_price: Some(0.0),
            dividend_yield: Some(4.0),
            ..CompoundPayload::default()
        };
        let response = compound_handler_impl(zero_price);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().expect("message").contains("stockPrice must be > 0"));

        let nothing_to_compound = CompoundPayload {
            principal: Some(0.0),
            stock_price: Some(10.0),
            dividend_yield: Some(4.0),
            ..CompoundPayload::default()
        };
        assert_eq!(
            compound_handler_impl(nothing_to_compound).status(),
            StatusCode::BAD_REQUEST
        );

        let overflow = CompoundPayload {
            principal: Some(1e300),
            stock_price: Some(1.0),
            dividend_yield: Some(1e10),
            ..CompoundPayload::default()
        };
        assert_eq!(
            compound_handler_impl(overflow).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn estimate_handler_reports_drip_labels() {
        let payload = EstimatePayload {
            principal: Some(10_000.0),
            price: Some(50.0),
            dividend_yield: Some(4.0),
            expense_ratio: None,
        };
        let response = estimate_handler_impl(payload);
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["shareCount"], 200);
        assert_approx(body["yearlyGain"].as_f64().expect("number"), 400.0);
        assert_approx(body["quarterlyGain"].as_f64().expect("number"), 100.0);
        assert_eq!(body["dripLabel"], "NO");
        assert_eq!(body["quarterlyDripLabel"], "YES(x2)");
        assert_approx(body["trueYield"].as_f64().expect("number"), 4.0);
    }

    #[tokio::test]
    async fn estimate_handler_rejects_missing_price() {
        let payload = EstimatePayload {
            principal: Some(10_000.0),
            dividend_yield: Some(4.0),
            ..EstimatePayload::default()
        };
        let response = estimate_handler_impl(payload);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "price is required");
    }

    #[tokio::test]
    async fn csv_report_is_returned_as_attachment() {
        let rows = vec![ReportRow {
            year: "1".to_string(),
            contributions: "$10,000.00".to_string(),
            profits: "$407.42".to_string(),
            balance: "$10,407.42".to_string(),
            intret: "4.07%".to_string(),
        }];
        let response = report_handler_impl(
            ReportFormat::Csv,
            Ok(Json(ReportPayload { data: rows })),
        );
        assert_eq!(response.status(), StatusCode::OK);

        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .expect("content disposition")
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"Compound_Report-"));
        assert!(disposition.ends_with(".csv\""));

        let body = String::from_utf8(body_bytes(response).await).expect("utf-8 csv");
        assert!(body.starts_with("YEAR,CONTRIBUTIONS,PROFITS,BALANCE,RETURN (%)\n"));
        assert!(body.contains("1,\"$10,000.00\",$407.42,\"$10,407.42\",4.07%"));
    }

    #[tokio::test]
    async fn pdf_report_is_returned_as_attachment() {
        let inputs = api_inputs_from_json(
            r#"{ "principal": 5000, "stockPrice": 20, "dividendYield": 6, "years": 3 }"#,
        )
        .expect("valid inputs");
        let rows = rows_from_snapshots(&project(&inputs).expect("projection runs"));

        let response = report_handler_impl(
            ReportFormat::Pdf,
            Ok(Json(ReportPayload { data: rows })),
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/pdf")
        );
        let body = body_bytes(response).await;
        assert!(body.starts_with(b"%PDF-1.4"));
    }

    #[tokio::test]
    async fn empty_report_is_a_bad_request() {
        let response = report_handler_impl(
            ReportFormat::Pdf,
            Ok(Json(ReportPayload { data: Vec::new() })),
        );
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_routes_return_json_404() {
        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn graphql_proxy_reports_unreachable_upstream_as_bad_request() {
        let body = AssetKind::Etf.request_body("schd");
        let response = graphql_handler(State(offline_state()), Ok(Json(body))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().expect("message").contains("upstream"));
    }

    #[test]
    fn validation_messages_name_json_keys() {
        assert_eq!(
            with_payload_keys("--price-appreciation must be a finite number"),
            "appVar must be a finite number"
        );
        assert_eq!(with_payload_keys("--price must be > 0"), "price must be > 0");
        assert_eq!(
            with_payload_keys("--years must be between 1 and 100"),
            "years must be between 1 and 100"
        );

        let err = api_inputs_from_json(
            r#"{ "principal": 10, "stockPrice": 10, "dividendYield": 4, "extra": -5 }"#,
        )
        .expect_err("negative extra");
        assert_eq!(err, "extra must be >= 0");
        assert!(!err.contains("--"));
    }

    #[tokio::test]
    async fn estimate_handler_names_json_key_on_bad_price() {
        let payload = EstimatePayload {
            principal: Some(100.0),
            price: Some(-1.0),
            dividend_yield: Some(4.0),
            expense_ratio: None,
        };
        let response = estimate_handler_impl(payload);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "price must be > 0");
    }

    #[tokio::test]
    async fn compound_query_string_accepts_text_and_empty_fields() {
        let uri: Uri = "/api/compound?principal=10000&price=50&yield=4&extra=&divVar=0&appVar=&years=2"
            .parse()
            .expect("valid uri");
        let Query(payload) =
            Query::<CompoundPayload>::try_from_uri(&uri).expect("query should decode");
        assert_eq!(payload.extra, None);
        assert_eq!(payload.years, Some(2.0));

        let response = compound_get_handler(Query(payload)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["years"].as_array().expect("years array").len(), 2);
        assert_eq!(body["rows"][0]["contributions"], "$10,000.00");
    }

    #[tokio::test]
    async fn compound_query_string_rejects_non_numeric_text() {
        let uri: Uri = "/api/compound?principal=lots&stockPrice=50&dividendYield=4"
            .parse()
            .expect("valid uri");
        assert!(Query::<CompoundPayload>::try_from_uri(&uri).is_err());
    }

    #[tokio::test]
    async fn estimate_query_string_decodes_expense_ratio() {
        let uri: Uri = "/api/estimate?principal=10000&price=50&dividendYield=4.5&expenseRatio=0.06"
            .parse()
            .expect("valid uri");
        let Query(payload) =
            Query::<EstimatePayload>::try_from_uri(&uri).expect("query should decode");

        let response = estimate_get_handler(Query(payload)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_approx(body["trueYield"].as_f64().expect("number"), 4.44);
        assert_eq!(body["shareCount"], 200);
    }

    #[tokio::test]
    async fn search_reports_unreachable_upstream_as_bad_gateway() {
        let query = SearchQuery {
            kind: AssetKind::Etf,
            term: "schd".to_string(),
        };
        let response = search_handler(State(offline_state()), Query(query)).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(body["error"].as_str().expect("message").contains("upstream"));
    }

    #[test]
    fn front_end_clears_stale_results_and_never_injects_error_markup() {
        let catch_branch = APP_JS
            .split("const result = await postJson(\"/api/compound\", body);")
            .nth(1)
            .and_then(|rest| rest.split("} catch (err) {").nth(1))
            .expect("compound submit has a catch branch");
        let hide_at = catch_branch
            .find("hideCompoundResults();")
            .expect("failed run hides the previous table");
        let message_at = catch_branch
            .find("textContent = err.message")
            .expect("failed run shows an inline message");
        assert!(hide_at < message_at);

        assert!(APP_JS.contains("lastRows = [];"));
        assert!(!APP_JS.contains("${err.message}"));
        assert!(!APP_JS.contains("innerHTML = err"));
    }

    #[tokio::test]
    async fn router_builds_with_state() {
        let _router = router(offline_state());
        let response = index_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
