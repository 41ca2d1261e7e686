use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use snafu::ResultExt;
use std::time::Duration;
use url::Url;

use crate::api::types::{
    AvailableVariables, BenchmarkParams, BenchmarkResult, ErrorBody, Health, ImbalanceMap,
    ImbalanceRequest, SeriesRow, TimeSeriesQuery, VwapRequest, VwapSeries,
};
use crate::api::DailyDataSource;
use crate::config::Config;
use crate::error::{DecodeSnafu, FetchError, InvalidBaseSnafu, Result};
use crate::logging::{log, obj, v_num, v_str, Domain, Level, ProfileScope};
use crate::model::{DailyDataset, DateSelection};

/// Typed client over the balancing-data REST backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self> {
        Self::with_timeout(base, Duration::from_secs(30))
    }

    pub fn with_timeout(base: &str, timeout: Duration) -> Result<Self> {
        // trailing slash so relative joins extend the path instead of replacing it
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        let base_url = Url::parse(&normalized).context(InvalidBaseSnafu { base })?;
        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base: base_url,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::with_timeout(&cfg.api_base, cfg.request_timeout())
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .context(InvalidBaseSnafu { base: self.base.as_str() })
    }

    async fn send(&self, endpoint: &str, req: RequestBuilder) -> Result<Response> {
        let _scope = ProfileScope::with_context("http_request", &[("endpoint", v_str(endpoint))]);
        let resp = req.send().await?;
        log(
            Level::Debug,
            Domain::Fetch,
            "http_response",
            obj(&[
                ("endpoint", v_str(endpoint)),
                ("status", v_num(resp.status().as_u16() as f64)),
            ]),
        );
        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let resp = check_status(resp).await?;
        resp.json::<T>().await.context(DecodeSnafu)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.endpoint(path)?;
        let resp = self.send(path, self.client.get(url).query(query)).await?;
        Self::decode(resp).await
    }

    /// `GET daily-data/?date=DD-MM-YYYY`
    pub async fn daily_data(&self, date: DateSelection) -> Result<DailyDataset> {
        self.get_json("daily-data/", &[("date", date.to_query())]).await
    }

    /// `GET available-variables/`
    pub async fn available_variables(&self) -> Result<AvailableVariables> {
        self.get_json("available-variables/", &[]).await
    }

    /// `GET time-series/?start_date&end_date&variables`
    pub async fn time_series(&self, query: &TimeSeriesQuery) -> Result<Vec<SeriesRow>> {
        self.get_json("time-series/", &query.params()).await
    }

    /// `GET asset-benchmark/?...`, rows in backend order
    pub async fn asset_benchmark(&self, params: &BenchmarkParams) -> Result<Vec<BenchmarkResult>> {
        self.get_json("asset-benchmark/", &params.params()).await
    }

    /// `GET health`
    pub async fn health(&self) -> Result<Health> {
        self.get_json("health", &[]).await
    }

    /// `POST get-imbalance` (legacy single-period view)
    pub async fn imbalance(&self, req: &ImbalanceRequest) -> Result<ImbalanceMap> {
        let url = self.endpoint("get-imbalance")?;
        let resp = self.send("get-imbalance", self.client.post(url).json(req)).await?;
        Self::decode(resp).await
    }

    /// `POST get-vwap`. A 404 means no acceptances in the period and maps to
    /// an empty series.
    pub async fn vwap(&self, req: &VwapRequest) -> Result<VwapSeries> {
        let url = self.endpoint("get-vwap")?;
        let resp = self.send("get-vwap", self.client.post(url).json(req)).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            log(
                Level::Debug,
                Domain::Fetch,
                "vwap_no_data",
                obj(&[
                    ("gsp_id", v_str(&req.gsp_id)),
                    ("settlement_period", v_num(req.settlement_period as f64)),
                ]),
            );
            return Ok(VwapSeries::empty(req));
        }
        Self::decode(resp).await
    }
}

/// Turn a non-2xx response into `FetchError::Server`, using the backend's
/// `{"error": ...}` body when it has one.
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(FetchError::Server {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DailyDataSource for ApiClient {
    async fn fetch_daily_data(&self, date: DateSelection) -> Result<DailyDataset> {
        self.daily_data(date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::AssetType;
    use crate::model::DayType;
    use mockito::Matcher;

    #[tokio::test]
    async fn daily_data_sends_dd_mm_yyyy() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/daily-data/")
            .match_query(Matcher::UrlEncoded("date".into(), "14-03-2021".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"day_type":"N","settlement_period":[{"settlement_period":1,"gsp_group_id":"_A","net_volume":10}],"hourly":[],"daily":[]}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url())).unwrap();
        let ds = client.daily_data(DateSelection::new(2021, 3, 14)).await.unwrap();
        mock.assert_async().await;
        assert_eq!(ds.day_type, DayType::Normal);
        assert_eq!(ds.settlement_period[0].metrics.net_volume, 10.0);
    }

    #[tokio::test]
    async fn server_error_carries_backend_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/daily-data/")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Data not available for the selected date."}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api/", server.url())).unwrap();
        let err = client.daily_data(DateSelection::new(2021, 3, 14)).await.unwrap_err();
        match err {
            FetchError::Server { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Data not available for the selected date.");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_without_json_body_uses_reason() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/available-variables/")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url())).unwrap();
        let err = client.available_variables().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("Internal Server Error"));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/available-variables/")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url())).unwrap();
        let err = client.available_variables().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // port 9 (discard) on localhost is normally closed
        let client = ApiClient::with_timeout("http://127.0.0.1:9/api", Duration::from_secs(2)).unwrap();
        let err = client.daily_data(DateSelection::new(2024, 1, 1)).await.unwrap_err();
        assert!(err.is_network(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn vwap_not_found_is_empty_series() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/get-vwap")
            .match_body(Matcher::PartialJsonString(r#"{"gspId":"_C","settlementPeriod":5}"#.into()))
            .with_status(404)
            .with_body(r#"{"error":"No VWAP data found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url())).unwrap();
        let req = VwapRequest::new(DateSelection::new(2024, 1, 1), 5, "_C");
        let series = client.vwap(&req).await.unwrap();
        assert!(series.is_empty());
        assert_eq!(series.gsp_id, "_C");
        assert_eq!(series.settlement_period, 5);
    }

    #[tokio::test]
    async fn vwap_series_decodes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/get-vwap")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"times":["00:01:00","00:07:30"],"vwap":[55.0,61.25],"gsp_id":"_C","date":"2024-01-01","settlement_period":5}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url())).unwrap();
        let req = VwapRequest::new(DateSelection::new(2024, 1, 1), 5, "_C");
        let series = client.vwap(&req).await.unwrap();
        assert_eq!(series.vwap, vec![55.0, 61.25]);
    }

    #[tokio::test]
    async fn vwap_server_failure_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/get-vwap")
            .with_status(500)
            .with_body(r#"{"error":"Failed to load VWAP data"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url())).unwrap();
        let req = VwapRequest::new(DateSelection::new(2024, 1, 1), 5, "_C");
        let err = client.vwap(&req).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn imbalance_posts_camel_case_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/get-imbalance")
            .match_body(Matcher::Json(serde_json::json!({
                "year": 2024, "month": 1, "day": 1, "settlementPeriod": 3
            })))
            .with_status(200)
            .with_body(r#"{"_A": 12.5, "_B": 0}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url())).unwrap();
        let map = client
            .imbalance(&ImbalanceRequest::new(DateSelection::new(2024, 1, 1), 3))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(map["_A"], 12.5);
        assert_eq!(map["_B"], 0.0);
    }

    #[tokio::test]
    async fn time_series_rows_keep_column_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/time-series/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("start_date".into(), "2024-01-01".into()),
                Matcher::UrlEncoded("end_date".into(), "2024-01-07".into()),
                Matcher::UrlEncoded("variables".into(), "settlement_period,net_volume".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"settlement_date":"2024-01-01","settlement_period":1,"net_volume":3.5}]"#)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url())).unwrap();
        let rows = client
            .time_series(&TimeSeriesQuery {
                start: DateSelection::new(2024, 1, 1),
                end: DateSelection::new(2024, 1, 7),
                variables: vec!["settlement_period".into(), "net_volume".into()],
            })
            .await
            .unwrap();
        let keys: Vec<_> = rows[0].keys().cloned().collect();
        assert_eq!(keys, ["settlement_date", "settlement_period", "net_volume"]);
    }

    #[tokio::test]
    async fn asset_benchmark_passes_all_params() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/asset-benchmark/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("asset_type".into(), "both".into()),
                Matcher::UrlEncoded("capacity_mw".into(), "50".into()),
                Matcher::UrlEncoded("price_bid".into(), "20".into()),
                Matcher::UrlEncoded("price_offer".into(), "100".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"gsp_group_id":"_A","accepted_volume_mwh":10,"skipped_volume_mwh":5,"skip_rate_percent":33.3,"estimated_revenue":600}]"#)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url())).unwrap();
        let results = client
            .asset_benchmark(&BenchmarkParams {
                start: DateSelection::new(2024, 1, 1),
                end: DateSelection::new(2024, 1, 7),
                asset_type: AssetType::Both,
                capacity_mw: 50.0,
                price_bid: Some(20.0),
                price_offer: Some(100.0),
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].estimated_revenue, 600.0);
    }

    #[test]
    fn invalid_base_is_rejected() {
        let err = ApiClient::new("not a url").unwrap_err();
        assert!(matches!(err, FetchError::InvalidBase { .. }));
    }

    #[test]
    fn endpoints_extend_base_path() {
        let client = ApiClient::new("http://localhost:8000/api").unwrap();
        assert_eq!(
            client.endpoint("daily-data/").unwrap().as_str(),
            "http://localhost:8000/api/daily-data/"
        );
    }
}
