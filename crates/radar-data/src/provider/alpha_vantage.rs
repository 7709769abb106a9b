//! Alpha Vantage REST API 클라이언트.
//!
//! 무료 티어는 호출 한도가 낮으며, 한도 초과 시에도 HTTP 200과 함께
//! `"Note"` 또는 `"Information"` 필드만 담긴 응답을 돌려줍니다.
//! 이 모듈은 그런 응답 봉투(envelope)를 [`ProviderError`] 종류로 변환합니다.
//!
//! # 사용 엔드포인트
//!
//! | function | 용도 |
//! |---|---|
//! | `TIME_SERIES_DAILY` | 일봉 (compact, 최근 100거래일) |
//! | `GLOBAL_QUOTE` | 최신 시세 |
//! | `OVERVIEW` | 시가총액, 베타, 섹터, 52주 고가, 유통주식, 공매도 비율 |
//! | `NEWS_SENTIMENT` | 뉴스 건수 |
//! | `RSI` | Provider 계산 RSI (로컬 계산 불가 시 대체용) |

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use radar_core::{DailyBar, Overview, ProviderError, ProviderResult, Quote, RawSeries};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::MarketDataProvider;

/// 기본 API 엔드포인트.
pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage 클라이언트.
#[derive(Clone)]
pub struct AlphaVantageClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for AlphaVantageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// ==================== 응답 구조체 ====================

#[derive(Debug, Deserialize)]
struct TimeSeriesDailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
}

#[derive(Debug, Deserialize)]
struct DailyData {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    feed: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RsiResponse {
    #[serde(rename = "Technical Analysis: RSI")]
    analysis: Option<HashMap<String, RsiPoint>>,
}

#[derive(Debug, Deserialize)]
struct RsiPoint {
    #[serde(rename = "RSI")]
    rsi: String,
}

impl AlphaVantageClient {
    /// 새 클라이언트 생성.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// HTTP 요청 타임아웃을 가진 클라이언트 생성.
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// 엔드포인트 변경 (테스트, 프록시용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// API 호출 후 응답 봉투 검사.
    async fn query(&self, function: &str, symbol: &str, extra: &[(&str, &str)]) -> ProviderResult<Value> {
        let mut params: Vec<(&str, &str)> = vec![("function", function)];
        params.extend_from_slice(extra);
        params.push(("apikey", self.api_key.as_str()));

        debug!(function, symbol, "Alpha Vantage 요청");

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| map_transport_error(function, symbol, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(status, function, symbol));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| map_transport_error(function, symbol, e))?;

        check_envelope(&body, function, symbol)?;
        Ok(body)
    }
}

/// 응답 본문을 타입으로 변환.
fn decode<T: DeserializeOwned>(body: Value, function: &str, symbol: &str) -> ProviderResult<T> {
    serde_json::from_value(body).map_err(|e| {
        ProviderError::MalformedResponse(format!("{} {}: 응답 파싱 실패: {}", function, symbol, e))
    })
}

/// HTTP 200 응답에 실린 에러 봉투 검사.
fn check_envelope(body: &Value, function: &str, symbol: &str) -> ProviderResult<()> {
    let object = body.as_object().ok_or_else(|| {
        ProviderError::MalformedResponse(format!("{} {}: JSON 객체가 아닙니다", function, symbol))
    })?;

    if let Some(note) = object
        .get("Note")
        .or_else(|| object.get("Information"))
        .and_then(Value::as_str)
    {
        return Err(ProviderError::RateLimited(note.to_string()));
    }

    if let Some(message) = object.get("Error Message").and_then(Value::as_str) {
        return Err(ProviderError::NotFound(format!("{}: {}", symbol, message)));
    }

    if object.is_empty() {
        return Err(ProviderError::NotFound(format!(
            "{} {}: 빈 응답",
            function, symbol
        )));
    }

    Ok(())
}

fn map_status(status: StatusCode, function: &str, symbol: &str) -> ProviderError {
    let message = format!("{} {}: HTTP {}", function, symbol, status);
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(message),
        StatusCode::NOT_FOUND => ProviderError::NotFound(message),
        _ => ProviderError::Unavailable(message),
    }
}

fn map_transport_error(function: &str, symbol: &str, e: reqwest::Error) -> ProviderError {
    let message = format!("{} {}: {}", function, symbol, e);
    if e.is_timeout() {
        ProviderError::Timeout(message)
    } else if e.is_decode() {
        ProviderError::MalformedResponse(message)
    } else {
        ProviderError::Unavailable(message)
    }
}

/// 필수 숫자 필드 파싱. 실패 시 `MalformedResponse`.
fn required_decimal(raw: &str, field: &str) -> ProviderResult<Decimal> {
    raw.trim().parse::<Decimal>().map_err(|_| {
        ProviderError::MalformedResponse(format!("{} 값을 숫자로 변환할 수 없습니다: {:?}", field, raw))
    })
}

fn required_volume(raw: &str, field: &str) -> ProviderResult<i64> {
    raw.trim().parse::<i64>().map_err(|_| {
        ProviderError::MalformedResponse(format!("{} 값을 정수로 변환할 수 없습니다: {:?}", field, raw))
    })
}

fn required_date(raw: &str, field: &str) -> ProviderResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        ProviderError::MalformedResponse(format!("{} 값을 날짜로 변환할 수 없습니다: {:?}", field, raw))
    })
}

/// 선택 필드 정규화. `"None"`, `"-"`, 빈 문자열은 누락입니다.
fn optional_text(raw: Option<&Value>) -> Option<&str> {
    raw.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "None" && *s != "-")
}

fn optional_decimal(raw: Option<&Value>) -> Option<Decimal> {
    optional_text(raw).and_then(|s| s.parse::<Decimal>().ok())
}

fn parse_daily_series(symbol: &str, body: Value) -> ProviderResult<RawSeries> {
    let response: TimeSeriesDailyResponse = decode(body, "TIME_SERIES_DAILY", symbol)?;
    let time_series = response.time_series.ok_or_else(|| {
        ProviderError::MalformedResponse(format!(
            "TIME_SERIES_DAILY {}: \"Time Series (Daily)\" 필드가 없습니다",
            symbol
        ))
    })?;

    if time_series.is_empty() {
        return Err(ProviderError::NotFound(format!("{}: 일봉 데이터 없음", symbol)));
    }

    let bars = time_series
        .into_iter()
        .map(|(date, data)| {
            Ok(DailyBar {
                date: required_date(&date, "date")?,
                open: required_decimal(&data.open, "1. open")?,
                high: required_decimal(&data.high, "2. high")?,
                low: required_decimal(&data.low, "3. low")?,
                close: required_decimal(&data.close, "4. close")?,
                volume: required_volume(&data.volume, "5. volume")?,
            })
        })
        .collect::<ProviderResult<Vec<_>>>()?;

    RawSeries::from_unordered(symbol, bars)
        .map_err(|e| ProviderError::MalformedResponse(format!("{}: {}", symbol, e)))
}

fn parse_quote(symbol: &str, body: Value) -> ProviderResult<Quote> {
    let response: GlobalQuoteResponse = decode(body, "GLOBAL_QUOTE", symbol)?;
    let quote = response.global_quote.ok_or_else(|| {
        ProviderError::MalformedResponse(format!(
            "GLOBAL_QUOTE {}: \"Global Quote\" 필드가 없습니다",
            symbol
        ))
    })?;

    if quote.is_empty() {
        return Err(ProviderError::NotFound(format!("{}: 시세 없음", symbol)));
    }

    Ok(Quote {
        price: required_decimal(quote_field(&quote, symbol, "05. price")?, "05. price")?,
        volume: quote
            .get("06. volume")
            .and_then(|v| v.trim().parse::<i64>().ok()),
        latest_trading_day: required_date(
            quote_field(&quote, symbol, "07. latest trading day")?,
            "07. latest trading day",
        )?,
        previous_close: quote
            .get("08. previous close")
            .and_then(|v| v.trim().parse::<Decimal>().ok()),
    })
}

fn quote_field<'a>(
    quote: &'a HashMap<String, String>,
    symbol: &str,
    name: &str,
) -> ProviderResult<&'a str> {
    quote.get(name).map(String::as_str).ok_or_else(|| {
        ProviderError::MalformedResponse(format!("GLOBAL_QUOTE {}: {} 필드 누락", symbol, name))
    })
}

fn parse_overview(body: &Value) -> Overview {
    let short_pct_float = optional_decimal(body.get("ShortPercentFloat"))
        .and_then(|fraction| fraction.checked_mul(Decimal::ONE_HUNDRED));

    Overview {
        market_cap: optional_decimal(body.get("MarketCapitalization")),
        beta: optional_decimal(body.get("Beta")),
        sector: optional_text(body.get("Sector")).map(str::to_string),
        week_52_high: optional_decimal(body.get("52WeekHigh")),
        float_shares: optional_decimal(body.get("SharesFloat")),
        short_pct_float,
        avg_volume_10d: None,
        avg_volume: None,
    }
}

fn parse_news_count(symbol: &str, body: Value) -> ProviderResult<u32> {
    let response: NewsResponse = decode(body, "NEWS_SENTIMENT", symbol)?;
    let feed = response.feed.ok_or_else(|| {
        ProviderError::MalformedResponse(format!("NEWS_SENTIMENT {}: feed 필드가 없습니다", symbol))
    })?;

    Ok(u32::try_from(feed.len()).unwrap_or(u32::MAX))
}

fn parse_rsi(symbol: &str, body: Value) -> ProviderResult<Decimal> {
    let response: RsiResponse = decode(body, "RSI", symbol)?;
    let analysis = response.analysis.ok_or_else(|| {
        ProviderError::MalformedResponse(format!(
            "RSI {}: \"Technical Analysis: RSI\" 필드가 없습니다",
            symbol
        ))
    })?;

    // 날짜 키(YYYY-MM-DD)는 사전순이 곧 시간순
    let (_, latest) = analysis
        .iter()
        .max_by(|a, b| a.0.cmp(b.0))
        .ok_or_else(|| ProviderError::NotFound(format!("{}: RSI 데이터 없음", symbol)))?;

    required_decimal(&latest.rsi, "RSI")
}

#[async_trait]
impl MarketDataProvider for AlphaVantageClient {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    async fn fetch_daily_series(&self, symbol: &str) -> ProviderResult<RawSeries> {
        let body = self
            .query(
                "TIME_SERIES_DAILY",
                symbol,
                &[("symbol", symbol), ("outputsize", "compact")],
            )
            .await?;
        parse_daily_series(symbol, body)
    }

    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        let body = self
            .query("GLOBAL_QUOTE", symbol, &[("symbol", symbol)])
            .await?;
        parse_quote(symbol, body)
    }

    async fn fetch_overview(&self, symbol: &str) -> ProviderResult<Overview> {
        let body = self.query("OVERVIEW", symbol, &[("symbol", symbol)]).await?;
        Ok(parse_overview(&body))
    }

    async fn fetch_news_count(&self, symbol: &str) -> ProviderResult<u32> {
        let body = self
            .query("NEWS_SENTIMENT", symbol, &[("tickers", symbol)])
            .await?;
        parse_news_count(symbol, body)
    }

    async fn fetch_rsi(&self, symbol: &str, period: usize) -> ProviderResult<Decimal> {
        let period = period.to_string();
        let body = self
            .query(
                "RSI",
                symbol,
                &[
                    ("symbol", symbol),
                    ("interval", "daily"),
                    ("time_period", period.as_str()),
                    ("series_type", "close"),
                ],
            )
            .await?;
        parse_rsi(symbol, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use radar_core::ProviderErrorKind;
    use rust_decimal_macros::dec;

    async fn mock_function(
        server: &mut mockito::ServerGuard,
        function: &str,
        status: usize,
        body: &str,
    ) -> mockito::Mock {
        server
            .mock("GET", "/query")
            .match_query(Matcher::UrlEncoded("function".into(), function.into()))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    fn client_for(server: &mockito::ServerGuard) -> AlphaVantageClient {
        AlphaVantageClient::new("demo").with_base_url(format!("{}/query", server.url()))
    }

    #[tokio::test]
    async fn test_daily_series_parsed_in_date_order() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_function(
            &mut server,
            "TIME_SERIES_DAILY",
            200,
            r#"{
                "Meta Data": {"1. Information": "Daily Prices", "2. Symbol": "MP"},
                "Time Series (Daily)": {
                    "2026-03-03": {"1. open": "10.5", "2. high": "11.2", "3. low": "10.4", "4. close": "11.0", "5. volume": "2000"},
                    "2026-03-02": {"1. open": "9.8", "2. high": "10.1", "3. low": "9.7", "4. close": "10.0", "5. volume": "1500"}
                }
            }"#,
        )
        .await;

        let series = client_for(&server).fetch_daily_series("MP").await.unwrap();

        assert_eq!(series.symbol(), "MP");
        assert_eq!(series.len(), 2);
        assert_eq!(series.previous().unwrap().close, dec!(10.0));
        assert_eq!(series.latest().unwrap().close, dec!(11.0));
        assert_eq!(series.latest().unwrap().volume, 2000);
    }

    #[tokio::test]
    async fn test_rate_limit_note() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_function(
            &mut server,
            "GLOBAL_QUOTE",
            200,
            r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#,
        )
        .await;

        let err = client_for(&server).fetch_quote("MP").await.unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn test_information_envelope_is_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_function(
            &mut server,
            "OVERVIEW",
            200,
            r#"{"Information": "We have detected your API key as demo and our standard API rate limit is 25 requests per day."}"#,
        )
        .await;

        let err = client_for(&server).fetch_overview("MP").await.unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn test_error_message_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_function(
            &mut server,
            "TIME_SERIES_DAILY",
            200,
            r#"{"Error Message": "Invalid API call. Please retry or visit the documentation."}"#,
        )
        .await;

        let err = client_for(&server)
            .fetch_daily_series("ZZZZ")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_empty_global_quote_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_function(&mut server, "GLOBAL_QUOTE", 200, r#"{"Global Quote": {}}"#).await;

        let err = client_for(&server).fetch_quote("ZZZZ").await.unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_missing_series_key_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_function(
            &mut server,
            "TIME_SERIES_DAILY",
            200,
            r#"{"Meta Data": {"2. Symbol": "MP"}}"#,
        )
        .await;

        let err = client_for(&server)
            .fetch_daily_series("MP")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_unparsable_close_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_function(
            &mut server,
            "TIME_SERIES_DAILY",
            200,
            r#"{"Time Series (Daily)": {
                "2026-03-03": {"1. open": "1", "2. high": "1", "3. low": "1", "4. close": "abc", "5. volume": "10"}
            }}"#,
        )
        .await;

        let err = client_for(&server)
            .fetch_daily_series("MP")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_http_status_mapping() {
        let mut server = mockito::Server::new_async().await;
        let _a = mock_function(&mut server, "GLOBAL_QUOTE", 429, "{}").await;
        let _b = mock_function(&mut server, "OVERVIEW", 503, "{}").await;

        let client = client_for(&server);
        assert_eq!(
            client.fetch_quote("MP").await.unwrap_err().kind(),
            ProviderErrorKind::RateLimited
        );
        assert_eq!(
            client.fetch_overview("MP").await.unwrap_err().kind(),
            ProviderErrorKind::Unavailable
        );
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_function(&mut server, "GLOBAL_QUOTE", 200, "<html>oops</html>").await;

        let err = client_for(&server).fetch_quote("MP").await.unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_quote_parsed() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_function(
            &mut server,
            "GLOBAL_QUOTE",
            200,
            r#"{"Global Quote": {
                "01. symbol": "MP", "05. price": "11.5000", "06. volume": "6000",
                "07. latest trading day": "2026-03-03", "08. previous close": "10.0000"
            }}"#,
        )
        .await;

        let quote = client_for(&server).fetch_quote("MP").await.unwrap();
        assert_eq!(quote.price, dec!(11.5));
        assert_eq!(quote.volume, Some(6000));
        assert_eq!(
            quote.latest_trading_day,
            NaiveDate::from_ymd_opt(2026, 3, 3).unwrap()
        );
        assert_eq!(quote.previous_close, Some(dec!(10)));
    }

    #[tokio::test]
    async fn test_overview_placeholders_are_missing() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_function(
            &mut server,
            "OVERVIEW",
            200,
            r#"{
                "Symbol": "MP", "MarketCapitalization": "350000000", "Beta": "None",
                "Sector": "", "52WeekHigh": "12.1", "SharesFloat": "-",
                "ShortPercentFloat": "0.125"
            }"#,
        )
        .await;

        let overview = client_for(&server).fetch_overview("MP").await.unwrap();
        assert_eq!(overview.market_cap, Some(dec!(350000000)));
        assert_eq!(overview.beta, None);
        assert_eq!(overview.sector, None);
        assert_eq!(overview.week_52_high, Some(dec!(12.1)));
        assert_eq!(overview.float_shares, None);
        assert_eq!(overview.short_pct_float, Some(dec!(12.5)));
    }

    #[tokio::test]
    async fn test_news_count_and_rsi() {
        let mut server = mockito::Server::new_async().await;
        let _n = mock_function(
            &mut server,
            "NEWS_SENTIMENT",
            200,
            r#"{"items": "3", "feed": [{"title": "a"}, {"title": "b"}, {"title": "c"}]}"#,
        )
        .await;
        let _r = mock_function(
            &mut server,
            "RSI",
            200,
            r#"{"Technical Analysis: RSI": {
                "2026-03-02": {"RSI": "55.1200"},
                "2026-03-03": {"RSI": "61.4500"}
            }}"#,
        )
        .await;

        let client = client_for(&server);
        assert_eq!(client.fetch_news_count("MP").await.unwrap(), 3);
        assert_eq!(client.fetch_rsi("MP", 14).await.unwrap(), dec!(61.45));
    }
}
