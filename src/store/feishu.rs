//! Feishu (Lark) Bitable open API client.

use std::time::Duration;

use chrono::Duration as TokenLifetime;
use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::{AppError, StoreError};
use crate::store::token::{IssuedToken, TokenCache};
use crate::store::{TableRow, TableStore};

const BASE_URL: &str = "https://open.feishu.cn/open-apis";
const LIST_PAGE_SIZE: usize = 500;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 7200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// App credentials and the target table.
#[derive(Debug, Clone)]
pub struct FeishuConfig {
    pub app_id: String,
    pub app_secret: String,
    pub app_token: String,
    pub table_id: String,
}

impl FeishuConfig {
    /// Read credentials from the environment (`.env` honoured).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Ok(Self {
            app_id: required_var("FEISHU_APP_ID")?,
            app_secret: required_var("FEISHU_APP_SECRET")?,
            app_token: required_var("FEISHU_APP_TOKEN")?,
            table_id: required_var("FEISHU_TABLE_ID")?,
        })
    }
}

fn required_var(key: &str) -> Result<String, AppError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::new(2, format!("Missing {key} in environment (.env).")))
}

pub struct FeishuClient {
    client: Client,
    config: FeishuConfig,
    tokens: TokenCache,
}

impl FeishuClient {
    pub fn new(config: FeishuConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            tokens: TokenCache::default(),
        })
    }

    pub fn from_env() -> Result<Self, AppError> {
        Self::new(FeishuConfig::from_env()?)
    }

    fn records_url(&self) -> String {
        format!(
            "{BASE_URL}/bitable/v1/apps/{}/tables/{}/records",
            self.config.app_token, self.config.table_id
        )
    }

    fn request_token(&self) -> Result<IssuedToken, StoreError> {
        let resp: TokenResponse = self
            .client
            .post(format!("{BASE_URL}/auth/v3/tenant_access_token/internal"))
            .json(&json!({
                "app_id": self.config.app_id,
                "app_secret": self.config.app_secret,
            }))
            .send()
            .and_then(|r| r.json())
            .map_err(|e| StoreError::Auth(e.to_string()))?;
        issued_token(resp)
    }

    fn token(&self) -> Result<String, StoreError> {
        self.tokens.get_valid_token(|| self.request_token())
    }

    /// Send an authorized request and unwrap the `{code, msg, data}` envelope.
    ///
    /// A response rejecting the token drops the cached one and retries once with
    /// a fresh token.
    fn call<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        wrap: fn(String) -> StoreError,
    ) -> Result<Option<T>, StoreError> {
        let retry = req.try_clone();
        let first = self.send(req, wrap)?;
        settle(&self.tokens, first, retry.map(|r| move || self.send(r, wrap)), wrap)
    }

    fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        wrap: fn(String) -> StoreError,
    ) -> Result<ApiResponse<T>, StoreError> {
        let token = self.token()?;
        req.bearer_auth(token)
            .send()
            .and_then(|r| r.json())
            .map_err(|e| wrap(e.to_string()))
    }
}

/// Envelope codes meaning the access token is invalid or expired.
const TOKEN_REJECTED_CODES: [i64; 3] = [99991661, 99991663, 99991668];

fn is_token_rejected(code: i64) -> bool {
    TOKEN_REJECTED_CODES.contains(&code)
}

/// Unwrap `first`, or on a token rejection drop the cached token and use `retry`.
fn settle<T, F>(
    tokens: &TokenCache,
    first: ApiResponse<T>,
    retry: Option<F>,
    wrap: fn(String) -> StoreError,
) -> Result<Option<T>, StoreError>
where
    F: FnOnce() -> Result<ApiResponse<T>, StoreError>,
{
    if !is_token_rejected(first.code) {
        return first.into_data().map_err(wrap);
    }

    warn!("Access token rejected (code {}); refreshing", first.code);
    tokens.invalidate();
    match retry {
        Some(retry) => retry()?.into_data().map_err(wrap),
        None => first.into_data().map_err(wrap),
    }
}

impl TableStore for FeishuClient {
    fn authenticate(&self) -> Result<(), StoreError> {
        self.token().map(|_| ())
    }

    fn list_record_ids(&self) -> Result<Vec<String>, StoreError> {
        let url = self.records_url();
        let mut ids = Vec::new();
        let mut page_token = String::new();

        loop {
            let mut req = self
                .client
                .get(&url)
                .query(&[("page_size", LIST_PAGE_SIZE.to_string())]);
            if !page_token.is_empty() {
                req = req.query(&[("page_token", page_token.as_str())]);
            }

            let page: RecordPage = self.call(req, StoreError::List)?.unwrap_or_default();
            ids.extend(page.items.unwrap_or_default().into_iter().map(|item| item.record_id));
            debug!("Listed {} record id(s) so far", ids.len());

            match page.page_token {
                Some(next) if page.has_more && !next.is_empty() => page_token = next,
                _ => break,
            }
        }

        Ok(ids)
    }

    fn delete_records(&self, ids: &[String]) -> Result<(), StoreError> {
        let req = self
            .client
            .post(format!("{}/batch_delete", self.records_url()))
            .json(&json!({ "records": ids }));
        self.call::<serde_json::Value>(req, StoreError::Write)?;
        Ok(())
    }

    fn insert_record(&self, row: &TableRow) -> Result<(), StoreError> {
        let req = self
            .client
            .post(self.records_url())
            .json(&json!({ "fields": row }));
        self.call::<serde_json::Value>(req, StoreError::Write)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: Option<String>,
    #[serde(default)]
    expire: Option<i64>,
}

fn issued_token(resp: TokenResponse) -> Result<IssuedToken, StoreError> {
    if resp.code != 0 {
        return Err(StoreError::Auth(format!("code {}: {}", resp.code, resp.msg)));
    }
    let token = resp
        .tenant_access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| StoreError::Auth("response carried no token".to_string()))?;
    Ok(IssuedToken {
        token,
        expires_in: TokenLifetime::seconds(resp.expire.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)),
    })
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn into_data(self) -> Result<Option<T>, String> {
        if self.code != 0 {
            return Err(format!("code {}: {}", self.code, self.msg));
        }
        Ok(self.data)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RecordPage {
    #[serde(default)]
    items: Option<Vec<RecordItem>>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordItem {
    record_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_sets_lifetime() {
        let resp: TokenResponse = serde_json::from_str(
            r#"{"code": 0, "msg": "ok", "tenant_access_token": "t-abc", "expire": 5400}"#,
        )
        .unwrap();
        let issued = issued_token(resp).unwrap();
        assert_eq!(issued.token, "t-abc");
        assert_eq!(issued.expires_in, TokenLifetime::seconds(5400));
    }

    #[test]
    fn token_error_code_is_auth_failure() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"code": 10014, "msg": "app secret invalid"}"#).unwrap();
        assert_eq!(
            issued_token(resp).unwrap_err(),
            StoreError::Auth("code 10014: app secret invalid".to_string())
        );
    }

    #[test]
    fn record_page_tolerates_null_items() {
        let resp: ApiResponse<RecordPage> = serde_json::from_str(
            r#"{"code": 0, "msg": "success", "data": {"has_more": false, "items": null, "total": 0}}"#,
        )
        .unwrap();
        let page = resp.into_data().unwrap().unwrap();
        assert!(page.items.is_none());
        assert!(!page.has_more);
    }

    #[test]
    fn record_page_lists_ids() {
        let resp: ApiResponse<RecordPage> = serde_json::from_str(
            r#"{"code": 0, "data": {"has_more": true, "page_token": "p2",
                "items": [{"record_id": "rec1", "fields": {}}, {"record_id": "rec2"}]}}"#,
        )
        .unwrap();
        let page = resp.into_data().unwrap().unwrap();
        let ids: Vec<_> = page.items.unwrap().into_iter().map(|i| i.record_id).collect();
        assert_eq!(ids, vec!["rec1", "rec2"]);
        assert_eq!(page.page_token.as_deref(), Some("p2"));
    }

    #[test]
    fn token_rejection_codes() {
        assert!(is_token_rejected(99991663));
        assert!(is_token_rejected(99991668));
        assert!(!is_token_rejected(0));
        assert!(!is_token_rejected(1254045));
    }

    fn issued(token: &str) -> Result<IssuedToken, StoreError> {
        Ok(IssuedToken {
            token: token.to_string(),
            expires_in: TokenLifetime::seconds(7200),
        })
    }

    fn rejected() -> ApiResponse<serde_json::Value> {
        serde_json::from_str(r#"{"code": 99991663, "msg": "Invalid access token for authorization"}"#)
            .unwrap()
    }

    #[test]
    fn rejected_token_is_refreshed_and_retried() {
        let tokens = TokenCache::default();
        tokens.get_valid_token(|| issued("stale")).unwrap();

        let data = settle(
            &tokens,
            rejected(),
            Some(|| {
                let token = tokens.get_valid_token(|| issued("fresh"))?;
                assert_eq!(token, "fresh");
                Ok(ApiResponse {
                    code: 0,
                    msg: "success".to_string(),
                    data: Some(serde_json::json!({"record": {"record_id": "rec1"}})),
                })
            }),
            StoreError::Write,
        )
        .unwrap();

        assert_eq!(data.unwrap()["record"]["record_id"], "rec1");
    }

    #[test]
    fn rejected_token_without_replayable_request_is_reported() {
        let tokens = TokenCache::default();
        tokens.get_valid_token(|| issued("stale")).unwrap();
        let no_retry: Option<fn() -> Result<ApiResponse<serde_json::Value>, StoreError>> = None;

        let err = settle(&tokens, rejected(), no_retry, StoreError::List).unwrap_err();

        assert_eq!(
            err,
            StoreError::List("code 99991663: Invalid access token for authorization".to_string())
        );
        assert_eq!(tokens.get_valid_token(|| issued("fresh")).unwrap(), "fresh");
    }

    #[test]
    fn other_codes_do_not_touch_the_token() {
        let tokens = TokenCache::default();
        tokens.get_valid_token(|| issued("kept")).unwrap();
        let resp: ApiResponse<serde_json::Value> =
            serde_json::from_str(r#"{"code": 1254045, "msg": "FieldNameNotFound"}"#).unwrap();
        let no_retry: Option<fn() -> Result<ApiResponse<serde_json::Value>, StoreError>> = None;

        assert!(settle(&tokens, resp, no_retry, StoreError::Write).is_err());
        assert_eq!(tokens.get_valid_token(|| issued("new")).unwrap(), "kept");
    }

    #[test]
    fn envelope_error_code_is_reported() {
        let resp: ApiResponse<serde_json::Value> =
            serde_json::from_str(r#"{"code": 1254045, "msg": "FieldNameNotFound"}"#).unwrap();
        assert_eq!(resp.into_data().unwrap_err(), "code 1254045: FieldNameNotFound");
    }
}
