//! Blocking HTTP client for the CIP-API.

use crate::auth::{ApiToken, Credentials, TokenResponse};
use crate::interpretation::{InterpretationListing, ListingWire};
use crate::{CipApiError, CipApiResult};
use reqwest::StatusCode;
use std::time::Duration;

/// The listing endpoint is paged; one large page keeps a participant's requests together.
const LISTING_PAGE_SIZE: &str = "100000";

/// Connection settings resolved at startup.
#[derive(Clone, Debug)]
pub struct ClientSettings {
    /// API root, e.g. `https://cipapi.genomicsengland.nhs.uk/api`.
    pub base_url: String,
    pub proxy: Option<String>,
    pub timeout: Duration,
}

/// Parameters of an interpretation request listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingQuery {
    pub provider_id: String,
    pub statuses: Vec<String>,
    pub participant_id: String,
}

/// CIP-API client holding an authenticated token.
pub struct CipApiClient {
    base_url: String,
    client: reqwest::blocking::Client,
    token: ApiToken,
}

impl CipApiClient {
    /// Build the HTTP client and exchange the credentials for a token.
    pub fn connect(settings: &ClientSettings, credentials: &Credentials) -> CipApiResult<Self> {
        let mut builder = reqwest::blocking::Client::builder().timeout(settings.timeout);
        if let Some(proxy) = &settings.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| CipApiError::InvalidConfiguration(format!("invalid proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| CipApiError::InvalidConfiguration(e.to_string()))?;

        let base_url = settings.base_url.trim_end_matches('/').to_string();
        let token = request_token(&client, &base_url, credentials)?;
        tracing::debug!("authenticated against {}", base_url);

        Ok(Self {
            base_url,
            client,
            token,
        })
    }

    /// List interpretation requests for one participant, filtered by provider and status.
    pub fn list_interpretation_requests(
        &self,
        query: &ListingQuery,
    ) -> CipApiResult<InterpretationListing> {
        let url = format!("{}/interpretationRequestsList/", self.base_url);
        let statuses = query.statuses.join(",");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.token.authorization_header())
            .query(&[
                ("format", "json"),
                ("page_size", LISTING_PAGE_SIZE),
                ("cip", query.provider_id.as_str()),
                ("status", statuses.as_str()),
                ("proband", query.participant_id.as_str()),
            ])
            .send()
            .map_err(|e| transport_error(&url, e))?;
        let response = check_status(&url, response)?;

        let wire: ListingWire = response.json().map_err(|e| CipApiError::ResponseParsing {
            url: url.clone(),
            message: e.to_string(),
        })?;
        InterpretationListing::from_wire(wire)
    }

    /// Download the raw HTML of a clinical report.
    pub fn fetch_report(&self, url: &str) -> CipApiResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.token.authorization_header())
            .send()
            .map_err(|e| transport_error(url, e))?;
        let response = check_status(url, response)?;

        let bytes = response.bytes().map_err(|e| transport_error(url, e))?;
        Ok(bytes.to_vec())
    }
}

fn request_token(
    client: &reqwest::blocking::Client,
    base_url: &str,
    credentials: &Credentials,
) -> CipApiResult<ApiToken> {
    let url = format!("{}/get-token/", base_url);
    let response = client
        .post(&url)
        .form(&[
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ])
        .send()
        .map_err(|e| transport_error(&url, e))?;
    let response = check_status(&url, response)?;

    let body: TokenResponse = response.json().map_err(|e| CipApiError::ResponseParsing {
        url: url.clone(),
        message: e.to_string(),
    })?;

    // A 200 without a token still means the credentials were not accepted.
    body.token
        .filter(|t| !t.is_empty())
        .map(ApiToken::new)
        .ok_or(CipApiError::Authentication { url, status: 200 })
}

fn check_status(
    url: &str,
    response: reqwest::blocking::Response,
) -> CipApiResult<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(classify_status(url, status))
    }
}

/// Map a non-success HTTP status onto the transport error taxonomy.
pub(crate) fn classify_status(url: &str, status: StatusCode) -> CipApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CipApiError::Authentication {
            url: url.to_string(),
            status: status.as_u16(),
        },
        StatusCode::NOT_FOUND => CipApiError::NotFound {
            url: url.to_string(),
        },
        _ => CipApiError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        },
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> CipApiError {
    if let Some(status) = e.status() {
        return classify_status(url, status);
    }
    let message = if e.is_timeout() {
        format!("request timed out: {e}")
    } else {
        e.to_string()
    };
    CipApiError::Network {
        url: url.to_string(),
        message,
    }
}
