//! Typed client for the game endpoints used by the command handlers
//!
//! Every call goes through the [`RateLimitedTransport`]. Endpoints under
//! `/users/{username}` require a prior successful [`GameClient::login`].

use std::sync::RwLock;

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, Result};
use crate::models::{
    Account, AccountResponse, ErrorEnvelope, FlightPlan, FlightRequest, FlightResponse,
    MarketGood, MarketResponse, Ship, ShipsResponse, TransactionRequest, TransactionResult,
    WarpRequest,
};
use crate::transport::RateLimitedTransport;

/// Public SpaceTraders v1 endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.spacetraders.io";

#[derive(Clone)]
struct Credentials {
    token: String,
    username: String,
}

/// Game API client holding the signed-in credentials
pub struct GameClient {
    transport: RateLimitedTransport,
    base_url: String,
    credentials: RwLock<Option<Credentials>>,
}

impl GameClient {
    /// Create a signed-out client for `base_url`
    pub fn new(base_url: impl Into<String>, transport: RateLimitedTransport) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
            credentials: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &RateLimitedTransport {
        &self.transport
    }

    /// Username of the signed-in account
    pub fn username(&self) -> Option<String> {
        self.read_credentials().map(|c| c.username)
    }

    /// Token of the signed-in account
    pub fn token(&self) -> Option<String> {
        self.read_credentials().map(|c| c.token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_credentials().is_some()
    }

    // ========================================================================
    // ACCOUNT
    // ========================================================================

    /// Validate `token` against `/my/account` and keep it for later calls
    pub async fn login(&self, token: &str) -> Result<Account> {
        let request = self.transport.http().get(self.url("/my/account")).bearer_auth(token);
        let response: AccountResponse = self.execute(request).await?;

        let account = response.user;
        *self.credentials.write().unwrap_or_else(|e| e.into_inner()) = Some(Credentials {
            token: token.to_string(),
            username: account.username.clone(),
        });

        tracing::info!(username = %account.username, "signed in");
        Ok(account)
    }

    /// Forget the stored credentials
    pub fn logout(&self) {
        *self.credentials.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Re-fetch the signed-in account
    pub async fn account(&self) -> Result<Account> {
        let creds = self.require_credentials()?;
        let request = self
            .transport
            .http()
            .get(self.url("/my/account"))
            .bearer_auth(&creds.token);
        let response: AccountResponse = self.execute(request).await?;
        Ok(response.user)
    }

    // ========================================================================
    // SHIPS AND FLIGHTS
    // ========================================================================

    /// All ships owned by the signed-in user
    pub async fn ships(&self) -> Result<Vec<Ship>> {
        let response: ShipsResponse = self.get_user("/ships").await?;
        Ok(response.ships)
    }

    /// A flight plan by id
    pub async fn flight_plan(&self, flight_plan_id: &str) -> Result<FlightPlan> {
        let response: FlightResponse = self
            .get_user(&format!("/flight-plans/{flight_plan_id}"))
            .await?;
        Ok(response.flight_plan)
    }

    /// Start a flight from the ship's docked location to `destination`
    pub async fn create_flight_plan(&self, ship_id: &str, destination: &str) -> Result<FlightPlan> {
        let body = FlightRequest {
            ship_id,
            destination,
        };
        let response: FlightResponse = self.post_user("/flight-plans", &body).await?;
        Ok(response.flight_plan)
    }

    /// Jump through the wormhole the ship is docked at
    pub async fn warp_jump(&self, ship_id: &str) -> Result<FlightPlan> {
        let response: FlightResponse = self.post_user("/warp-jump", &WarpRequest { ship_id }).await?;
        Ok(response.flight_plan)
    }

    // ========================================================================
    // MARKETS
    // ========================================================================

    /// Goods traded at a location
    pub async fn marketplace(&self, location: &str) -> Result<Vec<MarketGood>> {
        let creds = self.require_credentials()?;
        let request = self
            .transport
            .http()
            .get(self.url(&format!("/game/locations/{location}/marketplace")))
            .bearer_auth(&creds.token);
        let response: MarketResponse = self.execute(request).await?;
        Ok(response.marketplace)
    }

    /// Buy `quantity` units of `good` into the ship's hold
    pub async fn purchase(&self, ship_id: &str, good: &str, quantity: i64) -> Result<TransactionResult> {
        let body = TransactionRequest {
            ship_id,
            good,
            quantity,
        };
        self.post_user("/purchase-orders", &body).await
    }

    /// Sell `quantity` units of `good` from the ship's hold
    pub async fn sell(&self, ship_id: &str, good: &str, quantity: i64) -> Result<TransactionResult> {
        let body = TransactionRequest {
            ship_id,
            good,
            quantity,
        };
        self.post_user("/sell-orders", &body).await
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn read_credentials(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn require_credentials(&self) -> Result<Credentials> {
        self.read_credentials().ok_or(ApiError::NotAuthenticated)
    }

    async fn get_user<T: DeserializeOwned>(&self, suffix: &str) -> Result<T> {
        let creds = self.require_credentials()?;
        let url = self.url(&format!("/users/{}{}", creds.username, suffix));
        let request = self.transport.http().get(url).bearer_auth(&creds.token);
        self.execute(request).await
    }

    async fn post_user<B: Serialize, T: DeserializeOwned>(&self, suffix: &str, body: &B) -> Result<T> {
        let creds = self.require_credentials()?;
        let url = self.url(&format!("/users/{}{}", creds.username, suffix));
        let request = self
            .transport
            .http()
            .post(url)
            .bearer_auth(&creds.token)
            .json(body);
        self.execute(request).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.transport.send(request.build()?).await?;
        decode(response).await
    }
}

/// Decode a success body, or turn an error body into [`ApiError::Remote`]
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        return Ok(serde_json::from_slice(&body)?);
    }

    match serde_json::from_slice::<ErrorEnvelope>(&body) {
        Ok(envelope) => Err(ApiError::Remote {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
        }),
        Err(_) => Err(ApiError::Status(status.as_u16())),
    }
}
