use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use crate::{
    client::http::HttpClient,
    error::MelisaError,
    types::cdn::CdnBuilder,
};

/// Stateless handle on the REST API. It never caches; the endpoint groups
/// live in the traits of [`crate::api`].
///
/// Cloning is cheap: clones share the HTTP connection pool and rate limiter.
#[derive(Clone)]
pub struct RestApp {
    pub http: Arc<HttpClient>,
    pub cdn: CdnBuilder,
}

impl Debug for RestApp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestApp")
            .field("base_url", &self.http.base_url)
            .field("cdn", &self.cdn)
            .finish()
    }
}

impl RestApp {
    pub fn new(token: &str) -> Result<Self, MelisaError> {
        Ok(Self::from_http(HttpClient::new(token)?))
    }

    pub fn from_http(http: HttpClient) -> Self {
        Self {
            http: Arc::new(http),
            cdn: CdnBuilder::default(),
        }
    }
}
