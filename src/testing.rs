//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::config::LookupConfig;
use crate::error::{LookupError, Result};
use crate::net::FetchClient;

#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Status(u16),
    NetworkDown,
    /// Never answers
    Hang,
}

/// FetchClient answering from a route table and recording every URL.
/// Routes match by substring, first match wins; unmatched URLs get a 404.
#[derive(Default)]
pub struct ScriptedClient {
    routes: Mutex<Vec<(String, Reply)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, pattern: &str, body: &str) -> Self {
        self.push(pattern, Reply::Body(body.to_string()))
    }

    pub fn route_status(self, pattern: &str, status: u16) -> Self {
        self.push(pattern, Reply::Status(status))
    }

    pub fn route_down(self, pattern: &str) -> Self {
        self.push(pattern, Reply::NetworkDown)
    }

    pub fn route_hang(self, pattern: &str) -> Self {
        self.push(pattern, Reply::Hang)
    }

    fn push(self, pattern: &str, reply: Reply) -> Self {
        self.routes.lock().unwrap().push((pattern.to_string(), reply));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|u| u.contains(pattern)).count()
    }
}

#[async_trait]
impl FetchClient for ScriptedClient {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());

        let reply = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Reply::Status(404));

        match reply {
            Reply::Body(body) => Ok(body),
            Reply::Status(status) => Err(LookupError::Status {
                url: url.to_string(),
                status,
            }),
            Reply::NetworkDown => Err(LookupError::Network {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Config pointing at fake hosts with near-zero throttling and backoff
pub fn fast_config() -> LookupConfig {
    LookupConfig::parse(
        "STEAM_API_BASE_URL=http://api.test\n\
         STEAM_STORE_API_BASE_URL=http://store.test/api\n\
         SCRAPE_BASE_URL=http://steamdb.test\n\
         API_RATE_LIMIT_PER_MINUTE=60000\n\
         SCRAPE_RATE_LIMIT_PER_MINUTE=60000\n\
         RETRY_MAX_ATTEMPTS=3\n\
         RETRY_BASE_DELAY_MS=1\n",
    )
}

pub const HL2_LISTING: &str = r#"
<table class="table-sortable">
  <tr class="app" data-appid="220">
    <td class="b">220</td>
    <td class="b"><a href="/app/220/">Half-Life 2</a></td>
    <td class="date">Nov 16, 2004</td>
    <td class="price">N/A</td>
  </tr>
  <tr class="app" data-appid="380">
    <td class="b">380</td>
    <td class="b"><a href="/app/380/">Half-Life 2: Episode One</a></td>
    <td class="date">Jun 1, 2006</td>
    <td class="price">$7.99</td>
  </tr>
</table>"#;

pub const HL2_DETAIL: &str = r#"
<h1 itemprop="name">Half-Life 2</h1>
<table>
  <tr><td class="developer">Valve</td></tr>
  <tr><td class="publisher">Valve</td></tr>
  <tr><td class="price">$9.99</td></tr>
  <tr><td class="lowest-price">$0.99</td></tr>
  <tr><td class="score">96</td></tr>
  <tr><td class="date">16 November 2004</td></tr>
</table>
<div class="description">
  The <b>Combine</b> have taken over &amp; only Gordon can stop them.
</div>
<a class="tag" href="/tag/1/">FPS</a>
<a class="tag" href="/tag/2/">Action</a>
<a class="tag" href="/tag/3/">Sci-fi</a>"#;

pub const NO_RESULTS_PAGE: &str = r#"
<div class="container">
  <div class="no-results">No results were found for your query.</div>
</div>"#;

pub const FREE_APP_98: &str = r#"{"98":{"success":true,"data":{"type":"game","name":"Free Game","steam_appid":98,"is_free":true,"short_description":"A free game.","developers":["Dev Co"],"publishers":["Pub Co"],"release_date":{"coming_soon":false,"date":"1 Jan, 2010"},"genres":[{"id":"1","description":"Action"},{"id":"37","description":"Free to Play"}]}}}"#;

pub const PAID_APP_220: &str = r#"{
  "220": {
    "success": true,
    "data": {
      "type": "game",
      "name": "Half-Life 2",
      "steam_appid": 220,
      "is_free": false,
      "short_description": "1998. HALF-LIFE sends a shock through the game industry&hellip; \"Gordon\" returns.",
      "header_image": "https:\/\/cdn.test\/apps\/220\/header.jpg",
      "developers": ["Valve"],
      "publishers": ["Valve"],
      "price_overview": {
        "currency": "USD",
        "initial": 999,
        "final": 199,
        "discount_percent": 80,
        "initial_formatted": "$9.99",
        "final_formatted": "$1.99"
      },
      "metacritic": { "score": 96, "url": "https:\/\/www.metacritic.com\/game\/pc\/half-life-2" },
      "genres": [{ "id": "1", "description": "Action" }],
      "release_date": { "coming_soon": false, "date": "16 Nov, 2004" }
    }
  }
}"#;

pub const MISSING_APP: &str = r#"{"999999999":{"success":false}}"#;
