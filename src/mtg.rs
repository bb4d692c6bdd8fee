use std::future::Future;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{Error, Result},
    models::CardRecord,
};

/// Most identifiers the catalog accepts in one collection request.
pub const COLLECTION_LIMIT: usize = 75;

/// Remote card catalog.
pub trait CardCatalog {
    /// Batch lookup by name. Names the catalog does not know are simply
    /// missing from the returned records.
    fn fetch_collection(
        &self,
        names: &[String],
    ) -> impl Future<Output = Result<Vec<CardRecord>>> + Send;

    /// Exact-name lookup of a card's preview image.
    fn lookup_image(&self, name: &str) -> impl Future<Output = Result<Option<String>>> + Send;
}

#[derive(Debug, Serialize)]
struct Identifier<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct CollectionRequest<'a> {
    identifiers: Vec<Identifier<'a>>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Clone, Debug)]
pub struct ScryfallClient {
    http: reqwest::Client,
    api_base: String,
}

impl ScryfallClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
        })
    }
}

impl CardCatalog for ScryfallClient {
    async fn fetch_collection(&self, names: &[String]) -> Result<Vec<CardRecord>> {
        let body = CollectionRequest {
            identifiers: names.iter().map(|name| Identifier { name }).collect(),
        };
        let response = self
            .http
            .post(format!("{}/cards/collection", self.api_base))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let parsed: CollectionResponse = serde_json::from_str(&text)?;
        let records: Vec<CardRecord> = parsed
            .data
            .into_iter()
            .filter_map(|card| serde_json::from_value::<CardRecord>(card).ok())
            .filter(|card| !card.name.trim().is_empty())
            .collect();
        debug!("collection lookup: {} asked, {} found", names.len(), records.len());
        Ok(records)
    }

    async fn lookup_image(&self, name: &str) -> Result<Option<String>> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/cards/named", self.api_base),
            &[("exact", name)],
        )
        .map_err(|e| Error::Url(e.to_string()))?;
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }

        let card: CardRecord = serde_json::from_str(&response.text().await?)?;
        Ok(card.image_url().map(str::to_owned))
    }
}

/// Image bytes for an already resolved preview URL.
pub async fn download_image(img_url: &str) -> Option<bytes::Bytes> {
    let request = reqwest::get(img_url).await.ok()?;
    if !request.status().is_success() {
        return None;
    }
    request.bytes().await.ok()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    /// Serves one canned JSON response and records the raw request.
    async fn serve_once(body: &'static str) -> (String, Arc<Mutex<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(String::new()));
        let record = seen.clone();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            let request = String::from_utf8_lossy(&request).into_owned();
            *record.lock().unwrap() = request;

            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        (base, seen)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let body_len = text[..end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= end + 4 + body_len
    }

    fn client(api_base: &str) -> ScryfallClient {
        let config = Config {
            api_base: format!("{}/", api_base),
            user_agent: "decklist-test/1".to_owned(),
            ..Config::default()
        };
        ScryfallClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn image_lookup_uses_configured_base() {
        let (base, seen) = serve_once(
            r#"{"name":"Fire // Ice","card_faces":[{"name":"Fire","image_uris":{"normal":"https://img.test/fire.jpg"}}]}"#,
        )
        .await;

        let url = client(&base).lookup_image("Fire // Ice").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://img.test/fire.jpg"));

        let request = seen.lock().unwrap().clone();
        let request_line = request.lines().next().unwrap_or_default().to_owned();
        assert!(request_line.starts_with("GET /cards/named?exact=Fire"), "{}", request_line);
        assert!(request.to_lowercase().contains("user-agent: decklist-test/1"));
    }

    #[tokio::test]
    async fn collection_lookup_skips_unusable_records() {
        let (base, seen) = serve_once(
            r#"{"data":[{"name":"Opt","cmc":1.0},{"name":""},{"oops":true}],"not_found":[{"name":"Nope"}]}"#,
        )
        .await;

        let names = vec!["Opt".to_owned(), "Nope".to_owned()];
        let cards = client(&base).fetch_collection(&names).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].name, "Opt");
        assert!(seen.lock().unwrap().starts_with("POST /cards/collection"));
    }
}
