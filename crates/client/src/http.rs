use serde::Deserialize;
use tracing::debug;

use crate::{Database, DatabaseError, Row};

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Use HTTPS instead of plain HTTP.
    pub secure: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 8123,
            user: "default".to_owned(),
            password: String::new(),
            secure: false,
        }
    }
}

impl ConnectionConfig {
    pub fn url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}:{}/", self.host, self.port)
    }
}

/// ClickHouse over its HTTP interface.
pub struct HttpDatabase {
    client: reqwest::Client,
    url: String,
    user: String,
    password: String,
}

#[derive(Deserialize)]
struct JsonCompact {
    data: Vec<Row>,
}

impl HttpDatabase {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self::with_url(config.url(), &config.user, &config.password)
    }

    pub fn with_url(url: impl Into<String>, user: &str, password: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            user: user.to_owned(),
            password: password.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl Database for HttpDatabase {
    async fn execute(&self, statement: &str, params: &[(&str, &str)]) -> Result<Vec<Row>, DatabaseError> {
        let mut query: Vec<(String, &str)> = vec![("default_format".to_owned(), "JSONCompact")];
        query.extend(params.iter().map(|(k, v)| (format!("param_{k}"), *v)));

        debug!(url = %self.url, "executing query");
        let resp = self
            .client
            .post(&self.url)
            .query(&query)
            .header("X-ClickHouse-User", &self.user)
            .header("X-ClickHouse-Key", &self.password)
            .body(statement.to_owned())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(DatabaseError::Server {
                status: status.as_u16(),
                message: body.trim().to_owned(),
            });
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let parsed: JsonCompact =
            serde_json::from_str(&body).map_err(|e| DatabaseError::Decode(e.to_string()))?;
        Ok(parsed.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_honours_scheme() {
        let mut cfg = ConnectionConfig::default();
        assert_eq!(cfg.url(), "http://localhost:8123/");
        cfg.secure = true;
        cfg.port = 8443;
        assert_eq!(cfg.url(), "https://localhost:8443/");
    }
}
