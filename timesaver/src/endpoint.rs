use serde::{Deserialize, Serialize};

/// Where the timekeeping application lives.
///
/// The components are joined in order with `/` to form the base URL, e.g.
/// `https://timesaver.example.com/v2/ACCESSKEY/TS/Login.aspx`. Empty
/// components are skipped. A host without a scheme gets `https://`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    host: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    access_key: String,
    #[serde(default)]
    product: String,
    #[serde(default)]
    entry_page: String,
}

impl ServiceEndpoint {
    pub fn new(
        host: impl Into<String>,
        version: impl Into<String>,
        access_key: impl Into<String>,
        product: impl Into<String>,
        entry_page: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            version: version.into(),
            access_key: access_key.into(),
            product: product.into(),
            entry_page: entry_page.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn entry_page(&self) -> &str {
        &self.entry_page
    }

    /// Base URL of the application's entry page
    pub fn url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        let host = if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };

        let mut url = host;
        for part in [&self.version, &self.access_key, &self.product, &self.entry_page] {
            let part = part.trim().trim_matches('/');
            if !part.is_empty() {
                url.push('/');
                url.push_str(part);
            }
        }
        url
    }

    pub(crate) fn with_overrides(
        self,
        host: Option<String>,
        version: Option<String>,
        access_key: Option<String>,
        product: Option<String>,
        entry_page: Option<String>,
    ) -> Self {
        Self {
            host: host.unwrap_or(self.host),
            version: version.unwrap_or(self.version),
            access_key: access_key.unwrap_or(self.access_key),
            product: product.unwrap_or(self.product),
            entry_page: entry_page.unwrap_or(self.entry_page),
        }
    }
}

impl std::fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url())
    }
}
