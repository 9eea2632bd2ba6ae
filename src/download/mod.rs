use log::debug;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::ACCEPT;

use crate::config::NvdbConfig;
use crate::error::FetchError;
use crate::geometry::BoundingBox;
use crate::model::ObjectId;

/// Remote source of road objects. Both calls return the raw response body.
pub trait RoadDataSource {
    /// List the objects inside one tile
    fn fetch_catalog(&self, tile: &BoundingBox) -> Result<String, FetchError>;

    /// Fetch geometry and properties for one object
    fn fetch_detail(&self, id: ObjectId) -> Result<String, FetchError>;
}

/// Blocking client for the NVDB read API
pub struct NvdbClient {
    config: NvdbConfig,
    client: Client,
}

impl NvdbClient {
    pub fn new(config: NvdbConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .header(ACCEPT, &self.config.accept)
            .header("x-client", &self.config.client)
            .header("x-client-session", &self.config.client_session)
    }

    fn catalog_request(&self, tile: &BoundingBox) -> RequestBuilder {
        self.get(&self.config.base_url).query(&catalog_query(&self.config, tile))
    }

    fn detail_request(&self, id: ObjectId) -> RequestBuilder {
        self.get(&detail_url(&self.config, id)).query(&detail_query(&self.config))
    }

    fn send(&self, request: RequestBuilder) -> Result<String, FetchError> {
        let response = request.send()?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status().as_u16(),
            });
        }
        Ok(response.text()?)
    }
}

impl RoadDataSource for NvdbClient {
    fn fetch_catalog(&self, tile: &BoundingBox) -> Result<String, FetchError> {
        debug!("Catalog query for {}", tile);
        self.send(self.catalog_request(tile))
    }

    fn fetch_detail(&self, id: ObjectId) -> Result<String, FetchError> {
        debug!("Detail query for object {}", id);
        self.send(self.detail_request(id))
    }
}

/// Query parameters for listing the objects within a tile
pub fn catalog_query(config: &NvdbConfig, tile: &BoundingBox) -> Vec<(&'static str, String)> {
    vec![
        ("kartutsnitt", tile.to_query_value()),
        ("kommune", config.municipality.to_string()),
        ("segmentering", "false".to_string()),
        ("inkluder", "metadata,lokasjon,geometri".to_string()),
    ]
}

pub fn detail_url(config: &NvdbConfig, id: ObjectId) -> String {
    format!("{}/{}/{}", config.base_url.trim_end_matches('/'), id, config.version)
}

/// Query parameters for fetching one object with its properties and relations
pub fn detail_query(config: &NvdbConfig) -> Vec<(&'static str, String)> {
    vec![
        ("dybde", config.depth.to_string()),
        ("inkluder", "lokasjon,metadata,egenskaper,relasjoner,geometri".to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_query() {
        let config = NvdbConfig::default();
        let tile = BoundingBox::new(250000.0, 7000000.0, 252500.0, 7005000.0).unwrap();
        let query = catalog_query(&config, &tile);

        assert_eq!(query[0], ("kartutsnitt", "250000,7000000,252500,7005000".to_string()));
        assert!(query.contains(&("kommune", "5001".to_string())));
        assert!(query.contains(&("segmentering", "false".to_string())));
        assert!(query.contains(&("inkluder", "metadata,lokasjon,geometri".to_string())));
    }

    #[test]
    fn test_detail_request() {
        let config = NvdbConfig {
            base_url: "https://nvdb.example/vegobjekter/540/".to_string(),
            ..NvdbConfig::default()
        };
        assert_eq!(detail_url(&config, 78452146), "https://nvdb.example/vegobjekter/540/78452146/1");

        let query = detail_query(&config);
        assert!(query.contains(&("dybde", "1".to_string())));
        assert!(query.contains(&("inkluder", "lokasjon,metadata,egenskaper,relasjoner,geometri".to_string())));
    }

    fn assert_nvdb_headers(request: &reqwest::blocking::Request) {
        let headers = request.headers();
        assert_eq!(
            headers.get(ACCEPT).unwrap(),
            "application/vnd.vegvesen.nvdb-v3-rev1+json, application/json"
        );
        assert_eq!(headers.get("x-client").unwrap(), "Vegkart");
        assert_eq!(
            headers.get("x-client-session").unwrap(),
            "f494b285-ec81-436c-ae44-a852ecceab42"
        );
    }

    fn query_pairs(request: &reqwest::blocking::Request) -> Vec<(String, String)> {
        request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_catalog_request_headers_and_url() {
        let client = NvdbClient::new(NvdbConfig::default()).unwrap();
        let tile = BoundingBox::new(250000.0, 7000000.0, 252500.0, 7005000.0).unwrap();

        let request = client.catalog_request(&tile).build().unwrap();

        assert_nvdb_headers(&request);
        assert_eq!(request.method(), &reqwest::Method::GET);
        assert_eq!(request.url().host_str(), Some("nvdbapiles-v3.atlas.vegvesen.no"));
        assert_eq!(request.url().path(), "/vegobjekter/540");
        assert_eq!(
            query_pairs(&request),
            vec![
                ("kartutsnitt".to_string(), "250000,7000000,252500,7005000".to_string()),
                ("kommune".to_string(), "5001".to_string()),
                ("segmentering".to_string(), "false".to_string()),
                ("inkluder".to_string(), "metadata,lokasjon,geometri".to_string()),
            ]
        );
    }

    #[test]
    fn test_detail_request_headers_and_url() {
        let client = NvdbClient::new(NvdbConfig::default()).unwrap();

        let request = client.detail_request(78452146).build().unwrap();

        assert_nvdb_headers(&request);
        assert_eq!(request.url().path(), "/vegobjekter/540/78452146/1");
        assert_eq!(
            query_pairs(&request),
            vec![
                ("dybde".to_string(), "1".to_string()),
                ("inkluder".to_string(), "lokasjon,metadata,egenskaper,relasjoner,geometri".to_string()),
            ]
        );
    }
}
