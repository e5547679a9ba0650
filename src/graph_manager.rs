use std::collections::HashSet;
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use crate::errors::GraphError;
use crate::graph_model::{Collection, Download, Drive, DriveItem};
use crate::initialization::Graph;
use crate::token_manager::AccessToken;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Authenticated read-only access to the Graph document storage API
///
pub struct GraphClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl GraphClient {

    /// Returns a new GraphClient
    ///
    /// Redirects are not followed automatically, see `download_content`.
    ///
    /// # Arguments
    ///
    /// * 'graph' - endpoint and timeout configuration
    pub fn new(graph: &Graph) -> Result<Self, GraphError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(graph.timeout_secs))
            .build()?;

        let endpoint = Url::parse(graph.endpoint.trim_end_matches('/'))
            .map_err(|e| GraphError::Request(format!("invalid graph endpoint {}: {}", graph.endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(GraphError::Request(format!("invalid graph endpoint: {}", graph.endpoint)));
        }

        Ok(GraphClient {
            client,
            endpoint,
        })
    }

    /// Returns sites matching a search term, as the raw Graph payload
    ///
    /// # Arguments
    ///
    /// * 'token' - access token to use
    /// * 'search' - search term, '*' for all sites
    pub async fn list_sites(&self, token: &AccessToken, search: &str) -> Result<Value, GraphError> {
        let mut url = self.url(&["sites"]);
        url.query_pairs_mut().append_pair("search", search);

        let json = self.get_text(url, token).await?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Resolves one site by host name and server relative path, as the raw Graph payload
    ///
    /// # Arguments
    ///
    /// * 'token' - access token to use
    /// * 'hostname' - e.g. contoso.sharepoint.com
    /// * 'path' - e.g. /sites/Team
    pub async fn get_site(&self, token: &AccessToken, hostname: &str, path: &str) -> Result<Value, GraphError> {
        let host = format!("{}:", hostname);
        let mut segments = vec!["sites", host.as_str()];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));

        let json = self.get_text(self.url(&segments), token).await?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Returns all drives of a site
    ///
    /// # Arguments
    ///
    /// * 'token' - access token to use
    /// * 'site_id' - the site to list drives for
    pub async fn list_drives(&self, token: &AccessToken, site_id: &str) -> Result<Vec<Drive>, GraphError> {
        self.get_pages(self.url(&["sites", site_id, "drives"]), token).await
    }

    /// Returns the drive with the given name, `GraphError::NotFound` if the site has none
    ///
    /// # Arguments
    ///
    /// * 'token' - access token to use
    /// * 'site_id' - the site to look in
    /// * 'name' - drive name, e.g. Documents
    pub async fn find_drive(&self, token: &AccessToken, site_id: &str, name: &str) -> Result<Drive, GraphError> {
        self.list_drives(token, site_id)
            .await?
            .into_iter()
            .find(|d| d.name.as_deref() == Some(name))
            .ok_or_else(|| GraphError::NotFound(format!("{} library", name)))
    }

    /// Returns the immediate children of a folder, following every result page
    ///
    /// # Arguments
    ///
    /// * 'token' - access token to use
    /// * 'drive_id' - the drive holding the folder
    /// * 'folder_id' - folder item id, or None for the drive root
    pub async fn list_children(&self, token: &AccessToken, drive_id: &str, folder_id: Option<&str>) -> Result<Vec<DriveItem>, GraphError> {
        let url = match folder_id {
            Some(folder_id) => self.url(&["drives", drive_id, "items", folder_id, "children"]),
            None => self.url(&["drives", drive_id, "root", "children"]),
        };

        self.get_pages(url, token).await
    }

    /// Downloads a file together with its declared content type
    ///
    /// The content endpoint normally answers with a redirect to a pre-authenticated
    /// download url, which is fetched without the bearer token. A direct success
    /// answer is taken as the content itself.
    ///
    /// # Arguments
    ///
    /// * 'token' - access token to use
    /// * 'drive_id' - the drive holding the file
    /// * 'file_id' - the item id of the file
    pub async fn download_content(&self, token: &AccessToken, drive_id: &str, file_id: &str) -> Result<Download, GraphError> {
        let url = self.url(&["drives", drive_id, "items", file_id, "content"]);
        debug!("GET {}", url.path());

        let mut res = self.client
            .get(url)
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await?;

        if res.status().is_redirection() {
            let location = match res.headers().get(LOCATION) {
                Some(location) => location.to_str()?.to_string(),
                None => return Err(GraphError::Decode(format!("get Location header value: {:?}", res.headers()))),
            };

            res = self.client
                .get(&location)
                .send()
                .await?;
        }

        let res = Self::check_status(res).await?;

        let content_type = res.headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        Ok(Download {
            bytes: res.bytes().await?.to_vec(),
            content_type,
        })
    }

    /// Builds an url below the configured endpoint, percent encoding each segment
    ///
    /// # Arguments
    ///
    /// * 'segments' - path segments to append
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Collects the `value` arrays of all pages of a collection
    ///
    /// Next links are only followed on the configured endpoint's origin, and each
    /// page is fetched at most once.
    ///
    /// # Arguments
    ///
    /// * 'url' - first page
    /// * 'token' - access token to use
    async fn get_pages<T: DeserializeOwned>(&self, url: Url, token: &AccessToken) -> Result<Vec<T>, GraphError> {
        let mut url = url;
        let mut visited: HashSet<Url> = HashSet::new();
        let mut items: Vec<T> = Vec::new();
        loop {
            visited.insert(url.clone());
            let json = self.get_text(url, token).await?;

            let page: Collection<T> = serde_json::from_str(&json)?;
            items.extend(page.value);

            let Some(next_link) = page.odata_next_link else {
                return Ok(items);
            };
            url = Url::parse(&next_link)
                .map_err(|e| GraphError::Decode(format!("invalid next link {}: {}", next_link, e)))?;

            if url.origin() != self.endpoint.origin() {
                return Err(GraphError::Decode(format!("next link outside graph endpoint: {}", next_link)));
            }
            if visited.contains(&url) {
                return Err(GraphError::Decode(format!("next link points at a page already read: {}", next_link)));
            }
        }
    }

    /// Issues an authenticated GET and returns the body of a success response
    ///
    /// # Arguments
    ///
    /// * 'url' - url to get
    /// * 'token' - access token to use
    async fn get_text(&self, url: Url, token: &AccessToken) -> Result<String, GraphError> {
        debug!("GET {}", url.path());
        let res = self.client
            .get(url)
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await?;

        Ok(Self::check_status(res).await?.text().await?)
    }

    /// Turns a non-success response into `GraphError::Upstream` carrying its body
    ///
    async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, GraphError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        warn!("graph request to {} failed with status: {}", res.url().path(), status);
        let body = res.text().await.unwrap_or_default();
        Err(GraphError::Upstream { status: status.as_u16(), body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GraphClient {
        GraphClient::new(&Graph {
            endpoint: format!("{}/v1.0", server.uri()),
            timeout_secs: 5,
        }).unwrap()
    }

    fn token() -> AccessToken {
        AccessToken::new("tok", None)
    }

    #[tokio::test]
    async fn every_call_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/sites"))
            .and(query_param("search", "*"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [{"id": "s1"}]})))
            .expect(1)
            .mount(&server)
            .await;

        let sites = client(&server).list_sites(&token(), "*").await.unwrap();
        assert_eq!(sites["value"][0]["id"], "s1");
    }

    #[tokio::test]
    async fn get_site_addresses_by_host_and_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/sites/contoso.sharepoint.com:/sites/Team"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "contoso.sharepoint.com,1,2"})))
            .expect(1)
            .mount(&server)
            .await;

        let site = client(&server).get_site(&token(), "contoso.sharepoint.com", "/sites/Team").await.unwrap();
        assert_eq!(site["id"], "contoso.sharepoint.com,1,2");
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/sites/site-1/drives"))
            .respond_with(ResponseTemplate::new(403).set_body_string(r#"{"error":{"code":"accessDenied"}}"#))
            .mount(&server)
            .await;

        match client(&server).list_drives(&token(), "site-1").await {
            Err(GraphError::Upstream { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, r#"{"error":{"code":"accessDenied"}}"#);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn find_drive_filters_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/sites/site-1/drives"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [
                {"id": "d0", "name": "Site Assets"},
                {"id": "d1", "name": "Documents"}
            ]})))
            .mount(&server)
            .await;

        let graph = client(&server);
        let drive = graph.find_drive(&token(), "site-1", "Documents").await.unwrap();
        assert_eq!(drive.id, "d1");

        match graph.find_drive(&token(), "site-1", "Archive").await {
            Err(GraphError::NotFound(what)) => assert_eq!(what, "Archive library"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn list_children_follows_next_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/drives/d1/root/children"))
            .and(query_param_is_missing("$skiptoken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "a", "name": "a.pdf", "file": {}}],
                "@odata.nextLink": format!("{}/v1.0/drives/d1/root/children?$skiptoken=p2", server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/drives/d1/root/children"))
            .and(query_param("$skiptoken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "b", "name": "b.pdf", "file": {}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = client(&server).list_children(&token(), "d1", None).await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn repeated_next_link_stops_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/drives/d1/root/children"))
            .and(query_param_is_missing("$skiptoken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "a", "name": "a.pdf", "file": {}}],
                "@odata.nextLink": format!("{}/v1.0/drives/d1/root/children?$skiptoken=p2", server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/drives/d1/root/children"))
            .and(query_param("$skiptoken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "b", "name": "b.pdf", "file": {}}],
                "@odata.nextLink": format!("{}/v1.0/drives/d1/root/children?$skiptoken=p2", server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server).list_children(&token(), "d1", None).await,
            Err(GraphError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn next_link_to_other_host_is_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/sites/site-1/drives"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "d1", "name": "Documents"}],
                "@odata.nextLink": "https://collector.example.com/v1.0/sites/site-1/drives?$skiptoken=p2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        match client(&server).list_drives(&token(), "site-1").await {
            Err(GraphError::Decode(e)) => assert!(e.contains("collector.example.com")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn list_children_of_folder_uses_item_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/drives/d1/items/f1/children"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
            .expect(1)
            .mount(&server)
            .await;

        let items = client(&server).list_children(&token(), "d1", Some("f1")).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn download_follows_redirect_without_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/drives/d1/items/i1/content"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/download/i1?tempauth=x", server.uri()).as_str()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download/i1"))
            .respond_with(ResponseTemplate::new(200)
                .set_body_raw(b"%PDF-1.5".to_vec(), "application/pdf"))
            .expect(1)
            .mount(&server)
            .await;

        let download = client(&server).download_content(&token(), "d1", "i1").await.unwrap();
        assert_eq!(download.bytes, b"%PDF-1.5");
        assert_eq!(download.content_type, "application/pdf");

        let requests = server.received_requests().await.unwrap();
        let download_request = requests.iter().find(|r| r.url.path() == "/download/i1").unwrap();
        assert!(!download_request.headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn download_accepts_direct_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/drives/d1/items/i1/content"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"raw".to_vec()))
            .mount(&server)
            .await;

        let download = client(&server).download_content(&token(), "d1", "i1").await.unwrap();
        assert_eq!(download.bytes, b"raw");
        assert_eq!(download.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn download_of_missing_item_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/drives/d1/items/nope/content"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": {"code": "itemNotFound"}})))
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server).download_content(&token(), "d1", "nope").await,
            Err(GraphError::Upstream { status: 404, .. })
        ));
    }

    #[test]
    fn item_ids_are_percent_encoded() {
        let graph = GraphClient::new(&Graph {
            endpoint: "https://graph.microsoft.com/v1.0/".to_string(),
            timeout_secs: 5,
        }).unwrap();
        let url = graph.url(&["drives", "d1", "items", "a/b?c", "content"]);
        assert_eq!(url.as_str(), "https://graph.microsoft.com/v1.0/drives/d1/items/a%2Fb%3Fc/content");
    }
}
