//! URL assembly for the catalog REST API and derived OGC service endpoints.
//!
//! GeoServer exposes its REST configuration API under `.../rest/` and its
//! OGC services as siblings of that path, so the service endpoints are
//! derived by substituting the `rest` segment rather than configured
//! separately.

use tracing::warn;
use url::Url;

/// Join path segments onto the REST endpoint.
///
/// A trailing slash on the endpoint is dropped before joining so double
/// slashes never appear mid-URL.
pub fn rest_url(endpoint: &str, segments: &[&str]) -> String {
    let mut url = endpoint.trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(segment);
    }
    url
}

/// Endpoint with the trailing `rest` segment removed.
pub fn non_rest_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    trimmed
        .strip_suffix("/rest")
        .unwrap_or(trimmed)
        .to_string()
}

/// GeoWebCache REST endpoint, with trailing slash.
pub fn gwc_endpoint(endpoint: &str) -> String {
    with_trailing_slash(endpoint.replace("rest", "gwc/rest"))
}

/// OWS service endpoint for a workspace, with trailing slash.
pub fn ows_endpoint(endpoint: &str, workspace: &str) -> String {
    with_trailing_slash(endpoint.replace("rest", &format!("{workspace}/ows")))
}

/// WMS service endpoint, with trailing slash.
pub fn wms_endpoint(endpoint: &str) -> String {
    with_trailing_slash(endpoint.replace("rest", "wms"))
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// Expand a base endpoint into one endpoint per cluster node.
///
/// Each node shares the base URL's scheme, host and path but listens on its
/// own port. Without ports the base endpoint itself is the only node. All
/// returned endpoints carry a trailing slash.
pub fn node_endpoints(endpoint: &str, ports: Option<&[u16]>) -> Vec<String> {
    let endpoint = with_trailing_slash(endpoint.to_string());

    let Some(ports) = ports else {
        return vec![endpoint];
    };

    let parsed = match Url::parse(&endpoint) {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!(%endpoint, %error, "endpoint is not a parseable URL, ignoring node ports");
            return vec![endpoint];
        }
    };

    let scheme = parsed.scheme();
    let host = parsed.host_str().unwrap_or_default();
    let path = parsed.path();
    ports
        .iter()
        .map(|port| format!("{scheme}://{host}:{port}{path}"))
        .collect()
}

/// Assemble a WMS GetMap URL.
#[allow(clippy::too_many_arguments)]
pub fn wms_url(
    endpoint: &str,
    layer: &str,
    style: &str,
    srs: &str,
    bbox: &str,
    width: &str,
    height: &str,
    output_format: &str,
) -> String {
    let base = non_rest_endpoint(endpoint);
    format!(
        "{base}/wms?service=WMS&version=1.1.0&request=GetMap&\
         layers={layer}&styles={style}&\
         transparent=true&tiled=no&\
         srs={srs}&bbox={bbox}&\
         width={width}&height={height}&\
         format={output_format}"
    )
}

/// Assemble a WCS GetCoverage URL.
#[allow(clippy::too_many_arguments)]
pub fn wcs_url(
    endpoint: &str,
    resource: &str,
    srs: &str,
    bbox: &str,
    width: &str,
    height: &str,
    output_format: &str,
    namespace: Option<&str>,
) -> String {
    let base = non_rest_endpoint(endpoint);
    let mut url = format!(
        "{base}/wcs?service=WCS&version=1.1.0&request=GetCoverage&\
         identifier={resource}&\
         srs={srs}&BoundingBox={bbox}&\
         width={width}&height={height}&\
         format={output_format}"
    );
    if let Some(namespace) = namespace {
        url.push_str(&format!("&namespace={namespace}"));
    }
    url
}

/// Assemble a WFS GetFeature URL.
///
/// GML3 is the server default and needs no `outputFormat`; GML2 is only
/// served by the 1.0.0 protocol.
pub fn wfs_url(endpoint: &str, resource: &str, output_format: &str) -> String {
    let base = non_rest_endpoint(endpoint);
    match output_format {
        "GML3" => format!(
            "{base}/wfs?service=WFS&version=2.0.0&request=GetFeature&typeNames={resource}"
        ),
        "GML2" => format!(
            "{base}/wfs?service=WFS&version=1.0.0&request=GetFeature&typeNames={resource}&\
             outputFormat=GML2"
        ),
        other => format!(
            "{base}/wfs?service=WFS&version=2.0.0&request=GetFeature&typeNames={resource}&\
             outputFormat={other}"
        ),
    }
}
