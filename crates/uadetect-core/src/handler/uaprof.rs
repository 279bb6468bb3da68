//! UAProf header and capability handling
//!
//! WAP devices announce a URL to a machine-readable capability profile in
//! one of several request headers. The URL is an alternate exact-match key.

use url::Url;

use crate::headers::RequestHeaders;

/// Headers that carry a UAProf URL directly
pub const UAPROF_HEADERS: [&str; 3] = ["x-wap-profile", "profile", "wap-profile"];

/// Capability slots a device may declare UAProf URLs in
pub const UAPROF_CAPABILITIES: [&str; 3] = ["uaProfile", "uaProfile2", "uaProfile3"];

/// Strip quote characters and surrounding whitespace from a profile URL.
pub fn normalize_url(value: &str) -> Option<String> {
    let url: String = value.chars().filter(|c| *c != '"').collect();
    let url = url.trim();
    (!url.is_empty()).then(|| url.to_string())
}

/// Lower-cased host of a profile URL. Values without a scheme are read as
/// `http://` URLs.
pub fn host(value: &str) -> Option<String> {
    let url = match Url::parse(value) {
        Ok(url) if url.has_host() => url,
        _ => Url::parse(&format!("http://{value}")).ok()?,
    };
    url.host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Every profile URL announced by a request.
///
/// Besides the fixed header names, an `Opt` header may declare a namespace
/// number `ns=NN`, in which case `NN-Profile` carries the URL. Header values
/// can list several comma-separated URLs.
pub fn profile_urls(headers: &RequestHeaders) -> Vec<String> {
    let mut values: Vec<&str> = UAPROF_HEADERS
        .iter()
        .filter_map(|name| headers.get(name))
        .collect();

    let namespaced = headers
        .get("opt")
        .and_then(opt_namespace)
        .map(|ns| format!("{ns}-profile"));
    if let Some(value) = namespaced.as_deref().and_then(|name| headers.get(name)) {
        values.push(value);
    }

    let mut urls: Vec<String> = Vec::new();
    for url in values
        .into_iter()
        .flat_map(|v| v.split(','))
        .filter_map(normalize_url)
    {
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

fn opt_namespace(opt: &str) -> Option<&str> {
    opt.split(';')
        .filter_map(|part| part.trim().strip_prefix("ns="))
        .map(str::trim)
        .find(|ns| !ns.is_empty() && ns.bytes().all(|b| b.is_ascii_digit()))
}
