//! JSON summary of one detection

use std::collections::BTreeMap;

use serde::Serialize;
use uadetect_core::{Detection, MatchMethod, Provider};

/// One output line
#[derive(Debug, Serialize, PartialEq)]
pub struct Report<'a> {
    pub user_agent: &'a str,
    pub device_id: Option<&'a str>,
    pub method: MatchMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub capabilities: BTreeMap<&'a str, Vec<&'a str>>,
}

impl<'a> Report<'a> {
    /// Summarize a detection. `capabilities` names the values to include;
    /// `*` includes every resolved capability.
    pub fn new(
        provider: &'a Provider,
        user_agent: &'a str,
        detection: Detection,
        capabilities: &'a [String],
    ) -> Self {
        let device = detection.device.and_then(|d| provider.device(d));
        let capabilities = match device {
            Some(device) if capabilities.iter().any(|c| c == "*") => device.capabilities(),
            Some(device) => capabilities
                .iter()
                .filter_map(|name| {
                    device
                        .capability_values(name)
                        .map(|values| (name.as_str(), values))
                })
                .collect(),
            None => BTreeMap::new(),
        };

        Self {
            user_agent,
            device_id: device.map(|d| d.id()),
            method: detection.method,
            handler: detection
                .handler
                .and_then(|h| provider.handlers().get(h))
                .map(|h| h.name()),
            difference: detection.difference,
            capabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uadetect_core::dataset::DatasetBuilder;
    use uadetect_core::handler::{Algorithm, HandlerDef};
    use uadetect_core::pattern::PatternNode;
    use uadetect_core::{ProviderConfig, RequestHeaders};

    fn provider() -> Provider {
        let mut builder = DatasetBuilder::new();
        builder.handler(
            HandlerDef::new("mozilla", 10, Algorithm::EditDistance)
                .allow(PatternNode::new("^Mozilla").unwrap()),
        );
        builder.device("generic", None, None).unwrap();
        builder
            .device("d1", Some("Mozilla/5.0 X"), Some("generic"))
            .unwrap();
        builder
            .capability("generic", "is_wireless_device", &["false"])
            .unwrap()
            .capability("d1", "brand_name", &["Example"])
            .unwrap();
        builder.build(ProviderConfig::default())
    }

    #[test]
    fn fuzzy_report_names_the_handler() {
        let provider = provider();
        let detection = provider.detect("Mozilla/5.0 Y", &RequestHeaders::new());
        let wanted = vec!["brand_name".to_string(), "missing".to_string()];
        let report = Report::new(&provider, "Mozilla/5.0 Y", detection, &wanted);

        assert_eq!(report.device_id, Some("d1"));
        assert_eq!(report.method, MatchMethod::Fuzzy);
        assert_eq!(report.handler, Some("mozilla"));
        assert_eq!(report.difference, Some(1));
        assert_eq!(
            report.capabilities,
            BTreeMap::from([("brand_name", vec!["Example"])])
        );
    }

    #[test]
    fn wildcard_includes_inherited_capabilities() {
        let provider = provider();
        let detection = provider.detect("Mozilla/5.0 X", &RequestHeaders::new());
        let wanted = vec!["*".to_string()];
        let report = Report::new(&provider, "Mozilla/5.0 X", detection, &wanted);

        assert_eq!(report.capabilities.len(), 2);
        assert_eq!(report.capabilities["is_wireless_device"], vec!["false"]);
    }

    #[test]
    fn default_device_serializes_without_handler() {
        let provider = provider();
        let detection = provider.detect("curl/8.0", &RequestHeaders::new());
        let report = Report::new(&provider, "curl/8.0", detection, &[]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "user_agent": "curl/8.0",
                "device_id": "generic",
                "method": "default",
            })
        );
    }
}
